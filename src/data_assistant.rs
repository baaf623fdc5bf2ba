//! Data Assistant - answers free-text questions about the statistics tables
//!
//! Control flow for one request, strictly sequential:
//! 1. Classify relevance and tag intent
//! 2. Build predicates and retrieve rows per table (skipped when unrelated)
//! 3. Reconcile identifiers shared across tables
//! 4. Summarize rows
//! 5. Compose the prompt and make the single generation call

use crate::aggregate::{summarize, Summary};
use crate::conversation_log::{ConversationEntry, ConversationLog};
use crate::db::QueryExecutor;
use crate::error::{ChatError, Result};
use crate::intent::{QueryIntent, RelevanceClassifier};
use crate::llm::GenerationService;
use crate::prompt::compose_prompt;
use crate::reconcile::{reconcile, CrossTableNote};
use crate::retrieval::{retrieve_all, TableRows};
use crate::schema::SchemaRegistry;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Everything derived for a message before the generation call.
#[derive(Debug, Clone, Serialize)]
pub struct PreparedQuery {
    pub message: String,
    pub intent: QueryIntent,
    pub results: Vec<TableRows>,
    pub notes: Vec<CrossTableNote>,
    pub summary: Summary,
    pub prompt: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssistantResponse {
    pub request_id: String,
    pub response: String,
    pub intent: QueryIntent,
    pub tables_consulted: Vec<String>,
    pub notes: Vec<CrossTableNote>,
}

pub struct DataAssistant {
    registry: Arc<SchemaRegistry>,
    generator: Box<dyn GenerationService>,
    conversation_log: Option<ConversationLog>,
}

impl DataAssistant {
    pub fn new(registry: Arc<SchemaRegistry>, generator: Box<dyn GenerationService>) -> Self {
        Self {
            registry,
            generator,
            conversation_log: None,
        }
    }

    pub fn with_conversation_log(mut self, log: ConversationLog) -> Self {
        self.conversation_log = Some(log);
        self
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Classify, retrieve, reconcile, summarize and compose the prompt.
    pub fn prepare(&self, message: &str, executor: &dyn QueryExecutor) -> Result<PreparedQuery> {
        let classifier = RelevanceClassifier::new(&self.registry);
        let intent = classifier.classify(message, executor);
        info!(
            related = intent.is_related,
            in_need = intent.is_in_need,
            detailed = intent.is_detailed,
            "Classified message"
        );

        let results = if intent.is_related {
            let tables = self.registry.tables_for(&intent);
            retrieve_all(executor, message, &tables)?
        } else {
            Vec::new()
        };

        let notes = reconcile(&self.registry, message, &results);
        if !notes.is_empty() {
            info!("{} cross-table ambiguity notes", notes.len());
        }
        let summary = summarize(&self.registry, message, &intent, &results);
        let prompt = compose_prompt(&self.registry, message, &intent, &summary, &notes);

        Ok(PreparedQuery {
            message: message.to_string(),
            intent,
            results,
            notes,
            summary,
            prompt,
        })
    }

    /// Full request: prepare, then one generation call. Any failure is terminal.
    pub async fn answer(
        &self,
        message: &str,
        executor: &dyn QueryExecutor,
    ) -> Result<AssistantResponse> {
        let request_id = Uuid::new_v4().to_string();
        let prepared = self.prepare_logged(&request_id, message, executor)?;
        self.complete(request_id, prepared).await
    }

    /// Like [`DataAssistant::answer`], but acquires the executor itself and
    /// releases it before the generation call, so the returned future does
    /// not hold the connection.
    pub async fn answer_with<E, F>(&self, message: &str, open_executor: F) -> Result<AssistantResponse>
    where
        E: QueryExecutor,
        F: FnOnce() -> Result<E>,
    {
        let request_id = Uuid::new_v4().to_string();
        let prepared = {
            let executor = match open_executor() {
                Ok(executor) => executor,
                Err(e) => {
                    self.record_failure(&request_id, message, None, &e);
                    return Err(e);
                }
            };
            self.prepare_logged(&request_id, message, &executor)?
        };
        self.complete(request_id, prepared).await
    }

    fn prepare_logged(
        &self,
        request_id: &str,
        message: &str,
        executor: &dyn QueryExecutor,
    ) -> Result<PreparedQuery> {
        self.prepare(message, executor).map_err(|e| {
            self.record_failure(request_id, message, None, &e);
            e
        })
    }

    async fn complete(&self, request_id: String, prepared: PreparedQuery) -> Result<AssistantResponse> {
        let response = match self.generator.generate(&prepared.prompt).await {
            Ok(text) => text,
            Err(e) => {
                self.record_failure(&request_id, &prepared.message, Some(prepared.intent.is_related), &e);
                return Err(e);
            }
        };
        self.record(
            ConversationEntry::new(request_id.clone(), prepared.message.clone())
                .with_related(prepared.intent.is_related)
                .with_response(response.clone()),
        );

        Ok(AssistantResponse {
            request_id,
            response,
            intent: prepared.intent,
            tables_consulted: prepared.results.iter().map(|r| r.table.clone()).collect(),
            notes: prepared.notes,
        })
    }

    fn record_failure(&self, request_id: &str, message: &str, related: Option<bool>, error: &ChatError) {
        let entry = ConversationEntry::new(request_id.to_string(), message.to_string())
            .with_related(related.unwrap_or(false))
            .with_error(error.to_string());
        self.record(entry);
    }

    fn record(&self, entry: ConversationEntry) {
        if let Some(log) = &self.conversation_log {
            if let Err(e) = log.append(&entry) {
                warn!("Failed to append conversation log {}: {}", log.path().display(), e);
            }
        }
    }
}
