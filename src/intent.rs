//! Relevance Classifier
//!
//! Decides whether a message concerns the dataset and tags the secondary
//! intent flags. Classification is lexical first; only when nothing matches
//! does it probe the store for the literal message as a stored value, since
//! place and sector names cannot all be listed as keywords.

use crate::db::QueryExecutor;
use crate::predicate::render_probe;
use crate::schema::SchemaRegistry;
use crate::vocabulary::{
    contains_domain_keyword, find_location, LOCATION_PHRASE_PATTERN, QUANTITY_PATTERN, YEAR_PATTERN,
};
use serde::Serialize;
use tracing::{debug, warn};

/// Intent derived once per request from the raw message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct QueryIntent {
    pub is_related: bool,
    pub is_in_need: bool,
    pub is_detailed: bool,
}

/// Secondary flags. Independent of each other and of relatedness.
pub fn tag_intent(message: &str) -> (bool, bool) {
    let lower = message.to_lowercase();
    (lower.contains("in need"), lower.contains("in detailed"))
}

pub struct RelevanceClassifier<'a> {
    registry: &'a SchemaRegistry,
    humanized_columns: Vec<String>,
}

impl<'a> RelevanceClassifier<'a> {
    pub fn new(registry: &'a SchemaRegistry) -> Self {
        Self {
            registry,
            humanized_columns: registry.humanized_columns(),
        }
    }

    /// Lexical checks only: column names, domain keywords, known place names,
    /// quantity and location phrasing, bare years.
    pub fn is_related_lexical(&self, message: &str) -> bool {
        let lower = message.to_lowercase();

        if self.humanized_columns.iter().any(|c| lower.contains(c.as_str())) {
            return true;
        }
        if contains_domain_keyword(&lower) || find_location(message).is_some() {
            return true;
        }
        QUANTITY_PATTERN.is_match(message)
            || LOCATION_PHRASE_PATTERN.is_match(message)
            || YEAR_PATTERN.is_match(message)
    }

    /// Probe every free-text column of every table for the literal message.
    /// A probe that cannot be prepared or run is logged and skipped.
    pub fn matches_stored_value(&self, message: &str, executor: &dyn QueryExecutor) -> bool {
        let value = message.trim();
        if value.is_empty() {
            return false;
        }
        for table in self.registry.tables() {
            for column in table.text_columns() {
                let probe = render_probe(table.name(), column.name(), value);
                match executor.exists(&probe) {
                    Ok(true) => {
                        debug!(table = table.name(), column = column.name(), "stored value matched");
                        return true;
                    }
                    Ok(false) => {}
                    Err(e) => {
                        warn!(
                            "Skipping existence probe on {}.{}: {}",
                            table.name(),
                            column.name(),
                            e
                        );
                    }
                }
            }
        }
        false
    }

    pub fn is_related(&self, message: &str, executor: &dyn QueryExecutor) -> bool {
        self.is_related_lexical(message) || self.matches_stored_value(message, executor)
    }

    pub fn classify(&self, message: &str, executor: &dyn QueryExecutor) -> QueryIntent {
        let (is_in_need, is_detailed) = tag_intent(message);
        QueryIntent {
            is_related: self.is_related(message, executor),
            is_in_need,
            is_detailed,
        }
    }
}
