//! Runtime configuration from the environment (a `.env` file is honoured).

use crate::error::{ChatError, Result};
use crate::llm::{build_client, GenerationService, Provider, DEFAULT_TIMEOUT};
use crate::schema::SchemaRegistry;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_path: PathBuf,
    pub schema_path: Option<PathBuf>,
    pub provider: Provider,
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
    pub conversation_log: Option<PathBuf>,
    pub error_log: Option<PathBuf>,
    pub server_addr: String,
}

impl AppConfig {
    /// Read configuration from environment variables after loading `.env`.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let provider: Provider = match get("GENERATION_PROVIDER") {
            Some(name) => name.parse()?,
            None => Provider::Gemini,
        };
        let provider_key = match provider {
            Provider::Gemini => "GEMINI_API_KEY",
            Provider::OpenAi => "OPENAI_API_KEY",
        };
        let timeout = match get("GENERATION_TIMEOUT_SECS") {
            Some(secs) => Duration::from_secs(secs.parse().map_err(|_| {
                ChatError::Config(format!("GENERATION_TIMEOUT_SECS is not a number: {}", secs))
            })?),
            None => DEFAULT_TIMEOUT,
        };

        Ok(Self {
            database_path: get("FREDOMETER_DB")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("fredometer.db")),
            schema_path: get("FREDOMETER_SCHEMA").map(PathBuf::from),
            provider,
            api_key: get("GENERATION_API_KEY").or_else(|| get(provider_key)),
            model: get("GENERATION_MODEL").unwrap_or_else(|| provider.default_model().to_string()),
            base_url: get("GENERATION_BASE_URL")
                .unwrap_or_else(|| provider.default_base_url().to_string()),
            timeout,
            conversation_log: get("CONVERSATION_LOG").map(PathBuf::from),
            error_log: get("ERROR_LOG").map(PathBuf::from),
            server_addr: get("SERVER_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
        })
    }

    pub fn load_registry(&self) -> Result<SchemaRegistry> {
        match &self.schema_path {
            Some(path) => SchemaRegistry::from_json_file(path),
            None => Ok(SchemaRegistry::standard()),
        }
    }

    pub fn generation_client(&self) -> Result<Box<dyn GenerationService>> {
        let api_key = self
            .api_key
            .clone()
            .ok_or_else(|| ChatError::Config("API key missing".to_string()))?;
        build_client(
            self.provider,
            api_key,
            self.model.clone(),
            self.base_url.clone(),
            self.timeout,
        )
    }
}
