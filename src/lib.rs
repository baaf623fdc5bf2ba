pub mod aggregate;
pub mod config;
pub mod conversation_log;
pub mod data_assistant;
pub mod db;
pub mod error;
pub mod intent;
pub mod llm;
pub mod logging;
pub mod predicate;
pub mod prompt;
pub mod reconcile;
pub mod request;
pub mod retrieval;
pub mod schema;
pub mod vocabulary;

pub use data_assistant::{AssistantResponse, DataAssistant, PreparedQuery};
pub use error::{ChatError, Result};
pub use intent::QueryIntent;
pub use schema::SchemaRegistry;
