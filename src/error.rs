use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChatError {
    /// Malformed or missing request input. Raised before any lookup runs.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Failed to prepare statement: {0}")]
    QueryPrepare(String),

    #[error("Failed to fetch data: {0}")]
    QueryExecute(String),

    #[error("Generation service returned status {status}")]
    Upstream { status: u16, body: String },

    #[error("Generation service returned no text")]
    EmptyGeneration { raw: String },

    #[error("Generation transport error: {0}")]
    Transport(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ChatError {
    /// HTTP status a request handler should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            ChatError::InvalidInput(_) => 400,
            ChatError::Upstream { status, .. } if *status >= 400 => *status,
            _ => 500,
        }
    }

    /// Short message suitable for end users.
    pub fn public_message(&self) -> &'static str {
        match self {
            ChatError::InvalidInput(_) => "Invalid request",
            ChatError::QueryPrepare(_) => "Failed to prepare statement",
            ChatError::QueryExecute(_) => "Failed to fetch data",
            ChatError::Upstream { .. } | ChatError::EmptyGeneration { .. } => {
                "Generation service error"
            }
            ChatError::Transport(_) => "Generation service unreachable",
            _ => "Internal error",
        }
    }

    /// Raw diagnostic payload for operators (upstream body or underlying error text).
    pub fn raw(&self) -> Option<&str> {
        match self {
            ChatError::Upstream { body, .. } => Some(body),
            ChatError::EmptyGeneration { raw } => Some(raw),
            ChatError::QueryPrepare(detail)
            | ChatError::QueryExecute(detail)
            | ChatError::Transport(detail) => Some(detail),
            _ => None,
        }
    }

    pub fn is_client_error(&self) -> bool {
        matches!(self, ChatError::InvalidInput(_))
    }
}

pub type Result<T> = std::result::Result<T, ChatError>;
