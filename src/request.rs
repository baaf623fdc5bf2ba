//! Incoming chat requests: parsing and sanitizing the message field.

use crate::error::{ChatError, Result};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;

lazy_static! {
    static ref MARKUP_TAG: Regex = Regex::new(r"<[^<>]*>").unwrap();
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
}

impl ChatRequest {
    /// Parse a JSON body and return the cleaned message.
    pub fn parse(body: &str) -> Result<String> {
        let request: ChatRequest = serde_json::from_str(body)
            .map_err(|_| ChatError::InvalidInput("Invalid JSON input".to_string()))?;
        request.message()
    }

    pub fn message(&self) -> Result<String> {
        let cleaned = self.message.as_deref().map(sanitize_message).unwrap_or_default();
        if cleaned.is_empty() {
            return Err(ChatError::InvalidInput("Missing \"message\"".to_string()));
        }
        Ok(cleaned)
    }
}

/// Trim and drop markup tags and stray angle brackets.
pub fn sanitize_message(raw: &str) -> String {
    let without_tags = MARKUP_TAG.replace_all(raw, "");
    without_tags
        .replace(['<', '>'], "")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_message() {
        let message = ChatRequest::parse(r#"{"message": "  How many IDP Girls in Fufore?  "}"#).unwrap();
        assert_eq!(message, "How many IDP Girls in Fufore?");
    }

    #[test]
    fn test_invalid_json() {
        let err = ChatRequest::parse("{not json").unwrap_err();
        assert!(err.is_client_error());
        assert_eq!(err.to_string(), "Invalid input: Invalid JSON input");
    }

    #[test]
    fn test_missing_or_blank_message() {
        assert!(ChatRequest::parse(r#"{}"#).unwrap_err().is_client_error());
        assert!(ChatRequest::parse(r#"{"message": "   "}"#).unwrap_err().is_client_error());
        assert!(ChatRequest::parse(r#"{"message": "<b></b>"}"#).unwrap_err().is_client_error());
    }

    #[test]
    fn test_sanitize_strips_markup() {
        assert_eq!(sanitize_message("<script>alert(1)</script> Borno"), "alert(1) Borno");
        assert_eq!(sanitize_message("IDP > 100 in Yobe"), "IDP  100 in Yobe");
    }
}
