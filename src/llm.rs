//! Generation service clients.
//!
//! The generation step is an opaque text-in/text-out call bounded by a
//! timeout. A non-success status or an empty completion fails the request
//! and carries the raw upstream body for diagnostics.

use crate::error::{ChatError, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{info, warn};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[async_trait]
pub trait GenerationService: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Which wire format to speak.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Gemini,
    OpenAi,
}

impl std::str::FromStr for Provider {
    type Err = ChatError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "gemini" | "google" => Ok(Provider::Gemini),
            "openai" => Ok(Provider::OpenAi),
            other => Err(ChatError::Config(format!("unknown generation provider '{}'", other))),
        }
    }
}

impl Provider {
    pub fn default_model(&self) -> &'static str {
        match self {
            Provider::Gemini => "gemini-1.5-flash",
            Provider::OpenAi => "gpt-4o-mini",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Provider::Gemini => "https://generativelanguage.googleapis.com/v1beta",
            Provider::OpenAi => "https://api.openai.com/v1",
        }
    }
}

fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ChatError::Config(format!("Failed to build HTTP client: {}", e)))
}

/// Send the request, returning (status, body). Transport failures and
/// timeouts are reported without retry.
async fn send(request: reqwest::RequestBuilder) -> Result<(u16, String)> {
    let response = request
        .send()
        .await
        .map_err(|e| ChatError::Transport(format!("Generation call failed: {}", e)))?;
    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .map_err(|e| ChatError::Transport(format!("Failed to read generation response: {}", e)))?;
    Ok((status, body))
}

/// Pull the text out of a response body, or fail with the raw body attached.
fn extract_text(status: u16, body: String, pointer: &str) -> Result<String> {
    if status != 200 {
        warn!("Generation service error: status {}, body: {}", status, body);
        return Err(ChatError::Upstream { status, body });
    }
    let parsed: serde_json::Value = match serde_json::from_str(&body) {
        Ok(value) => value,
        Err(_) => return Err(ChatError::EmptyGeneration { raw: body }),
    };
    match parsed.pointer(pointer).and_then(|v| v.as_str()).map(str::trim) {
        Some(text) if !text.is_empty() => Ok(text.to_string()),
        _ => Err(ChatError::EmptyGeneration { raw: body }),
    }
}

pub struct GeminiClient {
    api_key: String,
    base_url: String,
    model: String,
    http: reqwest::Client,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String, base_url: String, timeout: Duration) -> Result<Self> {
        Ok(Self {
            api_key,
            base_url,
            model,
            http: http_client(timeout)?,
        })
    }
}

#[async_trait]
impl GenerationService for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "contents": [
                {"role": "user", "parts": [{"text": prompt}]}
            ]
        });
        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        );
        info!("Calling generation model {}", self.model);
        let request = self
            .http
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body);
        let (status, body) = send(request).await?;
        extract_text(status, body, "/candidates/0/content/parts/0/text")
    }
}

pub struct OpenAiClient {
    api_key: String,
    base_url: String,
    model: String,
    http: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(api_key: String, model: String, base_url: String, timeout: Duration) -> Result<Self> {
        Ok(Self {
            api_key,
            base_url,
            model,
            http: http_client(timeout)?,
        })
    }
}

#[async_trait]
impl GenerationService for OpenAiClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "user", "content": prompt}
            ],
            "temperature": 0.3,
        });
        info!("Calling generation model {}", self.model);
        let request = self
            .http
            .post(format!("{}/chat/completions", self.base_url.trim_end_matches('/')))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body);
        let (status, body) = send(request).await?;
        extract_text(status, body, "/choices/0/message/content")
    }
}

/// Build the configured client behind the trait object.
pub fn build_client(
    provider: Provider,
    api_key: String,
    model: String,
    base_url: String,
    timeout: Duration,
) -> Result<Box<dyn GenerationService>> {
    if api_key.trim().is_empty() {
        return Err(ChatError::Config("API key missing".to_string()));
    }
    Ok(match provider {
        Provider::Gemini => Box::new(GeminiClient::new(api_key, model, base_url, timeout)?),
        Provider::OpenAi => Box::new(OpenAiClient::new(api_key, model, base_url, timeout)?),
    })
}
