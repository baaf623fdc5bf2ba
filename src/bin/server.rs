//! HTTP server for the chat front-end
//! Simple HTTP server using tokio and basic HTTP handling

use fredometer::config::AppConfig;
use fredometer::conversation_log::ConversationLog;
use fredometer::db::{FaqRepository, SqliteExecutor};
use fredometer::logging::init_logging;
use fredometer::request::ChatRequest;
use fredometer::{ChatError, DataAssistant, SchemaRegistry};
use rusqlite::Connection;
use serde::Deserialize;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{timeout, Duration};
use tracing::{error, info, warn};

const MAX_REQUEST_BYTES: usize = 1_000_000;

struct AppState {
    config: AppConfig,
    registry: Arc<SchemaRegistry>,
    assistant: DataAssistant,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;
    init_logging(config.error_log.as_deref())?;

    let registry = Arc::new(config.load_registry()?);
    let generator = match config.generation_client() {
        Ok(client) => client,
        Err(e) => {
            error!("Cannot start without a generation client: {}", e);
            return Err(e.into());
        }
    };
    let mut assistant = DataAssistant::new(Arc::clone(&registry), generator);
    if let Some(path) = &config.conversation_log {
        assistant = assistant.with_conversation_log(ConversationLog::open(path)?);
        info!("Appending conversations to {}", path.display());
    }

    let listener = TcpListener::bind(&config.server_addr).await?;
    info!(
        "Server listening on {} (database {}, schema v{})",
        config.server_addr,
        config.database_path.display(),
        registry.version()
    );

    let state = Arc::new(AppState {
        config,
        registry,
        assistant,
    });

    loop {
        let (stream, addr) = listener.accept().await?;
        info!("New connection from: {}", addr);
        tokio::spawn(handle_connection(stream, Arc::clone(&state)));
    }
}

async fn handle_connection(mut stream: TcpStream, state: Arc<AppState>) {
    let mut buffer = Vec::new();
    let mut temp_buf = [0; 8192];

    // Read until headers plus Content-Length bytes of body have arrived.
    let read_result = timeout(Duration::from_secs(5), async {
        loop {
            match stream.read(&mut temp_buf).await {
                Ok(0) => break,
                Ok(n) => {
                    buffer.extend_from_slice(&temp_buf[..n]);
                    if request_complete(&buffer) || buffer.len() > MAX_REQUEST_BYTES {
                        break;
                    }
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    })
    .await;

    match read_result {
        Err(_) => {
            warn!("Request read timeout");
            return;
        }
        Ok(Err(e)) => {
            warn!("Failed to read from stream: {}", e);
            return;
        }
        Ok(Ok(())) => {}
    }
    if buffer.is_empty() {
        return;
    }

    let response = match String::from_utf8(buffer) {
        Ok(request) => handle_request(&request, &state).await,
        Err(_) => create_response(400, "Bad Request", r#"{"error":"Invalid UTF-8"}"#),
    };
    if let Err(e) = stream.write_all(response.as_bytes()).await {
        warn!("Failed to write response: {}", e);
    }
}

/// True once the headers and `Content-Length` bytes of body are buffered.
/// Only the header block is decoded, so a non-UTF-8 body still completes.
fn request_complete(buffer: &[u8]) -> bool {
    let Some(headers_end) = buffer.windows(4).position(|w| w == b"\r\n\r\n") else {
        return false;
    };
    let headers = String::from_utf8_lossy(&buffer[..headers_end]);
    match extract_content_length(&headers) {
        Some(len) => buffer.len() >= headers_end + 4 + len,
        None => true,
    }
}

fn extract_content_length(request: &str) -> Option<usize> {
    for line in request.lines() {
        if line.to_lowercase().starts_with("content-length:") {
            if let Some(value) = line.split(':').nth(1) {
                return value.trim().parse().ok();
            }
        }
    }
    None
}

fn request_body(request: &str) -> &str {
    match request.find("\r\n\r\n") {
        Some(idx) => request[idx + 4..].trim(),
        None => "",
    }
}

async fn handle_request(request: &str, state: &AppState) -> String {
    let request_line = request.lines().next().unwrap_or_default();
    let parts: Vec<&str> = request_line.split_whitespace().collect();
    if parts.len() < 2 {
        return create_response(400, "Bad Request", "{}");
    }
    let method = parts[0];
    let path = parts[1].split('?').next().unwrap_or("/").trim_end_matches('/');

    match (method, path) {
        ("OPTIONS", _) => create_response(200, "OK", "{}"),
        ("GET", "/api/health") => {
            create_response(200, "OK", r#"{"status":"ok","service":"fredometer-assistant"}"#)
        }
        ("GET", "/api/schema") => match serde_json::to_string(state.registry.as_ref()) {
            Ok(json) => create_response(200, "OK", &json),
            Err(e) => error_response(&ChatError::from(e)),
        },
        ("POST", "/api/chat") => handle_chat(request_body(request), state).await,
        ("POST", "/api/faq") => handle_faq(request_body(request), state),
        _ => create_response(404, "Not Found", r#"{"error":"Not found"}"#),
    }
}

async fn handle_chat(body: &str, state: &AppState) -> String {
    let message = match ChatRequest::parse(body) {
        Ok(message) => message,
        Err(e) => {
            warn!("Rejected chat request: {}", e);
            return error_response(&e);
        }
    };

    let db_path = &state.config.database_path;
    match state
        .assistant
        .answer_with(&message, || SqliteExecutor::open(db_path))
        .await
    {
        Ok(answer) => {
            let body = serde_json::json!({ "response": answer.response });
            create_response(200, "OK", &body.to_string())
        }
        Err(e) => {
            error!("Chat request failed: {}", e);
            error_response(&e)
        }
    }
}

fn handle_faq(body: &str, state: &AppState) -> String {
    #[derive(Deserialize)]
    struct FaqRequest {
        question: String,
        answer: String,
    }

    let req: FaqRequest = match serde_json::from_str(body) {
        Ok(req) => req,
        Err(_) => {
            return error_response(&ChatError::InvalidInput("Invalid JSON input".to_string()))
        }
    };
    let result = Connection::open(&state.config.database_path)
        .map_err(|e| ChatError::QueryPrepare(e.to_string()))
        .and_then(FaqRepository::new)
        .and_then(|repo| repo.add(&req.question, &req.answer));

    match result {
        Ok(entry) => match serde_json::to_string(&entry) {
            Ok(json) => create_response(201, "Created", &json),
            Err(e) => error_response(&ChatError::from(e)),
        },
        Err(e) => error_response(&e),
    }
}

fn error_response(err: &ChatError) -> String {
    let status = err.status_code();
    let mut body = serde_json::json!({ "error": err.public_message() });
    if let ChatError::InvalidInput(detail) = err {
        body["error"] = serde_json::Value::String(detail.clone());
    }
    if let Some(raw) = err.raw() {
        body["raw"] = serde_json::Value::String(raw.to_string());
    }
    create_response(status, status_text(status), &body.to_string())
}

fn status_text(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        400 => "Bad Request",
        404 => "Not Found",
        429 => "Too Many Requests",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _ => "Internal Server Error",
    }
}

fn create_response(status: u16, status_text: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {} {}\r\n\
         Content-Type: application/json\r\n\
         Access-Control-Allow-Origin: *\r\n\
         Access-Control-Allow-Methods: POST, GET, OPTIONS\r\n\
         Access-Control-Allow-Headers: Content-Type\r\n\
         Content-Length: {}\r\n\
         \r\n\
         {}",
        status,
        status_text,
        body.len(),
        body
    )
}
