//! Append-only conversation log, one JSON object per line.

use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationEntry {
    pub timestamp: DateTime<Utc>,
    pub request_id: String,
    pub message: String,
    pub related: bool,
    pub response: Option<String>,
    pub error: Option<String>,
}

impl ConversationEntry {
    pub fn new(request_id: String, message: String) -> Self {
        Self {
            timestamp: Utc::now(),
            request_id,
            message,
            related: false,
            response: None,
            error: None,
        }
    }

    pub fn with_related(mut self, related: bool) -> Self {
        self.related = related;
        self
    }

    pub fn with_response(mut self, response: String) -> Self {
        self.response = Some(response);
        self
    }

    pub fn with_error(mut self, error: String) -> Self {
        self.error = Some(error);
        self
    }
}

pub struct ConversationLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl ConversationLog {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, entry: &ConversationEntry) -> Result<()> {
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');
        let mut file = self
            .file
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        file.write_all(line.as_bytes())?;
        file.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_entries_are_appended() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs/conversations.jsonl");

        let log = ConversationLog::open(&path).unwrap();
        log.append(&ConversationEntry::new("r1".into(), "hello".into()).with_response("hi".into()))
            .unwrap();
        drop(log);

        let log = ConversationLog::open(&path).unwrap();
        log.append(
            &ConversationEntry::new("r2".into(), "IDP Girls".into())
                .with_related(true)
                .with_error("Gemini API error".into()),
        )
        .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let entries: Vec<ConversationEntry> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].request_id, "r1");
        assert!(entries[1].related);
        assert_eq!(entries[1].error.as_deref(), Some("Gemini API error"));
    }
}
