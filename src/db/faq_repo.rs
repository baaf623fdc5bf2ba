//! FAQ repository for curated question/answer pairs.

use crate::error::{ChatError, Result};
use chrono::Utc;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaqEntry {
    pub id: i64,
    pub question: String,
    pub answer: String,
    pub created_at: String,
}

pub struct FaqRepository {
    conn: Connection,
}

impl FaqRepository {
    pub fn new(conn: Connection) -> Result<Self> {
        let repo = Self { conn };
        repo.init_schema()?;
        Ok(repo)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn
            .execute(
                r#"
                CREATE TABLE IF NOT EXISTS faq (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    question TEXT NOT NULL,
                    answer TEXT NOT NULL,
                    created_at TEXT NOT NULL
                )
                "#,
                [],
            )
            .map_err(|e| ChatError::QueryExecute(format!("Failed to create table: {}", e)))?;
        Ok(())
    }

    /// Store a question and its answer. Both are required after trimming.
    pub fn add(&self, question: &str, answer: &str) -> Result<FaqEntry> {
        let question = question.trim();
        let answer = answer.trim();
        if question.is_empty() || answer.is_empty() {
            return Err(ChatError::InvalidInput(
                "Please fill in both question and answer".to_string(),
            ));
        }

        let created_at = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO faq (question, answer, created_at) VALUES (?1, ?2, ?3)",
                params![question, answer, created_at],
            )
            .map_err(|e| ChatError::QueryExecute(e.to_string()))?;

        let entry = FaqEntry {
            id: self.conn.last_insert_rowid(),
            question: question.to_string(),
            answer: answer.to_string(),
            created_at,
        };
        info!("Saved FAQ entry {}", entry.id);
        Ok(entry)
    }

    pub fn list(&self) -> Result<Vec<FaqEntry>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, question, answer, created_at FROM faq ORDER BY id")
            .map_err(|e| ChatError::QueryPrepare(e.to_string()))?;
        let entries = stmt
            .query_map([], |row| {
                Ok(FaqEntry {
                    id: row.get(0)?,
                    question: row.get(1)?,
                    answer: row.get(2)?,
                    created_at: row.get(3)?,
                })
            })
            .map_err(|e| ChatError::QueryExecute(e.to_string()))?;

        let collected: rusqlite::Result<Vec<FaqEntry>> = entries.collect();
        collected.map_err(|e| ChatError::QueryExecute(e.to_string()))
    }
}
