//! Database module
//!
//! The query-execution capability handed to the classifier and the retrieval
//! executor, plus the SQLite implementation, table seeding and the FAQ store.

pub mod faq_repo;
pub mod ingest;
pub mod sqlite;

pub use faq_repo::{FaqEntry, FaqRepository};
pub use sqlite::SqliteExecutor;

use crate::error::Result;
use crate::predicate::RenderedQuery;
use crate::schema::ColumnDef;
use serde::Serialize;
use std::fmt;

/// A single stored value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Text(String),
    Integer(i64),
    Null,
}

impl CellValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            CellValue::Integer(v) => Some(*v),
            CellValue::Text(s) => s.trim().parse().ok(),
            CellValue::Null => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => write!(f, "{}", s),
            CellValue::Integer(v) => write!(f, "{}", v),
            CellValue::Null => write!(f, "N/A"),
        }
    }
}

/// One result row, columns in select-list order.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Row {
    values: Vec<(String, CellValue)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: &str, value: CellValue) -> Self {
        self.push(column, value);
        self
    }

    pub fn push(&mut self, column: &str, value: CellValue) {
        self.values.push((column.to_string(), value));
    }

    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.values
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn integer(&self, column: &str) -> Option<i64> {
        self.get(column).and_then(CellValue::as_i64)
    }

    pub fn text(&self, column: &str) -> Option<&str> {
        self.get(column).and_then(CellValue::as_text)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CellValue)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }
}

/// Read-only, parameterized lookups against the statistics store.
///
/// Implementations must bind every parameter of the rendered query and never
/// splice values into SQL text.
pub trait QueryExecutor {
    /// Run a select and decode each row against `columns` (select-list order).
    fn fetch_rows(&self, query: &RenderedQuery, columns: &[ColumnDef]) -> Result<Vec<Row>>;

    /// Run a point probe; true when at least one row comes back.
    fn exists(&self, query: &RenderedQuery) -> Result<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_lookup() {
        let row = Row::new()
            .with("State", CellValue::Text("Adamawa".into()))
            .with("IDP_Girls", CellValue::Integer(12))
            .with("IDP_Boys", CellValue::Null);
        assert_eq!(row.text("State"), Some("Adamawa"));
        assert_eq!(row.integer("IDP_Girls"), Some(12));
        assert_eq!(row.integer("IDP_Boys"), None);
        assert!(row.get("Sector").is_none());
        assert_eq!(CellValue::Null.to_string(), "N/A");
    }
}
