//! SQLite-backed query executor.
//!
//! One executor wraps one connection. Callers open it per request; the
//! connection closes when the executor is dropped, on every exit path.

use crate::db::{CellValue, QueryExecutor, Row};
use crate::error::{ChatError, Result};
use crate::predicate::{Literal, RenderedQuery};
use crate::schema::ColumnDef;
use rusqlite::types::{ToSqlOutput, ValueRef};
use rusqlite::{params_from_iter, Connection, OpenFlags, ToSql};
use std::path::Path;
use tracing::debug;

impl ToSql for Literal {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            Literal::Text(s) => s.to_sql(),
            Literal::Integer(v) => v.to_sql(),
        }
    }
}

pub struct SqliteExecutor {
    conn: Connection,
}

impl SqliteExecutor {
    /// Open an existing database file read-only.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path.as_ref(),
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| ChatError::QueryPrepare(format!("Failed to open database: {}", e)))?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| ChatError::QueryPrepare(format!("Failed to open database: {}", e)))?;
        Ok(Self { conn })
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl QueryExecutor for SqliteExecutor {
    fn fetch_rows(&self, query: &RenderedQuery, columns: &[ColumnDef]) -> Result<Vec<Row>> {
        debug!(sql = %query.sql, types = %query.type_tags(), "fetching rows");
        let mut stmt = self
            .conn
            .prepare(&query.sql)
            .map_err(|e| ChatError::QueryPrepare(e.to_string()))?;

        let mut rows = stmt
            .query(params_from_iter(query.params.iter()))
            .map_err(|e| ChatError::QueryExecute(e.to_string()))?;

        let mut out = Vec::new();
        while let Some(row) = rows
            .next()
            .map_err(|e| ChatError::QueryExecute(e.to_string()))?
        {
            let mut decoded = Row::new();
            for (idx, column) in columns.iter().enumerate() {
                let value = row
                    .get_ref(idx)
                    .map_err(|e| ChatError::QueryExecute(e.to_string()))?;
                decoded.push(column.name(), decode(value));
            }
            out.push(decoded);
        }
        Ok(out)
    }

    fn exists(&self, query: &RenderedQuery) -> Result<bool> {
        let mut stmt = self
            .conn
            .prepare(&query.sql)
            .map_err(|e| ChatError::QueryPrepare(e.to_string()))?;
        stmt.exists(params_from_iter(query.params.iter()))
            .map_err(|e| ChatError::QueryExecute(e.to_string()))
    }
}

fn decode(value: ValueRef<'_>) -> CellValue {
    match value {
        ValueRef::Null => CellValue::Null,
        ValueRef::Integer(v) => CellValue::Integer(v),
        ValueRef::Real(v) => CellValue::Integer(v.round() as i64),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            CellValue::Text(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::render_probe;
    use crate::schema::ColumnDef;

    fn executor() -> SqliteExecutor {
        let executor = SqliteExecutor::open_in_memory().unwrap();
        executor
            .connection()
            .execute_batch(
                r#"
                CREATE TABLE t ("State" TEXT, "IDP_Girls" INTEGER, "Ratio" REAL);
                INSERT INTO t VALUES ('Adamawa', 10, 1.6), ('Borno', NULL, 2.0);
                "#,
            )
            .unwrap();
        executor
    }

    #[test]
    fn test_fetch_rows_binds_parameters() {
        let executor = executor();
        let columns = vec![
            ColumnDef::identifier("State", "State"),
            ColumnDef::integer("IDP_Girls", "IDP Girls"),
            ColumnDef::integer("Ratio", "Ratio"),
        ];
        let query = RenderedQuery {
            sql: r#"SELECT "State", "IDP_Girls", "Ratio" FROM "t" WHERE "State" = ?1 LIMIT 5"#
                .to_string(),
            params: vec![Literal::Text("Borno".into())],
        };
        let rows = executor.fetch_rows(&query, &columns).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].text("State"), Some("Borno"));
        assert_eq!(rows[0].get("IDP_Girls"), Some(&CellValue::Null));
        assert_eq!(rows[0].integer("Ratio"), Some(2));
    }

    #[test]
    fn test_exists_probe() {
        let executor = executor();
        assert!(executor.exists(&render_probe("t", "State", "Adamawa")).unwrap());
        assert!(!executor.exists(&render_probe("t", "State", "Kano")).unwrap());
    }

    #[test]
    fn test_prepare_failure_is_reported() {
        let executor = executor();
        let err = executor
            .exists(&render_probe("missing_table", "State", "Kano"))
            .unwrap_err();
        assert!(matches!(err, ChatError::QueryPrepare(_)));
    }
}
