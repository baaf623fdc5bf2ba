//! Retrieval Executor
//!
//! Runs the rendered predicate set for one table through the injected
//! executor. Lookups are bounded: no table ever yields more than
//! `MAX_ROWS_PER_TABLE` rows per request.

use crate::db::{QueryExecutor, Row};
use crate::error::Result;
use crate::predicate::{build_predicates, PredicateSet};
use crate::schema::TableSchema;
use serde::Serialize;
use tracing::{error, info};

pub const MAX_ROWS_PER_TABLE: usize = 5;

/// Rows returned for one table.
#[derive(Debug, Clone, Serialize)]
pub struct TableRows {
    pub table: String,
    pub label: String,
    pub rows: Vec<Row>,
}

impl TableRows {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Execute one table's lookup. Any prepare or execution failure is fatal.
pub fn retrieve(
    executor: &dyn QueryExecutor,
    table: &TableSchema,
    predicates: &PredicateSet,
) -> Result<TableRows> {
    let query = predicates.render(table, MAX_ROWS_PER_TABLE);
    let mut rows = executor.fetch_rows(&query, table.columns()).map_err(|e| {
        error!("Lookup on {} failed: {}", table.name(), e);
        e
    })?;
    rows.truncate(MAX_ROWS_PER_TABLE);

    info!(
        "Retrieved {} rows from {} ({} conditions)",
        rows.len(),
        table.name(),
        predicates.conditions().len()
    );
    Ok(TableRows {
        table: table.name().to_string(),
        label: table.label().to_string(),
        rows,
    })
}

/// Build predicates for each table and retrieve them in order, stopping at
/// the first failure.
pub fn retrieve_all(
    executor: &dyn QueryExecutor,
    message: &str,
    tables: &[&TableSchema],
) -> Result<Vec<TableRows>> {
    tables
        .iter()
        .map(|table| {
            let predicates = build_predicates(message, table);
            retrieve(executor, table, &predicates)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{CellValue, SqliteExecutor};
    use crate::error::ChatError;
    use crate::predicate::{Literal, Predicate, RenderedQuery};
    use crate::schema::{ColumnDef, SchemaRegistry, BASELINE_TABLE};

    fn seeded() -> SqliteExecutor {
        let executor = SqliteExecutor::open_in_memory().unwrap();
        crate::db::ingest::create_tables(executor.connection(), &SchemaRegistry::standard()).unwrap();
        for i in 0..8 {
            executor
                .connection()
                .execute(
                    "INSERT INTO baselinedata (Response_Year, State, LGA, IDP_Girls) VALUES (?1, 'Adamawa', ?2, ?3)",
                    rusqlite::params![2020 + i, format!("LGA{}", i), i],
                )
                .unwrap();
        }
        executor
    }

    #[test]
    fn test_unfiltered_lookup_is_capped() {
        let registry = SchemaRegistry::standard();
        let table = registry.table(BASELINE_TABLE).unwrap();
        let result = retrieve(&seeded(), table, &PredicateSet::new(BASELINE_TABLE)).unwrap();
        assert_eq!(result.rows.len(), MAX_ROWS_PER_TABLE);
    }

    #[test]
    fn test_or_combined_conditions() {
        let registry = SchemaRegistry::standard();
        let table = registry.table(BASELINE_TABLE).unwrap();
        let mut set = PredicateSet::new(BASELINE_TABLE);
        set.push(Predicate::equals("Response_Year", Literal::Integer(2021)));
        set.push(Predicate::equals("LGA", Literal::Text("LGA5".into())));
        let result = retrieve(&seeded(), table, &set).unwrap();
        assert_eq!(result.rows.len(), 2);
        assert!(result
            .rows
            .iter()
            .any(|r| r.get("LGA") == Some(&CellValue::Text("LGA5".into()))));
    }

    struct FailingExecutor;

    impl QueryExecutor for FailingExecutor {
        fn fetch_rows(&self, _query: &RenderedQuery, _columns: &[ColumnDef]) -> Result<Vec<Row>> {
            Err(ChatError::QueryExecute("connection lost".into()))
        }

        fn exists(&self, _query: &RenderedQuery) -> Result<bool> {
            Ok(false)
        }
    }

    #[test]
    fn test_failure_aborts_retrieval() {
        let registry = SchemaRegistry::standard();
        let tables: Vec<&TableSchema> = registry.tables().iter().collect();
        let err = retrieve_all(&FailingExecutor, "Borno", &tables).unwrap_err();
        assert!(matches!(err, ChatError::QueryExecute(_)));
    }
}
