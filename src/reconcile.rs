//! Cross-Table Reconciler
//!
//! The same code or name can exist in several tables with different meanings
//! (population, needs, severity). When the literal message matched an
//! identifying column in two or more non-empty result sets, a note is raised
//! so the answer does not conflate them.

use crate::retrieval::TableRows;
use crate::schema::SchemaRegistry;
use itertools::Itertools;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrossTableNote {
    pub value: String,
    pub column: String,
    pub tables: Vec<String>,
}

impl fmt::Display for CrossTableNote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "The value '{}' in column {} appears in tables {}. These tables hold different measures for the same identifier; keep their figures separate.",
            self.value,
            self.column,
            self.tables.join(", ")
        )
    }
}

pub fn reconcile(
    registry: &SchemaRegistry,
    message: &str,
    results: &[TableRows],
) -> Vec<CrossTableNote> {
    let non_empty: Vec<&TableRows> = results.iter().filter(|r| !r.is_empty()).collect();
    if non_empty.len() < 2 {
        return Vec::new();
    }
    let value = message.trim();

    let identifier_columns: Vec<&str> = registry
        .tables()
        .iter()
        .flat_map(|t| t.identifier_columns())
        .map(|c| c.name())
        .unique()
        .collect();

    let mut notes = Vec::new();
    for column in identifier_columns {
        let tables: Vec<String> = non_empty
            .iter()
            .filter(|result| {
                registry
                    .table(&result.table)
                    .map_or(false, |t| t.has_column(column))
            })
            .filter(|result| {
                result
                    .rows
                    .iter()
                    .any(|row| row.text(column).map_or(false, |v| v.eq_ignore_ascii_case(value)))
            })
            .map(|result| result.table.clone())
            .collect();

        if tables.len() >= 2 {
            notes.push(CrossTableNote {
                value: value.to_string(),
                column: column.to_string(),
                tables,
            });
        }
    }
    notes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{CellValue, Row};
    use crate::schema::{BASELINE_TABLE, NEEDS_TABLE, SEVERITY_TABLE};

    fn rows(table: &str, lga_code: &str) -> TableRows {
        TableRows {
            table: table.to_string(),
            label: table.to_string(),
            rows: vec![Row::new()
                .with("LGA_Pcode", CellValue::Text(lga_code.to_string()))
                .with("State", CellValue::Text("Adamawa".into()))],
        }
    }

    #[test]
    fn test_note_when_value_shared_across_tables() {
        let registry = SchemaRegistry::standard();
        let results = vec![
            rows(BASELINE_TABLE, "NG002016"),
            rows(NEEDS_TABLE, "NG002016"),
            rows(SEVERITY_TABLE, "NG002099"),
        ];
        let notes = reconcile(&registry, "NG002016", &results);
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].column, "LGA_Pcode");
        assert_eq!(notes[0].tables, vec![BASELINE_TABLE, NEEDS_TABLE]);
        assert!(notes[0].to_string().contains("NG002016"));
    }

    #[test]
    fn test_lowercase_identifier_still_matches() {
        let registry = SchemaRegistry::standard();
        let results = vec![rows(BASELINE_TABLE, "NG002016"), rows(SEVERITY_TABLE, "NG002016")];
        let notes = reconcile(&registry, " ng002016 ", &results);
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].tables, vec![BASELINE_TABLE, SEVERITY_TABLE]);
    }

    #[test]
    fn test_no_note_for_single_table() {
        let registry = SchemaRegistry::standard();
        let results = vec![
            rows(BASELINE_TABLE, "NG002016"),
            TableRows {
                table: NEEDS_TABLE.to_string(),
                label: String::new(),
                rows: Vec::new(),
            },
        ];
        assert!(reconcile(&registry, "NG002016", &results).is_empty());
    }

    #[test]
    fn test_no_note_when_message_is_not_a_value() {
        let registry = SchemaRegistry::standard();
        let results = vec![rows(BASELINE_TABLE, "NG002016"), rows(NEEDS_TABLE, "NG002016")];
        assert!(reconcile(&registry, "How many IDP Girls in Adamawa?", &results).is_empty());
    }
}
