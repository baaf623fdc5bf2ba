//! Table creation and CSV seeding for the statistics store.

use crate::error::{ChatError, Result};
use crate::predicate::{quote_ident, Literal};
use crate::schema::{ColumnDef, SchemaRegistry, SemanticType, TableSchema};
use rusqlite::types::Null;
use rusqlite::{Connection, ToSql};
use std::io::Read;
use tracing::{info, warn};

/// Create every registry table that does not exist yet.
pub fn create_tables(conn: &Connection, registry: &SchemaRegistry) -> Result<()> {
    for table in registry.tables() {
        conn.execute(&create_table_sql(table), [])
            .map_err(|e| ChatError::QueryExecute(format!("Failed to create table: {}", e)))?;
    }
    Ok(())
}

fn create_table_sql(table: &TableSchema) -> String {
    let columns: Vec<String> = table
        .columns()
        .iter()
        .map(|c| {
            // Text compares case-insensitively, like the lookups users type.
            let ty = match c.semantic_type() {
                SemanticType::Integer => "INTEGER",
                SemanticType::Text => "TEXT COLLATE NOCASE",
            };
            let null = if c.nullable() { "" } else { " NOT NULL" };
            format!("{} {}{}", quote_ident(c.name()), ty, null)
        })
        .collect();
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        quote_ident(table.name()),
        columns.join(", ")
    )
}

/// Load CSV rows into `table`. Headers are matched to column names
/// case-insensitively; unknown headers are ignored, missing columns stay NULL.
/// Returns the number of inserted rows.
pub fn load_csv<R: Read>(conn: &mut Connection, table: &TableSchema, reader: R) -> Result<usize> {
    let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let headers = csv_reader.headers()?.clone();

    let mut mapping: Vec<(usize, &ColumnDef)> = Vec::new();
    for (idx, header) in headers.iter().enumerate() {
        match table.columns().iter().find(|c| c.name().eq_ignore_ascii_case(header)) {
            Some(column) => mapping.push((idx, column)),
            None => warn!("Ignoring unknown column '{}' for table {}", header, table.name()),
        }
    }
    if mapping.is_empty() {
        return Err(ChatError::InvalidInput(format!(
            "CSV has no columns of table {}",
            table.name()
        )));
    }

    let column_list: Vec<String> = mapping.iter().map(|(_, c)| quote_ident(c.name())).collect();
    let placeholders: Vec<String> = (1..=mapping.len()).map(|i| format!("?{}", i)).collect();
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(table.name()),
        column_list.join(", "),
        placeholders.join(", ")
    );

    let tx = conn
        .transaction()
        .map_err(|e| ChatError::QueryExecute(e.to_string()))?;
    let mut inserted = 0;
    {
        let mut stmt = tx
            .prepare(&sql)
            .map_err(|e| ChatError::QueryPrepare(e.to_string()))?;
        for (line, record) in csv_reader.records().enumerate() {
            let record = record?;
            let mut values: Vec<Option<Literal>> = Vec::with_capacity(mapping.len());
            for (idx, column) in &mapping {
                let raw = record.get(*idx).unwrap_or("");
                values.push(parse_cell(raw, column).map_err(|msg| {
                    ChatError::InvalidInput(format!("row {}: {}", line + 2, msg))
                })?);
            }
            let params: Vec<&dyn ToSql> = values
                .iter()
                .map(|v| match v {
                    Some(lit) => lit as &dyn ToSql,
                    None => &Null as &dyn ToSql,
                })
                .collect();
            stmt.execute(params.as_slice())
                .map_err(|e| ChatError::QueryExecute(e.to_string()))?;
            inserted += 1;
        }
    }
    tx.commit()
        .map_err(|e| ChatError::QueryExecute(e.to_string()))?;

    info!("Loaded {} rows into {}", inserted, table.name());
    Ok(inserted)
}

fn parse_cell(raw: &str, column: &ColumnDef) -> std::result::Result<Option<Literal>, String> {
    if raw.is_empty() {
        return Ok(None);
    }
    match column.semantic_type() {
        SemanticType::Text => Ok(Some(Literal::Text(raw.to_string()))),
        SemanticType::Integer => {
            let cleaned = raw.replace(',', "");
            cleaned
                .parse::<i64>()
                .map(|v| Some(Literal::Integer(v)))
                .map_err(|_| format!("'{}' is not an integer for {}", raw, column.name()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{TableKind, BASELINE_TABLE};

    #[test]
    fn test_create_and_load() {
        let registry = SchemaRegistry::standard();
        let mut conn = Connection::open_in_memory().unwrap();
        create_tables(&conn, &registry).unwrap();

        let csv = "Response_Year,State,LGA,IDP_Girls,Unknown\n2023,Adamawa,Fufore,\"1,200\",x\n2022,Borno,Bama,,y\n";
        let table = registry.table(BASELINE_TABLE).unwrap();
        let inserted = load_csv(&mut conn, table, csv.as_bytes()).unwrap();
        assert_eq!(inserted, 2);

        let girls: i64 = conn
            .query_row(
                "SELECT IDP_Girls FROM baselinedata WHERE LGA = 'Fufore'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(girls, 1200);
        let nulls: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM baselinedata WHERE IDP_Girls IS NULL",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(nulls, 1);
    }

    #[test]
    fn test_text_lookups_ignore_case() {
        let registry = SchemaRegistry::standard();
        let mut conn = Connection::open_in_memory().unwrap();
        create_tables(&conn, &registry).unwrap();
        let table = registry.table(BASELINE_TABLE).unwrap();
        let csv = "Response_Year,State,LGA,LGA_Pcode\n2023,Adamawa,Fufore,NG002005\n";
        load_csv(&mut conn, table, csv.as_bytes()).unwrap();

        let matches: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM baselinedata WHERE LGA = ?1 OR LGA_Pcode = ?2",
                ["fufore", "ng002005"],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(matches, 1);
    }

    #[test]
    fn test_identifiers_with_quotes_are_escaped() {
        let table = TableSchema::new(
            "odd\"table",
            "Odd",
            TableKind::Baseline,
            "",
            vec![
                ColumnDef::integer("Response_Year", "Year"),
                ColumnDef::identifier("LGA \"name\"", "LGA"),
            ],
        );
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute(&create_table_sql(&table), []).unwrap();
        let csv = "Response_Year,\"LGA \"\"name\"\"\"\n2023,Fufore\n";
        assert_eq!(load_csv(&mut conn, &table, csv.as_bytes()).unwrap(), 1);

        let lga: String = conn
            .query_row(r#"SELECT "LGA ""name""" FROM "odd""table""#, [], |row| row.get(0))
            .unwrap();
        assert_eq!(lga, "Fufore");
    }

    #[test]
    fn test_bad_integer_is_rejected() {
        let registry = SchemaRegistry::standard();
        let mut conn = Connection::open_in_memory().unwrap();
        create_tables(&conn, &registry).unwrap();
        let table = registry.table(BASELINE_TABLE).unwrap();
        let err = load_csv(&mut conn, table, "Response_Year,IDP_Girls\n2023,many\n".as_bytes())
            .unwrap_err();
        assert!(matches!(err, ChatError::InvalidInput(_)));
    }
}
