//! Aggregator / Summarizer
//!
//! Reduces retrieved rows to what the generation step needs. By default rows
//! are summed into a handful of totals plus the sectors, locations and years
//! observed; the per-row listing is only produced when detail was asked for.

use crate::db::Row;
use crate::intent::QueryIntent;
use crate::retrieval::TableRows;
use crate::schema::{
    SchemaRegistry, TableSchema, LGA_COLUMN, SECTOR_COLUMN, STATE_COLUMN, YEAR_COLUMN,
};
use crate::vocabulary::DemographicCategory;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateSummary {
    pub table: String,
    pub label: String,
    pub row_count: usize,
    /// (label, summed value), in report order.
    pub totals: Vec<(String, i64)>,
    pub sectors: BTreeSet<String>,
    pub locations: BTreeSet<String>,
    pub years: BTreeSet<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailedListing {
    pub table: String,
    pub label: String,
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum TableSummary {
    Aggregate(AggregateSummary),
    Detailed(DetailedListing),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Summary {
    NoData,
    Tables(Vec<TableSummary>),
}

impl Summary {
    pub fn is_empty(&self) -> bool {
        matches!(self, Summary::NoData)
    }
}

/// Sum of `column` over `rows`, nulls ignored.
pub fn column_total(rows: &[Row], column: &str) -> i64 {
    rows.iter().filter_map(|r| r.integer(column)).sum()
}

/// Sum of every disaggregated column of `category` present in `table`.
/// `None` when the table carries none of them.
pub fn composite_total(
    category: DemographicCategory,
    table: &TableSchema,
    rows: &[Row],
) -> Option<i64> {
    let columns: Vec<String> = category
        .columns()
        .into_iter()
        .filter(|c| table.has_column(c))
        .collect();
    if columns.is_empty() {
        return None;
    }
    Some(columns.iter().map(|c| column_total(rows, c)).sum())
}

pub fn summarize(
    registry: &SchemaRegistry,
    message: &str,
    intent: &QueryIntent,
    results: &[TableRows],
) -> Summary {
    let summaries: Vec<TableSummary> = results
        .iter()
        .filter(|r| !r.is_empty())
        .filter_map(|r| registry.table(&r.table).map(|t| (t, r)))
        .map(|(table, result)| {
            if intent.is_detailed {
                TableSummary::Detailed(detail_table(table, result))
            } else {
                TableSummary::Aggregate(aggregate_table(table, result, message))
            }
        })
        .collect();

    if summaries.is_empty() {
        Summary::NoData
    } else {
        Summary::Tables(summaries)
    }
}

fn aggregate_table(table: &TableSchema, result: &TableRows, message: &str) -> AggregateSummary {
    let lower = message.to_lowercase();
    let rows = &result.rows;
    let measures: Vec<_> = table
        .integer_columns()
        .filter(|c| c.name() != YEAR_COLUMN)
        .collect();

    let mentioned: Vec<(String, i64)> = measures
        .iter()
        .filter(|c| lower.contains(&c.humanized()))
        .map(|c| (format!("Total {}", c.label()), column_total(rows, c.name())))
        .filter(|(_, total)| *total != 0)
        .collect();

    let totals = if !mentioned.is_empty() {
        mentioned
    } else {
        let categories: Vec<(String, i64)> = DemographicCategory::mentioned_in(message)
            .into_iter()
            .filter_map(|cat| {
                composite_total(cat, table, rows).map(|t| (format!("Total {}", cat.label()), t))
            })
            .collect();
        if !categories.is_empty() {
            categories
        } else {
            measures
                .iter()
                .map(|c| (format!("Total {}", c.label()), column_total(rows, c.name())))
                .filter(|(_, total)| *total != 0)
                .collect()
        }
    };

    let mut sectors = BTreeSet::new();
    let mut locations = BTreeSet::new();
    let mut years = BTreeSet::new();
    for row in rows {
        if let Some(sector) = row.text(SECTOR_COLUMN).filter(|s| !s.is_empty()) {
            sectors.insert(sector.to_string());
        }
        let location = match (row.text(LGA_COLUMN), row.text(STATE_COLUMN)) {
            (Some(lga), Some(state)) if !lga.is_empty() => Some(format!("{} ({})", lga, state)),
            (Some(lga), None) if !lga.is_empty() => Some(lga.to_string()),
            (_, Some(state)) if !state.is_empty() => Some(state.to_string()),
            _ => None,
        };
        if let Some(location) = location {
            locations.insert(location);
        }
        if let Some(year) = row.integer(YEAR_COLUMN) {
            years.insert(year);
        }
    }

    AggregateSummary {
        table: result.table.clone(),
        label: result.label.clone(),
        row_count: rows.len(),
        totals,
        sectors,
        locations,
        years,
    }
}

fn detail_table(table: &TableSchema, result: &TableRows) -> DetailedListing {
    let lines = result
        .rows
        .iter()
        .map(|row| {
            let fields: Vec<String> = table
                .columns()
                .iter()
                .map(|c| {
                    let value = row
                        .get(c.name())
                        .map(ToString::to_string)
                        .unwrap_or_else(|| "N/A".to_string());
                    format!("{}: {}", c.label(), value)
                })
                .collect();
            format!("- {}", fields.join(", "))
        })
        .collect();

    DetailedListing {
        table: result.table.clone(),
        label: result.label.clone(),
        lines,
    }
}

fn join_set<T: ToString>(set: &BTreeSet<T>) -> String {
    set.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

impl fmt::Display for TableSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableSummary::Aggregate(s) => {
                writeln!(f, "{} ({}), {} matching rows:", s.label, s.table, s.row_count)?;
                if s.totals.is_empty() {
                    writeln!(f, "No non-zero totals for the requested figures.")?;
                }
                for (label, total) in &s.totals {
                    writeln!(f, "{}: {}", label, total)?;
                }
                if !s.sectors.is_empty() {
                    writeln!(f, "Sectors: {}", join_set(&s.sectors))?;
                }
                if !s.locations.is_empty() {
                    writeln!(f, "Locations: {}", join_set(&s.locations))?;
                }
                if !s.years.is_empty() {
                    writeln!(f, "Years: {}", join_set(&s.years))?;
                }
                Ok(())
            }
            TableSummary::Detailed(d) => {
                writeln!(f, "{} ({}), {} rows:", d.label, d.table, d.lines.len())?;
                for line in &d.lines {
                    writeln!(f, "{}", line)?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Summary::NoData => writeln!(
                f,
                "No specific data found for the query, but you can provide general insights."
            ),
            Summary::Tables(tables) => {
                for table in tables {
                    write!(f, "{}", table)?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::CellValue;
    use crate::schema::{BASELINE_TABLE, NEEDS_TABLE};

    fn row(lga: &str, year: i64, values: &[(&str, i64)]) -> Row {
        let mut row = Row::new()
            .with("Response_Year", CellValue::Integer(year))
            .with("State", CellValue::Text("Adamawa".into()))
            .with("LGA", CellValue::Text(lga.into()));
        for (column, value) in values {
            row.push(column, CellValue::Integer(*value));
        }
        row
    }

    fn baseline_rows(rows: Vec<Row>) -> TableRows {
        TableRows {
            table: BASELINE_TABLE.to_string(),
            label: "Baseline population".to_string(),
            rows,
        }
    }

    fn summary_of(summary: &Summary) -> &AggregateSummary {
        match summary {
            Summary::Tables(tables) => match &tables[0] {
                TableSummary::Aggregate(s) => s,
                other => panic!("expected aggregate, got {:?}", other),
            },
            Summary::NoData => panic!("expected data"),
        }
    }

    #[test]
    fn test_mentioned_column_total() {
        let registry = SchemaRegistry::standard();
        let results = vec![baseline_rows(vec![
            row("Fufore", 2023, &[("IDP_Girls", 40), ("IDP_Boys", 7)]),
            row("Yola North", 2022, &[("IDP_Girls", 60)]),
        ])];
        let summary = summarize(
            &registry,
            "How many IDP Girls in Fufore?",
            &QueryIntent::default(),
            &results,
        );
        let s = summary_of(&summary);
        assert_eq!(s.totals, vec![("Total IDP Girls".to_string(), 100)]);
        assert_eq!(s.years.len(), 2);
        assert!(s.locations.contains("Fufore (Adamawa)"));
        assert!(summary.to_string().contains("Total IDP Girls: 100"));
    }

    #[test]
    fn test_women_composite_equals_six_columns() {
        let registry = SchemaRegistry::standard();
        let women_columns = DemographicCategory::Women.columns();
        let rows: Vec<Row> = (0..3)
            .map(|i| {
                let values: Vec<(&str, i64)> = women_columns
                    .iter()
                    .enumerate()
                    .map(|(j, c)| (c.as_str(), (i * 10 + j) as i64))
                    .chain([("IDP_Men", 1000)])
                    .collect();
                row("Bama", 2021, &values)
            })
            .collect();
        let expected: i64 = women_columns.iter().map(|c| column_total(&rows, c)).sum();

        let results = vec![baseline_rows(rows)];
        let summary = summarize(&registry, "number of women in Bama", &QueryIntent::default(), &results);
        let s = summary_of(&summary);
        assert_eq!(s.totals, vec![("Total Women".to_string(), expected)]);
    }

    #[test]
    fn test_all_nonzero_totals_when_nothing_mentioned() {
        let registry = SchemaRegistry::standard();
        let results = vec![baseline_rows(vec![row(
            "Hong",
            2020,
            &[("IDP_Boys", 3), ("Returnee_Men", 0)],
        )])];
        let summary = summarize(&registry, "Hong", &QueryIntent::default(), &results);
        let s = summary_of(&summary);
        assert_eq!(s.totals, vec![("Total IDP Boys".to_string(), 3)]);
    }

    #[test]
    fn test_detailed_mode_lists_rows() {
        let registry = SchemaRegistry::standard();
        let results = vec![
            baseline_rows(vec![row("Fufore", 2023, &[("IDP_Girls", 4)])]),
            TableRows {
                table: NEEDS_TABLE.to_string(),
                label: "People in need".to_string(),
                rows: Vec::new(),
            },
        ];
        let intent = QueryIntent {
            is_related: true,
            is_in_need: false,
            is_detailed: true,
        };
        let summary = summarize(&registry, "Fufore in detailed", &intent, &results);
        match &summary {
            Summary::Tables(tables) => {
                assert_eq!(tables.len(), 1);
                let TableSummary::Detailed(listing) = &tables[0] else {
                    panic!("expected detailed listing");
                };
                assert_eq!(listing.lines.len(), 1);
                assert!(listing.lines[0].contains("IDP Girls: 4"));
                assert!(listing.lines[0].contains("IDP Boys: N/A"));
            }
            Summary::NoData => panic!("expected data"),
        }
    }

    #[test]
    fn test_no_data_when_all_empty() {
        let registry = SchemaRegistry::standard();
        let summary = summarize(&registry, "Kano", &QueryIntent::default(), &[baseline_rows(vec![])]);
        assert!(summary.is_empty());
    }
}
