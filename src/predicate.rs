//! Predicate Builder
//!
//! Derives filter conditions for one table from free text and renders them
//! into a parameterized query. Conditions form a flat predicate tree that is
//! OR-combined: a row is returned when it matches any plausible filter.
//! Values only ever travel as bound parameters.

use crate::schema::{
    SemanticType, TableSchema, LGA_COLUMN, STATE_COLUMN, YEAR_COLUMN,
};
use crate::vocabulary::{find_location, find_year};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ValueKind {
    Text,
    Integer,
}

impl ValueKind {
    /// Bind-type tag, `s` for strings and `i` for integers.
    pub fn tag(&self) -> char {
        match self {
            ValueKind::Text => 's',
            ValueKind::Integer => 'i',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Literal {
    Text(String),
    Integer(i64),
}

impl Literal {
    pub fn kind(&self) -> ValueKind {
        match self {
            Literal::Text(_) => ValueKind::Text,
            Literal::Integer(_) => ValueKind::Integer,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Text(s) => write!(f, "'{}'", s),
            Literal::Integer(v) => write!(f, "{}", v),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Predicate {
    Equals { column: String, value: Literal },
    /// Column is present and non-trivial (non-zero, or non-empty for text).
    NonZero { column: String },
}

impl Predicate {
    pub fn equals(column: &str, value: Literal) -> Self {
        Predicate::Equals {
            column: column.to_string(),
            value,
        }
    }

    pub fn non_zero(column: &str) -> Self {
        Predicate::NonZero {
            column: column.to_string(),
        }
    }

    pub fn column(&self) -> &str {
        match self {
            Predicate::Equals { column, .. } | Predicate::NonZero { column } => column,
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Equals { column, value } => write!(f, "{} = {}", column, value),
            Predicate::NonZero { column } => write!(f, "{} IS NOT NULL AND {} != 0", column, column),
        }
    }
}

/// OR-combined conditions for one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PredicateSet {
    table: String,
    conditions: Vec<Predicate>,
}

impl PredicateSet {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            conditions: Vec::new(),
        }
    }

    pub fn push(&mut self, predicate: Predicate) {
        if !self.conditions.contains(&predicate) {
            self.conditions.push(predicate);
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn conditions(&self) -> &[Predicate] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn contains(&self, predicate: &Predicate) -> bool {
        self.conditions.contains(predicate)
    }

    /// Render `SELECT <columns> FROM <table> [WHERE c1 OR c2 ...] LIMIT <limit>`.
    ///
    /// Conditions on columns the table does not have are dropped.
    pub fn render(&self, table: &TableSchema, limit: usize) -> RenderedQuery {
        let select_list: Vec<String> = table.columns().iter().map(|c| quote_ident(c.name())).collect();
        let mut sql = format!(
            "SELECT {} FROM {}",
            select_list.join(", "),
            quote_ident(table.name())
        );
        let mut params = Vec::new();
        let mut clauses = Vec::new();

        for predicate in &self.conditions {
            let Some(column) = table.column(predicate.column()) else {
                continue;
            };
            let ident = quote_ident(column.name());
            match predicate {
                Predicate::Equals { value, .. } => {
                    params.push(value.clone());
                    clauses.push(format!("{} = ?{}", ident, params.len()));
                }
                Predicate::NonZero { .. } => {
                    let clause = match column.semantic_type() {
                        SemanticType::Integer => {
                            format!("({} IS NOT NULL AND {} != 0)", ident, ident)
                        }
                        SemanticType::Text => {
                            format!("({} IS NOT NULL AND {} != '')", ident, ident)
                        }
                    };
                    clauses.push(clause);
                }
            }
        }

        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" OR "));
        }
        sql.push_str(&format!(" LIMIT {}", limit));

        RenderedQuery { sql, params }
    }
}

/// SQL text plus the values bound to its `?N` placeholders, in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedQuery {
    pub sql: String,
    pub params: Vec<Literal>,
}

impl RenderedQuery {
    pub fn kinds(&self) -> Vec<ValueKind> {
        self.params.iter().map(Literal::kind).collect()
    }

    /// Compact bind-type string, e.g. `"ssi"`.
    pub fn type_tags(&self) -> String {
        self.params.iter().map(|p| p.kind().tag()).collect()
    }
}

/// `SELECT 1 FROM <table> WHERE <column> = ?1 LIMIT 1`
pub fn render_probe(table: &str, column: &str, value: &str) -> RenderedQuery {
    RenderedQuery {
        sql: format!(
            "SELECT 1 FROM {} WHERE {} = ?1 LIMIT 1",
            quote_ident(table),
            quote_ident(column)
        ),
        params: vec![Literal::Text(value.to_string())],
    }
}

pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Derive the filter conditions for `table` from `message`.
///
/// Rules are additive. Rules that reference a column the table lacks are
/// skipped, so the same message yields different sets per table.
pub fn build_predicates(message: &str, table: &TableSchema) -> PredicateSet {
    let mut set = PredicateSet::new(table.name());
    let lower = message.to_lowercase();

    if let Some(location) = find_location(message) {
        for column in [STATE_COLUMN, LGA_COLUMN] {
            if table.has_column(column) {
                set.push(Predicate::equals(column, Literal::Text(location.to_string())));
            }
        }
    }

    if let Some(year) = find_year(message) {
        if table.has_column(YEAR_COLUMN) {
            set.push(Predicate::equals(YEAR_COLUMN, Literal::Integer(year)));
        }
    }

    for column in table.columns() {
        if lower.contains(&column.humanized()) {
            set.push(Predicate::non_zero(column.name()));
        }
    }

    // The whole message may itself be an identifier, e.g. a bare LGA code.
    let trimmed = message.trim();
    if !trimmed.is_empty() {
        for column in table.identifier_columns() {
            set.push(Predicate::equals(column.name(), Literal::Text(trimmed.to_string())));
        }
    }

    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{SchemaRegistry, BASELINE_TABLE, NEEDS_TABLE, SECTOR_COLUMN, SEVERITY_TABLE};

    fn registry() -> SchemaRegistry {
        SchemaRegistry::standard()
    }

    #[test]
    fn test_location_and_column_rules() {
        let registry = registry();
        let baseline = registry.table(BASELINE_TABLE).unwrap();
        let set = build_predicates("How many IDP Girls in Fufore?", baseline);

        assert!(set.contains(&Predicate::equals("State", Literal::Text("Fufore".into()))));
        assert!(set.contains(&Predicate::equals("LGA", Literal::Text("Fufore".into()))));
        assert!(set.contains(&Predicate::non_zero("IDP_Girls")));
        assert!(!set.contains(&Predicate::non_zero("IDP_Boys")));
    }

    #[test]
    fn test_year_is_bound_as_integer() {
        let registry = registry();
        let severity = registry.table(SEVERITY_TABLE).unwrap();
        let set = build_predicates("final severity for 2022", severity);
        assert!(set.contains(&Predicate::equals(YEAR_COLUMN, Literal::Integer(2022))));
        assert!(set.contains(&Predicate::non_zero("Final_Severity")));

        let query = set.render(severity, 5);
        assert!(query.kinds().contains(&ValueKind::Integer));
    }

    #[test]
    fn test_baseline_never_references_sector() {
        let registry = registry();
        let baseline = registry.table(BASELINE_TABLE).unwrap();
        let set = build_predicates("Health sector", baseline);
        assert!(set.conditions().iter().all(|p| p.column() != SECTOR_COLUMN));

        let needs = registry.table(NEEDS_TABLE).unwrap();
        let set = build_predicates("Health", needs);
        assert!(set.contains(&Predicate::equals(SECTOR_COLUMN, Literal::Text("Health".into()))));
    }

    #[test]
    fn test_sector_is_not_extracted_from_free_text() {
        let registry = registry();
        let needs = registry.table(NEEDS_TABLE).unwrap();
        let set = build_predicates("Women in need in Health sector", needs);
        assert!(!set.contains(&Predicate::equals(SECTOR_COLUMN, Literal::Text("Health".into()))));
        assert!(set.contains(&Predicate::equals(
            SECTOR_COLUMN,
            Literal::Text("Women in need in Health sector".into())
        )));
    }

    #[test]
    fn test_render_uses_placeholders_only() {
        let registry = registry();
        let baseline = registry.table(BASELINE_TABLE).unwrap();
        let message = "Fufore'; DROP TABLE baselinedata; --";
        let query = build_predicates(message, baseline).render(baseline, 5);

        assert!(!query.sql.contains("DROP TABLE"));
        assert!(query.sql.ends_with("LIMIT 5"));
        assert!(query.sql.contains("\"State\" = ?1 OR \"LGA\" = ?2"));
        assert_eq!(query.params.len(), query.sql.matches('?').count());
        assert!(query.params.contains(&Literal::Text(message.to_string())));
    }

    #[test]
    fn test_empty_set_renders_unfiltered_preview() {
        let registry = registry();
        let severity = registry.table(SEVERITY_TABLE).unwrap();
        let query = PredicateSet::new(SEVERITY_TABLE).render(severity, 5);
        assert!(!query.sql.contains("WHERE"));
        assert!(query.params.is_empty());
    }

    #[test]
    fn test_builder_is_deterministic() {
        let registry = registry();
        let needs = registry.table(NEEDS_TABLE).unwrap();
        let message = "Returnee Women in Bama 2021";
        assert_eq!(build_predicates(message, needs), build_predicates(message, needs));
    }

    #[test]
    fn test_type_tags_follow_params() {
        let registry = registry();
        let baseline = registry.table(BASELINE_TABLE).unwrap();
        let query = build_predicates("Borno 2020", baseline).render(baseline, 5);
        assert!(query.type_tags().starts_with("ssi"));
    }
}
