//! Schema Registry
//!
//! Static description of the statistics tables: their columns, the semantic
//! type of each column and the human label used when rendering summaries.
//! One registry replaces the per-endpoint table lists; it is built once at
//! startup and shared read-only.

use crate::error::{ChatError, Result};
use crate::intent::QueryIntent;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Revision of the built-in table set.
pub const SCHEMA_VERSION: u32 = 3;

pub const BASELINE_TABLE: &str = "baselinedata";
pub const NEEDS_TABLE: &str = "peopleinneed";
pub const SEVERITY_TABLE: &str = "severitydata";

pub const YEAR_COLUMN: &str = "Response_Year";
pub const STATE_COLUMN: &str = "State";
pub const LGA_COLUMN: &str = "LGA";
pub const SECTOR_COLUMN: &str = "Sector";

/// Displacement statuses crossed with demographic groups give the
/// disaggregated count columns shared by the baseline and needs tables.
pub const DISPLACEMENT_STATUSES: [&str; 3] = ["IDP", "Returnee", "Host_Community"];
pub const DEMOGRAPHIC_GROUPS: [&str; 6] = [
    "Girls",
    "Boys",
    "Women",
    "Men",
    "Elderly_Women",
    "Elderly_Men",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SemanticType {
    Integer,
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    name: String,
    semantic_type: SemanticType,
    label: String,
    #[serde(default = "default_nullable")]
    nullable: bool,
    /// Free-text identifying column (location names, codes, sector).
    #[serde(default)]
    identifier: bool,
}

fn default_nullable() -> bool {
    true
}

impl ColumnDef {
    pub fn integer(name: &str, label: &str) -> Self {
        Self {
            name: name.to_string(),
            semantic_type: SemanticType::Integer,
            label: label.to_string(),
            nullable: true,
            identifier: false,
        }
    }

    pub fn identifier(name: &str, label: &str) -> Self {
        Self {
            name: name.to_string(),
            semantic_type: SemanticType::Text,
            label: label.to_string(),
            nullable: true,
            identifier: true,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn semantic_type(&self) -> SemanticType {
        self.semantic_type
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn nullable(&self) -> bool {
        self.nullable
    }

    pub fn is_identifier(&self) -> bool {
        self.identifier
    }

    pub fn is_text(&self) -> bool {
        self.semantic_type == SemanticType::Text
    }

    /// Lowercased name with underscores turned into spaces, e.g. `IDP_Girls` -> `idp girls`.
    pub fn humanized(&self) -> String {
        self.name.to_lowercase().replace('_', " ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableKind {
    Baseline,
    Needs,
    Severity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSchema {
    name: String,
    label: String,
    kind: TableKind,
    description: String,
    columns: Vec<ColumnDef>,
}

impl TableSchema {
    pub fn new(
        name: &str,
        label: &str,
        kind: TableKind,
        description: &str,
        columns: Vec<ColumnDef>,
    ) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            kind,
            description: description.to_string(),
            columns,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn kind(&self) -> TableKind {
        self.kind
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn text_columns(&self) -> impl Iterator<Item = &ColumnDef> {
        self.columns.iter().filter(|c| c.is_text())
    }

    pub fn identifier_columns(&self) -> impl Iterator<Item = &ColumnDef> {
        self.columns.iter().filter(|c| c.identifier)
    }

    pub fn integer_columns(&self) -> impl Iterator<Item = &ColumnDef> {
        self.columns
            .iter()
            .filter(|c| c.semantic_type == SemanticType::Integer)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaRegistry {
    version: u32,
    tables: Vec<TableSchema>,
}

impl SchemaRegistry {
    pub fn new(version: u32, tables: Vec<TableSchema>) -> Result<Self> {
        let registry = Self { version, tables };
        registry.validate()?;
        Ok(registry)
    }

    /// The three fredometer tables: baseline population, people in need, severity.
    pub fn standard() -> Self {
        let mut baseline = location_columns();
        baseline.extend(demographic_columns());

        let mut needs = vec![ColumnDef::integer(YEAR_COLUMN, "Year").not_null()];
        needs.push(ColumnDef::identifier(SECTOR_COLUMN, "Sector"));
        needs.extend(location_columns().into_iter().skip(1));
        needs.extend(demographic_columns());

        let mut severity = vec![ColumnDef::integer(YEAR_COLUMN, "Year").not_null()];
        severity.push(ColumnDef::identifier(SECTOR_COLUMN, "Sector"));
        severity.extend(location_columns().into_iter().skip(1));
        severity.extend([
            ColumnDef::integer("IDP_Severity", "IDP severity"),
            ColumnDef::integer("Returnee_Severity", "Returnee severity"),
            ColumnDef::integer("Host_Community_Severity", "Host Community severity"),
            ColumnDef::integer("Final_Severity", "Final severity score"),
        ]);

        Self {
            version: SCHEMA_VERSION,
            tables: vec![
                TableSchema::new(
                    BASELINE_TABLE,
                    "Baseline population",
                    TableKind::Baseline,
                    "General demographic counts of IDP, Returnee and Host Community populations by gender and age band, per state/LGA and response year",
                    baseline,
                ),
                TableSchema::new(
                    NEEDS_TABLE,
                    "People in need",
                    TableKind::Needs,
                    "Demographic counts of people requiring humanitarian assistance, with the same breakdown as the baseline plus the humanitarian sector",
                    needs,
                ),
                TableSchema::new(
                    SEVERITY_TABLE,
                    "Severity",
                    TableKind::Severity,
                    "Aggregated severity counters per sector, location and year: IDP, Returnee and Host Community severity plus a final composite severity score",
                    severity,
                ),
            ],
        }
    }

    /// Load an operator-supplied registry from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let registry: SchemaRegistry = serde_json::from_str(&content)?;
        registry.validate()?;
        Ok(registry)
    }

    fn validate(&self) -> Result<()> {
        if self.tables.is_empty() {
            return Err(ChatError::Schema("registry has no tables".to_string()));
        }
        let mut table_names = HashSet::new();
        for table in &self.tables {
            if !table_names.insert(table.name.as_str()) {
                return Err(ChatError::Schema(format!(
                    "duplicate table '{}'",
                    table.name
                )));
            }
            if table.columns.is_empty() {
                return Err(ChatError::Schema(format!(
                    "table '{}' has no columns",
                    table.name
                )));
            }
            let mut column_names = HashSet::new();
            for column in &table.columns {
                if !column_names.insert(column.name.as_str()) {
                    return Err(ChatError::Schema(format!(
                        "duplicate column '{}' in table '{}'",
                        column.name, table.name
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn tables(&self) -> &[TableSchema] {
        &self.tables
    }

    pub fn table(&self, name: &str) -> Option<&TableSchema> {
        self.tables.iter().find(|t| t.name.eq_ignore_ascii_case(name))
    }

    /// Tables to query for an intent. In-need questions only see the needs table.
    pub fn tables_for(&self, intent: &QueryIntent) -> Vec<&TableSchema> {
        if intent.is_in_need {
            let needs: Vec<&TableSchema> = self
                .tables
                .iter()
                .filter(|t| t.kind == TableKind::Needs)
                .collect();
            if !needs.is_empty() {
                return needs;
            }
        }
        self.tables.iter().collect()
    }

    /// Every humanized column name across all tables, deduplicated.
    pub fn humanized_columns(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.tables
            .iter()
            .flat_map(|t| t.columns.iter())
            .map(|c| c.humanized())
            .filter(|h| seen.insert(h.clone()))
            .collect()
    }

    /// Natural-language description of the tables for the generation prompt.
    pub fn describe(&self) -> String {
        let mut out = String::from("The fredometer database contains the following tables:\n");
        for table in &self.tables {
            let fields: Vec<&str> = table.columns.iter().map(|c| c.name.as_str()).collect();
            out.push_str(&format!(
                "- {} ({}): {}. Fields: {}.\n",
                table.label,
                table.name,
                table.description,
                fields.join(", ")
            ));
        }
        out
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

fn location_columns() -> Vec<ColumnDef> {
    vec![
        ColumnDef::integer(YEAR_COLUMN, "Year").not_null(),
        ColumnDef::identifier(STATE_COLUMN, "State"),
        ColumnDef::identifier("State_Pcode", "State Pcode"),
        ColumnDef::identifier(LGA_COLUMN, "LGA"),
        ColumnDef::identifier("LGA_Pcode", "LGA Pcode"),
    ]
}

fn demographic_columns() -> Vec<ColumnDef> {
    let mut columns = Vec::with_capacity(DISPLACEMENT_STATUSES.len() * DEMOGRAPHIC_GROUPS.len());
    for status in DISPLACEMENT_STATUSES {
        for group in DEMOGRAPHIC_GROUPS {
            let name = format!("{}_{}", status, group);
            let label = name.replace('_', " ");
            columns.push(ColumnDef::integer(&name, &label));
        }
    }
    columns
}
