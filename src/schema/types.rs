// src/schema/types.rs

use serde::{Deserialize, Serialize};
use std::{collections::BTreeSet, fmt};

use crate::scrub::{utils::normalize_column_name, ScrubRules};

/// Semantic type of a destination column. Drives both scrub coercion and the
/// SQL column type.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Copy, Eq, Hash)]
pub enum ColumnType {
    Text,
    Integer,
    Real,
    Date,
}

impl ColumnType {
    pub fn sql_type(self) -> &'static str {
        match self {
            ColumnType::Text | ColumnType::Date => "TEXT",
            ColumnType::Integer => "INTEGER",
            ColumnType::Real => "REAL",
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnType::Integer | ColumnType::Real)
    }
}

/// The three logical source tables.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Copy, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TableKind {
    Customers,
    Products,
    Sales,
}

impl TableKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TableKind::Customers => "customers",
            TableKind::Products => "products",
            TableKind::Sales => "sales",
        }
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One destination column and the normalized source names that feed it.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Eq, Hash)]
pub struct Column {
    /// Destination name, e.g. `CustomerID`.
    pub name: String,
    pub ty: ColumnType,
    /// Canonical normalized source name, e.g. `customerid`.
    pub source: String,
    /// Other accepted spellings, e.g. `customer_id`.
    pub aliases: Vec<String>,
}

impl Column {
    /// Source name is the destination name normalized.
    pub fn new(name: &str, ty: ColumnType) -> Self {
        Self {
            name: name.to_string(),
            ty,
            source: normalize_column_name(name),
            aliases: Vec::new(),
        }
    }

    pub fn alias(mut self, alias: &str) -> Self {
        self.aliases.push(normalize_column_name(alias));
        self
    }

    pub fn source_names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.source.as_str()).chain(self.aliases.iter().map(String::as_str))
    }

    /// Position of the first accepted source name in `columns`.
    pub fn resolve(&self, columns: &[String]) -> Option<usize> {
        self.source_names()
            .find_map(|s| columns.iter().position(|c| c == s))
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Eq, Hash)]
pub struct ForeignKey {
    pub column: String,
    pub references: String,
    pub referenced_column: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Eq, Hash)]
pub struct Index {
    pub name: String,
    pub column: String,
}

/// Explicit per-table schema: destination layout plus the source mapping.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Eq)]
pub struct TableSchema {
    pub name: String,
    pub kind: TableKind,
    pub columns: Vec<Column>,
    pub primary_key: String,
    pub foreign_keys: Vec<ForeignKey>,
    pub indexes: Vec<Index>,
    /// Fact date column that must hold a valid date for a row to load.
    pub required_date: Option<String>,
}

impl TableSchema {
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn primary_key_column(&self) -> Option<&Column> {
        self.column(&self.primary_key)
    }

    /// Scrub rules for a source with the given (raw) header. The natural key
    /// is the primary key's source column under whichever spelling the
    /// header uses.
    pub fn scrub_rules(&self, header: &[String], drop_fully_empty: bool) -> ScrubRules {
        let normalized: Vec<String> = header.iter().map(|h| normalize_column_name(h)).collect();
        let natural_key = self
            .primary_key_column()
            .map(|pk| {
                let name = pk
                    .resolve(&normalized)
                    .map(|i| normalized[i].clone())
                    .unwrap_or_else(|| pk.source.clone());
                vec![name]
            })
            .unwrap_or_default();

        let names_of = |pred: fn(ColumnType) -> bool| -> BTreeSet<String> {
            self.columns
                .iter()
                .filter(|c| pred(c.ty))
                .flat_map(|c| c.source_names().map(str::to_string))
                .collect()
        };

        ScrubRules {
            natural_key,
            numeric_columns: names_of(ColumnType::is_numeric),
            date_columns: names_of(|t| t == ColumnType::Date),
            drop_fully_empty,
        }
    }

    pub fn create_table_sql(&self) -> String {
        let mut defs: Vec<String> = self
            .columns
            .iter()
            .map(|c| {
                if c.name == self.primary_key {
                    format!("{} {} PRIMARY KEY", c.name, c.ty.sql_type())
                } else {
                    format!("{} {}", c.name, c.ty.sql_type())
                }
            })
            .collect();
        for fk in &self.foreign_keys {
            defs.push(format!(
                "FOREIGN KEY ({}) REFERENCES {} ({})",
                fk.column, fk.references, fk.referenced_column
            ));
        }
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
            self.name,
            defs.join(",\n    ")
        )
    }

    pub fn create_index_sql(&self) -> Vec<String> {
        self.indexes
            .iter()
            .map(|idx| {
                format!(
                    "CREATE INDEX IF NOT EXISTS {} ON {} ({})",
                    idx.name, self.name, idx.column
                )
            })
            .collect()
    }

    pub fn insert_sql(&self) -> String {
        let names: Vec<&str> = self.columns.iter().map(|c| c.name.as_str()).collect();
        let params: Vec<String> = (1..=names.len()).map(|i| format!("?{}", i)).collect();
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.name,
            names.join(", "),
            params.join(", ")
        )
    }
}
