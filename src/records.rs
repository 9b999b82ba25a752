use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;

/// A single cell of a record set.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Text(String),
    Integer(i64),
    Real(f64),
    Date(NaiveDate),
}

impl Value {
    /// Null, or a string that is blank once trimmed.
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Integral view used for key lookups. Reals only qualify when they carry no fraction.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::Real(f) if f.is_finite() && f.fract() == 0.0 => {
                if *f >= i64::MIN as f64 && *f <= i64::MAX as f64 {
                    Some(*f as i64)
                } else {
                    None
                }
            }
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Text(s) => f.write_str(s),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Real(r) => write!(f, "{}", r),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

/// One source table as read, before any cleaning.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecordSet {
    /// Source name, e.g. "customers".
    pub name: String,
    /// Header row, verbatim.
    pub columns: Vec<String>,
    /// Data rows; every row has `columns.len()` cells.
    pub rows: Vec<Vec<Value>>,
}

impl RawRecordSet {
    pub fn new(name: impl Into<String>, columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self {
            name: name.into(),
            columns,
            rows,
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }
}

/// Output of [`crate::scrub::clean`]. Only the scrubber builds these, so holding
/// one means the cleaning invariants hold.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanRecordSet {
    name: String,
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl CleanRecordSet {
    pub(crate) fn new(name: String, columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self {
            name,
            columns,
            rows,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Hand the rows back as raw input, e.g. to clean them again.
    pub fn into_raw(self) -> RawRecordSet {
        RawRecordSet::new(self.name, self.columns, self.rows)
    }
}
