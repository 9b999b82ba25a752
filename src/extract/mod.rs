// src/extract/mod.rs
use csv::ReaderBuilder;
use std::{fs::File, io, path::Path};
use tracing::{debug, info, warn};

use crate::error::{EtlError, Result};
use crate::records::{RawRecordSet, Value};
use crate::scrub::utils::normalize_column_name;

/// Columns a caller expects to find. Advisory only: absent columns are logged.
#[derive(Debug, Clone, Default)]
pub struct ShapeHint {
    pub expected_columns: Vec<String>,
}

impl ShapeHint {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            expected_columns: columns.into_iter().map(Into::into).collect(),
        }
    }
}

/// Read one delimited source into memory. Empty fields become `Null`,
/// everything else is kept verbatim as text.
#[tracing::instrument(level = "info", skip(path, hint), fields(path = %path.as_ref().display()))]
pub fn extract<P: AsRef<Path>>(
    name: &str,
    path: P,
    delimiter: u8,
    hint: Option<&ShapeHint>,
) -> Result<RawRecordSet> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => EtlError::SourceNotFound {
            path: path.to_path_buf(),
        },
        _ => unreadable(path, e),
    })?;

    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .from_reader(file);

    let columns: Vec<String> = rdr
        .headers()
        .map_err(|e| unreadable(path, e))?
        .iter()
        .map(str::to_string)
        .collect();
    if columns.is_empty() || columns.iter().all(|c| c.trim().is_empty()) {
        return Err(unreadable(path, "missing header row"));
    }

    let mut rows = Vec::new();
    for (idx, result) in rdr.records().enumerate() {
        let record = result.map_err(|e| unreadable(path, format!("record {}: {}", idx, e)))?;
        let row: Vec<Value> = record
            .iter()
            .map(|field| {
                if field.is_empty() {
                    Value::Null
                } else {
                    Value::Text(field.to_string())
                }
            })
            .collect();
        rows.push(row);
    }

    if let Some(hint) = hint {
        check_shape(name, &columns, hint);
    }

    let set = RawRecordSet::new(name, columns, rows);
    info!(
        source = name,
        rows = set.row_count(),
        columns = set.column_count(),
        "extracted"
    );
    Ok(set)
}

fn check_shape(name: &str, columns: &[String], hint: &ShapeHint) {
    let found: Vec<String> = columns.iter().map(|c| normalize_column_name(c)).collect();
    for expected in &hint.expected_columns {
        let want = normalize_column_name(expected);
        if found.contains(&want) {
            debug!(source = name, column = %want, "expected column present");
        } else {
            warn!(source = name, column = %want, "expected column missing from source");
        }
    }
}

fn unreadable(path: &Path, reason: impl std::fmt::Display) -> EtlError {
    EtlError::UnreadableSource {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn csv_file(content: &[u8]) -> Result<NamedTempFile> {
        let mut tmp = NamedTempFile::new()?;
        tmp.write_all(content)?;
        Ok(tmp)
    }

    #[test]
    fn reads_header_and_rows() -> Result<()> {
        let tmp = csv_file(b"CustomerID, Name ,Region\n1, Ann ,N\n2,,S\n")?;
        let set = extract("customers", tmp.path(), b',', None)?;

        assert_eq!(set.name, "customers");
        assert_eq!(set.columns, vec!["CustomerID", " Name ", "Region"]);
        assert_eq!(set.row_count(), 2);
        assert_eq!(set.rows[0][1], Value::Text(" Ann ".into()));
        assert_eq!(set.rows[1][1], Value::Null);
        Ok(())
    }

    #[test]
    fn honours_delimiter() -> Result<()> {
        let tmp = csv_file(b"a;b\n1;2\n")?;
        let set = extract("t", tmp.path(), b';', None)?;
        assert_eq!(set.column_count(), 2);
        assert_eq!(set.rows[0][1], Value::Text("2".into()));
        Ok(())
    }

    #[test]
    fn missing_file_is_source_not_found() {
        let err = extract("t", "/definitely/not/here.csv", b',', None).unwrap_err();
        assert_eq!(err.kind(), "SourceNotFound");
    }

    #[test]
    fn ragged_rows_are_unreadable() -> Result<()> {
        let tmp = csv_file(b"a,b\n1,2,3\n")?;
        let err = extract("t", tmp.path(), b',', None).unwrap_err();
        assert_eq!(err.kind(), "UnreadableSource");
        Ok(())
    }

    #[test]
    fn empty_file_is_unreadable() -> Result<()> {
        let tmp = csv_file(b"")?;
        let err = extract("t", tmp.path(), b',', None).unwrap_err();
        assert_eq!(err.kind(), "UnreadableSource");
        Ok(())
    }

    #[test]
    fn shape_hint_is_advisory() -> Result<()> {
        let tmp = csv_file(b"a,b\n1,2\n")?;
        let hint = ShapeHint::new(["a", "zzz"]);
        let set = extract("t", tmp.path(), b',', Some(&hint))?;
        assert_eq!(set.row_count(), 1);
        Ok(())
    }
}
