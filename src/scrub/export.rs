use csv::WriterBuilder;
use std::{fs, path::Path, path::PathBuf};
use tracing::info;

use crate::error::{EtlError, Result};
use crate::records::CleanRecordSet;

/// Write a cleaned set as `<dir>/<name>_data_clean.csv`. Dates come out as
/// `YYYY-MM-DD`, nulls as empty fields.
pub fn write_clean_csv(records: &CleanRecordSet, dir: &Path, delimiter: u8) -> Result<PathBuf> {
    let path = dir.join(format!("{}_data_clean.csv", records.name()));
    let failed = |e: &dyn std::fmt::Display| EtlError::ExportFailed {
        path: path.clone(),
        reason: e.to_string(),
    };

    fs::create_dir_all(dir).map_err(|e| failed(&e))?;
    let mut wtr = WriterBuilder::new()
        .delimiter(delimiter)
        .from_path(&path)
        .map_err(|e| failed(&e))?;
    wtr.write_record(records.columns()).map_err(|e| failed(&e))?;
    for row in records.rows() {
        wtr.write_record(row.iter().map(|v| v.to_string()))
            .map_err(|e| failed(&e))?;
    }
    wtr.flush().map_err(|e| failed(&e))?;

    info!(path = %path.display(), rows = records.row_count(), "wrote cleaned csv");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{RawRecordSet, Value};
    use crate::scrub::{clean, ScrubRules};
    use anyhow::Result;
    use tempfile::tempdir;

    #[test]
    fn writes_header_and_iso_dates() -> Result<()> {
        let raw = RawRecordSet::new(
            "sales",
            vec!["TransactionID".into(), "SaleDate".into(), "Note".into()],
            vec![vec![
                Value::Text("100".into()),
                Value::Text("2024/05/01".into()),
                Value::Null,
            ]],
        );
        let rules = ScrubRules {
            natural_key: vec!["transactionid".into()],
            date_columns: ["saledate".to_string()].into_iter().collect(),
            drop_fully_empty: false,
            ..Default::default()
        };
        let (clean_set, _) = clean(raw, &rules);

        let dir = tempdir()?;
        let path = write_clean_csv(&clean_set, dir.path(), b',')?;
        assert_eq!(path.file_name().unwrap(), "sales_data_clean.csv");
        let written = fs::read_to_string(&path)?;
        assert_eq!(written, "transactionid,saledate,note\n100,2024-05-01,\n");
        Ok(())
    }
}
