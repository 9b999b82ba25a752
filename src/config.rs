use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::error::{EtlError, Result};
use crate::schema::TableKind;

/// Where the run reads from and writes to. Every field has a default, so an
/// empty YAML document is a valid config.
///
/// ```yaml
/// raw_dir: data/raw
/// customers: customers_data.csv     # relative names resolve against raw_dir
/// products: products_data.csv
/// sales: sales_data.csv
/// database: data/dw/smart_sales.db
/// processed_dir: data/processed     # optional; cleaned CSVs are written here
/// delimiter: ","
/// drop_fully_empty: true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub raw_dir: PathBuf,
    pub customers: PathBuf,
    pub products: PathBuf,
    pub sales: PathBuf,
    pub database: PathBuf,
    pub processed_dir: Option<PathBuf>,
    pub delimiter: char,
    pub drop_fully_empty: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            raw_dir: PathBuf::from("data/raw"),
            customers: PathBuf::from("customers_data.csv"),
            products: PathBuf::from("products_data.csv"),
            sales: PathBuf::from("sales_data.csv"),
            database: PathBuf::from("data/dw/smart_sales.db"),
            processed_dir: None,
            delimiter: ',',
            drop_fully_empty: true,
        }
    }
}

impl PipelineConfig {
    pub fn from_yaml_str(s: &str) -> Result<Self> {
        // an empty document deserializes to unit, not to a map
        if s.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(s).map_err(|e| EtlError::Config(e.to_string()))
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| EtlError::Config(format!("reading {}: {}", path.display(), e)))?;
        Self::from_yaml_str(&text)
    }

    /// Source file for a table; absolute paths are kept as given.
    pub fn source_path(&self, kind: TableKind) -> PathBuf {
        let name = match kind {
            TableKind::Customers => &self.customers,
            TableKind::Products => &self.products,
            TableKind::Sales => &self.sales,
        };
        self.raw_dir.join(name)
    }

    pub fn delimiter_byte(&self) -> Result<u8> {
        if self.delimiter.is_ascii() && self.delimiter != '"' && self.delimiter != '\n' {
            Ok(self.delimiter as u8)
        } else {
            Err(EtlError::Config(format!(
                "delimiter {:?} must be a single ASCII character other than quote or newline",
                self.delimiter
            )))
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.delimiter_byte()?;
        if self.database.as_os_str().is_empty() {
            return Err(EtlError::Config("database path is empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_data_dirs() {
        let cfg = PipelineConfig::default();
        assert_eq!(
            cfg.source_path(TableKind::Sales),
            PathBuf::from("data/raw/sales_data.csv")
        );
        assert_eq!(cfg.database, PathBuf::from("data/dw/smart_sales.db"));
        assert!(cfg.processed_dir.is_none());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn yaml_overrides_only_what_it_names() -> Result<()> {
        let cfg = PipelineConfig::from_yaml_str(
            "raw_dir: /srv/in\nsales: /tmp/other_sales.csv\ndelimiter: \";\"\n",
        )?;
        assert_eq!(
            cfg.source_path(TableKind::Customers),
            PathBuf::from("/srv/in/customers_data.csv")
        );
        assert_eq!(
            cfg.source_path(TableKind::Sales),
            PathBuf::from("/tmp/other_sales.csv")
        );
        assert_eq!(cfg.delimiter_byte()?, b';');
        assert!(cfg.drop_fully_empty);
        Ok(())
    }

    #[test]
    fn empty_yaml_is_default() -> Result<()> {
        assert_eq!(PipelineConfig::from_yaml_str("  \n")?, PipelineConfig::default());
        Ok(())
    }

    #[test]
    fn rejects_unknown_keys_and_bad_delimiters() {
        assert!(PipelineConfig::from_yaml_str("databse: x.db\n").is_err());
        let cfg = PipelineConfig {
            delimiter: 'é',
            ..Default::default()
        };
        assert_eq!(cfg.validate().unwrap_err().kind(), "Config");
    }
}
