use std::path::PathBuf;
use thiserror::Error;

/// Stage-level failures. Row-level anomalies never show up here; they are
/// counted in the scrub and load reports instead.
#[derive(Error, Debug)]
pub enum EtlError {
    #[error("source not found: {}", path.display())]
    SourceNotFound { path: PathBuf },

    #[error("unreadable source {}: {reason}", path.display())]
    UnreadableSource { path: PathBuf, reason: String },

    #[error("schema creation failed: {0}")]
    SchemaCreationFailed(#[source] rusqlite::Error),

    #[error("load into {table} failed: {reason}")]
    LoadFailed { table: String, reason: String },

    #[error("export of {} failed: {reason}", path.display())]
    ExportFailed { path: PathBuf, reason: String },

    #[error("verification of {table} failed: {reason}")]
    VerificationFailed { table: String, reason: String },

    #[error("configuration error: {0}")]
    Config(String),
}

impl EtlError {
    /// Short machine-friendly name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            EtlError::SourceNotFound { .. } => "SourceNotFound",
            EtlError::UnreadableSource { .. } => "UnreadableSource",
            EtlError::SchemaCreationFailed(_) => "SchemaCreationFailed",
            EtlError::LoadFailed { .. } => "LoadFailed",
            EtlError::ExportFailed { .. } => "ExportFailed",
            EtlError::VerificationFailed { .. } => "VerificationFailed",
            EtlError::Config(_) => "Config",
        }
    }

    pub(crate) fn load_failed(table: &str, err: impl std::fmt::Display) -> Self {
        EtlError::LoadFailed {
            table: table.to_string(),
            reason: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
