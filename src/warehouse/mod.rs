use rusqlite::{
    types::{ToSqlOutput, Value as SqlValue},
    Connection, ToSql,
};
use std::{collections::HashSet, fs, path::Path};
use tracing::info;

use crate::error::{EtlError, Result};
use crate::records::Value;

/// Scoped handle on the warehouse database. Held for one run and closed when
/// dropped, on success and failure alike.
pub struct Warehouse {
    conn: Connection,
}

impl Warehouse {
    /// Open the warehouse file at `path`, creating it (and its directory) if needed.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                EtlError::Config(format!("creating {}: {}", parent.display(), e))
            })?;
        }
        let conn = Connection::open(path).map_err(EtlError::SchemaCreationFailed)?;
        info!(path = %path.display(), "opened warehouse");
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(EtlError::SchemaCreationFailed)?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(EtlError::SchemaCreationFailed)?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn conn_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    pub fn row_count(&self, table: &str) -> rusqlite::Result<i64> {
        self.conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))
    }
}

/// Integer keys currently present in `table.column`.
pub fn existing_keys(conn: &Connection, table: &str, column: &str) -> rusqlite::Result<HashSet<i64>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM {} WHERE {} IS NOT NULL",
        column, table, column
    ))?;
    let keys = stmt
        .query_map([], |row| row.get::<_, i64>(0))?
        .collect::<rusqlite::Result<HashSet<i64>>>()?;
    Ok(keys)
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(SqlValue::Null),
            Value::Text(s) => ToSqlOutput::from(s.as_str()),
            Value::Integer(i) => ToSqlOutput::Owned(SqlValue::Integer(*i)),
            Value::Real(f) => ToSqlOutput::Owned(SqlValue::Real(*f)),
            Value::Date(d) => ToSqlOutput::Owned(SqlValue::Text(d.format("%Y-%m-%d").to_string())),
        })
    }
}
