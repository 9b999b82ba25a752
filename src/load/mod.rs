// src/load/mod.rs
use rusqlite::{params_from_iter, Connection};
use serde::Serialize;
use std::collections::HashSet;
use tracing::{info, warn};

use crate::error::{EtlError, Result};
use crate::records::{CleanRecordSet, Value};
use crate::schema::{ColumnType, TableSchema};
use crate::scrub::date_parser;
use crate::warehouse::existing_keys;

/// Row accounting for one table load. Every input row lands in exactly one
/// bucket: loaded or one of the rejections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub table: String,
    pub rows_in: usize,
    pub rows_loaded: usize,
    pub rows_rejected_missing_key: usize,
    pub rows_rejected_invalid_date: usize,
    pub rows_rejected_orphan: usize,
}

impl LoadReport {
    fn new(table: &str, rows_in: usize) -> Self {
        Self {
            table: table.to_string(),
            rows_in,
            ..Default::default()
        }
    }

    pub fn rows_rejected(&self) -> usize {
        self.rows_rejected_missing_key + self.rows_rejected_invalid_date + self.rows_rejected_orphan
    }
}

/// Straight insert of a deduplicated dimension. Expects the table to have
/// been reset; the whole table commits or nothing does.
#[tracing::instrument(level = "info", skip_all, fields(table = %schema.name))]
pub fn load_dimension(
    records: &CleanRecordSet,
    schema: &TableSchema,
    conn: &mut Connection,
) -> Result<LoadReport> {
    let mut report = LoadReport::new(&schema.name, records.row_count());
    let projection = Projection::resolve(records, schema)?;

    let mut accepted = Vec::with_capacity(records.row_count());
    for row in records.rows() {
        let out = projection.project(row);
        if out[projection.pk] == Value::Null {
            report.rows_rejected_missing_key += 1;
            continue;
        }
        accepted.push(out);
    }

    report.rows_loaded = insert_all(conn, schema, &accepted)?;
    log_report(&report);
    Ok(report)
}

/// Fact load. Rows are checked in order: missing key, invalid date, then
/// foreign keys against the dimensions already committed in `conn`.
#[tracing::instrument(level = "info", skip_all, fields(table = %schema.name))]
pub fn load_fact(
    records: &CleanRecordSet,
    schema: &TableSchema,
    conn: &mut Connection,
) -> Result<LoadReport> {
    let mut report = LoadReport::new(&schema.name, records.row_count());
    let projection = Projection::resolve(records, schema)?;

    let date_idx = match &schema.required_date {
        Some(name) => Some(dest_index(schema, name)?),
        None => None,
    };

    let mut fk_checks: Vec<(usize, HashSet<i64>)> = Vec::with_capacity(schema.foreign_keys.len());
    for fk in &schema.foreign_keys {
        let keys = existing_keys(conn, &fk.references, &fk.referenced_column)
            .map_err(|e| EtlError::load_failed(&schema.name, e))?;
        fk_checks.push((dest_index(schema, &fk.column)?, keys));
    }

    let mut accepted = Vec::with_capacity(records.row_count());
    for row in records.rows() {
        let out = projection.project(row);
        if out[projection.pk] == Value::Null {
            report.rows_rejected_missing_key += 1;
            continue;
        }
        if let Some(i) = date_idx {
            if !matches!(out[i], Value::Date(_)) {
                report.rows_rejected_invalid_date += 1;
                continue;
            }
        }
        let orphan = fk_checks
            .iter()
            .any(|(i, keys)| out[*i].as_i64().map_or(true, |k| !keys.contains(&k)));
        if orphan {
            report.rows_rejected_orphan += 1;
            continue;
        }
        accepted.push(out);
    }

    report.rows_loaded = insert_all(conn, schema, &accepted)?;
    log_report(&report);
    Ok(report)
}

/// Where each destination column comes from in a cleaned record set.
struct Projection {
    sources: Vec<(Option<usize>, ColumnType)>,
    /// Destination index of the primary key.
    pk: usize,
}

impl Projection {
    fn resolve(records: &CleanRecordSet, schema: &TableSchema) -> Result<Self> {
        let pk = dest_index(schema, &schema.primary_key)?;
        let sources: Vec<(Option<usize>, ColumnType)> = schema
            .columns
            .iter()
            .map(|c| (c.resolve(records.columns()), c.ty))
            .collect();

        if sources[pk].0.is_none() {
            return Err(EtlError::load_failed(
                &schema.name,
                format!(
                    "source {} has no column for primary key {}",
                    records.name(),
                    schema.primary_key
                ),
            ));
        }
        for (col, (src, _)) in schema.columns.iter().zip(&sources) {
            if src.is_none() {
                warn!(table = %schema.name, column = %col.name, "no source column, loading NULL");
            }
        }
        Ok(Self { sources, pk })
    }

    fn project(&self, row: &[Value]) -> Vec<Value> {
        self.sources
            .iter()
            .map(|(src, ty)| match src {
                Some(i) => bind_as(&row[*i], *ty),
                None => Value::Null,
            })
            .collect()
    }
}

/// Fit a cleaned value to the destination column type.
fn bind_as(v: &Value, ty: ColumnType) -> Value {
    match (ty, v) {
        (_, Value::Null) => Value::Null,
        (ColumnType::Integer, v) => v.as_i64().map_or(Value::Null, Value::Integer),
        (ColumnType::Real, Value::Integer(i)) => Value::Real(*i as f64),
        (ColumnType::Real, Value::Real(f)) => Value::Real(*f),
        (ColumnType::Real, Value::Text(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map_or(Value::Null, Value::Real),
        (ColumnType::Real, Value::Date(_)) => Value::Null,
        (ColumnType::Date, Value::Date(d)) => Value::Date(*d),
        (ColumnType::Date, Value::Text(s)) => {
            date_parser::parse_date(s).map_or(Value::Null, Value::Date)
        }
        (ColumnType::Date, _) => Value::Null,
        (ColumnType::Text, v) => Value::Text(v.to_string()),
    }
}

fn dest_index(schema: &TableSchema, name: &str) -> Result<usize> {
    schema
        .columns
        .iter()
        .position(|c| c.name == name)
        .ok_or_else(|| EtlError::load_failed(&schema.name, format!("unknown column {}", name)))
}

/// Insert every row in one transaction; on any failure the transaction is
/// dropped and the table keeps nothing from this call.
fn insert_all(conn: &mut Connection, schema: &TableSchema, rows: &[Vec<Value>]) -> Result<usize> {
    let failed = |e: rusqlite::Error| EtlError::load_failed(&schema.name, e);

    let tx = conn.transaction().map_err(failed)?;
    {
        let mut stmt = tx.prepare(&schema.insert_sql()).map_err(failed)?;
        for row in rows {
            stmt.execute(params_from_iter(row.iter())).map_err(failed)?;
        }
    }
    tx.commit().map_err(failed)?;
    Ok(rows.len())
}

fn log_report(report: &LoadReport) {
    info!(
        table = %report.table,
        rows_in = report.rows_in,
        rows_loaded = report.rows_loaded,
        missing_key = report.rows_rejected_missing_key,
        invalid_date = report.rows_rejected_invalid_date,
        orphan = report.rows_rejected_orphan,
        "loaded"
    );
}
