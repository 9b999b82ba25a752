// src/scrub/mod.rs
pub mod convert;
pub mod date_parser;
pub mod export;
pub mod trimming;
pub mod utils;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, info, warn};

use crate::records::{CleanRecordSet, RawRecordSet, Value};
use convert::{coerce_column, to_date, to_numeric};
use trimming::apply_trimming;
use utils::normalize_column_name;

/// What the scrubber needs to know about one table. Column names are in
/// normalized form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrubRules {
    pub natural_key: Vec<String>,
    #[serde(default)]
    pub numeric_columns: BTreeSet<String>,
    #[serde(default)]
    pub date_columns: BTreeSet<String>,
    #[serde(default = "default_true")]
    pub drop_fully_empty: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ScrubRules {
    fn default() -> Self {
        Self {
            natural_key: Vec::new(),
            numeric_columns: BTreeSet::new(),
            date_columns: BTreeSet::new(),
            drop_fully_empty: true,
        }
    }
}

/// Before/after counts for one `clean` call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScrubReport {
    pub rows_before: usize,
    pub rows_after: usize,
    pub columns_before: usize,
    pub columns_after: usize,
    pub empty_columns_dropped: usize,
    pub empty_rows_dropped: usize,
    pub duplicate_rows_dropped: usize,
    pub key_collisions_dropped: usize,
    pub numeric_values_nulled: usize,
    pub date_values_nulled: usize,
}

impl ScrubReport {
    pub fn rows_dropped(&self) -> usize {
        self.rows_before - self.rows_after
    }
}

#[derive(Clone, Copy)]
enum Semantic {
    Plain,
    Numeric,
    Date,
}

/// Clean one record set. Steps run in a fixed order:
/// 1. normalize column names
/// 2. trim string cells
/// 3. drop fully empty columns, then fully empty rows
/// 4. drop exact duplicate rows, then natural-key collisions (first wins)
/// 5. coerce numeric columns
/// 6. coerce date columns
///
/// Malformed cells become `Null`; nothing here fails.
#[tracing::instrument(level = "info", skip_all, fields(source = %raw.name))]
pub fn clean(raw: RawRecordSet, rules: &ScrubRules) -> (CleanRecordSet, ScrubReport) {
    let RawRecordSet {
        name,
        columns,
        mut rows,
    } = raw;

    let mut report = ScrubReport {
        rows_before: rows.len(),
        columns_before: columns.len(),
        ..Default::default()
    };

    // 1) column names
    let mut columns: Vec<String> = columns.iter().map(|c| normalize_column_name(c)).collect();
    warn_on_name_clashes(&name, &columns);

    let width = columns.len();
    for row in rows.iter_mut() {
        row.resize(width, Value::Null);
    }

    // 2) whitespace
    apply_trimming(&mut rows);

    let mut semantics: Vec<Semantic> = columns
        .iter()
        .map(|c| {
            if rules.numeric_columns.contains(c) {
                Semantic::Numeric
            } else if rules.date_columns.contains(c) {
                Semantic::Date
            } else {
                Semantic::Plain
            }
        })
        .collect();

    // 3) empty columns + rows, judged on the coerced value so a cell that
    // coercion will null out already counts as empty here
    if rules.drop_fully_empty {
        let before_cols = columns.len();
        drop_empty_columns(&mut columns, &mut semantics, &mut rows);
        report.empty_columns_dropped = before_cols - columns.len();

        let before_rows = rows.len();
        rows.retain(|row| {
            !row.iter()
                .zip(&semantics)
                .all(|(v, s)| coerce(v, *s).is_empty())
        });
        report.empty_rows_dropped = before_rows - rows.len();
    }


    // 4) duplicates, then natural-key collisions
    let before = rows.len();
    let mut seen_rows: HashSet<Vec<String>> = HashSet::with_capacity(rows.len());
    rows.retain(|row| {
        let key = row
            .iter()
            .zip(&semantics)
            .map(|(v, s)| canonical(v, *s))
            .collect();
        seen_rows.insert(key)
    });
    report.duplicate_rows_dropped = before - rows.len();

    let key_idx: Option<Vec<usize>> = rules
        .natural_key
        .iter()
        .map(|k| columns.iter().position(|c| c == k))
        .collect();
    match key_idx {
        Some(key_idx) if !key_idx.is_empty() => {
            let before = rows.len();
            let mut seen_keys: HashSet<Vec<String>> = HashSet::with_capacity(rows.len());
            rows.retain(|row| {
                // a row without a complete key cannot collide with anything
                if key_idx
                    .iter()
                    .any(|&i| coerce(&row[i], semantics[i]) == Value::Null)
                {
                    return true;
                }
                let key = key_idx
                    .iter()
                    .map(|&i| canonical(&row[i], semantics[i]))
                    .collect();
                seen_keys.insert(key)
            });
            report.key_collisions_dropped = before - rows.len();
        }
        Some(_) => {}
        None => warn!(
            source = %name,
            key = ?rules.natural_key,
            "natural key column missing, skipping key dedup"
        ),
    }

    // 5) + 6) coercion
    for (i, col) in columns.iter().enumerate() {
        match semantics[i] {
            Semantic::Numeric => {
                report.numeric_values_nulled += coerce_column(&mut rows, i, to_numeric);
            }
            Semantic::Date => {
                report.date_values_nulled += coerce_column(&mut rows, i, to_date);
            }
            Semantic::Plain => {}
        }
        debug!(source = %name, column = %col, "column scrubbed");
    }
    for declared in rules.numeric_columns.iter().chain(&rules.date_columns) {
        if !columns.contains(declared) {
            debug!(source = %name, column = %declared, "declared column not present");
        }
    }

    report.rows_after = rows.len();
    report.columns_after = columns.len();
    info!(
        source = %name,
        rows_before = report.rows_before,
        rows_after = report.rows_after,
        rows_dropped = report.rows_dropped(),
        columns_before = report.columns_before,
        columns_after = report.columns_after,
        duplicates = report.duplicate_rows_dropped,
        key_collisions = report.key_collisions_dropped,
        numeric_nulled = report.numeric_values_nulled,
        dates_nulled = report.date_values_nulled,
        "scrubbed"
    );

    (CleanRecordSet::new(name, columns, rows), report)
}

fn coerce(v: &Value, sem: Semantic) -> Value {
    match sem {
        Semantic::Numeric => to_numeric(v),
        Semantic::Date => to_date(v),
        Semantic::Plain => v.clone(),
    }
}

/// Comparison form of a cell. Typed columns compare by their coerced value so
/// `"1"` and `"1.0"` collapse the same way before and after coercion.
fn canonical(v: &Value, sem: Semantic) -> String {
    match coerce(v, sem) {
        Value::Null => "\u{0}".to_string(),
        Value::Text(s) => format!("t:{}", s),
        Value::Integer(i) => format!("n:{}", i),
        Value::Real(f) => match Value::Real(f).as_i64() {
            Some(i) => format!("n:{}", i),
            None => format!("n:{:?}", f),
        },
        Value::Date(d) => format!("d:{}", d),
    }
}

fn drop_empty_columns(
    columns: &mut Vec<String>,
    semantics: &mut Vec<Semantic>,
    rows: &mut [Vec<Value>],
) {
    // nothing to judge on an empty set; keep the header
    if rows.is_empty() {
        return;
    }
    let keep: Vec<bool> = (0..columns.len())
        .map(|i| !rows.iter().all(|row| coerce(&row[i], semantics[i]).is_empty()))
        .collect();
    if keep.iter().all(|k| *k) {
        return;
    }
    let mut it = keep.iter();
    columns.retain(|_| *it.next().unwrap_or(&true));
    let mut it = keep.iter();
    semantics.retain(|_| *it.next().unwrap_or(&true));
    for row in rows.iter_mut() {
        let mut it = keep.iter();
        row.retain(|_| *it.next().unwrap_or(&true));
    }
}

fn warn_on_name_clashes(source: &str, columns: &[String]) {
    let mut seen = HashSet::new();
    for c in columns {
        if !seen.insert(c) {
            warn!(source, column = %c, "two source columns normalize to the same name");
        }
    }
}
