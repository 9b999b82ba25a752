// src/pipeline/mod.rs
pub mod state;

use serde::Serialize;
use std::path::PathBuf;
use tracing::{error, info, warn};

use crate::config::PipelineConfig;
use crate::error::EtlError;
use crate::extract::{extract, ShapeHint};
use crate::load::{load_dimension, load_fact, LoadReport};
use crate::records::CleanRecordSet;
use crate::schema::{self, StarSchema, TableKind};
use crate::scrub::{clean, export::write_clean_csv, ScrubReport};
use crate::warehouse::Warehouse;
pub use state::{PipelineState, Stage, StageError, StageFailure};

type StageResult<T> = std::result::Result<T, StageError>;

/// Counts gathered for one source table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableRun {
    pub table: TableKind,
    pub source: PathBuf,
    pub rows_extracted: Option<usize>,
    pub columns_extracted: Option<usize>,
    pub scrub: Option<ScrubReport>,
    pub exported_to: Option<PathBuf>,
    pub load: Option<LoadReport>,
}

impl TableRun {
    fn new(table: TableKind, source: PathBuf) -> Self {
        Self {
            table,
            source,
            rows_extracted: None,
            columns_extracted: None,
            scrub: None,
            exported_to: None,
            load: None,
        }
    }
}

/// Final state plus every count gathered, whatever the outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineOutcome {
    pub state: PipelineState,
    pub failure: Option<StageFailure>,
    pub tables: Vec<TableRun>,
}

impl PipelineOutcome {
    pub fn is_success(&self) -> bool {
        self.state == PipelineState::Done
    }

    pub fn table(&self, kind: TableKind) -> Option<&TableRun> {
        self.tables.iter().find(|t| t.table == kind)
    }

    /// Outcome of a run that never started because its configuration could
    /// not be loaded or validated.
    pub fn config_failure(error: EtlError) -> Self {
        let mut run = Run::default();
        run.fail(StageError::new(Stage::Config, error));
        run.finish()
    }

    /// The line reported on stderr when the run did not finish.
    pub fn failure_line(&self) -> Option<String> {
        match &self.failure {
            _ if self.is_success() => None,
            Some(f) => Some(format!("FAILED at {}: {}", f.stage, f.message)),
            None => Some(format!("FAILED: run ended in state {}", self.state)),
        }
    }
}

/// Sequences schema → dimensions → fact → verification for one full refresh.
pub struct Pipeline {
    config: PipelineConfig,
    star: StarSchema,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            star: StarSchema::default(),
        }
    }

    /// Open the configured warehouse, run, and close it again.
    pub fn run(&self) -> PipelineOutcome {
        if let Err(e) = self.config.validate() {
            return PipelineOutcome::config_failure(e);
        }
        match Warehouse::open(&self.config.database) {
            Ok(mut wh) => self.run_with(&mut wh),
            Err(e) => {
                let mut run = Run::default();
                run.fail(StageError::new(Stage::Schema, e));
                run.finish()
            }
        }
    }

    /// Run against an already opened warehouse.
    #[tracing::instrument(level = "info", skip_all)]
    pub fn run_with(&self, wh: &mut Warehouse) -> PipelineOutcome {
        let mut run = Run::default();
        match self.execute(wh, &mut run) {
            Ok(()) => {
                run.advance();
                info!(state = %run.state, "pipeline done");
            }
            Err(err) => {
                let loaded_something = run.state != PipelineState::Init;
                run.fail(err);
                if loaded_something {
                    // leave no half-loaded warehouse behind
                    if let Err(e) = schema::reset(wh.conn_mut(), &self.star) {
                        error!(error = %e, "could not clear warehouse after failure");
                    }
                }
            }
        }
        run.finish()
    }

    fn execute(&self, wh: &mut Warehouse, run: &mut Run) -> StageResult<()> {
        self.config
            .validate()
            .map_err(|e| StageError::new(Stage::Config, e))?;

        // INIT → SCHEMA_READY
        schema::ensure_schema(wh.conn_mut(), &self.star)
            .and_then(|_| schema::reset(wh.conn_mut(), &self.star))
            .map_err(|e| StageError::new(Stage::Schema, e))?;
        run.advance();

        // SCHEMA_READY → DIMENSIONS_LOADED
        // the two dimensions are independent, so extract + clean them side by side
        let (customers, products) = rayon::join(
            || self.prepare(TableKind::Customers),
            || self.prepare(TableKind::Products),
        );
        // keep both tables' counts before either failure ends the run
        let (customers, products) = (run.record(customers), run.record(products));
        let customers = customers?;
        let products = products?;
        for (kind, records) in [
            (TableKind::Customers, &customers),
            (TableKind::Products, &products),
        ] {
            let report = load_dimension(records, self.star.table(kind), wh.conn_mut())
                .map_err(|e| StageError::new(Stage::Load(kind), e))?;
            run.table_mut(kind).load = Some(report);
        }
        run.advance();

        // DIMENSIONS_LOADED → FACTS_LOADED
        let sales = run.record(self.prepare(TableKind::Sales))?;
        let report = load_fact(&sales, &self.star.sales, wh.conn_mut())
            .map_err(|e| StageError::new(Stage::Load(TableKind::Sales), e))?;
        run.table_mut(TableKind::Sales).load = Some(report);
        run.advance();

        // FACTS_LOADED → DONE happens in the caller once this passes
        verify(wh, &run.tables).map_err(|e| StageError::new(Stage::Verify, e))
    }

    /// Extract and clean one source. The `TableRun` comes back even when a
    /// step fails so its counts can still be reported.
    fn prepare(&self, kind: TableKind) -> (TableRun, StageResult<CleanRecordSet>) {
        let path = self.config.source_path(kind);
        let mut table_run = TableRun::new(kind, path.clone());
        let table = self.star.table(kind);

        let result = (|| -> StageResult<CleanRecordSet> {
            let delimiter = self
                .config
                .delimiter_byte()
                .map_err(|e| StageError::new(Stage::Extract(kind), e))?;
            let hint = ShapeHint::new(table.columns.iter().map(|c| c.name.clone()));
            let raw = extract(kind.as_str(), &path, delimiter, Some(&hint))
                .map_err(|e| StageError::new(Stage::Extract(kind), e))?;
            table_run.rows_extracted = Some(raw.row_count());
            table_run.columns_extracted = Some(raw.column_count());

            let rules = table.scrub_rules(&raw.columns, self.config.drop_fully_empty);
            let (records, report) = clean(raw, &rules);
            table_run.scrub = Some(report);

            if let Some(dir) = &self.config.processed_dir {
                let written = write_clean_csv(&records, dir, delimiter)
                    .map_err(|e| StageError::new(Stage::Clean(kind), e))?;
                table_run.exported_to = Some(written);
            }
            Ok(records)
        })();

        (table_run, result)
    }
}

/// Convenience entry point: build a pipeline from `config` and run it.
pub fn run_pipeline(config: PipelineConfig) -> PipelineOutcome {
    Pipeline::new(config).run()
}

/// Mutable bookkeeping for one run.
struct Run {
    state: PipelineState,
    failure: Option<StageFailure>,
    tables: Vec<TableRun>,
}

impl Default for Run {
    fn default() -> Self {
        Self {
            state: PipelineState::Init,
            failure: None,
            tables: Vec::new(),
        }
    }
}

impl Run {
    fn advance(&mut self) {
        if let Some(next) = self.state.next() {
            info!(from = %self.state, to = %next, "state transition");
            self.state = next;
        }
    }

    fn fail(&mut self, err: StageError) {
        debug_assert!(!self.state.is_terminal(), "failing a finished run");
        let failure = StageFailure {
            stage: err.stage,
            from_state: self.state,
            kind: err.error.kind(),
            message: err.error.to_string(),
        };
        error!(
            stage = %failure.stage,
            kind = failure.kind,
            from = %failure.from_state,
            error = %failure.message,
            "pipeline failed"
        );
        self.state = PipelineState::Failed;
        self.failure = Some(failure);
    }

    /// Keep the table's counts and pass its result through.
    fn record<T>(&mut self, (table_run, result): (TableRun, StageResult<T>)) -> StageResult<T> {
        self.tables.push(table_run);
        result
    }

    fn table_mut(&mut self, kind: TableKind) -> &mut TableRun {
        let idx = self
            .tables
            .iter()
            .position(|t| t.table == kind)
            .unwrap_or_else(|| {
                self.tables.push(TableRun::new(kind, PathBuf::new()));
                self.tables.len() - 1
            });
        &mut self.tables[idx]
    }

    fn finish(self) -> PipelineOutcome {
        PipelineOutcome {
            state: self.state,
            failure: self.failure,
            tables: self.tables,
        }
    }
}

/// Every load report must add up, stay within what the scrubber produced, and
/// match what the warehouse now holds.
fn verify(wh: &Warehouse, tables: &[TableRun]) -> crate::error::Result<()> {
    for t in tables {
        let report = t.load.as_ref().ok_or_else(|| EtlError::VerificationFailed {
            table: t.table.to_string(),
            reason: "no load report".into(),
        })?;
        let fail = |reason: String| EtlError::VerificationFailed {
            table: report.table.clone(),
            reason,
        };

        let cleaned = t.scrub.as_ref().map_or(report.rows_in, |s| s.rows_after);
        if report.rows_in != cleaned {
            return Err(fail(format!(
                "{} rows handed to the loader but {} cleaned",
                report.rows_in, cleaned
            )));
        }
        if report.rows_loaded > cleaned {
            return Err(fail(format!(
                "loaded {} rows from {} cleaned",
                report.rows_loaded, cleaned
            )));
        }
        if report.rows_loaded + report.rows_rejected() != report.rows_in {
            return Err(fail(format!(
                "{} loaded + {} rejected != {} in",
                report.rows_loaded,
                report.rows_rejected(),
                report.rows_in
            )));
        }
        let stored = wh
            .row_count(&report.table)
            .map_err(|e| fail(e.to_string()))?;
        if usize::try_from(stored).ok() != Some(report.rows_loaded) {
            return Err(fail(format!(
                "table holds {} rows, report says {}",
                stored, report.rows_loaded
            )));
        }
        if report.rows_rejected() > 0 {
            warn!(
                table = %report.table,
                rejected = report.rows_rejected(),
                "rows excluded from load"
            );
        }
    }
    Ok(())
}
