use serde::{Serialize, Serializer};
use std::fmt;

use crate::error::EtlError;
use crate::schema::TableKind;

/// Run lifecycle. `Failed` is reachable from every non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineState {
    Init,
    SchemaReady,
    DimensionsLoaded,
    FactsLoaded,
    Done,
    Failed,
}

impl PipelineState {
    /// The state a successful stage moves to.
    pub fn next(self) -> Option<PipelineState> {
        match self {
            PipelineState::Init => Some(PipelineState::SchemaReady),
            PipelineState::SchemaReady => Some(PipelineState::DimensionsLoaded),
            PipelineState::DimensionsLoaded => Some(PipelineState::FactsLoaded),
            PipelineState::FactsLoaded => Some(PipelineState::Done),
            PipelineState::Done | PipelineState::Failed => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Failed)
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PipelineState::Init => "INIT",
            PipelineState::SchemaReady => "SCHEMA_READY",
            PipelineState::DimensionsLoaded => "DIMENSIONS_LOADED",
            PipelineState::FactsLoaded => "FACTS_LOADED",
            PipelineState::Done => "DONE",
            PipelineState::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

/// Where in the run something went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Config,
    Schema,
    Extract(TableKind),
    Clean(TableKind),
    Load(TableKind),
    Verify,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Config => f.write_str("config"),
            Stage::Schema => f.write_str("schema"),
            Stage::Extract(t) => write!(f, "extract:{}", t),
            Stage::Clean(t) => write!(f, "clean:{}", t),
            Stage::Load(t) => write!(f, "load:{}", t),
            Stage::Verify => f.write_str("verify"),
        }
    }
}

impl Serialize for Stage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A stage-level error tagged with its stage.
#[derive(Debug)]
pub struct StageError {
    pub stage: Stage,
    pub error: EtlError,
}

impl StageError {
    pub fn new(stage: Stage, error: EtlError) -> Self {
        Self { stage, error }
    }
}

/// What the outcome keeps of a failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageFailure {
    pub stage: Stage,
    /// State the run was in when the stage failed.
    pub from_state: PipelineState,
    pub kind: &'static str,
    pub message: String,
}

impl fmt::Display for StageFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "stage {} failed ({}) after {}: {}",
            self.stage, self.kind, self.from_state, self.message
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn states_advance_in_order() {
        let mut s = PipelineState::Init;
        let mut seen = vec![s];
        while let Some(n) = s.next() {
            s = n;
            seen.push(s);
        }
        assert_eq!(
            seen,
            vec![
                PipelineState::Init,
                PipelineState::SchemaReady,
                PipelineState::DimensionsLoaded,
                PipelineState::FactsLoaded,
                PipelineState::Done,
            ]
        );
        assert!(PipelineState::Failed.is_terminal());
        assert_eq!(PipelineState::Failed.next(), None);
    }

    #[test]
    fn stages_render_with_table() {
        assert_eq!(Stage::Load(TableKind::Sales).to_string(), "load:sales");
        assert_eq!(
            serde_json::to_string(&Stage::Extract(TableKind::Products)).unwrap(),
            "\"extract:products\""
        );
        assert_eq!(
            serde_json::to_string(&PipelineState::DimensionsLoaded).unwrap(),
            "\"DIMENSIONS_LOADED\""
        );
    }
}
