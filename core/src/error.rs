use crate::types::BatchId;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // ── Recoverable: collected as warnings by the loader ──────────────

    #[error("Missing pair for '{id}': found {present} but no {missing}")]
    MissingPair {
        id: BatchId,
        present: &'static str,
        missing: &'static str,
    },

    #[error("Malformed record in {file} row {row}: {reason}")]
    MalformedRecord {
        file: String,
        row: usize,
        reason: String,
    },

    #[error("Unreadable pair '{id}': {reason}")]
    UnreadablePair { id: BatchId, reason: String },

    // ── Fatal: stop the stage before anything is written ─────────────

    #[error("No scenario results found in {}", dir.display())]
    NoResults { dir: PathBuf },

    #[error("No scenario aggregates to rank")]
    EmptyInput,

    #[error("No winner scenarios found; check the ranking artifact")]
    NoWinners,

    #[error("No records matched the {selection} scenario selection")]
    EmptySelection { selection: &'static str },

    #[error("Winner fraction must be in (0, 1], got {0}")]
    InvalidWinnerFraction(f64),

    #[error("Ranking artifact {} is malformed: {reason}", path.display())]
    RankingArtifact { path: PathBuf, reason: String },
}

impl AnalysisError {
    /// Per-file and per-record errors never abort a run.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AnalysisError::MissingPair { .. }
                | AnalysisError::MalformedRecord { .. }
                | AnalysisError::UnreadablePair { .. }
        )
    }
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;

/// The pipeline stage a fatal error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Config,
    Load,
    Rank,
    Cte0,
    Cte80,
    Publish,
}

impl Stage {
    pub fn name(self) -> &'static str {
        match self {
            Stage::Config  => "config",
            Stage::Load    => "load",
            Stage::Rank    => "rank",
            Stage::Cte0    => "cte0",
            Stage::Cte80   => "cte80",
            Stage::Publish => "publish",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A fatal error tagged with the stage that raised it.
#[derive(Error, Debug)]
#[error("{stage} stage failed: {source}")]
pub struct PipelineError {
    pub stage: Stage,
    #[source]
    pub source: AnalysisError,
}

impl PipelineError {
    pub fn new(stage: Stage, source: AnalysisError) -> Self {
        Self { stage, source }
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Attach a stage to a library result.
pub trait StageContext<T> {
    fn stage(self, stage: Stage) -> PipelineResult<T>;
}

impl<T> StageContext<T> for AnalysisResult<T> {
    fn stage(self, stage: Stage) -> PipelineResult<T> {
        self.map_err(|source| PipelineError::new(stage, source))
    }
}
