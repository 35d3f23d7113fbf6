//! Error types shared by the rule engine and the validation pipeline.

use std::time::Duration;
use thiserror::Error;

/// Failure to turn rule configuration into a usable rule.
#[derive(Debug, Error)]
pub enum RuleError {
    #[error("invalid rule pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("unknown match semantics '{0}' (expected accept or reject)")]
    UnknownSemantics(String),

    #[error("unknown rule preset '{0}'")]
    UnknownPreset(String),
}

/// Why a raw field tuple could not become a record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedReason {
    #[error("expected {expected} fields, found {found}")]
    FieldCount { expected: usize, found: usize },

    #[error("identifier '{text}' is not an unsigned 32-bit integer")]
    BadIdentifier { text: String },
}

/// Failures that end a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("malformed record at data row {row}: {reason}")]
    MalformedInput { row: u64, reason: MalformedReason },

    #[error("failed to read input: {0}")]
    Source(#[from] std::io::Error),

    #[error("pipeline cancelled")]
    Cancelled,

    #[error("pipeline deadline of {} exceeded", humantime::format_duration(*.0))]
    DeadlineExceeded(Duration),

    #[error("{0} thread panicked")]
    StagePanicked(&'static str),

    #[error("failed to start {stage} thread: {source}")]
    Spawn {
        stage: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid pipeline configuration: {0}")]
    Config(String),

    #[error("failed to hand off results: {0}")]
    Sink(#[source] anyhow::Error),
}

impl PipelineError {
    /// True when the run ended because something asked it to stop, rather
    /// than because the input or a stage failed.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled | Self::DeadlineExceeded(_))
    }
}
