//! Type definitions for the validation pipeline
//!
//! Contains configuration, the messages that travel between stages, and the
//! observable pipeline state.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::PipelineError;
use crate::record::{RawFields, Record};

pub const DEFAULT_WORKERS: usize = 3;
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// What to do with a row that cannot become a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MalformedPolicy {
    /// Stop the whole run; nothing is handed to the sink.
    #[default]
    Abort,
    /// Route the row to the malformed group and keep going.
    Divert,
}

/// Configuration for the validation pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub workers: usize,
    pub queue_capacity: usize,
    pub batch_size: usize,
    pub malformed_policy: MalformedPolicy,
    pub deadline: Option<Duration>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            batch_size: DEFAULT_BATCH_SIZE,
            malformed_policy: MalformedPolicy::Abort,
            deadline: None,
        }
    }
}

impl PipelineConfig {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_malformed_policy(mut self, policy: MalformedPolicy) -> Self {
        self.malformed_policy = policy;
        self
    }

    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.workers == 0 {
            return Err(PipelineError::Config("worker count must be at least 1".into()));
        }
        if self.queue_capacity == 0 {
            return Err(PipelineError::Config("queue capacity must be at least 1".into()));
        }
        if self.batch_size == 0 {
            return Err(PipelineError::Config("batch size must be at least 1".into()));
        }
        Ok(())
    }
}

/// Raw rows read from the source, in input order.
#[derive(Debug)]
pub(crate) struct RawBatch {
    pub id: u64,
    /// 1-based data row number of `rows[0]`.
    pub first_row: u64,
    pub rows: Vec<RawFields>,
}

/// Records built from one raw batch, not yet validated.
#[derive(Debug)]
pub(crate) struct RecordBatch {
    pub id: u64,
    pub records: Vec<Record>,
}

/// Which output group a set of records belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupKind {
    Accepted,
    Rejected,
}

impl GroupKind {
    pub fn as_str(self) -> &'static str {
        match self {
            GroupKind::Accepted => "accepted",
            GroupKind::Rejected => "rejected",
        }
    }
}

impl fmt::Display for GroupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Constructed, nothing started.
    Idle,
    /// Stages are moving records.
    Running,
    /// The source is exhausted; buffered work is flowing out.
    Draining,
    /// Groups collected, ordered and handed to the sink.
    Complete,
    /// Stopped by cancellation or deadline; partial results discarded.
    Cancelled,
    /// Stopped by malformed input, a source/sink error or a panicking stage.
    Failed,
}

impl PipelineState {
    fn code(self) -> u8 {
        match self {
            PipelineState::Idle => 0,
            PipelineState::Running => 1,
            PipelineState::Draining => 2,
            PipelineState::Complete => 3,
            PipelineState::Cancelled => 4,
            PipelineState::Failed => 5,
        }
    }

    fn from_code(code: u8) -> Self {
        match code {
            1 => PipelineState::Running,
            2 => PipelineState::Draining,
            3 => PipelineState::Complete,
            4 => PipelineState::Cancelled,
            5 => PipelineState::Failed,
            _ => PipelineState::Idle,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            PipelineState::Complete | PipelineState::Cancelled | PipelineState::Failed
        )
    }
}

/// Read-only view of a pipeline's state, usable from other threads while
/// the run is in progress and after it has finished.
#[derive(Debug, Clone)]
pub struct StateProbe {
    state: Arc<AtomicU8>,
}

impl StateProbe {
    pub(crate) fn new() -> Self {
        Self {
            state: Arc::new(AtomicU8::new(PipelineState::Idle.code())),
        }
    }

    pub fn get(&self) -> PipelineState {
        PipelineState::from_code(self.state.load(Ordering::SeqCst))
    }

    pub(crate) fn set(&self, state: PipelineState) {
        self.state.store(state.code(), Ordering::SeqCst);
    }

    /// Move from `from` to `to` only if the pipeline is still in `from`.
    pub(crate) fn advance(&self, from: PipelineState, to: PipelineState) -> bool {
        self.state
            .compare_exchange(from.code(), to.code(), Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }
}
