//! Concurrent validation pipeline
//!
//! Records flow through bounded queues from a single ingest thread to a
//! builder, fan out to a pool of validation workers, and fan back in to one
//! collector per output group. Once every collector has drained its stream,
//! the groups are sorted by identifier and handed to a [`GroupSink`].
//!
//! # Module Structure
//!
//! - `types`: Configuration, queue messages and the pipeline state machine
//! - `cancel`: Shared cancellation token and cancellable queue operations
//! - `ingest`: Source reader and batcher
//! - `builder`: Raw rows to records, malformed-row policy
//! - `worker`: Validation worker pool with barrier-then-close shutdown
//! - `collector`: Stream-to-group accumulation
//! - `orderer`: Identifier ordering of the collected groups
//! - `sink`: Output hand-off trait and the in-memory sink
//! - `processor`: Main ValidationPipeline orchestration

mod builder;
mod cancel;
mod collector;
mod ingest;
mod orderer;
mod processor;
mod sink;
mod types;
mod worker;

// Re-export public types
pub use cancel::{CancelReason, CancelToken};
pub use orderer::{order_group, order_malformed};
pub use processor::{CompletionHook, ValidationPipeline};
pub use sink::{GroupSink, MemorySink};
pub use types::{
    GroupKind, MalformedPolicy, PipelineConfig, PipelineState, StateProbe,
    DEFAULT_BATCH_SIZE, DEFAULT_QUEUE_CAPACITY, DEFAULT_WORKERS,
};
