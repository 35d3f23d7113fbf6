//! Validation worker pool
//!
//! A supervisor thread owns the accepted/rejected senders and runs N
//! workers inside its own scope. Workers borrow the senders; once the scope
//! has joined every worker, the supervisor drops them, which is what closes
//! the streams for the collectors. No sender is ever dropped while a worker
//! could still be writing through it.

use crossbeam_channel::{Receiver, Sender};
use std::thread;

use crate::debug::DebugLog;
use crate::error::PipelineError;
use crate::record::Record;
use crate::rules::RuleEngine;

use super::cancel::{recv_or_cancel, send_or_cancel, CancelReason, CancelToken, Interrupted};
use super::types::RecordBatch;

#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct WorkerStats {
    pub batches: u64,
    pub accepted: u64,
    pub rejected: u64,
}

impl WorkerStats {
    fn merge(&mut self, other: WorkerStats) {
        self.batches += other.batches;
        self.accepted += other.accepted;
        self.rejected += other.rejected;
    }
}

pub(crate) struct PoolQueues {
    pub records: Receiver<RecordBatch>,
    pub accepted: Sender<Vec<Record>>,
    pub rejected: Sender<Vec<Record>>,
}

/// Run the pool until the record queue is closed and drained, or until
/// cancelled. Returns the merged counters of all workers.
pub(crate) fn run_pool(
    workers: usize,
    queues: PoolQueues,
    engine: &RuleEngine,
    cancel: &CancelToken,
    debug: &DebugLog,
) -> Result<WorkerStats, PipelineError> {
    let PoolQueues {
        records,
        accepted,
        rejected,
    } = queues;

    let outcomes: Vec<Result<WorkerStats, PipelineError>> = thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(|worker_id| {
                let records = &records;
                let accepted = &accepted;
                let rejected = &rejected;
                thread::Builder::new()
                    .name(format!("rulesplit-worker-{}", worker_id))
                    .spawn_scoped(scope, move || {
                        worker_loop(worker_id, records, accepted, rejected, engine, cancel, debug)
                    })
            })
            .collect();

        // Barrier: every worker is joined before the scope ends
        handles
            .into_iter()
            .map(|spawned| match spawned {
                Ok(handle) => handle.join().unwrap_or_else(|_| {
                    cancel.cancel_with(CancelReason::StageFailed);
                    Err(PipelineError::StagePanicked("worker"))
                }),
                Err(e) => {
                    cancel.cancel_with(CancelReason::StageFailed);
                    Err(PipelineError::Spawn {
                        stage: "worker",
                        source: e,
                    })
                }
            })
            .collect()
    });

    // Close: only now can the collectors see end-of-stream
    drop(accepted);
    drop(rejected);

    let mut total = WorkerStats::default();
    let mut first_error: Option<PipelineError> = None;
    for outcome in outcomes {
        match outcome {
            Ok(stats) => total.merge(stats),
            Err(e) => {
                let replace = match &first_error {
                    None => true,
                    Some(existing) => existing.is_cancellation() && !e.is_cancellation(),
                };
                if replace {
                    first_error = Some(e);
                }
            }
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => {
            debug.log_basic(
                "pool",
                &format!(
                    "{} workers finished: {} accepted, {} rejected",
                    workers, total.accepted, total.rejected
                ),
            );
            Ok(total)
        }
    }
}

fn worker_loop(
    worker_id: usize,
    records: &Receiver<RecordBatch>,
    accepted: &Sender<Vec<Record>>,
    rejected: &Sender<Vec<Record>>,
    engine: &RuleEngine,
    cancel: &CancelToken,
    debug: &DebugLog,
) -> Result<WorkerStats, PipelineError> {
    let mut stats = WorkerStats::default();
    let stage = format!("worker-{}", worker_id);

    loop {
        let batch = match recv_or_cancel(records, cancel) {
            Ok(Some(batch)) => batch,
            Ok(None) => break,
            Err(_) => return Err(PipelineError::Cancelled),
        };

        let batch_id = batch.id;
        let (good, bad) = validate_batch(batch.records, engine);
        stats.batches += 1;
        stats.accepted += good.len() as u64;
        stats.rejected += bad.len() as u64;

        debug.log_trace(
            &stage,
            &format!(
                "batch {}: {} accepted, {} rejected",
                batch_id,
                good.len(),
                bad.len()
            ),
        );

        if !good.is_empty() {
            route(accepted, good, cancel)?;
        }
        if !bad.is_empty() {
            route(rejected, bad, cancel)?;
        }
    }

    Ok(stats)
}

/// Validate every record in place and split by verdict.
fn validate_batch(records: Vec<Record>, engine: &RuleEngine) -> (Vec<Record>, Vec<Record>) {
    let mut good = Vec::with_capacity(records.len());
    let mut bad = Vec::new();

    for mut record in records {
        let valid = engine.is_valid(&record.value);
        record.mark_validated(valid);
        if valid {
            good.push(record);
        } else {
            bad.push(record);
        }
    }

    (good, bad)
}

fn route(
    tx: &Sender<Vec<Record>>,
    chunk: Vec<Record>,
    cancel: &CancelToken,
) -> Result<(), PipelineError> {
    match send_or_cancel(tx, chunk, cancel) {
        Ok(()) => Ok(()),
        Err(Interrupted::Cancelled) => Err(PipelineError::Cancelled),
        Err(Interrupted::Disconnected) => {
            cancel.cancel_with(CancelReason::StageFailed);
            Err(PipelineError::Cancelled)
        }
    }
}
