//! Builder stage: turns raw batches into record batches.

use crossbeam_channel::{Receiver, Sender};

use crate::debug::DebugLog;
use crate::error::PipelineError;
use crate::record::{build_record, MalformedRecord, Record};

use super::cancel::{recv_or_cancel, send_or_cancel, CancelReason, CancelToken, Interrupted};
use super::types::{MalformedPolicy, RawBatch, RecordBatch};

#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct BuilderStats {
    pub records: u64,
    pub malformed: u64,
}

pub(crate) struct BuilderQueues {
    pub raw: Receiver<RawBatch>,
    pub records: Sender<RecordBatch>,
    pub malformed: Sender<Vec<MalformedRecord>>,
}

/// Single builder thread. Owns both output senders, so they close when it
/// returns.
pub(crate) fn builder_stage(
    queues: BuilderQueues,
    policy: MalformedPolicy,
    cancel: &CancelToken,
    debug: &DebugLog,
) -> Result<BuilderStats, PipelineError> {
    let mut stats = BuilderStats::default();

    loop {
        let batch = match recv_or_cancel(&queues.raw, cancel) {
            Ok(Some(batch)) => batch,
            Ok(None) => break,
            Err(_) => return Err(PipelineError::Cancelled),
        };

        let batch_id = batch.id;
        let (records, malformed) = build_batch(batch, policy, cancel)?;
        stats.records += records.len() as u64;
        stats.malformed += malformed.len() as u64;

        debug.log_trace(
            "builder",
            &format!(
                "batch {}: {} records, {} malformed",
                batch_id,
                records.len(),
                malformed.len()
            ),
        );

        if !malformed.is_empty() {
            forward(&queues.malformed, malformed, cancel)?;
        }
        if !records.is_empty() {
            forward(
                &queues.records,
                RecordBatch {
                    id: batch_id,
                    records,
                },
                cancel,
            )?;
        }
    }

    debug.log_basic(
        "builder",
        &format!(
            "built {} records ({} malformed)",
            stats.records, stats.malformed
        ),
    );
    Ok(stats)
}

fn build_batch(
    batch: RawBatch,
    policy: MalformedPolicy,
    cancel: &CancelToken,
) -> Result<(Vec<Record>, Vec<MalformedRecord>), PipelineError> {
    let mut records = Vec::with_capacity(batch.rows.len());
    let mut malformed = Vec::new();

    for (offset, fields) in batch.rows.into_iter().enumerate() {
        let row = batch.first_row + offset as u64;
        // build_record consumes its input; keep a copy only when diverting
        let kept = match policy {
            MalformedPolicy::Divert => Some(fields.clone()),
            MalformedPolicy::Abort => None,
        };

        match build_record(fields) {
            Ok(record) => records.push(record),
            Err(reason) => match kept {
                Some(fields) => malformed.push(MalformedRecord {
                    row,
                    fields,
                    reason,
                }),
                None => {
                    cancel.cancel_with(CancelReason::StageFailed);
                    return Err(PipelineError::MalformedInput { row, reason });
                }
            },
        }
    }

    Ok((records, malformed))
}

fn forward<T>(tx: &Sender<T>, msg: T, cancel: &CancelToken) -> Result<(), PipelineError> {
    match send_or_cancel(tx, msg, cancel) {
        Ok(()) => Ok(()),
        Err(Interrupted::Cancelled) => Err(PipelineError::Cancelled),
        Err(Interrupted::Disconnected) => {
            cancel.cancel_with(CancelReason::StageFailed);
            Err(PipelineError::Cancelled)
        }
    }
}
