//! Ingest stage: pulls raw rows from the source and batches them.

use crossbeam_channel::Sender;
use std::io;

use crate::debug::DebugLog;
use crate::error::PipelineError;
use crate::record::RawFields;

use super::cancel::{send_or_cancel, CancelReason, CancelToken, Interrupted};
use super::types::{PipelineState, RawBatch, StateProbe};

#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct IngestStats {
    pub rows_read: u64,
    pub batches: u64,
}

/// Read `source` to exhaustion, sending batches of up to `batch_size` rows.
///
/// Takes the sender by value: returning drops it, which is how the builder
/// learns that the input is finished.
pub(crate) fn ingest_stage<S>(
    source: S,
    raw_sender: Sender<RawBatch>,
    batch_size: usize,
    cancel: &CancelToken,
    probe: &StateProbe,
    debug: &DebugLog,
) -> Result<IngestStats, PipelineError>
where
    S: Iterator<Item = io::Result<RawFields>>,
{
    let mut stats = IngestStats::default();
    let mut pending: Vec<RawFields> = Vec::with_capacity(batch_size);
    let mut first_row = 1u64;

    for row in source {
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        let fields = match row {
            Ok(fields) => fields,
            Err(e) => {
                cancel.cancel_with(CancelReason::StageFailed);
                return Err(PipelineError::Source(e));
            }
        };

        stats.rows_read += 1;
        pending.push(fields);

        if pending.len() >= batch_size {
            let rows = std::mem::replace(&mut pending, Vec::with_capacity(batch_size));
            send_batch(&raw_sender, &mut stats, &mut first_row, rows, cancel, debug)?;
        }
    }

    if !pending.is_empty() {
        send_batch(&raw_sender, &mut stats, &mut first_row, pending, cancel, debug)?;
    }

    probe.advance(PipelineState::Running, PipelineState::Draining);
    debug.log_basic(
        "ingest",
        &format!(
            "source exhausted after {} rows in {} batches, draining",
            stats.rows_read, stats.batches
        ),
    );
    Ok(stats)
}

fn send_batch(
    raw_sender: &Sender<RawBatch>,
    stats: &mut IngestStats,
    first_row: &mut u64,
    rows: Vec<RawFields>,
    cancel: &CancelToken,
    debug: &DebugLog,
) -> Result<(), PipelineError> {
    let row_count = rows.len() as u64;
    let batch = RawBatch {
        id: stats.batches,
        first_row: *first_row,
        rows,
    };

    debug.log_trace(
        "ingest",
        &format!(
            "batch {} rows {}..={}",
            batch.id,
            batch.first_row,
            batch.first_row + row_count - 1
        ),
    );

    match send_or_cancel(raw_sender, batch, cancel) {
        Ok(()) => {}
        Err(Interrupted::Cancelled) => return Err(PipelineError::Cancelled),
        Err(Interrupted::Disconnected) => {
            cancel.cancel_with(CancelReason::StageFailed);
            return Err(PipelineError::Cancelled);
        }
    }

    stats.batches += 1;
    *first_row += row_count;
    Ok(())
}
