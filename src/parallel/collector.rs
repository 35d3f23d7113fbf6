//! Collectors: materialize a closed stream into a group.

use crossbeam_channel::Receiver;

use crate::debug::DebugLog;
use crate::error::PipelineError;

use super::cancel::{recv_or_cancel, CancelToken};

/// Drain `rx` until every producer has dropped its sender. The returned
/// group is owned by the caller; nothing else ever saw it.
pub(crate) fn collect_stream<T>(
    name: &str,
    rx: Receiver<Vec<T>>,
    cancel: &CancelToken,
    debug: &DebugLog,
) -> Result<Vec<T>, PipelineError> {
    let mut group = Vec::new();

    loop {
        match recv_or_cancel(&rx, cancel) {
            Ok(Some(mut chunk)) => group.append(&mut chunk),
            Ok(None) => break,
            Err(_) => return Err(PipelineError::Cancelled),
        }
    }

    debug.log_basic(name, &format!("stream closed, {} collected", group.len()));
    Ok(group)
}
