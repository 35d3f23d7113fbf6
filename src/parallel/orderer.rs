//! Orderer: restores identifier order after fan-in.

use std::thread;

use crate::error::PipelineError;
use crate::record::{MalformedRecord, Record};

/// Sort a group by identifier. Ties keep no particular order.
pub fn order_group(group: &mut [Record]) {
    group.sort_unstable_by_key(|record| record.id);
}

/// Malformed rows have no trusted identifier, so they go back into input order.
pub fn order_malformed(group: &mut [MalformedRecord]) {
    group.sort_unstable_by_key(|record| record.row);
}

/// Sort the accepted and rejected groups on two threads. Each sort finishes
/// before this returns.
pub(crate) fn order_groups(
    accepted: &mut [Record],
    rejected: &mut [Record],
) -> Result<(), PipelineError> {
    thread::scope(|scope| {
        let accepted_sort = scope.spawn(move || order_group(accepted));
        let rejected_sort = scope.spawn(move || order_group(rejected));

        let accepted_ok = accepted_sort.join().is_ok();
        let rejected_ok = rejected_sort.join().is_ok();
        if accepted_ok && rejected_ok {
            Ok(())
        } else {
            Err(PipelineError::StagePanicked("orderer"))
        }
    })
}
