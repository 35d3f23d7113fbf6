//! Sink dispatch: where ordered groups leave the pipeline.

use anyhow::Result;

use crate::record::{MalformedRecord, Record};

use super::types::GroupKind;

/// Receiver of the pipeline's ordered output.
///
/// `emit` is called exactly once per group on a successful run, accepted
/// first, each group already sorted by identifier. `emit_malformed` is
/// called once, after both groups, only when malformed rows are diverted.
/// Nothing is emitted when a run fails or is cancelled.
pub trait GroupSink {
    fn emit(&mut self, kind: GroupKind, records: Vec<Record>) -> Result<()>;

    fn emit_malformed(&mut self, _records: Vec<MalformedRecord>) -> Result<()> {
        Ok(())
    }
}

/// Keeps every group in memory. Used by tests and library callers that want
/// the results back rather than written out.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub accepted: Vec<Record>,
    pub rejected: Vec<Record>,
    pub malformed: Vec<MalformedRecord>,
    emits: usize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `emit`/`emit_malformed` calls received.
    pub fn emit_count(&self) -> usize {
        self.emits
    }

    pub fn accepted_ids(&self) -> Vec<u32> {
        self.accepted.iter().map(|r| r.id).collect()
    }

    pub fn rejected_ids(&self) -> Vec<u32> {
        self.rejected.iter().map(|r| r.id).collect()
    }
}

impl GroupSink for MemorySink {
    fn emit(&mut self, kind: GroupKind, records: Vec<Record>) -> Result<()> {
        self.emits += 1;
        match kind {
            GroupKind::Accepted => self.accepted = records,
            GroupKind::Rejected => self.rejected = records,
        }
        Ok(())
    }

    fn emit_malformed(&mut self, records: Vec<MalformedRecord>) -> Result<()> {
        self.emits += 1;
        self.malformed = records;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_routes_by_kind() {
        let mut sink = MemorySink::new();
        sink.emit(GroupKind::Accepted, vec![Record::new(1, "a")]).unwrap();
        sink.emit(GroupKind::Rejected, vec![Record::new(2, "b"), Record::new(3, "c")])
            .unwrap();

        assert_eq!(sink.accepted_ids(), vec![1]);
        assert_eq!(sink.rejected_ids(), vec![2, 3]);
        assert!(sink.malformed.is_empty());
        assert_eq!(sink.emit_count(), 2);
    }
}
