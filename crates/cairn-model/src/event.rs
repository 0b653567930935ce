//! Structural-change notifications.
//!
//! Every mutating workspace operation records a [`ChangeEvent`]. Events that
//! belong to one logical user action (a procedure-signature propagation, for
//! instance) share a group id so that no observer sees the action half
//! applied.

use crate::{
    block::BlockId,
    connection::PortRef,
    mutation::MutationForm,
};

/// One structural or property change in the workspace.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
    BlockCreated {
        id: BlockId,
        kind: String,
    },
    BlockDeleted {
        id: BlockId,
    },
    Connected {
        superior: PortRef,
        inferior: PortRef,
    },
    Disconnected {
        superior: PortRef,
        inferior: PortRef,
    },
    FieldChanged {
        block: BlockId,
        field: String,
        old: String,
        new: String,
    },
    MutationChanged {
        block: BlockId,
        old: Option<MutationForm>,
        new: MutationForm,
    },
}

/// A recorded event plus the change-group it belongs to, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct Recorded {
    pub group: Option<u64>,
    pub event: ChangeEvent,
}

/// Synchronous, in-order event log with nestable change-groups.
#[derive(Debug, Default)]
pub struct EventLog {
    records: Vec<Recorded>,
    depth: usize,
    current_group: u64,
    next_group: u64,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&mut self, event: ChangeEvent) {
        let group = (self.depth > 0).then_some(self.current_group);
        self.records.push(Recorded { group, event });
    }

    /// Opens a change-group. Nested opens join the outermost group.
    pub(crate) fn begin_group(&mut self) {
        if self.depth == 0 {
            self.current_group = self.next_group;
            self.next_group += 1;
        }
        self.depth += 1;
    }

    pub(crate) fn end_group(&mut self) {
        debug_assert!(self.depth > 0, "end_group without begin_group");
        self.depth = self.depth.saturating_sub(1);
    }

    pub fn records(&self) -> &[Recorded] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Hands the recorded events to the caller and clears the log.
    pub fn drain(&mut self) -> Vec<Recorded> {
        std::mem::take(&mut self.records)
    }
}
