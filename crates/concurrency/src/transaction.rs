//! Transaction records and their lifecycle.

use std::collections::{HashMap, HashSet};

use repcrec_core::{TransactionId, VarId};

/// Whether a transaction may buffer writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionKind {
    /// Ordinary transaction: may read and write.
    ReadWrite,
    /// Snapshot-only transaction: reads a consistent view as of its start
    /// time and never mutates any site.
    ReadOnly,
}

/// A transaction's position in its lifecycle. `Committed` and `Aborted`
/// are sinks: no further transition is possible out of either.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    /// Executing; may still read, write, and (for read-write transactions)
    /// be asked to commit.
    Active,
    /// Committed at the given clock reading.
    Committed {
        /// The clock reading recorded at commit.
        commit_time: u64,
    },
    /// Aborted; its write buffer and write set have been discarded.
    Aborted,
}

/// A transaction's full state as tracked by the manager.
#[derive(Debug, Clone)]
pub struct Transaction {
    /// The transaction's identity.
    pub tid: TransactionId,
    /// Read-write or read-only.
    pub kind: TransactionKind,
    /// The clock reading at `begin`/`beginRO`.
    pub start_time: u64,
    /// Current lifecycle state.
    pub status: TransactionStatus,
    /// Uncommitted writes, keyed by variable.
    pub write_buffer: HashMap<VarId, i64>,
    /// `== write_buffer.keys()` until commit; survives commit (cleared only
    /// on abort) so later write-write and write-after-read graph edges can
    /// still see what this transaction wrote.
    pub write_set: HashSet<VarId>,
    /// For each variable read, the commit time of the version observed.
    pub read_set: HashMap<VarId, u64>,
    /// Set when a site this transaction has written to fails mid-run;
    /// forces an abort at `end` regardless of validation outcome.
    pub should_abort: bool,
}

impl Transaction {
    /// Start a new, empty transaction.
    pub fn new(tid: TransactionId, kind: TransactionKind, start_time: u64) -> Self {
        Self {
            tid,
            kind,
            start_time,
            status: TransactionStatus::Active,
            write_buffer: HashMap::new(),
            write_set: HashSet::new(),
            read_set: HashMap::new(),
            should_abort: false,
        }
    }

    /// Whether this transaction may still read, write, or commit.
    pub fn is_active(&self) -> bool {
        matches!(self.status, TransactionStatus::Active)
    }

    /// Discard buffered writes and move to the terminal `Aborted` state.
    ///
    /// The read set is intentionally left intact: it still participates in
    /// serialization-graph bookkeeping for other transactions that commit
    /// after this one aborts.
    pub fn abort(&mut self) {
        self.status = TransactionStatus::Aborted;
        self.write_buffer.clear();
        self.write_set.clear();
    }
}
