//! Structured, formatting-free results of manager operations.
//!
//! The manager never builds strings: it returns these typed outcomes and
//! leaves rendering to the `cli` crate, mirroring how the teacher keeps
//! engine crates free of any knowledge of display formatting.

use repcrec_core::{SiteId, TransactionId, VarId};

/// Where a read's value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadSource {
    /// Served from the transaction's own uncommitted write buffer.
    WriteCache,
    /// Served from a site's committed version history.
    Site(SiteId),
}

/// Why an operation could not proceed and returned a wait outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitReason {
    /// No up site could serve the read.
    NoSiteAvailableForRead,
    /// No up site is a valid write target.
    NoSiteAvailableForWrite,
}

/// Why a transaction aborted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    /// A serialization-graph cycle would result from this operation.
    SerializationCycle,
    /// Another transaction already committed a write to the same variable
    /// after this transaction started.
    FirstCommitterWins,
    /// A site this transaction wrote to failed before `end`.
    WriteSiteFailed,
    /// `end` was called on a transaction that had already aborted.
    AlreadyAborted,
}

/// One row of a `dump()` table: a site's status and its visible variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteRow {
    /// The site this row describes.
    pub site: SiteId,
    /// Whether the site is up.
    pub is_up: bool,
    /// `(var, value)` pairs visible at this site; empty when down.
    pub values: Vec<(VarId, i64)>,
}

/// The full state snapshot produced by `dump()`, one row per site in
/// ascending site-id order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpTable {
    /// One row per site, in ascending site-id order.
    pub rows: Vec<SiteRow>,
}

/// A single externally observable event emitted by a manager operation.
///
/// Most operations emit exactly one outcome. A read that closes a
/// serialization cycle emits two: the read itself, then the abort it
/// triggers — hence manager methods return `Vec<Outcome>` rather than a
/// single value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A read-write transaction began.
    Begin {
        /// The transaction that began.
        tid: TransactionId,
    },
    /// A read-only transaction began.
    BeginReadOnly {
        /// The transaction that began.
        tid: TransactionId,
    },
    /// A read returned a value.
    Read {
        /// The reading transaction.
        tid: TransactionId,
        /// The variable read.
        var: VarId,
        /// The value observed.
        value: i64,
        /// Where the value came from.
        source: ReadSource,
    },
    /// A write was buffered.
    Write {
        /// The writing transaction.
        tid: TransactionId,
        /// The variable written.
        var: VarId,
        /// The value buffered.
        value: i64,
        /// The sites this write will target at commit, in ascending order.
        target_sites: Vec<SiteId>,
    },
    /// An operation could not proceed; the transaction remains active.
    Wait {
        /// The waiting transaction.
        tid: TransactionId,
        /// Why it's waiting.
        reason: WaitReason,
    },
    /// A transaction committed.
    Commit {
        /// The transaction that committed.
        tid: TransactionId,
        /// The clock reading recorded at commit.
        commit_time: u64,
    },
    /// A transaction aborted.
    Abort {
        /// The transaction that aborted.
        tid: TransactionId,
        /// Why it aborted.
        reason: AbortReason,
    },
    /// A site failed.
    SiteFails {
        /// The site that failed.
        site: SiteId,
    },
    /// A site recovered.
    SiteRecovers {
        /// The site that recovered.
        site: SiteId,
    },
    /// The result of a `dump()` call.
    Dump(DumpTable),
}
