//! Immutable version records.

use crate::types::TransactionId;

/// A single committed version of a variable: `(value, writer, commit_time)`.
///
/// Versions are never mutated or removed once appended to a site's
/// per-variable history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    /// The committed value.
    pub value: i64,
    /// The transaction that wrote this version (`T0` for the genesis version).
    pub writer: TransactionId,
    /// The clock reading at commit time.
    pub commit_time: u64,
}

impl Version {
    /// Build a version record.
    pub fn new(value: i64, writer: TransactionId, commit_time: u64) -> Self {
        Self {
            value,
            writer,
            commit_time,
        }
    }

    /// The genesis version `(10 * i, T0, 0)` for variable `xi`.
    pub fn genesis(initial_value: i64) -> Self {
        Self::new(initial_value, TransactionId::genesis(), 0)
    }
}
