//! Structural and dispatch error types.
//!
//! Per the specification's error model, only genuine *bugs* (a duplicate
//! transaction id, a write issued against a read-only transaction) and
//! *syntax* problems in the operation stream are represented as errors.
//! Data-availability waits and concurrency aborts are ordinary operational
//! outcomes — see `repcrec_concurrency::outcome::Outcome` — not `Err`
//! values.

use thiserror::Error;

use crate::types::TransactionId;

/// A structural/programmer error raised by a [`TransactionManager`] entry
/// point.
///
/// [`TransactionManager`]: https://docs.rs/repcrec-concurrency
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ManagerError {
    /// `begin`/`beginRO` issued for a transaction id that is already known.
    #[error("transaction {0} already exists")]
    DuplicateTransaction(TransactionId),

    /// `write` issued against a read-only transaction.
    #[error("transaction {0} is read-only and cannot write")]
    ReadOnlyWrite(TransactionId),
}

/// A syntax error while turning an operation-stream line into a structured
/// operation. Raised by the `cli` crate's line parser, never by the core.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// The line didn't match any known operation keyword.
    #[error("unrecognized operation: {0}")]
    UnknownOperation(String),

    /// The operation keyword matched but its arguments didn't parse.
    #[error("malformed arguments for {op}: {detail}")]
    MalformedArguments {
        /// The operation keyword, lower-cased.
        op: String,
        /// A human-readable description of what went wrong.
        detail: String,
    },
}
