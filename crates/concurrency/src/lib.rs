//! The RepCRec transaction manager: multiversion storage across ten
//! replica sites, the available-copies read/write protocol, and
//! serialization-graph commit validation.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod dispatch;
pub mod graph;
pub mod manager;
pub mod outcome;
pub mod site;
pub mod transaction;

pub use dispatch::{dispatch, Operation};
pub use manager::TransactionManager;
pub use outcome::{AbortReason, DumpTable, Outcome, ReadSource, SiteRow, WaitReason};
pub use transaction::{Transaction, TransactionKind, TransactionStatus};
