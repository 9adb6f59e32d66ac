//! Maps a parsed operation onto the matching [`TransactionManager`] call.
//!
//! This is the only place that knows the operation stream's vocabulary;
//! everything upstream (line parsing) and downstream (line formatting) is
//! the `cli` crate's concern.

use repcrec_core::{ManagerError, TransactionId, VarId};

use crate::manager::TransactionManager;
use crate::outcome::Outcome;

/// A single structured operation from the driver input, already validated
/// down to typed fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// `begin(Tn)`
    Begin(TransactionId),
    /// `beginRO(Tn)`
    BeginReadOnly(TransactionId),
    /// `R(Tn, xk)`
    Read(TransactionId, VarId),
    /// `W(Tn, xk, v)`
    Write(TransactionId, VarId, i64),
    /// `end(Tn)`
    End(TransactionId),
    /// `fail(s)`. Carries the raw site number rather than a validated
    /// [`SiteId`](repcrec_core::SiteId): out-of-range ids are silently
    /// ignored by the manager, not rejected at parse time.
    Fail(u8),
    /// `recover(s)`
    Recover(u8),
    /// `dump()`
    Dump,
}

/// Run `op` against `manager`, returning the outcomes it produced.
pub fn dispatch(
    manager: &mut TransactionManager,
    op: Operation,
) -> Result<Vec<Outcome>, ManagerError> {
    match op {
        Operation::Begin(tid) => manager.begin(tid),
        Operation::BeginReadOnly(tid) => manager.begin_read_only(tid),
        Operation::Read(tid, var) => Ok(manager.read(&tid, var)),
        Operation::Write(tid, var, value) => manager.write(&tid, var, value),
        Operation::End(tid) => Ok(manager.end(&tid)),
        Operation::Fail(site) => Ok(manager.fail(site)),
        Operation::Recover(site) => Ok(manager.recover(site)),
        Operation::Dump => Ok(manager.dump()),
    }
}
