//! The transaction manager: the single owner of all sites, transactions,
//! and the serialization graph, and the only thing that mutates them.

use std::collections::{BTreeMap, HashMap, HashSet};

use repcrec_core::{Clock, ManagerError, SiteId, TransactionId, VarId};
use tracing::debug;

use crate::graph::SerializationGraph;
use crate::outcome::{AbortReason, DumpTable, Outcome, ReadSource, SiteRow, WaitReason};
use crate::site::Site;
use crate::transaction::{Transaction, TransactionKind, TransactionStatus};

/// Owns every site, every transaction, the graph, and the clock. There is
/// exactly one of these per run; it is not a singleton, just a composite
/// value the driver holds and calls into.
#[derive(Debug, Clone)]
pub struct TransactionManager {
    clock: Clock,
    sites: BTreeMap<SiteId, Site>,
    transactions: HashMap<TransactionId, Transaction>,
    graph: SerializationGraph,
}

impl Default for TransactionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionManager {
    /// A fresh manager: ten up sites at genesis state, no transactions.
    pub fn new() -> Self {
        Self {
            clock: Clock::new(),
            sites: SiteId::all().map(|id| (id, Site::new(id))).collect(),
            transactions: HashMap::new(),
            graph: SerializationGraph::new(),
        }
    }

    /// Start a read-write transaction.
    pub fn begin(&mut self, tid: TransactionId) -> Result<Vec<Outcome>, ManagerError> {
        self.begin_internal(tid, TransactionKind::ReadWrite)
    }

    /// Start a read-only transaction.
    pub fn begin_read_only(&mut self, tid: TransactionId) -> Result<Vec<Outcome>, ManagerError> {
        self.begin_internal(tid, TransactionKind::ReadOnly)
    }

    fn begin_internal(
        &mut self,
        tid: TransactionId,
        kind: TransactionKind,
    ) -> Result<Vec<Outcome>, ManagerError> {
        if self.transactions.contains_key(&tid) {
            return Err(ManagerError::DuplicateTransaction(tid));
        }
        self.clock.tick();
        let start_time = self.clock.now();
        self.transactions
            .insert(tid.clone(), Transaction::new(tid.clone(), kind, start_time));
        let outcome = match kind {
            TransactionKind::ReadWrite => Outcome::Begin { tid },
            TransactionKind::ReadOnly => Outcome::BeginReadOnly { tid },
        };
        Ok(vec![outcome])
    }

    /// Read `var` in `tid`. A wait never mutates state; a value read may
    /// trigger an abort if it closes a serialization cycle, in which case
    /// both the read and the abort are returned.
    pub fn read(&mut self, tid: &TransactionId, var: VarId) -> Vec<Outcome> {
        let start_time = match self.transactions.get(tid) {
            Some(t) if t.is_active() => t.start_time,
            _ => return vec![],
        };

        if let Some(&value) = self.transactions[tid].write_buffer.get(&var) {
            self.transactions
                .get_mut(tid)
                .unwrap()
                .read_set
                .insert(var, start_time);
            return vec![Outcome::Read {
                tid: tid.clone(),
                var,
                value,
                source: ReadSource::WriteCache,
            }];
        }

        if !var.is_replicated() && !self.sites[&var.home_site()].is_up() {
            return vec![self.waiting(tid, WaitReason::NoSiteAvailableForRead)];
        }

        let candidate_sites: Vec<SiteId> = if var.is_replicated() {
            self.sites.keys().copied().collect()
        } else {
            vec![var.home_site()]
        };

        let best = candidate_sites
            .into_iter()
            .filter_map(|site_id| {
                self.sites[&site_id]
                    .snapshot_version_at(var, start_time)
                    .map(|v| (site_id, v))
            })
            .max_by_key(|(site_id, _)| *site_id);

        let Some((site_id, version)) = best else {
            return vec![self.waiting(tid, WaitReason::NoSiteAvailableForRead)];
        };

        self.transactions
            .get_mut(tid)
            .unwrap()
            .read_set
            .insert(var, version.commit_time);

        let mut outcomes = vec![Outcome::Read {
            tid: tid.clone(),
            var,
            value: version.value,
            source: ReadSource::Site(site_id),
        }];

        if !version.writer.is_genesis() {
            self.graph.add_edge(version.writer, tid.clone());
            if self.graph.has_cycle() {
                outcomes.push(self.do_abort(tid, AbortReason::SerializationCycle));
            }
        }

        outcomes
    }

    fn waiting(&self, tid: &TransactionId, reason: WaitReason) -> Outcome {
        Outcome::Wait {
            tid: tid.clone(),
            reason,
        }
    }

    /// Buffer a write to `var` in `tid`. Never visible elsewhere until
    /// `end` commits it.
    pub fn write(
        &mut self,
        tid: &TransactionId,
        var: VarId,
        value: i64,
    ) -> Result<Vec<Outcome>, ManagerError> {
        let kind = match self.transactions.get(tid) {
            Some(t) if t.is_active() => t.kind,
            _ => return Ok(vec![]),
        };
        if kind == TransactionKind::ReadOnly {
            return Err(ManagerError::ReadOnlyWrite(tid.clone()));
        }

        let target_sites = self.target_sites_for_write(var);
        if target_sites.is_empty() {
            return Ok(vec![self.waiting(tid, WaitReason::NoSiteAvailableForWrite)]);
        }

        let txn = self.transactions.get_mut(tid).unwrap();
        txn.write_buffer.insert(var, value);
        txn.write_set.insert(var);

        Ok(vec![Outcome::Write {
            tid: tid.clone(),
            var,
            value,
            target_sites,
        }])
    }

    fn target_sites_for_write(&self, var: VarId) -> Vec<SiteId> {
        if var.is_replicated() {
            self.sites
                .values()
                .filter(|s| s.is_up())
                .map(|s| s.id())
                .collect()
        } else {
            let home = var.home_site();
            self.sites[&home].is_up().then_some(vec![home]).unwrap_or_default()
        }
    }

    /// End `tid`: commit if validation passes, otherwise abort.
    pub fn end(&mut self, tid: &TransactionId) -> Vec<Outcome> {
        let Some(txn) = self.transactions.get(tid) else {
            return vec![];
        };

        if matches!(txn.status, TransactionStatus::Aborted) {
            return vec![self.do_abort(tid, AbortReason::AlreadyAborted)];
        }
        if !txn.is_active() {
            return vec![];
        }
        if txn.should_abort {
            return vec![self.do_abort(tid, AbortReason::WriteSiteFailed)];
        }

        if txn.write_set.is_empty() {
            self.reaffirm_read_edges(tid);
            return vec![self.commit(tid)];
        }

        match self.certify_write_commit(tid) {
            Some(reason) => vec![self.do_abort(tid, reason)],
            None => {
                let outcome = self.commit(tid);
                let commit_time = match &outcome {
                    Outcome::Commit { commit_time, .. } => *commit_time,
                    _ => unreachable!("commit() always returns Outcome::Commit"),
                };
                self.apply_committed_writes(tid, commit_time);
                vec![outcome]
            }
        }
    }

    fn commit(&mut self, tid: &TransactionId) -> Outcome {
        self.clock.tick();
        let commit_time = self.clock.now();
        self.transactions.get_mut(tid).unwrap().status = TransactionStatus::Committed { commit_time };
        Outcome::Commit {
            tid: tid.clone(),
            commit_time,
        }
    }

    fn do_abort(&mut self, tid: &TransactionId, reason: AbortReason) -> Outcome {
        self.graph.remove_transaction(tid);
        if let Some(txn) = self.transactions.get_mut(tid) {
            txn.abort();
        }
        debug!(%tid, ?reason, "transaction aborted");
        Outcome::Abort {
            tid: tid.clone(),
            reason,
        }
    }

    /// Pre-commit validation for a write-bearing transaction: site
    /// availability, first-committer-wins, then graph certification. On
    /// success the tentative graph (read reaffirmation, WR and WW edges)
    /// is committed into `self.graph`.
    fn certify_write_commit(&mut self, tid: &TransactionId) -> Option<AbortReason> {
        let (start_time, write_set): (u64, HashSet<VarId>) = {
            let txn = self.transactions.get(tid).unwrap();
            (txn.start_time, txn.write_set.clone())
        };

        for &var in &write_set {
            if !var.is_replicated() && !self.sites[&var.home_site()].is_up() {
                return Some(AbortReason::WriteSiteFailed);
            }
        }

        for (other_tid, other) in &self.transactions {
            if other_tid == tid {
                continue;
            }
            if let TransactionStatus::Committed { commit_time } = other.status {
                if commit_time > start_time && other.write_set.iter().any(|v| write_set.contains(v)) {
                    return Some(AbortReason::FirstCommitterWins);
                }
            }
        }

        let mut candidate = self.graph.clone();
        for (other_tid, other) in &self.transactions {
            if other_tid == tid {
                continue;
            }
            // Anyone (active or already committed, but not aborted) who
            // read a variable this commit is about to overwrite must have
            // read a version that predates this write, so they serialize
            // before it — regardless of whether their own transaction has
            // since finished.
            let not_aborted = !matches!(other.status, TransactionStatus::Aborted);
            if not_aborted && other.read_set.keys().any(|v| write_set.contains(v)) {
                candidate.add_edge(other_tid.clone(), tid.clone());
            }
            if let TransactionStatus::Committed { commit_time } = other.status {
                if commit_time < start_time && other.write_set.iter().any(|v| write_set.contains(v)) {
                    candidate.add_edge(other_tid.clone(), tid.clone());
                }
            }
        }
        self.reaffirm_read_edges_into(&mut candidate, tid);

        if candidate.has_cycle() {
            return Some(AbortReason::SerializationCycle);
        }
        self.graph = candidate;
        None
    }

    /// The committed writer of the exact version recorded in `tid`'s own
    /// read set, re-asserted as a defensive duplicate of the edge already
    /// added at read time.
    fn reaffirm_read_edges(&mut self, tid: &TransactionId) {
        let mut graph = std::mem::take(&mut self.graph);
        self.reaffirm_read_edges_into(&mut graph, tid);
        self.graph = graph;
    }

    fn reaffirm_read_edges_into(&self, graph: &mut SerializationGraph, tid: &TransactionId) {
        let txn = self.transactions.get(tid).unwrap();
        for (&var, &commit_time) in &txn.read_set {
            if let Some(writer) = self.writer_of_commit_time(var, commit_time) {
                graph.add_edge(writer, tid.clone());
            }
        }
    }

    fn writer_of_commit_time(&self, var: VarId, commit_time: u64) -> Option<TransactionId> {
        if commit_time == 0 {
            return None;
        }
        self.transactions.values().find_map(|t| {
            let wrote_at_time =
                matches!(t.status, TransactionStatus::Committed { commit_time: ct } if ct == commit_time);
            (wrote_at_time && t.write_set.contains(&var)).then(|| t.tid.clone())
        })
    }

    fn apply_committed_writes(&mut self, tid: &TransactionId, commit_time: u64) {
        let (start_time, write_buffer) = {
            let txn = self.transactions.get(tid).unwrap();
            (txn.start_time, txn.write_buffer.clone())
        };
        for (var, value) in write_buffer {
            let targets: Vec<SiteId> = if var.is_replicated() {
                self.sites
                    .values()
                    .filter(|s| s.continuously_up_since(start_time))
                    .map(|s| s.id())
                    .collect()
            } else {
                let home = var.home_site();
                self.sites[&home]
                    .continuously_up_since(start_time)
                    .then_some(vec![home])
                    .unwrap_or_default()
            };
            for site_id in targets {
                self.sites
                    .get_mut(&site_id)
                    .unwrap()
                    .commit_write(var, value, tid.clone(), commit_time);
            }
        }
    }

    /// Fail a site. Unknown site numbers are silently ignored.
    pub fn fail(&mut self, site_num: u8) -> Vec<Outcome> {
        let Some(site_id) = SiteId::new(site_num) else {
            return vec![];
        };
        self.clock.tick();
        let now = self.clock.now();
        self.sites.get_mut(&site_id).unwrap().fail(now);

        for txn in self.transactions.values_mut() {
            if !txn.is_active() {
                continue;
            }
            let touches_site = txn
                .write_set
                .iter()
                .any(|&var| var.is_replicated() || var.home_site() == site_id);
            if touches_site {
                txn.should_abort = true;
            }
        }

        vec![Outcome::SiteFails { site: site_id }]
    }

    /// Recover a site. Unknown site numbers are silently ignored.
    pub fn recover(&mut self, site_num: u8) -> Vec<Outcome> {
        let Some(site_id) = SiteId::new(site_num) else {
            return vec![];
        };
        self.clock.tick();
        let now = self.clock.now();
        self.sites.get_mut(&site_id).unwrap().recover(now);
        vec![Outcome::SiteRecovers { site: site_id }]
    }

    /// Snapshot every site's visible state for display.
    pub fn dump(&self) -> Vec<Outcome> {
        let rows = self
            .sites
            .values()
            .map(|s| SiteRow {
                site: s.id(),
                is_up: s.is_up(),
                values: s.dump_view(),
            })
            .collect();
        vec![Outcome::Dump(DumpTable { rows })]
    }

    /// Wipe all state back to a fresh manager's, as if just constructed.
    /// Used between `// Test` markers in the driver input.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tid(s: &str) -> TransactionId {
        TransactionId::new(s)
    }

    fn var(n: u8) -> VarId {
        VarId::new(n).unwrap()
    }

    #[test]
    fn begin_rejects_duplicate_id() {
        let mut mgr = TransactionManager::new();
        mgr.begin(tid("T1")).unwrap();
        assert!(matches!(
            mgr.begin(tid("T1")),
            Err(ManagerError::DuplicateTransaction(_))
        ));
    }

    #[test]
    fn write_on_read_only_is_rejected() {
        let mut mgr = TransactionManager::new();
        mgr.begin_read_only(tid("T1")).unwrap();
        assert!(matches!(
            mgr.write(&tid("T1"), var(2), 1),
            Err(ManagerError::ReadOnlyWrite(_))
        ));
    }

    #[test]
    fn read_your_writes() {
        let mut mgr = TransactionManager::new();
        mgr.begin(tid("T1")).unwrap();
        mgr.write(&tid("T1"), var(1), 999).unwrap();
        let outcomes = mgr.read(&tid("T1"), var(1));
        assert!(matches!(
            outcomes.as_slice(),
            [Outcome::Read { value: 999, source: ReadSource::WriteCache, .. }]
        ));
    }

    #[test]
    fn genesis_read_sees_ten_times_index() {
        let mut mgr = TransactionManager::new();
        mgr.begin(tid("T1")).unwrap();
        let outcomes = mgr.read(&tid("T1"), var(4));
        assert!(matches!(
            outcomes.as_slice(),
            [Outcome::Read { value: 40, .. }]
        ));
    }

    #[test]
    fn scenario_first_committer_wins() {
        let mut mgr = TransactionManager::new();
        mgr.begin(tid("T1")).unwrap();
        mgr.begin(tid("T2")).unwrap();
        mgr.write(&tid("T1"), var(6), 61).unwrap();
        mgr.write(&tid("T2"), var(6), 62).unwrap();
        assert!(matches!(mgr.end(&tid("T2")).as_slice(), [Outcome::Commit { .. }]));
        assert!(matches!(
            mgr.end(&tid("T1")).as_slice(),
            [Outcome::Abort { reason: AbortReason::FirstCommitterWins, .. }]
        ));
    }

    #[test]
    fn scenario_non_replicated_home_failure_aborts() {
        let mut mgr = TransactionManager::new();
        mgr.begin(tid("T1")).unwrap();
        mgr.write(&tid("T1"), var(3), 333).unwrap();
        mgr.fail(4);
        assert!(matches!(
            mgr.end(&tid("T1")).as_slice(),
            [Outcome::Abort { reason: AbortReason::WriteSiteFailed, .. }]
        ));
    }

    #[test]
    fn reset_restores_genesis_state() {
        let mut mgr = TransactionManager::new();
        mgr.begin(tid("T1")).unwrap();
        mgr.write(&tid("T1"), var(2), 999).unwrap();
        mgr.reset();
        assert!(mgr.begin(tid("T1")).is_ok());
        assert!(matches!(
            mgr.read(&tid("T1"), var(2)).as_slice(),
            [Outcome::Read { value: 20, .. }]
        ));
    }
}
