//! End-to-end scenario tests against the worked examples in the
//! specification: each drives a `TransactionManager` through a short
//! operation sequence and checks the externally observable outcomes.

use repcrec_concurrency::{AbortReason, Outcome, ReadSource, TransactionManager};
use repcrec_core::{TransactionId, VarId};

fn tid(s: &str) -> TransactionId {
    TransactionId::new(s)
}

fn var(n: u8) -> VarId {
    VarId::new(n).unwrap()
}

/// S1 - two transactions each read what the other wrote; a cycle closes
/// and exactly one side must abort.
#[test]
fn s1_basic_commit_and_cycle_abort() {
    let mut mgr = TransactionManager::new();
    mgr.begin(tid("T1")).unwrap();
    mgr.begin(tid("T2")).unwrap();
    mgr.write(&tid("T1"), var(1), 101).unwrap();
    mgr.write(&tid("T2"), var(2), 202).unwrap();

    let r1 = mgr.read(&tid("T1"), var(2));
    assert!(matches!(
        r1.as_slice(),
        [Outcome::Read { value: 20, source: ReadSource::Site(_), .. }]
    ));

    let r2 = mgr.read(&tid("T2"), var(1));
    assert!(matches!(
        r2.as_slice(),
        [Outcome::Read { value: 10, source: ReadSource::Site(_), .. }]
    ));

    assert!(matches!(mgr.end(&tid("T1")).as_slice(), [Outcome::Commit { .. }]));
    assert!(matches!(
        mgr.end(&tid("T2")).as_slice(),
        [Outcome::Abort { reason: AbortReason::SerializationCycle, .. }]
    ));
}

/// S2 - a read-only transaction's snapshot is immune to a failure and
/// recovery of an uninvolved site that happen after it started.
#[test]
fn s2_read_only_snapshot_survives_failure_and_recovery() {
    let mut mgr = TransactionManager::new();
    mgr.begin_read_only(tid("T1")).unwrap();
    mgr.fail(2);

    let first = mgr.read(&tid("T1"), var(2));
    assert!(matches!(first.as_slice(), [Outcome::Read { value: 20, .. }]));

    mgr.recover(2);
    let second = mgr.read(&tid("T1"), var(2));
    assert!(matches!(second.as_slice(), [Outcome::Read { value: 20, .. }]));
}

/// S3 - after a commit, a failure, and a recovery, the recovered site is
/// unreadable for the replicated variable until a fresh commit lands, but
/// the variable itself remains readable from other sites.
#[test]
fn s3_unreadable_after_recovery_does_not_block_other_sites() {
    let mut mgr = TransactionManager::new();
    mgr.begin(tid("T1")).unwrap();
    mgr.write(&tid("T1"), var(4), 400).unwrap();
    assert!(matches!(mgr.end(&tid("T1")).as_slice(), [Outcome::Commit { .. }]));

    mgr.fail(3);
    mgr.recover(3);

    mgr.begin(tid("T2")).unwrap();
    let outcomes = mgr.read(&tid("T2"), var(4));
    assert!(matches!(
        outcomes.as_slice(),
        [Outcome::Read { value: 400, source: ReadSource::Site(_), .. }]
    ));
}

/// S4 - two writers of the same variable: the later committer loses to
/// first-committer-wins.
#[test]
fn s4_first_committer_wins() {
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

/// S5 - a non-replicated variable's home site fails before `end`; the
/// writer must abort rather than commit a write nobody can serve.
#[test]
fn s5_non_replicated_home_site_failure_forces_abort() {
    let mut mgr = TransactionManager::new();
    mgr.begin(tid("T1")).unwrap();
    assert_eq!(var(3).home_site().number(), 4);
    mgr.write(&tid("T1"), var(3), 333).unwrap();
    mgr.fail(4);

    assert!(matches!(
        mgr.end(&tid("T1")).as_slice(),
        [Outcome::Abort { reason: AbortReason::WriteSiteFailed, .. }]
    ));
}

/// S6 - a quiescent dump shows every site up, every replicated variable
/// at `10*i` everywhere, and every non-replicated variable only at its
/// home site.
#[test]
fn s6_quiescent_dump_shape() {
    let mgr = TransactionManager::new();
    let outcomes = mgr.dump();
    let [Outcome::Dump(table)] = outcomes.as_slice() else {
        panic!("dump() must yield exactly one Dump outcome");
    };

    assert_eq!(table.rows.len(), 10);
    for row in &table.rows {
        assert!(row.is_up);
        let has = |n: u8| row.values.iter().any(|(v, _)| v.number() == n);
        assert!(has(2), "replicated x2 must appear at every site");
        assert_eq!(
            row.values.iter().find(|(v, _)| v.number() == 2).unwrap().1,
            20
        );
        let x1_home = var(1).home_site() == row.site;
        assert_eq!(has(1), x1_home);
    }
}

/// A write whose target set was non-empty at `W` time but has since
/// become empty (the sole home site failed) must still abort cleanly at
/// `end` via `should_abort`, never partially commit.
#[test]
fn write_targets_emptying_before_end_forces_abort_not_partial_commit() {
    let mut mgr = TransactionManager::new();
    mgr.begin(tid("T1")).unwrap();
    mgr.write(&tid("T1"), var(3), 1).unwrap();
    mgr.fail(var(3).home_site().number());

    let outcomes = mgr.end(&tid("T1"));
    assert!(matches!(
        outcomes.as_slice(),
        [Outcome::Abort { reason: AbortReason::WriteSiteFailed, .. }]
    ));
}

/// A cycle closed only by a read-only transaction's participation: T3 ->
/// T1 (write-after-active-read), T1 -> T2 (T2 reads T1's commit), T2 ->
/// T3 (write-after-active-read again) — the last edge, added during T3's
/// own commit certification, is the one that closes the cycle, and T2 is
/// read-only throughout.
#[test]
fn cycle_closed_only_by_read_only_transactions_final_edge() {
    let mut mgr = TransactionManager::new();
    mgr.begin(tid("T1")).unwrap();
    mgr.begin(tid("T3")).unwrap();
    mgr.begin_read_only(tid("T2")).unwrap();

    // T3 reads x10 (genesis) while T1 is about to write it: closing T1's
    // commit later adds T3 -> T1 (an active reader precedes a writer).
    mgr.read(&tid("T3"), var(10));
    mgr.write(&tid("T1"), var(10), 1).unwrap();
    mgr.write(&tid("T1"), var(2), 2).unwrap();
    assert!(matches!(mgr.end(&tid("T1")).as_slice(), [Outcome::Commit { .. }]));

    // T2 (RO) now reads T1's freshly committed x2: adds T1 -> T2.
    assert!(matches!(
        mgr.read(&tid("T2"), var(2)).as_slice(),
        [Outcome::Read { value: 2, source: ReadSource::Site(_), .. }]
    ));

    // T2 also reads x12 (genesis) while T3 is about to write it: closing
    // T3's commit adds T2 -> T3, completing T3 -> T1 -> T2 -> T3.
    mgr.read(&tid("T2"), var(12));
    mgr.write(&tid("T3"), var(12), 3).unwrap();

    assert!(matches!(
        mgr.end(&tid("T3")).as_slice(),
        [Outcome::Abort { reason: AbortReason::SerializationCycle, .. }]
    ));
}
