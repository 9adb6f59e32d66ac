//! A single replica site: per-variable version histories plus up/down
//! and recovery bookkeeping.

use std::collections::HashMap;

use repcrec_core::{SiteId, TransactionId, VarId, Version};

/// Per-variable state tracked at one site.
#[derive(Debug, Clone)]
struct VarState {
    /// Strictly ordered by `commit_time`; index 0 is always the genesis
    /// version.
    history: Vec<Version>,
    /// The site's notion of "the" current value, used for `dump()` and
    /// rewound on recovery. Independent of read-availability.
    current: i64,
    /// Only meaningful for replicated variables: `false` immediately after
    /// recovery until a fresh commit lands here.
    readable_after_recovery: bool,
}

impl VarState {
    fn genesis(var: VarId) -> Self {
        let value = var.initial_value();
        Self {
            history: vec![Version::genesis(value)],
            current: value,
            readable_after_recovery: true,
        }
    }
}

/// One of the ten replica sites.
#[derive(Debug, Clone)]
pub struct Site {
    id: SiteId,
    is_up: bool,
    last_fail_time: Option<u64>,
    last_recover_time: Option<u64>,
    variables: HashMap<VarId, VarState>,
}

impl Site {
    /// Build a freshly initialized site: every variable at its genesis
    /// value, site up, never failed.
    pub fn new(id: SiteId) -> Self {
        let variables = VarId::all().map(|v| (v, VarState::genesis(v))).collect();
        Self {
            id,
            is_up: true,
            last_fail_time: None,
            last_recover_time: None,
            variables,
        }
    }

    /// This site's id.
    pub fn id(&self) -> SiteId {
        self.id
    }

    /// Whether the site is currently reachable.
    pub fn is_up(&self) -> bool {
        self.is_up
    }

    /// Mark the site failed. Version history is retained untouched.
    pub fn fail(&mut self, now: u64) {
        self.is_up = false;
        self.last_fail_time = Some(now);
    }

    /// Bring the site back up.
    ///
    /// Every replicated variable becomes unreadable until a fresh commit
    /// lands here, and its displayed "current" value is rewound to the
    /// last version committed strictly before the failure.
    pub fn recover(&mut self, now: u64) {
        self.is_up = true;
        self.last_recover_time = Some(now);

        let Some(fail_time) = self.last_fail_time else {
            return;
        };
        for (var, state) in self.variables.iter_mut() {
            if !var.is_replicated() {
                continue;
            }
            state.readable_after_recovery = false;
            if let Some(last) = state
                .history
                .iter()
                .rev()
                .find(|v| v.commit_time < fail_time)
            {
                state.current = last.value;
            }
        }
    }

    /// Append a new version and make it the current value.
    ///
    /// Replicated variables become readable again (the "unreadable after
    /// recovery" rule is cleared by the first fresh write).
    pub fn commit_write(&mut self, var: VarId, value: i64, writer: TransactionId, commit_time: u64) {
        let state = self
            .variables
            .get_mut(&var)
            .expect("every site tracks all twenty variables");
        debug_assert!(
            state.history.last().is_none_or(|v| v.commit_time < commit_time),
            "commit times must be strictly increasing"
        );
        state.history.push(Version::new(value, writer, commit_time));
        state.current = value;
        if var.is_replicated() {
            state.readable_after_recovery = true;
        }
    }

    /// The version a reader starting at `ts` would observe for `var`, or
    /// `None` if this site cannot serve it.
    ///
    /// Returns `None` outright if the site is down. For a replicated
    /// variable, also returns `None` if the site failed strictly after the
    /// candidate version's commit and strictly before `ts` — reading
    /// through such a gap could observe a replica that missed an update
    /// made while it was down.
    pub fn snapshot_version_at(&self, var: VarId, ts: u64) -> Option<Version> {
        if !self.is_up {
            return None;
        }
        let state = self.variables.get(&var)?;
        let candidate = state.history.iter().rev().find(|v| v.commit_time <= ts);

        if var.is_replicated() {
            match candidate {
                Some(v) => {
                    let failed_in_window = self
                        .last_fail_time
                        .is_some_and(|f| f > v.commit_time && f < ts);
                    (!failed_in_window).then(|| v.clone())
                }
                None => {
                    let continuously_up = match self.last_fail_time {
                        None => true,
                        Some(f) => f >= ts || self.last_recover_time.is_some_and(|r| r > f),
                    };
                    continuously_up.then(|| state.history[0].clone())
                }
            }
        } else {
            Some(candidate.cloned().unwrap_or_else(|| state.history[0].clone()))
        }
    }

    /// Convenience wrapper over [`Site::snapshot_version_at`] returning just
    /// the value.
    pub fn snapshot_at(&self, var: VarId, ts: u64) -> Option<i64> {
        self.snapshot_version_at(var, ts).map(|v| v.value)
    }

    /// Whether `var` is currently readable, honoring the "unreadable after
    /// recovery" rule. Replicated variables only; non-replicated variables
    /// are always readable when the site is up.
    pub fn is_readable(&self, var: VarId) -> bool {
        self.is_up
            && self
                .variables
                .get(&var)
                .is_some_and(|s| !var.is_replicated() || s.readable_after_recovery)
    }

    /// The continuity test used when selecting commit targets: has this
    /// site been up, without interruption, since `since`?
    pub fn continuously_up_since(&self, since: u64) -> bool {
        self.is_up
            && match self.last_fail_time {
                None => true,
                Some(fail) => fail < since && self.last_recover_time.is_some_and(|r| r > fail),
            }
    }

    /// `(var, current value)` pairs for display: every replicated variable
    /// plus the non-replicated variables whose home is this site. Empty if
    /// the site is down.
    pub fn dump_view(&self) -> Vec<(VarId, i64)> {
        if !self.is_up {
            return Vec::new();
        }
        let mut rows: Vec<(VarId, i64)> = self
            .variables
            .iter()
            .filter(|(var, _)| var.is_replicated() || var.home_site() == self.id)
            .map(|(&var, state)| (var, state.current))
            .collect();
        rows.sort_by_key(|(var, _)| var.number());
        rows
    }

    /// Wipe the site back to its genesis state.
    pub fn reset(&mut self) {
        *self = Site::new(self.id);
    }
}
