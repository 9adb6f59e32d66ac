//! Identity types: transaction ids, variable ids, and site ids.

use std::fmt;

/// Number of replica sites in the system (fixed by the specification).
pub const NUM_SITES: u8 = 10;

/// Number of variables in the system (fixed by the specification).
pub const NUM_VARS: u8 = 20;

/// The transaction id of the synthetic genesis writer.
const GENESIS_TID: &str = "T0";

/// A transaction identifier, e.g. `T1`.
///
/// Wrapped rather than using a bare `String` so that call sites can't
/// accidentally pass a variable or site token where a transaction id is
/// expected.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TransactionId(String);

impl TransactionId {
    /// Build a transaction id from its textual token (e.g. `"T1"`).
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id of the synthetic transaction that wrote every variable's
    /// initial version at time zero.
    pub fn genesis() -> Self {
        Self(GENESIS_TID.to_string())
    }

    /// Whether this is the synthetic genesis writer `T0`.
    pub fn is_genesis(&self) -> bool {
        self.0 == GENESIS_TID
    }

    /// The underlying textual token.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TransactionId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for TransactionId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// A variable id in `1..=20`, e.g. `x7`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarId(u8);

impl VarId {
    /// Construct a variable id, rejecting anything outside `1..=20`.
    pub fn new(number: u8) -> Option<Self> {
        (1..=NUM_VARS).contains(&number).then_some(Self(number))
    }

    /// The raw variable number.
    pub fn number(self) -> u8 {
        self.0
    }

    /// Even-indexed variables are replicated at every site.
    pub fn is_replicated(self) -> bool {
        self.0 % 2 == 0
    }

    /// The sole hosting site for a non-replicated (odd-indexed) variable.
    ///
    /// Meaningless for a replicated variable but always well-defined: the
    /// formula `1 + (i mod 10)` lands in `1..=10` for every `i`.
    pub fn home_site(self) -> SiteId {
        SiteId::new(1 + self.0 % 10).expect("1 + (i mod 10) is always in 1..=10")
    }

    /// The value `T0` committed for this variable at time zero: `10 * i`.
    pub fn initial_value(self) -> i64 {
        10 * i64::from(self.0)
    }

    /// All twenty variable ids, in ascending order.
    pub fn all() -> impl Iterator<Item = VarId> {
        (1..=NUM_VARS).map(|n| VarId(n))
    }
}

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x{}", self.0)
    }
}

/// A site id in `1..=10`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SiteId(u8);

impl SiteId {
    /// Construct a site id, rejecting anything outside `1..=10`.
    pub fn new(number: u8) -> Option<Self> {
        (1..=NUM_SITES).contains(&number).then_some(Self(number))
    }

    /// The raw site number.
    pub fn number(self) -> u8 {
        self.0
    }

    /// All ten site ids, in ascending order.
    pub fn all() -> impl Iterator<Item = SiteId> {
        (1..=NUM_SITES).map(|n| SiteId(n))
    }
}

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replication_rule_matches_spec() {
        assert!(VarId::new(2).unwrap().is_replicated());
        assert!(VarId::new(20).unwrap().is_replicated());
        assert!(!VarId::new(1).unwrap().is_replicated());
        assert!(!VarId::new(19).unwrap().is_replicated());
    }

    #[test]
    fn home_site_formula() {
        assert_eq!(VarId::new(1).unwrap().home_site(), SiteId::new(2).unwrap());
        assert_eq!(VarId::new(3).unwrap().home_site(), SiteId::new(4).unwrap());
        assert_eq!(VarId::new(9).unwrap().home_site(), SiteId::new(10).unwrap());
        assert_eq!(VarId::new(11).unwrap().home_site(), SiteId::new(2).unwrap());
        assert_eq!(VarId::new(19).unwrap().home_site(), SiteId::new(10).unwrap());
    }

    #[test]
    fn rejects_out_of_range_ids() {
        assert!(VarId::new(0).is_none());
        assert!(VarId::new(21).is_none());
        assert!(SiteId::new(0).is_none());
        assert!(SiteId::new(11).is_none());
    }

    #[test]
    fn initial_values_follow_ten_times_index() {
        assert_eq!(VarId::new(1).unwrap().initial_value(), 10);
        assert_eq!(VarId::new(20).unwrap().initial_value(), 200);
    }
}
