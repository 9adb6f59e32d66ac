//! The serialization graph used to detect cycles that imply a
//! read-write/write-write conflict no schedule can honor.
//!
//! Edges are directed `from -> to` meaning "`from` must serialize before
//! `to`". A cycle means no such total order exists, so one transaction on
//! the cycle must be aborted.

use std::collections::{HashMap, HashSet};

use repcrec_core::TransactionId;

/// A conflict graph over active and committed transaction ids.
///
/// Aborted transactions are pruned eagerly, so the graph only ever holds
/// edges that could still matter to a future commit decision.
#[derive(Debug, Clone, Default)]
pub struct SerializationGraph {
    edges: HashMap<TransactionId, HashSet<TransactionId>>,
}

impl SerializationGraph {
    /// An empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `from -> to`. A self-edge is never useful and is dropped.
    pub fn add_edge(&mut self, from: TransactionId, to: TransactionId) {
        if from == to {
            return;
        }
        self.edges.entry(from).or_default().insert(to);
    }

    /// Remove every edge touching `tid`, as either endpoint.
    pub fn remove_transaction(&mut self, tid: &TransactionId) {
        self.edges.remove(tid);
        for targets in self.edges.values_mut() {
            targets.remove(tid);
        }
    }

    /// Whether the graph currently contains a cycle.
    ///
    /// Standard recursion-stack DFS: a node currently `InProgress` that we
    /// reach again is a back edge, i.e. a cycle.
    pub fn has_cycle(&self) -> bool {
        #[derive(Clone, Copy, PartialEq, Eq)]
        enum Mark {
            InProgress,
            Done,
        }

        let mut marks: HashMap<&TransactionId, Mark> = HashMap::new();

        fn visit<'a>(
            node: &'a TransactionId,
            edges: &'a HashMap<TransactionId, HashSet<TransactionId>>,
            marks: &mut HashMap<&'a TransactionId, Mark>,
        ) -> bool {
            match marks.get(node) {
                Some(Mark::InProgress) => return true,
                Some(Mark::Done) => return false,
                None => {}
            }
            marks.insert(node, Mark::InProgress);
            if let Some(targets) = edges.get(node) {
                for next in targets {
                    if visit(next, edges, marks) {
                        return true;
                    }
                }
            }
            marks.insert(node, Mark::Done);
            false
        }

        self.edges.keys().any(|node| {
            matches!(marks.get(node), None) && visit(node, &self.edges, &mut marks)
        })
    }

    /// Drop every edge, returning the graph to its initial empty state.
    pub fn reset(&mut self) {
        self.edges.clear();
    }
}
