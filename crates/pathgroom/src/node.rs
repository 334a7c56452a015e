//! Vertices and the per-node reduction steps.
//!
//! # Overview
//!
//! A [`Node`] holds ordered incoming and outgoing edge lists plus a
//! permanence flag. Permanent nodes are the anchors whose mutual
//! connectivity grooming preserves; everything else is filler that may be
//! folded away.
//!
//! The reduction steps live here as [`Graph`] methods keyed by [`NodeKey`],
//! because each one touches both the node table and the edge table:
//!
//! - **dedup**: keep one edge per `(from, to)` pair in each list.
//! - **prune**: sever dead-end chains, walking upstream
//!   ([`Graph::prune_backward`]) or downstream ([`Graph::prune_forward`]).
//! - **simplify**: a non-permanent node with no exits loses its entries;
//!   one with a single exit is elided by [`Graph::consolidate`].
//!
//! All of them snapshot the affected edge ids before mutating, and none of
//! them ever removes a node from the arena; that is
//! [`Graph::groom_nodes`]'s job.

use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;

use petgraph::Direction;
use tracing::debug;

use crate::edge::{Edge, EdgeId};
use crate::error::{GraphError, Result};
use crate::graph::Graph;

/// Bound for caller-supplied node identifiers.
pub trait NodeId: Clone + Eq + Hash + fmt::Debug {}

impl<T: Clone + Eq + Hash + fmt::Debug> NodeId for T {}

/// Stable arena key of a node within one [`Graph`]. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey(pub(crate) u32);

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// A vertex with identity, a permanence flag, and ordered edge lists.
#[derive(Debug, Clone)]
pub struct Node<I> {
    pub(crate) key: NodeKey,
    pub(crate) id: I,
    pub(crate) permanent: bool,
    pub(crate) incoming: Vec<EdgeId>,
    pub(crate) outgoing: Vec<EdgeId>,
}

impl<I> Node<I> {
    pub(crate) const fn new(key: NodeKey, id: I, permanent: bool) -> Self {
        Self {
            key,
            id,
            permanent,
            incoming: Vec::new(),
            outgoing: Vec::new(),
        }
    }

    #[must_use]
    pub const fn key(&self) -> NodeKey {
        self.key
    }

    #[must_use]
    pub const fn id(&self) -> &I {
        &self.id
    }

    /// Anchor nodes are never simplified, pruned, or collected.
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        self.permanent
    }

    #[must_use]
    pub fn incoming(&self) -> &[EdgeId] {
        &self.incoming
    }

    #[must_use]
    pub fn outgoing(&self) -> &[EdgeId] {
        &self.outgoing
    }

    /// Edge list for one direction.
    #[must_use]
    pub fn edges(&self, direction: Direction) -> &[EdgeId] {
        match direction {
            Direction::Incoming => &self.incoming,
            Direction::Outgoing => &self.outgoing,
        }
    }

    #[must_use]
    pub fn in_degree(&self) -> usize {
        self.incoming.len()
    }

    #[must_use]
    pub fn out_degree(&self) -> usize {
        self.outgoing.len()
    }

    #[must_use]
    pub fn degree(&self) -> usize {
        self.incoming.len() + self.outgoing.len()
    }

    /// Non-permanent with no edges at all: eligible for
    /// [`Graph::groom_nodes`].
    #[must_use]
    pub fn is_orphaned(&self) -> bool {
        !self.permanent && self.incoming.is_empty() && self.outgoing.is_empty()
    }
}

impl<I: fmt::Debug> fmt::Display for Node<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {:?} [{}]",
            self.incoming.len(),
            self.id,
            self.outgoing.len()
        )
    }
}

impl<I: NodeId> Graph<I> {
    /// Attach `edge` as an incoming edge of `node`, moving its target if it
    /// pointed elsewhere. Returns `false` if it was already listed.
    pub fn add_incoming(&mut self, node: NodeKey, edge: EdgeId) -> bool {
        let listed = match self.nodes.get(&node) {
            Some(n) => n.incoming.contains(&edge),
            None => return false,
        };
        !listed && self.set_to(edge, Some(node))
    }

    /// Attach `edge` as an outgoing edge of `node`, moving its source if it
    /// started elsewhere. Returns `false` if it was already listed.
    pub fn add_outgoing(&mut self, node: NodeKey, edge: EdgeId) -> bool {
        let listed = match self.nodes.get(&node) {
            Some(n) => n.outgoing.contains(&edge),
            None => return false,
        };
        !listed && self.set_from(edge, Some(node))
    }

    /// Drop `edge` from `node`'s incoming list and clear its target.
    pub fn remove_incoming(&mut self, node: NodeKey, edge: EdgeId) -> bool {
        let listed = self
            .nodes
            .get(&node)
            .is_some_and(|n| n.incoming.contains(&edge));
        listed && self.set_to(edge, None)
    }

    /// Drop `edge` from `node`'s outgoing list and clear its source.
    pub fn remove_outgoing(&mut self, node: NodeKey, edge: EdgeId) -> bool {
        let listed = self
            .nodes
            .get(&node)
            .is_some_and(|n| n.outgoing.contains(&edge));
        listed && self.set_from(edge, None)
    }

    /// Fully disconnect every incoming edge of `node`, on both ends.
    pub fn remove_all_incoming(&mut self, node: NodeKey) -> bool {
        self.detach_all(node, Direction::Incoming)
    }

    /// Fully disconnect every outgoing edge of `node`, on both ends.
    pub fn remove_all_outgoing(&mut self, node: NodeKey) -> bool {
        self.detach_all(node, Direction::Outgoing)
    }

    /// Collapse parallel edges in both of `node`'s lists, keeping the first
    /// edge of each `(from, to)` group and disconnecting the rest.
    pub fn dedup_parallel(&mut self, node: NodeKey) -> bool {
        self.dedup_count(node) > 0
    }

    /// Sever a dead end and walk upstream.
    ///
    /// Fires only for a non-permanent node with no outgoing edges and at
    /// least one incoming edge. Each incoming edge is disconnected and its
    /// source is then checked the same way, so a chain that can only lead
    /// into this dead end is cut back to the nearest branch or anchor.
    pub fn prune_backward(&mut self, node: NodeKey) -> bool {
        self.prune(node, Direction::Incoming)
    }

    /// Mirror of [`Graph::prune_backward`]: sever a node nothing reaches and
    /// walk downstream.
    pub fn prune_forward(&mut self, node: NodeKey) -> bool {
        self.prune(node, Direction::Outgoing)
    }

    /// Apply one reduction step to a non-permanent node.
    ///
    /// - no exits: disconnect every entry; nothing is reachable through it.
    /// - one exit: [`Graph::consolidate`] it away.
    /// - two or more exits: a branch point, left alone.
    ///
    /// Returns `true` only if an edge was actually rewired or disconnected.
    pub fn simplify(&mut self, node: NodeKey) -> bool {
        let exit = match self.nodes.get(&node) {
            Some(n) if !n.permanent => match n.outgoing.as_slice() {
                [] => None,
                [exit] => Some(*exit),
                _ => return false,
            },
            _ => return false,
        };

        match exit {
            None => {
                let changed = self.remove_all_incoming(node);
                if changed {
                    debug!(%node, "sever entries of dead end");
                }
                changed
            }
            Some(exit) => self.consolidate_through(node, exit),
        }
    }

    /// Elide a single-exit node: point every incoming edge straight at the
    /// exit's target, then disconnect the exit.
    ///
    /// # Errors
    ///
    /// [`GraphError::UnknownNodeKey`] for a dead key,
    /// [`GraphError::NotSingleExit`] unless the node has exactly one
    /// outgoing edge.
    pub fn consolidate(&mut self, node: NodeKey) -> Result<bool> {
        let n = self
            .nodes
            .get(&node)
            .ok_or(GraphError::UnknownNodeKey(node))?;
        if n.outgoing.len() != 1 {
            return Err(GraphError::NotSingleExit {
                node: format!("{:?}", n.id),
                out_degree: n.outgoing.len(),
            });
        }
        let exit = n.outgoing[0];
        Ok(self.consolidate_through(node, exit))
    }

    fn consolidate_through(&mut self, node: NodeKey, exit: EdgeId) -> bool {
        let target = self.edges.get(&exit).and_then(Edge::to);
        let entries = self.edge_snapshot(node, Direction::Incoming);

        let mut changed = false;
        // A self-loop exit has nowhere else to send entries.
        if let Some(target) = target.filter(|t| *t != node) {
            for edge in entries {
                changed |= self.set_to(edge, Some(target));
            }
        }
        changed |= self.detach(exit);

        if changed {
            debug!(%node, ?target, "consolidate single-exit node");
        }
        changed
    }

    /// Number of edges disconnected as duplicates across both lists.
    pub(crate) fn dedup_count(&mut self, node: NodeKey) -> usize {
        self.dedup_list(node, Direction::Incoming) + self.dedup_list(node, Direction::Outgoing)
    }

    fn dedup_list(&mut self, node: NodeKey, direction: Direction) -> usize {
        let mut seen = HashSet::new();
        let duplicates: Vec<EdgeId> = self
            .edge_snapshot(node, direction)
            .into_iter()
            .filter(|id| {
                self.edges
                    .get(id)
                    .is_some_and(|edge| !seen.insert(edge.endpoints()))
            })
            .collect();

        let removed = duplicates
            .into_iter()
            .filter(|&edge| self.detach(edge))
            .count();
        if removed > 0 {
            debug!(%node, ?direction, removed, "drop parallel edges");
        }
        removed
    }

    fn detach_all(&mut self, node: NodeKey, direction: Direction) -> bool {
        let mut changed = false;
        for edge in self.edge_snapshot(node, direction) {
            changed |= self.detach(edge);
        }
        changed
    }

    /// `direction` names the side the dead end is walked through:
    /// `Incoming` walks upstream, `Outgoing` downstream.
    fn prune(&mut self, start: NodeKey, direction: Direction) -> bool {
        let mut pruned = false;
        let mut stack = vec![start];

        while let Some(key) = stack.pop() {
            let Some(node) = self.nodes.get(&key) else {
                continue;
            };
            let open_side = node.edges(direction.opposite()).len();
            let walk_side = node.edges(direction).len();
            if node.permanent || open_side != 0 || walk_side == 0 {
                continue;
            }

            for edge in self.edge_snapshot(key, direction) {
                let next = self.edges.get(&edge).and_then(|e| match direction {
                    Direction::Incoming => e.from(),
                    Direction::Outgoing => e.to(),
                });
                self.detach(edge);
                stack.extend(next);
            }
            debug!(node = %key, ?direction, "prune dead end");
            pruned = true;
        }
        pruned
    }

    fn edge_snapshot(&self, node: NodeKey, direction: Direction) -> Vec<EdgeId> {
        self.nodes
            .get(&node)
            .map(|n| n.edges(direction).to_vec())
            .unwrap_or_default()
    }
}
