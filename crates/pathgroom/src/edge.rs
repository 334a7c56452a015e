//! Directed, identity-distinguished edges and endpoint mutation.
//!
//! An [`Edge`] stores its endpoints as `Option<NodeKey>`; `None` means that
//! side is disconnected. Two edges with the same endpoints are still distinct
//! edges until [`Graph::remove_duplicates`] collapses them.
//!
//! Every endpoint change goes through [`Graph::update_from`] /
//! [`Graph::update_to`] (or their crate-internal infallible forms) so the
//! owning nodes' edge lists stay in step with the edge itself.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

use crate::error::{GraphError, Result};
use crate::graph::Graph;
use crate::node::{NodeId, NodeKey};

/// Process-wide unique edge identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(u64);

impl EdgeId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// A directed connection between two optional node endpoints.
///
/// Equality is by identity: two edges compare equal only if they are the
/// same edge, regardless of where they point.
#[derive(Debug, Clone)]
pub struct Edge {
    id: EdgeId,
    from: Option<NodeKey>,
    to: Option<NodeKey>,
    label: String,
}

impl Edge {
    fn new(label: String) -> Self {
        Self {
            id: EdgeId::next(),
            from: None,
            to: None,
            label,
        }
    }

    #[must_use]
    pub const fn id(&self) -> EdgeId {
        self.id
    }

    #[must_use]
    pub const fn from(&self) -> Option<NodeKey> {
        self.from
    }

    #[must_use]
    pub const fn to(&self) -> Option<NodeKey> {
        self.to
    }

    /// `(from, to)` pair, the grouping key for parallel-edge detection.
    #[must_use]
    pub const fn endpoints(&self) -> (Option<NodeKey>, Option<NodeKey>) {
        (self.from, self.to)
    }

    /// Diagnostic label; carries no semantics.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Both endpoints present.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.from.is_some() && self.to.is_some()
    }

    /// Both endpoints absent: eligible for [`Graph::groom_paths`].
    #[must_use]
    pub const fn is_orphaned(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }
}

impl PartialEq for Edge {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Edge {}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let side = |key: Option<NodeKey>| key.map_or_else(|| "-".to_string(), |k| k.to_string());
        let label = if self.label.is_empty() { "-" } else { self.label.as_str() };
        write!(
            f,
            "{} [{} / {}] {}",
            side(self.from),
            self.id,
            label,
            side(self.to)
        )
    }
}

impl<I: NodeId> Graph<I> {
    /// Create an edge `from → to` and register it.
    ///
    /// # Errors
    ///
    /// [`GraphError::UnknownNodeKey`] if either endpoint is not a live node.
    pub fn add_edge(
        &mut self,
        from: NodeKey,
        to: NodeKey,
        label: impl Into<String>,
    ) -> Result<EdgeId> {
        self.require_node(from)?;
        self.require_node(to)?;
        Ok(self.link(from, to, label.into()))
    }

    /// Point `edge` at a new target (or detach its target with `None`).
    ///
    /// Returns `false` if `to` already is the current target.
    ///
    /// # Errors
    ///
    /// [`GraphError::UnknownEdge`] / [`GraphError::UnknownNodeKey`] if the
    /// edge or the new target does not exist.
    pub fn update_to(&mut self, edge: EdgeId, to: Option<NodeKey>) -> Result<bool> {
        self.require_edge(edge)?;
        if let Some(key) = to {
            self.require_node(key)?;
        }
        Ok(self.set_to(edge, to))
    }

    /// Move the source of `edge` (or detach it with `None`).
    ///
    /// # Errors
    ///
    /// Same as [`Graph::update_to`].
    pub fn update_from(&mut self, edge: EdgeId, from: Option<NodeKey>) -> Result<bool> {
        self.require_edge(edge)?;
        if let Some(key) = from {
            self.require_node(key)?;
        }
        Ok(self.set_from(edge, from))
    }

    /// Set both endpoints at once.
    ///
    /// # Errors
    ///
    /// Same as [`Graph::update_to`]; nothing is changed on error.
    pub fn join(&mut self, edge: EdgeId, from: NodeKey, to: NodeKey) -> Result<bool> {
        self.require_edge(edge)?;
        self.require_node(from)?;
        self.require_node(to)?;
        let moved_from = self.set_from(edge, Some(from));
        let moved_to = self.set_to(edge, Some(to));
        Ok(moved_from || moved_to)
    }

    /// Clear both endpoints. The edge stays registered until
    /// [`Graph::groom_paths`] collects it.
    ///
    /// # Errors
    ///
    /// [`GraphError::UnknownEdge`] if the edge does not exist.
    pub fn disconnect(&mut self, edge: EdgeId) -> Result<bool> {
        self.require_edge(edge)?;
        Ok(self.detach(edge))
    }

    /// Register a fresh edge between two nodes the caller knows are live.
    pub(crate) fn link(&mut self, from: NodeKey, to: NodeKey, label: String) -> EdgeId {
        let edge = Edge::new(label);
        let id = edge.id;
        self.edges.insert(id, edge);
        self.set_from(id, Some(from));
        self.set_to(id, Some(to));
        id
    }

    pub(crate) fn require_edge(&self, edge: EdgeId) -> Result<()> {
        if self.edges.contains_key(&edge) {
            Ok(())
        } else {
            Err(GraphError::UnknownEdge(edge))
        }
    }

    pub(crate) fn detach(&mut self, edge: EdgeId) -> bool {
        let cleared_from = self.set_from(edge, None);
        let cleared_to = self.set_to(edge, None);
        cleared_from || cleared_to
    }

    /// Move the target side of `edge`, keeping both nodes' lists in step.
    /// Callers guarantee `to` is live; a missing edge is a no-op.
    pub(crate) fn set_to(&mut self, edge: EdgeId, to: Option<NodeKey>) -> bool {
        let Some(current) = self.edges.get(&edge).map(Edge::to) else {
            return false;
        };
        if current == to {
            return false;
        }

        if let Some(node) = current.and_then(|old| self.nodes.get_mut(&old)) {
            node.incoming.retain(|e| *e != edge);
        }
        if let Some(e) = self.edges.get_mut(&edge) {
            e.to = to;
        }
        if let Some(node) = to.and_then(|new| self.nodes.get_mut(&new)) {
            if !node.incoming.contains(&edge) {
                node.incoming.push(edge);
            }
        }

        debug!(%edge, old = ?current, new = ?to, "retarget edge");
        true
    }

    /// Move the source side of `edge`, keeping both nodes' lists in step.
    pub(crate) fn set_from(&mut self, edge: EdgeId, from: Option<NodeKey>) -> bool {
        let Some(current) = self.edges.get(&edge).map(Edge::from) else {
            return false;
        };
        if current == from {
            return false;
        }

        if let Some(node) = current.and_then(|old| self.nodes.get_mut(&old)) {
            node.outgoing.retain(|e| *e != edge);
        }
        if let Some(e) = self.edges.get_mut(&edge) {
            e.from = from;
        }
        if let Some(node) = from.and_then(|new| self.nodes.get_mut(&new)) {
            if !node.outgoing.contains(&edge) {
                node.outgoing.push(edge);
            }
        }

        debug!(%edge, old = ?current, new = ?from, "move edge source");
        true
    }
}

#[cfg(test)]
mod tests {
    use crate::graph::Graph;

    fn pair() -> (Graph<&'static str>, crate::NodeKey, crate::NodeKey) {
        let mut g = Graph::new();
        let a = g.add_node("a", false).unwrap();
        let b = g.add_node("b", false).unwrap();
        (g, a, b)
    }

    #[test]
    fn add_edge_links_both_endpoints() {
        let (mut g, a, b) = pair();
        let e = g.add_edge(a, b, "ab").unwrap();

        assert_eq!(g.node(a).unwrap().outgoing(), &[e]);
        assert_eq!(g.node(b).unwrap().incoming(), &[e]);
        let edge = g.edge(e).unwrap();
        assert_eq!(edge.endpoints(), (Some(a), Some(b)));
        assert_eq!(edge.label(), "ab");
        assert!(edge.is_connected());
    }

    #[test]
    fn add_edge_rejects_unknown_endpoint() {
        let (mut g, a, b) = pair();
        let ghost = {
            let mut other: Graph<&str> = Graph::new();
            other.add_node("x", false).unwrap();
            other.add_node("y", false).unwrap();
            other.add_node("z", false).unwrap()
        };
        assert!(g.add_edge(a, ghost, "").is_err());
        assert_eq!(g.edge_count(), 0);
        assert!(g.add_edge(a, b, "").is_ok());
    }

    #[test]
    fn parallel_edges_are_distinct() {
        let (mut g, a, b) = pair();
        let e1 = g.add_edge(a, b, "").unwrap();
        let e2 = g.add_edge(a, b, "").unwrap();

        assert_ne!(e1, e2);
        assert_ne!(g.edge(e1).unwrap(), g.edge(e2).unwrap());
        assert_eq!(g.node(a).unwrap().out_degree(), 2);
    }

    #[test]
    fn update_to_same_target_is_unchanged() {
        let (mut g, a, b) = pair();
        let e = g.add_edge(a, b, "").unwrap();
        assert!(!g.update_to(e, Some(b)).unwrap());
        assert_eq!(g.node(b).unwrap().in_degree(), 1);
    }

    #[test]
    fn update_to_moves_between_incoming_lists() {
        let (mut g, a, b) = pair();
        let c = g.add_node("c", false).unwrap();
        let e = g.add_edge(a, b, "").unwrap();

        assert!(g.update_to(e, Some(c)).unwrap());
        assert_eq!(g.node(b).unwrap().in_degree(), 0);
        assert_eq!(g.node(c).unwrap().incoming(), &[e]);
        assert_eq!(g.edge(e).unwrap().to(), Some(c));
        g.verify().unwrap();
    }

    #[test]
    fn update_from_moves_between_outgoing_lists() {
        let (mut g, a, b) = pair();
        let c = g.add_node("c", false).unwrap();
        let e = g.add_edge(a, b, "").unwrap();

        assert!(g.update_from(e, Some(c)).unwrap());
        assert_eq!(g.node(a).unwrap().out_degree(), 0);
        assert_eq!(g.node(c).unwrap().outgoing(), &[e]);
        assert_eq!(g.node(b).unwrap().incoming(), &[e]);
        g.verify().unwrap();
    }

    #[test]
    fn partial_disconnect_keeps_other_side() {
        let (mut g, a, b) = pair();
        let e = g.add_edge(a, b, "").unwrap();

        assert!(g.update_to(e, None).unwrap());
        let edge = g.edge(e).unwrap();
        assert_eq!(edge.endpoints(), (Some(a), None));
        assert!(!edge.is_connected());
        assert!(!edge.is_orphaned());
        assert_eq!(g.node(a).unwrap().out_degree(), 1);
    }

    #[test]
    fn disconnect_clears_both_sides() {
        let (mut g, a, b) = pair();
        let e = g.add_edge(a, b, "").unwrap();

        assert!(g.disconnect(e).unwrap());
        assert!(g.edge(e).unwrap().is_orphaned());
        assert_eq!(g.node(a).unwrap().degree(), 0);
        assert_eq!(g.node(b).unwrap().degree(), 0);
        assert!(!g.disconnect(e).unwrap(), "second disconnect is a no-op");
    }

    #[test]
    fn join_reconnects_orphan() {
        let (mut g, a, b) = pair();
        let e = g.add_edge(a, b, "").unwrap();
        g.disconnect(e).unwrap();

        assert!(g.join(e, b, a).unwrap());
        assert_eq!(g.edge(e).unwrap().endpoints(), (Some(b), Some(a)));
        g.verify().unwrap();
    }

    #[test]
    fn display_uses_dash_for_missing_parts() {
        let (mut g, a, b) = pair();
        let e = g.add_edge(a, b, "").unwrap();
        g.update_to(e, None).unwrap();
        let text = g.edge(e).unwrap().to_string();
        assert!(text.starts_with(&a.to_string()));
        assert!(text.ends_with(" / -] -"), "{text}");
    }
}
