//! The node/edge arena, the grooming orchestration, and read-side queries.
//!
//! # Pipeline
//!
//! ```text
//! add_node / add_edge / initialize
//!        ↓
//! Graph (multigraph, parallel edges, dead ends, filler nodes)
//!        ↓  groom(), repeated rounds until quiet:
//!        │    remove_duplicates  (to fixed point)
//!        │    simplify_nodes     (to fixed point)
//!        │    groom_paths        (drop orphaned edges)
//!        │    groom_nodes        (drop orphaned non-permanent nodes)
//!        ↓
//! reduced Graph: anchors, branch points, and the edges between them
//!        ↓  count_paths / find_node / walk
//! ```
//!
//! Deduplication runs before simplification in every round: a node with two
//! parallel exits to the same target would otherwise look like a branch and
//! block a valid consolidation. Consolidation can in turn funnel several
//! predecessors onto one successor, which is why rounds repeat.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use petgraph::algo::is_cyclic_directed;
use petgraph::graph::{DiGraph, NodeIndex};
use tracing::{debug, instrument, trace, warn};

use crate::config::GroomConfig;
use crate::edge::{Edge, EdgeId};
use crate::error::{GraphError, Result};
use crate::node::{Node, NodeId, NodeKey};

// ---------------------------------------------------------------------------
// Graph
// ---------------------------------------------------------------------------

/// An id-addressable set of nodes and an ordered collection of edges.
///
/// Both tables are ordered by creation, which fixes the visitation order of
/// every pass and the default start of [`Graph::walk`].
#[derive(Debug, Clone)]
pub struct Graph<I> {
    pub(crate) nodes: BTreeMap<NodeKey, Node<I>>,
    pub(crate) edges: BTreeMap<EdgeId, Edge>,
    index: HashMap<I, NodeKey>,
    next_key: u32,
    config: GroomConfig,
}

/// Counts from one [`Graph::groom`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroomReport {
    /// Rounds run, including the final round that found nothing to do.
    pub rounds: usize,
    /// Parallel edges disconnected.
    pub duplicates_removed: usize,
    /// Successful `simplify` calls.
    pub simplifications: usize,
    /// Orphaned edges erased.
    pub paths_removed: usize,
    /// Orphaned nodes erased.
    pub nodes_removed: usize,
    /// `false` if [`GroomConfig::max_rounds`] stopped the loop early.
    pub converged: bool,
}

impl GroomReport {
    /// Whether the call changed the graph at all.
    #[must_use]
    pub const fn changed(&self) -> bool {
        self.duplicates_removed + self.simplifications + self.paths_removed + self.nodes_removed
            > 0
    }
}

/// One edge traversed by [`Graph::walk`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkStep<I> {
    pub from: I,
    pub label: String,
    pub to: Option<I>,
}

impl<I: NodeId> Default for Graph<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: NodeId> Graph<I> {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(GroomConfig::default())
    }

    #[must_use]
    pub fn with_config(config: GroomConfig) -> Self {
        Self {
            nodes: BTreeMap::new(),
            edges: BTreeMap::new(),
            index: HashMap::new(),
            next_key: 0,
            config,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &GroomConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Registration
    // -----------------------------------------------------------------------

    /// Register a node.
    ///
    /// # Errors
    ///
    /// [`GraphError::DuplicateNode`] if `id` is already registered.
    pub fn add_node(&mut self, id: I, permanent: bool) -> Result<NodeKey> {
        if self.index.contains_key(&id) {
            return Err(GraphError::DuplicateNode(format!("{id:?}")));
        }
        Ok(self.insert_node(id, permanent))
    }

    fn insert_node(&mut self, id: I, permanent: bool) -> NodeKey {
        let key = NodeKey(self.next_key);
        self.next_key += 1;
        self.index.insert(id.clone(), key);
        self.nodes.insert(key, Node::new(key, id, permanent));
        key
    }

    /// Mark an existing node as a permanent anchor.
    ///
    /// # Errors
    ///
    /// [`GraphError::NodeNotFound`] if no node has this identifier.
    pub fn set_permanent(&mut self, id: &I) -> Result<()> {
        let node = self
            .index
            .get(id)
            .and_then(|key| self.nodes.get_mut(key))
            .ok_or_else(|| GraphError::NodeNotFound(format!("{id:?}")))?;
        node.permanent = true;
        Ok(())
    }

    /// Chain `ids` with unlabeled edges in order, creating a node for each
    /// id that is not registered yet and reusing the ones that are.
    ///
    /// Returns the key of every position in the chain.
    pub fn initialize(&mut self, ids: impl IntoIterator<Item = I>) -> Vec<NodeKey> {
        let mut keys: Vec<NodeKey> = Vec::new();
        for id in ids {
            let key = match self.index.get(&id) {
                Some(key) => *key,
                None => self.insert_node(id, false),
            };
            if let Some(&prior) = keys.last() {
                self.link(prior, key, String::new());
            }
            keys.push(key);
        }
        keys
    }

    pub(crate) fn require_node(&self, key: NodeKey) -> Result<()> {
        if self.nodes.contains_key(&key) {
            Ok(())
        } else {
            Err(GraphError::UnknownNodeKey(key))
        }
    }

    // -----------------------------------------------------------------------
    // Lookup
    // -----------------------------------------------------------------------

    /// The node registered under `id`, if any.
    #[must_use]
    pub fn find_node(&self, id: &I) -> Option<&Node<I>> {
        self.index.get(id).and_then(|key| self.nodes.get(key))
    }

    #[must_use]
    pub fn node_key(&self, id: &I) -> Option<NodeKey> {
        self.index.get(id).copied()
    }

    #[must_use]
    pub fn node(&self, key: NodeKey) -> Option<&Node<I>> {
        self.nodes.get(&key)
    }

    #[must_use]
    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(&id)
    }

    /// Nodes in creation order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node<I>> + '_ {
        self.nodes.values()
    }

    /// Edges in creation order, including disconnected ones not yet groomed.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> + '_ {
        self.edges.values()
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    fn id_of(&self, key: NodeKey) -> Option<&I> {
        self.nodes.get(&key).map(Node::id)
    }

    // -----------------------------------------------------------------------
    // Reduction passes
    // -----------------------------------------------------------------------

    /// Collapse parallel edges at every node.
    pub fn remove_duplicates(&mut self) -> bool {
        self.dedup_all() > 0
    }

    /// Simplify every node, pass after pass, until a pass changes nothing.
    ///
    /// Returns the number of successful `simplify` calls.
    #[instrument(skip(self), fields(nodes = self.nodes.len()))]
    pub fn simplify_nodes(&mut self) -> usize {
        let mut total = 0;
        loop {
            let keys: Vec<NodeKey> = self.nodes.keys().copied().collect();
            let pass = keys.into_iter().filter(|&key| self.simplify(key)).count();
            if pass == 0 {
                break;
            }
            total += pass;
        }
        total
    }

    /// Erase every edge with both endpoints absent. Returns how many.
    pub fn groom_paths(&mut self) -> usize {
        let mut removed = 0;
        loop {
            let orphans: Vec<EdgeId> = self
                .edges
                .values()
                .filter(|edge| edge.is_orphaned())
                .map(Edge::id)
                .collect();
            if orphans.is_empty() {
                break;
            }
            for id in orphans {
                self.edges.remove(&id);
                removed += 1;
            }
        }
        if removed > 0 {
            debug!(removed, "erase orphaned edges");
        }
        removed
    }

    /// Erase every non-permanent node with no edges. Returns how many.
    pub fn groom_nodes(&mut self) -> usize {
        let mut removed = 0;
        loop {
            let orphans: Vec<NodeKey> = self
                .nodes
                .values()
                .filter(|node| node.is_orphaned())
                .map(Node::key)
                .collect();
            if orphans.is_empty() {
                break;
            }
            for key in orphans {
                if let Some(node) = self.nodes.remove(&key) {
                    debug!(id = ?node.id, "erase orphaned node");
                    self.index.remove(&node.id);
                    removed += 1;
                }
            }
        }
        removed
    }

    /// Run [`Graph::prune_backward`] and [`Graph::prune_forward`] on every
    /// node. Each only fires on its own dead-end shape.
    pub fn prune_nodes(&mut self) -> bool {
        let keys: Vec<NodeKey> = self.nodes.keys().copied().collect();
        let mut changed = false;
        for key in keys {
            changed |= self.prune_backward(key);
            changed |= self.prune_forward(key);
        }
        changed
    }

    /// Reduce the graph to a fixed point.
    ///
    /// Each round fully disconnects edges left with a single endpoint,
    /// deduplicates until stable, simplifies until stable, then collects
    /// orphaned edges and nodes. Rounds repeat until one changes nothing, so
    /// a second call is always a no-op. Permanent nodes survive
    /// unconditionally.
    ///
    /// At least one round always runs; [`GroomConfig::max_rounds`] only
    /// stops a graph that is still changing.
    #[instrument(skip(self), fields(nodes = self.nodes.len(), edges = self.edges.len()))]
    pub fn groom(&mut self) -> GroomReport {
        let mut report = GroomReport::default();

        loop {
            report.rounds += 1;

            let dangling = self.detach_dangling();
            let mut duplicates = 0;
            loop {
                let removed = self.dedup_all();
                if removed == 0 {
                    break;
                }
                duplicates += removed;
            }
            let simplifications = self.simplify_nodes();
            let paths = self.groom_paths();
            let nodes = self.groom_nodes();

            report.duplicates_removed += duplicates;
            report.simplifications += simplifications;
            report.paths_removed += paths;
            report.nodes_removed += nodes;

            if dangling + duplicates + simplifications + paths + nodes == 0 {
                report.converged = true;
                break;
            }
            if report.rounds >= self.config.max_rounds {
                warn!(
                    rounds = report.rounds,
                    "groom hit max_rounds before reaching a fixed point"
                );
                break;
            }
        }

        debug!(?report, "groom finished");
        report
    }

    /// Clear the remaining endpoint of every edge a caller left half
    /// connected, so `groom_paths` erases it. Returns how many.
    fn detach_dangling(&mut self) -> usize {
        let dangling: Vec<EdgeId> = self
            .edges
            .values()
            .filter(|edge| !edge.is_connected() && !edge.is_orphaned())
            .map(Edge::id)
            .collect();
        let detached = dangling
            .into_iter()
            .filter(|&edge| self.detach(edge))
            .count();
        if detached > 0 {
            debug!(detached, "disconnect half-connected edges");
        }
        detached
    }

    fn dedup_all(&mut self) -> usize {
        let keys: Vec<NodeKey> = self.nodes.keys().copied().collect();
        keys.into_iter().map(|key| self.dedup_count(key)).sum()
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Product of out-degrees over every node not in `exclude`.
    ///
    /// A node with no exits makes the product zero: no route. The product
    /// equals the number of routes only when distinct routes never merge
    /// again outside `exclude`; on a general DAG it overcounts. Use
    /// [`Graph::count_paths_checked`] to have that verified. Saturates at
    /// `u128::MAX`.
    #[must_use]
    pub fn count_paths(&self, exclude: &[I]) -> u128 {
        let excluded = self.excluded_keys(exclude);
        self.nodes
            .values()
            .filter(|node| !excluded.contains(&node.key))
            .fold(1_u128, |total, node| {
                total.saturating_mul(node.out_degree() as u128)
            })
    }

    /// [`Graph::count_paths`], refusing graphs where the product would be
    /// wrong.
    ///
    /// # Errors
    ///
    /// - [`GraphError::Reconvergence`] if a node outside `exclude` has more
    ///   than one incoming edge.
    /// - [`GraphError::Cyclic`] if the connected edges form a directed cycle.
    pub fn count_paths_checked(&self, exclude: &[I]) -> Result<u128> {
        let excluded = self.excluded_keys(exclude);
        if let Some(node) = self
            .nodes
            .values()
            .find(|node| !excluded.contains(&node.key) && node.in_degree() > 1)
        {
            return Err(GraphError::Reconvergence {
                node: format!("{:?}", node.id),
                in_degree: node.in_degree(),
            });
        }
        if is_cyclic_directed(&self.to_petgraph()) {
            return Err(GraphError::Cyclic);
        }
        Ok(self.count_paths(exclude))
    }

    fn excluded_keys(&self, exclude: &[I]) -> HashSet<NodeKey> {
        exclude
            .iter()
            .filter_map(|id| self.index.get(id).copied())
            .collect()
    }

    /// Depth-first listing of edges reachable from `start` (default: the
    /// first node). Each edge is followed at most once, so cycles end.
    ///
    /// Diagnostic only; steps are also emitted at `trace` level.
    #[must_use]
    pub fn walk(&self, start: Option<NodeKey>) -> Vec<WalkStep<I>> {
        let Some(start) = start.or_else(|| self.nodes.keys().next().copied()) else {
            debug!("no nodes to walk");
            return Vec::new();
        };

        let mut steps = Vec::new();
        let mut visited: HashSet<EdgeId> = HashSet::new();
        let mut stack: Vec<EdgeId> = self.exits_reversed(start);

        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            let Some(edge) = self.edges.get(&id) else {
                continue;
            };
            let Some(from) = edge.from().and_then(|k| self.id_of(k)) else {
                continue;
            };
            let to = edge.to().and_then(|k| self.id_of(k)).cloned();
            trace!(from = ?from, label = edge.label(), to = ?to, "walk");
            steps.push(WalkStep {
                from: from.clone(),
                label: edge.label().to_string(),
                to,
            });
            if let Some(next) = edge.to() {
                stack.extend(self.exits_reversed(next));
            }
        }
        steps
    }

    fn exits_reversed(&self, key: NodeKey) -> Vec<EdgeId> {
        self.nodes
            .get(&key)
            .map(|n| n.outgoing.iter().rev().copied().collect())
            .unwrap_or_default()
    }

    /// Snapshot of the nodes and fully connected edges as a petgraph
    /// [`DiGraph`], node weights being identifiers and edge weights labels.
    #[must_use]
    pub fn to_petgraph(&self) -> DiGraph<I, String> {
        let mut graph = DiGraph::with_capacity(self.nodes.len(), self.edges.len());
        let positions: HashMap<NodeKey, NodeIndex> = self
            .nodes
            .values()
            .map(|node| (node.key, graph.add_node(node.id.clone())))
            .collect();

        for edge in self.edges.values() {
            if let (Some(from), Some(to)) = edge.endpoints() {
                if let (Some(&a), Some(&b)) = (positions.get(&from), positions.get(&to)) {
                    graph.add_edge(a, b, edge.label().to_string());
                }
            }
        }
        graph
    }

    /// Check that node lists and edge endpoints mirror each other exactly.
    ///
    /// # Errors
    ///
    /// [`GraphError::Inconsistent`] describing the first violation found.
    pub fn verify(&self) -> Result<()> {
        for edge in self.edges.values() {
            let id = edge.id();
            if let Some(from) = edge.from() {
                let node = self.nodes.get(&from).ok_or_else(|| {
                    GraphError::Inconsistent(format!("{id} starts at missing node {from}"))
                })?;
                let listed = node.outgoing.iter().filter(|e| **e == id).count();
                if listed != 1 {
                    return Err(GraphError::Inconsistent(format!(
                        "{id} listed {listed} times in outgoing of {from}"
                    )));
                }
            }
            if let Some(to) = edge.to() {
                let node = self.nodes.get(&to).ok_or_else(|| {
                    GraphError::Inconsistent(format!("{id} ends at missing node {to}"))
                })?;
                let listed = node.incoming.iter().filter(|e| **e == id).count();
                if listed != 1 {
                    return Err(GraphError::Inconsistent(format!(
                        "{id} listed {listed} times in incoming of {to}"
                    )));
                }
            }
        }

        for node in self.nodes.values() {
            let key = node.key;
            if self.index.get(&node.id) != Some(&key) {
                return Err(GraphError::Inconsistent(format!(
                    "index does not map {:?} to {key}",
                    node.id
                )));
            }
            for id in &node.incoming {
                if self.edges.get(id).and_then(Edge::to) != Some(key) {
                    return Err(GraphError::Inconsistent(format!(
                        "{key} lists {id} as incoming but the edge does not end there"
                    )));
                }
            }
            for id in &node.outgoing {
                if self.edges.get(id).and_then(Edge::from) != Some(key) {
                    return Err(GraphError::Inconsistent(format!(
                        "{key} lists {id} as outgoing but the edge does not start there"
                    )));
                }
            }
        }

        if self.index.len() != self.nodes.len() {
            return Err(GraphError::Inconsistent(format!(
                "index holds {} ids for {} nodes",
                self.index.len(),
                self.nodes.len()
            )));
        }
        Ok(())
    }
}

impl<I> fmt::Display for Graph<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} paths and {} nodes",
            self.edges.len(),
            self.nodes.len()
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn anchored(ids: &[&'static str], permanent: &[&'static str]) -> Graph<&'static str> {
        let mut g = Graph::new();
        for id in ids {
            g.add_node(*id, permanent.contains(id)).unwrap();
        }
        g
    }

    fn link(g: &mut Graph<&'static str>, from: &'static str, to: &'static str, label: &str) {
        let a = g.node_key(&from).unwrap();
        let b = g.node_key(&to).unwrap();
        g.add_edge(a, b, label).unwrap();
    }

    #[test]
    fn duplicate_node_ids_rejected() {
        let mut g = anchored(&["A"], &[]);
        assert_eq!(
            g.add_node("A", true),
            Err(GraphError::DuplicateNode("\"A\"".to_string()))
        );
        assert_eq!(g.node_count(), 1);
    }

    #[test]
    fn set_permanent_sets_flag() {
        let mut g = anchored(&["A"], &[]);
        assert!(!g.find_node(&"A").unwrap().is_permanent());
        g.set_permanent(&"A").unwrap();
        assert!(g.find_node(&"A").unwrap().is_permanent());
        assert_eq!(g.groom_nodes(), 0, "anchor survives with zero degree");
    }

    #[test]
    fn set_permanent_missing_id() {
        let mut g: Graph<&str> = Graph::new();
        assert_eq!(
            g.set_permanent(&"nope"),
            Err(GraphError::NodeNotFound("\"nope\"".to_string()))
        );
    }

    #[test]
    fn initialize_reuses_existing_nodes() {
        let mut g = Graph::new();
        let first = g.initialize(["A", "B", "C"]);
        let second = g.initialize(["A", "D"]);

        assert_eq!(g.node_count(), 4);
        assert_eq!(g.edge_count(), 3);
        assert_eq!(first[0], second[0]);
        assert_eq!(g.find_node(&"A").unwrap().out_degree(), 2);
        assert!(g.edges().all(|e| e.label().is_empty()));
        g.verify().unwrap();
    }

    #[test]
    fn initialize_single_id_creates_no_edge() {
        let mut g = Graph::new();
        g.initialize([7_u32]);
        assert_eq!(g.node_count(), 1);
        assert_eq!(g.edge_count(), 0);
    }

    #[test]
    fn groom_paths_erases_only_orphans() {
        let mut g = Graph::new();
        g.initialize(["A", "B", "C"]);
        let ab = g.find_node(&"A").unwrap().outgoing()[0];
        let bc = g.find_node(&"B").unwrap().outgoing()[0];
        g.disconnect(ab).unwrap();
        g.update_to(bc, None).unwrap();

        assert_eq!(g.groom_paths(), 1);
        assert!(g.edge(ab).is_none());
        assert!(g.edge(bc).is_some(), "groom_paths alone leaves half-connected edges");
        assert_eq!(g.groom_paths(), 0);

        g.groom();
        assert!(g.edge(bc).is_none());
        assert_eq!(g.edge_count(), 0);
    }

    #[test]
    fn groom_erases_half_connected_edges() {
        let mut g = anchored(&["A", "B"], &["A", "B"]);
        link(&mut g, "A", "B", "ab");
        let ab = g.find_node(&"A").unwrap().outgoing()[0];
        g.update_to(ab, None).unwrap();
        assert_eq!(g.count_paths(&["B"]), 1, "dangling exit still counted");

        let report = g.groom();
        assert!(report.converged);
        assert_eq!(report.paths_removed, 1);
        assert_eq!(g.edge_count(), 0);
        assert_eq!(g.find_node(&"A").unwrap().out_degree(), 0);
        assert_eq!(g.count_paths(&["B"]), 0);
        g.verify().unwrap();
    }

    #[test]
    fn groom_erases_edges_with_only_a_target() {
        // X → B → C with X's side cleared: B loses its entry, then its exit.
        let mut g = anchored(&["X", "B", "C"], &["C"]);
        link(&mut g, "X", "B", "");
        link(&mut g, "B", "C", "");
        let xb = g.find_node(&"X").unwrap().outgoing()[0];
        g.update_from(xb, None).unwrap();

        g.groom();
        assert!(g.edges().all(Edge::is_connected));
        assert!(g.find_node(&"X").is_none());
        g.verify().unwrap();
    }

    #[test]
    fn zero_round_cap_still_settles_a_quiet_graph() {
        let mut g: Graph<u32> = Graph::with_config(GroomConfig { max_rounds: 0 });
        let report = g.groom();
        assert_eq!(report.rounds, 1);
        assert!(report.converged);
    }

    #[test]
    fn groom_nodes_keeps_permanent_and_connected() {
        let mut g = anchored(&["A", "B", "C", "D"], &["D"]);
        link(&mut g, "A", "B", "");

        assert_eq!(g.groom_nodes(), 1);
        assert!(g.find_node(&"C").is_none());
        assert!(g.find_node(&"D").is_some());
        assert_eq!(g.node_count(), 3);
        g.verify().unwrap();
    }

    #[test]
    fn removed_node_id_can_be_registered_again() {
        let mut g = anchored(&["A"], &[]);
        g.groom_nodes();
        assert!(g.find_node(&"A").is_none());
        assert!(g.add_node("A", false).is_ok());
    }

    #[test]
    fn groom_without_dedup_first_would_see_a_branch() {
        // B has two parallel exits to C; only dedup makes it single-exit.
        let mut g = anchored(&["A", "B", "C"], &["A", "C"]);
        link(&mut g, "A", "B", "");
        link(&mut g, "B", "C", "x");
        link(&mut g, "B", "C", "y");

        let report = g.groom();
        assert!(report.converged);
        assert_eq!(report.duplicates_removed, 1);
        assert!(g.find_node(&"B").is_none());
        let a = g.find_node(&"A").unwrap();
        assert_eq!(a.out_degree(), 1);
        let to = g.edge(a.outgoing()[0]).and_then(Edge::to);
        assert_eq!(to, g.node_key(&"C"));
    }

    #[test]
    fn consolidation_duplicates_are_collapsed_in_a_later_round() {
        // A → B → D and A → C → D: both consolidate into parallel A → D.
        let mut g = anchored(&["A", "B", "C", "D"], &["A", "D"]);
        link(&mut g, "A", "B", "");
        link(&mut g, "A", "C", "");
        link(&mut g, "B", "D", "");
        link(&mut g, "C", "D", "");

        let report = g.groom();
        assert!(report.rounds >= 2);
        assert_eq!(g.node_count(), 2);
        assert_eq!(g.edge_count(), 1);
        assert_eq!(g.find_node(&"A").unwrap().out_degree(), 1);
    }

    #[test]
    fn groom_respects_round_cap() {
        let mut g = Graph::with_config(GroomConfig { max_rounds: 1 });
        for id in ["A", "B", "C", "D"] {
            g.add_node(id, id == "A" || id == "D").unwrap();
        }
        link(&mut g, "A", "B", "");
        link(&mut g, "A", "C", "");
        link(&mut g, "B", "D", "");
        link(&mut g, "C", "D", "");

        let report = g.groom();
        assert_eq!(report.rounds, 1);
        assert!(!report.converged);
        assert_eq!(g.find_node(&"A").unwrap().out_degree(), 2, "duplicates left");
    }

    #[test]
    fn groom_empty_graph_is_noop() {
        let mut g: Graph<u32> = Graph::new();
        let report = g.groom();
        assert!(report.converged);
        assert!(!report.changed());
        assert!(g.is_empty());
    }

    #[test]
    fn prune_nodes_cuts_both_directions() {
        // S → X → T, plus a dangling entry D → X and a dangling exit X → E.
        let mut g = anchored(&["S", "X", "T", "D", "E"], &["S", "T"]);
        link(&mut g, "S", "X", "");
        link(&mut g, "X", "T", "");
        link(&mut g, "D", "X", "");
        link(&mut g, "X", "E", "");

        assert!(g.prune_nodes());
        assert_eq!(g.find_node(&"D").unwrap().degree(), 0);
        assert_eq!(g.find_node(&"E").unwrap().degree(), 0);
        assert_eq!(g.find_node(&"X").unwrap().degree(), 2);
        assert!(!g.prune_nodes());
    }

    #[test]
    fn count_paths_zero_when_dead_end_remains() {
        let mut g = anchored(&["A", "B", "Z"], &["A", "Z"]);
        link(&mut g, "A", "B", "");
        link(&mut g, "A", "Z", "");
        assert_eq!(g.count_paths(&["Z"]), 0, "B has no exit");
    }

    #[test]
    fn count_paths_ignores_unknown_exclusions() {
        let mut g = anchored(&["A", "Z"], &["A", "Z"]);
        link(&mut g, "A", "Z", "");
        assert_eq!(g.count_paths(&["Z", "nope"]), 1);
        assert_eq!(g.count_paths(&[]), 0);
    }

    #[test]
    fn count_paths_checked_rejects_reconvergence() {
        // A → B, A → C, B → M, C → M, M → Z: routes merge at M.
        let mut g = anchored(&["A", "B", "C", "M", "Z"], &["A", "Z"]);
        link(&mut g, "A", "B", "");
        link(&mut g, "A", "C", "");
        link(&mut g, "B", "M", "");
        link(&mut g, "C", "M", "");
        link(&mut g, "M", "Z", "");

        let err = g.count_paths_checked(&["Z"]).unwrap_err();
        assert_eq!(
            err,
            GraphError::Reconvergence {
                node: "\"M\"".to_string(),
                in_degree: 2
            }
        );
        assert_eq!(g.count_paths_checked(&["M", "Z"]).unwrap(), 2);
    }

    #[test]
    fn count_paths_checked_rejects_cycles() {
        let mut g = anchored(&["A", "B"], &["A"]);
        link(&mut g, "A", "B", "");
        link(&mut g, "B", "A", "");
        assert_eq!(g.count_paths_checked(&[]), Err(GraphError::Cyclic));
    }

    #[test]
    fn walk_lists_edges_depth_first() {
        let mut g = anchored(&["A", "B", "C", "D"], &[]);
        link(&mut g, "A", "B", "ab");
        link(&mut g, "B", "C", "bc");
        link(&mut g, "A", "D", "ad");

        let labels: Vec<String> = g.walk(None).into_iter().map(|s| s.label).collect();
        assert_eq!(labels, vec!["ab", "bc", "ad"]);

        let from_b = g.walk(g.node_key(&"B"));
        assert_eq!(
            from_b,
            vec![WalkStep {
                from: "B",
                label: "bc".to_string(),
                to: Some("C"),
            }]
        );
    }

    #[test]
    fn walk_terminates_on_cycle() {
        let mut g = anchored(&["A", "B"], &[]);
        link(&mut g, "A", "B", "");
        link(&mut g, "B", "A", "");
        assert_eq!(g.walk(None).len(), 2);
    }

    #[test]
    fn walk_empty_graph() {
        let g: Graph<&str> = Graph::new();
        assert!(g.walk(None).is_empty());
    }

    #[test]
    fn petgraph_snapshot_skips_partial_edges() {
        let mut g = anchored(&["A", "B", "C"], &[]);
        link(&mut g, "A", "B", "ab");
        link(&mut g, "B", "C", "bc");
        let bc = g.find_node(&"B").unwrap().outgoing()[0];
        g.update_to(bc, None).unwrap();

        let pg = g.to_petgraph();
        assert_eq!(pg.node_count(), 3);
        assert_eq!(pg.edge_count(), 1);
        assert_eq!(pg.edge_weights().next().map(String::as_str), Some("ab"));
    }

    #[test]
    fn display_summarizes_counts() {
        let mut g = Graph::new();
        g.initialize(["A", "B", "C"]);
        assert_eq!(g.to_string(), "2 paths and 3 nodes");
    }
}
