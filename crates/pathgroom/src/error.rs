//! Error type for graph construction, lookup, and checked queries.
//!
//! Reduction operations themselves never fault: disconnected edges and
//! orphaned nodes are expected transient states. Errors are reserved for
//! caller mistakes (unknown ids, duplicate ids, broken preconditions) and for
//! [`crate::Graph::verify`] reporting a corrupted arena.

use crate::edge::EdgeId;
use crate::node::NodeKey;

/// Result alias using [`GraphError`].
pub type Result<T> = std::result::Result<T, GraphError>;

/// Errors from [`crate::Graph`] operations.
///
/// Node identifiers are generic, so they are carried in their `Debug`
/// rendering.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum GraphError {
    /// No node with this identifier is registered.
    #[error("node not found: {0}")]
    NodeNotFound(String),

    /// A node with this identifier is already registered.
    #[error("duplicate node identifier: {0}")]
    DuplicateNode(String),

    /// The key does not address a live node in this graph.
    #[error("unknown node key: {0}")]
    UnknownNodeKey(NodeKey),

    /// The id does not address a live edge in this graph.
    #[error("unknown edge: {0}")]
    UnknownEdge(EdgeId),

    /// Consolidation requires exactly one outgoing edge.
    #[error("node {node} has {out_degree} outgoing edges, expected exactly 1")]
    NotSingleExit { node: String, out_degree: usize },

    /// Two or more routes merge at a node that is not excluded, so the
    /// out-degree product would overcount.
    #[error("routes reconverge at node {node} (in-degree {in_degree})")]
    Reconvergence { node: String, in_degree: usize },

    /// The connected part of the graph contains a directed cycle.
    #[error("graph contains a directed cycle")]
    Cyclic,

    /// Node and edge tables disagree.
    #[error("inconsistent graph: {0}")]
    Inconsistent(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_include_context() {
        let err = GraphError::NotSingleExit {
            node: "\"B\"".to_string(),
            out_degree: 2,
        };
        assert_eq!(
            err.to_string(),
            "node \"B\" has 2 outgoing edges, expected exactly 1"
        );

        let err = GraphError::NodeNotFound("\"Q\"".to_string());
        assert_eq!(err.to_string(), "node not found: \"Q\"");
    }
}
