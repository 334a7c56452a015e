#![forbid(unsafe_code)]
//! pathgroom library.
//!
//! A reduction engine for directed multigraphs. Nodes marked *permanent* are
//! anchors; [`Graph::groom`] strips everything else down to the structure
//! that connects them: parallel edges are collapsed, dead-end chains are
//! severed, and nodes that merely pass a single route through are elided.
//!
//! ```rust
//! use pathgroom::Graph;
//!
//! let mut graph = Graph::new();
//! graph.initialize(["A", "B", "C", "D"]);
//! graph.set_permanent(&"A")?;
//! graph.set_permanent(&"D")?;
//!
//! graph.groom();
//!
//! assert!(graph.find_node(&"B").is_none());
//! assert_eq!(graph.count_paths(&["D"]), 1);
//! # Ok::<(), pathgroom::GraphError>(())
//! ```
//!
//! # Conventions
//!
//! - **Errors**: [`GraphError`] via `thiserror`; reduction steps never fail,
//!   they report whether they changed anything.
//! - **Logging**: `tracing` macros (`debug!` per mutation, `warn!` on the
//!   round cap). The library installs no subscriber.

pub mod config;
pub mod edge;
pub mod error;
pub mod graph;
pub mod node;

pub use config::GroomConfig;
pub use edge::{Edge, EdgeId};
pub use error::{GraphError, Result};
pub use graph::{Graph, GroomReport, WalkStep};
pub use node::{Node, NodeId, NodeKey};
