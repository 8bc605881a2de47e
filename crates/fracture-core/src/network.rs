//! Network capability abstractions
//!
//! The attack and measurement code never looks inside a concrete graph. It only
//! needs the handful of capabilities described by [`Network`], so alternative
//! backends can be dropped in without touching the simulation.

use std::fmt::{Debug, Display};

use serde::{Deserialize, Serialize};

use crate::error::NetworkError;

/// Unique identifier for a node in a network
///
/// Inter-domain topologies are keyed by AS number, so identifiers are plain
/// unsigned integers. An identifier is never reused once its node is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl NodeId {
    /// Get the underlying integer
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for NodeId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Capabilities required of a mutable, undirected graph
///
/// `Clone` is the copy operation: a clone must share no mutable state with
/// its source, so removing a node from one copy never affects another.
pub trait Network: Clone + Debug + Send + Sync {
    /// All nodes currently present, in ascending identifier order
    fn nodes(&self) -> Vec<NodeId>;

    /// Neighbors of a present node
    fn neighbors(&self, node: NodeId) -> Result<Vec<NodeId>, NetworkError>;

    /// Remove a node together with all incident edges
    fn remove_node(&mut self, node: NodeId) -> Result<(), NetworkError>;

    /// Number of nodes currently present
    fn node_count(&self) -> usize {
        self.nodes().len()
    }

    /// Whether a node is currently present
    fn contains(&self, node: NodeId) -> bool {
        self.neighbors(node).is_ok()
    }

    /// Number of edges incident to a present node
    fn degree(&self, node: NodeId) -> Result<usize, NetworkError> {
        self.neighbors(node).map(|neighbors| neighbors.len())
    }

    /// Whether no nodes remain
    fn is_empty(&self) -> bool {
        self.node_count() == 0
    }
}
