//! Adjacency-map graph
//!
//! [`Graph`] is the in-memory network the simulation attacks. Node removal
//! touches only the removed node's adjacency set and those of its neighbors.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::NetworkError;
use crate::network::{Network, NodeId};

/// An undirected simple graph
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Graph {
    /// Adjacency list representation
    adjacency: BTreeMap<NodeId, BTreeSet<NodeId>>,
    /// Number of undirected edges
    edges: usize,
}

impl Graph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an isolated node (no-op if already present)
    pub fn add_node(&mut self, id: NodeId) {
        self.adjacency.entry(id).or_default();
    }

    /// Add an undirected edge, creating missing endpoints
    ///
    /// Self loops are ignored and duplicate edges are collapsed.
    pub fn connect(&mut self, a: NodeId, b: NodeId) {
        if a == b {
            self.add_node(a);
            return;
        }

        let inserted = self.adjacency.entry(a).or_default().insert(b);
        self.adjacency.entry(b).or_default().insert(a);
        if inserted {
            self.edges += 1;
        }
    }

    /// Check if two nodes are directly connected
    pub fn are_connected(&self, a: NodeId, b: NodeId) -> bool {
        self.adjacency
            .get(&a)
            .map(|neighbors| neighbors.contains(&b))
            .unwrap_or(false)
    }

    /// Get number of edges
    pub fn edge_count(&self) -> usize {
        self.edges
    }

    /// Print a simple ASCII visualization of the graph
    pub fn visualize(&self) -> String {
        let mut output = String::new();
        output.push_str("Graph:\n");
        output.push_str(&format!("  Nodes: {}\n", self.adjacency.len()));
        output.push_str(&format!("  Edges: {}\n\n", self.edges));

        for (node, neighbors) in &self.adjacency {
            let neighbor_str: Vec<String> = neighbors.iter().map(|n| n.to_string()).collect();
            output.push_str(&format!("  {} -> [{}]\n", node, neighbor_str.join(", ")));
        }
        output
    }
}

impl Network for Graph {
    fn nodes(&self) -> Vec<NodeId> {
        self.adjacency.keys().copied().collect()
    }

    fn neighbors(&self, node: NodeId) -> Result<Vec<NodeId>, NetworkError> {
        self.adjacency
            .get(&node)
            .map(|neighbors| neighbors.iter().copied().collect())
            .ok_or(NetworkError::NodeNotFound(node))
    }

    fn remove_node(&mut self, node: NodeId) -> Result<(), NetworkError> {
        let neighbors = self
            .adjacency
            .remove(&node)
            .ok_or(NetworkError::NodeNotFound(node))?;

        for neighbor in &neighbors {
            if let Some(set) = self.adjacency.get_mut(neighbor) {
                set.remove(&node);
            }
        }
        self.edges -= neighbors.len();
        Ok(())
    }

    fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    fn contains(&self, node: NodeId) -> bool {
        self.adjacency.contains_key(&node)
    }

    fn degree(&self, node: NodeId) -> Result<usize, NetworkError> {
        self.adjacency
            .get(&node)
            .map(BTreeSet::len)
            .ok_or(NetworkError::NodeNotFound(node))
    }
}

impl FromIterator<(NodeId, NodeId)> for Graph {
    fn from_iter<T: IntoIterator<Item = (NodeId, NodeId)>>(iter: T) -> Self {
        let mut graph = Graph::new();
        for (a, b) in iter {
            graph.connect(a, b);
        }
        graph
    }
}

/// Create a graph from an edge list of raw identifiers
pub fn from_edges(edges: &[(u64, u64)]) -> Graph {
    edges
        .iter()
        .map(|&(a, b)| (NodeId(a), NodeId(b)))
        .collect()
}
