//! Synthetic topology generators
//!
//! Provides functions to create various network topologies:
//! - Ring: Each node connected to its two neighbors
//! - Full mesh: Every node connected to every other
//! - Random: Independent edges with a fixed probability (Erdos-Renyi)
//! - Scale-free: Preferential attachment (Barabasi-Albert), the usual
//!   stand-in for inter-domain topologies
//! - Line and star
//!
//! Nodes are numbered `0..node_count`.

use rand::Rng;
use rand::seq::IndexedRandom;

use fracture_core::{Graph, NodeId};

/// Builder for creating synthetic topologies
pub struct GraphBuilder {
    node_count: u64,
}

impl GraphBuilder {
    /// Create a builder with the given number of nodes
    pub fn new(node_count: usize) -> Self {
        Self {
            node_count: node_count as u64,
        }
    }

    fn isolated(&self) -> Graph {
        let mut graph = Graph::new();
        for id in 0..self.node_count {
            graph.add_node(NodeId(id));
        }
        graph
    }

    /// Build a ring topology where each node is connected to its neighbors
    ///
    /// 0 - 1 - 2 - ... - (n-1) - 0
    pub fn ring(self) -> Graph {
        let mut graph = self.isolated();
        let n = self.node_count;
        if n < 2 {
            return graph;
        }

        for i in 0..n {
            graph.connect(NodeId(i), NodeId((i + 1) % n));
        }
        graph
    }

    /// Build a full mesh where every node is connected to every other
    pub fn full_mesh(self) -> Graph {
        let mut graph = self.isolated();
        for i in 0..self.node_count {
            for j in (i + 1)..self.node_count {
                graph.connect(NodeId(i), NodeId(j));
            }
        }
        graph
    }

    /// Build a random graph with given connection probability
    pub fn random(self, connection_probability: f64) -> Graph {
        self.random_with(connection_probability, &mut rand::rng())
    }

    /// Build a random graph drawing from a caller-supplied generator
    pub fn random_with<R: Rng>(self, connection_probability: f64, rng: &mut R) -> Graph {
        let mut graph = self.isolated();
        for i in 0..self.node_count {
            for j in (i + 1)..self.node_count {
                if rng.random::<f64>() < connection_probability {
                    graph.connect(NodeId(i), NodeId(j));
                }
            }
        }
        graph
    }

    /// Build a scale-free graph by preferential attachment
    ///
    /// Starts from a clique of `edges_per_node + 1` nodes; every later node
    /// attaches to `edges_per_node` distinct existing nodes chosen with
    /// probability proportional to their degree.
    pub fn scale_free(self, edges_per_node: usize) -> Graph {
        self.scale_free_with(edges_per_node, &mut rand::rng())
    }

    /// Scale-free graph drawing from a caller-supplied generator
    pub fn scale_free_with<R: Rng>(self, edges_per_node: usize, rng: &mut R) -> Graph {
        let m = edges_per_node.max(1) as u64;
        let seed_size = (m + 1).min(self.node_count);

        let mut graph = Graph::new();
        // Every edge endpoint, so a uniform pick is degree-proportional
        let mut endpoints: Vec<NodeId> = Vec::new();

        for i in 0..seed_size {
            graph.add_node(NodeId(i));
            for j in 0..i {
                graph.connect(NodeId(i), NodeId(j));
                endpoints.push(NodeId(i));
                endpoints.push(NodeId(j));
            }
        }

        for new in seed_size..self.node_count {
            let node = NodeId(new);
            graph.add_node(node);

            let mut targets: Vec<NodeId> = Vec::with_capacity(m as usize);
            while (targets.len() as u64) < m.min(new) {
                let Some(&candidate) = endpoints.choose(rng) else {
                    break;
                };
                if !targets.contains(&candidate) {
                    targets.push(candidate);
                }
            }

            for target in targets {
                graph.connect(node, target);
                endpoints.push(node);
                endpoints.push(target);
            }
        }
        graph
    }

    /// Build a line topology: 0 - 1 - 2 - ...
    pub fn line(self) -> Graph {
        let mut graph = self.isolated();
        for i in 1..self.node_count {
            graph.connect(NodeId(i - 1), NodeId(i));
        }
        graph
    }

    /// Build a star topology: 0 in center, connected to all others
    pub fn star(self) -> Graph {
        let mut graph = self.isolated();
        for i in 1..self.node_count {
            graph.connect(NodeId(0), NodeId(i));
        }
        graph
    }
}
