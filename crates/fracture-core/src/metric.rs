//! Node metrics used to rank removal targets
//!
//! A metric scores a set of nodes (or every node) of the current network;
//! higher scores mark better targets. Metrics are pure functions of the
//! network state and are re-evaluated after every removal.
//!
//! ## Built-in metrics
//!
//! - [`Degree`]: number of incident edges (the default)
//! - [`Betweenness`]: shortest-path betweenness (Brandes)
//! - [`Eigenvector`]: eigenvector centrality by power iteration

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{MetricError, NetworkError, ParseKindError};
use crate::network::{Network, NodeId};

/// Scores keyed by node, in ascending node order
pub type Scores = BTreeMap<NodeId, f64>;

/// A node-scoring function
pub trait Metric<N: Network>: Send + Sync {
    /// Short name used in logs and errors
    fn name(&self) -> &str;

    /// Score each node in `nodes`, or every node if `nodes` is `None`
    fn scores(&self, network: &N, nodes: Option<&[NodeId]>) -> Result<Scores, MetricError>;
}

/// Resolve the node subset a metric was asked about
fn requested<N: Network>(network: &N, nodes: Option<&[NodeId]>) -> Vec<NodeId> {
    match nodes {
        Some(nodes) => nodes.to_vec(),
        None => network.nodes(),
    }
}

/// Check that `scores` covers every requested node with a finite value
pub fn validate_scores(
    metric: &str,
    requested: &[NodeId],
    scores: &Scores,
) -> Result<(), MetricError> {
    for &node in requested {
        match scores.get(&node) {
            None => {
                return Err(MetricError::Incomplete {
                    metric: metric.to_string(),
                    node,
                });
            }
            Some(score) if !score.is_finite() => {
                return Err(MetricError::NonFinite {
                    metric: metric.to_string(),
                    node,
                    score: *score,
                });
            }
            Some(_) => {}
        }
    }
    Ok(())
}

/// Node degree
#[derive(Debug, Clone, Copy, Default)]
pub struct Degree;

impl<N: Network> Metric<N> for Degree {
    fn name(&self) -> &str {
        "degree"
    }

    fn scores(&self, network: &N, nodes: Option<&[NodeId]>) -> Result<Scores, MetricError> {
        requested(network, nodes)
            .into_iter()
            .map(|node| -> Result<(NodeId, f64), MetricError> {
                Ok((node, network.degree(node)? as f64))
            })
            .collect()
    }
}

/// Dense index over the current network, used by the global metrics
struct Indexed {
    ids: Vec<NodeId>,
    adjacency: Vec<Vec<usize>>,
}

impl Indexed {
    fn build<N: Network>(network: &N) -> Result<Self, NetworkError> {
        let ids = network.nodes();
        let index: HashMap<NodeId, usize> =
            ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();

        let mut adjacency = Vec::with_capacity(ids.len());
        for id in &ids {
            let neighbors: Vec<usize> = network
                .neighbors(*id)?
                .into_iter()
                .filter_map(|n| index.get(&n).copied())
                .collect();
            adjacency.push(neighbors);
        }

        Ok(Self { ids, adjacency })
    }

    /// Restrict whole-network values to the requested subset
    fn restrict(&self, values: &[f64], nodes: Option<&[NodeId]>) -> Result<Scores, MetricError> {
        let all: Scores = self.ids.iter().copied().zip(values.iter().copied()).collect();
        match nodes {
            None => Ok(all),
            Some(nodes) => nodes
                .iter()
                .map(|node| {
                    all.get(node)
                        .map(|score| (*node, *score))
                        .ok_or(MetricError::Network(NetworkError::NodeNotFound(*node)))
                })
                .collect(),
        }
    }
}

/// Shortest-path betweenness centrality
///
/// Exact Brandes accumulation over unweighted edges, O(V * E) per evaluation.
/// Scores are not normalized; each unordered pair is counted once.
#[derive(Debug, Clone, Copy, Default)]
pub struct Betweenness;

impl Betweenness {
    fn compute(graph: &Indexed) -> Vec<f64> {
        let n = graph.ids.len();
        let mut centrality = vec![0.0; n];

        let mut stack = Vec::with_capacity(n);
        let mut queue = VecDeque::with_capacity(n);
        let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut sigma = vec![0.0f64; n];
        let mut distance = vec![-1i64; n];
        let mut delta = vec![0.0f64; n];

        for source in 0..n {
            stack.clear();
            for p in predecessors.iter_mut() {
                p.clear();
            }
            sigma.iter_mut().for_each(|s| *s = 0.0);
            distance.iter_mut().for_each(|d| *d = -1);
            delta.iter_mut().for_each(|d| *d = 0.0);

            sigma[source] = 1.0;
            distance[source] = 0;
            queue.push_back(source);

            while let Some(v) = queue.pop_front() {
                stack.push(v);
                for &w in &graph.adjacency[v] {
                    if distance[w] < 0 {
                        distance[w] = distance[v] + 1;
                        queue.push_back(w);
                    }
                    if distance[w] == distance[v] + 1 {
                        sigma[w] += sigma[v];
                        predecessors[w].push(v);
                    }
                }
            }

            while let Some(w) = stack.pop() {
                for &v in &predecessors[w] {
                    delta[v] += sigma[v] / sigma[w] * (1.0 + delta[w]);
                }
                if w != source {
                    centrality[w] += delta[w];
                }
            }
        }

        // Undirected: every path was accumulated from both endpoints
        centrality.iter_mut().for_each(|c| *c /= 2.0);
        centrality
    }
}

impl<N: Network> Metric<N> for Betweenness {
    fn name(&self) -> &str {
        "betweenness"
    }

    fn scores(&self, network: &N, nodes: Option<&[NodeId]>) -> Result<Scores, MetricError> {
        let graph = Indexed::build(network)?;
        graph.restrict(&Self::compute(&graph), nodes)
    }
}

/// Eigenvector centrality
///
/// Power iteration on `I + A` (the shift keeps bipartite graphs from
/// oscillating). A graph without edges scores zero everywhere.
#[derive(Debug, Clone, Copy)]
pub struct Eigenvector {
    pub max_iterations: usize,
    pub tolerance: f64,
}

impl Default for Eigenvector {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            tolerance: 1e-6,
        }
    }
}

impl Eigenvector {
    fn compute(&self, graph: &Indexed) -> Vec<f64> {
        let n = graph.ids.len();
        if n == 0 {
            return Vec::new();
        }
        if graph.adjacency.iter().all(Vec::is_empty) {
            return vec![0.0; n];
        }

        let mut x = vec![1.0 / n as f64; n];
        for iteration in 0..self.max_iterations {
            let mut next = x.clone();
            for (v, neighbors) in graph.adjacency.iter().enumerate() {
                for &w in neighbors {
                    next[v] += x[w];
                }
            }

            let norm = next.iter().map(|value| value * value).sum::<f64>().sqrt();
            next.iter_mut().for_each(|value| *value /= norm);

            let change: f64 = next.iter().zip(&x).map(|(a, b)| (a - b).abs()).sum();
            x = next;
            if change < n as f64 * self.tolerance {
                trace!(nodes = n, iterations = iteration + 1, "Eigenvector converged");
                return x;
            }
        }

        debug!(
            nodes = n,
            max_iterations = self.max_iterations,
            "Eigenvector did not converge; using last iterate"
        );
        x
    }
}

impl<N: Network> Metric<N> for Eigenvector {
    fn name(&self) -> &str {
        "eigenvector"
    }

    fn scores(&self, network: &N, nodes: Option<&[NodeId]>) -> Result<Scores, MetricError> {
        let graph = Indexed::build(network)?;
        graph.restrict(&self.compute(&graph), nodes)
    }
}

/// A metric backed by a plain function or closure
pub struct FnMetric<F> {
    name: String,
    f: F,
}

impl<F> FnMetric<F> {
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<N, F> Metric<N> for FnMetric<F>
where
    N: Network,
    F: Fn(&N, Option<&[NodeId]>) -> Result<Scores, MetricError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn scores(&self, network: &N, nodes: Option<&[NodeId]>) -> Result<Scores, MetricError> {
        (self.f)(network, nodes)
    }
}

/// Names of the built-in metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    #[default]
    Degree,
    Betweenness,
    Eigenvector,
}

impl MetricKind {
    /// Instantiate the metric for a network type
    pub fn build<N: Network + 'static>(self) -> Arc<dyn Metric<N>> {
        match self {
            MetricKind::Degree => Arc::new(Degree),
            MetricKind::Betweenness => Arc::new(Betweenness),
            MetricKind::Eigenvector => Arc::new(Eigenvector::default()),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Degree => "degree",
            MetricKind::Betweenness => "betweenness",
            MetricKind::Eigenvector => "eigenvector",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricKind {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "degree" => Ok(MetricKind::Degree),
            "betweenness" => Ok(MetricKind::Betweenness),
            "eigenvector" => Ok(MetricKind::Eigenvector),
            other => Err(ParseKindError {
                kind: "metric",
                name: other.to_string(),
            }),
        }
    }
}
