//! Error types for Fracture

use thiserror::Error;

use crate::network::NodeId;

/// Errors raised by a [`Network`](crate::network::Network) implementation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkError {
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),
}

/// Errors raised while scoring nodes with a metric
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MetricError {
    #[error("Metric {metric} returned no score for node {node}")]
    Incomplete { metric: String, node: NodeId },

    #[error("Metric {metric} returned a non-finite score {score} for node {node}")]
    NonFinite {
        metric: String,
        node: NodeId,
        score: f64,
    },

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),
}

/// A name that does not match any known variant of a registry
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown {kind}: {name}")]
pub struct ParseKindError {
    pub kind: &'static str,
    pub name: String,
}
