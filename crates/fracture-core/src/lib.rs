//! # Fracture Core
//!
//! Core traits, types, and errors for studying how networks fall apart under
//! node removal.
//!
//! ## Key Traits
//!
//! - [`Network`]: The capabilities an attacked graph must provide
//! - [`Metric`]: Node scoring used to rank removal targets
//!
//! ## Key Types
//!
//! - [`NodeId`]: Unique, never-reused node identifier
//! - [`Graph`]: Adjacency-map implementation of [`Network`]
//! - [`Measurement`]: Component count and giant-component size

pub mod error;
pub mod graph;
pub mod measure;
pub mod metric;
pub mod network;

// Re-export main types
pub use error::*;
pub use graph::{Graph, from_edges};
pub use measure::{Measurement, measure};
pub use metric::{
    Betweenness, Degree, Eigenvector, FnMetric, Metric, MetricKind, Scores, validate_scores,
};
pub use network::{Network, NodeId};
