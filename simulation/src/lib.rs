//! # Fracture Simulation
//!
//! Adversarial node-removal attacks and robustness curves for large networks.
//!
//! ## Overview
//!
//! An attack removes nodes from a network, a few at a time, and after every
//! step the network is measured: how many connected components it has and
//! how large the biggest one still is. Plotting those measurements against
//! the fraction of nodes removed gives a robustness curve. Key features:
//!
//! - **Four attack types**: random, targeted, random path and targeted path
//! - **Pluggable metrics**: degree by default, betweenness or eigenvector
//!   centrality on request, or any closure
//! - **Parallel fan-out**: every attack type runs on its own private copy of
//!   the network
//! - **Timestamped inputs**: a directory of monthly topology dumps becomes a
//!   sequence of snapshots
//!
//! ## Architecture
//!
//! - **Types** (`types.rs`): Attack types, robustness curves, the result store
//! - **Attacker** (`attacker.rs`): Target selection and node removal
//! - **Simulation** (`simulation.rs`): Configuration and the attack/measure loop
//! - **Runner** (`runner.rs`): Per-snapshot fan-out over attack types
//! - **Reader** (`reader.rs`): Timestamped edge-list files
//! - **Topology** (`topology.rs`): Synthetic graphs (ring, full, random, ...)
//! - **Scenarios** (`scenarios.rs`): Pre-built runs
//!
//! ## Example: path graph
//!
//! ```rust,ignore
//! use fracture_simulation::*;
//!
//! // 1 - 2 - 3 - 4 - 5
//! let graph = from_edges(&[(1, 2), (2, 3), (3, 4), (4, 5)]);
//!
//! // Remove one node per step, up to 40% of the network
//! let config = SimConfig { end: 0.4, step: 0.2, ..Default::default() };
//! let attacker = Attacker::new(&graph, 1, None)?;
//! let mut sim = Simulation::new(attacker, AttackType::Targeted, &config);
//! sim.run()?;
//!
//! // Removing node 2 leaves {1} and {3, 4, 5}
//! assert_eq!(sim.curve().get("0.200"), Some(&Measurement::new(2, 3)));
//! ```
//!
//! ## Result layout
//!
//! A [`ResultStore`] maps `attack type -> timestamp -> fraction -> (components, giant)`
//! and is written as JSON:
//!
//! ```text
//! { "targeted": { "2016-03": { "0.000": { "components": 1, "giant": 52113 }, ... } } }
//! ```

pub mod attacker;
pub mod error;
pub mod reader;
pub mod runner;
pub mod scenarios;
pub mod simulation;
pub mod topology;
pub mod types;

#[cfg(test)]
mod integration_scenarios;

// Re-export main types
pub use types::{AttackType, ResultStore, RobustnessCurve, fraction_key};

pub use attacker::{Attacker, PathWalk, Policy};

pub use simulation::{SimConfig, SimState, Simulation};

pub use runner::{AttackOutcome, RunReport, Runner};

pub use reader::{
    DEFAULT_FILENAME_FORMAT, DEFAULT_LABEL_FORMAT, Snapshot, TopologySource, parse_timestamp,
    read_edge_list,
};

pub use topology::GraphBuilder;

pub use error::{AttackError, ConfigError, SimError, SourceError};

// Re-export core types for integration
pub use fracture_core::{
    Graph, Measurement, Metric, MetricKind, Network, NodeId, from_edges, measure,
};
