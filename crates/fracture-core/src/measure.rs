//! Robustness measurement
//!
//! A [`Measurement`] is always recomputed from scratch by traversing the
//! current network; nothing is maintained incrementally across removals.

use std::collections::{BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::error::NetworkError;
use crate::network::Network;

/// Connectivity snapshot of a network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Measurement {
    /// Number of connected components
    pub components: usize,
    /// Size of the largest connected component
    pub giant: usize,
}

impl Measurement {
    pub fn new(components: usize, giant: usize) -> Self {
        Self { components, giant }
    }
}

impl std::fmt::Display for Measurement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.components, self.giant)
    }
}

/// Count connected components and the size of the giant component
///
/// An empty network measures `(0, 0)`; isolated nodes each count as their
/// own component of size one.
pub fn measure<N: Network>(network: &N) -> Result<Measurement, NetworkError> {
    let mut unvisited: BTreeSet<_> = network.nodes().into_iter().collect();
    let mut queue = VecDeque::new();
    let mut result = Measurement::default();

    while let Some(root) = unvisited.pop_first() {
        let mut size = 0;
        queue.push_back(root);

        while let Some(node) = queue.pop_front() {
            size += 1;
            for neighbor in network.neighbors(node)? {
                if unvisited.remove(&neighbor) {
                    queue.push_back(neighbor);
                }
            }
        }

        result.components += 1;
        result.giant = result.giant.max(size);
    }

    Ok(result)
}
