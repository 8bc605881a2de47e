//! Target selection and node removal
//!
//! An [`Attacker`] owns a private copy of a network and removes nodes from it
//! following one of four policies:
//!
//! - **random**: a uniformly random present node
//! - **targeted**: the node the metric scores highest
//! - **random_path**: a walk where each target is a random former neighbor
//!   of the previous one
//! - **targeted_path**: the same walk, but each target is the highest-scoring
//!   former neighbor
//!
//! Path walks restart from a uniformly random node whenever the previous
//! target had no neighbors left. A walk lives for one policy call, so every
//! attack step starts from a fresh random node.

use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use tracing::{debug, trace};

use fracture_core::{Degree, Metric, Network, NodeId, validate_scores};

use crate::error::AttackError;
use crate::types::AttackType;

/// A policy implementation: removes `count` nodes, or the attacker's `n`
pub type Policy<N> = fn(&mut Attacker<N>, Option<usize>) -> Result<(), AttackError>;

impl AttackType {
    /// Resolve the policy implementing this attack type
    pub fn policy<N: Network>(self) -> Policy<N> {
        match self {
            AttackType::Random => Attacker::random,
            AttackType::Targeted => Attacker::targeted,
            AttackType::RandomPath => Attacker::random_path,
            AttackType::TargetedPath => Attacker::targeted_path,
        }
    }
}

/// Position of a path walk
///
/// The neighbor cache is captured before its target is removed and is
/// consumed by the next selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PathWalk {
    /// No target yet; the next selection is uniformly random
    #[default]
    Seeded,
    /// The last target and its neighbors as they were just before removal
    Walking {
        target: NodeId,
        neighbors: Vec<NodeId>,
    },
}

impl PathWalk {
    pub fn current_target(&self) -> Option<NodeId> {
        match self {
            PathWalk::Seeded => None,
            PathWalk::Walking { target, .. } => Some(*target),
        }
    }

    pub fn cached_neighbors(&self) -> Option<&[NodeId]> {
        match self {
            PathWalk::Seeded => None,
            PathWalk::Walking { neighbors, .. } => Some(neighbors),
        }
    }
}

/// How a path walk picks among cached neighbors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NeighborRule {
    Random,
    Best,
}

/// Removes nodes from a private working copy of a network
pub struct Attacker<N: Network> {
    /// Working copy, never shared
    network: N,
    /// Nodes removed per attack step
    n: usize,
    metric: Arc<dyn Metric<N>>,
    rng: StdRng,
    /// Removed nodes, in removal order
    removed: Vec<NodeId>,
}

impl<N: Network> std::fmt::Debug for Attacker<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attacker")
            .field("n", &self.n)
            .field("metric", &self.metric.name())
            .field("nodes", &self.network.node_count())
            .field("removed", &self.removed.len())
            .finish()
    }
}

impl<N: Network + 'static> Attacker<N> {
    /// Create an attacker over a copy of `network`
    ///
    /// Without a metric, targets are ranked by degree.
    pub fn new(
        network: &N,
        n: usize,
        metric: Option<Arc<dyn Metric<N>>>,
    ) -> Result<Self, AttackError> {
        Self::with_rng(network, n, metric, StdRng::from_rng(&mut rand::rng()))
    }

    /// Create an attacker whose choices are reproducible from `seed`
    pub fn with_seed(
        network: &N,
        n: usize,
        metric: Option<Arc<dyn Metric<N>>>,
        seed: u64,
    ) -> Result<Self, AttackError> {
        Self::with_rng(network, n, metric, StdRng::seed_from_u64(seed))
    }

    fn with_rng(
        network: &N,
        n: usize,
        metric: Option<Arc<dyn Metric<N>>>,
        rng: StdRng,
    ) -> Result<Self, AttackError> {
        if n == 0 {
            return Err(AttackError::InvalidAttackSize);
        }

        Ok(Self {
            network: network.clone(),
            n,
            metric: metric.unwrap_or_else(|| Arc::new(Degree)),
            rng,
            removed: Vec::new(),
        })
    }
}

impl<N: Network> Attacker<N> {
    /// Nodes removed per attack step
    pub fn n(&self) -> usize {
        self.n
    }

    /// The working network in its current, possibly degraded, state
    pub fn network(&self) -> &N {
        &self.network
    }

    /// Nodes removed so far, in removal order
    pub fn removed(&self) -> &[NodeId] {
        &self.removed
    }

    pub fn metric_name(&self) -> &str {
        self.metric.name()
    }

    /// Run the policy for `attack`
    pub fn attack(&mut self, attack: AttackType, count: Option<usize>) -> Result<(), AttackError> {
        attack.policy()(self, count)
    }

    /// Remove uniformly random nodes
    pub fn random(&mut self, count: Option<usize>) -> Result<(), AttackError> {
        self.execute(AttackType::Random, count, |attacker| attacker.random_node())
    }

    /// Remove the highest-scoring node, re-scoring after every removal
    pub fn targeted(&mut self, count: Option<usize>) -> Result<(), AttackError> {
        self.execute(AttackType::Targeted, count, |attacker| attacker.best_node(None))
    }

    /// Remove nodes along a random walk
    pub fn random_path(&mut self, count: Option<usize>) -> Result<(), AttackError> {
        let mut walk = PathWalk::Seeded;
        self.execute(AttackType::RandomPath, count, |attacker| {
            attacker.next_on_path(&mut walk, NeighborRule::Random)
        })
    }

    /// Remove nodes along a walk that always moves to the best neighbor
    pub fn targeted_path(&mut self, count: Option<usize>) -> Result<(), AttackError> {
        let mut walk = PathWalk::Seeded;
        self.execute(AttackType::TargetedPath, count, |attacker| {
            attacker.next_on_path(&mut walk, NeighborRule::Best)
        })
    }

    /// Remove `count` nodes, each chosen by `choose` against the current state
    fn execute<F>(
        &mut self,
        attack: AttackType,
        count: Option<usize>,
        mut choose: F,
    ) -> Result<(), AttackError>
    where
        F: FnMut(&mut Self) -> Result<NodeId, AttackError>,
    {
        let count = count.unwrap_or(self.n);
        let remaining = self.network.node_count();
        if count > remaining {
            return Err(AttackError::Exhausted {
                requested: count,
                remaining,
            });
        }

        for _ in 0..count {
            let target = choose(self)?;
            self.network.remove_node(target)?;
            self.removed.push(target);
            trace!(%attack, node = %target, "Removed node");
        }

        debug!(
            %attack,
            count,
            remaining = self.network.node_count(),
            "Attack step complete"
        );
        Ok(())
    }

    fn random_node(&mut self) -> Result<NodeId, AttackError> {
        let nodes = self.network.nodes();
        nodes
            .choose(&mut self.rng)
            .copied()
            .ok_or(AttackError::Exhausted {
                requested: 1,
                remaining: 0,
            })
    }

    /// Highest-scoring node among `nodes` (or all nodes)
    ///
    /// Ties go to the smallest node id.
    fn best_node(&self, nodes: Option<&[NodeId]>) -> Result<NodeId, AttackError> {
        let mut candidates = match nodes {
            Some(nodes) => nodes.to_vec(),
            None => self.network.nodes(),
        };
        candidates.sort_unstable();
        candidates.dedup();

        let scores = self.metric.scores(&self.network, nodes)?;
        validate_scores(self.metric.name(), &candidates, &scores)?;

        let mut best: Option<(NodeId, f64)> = None;
        for node in candidates {
            let score = scores[&node];
            match best {
                Some((_, top)) if score <= top => {}
                _ => best = Some((node, score)),
            }
        }

        best.map(|(node, _)| node).ok_or(AttackError::Exhausted {
            requested: 1,
            remaining: 0,
        })
    }

    /// Advance a path walk and return the next target
    fn next_on_path(
        &mut self,
        walk: &mut PathWalk,
        rule: NeighborRule,
    ) -> Result<NodeId, AttackError> {
        let target = match std::mem::take(walk) {
            PathWalk::Walking { neighbors, .. } if !neighbors.is_empty() => match rule {
                NeighborRule::Random => *neighbors
                    .choose(&mut self.rng)
                    .ok_or(AttackError::Exhausted {
                        requested: 1,
                        remaining: 0,
                    })?,
                NeighborRule::Best => self.best_node(Some(&neighbors))?,
            },
            // Seeded, or a dead end: restarts are always random
            _ => self.random_node()?,
        };

        let neighbors = self.network.neighbors(target)?;
        *walk = PathWalk::Walking { target, neighbors };
        Ok(target)
    }
}
