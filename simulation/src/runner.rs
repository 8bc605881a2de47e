//! Multi-strategy runner
//!
//! For every snapshot the runner starts one [`Simulation`] per configured
//! attack type on the rayon pool. Each run owns a private [`Attacker`], so
//! no graph state is shared, and returns its own curve; the runner merges
//! the curves into the snapshot's pre-allocated result slots once every run
//! has joined. Snapshots are processed one after another.

use rayon::prelude::*;
use tracing::{error, info, warn};

use fracture_core::Network;

use crate::attacker::Attacker;
use crate::error::{ConfigError, SimError};
use crate::reader::Snapshot;
use crate::simulation::{SimConfig, Simulation};
use crate::types::{AttackType, ResultStore, RobustnessCurve};

/// Outcome of one attack run
#[derive(Debug)]
pub struct RunReport {
    pub attack: AttackType,
    /// Everything measured before the run ended
    pub curve: RobustnessCurve,
    /// Why the run stopped early, if it did
    pub error: Option<SimError>,
}

impl RunReport {
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }
}

/// Runs every configured attack type against snapshots
#[derive(Debug, Clone)]
pub struct Runner {
    config: SimConfig,
}

impl Runner {
    /// Create a runner with a validated configuration
    pub fn new(config: SimConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Seed for one run, distinct per snapshot and attack type
    fn run_seed(&self, snapshot_index: usize, attack: AttackType) -> Option<u64> {
        let slot = (snapshot_index * AttackType::ALL.len() + attack.index()) as u64;
        self.config.seed.map(|seed| seed.wrapping_add(slot))
    }

    /// Run every attack type against `network` in parallel
    ///
    /// Reports come back in attack-type order. A failed run does not stop
    /// the others.
    pub fn run_snapshot<N: Network + 'static>(
        &self,
        network: &N,
        n: usize,
        snapshot_index: usize,
    ) -> Vec<RunReport> {
        let attacks: Vec<AttackType> = self.config.attack_types.iter().copied().collect();
        attacks
            .into_par_iter()
            .map(|attack| self.run_one(network, n, attack, self.run_seed(snapshot_index, attack)))
            .collect()
    }

    fn run_one<N: Network + 'static>(
        &self,
        network: &N,
        n: usize,
        attack: AttackType,
        seed: Option<u64>,
    ) -> RunReport {
        let metric = Some(self.config.metric.build::<N>());
        let attacker = match seed {
            Some(seed) => Attacker::with_seed(network, n, metric, seed),
            None => Attacker::new(network, n, metric),
        };
        let attacker = match attacker {
            Ok(attacker) => attacker,
            Err(e) => {
                error!(%attack, error = %e, "Could not create attacker");
                return RunReport {
                    attack,
                    curve: RobustnessCurve::new(),
                    error: Some(e.into()),
                };
            }
        };

        let mut sim = Simulation::new(attacker, attack, &self.config);
        let result = sim.run();
        if let Err(e) = &result {
            error!(
                %attack,
                error = %e,
                entries = sim.curve().len(),
                "Run aborted; keeping partial curve"
            );
        }

        RunReport {
            attack,
            curve: sim.into_curve(),
            error: result.err(),
        }
    }

    /// Run one snapshot and merge its curves into `store`
    ///
    /// Returns one outcome per run; the curves themselves move into the store.
    /// Snapshots too small for one node per step, and snapshots whose label
    /// is already in the store, are skipped.
    pub fn run_into<N: Network + 'static>(
        &self,
        store: &mut ResultStore,
        snapshot: &Snapshot<N>,
        snapshot_index: usize,
    ) -> Result<Vec<AttackOutcome>, SimError> {
        let nodes = snapshot.network.node_count();
        let n = self.config.attack_size(nodes);
        info!(
            timestamp = %snapshot.label,
            nodes,
            n,
            "Processing topology snapshot"
        );

        if store.contains(&snapshot.label) {
            warn!(
                timestamp = %snapshot.label,
                "Label already has results; skipping snapshot"
            );
            return Ok(Vec::new());
        }
        if n == 0 {
            warn!(
                timestamp = %snapshot.label,
                nodes,
                step = self.config.step,
                "Snapshot too small for the step size; skipping"
            );
            return Ok(Vec::new());
        }
        if n * self.config.iterations() > nodes {
            warn!(
                timestamp = %snapshot.label,
                nodes,
                n,
                iterations = self.config.iterations(),
                "Runs will exhaust the network before the last step"
            );
        }

        store.allocate(&snapshot.label);
        let reports = self.run_snapshot(&snapshot.network, n, snapshot_index);

        let mut outcomes = Vec::with_capacity(reports.len());
        for report in reports {
            outcomes.push(AttackOutcome {
                attack: report.attack,
                entries: report.curve.len(),
                error: report.error,
            });
            store.insert(report.attack, &snapshot.label, report.curve)?;
        }
        Ok(outcomes)
    }

    /// Run every snapshot in order and collect the curves
    ///
    /// A snapshot that cannot be stored is logged and dropped; results of the
    /// other snapshots are kept.
    pub fn run_source<N, I>(&self, snapshots: I) -> ResultStore
    where
        N: Network + 'static,
        I: IntoIterator<Item = Snapshot<N>>,
    {
        let mut store = ResultStore::new(self.config.attack_types.iter().copied());
        let mut processed = 0;
        let mut failed = 0;

        for (index, snapshot) in snapshots.into_iter().enumerate() {
            match self.run_into(&mut store, &snapshot, index) {
                Ok(outcomes) => {
                    failed += outcomes.iter().filter(|o| o.error.is_some()).count();
                    processed += 1;
                }
                Err(e) => {
                    error!(timestamp = %snapshot.label, error = %e, "Could not store snapshot results");
                }
            }
        }

        info!(snapshots = processed, failed_runs = failed, "All snapshots processed");
        store
    }
}

/// Summary of one run after its curve has been stored
#[derive(Debug)]
pub struct AttackOutcome {
    pub attack: AttackType,
    /// Measurements recorded, including the baseline
    pub entries: usize,
    pub error: Option<SimError>,
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use chrono::NaiveDate;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use fracture_core::{Graph, Measurement, MetricKind, from_edges};

    use super::*;
    use crate::error::AttackError;
    use crate::topology::GraphBuilder;

    fn small_config() -> SimConfig {
        SimConfig {
            end: 0.1,
            step: 0.01,
            ..SimConfig::default()
        }
    }

    fn snapshot(network: Graph, month: u32) -> Snapshot {
        let date = NaiveDate::from_ymd_opt(2016, month, 1).unwrap();
        Snapshot::new(network, date, date.format("%Y-%m").to_string())
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = SimConfig {
            step: 0.0,
            ..SimConfig::default()
        };
        assert!(Runner::new(config).is_err());
    }

    #[test]
    fn test_snapshot_fan_out() {
        let runner = Runner::new(small_config()).unwrap();
        let graph = GraphBuilder::new(500).random_with(0.02, &mut StdRng::seed_from_u64(3));

        let reports = runner.run_snapshot(&graph, 5, 0);

        let attacks: Vec<AttackType> = reports.iter().map(|r| r.attack).collect();
        assert_eq!(attacks, AttackType::ALL.to_vec());
        for report in &reports {
            assert!(report.is_complete(), "{}: {:?}", report.attack, report.error);
            assert_eq!(report.curve.len(), 11);
        }
        // The caller's network is untouched
        assert_eq!(graph.node_count(), 500);
    }

    #[test]
    fn test_seeded_runs_reproduce() {
        let runner = Runner::new(small_config()).unwrap();
        let graph = GraphBuilder::new(300).random_with(0.03, &mut StdRng::seed_from_u64(8));

        let first = runner.run_snapshot(&graph, 3, 0);
        let second = runner.run_snapshot(&graph, 3, 0);
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.curve, b.curve, "{}", a.attack);
        }
    }

    #[test]
    fn test_run_seeds_are_distinct() {
        let runner = Runner::new(SimConfig::default()).unwrap();
        let seeds: BTreeSet<u64> = (0..3)
            .flat_map(|index| AttackType::ALL.map(|attack| (index, attack)))
            .filter_map(|(index, attack)| runner.run_seed(index, attack))
            .collect();
        assert_eq!(seeds.len(), 12);
    }

    #[test]
    fn test_failed_run_keeps_partial_curve() {
        // 100 nodes, 30 per step: the fourth step over-removes
        let config = SimConfig {
            end: 0.5,
            step: 0.1,
            attack_types: BTreeSet::from([AttackType::Random]),
            ..SimConfig::default()
        };
        let runner = Runner::new(config).unwrap();
        let graph = GraphBuilder::new(100).ring();

        let reports = runner.run_snapshot(&graph, 30, 0);
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].curve.len(), 4);
        assert!(matches!(
            reports[0].error,
            Some(SimError::Attack(AttackError::Exhausted { .. }))
        ));
    }

    #[test]
    fn test_run_source_fills_store() {
        let runner = Runner::new(small_config()).unwrap();
        let snapshots = vec![
            snapshot(GraphBuilder::new(200).ring(), 1),
            snapshot(GraphBuilder::new(400).scale_free_with(2, &mut StdRng::seed_from_u64(1)), 2),
        ];

        let store = runner.run_source(snapshots);

        for attack in AttackType::ALL {
            assert_eq!(store.timestamps(attack), vec!["2016-01", "2016-02"]);
            for timestamp in ["2016-01", "2016-02"] {
                let curve = store.get(attack, timestamp).unwrap();
                assert_eq!(curve.len(), 11);
                assert_eq!(curve.get("0.000").unwrap().components, 1);
            }
        }
    }

    #[test]
    fn test_duplicate_label_keeps_first_snapshot() {
        let runner = Runner::new(small_config()).unwrap();
        let snapshots = vec![
            snapshot(GraphBuilder::new(200).ring(), 3),
            snapshot(GraphBuilder::new(300).ring(), 3),
            snapshot(GraphBuilder::new(400).ring(), 4),
        ];

        let store = runner.run_source(snapshots);

        for attack in AttackType::ALL {
            assert_eq!(store.timestamps(attack), vec!["2016-03", "2016-04"]);
            let first = store.get(attack, "2016-03").unwrap();
            assert_eq!(first.get("0.000"), Some(&Measurement::new(1, 200)));
            assert_eq!(first.len(), 11);
            assert!(store.get(attack, "2016-04").is_some());
        }
    }

    #[test]
    fn test_run_into_skips_stored_label() {
        let runner = Runner::new(small_config()).unwrap();
        let mut store = ResultStore::new(AttackType::ALL);

        let first = runner
            .run_into(&mut store, &snapshot(GraphBuilder::new(200).ring(), 3), 0)
            .unwrap();
        assert_eq!(first.len(), 4);

        let second = runner
            .run_into(&mut store, &snapshot(GraphBuilder::new(300).ring(), 3), 1)
            .unwrap();
        assert!(second.is_empty());
        assert_eq!(
            store.get(AttackType::Random, "2016-03").unwrap().get("0.000"),
            Some(&Measurement::new(1, 200))
        );
    }

    #[test]
    fn test_tiny_snapshot_skipped() {
        let runner = Runner::new(small_config()).unwrap();
        let mut store = ResultStore::new(AttackType::ALL);

        // round(20 * 0.01) == 0
        let outcomes = runner
            .run_into(&mut store, &snapshot(GraphBuilder::new(20).ring(), 5), 0)
            .unwrap();

        assert!(outcomes.is_empty());
        assert!(store.timestamps(AttackType::Random).is_empty());
    }

    #[test]
    fn test_metric_from_config() {
        let config = SimConfig {
            end: 0.2,
            step: 0.2,
            attack_types: BTreeSet::from([AttackType::Targeted]),
            metric: MetricKind::Betweenness,
            ..SimConfig::default()
        };
        let runner = Runner::new(config).unwrap();

        // Star: the hub has the highest betweenness
        let reports = runner.run_snapshot(&GraphBuilder::new(5).star(), 1, 0);
        let after = reports[0].curve.get("0.200").unwrap();
        assert_eq!(after.components, 4);
        assert_eq!(after.giant, 1);
    }

    #[test]
    fn test_parallel_runs_are_isolated() {
        let source = from_edges(&[(1, 2), (2, 3), (3, 4), (4, 5)]);
        let mut a = Attacker::with_seed(&source, 1, None, 1).unwrap();
        let b = Attacker::with_seed(&source, 1, None, 2).unwrap();

        a.targeted(None).unwrap();
        let removed = a.removed()[0];

        assert!(!a.network().contains(removed));
        assert!(b.network().contains(removed));
        assert!(source.contains(removed));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn prop_node_count_after_k_steps(
            nodes in 20usize..120,
            n in 1usize..4,
            steps in 1usize..5,
            p in 0.0f64..0.2,
            seed in any::<u64>(),
        ) {
            let graph = GraphBuilder::new(nodes).random_with(p, &mut StdRng::seed_from_u64(seed));
            for attack in AttackType::ALL {
                let mut attacker = Attacker::with_seed(&graph, n, None, seed).unwrap();
                for _ in 0..steps {
                    attacker.attack(attack, None).unwrap();
                }
                prop_assert_eq!(attacker.network().node_count(), nodes - steps * n);
            }
        }

        #[test]
        fn prop_runs_never_see_each_other(
            nodes in 10usize..60,
            k in 1usize..8,
            seed in any::<u64>(),
        ) {
            let graph = GraphBuilder::new(nodes).ring();
            let mut a = Attacker::with_seed(&graph, 1, None, seed).unwrap();
            let b = Attacker::with_seed(&graph, 1, None, seed.wrapping_add(1)).unwrap();

            a.random_path(Some(k)).unwrap();
            for node in a.removed() {
                prop_assert!(b.network().contains(*node));
                prop_assert!(graph.contains(*node));
            }
            prop_assert_eq!(b.network().node_count(), nodes);
            prop_assert_eq!(a.network().node_count(), nodes - k);
        }
    }
}
