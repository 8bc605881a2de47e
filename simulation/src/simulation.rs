//! Simulation loop for one attack run
//!
//! A [`Simulation`] drives one [`Attacker`] through repeated attack steps,
//! measuring the network after each one:
//! - The pristine network is recorded at `"0.000"`
//! - Each step runs the attack type's policy once, removing `n` nodes
//! - The measurement after step `i` is keyed by `(i + 1) * step`
//!
//! `start` only shortens the run to `(end - start) / step` steps; keys always
//! count from the untouched network.
//!
//! Runs never retry. A failed step aborts the run and leaves the
//! measurements recorded so far in the curve.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use fracture_core::{MetricKind, Network, measure};

use crate::attacker::{Attacker, Policy};
use crate::error::{ConfigError, SimError};
use crate::types::{AttackType, RobustnessCurve, fraction_key};

/// Absorbs floating-point drift in `(end - start) / step`
const FRACTION_EPSILON: f64 = 1e-9;

/// Most fractional digits a result key carries
const MAX_PRECISION: usize = 9;

/// Configuration for simulation runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Lower bound of the removal range; only the span `end - start` is run
    pub start: f64,
    /// Fraction of nodes removed when the run ends
    pub end: f64,
    /// Fraction of nodes removed per attack step
    pub step: f64,
    /// Attack types run against every snapshot
    pub attack_types: BTreeSet<AttackType>,
    /// Metric ranking targets for the metric-driven policies
    pub metric: MetricKind,
    /// Base seed for reproducible runs (None = fresh entropy)
    pub seed: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            start: 0.0,
            end: 0.1,
            step: 0.001,
            attack_types: AttackType::ALL.into_iter().collect(),
            metric: MetricKind::Degree,
            seed: Some(13),
        }
    }
}

impl SimConfig {
    /// Load a configuration from a TOML file; missing fields take defaults
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        let config: SimConfig = toml::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.step.is_finite() && self.step > 0.0) {
            return Err(ConfigError::InvalidStep(self.step));
        }
        // Coarser than one unit in the last key digit, or keys would collide
        if self.step * 10f64.powi(MAX_PRECISION as i32) < 1.0 - FRACTION_EPSILON {
            return Err(ConfigError::StepTooFine {
                step: self.step,
                digits: MAX_PRECISION,
            });
        }
        if !(0.0 <= self.start && self.start < self.end && self.end <= 1.0) {
            return Err(ConfigError::InvalidRange {
                start: self.start,
                end: self.end,
            });
        }
        if self.attack_types.is_empty() {
            return Err(ConfigError::NoAttackTypes);
        }
        Ok(())
    }

    /// Number of attack steps in a full run
    pub fn iterations(&self) -> usize {
        ((self.end - self.start) / self.step + FRACTION_EPSILON).floor() as usize
    }

    /// Fractional digits in result keys: three, or more if the step needs them
    pub fn precision(&self) -> usize {
        let mut digits = 3;
        while digits < MAX_PRECISION {
            let scaled = self.step * 10f64.powi(digits as i32);
            if (scaled - scaled.round()).abs() < FRACTION_EPSILON * scaled.max(1.0) {
                break;
            }
            digits += 1;
        }
        digits
    }

    /// Key of the measurement taken after `steps` attack steps
    pub fn key(&self, steps: usize) -> String {
        step_key(steps, self.step, self.precision())
    }

    /// Nodes removed per attack step for a network of `node_count` nodes
    pub fn attack_size(&self, node_count: usize) -> usize {
        (node_count as f64 * self.step).round() as usize
    }
}

fn step_key(steps: usize, step: f64, precision: usize) -> String {
    fraction_key(steps as f64 * step, precision)
}

/// Progress of a simulation run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimState {
    /// Nothing measured yet
    Initialized,
    /// Baseline recorded; holds the number of the next step to run
    Stepping(usize),
    /// Every step measured
    Done,
    /// A step failed; the curve holds what was recorded before it
    Aborted,
}

/// One attack run against one network
pub struct Simulation<N: Network> {
    attacker: Attacker<N>,
    attack: AttackType,
    /// Resolved once; fixed for the run
    policy: Policy<N>,
    iterations: usize,
    precision: usize,
    step: f64,
    curve: RobustnessCurve,
    state: SimState,
}

impl<N: Network> Simulation<N> {
    /// Create a simulation running `attack` with `attacker`
    pub fn new(attacker: Attacker<N>, attack: AttackType, config: &SimConfig) -> Self {
        Self {
            attacker,
            attack,
            policy: attack.policy(),
            iterations: config.iterations(),
            precision: config.precision(),
            step: config.step,
            curve: RobustnessCurve::new(),
            state: SimState::Initialized,
        }
    }

    /// Record the pristine network
    pub fn initialize(&mut self) -> Result<(), SimError> {
        if self.state != SimState::Initialized {
            return Ok(());
        }

        let baseline = self.guard(|sim| {
            let m = measure(sim.attacker.network())?;
            let key = sim.key(0);
            sim.curve.record(key, m)?;
            Ok(m)
        })?;

        info!(
            attack = %self.attack,
            n = self.attacker.n(),
            iterations = self.iterations,
            %baseline,
            "Simulation initialized"
        );

        self.state = if self.iterations == 0 {
            SimState::Done
        } else {
            SimState::Stepping(1)
        };
        Ok(())
    }

    /// Run one attack step and record its measurement
    ///
    /// Initializes first if needed. Finished or aborted runs are left as is.
    pub fn step(&mut self) -> Result<SimState, SimError> {
        let step = match self.state {
            SimState::Initialized => {
                self.initialize()?;
                return Ok(self.state);
            }
            SimState::Stepping(step) => step,
            SimState::Done | SimState::Aborted => return Ok(self.state),
        };

        let policy = self.policy;
        let m = self.guard(|sim| {
            policy(&mut sim.attacker, None)?;
            let m = measure(sim.attacker.network())?;
            let key = sim.key(step);
            sim.curve.record(key, m)?;
            Ok(m)
        })?;

        debug!(
            attack = %self.attack,
            step,
            remaining = self.attacker.network().node_count(),
            measurement = %m,
            "Step complete"
        );

        self.state = if step >= self.iterations {
            SimState::Done
        } else {
            SimState::Stepping(step + 1)
        };
        Ok(self.state)
    }

    /// Run until every step is measured or one fails
    pub fn run(&mut self) -> Result<(), SimError> {
        while !matches!(self.state, SimState::Done | SimState::Aborted) {
            self.step()?;
        }

        if self.state == SimState::Done {
            info!(
                attack = %self.attack,
                entries = self.curve.len(),
                "Simulation complete"
            );
        }
        Ok(())
    }

    pub fn state(&self) -> SimState {
        self.state
    }

    pub fn attack(&self) -> AttackType {
        self.attack
    }

    pub fn attacker(&self) -> &Attacker<N> {
        &self.attacker
    }

    /// Measurements recorded so far
    pub fn curve(&self) -> &RobustnessCurve {
        &self.curve
    }

    pub fn into_curve(self) -> RobustnessCurve {
        self.curve
    }

    fn key(&self, steps: usize) -> String {
        step_key(steps, self.step, self.precision)
    }

    /// Run `f`, moving to `Aborted` if it fails
    fn guard<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, SimError>,
    ) -> Result<T, SimError> {
        let result = f(self);
        if result.is_err() {
            self.state = SimState::Aborted;
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use fracture_core::{Graph, Measurement, NodeId, from_edges};

    use super::*;
    use crate::error::AttackError;
    use crate::topology::GraphBuilder;

    fn config(end: f64, step: f64) -> SimConfig {
        SimConfig {
            end,
            step,
            ..SimConfig::default()
        }
    }

    #[test]
    fn test_default_config() {
        let config = SimConfig::default();
        assert_eq!(config.iterations(), 100);
        assert_eq!(config.precision(), 3);
        assert_eq!(config.attack_types.len(), 4);
        assert_eq!(config.seed, Some(13));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_iterations_absorb_drift() {
        // 0.3 / 0.1 is 2.9999999999999996 in binary floating point
        assert_eq!(config(0.3, 0.1).iterations(), 3);
        assert_eq!(config(0.1, 0.03).iterations(), 3);
    }

    #[test]
    fn test_precision_follows_step() {
        assert_eq!(config(0.1, 0.01).precision(), 3);
        assert_eq!(config(0.1, 0.0005).precision(), 4);
        assert_eq!(config(0.1, 0.00025).precision(), 5);
    }

    #[test]
    fn test_keys() {
        let config = SimConfig::default();
        assert_eq!(config.key(0), "0.000");
        assert_eq!(config.key(1), "0.001");
        assert_eq!(config.key(100), "0.100");
    }

    #[test]
    fn test_keys_count_from_pristine_network() {
        let config = SimConfig {
            start: 0.05,
            end: 0.1,
            step: 0.01,
            ..SimConfig::default()
        };
        assert_eq!(config.iterations(), 5);
        assert_eq!(config.key(0), "0.000");
        assert_eq!(config.key(5), "0.050");

        let graph = GraphBuilder::new(200).ring();
        let attacker = Attacker::with_seed(&graph, 2, None, 6).unwrap();
        let mut sim = Simulation::new(attacker, AttackType::Random, &config);
        sim.run().unwrap();

        let keys: Vec<&str> = sim.curve().iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["0.000", "0.010", "0.020", "0.030", "0.040", "0.050"]);
        assert_eq!(sim.curve().get("0.000"), Some(&Measurement::new(1, 200)));
    }

    #[test]
    fn test_attack_size_rounds() {
        let config = SimConfig::default();
        assert_eq!(config.attack_size(50_000), 50);
        assert_eq!(config.attack_size(1_499), 1);
        assert_eq!(config.attack_size(400), 0);
    }

    #[test]
    fn test_validation() {
        assert!(matches!(
            config(0.1, 0.0).validate(),
            Err(ConfigError::InvalidStep(_))
        ));
        assert!(matches!(
            config(1.5, 0.1).validate(),
            Err(ConfigError::InvalidRange { .. })
        ));

        assert!(matches!(
            config(0.1, 5e-10).validate(),
            Err(ConfigError::StepTooFine { digits: 9, .. })
        ));
        assert!(config(0.1, 1e-9).validate().is_ok());
        assert_eq!(config(0.1, 1e-9).precision(), 9);

        let mut empty = SimConfig::default();
        empty.attack_types.clear();
        assert!(matches!(empty.validate(), Err(ConfigError::NoAttackTypes)));
    }

    #[test]
    fn test_config_from_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "end = 0.05\nstep = 0.01\nattack_types = [\"targeted\", \"random_path\"]\nmetric = \"betweenness\""
        )
        .unwrap();

        let config = SimConfig::from_toml_file(file.path()).unwrap();
        assert_eq!(config.end, 0.05);
        assert_eq!(config.iterations(), 5);
        assert_eq!(config.metric, MetricKind::Betweenness);
        assert_eq!(
            config.attack_types,
            BTreeSet::from([AttackType::Targeted, AttackType::RandomPath])
        );
        assert_eq!(config.seed, Some(13));
    }

    #[test]
    fn test_invalid_toml_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "step = -0.5").unwrap();
        assert!(matches!(
            SimConfig::from_toml_file(file.path()),
            Err(ConfigError::InvalidStep(_))
        ));
    }

    #[test]
    fn test_full_run_records_every_step() {
        let graph = GraphBuilder::new(1000).ring();
        let config = config(0.1, 0.01);

        for attack in AttackType::ALL {
            let attacker = Attacker::with_seed(&graph, 10, None, 1).unwrap();
            let mut sim = Simulation::new(attacker, attack, &config);
            sim.run().unwrap();

            assert_eq!(sim.state(), SimState::Done);
            assert_eq!(sim.curve().len(), config.iterations() + 1);
            assert_eq!(sim.attacker().network().node_count(), 900);

            let keys: Vec<&str> = sim.curve().iter().map(|(k, _)| k).collect();
            assert_eq!(keys.first(), Some(&"0.000"));
            assert_eq!(keys.last(), Some(&"0.100"));
            assert!(keys.windows(2).all(|w| w[0] < w[1]), "{attack}: {keys:?}");
        }
    }

    #[test]
    fn test_baseline_is_pristine() {
        let graph = GraphBuilder::new(20).full_mesh();
        let attacker = Attacker::with_seed(&graph, 1, None, 2).unwrap();
        let mut sim = Simulation::new(attacker, AttackType::Random, &config(0.1, 0.05));

        sim.initialize().unwrap();
        assert_eq!(sim.state(), SimState::Stepping(1));
        assert_eq!(sim.curve().get("0.000"), Some(&Measurement::new(1, 20)));

        // A second initialize is a no-op
        sim.initialize().unwrap();
        assert_eq!(sim.curve().len(), 1);
    }

    #[test]
    fn test_state_transitions() {
        let graph = GraphBuilder::new(10).line();
        let attacker = Attacker::with_seed(&graph, 1, None, 3).unwrap();
        let mut sim = Simulation::new(attacker, AttackType::Targeted, &config(0.2, 0.1));

        assert_eq!(sim.state(), SimState::Initialized);
        assert_eq!(sim.step().unwrap(), SimState::Stepping(1));
        assert_eq!(sim.step().unwrap(), SimState::Stepping(2));
        assert_eq!(sim.step().unwrap(), SimState::Done);
        assert_eq!(sim.step().unwrap(), SimState::Done);
        assert_eq!(sim.curve().len(), 3);
    }

    #[test]
    fn test_failure_keeps_partial_results() {
        // Five nodes, two per step: the third step over-removes
        let graph = from_edges(&[(1, 2), (2, 3), (3, 4), (4, 5)]);
        let attacker = Attacker::with_seed(&graph, 2, None, 4).unwrap();
        let mut sim = Simulation::new(attacker, AttackType::Random, &config(0.5, 0.1));

        let err = sim.run().unwrap_err();
        assert!(matches!(
            err,
            SimError::Attack(AttackError::Exhausted {
                requested: 2,
                remaining: 1
            })
        ));
        assert_eq!(sim.state(), SimState::Aborted);
        assert_eq!(sim.curve().len(), 3);
        assert_eq!(sim.curve().last().map(|(k, _)| k), Some("0.200"));

        // Aborted runs stay aborted
        assert_eq!(sim.step().unwrap(), SimState::Aborted);
        assert_eq!(sim.into_curve().len(), 3);
    }

    #[test]
    fn test_targeted_run_on_path_graph() {
        let graph = from_edges(&[(1, 2), (2, 3), (3, 4), (4, 5)]);
        let attacker = Attacker::new(&graph, 1, None).unwrap();
        let mut sim = Simulation::new(attacker, AttackType::Targeted, &config(0.2, 0.2));
        sim.run().unwrap();

        assert_eq!(sim.curve().get("0.000"), Some(&Measurement::new(1, 5)));
        let after = sim.curve().get("0.200").unwrap();
        assert_eq!(after.components, 2);
        assert!(after.giant <= 3);
        assert!(!sim.attacker().network().contains(NodeId(2)));
    }

    #[test]
    fn test_zero_iterations() {
        let graph: Graph = GraphBuilder::new(3).ring();
        let attacker = Attacker::with_seed(&graph, 1, None, 5).unwrap();
        let mut sim = Simulation::new(attacker, AttackType::Random, &config(0.1, 0.5));
        sim.run().unwrap();

        assert_eq!(sim.state(), SimState::Done);
        assert_eq!(sim.curve().len(), 1);
    }
}
