//! Pre-defined simulation scenarios
//!
//! Includes the five-node path graph walk-through and synthetic runs that
//! compare how different topologies fall apart under each attack type.

use std::fmt::Write;

use tracing::info;

use fracture_core::{Graph, Network, from_edges, measure};

use crate::attacker::Attacker;
use crate::error::SimError;
use crate::reader::Snapshot;
use crate::runner::Runner;
use crate::simulation::{SimConfig, Simulation};
use crate::types::{AttackType, ResultStore, RobustnessCurve};

/// Label used for synthetic snapshots in the result store
pub const SYNTHETIC_LABEL: &str = "synthetic";

/// Targeted attack on the path graph 1-2-3-4-5, one node per step
///
/// ```text
/// 1 - 2 - 3 - 4 - 5
/// ```
///
/// Nodes 2, 3 and 4 all have degree 2; the tie goes to node 2, which splits
/// the path into {1} and {3, 4, 5}.
pub fn run_path_graph_scenario() -> Result<RobustnessCurve, SimError> {
    info!("=== Running path graph scenario ===");

    let graph = from_edges(&[(1, 2), (2, 3), (3, 4), (4, 5)]);
    println!("{}", graph.visualize());

    let config = SimConfig {
        end: 0.6,
        step: 0.2,
        ..SimConfig::default()
    };
    let attacker = Attacker::new(&graph, 1, None)?;
    let mut sim = Simulation::new(attacker, AttackType::Targeted, &config);
    sim.run()?;

    for (key, m) in sim.curve().iter() {
        println!("  {key}: {m}");
    }
    println!("  Removed: {:?}", sim.attacker().removed());

    Ok(sim.into_curve())
}

/// Run every configured attack type against one synthetic graph
pub fn run_synthetic(graph: Graph, config: SimConfig) -> Result<ResultStore, SimError> {
    let baseline = measure(&graph)?;
    info!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        %baseline,
        "Running synthetic scenario"
    );

    let runner = Runner::new(config)?;
    let snapshot = Snapshot::new(graph, chrono::NaiveDate::MIN, SYNTHETIC_LABEL);
    Ok(runner.run_source([snapshot]))
}

/// Render every stored curve as an aligned table
pub fn render_curves(store: &ResultStore) -> String {
    let mut out = String::new();
    for attack in store.attack_types() {
        for timestamp in store.timestamps(attack) {
            let _ = writeln!(out, "== {attack} @ {timestamp} ==");
            let Some(curve) = store.get(attack, timestamp) else {
                let _ = writeln!(out, "  (no data)");
                continue;
            };
            let _ = writeln!(out, "  {:>9} {:>10} {:>8}", "removed", "components", "giant");
            for (key, m) in curve.iter() {
                let _ = writeln!(out, "  {:>9} {:>10} {:>8}", key, m.components, m.giant);
            }
        }
    }
    out
}

/// Giant-component size at the end of each attack's curve
pub fn final_giants(store: &ResultStore, timestamp: &str) -> Vec<(AttackType, Option<usize>)> {
    store
        .attack_types()
        .map(|attack| {
            let giant = store
                .get(attack, timestamp)
                .and_then(RobustnessCurve::last)
                .map(|(_, m)| m.giant);
            (attack, giant)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::GraphBuilder;

    #[test]
    fn test_path_graph_scenario() {
        let curve = run_path_graph_scenario().unwrap();
        assert_eq!(curve.len(), 4);
        assert_eq!(curve.get("0.200").unwrap().components, 2);
        assert_eq!(curve.get("0.200").unwrap().giant, 3);
    }

    #[test]
    fn test_synthetic_store() {
        let config = SimConfig {
            end: 0.05,
            step: 0.01,
            ..SimConfig::default()
        };
        let store = run_synthetic(GraphBuilder::new(300).ring(), config).unwrap();

        for (attack, giant) in final_giants(&store, SYNTHETIC_LABEL) {
            assert!(giant.is_some(), "{attack} has no curve");
        }

        let table = render_curves(&store);
        assert!(table.contains("== targeted_path @ synthetic =="));
        assert!(table.contains("0.050"));
    }

    #[test]
    fn test_synthetic_rejects_bad_config() {
        let config = SimConfig {
            end: 0.0,
            ..SimConfig::default()
        };
        assert!(matches!(
            run_synthetic(GraphBuilder::new(10).ring(), config),
            Err(SimError::Config(_))
        ));
    }
}
