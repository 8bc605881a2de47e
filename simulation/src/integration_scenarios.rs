//! Integration scenarios testing the full Fracture stack
//!
//! These scenarios run the pieces together:
//! - fracture-core graphs, metrics and measurement
//! - reader (timestamped gzip edge lists on disk)
//! - runner (parallel fan-out over attack types)
//! - result store persistence

use std::fs::File;
use std::io::Write;
use std::path::Path;

use flate2::Compression;
use flate2::write::GzEncoder;
use rand::SeedableRng;
use rand::rngs::StdRng;

use fracture_core::{Graph, Measurement, MetricKind, Network, NodeId, from_edges};

use crate::attacker::Attacker;
use crate::reader::{DEFAULT_FILENAME_FORMAT, TopologySource};
use crate::runner::Runner;
use crate::simulation::{SimConfig, SimState, Simulation};
use crate::topology::GraphBuilder;
use crate::types::{AttackType, ResultStore};

/// Write a graph as a CAIDA-style `a|b|relation` gzip dump
fn write_dump(path: &Path, graph: &Graph) {
    let mut encoder = GzEncoder::new(File::create(path).unwrap(), Compression::fast());
    writeln!(encoder, "# synthetic AS relationships").unwrap();
    for node in graph.nodes() {
        for neighbor in graph.neighbors(node).unwrap() {
            if node < neighbor {
                writeln!(encoder, "{node}|{neighbor}|-1").unwrap();
            }
        }
    }
    encoder.finish().unwrap();
}

fn scale_free(nodes: usize, seed: u64) -> Graph {
    GraphBuilder::new(nodes).scale_free_with(2, &mut StdRng::seed_from_u64(seed))
}

/// Directory of dumps -> runner -> JSON file -> store
#[test]
fn test_directory_to_json() {
    let dir = tempfile::tempdir().unwrap();
    let months = [("201601", 600), ("201602", 700), ("201603", 800)];
    for (i, (month, nodes)) in months.iter().enumerate() {
        let graph = scale_free(*nodes, i as u64);
        write_dump(&dir.path().join(format!("{month}.relationship.gz")), &graph);
    }

    let config = SimConfig {
        end: 0.05,
        step: 0.005,
        ..SimConfig::default()
    };
    let runner = Runner::new(config).unwrap();
    let source = TopologySource::open(dir.path(), DEFAULT_FILENAME_FORMAT).unwrap();
    let store = runner.run_source(source);

    let output = dir.path().join("robustness.json");
    store.save(&output).unwrap();
    let loaded = ResultStore::load(&output).unwrap();
    assert_eq!(loaded, store);

    for attack in AttackType::ALL {
        assert_eq!(
            loaded.timestamps(attack),
            vec!["2016-01", "2016-02", "2016-03"]
        );
        let curve = loaded.get(attack, "2016-02").unwrap();
        assert_eq!(curve.len(), 11);
        assert_eq!(curve.get("0.000"), Some(&Measurement::new(1, 700)));
        assert!(curve.get("0.050").is_some());
    }
}

/// Hubs hold scale-free graphs together: removing them first does far more
/// damage than removing nodes at random
#[test]
fn test_targeted_beats_random_on_scale_free() {
    let graph = scale_free(2000, 42);
    let config = SimConfig {
        end: 0.05,
        step: 0.01,
        attack_types: [AttackType::Random, AttackType::Targeted].into(),
        ..SimConfig::default()
    };
    let runner = Runner::new(config).unwrap();

    let reports = runner.run_snapshot(&graph, 20, 0);
    let giant = |attack: AttackType| {
        let report = reports.iter().find(|r| r.attack == attack).unwrap();
        report.curve.last().unwrap().1.giant
    };

    assert!(giant(AttackType::Targeted) < giant(AttackType::Random));
}

/// The five-node path graph under a degree-targeted attack
#[test]
fn test_path_graph_walkthrough() {
    let graph = from_edges(&[(1, 2), (2, 3), (3, 4), (4, 5)]);
    let config = SimConfig {
        end: 0.4,
        step: 0.2,
        ..SimConfig::default()
    };

    let attacker = Attacker::new(&graph, 1, None).unwrap();
    let mut sim = Simulation::new(attacker, AttackType::Targeted, &config);
    sim.run().unwrap();

    assert_eq!(sim.state(), SimState::Done);
    assert_eq!(sim.curve().get("0.000"), Some(&Measurement::new(1, 5)));
    assert_eq!(sim.curve().get("0.200"), Some(&Measurement::new(2, 3)));
    // {1} and {3, 4, 5}: node 4 is now the unique degree-2 node
    assert_eq!(sim.curve().get("0.400"), Some(&Measurement::new(3, 1)));
    assert_eq!(sim.attacker().removed(), &[NodeId(2), NodeId(4)]);
}

/// Path attacks on a line stay contiguous until they hit an end
#[test]
fn test_path_attack_on_line() {
    let graph = GraphBuilder::new(100).line();
    let mut attacker = Attacker::with_seed(&graph, 10, None, 17).unwrap();
    attacker.random_path(None).unwrap();

    let m = fracture_core::measure(attacker.network()).unwrap();
    // Each restart can cut the line once more; at most ten pieces remain
    assert!(m.components >= 1 && m.components <= 10);
    assert_eq!(attacker.network().node_count(), 90);
}

/// Alternative metrics flow from the config to every run
#[test]
fn test_eigenvector_targeting() {
    // Two stars joined hub to hub; the hubs dominate eigenvector centrality
    let mut edges = vec![(0, 100)];
    for leaf in 1..=10 {
        edges.push((0, leaf));
        edges.push((100, 100 + leaf));
    }
    let graph = from_edges(&edges);

    let config = SimConfig {
        end: 0.2,
        step: 0.1,
        attack_types: [AttackType::Targeted].into(),
        metric: MetricKind::Eigenvector,
        ..SimConfig::default()
    };
    let runner = Runner::new(config).unwrap();
    let reports = runner.run_snapshot(&graph, 1, 0);

    // Losing one hub strands its ten leaves
    let after = reports[0].curve.get("0.100").unwrap();
    assert_eq!(after.components, 11);
    assert_eq!(after.giant, 11);
}

/// Over-removal ends each run on its own, keeping the partial curves
#[test]
fn test_failures_are_per_run() {
    let config = SimConfig {
        end: 1.0,
        step: 0.3,
        ..SimConfig::default()
    };
    let runner = Runner::new(config).unwrap();
    let graph = GraphBuilder::new(10).ring();

    // Three steps of four nodes would need twelve
    let reports = runner.run_snapshot(&graph, 4, 0);
    assert_eq!(reports.len(), 4);
    for report in reports {
        assert!(!report.is_complete());
        assert_eq!(report.curve.len(), 3);
    }
}
