//! Fracture - network robustness under adversarial node removal
//!
//! Runs the four attack types against timestamped topology dumps or
//! synthetic graphs and records how connectivity degrades.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::info;

use fracture_logging::{FractureSubscriberBuilder, LogConfig, WorkerGuard};
use fracture_simulation::{
    AttackType, ConfigError, DEFAULT_FILENAME_FORMAT, DEFAULT_LABEL_FORMAT, Graph, GraphBuilder,
    MetricKind, Runner, SimConfig, TopologySource, scenarios,
};

#[derive(Parser)]
#[command(
    name = "fracture",
    about = "Network robustness under adversarial node removal",
    version
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Console log format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    /// Also write JSONL logs to this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Attack every topology snapshot in a directory
    Run {
        /// Directory searched recursively for snapshot files
        input_dir: PathBuf,

        /// Where to write the JSON results
        output: PathBuf,

        /// strftime format of snapshot file names
        #[arg(short, long, default_value = DEFAULT_FILENAME_FORMAT)]
        format: String,

        /// strftime format of the timestamps in the results
        #[arg(long, default_value = DEFAULT_LABEL_FORMAT)]
        label_format: String,

        #[command(flatten)]
        sim: SimArgs,
    },

    /// Attack a synthetic topology and print the curves
    Synthetic {
        /// Type of topology
        #[arg(short, long, value_enum, default_value_t = TopologyKind::ScaleFree)]
        topology: TopologyKind,

        /// Number of nodes
        #[arg(short, long, default_value = "2000")]
        nodes: usize,

        /// Connection probability for random topology
        #[arg(short, long, default_value = "0.002")]
        connection_prob: f64,

        /// Edges added per node for scale-free topology
        #[arg(long, default_value = "2")]
        edges_per_node: usize,

        /// Also write the JSON results here
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        sim: SimArgs,
    },

    /// Run the five-node path graph scenario
    PathGraph,
}

/// Simulation settings; flags override the config file, which overrides defaults
#[derive(Args)]
struct SimArgs {
    /// TOML file with simulation settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Lower bound of the removal range; runs cover end - start
    #[arg(long)]
    start: Option<f64>,

    /// Fraction removed when runs end
    #[arg(long)]
    end: Option<f64>,

    /// Fraction removed per step
    #[arg(long)]
    step: Option<f64>,

    /// Attack type to run; repeat for several (default: all)
    #[arg(short, long = "attack")]
    attacks: Vec<AttackType>,

    /// Metric ranking targets
    #[arg(short, long)]
    metric: Option<MetricKind>,

    /// Base random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Use fresh entropy instead of a seed
    #[arg(long, conflicts_with = "seed")]
    unseeded: bool,
}

impl SimArgs {
    fn resolve(&self) -> Result<SimConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => SimConfig::from_toml_file(path)?,
            None => SimConfig::default(),
        };

        if let Some(start) = self.start {
            config.start = start;
        }
        if let Some(end) = self.end {
            config.end = end;
        }
        if let Some(step) = self.step {
            config.step = step;
        }
        if !self.attacks.is_empty() {
            config.attack_types = self.attacks.iter().copied().collect();
        }
        if let Some(metric) = self.metric {
            config.metric = metric;
        }
        if self.unseeded {
            config.seed = None;
        } else if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }

        config.validate()?;
        Ok(config)
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Pretty,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum TopologyKind {
    Ring,
    Full,
    Random,
    Line,
    Star,
    ScaleFree,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = init_logging(&cli)?;

    match cli.command {
        Commands::Run {
            input_dir,
            output,
            format,
            label_format,
            sim,
        } => {
            let runner = Runner::new(sim.resolve()?)?;
            let source = TopologySource::open(&input_dir, &format)
                .with_context(|| format!("Failed to open {}", input_dir.display()))?
                .with_label_format(label_format)?;

            let store = runner.run_source(source);
            store
                .save(&output)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            info!(path = %output.display(), "Results written");
        }
        Commands::Synthetic {
            topology,
            nodes,
            connection_prob,
            edges_per_node,
            output,
            sim,
        } => {
            let config = sim.resolve()?;
            let mut rng = match config.seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_rng(&mut rand::rng()),
            };

            let builder = GraphBuilder::new(nodes);
            let graph: Graph = match topology {
                TopologyKind::Ring => builder.ring(),
                TopologyKind::Full => builder.full_mesh(),
                TopologyKind::Random => builder.random_with(connection_prob, &mut rng),
                TopologyKind::Line => builder.line(),
                TopologyKind::Star => builder.star(),
                TopologyKind::ScaleFree => builder.scale_free_with(edges_per_node, &mut rng),
            };

            let store = scenarios::run_synthetic(graph, config)?;
            print!("{}", scenarios::render_curves(&store));

            for (attack, giant) in scenarios::final_giants(&store, scenarios::SYNTHETIC_LABEL) {
                match giant {
                    Some(giant) => println!("{attack}: giant component {giant} of {nodes}"),
                    None => println!("{attack}: no data"),
                }
            }

            if let Some(output) = output {
                store.save(&output)?;
                info!(path = %output.display(), "Results written");
            }
        }
        Commands::PathGraph => {
            scenarios::run_path_graph_scenario()?;
        }
    }

    Ok(())
}

fn init_logging(cli: &Cli) -> anyhow::Result<Option<WorkerGuard>> {
    let config = match &cli.log_dir {
        Some(dir) => LogConfig::batch(dir.clone()),
        None => LogConfig::default(),
    };
    let level = if cli.verbose { "debug" } else { "info" };

    let guard = FractureSubscriberBuilder::new()
        .with_config(config)
        .with_level(level)
        .with_pretty_console(matches!(cli.log_format, LogFormat::Pretty))
        .try_init()?;
    Ok(guard)
}
