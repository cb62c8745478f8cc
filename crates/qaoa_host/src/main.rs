mod driver;
mod generator;
mod stats;
mod throughput;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use driver::RunConfig;
use qaoa_core::graph::AdjacencyMatrix;
use qaoa_io::{loader, parser};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(about = "MaxCut QAOA cost layers on a sharded state vector")]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Worker threads in the rayon pool (default: one per core).
    #[arg(short, long, global = true)]
    threads: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a random weighted graph and optionally a random state.
    Gen {
        #[arg(long, default_value = "graph.col")]
        out: String,
        #[arg(long)]
        state_out: Option<String>,
        #[arg(long, default_value_t = 12)]
        vertices: usize,
        #[arg(long, default_value_t = 0.5)]
        density: f64,
        #[arg(long, default_value_t = 1)]
        max_weight: u32,
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
    /// Apply cost layers and report expectation values and the histogram.
    Run {
        #[arg(short, long)]
        graph: String,
        /// Raw little-endian f64 (re, im) pairs; defaults to |+>^n.
        #[arg(short, long)]
        state: Option<String>,
        #[arg(long, value_delimiter = ',', default_value = "0.5")]
        gammas: Vec<f64>,
        #[arg(short, long, default_value_t = 1)]
        ranks: usize,
        #[arg(long)]
        single: bool,
        #[arg(long)]
        table: bool,
        #[arg(long)]
        json: bool,
    },
    /// Time each kernel stage.
    Bench {
        #[arg(short, long)]
        graph: String,
        #[arg(short, long, default_value_t = 1)]
        ranks: usize,
        #[arg(long, default_value_t = 10)]
        repeat: usize,
        #[arg(long, default_value_t = 0.5)]
        gamma: f64,
        #[arg(long)]
        single: bool,
        #[arg(long)]
        table: bool,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn load_graph(path: &str) -> Result<AdjacencyMatrix> {
    let graph = parser::load_graph_file(path)?;
    info!(
        path,
        vertices = graph.num_vertices(),
        total_weight = graph.num_edges(),
        "graph loaded"
    );
    Ok(graph)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("Failed to configure the rayon pool")?;
    }

    match cli.command {
        Commands::Gen {
            out,
            state_out,
            vertices,
            density,
            max_weight,
            seed,
        } => {
            generator::generate_instance(
                &out,
                state_out.as_deref(),
                vertices,
                density,
                max_weight,
                seed,
            )?;
        }
        Commands::Run {
            graph,
            state,
            gammas,
            ranks,
            single,
            table,
            json,
        } => {
            let graph = load_graph(&graph)?;
            let initial = match state {
                Some(path) => {
                    let num_qubits = u32::try_from(graph.num_vertices())?;
                    Some(loader::load_amplitudes(&path, num_qubits)?)
                }
                None => None,
            };
            let config = RunConfig {
                ranks,
                tabulate: table,
            };
            let report = if single {
                driver::run_layers::<f32>(&graph, initial.as_deref(), &gammas, config)?
            } else {
                driver::run_layers::<f64>(&graph, initial.as_deref(), &gammas, config)?
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                report.print();
            }
        }
        Commands::Bench {
            graph,
            ranks,
            repeat,
            gamma,
            single,
            table,
        } => {
            let graph = load_graph(&graph)?;
            if single {
                throughput::print_benchmark::<f32>(&graph, ranks, repeat, gamma, table)?;
            } else {
                throughput::print_benchmark::<f64>(&graph, ranks, repeat, gamma, table)?;
            }
        }
    }
    Ok(())
}
