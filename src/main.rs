//! question-memory — runs the question-answering memory scenario.
//!
//! Two colour/shape pairs are bound and stored during the first half
//! second; afterwards the memory is probed with one role every 0.1 s and
//! the decoded answer is logged.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use hrr_memory::config;
use hrr_memory::kernels::convolution::ConvolutionBackend;
use hrr_memory::runtime::driver::{Simulation, SimulationConfig};
use hrr_memory::runtime::scheduler::Channel;
use tracing_subscriber::EnvFilter;

/// Question answering with a recirculating holographic memory.
#[derive(Parser, Debug)]
#[command(
    name = "question-memory",
    about = "Bind colour/shape pairs into a leaky memory and query them by role",
    version
)]
struct Cli {
    /// Symbol vector dimensionality.
    #[arg(short, long, default_value_t = config::DIMENSION)]
    dimension: usize,

    /// Dimensions per memory sub-population.
    #[arg(long, default_value_t = config::BLOCK_SIZE)]
    block_size: usize,

    /// Neurons per memory sub-population.
    #[arg(short = 'n', long, default_value_t = config::POPULATION)]
    population: usize,

    /// Vocabulary seed.
    #[arg(short, long, default_value_t = config::SEED)]
    seed: u64,

    /// Maximum cosine similarity between symbols.
    #[arg(long, default_value_t = config::MAX_SIMILARITY)]
    max_similarity: f64,

    /// Memory feedback time constant (seconds).
    #[arg(long, default_value_t = config::PSTC)]
    pstc: f64,

    /// Tick interval (seconds).
    #[arg(long, default_value_t = config::DT)]
    dt: f64,

    /// Simulated duration (seconds).
    #[arg(short = 't', long, default_value_t = 1.0)]
    duration: f64,

    /// Convolution kernel: direct, parallel or fft. Chosen by dimension if omitted.
    #[arg(long)]
    backend: Option<ConvolutionBackend>,

    /// Trace memory statistics every N ticks (0 disables).
    #[arg(long, default_value_t = 100)]
    report_every: u64,

    /// Write the final memory state to this file.
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Log level used when RUST_LOG is unset.
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log_level))
        .context("invalid log level")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!("question-memory v{}", env!("CARGO_PKG_VERSION"));

    let sim_config = SimulationConfig {
        dimension: cli.dimension,
        block_size: cli.block_size,
        population: cli.population,
        seed: cli.seed,
        max_similarity: cli.max_similarity,
        pstc: cli.pstc,
        dt: cli.dt,
        backend: cli.backend,
        report_every: cli.report_every,
    };

    let mut sim = Simulation::new(sim_config).context("failed to build simulation")?;

    let start = std::time::Instant::now();
    let mut active_probe: Option<String> = None;
    let mut last_answer = String::new();

    while sim.time() < cli.duration {
        let t = sim.time();
        let probe = sim
            .scheduler()
            .timeline()
            .symbol_at(Channel::E, t)
            .map(str::to_string);

        if probe != active_probe {
            if let Some(role) = active_probe.take() {
                tracing::info!(t, role = %role, answer = %last_answer, "probe answered");
            }
            active_probe = probe;
        }

        sim.tick();
        if active_probe.is_some() {
            last_answer = sim.vocabulary().text(sim.ports().f.view(), 0.1);
        }
    }
    if let Some(role) = active_probe {
        tracing::info!(t = sim.time(), role = %role, answer = %last_answer, "probe answered");
    }

    tracing::info!(
        "Simulated {:.3} s in {} ticks ({:.1} ms wall), memory norm {:.4}",
        sim.time(),
        sim.ticks(),
        start.elapsed().as_secs_f64() * 1000.0,
        sim.memory().norm(),
    );

    if let Some(path) = cli.snapshot {
        sim.save_snapshot(&path)?;
        tracing::info!("Memory snapshot written to {}", path.display());
    }

    Ok(())
}
