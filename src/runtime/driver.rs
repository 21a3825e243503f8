//! Fixed-step driver: stimulus in, decoded answer out.
//!
//! Each tick at simulated time `t = ticks · dt`:
//! 1. read channels A, B, E from the stimulus scheduler
//! 2. bind A ⊛ B
//! 3. integrate the bound pair into the recirculating memory
//! 4. unbind the new memory state by E, producing channel F
//!
//! The four vectors are published on ports "A", "B", "E" and "F".

use std::path::Path;

use anyhow::{bail, Context};
use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};

use crate::config;
use crate::core::vocabulary::{SymbolMatch, Vocabulary};
use crate::error::{ConfigError, HrrError};
use crate::kernels::convolution::ConvolutionBackend;
use crate::memory::binder::Binder;
use crate::memory::recirculating::RecirculatingMemory;
use crate::runtime::scheduler::{Channel, StimulusScheduler, Timeline};

/// Simulation configuration. Read once at construction.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Symbol vector dimensionality.
    pub dimension: usize,

    /// Dimensions per memory sub-population.
    pub block_size: usize,

    /// Neurons per memory sub-population, for the spiking substrate.
    pub population: usize,

    /// Vocabulary seed.
    pub seed: u64,

    /// Maximum cosine similarity between distinct symbols.
    pub max_similarity: f64,

    /// Memory feedback time constant (seconds).
    pub pstc: f64,

    /// Tick interval (seconds).
    pub dt: f64,

    /// Convolution kernel; `None` picks by dimension.
    pub backend: Option<ConvolutionBackend>,

    /// Emit a progress trace every this many ticks (0 disables).
    pub report_every: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            dimension: config::DIMENSION,
            block_size: config::BLOCK_SIZE,
            population: config::POPULATION,
            seed: config::SEED,
            max_similarity: config::MAX_SIMILARITY,
            pstc: config::PSTC,
            dt: config::DT,
            backend: None,
            report_every: 100,
        }
    }
}

impl SimulationConfig {
    /// Check every field that has a domain restriction.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dimension < 1 {
            return Err(ConfigError::InvalidDimension(self.dimension));
        }
        if self.block_size == 0 || self.dimension % self.block_size != 0 {
            return Err(ConfigError::InvalidBlockSize {
                dimension: self.dimension,
                block_size: self.block_size,
            });
        }
        if self.population == 0 {
            return Err(ConfigError::InvalidPopulation(self.population));
        }
        if !(0.0..=1.0).contains(&self.max_similarity) {
            return Err(ConfigError::InvalidMaxSimilarity(self.max_similarity));
        }
        if !self.pstc.is_finite() || self.pstc <= 0.0 {
            return Err(ConfigError::InvalidPstc(self.pstc));
        }
        if !self.dt.is_finite() || self.dt <= 0.0 || self.dt > self.pstc {
            return Err(ConfigError::InvalidTimestep {
                dt: self.dt,
                pstc: self.pstc,
            });
        }
        Ok(())
    }

    /// Backend actually used for this configuration.
    pub fn resolved_backend(&self) -> ConvolutionBackend {
        self.backend
            .unwrap_or_else(|| ConvolutionBackend::auto(self.dimension))
    }
}

/// Output ports, refreshed every tick.
#[derive(Clone, Debug, PartialEq)]
pub struct Ports {
    /// Stimulus channel A (pass-through).
    pub a: Array1<f64>,
    /// Stimulus channel B (pass-through).
    pub b: Array1<f64>,
    /// Query role E (pass-through).
    pub e: Array1<f64>,
    /// Decoded answer: memory unbound by E.
    pub f: Array1<f64>,
}

impl Ports {
    fn zeros(dimension: usize) -> Self {
        Self {
            a: Array1::zeros(dimension),
            b: Array1::zeros(dimension),
            e: Array1::zeros(dimension),
            f: Array1::zeros(dimension),
        }
    }

    /// Port by name: "A", "B", "E" or "F".
    pub fn get(&self, name: &str) -> Option<ArrayView1<'_, f64>> {
        match name {
            "A" => Some(self.a.view()),
            "B" => Some(self.b.view()),
            "E" => Some(self.e.view()),
            "F" => Some(self.f.view()),
            _ => None,
        }
    }
}

/// Outcome of a multi-tick run.
#[derive(Clone, Debug)]
pub struct RunSummary {
    /// Ticks executed by this call.
    pub ticks: u64,

    /// Simulated time after the run.
    pub final_time: f64,

    /// Wall-clock duration.
    pub elapsed_ms: f64,

    /// Memory norm after the run.
    pub memory_norm: f64,
}

/// The whole question-answering loop.
pub struct Simulation {
    config: SimulationConfig,
    vocabulary: Vocabulary,
    binder: Binder,
    scheduler: StimulusScheduler,
    memory: RecirculatingMemory,
    ports: Ports,
    ticks: u64,
}

impl Simulation {
    /// Build the reference scenario.
    pub fn new(config: SimulationConfig) -> Result<Self, HrrError> {
        Self::with_timeline(config, Timeline::question_answering())
    }

    /// Build with a custom stimulus timeline.
    ///
    /// The scenario symbols are parsed first, in their fixed order, so that
    /// the same seed always yields the same vectors; any further symbols the
    /// timeline mentions are parsed after them.
    pub fn with_timeline(config: SimulationConfig, timeline: Timeline) -> Result<Self, HrrError> {
        config.validate()?;

        let mut vocabulary = Vocabulary::new(config.dimension, config.max_similarity, config.seed)?;
        for name in config::SCENARIO_SYMBOLS {
            vocabulary.parse(name)?;
        }
        let scheduler = StimulusScheduler::new(timeline, &mut vocabulary)?;
        let binder = Binder::new(config.dimension, config.resolved_backend())?;
        let memory = RecirculatingMemory::new(config.dimension, config.block_size, config.pstc)?;

        tracing::info!(
            dimension = config.dimension,
            blocks = config.dimension / config.block_size,
            population = config.population,
            seed = config.seed,
            backend = %binder.backend(),
            symbols = vocabulary.len(),
            "simulation ready"
        );

        Ok(Self {
            ports: Ports::zeros(config.dimension),
            config,
            vocabulary,
            binder,
            scheduler,
            memory,
            ticks: 0,
        })
    }

    /// Simulated time of the next tick.
    pub fn time(&self) -> f64 {
        self.ticks as f64 * self.config.dt
    }

    /// Advance one tick and return the refreshed ports.
    pub fn tick(&mut self) -> &Ports {
        let t = self.time();

        let a = self.scheduler.emit(Channel::A, t);
        let b = self.scheduler.emit(Channel::B, t);
        let e = self.scheduler.emit(Channel::E, t);

        let bound = self.binder.bind(a.view(), b.view());
        self.memory.advance(bound.view(), self.config.dt);
        let f = self.memory.query(&self.binder, e.view());

        self.ports = Ports {
            a: a.to_array(),
            b: b.to_array(),
            e: e.to_array(),
            f,
        };
        self.ticks += 1;

        if self.config.report_every > 0 && self.ticks % self.config.report_every == 0 {
            self.trace_progress(t);
        }

        &self.ports
    }

    fn trace_progress(&self, t: f64) {
        let radius = config::block_radius(self.config.dimension);
        tracing::debug!(
            t,
            memory_norm = self.memory.norm(),
            saturated_blocks = self.memory.saturated_blocks(radius),
            answer = %self.vocabulary.text(self.ports.f.view(), 0.1),
            "tick"
        );
        if !self.memory.is_healthy() {
            tracing::warn!(t, "memory state is no longer finite");
        }
    }

    /// Tick until simulated time reaches `t_end`.
    pub fn run_until(&mut self, t_end: f64) -> RunSummary {
        let start = std::time::Instant::now();
        let first = self.ticks;
        while self.time() < t_end {
            self.tick();
        }
        self.summary(first, start)
    }

    /// Run exactly `n` ticks.
    pub fn run_ticks(&mut self, n: u64) -> RunSummary {
        let start = std::time::Instant::now();
        let first = self.ticks;
        for _ in 0..n {
            self.tick();
        }
        self.summary(first, start)
    }

    fn summary(&self, first: u64, start: std::time::Instant) -> RunSummary {
        RunSummary {
            ticks: self.ticks - first,
            final_time: self.time(),
            elapsed_ms: start.elapsed().as_secs_f64() * 1000.0,
            memory_norm: self.memory.norm(),
        }
    }

    /// Best `k` vocabulary matches for port F.
    pub fn decode_f(&self, k: usize) -> Vec<SymbolMatch> {
        self.vocabulary.cleanup(self.ports.f.view(), k)
    }

    /// Port by name.
    pub fn port(&self, name: &str) -> Option<ArrayView1<'_, f64>> {
        self.ports.get(name)
    }

    pub fn ports(&self) -> &Ports {
        &self.ports
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn binder(&self) -> &Binder {
        &self.binder
    }

    pub fn scheduler(&self) -> &StimulusScheduler {
        &self.scheduler
    }

    pub fn memory(&self) -> &RecirculatingMemory {
        &self.memory
    }

    /// Restart from `t = 0` with an empty memory. The vocabulary is kept.
    pub fn reset(&mut self) {
        self.memory.reset();
        self.ports = Ports::zeros(self.config.dimension);
        self.ticks = 0;
    }

    /// Write the memory state to `path`.
    pub fn save_snapshot(&self, path: &Path) -> anyhow::Result<()> {
        let bytes = self.memory.to_bytes()?;
        std::fs::write(path, bytes)
            .with_context(|| format!("failed to write memory snapshot {}", path.display()))?;
        Ok(())
    }

    /// Replace the memory state with one read from `path`.
    ///
    /// The snapshot must match this simulation's dimension, block size and
    /// `pstc`; otherwise the memory is left untouched.
    pub fn load_memory_snapshot(&mut self, path: &Path) -> anyhow::Result<()> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("failed to read memory snapshot {}", path.display()))?;
        let memory = RecirculatingMemory::from_bytes(&bytes)
            .with_context(|| format!("invalid memory snapshot {}", path.display()))?;
        if memory.dimension() != self.config.dimension {
            bail!(
                "snapshot dimension {} does not match simulation dimension {}",
                memory.dimension(),
                self.config.dimension
            );
        }
        if memory.block_size() != self.config.block_size {
            bail!(
                "snapshot block size {} does not match simulation block size {}",
                memory.block_size(),
                self.config.block_size
            );
        }
        if memory.pstc() != self.config.pstc {
            bail!(
                "snapshot pstc {} does not match simulation pstc {}",
                memory.pstc(),
                self.config.pstc
            );
        }
        self.memory = memory;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn wide_config() -> SimulationConfig {
        SimulationConfig {
            dimension: 512,
            block_size: 16,
            max_similarity: 0.2,
            report_every: 0,
            ..Default::default()
        }
    }

    #[test]
    fn test_config_default() {
        let config = SimulationConfig::default();
        assert_eq!(config.dimension, 16);
        assert_eq!(config.block_size, 4);
        assert_eq!(config.population, 100);
        assert_eq!(config.seed, 7);
        assert!(config.validate().is_ok());
        assert_eq!(config.resolved_backend(), ConvolutionBackend::Direct);
    }

    #[test]
    fn test_config_validation() {
        let bad = |f: fn(&mut SimulationConfig)| {
            let mut c = SimulationConfig::default();
            f(&mut c);
            c.validate().unwrap_err()
        };
        assert_eq!(bad(|c| c.dimension = 0), ConfigError::InvalidDimension(0));
        assert!(matches!(
            bad(|c| c.block_size = 3),
            ConfigError::InvalidBlockSize { .. }
        ));
        assert_eq!(bad(|c| c.population = 0), ConfigError::InvalidPopulation(0));
        assert!(matches!(
            bad(|c| c.max_similarity = 2.0),
            ConfigError::InvalidMaxSimilarity(_)
        ));
        assert!(matches!(bad(|c| c.pstc = -1.0), ConfigError::InvalidPstc(_)));
        assert!(matches!(
            bad(|c| c.dt = 0.0),
            ConfigError::InvalidTimestep { .. }
        ));
        assert!(matches!(
            bad(|c| c.dt = 1.0),
            ConfigError::InvalidTimestep { .. }
        ));
    }

    #[test]
    fn test_new_surfaces_config_error() {
        let config = SimulationConfig {
            pstc: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            Simulation::new(config),
            Err(HrrError::Config(ConfigError::InvalidPstc(_)))
        ));
    }

    #[test]
    fn test_first_tick_is_silent() {
        let mut sim = Simulation::new(SimulationConfig::default()).unwrap();
        let ports = sim.tick().clone();
        assert_eq!(ports, Ports::zeros(16));
        assert_eq!(sim.ticks(), 1);
        assert!((sim.time() - 0.001).abs() < 1e-15);
    }

    #[test]
    fn test_ports_pass_through_stimulus() {
        let mut sim = Simulation::new(SimulationConfig::default()).unwrap();
        sim.run_until(0.1);
        let red = sim.vocabulary().get("RED").unwrap().to_array();
        let circle = sim.vocabulary().get("CIRCLE").unwrap().to_array();
        assert_eq!(sim.port("A").unwrap(), red.view());
        assert_eq!(sim.port("B").unwrap(), circle.view());
        assert_eq!(sim.port("E").unwrap(), Array1::<f64>::zeros(16).view());
        assert!(sim.port("X").is_none());
    }

    #[test]
    fn test_f_is_zero_when_probe_silent() {
        let mut sim = Simulation::new(SimulationConfig::default()).unwrap();
        sim.run_until(0.95); // last tick at t = 0.949, between probe windows
        assert!(sim.memory().norm() > 0.0);
        assert!(sim.port("F").unwrap().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_memory_integrates_then_decays() {
        let mut sim = Simulation::new(SimulationConfig::default()).unwrap();
        sim.run_until(0.5);
        let at_half = sim.memory().norm();
        assert!(at_half > 0.1, "norm at 0.5 = {}", at_half);
        sim.run_until(1.0);
        let later = sim.memory().norm();
        // no input after 0.5: pure decay by exp(-0.5 / 0.4)
        let expected = at_half * (-0.5f64 / 0.4).exp();
        assert!((later - expected).abs() / expected < 0.01, "{} vs {}", later, expected);
        assert!(sim.memory().is_healthy());
    }

    #[test]
    fn test_answers_each_probe() {
        let mut sim = Simulation::new(wide_config()).unwrap();
        // (probe time, expected filler)
        let probes = [
            (0.55, "RED"),    // what colour was the circle?
            (0.65, "CIRCLE"), // what shape was red?
            (0.75, "BLUE"),   // what colour was the square?
            (0.85, "SQUARE"), // what shape was blue?
        ];
        for (t, expected) in probes {
            sim.run_until(t);
            let best = sim.decode_f(1);
            assert_eq!(best[0].name, expected, "at t={} got {:?}", t, sim.decode_f(4));
        }
    }

    #[test]
    fn test_reproducible_runs() {
        let mut a = Simulation::new(wide_config()).unwrap();
        let mut b = Simulation::new(wide_config()).unwrap();
        a.run_ticks(700);
        b.run_ticks(700);
        assert_eq!(a.ports(), b.ports());
        assert_eq!(a.memory().state(), b.memory().state());
    }

    #[test]
    fn test_backends_give_same_trajectory() {
        let mut direct = Simulation::new(SimulationConfig {
            backend: Some(ConvolutionBackend::Direct),
            ..wide_config()
        })
        .unwrap();
        let mut fft = Simulation::new(SimulationConfig {
            backend: Some(ConvolutionBackend::Fft),
            ..wide_config()
        })
        .unwrap();
        direct.run_ticks(300);
        fft.run_ticks(300);
        for (x, y) in direct.memory().state().iter().zip(fft.memory().state().iter()) {
            assert!((x - y).abs() < 1e-9);
        }
    }

    #[test]
    fn test_reset() {
        let mut sim = Simulation::new(SimulationConfig::default()).unwrap();
        sim.run_ticks(50);
        sim.reset();
        assert_eq!(sim.ticks(), 0);
        assert_eq!(sim.memory().norm(), 0.0);
        assert_eq!(sim.ports(), &Ports::zeros(16));
        assert_eq!(sim.vocabulary().len(), 4);
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("memory.bin");

        let mut sim = Simulation::new(SimulationConfig::default()).unwrap();
        sim.run_until(0.5);
        sim.save_snapshot(&path).unwrap();

        let mut fresh = Simulation::new(SimulationConfig::default()).unwrap();
        fresh.load_memory_snapshot(&path).unwrap();
        assert_eq!(fresh.memory().state(), sim.memory().state());
    }

    #[test]
    fn test_snapshot_dimension_mismatch() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("memory.bin");

        let sim = Simulation::new(SimulationConfig::default()).unwrap();
        sim.save_snapshot(&path).unwrap();

        let mut wide = Simulation::new(wide_config()).unwrap();
        let err = wide.load_memory_snapshot(&path).unwrap_err();
        assert!(err.to_string().contains("does not match"));
    }

    #[test]
    fn test_snapshot_with_foreign_pstc_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fast.bin");

        // dt = 0.001 > pstc would make the recurrence overshoot
        let mut fast = RecirculatingMemory::new(16, 4, 0.0004).unwrap();
        fast.advance(Array1::from_elem(16, 0.25).view(), 0.0004);
        std::fs::write(&path, fast.to_bytes().unwrap()).unwrap();

        let mut sim = Simulation::new(SimulationConfig::default()).unwrap();
        sim.run_until(0.1);
        let before = sim.memory().state().to_owned();

        let err = sim.load_memory_snapshot(&path).unwrap_err();
        assert!(err.to_string().contains("pstc"), "{}", err);
        assert_eq!(sim.memory().pstc(), 0.4);
        assert_eq!(sim.memory().state(), before.view());

        sim.run_until(0.3);
        assert!(sim.memory().is_healthy());
        assert!(sim.memory().norm() < 10.0);
    }

    #[test]
    fn test_snapshot_with_foreign_block_size_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("blocks.bin");
        let other = RecirculatingMemory::new(16, 8, 0.4).unwrap();
        std::fs::write(&path, other.to_bytes().unwrap()).unwrap();

        let mut sim = Simulation::new(SimulationConfig::default()).unwrap();
        let err = sim.load_memory_snapshot(&path).unwrap_err();
        assert!(err.to_string().contains("block size"), "{}", err);
        assert_eq!(sim.memory().block_size(), 4);
    }

    #[test]
    fn test_missing_snapshot_errors() {
        let dir = tempdir().unwrap();
        let mut sim = Simulation::new(SimulationConfig::default()).unwrap();
        let err = sim
            .load_memory_snapshot(&dir.path().join("absent.bin"))
            .unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }
}
