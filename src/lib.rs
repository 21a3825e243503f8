//! # hrr-memory
//!
//! Holographic reduced representations for a question-answering memory.
//!
//! Symbols are random unit vectors in `R^D`. Role/filler pairs are composed
//! by circular convolution and recovered by circular correlation. A leaky
//! recirculating memory integrates whatever pairs are presented over
//! simulated time, and a probe channel queries it by unbinding a role.
//!
//! ## Components
//!
//! 1. **Vocabulary** — seeded, similarity-bounded symbol vectors
//! 2. **Binder** — bind / unbind over direct, parallel or FFT kernels
//! 3. **Recirculating Memory** — first-order low-pass self-loop
//! 4. **Stimulus Scheduler** — pure `t -> vector` timeline per channel
//! 5. **Driver** — fixed-`dt` tick loop exposing ports A, B, E, F

pub mod core;
pub mod error;
pub mod kernels;
pub mod memory;
pub mod runtime;

pub use crate::core::vector::SymbolVector;
pub use crate::core::vocabulary::{Vocabulary, VocabularyOptions};
pub use crate::error::{ConfigError, HrrError};
pub use crate::kernels::convolution::ConvolutionBackend;
pub use crate::memory::binder::Binder;
pub use crate::memory::recirculating::RecirculatingMemory;
pub use crate::runtime::driver::{Simulation, SimulationConfig};
pub use crate::runtime::scheduler::{Channel, StimulusScheduler, Timeline};

/// Reference-scenario constants.
pub mod config {
    /// Symbol vector dimensionality.
    pub const DIMENSION: usize = 16;

    /// Sub-binding block size (dimensions per memory sub-population).
    pub const BLOCK_SIZE: usize = 4;

    /// Neurons per memory sub-population.
    pub const POPULATION: usize = 100;

    /// Vocabulary seed.
    pub const SEED: u64 = 7;

    /// Maximum cosine similarity between two distinct symbols.
    pub const MAX_SIMILARITY: f64 = 0.1;

    /// Recurrent post-synaptic time constant (seconds).
    pub const PSTC: f64 = 0.4;

    /// Simulation tick (seconds).
    pub const DT: f64 = 0.001;

    /// Rejected draws tolerated before a vocabulary gives up.
    pub const MAX_DRAWS: usize = 1000;

    /// Dimension at or above which `ConvolutionBackend::auto` picks the FFT path.
    pub const FFT_THRESHOLD: usize = 64;

    /// Symbols of the reference scenario, in vocabulary parse order.
    pub const SCENARIO_SYMBOLS: [&str; 4] = ["CIRCLE", "BLUE", "RED", "SQUARE"];

    /// Encoding window length (seconds): pairs are presented during `(0, 0.5)`.
    pub const ENCODE_PERIOD: f64 = 0.5;

    /// Probe cycle length (seconds).
    pub const PROBE_PERIOD: f64 = 0.5;

    /// Returns the memory sub-population radius for a dimension: `1/sqrt(D)`.
    pub fn block_radius(dimension: usize) -> f64 {
        1.0 / (dimension as f64).sqrt()
    }
}
