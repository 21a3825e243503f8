//! Recirculating memory — a leaky self-connected accumulator.
//!
//! The memory population feeds back onto itself through a synapse with time
//! constant `pstc`. In discrete time that loop is the first-order low-pass
//! recurrence
//!
//! `s' = s + (dt / pstc) · (u - s)`
//!
//! where `u` is the bound input presented this tick. Pairs presented during
//! non-overlapping windows are superposed in `s` with exponentially decaying
//! weights.

use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, HrrError};
use crate::memory::binder::Binder;

/// One tick of the low-pass recurrence. Pure.
///
/// With `u` held constant and `s₀ = 0`, after `n` ticks
/// `sₙ = u · (1 - (1 - dt/pstc)ⁿ)`.
pub fn step(
    current: ArrayView1<'_, f64>,
    bound_input: ArrayView1<'_, f64>,
    pstc: f64,
    dt: f64,
) -> Array1<f64> {
    debug_assert_eq!(current.len(), bound_input.len());
    let alpha = dt / pstc;
    &current + &((&bound_input - &current) * alpha)
}

/// Accumulator state of the recirculating memory.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecirculatingMemory {
    /// Accumulated vector, initially zero.
    state: Array1<f64>,

    /// Feedback time constant (seconds).
    pstc: f64,

    /// Dimensions per sub-population.
    block_size: usize,

    /// Ticks applied since construction or the last reset.
    ticks: u64,
}

impl RecirculatingMemory {
    /// Zero-initialised memory of `dimension` components split into
    /// `dimension / block_size` sub-populations.
    pub fn new(dimension: usize, block_size: usize, pstc: f64) -> Result<Self, ConfigError> {
        validate(dimension, block_size, pstc)?;
        Ok(Self {
            state: Array1::zeros(dimension),
            pstc,
            block_size,
            ticks: 0,
        })
    }

    /// Integrate one tick of bound input.
    pub fn advance(&mut self, bound_input: ArrayView1<'_, f64>, dt: f64) {
        assert_eq!(
            bound_input.len(),
            self.state.len(),
            "memory input dimension mismatch"
        );
        self.state = step(self.state.view(), bound_input, self.pstc, dt);
        self.ticks += 1;
    }

    /// Approximate filler bound to `role` in the current state.
    pub fn query(&self, binder: &Binder, role: ArrayView1<'_, f64>) -> Array1<f64> {
        binder.unbind(self.state.view(), role)
    }

    pub fn state(&self) -> ArrayView1<'_, f64> {
        self.state.view()
    }

    pub fn dimension(&self) -> usize {
        self.state.len()
    }

    pub fn pstc(&self) -> f64 {
        self.pstc
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Sub-population views, `block_size` components each.
    pub fn blocks(&self) -> impl Iterator<Item = ArrayView1<'_, f64>> + '_ {
        self.state.exact_chunks(self.block_size).into_iter()
    }

    /// L2 norm of each sub-population.
    pub fn block_norms(&self) -> Vec<f64> {
        self.blocks().map(|b| b.dot(&b).sqrt()).collect()
    }

    /// Number of sub-populations whose norm exceeds `radius`.
    pub fn saturated_blocks(&self, radius: f64) -> usize {
        self.block_norms().into_iter().filter(|&n| n > radius).count()
    }

    /// L2 norm of the whole state.
    pub fn norm(&self) -> f64 {
        self.state.dot(&self.state).sqrt()
    }

    /// True if no component has diverged to NaN or Inf.
    pub fn is_healthy(&self) -> bool {
        self.state.iter().all(|v| v.is_finite())
    }

    /// Back to zero.
    pub fn reset(&mut self) {
        self.state.fill(0.0);
        self.ticks = 0;
    }

    /// Serialise state for persistence.
    pub fn to_bytes(&self) -> Result<Vec<u8>, HrrError> {
        Ok(bincode::serialize(self)?)
    }

    /// Deserialise state, re-checking the configuration invariants.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, HrrError> {
        let memory: Self = bincode::deserialize(bytes)?;
        validate(memory.state.len(), memory.block_size, memory.pstc)?;
        Ok(memory)
    }
}

fn validate(dimension: usize, block_size: usize, pstc: f64) -> Result<(), ConfigError> {
    if dimension < 1 {
        return Err(ConfigError::InvalidDimension(dimension));
    }
    if block_size == 0 || dimension % block_size != 0 {
        return Err(ConfigError::InvalidBlockSize {
            dimension,
            block_size,
        });
    }
    if !pstc.is_finite() || pstc <= 0.0 {
        return Err(ConfigError::InvalidPstc(pstc));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernels::convolution::ConvolutionBackend;

    #[test]
    fn test_step_formula() {
        let s = Array1::from_vec(vec![0.0, 1.0]);
        let u = Array1::from_vec(vec![1.0, -1.0]);
        let next = step(s.view(), u.view(), 0.4, 0.1);
        // 0 + 0.25 * (1 - 0) = 0.25 ; 1 + 0.25 * (-1 - 1) = 0.5
        assert!((next[0] - 0.25).abs() < 1e-12);
        assert!((next[1] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_decay_law_matches_closed_form() {
        let pstc = 0.4;
        let dt = 0.001;
        let alpha: f64 = dt / pstc;
        let u = Array1::from_vec(vec![0.5, -0.25, 1.0, 0.0]);
        let mut mem = RecirculatingMemory::new(4, 2, pstc).unwrap();

        let mut previous_gap = f64::INFINITY;
        for n in 1..=5000 {
            mem.advance(u.view(), dt);
            let factor = 1.0 - (1.0 - alpha).powi(n);
            for (s, target) in mem.state().iter().zip(u.iter()) {
                assert!((s - target * factor).abs() < 1e-9, "n={}", n);
            }
            // continuous-time solution 1 - exp(-t/pstc) within O(dt/pstc)
            let continuous = 1.0 - (-(n as f64) * dt / pstc).exp();
            assert!((factor - continuous).abs() < alpha);

            let gap = (&u - &mem.state()).mapv(f64::abs).sum();
            assert!(gap <= previous_gap, "not monotone at n={}", n);
            previous_gap = gap;
        }
        assert!(previous_gap < 1e-4);
        assert_eq!(mem.ticks(), 5000);
    }

    #[test]
    fn test_rejects_bad_config() {
        assert_eq!(
            RecirculatingMemory::new(16, 5, 0.4).unwrap_err(),
            ConfigError::InvalidBlockSize {
                dimension: 16,
                block_size: 5
            }
        );
        assert_eq!(
            RecirculatingMemory::new(16, 0, 0.4).unwrap_err(),
            ConfigError::InvalidBlockSize {
                dimension: 16,
                block_size: 0
            }
        );
        assert!(matches!(
            RecirculatingMemory::new(16, 4, 0.0),
            Err(ConfigError::InvalidPstc(_))
        ));
        assert!(matches!(
            RecirculatingMemory::new(16, 4, f64::NAN),
            Err(ConfigError::InvalidPstc(_))
        ));
        assert_eq!(
            RecirculatingMemory::new(0, 1, 0.4).unwrap_err(),
            ConfigError::InvalidDimension(0)
        );
    }

    #[test]
    fn test_blocks_partition_state() {
        let mut mem = RecirculatingMemory::new(16, 4, 0.4).unwrap();
        let u = Array1::from_shape_fn(16, |i| i as f64);
        mem.advance(u.view(), 0.4); // dt == pstc copies the input
        let blocks: Vec<_> = mem.blocks().collect();
        assert_eq!(blocks.len(), 4);
        assert_eq!(blocks[1].to_vec(), vec![4.0, 5.0, 6.0, 7.0]);
        assert_eq!(mem.block_norms().len(), 4);
        // block norms: 3.74, 11.2, 19.1, 27.1
        assert_eq!(mem.saturated_blocks(5.0), 3);
    }

    #[test]
    fn test_query_single_pair() {
        let binder = Binder::new(4, ConvolutionBackend::Direct).unwrap();
        let mut mem = RecirculatingMemory::new(4, 2, 0.1).unwrap();
        let role = Array1::from_vec(vec![1.0, 0.0, 0.0, 0.0]);
        let filler = Array1::from_vec(vec![0.0, 1.0, 0.0, 0.0]);
        let bound = binder.bind(role.view(), filler.view());
        mem.advance(bound.view(), 0.1);
        let out = mem.query(&binder, role.view());
        assert_eq!(out, filler);
    }

    #[test]
    fn test_reset_and_health() {
        let mut mem = RecirculatingMemory::new(4, 4, 0.4).unwrap();
        mem.advance(Array1::ones(4).view(), 0.01);
        assert!(mem.norm() > 0.0);
        assert!(mem.is_healthy());
        mem.reset();
        assert_eq!(mem.norm(), 0.0);
        assert_eq!(mem.ticks(), 0);

        mem.advance(Array1::from_elem(4, f64::NAN).view(), 0.01);
        assert!(!mem.is_healthy());
    }

    #[test]
    fn test_serialisation_roundtrip() {
        let mut mem = RecirculatingMemory::new(8, 2, 0.4).unwrap();
        mem.advance(Array1::from_elem(8, 0.3).view(), 0.001);
        let bytes = mem.to_bytes().unwrap();
        let restored = RecirculatingMemory::from_bytes(&bytes).unwrap();
        assert_eq!(restored.ticks(), 1);
        assert_eq!(restored.block_size(), 2);
        assert_eq!(restored.state(), mem.state());
    }

    #[test]
    fn test_from_bytes_rejects_garbage() {
        assert!(RecirculatingMemory::from_bytes(&[1, 2, 3]).is_err());
    }
}
