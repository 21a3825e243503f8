//! Circular convolution: `z[k] = Σ_i x[i] · y[(k - i) mod D]`.
//!
//! The direct kernels are the reference. The FFT kernel computes the same
//! thing as `IDFT(DFT(x) ⊙ DFT(y))` and agrees with them to within
//! floating-point round-off.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use rayon::prelude::*;
use rustfft::num_complex::Complex64;
use rustfft::{Fft, FftPlanner};
use serde::{Deserialize, Serialize};

use crate::config::FFT_THRESHOLD;

/// Which kernel computes a convolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConvolutionBackend {
    Direct,
    Parallel,
    Fft,
}

impl ConvolutionBackend {
    /// Pick a backend for a dimension: direct summation below
    /// [`FFT_THRESHOLD`], FFT at or above it.
    pub fn auto(dimension: usize) -> Self {
        if dimension >= FFT_THRESHOLD {
            ConvolutionBackend::Fft
        } else {
            ConvolutionBackend::Direct
        }
    }
}

impl fmt::Display for ConvolutionBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConvolutionBackend::Direct => write!(f, "direct"),
            ConvolutionBackend::Parallel => write!(f, "parallel"),
            ConvolutionBackend::Fft => write!(f, "fft"),
        }
    }
}

impl FromStr for ConvolutionBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "direct" => Ok(ConvolutionBackend::Direct),
            "parallel" => Ok(ConvolutionBackend::Parallel),
            "fft" => Ok(ConvolutionBackend::Fft),
            other => Err(format!(
                "unknown convolution backend '{}' (expected direct, parallel or fft)",
                other
            )),
        }
    }
}

// ──────────────────────────────────────────────────────────────
// 1. Direct summation (reference)
// ──────────────────────────────────────────────────────────────

/// Scalar O(D²) circular convolution.
pub fn circular_convolve_direct(x: &[f64], y: &[f64]) -> Vec<f64> {
    assert_eq!(x.len(), y.len(), "convolution operands differ in length");
    let d = x.len();

    let mut out = vec![0.0f64; d];
    for (k, z) in out.iter_mut().enumerate() {
        *z = convolve_at(x, y, k);
    }
    out
}

/// Output index `k` of the circular convolution.
#[inline]
fn convolve_at(x: &[f64], y: &[f64], k: usize) -> f64 {
    let d = x.len();
    let mut acc = 0.0f64;
    for (i, &xi) in x.iter().enumerate() {
        acc += xi * y[(k + d - i) % d];
    }
    acc
}

// ──────────────────────────────────────────────────────────────
// 2. Parallel direct summation
// ──────────────────────────────────────────────────────────────

/// O(D²) circular convolution with output indices distributed across threads.
pub fn circular_convolve_parallel(x: &[f64], y: &[f64]) -> Vec<f64> {
    assert_eq!(x.len(), y.len(), "convolution operands differ in length");

    (0..x.len())
        .into_par_iter()
        .map(|k| convolve_at(x, y, k))
        .collect()
}

// ──────────────────────────────────────────────────────────────
// 3. FFT
// ──────────────────────────────────────────────────────────────

/// Cached forward/inverse length-D transforms.
#[derive(Clone)]
pub struct FftConvolver {
    dimension: usize,
    forward: Arc<dyn Fft<f64>>,
    inverse: Arc<dyn Fft<f64>>,
}

impl fmt::Debug for FftConvolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FftConvolver")
            .field("dimension", &self.dimension)
            .finish_non_exhaustive()
    }
}

impl FftConvolver {
    /// Plan both transforms for vectors of length `dimension`.
    pub fn new(dimension: usize) -> Self {
        let mut planner = FftPlanner::new();
        Self {
            dimension,
            forward: planner.plan_fft_forward(dimension),
            inverse: planner.plan_fft_inverse(dimension),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// DFT of a real vector.
    pub fn spectrum(&self, x: &[f64]) -> Vec<Complex64> {
        assert_eq!(x.len(), self.dimension, "spectrum input has wrong length");
        let mut buf: Vec<Complex64> = x.iter().map(|&r| Complex64::new(r, 0.0)).collect();
        self.forward.process(&mut buf);
        buf
    }

    /// Inverse DFT, normalised by `1/D`, keeping the real part.
    fn real_inverse(&self, mut buf: Vec<Complex64>) -> Vec<f64> {
        self.inverse.process(&mut buf);
        let scale = 1.0 / self.dimension as f64;
        buf.iter().map(|c| c.re * scale).collect()
    }

    /// O(D log D) circular convolution.
    pub fn convolve(&self, x: &[f64], y: &[f64]) -> Vec<f64> {
        assert_eq!(x.len(), y.len(), "convolution operands differ in length");
        let mut fx = self.spectrum(x);
        let fy = self.spectrum(y);
        for (a, b) in fx.iter_mut().zip(fy.iter()) {
            *a *= *b;
        }
        self.real_inverse(fx)
    }

    /// Project onto the unitary vectors: every DFT coefficient scaled to
    /// magnitude 1. Zero-magnitude coefficients become 1.
    ///
    /// Unbinding with a unitary vector is exact.
    pub fn make_unitary(&self, x: &[f64]) -> Vec<f64> {
        let spec = self
            .spectrum(x)
            .into_iter()
            .map(|c| {
                let mag = c.norm();
                if mag > 0.0 {
                    c / mag
                } else {
                    Complex64::new(1.0, 0.0)
                }
            })
            .collect();
        self.real_inverse(spec)
    }
}

// ──────────────────────────────────────────────────────────────
// Dispatch
// ──────────────────────────────────────────────────────────────

/// Route a convolution to the requested kernel.
pub fn dispatch_convolve(
    x: &[f64],
    y: &[f64],
    backend: ConvolutionBackend,
    fft: &FftConvolver,
) -> Vec<f64> {
    match backend {
        ConvolutionBackend::Direct => circular_convolve_direct(x, y),
        ConvolutionBackend::Parallel => circular_convolve_parallel(x, y),
        ConvolutionBackend::Fft => fft.convolve(x, y),
    }
}
