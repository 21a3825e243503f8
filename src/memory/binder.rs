//! Binder — role/filler composition by circular convolution.
//!
//! - **bind**: `z = x ⊛ y`
//! - **unbind**: `x' = z ⊛ involution(y)` (circular correlation)
//!
//! `unbind` is exact only when `y` is unitary; for a random unit `y` the
//! recovered filler carries noise that shrinks as `D` grows. That loss is a
//! property of the algebra and is never reported as an error.

use ndarray::{Array1, ArrayView1};

use crate::core::vector::{involution, is_impulse};
use crate::error::ConfigError;
use crate::kernels::convolution::{dispatch_convolve, ConvolutionBackend, FftConvolver};

/// Fixed-dimension bind/unbind engine.
#[derive(Clone, Debug)]
pub struct Binder {
    dimension: usize,
    backend: ConvolutionBackend,
    fft: FftConvolver,
}

impl Binder {
    /// Create a binder for `dimension`-length vectors.
    pub fn new(dimension: usize, backend: ConvolutionBackend) -> Result<Self, ConfigError> {
        if dimension < 1 {
            return Err(ConfigError::InvalidDimension(dimension));
        }
        Ok(Self {
            dimension,
            backend,
            fft: FftConvolver::new(dimension),
        })
    }

    /// Binder with [`ConvolutionBackend::auto`] for the dimension.
    pub fn with_auto_backend(dimension: usize) -> Result<Self, ConfigError> {
        Self::new(dimension, ConvolutionBackend::auto(dimension))
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn backend(&self) -> ConvolutionBackend {
        self.backend
    }

    /// Same binder, different kernel.
    pub fn with_backend(mut self, backend: ConvolutionBackend) -> Self {
        self.backend = backend;
        self
    }

    /// Circular convolution of `x` and `y`.
    ///
    /// Binding with the unit impulse returns the other operand unchanged on
    /// every backend.
    ///
    /// # Panics
    /// Panics if either operand's length differs from the binder dimension.
    pub fn bind(&self, x: ArrayView1<'_, f64>, y: ArrayView1<'_, f64>) -> Array1<f64> {
        assert_eq!(x.len(), self.dimension, "bind: left operand dimension");
        assert_eq!(y.len(), self.dimension, "bind: right operand dimension");
        if is_impulse(y) {
            return x.to_owned();
        }
        if is_impulse(x) {
            return y.to_owned();
        }
        let xs = x.to_vec();
        let ys = y.to_vec();
        Array1::from_vec(dispatch_convolve(&xs, &ys, self.backend, &self.fft))
    }

    /// Approximate inverse of [`bind`](Self::bind): recover the filler bound
    /// to role `y` inside `z`.
    pub fn unbind(&self, z: ArrayView1<'_, f64>, y: ArrayView1<'_, f64>) -> Array1<f64> {
        let y_inv = involution(y);
        self.bind(z, y_inv.view())
    }

    /// Unitary projection of `v` (see [`FftConvolver::make_unitary`]).
    pub fn make_unitary(&self, v: ArrayView1<'_, f64>) -> Array1<f64> {
        assert_eq!(v.len(), self.dimension, "make_unitary: dimension");
        Array1::from_vec(self.fft.make_unitary(&v.to_vec()))
    }
}
