//! Circular convolution kernels and backend dispatch.
//!
//! Three interchangeable implementations of the same operation:
//! - **Direct**: scalar O(D²) summation, the reference
//! - **Parallel**: O(D²) summation with output indices spread over rayon
//! - **Fft**: O(D log D) via the discrete Fourier transform (rustfft)

pub mod convolution;
