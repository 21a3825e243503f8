//! Dense real-valued symbol vectors.
//!
//! A [`SymbolVector`] is a unit-norm `f64` vector of fixed dimension `D`.
//! Its storage is reference-counted and never mutated after construction, so
//! the vocabulary, scheduler and driver can all hold the same vector.
//! Transient results (bound vectors, memory state) are plain `Array1<f64>`.

use std::fmt;
use std::sync::Arc;

use ndarray::{Array1, ArrayView1};
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};

/// An immutable, shared symbol vector.
#[derive(Clone)]
pub struct SymbolVector {
    data: Arc<[f64]>,
}

impl SymbolVector {
    /// Wrap an already-prepared array. Callers are responsible for the norm.
    pub(crate) fn from_array(values: Array1<f64>) -> Self {
        Self {
            data: values.to_vec().into(),
        }
    }

    /// The zero vector, used when a channel is inactive.
    pub fn zeros(dimension: usize) -> Self {
        Self::from_array(Array1::zeros(dimension))
    }

    /// The unit impulse `[1, 0, ..., 0]`, identity of circular convolution.
    pub fn impulse(dimension: usize) -> Self {
        Self::from_array(impulse(dimension))
    }

    /// Number of components.
    pub fn dimension(&self) -> usize {
        self.data.len()
    }

    /// Borrow as an ndarray view.
    pub fn view(&self) -> ArrayView1<'_, f64> {
        ArrayView1::from(&self.data[..])
    }

    /// Borrow the raw components.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Owned copy of the components.
    pub fn to_array(&self) -> Array1<f64> {
        Array1::from_vec(self.data.to_vec())
    }

    /// L2 norm.
    pub fn norm(&self) -> f64 {
        norm(self.view())
    }

    /// Dot product with any vector of the same dimension.
    pub fn dot(&self, other: ArrayView1<'_, f64>) -> f64 {
        self.view().dot(&other)
    }

    /// Cosine similarity with another symbol.
    pub fn similarity(&self, other: &SymbolVector) -> f64 {
        cosine_similarity(self.view(), other.view())
    }

    /// True if both handles share the same storage.
    pub fn ptr_eq(&self, other: &SymbolVector) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }
}

impl fmt::Debug for SymbolVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SymbolVector(dim={}, norm={:.6})",
            self.dimension(),
            self.norm()
        )
    }
}

impl PartialEq for SymbolVector {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

/// L2 norm of a view.
pub fn norm(v: ArrayView1<'_, f64>) -> f64 {
    v.dot(&v).sqrt()
}

/// Cosine similarity. Returns 0 when either operand has zero norm.
pub fn cosine_similarity(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    let na = norm(a);
    let nb = norm(b);
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    a.dot(&b) / (na * nb)
}

/// Scale to unit norm. `None` for a zero (or non-finite) vector.
pub fn normalize(v: Array1<f64>) -> Option<Array1<f64>> {
    let n = norm(v.view());
    if n == 0.0 || !n.is_finite() {
        return None;
    }
    Some(v / n)
}

/// Unit impulse of the given length.
pub fn impulse(dimension: usize) -> Array1<f64> {
    let mut v = Array1::zeros(dimension);
    if dimension > 0 {
        v[0] = 1.0;
    }
    v
}

/// True if `v` is exactly `[1, 0, ..., 0]`.
pub fn is_impulse(v: ArrayView1<'_, f64>) -> bool {
    !v.is_empty() && v[0] == 1.0 && v.iter().skip(1).all(|&x| x == 0.0)
}

/// Involution: `out[0] = v[0]`, `out[k] = v[D - k]`.
///
/// Convolving with the involution of `y` is circular correlation with `y`.
pub fn involution(v: ArrayView1<'_, f64>) -> Array1<f64> {
    let d = v.len();
    Array1::from_shape_fn(d, |k| if k == 0 { v[0] } else { v[d - k] })
}

/// Draw a vector uniformly from the unit hypersphere in `R^dimension`.
///
/// Components are i.i.d. standard normal, then normalised. The degenerate
/// all-zero draw is retried.
pub fn random_unit<R: Rng + ?Sized>(dimension: usize, rng: &mut R) -> Array1<f64> {
    loop {
        let raw = Array1::from_shape_fn(dimension, |_| {
            let x: f64 = StandardNormal.sample(&mut *rng);
            x
        });
        if let Some(unit) = normalize(raw) {
            return unit;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_random_unit_norm() {
        let mut rng = StdRng::seed_from_u64(1);
        for d in [1, 2, 16, 512] {
            let v = random_unit(d, &mut rng);
            assert!((norm(v.view()) - 1.0).abs() < 1e-12, "d={}", d);
        }
    }

    #[test]
    fn test_involution_indices() {
        let v = Array1::from_vec(vec![0.0, 1.0, 2.0, 3.0]);
        let inv = involution(v.view());
        assert_eq!(inv.to_vec(), vec![0.0, 3.0, 2.0, 1.0]);
        // involution is its own inverse
        assert_eq!(involution(inv.view()), v);
    }

    #[test]
    fn test_cosine_zero_vector() {
        let z = Array1::<f64>::zeros(4);
        let v = Array1::from_vec(vec![1.0, 0.0, 0.0, 0.0]);
        assert_eq!(cosine_similarity(z.view(), v.view()), 0.0);
    }

    #[test]
    fn test_normalize_rejects_zero() {
        assert!(normalize(Array1::zeros(3)).is_none());
        let n = normalize(Array1::from_vec(vec![3.0, 4.0])).unwrap();
        assert!((n[0] - 0.6).abs() < 1e-12);
        assert!((n[1] - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_symbol_vector_sharing() {
        let a = SymbolVector::impulse(8);
        let b = a.clone();
        assert!(a.ptr_eq(&b));
        assert_eq!(a, SymbolVector::impulse(8));
        assert!(!a.ptr_eq(&SymbolVector::impulse(8)));
        assert_eq!(a.dimension(), 8);
        assert!((a.norm() - 1.0).abs() < 1e-15);
    }

    #[test]
    fn test_is_impulse() {
        assert!(is_impulse(impulse(1).view()));
        assert!(is_impulse(impulse(64).view()));
        assert!(!is_impulse(Array1::<f64>::zeros(4).view()));
        assert!(!is_impulse(Array1::from_vec(vec![1.0, 0.0, 1e-300]).view()));
        assert!(!is_impulse(Array1::<f64>::zeros(0).view()));
    }

    #[test]
    fn test_zeros() {
        let z = SymbolVector::zeros(5);
        assert_eq!(z.norm(), 0.0);
        assert_eq!(z.as_slice(), &[0.0; 5]);
    }
}
