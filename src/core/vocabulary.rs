//! Vocabulary — maps symbol names to near-orthogonal unit vectors.
//!
//! Vectors are created lazily on the first [`Vocabulary::parse`] of a name by
//! rejection sampling: a candidate drawn uniformly from the unit hypersphere
//! is accepted only if its cosine similarity with every existing entry is at
//! most `max_similarity`. Each vocabulary owns its seeded RNG, so the same
//! seed and the same sequence of `parse` calls reproduce the same vectors
//! bit for bit, and any number of vocabularies can coexist.

use std::collections::HashMap;

use ndarray::{Array1, ArrayView1};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config;
use crate::core::vector::{normalize, random_unit, SymbolVector};
use crate::error::{ConfigError, HrrError, Result};
use crate::kernels::convolution::FftConvolver;

/// Construction parameters for a [`Vocabulary`].
#[derive(Clone, Debug)]
pub struct VocabularyOptions {
    /// Vector dimensionality `D`.
    pub dimension: usize,

    /// Upper bound on pairwise cosine similarity, in `[0, 1]`.
    pub max_similarity: f64,

    /// RNG seed.
    pub seed: u64,

    /// Candidate draws per symbol before giving up.
    pub max_draws: usize,

    /// Project every generated vector onto the unitary vectors, making
    /// unbinding by that symbol exact.
    pub unitary: bool,
}

impl Default for VocabularyOptions {
    fn default() -> Self {
        Self {
            dimension: config::DIMENSION,
            max_similarity: config::MAX_SIMILARITY,
            seed: config::SEED,
            max_draws: config::MAX_DRAWS,
            unitary: false,
        }
    }
}

/// One scored vocabulary entry.
#[derive(Clone, Debug, PartialEq)]
pub struct SymbolMatch {
    pub name: String,
    /// Dot product between the probe and the symbol.
    pub score: f64,
}

/// A growing set of named, similarity-bounded symbol vectors.
pub struct Vocabulary {
    dimension: usize,
    max_similarity: f64,
    max_draws: usize,
    seed: u64,

    /// Names in insertion order.
    names: Vec<String>,
    vectors: HashMap<String, SymbolVector>,

    rng: StdRng,

    /// Present only for unitary vocabularies.
    unitary: Option<FftConvolver>,
}

impl Vocabulary {
    /// Empty vocabulary with the default draw cap and non-unitary vectors.
    pub fn new(
        dimension: usize,
        max_similarity: f64,
        seed: u64,
    ) -> std::result::Result<Self, ConfigError> {
        Self::with_options(VocabularyOptions {
            dimension,
            max_similarity,
            seed,
            ..Default::default()
        })
    }

    /// Empty vocabulary from explicit options.
    pub fn with_options(
        opts: VocabularyOptions,
    ) -> std::result::Result<Self, ConfigError> {
        if opts.dimension < 1 {
            return Err(ConfigError::InvalidDimension(opts.dimension));
        }
        if !(0.0..=1.0).contains(&opts.max_similarity) {
            return Err(ConfigError::InvalidMaxSimilarity(opts.max_similarity));
        }
        if opts.max_draws == 0 {
            return Err(ConfigError::InvalidMaxDraws);
        }
        Ok(Self {
            dimension: opts.dimension,
            max_similarity: opts.max_similarity,
            max_draws: opts.max_draws,
            seed: opts.seed,
            names: Vec::new(),
            vectors: HashMap::new(),
            rng: StdRng::seed_from_u64(opts.seed),
            unitary: opts.unitary.then(|| FftConvolver::new(opts.dimension)),
        })
    }

    /// Vector for `name`, generating and inserting it on first use.
    ///
    /// # Errors
    ///
    /// [`HrrError::VocabularyExhausted`] if `max_draws` candidates in a row
    /// violate the similarity bound. Nothing is inserted in that case.
    pub fn parse(&mut self, name: &str) -> Result<SymbolVector> {
        if let Some(v) = self.vectors.get(name) {
            return Ok(v.clone());
        }

        for attempt in 1..=self.max_draws {
            let candidate = self.draw();
            if self.admissible(candidate.view()) {
                tracing::debug!(symbol = name, attempt, "accepted symbol vector");
                return Ok(self.insert(name, candidate));
            }
        }

        tracing::warn!(
            symbol = name,
            draws = self.max_draws,
            existing = self.len(),
            "similarity bound unsatisfiable"
        );
        Err(HrrError::VocabularyExhausted {
            symbol: name.to_string(),
            attempts: self.max_draws,
            max_similarity: self.max_similarity,
            dimension: self.dimension,
            existing: self.len(),
        })
    }

    /// Insert a caller-supplied vector under `name` after normalising it.
    ///
    /// The normalised vector must respect the similarity bound against every
    /// existing entry, otherwise [`HrrError::SimilarityBound`] names the first
    /// offending symbol and nothing is inserted.
    pub fn add(&mut self, name: &str, vector: ArrayView1<'_, f64>) -> Result<SymbolVector> {
        if vector.len() != self.dimension {
            return Err(HrrError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        if self.vectors.contains_key(name) {
            return Err(HrrError::DuplicateSymbol(name.to_string()));
        }
        let unit = normalize(vector.to_owned())
            .ok_or_else(|| HrrError::ZeroVector(name.to_string()))?;
        if let Some((existing, similarity)) = self.first_violation(unit.view()) {
            return Err(HrrError::SimilarityBound {
                symbol: name.to_string(),
                existing,
                similarity,
                max_similarity: self.max_similarity,
            });
        }
        Ok(self.insert(name, unit))
    }

    /// One candidate from the vocabulary's own RNG.
    fn draw(&mut self) -> Array1<f64> {
        let v = random_unit(self.dimension, &mut self.rng);
        match &self.unitary {
            Some(fft) => {
                let u = Array1::from_vec(fft.make_unitary(&v.to_vec()));
                normalize(u).unwrap_or(v)
            }
            None => v,
        }
    }

    fn admissible(&self, candidate: ArrayView1<'_, f64>) -> bool {
        self.first_violation(candidate).is_none()
    }

    /// First entry, in insertion order, whose similarity exceeds the bound.
    fn first_violation(&self, candidate: ArrayView1<'_, f64>) -> Option<(String, f64)> {
        self.names.iter().find_map(|name| {
            let s = self.vectors[name].dot(candidate);
            (s > self.max_similarity).then(|| (name.clone(), s))
        })
    }

    fn insert(&mut self, name: &str, vector: Array1<f64>) -> SymbolVector {
        let sv = SymbolVector::from_array(vector);
        self.names.push(name.to_string());
        self.vectors.insert(name.to_string(), sv.clone());
        sv
    }

    /// Existing vector for `name`, without generating one.
    pub fn get(&self, name: &str) -> Option<&SymbolVector> {
        self.vectors.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vectors.contains_key(name)
    }

    /// Symbol names in insertion order.
    pub fn keys(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn max_similarity(&self) -> f64 {
        self.max_similarity
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn is_unitary(&self) -> bool {
        self.unitary.is_some()
    }

    /// Dot product of `v` with every symbol, in insertion order.
    pub fn dot(&self, v: ArrayView1<'_, f64>) -> Vec<(String, f64)> {
        self.names
            .iter()
            .map(|name| (name.clone(), self.vectors[name].dot(v)))
            .collect()
    }

    /// The `k` symbols with the highest dot product against `v`.
    pub fn cleanup(&self, v: ArrayView1<'_, f64>, k: usize) -> Vec<SymbolMatch> {
        let mut scored: Vec<SymbolMatch> = self
            .dot(v)
            .into_iter()
            .map(|(name, score)| SymbolMatch { name, score })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(k);
        scored
    }

    /// Render `v` as `"0.87RED;0.31BLUE"`: every symbol scoring above
    /// `threshold`, best first, and always at least the best one.
    pub fn text(&self, v: ArrayView1<'_, f64>, threshold: f64) -> String {
        let ranked = self.cleanup(v, self.len());
        ranked
            .iter()
            .enumerate()
            .filter(|(i, m)| *i == 0 || m.score > threshold)
            .map(|(_, m)| format!("{:.2}{}", m.score, m.name))
            .collect::<Vec<_>>()
            .join(";")
    }

    /// Largest cosine similarity between two distinct entries.
    pub fn max_pairwise_similarity(&self) -> Option<f64> {
        let vs: Vec<&SymbolVector> = self.names.iter().map(|n| &self.vectors[n]).collect();
        let mut best: Option<f64> = None;
        for i in 0..vs.len() {
            for j in (i + 1)..vs.len() {
                let s = vs[i].similarity(vs[j]);
                best = Some(best.map_or(s, |b| b.max(s)));
            }
        }
        best
    }
}

impl std::fmt::Debug for Vocabulary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vocabulary")
            .field("dimension", &self.dimension)
            .field("max_similarity", &self.max_similarity)
            .field("seed", &self.seed)
            .field("symbols", &self.names)
            .finish_non_exhaustive()
    }
}
