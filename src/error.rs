//! Error taxonomy.
//!
//! Invalid construction parameters are [`ConfigError`]. Everything else a
//! vocabulary or snapshot can reject is an [`HrrError`], most notably an
//! unsatisfiable similarity bound ([`HrrError::VocabularyExhausted`],
//! [`HrrError::SimilarityBound`]). Lossy unbinding is not an error and never
//! surfaces here.

use thiserror::Error;

/// Invalid construction-time parameter. Always fatal, never retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Vector dimensionality must be at least 1.
    #[error("dimension must be >= 1, got {0}")]
    InvalidDimension(usize),

    /// Maximum pairwise similarity must lie in [0, 1].
    #[error("max_similarity must be in [0, 1], got {0}")]
    InvalidMaxSimilarity(f64),

    /// Post-synaptic time constant must be finite and positive.
    #[error("pstc must be finite and > 0, got {0}")]
    InvalidPstc(f64),

    /// Tick interval must be finite, positive and no larger than `pstc`.
    #[error("dt must be finite, > 0 and <= pstc ({pstc}), got {dt}")]
    InvalidTimestep {
        /// Requested tick interval.
        dt: f64,
        /// Memory time constant it was checked against.
        pstc: f64,
    },

    /// Sub-binding block size must be non-zero and divide the dimension.
    #[error("block size {block_size} does not evenly divide dimension {dimension}")]
    InvalidBlockSize {
        /// Vector dimensionality.
        dimension: usize,
        /// Requested block size.
        block_size: usize,
    },

    /// Population count must be positive.
    #[error("population must be >= 1, got {0}")]
    InvalidPopulation(usize),

    /// Rejection-sampling cap must allow at least one draw.
    #[error("max_draws must be >= 1")]
    InvalidMaxDraws,
}

/// Errors raised by vocabulary growth, explicit insertion and snapshots.
#[derive(Debug, Error)]
pub enum HrrError {
    /// A construction parameter was rejected.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// No candidate satisfied the similarity bound within the draw cap.
    #[error(
        "vocabulary exhausted: could not place '{symbol}' after {attempts} draws \
         (dimension={dimension}, max_similarity={max_similarity}, existing={existing})"
    )]
    VocabularyExhausted {
        symbol: String,
        attempts: usize,
        max_similarity: f64,
        dimension: usize,
        existing: usize,
    },

    /// An explicitly inserted symbol violates the similarity bound.
    #[error(
        "symbol '{symbol}' has similarity {similarity} with '{existing}', \
         above max_similarity={max_similarity}"
    )]
    SimilarityBound {
        symbol: String,
        existing: String,
        similarity: f64,
        max_similarity: f64,
    },

    /// A vector's length differs from the vocabulary dimension.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The name is already bound to a vector.
    #[error("symbol '{0}' is already defined")]
    DuplicateSymbol(String),

    /// A zero vector has no direction to normalise to.
    #[error("cannot normalise a zero vector for symbol '{0}'")]
    ZeroVector(String),

    /// Memory state could not be encoded or decoded.
    #[error("snapshot codec: {0}")]
    Snapshot(#[from] bincode::Error),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, HrrError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_wraps() {
        let err: HrrError = ConfigError::InvalidDimension(0).into();
        assert!(matches!(err, HrrError::Config(ConfigError::InvalidDimension(0))));
        assert!(err.to_string().contains("dimension must be >= 1"));
    }

    #[test]
    fn test_exhausted_message_names_symbol() {
        let err = HrrError::VocabularyExhausted {
            symbol: "RED".to_string(),
            attempts: 1000,
            max_similarity: 0.0,
            dimension: 2,
            existing: 3,
        };
        let msg = err.to_string();
        assert!(msg.contains("'RED'"));
        assert!(msg.contains("1000 draws"));
    }

    #[test]
    fn test_similarity_bound_message() {
        let err = HrrError::SimilarityBound {
            symbol: "CRIMSON".to_string(),
            existing: "RED".to_string(),
            similarity: 0.5,
            max_similarity: 0.1,
        };
        let msg = err.to_string();
        assert!(msg.contains("'CRIMSON'"));
        assert!(msg.contains("'RED'"));
        assert!(msg.contains("max_similarity=0.1"));
    }
}
