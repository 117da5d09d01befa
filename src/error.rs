//! Error types for quadtree construction, weighting, sampling and splitting.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, GrtsError>;

#[derive(Error, Debug)]
pub enum GrtsError {
    /// Options that cannot be acted on: no stopping rule, bad fractions,
    /// quota map without a strata column.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A grid address was duplicated inside a split or leaked between splits.
    #[error("Split integrity violated: {0}")]
    Integrity(String),

    #[error("Insufficient pool for {context}: requested {requested}, available {available}")]
    InsufficientPool {
        context: String,
        requested: usize,
        available: usize,
    },

    #[error("Quadrant '{address}' has no points but {requested} sample(s) per grid were requested")]
    EmptyQuadrant { address: String, requested: usize },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "toml")]
    #[error("TOML error: {0}")]
    Toml(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl GrtsError {
    pub(crate) fn insufficient(
        context: impl Into<String>,
        requested: usize,
        available: usize,
    ) -> Self {
        Self::InsufficientPool {
            context: context.into(),
            requested,
            available,
        }
    }
}
