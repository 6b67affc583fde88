//! Error types shared by the distance model and every search strategy.

use thiserror::Error;

/// Errors reported before a search starts, or while reading/writing data.
#[derive(Debug, Error)]
pub enum TspError {
    /// No points (or an empty distance table) were supplied.
    #[error("at least one city is required")]
    EmptyInput,

    /// Points mix 2D and 3D coordinates.
    #[error("point {index} has {found} dimensions, expected {expected}")]
    DimensionMismatch {
        index: usize,
        expected: usize,
        found: usize,
    },

    /// A configuration value or input value is outside its valid range.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A route is not a permutation of the city indices.
    #[error("invalid route: {0}")]
    InvalidRoute(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl TspError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        TspError::InvalidConfiguration(message.into())
    }
}

pub type Result<T> = std::result::Result<T, TspError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(TspError::EmptyInput.to_string(), "at least one city is required");

        let err = TspError::DimensionMismatch { index: 3, expected: 2, found: 3 };
        assert_eq!(err.to_string(), "point 3 has 3 dimensions, expected 2");

        let err = TspError::config("tabu_size must be positive");
        assert!(matches!(err, TspError::InvalidConfiguration(_)));
        assert_eq!(err.to_string(), "invalid configuration: tabu_size must be positive");
    }
}
