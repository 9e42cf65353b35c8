use thiserror::Error;

/// Result type for junction operations
pub type Result<T> = std::result::Result<T, JunctionError>;

/// Main error type for the junction crate
#[derive(Debug, Error)]
pub enum JunctionError {
    /// Invalid dimensions for operations
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        expected: String,
        actual: String,
    },

    /// Invalid parameter value
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter {
        name: String,
        reason: String,
    },

    /// Action index outside the configured action space
    #[error("Invalid action {action}: must be less than {action_size}")]
    InvalidAction {
        action: usize,
        action_size: usize,
    },

    /// Replay slot that does not hold a transition
    #[error("Invalid replay index {index}: buffer holds {len} transitions")]
    InvalidIndex {
        index: usize,
        len: usize,
    },

    /// More samples requested than the replay buffer holds
    #[error("Insufficient samples: requested {requested}, buffer holds {available}")]
    InsufficientSamples {
        requested: usize,
        available: usize,
    },

    /// Non-finite loss or parameters; training cannot continue
    #[error("Numerical divergence: {0}")]
    Divergence(String),

    /// Training error
    #[error("Training error: {0}")]
    TrainingError(String),

    /// Failure reported by an environment implementation
    #[error("Environment error: {0}")]
    Environment(String),

    /// IO errors (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Binary (de)serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Configuration parse errors
    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),
}

// Helper functions for common error patterns
impl JunctionError {
    pub fn dimension_mismatch<S: Into<String>>(expected: S, actual: S) -> Self {
        JunctionError::DimensionMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn invalid_parameter<S: Into<String>>(name: S, reason: S) -> Self {
        JunctionError::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
