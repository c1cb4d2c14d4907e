use std::fmt;

/// Result type for qcomp operations
pub type Result<T> = std::result::Result<T, QcompError>;

/// Main error type for the learner
#[derive(Debug, Clone)]
pub enum QcompError {
    /// Unrecognised identifier or out-of-range option, raised at construction
    Configuration {
        name: String,
        reason: String,
    },

    /// Tensor or batch dimensions do not match the configured shapes
    Shape {
        expected: String,
        actual: String,
    },

    /// Action index outside the action-value vector
    InvalidAction {
        action: usize,
        num_actions: usize,
    },

    /// Degenerate numerics (softmax temperature collapsing, non-finite weights)
    NumericHazard(String),

    /// Internal training protocol violation
    Training(String),

    /// IO errors (file operations)
    Io(String),

    /// Serialization/deserialization errors
    Serialization(String),
}

impl fmt::Display for QcompError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QcompError::Configuration { name, reason } => {
                write!(f, "Invalid configuration '{}': {}", name, reason)
            }
            QcompError::Shape { expected, actual } => {
                write!(f, "Shape mismatch: expected {}, got {}", expected, actual)
            }
            QcompError::InvalidAction { action, num_actions } => {
                write!(f, "Invalid action {}: must be less than {}", action, num_actions)
            }
            QcompError::NumericHazard(msg) => write!(f, "Numeric hazard: {}", msg),
            QcompError::Training(msg) => write!(f, "Training error: {}", msg),
            QcompError::Io(msg) => write!(f, "IO error: {}", msg),
            QcompError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for QcompError {}

impl From<std::io::Error> for QcompError {
    fn from(err: std::io::Error) -> Self {
        QcompError::Io(err.to_string())
    }
}

impl From<bincode::Error> for QcompError {
    fn from(err: bincode::Error) -> Self {
        QcompError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for QcompError {
    fn from(err: serde_json::Error) -> Self {
        QcompError::Serialization(err.to_string())
    }
}

// Reshapes inside the layers only fail when an invariant on layouts is broken
impl From<ndarray::ShapeError> for QcompError {
    fn from(err: ndarray::ShapeError) -> Self {
        QcompError::Shape {
            expected: "a contiguous tensor of compatible size".to_string(),
            actual: err.to_string(),
        }
    }
}

impl QcompError {
    pub fn configuration<S: Into<String>>(name: S, reason: S) -> Self {
        QcompError::Configuration {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn shape<S: Into<String>>(expected: S, actual: S) -> Self {
        QcompError::Shape {
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}
