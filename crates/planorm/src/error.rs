//! Error types for planorm

use thiserror::Error;

/// Result type alias for planorm operations
pub type OrmResult<T> = Result<T, OrmError>;

/// Error types for mapping and execution
#[derive(Debug, Error)]
pub enum OrmError {
    /// A required clause or argument is missing, or the source/destination has the wrong shape
    #[error("Argument error: {0}")]
    Argument(String),

    /// The destination or field type cannot carry values through the binder
    #[error("Unsupported type: {0}")]
    UnsupportedType(String),

    /// A value could not be translated between its wire form and the destination type
    #[error("Conversion error on column '{column}': {message}")]
    Conversion { column: String, message: String },

    /// Failure reported by the executor, surfaced unchanged
    #[error("Execution error: {0}")]
    Execution(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl OrmError {
    /// Create an argument error
    pub fn argument(message: impl Into<String>) -> Self {
        Self::Argument(message.into())
    }

    /// Create an unsupported type error
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::UnsupportedType(message.into())
    }

    /// Create a conversion error for a specific column
    pub fn conversion(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Conversion {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Wrap an executor failure
    pub fn execution(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Execution(err.into())
    }

    /// Attach a column name to a conversion error that was raised without one.
    pub fn with_column(self, name: &str) -> Self {
        match self {
            Self::Conversion { column, message } if column.is_empty() => Self::Conversion {
                column: name.to_string(),
                message,
            },
            other => other,
        }
    }

    /// Check if this is an argument error
    pub fn is_argument(&self) -> bool {
        matches!(self, Self::Argument(_))
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::UnsupportedType(_))
    }

    /// Check if this is a conversion error
    pub fn is_conversion(&self) -> bool {
        matches!(self, Self::Conversion { .. })
    }

    /// Check if this error came from the executor
    pub fn is_execution(&self) -> bool {
        matches!(self, Self::Execution(_))
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for OrmError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Execution(Box::new(err))
    }
}
