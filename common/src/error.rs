//! Error handling for the copairs-common crate.

use thiserror::Error;

/// Errors raised while configuring a job or touching its files.
///
/// Each variant keeps an optional source, so failures from the filesystem
/// or serde keep their chain.
#[derive(Error, Debug)]
pub enum CommonError {
    #[error("Invalid configuration: {message}")]
    ConfigurationError {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    #[error("IO operation failed: {message}")]
    IoError {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    #[error("Resource not found: {message}")]
    NotFoundError { message: String },
}

/// Result type alias for common operations.
pub type Result<T> = std::result::Result<T, CommonError>;

/// Which part of a job run an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Job parameters or the config file
    Configuration,
    /// Reading input or writing output
    Filesystem,
}

/// Operator-facing diagnostics for an error.
pub trait Diagnose {
    fn category(&self) -> ErrorCategory;

    /// Hints printed next to the error when a job fails.
    fn suggestions(&self) -> Vec<String>;
}

impl CommonError {
    pub fn configuration_error<S: Into<String>>(message: S) -> Self {
        Self::ConfigurationError {
            message: message.into(),
            source: None,
        }
    }

    pub fn configuration_error_with_source<S: Into<String>, E: Into<anyhow::Error>>(
        message: S,
        source: E,
    ) -> Self {
        Self::ConfigurationError {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn io_error<S: Into<String>>(message: S) -> Self {
        Self::IoError {
            message: message.into(),
            source: None,
        }
    }

    pub fn io_error_with_source<S: Into<String>, E: Into<anyhow::Error>>(
        message: S,
        source: E,
    ) -> Self {
        Self::IoError {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn not_found_error<S: Into<String>>(message: S) -> Self {
        Self::NotFoundError {
            message: message.into(),
        }
    }
}

impl Diagnose for CommonError {
    fn category(&self) -> ErrorCategory {
        match self {
            CommonError::ConfigurationError { .. } => ErrorCategory::Configuration,
            CommonError::IoError { .. } | CommonError::NotFoundError { .. } => {
                ErrorCategory::Filesystem
            }
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            CommonError::ConfigurationError { .. } => vec![
                "Check that map tasks, reducers and threads are positive".to_string(),
                "Check the separator and JSON field names in the config file".to_string(),
            ],
            CommonError::IoError { message, .. } if message.contains("already exists") => {
                vec!["Remove the output directory or choose a new one".to_string()]
            }
            CommonError::IoError { .. } => {
                vec!["Check file system permissions and disk space".to_string()]
            }
            CommonError::NotFoundError { .. } => {
                vec!["Verify the input path".to_string()]
            }
        }
    }
}

/// Context helpers for wrapping foreign errors.
pub mod context {
    use super::*;

    /// Extension trait for adding context to Results.
    pub trait ErrorContext<T> {
        fn with_io_context<F>(self, f: F) -> Result<T>
        where
            F: FnOnce() -> String;

        fn with_config_context<F>(self, f: F) -> Result<T>
        where
            F: FnOnce() -> String;
    }

    impl<T, E> ErrorContext<T> for std::result::Result<T, E>
    where
        E: Into<anyhow::Error>,
    {
        fn with_io_context<F>(self, f: F) -> Result<T>
        where
            F: FnOnce() -> String,
        {
            self.map_err(|e| CommonError::io_error_with_source(f(), e))
        }

        fn with_config_context<F>(self, f: F) -> Result<T>
        where
            F: FnOnce() -> String,
        {
            self.map_err(|e| CommonError::configuration_error_with_source(f(), e))
        }
    }
}

pub use context::ErrorContext;

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::error::Error;

    #[test]
    fn test_diagnose() {
        let error = CommonError::configuration_error("num_reducers must be positive");
        assert_eq!(error.category(), ErrorCategory::Configuration);
        assert!(error.suggestions()[0].contains("reducers"));

        let error = CommonError::not_found_error("input path ratings.dat not found");
        assert_eq!(error.category(), ErrorCategory::Filesystem);

        let error = CommonError::io_error("output directory out already exists");
        assert!(error.suggestions()[0].contains("Remove the output directory"));
    }

    #[test]
    fn test_error_context_extension() {
        let result: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        ));
        let err = result
            .with_io_context(|| "Failed to open ratings".to_string())
            .unwrap_err();
        assert!(matches!(err, CommonError::IoError { .. }));
        assert!(err.source().is_some());

        let result: std::result::Result<(), anyhow::Error> = Err(anyhow!("bad value"));
        let err = result
            .with_config_context(|| "threshold".to_string())
            .unwrap_err();
        assert!(matches!(err, CommonError::ConfigurationError { .. }));
        assert_eq!(err.to_string(), "Invalid configuration: threshold");
    }
}
