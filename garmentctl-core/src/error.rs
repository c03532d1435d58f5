//! Structured error types for garmentctl-core.
//!
//! Run-level failures only. A failing step is not an error here: it is
//! recorded in the step's report and the pipeline moves on.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::seed::SeedError;
use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum HarnessError {
    /// Missing or malformed run configuration
    #[error("Configuration error: {reason}")]
    Config { reason: String },

    /// Seed script, schema or config file could not be read
    #[error("Failed to read {path:?}: {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("Invalid seed script: {0}")]
    Seed(#[from] SeedError),

    /// Fixture reset failed; nothing after it can run
    #[error("Fixture reset failed: {source}")]
    Fixture { source: StoreError },

    /// Store became unusable mid-run
    #[error("Database error: {0}")]
    Store(#[from] StoreError),

    /// A step left the store unusable; later steps were skipped
    #[error("Run aborted at step '{step}': {reason}")]
    Aborted { step: String, reason: String },

    #[error("Run exceeded timeout of {timeout:?}")]
    Timeout { timeout: Duration },
}

pub type Result<T> = std::result::Result<T, HarnessError>;

impl HarnessError {
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn fixture(source: StoreError) -> Self {
        Self::Fixture { source }
    }

    pub fn aborted(step: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Aborted {
            step: step.into(),
            reason: reason.into(),
        }
    }

    pub fn timeout(timeout: Duration) -> Self {
        Self::Timeout { timeout }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let err = HarnessError::config("DATABASE_URL not set");
        assert_eq!(err.to_string(), "Configuration error: DATABASE_URL not set");
    }

    #[test]
    fn timeout_display_includes_duration() {
        let err = HarnessError::timeout(Duration::from_secs(5));
        assert_eq!(err.to_string(), "Run exceeded timeout of 5s");
    }

    #[test]
    fn store_error_converts() {
        let err: HarnessError = StoreError::not_found("Red hooded jacket").into();
        assert!(matches!(err, HarnessError::Store(_)));
    }
}
