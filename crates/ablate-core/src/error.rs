use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration validation failed:\n{0}")]
    Validation(#[from] ValidationFailure),

    #[error("ablation expansion error: {0}")]
    Expansion(String),

    #[error("ablation produced no experiments: {0}")]
    EmptySweep(String),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// One offending field in a configuration, addressed by its dotted path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub path: String,
    pub reason: String,
}

/// Structured validation failure carrying every issue found, not just the first.
#[derive(Debug, Clone, Default)]
pub struct ValidationFailure {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationFailure {
    pub fn push(&mut self, path: impl Into<String>, reason: impl Into<String>) {
        self.issues.push(ValidationIssue { path: path.into(), reason: reason.into() });
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// `Ok(())` when no issues were collected, otherwise `Err(self)`.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, issue) in self.issues.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "  {}: {}", issue.path, issue.reason)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationFailure {}
