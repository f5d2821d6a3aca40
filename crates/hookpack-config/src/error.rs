//! Error types for configuration validation and normalization.

use std::fmt;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConfigError>;

/// One violated field of the configuration schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    /// Dotted field path, rooted at `configuration` (e.g. `configuration.output.filename`)
    pub path: String,
    pub message: String,
}

impl SchemaViolation {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    // Schema validation errors (reported before anything is constructed)
    #[error("invalid configuration: {}", format_violations(.violations))]
    SchemaValidation { violations: Vec<SchemaViolation> },

    // Values that passed the schema but could not be read
    #[error("invalid config value for '{field}'{}", format_hint(.hint))]
    InvalidValue { field: String, hint: Option<String> },
}

impl ConfigError {
    /// Every violated field, empty for non-schema errors.
    pub fn violations(&self) -> &[SchemaViolation] {
        match self {
            ConfigError::SchemaValidation { violations } => violations,
            ConfigError::InvalidValue { .. } => &[],
        }
    }
}

fn format_violations(violations: &[SchemaViolation]) -> String {
    match violations {
        [single] => single.to_string(),
        many => format!(
            "{} violations: {}",
            many.len(),
            many.iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ")
        ),
    }
}

fn format_hint(hint: &Option<String>) -> String {
    match hint {
        Some(hint) => format!(" ({hint})"),
        None => String::new(),
    }
}
