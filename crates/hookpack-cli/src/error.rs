//! CLI error type.
//!
//! Library failures are carried as [`hookpack::Error`] and rendered through
//! its miette diagnostic; everything else is reported as a plain message.

use std::path::PathBuf;

use miette::Report;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    /// An explicitly given configuration file does not exist
    #[error("Configuration file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    /// The configuration file could not be parsed or layered
    #[error("Failed to load configuration from {}: {message}", .path.display())]
    ConfigLoad { path: PathBuf, message: String },

    /// Construction or a pass failed
    #[error(transparent)]
    Build(#[from] hookpack::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<hookpack_config::ConfigError> for CliError {
    fn from(err: hookpack_config::ConfigError) -> Self {
        CliError::Build(err.into())
    }
}

pub type Result<T> = std::result::Result<T, CliError>;

/// Convert a CLI error into a miette report.
pub fn cli_error_to_miette(err: CliError) -> Report {
    match err {
        CliError::Build(e) => Report::new(e),
        CliError::ConfigNotFound(path) => miette::miette!(
            help = "Pass an existing file with --config, or omit it to use hookpack.config.json",
            "Configuration file not found: {}",
            path.display()
        ),
        other => miette::miette!("{}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use miette::Diagnostic;

    #[test]
    fn library_errors_keep_their_diagnostic_code() {
        let report = cli_error_to_miette(CliError::Build(hookpack::Error::ClosedCompiler));
        assert_eq!(report.code().unwrap().to_string(), "CLOSED_COMPILER");
    }

    #[test]
    fn config_errors_become_build_errors() {
        let err = CliError::from(hookpack_config::ConfigError::InvalidValue {
            field: "entry".into(),
            hint: None,
        });
        assert!(matches!(err, CliError::Build(hookpack::Error::Config(_))));
    }
}
