//! Pluggable config validation strategies
//!
//! Validation only looks at the shape of the raw value; it never checks
//! whether entries or directories exist on disk.

use serde_json::Value;

use crate::error::{ConfigError, Result, SchemaViolation};
use crate::schema::{self, ROOT};

/// Trait for pluggable config validation strategies
pub trait ConfigValidator {
    /// Validate one raw build configuration
    fn validate(&self, config: &Value) -> Result<()>;
}

/// Structural validation against the process-wide JSON Schema.
///
/// # Example
///
/// ```
/// use hookpack_config::{ConfigValidator, SchemaValidator};
/// use serde_json::json;
///
/// SchemaValidator.validate(&json!({ "entry": "./src/index.js" })).unwrap();
/// assert!(SchemaValidator.validate(&json!({ "mode": "fast" })).is_err());
/// ```
pub struct SchemaValidator;

impl SchemaValidator {
    /// Collect every violation of `config`, with paths rooted at `root`.
    pub fn violations(config: &Value, root: &str) -> Vec<SchemaViolation> {
        schema::check(config, root)
    }

    /// Validate the targets of a multi-target configuration together.
    ///
    /// Violations of the n-th target are rooted at `configuration[n]`.
    pub fn validate_many(configs: &[Value]) -> Result<()> {
        let violations: Vec<SchemaViolation> = configs
            .iter()
            .enumerate()
            .flat_map(|(index, config)| Self::violations(config, &format!("{ROOT}[{index}]")))
            .collect();
        into_result(violations)
    }
}

impl ConfigValidator for SchemaValidator {
    fn validate(&self, config: &Value) -> Result<()> {
        into_result(Self::violations(config, ROOT))
    }
}

fn into_result(violations: Vec<SchemaViolation>) -> Result<()> {
    if violations.is_empty() {
        Ok(())
    } else {
        tracing::debug!(count = violations.len(), "configuration failed schema validation");
        Err(ConfigError::SchemaValidation { violations })
    }
}

/// Convenience function for schema validation
pub fn validate_schema(config: &Value) -> Result<()> {
    SchemaValidator.validate(config)
}
