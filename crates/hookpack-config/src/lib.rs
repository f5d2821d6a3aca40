//! # hookpack-config
//!
//! Turns a raw, declarative build configuration into a fully populated
//! [`Options`] value.
//!
//! Normalization happens in two steps:
//!
//! 1. the raw value is checked against the process-wide configuration schema,
//!    collecting every violated field path;
//! 2. the typed fields are read and every unset optional field receives its
//!    default (context, output, mode, devtool, watch options).
//!
//! Nothing here touches the file system.
//!
//! ```
//! use hookpack_config::ConfigNormalizer;
//! use serde_json::json;
//!
//! let options = ConfigNormalizer::new()
//!     .with_cwd("/project")
//!     .normalize(&json!({ "entry": "./src/index.js" }))
//!     .unwrap();
//!
//! assert_eq!(options.entry["main"].import, vec!["./src/index.js".to_string()]);
//! assert_eq!(options.output.filename, "[name].js");
//! ```

pub mod defaults;
pub mod error;
pub mod normalize;
pub mod options;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, Result, SchemaViolation};
pub use normalize::{ConfigNormalizer, normalize};
pub use options::{
    EntryDescription, EntryStatic, Mode, ModuleOptions, Options, OutputOptions,
    PluginDeclaration, RuleSetRule, WatchOptions,
};
pub use validation::{ConfigValidator, SchemaValidator, validate_schema};
