//! Normalized configuration types.
//!
//! An [`Options`] value is always complete: every optional field of the raw
//! configuration has been filled in by the normalizer.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Entry points by name, in declaration order.
pub type EntryStatic = IndexMap<String, EntryDescription>;

/// Fully normalized build configuration for one target.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Options {
    /// Target name, used by sibling targets to declare dependencies
    pub name: Option<String>,

    /// Entry points (graph seeds)
    pub entry: EntryStatic,

    /// Absolute base directory entries are resolved against
    pub context: PathBuf,

    pub output: OutputOptions,

    pub module: ModuleOptions,

    pub mode: Mode,

    /// Source-map strategy identifier, `None` when disabled
    pub devtool: Option<String>,

    pub watch: bool,

    pub watch_options: WatchOptions,

    /// Plugins declared in the configuration, in list order
    pub plugins: Vec<PluginDeclaration>,

    /// Names of sibling targets that must build first (multi-target only)
    pub dependencies: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryDescription {
    /// Requests seeded for this entry, in order
    pub import: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputOptions {
    /// Absolute output directory
    pub path: PathBuf,

    /// Filename template for emitted entry chunks
    pub filename: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ModuleOptions {
    pub rules: Vec<RuleSetRule>,
}

/// A module rule: resources matching `test` are handed to the `use` loaders.
#[derive(Debug, Clone, Serialize)]
pub struct RuleSetRule {
    pub test: String,

    #[serde(rename = "use")]
    pub loaders: Vec<String>,

    #[serde(skip)]
    pattern: Regex,
}

impl RuleSetRule {
    pub fn new(test: impl Into<String>, loaders: Vec<String>) -> Result<Self, regex::Error> {
        let test = test.into();
        let pattern = Regex::new(&test)?;
        Ok(Self {
            test,
            loaders,
            pattern,
        })
    }

    /// Whether a resource path is handled by this rule.
    pub fn matches(&self, resource: &str) -> bool {
        self.pattern.is_match(resource)
    }
}

impl PartialEq for RuleSetRule {
    fn eq(&self, other: &Self) -> bool {
        self.test == other.test && self.loaders == other.loaders
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Development,
    #[default]
    Production,
    None,
}

impl Mode {
    pub const ALL: &'static [&'static str] = &["development", "production", "none"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Development => "development",
            Mode::Production => "production",
            Mode::None => "none",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "development" => Ok(Mode::Development),
            "production" => Ok(Mode::Production),
            "none" => Ok(Mode::None),
            other => Err(format!("Invalid mode: {}", other)),
        }
    }
}

/// Settings for change-driven rebuilds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchOptions {
    /// Delay (ms) used to batch changes into one rebuild
    pub aggregate_timeout: u64,

    /// Polling interval (ms); `None` uses native change notifications
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poll: Option<u64>,

    /// Path patterns whose changes never trigger a rebuild
    pub ignored: Vec<String>,
}

impl WatchOptions {
    pub fn aggregate_timeout(&self) -> Duration {
        Duration::from_millis(self.aggregate_timeout)
    }
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            aggregate_timeout: crate::defaults::default_aggregate_timeout(),
            poll: None,
            ignored: Vec::new(),
        }
    }
}

/// A plugin listed in the configuration's `plugins` array.
///
/// Strings and `{ "name": .., "options": .. }` objects are references to
/// registered plugins. Anything else is kept as-is; applying it fails.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PluginDeclaration {
    Named { name: String, options: Value },
    Unrecognized(Value),
}

impl PluginDeclaration {
    pub(crate) fn from_value(value: Value) -> Self {
        match value {
            Value::String(name) => PluginDeclaration::Named {
                name,
                options: Value::Null,
            },
            Value::Object(map) => match map.get("name").and_then(Value::as_str) {
                Some(name) => PluginDeclaration::Named {
                    name: name.to_string(),
                    options: map.get("options").cloned().unwrap_or(Value::Null),
                },
                None => PluginDeclaration::Unrecognized(Value::Object(map)),
            },
            other => PluginDeclaration::Unrecognized(other),
        }
    }
}
