//! Raw configuration → [`Options`].

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use path_clean::PathClean;
use serde::Deserialize;
use serde_json::Value;

use crate::defaults::{
    DEFAULT_ENTRY, DEFAULT_ENTRY_NAME, DEFAULT_POLL_INTERVAL_MS, default_aggregate_timeout,
    default_devtool, default_filename, default_output_dir,
};
use crate::error::{ConfigError, Result};
use crate::options::{
    EntryDescription, EntryStatic, Mode, ModuleOptions, Options, OutputOptions,
    PluginDeclaration, RuleSetRule, WatchOptions,
};
use crate::schema::ROOT;
use crate::validation::SchemaValidator;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawOptions {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    entry: Option<RawEntry>,
    #[serde(default)]
    context: Option<PathBuf>,
    #[serde(default)]
    output: RawOutput,
    #[serde(default)]
    module: RawModule,
    #[serde(default)]
    mode: Option<Mode>,
    #[serde(default)]
    devtool: Option<RawDevtool>,
    #[serde(default)]
    watch: bool,
    #[serde(default)]
    watch_options: RawWatchOptions,
    #[serde(default)]
    plugins: Vec<Value>,
    #[serde(default)]
    dependencies: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn into_vec(self) -> Vec<String> {
        match self {
            OneOrMany::One(value) => vec![value],
            OneOrMany::Many(values) => values,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawEntry {
    Import(OneOrMany),
    Named(IndexMap<String, RawEntryItem>),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawEntryItem {
    Import(OneOrMany),
    Descriptor {
        import: OneOrMany,
        #[serde(default)]
        filename: Option<String>,
    },
}

#[derive(Debug, Default, Deserialize)]
struct RawOutput {
    #[serde(default)]
    filename: Option<String>,
    #[serde(default)]
    path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct RawModule {
    #[serde(default)]
    rules: Vec<RawRule>,
}

#[derive(Debug, Deserialize)]
struct RawRule {
    test: String,
    #[serde(default, rename = "use")]
    loaders: Option<OneOrMany>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawDevtool {
    Name(String),
    // `false`; the schema rejects every other value
    Disabled(serde::de::IgnoredAny),
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawWatchOptions {
    #[serde(default)]
    aggregate_timeout: Option<u64>,
    #[serde(default)]
    poll: Option<RawPoll>,
    #[serde(default)]
    ignored: Option<OneOrMany>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawPoll {
    Enabled(bool),
    Interval(u64),
}

/// Validates raw configurations and fills in their defaults.
///
/// The working directory used for the default `context` is read once per
/// normalization unless pinned with [`ConfigNormalizer::with_cwd`].
#[derive(Debug, Clone, Default)]
pub struct ConfigNormalizer {
    cwd: Option<PathBuf>,
}

impl ConfigNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative paths against `cwd` instead of the process working directory.
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Normalize a single-target configuration.
    pub fn normalize(&self, config: &Value) -> Result<Options> {
        let violations = SchemaValidator::violations(config, ROOT);
        if !violations.is_empty() {
            return Err(ConfigError::SchemaValidation { violations });
        }
        self.fill(config, ROOT)
    }

    /// Normalize every target of a multi-target configuration.
    ///
    /// Violations from all targets are reported together.
    pub fn normalize_many(&self, configs: &[Value]) -> Result<Vec<Options>> {
        SchemaValidator::validate_many(configs)?;
        configs
            .iter()
            .enumerate()
            .map(|(index, config)| self.fill(config, &format!("{ROOT}[{index}]")))
            .collect()
    }

    fn fill(&self, config: &Value, field: &str) -> Result<Options> {
        let raw: RawOptions =
            serde_json::from_value(config.clone()).map_err(|e| ConfigError::InvalidValue {
                field: field.to_string(),
                hint: Some(e.to_string()),
            })?;
        let cwd = self.resolve_cwd()?;
        let options = apply_defaults(raw, &cwd)?;

        tracing::debug!(
            context = %options.context.display(),
            entries = options.entry.len(),
            mode = %options.mode,
            "normalized configuration"
        );

        Ok(options)
    }

    fn resolve_cwd(&self) -> Result<PathBuf> {
        match &self.cwd {
            Some(cwd) => Ok(cwd.clone()),
            None => std::env::current_dir().map_err(|e| ConfigError::InvalidValue {
                field: "context".to_string(),
                hint: Some(format!("cannot read the working directory: {e}")),
            }),
        }
    }
}

/// Normalize a single-target configuration relative to the process working directory.
pub fn normalize(config: &Value) -> Result<Options> {
    ConfigNormalizer::new().normalize(config)
}

fn apply_defaults(raw: RawOptions, cwd: &Path) -> Result<Options> {
    let context = match raw.context {
        Some(context) => absolutize(&context, cwd),
        None => cwd.to_path_buf(),
    };

    let entry = normalize_entry(raw.entry);

    let output = OutputOptions {
        path: absolutize(
            &raw.output.path.unwrap_or_else(default_output_dir),
            &context,
        ),
        filename: raw.output.filename.unwrap_or_else(default_filename),
    };

    let rules = raw
        .module
        .rules
        .into_iter()
        .map(|rule| {
            let loaders = rule.loaders.map(OneOrMany::into_vec).unwrap_or_default();
            RuleSetRule::new(rule.test, loaders).map_err(|e| ConfigError::InvalidValue {
                field: "module.rules".to_string(),
                hint: Some(e.to_string()),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let mode = raw.mode.unwrap_or_default();
    let devtool = match raw.devtool {
        Some(RawDevtool::Name(name)) => Some(name),
        Some(RawDevtool::Disabled(_)) => None,
        None => default_devtool(mode),
    };

    let watch_options = WatchOptions {
        aggregate_timeout: raw
            .watch_options
            .aggregate_timeout
            .unwrap_or_else(default_aggregate_timeout),
        poll: match raw.watch_options.poll {
            Some(RawPoll::Enabled(true)) => Some(DEFAULT_POLL_INTERVAL_MS),
            Some(RawPoll::Enabled(false)) | None => None,
            Some(RawPoll::Interval(ms)) => Some(ms),
        },
        ignored: raw
            .watch_options
            .ignored
            .map(OneOrMany::into_vec)
            .unwrap_or_default(),
    };

    Ok(Options {
        name: raw.name,
        entry,
        context,
        output,
        module: ModuleOptions { rules },
        mode,
        devtool,
        watch: raw.watch,
        watch_options,
        plugins: raw
            .plugins
            .into_iter()
            .map(PluginDeclaration::from_value)
            .collect(),
        dependencies: raw.dependencies,
    })
}

fn normalize_entry(entry: Option<RawEntry>) -> EntryStatic {
    let mut normalized = IndexMap::new();
    match entry {
        None => {
            normalized.insert(
                DEFAULT_ENTRY_NAME.to_string(),
                EntryDescription {
                    import: vec![DEFAULT_ENTRY.to_string()],
                    filename: None,
                },
            );
        }
        Some(RawEntry::Import(import)) => {
            normalized.insert(
                DEFAULT_ENTRY_NAME.to_string(),
                EntryDescription {
                    import: import.into_vec(),
                    filename: None,
                },
            );
        }
        Some(RawEntry::Named(entries)) => {
            for (name, item) in entries {
                let description = match item {
                    RawEntryItem::Import(import) => EntryDescription {
                        import: import.into_vec(),
                        filename: None,
                    },
                    RawEntryItem::Descriptor { import, filename } => EntryDescription {
                        import: import.into_vec(),
                        filename,
                    },
                };
                normalized.insert(name, description);
            }
        }
    }
    normalized
}

fn absolutize(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        path.clean()
    } else {
        base.join(path).clean()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn normalizer() -> ConfigNormalizer {
        ConfigNormalizer::new().with_cwd("/project")
    }

    #[test]
    fn context_is_resolved_against_cwd() {
        let options = normalizer()
            .normalize(&json!({ "context": "./app/../web" }))
            .unwrap();
        assert_eq!(options.context, PathBuf::from("/project/web"));
    }

    #[test]
    fn named_entries_keep_declaration_order() {
        let options = normalizer()
            .normalize(&json!({
                "entry": {
                    "zeta": "./z.js",
                    "alpha": ["./a.js", "./b.js"],
                    "admin": { "import": "./admin.js", "filename": "admin.bundle.js" }
                }
            }))
            .unwrap();

        let names: Vec<&str> = options.entry.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["zeta", "alpha", "admin"]);
        assert_eq!(options.entry["alpha"].import, vec!["./a.js", "./b.js"]);
        assert_eq!(
            options.entry["admin"].filename.as_deref(),
            Some("admin.bundle.js")
        );
    }

    #[test]
    fn devtool_false_disables_source_maps() {
        let options = normalizer()
            .normalize(&json!({ "mode": "development", "devtool": false }))
            .unwrap();
        assert_eq!(options.devtool, None);
    }

    #[test]
    fn poll_true_uses_default_interval() {
        let options = normalizer()
            .normalize(&json!({ "watchOptions": { "poll": true, "ignored": "node_modules" } }))
            .unwrap();
        assert_eq!(options.watch_options.poll, Some(DEFAULT_POLL_INTERVAL_MS));
        assert_eq!(options.watch_options.ignored, vec!["node_modules"]);
    }

    #[test]
    fn normalize_many_reports_all_targets() {
        let err = normalizer()
            .normalize_many(&[json!({ "mode": "fast" }), json!({ "watch": 1 })])
            .unwrap_err();
        assert_eq!(err.violations().len(), 2);
    }
}
