//! Configuration file discovery and layering.
//!
//! Priority: command-line flags > `HOOKPACK_*` environment variables >
//! configuration file. A file holding an array describes several targets;
//! the overrides apply to each of them.

use std::path::{Path, PathBuf};

use anyhow::Context;
use figment::Figment;
use figment::providers::{Env, Serialized};
use serde::Serialize;
use serde_json::{Value, json};

use crate::cli::BuildArgs;
use crate::error::{CliError, Result};

/// File names looked up in the working directory, in order.
pub const CONFIG_FILES: [&str; 2] = ["hookpack.config.json", "hookpack.config.toml"];

const ENV_PREFIX: &str = "HOOKPACK_";

/// Top-level keys that can be set from the environment.
const ENV_KEYS: &[&str] = &["name", "mode", "context", "devtool", "watch"];

/// Values given on the command line.
#[derive(Debug, Default, Clone, Serialize)]
pub struct Overrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<PathBuf>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub watch: bool,
}

impl Overrides {
    pub fn from_build_args(args: &BuildArgs) -> Self {
        Self {
            mode: args.mode.map(|mode| mode.as_str().to_string()),
            entry: (!args.entry.is_empty()).then(|| args.entry.clone()),
            context: args.context.clone(),
            watch: args.watch,
        }
    }
}

/// A loaded configuration and the file it came from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub path: Option<PathBuf>,
    pub value: Value,
}

impl LoadedConfig {
    pub fn target_count(&self) -> usize {
        match &self.value {
            Value::Array(targets) => targets.len(),
            _ => 1,
        }
    }
}

/// Find the configuration file: `explicit` must exist, otherwise the first
/// of [`CONFIG_FILES`] present in `cwd`, if any.
pub fn discover(explicit: Option<&Path>, cwd: &Path) -> Result<Option<PathBuf>> {
    match explicit {
        Some(path) => {
            let path = cwd.join(path);
            if path.is_file() {
                Ok(Some(path))
            } else {
                Err(CliError::ConfigNotFound(path))
            }
        }
        None => Ok(CONFIG_FILES
            .iter()
            .map(|name| cwd.join(name))
            .find(|path| path.is_file())),
    }
}

/// Parse a JSON or TOML (by extension) configuration file.
pub fn read_file(path: &Path) -> Result<Value> {
    let source = std::fs::read_to_string(path)?;
    let parsed = match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => toml::from_str::<Value>(&source).map_err(|e| e.to_string()),
        _ => serde_json::from_str::<Value>(&source).map_err(|e| e.to_string()),
    };
    parsed.map_err(|message| CliError::ConfigLoad {
        path: path.to_path_buf(),
        message,
    })
}

/// Load the configuration seen from `cwd` and layer environment and
/// command-line overrides onto every target.
pub fn load(explicit: Option<&Path>, cwd: &Path, overrides: &Overrides) -> Result<LoadedConfig> {
    let path = discover(explicit, cwd)?;
    let raw = match &path {
        Some(path) => read_file(path)?,
        None => json!({}),
    };

    let layered = match raw {
        Value::Array(targets) => targets
            .into_iter()
            .map(|target| layer(target, overrides))
            .collect::<anyhow::Result<Vec<_>>>()
            .map(Value::Array),
        target => layer(target, overrides),
    };
    let value = layered.map_err(|e| CliError::ConfigLoad {
        path: path.clone().unwrap_or_else(|| cwd.to_path_buf()),
        message: format!("{e:#}"),
    })?;

    tracing::debug!(path = ?path, targets = value.as_array().map_or(1, Vec::len), "loaded configuration");
    Ok(LoadedConfig { path, value })
}

fn layer(target: Value, overrides: &Overrides) -> anyhow::Result<Value> {
    // Non-objects are left for the schema to report
    if !target.is_object() {
        return Ok(target);
    }
    Figment::from(Serialized::defaults(target))
        .merge(Env::prefixed(ENV_PREFIX).only(ENV_KEYS))
        .merge(Serialized::defaults(overrides))
        .extract::<Value>()
        .context("applying environment and command-line overrides")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn json_is_preferred_over_toml() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("hookpack.config.toml"), "mode = \"none\"").unwrap();
        std::fs::write(dir.path().join("hookpack.config.json"), "{}").unwrap();

        let found = discover(None, dir.path()).unwrap();
        assert_eq!(found, Some(dir.path().join("hookpack.config.json")));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = discover(Some(Path::new("missing.json")), dir.path()).unwrap_err();
        assert!(matches!(err, CliError::ConfigNotFound(ref path) if path.ends_with("missing.json")));
    }

    #[test]
    fn no_file_means_an_empty_configuration() {
        let dir = TempDir::new().unwrap();
        let loaded = load(None, dir.path(), &Overrides::default()).unwrap();
        assert_eq!(loaded.path, None);
        assert_eq!(loaded.target_count(), 1);
    }

    #[test]
    fn toml_files_are_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hookpack.config.toml");
        std::fs::write(
            &path,
            "entry = \"./src/main.js\"\n\n[output]\npath = \"build\"\n",
        )
        .unwrap();

        let value = read_file(&path).unwrap();
        assert_eq!(value["entry"], "./src/main.js");
        assert_eq!(value["output"]["path"], "build");
    }

    #[test]
    fn malformed_json_reports_the_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hookpack.config.json");
        std::fs::write(&path, "{ \"entry\": ").unwrap();

        let err = read_file(&path).unwrap_err();
        assert!(matches!(err, CliError::ConfigLoad { path: ref p, .. } if *p == path));
    }

    #[test]
    fn command_line_overrides_every_target() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("hookpack.config.json"),
            r#"[
                { "name": "client", "entry": { "app": "./src/app.js" }, "mode": "development" },
                { "name": "server", "entry": "./src/server.js" }
            ]"#,
        )
        .unwrap();

        let overrides = Overrides {
            mode: Some("production".into()),
            entry: Some(vec!["./src/only.js".into()]),
            ..Overrides::default()
        };
        let loaded = load(None, dir.path(), &overrides).unwrap();

        assert_eq!(loaded.target_count(), 2);
        for target in loaded.value.as_array().unwrap() {
            assert_eq!(target["mode"], "production");
            assert_eq!(target["entry"], json!(["./src/only.js"]));
        }
        assert_eq!(loaded.value[0]["name"], "client");
    }
}
