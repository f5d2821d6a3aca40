//! Name-based plugin lookup for plugins declared in configuration files.

use std::sync::Arc;

use hookpack_config::PluginDeclaration;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde_json::Value;

use super::Plugin;
use super::entry::EntryPlugin;
use crate::{Error, Result};

/// Builds a plugin from the `options` of its declaration.
pub type PluginFactory = Arc<dyn Fn(&Value) -> Result<Plugin> + Send + Sync>;

static GLOBAL: Lazy<PluginRegistry> = Lazy::new(|| {
    let registry = PluginRegistry::new();
    registry.register("entry", EntryPlugin::from_declaration);
    registry
});

/// Registered plugin factories by name.
#[derive(Default)]
pub struct PluginRegistry {
    factories: RwLock<IndexMap<String, PluginFactory>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide registry consulted when compilers are constructed.
    pub fn global() -> &'static PluginRegistry {
        &GLOBAL
    }

    /// Register a factory, replacing and returning any factory with the same name.
    pub fn register(
        &self,
        name: impl Into<String>,
        factory: impl Fn(&Value) -> Result<Plugin> + Send + Sync + 'static,
    ) -> Option<PluginFactory> {
        self.factories
            .write()
            .insert(name.into(), Arc::new(factory))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.read().contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.factories.read().keys().cloned().collect()
    }

    /// Turn the declaration at `index` of a `plugins` list into a plugin.
    pub fn resolve(&self, declaration: &PluginDeclaration, index: usize) -> Result<Plugin> {
        match declaration {
            PluginDeclaration::Named { name, options } => {
                let factory = self.factories.read().get(name).cloned();
                match factory {
                    Some(factory) => factory(options),
                    None => Err(Error::InvalidPlugin {
                        index,
                        reason: format!("no plugin named '{name}' is registered"),
                    }),
                }
            }
            PluginDeclaration::Unrecognized(value) => Err(Error::InvalidPlugin {
                index,
                reason: format!(
                    "expected a plugin name or an object with a \"name\" field, got {}",
                    describe(value)
                ),
            }),
        }
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object without a name",
    }
}
