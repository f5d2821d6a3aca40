//! Plugins and the plugin applier.
//!
//! A plugin is either a plain function or an object implementing
//! [`CompilerPlugin`]. Applying a plugin lets it register observers on the
//! compiler's hooks or replace its collaborators.

pub mod entry;
pub mod entry_option;
pub mod environment;
pub mod registry;

use std::fmt;
use std::sync::Arc;

use hookpack_config::PluginDeclaration;

use crate::{Compiler, Result};
use registry::PluginRegistry;

/// A plugin object.
pub trait CompilerPlugin: Send + Sync {
    fn name(&self) -> &str;

    /// Register observers on `compiler`.
    fn apply(&self, compiler: &Compiler) -> Result<()>;
}

type PluginFn = Arc<dyn Fn(&Compiler) -> Result<()> + Send + Sync>;

#[derive(Clone)]
pub enum Plugin {
    /// Called with the compiler.
    Function(PluginFn),
    /// Its `apply` is called with the compiler.
    Object(Arc<dyn CompilerPlugin>),
}

impl Plugin {
    pub fn function(f: impl Fn(&Compiler) -> Result<()> + Send + Sync + 'static) -> Self {
        Plugin::Function(Arc::new(f))
    }

    pub fn object(plugin: impl CompilerPlugin + 'static) -> Self {
        Plugin::Object(Arc::new(plugin))
    }

    pub fn name(&self) -> &str {
        match self {
            Plugin::Function(_) => "<function>",
            Plugin::Object(plugin) => plugin.name(),
        }
    }

    pub fn apply(&self, compiler: &Compiler) -> Result<()> {
        match self {
            Plugin::Function(f) => f(compiler),
            Plugin::Object(plugin) => plugin.apply(compiler),
        }
    }
}

impl fmt::Debug for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Plugin::Function(_) => f.write_str("Plugin::Function"),
            Plugin::Object(plugin) => write!(f, "Plugin::Object({})", plugin.name()),
        }
    }
}

/// Apply declared plugins, in list order, followed by in-code plugins.
///
/// Every declaration is resolved through `registry` before any plugin is
/// applied, so an invalid declaration leaves the compiler untouched.
pub fn apply_plugins(
    compiler: &Compiler,
    declared: &[PluginDeclaration],
    plugins: &[Plugin],
    registry: &PluginRegistry,
) -> Result<()> {
    let mut resolved = Vec::with_capacity(declared.len() + plugins.len());
    for (index, declaration) in declared.iter().enumerate() {
        resolved.push(registry.resolve(declaration, index)?);
    }
    resolved.extend(plugins.iter().cloned());

    for plugin in &resolved {
        tracing::debug!(plugin = plugin.name(), compiler = ?compiler.name(), "applying plugin");
        plugin.apply(compiler)?;
    }
    Ok(())
}
