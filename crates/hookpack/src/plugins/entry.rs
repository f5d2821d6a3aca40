//! Seeds the dependency graph with one entry point.

use std::path::PathBuf;

use serde::Deserialize;
use serde_json::Value;

use super::{CompilerPlugin, Plugin};
use crate::compilation::{DependencyKind, EntryDependency, EntryDescriptor, EntryOptions};
use crate::deprecation::{ENTRY_NAME_OPTIONS, deprecate};
use crate::{Compiler, Error, Result};

const PLUGIN_NAME: &str = "EntryPlugin";

/// Adds `entry` to every compilation of the compiler it is applied to.
///
/// On `compilation` it maps entry dependencies to the compiler's normal
/// module factory; on `make` it seeds the entry and waits for its module.
#[derive(Debug, Clone)]
pub struct EntryPlugin {
    context: Option<PathBuf>,
    entry: String,
    options: EntryOptions,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DeclaredEntry {
    entry: String,
    #[serde(default)]
    context: Option<PathBuf>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    filename: Option<String>,
}

impl EntryPlugin {
    /// A bare name as `options` is accepted but deprecated.
    pub fn new(
        context: impl Into<PathBuf>,
        entry: impl Into<String>,
        options: impl Into<EntryOptions>,
    ) -> Self {
        let options = options.into();
        if let EntryOptions::Name(_) = options {
            deprecate(
                ENTRY_NAME_OPTIONS,
                "EntryPlugin options given as a name are deprecated; pass an EntryDescriptor with the name instead",
            );
        }
        Self {
            context: Some(context.into()),
            entry: entry.into(),
            options,
        }
    }

    /// The dependency seeded for `entry`, located under the entry's name.
    pub fn create_dependency(entry: &str, options: &EntryOptions) -> EntryDependency {
        EntryDependency::new(entry, options.name().map(str::to_string))
    }

    /// Factory for `{ "name": "entry", "options": { "entry": .., "name": .. } }` declarations.
    ///
    /// Without a `context` the entry resolves against the compiler's context.
    pub(crate) fn from_declaration(options: &Value) -> Result<Plugin> {
        let declared: DeclaredEntry = serde_json::from_value(options.clone())
            .map_err(|e| Error::plugin(PLUGIN_NAME, e.to_string()))?;

        Ok(Plugin::object(Self {
            context: declared.context,
            entry: declared.entry,
            options: EntryOptions::Descriptor(EntryDescriptor {
                name: declared.name,
                filename: declared.filename,
            }),
        }))
    }
}

impl CompilerPlugin for EntryPlugin {
    fn name(&self) -> &str {
        PLUGIN_NAME
    }

    fn apply(&self, compiler: &Compiler) -> Result<()> {
        compiler
            .hooks
            .compilation
            .tap(PLUGIN_NAME, |(compilation, params)| {
                compilation.set_dependency_factory(
                    DependencyKind::ENTRY,
                    params.normal_module_factory.clone(),
                );
            });

        let context = match &self.context {
            Some(context) if context.is_absolute() => context.clone(),
            Some(context) => compiler.context().join(context),
            None => compiler.context().to_path_buf(),
        };
        let entry = self.entry.clone();
        let options = self.options.clone();

        compiler.hooks.make.tap_async(PLUGIN_NAME, move |compilation| {
            let context = context.clone();
            let dependency = Self::create_dependency(&entry, &options);
            let options = options.clone();
            async move { compilation.add_entry(&context, dependency, options).await }
        });

        Ok(())
    }
}
