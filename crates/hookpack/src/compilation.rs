//! Per-pass build state.
//!
//! A [`Compilation`] is created for every pass of a compiler. Plugins seed
//! it with entries during `make`, attach assets during `emit`, and read the
//! result from [`Stats`](crate::Stats) once the pass is done.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use hookpack_config::defaults::DEFAULT_ENTRY_NAME;
use hookpack_config::{Options, RuleSetRule};
use indexmap::IndexMap;
use parking_lot::RwLock;
use path_clean::PathClean;
use serde::Serialize;

use crate::{Error, Result};

/// Kind of a dependency, used to select the factory that turns it into a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DependencyKind(&'static str);

impl DependencyKind {
    /// Seed dependency created for a configured entry point.
    pub const ENTRY: DependencyKind = DependencyKind("entry");

    pub const fn new(kind: &'static str) -> Self {
        DependencyKind(kind)
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DependencyLocation {
    /// Entry name this dependency was declared under
    pub name: Option<String>,
}

/// A seed dependency for one entry point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryDependency {
    pub request: String,
    pub loc: DependencyLocation,
}

impl EntryDependency {
    pub fn new(request: impl Into<String>, name: Option<String>) -> Self {
        Self {
            request: request.into(),
            loc: DependencyLocation { name },
        }
    }

    pub fn kind(&self) -> DependencyKind {
        DependencyKind::ENTRY
    }
}

/// Entry descriptor attached to a seeded entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EntryDescriptor {
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

/// Options an entry is seeded with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryOptions {
    /// Bare entry name. Deprecated shorthand for a descriptor with only a name.
    Name(String),
    Descriptor(EntryDescriptor),
}

impl EntryOptions {
    pub fn name(&self) -> Option<&str> {
        match self {
            EntryOptions::Name(name) => Some(name),
            EntryOptions::Descriptor(descriptor) => descriptor.name.as_deref(),
        }
    }

    pub fn to_descriptor(&self) -> EntryDescriptor {
        match self {
            EntryOptions::Name(name) => EntryDescriptor {
                name: Some(name.clone()),
                filename: None,
            },
            EntryOptions::Descriptor(descriptor) => descriptor.clone(),
        }
    }
}

impl From<EntryDescriptor> for EntryOptions {
    fn from(descriptor: EntryDescriptor) -> Self {
        EntryOptions::Descriptor(descriptor)
    }
}

impl From<&str> for EntryOptions {
    fn from(name: &str) -> Self {
        EntryOptions::Name(name.to_string())
    }
}

/// Request handed to a [`ModuleFactory`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleRequest {
    pub context: PathBuf,
    pub request: String,
    pub dependency: DependencyKind,
}

/// A module produced from a dependency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Module {
    /// Resolved resource path
    pub identifier: String,
    pub request: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub loaders: Vec<String>,
}

/// Turns dependencies of one kind into modules.
#[async_trait]
pub trait ModuleFactory: Send + Sync {
    async fn create(&self, request: ModuleRequest) -> Result<Module>;
}

/// Default factory for entry and import requests.
///
/// Resolution is lexical: the request is joined onto the context and
/// cleaned, and every module rule whose pattern matches the resulting path
/// contributes its loaders.
#[derive(Debug, Clone, Default)]
pub struct NormalModuleFactory {
    rules: Vec<RuleSetRule>,
}

impl NormalModuleFactory {
    pub fn new(rules: Vec<RuleSetRule>) -> Self {
        Self { rules }
    }
}

#[async_trait]
impl ModuleFactory for NormalModuleFactory {
    async fn create(&self, request: ModuleRequest) -> Result<Module> {
        if request.request.trim().is_empty() {
            return Err(Error::ModuleNotFound {
                request: request.request,
                context: request.context,
            });
        }

        let resource = request.context.join(&request.request).clean();
        let identifier = resource.to_string_lossy().into_owned();
        let loaders = self
            .rules
            .iter()
            .filter(|rule| rule.matches(&identifier))
            .flat_map(|rule| rule.loaders.iter().cloned())
            .collect();

        Ok(Module {
            identifier,
            request: request.request,
            loaders,
        })
    }
}

/// Collaborators handed to `compilation` hook observers.
#[derive(Clone)]
pub struct CompilationParams {
    pub normal_module_factory: Arc<dyn ModuleFactory>,
}

impl fmt::Debug for CompilationParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompilationParams").finish_non_exhaustive()
    }
}

/// Dependencies seeded under one entry name.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EntryData {
    pub dependencies: Vec<EntryDependency>,
    pub options: EntryDescriptor,
}

pub struct Compilation {
    options: Arc<Options>,
    dependency_factories: RwLock<IndexMap<DependencyKind, Arc<dyn ModuleFactory>>>,
    entries: RwLock<IndexMap<String, EntryData>>,
    modules: RwLock<Vec<Module>>,
    assets: RwLock<IndexMap<String, Vec<u8>>>,
    errors: RwLock<Vec<String>>,
    warnings: RwLock<Vec<String>>,
}

impl Compilation {
    pub fn new(options: Arc<Options>) -> Self {
        Self {
            options,
            dependency_factories: RwLock::new(IndexMap::new()),
            entries: RwLock::new(IndexMap::new()),
            modules: RwLock::new(Vec::new()),
            assets: RwLock::new(IndexMap::new()),
            errors: RwLock::new(Vec::new()),
            warnings: RwLock::new(Vec::new()),
        }
    }

    pub fn options(&self) -> &Arc<Options> {
        &self.options
    }

    pub fn name(&self) -> Option<&str> {
        self.options.name.as_deref()
    }

    pub fn set_dependency_factory(&self, kind: DependencyKind, factory: Arc<dyn ModuleFactory>) {
        self.dependency_factories.write().insert(kind, factory);
    }

    pub fn dependency_factory(&self, kind: DependencyKind) -> Option<Arc<dyn ModuleFactory>> {
        self.dependency_factories.read().get(&kind).cloned()
    }

    /// Seed an entry and build its module.
    ///
    /// Fails with [`Error::MissingDependencyFactory`] when no factory was
    /// registered for the dependency's kind.
    pub async fn add_entry(
        &self,
        context: &Path,
        dependency: EntryDependency,
        options: EntryOptions,
    ) -> Result<()> {
        let kind = dependency.kind();
        let factory = self
            .dependency_factory(kind)
            .ok_or_else(|| Error::MissingDependencyFactory {
                kind: kind.to_string(),
            })?;

        let name = options.name().unwrap_or(DEFAULT_ENTRY_NAME).to_string();
        {
            let mut entries = self.entries.write();
            entries
                .entry(name.clone())
                .or_insert_with(|| EntryData {
                    dependencies: Vec::new(),
                    options: options.to_descriptor(),
                })
                .dependencies
                .push(dependency.clone());
        }

        let module = factory
            .create(ModuleRequest {
                context: context.to_path_buf(),
                request: dependency.request,
                dependency: kind,
            })
            .await?;

        tracing::debug!(entry = %name, module = %module.identifier, "added entry");
        self.modules.write().push(module);
        Ok(())
    }

    pub fn entries(&self) -> IndexMap<String, EntryData> {
        self.entries.read().clone()
    }

    /// Every seeded entry dependency, in seeding order.
    pub fn entry_dependencies(&self) -> Vec<EntryDependency> {
        self.entries
            .read()
            .values()
            .flat_map(|entry| entry.dependencies.iter().cloned())
            .collect()
    }

    pub fn modules(&self) -> Vec<Module> {
        self.modules.read().clone()
    }

    /// Attach an asset to be written during emit, replacing any asset with the same name.
    pub fn emit_asset(&self, name: impl Into<String>, content: impl Into<Vec<u8>>) {
        self.assets.write().insert(name.into(), content.into());
    }

    pub fn assets(&self) -> Vec<(String, Vec<u8>)> {
        self.assets
            .read()
            .iter()
            .map(|(name, content)| (name.clone(), content.clone()))
            .collect()
    }

    pub fn push_error(&self, message: impl Into<String>) {
        self.errors.write().push(message.into());
    }

    pub fn push_warning(&self, message: impl Into<String>) {
        self.warnings.write().push(message.into());
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.read().clone()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.warnings.read().clone()
    }
}

impl fmt::Debug for Compilation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Compilation")
            .field("name", &self.name())
            .field("entries", &self.entries.read().len())
            .field("modules", &self.modules.read().len())
            .field("assets", &self.assets.read().len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hookpack_config::ConfigNormalizer;
    use serde_json::json;

    fn compilation() -> Compilation {
        let options = ConfigNormalizer::new()
            .with_cwd("/project")
            .normalize(&json!({}))
            .unwrap();
        Compilation::new(Arc::new(options))
    }

    #[tokio::test]
    async fn add_entry_requires_a_factory() {
        let compilation = compilation();
        let err = compilation
            .add_entry(
                Path::new("/project"),
                EntryDependency::new("./a.js", Some("a".into())),
                "a".into(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, Error::MissingDependencyFactory { ref kind } if kind == "entry"));
    }

    #[tokio::test]
    async fn normal_module_factory_applies_matching_rules() {
        let factory = NormalModuleFactory::new(vec![
            RuleSetRule::new(r"\.ts$", vec!["ts-loader".into()]).unwrap(),
            RuleSetRule::new(r"\.css$", vec!["css-loader".into()]).unwrap(),
        ]);

        let module = factory
            .create(ModuleRequest {
                context: PathBuf::from("/project"),
                request: "./src/../lib/index.ts".into(),
                dependency: DependencyKind::ENTRY,
            })
            .await
            .unwrap();

        assert_eq!(module.identifier, "/project/lib/index.ts");
        assert_eq!(module.loaders, vec!["ts-loader"]);
    }

    #[test]
    fn assets_keep_insertion_order() {
        let compilation = compilation();
        compilation.emit_asset("b.js", "b");
        compilation.emit_asset("a.js", "a");
        compilation.emit_asset("b.js", "b2");

        let names: Vec<String> = compilation.assets().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["b.js", "a.js"]);
    }
}
