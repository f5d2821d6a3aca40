//! Top-level build entry points.
//!
//! [`build`] constructs a compiler (or a multi-compiler for an array of
//! configurations) and either hands it back untouched or drives it to
//! completion, reporting through a callback.
//!
//! Construction applies, in order: the native environment plugin, the
//! plugins declared in the configuration, the in-code plugins, the
//! `environment` and `afterEnvironment` hooks, the entry plugins and the
//! `initialize` hook.

use std::sync::Arc;

use hookpack_config::{ConfigNormalizer, Options, WatchOptions};
use serde_json::Value;

use crate::compiler::{Compiler, Watching};
use crate::deprecation::{WATCH_WITHOUT_CALLBACK, deprecate};
use crate::multi::{MultiCompiler, MultiWatching};
use crate::plugins::entry_option::EntryOptionPlugin;
use crate::plugins::environment::NativeEnvironmentPlugin;
use crate::plugins::registry::PluginRegistry;
use crate::plugins::{CompilerPlugin, Plugin, apply_plugins};
use crate::stats::{MultiStats, Stats};
use crate::Result;

/// One raw configuration together with plugins supplied in code.
#[derive(Debug, Clone)]
pub struct RawOptions {
    value: Value,
    plugins: Vec<Plugin>,
}

impl RawOptions {
    pub fn new(value: Value) -> Self {
        Self {
            value,
            plugins: Vec::new(),
        }
    }

    /// Add an in-code plugin; in-code plugins apply after declared ones.
    pub fn plugin(mut self, plugin: Plugin) -> Self {
        self.plugins.push(plugin);
        self
    }

    pub fn value(&self) -> &Value {
        &self.value
    }
}

impl From<Value> for RawOptions {
    fn from(value: Value) -> Self {
        RawOptions::new(value)
    }
}

/// A single-target or multi-target configuration.
#[derive(Debug, Clone)]
pub enum Config {
    Single(RawOptions),
    Multi(Vec<RawOptions>),
}

impl Config {
    /// An array is a multi-target configuration, anything else a single target.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Array(items) => Config::Multi(items.into_iter().map(RawOptions::new).collect()),
            other => Config::Single(RawOptions::new(other)),
        }
    }
}

impl From<Value> for Config {
    fn from(value: Value) -> Self {
        Config::from_value(value)
    }
}

impl From<RawOptions> for Config {
    fn from(raw: RawOptions) -> Self {
        Config::Single(raw)
    }
}

impl From<Vec<RawOptions>> for Config {
    fn from(raws: Vec<RawOptions>) -> Self {
        Config::Multi(raws)
    }
}

/// A constructed compiler or multi-compiler.
#[derive(Debug, Clone)]
pub enum BuildHandle {
    Single(Arc<Compiler>),
    Multi(Arc<MultiCompiler>),
}

/// Results delivered by a [`BuildHandle`].
#[derive(Debug, Clone)]
pub enum BuildStats {
    Single(Stats),
    Multi(MultiStats),
}

impl BuildStats {
    pub fn has_errors(&self) -> bool {
        match self {
            BuildStats::Single(stats) => stats.has_errors(),
            BuildStats::Multi(stats) => stats.has_errors(),
        }
    }

    /// Per-target stats, in declaration order.
    pub fn children(&self) -> Vec<&Stats> {
        match self {
            BuildStats::Single(stats) => vec![stats],
            BuildStats::Multi(stats) => stats.children().iter().collect(),
        }
    }
}

/// Watch session started through a [`BuildHandle`].
#[derive(Debug, Clone)]
pub enum WatchHandle {
    Single(Watching),
    Multi(MultiWatching),
}

impl WatchHandle {
    pub async fn close(&self) {
        match self {
            WatchHandle::Single(watching) => watching.close().await,
            WatchHandle::Multi(watching) => watching.close().await,
        }
    }
}

impl BuildHandle {
    pub fn as_compiler(&self) -> Option<&Arc<Compiler>> {
        match self {
            BuildHandle::Single(compiler) => Some(compiler),
            BuildHandle::Multi(_) => None,
        }
    }

    pub fn as_multi(&self) -> Option<&Arc<MultiCompiler>> {
        match self {
            BuildHandle::Single(_) => None,
            BuildHandle::Multi(multi) => Some(multi),
        }
    }

    pub fn compilers(&self) -> Vec<Arc<Compiler>> {
        match self {
            BuildHandle::Single(compiler) => vec![compiler.clone()],
            BuildHandle::Multi(multi) => multi.compilers().to_vec(),
        }
    }

    /// Whether any target has `watch` enabled.
    pub fn wants_watch(&self) -> bool {
        self.compilers().iter().any(|c| c.options().watch)
    }

    /// Configured watch options per target.
    pub fn watch_options(&self) -> Vec<WatchOptions> {
        self.compilers()
            .iter()
            .map(|c| c.options().watch_options.clone())
            .collect()
    }

    pub async fn run(&self) -> Result<BuildStats> {
        match self {
            BuildHandle::Single(compiler) => compiler.run().await.map(BuildStats::Single),
            BuildHandle::Multi(multi) => multi.run().await.map(BuildStats::Multi),
        }
    }

    /// Start watching; `options` holds one entry per target.
    pub fn watch<F>(&self, options: Vec<WatchOptions>, mut handler: F) -> WatchHandle
    where
        F: FnMut(Result<BuildStats>) + Send + 'static,
    {
        match self {
            BuildHandle::Single(compiler) => {
                let options = options.into_iter().next().unwrap_or_default();
                WatchHandle::Single(compiler.watch(options, move |result| {
                    handler(result.map(BuildStats::Single))
                }))
            }
            BuildHandle::Multi(multi) => WatchHandle::Multi(
                multi.watch(options, move |result| handler(result.map(BuildStats::Multi))),
            ),
        }
    }

    pub async fn close(&self) -> Result<()> {
        match self {
            BuildHandle::Single(compiler) => compiler.close().await,
            BuildHandle::Multi(multi) => multi.close().await,
        }
    }
}

/// Receives the outcome of a build started with a callback.
pub type BuildCallback = Box<dyn FnMut(Result<BuildStats>) + Send + 'static>;

/// Construct a compiler from one raw configuration.
pub fn create_compiler(raw: RawOptions) -> Result<Arc<Compiler>> {
    let options = ConfigNormalizer::new().normalize(&raw.value)?;
    assemble(options, &raw.plugins)
}

/// Construct a multi-compiler; all targets are validated before any is built.
pub fn create_multi_compiler(raws: Vec<RawOptions>) -> Result<MultiCompiler> {
    let values: Vec<Value> = raws.iter().map(|raw| raw.value.clone()).collect();
    let options = ConfigNormalizer::new().normalize_many(&values)?;

    let compilers = options
        .into_iter()
        .zip(&raws)
        .map(|(options, raw)| assemble(options, &raw.plugins))
        .collect::<Result<Vec<_>>>()?;

    let mut multi = MultiCompiler::new(compilers);
    for index in 0..multi.len() {
        let dependencies = multi.compilers()[index].options().dependencies.clone();
        if !dependencies.is_empty() {
            multi.set_dependencies(index, &dependencies)?;
        }
    }
    multi.validate_dependencies()?;
    Ok(multi)
}

fn assemble(options: Options, plugins: &[Plugin]) -> Result<Arc<Compiler>> {
    let compiler = Compiler::new(options);
    NativeEnvironmentPlugin.apply(&compiler)?;

    let declared = compiler.options().plugins.clone();
    apply_plugins(&compiler, &declared, plugins, PluginRegistry::global())?;

    compiler.hooks.environment.call(&());
    compiler.hooks.after_environment.call(&());
    EntryOptionPlugin.apply(&compiler)?;
    compiler.hooks.initialize.call(&());

    tracing::debug!(compiler = ?compiler.name(), context = %compiler.context().display(), "compiler created");
    Ok(Arc::new(compiler))
}

fn create(config: Config) -> Result<BuildHandle> {
    match config {
        Config::Single(raw) => create_compiler(raw).map(BuildHandle::Single),
        Config::Multi(raws) => create_multi_compiler(raws).map(|m| BuildHandle::Multi(Arc::new(m))),
    }
}

/// Construct and, when a callback is given, drive a build.
///
/// See [`build_with_callback`] and [`build_sync`].
pub fn build(
    config: impl Into<Config>,
    callback: Option<BuildCallback>,
) -> Result<Option<BuildHandle>> {
    match callback {
        Some(callback) => Ok(build_with_callback(config, callback)),
        None => build_sync(config).map(Some),
    }
}

/// Construct a build and drive it, reporting through `callback`.
///
/// Construction errors are delivered on a newly spawned task, never before
/// this function returns, and `None` is returned. When any target enables
/// `watch` a watch session starts; otherwise the build runs once, closes,
/// and the callback receives the run error, else the close error, else the
/// stats. Must be called inside a tokio runtime.
pub fn build_with_callback<F>(config: impl Into<Config>, mut callback: F) -> Option<BuildHandle>
where
    F: FnMut(Result<BuildStats>) + Send + 'static,
{
    let handle = match create(config.into()) {
        Ok(handle) => handle,
        Err(err) => {
            tracing::debug!(error = %err, "construction failed");
            tokio::spawn(async move { callback(Err(err)) });
            return None;
        }
    };

    if handle.wants_watch() {
        handle.watch(handle.watch_options(), callback);
    } else {
        let runner = handle.clone();
        tokio::spawn(async move {
            let run = runner.run().await;
            let close = runner.close().await;
            callback(finish(run, close));
        });
    }

    Some(handle)
}

fn finish(run: Result<BuildStats>, close: Result<()>) -> Result<BuildStats> {
    match (run, close) {
        (Err(err), close) => {
            if let Err(close_err) = close {
                tracing::debug!(error = %close_err, "close failed after a failed run");
            }
            Err(err)
        }
        (Ok(_), Err(err)) => Err(err),
        (Ok(stats), Ok(())) => Ok(stats),
    }
}

/// Construct a build without starting it.
///
/// Construction errors are returned. A configuration enabling `watch`
/// cannot be honored without a callback: a deprecation warning is logged
/// once per process and the idle handle is returned.
pub fn build_sync(config: impl Into<Config>) -> Result<BuildHandle> {
    let handle = create(config.into())?;
    if handle.wants_watch() {
        deprecate(
            WATCH_WITHOUT_CALLBACK,
            "A callback must be provided when the 'watch' option is set; without one the 'watch' option is ignored",
        );
    }
    Ok(handle)
}
