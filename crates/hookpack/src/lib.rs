//! # hookpack
//!
//! Hook-driven compiler construction and build lifecycle orchestration.
//!
//! A [`Compiler`] owns a fixed set of named lifecycle hooks. Everything a
//! build does is contributed by plugins observing those hooks; the compiler
//! itself only sequences them. [`build`] is the top-level entry point: it
//! normalizes a configuration, constructs a compiler (or a
//! [`MultiCompiler`] for an array of configurations) and, when a callback is
//! supplied, drives it through a single run or a watch session.
//!
//! ## Quick Start
//!
//! ```no_run
//! use hookpack::{BuildStats, build_with_callback};
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
//! build_with_callback(json!({ "entry": "./src/index.js" }), move |result| {
//!     let _ = tx.send(result);
//! });
//!
//! if let Some(Ok(BuildStats::Single(stats))) = rx.recv().await {
//!     println!("seeded {} entries", stats.compilation().entry_dependencies().len());
//! }
//! # }
//! ```
//!
//! ### Manual driving
//!
//! ```no_run
//! use hookpack::{Plugin, RawOptions, create_compiler};
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> hookpack::Result<()> {
//! let compiler = create_compiler(
//!     RawOptions::new(json!({ "entry": "./src/index.js" })).plugin(Plugin::function(|compiler| {
//!         compiler.hooks.done.tap("log", |stats| {
//!             println!("built in {:?}", stats.duration());
//!             Ok(())
//!         });
//!         Ok(())
//!     })),
//! )?;
//!
//! compiler.run().await?;
//! compiler.close().await?;
//! # Ok(()) }
//! ```

use std::path::PathBuf;

pub mod compilation;
pub mod compiler;
pub mod deprecation;
pub mod hooks;
pub mod lifecycle;
pub mod multi;
pub mod output;
pub mod plugins;
pub mod stats;
pub mod watch;

pub use compilation::{
    Compilation, CompilationParams, DependencyKind, DependencyLocation, EntryData,
    EntryDependency, EntryDescriptor, EntryOptions, Module, ModuleFactory, ModuleRequest,
    NormalModuleFactory,
};
pub use compiler::{Compiler, CompilerHooks, CompilerState, HookName, Watching};
pub use hooks::{AsyncSeriesHook, CallMode, Hook, NamedTap, SyncBailHook, SyncHook, TapInfo};
pub use lifecycle::{
    BuildCallback, BuildHandle, BuildStats, Config, RawOptions, WatchHandle, build,
    build_sync, build_with_callback, create_compiler, create_multi_compiler,
};
pub use multi::{MultiCompiler, MultiWatching};
pub use output::{MemoryOutputFileSystem, NativeOutputFileSystem, OutputFileSystem};
pub use plugins::entry::EntryPlugin;
pub use plugins::entry_option::EntryOptionPlugin;
pub use plugins::environment::NativeEnvironmentPlugin;
pub use plugins::registry::{PluginFactory, PluginRegistry};
pub use plugins::{CompilerPlugin, Plugin, apply_plugins};
pub use stats::{AssetSummary, MultiStats, Stats, StatsJson};
pub use watch::{FileChange, NotifyWatchFileSystem, WatchFileSystem, WatchSubscription};

// Re-export configuration types used throughout the public API
pub use hookpack_config::{
    ConfigError, ConfigNormalizer, Mode, Options, PluginDeclaration, SchemaViolation,
    WatchOptions,
};

/// Error types for hookpack operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration failed schema validation or could not be read.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A declared plugin is neither a registered plugin reference nor a plugin value.
    #[error("Invalid plugin at position {index}: {reason}")]
    InvalidPlugin { index: usize, reason: String },

    /// Compilers of a multi-target build depend on each other in a loop.
    #[error("Cyclic dependency between compilers: {}", .cycle.join(" -> "))]
    CyclicDependency { cycle: Vec<String> },

    /// A compiler names a dependency that no sibling compiler provides.
    #[error("Compiler '{compiler}' depends on unknown compiler '{dependency}'")]
    UnknownDependency { compiler: String, dependency: String },

    /// A compiler depends on a name shared by several sibling compilers.
    #[error("Compiler '{compiler}' depends on '{dependency}', but several compilers are named '{dependency}'")]
    AmbiguousDependency { compiler: String, dependency: String },

    /// Observer registration on a hook the compiler does not declare.
    #[error("Unknown hook '{0}'")]
    UnknownHook(String),

    /// Asynchronous observer registration on a synchronous hook.
    #[error("Hook '{hook}' is synchronous and cannot take the asynchronous observer '{observer}'")]
    HookMode { hook: String, observer: String },

    /// A run was requested while another pass is in flight.
    #[error("Compiler is already running; a new run can only start once the current one has finished")]
    ConcurrentRun,

    /// The compiler was closed and accepts no further runs.
    #[error("Compiler has been closed")]
    ClosedCompiler,

    /// No watch file system was attached to the compiler.
    #[error("No watch file system is attached to the compiler")]
    WatchUnavailable,

    /// The compilation has no factory for a dependency kind.
    #[error("No dependency factory registered for {kind} dependencies")]
    MissingDependencyFactory { kind: String },

    /// A module request could not be resolved.
    #[error("Module not found: '{request}' (context: {})", .context.display())]
    ModuleNotFound { request: String, context: PathBuf },

    /// An asset name would escape the output directory.
    #[error("Invalid asset path: {0}")]
    InvalidAssetPath(String),

    /// A plugin reported a failure.
    #[error("Plugin '{plugin}' failed: {message}")]
    Plugin { plugin: String, message: String },

    /// File watcher error.
    #[error("File watcher error: {0}")]
    Watch(#[from] notify::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for hookpack operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a plugin failure.
    pub fn plugin(plugin: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Plugin {
            plugin: plugin.into(),
            message: message.into(),
        }
    }

    /// Whether this error was raised while constructing a compiler.
    pub fn is_construction_error(&self) -> bool {
        matches!(
            self,
            Error::Config(_)
                | Error::InvalidPlugin { .. }
                | Error::CyclicDependency { .. }
                | Error::UnknownDependency { .. }
                | Error::AmbiguousDependency { .. }
        )
    }
}

impl miette::Diagnostic for Error {
    fn code(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        Some(Box::new(match self {
            Error::Config(ConfigError::SchemaValidation { .. }) => "SCHEMA_VALIDATION",
            Error::Config(ConfigError::InvalidValue { .. }) => "INVALID_CONFIG",
            Error::InvalidPlugin { .. } => "INVALID_PLUGIN",
            Error::CyclicDependency { .. } => "CYCLIC_DEPENDENCY",
            Error::UnknownDependency { .. } => "UNKNOWN_DEPENDENCY",
            Error::AmbiguousDependency { .. } => "AMBIGUOUS_DEPENDENCY",
            Error::UnknownHook(_) => "UNKNOWN_HOOK",
            Error::HookMode { .. } => "HOOK_MODE",
            Error::ConcurrentRun => "CONCURRENT_RUN",
            Error::ClosedCompiler => "CLOSED_COMPILER",
            Error::WatchUnavailable => "WATCH_UNAVAILABLE",
            Error::MissingDependencyFactory { .. } => "MISSING_DEPENDENCY_FACTORY",
            Error::ModuleNotFound { .. } => "MODULE_NOT_FOUND",
            Error::InvalidAssetPath(_) => "INVALID_ASSET_PATH",
            Error::Plugin { .. } => "PLUGIN_ERROR",
            Error::Watch(_) => "WATCH_ERROR",
            Error::Io(_) => "IO_ERROR",
        }))
    }

    fn severity(&self) -> Option<miette::Severity> {
        Some(miette::Severity::Error)
    }

    fn help(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        match self {
            Error::Config(ConfigError::SchemaValidation { violations }) => Some(Box::new(format!(
                "Fix the following fields of your configuration:\n{}",
                violations
                    .iter()
                    .map(|v| format!("  - {v}"))
                    .collect::<Vec<_>>()
                    .join("\n")
            ))),
            Error::InvalidPlugin { .. } => Some(Box::new(
                "Plugins in a configuration file must be a registered plugin name or a { \"name\": .., \"options\": .. } object.",
            )),
            Error::CyclicDependency { .. } => Some(Box::new(
                "Remove one of the 'dependencies' entries so the targets can be ordered.",
            )),
            Error::UnknownDependency { dependency, .. } => Some(Box::new(format!(
                "Give one of the targets the name '{dependency}' or remove it from 'dependencies'."
            ))),
            Error::AmbiguousDependency { dependency, .. } => Some(Box::new(format!(
                "Give the targets named '{dependency}' distinct names so the dependency is unambiguous."
            ))),
            Error::ConcurrentRun => Some(Box::new(
                "Wait for the current run to complete, or close the watcher before running again.",
            )),
            Error::ClosedCompiler => Some(Box::new(
                "Create a new compiler; a closed compiler cannot be reused.",
            )),
            Error::InvalidAssetPath(path) => Some(Box::new(format!(
                "The asset '{path}' must stay inside the output directory and cannot contain '..' components."
            ))),
            _ => None,
        }
    }
}
