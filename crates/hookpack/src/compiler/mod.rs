//! The compiler: hook owner and pass sequencer.

mod hooks;
mod watching;

use std::fmt;
use std::path::{Component, Path};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use hookpack_config::{Options, WatchOptions};
use parking_lot::{Mutex, RwLock};

use crate::compilation::{Compilation, CompilationParams, ModuleFactory, NormalModuleFactory};
use crate::output::{MemoryOutputFileSystem, OutputFileSystem};
use crate::stats::Stats;
use crate::watch::WatchFileSystem;
use crate::{Error, Result};

pub use hooks::{CompilerHooks, HookName};
pub use watching::Watching;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompilerState {
    Idle,
    /// A pass is in flight
    Running,
    /// A watch session is active and waiting for changes
    Watching,
    /// Terminal
    Closed,
}

/// Owns the lifecycle hooks and drives passes through them.
///
/// Compilers are shared as `Arc<Compiler>`: run and watch observers receive
/// the compiler itself, and a watch session keeps it alive until closed.
pub struct Compiler {
    pub hooks: CompilerHooks,
    options: Arc<Options>,
    state: Mutex<CompilerState>,
    closed: AtomicBool,
    pass_lock: tokio::sync::Mutex<()>,
    watching: Mutex<Option<Watching>>,
    module_factory: RwLock<Arc<dyn ModuleFactory>>,
    output_file_system: RwLock<Arc<dyn OutputFileSystem>>,
    watch_file_system: RwLock<Option<Arc<dyn WatchFileSystem>>>,
}

impl Compiler {
    /// Create an idle compiler with no observers.
    ///
    /// Assets go to an in-memory file system and no watch file system is
    /// attached until a plugin provides one.
    pub fn new(options: Options) -> Self {
        let options = Arc::new(options);
        let module_factory: Arc<dyn ModuleFactory> =
            Arc::new(NormalModuleFactory::new(options.module.rules.clone()));

        Self {
            hooks: CompilerHooks::new(),
            options,
            state: Mutex::new(CompilerState::Idle),
            closed: AtomicBool::new(false),
            pass_lock: tokio::sync::Mutex::new(()),
            watching: Mutex::new(None),
            module_factory: RwLock::new(module_factory),
            output_file_system: RwLock::new(Arc::new(MemoryOutputFileSystem::new())),
            watch_file_system: RwLock::new(None),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.options.name.as_deref()
    }

    pub fn options(&self) -> &Arc<Options> {
        &self.options
    }

    pub fn context(&self) -> &Path {
        &self.options.context
    }

    pub fn state(&self) -> CompilerState {
        *self.state.lock()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn module_factory(&self) -> Arc<dyn ModuleFactory> {
        self.module_factory.read().clone()
    }

    pub fn set_module_factory(&self, factory: Arc<dyn ModuleFactory>) {
        *self.module_factory.write() = factory;
    }

    pub fn output_file_system(&self) -> Arc<dyn OutputFileSystem> {
        self.output_file_system.read().clone()
    }

    pub fn set_output_file_system(&self, fs: Arc<dyn OutputFileSystem>) {
        *self.output_file_system.write() = fs;
    }

    pub fn watch_file_system(&self) -> Option<Arc<dyn WatchFileSystem>> {
        self.watch_file_system.read().clone()
    }

    pub fn set_watch_file_system(&self, fs: Arc<dyn WatchFileSystem>) {
        *self.watch_file_system.write() = Some(fs);
    }

    /// Run one full pass.
    ///
    /// Fails with [`Error::ConcurrentRun`] while another pass or a watch
    /// session is active, leaving that one undisturbed, and with
    /// [`Error::ClosedCompiler`] once the compiler was closed.
    pub async fn run(self: &Arc<Self>) -> Result<Stats> {
        self.begin_pass(false)?;
        let result = {
            let _pass = self.pass_lock.lock().await;
            self.run_pass(false).await
        };
        self.end_pass(false);
        result
    }

    /// Start a watch session.
    ///
    /// The handler receives the result of every pass, including state
    /// errors such as [`Error::ConcurrentRun`]; nothing is returned to the
    /// caller directly. Must be called inside a tokio runtime.
    pub fn watch<F>(self: &Arc<Self>, options: WatchOptions, handler: F) -> Watching
    where
        F: FnMut(Result<Stats>) + Send + 'static,
    {
        match self.enter_watch() {
            Ok(()) => {
                let watching = Watching::start(self.clone(), options, handler);
                *self.watching.lock() = Some(watching.clone());
                watching
            }
            Err(err) => Watching::failed(err, handler),
        }
    }

    /// Build a fresh compilation and run `compilation`, `make` and `afterCompile`.
    pub async fn compile(self: &Arc<Self>) -> Result<Arc<Compilation>> {
        let params = CompilationParams {
            normal_module_factory: self.module_factory(),
        };
        let compilation = Arc::new(Compilation::new(self.options.clone()));

        self.hooks.compilation.call(&(compilation.clone(), params));
        self.hooks.make.call(compilation.clone()).await?;
        self.hooks.after_compile.call(compilation.clone()).await?;

        Ok(compilation)
    }

    /// Stop the watcher, wait for the in-flight pass and release resources.
    ///
    /// The `shutdown` hook fires on the first call only; later calls return
    /// immediately.
    pub async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            tracing::trace!(compiler = ?self.name(), "already closed");
            return Ok(());
        }

        let watching = self.watching.lock().take();
        if let Some(watching) = watching {
            watching.close().await;
        }

        let _pass = self.pass_lock.lock().await;
        *self.state.lock() = CompilerState::Closed;
        tracing::debug!(compiler = ?self.name(), "closing compiler");
        self.hooks.shutdown.call(()).await
    }

    fn begin_pass(&self, from_watch: bool) -> Result<()> {
        if self.is_closed() {
            return Err(Error::ClosedCompiler);
        }
        let mut state = self.state.lock();
        match (*state, from_watch) {
            (CompilerState::Closed, _) => Err(Error::ClosedCompiler),
            (CompilerState::Idle, false) | (CompilerState::Watching, true) => {
                *state = CompilerState::Running;
                Ok(())
            }
            _ => Err(Error::ConcurrentRun),
        }
    }

    fn end_pass(&self, from_watch: bool) {
        let mut state = self.state.lock();
        if *state == CompilerState::Running {
            *state = if from_watch {
                CompilerState::Watching
            } else {
                CompilerState::Idle
            };
        }
    }

    fn enter_watch(&self) -> Result<()> {
        if self.is_closed() {
            return Err(Error::ClosedCompiler);
        }
        let mut state = self.state.lock();
        match *state {
            CompilerState::Idle => {
                *state = CompilerState::Watching;
                Ok(())
            }
            CompilerState::Closed => Err(Error::ClosedCompiler),
            CompilerState::Running | CompilerState::Watching => Err(Error::ConcurrentRun),
        }
    }

    fn leave_watch(&self) {
        let mut state = self.state.lock();
        if *state == CompilerState::Watching {
            *state = CompilerState::Idle;
        }
    }

    async fn watch_pass(self: &Arc<Self>) -> Result<Stats> {
        self.begin_pass(true)?;
        let result = {
            let _pass = self.pass_lock.lock().await;
            self.run_pass(true).await
        };
        self.end_pass(true);
        result
    }

    async fn run_pass(self: &Arc<Self>, from_watch: bool) -> Result<Stats> {
        let start_time = Instant::now();
        let result = self.execute_pass(from_watch, start_time).await;
        match &result {
            Ok(stats) => tracing::info!(
                compiler = ?self.name(),
                duration_ms = stats.duration().as_millis() as u64,
                "pass complete"
            ),
            Err(err) => {
                tracing::warn!(compiler = ?self.name(), error = %err, "pass failed");
                self.hooks.failed.call(err);
            }
        }
        result
    }

    async fn execute_pass(self: &Arc<Self>, from_watch: bool, start_time: Instant) -> Result<Stats> {
        if from_watch {
            self.hooks.watch_run.call(self.clone()).await?;
        } else {
            self.hooks.before_run.call(self.clone()).await?;
            self.hooks.run.call(self.clone()).await?;
        }

        let compilation = self.compile().await?;

        if self.hooks.should_emit.call(&compilation) == Some(false) {
            tracing::debug!(compiler = ?self.name(), "emit skipped");
        } else {
            self.emit_assets(&compilation).await?;
        }

        let stats = Stats::new(compilation, start_time, Instant::now());
        self.hooks.done.call(stats.clone()).await?;
        Ok(stats)
    }

    async fn emit_assets(&self, compilation: &Arc<Compilation>) -> Result<()> {
        self.hooks.emit.call(compilation.clone()).await?;

        let assets = compilation.assets();
        if !assets.is_empty() {
            let fs = self.output_file_system();
            let output_path = &self.options.output.path;
            fs.create_dir_all(output_path).await?;

            for (name, content) in &assets {
                let relative = Path::new(name);
                let escapes = relative
                    .components()
                    .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
                if escapes {
                    return Err(Error::InvalidAssetPath(name.clone()));
                }

                let target = output_path.join(relative);
                if let Some(parent) = target.parent().filter(|p| *p != output_path.as_path()) {
                    fs.create_dir_all(parent).await?;
                }
                fs.write_file(&target, content).await?;
                tracing::trace!(asset = %name, bytes = content.len(), "emitted asset");
            }
        }

        self.hooks.after_emit.call(compilation.clone()).await
    }
}

impl fmt::Debug for Compiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Compiler")
            .field("name", &self.name())
            .field("context", &self.context())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
