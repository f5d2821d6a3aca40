//! Shared test utilities for hookpack tests

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use hookpack::{
    Compiler, FileChange, MemoryOutputFileSystem, Plugin, RawOptions, WatchFileSystem,
    WatchOptions, WatchSubscription, create_compiler,
};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;

/// Ordered record of observer invocations.
#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: impl Into<String>) {
        self.0.lock().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    pub fn count(&self, event: &str) -> usize {
        self.0.lock().iter().filter(|e| *e == event).count()
    }
}

/// Watch file system whose changes are triggered by the test.
#[derive(Default)]
pub struct ManualWatchFileSystem {
    sender: Mutex<Option<mpsc::Sender<FileChange>>>,
    contexts: Mutex<Vec<PathBuf>>,
    ignored: Mutex<Vec<String>>,
}

impl ManualWatchFileSystem {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Report a modification of `path`; does nothing before a session started.
    pub async fn change(&self, path: impl Into<PathBuf>) {
        let sender = self.sender.lock().clone();
        if let Some(sender) = sender {
            let _ = sender.send(FileChange::Modified(path.into())).await;
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.sender.lock().is_some()
    }

    pub fn watched_contexts(&self) -> Vec<PathBuf> {
        self.contexts.lock().clone()
    }

    /// Ignore patterns of the most recent session.
    pub fn ignored(&self) -> Vec<String> {
        self.ignored.lock().clone()
    }
}

impl WatchFileSystem for ManualWatchFileSystem {
    fn watch(&self, context: &Path, options: &WatchOptions) -> hookpack::Result<WatchSubscription> {
        let (tx, rx) = mpsc::channel(16);
        *self.sender.lock() = Some(tx);
        self.contexts.lock().push(context.to_path_buf());
        *self.ignored.lock() = options.ignored.clone();
        Ok(WatchSubscription::new(rx))
    }
}

/// Plugin swapping in an in-memory output file system.
pub fn memory_output(fs: Arc<MemoryOutputFileSystem>) -> Plugin {
    Plugin::function(move |compiler| {
        compiler.set_output_file_system(fs.clone());
        Ok(())
    })
}

/// Plugin swapping in a manual watch file system.
pub fn manual_watch(fs: Arc<ManualWatchFileSystem>) -> Plugin {
    Plugin::function(move |compiler| {
        compiler.set_watch_file_system(fs.clone());
        Ok(())
    })
}

/// Plugin logging the run lifecycle hooks into `log`, prefixed with `label`.
pub fn lifecycle_logger(log: EventLog, label: &'static str) -> Plugin {
    Plugin::function(move |compiler| {
        let hooks = &compiler.hooks;

        let l = log.clone();
        hooks.before_run.tap("log", move |_| {
            l.push(format!("{label}:beforeRun"));
            Ok(())
        });
        let l = log.clone();
        hooks.run.tap("log", move |_| {
            l.push(format!("{label}:run"));
            Ok(())
        });
        let l = log.clone();
        hooks.watch_run.tap("log", move |_| {
            l.push(format!("{label}:watchRun"));
            Ok(())
        });
        let l = log.clone();
        hooks
            .compilation
            .tap("log", move |_| l.push(format!("{label}:compilation")));
        let l = log.clone();
        hooks.make.tap("log", move |_| {
            l.push(format!("{label}:make"));
            Ok(())
        });
        let l = log.clone();
        hooks.after_compile.tap("log", move |_| {
            l.push(format!("{label}:afterCompile"));
            Ok(())
        });
        let l = log.clone();
        hooks.emit.tap("log", move |_| {
            l.push(format!("{label}:emit"));
            Ok(())
        });
        let l = log.clone();
        hooks.after_emit.tap("log", move |_| {
            l.push(format!("{label}:afterEmit"));
            Ok(())
        });
        let l = log.clone();
        hooks.done.tap("log", move |_| {
            l.push(format!("{label}:done"));
            Ok(())
        });
        let l = log.clone();
        hooks.failed.tap("log", move |_| l.push(format!("{label}:failed")));
        let l = log.clone();
        hooks
            .invalid
            .tap("log", move |_| l.push(format!("{label}:invalid")));
        let l = log.clone();
        hooks
            .watch_close
            .tap("log", move |_| l.push(format!("{label}:watchClose")));
        let l = log.clone();
        hooks.shutdown.tap("log", move |_| {
            l.push(format!("{label}:shutdown"));
            Ok(())
        });
        Ok(())
    })
}

/// Build a compiler whose outputs stay in memory.
pub fn compiler_with(config: Value, plugins: Vec<Plugin>) -> Arc<Compiler> {
    let mut raw = RawOptions::new(config).plugin(memory_output(Arc::new(MemoryOutputFileSystem::new())));
    for plugin in plugins {
        raw = raw.plugin(plugin);
    }
    create_compiler(raw).expect("compiler")
}
