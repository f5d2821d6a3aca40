use std::sync::Arc;

use hookpack_config::WatchOptions;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::Compiler;
use crate::stats::Stats;
use crate::watch::{FileChange, WatchSubscription};
use crate::{Error, Result};

/// Handle to an active watch session.
///
/// Cloning yields another handle to the same session.
#[derive(Clone)]
pub struct Watching {
    inner: Arc<Inner>,
}

struct Inner {
    shutdown: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

enum Wake {
    Change(FileChange),
    Settled,
    Shutdown,
}

impl Watching {
    pub(super) fn start<F>(compiler: Arc<Compiler>, options: WatchOptions, handler: F) -> Self
    where
        F: FnMut(Result<Stats>) + Send + 'static,
    {
        let (shutdown, shutdown_rx) = watch::channel(false);
        let watching = Self::from_sender(shutdown);
        let task = tokio::spawn(watch_loop(compiler, options, handler, shutdown_rx));
        *watching.inner.task.lock() = Some(task);
        watching
    }

    /// A session that never started; `err` is delivered to the handler on a new task.
    pub(super) fn failed<F>(err: Error, mut handler: F) -> Self
    where
        F: FnMut(Result<Stats>) + Send + 'static,
    {
        let (shutdown, _) = watch::channel(true);
        let watching = Self::from_sender(shutdown);
        let task = tokio::spawn(async move { handler(Err(err)) });
        *watching.inner.task.lock() = Some(task);
        watching
    }

    fn from_sender(shutdown: watch::Sender<bool>) -> Self {
        Self {
            inner: Arc::new(Inner {
                shutdown,
                task: Mutex::new(None),
            }),
        }
    }

    pub fn is_closed(&self) -> bool {
        *self.inner.shutdown.borrow()
    }

    /// Stop scheduling passes and wait for the in-flight pass to settle.
    pub async fn close(&self) {
        self.inner.shutdown.send_replace(true);
        let task = self.inner.task.lock().take();
        if let Some(task) = task {
            if let Err(err) = task.await {
                tracing::warn!(error = %err, "watch task ended abnormally");
            }
        }
    }
}

impl std::fmt::Debug for Watching {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watching")
            .field("closed", &self.is_closed())
            .finish()
    }
}

async fn watch_loop<F>(
    compiler: Arc<Compiler>,
    options: WatchOptions,
    mut handler: F,
    mut shutdown: watch::Receiver<bool>,
) where
    F: FnMut(Result<Stats>) + Send + 'static,
{
    match subscribe(&compiler, &options) {
        Ok(mut subscription) => loop {
            if *shutdown.borrow() || compiler.is_closed() {
                break;
            }
            handler(compiler.watch_pass().await);

            let first = tokio::select! {
                _ = closed(&mut shutdown) => Wake::Shutdown,
                change = subscription.changes.recv() => change.map_or(Wake::Shutdown, Wake::Change),
            };
            let Wake::Change(change) = first else { break };
            tracing::debug!(path = %change.path().display(), "change detected");
            compiler.hooks.invalid.call(&change);

            if !aggregate(&compiler, &options, &mut subscription, &mut shutdown).await {
                break;
            }
        },
        Err(err) => handler(Err(err)),
    }

    compiler.hooks.watch_close.call(&());
    compiler.leave_watch();
    tracing::debug!(compiler = ?compiler.name(), "watch session closed");
}

/// Wait until no change arrived for `aggregateTimeout`; false when the session ends instead.
async fn aggregate(
    compiler: &Compiler,
    options: &WatchOptions,
    subscription: &mut WatchSubscription,
    shutdown: &mut watch::Receiver<bool>,
) -> bool {
    loop {
        let wake = tokio::select! {
            _ = closed(shutdown) => Wake::Shutdown,
            _ = tokio::time::sleep(options.aggregate_timeout()) => Wake::Settled,
            change = subscription.changes.recv() => change.map_or(Wake::Shutdown, Wake::Change),
        };
        match wake {
            Wake::Change(change) => compiler.hooks.invalid.call(&change),
            Wake::Settled => return true,
            Wake::Shutdown => return false,
        }
    }
}

/// Resolves once the session is closed or every handle to it is gone.
async fn closed(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|closed| *closed).await;
}

fn subscribe(compiler: &Compiler, options: &WatchOptions) -> Result<WatchSubscription> {
    let fs = compiler
        .watch_file_system()
        .ok_or(Error::WatchUnavailable)?;

    // Emitted assets must not trigger another pass
    let mut options = options.clone();
    if let Ok(output) = compiler.options().output.path.strip_prefix(compiler.context()) {
        if !output.as_os_str().is_empty() {
            options.ignored.push(format!("./{}", output.to_string_lossy()));
        }
    }

    fs.watch(compiler.context(), &options)
}
