use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use parking_lot::RwLock;

use super::{CallMode, Hook, NamedTap, TapInfo};
use crate::Result;

enum Observer<T> {
    Sync(Arc<dyn Fn(&T) -> Result<()> + Send + Sync>),
    Async(Arc<dyn Fn(T) -> BoxFuture<'static, Result<()>> + Send + Sync>),
}

impl<T> Clone for Observer<T> {
    fn clone(&self) -> Self {
        match self {
            Observer::Sync(f) => Observer::Sync(f.clone()),
            Observer::Async(f) => Observer::Async(f.clone()),
        }
    }
}

impl<T> Observer<T> {
    fn mode(&self) -> CallMode {
        match self {
            Observer::Sync(_) => CallMode::Sync,
            Observer::Async(_) => CallMode::Async,
        }
    }
}

/// Hook whose observers run strictly one after another.
///
/// Each observer, synchronous or asynchronous, completes before the next
/// one starts. The first error stops the series and becomes the result of
/// [`AsyncSeriesHook::call`].
pub struct AsyncSeriesHook<T> {
    name: &'static str,
    taps: RwLock<Vec<(String, Observer<T>)>>,
}

impl<T> AsyncSeriesHook<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            taps: RwLock::new(Vec::new()),
        }
    }

    /// Register a synchronous observer.
    pub fn tap(
        &self,
        observer: impl Into<String>,
        f: impl Fn(&T) -> Result<()> + Send + Sync + 'static,
    ) {
        self.push(observer.into(), Observer::Sync(Arc::new(f)));
    }

    /// Register an observer that completes asynchronously.
    pub fn tap_async<F, Fut>(&self, observer: impl Into<String>, f: F)
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let f = move |arg: T| -> BoxFuture<'static, Result<()>> { Box::pin(f(arg)) };
        self.push(observer.into(), Observer::Async(Arc::new(f)));
    }

    fn push(&self, observer: String, tap: Observer<T>) {
        tracing::trace!(hook = self.name, observer = %observer, mode = ?tap.mode(), "tap");
        self.taps.write().push((observer, tap));
    }

    /// Run every observer in order.
    pub async fn call(&self, arg: T) -> Result<()> {
        let taps = self.taps.read().clone();
        tracing::trace!(hook = self.name, observers = taps.len(), "call");

        for (observer, tap) in taps {
            let result = match tap {
                Observer::Sync(f) => f(&arg),
                Observer::Async(f) => f(arg.clone()).await,
            };
            if let Err(err) = result {
                tracing::debug!(hook = self.name, observer = %observer, error = %err, "observer failed");
                return Err(err);
            }
        }
        Ok(())
    }
}

impl<T> Hook for AsyncSeriesHook<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn mode(&self) -> CallMode {
        CallMode::Async
    }

    fn taps(&self) -> Vec<TapInfo> {
        self.taps
            .read()
            .iter()
            .map(|(observer, tap)| TapInfo {
                observer: observer.clone(),
                mode: tap.mode(),
            })
            .collect()
    }

    fn register(&self, observer: &str, tap: NamedTap) -> Result<()> {
        match tap {
            NamedTap::Sync(f) => self.tap(observer, move |_: &T| {
                f();
                Ok(())
            }),
            NamedTap::Async(f) => self.tap_async(observer, move |_: T| f()),
        }
        Ok(())
    }
}
