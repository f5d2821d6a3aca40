//! Typed extension points.
//!
//! A hook is an ordered list of named observers. Observers run in
//! registration order, and the observer list is snapshotted when a call
//! starts, so observers tapped during a call take effect from the next call.

mod async_series;
mod sync;

use std::sync::Arc;

use futures::future::BoxFuture;

use crate::Result;

pub use async_series::AsyncSeriesHook;
pub use sync::{SyncBailHook, SyncHook};

/// How a hook invokes its observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallMode {
    /// Observers are plain functions called in order.
    Sync,
    /// Observers may suspend; each completes before the next starts.
    Async,
}

/// Introspection record for one registered observer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TapInfo {
    pub observer: String,
    pub mode: CallMode,
}

/// An argument-less observer, used for registration by hook name.
#[derive(Clone)]
pub enum NamedTap {
    Sync(Arc<dyn Fn() + Send + Sync>),
    Async(Arc<dyn Fn() -> BoxFuture<'static, Result<()>> + Send + Sync>),
}

impl NamedTap {
    pub fn from_fn(f: impl Fn() + Send + Sync + 'static) -> Self {
        NamedTap::Sync(Arc::new(f))
    }

    pub fn from_async<F, Fut>(f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<()>> + Send + 'static,
    {
        NamedTap::Async(Arc::new(move || -> BoxFuture<'static, Result<()>> {
            Box::pin(f())
        }))
    }

    pub fn mode(&self) -> CallMode {
        match self {
            NamedTap::Sync(_) => CallMode::Sync,
            NamedTap::Async(_) => CallMode::Async,
        }
    }
}

impl std::fmt::Debug for NamedTap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("NamedTap").field(&self.mode()).finish()
    }
}

/// Type-erased view over a hook, independent of its argument type.
pub trait Hook: Send + Sync {
    /// Hook name as used for registration by name.
    fn name(&self) -> &'static str;

    /// Declared call mode.
    fn mode(&self) -> CallMode;

    /// Registered observers, in invocation order.
    fn taps(&self) -> Vec<TapInfo>;

    fn is_used(&self) -> bool {
        !self.taps().is_empty()
    }

    /// Register an observer that ignores the hook argument.
    fn register(&self, observer: &str, tap: NamedTap) -> Result<()>;
}
