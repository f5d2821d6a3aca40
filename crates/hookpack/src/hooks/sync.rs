use std::sync::Arc;

use parking_lot::RwLock;

use super::{CallMode, Hook, NamedTap, TapInfo};
use crate::{Error, Result};

type SyncObserver<T> = Arc<dyn Fn(&T) + Send + Sync>;
type BailObserver<T, R> = Arc<dyn Fn(&T) -> Option<R> + Send + Sync>;

/// Hook whose observers are called in order with a shared argument.
pub struct SyncHook<T> {
    name: &'static str,
    taps: RwLock<Vec<(String, SyncObserver<T>)>>,
}

impl<T: 'static> SyncHook<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            taps: RwLock::new(Vec::new()),
        }
    }

    pub fn tap(&self, observer: impl Into<String>, f: impl Fn(&T) + Send + Sync + 'static) {
        let observer = observer.into();
        tracing::trace!(hook = self.name, observer = %observer, "tap");
        self.taps.write().push((observer, Arc::new(f)));
    }

    pub fn call(&self, arg: &T) {
        let taps = self.taps.read().clone();
        tracing::trace!(hook = self.name, observers = taps.len(), "call");
        for (_, observer) in taps {
            observer(arg);
        }
    }
}

impl<T: 'static> Hook for SyncHook<T> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn mode(&self) -> CallMode {
        CallMode::Sync
    }

    fn taps(&self) -> Vec<TapInfo> {
        self.taps
            .read()
            .iter()
            .map(|(observer, _)| TapInfo {
                observer: observer.clone(),
                mode: CallMode::Sync,
            })
            .collect()
    }

    fn register(&self, observer: &str, tap: NamedTap) -> Result<()> {
        match tap {
            NamedTap::Sync(f) => {
                self.tap(observer, move |_: &T| f());
                Ok(())
            }
            NamedTap::Async(_) => Err(Error::HookMode {
                hook: self.name.to_string(),
                observer: observer.to_string(),
            }),
        }
    }
}

/// Hook whose observers run in order until one of them returns a value.
pub struct SyncBailHook<T, R> {
    name: &'static str,
    taps: RwLock<Vec<(String, BailObserver<T, R>)>>,
}

impl<T: 'static, R: 'static> SyncBailHook<T, R> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            taps: RwLock::new(Vec::new()),
        }
    }

    pub fn tap(
        &self,
        observer: impl Into<String>,
        f: impl Fn(&T) -> Option<R> + Send + Sync + 'static,
    ) {
        let observer = observer.into();
        tracing::trace!(hook = self.name, observer = %observer, "tap");
        self.taps.write().push((observer, Arc::new(f)));
    }

    /// Returns the first value produced by an observer; later observers are skipped.
    pub fn call(&self, arg: &T) -> Option<R> {
        let taps = self.taps.read().clone();
        for (observer, f) in taps {
            if let Some(value) = f(arg) {
                tracing::debug!(hook = self.name, observer = %observer, "bailed");
                return Some(value);
            }
        }
        None
    }
}

impl<T: 'static, R: 'static> Hook for SyncBailHook<T, R> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn mode(&self) -> CallMode {
        CallMode::Sync
    }

    fn taps(&self) -> Vec<TapInfo> {
        self.taps
            .read()
            .iter()
            .map(|(observer, _)| TapInfo {
                observer: observer.clone(),
                mode: CallMode::Sync,
            })
            .collect()
    }

    fn register(&self, observer: &str, tap: NamedTap) -> Result<()> {
        match tap {
            NamedTap::Sync(f) => {
                self.tap(observer, move |_: &T| {
                    f();
                    None
                });
                Ok(())
            }
            NamedTap::Async(_) => Err(Error::HookMode {
                hook: self.name.to_string(),
                observer: observer.to_string(),
            }),
        }
    }
}
