use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::compilation::{Compilation, CompilationParams};
use crate::hooks::{AsyncSeriesHook, Hook, NamedTap, SyncBailHook, SyncHook};
use crate::stats::Stats;
use crate::watch::FileChange;
use crate::{Compiler, Error, Result};

/// Names of the hooks every compiler declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookName {
    Environment,
    AfterEnvironment,
    Initialize,
    BeforeRun,
    Run,
    WatchRun,
    Invalid,
    Compilation,
    Make,
    AfterCompile,
    ShouldEmit,
    Emit,
    AfterEmit,
    Done,
    Failed,
    WatchClose,
    Shutdown,
}

impl HookName {
    pub const ALL: [HookName; 17] = [
        HookName::Environment,
        HookName::AfterEnvironment,
        HookName::Initialize,
        HookName::BeforeRun,
        HookName::Run,
        HookName::WatchRun,
        HookName::Invalid,
        HookName::Compilation,
        HookName::Make,
        HookName::AfterCompile,
        HookName::ShouldEmit,
        HookName::Emit,
        HookName::AfterEmit,
        HookName::Done,
        HookName::Failed,
        HookName::WatchClose,
        HookName::Shutdown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HookName::Environment => "environment",
            HookName::AfterEnvironment => "afterEnvironment",
            HookName::Initialize => "initialize",
            HookName::BeforeRun => "beforeRun",
            HookName::Run => "run",
            HookName::WatchRun => "watchRun",
            HookName::Invalid => "invalid",
            HookName::Compilation => "compilation",
            HookName::Make => "make",
            HookName::AfterCompile => "afterCompile",
            HookName::ShouldEmit => "shouldEmit",
            HookName::Emit => "emit",
            HookName::AfterEmit => "afterEmit",
            HookName::Done => "done",
            HookName::Failed => "failed",
            HookName::WatchClose => "watchClose",
            HookName::Shutdown => "shutdown",
        }
    }
}

impl fmt::Display for HookName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HookName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        HookName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| Error::UnknownHook(s.to_string()))
    }
}

/// The lifecycle hooks of one compiler.
pub struct CompilerHooks {
    /// Construction: after user plugins were applied
    pub environment: SyncHook<()>,
    pub after_environment: SyncHook<()>,
    /// Construction: after entry plugins were applied
    pub initialize: SyncHook<()>,

    pub before_run: AsyncSeriesHook<Arc<Compiler>>,
    pub run: AsyncSeriesHook<Arc<Compiler>>,
    /// Replaces `before_run` and `run` for passes started by the watcher
    pub watch_run: AsyncSeriesHook<Arc<Compiler>>,
    /// A watched file changed
    pub invalid: SyncHook<FileChange>,

    pub compilation: SyncHook<(Arc<Compilation>, CompilationParams)>,
    pub make: AsyncSeriesHook<Arc<Compilation>>,
    pub after_compile: AsyncSeriesHook<Arc<Compilation>>,
    /// Returning `Some(false)` skips emitting
    pub should_emit: SyncBailHook<Arc<Compilation>, bool>,
    pub emit: AsyncSeriesHook<Arc<Compilation>>,
    pub after_emit: AsyncSeriesHook<Arc<Compilation>>,
    pub done: AsyncSeriesHook<Stats>,
    pub failed: SyncHook<Error>,

    pub watch_close: SyncHook<()>,
    /// Teardown, fired once when the compiler closes
    pub shutdown: AsyncSeriesHook<()>,
}

impl CompilerHooks {
    pub(crate) fn new() -> Self {
        Self {
            environment: SyncHook::new("environment"),
            after_environment: SyncHook::new("afterEnvironment"),
            initialize: SyncHook::new("initialize"),
            before_run: AsyncSeriesHook::new("beforeRun"),
            run: AsyncSeriesHook::new("run"),
            watch_run: AsyncSeriesHook::new("watchRun"),
            invalid: SyncHook::new("invalid"),
            compilation: SyncHook::new("compilation"),
            make: AsyncSeriesHook::new("make"),
            after_compile: AsyncSeriesHook::new("afterCompile"),
            should_emit: SyncBailHook::new("shouldEmit"),
            emit: AsyncSeriesHook::new("emit"),
            after_emit: AsyncSeriesHook::new("afterEmit"),
            done: AsyncSeriesHook::new("done"),
            failed: SyncHook::new("failed"),
            watch_close: SyncHook::new("watchClose"),
            shutdown: AsyncSeriesHook::new("shutdown"),
        }
    }

    pub fn get(&self, name: HookName) -> &dyn Hook {
        match name {
            HookName::Environment => &self.environment,
            HookName::AfterEnvironment => &self.after_environment,
            HookName::Initialize => &self.initialize,
            HookName::BeforeRun => &self.before_run,
            HookName::Run => &self.run,
            HookName::WatchRun => &self.watch_run,
            HookName::Invalid => &self.invalid,
            HookName::Compilation => &self.compilation,
            HookName::Make => &self.make,
            HookName::AfterCompile => &self.after_compile,
            HookName::ShouldEmit => &self.should_emit,
            HookName::Emit => &self.emit,
            HookName::AfterEmit => &self.after_emit,
            HookName::Done => &self.done,
            HookName::Failed => &self.failed,
            HookName::WatchClose => &self.watch_close,
            HookName::Shutdown => &self.shutdown,
        }
    }

    /// Register an observer on the hook called `hook`.
    ///
    /// Fails with [`Error::UnknownHook`] for names the compiler does not
    /// declare and with [`Error::HookMode`] for an asynchronous observer on
    /// a synchronous hook.
    pub fn register(&self, hook: &str, observer: &str, tap: NamedTap) -> Result<()> {
        let name: HookName = hook.parse()?;
        self.get(name).register(observer, tap)
    }
}

impl fmt::Debug for CompilerHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_map();
        for name in HookName::ALL {
            list.entry(&name.as_str(), &self.get(name).taps().len());
        }
        list.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::CallMode;

    #[test]
    fn names_round_trip() {
        for name in HookName::ALL {
            assert_eq!(name.as_str().parse::<HookName>().unwrap(), name);
        }
    }

    #[test]
    fn hook_names_match_hooks() {
        let hooks = CompilerHooks::new();
        for name in HookName::ALL {
            assert_eq!(hooks.get(name).name(), name.as_str());
        }
    }

    #[test]
    fn declared_modes() {
        let hooks = CompilerHooks::new();
        assert_eq!(hooks.get(HookName::Compilation).mode(), CallMode::Sync);
        assert_eq!(hooks.get(HookName::ShouldEmit).mode(), CallMode::Sync);
        assert_eq!(hooks.get(HookName::Make).mode(), CallMode::Async);
        assert_eq!(hooks.get(HookName::Shutdown).mode(), CallMode::Async);
    }

    #[test]
    fn unknown_hook_name_is_rejected() {
        let hooks = CompilerHooks::new();
        let err = hooks
            .register("afterDone", "observer", NamedTap::from_fn(|| {}))
            .unwrap_err();
        assert!(matches!(err, Error::UnknownHook(ref name) if name == "afterDone"));
    }
}
