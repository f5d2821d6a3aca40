//! Change notifications for watch mode.
//!
//! Watches the compiler context recursively and forwards relevant changes,
//! ignoring hidden paths, paths outside the context and the configured
//! ignore patterns.

use std::any::Any;
use std::path::{Path, PathBuf};
use std::time::Duration;

use hookpack_config::WatchOptions;
use notify::{Event, PollWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::Result;

/// File change event type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileChange {
    Modified(PathBuf),
    Created(PathBuf),
    Removed(PathBuf),
}

impl FileChange {
    /// Get the path affected by this change.
    pub fn path(&self) -> &Path {
        match self {
            FileChange::Modified(p) | FileChange::Created(p) | FileChange::Removed(p) => p,
        }
    }
}

/// Stream of changes for one watch session.
///
/// Dropping the subscription stops the underlying watcher.
pub struct WatchSubscription {
    pub changes: mpsc::Receiver<FileChange>,
    _guard: Option<Box<dyn Any + Send>>,
}

impl WatchSubscription {
    pub fn new(changes: mpsc::Receiver<FileChange>) -> Self {
        Self {
            changes,
            _guard: None,
        }
    }
}

/// Source of change notifications used by watch mode.
pub trait WatchFileSystem: Send + Sync {
    fn watch(&self, context: &Path, options: &WatchOptions) -> Result<WatchSubscription>;
}

/// Watch file system backed by `notify`.
///
/// Uses the platform's native notifications, or a polling watcher when
/// `watchOptions.poll` is set.
#[derive(Debug, Default, Clone, Copy)]
pub struct NotifyWatchFileSystem;

impl WatchFileSystem for NotifyWatchFileSystem {
    fn watch(&self, context: &Path, options: &WatchOptions) -> Result<WatchSubscription> {
        let (tx, rx) = mpsc::channel(100);
        let root = context.to_path_buf();
        let handler = forward_changes(tx, root.clone(), options.ignored.clone());

        let guard: Box<dyn Any + Send> = match options.poll {
            Some(interval) => {
                let config =
                    notify::Config::default().with_poll_interval(Duration::from_millis(interval));
                let mut watcher = PollWatcher::new(handler, config)?;
                watcher.watch(&root, RecursiveMode::Recursive)?;
                Box::new(watcher)
            }
            None => {
                let mut watcher = notify::recommended_watcher(handler)?;
                watcher.watch(&root, RecursiveMode::Recursive)?;
                Box::new(watcher)
            }
        };

        tracing::debug!(root = %root.display(), poll = ?options.poll, "watching for changes");
        Ok(WatchSubscription {
            changes: rx,
            _guard: Some(guard),
        })
    }
}

fn forward_changes(
    tx: mpsc::Sender<FileChange>,
    root: PathBuf,
    ignored: Vec<String>,
) -> impl FnMut(notify::Result<Event>) + Send + 'static {
    move |res: notify::Result<Event>| {
        let event = match res {
            Ok(event) => event,
            Err(err) => {
                tracing::warn!(error = %err, "file watcher error");
                return;
            }
        };

        for path in &event.paths {
            if should_ignore(path, &root, &ignored) {
                continue;
            }

            let change = match event.kind {
                notify::EventKind::Create(_) => FileChange::Created(path.clone()),
                notify::EventKind::Modify(_) => FileChange::Modified(path.clone()),
                notify::EventKind::Remove(_) => FileChange::Removed(path.clone()),
                _ => continue,
            };

            // The receiver is gone once the watch session closed
            let _ = tx.blocking_send(change);
        }
    }
}

/// Check if a path should be ignored.
///
/// Paths outside `root` are always ignored, as are hidden files and directories.
/// Patterns match whole path components: `*.ext` matches a file extension, a
/// single name matches that directory or file at any depth, and a pattern
/// starting with `./` or containing `/` is anchored at `root`.
pub(crate) fn should_ignore(path: &Path, root: &Path, ignored: &[String]) -> bool {
    let rel_path = match path.strip_prefix(root) {
        Ok(p) => p,
        Err(_) => return true,
    };

    if ignored.iter().any(|pattern| matches_pattern(rel_path, pattern)) {
        return true;
    }

    rel_path.components().any(|component| {
        component
            .as_os_str()
            .to_str()
            .is_some_and(|name| name.starts_with('.') && name != "." && name != "..")
    })
}

fn matches_pattern(rel_path: &Path, pattern: &str) -> bool {
    if let Some(ext) = pattern.strip_prefix('*') {
        return rel_path.to_string_lossy().ends_with(ext);
    }

    let (anchored, pattern) = match pattern.strip_prefix("./") {
        Some(rest) => (true, rest),
        None => (pattern.contains('/'), pattern),
    };
    let pattern = Path::new(pattern.trim_end_matches('/'));
    if pattern.as_os_str().is_empty() {
        return false;
    }

    if anchored {
        rel_path.starts_with(pattern)
    } else {
        rel_path
            .components()
            .any(|component| component.as_os_str() == pattern.as_os_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignores_configured_directories() {
        let root = PathBuf::from("/project");
        let patterns = vec!["node_modules".to_string()];

        assert!(should_ignore(
            Path::new("/project/node_modules/package/index.js"),
            &root,
            &patterns
        ));
        assert!(!should_ignore(Path::new("/project/src/index.js"), &root, &patterns));
    }

    #[test]
    fn ignores_extensions() {
        let root = PathBuf::from("/project");
        let patterns = vec!["*.log".to_string()];

        assert!(should_ignore(Path::new("/project/debug.log"), &root, &patterns));
        assert!(!should_ignore(Path::new("/project/src/app.js"), &root, &patterns));
    }

    #[test]
    fn directory_patterns_match_whole_components() {
        let root = PathBuf::from("/project");
        let patterns = vec!["dist".to_string()];

        assert!(should_ignore(Path::new("/project/dist/main.js"), &root, &patterns));
        assert!(should_ignore(Path::new("/project/packages/ui/dist/index.js"), &root, &patterns));
        assert!(!should_ignore(Path::new("/project/src/dist-utils.js"), &root, &patterns));
        assert!(!should_ignore(Path::new("/project/distribution/app.js"), &root, &patterns));
    }

    #[test]
    fn anchored_patterns_only_match_below_root() {
        let root = PathBuf::from("/project");
        let patterns = vec!["./build".to_string(), "assets/generated/".to_string()];

        assert!(should_ignore(Path::new("/project/build/app.js"), &root, &patterns));
        assert!(!should_ignore(Path::new("/project/src/build/plan.js"), &root, &patterns));
        assert!(should_ignore(Path::new("/project/assets/generated/icons.js"), &root, &patterns));
        assert!(!should_ignore(Path::new("/project/assets/generated-list.js"), &root, &patterns));
    }

    #[test]
    fn ignores_hidden_and_outside_paths() {
        let root = PathBuf::from("/project");

        assert!(should_ignore(Path::new("/project/.git/HEAD"), &root, &[]));
        assert!(should_ignore(Path::new("/etc/passwd"), &root, &[]));
    }

    #[test]
    fn file_change_path() {
        let change = FileChange::Removed(PathBuf::from("/project/a.js"));
        assert_eq!(change.path(), Path::new("/project/a.js"));
    }
}
