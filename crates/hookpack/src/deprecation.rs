//! Once-per-process deprecation warnings.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use parking_lot::Mutex;

/// Watch mode was requested without a callback to deliver results to.
pub const WATCH_WITHOUT_CALLBACK: &str = "DEP_HOOKPACK_WATCH_WITHOUT_CALLBACK";

/// Entry options given as a bare name instead of a descriptor.
pub const ENTRY_NAME_OPTIONS: &str = "DEP_HOOKPACK_ENTRY_NAME_OPTIONS";

static EMITTED: Lazy<Mutex<HashSet<&'static str>>> = Lazy::new(|| Mutex::new(HashSet::new()));

/// Log a deprecation warning the first time `code` is seen.
///
/// Returns whether the warning was emitted by this call.
pub fn deprecate(code: &'static str, message: &str) -> bool {
    if !EMITTED.lock().insert(code) {
        return false;
    }
    tracing::warn!(code, "[DeprecationWarning] {message}");
    true
}

/// Whether a warning for `code` has been emitted in this process.
pub fn was_emitted(code: &str) -> bool {
    EMITTED.lock().contains(code)
}
