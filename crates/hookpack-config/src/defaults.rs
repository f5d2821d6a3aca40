use std::path::PathBuf;

// Helper defaults

/// Entry used when a configuration declares none.
pub const DEFAULT_ENTRY: &str = "./src";

/// Name given to entries declared as a bare string or list.
pub const DEFAULT_ENTRY_NAME: &str = "main";

/// Polling interval used when `watchOptions.poll` is `true`.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 5007;

pub(crate) fn default_output_dir() -> PathBuf {
    PathBuf::from("dist")
}

pub(crate) fn default_filename() -> String {
    "[name].js".to_string()
}

pub(crate) fn default_aggregate_timeout() -> u64 {
    20
}

pub(crate) fn default_devtool(mode: crate::Mode) -> Option<String> {
    match mode {
        crate::Mode::Development => Some("eval".to_string()),
        crate::Mode::Production | crate::Mode::None => None,
    }
}
