//! Status messages and build summaries on stderr.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use hookpack::Stats;
use owo_colors::OwoColorize;

static COLORS: AtomicBool = AtomicBool::new(true);

/// Decide once whether messages are colored.
pub fn init_colors(no_color: bool) {
    COLORS.store(!no_color && should_use_color(), Ordering::Relaxed);
}

/// `NO_COLOR` disables colors, `FORCE_COLOR` forces them, otherwise they
/// follow whether a user is attending stderr.
pub fn should_use_color() -> bool {
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    if std::env::var_os("FORCE_COLOR").is_some() {
        return true;
    }
    console::user_attended_stderr()
}

fn colors() -> bool {
    COLORS.load(Ordering::Relaxed)
}

pub fn success(message: &str) {
    if colors() {
        eprintln!("{} {}", "✓".green().bold(), message);
    } else {
        eprintln!("✓ {message}");
    }
}

pub fn info(message: &str) {
    if colors() {
        eprintln!("{} {}", "ℹ".blue().bold(), message);
    } else {
        eprintln!("ℹ {message}");
    }
}

pub fn warning(message: &str) {
    if colors() {
        eprintln!("{} {}", "⚠".yellow().bold(), message.yellow());
    } else {
        eprintln!("⚠ {message}");
    }
}

pub fn error(message: &str) {
    if colors() {
        eprintln!("{} {}", "✗".red().bold(), message.red());
    } else {
        eprintln!("✗ {message}");
    }
}

/// Human-readable duration: `850µs`, `42ms`, `1.25s`.
pub fn format_duration(duration: Duration) -> String {
    let micros = duration.as_micros();
    if micros < 1_000 {
        format!("{micros}µs")
    } else if micros < 1_000_000 {
        format!("{}ms", duration.as_millis())
    } else {
        format!("{:.2}s", duration.as_secs_f64())
    }
}

/// Human-readable byte size.
pub fn format_size(bytes: usize) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;

    let size = bytes as f64;
    if size < KB {
        format!("{bytes} B")
    } else if size < MB {
        format!("{:.2} KB", size / KB)
    } else {
        format!("{:.2} MB", size / MB)
    }
}

/// Print the outcome of one target's pass.
pub fn print_summary(stats: &Stats) {
    let json = stats.to_json();
    let label = json.name.as_deref().unwrap_or("build");
    let headline = format!(
        "Built {label} in {} ({} modules, {} assets)",
        format_duration(stats.duration()),
        json.modules.len(),
        json.assets.len()
    );
    if stats.has_errors() {
        error(&headline);
    } else {
        success(&headline);
    }

    for (name, requests) in &json.entries {
        eprintln!("  {name} → {}", requests.join(", "));
    }
    for asset in &json.assets {
        eprintln!("  {} {}", asset.name, format_size(asset.size));
    }
    for warning_message in &json.warnings {
        warning(warning_message);
    }
    for error_message in &json.errors {
        error(error_message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations_pick_a_readable_unit() {
        assert_eq!(format_duration(Duration::from_micros(850)), "850µs");
        assert_eq!(format_duration(Duration::from_millis(42)), "42ms");
        assert_eq!(format_duration(Duration::from_millis(1250)), "1.25s");
    }

    #[test]
    fn sizes_pick_a_readable_unit() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1536), "1.50 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.00 MB");
    }
}
