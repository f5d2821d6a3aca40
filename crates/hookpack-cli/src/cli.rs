//! Command-line interface definition.
//!
//! - `hookpack build` - Run a build once, or keep watching with `--watch`
//! - `hookpack check` - Validate a configuration without building

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// hookpack - hook-driven build orchestration
#[derive(Parser, Debug)]
#[command(
    name = "hookpack",
    version,
    about = "Hook-driven build orchestration",
    long_about = "hookpack normalizes a build configuration, assembles a compiler from plugins\n\
                  observing its lifecycle hooks, and runs it once or keeps it watching."
)]
pub struct Cli {
    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build the configured targets
    ///
    /// Runs every target once and closes it. With `--watch` (or `watch: true`
    /// in the configuration) keeps rebuilding on changes until Ctrl-C.
    Build(BuildArgs),

    /// Validate the configuration
    ///
    /// Normalizes every target and prints its entries, reporting all schema
    /// violations at once.
    Check(CheckArgs),
}

#[derive(Args, Debug, Default)]
pub struct BuildArgs {
    /// Path to the configuration file
    ///
    /// Defaults to hookpack.config.json or hookpack.config.toml in the
    /// working directory.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Keep watching for changes
    #[arg(short, long)]
    pub watch: bool,

    /// Build mode
    #[arg(short, long, value_enum)]
    pub mode: Option<Mode>,

    /// Entry request; repeat for several. Replaces the configured entries
    #[arg(short, long = "entry", value_name = "REQUEST")]
    pub entry: Vec<String>,

    /// Base directory entries resolve against
    #[arg(long, value_name = "DIR")]
    pub context: Option<PathBuf>,

    /// Print the stats of every result as JSON on stdout
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Default)]
pub struct CheckArgs {
    /// Path to the configuration file
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Development,
    Production,
    None,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Development => "development",
            Mode::Production => "production",
            Mode::None => "none",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_collects_repeated_entries() {
        let cli = Cli::try_parse_from([
            "hookpack", "build", "-e", "./a.js", "--entry", "./b.js", "--mode", "production",
        ])
        .unwrap();

        let Command::Build(args) = cli.command else {
            panic!("expected build");
        };
        assert_eq!(args.entry, vec!["./a.js", "./b.js"]);
        assert_eq!(args.mode, Some(Mode::Production));
        assert!(!args.watch);
    }

    #[test]
    fn verbose_conflicts_with_quiet() {
        assert!(Cli::try_parse_from(["hookpack", "-v", "-q", "check"]).is_err());
    }

    #[test]
    fn global_flags_follow_the_subcommand() {
        let cli = Cli::try_parse_from(["hookpack", "check", "--no-color", "-c", "app.toml"]).unwrap();
        assert!(cli.no_color);
        let Command::Check(args) = cli.command else {
            panic!("expected check");
        };
        assert_eq!(args.config, Some(PathBuf::from("app.toml")));
    }
}
