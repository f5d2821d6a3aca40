//! Build command implementation.

use anyhow::Context;
use hookpack::{BuildStats, build_with_callback};
use tokio::sync::mpsc;

use crate::cli::BuildArgs;
use crate::config::{self, Overrides};
use crate::error::Result;
use crate::ui;

/// Execute the build command.
///
/// Without watch the targets run once and are closed; the first failure is
/// returned. In watch mode every result is reported as it arrives and the
/// session runs until Ctrl-C.
pub async fn execute(args: BuildArgs) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let loaded = config::load(args.config.as_deref(), &cwd, &Overrides::from_build_args(&args))?;
    match &loaded.path {
        Some(path) => ui::info(&format!("Using {}", path.display())),
        None => ui::info("No configuration file found, using defaults"),
    }

    let (tx, mut rx) = mpsc::unbounded_channel();
    let handle = build_with_callback(loaded.value, move |result| {
        let _ = tx.send(result);
    });

    let Some(handle) = handle else {
        return match rx.recv().await {
            Some(Err(err)) => Err(err.into()),
            _ => Ok(()),
        };
    };

    if handle.wants_watch() {
        ui::info("Watching for changes (press Ctrl-C to stop)");
        loop {
            tokio::select! {
                result = rx.recv() => match result {
                    Some(Ok(stats)) => report(&stats, args.json)?,
                    Some(Err(err)) => ui::error(&err.to_string()),
                    None => break,
                },
                signal = tokio::signal::ctrl_c() => {
                    signal?;
                    break;
                }
            }
        }
        handle.close().await?;
        ui::info("Stopped watching");
        return Ok(());
    }

    match rx.recv().await {
        Some(Ok(stats)) => {
            report(&stats, args.json)?;
            if stats.has_errors() {
                return Err(anyhow::anyhow!("build finished with errors").into());
            }
            Ok(())
        }
        Some(Err(err)) => Err(err.into()),
        None => Ok(()),
    }
}

fn report(stats: &BuildStats, json: bool) -> Result<()> {
    for child in stats.children() {
        ui::print_summary(child);
    }

    if json {
        let rendered = match stats {
            BuildStats::Single(stats) => serde_json::to_string_pretty(&stats.to_json()),
            BuildStats::Multi(stats) => serde_json::to_string_pretty(&stats.to_json()),
        }
        .context("serializing build stats")?;
        println!("{rendered}");
    }
    Ok(())
}
