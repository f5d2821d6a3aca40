//! Check command implementation.
//!
//! Constructs every target without running it, which validates the schema,
//! the declared plugins and the dependencies between targets.

use hookpack::{Config, create_compiler, create_multi_compiler};

use crate::cli::CheckArgs;
use crate::config::{self, Overrides};
use crate::error::Result;
use crate::ui;

pub async fn execute(args: CheckArgs) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let loaded = config::load(args.config.as_deref(), &cwd, &Overrides::default())?;
    match &loaded.path {
        Some(path) => ui::info(&format!("Checking {}", path.display())),
        None => ui::warning("No configuration file found, checking the defaults"),
    }

    let compilers = match Config::from_value(loaded.value) {
        Config::Single(raw) => vec![create_compiler(raw)?],
        Config::Multi(raws) => create_multi_compiler(raws)?.compilers().to_vec(),
    };

    for compiler in &compilers {
        let options = compiler.options();
        ui::success(&format!(
            "{}: mode {}, context {}",
            options.name.as_deref().unwrap_or("default"),
            options.mode,
            options.context.display()
        ));
        for (name, entry) in &options.entry {
            eprintln!("  {name} → {}", entry.import.join(", "));
        }
        if !options.dependencies.is_empty() {
            eprintln!("  after {}", options.dependencies.join(", "));
        }
    }

    ui::success("Configuration is valid");
    Ok(())
}
