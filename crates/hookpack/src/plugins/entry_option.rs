use std::path::Path;

use hookpack_config::EntryStatic;

use super::CompilerPlugin;
use super::entry::EntryPlugin;
use crate::compilation::{EntryDescriptor, EntryOptions};
use crate::{Compiler, Result};

/// Applies one [`EntryPlugin`] per import of the configured `entry` map.
#[derive(Debug, Default, Clone, Copy)]
pub struct EntryOptionPlugin;

impl EntryOptionPlugin {
    pub fn apply_entries(compiler: &Compiler, context: &Path, entry: &EntryStatic) -> Result<()> {
        for (name, description) in entry {
            let options = EntryOptions::Descriptor(EntryDescriptor {
                name: Some(name.clone()),
                filename: description.filename.clone(),
            });
            for import in &description.import {
                EntryPlugin::new(context, import.as_str(), options.clone()).apply(compiler)?;
            }
        }
        Ok(())
    }
}

impl CompilerPlugin for EntryOptionPlugin {
    fn name(&self) -> &str {
        "EntryOptionPlugin"
    }

    fn apply(&self, compiler: &Compiler) -> Result<()> {
        let options = compiler.options().clone();
        Self::apply_entries(compiler, &options.context, &options.entry)
    }
}
