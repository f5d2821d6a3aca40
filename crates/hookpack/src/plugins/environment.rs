use std::sync::Arc;

use super::CompilerPlugin;
use crate::output::NativeOutputFileSystem;
use crate::watch::NotifyWatchFileSystem;
use crate::{Compiler, Result};

/// Attaches the native output file system and the `notify`-based watch file system.
///
/// Applied before user plugins, which may replace either.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeEnvironmentPlugin;

impl CompilerPlugin for NativeEnvironmentPlugin {
    fn name(&self) -> &str {
        "NativeEnvironmentPlugin"
    }

    fn apply(&self, compiler: &Compiler) -> Result<()> {
        compiler.set_output_file_system(Arc::new(NativeOutputFileSystem));
        compiler.set_watch_file_system(Arc::new(NotifyWatchFileSystem));
        Ok(())
    }
}
