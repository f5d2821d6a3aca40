//! Destinations for emitted assets.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use indexmap::{IndexMap, IndexSet};
use parking_lot::RwLock;

use crate::Result;

/// File system the compiler writes assets to.
#[async_trait]
pub trait OutputFileSystem: Send + Sync {
    async fn create_dir_all(&self, path: &Path) -> Result<()>;

    async fn write_file(&self, path: &Path, content: &[u8]) -> Result<()>;
}

/// Writes assets to disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeOutputFileSystem;

#[async_trait]
impl OutputFileSystem for NativeOutputFileSystem {
    async fn create_dir_all(&self, path: &Path) -> Result<()> {
        tokio::fs::create_dir_all(path).await?;
        Ok(())
    }

    async fn write_file(&self, path: &Path, content: &[u8]) -> Result<()> {
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}

/// Keeps written assets in memory.
#[derive(Debug, Default)]
pub struct MemoryOutputFileSystem {
    files: RwLock<IndexMap<PathBuf, Vec<u8>>>,
    dirs: RwLock<IndexSet<PathBuf>>,
}

impl MemoryOutputFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        self.files.read().get(path.as_ref()).cloned()
    }

    /// Paths of written files, in write order.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.files.read().keys().cloned().collect()
    }

    pub fn has_dir(&self, path: impl AsRef<Path>) -> bool {
        self.dirs.read().contains(path.as_ref())
    }
}

#[async_trait]
impl OutputFileSystem for MemoryOutputFileSystem {
    async fn create_dir_all(&self, path: &Path) -> Result<()> {
        let mut dirs = self.dirs.write();
        for ancestor in path.ancestors() {
            if ancestor.as_os_str().is_empty() {
                break;
            }
            dirs.insert(ancestor.to_path_buf());
        }
        Ok(())
    }

    async fn write_file(&self, path: &Path, content: &[u8]) -> Result<()> {
        self.files
            .write()
            .insert(path.to_path_buf(), content.to_vec());
        Ok(())
    }
}
