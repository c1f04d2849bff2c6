use std::io::Result;
use std::path::{Path, PathBuf};

/// Virtual File System trait
///
/// Everything serialgen reads (config, type index files) and writes
/// (generated units, manifests, private logs) goes through this trait, so
/// the whole pipeline runs against [`MemoryVfs`] in tests.
///
/// # Contract
///
/// - **`exists(path)`**: `true` for a file OR a directory.
///
/// - **`read_to_string(path)`**: Only succeeds for files.
///
/// - **`write_from_string(path, content)`**: Creates parent directories as
///   needed and overwrites existing files.
///
/// - **`rename(from, to)`**: Replaces `to` if it exists. Used to publish
///   staged output, so it must not leave both paths behind on success.
///
/// - **`glob(pattern)`**: Matching paths in sorted order.
pub trait Vfs: Send + Sync {
    fn read_to_string(&self, path: &Path) -> Result<String>;

    fn write_from_string(&self, path: &Path, content: &str) -> Result<()>;

    fn exists(&self, path: &Path) -> bool;

    fn is_dir(&self, path: &Path) -> bool;

    /// Create a directory and all parent directories.
    fn create_dir_all(&self, path: &Path) -> Result<()>;

    fn glob(&self, pattern: &str) -> Result<Vec<PathBuf>>;

    /// Remove a file, or a directory with all its contents.
    fn remove(&self, path: &Path) -> Result<()>;

    fn rename(&self, from: &Path, to: &Path) -> Result<()>;
}

pub use memory::MemoryVfs;
pub use os::OsVfs;

mod memory;
mod os;
