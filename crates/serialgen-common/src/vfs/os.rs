use super::Vfs;
use std::fs;
use std::io::Result;
use std::path::{Path, PathBuf};

/// OS File System implementation
#[derive(Debug, Clone, Copy, Default)]
pub struct OsVfs;

impl Vfs for OsVfs {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path)
    }

    fn write_from_string(&self, path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path)
    }

    fn glob(&self, pattern: &str) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::new();
        for entry in glob::glob(pattern).map_err(std::io::Error::other)? {
            paths.push(entry.map_err(std::io::Error::other)?);
        }
        paths.sort();
        Ok(paths)
    }

    fn remove(&self, path: &Path) -> Result<()> {
        if path.is_dir() {
            fs::remove_dir_all(path)
        } else {
            fs::remove_file(path)
        }
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::rename(from, to)
    }
}
