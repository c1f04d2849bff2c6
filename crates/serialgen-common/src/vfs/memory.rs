use super::Vfs;
use std::collections::BTreeMap;
use std::io::{Error, ErrorKind, Result};
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// In-memory file system. Clones share the same files.
#[derive(Clone, Default, Debug)]
pub struct MemoryVfs {
    files: Arc<Mutex<BTreeMap<PathBuf, String>>>,
}

impl MemoryVfs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a file, for tests and fixtures.
    pub fn with_file(self, path: impl AsRef<Path>, content: &str) -> Self {
        self.lock()
            .insert(Self::normalize_path(path.as_ref()), content.to_string());
        self
    }

    /// All file paths, sorted
    pub fn paths(&self) -> Vec<PathBuf> {
        self.lock().keys().cloned().collect()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<PathBuf, String>> {
        self.files.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn normalize_path(path: &Path) -> PathBuf {
        let mut normalized = PathBuf::new();
        for component in path.components() {
            if let Component::CurDir = component {
                continue;
            }
            normalized.push(component);
        }
        if normalized.as_os_str().is_empty() {
            return PathBuf::from(".");
        }
        normalized
    }

    fn not_found(path: &Path) -> Error {
        Error::new(ErrorKind::NotFound, format!("File not found: {:?}", path))
    }

    fn has_children(files: &BTreeMap<PathBuf, String>, dir: &Path) -> bool {
        if dir == Path::new(".") || dir == Path::new("/") {
            return !files.is_empty();
        }
        files.keys().any(|k| k.starts_with(dir) && k != dir)
    }
}

impl Vfs for MemoryVfs {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        let path = Self::normalize_path(path);
        self.lock()
            .get(&path)
            .cloned()
            .ok_or_else(|| Self::not_found(&path))
    }

    fn write_from_string(&self, path: &Path, content: &str) -> Result<()> {
        let path = Self::normalize_path(path);
        self.lock().insert(path, content.to_string());
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        let path = Self::normalize_path(path);
        let files = self.lock();
        files.contains_key(&path) || Self::has_children(&files, &path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        let path = Self::normalize_path(path);
        Self::has_children(&self.lock(), &path)
    }

    // Directories exist implicitly while they hold files.
    fn create_dir_all(&self, _path: &Path) -> Result<()> {
        Ok(())
    }

    fn glob(&self, pattern: &str) -> Result<Vec<PathBuf>> {
        let pattern = Self::normalize_path(Path::new(pattern));
        let pattern = glob::Pattern::new(&pattern.to_string_lossy())
            .map_err(|e| Error::new(ErrorKind::InvalidInput, e))?;
        Ok(self
            .lock()
            .keys()
            .filter(|path| pattern.matches_path(path))
            .cloned()
            .collect())
    }

    fn remove(&self, path: &Path) -> Result<()> {
        let path = Self::normalize_path(path);
        self.lock()
            .retain(|k, _| k != &path && !k.starts_with(&path));
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        let from = Self::normalize_path(from);
        let to = Self::normalize_path(to);
        let mut files = self.lock();
        let content = files.remove(&from).ok_or_else(|| Self::not_found(&from))?;
        files.insert(to, content);
        Ok(())
    }
}
