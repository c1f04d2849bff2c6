//! Staged generator context
//!
//! Deliverables are held in memory until [`StagedContext::finish`], which
//! writes them next to their final paths and then renames them into place.
//! If any write fails, everything written so far is removed, so a run
//! delivers all of its files or none. Private resources are written
//! straight to the private directory and are never delivered.

use crate::vfs::Vfs;
use anyhow::Context;
use serialgen_core::{CompiledUnit, GenerateError, GeneratorContext};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const STAGING_SUFFIX: &str = ".staging";

pub struct StagedContext<'v> {
    vfs: &'v dyn Vfs,
    output_dir: PathBuf,
    private_dir: PathBuf,
    created: BTreeSet<String>,
    staged: BTreeMap<PathBuf, String>,
}

impl<'v> StagedContext<'v> {
    pub fn new(vfs: &'v dyn Vfs, output_dir: &Path, private_dir: &Path) -> Self {
        Self {
            vfs,
            output_dir: output_dir.to_path_buf(),
            private_dir: private_dir.to_path_buf(),
            created: BTreeSet::new(),
            staged: BTreeMap::new(),
        }
    }

    /// Paths that `finish` would write
    pub fn pending(&self) -> Vec<&Path> {
        self.staged.keys().map(PathBuf::as_path).collect()
    }

    /// Write every staged deliverable, all or nothing. Returns the paths
    /// written.
    pub fn finish(&mut self) -> crate::Result<Vec<PathBuf>> {
        let staged = std::mem::take(&mut self.staged);
        let mut temps: Vec<(PathBuf, PathBuf)> = Vec::new();

        for (path, contents) in &staged {
            let temp = staging_path(path);
            let written = self
                .vfs
                .write_from_string(&temp, contents)
                .with_context(|| format!("Failed to stage {:?}", path));
            if let Err(e) = written {
                self.discard(temps.iter().map(|(t, _)| t.as_path()));
                return Err(e);
            }
            temps.push((temp, path.clone()));
        }

        let mut published = Vec::new();
        for (temp, path) in &temps {
            let renamed = self
                .vfs
                .rename(temp, path)
                .with_context(|| format!("Failed to publish {:?}", path));
            if let Err(e) = renamed {
                self.discard(temps.iter().map(|(t, _)| t.as_path()));
                self.discard(published.iter().map(PathBuf::as_path));
                return Err(e);
            }
            published.push(path.clone());
        }

        debug!("published {} files", published.len());
        Ok(published)
    }

    fn discard<'p>(&self, paths: impl Iterator<Item = &'p Path>) {
        for path in paths {
            if self.vfs.exists(path) {
                if let Err(e) = self.vfs.remove(path) {
                    warn!("Failed to clean up {:?}: {}", path, e);
                }
            }
        }
    }

    fn stage(&mut self, name: &str, contents: &str) {
        self.staged
            .insert(self.output_dir.join(name), contents.to_string());
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(STAGING_SUFFIX);
    PathBuf::from(name)
}

impl GeneratorContext for StagedContext<'_> {
    fn try_create(&mut self, package: &str, class_name: &str) -> bool {
        self.created.insert(format!("{}.{}", package, class_name))
    }

    fn commit_unit(&mut self, unit: &CompiledUnit) -> serialgen_core::Result<()> {
        self.stage(&unit.file_name, &unit.contents);
        Ok(())
    }

    fn commit_manifest(&mut self, name: &str, contents: &str) -> serialgen_core::Result<()> {
        self.stage(name, contents);
        Ok(())
    }

    fn commit_private(&mut self, name: &str, contents: &str) -> serialgen_core::Result<()> {
        let path = self.private_dir.join(name);
        self.vfs
            .write_from_string(&path, contents)
            .map_err(|source| GenerateError::Commit {
                name: name.to_string(),
                source,
            })
    }

    fn abort(&mut self) {
        self.staged.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vfs::MemoryVfs;
    use std::io::{Error, ErrorKind};

    fn unit(name: &str) -> CompiledUnit {
        CompiledUnit {
            file_name: name.to_string(),
            contents: format!("// {}", name),
        }
    }

    #[test]
    fn test_nothing_written_before_finish() {
        let vfs = MemoryVfs::new();
        let mut ctx = StagedContext::new(&vfs, Path::new("out"), Path::new("private"));
        ctx.commit_unit(&unit("comet/AImpl.rs")).unwrap();
        ctx.commit_manifest("a.rpcdata.json", "{}").unwrap();
        ctx.commit_private("a.rpc.log", "log").unwrap();

        assert_eq!(vfs.paths(), vec![PathBuf::from("private/a.rpc.log")]);

        let written = ctx.finish().unwrap();
        assert_eq!(written.len(), 2);
        assert_eq!(
            vfs.read_to_string(Path::new("out/comet/AImpl.rs")).unwrap(),
            "// comet/AImpl.rs"
        );
        assert!(vfs.paths().iter().all(|p| !p.to_string_lossy().ends_with(".staging")));
    }

    #[test]
    fn test_abort_drops_staged_files() {
        let vfs = MemoryVfs::new();
        let mut ctx = StagedContext::new(&vfs, Path::new("out"), Path::new("private"));
        ctx.commit_unit(&unit("comet/AImpl.rs")).unwrap();
        ctx.abort();
        assert!(ctx.finish().unwrap().is_empty());
        assert!(vfs.paths().is_empty());
    }

    #[test]
    fn test_try_create_once_per_unit() {
        let vfs = MemoryVfs::new();
        let mut ctx = StagedContext::new(&vfs, Path::new("out"), Path::new("private"));
        assert!(ctx.try_create("comet", "AImpl"));
        assert!(!ctx.try_create("comet", "AImpl"));
        assert!(ctx.try_create("comet", "BImpl"));
    }

    /// Fails every write under `out/b`
    struct FlakyVfs(MemoryVfs);

    impl Vfs for FlakyVfs {
        fn read_to_string(&self, path: &Path) -> std::io::Result<String> {
            self.0.read_to_string(path)
        }
        fn write_from_string(&self, path: &Path, content: &str) -> std::io::Result<()> {
            if path.starts_with("out/b") {
                return Err(Error::new(ErrorKind::PermissionDenied, "read-only"));
            }
            self.0.write_from_string(path, content)
        }
        fn exists(&self, path: &Path) -> bool {
            self.0.exists(path)
        }
        fn is_dir(&self, path: &Path) -> bool {
            self.0.is_dir(path)
        }
        fn create_dir_all(&self, path: &Path) -> std::io::Result<()> {
            self.0.create_dir_all(path)
        }
        fn glob(&self, pattern: &str) -> std::io::Result<Vec<PathBuf>> {
            self.0.glob(pattern)
        }
        fn remove(&self, path: &Path) -> std::io::Result<()> {
            self.0.remove(path)
        }
        fn rename(&self, from: &Path, to: &Path) -> std::io::Result<()> {
            self.0.rename(from, to)
        }
    }

    #[test]
    fn test_failed_write_leaves_nothing_behind() {
        let memory = MemoryVfs::new();
        let vfs = FlakyVfs(memory.clone());
        let mut ctx = StagedContext::new(&vfs, Path::new("out"), Path::new("private"));
        ctx.commit_unit(&unit("a/AImpl.rs")).unwrap();
        ctx.commit_unit(&unit("b/BImpl.rs")).unwrap();

        assert!(ctx.finish().is_err());
        assert!(memory.paths().is_empty());
    }
}
