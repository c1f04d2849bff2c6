//! Type index loading
//!
//! Type index files are JSON or TOML documents holding a `types` list of
//! declarations. They are discovered through glob patterns on a [`Vfs`] and
//! merged into one [`TypeIndex`]; a type declared twice is an error.

use crate::vfs::Vfs;
use indexmap::IndexMap;
use serde::Deserialize;
use serialgen_core::{TypeDecl, TypeIndex};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid index pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse JSON index {path:?}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to parse TOML index {path:?}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Type {name} declared in both {first:?} and {second:?}")]
    DuplicateType {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },
}

/// On-disk shape of one index file
#[derive(Debug, Deserialize)]
struct IndexFile {
    #[serde(default)]
    types: Vec<TypeDecl>,
}

/// A merged type index plus where each type came from
#[derive(Debug, Default)]
pub struct LoadedIndex {
    pub index: TypeIndex,
    /// Type name → defining file, in load order
    pub sources: IndexMap<String, PathBuf>,
    pub files: Vec<PathBuf>,
}

/// Parse one index file, choosing the format from its extension.
pub fn parse_index_file(path: &Path, content: &str) -> Result<Vec<TypeDecl>, LoadError> {
    let file: IndexFile = if path.extension().and_then(|s| s.to_str()) == Some("toml") {
        toml::from_str(content).map_err(|source| LoadError::Toml {
            path: path.to_path_buf(),
            source,
        })?
    } else {
        serde_json::from_str(content).map_err(|source| LoadError::Json {
            path: path.to_path_buf(),
            source,
        })?
    };
    Ok(file.types)
}

/// Load every file matched by `patterns` into one index.
pub fn load_index(vfs: &dyn Vfs, patterns: &[String]) -> Result<LoadedIndex, LoadError> {
    let mut files = Vec::new();
    for pattern in patterns {
        let matched = vfs.glob(pattern).map_err(|source| LoadError::Pattern {
            pattern: pattern.clone(),
            source,
        })?;
        debug!("index pattern {} matched {} files", pattern, matched.len());
        for path in matched {
            if !files.contains(&path) && !vfs.is_dir(&path) {
                files.push(path);
            }
        }
    }

    let mut loaded = LoadedIndex::default();
    for path in files {
        let content = vfs.read_to_string(&path).map_err(|source| LoadError::Io {
            path: path.clone(),
            source,
        })?;
        for decl in parse_index_file(&path, &content)? {
            if let Some(first) = loaded.sources.get(&decl.name) {
                return Err(LoadError::DuplicateType {
                    name: decl.name,
                    first: first.clone(),
                    second: path,
                });
            }
            loaded.sources.insert(decl.name.clone(), path.clone());
            loaded.index.insert(decl);
        }
        loaded.files.push(path);
    }

    info!(
        "Loaded {} types from {} index files",
        loaded.index.len(),
        loaded.files.len()
    );
    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vfs::MemoryVfs;
    use serialgen_core::{SerializationMode, TypeIntrospection};

    const POINTS_JSON: &str = r#"{
  "types": [
    {
      "name": "app.Point",
      "serializable": true,
      "fields": [
        { "name": "x", "type": "int" },
        { "name": "y", "type": "int" },
        { "name": "ORIGIN", "type": "app.Point", "static": true }
      ]
    }
  ]
}"#;

    const FEED_TOML: &str = r#"
[[types]]
name = "app.Feed"

[types.serial_types]
mode = "DE_RPC"
roots = ["app.Point[]"]
"#;

    #[test]
    fn test_loads_json_and_toml() {
        let vfs = MemoryVfs::new()
            .with_file("types/points.json", POINTS_JSON)
            .with_file("types/feed.toml", FEED_TOML);
        let loaded = load_index(
            &vfs,
            &["types/*.json".to_string(), "types/*.toml".to_string()],
        )
        .unwrap();

        assert_eq!(loaded.index.names(), vec!["app.Feed", "app.Point"]);
        assert_eq!(loaded.sources["app.Point"], PathBuf::from("types/points.json"));

        let feed = loaded.index.lookup("app.Feed").unwrap();
        let serial_types = feed.serial_types.as_ref().unwrap();
        assert_eq!(serial_types.mode, SerializationMode::NamedFieldManifest);
        assert_eq!(serial_types.roots[0].to_string(), "app.Point[]");

        let point = loaded.index.lookup("app.Point").unwrap();
        assert_eq!(point.fields.iter().filter(|f| f.is_serializable()).count(), 2);
    }

    #[test]
    fn test_duplicate_type_is_an_error() {
        let vfs = MemoryVfs::new()
            .with_file("a/points.json", POINTS_JSON)
            .with_file("b/points.json", POINTS_JSON);
        let err = load_index(&vfs, &["*/points.json".to_string()]).unwrap_err();
        match err {
            LoadError::DuplicateType { name, first, second } => {
                assert_eq!(name, "app.Point");
                assert_eq!(first, PathBuf::from("a/points.json"));
                assert_eq!(second, PathBuf::from("b/points.json"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_overlapping_patterns_load_once() {
        let vfs = MemoryVfs::new().with_file("types/points.json", POINTS_JSON);
        let loaded = load_index(
            &vfs,
            &["types/*.json".to_string(), "types/**/*.json".to_string()],
        )
        .unwrap();
        assert_eq!(loaded.files.len(), 1);
    }

    #[test]
    fn test_bad_type_reference_is_reported_with_path() {
        let vfs = MemoryVfs::new().with_file(
            "types/bad.json",
            r#"{"types": [{"name": "a.B", "fields": [{"name": "f", "type": "a.C<"}]}]}"#,
        );
        let err = load_index(&vfs, &["types/*.json".to_string()]).unwrap_err();
        assert!(matches!(err, LoadError::Json { ref path, .. } if path == Path::new("types/bad.json")));
    }
}
