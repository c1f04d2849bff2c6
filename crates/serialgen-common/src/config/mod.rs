//! Configuration module
//!
//! Handles discovery and parsing of serialgen configuration files
//! (serialgen.toml, serialgen.json).

pub mod model;

use anyhow::Context;
use std::path::{Path, PathBuf};

pub use self::model::*;

/// File names searched for, in order of preference
pub const CONFIG_FILE_NAMES: [&str; 2] = ["serialgen.toml", "serialgen.json"];

impl SerialgenConfig {
    /// Load configuration from a file path
    pub fn load(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::parse(path, &content)
    }

    /// Parse `content`, picking the format from the extension of `path`.
    pub fn parse(path: &Path, content: &str) -> crate::Result<Self> {
        if path.extension().and_then(|s| s.to_str()) == Some("json") {
            return serde_json::from_str(content)
                .with_context(|| format!("Failed to parse JSON config: {:?}", path));
        }

        // Default to TOML
        toml::from_str(content).with_context(|| format!("Failed to parse TOML config: {:?}", path))
    }
}

/// Loaded configuration plus where it came from
#[derive(Debug, Clone)]
pub struct ConfigContext {
    pub config: SerialgenConfig,
    /// Path to the config file, if one was found
    pub config_path: Option<PathBuf>,
    /// Directory relative paths in the config resolve against
    pub root: PathBuf,
}

impl ConfigContext {
    /// Defaults rooted at `root`, used when no config file exists.
    pub fn defaults(root: &Path) -> Self {
        Self {
            config: SerialgenConfig::default(),
            config_path: None,
            root: root.to_path_buf(),
        }
    }

    pub fn load(config_path: &Path) -> crate::Result<Self> {
        let config = SerialgenConfig::load(config_path)?;
        let root = config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Ok(Self {
            config,
            config_path: Some(config_path.to_path_buf()),
            root,
        })
    }

    /// Use an explicit config file, or discover one from `start_dir`, or fall
    /// back to defaults rooted at `start_dir`.
    pub fn resolve(explicit: Option<&Path>, start_dir: &Path) -> crate::Result<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None => match discover_config(start_dir) {
                Some(path) => Self::load(&path),
                None => Ok(Self::defaults(start_dir)),
            },
        }
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root.join(&self.config.project.output_directory)
    }

    pub fn private_dir(&self) -> PathBuf {
        self.root.join(&self.config.diagnostics.private_directory)
    }

    /// Index glob patterns anchored at the config root
    pub fn index_patterns(&self) -> Vec<String> {
        self.config
            .project
            .index
            .iter()
            .map(|p| self.root.join(p).to_string_lossy().into_owned())
            .collect()
    }
}

/// Walk up directory tree to find serialgen.toml or serialgen.json
pub fn discover_config(start_dir: &Path) -> Option<PathBuf> {
    let mut current = start_dir.to_path_buf();

    loop {
        for name in CONFIG_FILE_NAMES {
            let candidate = current.join(name);
            if candidate.exists() {
                return Some(candidate);
            }
        }

        match current.parent() {
            Some(parent) => current = parent.to_path_buf(),
            None => break,
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sinks::SinkKind;

    #[test]
    fn test_load_toml() -> anyhow::Result<()> {
        let toml_content = r#"
[project]
name = "chat"
index = ["schema/*.toml"]

[codegen]
sink = "json"
owners = ["app.ChatStream"]
"#;
        let dir = tempfile::tempdir()?;
        let file_path = dir.path().join("serialgen.toml");
        std::fs::write(&file_path, toml_content)?;

        let config = SerialgenConfig::load(&file_path)?;
        assert_eq!(config.project.name, "chat");
        assert_eq!(config.project.index, vec!["schema/*.toml"]);
        assert_eq!(config.project.output_directory, "generated");
        assert_eq!(config.codegen.sink, SinkKind::Json);
        assert_eq!(config.codegen.package, "comet");
        assert_eq!(config.codegen.owners, vec!["app.ChatStream"]);
        assert_eq!(config.diagnostics.private_directory, ".serialgen/private");

        Ok(())
    }

    #[test]
    fn test_load_json() -> anyhow::Result<()> {
        let json_content = r#"{
    "project": { "name": "chat", "output_directory": "out" },
    "codegen": { "package": "wire" }
}"#;
        let dir = tempfile::tempdir()?;
        let file_path = dir.path().join("serialgen.json");
        std::fs::write(&file_path, json_content)?;

        let config = SerialgenConfig::load(&file_path)?;
        assert_eq!(config.project.output_directory, "out");
        assert_eq!(config.codegen.package, "wire");
        assert_eq!(config.codegen.sink, SinkKind::Rust);

        Ok(())
    }

    #[test]
    fn test_discover_walks_up() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join("serialgen.toml"), "")?;
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested)?;

        let found = discover_config(&nested).expect("config should be found");
        assert_eq!(found, dir.path().join("serialgen.toml"));

        let ctx = ConfigContext::resolve(None, &nested)?;
        assert_eq!(ctx.root, dir.path());
        assert_eq!(ctx.output_dir(), dir.path().join("generated"));
        Ok(())
    }

    #[test]
    fn test_empty_file_is_all_defaults() -> anyhow::Result<()> {
        let config = SerialgenConfig::parse(Path::new("serialgen.toml"), "")?;
        assert_eq!(config, SerialgenConfig::default());
        Ok(())
    }
}
