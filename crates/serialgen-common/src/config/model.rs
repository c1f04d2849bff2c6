use crate::sinks::SinkKind;
use serde::{Deserialize, Serialize};

/// Root configuration from serialgen.toml
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SerialgenConfig {
    #[serde(default)]
    pub project: ProjectSection,

    #[serde(default)]
    pub codegen: CodegenSection,

    #[serde(default)]
    pub diagnostics: DiagnosticsSection,
}

/// [project] section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSection {
    #[serde(default = "default_project_name")]
    pub name: String,
    /// Glob patterns for type index files, relative to the config file
    #[serde(default = "default_index_patterns")]
    pub index: Vec<String>,
    /// Where generated units and manifests are written
    #[serde(default = "default_output_dir")]
    pub output_directory: String,
}

impl Default for ProjectSection {
    fn default() -> Self {
        Self {
            name: default_project_name(),
            index: default_index_patterns(),
            output_directory: default_output_dir(),
        }
    }
}

pub(crate) fn default_project_name() -> String {
    "serialgen".to_string()
}

pub(crate) fn default_index_patterns() -> Vec<String> {
    vec!["types/**/*.json".to_string(), "types/**/*.toml".to_string()]
}

pub(crate) fn default_output_dir() -> String {
    "generated".to_string()
}

/// [codegen] section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodegenSection {
    #[serde(default)]
    pub sink: SinkKind,
    /// Package generated units are placed in
    #[serde(default = "default_package")]
    pub package: String,
    /// Owner types to generate; empty means every annotated type in the index
    #[serde(default)]
    pub owners: Vec<String>,
}

impl Default for CodegenSection {
    fn default() -> Self {
        Self {
            sink: SinkKind::default(),
            package: default_package(),
            owners: Vec::new(),
        }
    }
}

fn default_package() -> String {
    serialgen_core::naming::units::DEFAULT_PACKAGE.to_string()
}

/// [diagnostics] section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticsSection {
    /// Private resources (closure logs) go here, never to the output directory
    #[serde(default = "default_private_dir")]
    pub private_directory: String,
}

impl Default for DiagnosticsSection {
    fn default() -> Self {
        Self {
            private_directory: default_private_dir(),
        }
    }
}

fn default_private_dir() -> String {
    ".serialgen/private".to_string()
}
