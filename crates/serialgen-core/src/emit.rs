//! Artifact emission
//!
//! The emitter does not know any target language. It names the unit, hands
//! the dispatch table to a [`CodeSink`] and, under the named-field mode,
//! builds the field manifest from the table.

use crate::error::{EmissionError, Result};
use crate::model::{SerializationMode, TypeKind};
use crate::naming::{units, TypeRef};
use crate::table::DispatchTable;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

/// Names and mode of the unit being generated
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitHeader {
    pub package: String,
    pub class_name: String,
    pub serializer_name: String,
    pub owner: TypeRef,
    pub mode: SerializationMode,
}

impl UnitHeader {
    pub fn for_owner(package: &str, owner: &TypeRef, mode: SerializationMode) -> Self {
        Self {
            package: package.to_string(),
            class_name: units::class_name(owner),
            serializer_name: units::serializer_name(package, owner),
            owner: owner.clone(),
            mode,
        }
    }

    /// `<package>.<class>`, the name handed back to the caller
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.package, self.class_name)
    }
}

/// Rendered unit ready to be committed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledUnit {
    /// Relative path of the unit inside the output directory
    pub file_name: String,
    pub contents: String,
}

/// Renders a dispatch table into a target representation.
///
/// Rendering must be deterministic: the same header and table always
/// produce byte-identical output.
pub trait CodeSink: Send + Sync {
    fn render(
        &self,
        header: &UnitHeader,
        table: &DispatchTable,
    ) -> std::result::Result<CompiledUnit, EmissionError>;
}

/// Binary type name → ordered field names, for name-based matching at
/// runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldManifest {
    /// Qualified source name of the owner type
    pub owner: String,
    pub fields: BTreeMap<String, Vec<String>>,
}

impl FieldManifest {
    /// Collect every class-kind entry the owner sends to the peer.
    pub fn from_table(owner: &TypeRef, table: &DispatchTable) -> Self {
        let fields = table
            .entries
            .iter()
            .filter(|e| e.kind == TypeKind::Class && e.write.is_some())
            .map(|e| {
                let names = e.field_names().into_iter().map(String::from).collect();
                (e.binary_name.clone(), names)
            })
            .collect();
        Self {
            owner: owner.source_name(),
            fields,
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn to_json(&self) -> Result<String> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        Ok(json)
    }
}

/// Everything produced for one owner
#[derive(Debug, Clone)]
pub struct GeneratedArtifact {
    pub header: UnitHeader,
    pub table: DispatchTable,
    pub unit: CompiledUnit,
    /// Present only under `NamedFieldManifest`
    pub manifest: Option<FieldManifest>,
}

impl GeneratedArtifact {
    pub fn mode(&self) -> SerializationMode {
        self.header.mode
    }
}

pub struct ArtifactEmitter<'s> {
    sink: &'s dyn CodeSink,
    package: String,
}

impl<'s> ArtifactEmitter<'s> {
    pub fn new(sink: &'s dyn CodeSink) -> Self {
        Self {
            sink,
            package: units::DEFAULT_PACKAGE.to_string(),
        }
    }

    pub fn with_package(mut self, package: impl Into<String>) -> Self {
        self.package = package.into();
        self
    }

    pub fn emit(
        &self,
        table: DispatchTable,
        mode: SerializationMode,
        owner: &TypeRef,
    ) -> Result<GeneratedArtifact> {
        let header = UnitHeader::for_owner(&self.package, owner, mode);
        let unit = self.sink.render(&header, &table)?;
        debug!("rendered {} ({} bytes)", unit.file_name, unit.contents.len());

        let manifest = match mode {
            SerializationMode::NamedFieldManifest => Some(FieldManifest::from_table(owner, &table)),
            SerializationMode::PositionalRpc => None,
        };

        Ok(GeneratedArtifact {
            header,
            table,
            unit,
            manifest,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GenerateError;

    struct ListingSink;

    impl CodeSink for ListingSink {
        fn render(
            &self,
            header: &UnitHeader,
            table: &DispatchTable,
        ) -> std::result::Result<CompiledUnit, EmissionError> {
            Ok(CompiledUnit {
                file_name: format!("{}.txt", header.class_name),
                contents: format!("{} {}", header.serializer_name, table.len()),
            })
        }
    }

    struct BrokenSink;

    impl CodeSink for BrokenSink {
        fn render(
            &self,
            _header: &UnitHeader,
            _table: &DispatchTable,
        ) -> std::result::Result<CompiledUnit, EmissionError> {
            Err(EmissionError::new("backend unavailable"))
        }
    }

    fn empty_table() -> DispatchTable {
        DispatchTable {
            fingerprint: String::new(),
            entries: Vec::new(),
        }
    }

    #[test]
    fn test_unit_names_follow_owner() {
        let owner = TypeRef::named("com.example.Feed");
        let artifact = ArtifactEmitter::new(&ListingSink)
            .emit(empty_table(), SerializationMode::PositionalRpc, &owner)
            .unwrap();
        assert_eq!(artifact.header.qualified_name(), "comet.com_example_FeedImpl");
        assert_eq!(artifact.unit.contents, "comet.com_example_FeedSerializer 0");
        assert!(artifact.manifest.is_none());
    }

    #[test]
    fn test_named_mode_always_has_manifest() {
        let owner = TypeRef::named("com.example.Feed");
        let artifact = ArtifactEmitter::new(&ListingSink)
            .with_package("wire")
            .emit(empty_table(), SerializationMode::NamedFieldManifest, &owner)
            .unwrap();
        assert_eq!(artifact.header.qualified_name(), "wire.com_example_FeedImpl");
        let manifest = artifact.manifest.unwrap();
        assert!(manifest.is_empty());
        assert_eq!(manifest.owner, "com.example.Feed");
    }

    #[test]
    fn test_sink_failure_is_emission_failed() {
        let err = ArtifactEmitter::new(&BrokenSink)
            .emit(empty_table(), SerializationMode::NamedFieldManifest, &TypeRef::named("a.B"))
            .unwrap_err();
        assert!(matches!(err, GenerateError::EmissionFailed(_)));
    }
}
