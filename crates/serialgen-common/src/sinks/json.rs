use serde::Serialize;
use serialgen_core::{CodeSink, CompiledUnit, DispatchTable, EmissionError, UnitHeader};

/// Renders the unit header and dispatch table as pretty JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSink;

#[derive(Serialize)]
struct JsonUnit<'a> {
    unit: &'a UnitHeader,
    serializer: String,
    table: &'a DispatchTable,
}

impl CodeSink for JsonSink {
    fn render(
        &self,
        header: &UnitHeader,
        table: &DispatchTable,
    ) -> Result<CompiledUnit, EmissionError> {
        let document = JsonUnit {
            unit: header,
            serializer: header.serializer_name.clone(),
            table,
        };
        let mut contents = serde_json::to_string_pretty(&document)
            .map_err(|e| EmissionError::with_source("cannot encode dispatch table", e))?;
        contents.push('\n');
        Ok(CompiledUnit {
            file_name: format!("{}/{}.json", header.package, header.class_name),
            contents,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serialgen_core::{SerializationMode, TypeRef};

    #[test]
    fn test_renders_header_and_table() {
        let header = UnitHeader::for_owner(
            "comet",
            &TypeRef::named("app.Feed"),
            SerializationMode::NamedFieldManifest,
        );
        let table = DispatchTable {
            fingerprint: "00ff".into(),
            entries: Vec::new(),
        };
        let unit = JsonSink.render(&header, &table).unwrap();
        assert_eq!(unit.file_name, "comet/app_FeedImpl.json");

        let json: serde_json::Value = serde_json::from_str(&unit.contents).unwrap();
        assert_eq!(json["unit"]["mode"], "DE_RPC");
        assert_eq!(json["serializer"], "comet.app_FeedSerializer");
        assert_eq!(json["table"]["fingerprint"], "00ff");
    }
}
