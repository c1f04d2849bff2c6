use crate::codegen::{string_literal, SourceWriter};
use serialgen_core::{
    CodeSink, CompiledUnit, DispatchTable, EmissionError, Instruction, TableEntry, UnitHeader,
    ValueKind,
};

/// Renders a self-contained Rust module exposing `get_serializer()` and
/// `get_mode()` over static type and instruction tables.
#[derive(Debug, Clone, Copy, Default)]
pub struct RustSourceSink;

const PRELUDE: &str = r#"#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Value {
    Primitive(&'static str),
    Builtin(&'static str),
    Tagged(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    WriteField { slot: u32, name: &'static str, value: Value },
    ReadField { slot: u32, name: &'static str, value: Value },
    WriteLength,
    ReadLength,
    WriteElements(Value),
    ReadElements(Value),
}

#[derive(Debug)]
pub struct TypeEntry {
    pub id: u32,
    pub binary_name: &'static str,
    pub signature: &'static str,
    pub instantiable: bool,
    pub fields: &'static [&'static str],
    pub write: Option<&'static [Op]>,
    pub read: Option<&'static [Op]>,
}

#[derive(Debug)]
pub struct Serializer {
    pub name: &'static str,
    pub fingerprint: &'static str,
    pub types: &'static [TypeEntry],
}

impl Serializer {
    pub fn type_id(&self, binary_name: &str) -> Option<u32> {
        self.types
            .binary_search_by(|t| t.binary_name.cmp(binary_name))
            .ok()
            .map(|i| self.types[i].id)
    }

    pub fn entry(&self, id: u32) -> Option<&'static TypeEntry> {
        self.types.get(id as usize)
    }
}
"#;

impl CodeSink for RustSourceSink {
    fn render(
        &self,
        header: &UnitHeader,
        table: &DispatchTable,
    ) -> Result<CompiledUnit, EmissionError> {
        let mut w = SourceWriter::new();
        w.comment(&format!(
            "Generated by serialgen for {}. Do not edit.",
            header.owner
        ))
        .comment(&format!("Unit {}", header.qualified_name()))
        .blank()
        .line(&format!("pub const MODE: &str = {};", string_literal(header.mode.as_str())))
        .line(&format!(
            "pub const SERIALIZER: &str = {};",
            string_literal(&header.serializer_name)
        ))
        .line(&format!(
            "pub const FINGERPRINT: &str = {};",
            string_literal(&table.fingerprint)
        ))
        .blank();
        for line in PRELUDE.lines() {
            w.line(line);
        }
        w.blank();

        if table.is_empty() {
            w.line("pub const TYPES: &[TypeEntry] = &[];");
        } else {
            w.open("pub const TYPES: &[TypeEntry] = &[");
            for entry in &table.entries {
                write_entry(&mut w, entry);
            }
            w.close("];");
        }

        w.blank()
            .open("static SERIALIZER_INSTANCE: Serializer = Serializer {")
            .line("name: SERIALIZER,")
            .line("fingerprint: FINGERPRINT,")
            .line("types: TYPES,")
            .close("};")
            .blank()
            .open("pub fn get_serializer() -> &'static Serializer {")
            .line("&SERIALIZER_INSTANCE")
            .close("}")
            .blank()
            .open("pub fn get_mode() -> &'static str {")
            .line("MODE")
            .close("}");

        Ok(CompiledUnit {
            file_name: format!("{}/{}.rs", header.package, header.class_name),
            contents: w.finish(),
        })
    }
}

fn write_entry(w: &mut SourceWriter, entry: &TableEntry) {
    let fields: Vec<String> = entry.fields.iter().map(|f| string_literal(&f.name)).collect();
    w.open("TypeEntry {")
        .line(&format!("id: {},", entry.id))
        .line(&format!("binary_name: {},", string_literal(&entry.binary_name)))
        .line(&format!("signature: {},", string_literal(&entry.signature)))
        .line(&format!("instantiable: {},", entry.instantiable))
        .line(&format!("fields: &[{}],", fields.join(", ")));
    write_ops(w, "write", entry.write.as_deref());
    write_ops(w, "read", entry.read.as_deref());
    w.close("},");
}

fn write_ops(w: &mut SourceWriter, label: &str, ops: Option<&[Instruction]>) {
    let Some(ops) = ops else {
        w.line(&format!("{}: None,", label));
        return;
    };
    if ops.is_empty() {
        w.line(&format!("{}: Some(&[]),", label));
        return;
    }
    w.open(&format!("{}: Some(&[", label));
    for op in ops {
        w.line(&format!("{},", op_literal(op)));
    }
    w.close("]),");
}

fn op_literal(op: &Instruction) -> String {
    match op {
        Instruction::WriteField {
            slot, name, value, ..
        } => format!(
            "Op::WriteField {{ slot: {}, name: {}, value: {} }}",
            slot,
            string_literal(name),
            value_literal(value)
        ),
        Instruction::ReadField {
            slot, name, value, ..
        } => format!(
            "Op::ReadField {{ slot: {}, name: {}, value: {} }}",
            slot,
            string_literal(name),
            value_literal(value)
        ),
        Instruction::WriteLength => "Op::WriteLength".to_string(),
        Instruction::ReadLength => "Op::ReadLength".to_string(),
        Instruction::WriteElements { value } => format!("Op::WriteElements({})", value_literal(value)),
        Instruction::ReadElements { value } => format!("Op::ReadElements({})", value_literal(value)),
    }
}

fn value_literal(value: &ValueKind) -> String {
    match value {
        ValueKind::Primitive(kind) => format!("Value::Primitive({})", string_literal(kind.name())),
        ValueKind::Builtin(ty) => format!("Value::Builtin({})", string_literal(&ty.binary_name())),
        ValueKind::Tagged(ty) => format!("Value::Tagged({})", string_literal(&ty.binary_name())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serialgen_core::{
        DiagnosticLog, Generator, SerialTypes, SerializationMode, TypeDecl, TypeIndex, TypeRef,
    };

    fn render_points() -> CompiledUnit {
        let index = TypeIndex::new()
            .with(TypeDecl::class("app.Point").serializable().field("y", "int").field("x", "int"))
            .with(TypeDecl::class("app.Feed").with_serial_types(SerialTypes {
                mode: SerializationMode::PositionalRpc,
                roots: vec![TypeRef::parse("app.Point[]").unwrap()],
                from_peer: vec![],
            }));
        let generator = Generator::new(&index, &RustSourceSink);
        generator
            .build_artifact(&TypeRef::named("app.Feed"), &mut DiagnosticLog::new())
            .unwrap()
            .unit
    }

    #[test]
    fn test_renders_entry_points() {
        let unit = render_points();
        assert_eq!(unit.file_name, "comet/app_FeedImpl.rs");
        assert!(unit.contents.contains("pub const MODE: &str = \"RPC\";"));
        assert!(unit.contents.contains("pub const SERIALIZER: &str = \"comet.app_FeedSerializer\";"));
        assert!(unit.contents.contains("pub fn get_serializer() -> &'static Serializer {"));
        assert!(unit.contents.contains("pub fn get_mode() -> &'static str {"));
    }

    #[test]
    fn test_renders_instructions_in_slot_order() {
        let unit = render_points();
        let x = unit
            .contents
            .find("Op::WriteField { slot: 0, name: \"x\", value: Value::Primitive(\"int\") }")
            .unwrap();
        let y = unit
            .contents
            .find("Op::WriteField { slot: 1, name: \"y\", value: Value::Primitive(\"int\") }")
            .unwrap();
        assert!(x < y);
        assert!(unit.contents.contains("Op::WriteElements(Value::Tagged(\"app.Point\"))"));
        assert!(unit.contents.contains("binary_name: \"[Lapp.Point;\","));
        assert!(unit.contents.contains("read: None,"));
    }

    #[test]
    fn test_rendering_is_deterministic() {
        assert_eq!(render_points(), render_points());
    }
}
