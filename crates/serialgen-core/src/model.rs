//! Structural type model
//!
//! `TypeDecl` is what a type index stores; `TypeDescriptor` is what the
//! resolver hands out once a reference (including its array rank) has been
//! resolved against the index.

use crate::naming::TypeRef;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Shape of a resolved type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    Primitive,
    Array,
    Class,
    Interface,
}

/// Kinds a type index entry may declare. Arrays and the language primitives
/// are never declared; they are synthesized by the resolver. A declared
/// `primitive` is a builtin value type (a string, say) written inline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclKind {
    #[default]
    Class,
    Interface,
    Primitive,
}

impl From<DeclKind> for TypeKind {
    fn from(kind: DeclKind) -> Self {
        match kind {
            DeclKind::Class => TypeKind::Class,
            DeclKind::Interface => TypeKind::Interface,
            DeclKind::Primitive => TypeKind::Primitive,
        }
    }
}

/// Wire strategy selected by the owner's annotation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SerializationMode {
    /// Both ends rely purely on generated code agreeing on field order.
    #[default]
    #[serde(rename = "RPC", alias = "positional-rpc")]
    PositionalRpc,
    /// Positional wire format plus a committed type → field-name manifest.
    #[serde(rename = "DE_RPC", alias = "named-field-manifest")]
    NamedFieldManifest,
}

impl SerializationMode {
    pub fn as_str(self) -> &'static str {
        match self {
            SerializationMode::PositionalRpc => "RPC",
            SerializationMode::NamedFieldManifest => "DE_RPC",
        }
    }
}

impl fmt::Display for SerializationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The `SerialTypes` annotation carried by an owner type.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SerialTypes {
    #[serde(default)]
    pub mode: SerializationMode,
    /// Types sent to the peer. Array roots keep their rank.
    pub roots: Vec<TypeRef>,
    /// Types received from the peer. Empty unless declared.
    #[serde(default)]
    pub from_peer: Vec<TypeRef>,
}

/// Field modifiers relevant to serializability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Modifiers {
    #[serde(default)]
    pub transient: bool,
    #[serde(default, rename = "static")]
    pub is_static: bool,
    #[serde(default, rename = "final")]
    pub is_final: bool,
}

/// A declared field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDecl {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeRef,
    #[serde(flatten)]
    pub modifiers: Modifiers,
}

impl FieldDecl {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
            modifiers: Modifiers::default(),
        }
    }

    /// Instance state that travels on the wire: not static, not transient,
    /// not final.
    pub fn is_serializable(&self) -> bool {
        !self.modifiers.is_static && !self.modifiers.transient && !self.modifiers.is_final
    }
}

fn default_true() -> bool {
    true
}

/// A type as declared in a type index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDecl {
    /// Qualified binary name (`pkg.Outer$Inner`)
    pub name: String,
    #[serde(default)]
    pub kind: DeclKind,
    #[serde(default)]
    pub supertype: Option<TypeRef>,
    #[serde(default)]
    pub interfaces: Vec<TypeRef>,
    /// Marked serializable (implements the serialization marker)
    #[serde(default)]
    pub serializable: bool,
    #[serde(default, rename = "abstract")]
    pub is_abstract: bool,
    /// Has an accessible no-arg construction path
    #[serde(default = "default_true")]
    pub instantiable: bool,
    #[serde(default)]
    pub fields: Vec<FieldDecl>,
    #[serde(default)]
    pub serial_types: Option<SerialTypes>,
}

impl TypeDecl {
    pub fn class(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: DeclKind::Class,
            supertype: None,
            interfaces: Vec::new(),
            serializable: false,
            is_abstract: false,
            instantiable: true,
            fields: Vec::new(),
            serial_types: None,
        }
    }

    pub fn interface(name: impl Into<String>) -> Self {
        Self {
            kind: DeclKind::Interface,
            is_abstract: true,
            instantiable: false,
            ..Self::class(name)
        }
    }

    /// A builtin value type, serializable and written inline.
    pub fn builtin(name: impl Into<String>) -> Self {
        Self {
            kind: DeclKind::Primitive,
            serializable: true,
            ..Self::class(name)
        }
    }

    pub fn serializable(mut self) -> Self {
        self.serializable = true;
        self
    }

    pub fn abstract_(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    pub fn not_instantiable(mut self) -> Self {
        self.instantiable = false;
        self
    }

    pub fn extends(mut self, supertype: &str) -> Self {
        self.supertype = Some(TypeRef::named(supertype));
        self
    }

    pub fn implements(mut self, interface: &str) -> Self {
        self.interfaces.push(TypeRef::named(interface));
        self
    }

    pub fn field(mut self, name: &str, ty: &str) -> Self {
        self.fields.push(FieldDecl::new(name, parse_or_named(ty)));
        self
    }

    pub fn field_with(mut self, field: FieldDecl) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_serial_types(mut self, serial_types: SerialTypes) -> Self {
        self.serial_types = Some(serial_types);
        self
    }
}

// Builder helpers take plain strings; malformed input keeps the raw text
// as a name so the resolver reports it as an unknown type.
fn parse_or_named(ty: &str) -> TypeRef {
    TypeRef::parse(ty).unwrap_or_else(|_| TypeRef::named(ty))
}

/// Resolved shape of a TypeRef
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescriptor {
    pub type_ref: TypeRef,
    pub kind: TypeKind,
    /// Declared fields, serializable or not
    pub fields: Vec<FieldDecl>,
    pub supertype: Option<TypeRef>,
    pub interfaces: Vec<TypeRef>,
    pub serializable: bool,
    pub is_abstract: bool,
    pub instantiable: bool,
    pub serial_types: Option<SerialTypes>,
    /// Component descriptor for arrays
    pub component: Option<Arc<TypeDescriptor>>,
}

impl TypeDescriptor {
    pub fn primitive(type_ref: TypeRef) -> Self {
        Self {
            type_ref,
            kind: TypeKind::Primitive,
            fields: Vec::new(),
            supertype: None,
            interfaces: Vec::new(),
            serializable: true,
            is_abstract: false,
            instantiable: true,
            serial_types: None,
            component: None,
        }
    }

    /// Descriptor for one array layer around `component`.
    pub fn array_of(component: Arc<TypeDescriptor>) -> Self {
        Self {
            type_ref: component.type_ref.wrap(1),
            kind: TypeKind::Array,
            fields: Vec::new(),
            supertype: None,
            interfaces: Vec::new(),
            serializable: component.serializable,
            is_abstract: false,
            instantiable: true,
            serial_types: None,
            component: Some(component),
        }
    }

    /// Descriptor for a declared type, keeping any generic arguments from
    /// the reference it was resolved for.
    pub fn from_decl(decl: &TypeDecl, type_ref: TypeRef) -> Self {
        Self {
            type_ref,
            kind: decl.kind.into(),
            fields: decl.fields.clone(),
            supertype: decl.supertype.clone(),
            interfaces: decl.interfaces.clone(),
            serializable: decl.serializable || decl.kind == DeclKind::Primitive,
            is_abstract: decl.is_abstract || decl.kind == DeclKind::Interface,
            instantiable: decl.instantiable && decl.kind == DeclKind::Class,
            serial_types: decl.serial_types.clone(),
            component: None,
        }
    }

    pub fn is_class(&self) -> bool {
        self.kind == TypeKind::Class
    }

    pub fn is_primitive(&self) -> bool {
        self.kind == TypeKind::Primitive
    }

    /// Can only be sent as one of its subtypes
    pub fn is_polymorphic_only(&self) -> bool {
        matches!(self.kind, TypeKind::Interface) || self.is_abstract
    }

    /// Concrete class the peer may construct directly
    pub fn is_instantiable_class(&self) -> bool {
        self.kind == TypeKind::Class && !self.is_abstract && self.instantiable
    }

    pub fn serializable_fields(&self) -> impl Iterator<Item = &FieldDecl> {
        self.fields.iter().filter(|f| f.is_serializable())
    }
}
