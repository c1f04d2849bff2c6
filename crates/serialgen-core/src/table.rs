//! Dispatch table
//!
//! The table is what both ends compile against. It covers the union of
//! the two closures, sorted by binary name, and gives every non-primitive
//! member a stable id, a layout signature and the instruction sequences
//! for the directions it travels in.

use crate::closure::{Direction, SerializableClosure};
use crate::error::{GenerateError, Result};
use crate::model::{TypeDescriptor, TypeKind};
use crate::naming::{PrimitiveKind, TypeRef};
use crate::order::{FieldOrderTable, FieldSlot, OrderMap};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// How a single value is put on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "type", rename_all = "snake_case")]
pub enum ValueKind {
    /// Language primitive, written inline
    Primitive(PrimitiveKind),
    /// Builtin value type from the index, written inline
    Builtin(TypeRef),
    /// Object value, prefixed with the type id of its runtime type
    Tagged(TypeRef),
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Primitive(kind) => write!(f, "{}", kind),
            ValueKind::Builtin(ty) => write!(f, "{}", ty),
            ValueKind::Tagged(ty) => write!(f, "tagged {}", ty),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Instruction {
    WriteField {
        slot: usize,
        name: String,
        declared_by: TypeRef,
        value: ValueKind,
    },
    ReadField {
        slot: usize,
        name: String,
        declared_by: TypeRef,
        value: ValueKind,
    },
    WriteLength,
    ReadLength,
    WriteElements {
        value: ValueKind,
    },
    ReadElements {
        value: ValueKind,
    },
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::WriteField {
                slot, name, value, ..
            } => write!(f, "write field {} of type {} at slot {}", name, value, slot),
            Instruction::ReadField {
                slot, name, value, ..
            } => write!(f, "read field {} of type {} at slot {}", name, value, slot),
            Instruction::WriteLength => f.write_str("write length"),
            Instruction::ReadLength => f.write_str("read length"),
            Instruction::WriteElements { value } => write!(f, "write elements of type {}", value),
            Instruction::ReadElements { value } => write!(f, "read elements of type {}", value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableEntry {
    pub id: u32,
    pub type_ref: TypeRef,
    pub binary_name: String,
    pub kind: TypeKind,
    /// The peer may construct this type directly
    pub instantiable: bool,
    pub signature: String,
    pub fields: Vec<FieldSlot>,
    /// Encoder, present when the type is sent to the peer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub write: Option<Vec<Instruction>>,
    /// Decoder, present when the type is received from the peer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read: Option<Vec<Instruction>>,
}

impl TableEntry {
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchTable {
    /// Digest over every entry signature
    pub fingerprint: String,
    pub entries: Vec<TableEntry>,
}

impl DispatchTable {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, binary_name: &str) -> Option<&TableEntry> {
        self.entries
            .binary_search_by(|e| e.binary_name.as_str().cmp(binary_name))
            .ok()
            .map(|i| &self.entries[i])
    }

    pub fn entry_for(&self, type_ref: &TypeRef) -> Option<&TableEntry> {
        self.get(&type_ref.binary_name())
    }
}

struct Draft<'c> {
    type_ref: TypeRef,
    descriptor: Arc<TypeDescriptor>,
    order: &'c FieldOrderTable,
    write: Option<Vec<Instruction>>,
    read: Option<Vec<Instruction>>,
}

/// Merges closures into one [`DispatchTable`]
#[derive(Default)]
pub struct TableBuilder<'c> {
    closures: Vec<(&'c SerializableClosure, &'c OrderMap)>,
}

impl<'c> TableBuilder<'c> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_closure(mut self, closure: &'c SerializableClosure, orders: &'c OrderMap) -> Self {
        self.closures.push((closure, orders));
        self
    }

    pub fn build(self) -> Result<DispatchTable> {
        let mut drafts: BTreeMap<String, Draft<'c>> = BTreeMap::new();

        for &(closure, orders) in &self.closures {
            for (type_ref, descriptor) in closure.iter() {
                if descriptor.kind == TypeKind::Primitive {
                    continue;
                }
                let order = orders
                    .get(type_ref)
                    .ok_or_else(|| GenerateError::MissingOrder {
                        type_name: type_ref.to_string(),
                    })?;
                let draft = drafts
                    .entry(type_ref.binary_name())
                    .or_insert_with(|| Draft {
                        type_ref: type_ref.clone(),
                        descriptor: descriptor.clone(),
                        order,
                        write: None,
                        read: None,
                    });
                if draft.order != order {
                    return Err(GenerateError::ConflictingOrder {
                        type_name: type_ref.to_string(),
                    });
                }
                let code = instructions(descriptor, order, closure, closure.direction());
                match closure.direction() {
                    Direction::ToPeer => draft.write = Some(code),
                    Direction::FromPeer => draft.read = Some(code),
                }
            }
        }

        let mut fingerprint = Sha256::new();
        let mut entries = Vec::with_capacity(drafts.len());
        for (id, (binary_name, draft)) in drafts.into_iter().enumerate() {
            let signature = signature(&binary_name, &draft.descriptor, draft.order);
            fingerprint.update(binary_name.as_bytes());
            fingerprint.update(b"=");
            fingerprint.update(signature.as_bytes());
            fingerprint.update(b"\n");
            entries.push(TableEntry {
                id: id as u32,
                type_ref: draft.type_ref,
                binary_name,
                kind: draft.descriptor.kind,
                instantiable: draft.descriptor.kind == TypeKind::Array
                    || draft.descriptor.is_instantiable_class(),
                signature,
                fields: draft.order.slots.clone(),
                write: draft.write,
                read: draft.read,
            });
        }

        Ok(DispatchTable {
            fingerprint: hex::encode(&fingerprint.finalize()[..8]),
            entries,
        })
    }
}

/// Merge a ToPeer and a FromPeer closure with their order tables, keyed by
/// direction. A member with no order table fails with `MissingOrder`.
pub fn build_table(
    to_peer: &SerializableClosure,
    from_peer: &SerializableClosure,
    orders: &BTreeMap<Direction, OrderMap>,
) -> Result<DispatchTable> {
    let empty = OrderMap::new();
    let to_orders = orders.get(&Direction::ToPeer).unwrap_or(&empty);
    let from_orders = orders.get(&Direction::FromPeer).unwrap_or(&empty);
    TableBuilder::new()
        .add_closure(to_peer, to_orders)
        .add_closure(from_peer, from_orders)
        .build()
}

fn value_kind(ty: &TypeRef, closure: &SerializableClosure) -> ValueKind {
    if let Some(primitive) = ty.as_primitive() {
        return ValueKind::Primitive(primitive);
    }
    match closure.get(ty) {
        Some(d) if d.kind == TypeKind::Primitive => ValueKind::Builtin(ty.raw()),
        _ => ValueKind::Tagged(ty.raw()),
    }
}

fn instructions(
    descriptor: &TypeDescriptor,
    order: &FieldOrderTable,
    closure: &SerializableClosure,
    direction: Direction,
) -> Vec<Instruction> {
    if descriptor.kind == TypeKind::Array {
        let element = descriptor
            .type_ref
            .element()
            .map(|e| value_kind(&e, closure))
            .unwrap_or_else(|| ValueKind::Tagged(descriptor.type_ref.raw()));
        return match direction {
            Direction::ToPeer => vec![
                Instruction::WriteLength,
                Instruction::WriteElements { value: element },
            ],
            Direction::FromPeer => vec![
                Instruction::ReadLength,
                Instruction::ReadElements { value: element },
            ],
        };
    }

    order
        .slots
        .iter()
        .map(|slot| {
            let value = value_kind(&slot.ty, closure);
            match direction {
                Direction::ToPeer => Instruction::WriteField {
                    slot: slot.slot,
                    name: slot.name.clone(),
                    declared_by: slot.declared_by.clone(),
                    value,
                },
                Direction::FromPeer => Instruction::ReadField {
                    slot: slot.slot,
                    name: slot.name.clone(),
                    declared_by: slot.declared_by.clone(),
                    value,
                },
            }
        })
        .collect()
}

/// Hex digest over the binary name, kind and field layout
fn signature(binary_name: &str, descriptor: &TypeDescriptor, order: &FieldOrderTable) -> String {
    let mut hasher = Sha256::new();
    hasher.update(binary_name.as_bytes());
    hasher.update(format!("|{:?}", descriptor.kind).as_bytes());
    for slot in &order.slots {
        hasher.update(
            format!(
                "|{}:{}:{}:{}",
                slot.slot,
                slot.name,
                slot.declared_by.binary_name(),
                slot.ty.binary_name()
            )
            .as_bytes(),
        );
    }
    hex::encode(&hasher.finalize()[..8])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::closure::{build_closure, DiagnosticLog};
    use crate::introspection::TypeIndex;
    use crate::model::TypeDecl;
    use crate::order::build_orders;
    use crate::resolver::TypeResolver;

    fn closure(index: &TypeIndex, roots: &[&str], direction: Direction) -> SerializableClosure {
        let roots: Vec<TypeRef> = roots.iter().map(|r| TypeRef::parse(r).unwrap()).collect();
        let mut resolver = TypeResolver::new(index);
        build_closure(&roots, direction, &mut resolver, &mut DiagnosticLog::new()).unwrap()
    }

    fn index() -> TypeIndex {
        TypeIndex::new()
            .with(TypeDecl::builtin("java.lang.String"))
            .with(
                TypeDecl::class("a.Msg")
                    .serializable()
                    .field("body", "java.lang.String")
                    .field("at", "long")
                    .field("tags", "a.Tag[]"),
            )
            .with(TypeDecl::class("a.Tag").serializable().field("label", "java.lang.String"))
    }

    #[test]
    fn test_entries_sorted_with_sequential_ids() {
        let index = index();
        let to = closure(&index, &["a.Msg"], Direction::ToPeer);
        let from = SerializableClosure::empty(Direction::FromPeer);
        let orders = BTreeMap::from([(Direction::ToPeer, build_orders(&to))]);
        let table = build_table(&to, &from, &orders).unwrap();

        let names: Vec<_> = table.entries.iter().map(|e| e.binary_name.as_str()).collect();
        assert_eq!(names, vec!["[La.Tag;", "a.Msg", "a.Tag"]);
        let ids: Vec<_> = table.entries.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert!(table.entries.iter().all(|e| e.write.is_some() && e.read.is_none()));
    }

    #[test]
    fn test_instructions_follow_field_order() {
        let index = index();
        let to = closure(&index, &["a.Msg"], Direction::ToPeer);
        let table = TableBuilder::new()
            .add_closure(&to, &build_orders(&to))
            .build()
            .unwrap();

        let msg = table.get("a.Msg").unwrap();
        let text: Vec<String> = msg.write.as_ref().unwrap().iter().map(|i| i.to_string()).collect();
        assert_eq!(
            text,
            vec![
                "write field at of type long at slot 0",
                "write field body of type java.lang.String at slot 1",
                "write field tags of type tagged a.Tag[] at slot 2",
            ]
        );

        let tags = table.get("[La.Tag;").unwrap();
        assert_eq!(
            tags.write.as_ref().unwrap()[1],
            Instruction::WriteElements {
                value: ValueKind::Tagged(TypeRef::named("a.Tag"))
            }
        );
    }

    #[test]
    fn test_missing_order_is_fatal() {
        let index = index();
        let to = closure(&index, &["a.Tag"], Direction::ToPeer);
        let err = TableBuilder::new()
            .add_closure(&to, &OrderMap::new())
            .build()
            .unwrap_err();
        assert!(matches!(err, GenerateError::MissingOrder { .. }));
    }

    #[test]
    fn test_both_directions_share_one_entry() {
        let index = index();
        let to = closure(&index, &["a.Tag"], Direction::ToPeer);
        let from = closure(&index, &["a.Tag"], Direction::FromPeer);
        let orders = BTreeMap::from([
            (Direction::ToPeer, build_orders(&to)),
            (Direction::FromPeer, build_orders(&from)),
        ]);
        let table = build_table(&to, &from, &orders).unwrap();

        assert_eq!(table.len(), 1);
        let tag = &table.entries[0];
        assert!(tag.write.is_some());
        assert!(matches!(
            tag.read.as_ref().unwrap()[0],
            Instruction::ReadField { slot: 0, .. }
        ));
    }

    #[test]
    fn test_signature_tracks_layout() {
        let index = index();
        let renamed = TypeIndex::new().with(TypeDecl::class("a.Tag").serializable().field("name", "int"));
        let sig = |index: &TypeIndex| {
            let to = closure(index, &["a.Tag"], Direction::ToPeer);
            let table = TableBuilder::new().add_closure(&to, &build_orders(&to)).build().unwrap();
            (table.entries[0].signature.clone(), table.fingerprint.clone())
        };
        let (a, fa) = sig(&index);
        let (b, fb) = sig(&renamed);
        assert_eq!(a.len(), 16);
        assert_ne!(a, b);
        assert_ne!(fa, fb);
        assert_eq!(sig(&index), (a, fa));
    }
}
