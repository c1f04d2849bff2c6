//! Field order tables
//!
//! Wire positions are assigned per hierarchy level: fields declared by the
//! most-base serializable supertype come first, then each subclass in turn.
//! Within a level fields are sorted by name, so the order depends only on
//! the set of field names at each level and never on declaration order.

use crate::closure::SerializableClosure;
use crate::model::TypeDescriptor;
use crate::naming::TypeRef;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldSlot {
    pub slot: usize,
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeRef,
    pub declared_by: TypeRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldOrderTable {
    pub type_ref: TypeRef,
    pub slots: Vec<FieldSlot>,
}

impl FieldOrderTable {
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.slots.iter().map(|s| s.name.as_str()).collect()
    }
}

/// Order tables of one closure, keyed by member
pub type OrderMap = BTreeMap<TypeRef, FieldOrderTable>;

/// Order the serializable fields of `descriptor`. Supertypes contribute
/// fields only while they are marked serializable members of `closure`; the
/// first supertype that is not ends the walk.
pub fn order(descriptor: &TypeDescriptor, closure: &SerializableClosure) -> FieldOrderTable {
    let mut levels: Vec<&TypeDescriptor> = vec![descriptor];
    let mut seen = HashSet::new();
    seen.insert(descriptor.type_ref.raw());

    let mut current = descriptor;
    while let Some(parent) = current
        .supertype
        .as_ref()
        .and_then(|s| closure.get(s))
        .map(|d| d.as_ref())
        .filter(|d| d.serializable)
    {
        if !seen.insert(parent.type_ref.raw()) {
            break;
        }
        levels.push(parent);
        current = parent;
    }

    let mut slots = Vec::new();
    for level in levels.iter().rev() {
        let mut fields: Vec<_> = level.serializable_fields().collect();
        fields.sort_by(|a, b| a.name.cmp(&b.name));
        for field in fields {
            slots.push(FieldSlot {
                slot: slots.len(),
                name: field.name.clone(),
                ty: field.ty.clone(),
                declared_by: level.type_ref.raw(),
            });
        }
    }

    FieldOrderTable {
        type_ref: descriptor.type_ref.raw(),
        slots,
    }
}

/// Order tables for every member of `closure`.
pub fn build_orders(closure: &SerializableClosure) -> OrderMap {
    closure
        .iter()
        .map(|(type_ref, descriptor)| (type_ref.clone(), order(descriptor, closure)))
        .collect()
}
