//! Type introspection
//!
//! The generator never reads source code. It asks a [`TypeIntrospection`]
//! implementation for declared types by binary name. [`TypeIndex`] is the
//! in-memory implementation backed by a sorted map, so every enumeration it
//! performs is deterministic.

use crate::model::TypeDecl;
use std::collections::{BTreeMap, BTreeSet};

/// Source of declared types.
///
/// Implementations must be deterministic: `subtypes_of` and `names` return
/// the same sequence for the same inputs on every call.
pub trait TypeIntrospection: Send + Sync {
    /// Look up a declared type by binary name (`pkg.Outer$Inner`).
    fn lookup(&self, name: &str) -> Option<&TypeDecl>;

    /// Every declared type that extends or implements `name`, directly or
    /// transitively, in name order.
    fn subtypes_of(&self, name: &str) -> Vec<&TypeDecl>;

    /// All declared type names, in order.
    fn names(&self) -> Vec<&str>;
}

/// In-memory type index
#[derive(Debug, Clone, Default)]
pub struct TypeIndex {
    types: BTreeMap<String, TypeDecl>,
}

impl TypeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a declaration, returning the one it replaced.
    pub fn insert(&mut self, decl: TypeDecl) -> Option<TypeDecl> {
        self.types.insert(decl.name.clone(), decl)
    }

    pub fn with(mut self, decl: TypeDecl) -> Self {
        self.insert(decl);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TypeDecl> {
        self.types.values()
    }

    /// Types carrying a `SerialTypes` annotation.
    pub fn owners(&self) -> impl Iterator<Item = &TypeDecl> {
        self.types.values().filter(|d| d.serial_types.is_some())
    }

    fn direct_supertypes(decl: &TypeDecl) -> impl Iterator<Item = &str> {
        decl.supertype
            .iter()
            .chain(decl.interfaces.iter())
            .map(|t| t.name())
    }

    fn is_subtype_of(&self, decl: &TypeDecl, target: &str) -> bool {
        let mut seen = BTreeSet::new();
        let mut stack: Vec<&str> = Self::direct_supertypes(decl).collect();
        while let Some(name) = stack.pop() {
            if name == target {
                return true;
            }
            if !seen.insert(name) {
                continue;
            }
            if let Some(parent) = self.types.get(name) {
                stack.extend(Self::direct_supertypes(parent));
            }
        }
        false
    }
}

impl FromIterator<TypeDecl> for TypeIndex {
    fn from_iter<T: IntoIterator<Item = TypeDecl>>(iter: T) -> Self {
        let mut index = TypeIndex::new();
        for decl in iter {
            index.insert(decl);
        }
        index
    }
}

impl TypeIntrospection for TypeIndex {
    fn lookup(&self, name: &str) -> Option<&TypeDecl> {
        self.types.get(name)
    }

    fn subtypes_of(&self, name: &str) -> Vec<&TypeDecl> {
        self.types
            .values()
            .filter(|decl| decl.name != name && self.is_subtype_of(decl, name))
            .collect()
    }

    fn names(&self) -> Vec<&str> {
        self.types.keys().map(String::as_str).collect()
    }
}
