//! Type resolution
//!
//! `TypeResolver` turns a name plus array rank into a [`TypeDescriptor`]:
//! it resolves the bare element type against the index and re-wraps the
//! requested number of array layers around it. Descriptors are cached for
//! the lifetime of the resolver, which is one generation run.

use crate::error::{GenerateError, Result};
use crate::introspection::TypeIntrospection;
use crate::model::TypeDescriptor;
use crate::naming::TypeRef;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::trace;

pub struct TypeResolver<'a> {
    index: &'a dyn TypeIntrospection,
    cache: HashMap<TypeRef, Arc<TypeDescriptor>>,
}

impl<'a> TypeResolver<'a> {
    pub fn new(index: &'a dyn TypeIntrospection) -> Self {
        Self {
            index,
            cache: HashMap::new(),
        }
    }

    pub fn index(&self) -> &'a dyn TypeIntrospection {
        self.index
    }

    /// Resolve `name` wrapped in `array_rank` array layers. `name` may itself
    /// carry brackets; their depth is added to `array_rank`.
    pub fn resolve(&mut self, name: &str, array_rank: usize) -> Result<Arc<TypeDescriptor>> {
        let parsed = TypeRef::parse(name)?;
        self.resolve_ref(&parsed.wrap(array_rank))
    }

    /// Resolve a textual reference such as `a.B[][]`.
    pub fn resolve_str(&mut self, text: &str) -> Result<Arc<TypeDescriptor>> {
        self.resolve(text, 0)
    }

    pub fn resolve_ref(&mut self, type_ref: &TypeRef) -> Result<Arc<TypeDescriptor>> {
        if let Some(hit) = self.cache.get(type_ref) {
            return Ok(hit.clone());
        }

        let resolved = match type_ref.element() {
            Some(element) => {
                let component = self.resolve_ref(&element)?;
                Arc::new(TypeDescriptor::array_of(component))
            }
            None => Arc::new(self.resolve_leaf(type_ref)?),
        };

        trace!("resolved {} as {:?}", type_ref, resolved.kind);
        self.cache.insert(type_ref.clone(), resolved.clone());
        Ok(resolved)
    }

    fn resolve_leaf(&self, type_ref: &TypeRef) -> Result<TypeDescriptor> {
        if type_ref.as_primitive().is_some() {
            return Ok(TypeDescriptor::primitive(type_ref.clone()));
        }
        let decl = self
            .index
            .lookup(type_ref.name())
            .ok_or_else(|| GenerateError::type_not_found(type_ref.name()))?;
        Ok(TypeDescriptor::from_decl(decl, type_ref.clone()))
    }

    /// Number of descriptors resolved so far
    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}
