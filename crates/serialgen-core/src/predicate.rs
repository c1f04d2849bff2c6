//! Serializability rules
//!
//! The closure builder asks a [`SerializabilityPredicate`] about every type
//! it reaches. The answer depends on how the type was reached: a type named
//! by a root or a field must be serializable, while a candidate subtype of a
//! polymorphic field is simply skipped when it is not.

use crate::closure::Direction;
use crate::model::{TypeDescriptor, TypeKind};
use std::fmt;

/// How a type was reached during closure expansion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Usage {
    /// Named directly by a root, a field, an array element or a type argument
    Declared,
    /// Supertype of a member
    Supertype,
    /// Candidate subtype of a polymorphic member
    Subtype,
}

impl fmt::Display for Usage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Usage::Declared => "declared",
            Usage::Supertype => "supertype",
            Usage::Subtype => "subtype",
        })
    }
}

/// Outcome of a serializability check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Include,
    /// Leave the type out and keep going
    Exclude(String),
    /// Fail the closure
    Reject(String),
}

pub trait SerializabilityPredicate: Send + Sync {
    fn check(&self, descriptor: &TypeDescriptor, usage: Usage, direction: Direction) -> Verdict;
}

/// Marker-based rules: a class must be marked serializable, and a concrete
/// serializable class must be constructible by the peer.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPredicate;

impl SerializabilityPredicate for DefaultPredicate {
    fn check(&self, descriptor: &TypeDescriptor, usage: Usage, direction: Direction) -> Verdict {
        let skip_or_fail = |reason: &str| match usage {
            Usage::Declared => Verdict::Reject(reason.to_string()),
            Usage::Supertype | Usage::Subtype => Verdict::Exclude(reason.to_string()),
        };

        match descriptor.kind {
            TypeKind::Primitive => Verdict::Include,
            TypeKind::Array => match &descriptor.component {
                Some(component)
                    if self.check(component, Usage::Declared, direction) == Verdict::Include =>
                {
                    Verdict::Include
                }
                _ => skip_or_fail("array element is not serializable"),
            },
            TypeKind::Class | TypeKind::Interface => {
                if !descriptor.serializable {
                    // Sent only through its subtypes; the closure checks
                    // that a serializable one exists.
                    if usage == Usage::Declared && descriptor.is_polymorphic_only() {
                        return Verdict::Include;
                    }
                    return skip_or_fail("not marked serializable");
                }
                if descriptor.is_class() && !descriptor.is_abstract && !descriptor.instantiable {
                    let why = "no accessible no-arg constructor".to_string();
                    return match usage {
                        Usage::Declared => Verdict::Reject(why),
                        // Only its fields are read, through the subclass.
                        Usage::Supertype => Verdict::Include,
                        Usage::Subtype => Verdict::Exclude(why),
                    };
                }
                Verdict::Include
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TypeDecl;
    use crate::naming::TypeRef;
    use rstest::rstest;
    use std::sync::Arc;

    fn desc(decl: TypeDecl) -> TypeDescriptor {
        let type_ref = TypeRef::named(decl.name.as_str());
        TypeDescriptor::from_decl(&decl, type_ref)
    }

    #[rstest]
    #[case(Usage::Declared, false)]
    #[case(Usage::Subtype, true)]
    #[case(Usage::Supertype, true)]
    fn test_unmarked_class(#[case] usage: Usage, #[case] excluded: bool) {
        let verdict = DefaultPredicate.check(&desc(TypeDecl::class("a.Raw")), usage, Direction::ToPeer);
        assert_eq!(matches!(verdict, Verdict::Exclude(_)), excluded);
        assert_eq!(matches!(verdict, Verdict::Reject(_)), !excluded);
    }

    #[test]
    fn test_uninstantiable_concrete_class() {
        let d = desc(TypeDecl::class("a.Sealed").serializable().not_instantiable());
        assert!(matches!(
            DefaultPredicate.check(&d, Usage::Declared, Direction::FromPeer),
            Verdict::Reject(_)
        ));
        assert!(matches!(
            DefaultPredicate.check(&d, Usage::Subtype, Direction::FromPeer),
            Verdict::Exclude(_)
        ));
        assert_eq!(
            DefaultPredicate.check(&d, Usage::Supertype, Direction::FromPeer),
            Verdict::Include
        );
    }

    #[rstest]
    #[case(TypeDecl::interface("a.Shape"))]
    #[case(TypeDecl::class("a.Base").abstract_())]
    fn test_unmarked_polymorphic_type_defers_to_subtypes(#[case] decl: TypeDecl) {
        let d = desc(decl);
        assert_eq!(
            DefaultPredicate.check(&d, Usage::Declared, Direction::ToPeer),
            Verdict::Include
        );
        assert!(matches!(
            DefaultPredicate.check(&d, Usage::Supertype, Direction::ToPeer),
            Verdict::Exclude(_)
        ));
    }

    #[test]
    fn test_array_of_unmarked_interface() {
        let shape = Arc::new(desc(TypeDecl::interface("a.Shape")));
        let shapes = TypeDescriptor::array_of(Arc::new(TypeDescriptor::array_of(shape)));
        assert_eq!(
            DefaultPredicate.check(&shapes, Usage::Declared, Direction::ToPeer),
            Verdict::Include
        );
        let raw = Arc::new(desc(TypeDecl::class("a.Raw")));
        assert!(matches!(
            DefaultPredicate.check(&TypeDescriptor::array_of(raw), Usage::Declared, Direction::ToPeer),
            Verdict::Reject(_)
        ));
    }

    #[test]
    fn test_abstract_serializable_class_is_included() {
        let d = desc(TypeDecl::class("a.Base").serializable().abstract_().not_instantiable());
        assert_eq!(
            DefaultPredicate.check(&d, Usage::Declared, Direction::ToPeer),
            Verdict::Include
        );
    }

    #[test]
    fn test_primitive_and_builtin() {
        let int = TypeDescriptor::primitive(TypeRef::named("int"));
        assert_eq!(
            DefaultPredicate.check(&int, Usage::Declared, Direction::ToPeer),
            Verdict::Include
        );
        let string = desc(TypeDecl::builtin("java.lang.String"));
        assert_eq!(
            DefaultPredicate.check(&string, Usage::Declared, Direction::ToPeer),
            Verdict::Include
        );
    }
}
