//! Serialization closure and dispatch table generation
//!
//! Given an owner type whose `SerialTypes` annotation lists root types, this
//! crate computes the closed set of serializable types each side of a
//! channel may send, assigns every field a deterministic wire slot and
//! produces a dispatch table both ends can compile against without ever
//! exchanging a schema.
//!
//! The pipeline, in order:
//!
//! - [`resolver`] turns names into [`model::TypeDescriptor`]s
//! - [`closure`] expands roots to a fixpoint, once per [`closure::Direction`]
//! - [`order`] assigns field slots, supertypes first
//! - [`table`] merges both closures into a [`table::DispatchTable`]
//! - [`emit`] names the unit and hands it to a [`emit::CodeSink`]
//! - [`generator`] runs all of the above and commits the results

pub mod closure;
pub mod emit;
pub mod error;
pub mod generator;
pub mod introspection;
pub mod model;
pub mod naming;
pub mod order;
pub mod predicate;
pub mod resolver;
pub mod table;

pub use closure::{build_closure, ClosureBuilder, DiagnosticLog, Direction, SerializableClosure};
pub use emit::{ArtifactEmitter, CodeSink, CompiledUnit, FieldManifest, GeneratedArtifact, UnitHeader};
pub use error::{EmissionError, GenerateError, Result};
pub use generator::{GenerationPlan, Generator, GeneratorContext, InMemoryContext};
pub use introspection::{TypeIndex, TypeIntrospection};
pub use model::{FieldDecl, SerialTypes, SerializationMode, TypeDecl, TypeDescriptor, TypeKind};
pub use naming::{PrimitiveKind, TypeRef};
pub use order::{build_orders, order, FieldOrderTable, FieldSlot, OrderMap};
pub use predicate::{DefaultPredicate, SerializabilityPredicate, Usage, Verdict};
pub use resolver::TypeResolver;
pub use table::{build_table, DispatchTable, Instruction, TableBuilder, TableEntry, ValueKind};
