//! Reachability closure
//!
//! Starting from a set of root types, the builder walks breadth-first over
//! serializable fields, array elements, generic arguments, supertypes and
//! known subtypes until nothing new is reachable. Every decision it makes
//! lands in a [`DiagnosticLog`], which the generator commits as a private
//! resource.

use crate::error::{GenerateError, Result};
use crate::model::{TypeDescriptor, TypeKind};
use crate::naming::TypeRef;
use crate::predicate::{DefaultPredicate, SerializabilityPredicate, Usage, Verdict};
use crate::resolver::TypeResolver;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Which way values flow, seen from the owner's process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Direction {
    ToPeer,
    FromPeer,
}

impl Direction {
    pub const BOTH: [Direction; 2] = [Direction::ToPeer, Direction::FromPeer];

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::ToPeer => "to-peer",
            Direction::FromPeer => "from-peer",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a type was considered
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reason {
    Root,
    Field { owner: TypeRef, field: String },
    ArrayElement { array: TypeRef },
    TypeArgument { of: TypeRef },
    Supertype { of: TypeRef },
    Subtype { of: TypeRef },
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reason::Root => f.write_str("root"),
            Reason::Field { owner, field } => write!(f, "field {}.{}", owner, field),
            Reason::ArrayElement { array } => write!(f, "element of {}", array),
            Reason::TypeArgument { of } => write!(f, "type argument of {}", of),
            Reason::Supertype { of } => write!(f, "supertype of {}", of),
            Reason::Subtype { of } => write!(f, "subtype of {}", of),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Included,
    Excluded(String),
    Rejected(String),
}

/// One inclusion or exclusion decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub direction: Direction,
    pub type_ref: TypeRef,
    pub reason: Reason,
    pub outcome: Outcome,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            Outcome::Included => write!(
                f,
                "[{}] include {} ({})",
                self.direction, self.type_ref, self.reason
            ),
            Outcome::Excluded(why) => write!(
                f,
                "[{}] exclude {} ({}): {}",
                self.direction, self.type_ref, self.reason, why
            ),
            Outcome::Rejected(why) => write!(
                f,
                "[{}] REJECT {} ({}): {}",
                self.direction, self.type_ref, self.reason, why
            ),
        }
    }
}

/// Human-readable record of a generation run
#[derive(Debug, Clone, Default)]
pub struct DiagnosticLog {
    entries: Vec<LogEntry>,
    lines: Vec<String>,
}

impl DiagnosticLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, entry: LogEntry) {
        self.lines.push(entry.to_string());
        self.entries.push(entry);
    }

    pub fn note(&mut self, message: impl Into<String>) {
        self.lines.push(message.into());
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            out.push_str(line);
            out.push('\n');
        }
        out
    }
}

/// Closed set of serializable types for one direction
#[derive(Debug, Clone)]
pub struct SerializableClosure {
    direction: Direction,
    roots: Vec<TypeRef>,
    members: BTreeMap<TypeRef, Arc<TypeDescriptor>>,
}

impl SerializableClosure {
    pub fn empty(direction: Direction) -> Self {
        Self {
            direction,
            roots: Vec::new(),
            members: BTreeMap::new(),
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Roots as declared, array rank included
    pub fn roots(&self) -> &[TypeRef] {
        &self.roots
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Membership ignores generic arguments.
    pub fn contains(&self, type_ref: &TypeRef) -> bool {
        self.members.contains_key(&type_ref.raw())
    }

    pub fn get(&self, type_ref: &TypeRef) -> Option<&Arc<TypeDescriptor>> {
        self.members.get(&type_ref.raw())
    }

    /// Members in TypeRef order
    pub fn iter(&self) -> impl Iterator<Item = (&TypeRef, &Arc<TypeDescriptor>)> {
        self.members.iter()
    }

    pub fn type_refs(&self) -> impl Iterator<Item = &TypeRef> {
        self.members.keys()
    }
}

/// Builds one [`SerializableClosure`]
pub struct ClosureBuilder<'p> {
    direction: Direction,
    roots: Vec<TypeRef>,
    predicate: &'p dyn SerializabilityPredicate,
}

impl ClosureBuilder<'static> {
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            roots: Vec::new(),
            predicate: &DefaultPredicate,
        }
    }
}

impl<'p> ClosureBuilder<'p> {
    pub fn with_predicate<'q>(
        self,
        predicate: &'q dyn SerializabilityPredicate,
    ) -> ClosureBuilder<'q> {
        ClosureBuilder {
            direction: self.direction,
            roots: self.roots,
            predicate,
        }
    }

    pub fn add_root(mut self, root: TypeRef) -> Self {
        self.roots.push(root);
        self
    }

    pub fn add_roots(mut self, roots: impl IntoIterator<Item = TypeRef>) -> Self {
        self.roots.extend(roots);
        self
    }

    /// Expand the roots to a fixpoint.
    ///
    /// Fails with `UnresolvedRoot` when a root does not resolve, with
    /// `TypeNotFound` when a reachable field type is unknown and with
    /// `Closure` when a reachable type breaks the serializability rules.
    pub fn build(
        self,
        resolver: &mut TypeResolver<'_>,
        log: &mut DiagnosticLog,
    ) -> Result<SerializableClosure> {
        let roots_text: Vec<String> = self.roots.iter().map(|r| r.to_string()).collect();
        log.note(format!(
            "closure {}: roots [{}]",
            self.direction,
            roots_text.join(", ")
        ));

        let mut walk = Walk {
            direction: self.direction,
            predicate: self.predicate,
            resolver,
            log,
            members: BTreeMap::new(),
            excluded: HashSet::new(),
            polymorphic_checked: HashSet::new(),
            queue: VecDeque::new(),
        };

        for root in &self.roots {
            walk.resolver
                .resolve_ref(root)
                .map_err(|source| GenerateError::UnresolvedRoot {
                    root: root.to_string(),
                    source: Box::new(source),
                })?;
            walk.push(root.clone(), Usage::Declared, Reason::Root);
        }

        while let Some(pending) = walk.queue.pop_front() {
            walk.process(pending)?;
        }

        let members = walk.members;
        walk.log.note(format!(
            "closure {}: {} members",
            self.direction,
            members.len()
        ));
        debug!(
            "closure {} complete with {} members",
            self.direction,
            members.len()
        );

        Ok(SerializableClosure {
            direction: self.direction,
            roots: self.roots,
            members,
        })
    }
}

/// Build a closure with the default serializability rules.
pub fn build_closure(
    roots: &[TypeRef],
    direction: Direction,
    resolver: &mut TypeResolver<'_>,
    log: &mut DiagnosticLog,
) -> Result<SerializableClosure> {
    ClosureBuilder::new(direction)
        .add_roots(roots.iter().cloned())
        .build(resolver, log)
}

struct Pending {
    type_ref: TypeRef,
    usage: Usage,
    reason: Reason,
}

struct Walk<'b, 'r> {
    direction: Direction,
    predicate: &'b dyn SerializabilityPredicate,
    resolver: &'b mut TypeResolver<'r>,
    log: &'b mut DiagnosticLog,
    members: BTreeMap<TypeRef, Arc<TypeDescriptor>>,
    excluded: HashSet<TypeRef>,
    polymorphic_checked: HashSet<TypeRef>,
    queue: VecDeque<Pending>,
}

impl Walk<'_, '_> {
    fn push(&mut self, type_ref: TypeRef, usage: Usage, reason: Reason) {
        self.queue.push_back(Pending {
            type_ref,
            usage,
            reason,
        });
    }

    fn record(&mut self, type_ref: &TypeRef, reason: &Reason, outcome: Outcome) {
        self.log.record(LogEntry {
            direction: self.direction,
            type_ref: type_ref.clone(),
            reason: reason.clone(),
            outcome,
        });
    }

    fn reject(&mut self, pending: &Pending, why: String) -> GenerateError {
        self.record(&pending.type_ref, &pending.reason, Outcome::Rejected(why.clone()));
        GenerateError::Closure {
            type_name: pending.type_ref.to_string(),
            reason: why,
            via: pending.reason.to_string(),
        }
    }

    fn process(&mut self, pending: Pending) -> Result<()> {
        if pending.type_ref.is_array() {
            return self.process_array(pending);
        }

        for arg in pending.type_ref.args() {
            self.push(
                arg.clone(),
                Usage::Declared,
                Reason::TypeArgument {
                    of: pending.type_ref.clone(),
                },
            );
        }

        let key = pending.type_ref.raw();
        if let Some(member) = self.members.get(&key).cloned() {
            // Reached earlier as a supertype or subtype; now used directly.
            if pending.usage == Usage::Declared {
                self.check_polymorphic(&member, &pending)?;
            }
            return Ok(());
        }
        if pending.usage != Usage::Declared && self.excluded.contains(&key) {
            return Ok(());
        }

        let descriptor = match self.resolver.resolve_ref(&pending.type_ref) {
            Ok(descriptor) => descriptor,
            Err(GenerateError::TypeNotFound { .. }) if pending.usage == Usage::Supertype => {
                self.record(
                    &pending.type_ref,
                    &pending.reason,
                    Outcome::Excluded("not in the type index".to_string()),
                );
                self.excluded.insert(key);
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        match self
            .predicate
            .check(&descriptor, pending.usage, self.direction)
        {
            Verdict::Include => {
                self.record(&pending.type_ref, &pending.reason, Outcome::Included);
                self.members.insert(key, descriptor.clone());
                self.expand(&descriptor, &pending)
            }
            Verdict::Exclude(why) => {
                self.record(&pending.type_ref, &pending.reason, Outcome::Excluded(why));
                self.excluded.insert(key);
                Ok(())
            }
            Verdict::Reject(why) => Err(self.reject(&pending, why)),
        }
    }

    /// The element type decides; every array layer up to the declared rank
    /// becomes a member once it is in.
    fn process_array(&mut self, pending: Pending) -> Result<()> {
        let leaf = pending.type_ref.leaf();
        let rank = pending.type_ref.rank();
        self.process(Pending {
            type_ref: leaf.clone(),
            usage: Usage::Declared,
            reason: Reason::ArrayElement {
                array: pending.type_ref.clone(),
            },
        })?;
        if !self.members.contains_key(&leaf.raw()) {
            return Ok(());
        }

        for layer in 1..=rank {
            let array_ref = leaf.wrap(layer);
            let key = array_ref.raw();
            if self.members.contains_key(&key) {
                continue;
            }
            let reason = if layer == rank {
                pending.reason.clone()
            } else {
                Reason::ArrayElement {
                    array: leaf.wrap(layer + 1),
                }
            };
            let descriptor = self.resolver.resolve_ref(&array_ref)?;
            match self
                .predicate
                .check(&descriptor, pending.usage, self.direction)
            {
                Verdict::Include => {
                    self.record(&array_ref, &reason, Outcome::Included);
                    self.members.insert(key, descriptor);
                }
                Verdict::Exclude(why) => {
                    self.record(&array_ref, &reason, Outcome::Excluded(why));
                    self.excluded.insert(key);
                    return Ok(());
                }
                Verdict::Reject(why) => {
                    let at = Pending {
                        type_ref: array_ref,
                        usage: pending.usage,
                        reason,
                    };
                    return Err(self.reject(&at, why));
                }
            }
        }
        Ok(())
    }

    fn expand(&mut self, descriptor: &Arc<TypeDescriptor>, pending: &Pending) -> Result<()> {
        let owner = descriptor.type_ref.raw();
        for field in descriptor.serializable_fields() {
            self.push(
                field.ty.clone(),
                Usage::Declared,
                Reason::Field {
                    owner: owner.clone(),
                    field: field.name.clone(),
                },
            );
        }
        if let Some(supertype) = &descriptor.supertype {
            self.push(
                supertype.clone(),
                Usage::Supertype,
                Reason::Supertype { of: owner.clone() },
            );
        }
        if pending.usage == Usage::Declared {
            self.check_polymorphic(descriptor, pending)?;
        }
        Ok(())
    }

    /// Queue every known subtype of a directly used class or interface. A
    /// type that can only be sent as a subtype needs at least one the peer
    /// can instantiate.
    fn check_polymorphic(
        &mut self,
        descriptor: &Arc<TypeDescriptor>,
        pending: &Pending,
    ) -> Result<()> {
        if !matches!(descriptor.kind, TypeKind::Class | TypeKind::Interface) {
            return Ok(());
        }
        let key = descriptor.type_ref.raw();
        if !self.polymorphic_checked.insert(key.clone()) {
            return Ok(());
        }

        let index = self.resolver.index();
        let mut concrete = 0;
        for decl in index.subtypes_of(key.name()) {
            let sub_ref = TypeRef::named(decl.name.as_str());
            let sub = self.resolver.resolve_ref(&sub_ref)?;
            if sub.is_instantiable_class()
                && self.predicate.check(&sub, Usage::Subtype, self.direction) == Verdict::Include
            {
                concrete += 1;
            }
            self.push(sub_ref, Usage::Subtype, Reason::Subtype { of: key.clone() });
        }

        if descriptor.is_polymorphic_only() && concrete == 0 {
            return Err(self.reject(
                pending,
                "no instantiable serializable subtype".to_string(),
            ));
        }
        Ok(())
    }
}
