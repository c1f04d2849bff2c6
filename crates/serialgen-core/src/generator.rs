//! Generation pipeline
//!
//! [`Generator::generate`] runs one owner type end to end: annotation lookup,
//! both closures, order tables, dispatch table, emission and commit. The
//! closure log is always committed as a private resource; deliverables are
//! committed only when every step succeeded.

use crate::closure::{ClosureBuilder, DiagnosticLog, Direction, SerializableClosure};
use crate::emit::{ArtifactEmitter, CodeSink, CompiledUnit, GeneratedArtifact};
use crate::error::{GenerateError, Result};
use crate::introspection::TypeIntrospection;
use crate::model::SerializationMode;
use crate::naming::{units, TypeRef};
use crate::order::{build_orders, OrderMap};
use crate::predicate::{DefaultPredicate, SerializabilityPredicate};
use crate::resolver::TypeResolver;
use crate::table::{build_table, DispatchTable};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

/// Where generated output goes.
///
/// Deliverables (`commit_unit`, `commit_manifest`) are staged until the
/// caller finishes the context; `abort` drops whatever is staged. Private
/// resources are kept regardless and never delivered.
pub trait GeneratorContext {
    /// Reserve `package.class_name`. Returns false when this context already
    /// holds that unit.
    fn try_create(&mut self, package: &str, class_name: &str) -> bool;

    fn commit_unit(&mut self, unit: &CompiledUnit) -> Result<()>;

    fn commit_manifest(&mut self, name: &str, contents: &str) -> Result<()>;

    fn commit_private(&mut self, name: &str, contents: &str) -> Result<()>;

    /// Drop every staged deliverable.
    fn abort(&mut self);
}

/// Intermediate results for one owner, before emission
#[derive(Debug, Clone)]
pub struct GenerationPlan {
    pub owner: TypeRef,
    pub mode: SerializationMode,
    pub to_peer: SerializableClosure,
    pub from_peer: SerializableClosure,
    pub orders: BTreeMap<Direction, OrderMap>,
    pub table: DispatchTable,
}

impl GenerationPlan {
    pub fn closure(&self, direction: Direction) -> &SerializableClosure {
        match direction {
            Direction::ToPeer => &self.to_peer,
            Direction::FromPeer => &self.from_peer,
        }
    }
}

pub struct Generator<'a> {
    index: &'a dyn TypeIntrospection,
    sink: &'a dyn CodeSink,
    predicate: &'a dyn SerializabilityPredicate,
    package: String,
}

impl<'a> Generator<'a> {
    pub fn new(index: &'a dyn TypeIntrospection, sink: &'a dyn CodeSink) -> Self {
        Self {
            index,
            sink,
            predicate: &DefaultPredicate,
            package: units::DEFAULT_PACKAGE.to_string(),
        }
    }

    pub fn with_package(mut self, package: impl Into<String>) -> Self {
        self.package = package.into();
        self
    }

    pub fn with_predicate(mut self, predicate: &'a dyn SerializabilityPredicate) -> Self {
        self.predicate = predicate;
        self
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    /// Compute both closures, their order tables and the dispatch table.
    ///
    /// Each closure gets its own resolver so the two runs share nothing.
    pub fn plan(&self, owner: &TypeRef, log: &mut DiagnosticLog) -> Result<GenerationPlan> {
        let decl = self
            .index
            .lookup(owner.name())
            .ok_or_else(|| GenerateError::type_not_found(owner.name()))?;
        let annotation =
            decl.serial_types
                .as_ref()
                .ok_or_else(|| GenerateError::MissingConfiguration {
                    owner: owner.to_string(),
                })?;
        log.note(format!("owner {} mode {}", owner, annotation.mode));

        let to_peer = ClosureBuilder::new(Direction::ToPeer)
            .with_predicate(self.predicate)
            .add_roots(annotation.roots.iter().cloned())
            .build(&mut TypeResolver::new(self.index), log)?;
        let from_peer = ClosureBuilder::new(Direction::FromPeer)
            .with_predicate(self.predicate)
            .add_roots(annotation.from_peer.iter().cloned())
            .build(&mut TypeResolver::new(self.index), log)?;

        let orders = BTreeMap::from([
            (Direction::ToPeer, build_orders(&to_peer)),
            (Direction::FromPeer, build_orders(&from_peer)),
        ]);
        let table = build_table(&to_peer, &from_peer, &orders)?;
        debug!(
            "dispatch table for {}: {} entries, fingerprint {}",
            owner,
            table.len(),
            table.fingerprint
        );

        Ok(GenerationPlan {
            owner: owner.clone(),
            mode: annotation.mode,
            to_peer,
            from_peer,
            orders,
            table,
        })
    }

    /// Plan and emit without committing anything.
    pub fn build_artifact(&self, owner: &TypeRef, log: &mut DiagnosticLog) -> Result<GeneratedArtifact> {
        let plan = self.plan(owner, log)?;
        ArtifactEmitter::new(self.sink)
            .with_package(self.package.as_str())
            .emit(plan.table, plan.mode, owner)
    }

    /// Generate the serializer unit for `owner` and return its qualified
    /// name. A unit this context already holds is not regenerated.
    pub fn generate(&self, ctx: &mut dyn GeneratorContext, owner: &str) -> Result<String> {
        let owner = TypeRef::parse(owner)?;
        let class_name = units::class_name(&owner);
        let qualified = format!("{}.{}", self.package, class_name);

        if !ctx.try_create(&self.package, &class_name) {
            debug!("{} already generated", qualified);
            return Ok(qualified);
        }

        info!("Generating serializer for {}", owner);
        let mut log = DiagnosticLog::new();
        let outcome = self.build_artifact(&owner, &mut log);
        if let Err(e) = &outcome {
            log.note(format!("generation failed: {}", e));
        }
        ctx.commit_private(&units::log_resource(&owner), &log.render())?;

        let committed = outcome.and_then(|artifact| commit(ctx, &owner, &artifact));
        if let Err(e) = &committed {
            warn!("Generation for {} failed: {}", owner, e);
            ctx.abort();
        }
        committed.map(|_| qualified)
    }
}

fn commit(ctx: &mut dyn GeneratorContext, owner: &TypeRef, artifact: &GeneratedArtifact) -> Result<()> {
    let manifest = artifact
        .manifest
        .as_ref()
        .map(|m| m.to_json())
        .transpose()?;
    ctx.commit_unit(&artifact.unit)?;
    if let Some(json) = manifest {
        ctx.commit_manifest(&units::manifest_resource(owner), &json)?;
    }
    Ok(())
}

/// Context that keeps everything in memory.
#[derive(Debug, Default)]
pub struct InMemoryContext {
    created: BTreeSet<String>,
    staged: BTreeMap<String, String>,
    delivered: BTreeMap<String, String>,
    private: BTreeMap<String, String>,
}

impl InMemoryContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver every staged artifact.
    pub fn finish(&mut self) {
        self.delivered.append(&mut self.staged);
    }

    pub fn delivered(&self) -> &BTreeMap<String, String> {
        &self.delivered
    }

    pub fn staged(&self) -> &BTreeMap<String, String> {
        &self.staged
    }

    pub fn private(&self) -> &BTreeMap<String, String> {
        &self.private
    }
}

impl GeneratorContext for InMemoryContext {
    fn try_create(&mut self, package: &str, class_name: &str) -> bool {
        self.created.insert(format!("{}.{}", package, class_name))
    }

    fn commit_unit(&mut self, unit: &CompiledUnit) -> Result<()> {
        self.staged.insert(unit.file_name.clone(), unit.contents.clone());
        Ok(())
    }

    fn commit_manifest(&mut self, name: &str, contents: &str) -> Result<()> {
        self.staged.insert(name.to_string(), contents.to_string());
        Ok(())
    }

    fn commit_private(&mut self, name: &str, contents: &str) -> Result<()> {
        self.private.insert(name.to_string(), contents.to_string());
        Ok(())
    }

    fn abort(&mut self) {
        self.staged.clear();
    }
}
