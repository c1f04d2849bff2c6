//! `serialgen generate`

use super::{current_dir, Workspace};
use crate::error::CliError;
use crate::output::{write_output, HumanOutput, OutputFormat};
use clap::Args;
use rayon::prelude::*;
use serde::Serialize;
use serialgen_common::context::StagedContext;
use serialgen_common::sinks::SinkKind;
use serialgen_common::vfs::{OsVfs, Vfs};
use serialgen_core::naming::units;
use serialgen_core::{Generator, TypeRef};
use std::collections::{BTreeMap, HashSet};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::{error, info};

#[derive(Debug, Clone, Default, Args)]
pub struct GenerateArgs {
    /// Owner type to generate (repeatable). Defaults to [codegen] owners,
    /// then to every type with a serial_types annotation
    #[arg(long = "owner", value_name = "TYPE")]
    pub owners: Vec<String>,

    /// Path to serialgen.toml or serialgen.json
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output directory
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Code sink: rust or json
    #[arg(short, long)]
    pub sink: Option<SinkKind>,

    /// Package for generated units
    #[arg(short, long)]
    pub package: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GenerateReport {
    pub sink: SinkKind,
    pub output_directory: PathBuf,
    pub owners: Vec<OwnerReport>,
}

#[derive(Debug, Serialize)]
pub struct OwnerReport {
    pub owner: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    pub files: Vec<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GenerateReport {
    pub fn failures(&self) -> usize {
        self.owners.iter().filter(|o| o.error.is_some()).count()
    }
}

impl HumanOutput for GenerateReport {
    fn render_human(&self) -> String {
        let mut out = String::new();
        let generated = self.owners.len() - self.failures();
        let _ = writeln!(
            out,
            "Generated {} of {} serializers ({} sink) into {}",
            generated,
            self.owners.len(),
            self.sink,
            self.output_directory.display()
        );
        for owner in &self.owners {
            match (&owner.unit, &owner.error) {
                (_, Some(e)) => {
                    let _ = writeln!(out, "  {}: failed: {}", owner.owner, e);
                }
                (Some(unit), None) => {
                    let _ = writeln!(out, "  {} -> {}", owner.owner, unit);
                    for file in &owner.files {
                        let _ = writeln!(out, "    {}", file.display());
                    }
                }
                (None, None) => {}
            }
        }
        out
    }
}

/// Owners named on the command line win, then the config, then every
/// annotated type in the index.
pub fn select_owners(explicit: &[String], workspace: &Workspace) -> Vec<String> {
    if !explicit.is_empty() {
        return explicit.to_vec();
    }
    let configured = &workspace.config.config.codegen.owners;
    if !configured.is_empty() {
        return configured.clone();
    }
    workspace
        .loaded
        .index
        .owners()
        .map(|decl| decl.name.clone())
        .collect()
}

/// Owners run in separate contexts, so two owners whose names mangle to the
/// same unit must be caught before any of them is generated.
pub fn check_unit_names(owners: &[String]) -> Result<(), CliError> {
    let mut units_seen: BTreeMap<String, &str> = BTreeMap::new();
    for owner in owners {
        // Unparseable names fail later with a proper error.
        let Ok(type_ref) = TypeRef::parse(owner) else {
            continue;
        };
        let unit = units::class_name(&type_ref);
        if let Some(first) = units_seen.get(&unit) {
            return Err(CliError::UnitCollision {
                unit,
                first: first.to_string(),
                second: owner.clone(),
            });
        }
        units_seen.insert(unit, owner);
    }
    Ok(())
}

fn generate_owner(
    generator: &Generator<'_>,
    vfs: &dyn Vfs,
    owner: &str,
    output_dir: &Path,
    private_dir: &Path,
) -> Result<OwnerReport, CliError> {
    let mut ctx = StagedContext::new(vfs, output_dir, private_dir);
    let unit = generator
        .generate(&mut ctx, owner)
        .map_err(|e| CliError::generate(owner, e))?;
    let files = ctx.finish().map_err(CliError::publish)?;
    Ok(OwnerReport {
        owner: owner.to_string(),
        unit: Some(unit),
        files,
        error: None,
    })
}

/// Generate every selected owner in parallel, each into its own staged
/// context. Returns the report and the first failure, if any.
pub fn generate_all(
    vfs: &dyn Vfs,
    workspace: &Workspace,
    args: &GenerateArgs,
) -> Result<(GenerateReport, Option<CliError>), CliError> {
    let mut owners = select_owners(&args.owners, workspace);
    let mut listed = HashSet::new();
    owners.retain(|owner| listed.insert(owner.clone()));
    if owners.is_empty() {
        return Err(CliError::NoOwners);
    }
    check_unit_names(&owners)?;

    let codegen = &workspace.config.config.codegen;
    let sink_kind = args.sink.unwrap_or(codegen.sink);
    let sink = sink_kind.create();
    let package = args.package.clone().unwrap_or_else(|| codegen.package.clone());
    let output_dir = args
        .out
        .clone()
        .unwrap_or_else(|| workspace.config.output_dir());
    let private_dir = workspace.config.private_dir();
    let generator = Generator::new(&workspace.loaded.index, sink.as_ref()).with_package(package);

    info!(
        "Generating {} owners with the {} sink into {:?}",
        owners.len(),
        sink_kind,
        output_dir
    );
    let results: Vec<(String, Result<OwnerReport, CliError>)> = owners
        .par_iter()
        .map(|owner| {
            let result = generate_owner(&generator, vfs, owner, &output_dir, &private_dir);
            (owner.clone(), result)
        })
        .collect();

    let mut first_error = None;
    let mut reports = Vec::with_capacity(results.len());
    for (owner, result) in results {
        match result {
            Ok(report) => reports.push(report),
            Err(e) => {
                error!("{}: {}", owner, e);
                reports.push(OwnerReport {
                    owner,
                    unit: None,
                    files: Vec::new(),
                    error: Some(error_chain(&e)),
                });
                first_error.get_or_insert(e);
            }
        }
    }

    let report = GenerateReport {
        sink: sink_kind,
        output_directory: output_dir,
        owners: reports,
    };
    Ok((report, first_error))
}

fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let _ = write!(message, ": {}", cause);
        source = cause.source();
    }
    message
}

pub fn run_generate(args: GenerateArgs, format: OutputFormat) -> Result<(), CliError> {
    let vfs = OsVfs;
    let workspace = Workspace::open(&vfs, args.config.as_deref(), &current_dir()?)?;
    let (report, first_error) = generate_all(&vfs, &workspace, &args)?;
    write_output(format, &report)?;

    match first_error {
        None => Ok(()),
        Some(e) if report.owners.len() == 1 => Err(e),
        Some(_) => Err(CliError::Partial {
            failed: report.failures(),
            total: report.owners.len(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serialgen_common::config::ConfigContext;
    use serialgen_common::loader::LoadedIndex;
    use serialgen_common::vfs::MemoryVfs;
    use serialgen_core::{SerialTypes, TypeDecl, TypeIndex};

    fn owner(name: &str) -> TypeDecl {
        TypeDecl::class(name).with_serial_types(SerialTypes {
            roots: vec![TypeRef::named("int")],
            ..SerialTypes::default()
        })
    }

    fn workspace(index: TypeIndex) -> Workspace {
        Workspace {
            config: ConfigContext::defaults(Path::new("project")),
            loaded: LoadedIndex {
                index,
                ..LoadedIndex::default()
            },
        }
    }

    #[test]
    fn test_colliding_unit_names_are_rejected_before_generation() {
        let vfs = MemoryVfs::new();
        let workspace = workspace(TypeIndex::new().with(owner("a.B$C")).with(owner("a.B_C")));

        let err = generate_all(&vfs, &workspace, &GenerateArgs::default()).unwrap_err();
        match err {
            CliError::UnitCollision { unit, first, second } => {
                assert_eq!(unit, "a_B_CImpl");
                assert_eq!(first, "a.B$C");
                assert_eq!(second, "a.B_C");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(vfs.paths().is_empty());
    }

    #[test]
    fn test_repeated_owner_is_generated_once() {
        let vfs = MemoryVfs::new();
        let workspace = workspace(TypeIndex::new().with(owner("a.Feed")));
        let args = GenerateArgs {
            owners: vec!["a.Feed".into(), "a.Feed".into()],
            ..GenerateArgs::default()
        };

        let (report, first_error) = generate_all(&vfs, &workspace, &args).unwrap();
        assert!(first_error.is_none());
        assert_eq!(report.owners.len(), 1);
        assert_eq!(report.owners[0].unit.as_deref(), Some("comet.a_FeedImpl"));
        assert!(vfs.exists(Path::new("project/generated/comet/a_FeedImpl.rs")));
    }
}
