//! `serialgen validate`: load the index, resolve every declared type and
//! plan every owner, reporting all problems at once.

use super::{current_dir, Workspace};
use crate::error::CliError;
use crate::output::{write_output, HumanOutput, OutputFormat};
use clap::Args;
use serde::Serialize;
use serialgen_common::vfs::OsVfs;
use serialgen_core::{DiagnosticLog, Generator, TypeRef, TypeResolver};
use std::collections::HashSet;
use std::fmt::Write as _;
use std::path::PathBuf;
use tracing::debug;

#[derive(Debug, Clone, Default, Args)]
pub struct ValidateArgs {
    /// Path to serialgen.toml or serialgen.json
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
pub struct ValidateReport {
    pub files: Vec<PathBuf>,
    pub types: usize,
    pub owners: Vec<String>,
    pub problems: Vec<Problem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Problem {
    #[serde(rename = "type")]
    pub type_name: String,
    pub message: String,
}

impl ValidateReport {
    pub fn is_valid(&self) -> bool {
        self.problems.is_empty()
    }
}

impl HumanOutput for ValidateReport {
    fn render_human(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{} types from {} files, {} owners",
            self.types,
            self.files.len(),
            self.owners.len()
        );
        if self.is_valid() {
            out.push_str("No problems found\n");
        }
        for problem in &self.problems {
            let _ = writeln!(out, "  {}: {}", problem.type_name, problem.message);
        }
        out
    }
}

pub fn validate_workspace(workspace: &Workspace) -> ValidateReport {
    let index = &workspace.loaded.index;
    let mut resolver = TypeResolver::new(index);
    let mut problems = Vec::new();

    for decl in index.iter() {
        let mut referenced = vec![TypeRef::named(decl.name.as_str())];
        let declared = decl
            .supertype
            .iter()
            .chain(decl.interfaces.iter())
            .chain(decl.fields.iter().filter(|f| f.is_serializable()).map(|f| &f.ty))
            .chain(decl.serial_types.iter().flat_map(|s| s.roots.iter().chain(&s.from_peer)));
        for type_ref in declared {
            with_arguments(type_ref, &mut referenced);
        }
        for type_ref in &referenced {
            if let Err(e) = resolver.resolve_ref(type_ref) {
                problems.push(Problem {
                    type_name: decl.name.clone(),
                    message: format!("{}: {}", type_ref, e),
                });
            }
        }
    }

    let sink = workspace.config.config.codegen.sink.create();
    let generator = Generator::new(index, sink.as_ref());
    let owners: Vec<String> = index.owners().map(|d| d.name.clone()).collect();
    for owner in &owners {
        let mut log = DiagnosticLog::new();
        if let Err(e) = generator.plan(&TypeRef::named(owner.as_str()), &mut log) {
            problems.push(Problem {
                type_name: owner.clone(),
                message: e.to_string(),
            });
        }
    }
    let mut reported = HashSet::new();
    problems.retain(|p: &Problem| reported.insert(p.clone()));
    debug!("validated {} types, {} problems", index.len(), problems.len());

    ValidateReport {
        files: workspace.loaded.files.clone(),
        types: index.len(),
        owners,
        problems,
    }
}

/// `type_ref` followed by its generic arguments, depth first
fn with_arguments(type_ref: &TypeRef, out: &mut Vec<TypeRef>) {
    out.push(type_ref.clone());
    for arg in type_ref.args() {
        with_arguments(arg, out);
    }
}

pub fn run_validate(args: ValidateArgs, format: OutputFormat) -> Result<(), CliError> {
    let vfs = OsVfs;
    let workspace = Workspace::open(&vfs, args.config.as_deref(), &current_dir()?)?;
    let report = validate_workspace(&workspace);
    write_output(format, &report)?;
    if report.is_valid() {
        Ok(())
    } else {
        Err(CliError::Invalid {
            count: report.problems.len(),
        })
    }
}
