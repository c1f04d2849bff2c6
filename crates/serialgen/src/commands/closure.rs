//! `serialgen closure`: show what an owner's serializer would cover
//! without writing anything.

use super::{current_dir, Workspace};
use crate::error::CliError;
use crate::output::{write_output, HumanOutput, OutputFormat};
use clap::{Args, ValueEnum};
use serde::Serialize;
use serialgen_common::vfs::OsVfs;
use serialgen_core::{
    DiagnosticLog, Direction, GenerationPlan, Generator, SerializationMode, TypeKind, TypeRef,
};
use std::fmt::Write as _;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum DirectionArg {
    ToPeer,
    FromPeer,
    #[default]
    Both,
}

impl DirectionArg {
    pub fn directions(self) -> &'static [Direction] {
        match self {
            DirectionArg::ToPeer => &[Direction::ToPeer],
            DirectionArg::FromPeer => &[Direction::FromPeer],
            DirectionArg::Both => &Direction::BOTH,
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct ClosureArgs {
    /// Owner type whose serial_types annotation lists the roots
    #[arg(long, value_name = "TYPE")]
    pub owner: String,

    /// Which closure to show
    #[arg(short, long, value_enum, default_value_t = DirectionArg::Both)]
    pub direction: DirectionArg,

    /// Path to serialgen.toml or serialgen.json
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Also print every include/exclude decision
    #[arg(long)]
    pub log: bool,
}

#[derive(Debug, Serialize)]
pub struct ClosureReport {
    pub owner: String,
    pub mode: SerializationMode,
    pub fingerprint: String,
    pub directions: Vec<DirectionReport>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub log: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct DirectionReport {
    pub direction: Direction,
    pub roots: Vec<String>,
    pub members: Vec<MemberReport>,
}

#[derive(Debug, Serialize)]
pub struct MemberReport {
    #[serde(rename = "type")]
    pub type_ref: String,
    pub kind: TypeKind,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<String>,
}

impl ClosureReport {
    pub fn from_plan(plan: &GenerationPlan, directions: &[Direction], log: Option<&DiagnosticLog>) -> Self {
        let directions = directions
            .iter()
            .map(|&direction| {
                let closure = plan.closure(direction);
                let orders = plan.orders.get(&direction);
                let members = closure
                    .iter()
                    .map(|(type_ref, descriptor)| MemberReport {
                        type_ref: type_ref.to_string(),
                        kind: descriptor.kind,
                        fields: orders
                            .and_then(|o| o.get(type_ref))
                            .map(|t| t.field_names().into_iter().map(String::from).collect())
                            .unwrap_or_default(),
                    })
                    .collect();
                DirectionReport {
                    direction,
                    roots: closure.roots().iter().map(TypeRef::to_string).collect(),
                    members,
                }
            })
            .collect();

        ClosureReport {
            owner: plan.owner.to_string(),
            mode: plan.mode,
            fingerprint: plan.table.fingerprint.clone(),
            directions,
            log: log
                .map(|l| l.render().lines().map(String::from).collect())
                .unwrap_or_default(),
        }
    }
}

impl HumanOutput for ClosureReport {
    fn render_human(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{} ({}), fingerprint {}", self.owner, self.mode, self.fingerprint);
        for direction in &self.directions {
            let _ = writeln!(
                out,
                "[{}] roots: {}",
                direction.direction,
                if direction.roots.is_empty() {
                    "none".to_string()
                } else {
                    direction.roots.join(", ")
                }
            );
            for member in &direction.members {
                if member.fields.is_empty() {
                    let _ = writeln!(out, "  {} {}", member.kind_label(), member.type_ref);
                } else {
                    let _ = writeln!(
                        out,
                        "  {} {} [{}]",
                        member.kind_label(),
                        member.type_ref,
                        member.fields.join(", ")
                    );
                }
            }
        }
        for line in &self.log {
            let _ = writeln!(out, "{}", line);
        }
        out
    }
}

impl MemberReport {
    fn kind_label(&self) -> &'static str {
        match self.kind {
            TypeKind::Primitive => "primitive",
            TypeKind::Array => "array",
            TypeKind::Class => "class",
            TypeKind::Interface => "interface",
        }
    }
}

pub fn run_closure(args: ClosureArgs, format: OutputFormat) -> Result<(), CliError> {
    let vfs = OsVfs;
    let workspace = Workspace::open(&vfs, args.config.as_deref(), &current_dir()?)?;
    let report = closure_report(&workspace, &args)?;
    write_output(format, &report)
}

pub fn closure_report(workspace: &Workspace, args: &ClosureArgs) -> Result<ClosureReport, CliError> {
    let sink = workspace.config.config.codegen.sink.create();
    let generator = Generator::new(&workspace.loaded.index, sink.as_ref());
    let owner = TypeRef::parse(&args.owner).map_err(|e| CliError::generate(&args.owner, e))?;

    let mut log = DiagnosticLog::new();
    let plan = generator
        .plan(&owner, &mut log)
        .map_err(|e| CliError::generate(&args.owner, e))?;
    Ok(ClosureReport::from_plan(
        &plan,
        args.direction.directions(),
        args.log.then_some(&log),
    ))
}
