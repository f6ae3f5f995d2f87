//! The `morpheus` command line.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use itertools::Itertools;
use tower_lsp::lsp_types::ClientCapabilities;
use tracing::debug;

use crate::config::Settings;
use crate::diagnostics::{analyze, Severity};
use crate::workspace::{GraphSnapshot, IncludeKind, Workspace};

#[derive(Parser, Debug)]
#[command(
    name = "morpheus",
    version,
    about = "Workspace intelligence for Morpheus .scr scripts"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print diagnostics for every script under a directory
    Check {
        #[arg(value_name = "DIR")]
        root: PathBuf,
    },
    /// Print the include/exec dependency graph
    Graph {
        #[arg(value_name = "DIR")]
        root: PathBuf,

        /// Emit the graph snapshot as JSON
        #[arg(long)]
        json: bool,
    },
    /// Dump the classified token stream of one script
    Tokens {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Workspace root used to resolve threads; defaults to the file's directory
        #[arg(long)]
        root: Option<PathBuf>,
    },
}

/// Runs one command, writing its report to `out`. Returns `false` when
/// `check` found errors.
pub fn run(cli: Cli, out: &mut impl Write) -> anyhow::Result<bool> {
    match cli.command {
        Commands::Check { root } => check(&root, out),
        Commands::Graph { root, json } => graph(&root, json, out).map(|_| true),
        Commands::Tokens { file, root } => tokens(&file, root.as_deref(), out).map(|_| true),
    }
}

fn open_workspace(root: &Path) -> anyhow::Result<(Settings, Workspace)> {
    let settings = Settings::new(root, &ClientCapabilities::default())?;
    let workspace = Workspace::construct_workspace(&settings, root)
        .with_context(|| format!("Failed to load workspace at {}", root.display()))?;
    Ok((settings, workspace))
}

pub fn check(root: &Path, out: &mut impl Write) -> anyhow::Result<bool> {
    let (settings, workspace) = open_workspace(root)?;
    let mut errors = 0usize;
    let mut total = 0usize;

    for (path, _) in workspace.documents() {
        let Some(diagnostics) = analyze(&workspace, &settings, path) else {
            continue;
        };
        let script = workspace.script_path(path);
        for diagnostic in diagnostics {
            total += 1;
            if diagnostic.severity == Severity::Error {
                errors += 1;
            }
            writeln!(
                out,
                "{script}:{}:{}: {}[{}]: {}",
                diagnostic.range.start.line + 1,
                diagnostic.range.start.character + 1,
                diagnostic.severity.as_str(),
                diagnostic.code,
                diagnostic.message
            )?;
        }
    }

    writeln!(
        out,
        "{} scripts checked, {total} problems ({errors} errors)",
        workspace.document_count()
    )?;
    Ok(errors == 0)
}

pub fn graph(root: &Path, json: bool, out: &mut impl Write) -> anyhow::Result<()> {
    let (_, workspace) = open_workspace(root)?;
    let snapshot = workspace.graph_snapshot();
    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(&snapshot)?)?;
    } else {
        write_graph(&snapshot, out)?;
    }
    Ok(())
}

fn write_graph(snapshot: &GraphSnapshot, out: &mut impl Write) -> anyhow::Result<()> {
    writeln!(out, "{} scripts, {} edges", snapshot.nodes.len(), snapshot.edges.len())?;
    for (from, edges) in &snapshot.edges.iter().chunk_by(|edge| edge.from.as_str()) {
        writeln!(out, "{from}")?;
        for edge in edges {
            let kind = match edge.kind {
                IncludeKind::Include => "include",
                IncludeKind::Exec => "exec",
            };
            let target = edge.to.as_deref().unwrap_or("<missing>");
            let unused = if edge.unused { " (unused)" } else { "" };
            writeln!(out, "  {kind} {} -> {target}{unused}", edge.raw_path)?;
        }
    }
    if !snapshot.roots.is_empty() {
        writeln!(out, "roots: {}", snapshot.roots.join(", "))?;
    }
    for cycle in &snapshot.cycles {
        writeln!(out, "cycle: {} -> {}", cycle.join(" -> "), cycle[0])?;
    }
    Ok(())
}

pub fn tokens(file: &Path, root: Option<&Path>, out: &mut impl Write) -> anyhow::Result<()> {
    let root = match root {
        Some(root) => root.to_path_buf(),
        None => file
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or(Path::new("."))
            .to_path_buf(),
    };
    let (_, mut workspace) = open_workspace(&root)?;
    if workspace.document(file).is_none() {
        debug!(file = %file.display(), "file is outside the walked workspace");
        workspace.load_document(file)?;
    }

    let tokens = workspace
        .tokenize(file)
        .ok_or_else(|| anyhow!("{} is not a tracked script", file.display()))?;
    for token in tokens {
        let text: String = workspace
            .select_line(file, token.line as usize)
            .map(|line| {
                line.chars()
                    .skip(token.start_column as usize)
                    .take(token.length as usize)
                    .collect()
            })
            .unwrap_or_default();
        writeln!(
            out,
            "{}:{} {} [{}] {:?}",
            token.line + 1,
            token.start_column + 1,
            token.token_type.as_str(),
            token.modifiers.names().join(","),
            text
        )?;
    }
    Ok(())
}
