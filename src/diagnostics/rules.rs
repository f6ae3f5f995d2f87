use std::collections::HashSet;

use itertools::Itertools;

use crate::language::Scope;
use crate::workspace::{DefinitionKind, IncludeKind, MyRange, SymbolKey};

use super::{DiagnosticCode, Finding, RuleContext};

pub(super) fn undefined_threads(ctx: &RuleContext) -> Vec<Finding> {
    let index = ctx.workspace.symbol_index();
    let mut findings: Vec<Finding> = ctx
        .document
        .calls
        .iter()
        .filter(|call| !index.is_thread(&call.name) && !ctx.document.has_label(&call.name))
        .map(|call| {
            Finding::new(
                DiagnosticCode::UndefinedThread,
                call.range,
                format!("Undefined thread '{}'", call.name),
            )
        })
        .collect();

    for reference in &ctx.document.cross_references {
        let Some(target) = ctx.workspace.resolve_script(&reference.raw_path, Some(ctx.path)) else {
            findings.push(Finding::new(
                DiagnosticCode::UndefinedThread,
                reference.path_range,
                format!("Script '{}' not found", reference.raw_path),
            ));
            continue;
        };
        // Files that exist on disk but are not tracked cannot be checked.
        let Some(document) = ctx.workspace.document(&target) else {
            continue;
        };
        if !document.has_thread(&reference.name) && !document.has_label(&reference.name) {
            findings.push(Finding::new(
                DiagnosticCode::UndefinedThread,
                reference.range,
                format!(
                    "Thread '{}' is not defined in '{}'",
                    reference.name, reference.raw_path
                ),
            ));
        }
    }
    findings
}

pub(super) fn undefined_labels(ctx: &RuleContext) -> Vec<Finding> {
    ctx.document
        .gotos
        .iter()
        .filter_map(|goto| {
            let thread = goto.thread_index?;
            ctx.document.find_label(thread, &goto.label).is_none().then(|| {
                Finding::new(
                    DiagnosticCode::UndefinedLabel,
                    goto.range,
                    format!(
                        "Label '{}' is not defined in thread '{}'",
                        goto.label, ctx.document.threads[thread].name
                    ),
                )
            })
        })
        .collect()
}

pub(super) fn unused_threads(ctx: &RuleContext) -> Vec<Finding> {
    ctx.document
        .threads
        .iter()
        .filter(|thread| {
            !thread.role.is_engine_invoked() && !ctx.settings.is_extra_entry_point(&thread.name)
        })
        .filter(|thread| ctx.workspace.reference_count(&thread.name, false) == 0)
        .map(|thread| {
            Finding::new(
                DiagnosticCode::UnusedThread,
                thread.range,
                format!("Thread '{}' is never referenced", thread.name),
            )
        })
        .collect()
}

pub(super) fn unused_labels(ctx: &RuleContext) -> Vec<Finding> {
    ctx.document
        .labels
        .iter()
        .filter(|label| ctx.workspace.reference_count(&label.name, false) == 0)
        .map(|label| {
            Finding::new(
                DiagnosticCode::UnusedLabel,
                label.range,
                format!("Label '{}' is never referenced", label.name),
            )
        })
        .collect()
}

/// Locals count only reads within their own thread; level and game variables
/// count reads anywhere in the workspace.
pub(super) fn unused_variables(ctx: &RuleContext) -> Vec<Finding> {
    let mut seen = HashSet::new();
    let mut findings = Vec::new();

    for binding in &ctx.document.variables {
        if !matches!(binding.scope, Scope::Local | Scope::Level | Scope::Game) {
            continue;
        }
        let thread_key = binding.scope.is_thread_scoped().then_some(binding.thread_index);
        if !seen.insert((binding.qualified_name.clone(), thread_key)) {
            continue;
        }

        let read = if binding.scope.is_thread_scoped() {
            let key = SymbolKey::scoped(binding.scope, &binding.name);
            ctx.document.occurrences.iter().any(|occurrence| {
                !occurrence.is_definition
                    && occurrence.thread_index == Some(binding.thread_index)
                    && occurrence.key == key
            })
        } else {
            ctx.workspace.reference_count(&binding.qualified_name, false) > 0
        };

        if !read {
            findings.push(Finding::new(
                DiagnosticCode::UnusedVariable,
                binding.range,
                format!("Variable '{}' is assigned but never read", binding.qualified_name),
            ));
        }
    }
    findings
}

/// Every definition after the first, by (file, line), is a duplicate.
pub(super) fn duplicate_threads(ctx: &RuleContext) -> Vec<Finding> {
    ctx.document
        .threads
        .iter()
        .filter_map(|thread| {
            let definitions = ctx
                .workspace
                .find_all_definitions(&thread.name)
                .into_iter()
                .filter(|definition| definition.kind == DefinitionKind::Thread)
                .collect_vec();
            let first = definitions.first()?;
            if definitions.len() < 2
                || (first.location.path == ctx.path && first.location.range == thread.range)
            {
                return None;
            }
            Some(Finding::new(
                DiagnosticCode::DuplicateThread,
                thread.range,
                format!(
                    "Thread '{}' is already defined in {} at line {}",
                    thread.name,
                    ctx.workspace.script_path(&first.location.path),
                    first.location.line() + 1
                ),
            ))
        })
        .collect()
}

/// One finding per cycle, on the include that leads to the next member.
pub(super) fn circular_dependencies(ctx: &RuleContext) -> Vec<Finding> {
    let graph = ctx.workspace.dependency_graph();
    graph
        .cycles_through(ctx.path)
        .map(|cycle| {
            let position = cycle.iter().position(|member| member == ctx.path).unwrap_or(0);
            let next = &cycle[(position + 1) % cycle.len()];
            let range = graph
                .edges_from(ctx.path)
                .find(|(_, edge)| edge.resolved.as_ref() == Some(next))
                .map(|(_, edge)| edge.range)
                .unwrap_or_else(MyRange::file_start);
            let members = cycle
                .iter()
                .chain(std::iter::once(&cycle[0]))
                .map(|member| ctx.workspace.script_path(member))
                .join(" -> ");
            Finding::new(
                DiagnosticCode::CircularDependency,
                range,
                format!("Circular include: {members}"),
            )
        })
        .collect()
}

pub(super) fn missing_includes(ctx: &RuleContext) -> Vec<Finding> {
    ctx.workspace
        .dependency_graph()
        .edges_from(ctx.path)
        .filter(|(_, edge)| edge.resolved.is_none())
        .map(|(_, edge)| {
            let what = match edge.kind {
                IncludeKind::Include => "Included",
                IncludeKind::Exec => "Executed",
            };
            Finding::new(
                DiagnosticCode::MissingInclude,
                edge.range,
                format!("{what} script '{}' not found", edge.raw_path),
            )
        })
        .collect()
}

pub(super) fn unused_includes(ctx: &RuleContext) -> Vec<Finding> {
    let graph = ctx.workspace.dependency_graph();
    graph
        .edges_from(ctx.path)
        .filter(|(index, _)| graph.is_unused(*index))
        .map(|(_, edge)| {
            Finding::new(
                DiagnosticCode::UnusedInclude,
                edge.range,
                format!("No thread from '{}' is used", edge.raw_path),
            )
        })
        .collect()
}
