//! Symbol providers for scripts.
//!
//! - `textDocument/documentSymbol`: threads, each with its parameters, labels
//!   and variables as children
//! - `workspace/symbol`: fuzzy search over every thread and label
//!
//! Workspace search ranks by [`nucleo_matcher`] score.

use std::path::Path;

use itertools::Itertools;
use nucleo_matcher::{
    pattern::{self, Normalization},
    Matcher,
};
use tower_lsp::lsp_types::{
    DocumentSymbol, DocumentSymbolParams, DocumentSymbolResponse, Location, Position, Range,
    SymbolInformation, SymbolKind, Url, WorkspaceSymbolParams,
};

use crate::language::ThreadRole;
use crate::workspace::{DefinitionKind, MyRange, ScriptDocument, Workspace};

fn compute_match_score(
    matcher: &mut Matcher,
    pattern: &pattern::Pattern,
    symbol: SymbolInformation,
) -> (u32, SymbolInformation) {
    let mut buf = Vec::new();
    (
        pattern
            .score(
                nucleo_matcher::Utf32Str::new(symbol.name.as_str(), &mut buf),
                matcher,
            )
            .unwrap_or_default(),
        symbol,
    )
}

/// Threads and labels of the whole workspace matching the query, best first.
#[allow(deprecated)] // field deprecated has been deprecated in favor of using tags
pub fn workspace_symbol(
    workspace: &Workspace,
    params: &WorkspaceSymbolParams,
) -> Option<Vec<SymbolInformation>> {
    let mut matcher = Matcher::new(nucleo_matcher::Config::DEFAULT);
    let pattern = pattern::Pattern::parse(
        &params.query,
        pattern::CaseMatching::Smart,
        Normalization::Smart,
    );

    Some(
        workspace
            .symbol_index()
            .definitions()
            .filter(|definition| {
                matches!(definition.kind, DefinitionKind::Thread | DefinitionKind::Label)
            })
            .filter_map(|definition| {
                let kind = match definition.kind {
                    DefinitionKind::Thread => SymbolKind::FUNCTION,
                    _ => SymbolKind::KEY,
                };
                Some(SymbolInformation {
                    name: definition.name.clone(),
                    kind,
                    tags: None,
                    deprecated: None,
                    location: Location {
                        uri: Url::from_file_path(&definition.location.path).ok()?,
                        range: *definition.location.range,
                    },
                    container_name: definition
                        .thread
                        .clone()
                        .or_else(|| Some(workspace.script_path(&definition.location.path))),
                })
            })
            .map(|symbol| compute_match_score(&mut matcher, &pattern, symbol))
            .filter(|(score, _)| *score > 0)
            .sorted_by(|(a, _), (b, _)| Ord::cmp(b, a))
            .map(|(_score, symbol)| symbol)
            .collect_vec(),
    )
}

/// Outline of one script. `None` when the file is untracked or has no threads.
pub fn document_symbol(
    workspace: &Workspace,
    _params: &DocumentSymbolParams,
    path: &Path,
) -> Option<DocumentSymbolResponse> {
    let document = workspace.document(path)?;
    if document.threads.is_empty() {
        return None;
    }
    let last_line = document.lines.len().saturating_sub(1) as u32;
    let line_end = |line: u32| {
        let length = workspace
            .select_line(path, line as usize)
            .map(|text| text.chars().count())
            .unwrap_or_default();
        Position::new(line, length as u32)
    };

    let symbols = document
        .threads
        .iter()
        .enumerate()
        .map(|(index, thread)| {
            let end_line = thread.end_line.unwrap_or_else(|| {
                document
                    .threads
                    .get(index + 1)
                    .map(|next| next.line().saturating_sub(1))
                    .unwrap_or(last_line)
            });
            let range = Range {
                start: thread.range.start,
                end: line_end(end_line),
            };
            let mut children = thread_children(document, index);
            children.sort_by_key(|child| (child.range.start.line, child.range.start.character));
            symbol(
                thread.name.clone(),
                SymbolKind::FUNCTION,
                range,
                *thread.range,
                role_detail(thread.role),
                Some(children),
            )
        })
        .collect();

    Some(DocumentSymbolResponse::Nested(symbols))
}

fn role_detail(role: ThreadRole) -> Option<String> {
    match role {
        ThreadRole::Plain => None,
        ThreadRole::EntryPoint => Some("entry point".to_string()),
        ThreadRole::EngineCallback => Some("engine callback".to_string()),
    }
}

fn thread_children(document: &ScriptDocument, index: usize) -> Vec<DocumentSymbol> {
    let thread = &document.threads[index];
    let mut children = Vec::new();

    for occurrence in document.occurrences.iter().filter(|occurrence| {
        occurrence.is_definition
            && occurrence.thread_index == Some(index)
            && occurrence.range.start.line == thread.line()
            && thread.has_parameter(occurrence.key.as_str())
    }) {
        children.push(leaf(
            occurrence.key.as_str().to_string(),
            SymbolKind::TYPE_PARAMETER,
            occurrence.range,
            None,
        ));
    }

    for label in document.labels_of(index) {
        children.push(leaf(
            label.name.clone(),
            SymbolKind::KEY,
            label.range,
            Some("label".to_string()),
        ));
    }

    for binding in document
        .variables
        .iter()
        .filter(|binding| binding.thread_index == index)
        .unique_by(|binding| binding.qualified_name.as_str())
    {
        children.push(leaf(
            binding.qualified_name.clone(),
            SymbolKind::VARIABLE,
            binding.range,
            None,
        ));
    }
    children
}

fn leaf(name: String, kind: SymbolKind, range: MyRange, detail: Option<String>) -> DocumentSymbol {
    symbol(name, kind, *range, *range, detail, None)
}

#[allow(deprecated)] // field deprecated has been deprecated in favor of using tags
fn symbol(
    name: String,
    kind: SymbolKind,
    range: Range,
    selection_range: Range,
    detail: Option<String>,
    children: Option<Vec<DocumentSymbol>>,
) -> DocumentSymbol {
    DocumentSymbol {
        name,
        kind,
        range,
        selection_range,
        detail,
        deprecated: None,
        tags: None,
        children,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_test_workspace;
    use tower_lsp::lsp_types::{PartialResultParams, TextDocumentIdentifier, WorkDoneProgressParams};

    fn document_params(path: &Path) -> DocumentSymbolParams {
        DocumentSymbolParams {
            text_document: TextDocumentIdentifier {
                uri: Url::from_file_path(path).unwrap(),
            },
            work_done_progress_params: WorkDoneProgressParams::default(),
            partial_result_params: PartialResultParams::default(),
        }
    }

    fn workspace_params(query: &str) -> WorkspaceSymbolParams {
        WorkspaceSymbolParams {
            query: query.to_string(),
            work_done_progress_params: WorkDoneProgressParams::default(),
            partial_result_params: PartialResultParams::default(),
        }
    }

    /// Test: Threads nest their parameters, labels and variables in order.
    #[test]
    fn test_document_symbol_outline() {
        let (_temp_dir, root, workspace) = create_test_workspace(&[(
            "main.scr",
            "main:\n\tlocal.n = 0\nloop:\n\tlocal.n++\n\tgoto loop\nend\n\nspawn_wave local.count:\n\tlevel.wave = local.count\nend\n",
        )]);
        let path = root.join("main.scr");

        let Some(DocumentSymbolResponse::Nested(symbols)) =
            document_symbol(&workspace, &document_params(&path), &path)
        else {
            panic!("Expected nested symbols");
        };

        assert_eq!(symbols.len(), 2);
        assert_eq!(symbols[0].name, "main");
        assert_eq!(symbols[0].range.end.line, 5);
        let main_children: Vec<(&str, SymbolKind)> = symbols[0]
            .children
            .as_ref()
            .unwrap()
            .iter()
            .map(|child| (child.name.as_str(), child.kind))
            .collect();
        assert_eq!(
            main_children,
            vec![("local.n", SymbolKind::VARIABLE), ("loop", SymbolKind::KEY)]
        );

        let wave_children: Vec<&str> = symbols[1]
            .children
            .as_ref()
            .unwrap()
            .iter()
            .map(|child| child.name.as_str())
            .collect();
        assert_eq!(wave_children, vec!["local.count", "level.wave"]);
    }

    #[test]
    fn test_document_symbol_without_threads() {
        let (_temp_dir, root, workspace) =
            create_test_workspace(&[("empty.scr", "// nothing here\n")]);
        let path = root.join("empty.scr");
        assert!(document_symbol(&workspace, &document_params(&path), &path).is_none());
    }

    /// Test: Workspace search is fuzzy and ranks the closest match first.
    #[test]
    fn test_workspace_symbol_fuzzy() {
        let (_temp_dir, _root, workspace) = create_test_workspace(&[
            ("a.scr", "spawn_wave:\nend\n\nwave_done:\nend\n"),
            ("b.scr", "unrelated:\nend\n"),
        ]);

        let results = workspace_symbol(&workspace, &workspace_params("spwave")).unwrap();
        assert!(!results.is_empty());
        assert_eq!(results[0].name, "spawn_wave");
        assert!(results.iter().all(|symbol| symbol.name != "unrelated"));
    }
}
