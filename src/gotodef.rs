use std::path::Path;

use tower_lsp::lsp_types::{Location, Position, Url};

use crate::language::Scope;
use crate::scanner::LexemeKind;
use crate::workspace::{MyRange, Workspace};

pub fn goto_definition(
    workspace: &Workspace,
    cursor_position: Position,
    path: &Path,
) -> Option<Vec<Location>> {
    let document = workspace.document(path)?;
    let lexeme = document.lexeme_at(cursor_position)?;

    // Script paths jump to the start of the script.
    let raw_path = match lexeme.kind {
        LexemeKind::PathRef => Some(lexeme.text.clone()),
        LexemeKind::String => document
            .includes
            .iter()
            .find(|include| {
                include.range.start.line == lexeme.line
                    && include.range.end.character == lexeme.end_column()
            })
            .map(|include| include.raw_path.clone()),
        _ => None,
    };
    if let Some(raw_path) = raw_path {
        let target = workspace.resolve_script(&raw_path, Some(path))?;
        return Some(vec![location(&target, MyRange::file_start())?]);
    }

    let name = document.symbol_at(cursor_position)?;
    let thread_index = document.thread_index_at(cursor_position.line);

    if let Some((raw_path, thread)) = name.rsplit_once("::") {
        let target = workspace.resolve_script(raw_path, Some(path))?;
        let target_document = workspace.document(&target)?;
        let range = target_document
            .threads
            .iter()
            .find(|definition| definition.name.eq_ignore_ascii_case(thread))
            .map(|definition| definition.range)
            .or_else(|| {
                target_document
                    .labels
                    .iter()
                    .find(|label| label.name.eq_ignore_ascii_case(thread))
                    .map(|label| label.range)
            })?;
        return Some(vec![location(&target, range)?]);
    }

    // Locals never leave their thread.
    if is_local(&name) {
        let definitions = workspace
            .find_all_definitions(&name)
            .into_iter()
            .filter(|definition| {
                definition.location.path == path && definition.thread_index == thread_index
            })
            .filter_map(|definition| location(path, definition.location.range))
            .take(1)
            .collect::<Vec<_>>();
        return Some(definitions);
    }

    // A label of the enclosing thread wins over a thread of the same name.
    if let Some(label) = thread_index.and_then(|index| document.find_label(index, &name)) {
        return Some(vec![location(path, label.range)?]);
    }

    let definition = workspace.find_definition_from(&name, path)?;
    Some(vec![location(&definition.location.path, definition.location.range)?])
}

pub(crate) fn is_local(name: &str) -> bool {
    name.split_once('.')
        .and_then(|(scope, _)| Scope::parse(scope))
        .is_some_and(|scope| scope == Scope::Local)
}

/// Ranges pass through unchanged, so columns are character counts (see
/// [`MyRange`]).
pub(crate) fn location(path: &Path, range: MyRange) -> Option<Location> {
    Some(Location {
        uri: Url::from_file_path(path).ok()?,
        range: *range,
    })
}
