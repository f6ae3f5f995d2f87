use std::path::Path;

use tower_lsp::lsp_types::{Location, Position};

use crate::gotodef::{is_local, location};
use crate::workspace::Workspace;

/// Every occurrence of the symbol under the cursor.
///
/// Locals and labels of the enclosing thread are searched within that thread
/// only; everything else is searched across the workspace.
pub fn references(
    workspace: &Workspace,
    cursor_position: Position,
    path: &Path,
    include_declaration: bool,
) -> Option<Vec<Location>> {
    let document = workspace.document(path)?;
    let name = document.symbol_at(cursor_position)?;
    let thread_index = document.thread_index_at(cursor_position.line);

    let thread_scoped = is_local(&name)
        || thread_index.is_some_and(|index| document.find_label(index, &name).is_some());

    Some(
        workspace
            .find_references(&name, include_declaration)
            .into_iter()
            .filter(|site| {
                !thread_scoped
                    || (site.location.path == path && site.thread_index == thread_index)
            })
            .filter_map(|site| location(&site.location.path, site.location.range))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_test_workspace;

    /// Test: Thread references are collected from every file.
    #[test]
    fn test_references_across_files() {
        let (_temp_dir, root, workspace) = create_test_workspace(&[
            ("a.scr", "main:\n\tthread helper\nend\n"),
            ("b.scr", "other:\n\twaitthread Helper\n\t// thread helper\nend\n"),
            ("c.scr", "helper:\nend\n"),
        ]);

        let without = references(&workspace, Position::new(0, 2), &root.join("c.scr"), false)
            .expect("Should find references");
        assert_eq!(without.len(), 2, "Comments are not references");

        let with = references(&workspace, Position::new(0, 2), &root.join("c.scr"), true)
            .expect("Should find references");
        assert_eq!(with.len(), 3);
    }

    /// Test: A local's references stay inside its thread.
    #[test]
    fn test_local_references_are_thread_scoped() {
        let (_temp_dir, root, workspace) = create_test_workspace(&[(
            "main.scr",
            "first:\n\tlocal.x = 1\n\tprintln local.x\nend\n\nsecond:\n\tlocal.x = 2\nend\n",
        )]);

        let result = references(&workspace, Position::new(2, 15), &root.join("main.scr"), true)
            .expect("Should find references");
        let lines: Vec<u32> = result.iter().map(|l| l.range.start.line).collect();
        assert_eq!(lines, vec![1, 2]);
    }

    /// Test: Two same-named threads in one file keep their locals apart.
    #[test]
    fn test_local_references_with_duplicate_thread_names() {
        let (_temp_dir, root, workspace) = create_test_workspace(&[(
            "main.scr",
            "worker:\n\tlocal.x = 1\n\tprintln local.x\nend\n\nworker:\n\tlocal.x = 2\n\tprintln local.x\nend\n",
        )]);

        let result = references(&workspace, Position::new(2, 15), &root.join("main.scr"), true)
            .expect("Should find references");
        let lines: Vec<u32> = result.iter().map(|l| l.range.start.line).collect();
        assert_eq!(lines, vec![1, 2]);
    }

    /// Test: Level variables are shared across the workspace.
    #[test]
    fn test_level_references_are_workspace_wide() {
        let (_temp_dir, root, workspace) = create_test_workspace(&[
            ("a.scr", "main:\n\tlevel.wave = 1\nend\n"),
            ("b.scr", "other:\n\tprintln level.wave\nend\n"),
        ]);

        let result = references(&workspace, Position::new(1, 8), &root.join("a.scr"), false)
            .expect("Should find references");
        assert_eq!(result.len(), 1);
        assert!(result[0].uri.path().ends_with("b.scr"));
    }
}
