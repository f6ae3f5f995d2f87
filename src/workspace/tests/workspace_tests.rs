//! Tests for workspace construction, mutation and symbol queries.

use std::fs;
use std::path::Path;

use crate::config::Settings;
use crate::error::WorkspaceError;
use crate::test_utils::{create_test_workspace, create_test_workspace_dir, write_script};
use crate::tokens::{TokenModifiers, TokenType};
use crate::workspace::{DefinitionKind, Workspace};

// ============================================================================
// Construction
// ============================================================================

#[test]
fn test_construct_workspace_finds_scripts() {
    let (_temp_dir, root) = create_test_workspace_dir();
    write_script(&root, "main.scr", "main:\nend\n");
    write_script(&root, "global/util.scr", "helper:\nend\n");
    write_script(&root, "maps/dm/arena.SCR", "start:\nend\n");
    write_script(&root, "notes.txt", "helper:\nend\n");
    write_script(&root, ".git/hooks.scr", "hidden:\nend\n");

    let workspace = Workspace::construct_workspace(&Settings::default(), &root).unwrap();

    assert_eq!(workspace.document_count(), 3, "Hidden dirs and non-scripts are skipped");
    assert_eq!(workspace.count_threads(), 3);
    assert!(workspace.find_definition("hidden").is_none());
}

#[test]
fn test_construct_workspace_rejects_files() {
    let (_temp_dir, root) = create_test_workspace_dir();
    let file = write_script(&root, "main.scr", "main:\nend\n");

    let result = Workspace::construct_workspace(&Settings::default(), &file);
    assert!(matches!(result, Err(WorkspaceError::NotADirectory(_))));
}

/// Test: Invalid UTF-8 is read lossily instead of failing the file.
#[test]
fn test_invalid_utf8_is_tolerated() {
    let (_temp_dir, root) = create_test_workspace_dir();
    fs::write(root.join("latin1.scr"), b"main:\n\tprintln \"caf\xe9\"\nend\n").unwrap();

    let workspace = Workspace::construct_workspace(&Settings::default(), &root).unwrap();
    assert_eq!(workspace.count_threads(), 1);
}

// ============================================================================
// Mutation and invalidation
// ============================================================================

/// Test: Upserting identical text twice yields an identical index.
#[test]
fn test_upsert_is_idempotent() {
    let (_temp_dir, root, mut workspace) = create_test_workspace(&[
        ("a.scr", "main:\n\tthread helper\n\tlevel.x = 1\nend\n"),
        ("b.scr", "helper:\nend\n"),
    ]);
    let path = root.join("a.scr");
    let text = "main:\n\tthread helper\n\tthread other\nend\n";

    workspace.upsert_document(&path, text);
    let first = workspace.symbol_index().clone();
    workspace.upsert_document(&path, text);
    let second = workspace.symbol_index().clone();

    assert_eq!(first, second);
}

/// Test: Queries after an upsert see the new text.
#[test]
fn test_upsert_invalidates_index_and_graph() {
    let (_temp_dir, root, mut workspace) = create_test_workspace(&[
        ("a.scr", "main:\nend\n"),
        ("b.scr", "helper:\nend\n"),
    ]);
    assert_eq!(workspace.reference_count("helper", false), 0);
    assert!(workspace.get_dependencies(&root.join("a.scr"), 4).is_empty());

    workspace.upsert_document(
        &root.join("a.scr"),
        "#include \"b.scr\"\nmain:\n\tthread helper\nend\n",
    );

    assert_eq!(workspace.reference_count("helper", false), 1);
    assert_eq!(
        workspace.get_dependencies(&root.join("a.scr"), 4),
        vec![root.join("b.scr")]
    );
}

#[test]
fn test_remove_document() {
    let (_temp_dir, root, mut workspace) = create_test_workspace(&[
        ("a.scr", "main:\n\tthread helper\nend\n"),
        ("b.scr", "helper:\nend\n"),
    ]);
    assert!(workspace.find_definition("helper").is_some());

    let removed = workspace.remove_document(&root.join("b.scr"));
    assert!(removed.is_some());
    assert!(workspace.find_definition("helper").is_none());
    assert!(workspace.remove_document(&root.join("b.scr")).is_none());
}

#[test]
fn test_load_document_from_disk() {
    let (_temp_dir, root, mut workspace) = create_test_workspace(&[("a.scr", "main:\nend\n")]);
    let path = write_script(&root, "late.scr", "late_thread:\nend\n");

    workspace.load_document(&path).unwrap();
    assert!(workspace.find_definition("late_thread").is_some());
    assert!(workspace.load_document(&root.join("missing.scr")).is_err());
}

// ============================================================================
// Selection and symbol queries
// ============================================================================

#[test]
fn test_select_fields() {
    let (_temp_dir, root, workspace) = create_test_workspace(&[
        ("a.scr", "#include \"b.scr\"\nmain:\nloop:\n\tlocal.i = 1\nend\n"),
        ("b.scr", "helper:\nretry:\n\tgoto retry\nend\n"),
    ]);

    assert_eq!(workspace.count_labels(), 2);
    assert_eq!(workspace.select_labels(Some(&root.join("b.scr"))).len(), 1);
    assert_eq!(workspace.select_includes(None).len(), 1);
    let script = root.join("a.scr");
    let variables = workspace.select_variables(Some(&script));
    assert_eq!(variables[0].1.qualified_name, "local.i");
    assert!(workspace.select_threads(Some(Path::new("nope.scr"))).is_empty());
}

/// Test: `dir/file.scr::threadX` resolves to the exact header position.
#[test]
fn test_find_definition_with_script_path() {
    let (_temp_dir, _root, workspace) = create_test_workspace(&[
        ("dir/file.scr", "// header\n\nthreadX (local.a):\nend\n"),
        ("other.scr", "threadX:\nend\n"),
    ]);

    let definition = workspace
        .find_definition("dir/file.scr::threadX")
        .expect("Should resolve");
    assert_eq!(definition.kind, DefinitionKind::Thread);
    assert!(definition.location.path.ends_with("dir/file.scr"));
    assert_eq!((definition.location.line(), definition.location.column()), (2, 0));
}

#[test]
fn test_caller_count() {
    let (_temp_dir, _root, workspace) = create_test_workspace(&[
        ("a.scr", "main:\n\tthread helper\n\tthread helper\nend\n"),
        ("b.scr", "other:\n\twaitthread helper\nend\n\nhelper:\nend\n"),
    ]);
    assert_eq!(workspace.reference_count("helper", false), 3);
    assert_eq!(workspace.caller_count("helper"), 2);
}

#[test]
fn test_resolve_script_relative_to_includer() {
    let (_temp_dir, root, workspace) = create_test_workspace(&[
        ("maps/dm/arena.scr", "#include \"arena_fx.scr\"\nmain:\nend\n"),
        ("maps/dm/arena_fx.scr", "fx:\nend\n"),
    ]);

    let resolved = workspace.resolve_script("arena_fx.scr", Some(&root.join("maps/dm/arena.scr")));
    assert_eq!(resolved, Some(root.join("maps/dm/arena_fx.scr")));
    assert_eq!(
        workspace.resolve_script("MAPS\\DM\\Arena_FX.scr", None),
        Some(root.join("maps/dm/arena_fx.scr"))
    );
}

// ============================================================================
// Tokens
// ============================================================================

/// Test: Threads from other files are functions, and unreferenced
/// definitions carry the unused modifier.
#[test]
fn test_workspace_tokenize() {
    let (_temp_dir, root, workspace) = create_test_workspace(&[
        ("a.scr", "main:\n\tthread helper\nend\n\nlonely:\nend\n"),
        ("b.scr", "helper:\nend\n"),
    ]);
    let tokens = workspace.tokenize(&root.join("a.scr")).unwrap();

    let helper = tokens
        .iter()
        .find(|token| token.line == 1 && token.start_column == 8)
        .unwrap();
    assert_eq!(helper.token_type, TokenType::Function);

    let lonely = tokens.iter().find(|token| token.line == 4).unwrap();
    assert!(lonely.modifiers.contains(TokenModifiers::UNUSED));
    let main = &tokens[0];
    assert!(!main.modifiers.contains(TokenModifiers::UNUSED), "Entry points are never unused");
}

#[test]
fn test_select_line() {
    let (_temp_dir, root, workspace) =
        create_test_workspace(&[("a.scr", "main:\r\n\twait 1\r\nend\r\n")]);
    assert_eq!(
        workspace.select_line(&root.join("a.scr"), 1).as_deref(),
        Some("\twait 1")
    );
    assert!(workspace.select_line(&root.join("a.scr"), 99).is_none());
}
