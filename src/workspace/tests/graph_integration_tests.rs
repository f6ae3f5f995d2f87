//! Integration tests for the dependency graph as seen through the workspace.

use crate::config::Settings;
use crate::test_utils::{create_test_workspace, create_test_workspace_dir, write_script};
use crate::workspace::{IncludeKind, Workspace};

// ============================================================================
// Graph construction
// ============================================================================

#[test]
fn test_graph_nodes_are_tracked_scripts() {
    let (_temp_dir, _root, workspace) = create_test_workspace(&[
        ("a.scr", "#include \"b.scr\"\nmain:\nend\n"),
        ("b.scr", "helper:\nend\n"),
        ("c.scr", "other:\nend\n"),
    ]);

    let graph = workspace.dependency_graph();
    assert_eq!(graph.graph().node_count(), 3);
    assert_eq!(graph.graph().edge_count(), 1);
    assert_eq!(graph.roots().len(), 2, "a.scr and c.scr are roots");
}

/// Test: Includes resolve relative to the including script's directory.
#[test]
fn test_relative_includes_resolve() {
    let (_temp_dir, root, workspace) = create_test_workspace(&[
        ("maps/obj/base.scr", "#include \"base_fx.scr\"\nmain:\n\tthread fx_start\nend\n"),
        ("maps/obj/base_fx.scr", "fx_start:\nend\n"),
    ]);

    let edges = workspace.dependency_graph().edges();
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].resolved, Some(root.join("maps/obj/base_fx.scr")));
}

/// Test: Untracked files on disk resolve when filesystem checks are on.
#[test]
fn test_filesystem_check_resolves_untracked_files() {
    let (_temp_dir, root) = create_test_workspace_dir();
    write_script(&root, "main.scr", "#include \"vendor/lib.inc\"\nmain:\nend\n");
    write_script(&root, "vendor/lib.inc", "lib_thread:\nend\n");

    let workspace = Workspace::construct_workspace(&Settings::default(), &root).unwrap();
    let edges = workspace.dependency_graph().edges();
    assert_eq!(edges[0].resolved, Some(root.join("vendor/lib.inc")));

    let settings = Settings {
        check_filesystem: false,
        ..Settings::default()
    };
    let workspace = Workspace::construct_workspace(&settings, &root).unwrap();
    assert_eq!(workspace.dependency_graph().unresolved_edges().count(), 1);
}

#[test]
fn test_exec_statements_are_edges() {
    let (_temp_dir, root, workspace) = create_test_workspace(&[
        ("main.scr", "main:\n\texec global/ambient.scr\n\twaitexec \"global/door.scr\"\nend\n"),
        ("global/ambient.scr", "main:\nend\n"),
        ("global/door.scr", "main:\nend\n"),
    ]);

    let graph = workspace.dependency_graph();
    let kinds: Vec<IncludeKind> = graph
        .edges_from(&root.join("main.scr"))
        .map(|(_, edge)| edge.kind)
        .collect();
    assert_eq!(kinds, vec![IncludeKind::Exec, IncludeKind::Exec]);
    assert_eq!(graph.unused_edges().count(), 0);
}

// ============================================================================
// Transitive queries
// ============================================================================

#[test]
fn test_transitive_queries_through_workspace() {
    let (_temp_dir, root, workspace) = create_test_workspace(&[
        ("a.scr", "#include \"b.scr\"\n"),
        ("b.scr", "#include \"c.scr\"\n"),
        ("c.scr", "#include \"d.scr\"\n"),
        ("d.scr", ""),
    ]);

    assert_eq!(
        workspace.get_dependencies(&root.join("a.scr"), 2),
        vec![root.join("b.scr"), root.join("c.scr")]
    );
    assert_eq!(
        workspace.get_dependents(&root.join("d.scr")),
        vec![root.join("c.scr"), root.join("b.scr"), root.join("a.scr")]
    );
    assert!(workspace.get_dependents(&root.join("untracked.scr")).is_empty());
}

/// Test: The configured depth bounds dependent queries.
#[test]
fn test_dependents_respect_configured_depth() {
    let (_temp_dir, root) = create_test_workspace_dir();
    write_script(&root, "a.scr", "#include \"b.scr\"\n");
    write_script(&root, "b.scr", "#include \"c.scr\"\n");
    write_script(&root, "c.scr", "");
    let settings = Settings {
        max_traversal_depth: 1,
        ..Settings::default()
    };

    let workspace = Workspace::construct_workspace(&settings, &root).unwrap();
    assert_eq!(workspace.get_dependents(&root.join("c.scr")), vec![root.join("b.scr")]);
}

// ============================================================================
// Snapshot
// ============================================================================

#[test]
fn test_graph_snapshot_uses_script_paths() {
    let (_temp_dir, _root, workspace) = create_test_workspace(&[
        ("a.scr", "#include \"global/b.scr\"\n#include \"missing.scr\"\n"),
        ("global/b.scr", "#include \"../a.scr\"\nhelper:\nend\n"),
    ]);

    let snapshot = workspace.graph_snapshot();
    assert_eq!(snapshot.nodes, vec!["a.scr", "global/b.scr"]);
    assert_eq!(snapshot.edges.len(), 3);
    assert_eq!(snapshot.edges[1].to, None);
    assert_eq!(snapshot.cycles, vec![vec!["a.scr".to_string(), "global/b.scr".to_string()]]);
    assert!(snapshot.roots.is_empty());
}
