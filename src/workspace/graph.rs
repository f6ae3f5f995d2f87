//! Graph-based representation of script dependencies.
//!
//! Each tracked script is a node and every resolved `#include`, `exec` or
//! `waitexec` is an edge pointing from the including script to its target.
//! Edges that cannot be resolved are kept alongside the graph as data; they
//! are what missing-include diagnostics report.
//!
//! Derived facts are computed once per build:
//! - roots: scripts nothing includes
//! - cycles: the first include cycle found in each weakly connected component
//! - unused edges: `#include` edges whose target exports no thread name that
//!   appears in the including script's text

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};

use itertools::Itertools;
use petgraph::prelude::*;
use petgraph::unionfind::UnionFind;
use ropey::Rope;
use serde::Serialize;
use tracing::{debug, warn};

use super::document::ScriptDocument;
use super::helpers::ScriptTable;
use super::types::{IncludeKind, MyRange};

/// Upper bound on any traversal, whatever the configured depth.
pub const MAX_TRAVERSAL_DEPTH: usize = 64;

/// An include or exec as it appears in a script, resolved or not.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct IncludeEdge {
    pub from: PathBuf,
    pub raw_path: String,
    pub resolved: Option<PathBuf>,
    pub kind: IncludeKind,
    pub range: MyRange,
}

/// Node weight is the script path, edge weight the index into
/// [`DependencyGraph::edges`].
pub type ScriptGraph = DiGraph<PathBuf, usize>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphOptions {
    pub check_filesystem: bool,
    pub max_depth: usize,
}

impl Default for GraphOptions {
    fn default() -> Self {
        GraphOptions {
            check_filesystem: true,
            max_depth: 32,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DependencyGraph {
    graph: ScriptGraph,
    nodes: HashMap<PathBuf, NodeIndex>,
    edges: Vec<IncludeEdge>,
    roots: Vec<PathBuf>,
    cycles: Vec<Vec<PathBuf>>,
    unused_edges: Vec<usize>,
    max_depth: usize,
}

impl DependencyGraph {
    pub fn build(
        root_dir: &Path,
        documents: &HashMap<PathBuf, ScriptDocument>,
        ropes: &HashMap<PathBuf, Rope>,
        options: GraphOptions,
    ) -> DependencyGraph {
        let scripts = ScriptTable::new(root_dir, documents.keys());
        let mut graph = ScriptGraph::new();
        let mut nodes = HashMap::new();

        let sorted_paths = documents.keys().sorted().collect_vec();
        for path in &sorted_paths {
            nodes.insert((*path).clone(), graph.add_node((*path).clone()));
        }

        let mut edges = Vec::new();
        for path in sorted_paths {
            let document = &documents[path];
            for include in &document.includes {
                let resolved = if options.check_filesystem {
                    scripts.resolve_on_disk(&include.raw_path, Some(path.as_path()))
                } else {
                    scripts.resolve(&include.raw_path, Some(path.as_path())).cloned()
                };

                if let Some(target) = &resolved {
                    let source = nodes[path];
                    let target = *nodes
                        .entry(target.clone())
                        .or_insert_with(|| graph.add_node(target.clone()));
                    graph.add_edge(source, target, edges.len());
                } else {
                    debug!(from = %path.display(), raw = %include.raw_path, "unresolved include");
                }

                edges.push(IncludeEdge {
                    from: path.clone(),
                    raw_path: include.raw_path.clone(),
                    resolved,
                    kind: include.kind,
                    range: include.range,
                });
            }
        }

        let roots = graph
            .node_indices()
            .filter(|node| {
                graph
                    .neighbors_directed(*node, Direction::Incoming)
                    .next()
                    .is_none()
            })
            .map(|node| graph[node].clone())
            .sorted()
            .collect();

        let unused_edges = find_unused_edges(&edges, documents, ropes);

        let mut dependency_graph = DependencyGraph {
            graph,
            nodes,
            edges,
            roots,
            cycles: Vec::new(),
            unused_edges,
            max_depth: options.max_depth.min(MAX_TRAVERSAL_DEPTH),
        };
        dependency_graph.cycles = dependency_graph.detect_include_cycles();
        dependency_graph
    }

    pub fn graph(&self) -> &ScriptGraph {
        &self.graph
    }

    pub fn edges(&self) -> &[IncludeEdge] {
        &self.edges
    }

    pub fn edges_from<'a>(&'a self, path: &'a Path) -> impl Iterator<Item = (usize, &'a IncludeEdge)> {
        self.edges
            .iter()
            .enumerate()
            .filter(move |(_, edge)| edge.from == path)
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    pub fn cycles(&self) -> &[Vec<PathBuf>] {
        &self.cycles
    }

    pub fn unused_edges(&self) -> impl Iterator<Item = &IncludeEdge> {
        self.unused_edges.iter().map(|index| &self.edges[*index])
    }

    pub fn is_unused(&self, edge_index: usize) -> bool {
        self.unused_edges.contains(&edge_index)
    }

    pub fn unresolved_edges(&self) -> impl Iterator<Item = &IncludeEdge> {
        self.edges.iter().filter(|edge| edge.resolved.is_none())
    }

    /// Scripts that transitively include `path`.
    pub fn dependents(&self, path: &Path) -> Vec<PathBuf> {
        self.traverse(path, Direction::Incoming, self.max_depth)
    }

    /// Scripts `path` transitively includes, at most `max_depth` edges away.
    pub fn dependencies(&self, path: &Path, max_depth: usize) -> Vec<PathBuf> {
        self.traverse(path, Direction::Outgoing, max_depth.min(MAX_TRAVERSAL_DEPTH))
    }

    /// Breadth-first closure from `path`. The start node is only part of the
    /// result when a cycle leads back to it.
    fn traverse(&self, path: &Path, direction: Direction, max_depth: usize) -> Vec<PathBuf> {
        let Some(&start) = self.nodes.get(path) else {
            return Vec::new();
        };
        let mut seen = HashSet::from([start]);
        let mut result = Vec::new();
        let mut queue = VecDeque::from([(start, 0usize)]);

        while let Some((node, depth)) = queue.pop_front() {
            for next in self.graph.neighbors_directed(node, direction).sorted() {
                if next == start && !result.contains(&self.graph[start]) {
                    result.push(self.graph[start].clone());
                }
                if !seen.insert(next) {
                    continue;
                }
                if depth + 1 > max_depth {
                    warn!(
                        from = %path.display(),
                        max_depth,
                        "dependency traversal hit the depth cap; result is partial"
                    );
                    return result;
                }
                result.push(self.graph[next].clone());
                queue.push_back((next, depth + 1));
            }
        }
        result
    }

    /// Depth-first search with an explicit recursion stack. Reports the first
    /// cycle found in each weakly connected component, self-includes included.
    pub fn detect_include_cycles(&self) -> Vec<Vec<PathBuf>> {
        let mut components = UnionFind::<usize>::new(self.graph.node_count());
        for edge in self.graph.edge_references() {
            components.union(edge.source().index(), edge.target().index());
        }

        let mut reported: HashSet<usize> = HashSet::new();
        let mut cycles = Vec::new();
        let mut visited = vec![false; self.graph.node_count()];
        let mut on_stack = vec![false; self.graph.node_count()];

        let start_nodes = self
            .graph
            .node_indices()
            .sorted_by(|a, b| self.graph[*a].cmp(&self.graph[*b]))
            .collect_vec();

        for start in start_nodes {
            if visited[start.index()] {
                continue;
            }
            // (node, sorted successors, next successor to visit)
            let mut stack: Vec<(NodeIndex, Vec<NodeIndex>, usize)> = Vec::new();
            visited[start.index()] = true;
            on_stack[start.index()] = true;
            stack.push((start, self.successors(start), 0));

            while let Some((node, successors, cursor)) = stack.last_mut() {
                let node = *node;
                let Some(&next) = successors.get(*cursor) else {
                    on_stack[node.index()] = false;
                    stack.pop();
                    continue;
                };
                *cursor += 1;

                if on_stack[next.index()] {
                    let component = components.find(next.index());
                    if reported.insert(component) {
                        let begin = stack
                            .iter()
                            .position(|(member, _, _)| *member == next)
                            .unwrap_or(0);
                        let members = stack[begin..]
                            .iter()
                            .map(|(member, _, _)| self.graph[*member].clone())
                            .collect();
                        cycles.push(members);
                    }
                } else if !visited[next.index()] {
                    visited[next.index()] = true;
                    on_stack[next.index()] = true;
                    stack.push((next, self.successors(next), 0));
                }
            }
        }
        cycles
    }

    fn successors(&self, node: NodeIndex) -> Vec<NodeIndex> {
        self.graph
            .neighbors_directed(node, Direction::Outgoing)
            .unique()
            .sorted_by(|a, b| self.graph[*a].cmp(&self.graph[*b]))
            .collect()
    }

    /// Cycles `path` is a member of.
    pub fn cycles_through<'a>(&'a self, path: &'a Path) -> impl Iterator<Item = &'a Vec<PathBuf>> {
        self.cycles
            .iter()
            .filter(move |cycle| cycle.iter().any(|member| member == path))
    }

    pub fn snapshot(&self, scripts: &ScriptTable) -> GraphSnapshot {
        GraphSnapshot {
            nodes: self
                .graph
                .node_weights()
                .map(|path| scripts.script_path(path))
                .sorted()
                .collect(),
            edges: self
                .edges
                .iter()
                .enumerate()
                .map(|(index, edge)| SnapshotEdge {
                    from: scripts.script_path(&edge.from),
                    to: edge.resolved.as_deref().map(|path| scripts.script_path(path)),
                    raw_path: edge.raw_path.clone(),
                    kind: edge.kind,
                    unused: self.is_unused(index),
                })
                .collect(),
            roots: self
                .roots
                .iter()
                .map(|path| scripts.script_path(path))
                .collect(),
            cycles: self
                .cycles
                .iter()
                .map(|cycle| cycle.iter().map(|path| scripts.script_path(path)).collect())
                .collect(),
        }
    }
}

fn find_unused_edges(
    edges: &[IncludeEdge],
    documents: &HashMap<PathBuf, ScriptDocument>,
    ropes: &HashMap<PathBuf, Rope>,
) -> Vec<usize> {
    let mut texts: HashMap<&Path, String> = HashMap::new();
    edges
        .iter()
        .enumerate()
        .filter(|(_, edge)| edge.kind == IncludeKind::Include)
        .filter_map(|(index, edge)| {
            let target = documents.get(edge.resolved.as_ref()?)?;
            let text = texts.entry(edge.from.as_path()).or_insert_with(|| {
                ropes
                    .get(&edge.from)
                    .map(|rope| rope.to_string().to_ascii_lowercase())
                    .unwrap_or_default()
            });
            let used = target
                .threads
                .iter()
                .any(|thread| text.contains(&thread.name.to_ascii_lowercase()));
            (!used).then_some(index)
        })
        .collect()
}

/// Serializable view of the graph for visualization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<String>,
    pub edges: Vec<SnapshotEdge>,
    pub roots: Vec<String>,
    pub cycles: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotEdge {
    pub from: String,
    pub to: Option<String>,
    pub raw_path: String,
    pub kind: IncludeKind,
    pub unused: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph_of(files: &[(&str, &str)]) -> DependencyGraph {
        let mut documents = HashMap::new();
        let mut ropes = HashMap::new();
        for (path, text) in files {
            let path = PathBuf::from(path);
            documents.insert(path.clone(), ScriptDocument::new(&path, text));
            ropes.insert(path, Rope::from_str(text));
        }
        DependencyGraph::build(
            Path::new(""),
            &documents,
            &ropes,
            GraphOptions {
                check_filesystem: false,
                max_depth: 32,
            },
        )
    }

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(PathBuf::from).collect()
    }

    // ========================================================================
    // Construction
    // ========================================================================

    #[test]
    fn test_edges_and_roots() {
        let graph = graph_of(&[
            ("a.scr", "#include \"b.scr\"\nmain:\n\texec c.scr\nend\n"),
            ("b.scr", "helper:\nend\n"),
            ("c.scr", "main:\nend\n"),
        ]);
        assert_eq!(graph.edges().len(), 2);
        assert_eq!(graph.graph().edge_count(), 2);
        assert_eq!(graph.roots(), paths(&["a.scr"]).as_slice());
    }

    #[test]
    fn test_unresolved_edges_are_kept() {
        let graph = graph_of(&[("a.scr", "#include \"missing.scr\"\n")]);
        let unresolved: Vec<_> = graph.unresolved_edges().collect();
        assert_eq!(unresolved.len(), 1);
        assert_eq!(unresolved[0].raw_path, "missing.scr");
        assert_eq!(graph.graph().edge_count(), 0);
    }

    // ========================================================================
    // Cycles
    // ========================================================================

    #[test]
    fn test_two_file_cycle() {
        let graph = graph_of(&[
            ("a.scr", "#include \"b.scr\"\n"),
            ("b.scr", "#include \"a.scr\"\n"),
        ]);
        assert_eq!(graph.cycles(), &[paths(&["a.scr", "b.scr"])]);
        assert_eq!(graph.cycles_through(Path::new("b.scr")).count(), 1);
        assert!(graph.roots().is_empty());
    }

    #[test]
    fn test_self_include_is_a_cycle() {
        let graph = graph_of(&[("self.scr", "#include \"self.scr\"\n")]);
        assert_eq!(graph.cycles(), &[paths(&["self.scr"])]);
    }

    #[test]
    fn test_one_cycle_per_component() {
        let graph = graph_of(&[
            ("a.scr", "#include \"b.scr\"\n#include \"c.scr\"\n"),
            ("b.scr", "#include \"a.scr\"\n"),
            ("c.scr", "#include \"a.scr\"\n"),
            ("x.scr", "#include \"y.scr\"\n"),
            ("y.scr", "#include \"x.scr\"\n"),
        ]);
        assert_eq!(graph.cycles().len(), 2);
    }

    #[test]
    fn test_linear_chain_has_no_cycles() {
        let graph = graph_of(&[
            ("a.scr", "#include \"b.scr\"\n"),
            ("b.scr", "#include \"c.scr\"\n"),
            ("c.scr", ""),
        ]);
        assert!(graph.cycles().is_empty());
    }

    // ========================================================================
    // Traversal
    // ========================================================================

    #[test]
    fn test_dependencies_and_dependents() {
        let graph = graph_of(&[
            ("a.scr", "#include \"b.scr\"\n"),
            ("b.scr", "#include \"c.scr\"\n"),
            ("c.scr", ""),
        ]);
        assert_eq!(
            graph.dependencies(Path::new("a.scr"), 10),
            paths(&["b.scr", "c.scr"])
        );
        assert_eq!(graph.dependencies(Path::new("a.scr"), 1), paths(&["b.scr"]));
        assert_eq!(
            graph.dependents(Path::new("c.scr")),
            paths(&["b.scr", "a.scr"])
        );
        assert!(graph.dependents(Path::new("a.scr")).is_empty());
    }

    #[test]
    fn test_traversal_terminates_on_cycles() {
        let graph = graph_of(&[
            ("a.scr", "#include \"b.scr\"\n"),
            ("b.scr", "#include \"a.scr\"\n"),
        ]);
        let deps = graph.dependencies(Path::new("a.scr"), usize::MAX);
        assert_eq!(deps, paths(&["b.scr", "a.scr"]));
    }

    // ========================================================================
    // Unused includes
    // ========================================================================

    #[test]
    fn test_unused_include_heuristic() {
        let graph = graph_of(&[
            (
                "a.scr",
                "#include \"util.scr\"\n#include \"other.scr\"\nmain:\n\tthread Spawn_Wave\nend\n",
            ),
            ("util.scr", "spawn_wave:\nend\n"),
            ("other.scr", "unrelated_thing:\nend\n"),
        ]);
        let unused: Vec<_> = graph.unused_edges().map(|e| e.raw_path.as_str()).collect();
        assert_eq!(unused, vec!["other.scr"]);
    }

    #[test]
    fn test_exec_edges_are_never_unused() {
        let graph = graph_of(&[
            ("a.scr", "main:\n\texec other.scr\nend\n"),
            ("other.scr", "unrelated_thing:\nend\n"),
        ]);
        assert_eq!(graph.unused_edges().count(), 0);
    }

    #[test]
    fn test_snapshot_serializes() {
        let graph = graph_of(&[("a.scr", "#include \"b.scr\"\n"), ("b.scr", "")]);
        let snapshot = graph.snapshot(&ScriptTable::new(Path::new(""), &paths(&["a.scr", "b.scr"])));
        assert_eq!(snapshot.nodes, vec!["a.scr", "b.scr"]);
        assert_eq!(snapshot.edges[0].to.as_deref(), Some("b.scr"));
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.contains("\"roots\":[\"a.scr\"]"));
    }
}
