mod document;
mod graph;
mod helpers;
mod index;
mod types;

#[cfg(test)]
mod tests;

pub use document::{Occurrence, ScriptDocument, SymbolKey};
pub use graph::{
    DependencyGraph, GraphOptions, GraphSnapshot, IncludeEdge, ScriptGraph, SnapshotEdge,
    MAX_TRAVERSAL_DEPTH,
};
pub use helpers::{get_script_path, normalize_script_path, ScriptTable};
pub use index::{Definition, DefinitionKind, ReferenceSite, SymbolIndex, SymbolLocation};
pub use types::{
    CallSite, CrossFileRef, GotoSite, IncludeDirective, IncludeKind, Label, MyRange, Rangeable,
    ThreadDefinition, VariableBinding,
};

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use itertools::Itertools;
use once_cell::sync::OnceCell;
use rayon::prelude::*;
use ropey::Rope;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::Settings;
use crate::error::WorkspaceError;
use crate::scanner::LexemeKind;
use crate::tokens::{self, Token, TokenModifiers, TokenType};

/// The in-memory state of every tracked script.
///
/// Documents are the only source of truth. The symbol index and the dependency
/// graph are derived from them on first use and dropped by every mutation, so
/// a query always sees a snapshot consistent with the latest edit.
#[derive(Debug)]
pub struct Workspace {
    documents: HashMap<PathBuf, ScriptDocument>,
    ropes: HashMap<PathBuf, Rope>,
    root_dir: PathBuf,
    graph_options: GraphOptions,
    index: OnceCell<SymbolIndex>,
    graph: OnceCell<DependencyGraph>,
}

impl Workspace {
    /// An empty workspace rooted at `root_dir`.
    pub fn new(settings: &Settings, root_dir: &Path) -> Workspace {
        Workspace {
            documents: HashMap::new(),
            ropes: HashMap::new(),
            root_dir: root_dir.to_path_buf(),
            graph_options: settings.graph_options(),
            index: OnceCell::new(),
            graph: OnceCell::new(),
        }
    }

    /// Walk `root_dir` for `.scr` files, skipping hidden directories, and
    /// parse them in parallel.
    pub fn construct_workspace(
        settings: &Settings,
        root_dir: &Path,
    ) -> Result<Workspace, WorkspaceError> {
        if !root_dir.is_dir() {
            return Err(WorkspaceError::NotADirectory(root_dir.to_path_buf()));
        }

        let mut script_paths = Vec::new();
        let walker = WalkDir::new(root_dir).into_iter().filter_entry(|e| {
            e.depth() == 0
                || !e
                    .file_name()
                    .to_str()
                    .map(|s| s.starts_with('.'))
                    .unwrap_or(false)
        });
        for entry in walker {
            match entry {
                Ok(entry) if is_script(entry.path()) && entry.file_type().is_file() => {
                    script_paths.push(entry.into_path());
                }
                Ok(_) => {}
                Err(err) if err.depth() == 0 => {
                    return Err(WorkspaceError::Walk {
                        root: root_dir.to_path_buf(),
                        source: err,
                    });
                }
                Err(err) => warn!("skipping unreadable entry: {err}"),
            }
        }
        info!("Discovered {} script files under {}", script_paths.len(), root_dir.display());

        let loaded: Vec<(PathBuf, ScriptDocument, Rope)> = script_paths
            .par_iter()
            .filter_map(|path| match read_script(path) {
                Ok(text) => Some((path.clone(), ScriptDocument::new(path, &text), Rope::from_str(&text))),
                Err(err) => {
                    warn!("{err}");
                    None
                }
            })
            .collect();

        let mut workspace = Workspace::new(settings, root_dir);
        for (path, document, rope) in loaded {
            workspace.documents.insert(path.clone(), document);
            workspace.ropes.insert(path, rope);
        }
        info!(documents = workspace.documents.len(), "workspace indexed");
        Ok(workspace)
    }

    /// Replace (or add) the document at `path` with a fresh parse of `text`.
    pub fn upsert_document(&mut self, path: &Path, text: &str) {
        debug!(path = %path.display(), "upsert document");
        self.documents
            .insert(path.to_path_buf(), ScriptDocument::new(path, text));
        self.ropes.insert(path.to_path_buf(), Rope::from_str(text));
        self.invalidate();
    }

    /// Read `path` from disk and upsert it.
    pub fn load_document(&mut self, path: &Path) -> Result<(), WorkspaceError> {
        let text = read_script(path)?;
        self.upsert_document(path, &text);
        Ok(())
    }

    pub fn remove_document(&mut self, path: &Path) -> Option<ScriptDocument> {
        debug!(path = %path.display(), "remove document");
        self.ropes.remove(path);
        let removed = self.documents.remove(path);
        self.invalidate();
        removed
    }

    /// Drop the memoized index and graph.
    pub fn invalidate(&mut self) {
        self.index = OnceCell::new();
        self.graph = OnceCell::new();
    }

    pub fn symbol_index(&self) -> &SymbolIndex {
        self.index.get_or_init(|| {
            debug!(documents = self.documents.len(), "rebuilding symbol index");
            SymbolIndex::build(&self.root_dir, &self.documents)
        })
    }

    pub fn dependency_graph(&self) -> &DependencyGraph {
        self.graph.get_or_init(|| {
            debug!(documents = self.documents.len(), "rebuilding dependency graph");
            DependencyGraph::build(&self.root_dir, &self.documents, &self.ropes, self.graph_options)
        })
    }

    pub fn root_dir(&self) -> &PathBuf {
        &self.root_dir
    }

    pub fn document(&self, path: &Path) -> Option<&ScriptDocument> {
        self.documents.get(path)
    }

    /// Tracked documents in path order.
    pub fn documents(&self) -> impl Iterator<Item = (&PathBuf, &ScriptDocument)> {
        self.documents.iter().sorted_by(|a, b| a.0.cmp(b.0))
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    pub fn rope(&self, path: &Path) -> Option<&Rope> {
        self.ropes.get(path)
    }

    pub fn select_line(&self, path: &Path, line: usize) -> Option<String> {
        let rope = self.ropes.get(path)?;
        let line = rope.get_line(line)?;
        Some(line.chars().filter(|c| *c != '\n' && *c != '\r').collect())
    }

    /// Workspace-relative script path of a tracked file.
    pub fn script_path(&self, path: &Path) -> String {
        self.symbol_index().scripts().script_path(path)
    }

    /// Resolve a raw script path the way includes are resolved.
    pub fn resolve_script(&self, raw: &str, from: Option<&Path>) -> Option<PathBuf> {
        let scripts = self.symbol_index().scripts();
        if self.graph_options.check_filesystem {
            scripts.resolve_on_disk(raw, from)
        } else {
            scripts.resolve(raw, from).cloned()
        }
    }

    // ------------------------------------------------------------------------
    // Selection, analogous to selecting rows of a table
    // ------------------------------------------------------------------------

    /// Generic helper for selecting Vec fields from documents with optional
    /// path filtering.
    fn select_field<'a, T>(
        &'a self,
        path: Option<&'a Path>,
        extractor: impl Fn(&'a ScriptDocument) -> &'a Vec<T>,
    ) -> Vec<(&'a Path, &'a T)> {
        match path {
            Some(path) => self
                .documents
                .get(path)
                .map(|document| extractor(document))
                .map(|vec| vec.iter().map(|item| (path, item)).collect())
                .unwrap_or_default(),
            None => self
                .documents()
                .flat_map(|(path, document)| {
                    extractor(document).iter().map(|item| (path.as_path(), item))
                })
                .collect(),
        }
    }

    pub fn select_threads<'a>(&'a self, path: Option<&'a Path>) -> Vec<(&'a Path, &'a ThreadDefinition)> {
        self.select_field(path, |document| &document.threads)
    }

    pub fn select_labels<'a>(&'a self, path: Option<&'a Path>) -> Vec<(&'a Path, &'a Label)> {
        self.select_field(path, |document| &document.labels)
    }

    pub fn select_variables<'a>(
        &'a self,
        path: Option<&'a Path>,
    ) -> Vec<(&'a Path, &'a VariableBinding)> {
        self.select_field(path, |document| &document.variables)
    }

    pub fn select_includes<'a>(
        &'a self,
        path: Option<&'a Path>,
    ) -> Vec<(&'a Path, &'a IncludeDirective)> {
        self.select_field(path, |document| &document.includes)
    }

    pub fn count_threads(&self) -> usize {
        self.select_threads(None).len()
    }

    pub fn count_labels(&self) -> usize {
        self.select_labels(None).len()
    }

    // ------------------------------------------------------------------------
    // Symbol queries
    // ------------------------------------------------------------------------

    pub fn find_definition(&self, name: &str) -> Option<&Definition> {
        self.symbol_index().find_definition(name)
    }

    pub fn find_definition_from(&self, name: &str, from: &Path) -> Option<&Definition> {
        self.symbol_index().find_definition_from(name, from)
    }

    pub fn find_all_definitions(&self, name: &str) -> Vec<&Definition> {
        self.symbol_index().find_all_definitions(name)
    }

    pub fn find_references(&self, name: &str, include_definition: bool) -> Vec<&ReferenceSite> {
        self.symbol_index().find_references(name, include_definition)
    }

    pub fn reference_count(&self, name: &str, include_definition: bool) -> usize {
        self.symbol_index().reference_count(name, include_definition)
    }

    pub fn caller_count(&self, name: &str) -> usize {
        self.symbol_index().caller_count(name)
    }

    // ------------------------------------------------------------------------
    // Graph queries
    // ------------------------------------------------------------------------

    pub fn get_dependents(&self, path: &Path) -> Vec<PathBuf> {
        self.dependency_graph().dependents(path)
    }

    pub fn get_dependencies(&self, path: &Path, max_depth: usize) -> Vec<PathBuf> {
        self.dependency_graph().dependencies(path, max_depth)
    }

    pub fn graph_snapshot(&self) -> GraphSnapshot {
        self.dependency_graph()
            .snapshot(self.symbol_index().scripts())
    }

    // ------------------------------------------------------------------------
    // Tokens
    // ------------------------------------------------------------------------

    /// Classified tokens for a tracked document, with threads from the whole
    /// workspace known and never-referenced definitions marked unused.
    pub fn tokenize(&self, path: &Path) -> Option<Vec<Token>> {
        let document = self.documents.get(path)?;
        let index = self.symbol_index();
        let mut tokens = tokens::classify(document, &|name: &str| index.is_thread(name));

        for (token, lexeme) in tokens.iter_mut().zip(&document.lexemes) {
            let declares = token.modifiers.contains(TokenModifiers::DEFINITION)
                || token.modifiers.contains(TokenModifiers::WRITE);
            if !declares || token.modifiers.contains(TokenModifiers::ENTRY_POINT) {
                continue;
            }
            let name = match token.token_type {
                TokenType::Function | TokenType::Label => lexeme.text.clone(),
                TokenType::Variable => match lexeme.kind {
                    LexemeKind::Property { scope, .. } => {
                        format!("{}.{}", scope.as_str(), lexeme.text)
                    }
                    _ => continue,
                },
                _ => continue,
            };
            if token.modifiers.contains(TokenModifiers::ENGINE_CALLBACK) {
                continue;
            }
            if index.reference_count(&name, false) == 0 {
                token.modifiers |= TokenModifiers::UNUSED;
            }
        }
        Some(tokens)
    }
}

pub fn is_script(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("scr"))
}

fn read_script(path: &Path) -> Result<String, WorkspaceError> {
    std::fs::read(path)
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .map_err(|source| WorkspaceError::read(path, source))
}
