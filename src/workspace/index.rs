//! Workspace-wide symbol index.
//!
//! The index is derived purely from the current document models and is
//! rebuilt from scratch whenever any document changes. Documents are visited in
//! path order so two builds over the same documents compare equal.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

use itertools::Itertools;

use super::document::{ScriptDocument, SymbolKey};
use super::helpers::ScriptTable;
use super::types::MyRange;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DefinitionKind {
    Thread,
    Label,
    Parameter,
    Variable,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SymbolLocation {
    pub path: PathBuf,
    pub range: MyRange,
}

impl SymbolLocation {
    pub fn line(&self) -> u32 {
        self.range.start.line
    }

    pub fn column(&self) -> u32 {
        self.range.start.character
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Definition {
    /// Name as written at the definition.
    pub name: String,
    pub kind: DefinitionKind,
    pub location: SymbolLocation,
    /// Owning thread for labels, parameters and variables.
    pub thread: Option<String>,
    /// Position of the owning thread within its document. Same-named threads
    /// in one file keep distinct indices.
    pub thread_index: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReferenceSite {
    pub location: SymbolLocation,
    pub is_definition: bool,
    /// Position of the thread the occurrence sits in, if any.
    pub thread_index: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolIndex {
    definitions: BTreeMap<SymbolKey, Vec<Definition>>,
    occurrences: BTreeMap<SymbolKey, Vec<ReferenceSite>>,
    scripts: ScriptTable,
    /// Outgoing `#include`/`exec` targets per file, resolved against tracked files.
    includes: HashMap<PathBuf, Vec<PathBuf>>,
}

impl SymbolIndex {
    pub fn build(root_dir: &Path, documents: &HashMap<PathBuf, ScriptDocument>) -> SymbolIndex {
        let scripts = ScriptTable::new(root_dir, documents.keys());
        let mut index = SymbolIndex {
            scripts,
            ..Default::default()
        };

        for (path, document) in documents.iter().sorted_by(|a, b| a.0.cmp(b.0)) {
            index.add_document(path, document);
        }

        for sites in index.definitions.values_mut() {
            sites.sort_by(|a, b| {
                (&a.location.path, a.location.line(), a.location.column()).cmp(&(
                    &b.location.path,
                    b.location.line(),
                    b.location.column(),
                ))
            });
        }
        index
    }

    fn add_document(&mut self, path: &Path, document: &ScriptDocument) {
        let location = |range: MyRange| SymbolLocation {
            path: path.to_path_buf(),
            range,
        };

        for thread in &document.threads {
            self.define(
                SymbolKey::bare(&thread.name),
                Definition {
                    name: thread.name.clone(),
                    kind: DefinitionKind::Thread,
                    location: location(thread.range),
                    thread: None,
                    thread_index: None,
                },
            );
        }

        for label in &document.labels {
            self.define(
                SymbolKey::bare(&label.name),
                Definition {
                    name: label.name.clone(),
                    kind: DefinitionKind::Label,
                    location: location(label.range),
                    thread: Some(label.thread.clone()),
                    thread_index: Some(label.thread_index),
                },
            );
        }

        for occurrence in document.occurrences.iter().filter(|o| o.is_definition) {
            if let SymbolKey::Scoped(qualified) = &occurrence.key {
                let thread = occurrence
                    .thread_index
                    .and_then(|index| document.threads.get(index));
                let kind = if thread.is_some_and(|t| {
                    t.has_parameter(qualified) && t.range.start.line == occurrence.range.start.line
                }) {
                    DefinitionKind::Parameter
                } else {
                    DefinitionKind::Variable
                };
                self.define(
                    occurrence.key.clone(),
                    Definition {
                        name: qualified.clone(),
                        kind,
                        location: location(occurrence.range),
                        thread: thread.map(|t| t.name.clone()),
                        thread_index: occurrence.thread_index,
                    },
                );
            }
        }

        for occurrence in &document.occurrences {
            self.occurrences
                .entry(occurrence.key.clone())
                .or_default()
                .push(ReferenceSite {
                    location: location(occurrence.range),
                    is_definition: occurrence.is_definition,
                    thread_index: occurrence.thread_index,
                });
        }

        let targets = document
            .includes
            .iter()
            .filter_map(|include| self.scripts.resolve(&include.raw_path, Some(path)).cloned())
            .unique()
            .collect();
        self.includes.insert(path.to_path_buf(), targets);
    }

    fn define(&mut self, key: SymbolKey, definition: Definition) {
        self.definitions.entry(key).or_default().push(definition);
    }

    /// Every definition of `name`, ordered by (file, line).
    ///
    /// `path::name` restricts the search to threads of that one file.
    pub fn find_all_definitions(&self, name: &str) -> Vec<&Definition> {
        if let Some((raw_path, thread)) = name.rsplit_once("::") {
            let Some(file) = self.scripts.resolve(raw_path, None) else {
                return Vec::new();
            };
            return self
                .definitions
                .get(&SymbolKey::bare(thread))
                .into_iter()
                .flatten()
                .filter(|definition| &definition.location.path == file)
                .filter(|definition| {
                    matches!(definition.kind, DefinitionKind::Thread | DefinitionKind::Label)
                })
                .collect();
        }
        self.definitions
            .get(&SymbolKey::parse(name))
            .into_iter()
            .flatten()
            .collect()
    }

    /// The preferred definition of `name`: threads before labels before
    /// parameters before variables, then by (file, line).
    pub fn find_definition(&self, name: &str) -> Option<&Definition> {
        self.find_all_definitions(name)
            .into_iter()
            .min_by_key(|definition| definition.kind)
    }

    /// Like [`SymbolIndex::find_definition`], but prefers definitions in
    /// `from`, then in files `from` includes, then the rest of the workspace.
    pub fn find_definition_from(&self, name: &str, from: &Path) -> Option<&Definition> {
        let included: HashSet<&PathBuf> = self
            .includes
            .get(from)
            .map(|targets| targets.iter().collect())
            .unwrap_or_default();
        self.find_all_definitions(name)
            .into_iter()
            .min_by_key(|definition| {
                let proximity = if definition.location.path == from {
                    0
                } else if included.contains(&definition.location.path) {
                    1
                } else {
                    2
                };
                (proximity, definition.kind)
            })
    }

    /// All occurrences of `name` across the workspace, in (file, line) order.
    pub fn find_references(&self, name: &str, include_definition: bool) -> Vec<&ReferenceSite> {
        let key = match name.rsplit_once("::") {
            Some((_, thread)) => SymbolKey::bare(thread),
            None => SymbolKey::parse(name),
        };
        self.occurrences
            .get(&key)
            .into_iter()
            .flatten()
            .filter(|site| include_definition || !site.is_definition)
            .collect()
    }

    pub fn reference_count(&self, name: &str, include_definition: bool) -> usize {
        self.find_references(name, include_definition).len()
    }

    /// Number of distinct (file, thread) pairs that reference `name`.
    pub fn caller_count(&self, name: &str) -> usize {
        self.find_references(name, false)
            .into_iter()
            .map(|site| (&site.location.path, site.thread_index))
            .unique()
            .count()
    }

    pub fn is_thread(&self, name: &str) -> bool {
        self.find_all_definitions(name)
            .iter()
            .any(|definition| definition.kind == DefinitionKind::Thread)
    }

    pub fn threads(&self) -> impl Iterator<Item = &Definition> {
        self.definitions
            .values()
            .flatten()
            .filter(|definition| definition.kind == DefinitionKind::Thread)
    }

    pub fn definitions(&self) -> impl Iterator<Item = &Definition> {
        self.definitions.values().flatten()
    }

    pub fn scripts(&self) -> &ScriptTable {
        &self.scripts
    }
}
