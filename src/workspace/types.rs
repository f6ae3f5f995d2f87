//! Core types for workspace data structures.
//!
//! This module contains the records a [`ScriptDocument`](super::ScriptDocument)
//! is made of:
//! - `MyRange`: A wrapper around LSP Range with additional utilities
//! - thread, label and variable definitions
//! - include directives, call sites and cross-file references

use std::ops::Deref;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tower_lsp::lsp_types::Position;

use crate::language::{Scope, ThreadRole};

/// A wrapper around `tower_lsp::lsp_types::Range` with additional utilities.
///
/// Columns are counted in characters, not bytes and not UTF-16 units. The two
/// only disagree after a character outside the Basic Multilingual Plane.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub struct MyRange(pub tower_lsp::lsp_types::Range);

impl MyRange {
    pub fn on_line(line: u32, start: u32, end: u32) -> MyRange {
        MyRange::spanning((line, start), (line, end))
    }

    pub fn spanning(start: (u32, u32), end: (u32, u32)) -> MyRange {
        tower_lsp::lsp_types::Range {
            start: Position {
                line: start.0,
                character: start.1,
            },
            end: Position {
                line: end.0,
                character: end.1,
            },
        }
        .into()
    }

    /// The first character of a file; used when a location is the file itself.
    pub fn file_start() -> MyRange {
        MyRange::on_line(0, 0, 1)
    }
}

impl std::hash::Hash for MyRange {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.start.line.hash(state);
        self.0.start.character.hash(state);
        self.0.end.line.hash(state);
        self.0.end.character.hash(state);
    }
}

impl Deref for MyRange {
    type Target = tower_lsp::lsp_types::Range;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<tower_lsp::lsp_types::Range> for MyRange {
    fn from(range: tower_lsp::lsp_types::Range) -> Self {
        MyRange(range)
    }
}

/// A thread declared by a column-0 header.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ThreadDefinition {
    pub name: String,
    /// Qualified parameter names, e.g. `local.origin`.
    pub parameters: Vec<String>,
    pub path: PathBuf,
    /// Range of the name in the header.
    pub range: MyRange,
    pub role: ThreadRole,
    /// Line of the terminating `end`; `None` when the thread runs to the next
    /// header or to the end of the file.
    pub end_line: Option<u32>,
}

impl ThreadDefinition {
    pub fn line(&self) -> u32 {
        self.range.start.line
    }

    pub fn column(&self) -> u32 {
        self.range.start.character
    }

    pub fn has_parameter(&self, qualified: &str) -> bool {
        self.parameters.iter().any(|param| param == qualified)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Label {
    pub name: String,
    pub path: PathBuf,
    /// Name of the owning thread.
    pub thread: String,
    /// Position of the owning thread within its document.
    pub thread_index: usize,
    pub range: MyRange,
}

/// A write to a scoped variable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct VariableBinding {
    /// `scope.name`, e.g. `level.wave_count`.
    pub qualified_name: String,
    pub scope: Scope,
    pub name: String,
    pub path: PathBuf,
    pub thread_index: usize,
    pub range: MyRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IncludeKind {
    /// `#include "path"`
    Include,
    /// `exec path` and `waitexec path`
    Exec,
}

/// An `#include` or `exec` naming another script, as written.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct IncludeDirective {
    pub kind: IncludeKind,
    pub raw_path: String,
    /// Range of the whole directive, keyword through path.
    pub range: MyRange,
}

/// `thread name` or `waitthread name` within the same workspace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CallSite {
    pub name: String,
    pub thread_index: Option<usize>,
    pub range: MyRange,
}

/// `goto label`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct GotoSite {
    pub label: String,
    pub thread_index: Option<usize>,
    pub range: MyRange,
}

/// `path/to/file.scr::thread_name`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CrossFileRef {
    pub raw_path: String,
    pub name: String,
    pub thread_index: Option<usize>,
    /// Range of the thread name.
    pub range: MyRange,
    pub path_range: MyRange,
}

/// Trait for types that have a range (position span in the document).
pub trait Rangeable {
    fn range(&self) -> &MyRange;

    /// Inclusive at both ends, so a cursor just past a word still hits it.
    fn includes_position(&self, position: Position) -> bool {
        let range = self.range();
        (range.start.line < position.line
            || (range.start.line == position.line && range.start.character <= position.character))
            && (range.end.line > position.line
                || (range.end.line == position.line && range.end.character >= position.character))
    }
}

impl Rangeable for MyRange {
    fn range(&self) -> &MyRange {
        self
    }
}

impl Rangeable for ThreadDefinition {
    fn range(&self) -> &MyRange {
        &self.range
    }
}

impl Rangeable for Label {
    fn range(&self) -> &MyRange {
        &self.range
    }
}

impl Rangeable for VariableBinding {
    fn range(&self) -> &MyRange {
        &self.range
    }
}

impl Rangeable for IncludeDirective {
    fn range(&self) -> &MyRange {
        &self.range
    }
}

impl Rangeable for CrossFileRef {
    fn range(&self) -> &MyRange {
        &self.range
    }
}
