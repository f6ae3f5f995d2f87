//! Structural model of a single script.

use std::path::{Path, PathBuf};

use tower_lsp::lsp_types::Position;

use crate::language::Scope;
use crate::scanner::{self, Lexeme, LexemeKind, LineInfo};

use super::types::{
    CallSite, CrossFileRef, GotoSite, IncludeDirective, IncludeKind, Label, MyRange, Rangeable,
    ThreadDefinition, VariableBinding,
};

/// How an occurrence is looked up in the symbol index.
///
/// Bare names (threads, labels) compare case-insensitively and are stored
/// lowercased. Qualified variable names compare exactly, with the scope word
/// normalized.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SymbolKey {
    Name(String),
    Scoped(String),
}

impl SymbolKey {
    pub fn bare(name: &str) -> SymbolKey {
        SymbolKey::Name(name.to_ascii_lowercase())
    }

    pub fn scoped(scope: Scope, name: &str) -> SymbolKey {
        SymbolKey::Scoped(format!("{}.{}", scope.as_str(), name))
    }

    /// `local.x` is a scoped key; anything else is a bare name.
    pub fn parse(name: &str) -> SymbolKey {
        if let Some((scope, rest)) = name.split_once('.') {
            if let Some(scope) = Scope::parse(scope) {
                if !rest.is_empty() {
                    return SymbolKey::scoped(scope, rest);
                }
            }
        }
        SymbolKey::bare(name)
    }

    pub fn as_str(&self) -> &str {
        match self {
            SymbolKey::Name(name) | SymbolKey::Scoped(name) => name,
        }
    }
}

/// A place where a name appears in code (never inside comments or strings).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Occurrence {
    pub key: SymbolKey,
    pub range: MyRange,
    pub is_definition: bool,
    pub thread_index: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptDocument {
    pub path: PathBuf,
    pub threads: Vec<ThreadDefinition>,
    pub labels: Vec<Label>,
    pub variables: Vec<VariableBinding>,
    pub includes: Vec<IncludeDirective>,
    pub calls: Vec<CallSite>,
    pub gotos: Vec<GotoSite>,
    pub cross_references: Vec<CrossFileRef>,
    pub occurrences: Vec<Occurrence>,
    pub lexemes: Vec<Lexeme>,
    pub lines: Vec<LineInfo>,
}

impl ScriptDocument {
    pub fn new(path: &Path, text: &str) -> ScriptDocument {
        let scanned = scanner::scan(text);
        let mut builder = DocumentBuilder {
            document: ScriptDocument {
                path: path.to_path_buf(),
                ..Default::default()
            },
            current: None,
        };
        for i in 0..scanned.lexemes.len() {
            builder.visit(&scanned.lexemes, i);
        }

        let mut document = builder.document;
        document.lexemes = scanned.lexemes;
        document.lines = scanned.lines;
        document
    }

    /// Thread whose body contains `line`.
    pub fn thread_index_at(&self, line: u32) -> Option<usize> {
        let index = self
            .threads
            .iter()
            .rposition(|thread| thread.line() <= line)?;
        match self.threads[index].end_line {
            Some(end) if line > end => None,
            _ => Some(index),
        }
    }

    pub fn thread_at(&self, line: u32) -> Option<&ThreadDefinition> {
        self.thread_index_at(line).map(|index| &self.threads[index])
    }

    pub fn has_thread(&self, name: &str) -> bool {
        self.threads
            .iter()
            .any(|thread| thread.name.eq_ignore_ascii_case(name))
    }

    pub fn labels_of(&self, thread_index: usize) -> impl Iterator<Item = &Label> {
        self.labels
            .iter()
            .filter(move |label| label.thread_index == thread_index)
    }

    pub fn find_label(&self, thread_index: usize, name: &str) -> Option<&Label> {
        self.labels_of(thread_index)
            .find(|label| label.name.eq_ignore_ascii_case(name))
    }

    pub fn has_label(&self, name: &str) -> bool {
        self.labels
            .iter()
            .any(|label| label.name.eq_ignore_ascii_case(name))
    }

    pub fn lexeme_at(&self, position: Position) -> Option<&Lexeme> {
        self.lexemes
            .iter()
            .filter(|lexeme| lexeme.kind.is_significant())
            .find(|lexeme| lexeme.range().includes_position(position))
    }

    /// The lexemes of one line.
    pub fn line_lexemes(&self, line: u32) -> impl Iterator<Item = &Lexeme> {
        let start = self.lexemes.partition_point(|lexeme| lexeme.line < line);
        self.lexemes[start..]
            .iter()
            .take_while(move |lexeme| lexeme.line == line)
    }

    /// Name under the cursor in the form the symbol index understands:
    /// `helper`, `local.x`, or `global/util.scr::helper`.
    pub fn symbol_at(&self, position: Position) -> Option<String> {
        let index = self
            .lexemes
            .iter()
            .position(|lexeme| {
                lexeme.kind.is_significant()
                    && lexeme.range().includes_position(position)
                    && is_symbol_lexeme(lexeme.kind)
            })?;
        let lexeme = &self.lexemes[index];
        match lexeme.kind {
            LexemeKind::Property { scope, .. } | LexemeKind::Parameter(scope) => {
                Some(format!("{}.{}", scope.as_str(), lexeme.text))
            }
            LexemeKind::ScopePrefix(scope) => {
                let name = self.lexemes.get(index + 2)?;
                Some(format!("{}.{}", scope.as_str(), name.text))
            }
            LexemeKind::CrossRefName => {
                let path = self.lexemes.get(index.checked_sub(2)?)?;
                Some(format!("{}::{}", path.text, lexeme.text))
            }
            _ => Some(lexeme.text.clone()),
        }
    }
}

fn is_symbol_lexeme(kind: LexemeKind) -> bool {
    matches!(
        kind,
        LexemeKind::ThreadName(_)
            | LexemeKind::LabelDef
            | LexemeKind::Parameter(_)
            | LexemeKind::ScopePrefix(_)
            | LexemeKind::Property { .. }
            | LexemeKind::CrossRefName
            | LexemeKind::Word
    )
}

struct DocumentBuilder {
    document: ScriptDocument,
    current: Option<usize>,
}

impl DocumentBuilder {
    fn visit(&mut self, lexemes: &[Lexeme], i: usize) {
        let lexeme = &lexemes[i];
        let document = &mut self.document;
        match lexeme.kind {
            LexemeKind::ThreadName(role) => {
                self.current = Some(document.threads.len());
                document.threads.push(ThreadDefinition {
                    name: lexeme.text.clone(),
                    parameters: Vec::new(),
                    path: document.path.clone(),
                    range: lexeme.range(),
                    role,
                    end_line: None,
                });
                self.occurrence(SymbolKey::bare(&lexeme.text), lexeme, true);
            }
            LexemeKind::Parameter(scope) => {
                if let Some(thread) = self.current {
                    document.threads[thread]
                        .parameters
                        .push(format!("{}.{}", scope.as_str(), lexeme.text));
                }
                self.occurrence(SymbolKey::scoped(scope, &lexeme.text), lexeme, true);
            }
            LexemeKind::LabelDef => {
                if let Some(thread) = self.current {
                    document.labels.push(Label {
                        name: lexeme.text.clone(),
                        path: document.path.clone(),
                        thread: document.threads[thread].name.clone(),
                        thread_index: thread,
                        range: lexeme.range(),
                    });
                }
                self.occurrence(SymbolKey::bare(&lexeme.text), lexeme, true);
            }
            LexemeKind::ThreadEnd => {
                if let Some(thread) = self.current.take() {
                    document.threads[thread].end_line = Some(lexeme.line);
                }
            }
            LexemeKind::Property { scope, write } => {
                // Writes outside a thread are plain occurrences, never bindings.
                let binding = write.then_some(self.current).flatten();
                if let Some(thread) = binding {
                    document.variables.push(VariableBinding {
                        qualified_name: format!("{}.{}", scope.as_str(), lexeme.text),
                        scope,
                        name: lexeme.text.clone(),
                        path: document.path.clone(),
                        thread_index: thread,
                        range: lexeme.range(),
                    });
                }
                self.occurrence(SymbolKey::scoped(scope, &lexeme.text), lexeme, binding.is_some());
            }
            LexemeKind::Keyword => self.keyword(lexemes, i),
            LexemeKind::Directive => {
                if let Some(target) = next_significant(lexemes, i) {
                    self.include(IncludeKind::Include, lexeme, target);
                }
            }
            LexemeKind::CrossRefName => {
                if let Some(path) = i.checked_sub(2).and_then(|p| lexemes.get(p)) {
                    self.document.cross_references.push(CrossFileRef {
                        raw_path: path.text.clone(),
                        name: lexeme.text.clone(),
                        thread_index: self.current,
                        range: lexeme.range(),
                        path_range: path.range(),
                    });
                }
                self.occurrence(SymbolKey::bare(&lexeme.text), lexeme, false);
            }
            LexemeKind::Word => {
                self.occurrence(SymbolKey::bare(&lexeme.text), lexeme, false);
            }
            _ => {}
        }
    }

    fn keyword(&mut self, lexemes: &[Lexeme], i: usize) {
        let lexeme = &lexemes[i];
        let Some(next) = next_significant(lexemes, i) else {
            return;
        };
        match lexeme.text.to_ascii_lowercase().as_str() {
            "thread" | "waitthread" if next.kind == LexemeKind::Word => {
                self.document.calls.push(CallSite {
                    name: next.text.clone(),
                    thread_index: self.current,
                    range: next.range(),
                });
            }
            "goto" if next.kind == LexemeKind::Word => {
                self.document.gotos.push(GotoSite {
                    label: next.text.clone(),
                    thread_index: self.current,
                    range: next.range(),
                });
            }
            "exec" | "waitexec" => self.include(IncludeKind::Exec, lexeme, next),
            _ => {}
        }
    }

    fn include(&mut self, kind: IncludeKind, directive: &Lexeme, target: &Lexeme) {
        let raw_path = match target.kind {
            LexemeKind::String => target.text.trim_matches('"').to_string(),
            LexemeKind::PathRef | LexemeKind::Word => target.text.clone(),
            _ => return,
        };
        if raw_path.is_empty() {
            return;
        }
        self.document.includes.push(IncludeDirective {
            kind,
            raw_path,
            range: MyRange::spanning(
                (directive.line, directive.column),
                (target.line, target.end_column()),
            ),
        });
    }

    fn occurrence(&mut self, key: SymbolKey, lexeme: &Lexeme, is_definition: bool) {
        self.document.occurrences.push(Occurrence {
            key,
            range: lexeme.range(),
            is_definition,
            thread_index: self.current,
        });
    }
}

fn next_significant(lexemes: &[Lexeme], i: usize) -> Option<&Lexeme> {
    lexemes[i + 1..]
        .iter()
        .find(|lexeme| lexeme.kind.is_significant())
}
