//! Static analysis of tracked scripts.
//!
//! The analyzer is stateless: every call reads the current documents, symbol
//! index and dependency graph from the [`Workspace`] and produces a fresh list
//! of findings. Rules are independent of each other; each one can be switched
//! off or given its own severity through [`Settings::rules`].

mod calls;
mod reachability;
mod rules;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tower_lsp::lsp_types::{
    Diagnostic, DiagnosticSeverity, DiagnosticTag, NumberOrString, Url,
};

use crate::config::Settings;
use crate::workspace::{MyRange, ScriptDocument, Workspace};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Information,
    Hint,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Information => "info",
            Severity::Hint => "hint",
        }
    }
}

impl From<Severity> for DiagnosticSeverity {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Error => DiagnosticSeverity::ERROR,
            Severity::Warning => DiagnosticSeverity::WARNING,
            Severity::Information => DiagnosticSeverity::INFORMATION,
            Severity::Hint => DiagnosticSeverity::HINT,
        }
    }
}

/// Stable identifiers of every rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticCode {
    UndefinedThread,
    UndefinedLabel,
    UnusedThread,
    UnusedLabel,
    UnusedVariable,
    DuplicateThread,
    UnknownFunction,
    UnreachableCode,
    CircularDependency,
    MissingInclude,
    UnusedInclude,
}

impl DiagnosticCode {
    pub const ALL: [DiagnosticCode; 11] = [
        DiagnosticCode::UndefinedThread,
        DiagnosticCode::UndefinedLabel,
        DiagnosticCode::UnusedThread,
        DiagnosticCode::UnusedLabel,
        DiagnosticCode::UnusedVariable,
        DiagnosticCode::DuplicateThread,
        DiagnosticCode::UnknownFunction,
        DiagnosticCode::UnreachableCode,
        DiagnosticCode::CircularDependency,
        DiagnosticCode::MissingInclude,
        DiagnosticCode::UnusedInclude,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticCode::UndefinedThread => "undefined-thread",
            DiagnosticCode::UndefinedLabel => "undefined-label",
            DiagnosticCode::UnusedThread => "unused-thread",
            DiagnosticCode::UnusedLabel => "unused-label",
            DiagnosticCode::UnusedVariable => "unused-variable",
            DiagnosticCode::DuplicateThread => "duplicate-thread",
            DiagnosticCode::UnknownFunction => "unknown-function",
            DiagnosticCode::UnreachableCode => "unreachable-code",
            DiagnosticCode::CircularDependency => "circular-dependency",
            DiagnosticCode::MissingInclude => "missing-include",
            DiagnosticCode::UnusedInclude => "unused-include",
        }
    }

    pub fn default_severity(&self) -> Severity {
        match self {
            DiagnosticCode::UndefinedLabel | DiagnosticCode::MissingInclude => Severity::Error,
            DiagnosticCode::UndefinedThread
            | DiagnosticCode::DuplicateThread
            | DiagnosticCode::UnknownFunction
            | DiagnosticCode::CircularDependency => Severity::Warning,
            DiagnosticCode::UnusedThread
            | DiagnosticCode::UnusedLabel
            | DiagnosticCode::UnusedVariable
            | DiagnosticCode::UnreachableCode
            | DiagnosticCode::UnusedInclude => Severity::Hint,
        }
    }

    /// Findings editors may render faded out.
    fn is_unnecessary(&self) -> bool {
        matches!(
            self,
            DiagnosticCode::UnusedThread
                | DiagnosticCode::UnusedLabel
                | DiagnosticCode::UnusedVariable
                | DiagnosticCode::UnreachableCode
                | DiagnosticCode::UnusedInclude
        )
    }
}

impl std::fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScriptDiagnostic {
    pub code: DiagnosticCode,
    pub severity: Severity,
    pub message: String,
    pub range: MyRange,
}

impl ScriptDiagnostic {
    pub fn line(&self) -> u32 {
        self.range.start.line
    }
}

impl From<ScriptDiagnostic> for Diagnostic {
    fn from(diagnostic: ScriptDiagnostic) -> Self {
        Diagnostic {
            range: *diagnostic.range,
            severity: Some(diagnostic.severity.into()),
            code: Some(NumberOrString::String(diagnostic.code.as_str().into())),
            source: Some("morpheus".into()),
            message: diagnostic.message,
            tags: diagnostic
                .code
                .is_unnecessary()
                .then(|| vec![DiagnosticTag::UNNECESSARY]),
            ..Default::default()
        }
    }
}

/// A finding before settings decide whether and how loudly it is reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Finding {
    pub code: DiagnosticCode,
    pub range: MyRange,
    pub message: String,
}

impl Finding {
    pub fn new(code: DiagnosticCode, range: MyRange, message: impl Into<String>) -> Finding {
        Finding {
            code,
            range,
            message: message.into(),
        }
    }
}

/// What every rule gets to look at.
pub(crate) struct RuleContext<'a> {
    pub workspace: &'a Workspace,
    pub settings: &'a Settings,
    pub path: &'a Path,
    pub document: &'a ScriptDocument,
}

type Rule = fn(&RuleContext) -> Vec<Finding>;

const RULES: &[(DiagnosticCode, Rule)] = &[
    (DiagnosticCode::UndefinedThread, rules::undefined_threads),
    (DiagnosticCode::UndefinedLabel, rules::undefined_labels),
    (DiagnosticCode::UnusedThread, rules::unused_threads),
    (DiagnosticCode::UnusedLabel, rules::unused_labels),
    (DiagnosticCode::UnusedVariable, rules::unused_variables),
    (DiagnosticCode::DuplicateThread, rules::duplicate_threads),
    (DiagnosticCode::UnknownFunction, calls::unknown_functions),
    (DiagnosticCode::UnreachableCode, reachability::unreachable_code),
    (DiagnosticCode::CircularDependency, rules::circular_dependencies),
    (DiagnosticCode::MissingInclude, rules::missing_includes),
    (DiagnosticCode::UnusedInclude, rules::unused_includes),
];

/// Run every enabled rule over one tracked document. `None` when the file is
/// not tracked.
pub fn analyze(
    workspace: &Workspace,
    settings: &Settings,
    path: &Path,
) -> Option<Vec<ScriptDiagnostic>> {
    let document = workspace.document(path)?;
    let context = RuleContext {
        workspace,
        settings,
        path,
        document,
    };

    let mut diagnostics: Vec<ScriptDiagnostic> = RULES
        .iter()
        .filter_map(|(code, rule)| Some((settings.rule(*code)?, rule)))
        .flat_map(|(severity, rule)| {
            rule(&context)
                .into_iter()
                .map(move |finding| ScriptDiagnostic {
                    code: finding.code,
                    severity,
                    message: finding.message,
                    range: finding.range,
                })
        })
        .collect();

    diagnostics.sort_by_key(|diagnostic| {
        (
            diagnostic.range.start.line,
            diagnostic.range.start.character,
            diagnostic.code,
        )
    });
    Some(diagnostics)
}

/// Editor-protocol diagnostics for one file.
pub fn diagnostics(
    workspace: &Workspace,
    settings: &Settings,
    (path, _uri): (&PathBuf, &Url),
) -> Option<Vec<Diagnostic>> {
    let diagnostics = analyze(workspace, settings, path)?;
    Some(diagnostics.into_iter().map(Diagnostic::from).collect())
}
