use once_cell::sync::Lazy;
use regex::Regex;

use crate::language;
use crate::scanner::{Lexeme, LexemeKind};

use super::{DiagnosticCode, Finding, RuleContext};

static CALL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([A-Za-z_][A-Za-z0-9_]*)\s*\(").expect("call pattern is valid"));

/// `name(` where `name` is neither a keyword, an engine function nor a thread
/// or label of the workspace.
///
/// Candidates come from the raw line text; only those that start a bare word
/// lexeme count, so matches inside comments, strings, member accesses and
/// scoped properties are dropped.
pub(super) fn unknown_functions(ctx: &RuleContext) -> Vec<Finding> {
    let Some(rope) = ctx.workspace.rope(ctx.path) else {
        return Vec::new();
    };
    let index = ctx.workspace.symbol_index();
    let mut findings = Vec::new();

    let source = rope.to_string();
    for (line_number, text) in source.split('\n').enumerate() {
        let line_number = line_number as u32;
        let lexemes: Vec<&Lexeme> = ctx
            .document
            .line_lexemes(line_number)
            .filter(|lexeme| lexeme.kind.is_significant())
            .collect();

        for captures in CALL.captures_iter(text) {
            let Some(name) = captures.get(1) else {
                continue;
            };
            let column = text[..name.start()].chars().count() as u32;
            let Some(position) = lexemes
                .iter()
                .position(|lexeme| lexeme.column == column && lexeme.kind == LexemeKind::Word)
            else {
                continue;
            };
            if position > 0 && is_call_prefix(lexemes[position - 1]) {
                continue;
            }

            let name = name.as_str();
            if language::is_keyword(name)
                || language::is_scope(name)
                || language::is_builtin(name)
                || ctx.settings.is_extra_builtin(name)
                || index.is_thread(name)
                || ctx.document.has_label(name)
            {
                continue;
            }

            findings.push(Finding::new(
                DiagnosticCode::UnknownFunction,
                lexemes[position].range(),
                format!("Unknown function '{name}'"),
            ));
        }
    }
    findings
}

/// The word after these is a thread, label, or entity reference, not a call.
fn is_call_prefix(previous: &Lexeme) -> bool {
    match previous.kind {
        LexemeKind::Keyword => matches!(
            previous.text.to_ascii_lowercase().as_str(),
            "thread" | "waitthread" | "goto" | "exec" | "waitexec"
        ),
        LexemeKind::Operator => matches!(previous.text.as_str(), "$" | "." | ":" | "::" | "/"),
        _ => false,
    }
}
