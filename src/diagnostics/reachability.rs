//! Unreachable statements after unconditional control transfers.
//!
//! A line whose statement is `end`, `goto`, `break` or `continue` (and is not
//! the braceless body of an `if`/`else`/`while`/`for`) makes every following
//! line of the same block dead. Reachability resumes at the next label, thread
//! boundary, `case`/`default` arm, or at the brace that closes the block.

use crate::language;
use crate::scanner::{Lexeme, LexemeKind, LineInfo};
use crate::workspace::MyRange;

use super::{DiagnosticCode, Finding, RuleContext};

/// A contiguous run of dead lines.
struct DeadRun {
    start: (u32, u32),
    end: (u32, u32),
}

struct DeadBlock {
    /// Brace depth of the terminating statement.
    depth: u32,
    terminator: String,
    run: Option<DeadRun>,
}

pub(super) fn unreachable_code(ctx: &RuleContext) -> Vec<Finding> {
    let document = ctx.document;
    let mut findings = Vec::new();
    let mut dead: Option<DeadBlock> = None;

    for (line, info) in document.lines.iter().enumerate() {
        let line = line as u32;
        let significant: Vec<&Lexeme> = document
            .line_lexemes(line)
            .filter(|lexeme| lexeme.kind.is_significant())
            .collect();
        let (Some(first), Some(last)) = (significant.first(), significant.last()) else {
            continue;
        };

        if let Some(block) = dead.as_mut() {
            if resumes(first, info, block.depth) {
                if let Some(finding) = dead.take().and_then(finish) {
                    findings.push(finding);
                }
            } else {
                // The terminator's own continuation lines are part of it.
                if !(info.continued && block.run.is_none()) {
                    let end = (line, last.end_column());
                    match block.run.as_mut() {
                        Some(run) => run.end = end,
                        None => {
                            block.run = Some(DeadRun {
                                start: (line, first.column),
                                end,
                            })
                        }
                    }
                }
                continue;
            }
        }

        if document.thread_index_at(line).is_some() && is_terminator(first, info) {
            dead = Some(DeadBlock {
                depth: info.depth,
                terminator: first.text.to_ascii_lowercase(),
                run: None,
            });
        }
    }

    if let Some(finding) = dead.and_then(finish) {
        findings.push(finding);
    }
    findings
}

fn is_terminator(first: &Lexeme, info: &LineInfo) -> bool {
    first.kind == LexemeKind::Keyword
        && language::is_flow_terminator(&first.text)
        && !info.continued
        && !info.braceless_body
}

fn resumes(first: &Lexeme, info: &LineInfo, depth: u32) -> bool {
    match first.kind {
        LexemeKind::ThreadName(_) | LexemeKind::LabelDef | LexemeKind::ThreadEnd => true,
        LexemeKind::Keyword => first.is_keyword("case") || first.is_keyword("default"),
        LexemeKind::Operator if first.is_operator("}") => info.depth <= depth,
        _ => info.depth < depth,
    }
}

fn finish(block: DeadBlock) -> Option<Finding> {
    let run = block.run?;
    Some(Finding::new(
        DiagnosticCode::UnreachableCode,
        MyRange::spanning(run.start, run.end),
        format!("Unreachable code after '{}'", block.terminator),
    ))
}
