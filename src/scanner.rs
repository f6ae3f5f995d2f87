//! Line-oriented scanner for Morpheus scripts.
//!
//! The scanner is the first of two tokenization passes. It walks each line left
//! to right and tries a fixed, ordered table of matchers at every position; the
//! first matcher that succeeds wins. The only state carried from one line to the
//! next is:
//!
//! - whether a `/* ... */` comment is still open,
//! - whether a thread is open (header seen, terminating `end` not yet seen),
//! - the brace depth inside the open thread,
//! - whether the previous statement was a braceless `if`/`else`/`while`/`for`
//!   header, and whether the previous line ended with a `\` continuation.
//!
//! The output is a flat list of [`Lexeme`]s carrying structural roles (thread
//! header name, label definition, scoped property, path reference, ...) plus one
//! [`LineInfo`] per line. Identifier classification that depends on forward
//! references happens later, in [`crate::tokens`], once the
//! [`ScriptDocument`](crate::workspace::ScriptDocument) has been assembled.
//!
//! Every matcher either consumes at least one character or declines, and the
//! fallback consumes exactly one character, so scanning always terminates and
//! covers every non-whitespace character.

use serde::Serialize;

use crate::language::{self, Scope, ThreadRole};
use crate::workspace::MyRange;

/// Structural role of a lexeme as decided by the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LexemeKind {
    Comment,
    String,
    Number,
    /// Name in a column-0 thread header.
    ThreadName(ThreadRole),
    /// Parameter name inside a thread header (`local.a` contributes `a`).
    Parameter(Scope),
    LabelDef,
    Keyword,
    /// An `end` statement that closes the open thread.
    ThreadEnd,
    /// `#include`
    Directive,
    ScopePrefix(Scope),
    /// `.name` directly after a scope prefix.
    Property { scope: Scope, write: bool },
    /// `.name` after anything else (`local.ent.origin`, `$player.health`).
    Member,
    /// A script path such as `global/spawner.scr`.
    PathRef,
    /// The thread name in `path::name`.
    CrossRefName,
    Word,
    Operator,
    /// A character no matcher accepted.
    Stray,
}

impl LexemeKind {
    pub fn is_significant(&self) -> bool {
        !matches!(self, LexemeKind::Comment)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Lexeme {
    pub line: u32,
    pub column: u32,
    pub length: u32,
    pub kind: LexemeKind,
    pub text: String,
}

impl Lexeme {
    pub fn end_column(&self) -> u32 {
        self.column + self.length
    }

    pub fn range(&self) -> MyRange {
        MyRange::on_line(self.line, self.column, self.end_column())
    }

    pub fn is_operator(&self, op: &str) -> bool {
        self.kind == LexemeKind::Operator && self.text == op
    }

    pub fn is_keyword(&self, word: &str) -> bool {
        matches!(self.kind, LexemeKind::Keyword | LexemeKind::ThreadEnd)
            && self.text.eq_ignore_ascii_case(word)
    }
}

/// Per-line facts the reachability analysis needs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct LineInfo {
    /// Brace depth inside the open thread when the line starts.
    pub depth: u32,
    /// The line continues the statement of the previous line.
    pub continued: bool,
    /// The statement on this line is the body of a braceless control header.
    pub braceless_body: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanOutput {
    pub lexemes: Vec<Lexeme>,
    pub lines: Vec<LineInfo>,
}

/// Scan a whole document.
pub fn scan(text: &str) -> ScanOutput {
    let mut scanner = Scanner::default();
    for (number, line) in text.split('\n').enumerate() {
        let chars: Vec<char> = line.chars().collect();
        scanner.scan_line(number as u32, &chars);
    }
    ScanOutput {
        lexemes: scanner.lexemes,
        lines: scanner.lines,
    }
}

#[derive(Debug, Default)]
struct ScanState {
    in_block_comment: bool,
    thread_open: bool,
    depth: u32,
    /// The last completed statement was a braceless control header.
    braceless_pending: bool,
    /// The previous line ended with `\`.
    continued: bool,
}

/// Bookkeeping for the statement currently being scanned, which may span
/// several lines through continuations.
#[derive(Debug, Default)]
struct Statement {
    head: Option<String>,
    opened_brace: bool,
}

#[derive(Debug, Default)]
struct Scanner {
    state: ScanState,
    statement: Statement,
    lexemes: Vec<Lexeme>,
    lines: Vec<LineInfo>,
    line_start: usize,
    line_info: LineInfo,
}

struct Cursor<'l> {
    chars: &'l [char],
    pos: usize,
    line: u32,
}

impl Cursor<'_> {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn starts_with(&self, pattern: &str) -> bool {
        let mut i = self.pos;
        for c in pattern.chars() {
            if self.chars.get(i) != Some(&c) {
                return false;
            }
            i += 1;
        }
        true
    }

    fn word_end(&self, from: usize) -> usize {
        let mut end = from;
        while end < self.chars.len() && language::is_identifier_char(self.chars[end]) {
            end += 1;
        }
        end
    }

    fn skip_whitespace(&self, from: usize) -> usize {
        let mut i = from;
        while i < self.chars.len() && self.chars[i].is_whitespace() {
            i += 1;
        }
        i
    }

    /// True when nothing but whitespace or a comment opener follows `from`.
    fn rest_is_trailer(&self, from: usize) -> bool {
        let i = self.skip_whitespace(from);
        i >= self.chars.len()
            || (self.chars[i] == '/' && matches!(self.chars.get(i + 1), Some('/') | Some('*')))
    }

    fn slice(&self, start: usize, end: usize) -> String {
        self.chars[start..end].iter().collect()
    }
}

type Matcher = fn(&mut Scanner, &mut Cursor) -> bool;

/// Matchers in precedence order.
const MATCHERS: &[Matcher] = &[
    Scanner::block_comment_continuation,
    Scanner::line_comment,
    Scanner::block_comment_start,
    Scanner::string_literal,
    Scanner::number_literal,
    Scanner::thread_header,
    Scanner::label_definition,
    Scanner::keyword,
    Scanner::scope_prefix,
    Scanner::scoped_property,
    Scanner::path_reference,
    Scanner::identifier,
    Scanner::operator,
];

const MULTI_CHAR_OPERATORS: &[&str] = &[
    "::", "==", "!=", "<=", ">=", "&&", "||", "++", "--", "+=", "-=", "*=", "/=",
];

const SINGLE_CHAR_OPERATORS: &str = "+-*/%=<>!&|^~()[]{},;:.$@?#\\";

const ASSIGNMENT_OPERATORS: &[&str] = &["+=", "-=", "*=", "/=", "++", "--"];

impl Scanner {
    fn scan_line(&mut self, line: u32, chars: &[char]) {
        self.line_start = self.lexemes.len();
        self.line_info = LineInfo {
            depth: self.state.depth,
            continued: self.state.continued,
            braceless_body: !self.state.continued && self.state.braceless_pending,
        };

        let mut cursor = Cursor {
            chars,
            pos: 0,
            line,
        };
        while cursor.pos < chars.len() {
            if chars[cursor.pos].is_whitespace() {
                cursor.pos += 1;
                continue;
            }
            let before = cursor.pos;
            let matched = MATCHERS.iter().any(|matcher| matcher(self, &mut cursor));
            if !matched || cursor.pos == before {
                self.push(&cursor, before, before + 1, LexemeKind::Stray);
                cursor.pos = before + 1;
            }
        }

        self.finish_line();
    }

    fn push(&mut self, cursor: &Cursor, start: usize, end: usize, kind: LexemeKind) {
        self.lexemes.push(Lexeme {
            line: cursor.line,
            column: start as u32,
            length: (end - start) as u32,
            kind,
            text: cursor.slice(start, end),
        });
    }

    fn line_lexemes(&self) -> &[Lexeme] {
        &self.lexemes[self.line_start..]
    }

    /// No significant lexeme yet on this line, and the line does not continue
    /// the previous statement.
    fn at_statement_start(&self) -> bool {
        !self.state.continued
            && !self
                .line_lexemes()
                .iter()
                .any(|lexeme| lexeme.kind.is_significant())
    }

    fn previous_on_line(&self) -> Option<&Lexeme> {
        self.line_lexemes().last()
    }

    /// The previous significant lexeme is `exec`, `waitexec` or `#include`.
    fn expects_script_path(&self) -> bool {
        self.line_lexemes()
            .iter()
            .rev()
            .find(|lexeme| lexeme.kind.is_significant())
            .is_some_and(|lexeme| {
                lexeme.kind == LexemeKind::Directive
                    || lexeme.is_keyword("exec")
                    || lexeme.is_keyword("waitexec")
            })
    }

    fn finish_line(&mut self) {
        let significant: Vec<&Lexeme> = self.lexemes[self.line_start..]
            .iter()
            .filter(|lexeme| lexeme.kind.is_significant())
            .collect();

        if significant.is_empty() {
            // Blank and comment-only lines neither start nor end statements.
            self.state.continued = false;
            self.lines.push(self.line_info);
            return;
        }

        if !self.state.continued {
            self.statement = Statement {
                head: significant
                    .first()
                    .filter(|lexeme| lexeme.kind == LexemeKind::Keyword)
                    .map(|lexeme| lexeme.text.to_ascii_lowercase()),
                opened_brace: false,
            };
        }
        if significant.iter().any(|lexeme| lexeme.is_operator("{")) {
            self.statement.opened_brace = true;
        }

        let ends_with_continuation = significant
            .last()
            .is_some_and(|lexeme| lexeme.is_operator("\\"));

        self.state.continued = ends_with_continuation;
        if !ends_with_continuation {
            self.state.braceless_pending = self.statement_is_braceless_header(&significant);
        }
        self.lines.push(self.line_info);
    }

    /// `if (cond)`, `while (cond)`, `for (...)` or `else` with nothing after the
    /// header, so the body is the next statement.
    fn statement_is_braceless_header(&self, significant: &[&Lexeme]) -> bool {
        let Some(head) = self.statement.head.as_deref() else {
            return false;
        };
        if !language::is_control_header(head) || self.statement.opened_brace {
            return false;
        }
        let Some(last) = significant.last() else {
            return false;
        };
        if head == "else" && last.is_keyword("else") {
            return true;
        }

        // The parenthesis closing the condition must end the line.
        let mut depth = 0usize;
        let mut closed_at = None;
        for (i, lexeme) in significant.iter().enumerate() {
            if lexeme.is_operator("(") {
                depth += 1;
            } else if lexeme.is_operator(")") && depth > 0 {
                depth -= 1;
                if depth == 0 {
                    closed_at = Some(i);
                    break;
                }
            }
        }
        closed_at == Some(significant.len() - 1)
    }

    // ------------------------------------------------------------------------
    // Matchers
    // ------------------------------------------------------------------------

    fn block_comment_continuation(&mut self, cursor: &mut Cursor) -> bool {
        if !self.state.in_block_comment {
            return false;
        }
        let start = cursor.pos;
        let mut i = start;
        let mut closed = false;
        while i < cursor.chars.len() {
            if cursor.chars[i] == '*' && cursor.chars.get(i + 1) == Some(&'/') {
                i += 2;
                closed = true;
                break;
            }
            i += 1;
        }
        if closed {
            self.state.in_block_comment = false;
        }
        let end = if closed { i } else { trim_end(cursor.chars, start, i) };
        if end > start {
            self.push(cursor, start, end, LexemeKind::Comment);
        }
        cursor.pos = i.max(start + 1);
        true
    }

    fn line_comment(&mut self, cursor: &mut Cursor) -> bool {
        if !cursor.starts_with("//") {
            return false;
        }
        let end = trim_end(cursor.chars, cursor.pos, cursor.chars.len());
        self.push(cursor, cursor.pos, end, LexemeKind::Comment);
        cursor.pos = cursor.chars.len();
        true
    }

    fn block_comment_start(&mut self, cursor: &mut Cursor) -> bool {
        if !cursor.starts_with("/*") {
            return false;
        }
        let start = cursor.pos;
        let mut i = start + 2;
        while i < cursor.chars.len() {
            if cursor.chars[i] == '*' && cursor.chars.get(i + 1) == Some(&'/') {
                self.push(cursor, start, i + 2, LexemeKind::Comment);
                cursor.pos = i + 2;
                return true;
            }
            i += 1;
        }
        let end = trim_end(cursor.chars, start, cursor.chars.len());
        self.push(cursor, start, end, LexemeKind::Comment);
        self.state.in_block_comment = true;
        cursor.pos = cursor.chars.len();
        true
    }

    fn string_literal(&mut self, cursor: &mut Cursor) -> bool {
        if cursor.peek() != Some('"') {
            return false;
        }
        let start = cursor.pos;
        let mut i = start + 1;
        while i < cursor.chars.len() {
            match cursor.chars[i] {
                '\\' => i += 2,
                '"' => {
                    i += 1;
                    break;
                }
                _ => i += 1,
            }
        }
        let end = i.min(cursor.chars.len());
        self.push(cursor, start, end, LexemeKind::String);
        cursor.pos = end;
        true
    }

    fn number_literal(&mut self, cursor: &mut Cursor) -> bool {
        if !cursor.peek().is_some_and(|c| c.is_ascii_digit()) {
            return false;
        }
        let start = cursor.pos;
        let mut i = start;
        while i < cursor.chars.len() && cursor.chars[i].is_ascii_digit() {
            i += 1;
        }
        if cursor.chars.get(i) == Some(&'.')
            && cursor.chars.get(i + 1).is_some_and(|c| c.is_ascii_digit())
        {
            i += 1;
            while i < cursor.chars.len() && cursor.chars[i].is_ascii_digit() {
                i += 1;
            }
        }
        self.push(cursor, start, i, LexemeKind::Number);
        cursor.pos = i;
        true
    }

    fn thread_header(&mut self, cursor: &mut Cursor) -> bool {
        if cursor.pos != 0
            || self.state.continued
            || !cursor.peek().is_some_and(language::is_identifier_start)
        {
            return false;
        }
        let Some(header) = parse_header(cursor) else {
            return false;
        };
        let name = cursor.slice(header.name.0, header.name.1);
        if language::is_keyword(&name) || language::is_scope(&name) {
            return false;
        }

        if self.state.thread_open && header.parts.is_empty() {
            // A bare `name:` at column 0 inside an open thread is one of its labels.
            self.push(cursor, header.name.0, header.name.1, LexemeKind::LabelDef);
            self.push(cursor, header.colon, header.colon + 1, LexemeKind::Operator);
            cursor.pos = header.colon + 1;
            return true;
        }

        self.push(
            cursor,
            header.name.0,
            header.name.1,
            LexemeKind::ThreadName(ThreadRole::of(&name)),
        );
        for part in &header.parts {
            match *part {
                HeaderPart::Punctuation(at) => {
                    self.push(cursor, at, at + 1, LexemeKind::Operator);
                }
                HeaderPart::Parameter {
                    scope,
                    scope_start,
                    dot,
                    name_end,
                } => {
                    self.push(cursor, scope_start, dot, LexemeKind::ScopePrefix(scope));
                    self.push(cursor, dot, dot + 1, LexemeKind::Operator);
                    self.push(cursor, dot + 1, name_end, LexemeKind::Parameter(scope));
                }
            }
        }
        self.push(cursor, header.colon, header.colon + 1, LexemeKind::Operator);

        self.state.thread_open = true;
        self.state.depth = 0;
        self.state.braceless_pending = false;
        cursor.pos = header.colon + 1;
        true
    }

    fn label_definition(&mut self, cursor: &mut Cursor) -> bool {
        if cursor.pos == 0
            || !self.state.thread_open
            || !self.at_statement_start()
            || !cursor.peek().is_some_and(language::is_identifier_start)
        {
            return false;
        }
        let end = cursor.word_end(cursor.pos);
        let colon = cursor.skip_whitespace(end);
        if cursor.chars.get(colon) != Some(&':') || cursor.chars.get(colon + 1) == Some(&':') {
            return false;
        }
        if !cursor.rest_is_trailer(colon + 1) {
            return false;
        }
        let name = cursor.slice(cursor.pos, end);
        if language::is_keyword(&name) {
            return false;
        }
        self.push(cursor, cursor.pos, end, LexemeKind::LabelDef);
        self.push(cursor, colon, colon + 1, LexemeKind::Operator);
        cursor.pos = colon + 1;
        true
    }

    fn keyword(&mut self, cursor: &mut Cursor) -> bool {
        if cursor.peek() == Some('#') {
            let end = cursor.word_end(cursor.pos + 1);
            if cursor.slice(cursor.pos + 1, end).eq_ignore_ascii_case("include") {
                self.push(cursor, cursor.pos, end, LexemeKind::Directive);
                cursor.pos = end;
                return true;
            }
            return false;
        }
        if !cursor.peek().is_some_and(language::is_identifier_start) {
            return false;
        }
        let end = cursor.word_end(cursor.pos);
        let word = cursor.slice(cursor.pos, end);
        if !language::is_keyword(&word)
            || path_ahead(cursor, cursor.pos, self.expects_script_path()).is_some()
        {
            return false;
        }

        let kind = if word.eq_ignore_ascii_case("end")
            && self.state.thread_open
            && self.state.depth == 0
            && self.at_statement_start()
            && !self.state.braceless_pending
        {
            self.state.thread_open = false;
            LexemeKind::ThreadEnd
        } else {
            LexemeKind::Keyword
        };
        self.push(cursor, cursor.pos, end, kind);
        cursor.pos = end;
        true
    }

    fn scope_prefix(&mut self, cursor: &mut Cursor) -> bool {
        if !cursor.peek().is_some_and(language::is_identifier_start) {
            return false;
        }
        let end = cursor.word_end(cursor.pos);
        let Some(scope) = Scope::parse(&cursor.slice(cursor.pos, end)) else {
            return false;
        };
        if cursor.chars.get(end) != Some(&'.')
            || !cursor
                .chars
                .get(end + 1)
                .is_some_and(|c| language::is_identifier_start(*c))
        {
            return false;
        }
        self.push(cursor, cursor.pos, end, LexemeKind::ScopePrefix(scope));
        cursor.pos = end;
        true
    }

    fn scoped_property(&mut self, cursor: &mut Cursor) -> bool {
        if cursor.peek() != Some('.')
            || !cursor.peek_at(1).is_some_and(language::is_identifier_start)
        {
            return false;
        }
        let Some(previous) = self.previous_on_line() else {
            return false;
        };
        if previous.end_column() as usize != cursor.pos {
            return false;
        }
        let kind = match previous.kind {
            LexemeKind::ScopePrefix(scope) => {
                let name_end = cursor.word_end(cursor.pos + 1);
                LexemeKind::Property {
                    scope,
                    write: is_assignment_target(cursor, name_end),
                }
            }
            LexemeKind::Property { .. }
            | LexemeKind::Member
            | LexemeKind::Parameter(_)
            | LexemeKind::Word => LexemeKind::Member,
            LexemeKind::Operator if previous.text == "]" || previous.text == ")" => {
                LexemeKind::Member
            }
            _ => return false,
        };
        let dot = cursor.pos;
        let name_end = cursor.word_end(dot + 1);
        self.push(cursor, dot, dot + 1, LexemeKind::Operator);
        self.push(cursor, dot + 1, name_end, kind);
        cursor.pos = name_end;
        true
    }

    fn path_reference(&mut self, cursor: &mut Cursor) -> bool {
        let Some(end) = path_ahead(cursor, cursor.pos, self.expects_script_path()) else {
            return false;
        };
        self.push(cursor, cursor.pos, end, LexemeKind::PathRef);
        cursor.pos = end;

        if cursor.starts_with("::") {
            let name_start = cursor.pos + 2;
            self.push(cursor, cursor.pos, name_start, LexemeKind::Operator);
            cursor.pos = name_start;
            if cursor.peek().is_some_and(language::is_identifier_start) {
                let name_end = cursor.word_end(name_start);
                self.push(cursor, name_start, name_end, LexemeKind::CrossRefName);
                cursor.pos = name_end;
            }
        }
        true
    }

    fn identifier(&mut self, cursor: &mut Cursor) -> bool {
        if !cursor.peek().is_some_and(language::is_identifier_start) {
            return false;
        }
        let end = cursor.word_end(cursor.pos);
        self.push(cursor, cursor.pos, end, LexemeKind::Word);
        cursor.pos = end;
        true
    }

    fn operator(&mut self, cursor: &mut Cursor) -> bool {
        let start = cursor.pos;
        let end = if let Some(op) = MULTI_CHAR_OPERATORS
            .iter()
            .find(|op| cursor.starts_with(op))
        {
            start + op.chars().count()
        } else if cursor
            .peek()
            .is_some_and(|c| SINGLE_CHAR_OPERATORS.contains(c))
        {
            start + 1
        } else {
            return false;
        };

        match cursor.chars[start] {
            '{' if end == start + 1 => self.state.depth += 1,
            '}' if end == start + 1 => self.state.depth = self.state.depth.saturating_sub(1),
            _ => {}
        }
        self.push(cursor, start, end, LexemeKind::Operator);
        cursor.pos = end;
        true
    }
}

fn trim_end(chars: &[char], start: usize, end: usize) -> usize {
    let mut end = end;
    while end > start && chars[end - 1].is_whitespace() {
        end -= 1;
    }
    end
}

/// The extent of a script path starting at `from`, if one starts there.
///
/// A run of path characters counts as a path when it ends in `.scr` or is
/// immediately followed by `::`. Right after `exec`, `waitexec` or
/// `#include` any run containing a directory separator counts too, so
/// `count/2` elsewhere stays a division.
fn path_ahead(cursor: &Cursor, from: usize, after_exec: bool) -> Option<usize> {
    let first = *cursor.chars.get(from)?;
    if !(language::is_identifier_start(first) || first == '.') {
        return None;
    }
    let mut end = from;
    while end < cursor.chars.len() && language::is_path_char(cursor.chars[end]) {
        end += 1;
    }
    let candidate: String = cursor.chars[from..end].iter().collect();
    if !candidate.chars().any(language::is_identifier_char) {
        return None;
    }
    let followed_by_scope_operator =
        cursor.chars.get(end) == Some(&':') && cursor.chars.get(end + 1) == Some(&':');
    let names_script = candidate.to_ascii_lowercase().ends_with(".scr");
    let exec_target = after_exec && (candidate.contains('/') || candidate.contains('\\'));
    (names_script || followed_by_scope_operator || exec_target).then_some(end)
}

/// Whether the property ending at `name_end` is assigned to, skipping array
/// subscripts: `local.x = 1`, `local.x[2] += 3`, `level.count++`.
fn is_assignment_target(cursor: &Cursor, name_end: usize) -> bool {
    let mut i = cursor.skip_whitespace(name_end);
    while cursor.chars.get(i) == Some(&'[') {
        let mut depth = 0usize;
        while i < cursor.chars.len() {
            match cursor.chars[i] {
                '[' => depth += 1,
                ']' => {
                    depth -= 1;
                    if depth == 0 {
                        i += 1;
                        break;
                    }
                }
                _ => {}
            }
            i += 1;
        }
        if depth > 0 {
            return false;
        }
        i = cursor.skip_whitespace(i);
    }
    match (cursor.chars.get(i), cursor.chars.get(i + 1)) {
        (Some('='), next) => next != Some(&'='),
        (Some(a), Some(b)) => {
            let pair: String = [*a, *b].iter().collect();
            ASSIGNMENT_OPERATORS.contains(&pair.as_str())
        }
        _ => false,
    }
}

#[derive(Debug)]
enum HeaderPart {
    Punctuation(usize),
    Parameter {
        scope: Scope,
        scope_start: usize,
        dot: usize,
        name_end: usize,
    },
}

#[derive(Debug)]
struct Header {
    name: (usize, usize),
    parts: Vec<HeaderPart>,
    colon: usize,
}

/// Parse `name:`, `name local.a local.b:` or `name (local.a, local.b):` at the
/// start of a line. Anything else is not a header.
fn parse_header(cursor: &Cursor) -> Option<Header> {
    let chars = cursor.chars;
    let name_end = cursor.word_end(0);
    let mut parts = Vec::new();
    let mut i = cursor.skip_whitespace(name_end);

    let parenthesized = chars.get(i) == Some(&'(');
    if parenthesized {
        parts.push(HeaderPart::Punctuation(i));
        i += 1;
    }

    loop {
        i = cursor.skip_whitespace(i);
        match chars.get(i) {
            Some(',') if parenthesized => {
                parts.push(HeaderPart::Punctuation(i));
                i += 1;
            }
            Some(')') if parenthesized => {
                parts.push(HeaderPart::Punctuation(i));
                i += 1;
                break;
            }
            Some(c) if language::is_identifier_start(*c) => {
                let scope_end = cursor.word_end(i);
                let scope = Scope::parse(&cursor.slice(i, scope_end))?;
                if chars.get(scope_end) != Some(&'.') {
                    return None;
                }
                if !chars
                    .get(scope_end + 1)
                    .is_some_and(|c| language::is_identifier_start(*c))
                {
                    return None;
                }
                let param_end = cursor.word_end(scope_end + 1);
                parts.push(HeaderPart::Parameter {
                    scope,
                    scope_start: i,
                    dot: scope_end,
                    name_end: param_end,
                });
                i = param_end;
            }
            _ if parenthesized => return None,
            _ => break,
        }
    }

    let colon = cursor.skip_whitespace(i);
    if chars.get(colon) != Some(&':') || chars.get(colon + 1) == Some(&':') {
        return None;
    }
    if !cursor.rest_is_trailer(colon + 1) {
        return None;
    }

    Some(Header {
        name: (0, name_end),
        parts,
        colon,
    })
}
