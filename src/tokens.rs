//! Second tokenization pass: classify lexemes against the document model.
//!
//! Identifiers can be used before they are defined, so classification waits
//! until the whole [`ScriptDocument`] has been built. The result is a covering
//! stream of [`Token`]s that the editor adapter delta-encodes with the legend in
//! [`SemanticTokenLegend`].

use std::collections::HashSet;
use std::ops::{BitOr, BitOrAssign};

use serde::Serialize;
use tower_lsp::lsp_types::{SemanticToken, SemanticTokenModifier, SemanticTokenType};

use crate::language::{self, ThreadRole};
use crate::scanner::{Lexeme, LexemeKind};
use crate::workspace::ScriptDocument;

/// Token types in legend order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TokenType {
    Keyword,
    Function,
    Variable,
    Label,
    Parameter,
    Property,
    Namespace,
    String,
    Number,
    Comment,
    Operator,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Keyword => "keyword",
            TokenType::Function => "function",
            TokenType::Variable => "variable",
            TokenType::Label => "label",
            TokenType::Parameter => "parameter",
            TokenType::Property => "property",
            TokenType::Namespace => "namespace",
            TokenType::String => "string",
            TokenType::Number => "number",
            TokenType::Comment => "comment",
            TokenType::Operator => "operator",
        }
    }
}

/// Bit-set of token modifiers. Bit positions follow the legend order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct TokenModifiers(pub u32);

impl TokenModifiers {
    pub const NONE: TokenModifiers = TokenModifiers(0);
    pub const DECLARATION: TokenModifiers = TokenModifiers(1 << 0);
    pub const DEFINITION: TokenModifiers = TokenModifiers(1 << 1);
    pub const READ: TokenModifiers = TokenModifiers(1 << 2);
    pub const WRITE: TokenModifiers = TokenModifiers(1 << 3);
    pub const BUILTIN: TokenModifiers = TokenModifiers(1 << 4);
    pub const ENGINE_CALLBACK: TokenModifiers = TokenModifiers(1 << 5);
    pub const ENTRY_POINT: TokenModifiers = TokenModifiers(1 << 6);
    pub const UNUSED: TokenModifiers = TokenModifiers(1 << 7);

    const NAMES: [(TokenModifiers, &'static str); 8] = [
        (TokenModifiers::DECLARATION, "declaration"),
        (TokenModifiers::DEFINITION, "definition"),
        (TokenModifiers::READ, "read"),
        (TokenModifiers::WRITE, "write"),
        (TokenModifiers::BUILTIN, "builtin"),
        (TokenModifiers::ENGINE_CALLBACK, "engineCallback"),
        (TokenModifiers::ENTRY_POINT, "entryPoint"),
        (TokenModifiers::UNUSED, "unused"),
    ];

    pub fn contains(&self, other: TokenModifiers) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn names(&self) -> Vec<&'static str> {
        TokenModifiers::NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect()
    }
}

impl BitOr for TokenModifiers {
    type Output = TokenModifiers;
    fn bitor(self, rhs: TokenModifiers) -> TokenModifiers {
        TokenModifiers(self.0 | rhs.0)
    }
}

impl BitOrAssign for TokenModifiers {
    fn bitor_assign(&mut self, rhs: TokenModifiers) {
        self.0 |= rhs.0;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Token {
    pub line: u32,
    pub start_column: u32,
    pub length: u32,
    pub token_type: TokenType,
    pub modifiers: TokenModifiers,
}

/// Tokenize a standalone text. Only names defined in the text itself are
/// known, so a thread defined elsewhere in the workspace reads as a variable.
pub fn tokenize(text: &str) -> Vec<Token> {
    let document = ScriptDocument::new(std::path::Path::new(""), text);
    classify(&document, &|_: &str| false)
}

/// Classify every lexeme of `document`.
///
/// `is_known_thread` answers for threads defined outside the document;
/// threads of the document itself are always known.
pub fn classify(document: &ScriptDocument, is_known_thread: &dyn Fn(&str) -> bool) -> Vec<Token> {
    let local_threads: HashSet<String> = document
        .threads
        .iter()
        .map(|thread| thread.name.to_ascii_lowercase())
        .collect();
    let labels_by_thread: Vec<HashSet<String>> = (0..document.threads.len())
        .map(|index| {
            document
                .labels_of(index)
                .map(|label| label.name.to_ascii_lowercase())
                .collect()
        })
        .collect();
    let written: HashSet<&str> = document
        .variables
        .iter()
        .map(|binding| binding.qualified_name.as_str())
        .collect();

    let mut current: Option<usize> = None;
    let mut seen_threads = 0usize;
    let mut tokens = Vec::with_capacity(document.lexemes.len());

    for lexeme in &document.lexemes {
        let (token_type, modifiers) = match lexeme.kind {
            LexemeKind::ThreadName(role) => {
                current = Some(seen_threads);
                seen_threads += 1;
                let role_modifier = match role {
                    ThreadRole::EntryPoint => TokenModifiers::ENTRY_POINT,
                    ThreadRole::EngineCallback => TokenModifiers::ENGINE_CALLBACK,
                    ThreadRole::Plain => TokenModifiers::NONE,
                };
                (
                    TokenType::Function,
                    TokenModifiers::DECLARATION | TokenModifiers::DEFINITION | role_modifier,
                )
            }
            LexemeKind::ThreadEnd => {
                current = None;
                (TokenType::Keyword, TokenModifiers::NONE)
            }
            LexemeKind::Parameter(_) => (TokenType::Parameter, TokenModifiers::DECLARATION),
            LexemeKind::LabelDef => (TokenType::Label, TokenModifiers::DEFINITION),
            LexemeKind::Property { scope, write } => {
                let qualified = format!("{}.{}", scope.as_str(), lexeme.text);
                let access = if write {
                    TokenModifiers::WRITE
                } else {
                    TokenModifiers::READ
                };
                let is_parameter = current
                    .and_then(|index| document.threads.get(index))
                    .is_some_and(|thread| thread.has_parameter(&qualified));
                if is_parameter {
                    (TokenType::Parameter, access)
                } else if written.contains(qualified.as_str()) {
                    (TokenType::Variable, access)
                } else {
                    (TokenType::Property, access)
                }
            }
            LexemeKind::Word => classify_word(
                lexeme,
                &local_threads,
                current.and_then(|index| labels_by_thread.get(index)),
                is_known_thread,
            ),
            LexemeKind::CrossRefName => (TokenType::Function, TokenModifiers::NONE),
            LexemeKind::Member => (TokenType::Property, TokenModifiers::READ),
            LexemeKind::ScopePrefix(_) => (TokenType::Namespace, TokenModifiers::NONE),
            LexemeKind::PathRef | LexemeKind::String => (TokenType::String, TokenModifiers::NONE),
            LexemeKind::Keyword | LexemeKind::Directive => {
                (TokenType::Keyword, TokenModifiers::NONE)
            }
            LexemeKind::Number => (TokenType::Number, TokenModifiers::NONE),
            LexemeKind::Comment => (TokenType::Comment, TokenModifiers::NONE),
            LexemeKind::Operator | LexemeKind::Stray => (TokenType::Operator, TokenModifiers::NONE),
        };
        tokens.push(Token {
            line: lexeme.line,
            start_column: lexeme.column,
            length: lexeme.length,
            token_type,
            modifiers,
        });
    }
    tokens
}

fn classify_word(
    lexeme: &Lexeme,
    local_threads: &HashSet<String>,
    thread_labels: Option<&HashSet<String>>,
    is_known_thread: &dyn Fn(&str) -> bool,
) -> (TokenType, TokenModifiers) {
    let lower = lexeme.text.to_ascii_lowercase();
    if language::is_builtin(&lower) {
        (TokenType::Function, TokenModifiers::BUILTIN)
    } else if local_threads.contains(&lower) || is_known_thread(&lower) {
        (TokenType::Function, TokenModifiers::NONE)
    } else if thread_labels.is_some_and(|labels| labels.contains(&lower)) {
        (TokenType::Label, TokenModifiers::NONE)
    } else {
        (TokenType::Variable, TokenModifiers::READ)
    }
}

/// Fixed legend for the editor protocol; indices match [`TokenType`] and the
/// bit positions of [`TokenModifiers`].
pub struct SemanticTokenLegend;

impl SemanticTokenLegend {
    pub const LEGEND_TYPES: &'static [SemanticTokenType] = &[
        SemanticTokenType::KEYWORD,          // 0
        SemanticTokenType::FUNCTION,         // 1
        SemanticTokenType::VARIABLE,         // 2
        SemanticTokenType::new("label"),     // 3
        SemanticTokenType::PARAMETER,        // 4
        SemanticTokenType::PROPERTY,         // 5
        SemanticTokenType::NAMESPACE,        // 6
        SemanticTokenType::STRING,           // 7
        SemanticTokenType::NUMBER,           // 8
        SemanticTokenType::COMMENT,          // 9
        SemanticTokenType::OPERATOR,         // 10
    ];

    pub const LEGEND_MODIFIERS: &'static [SemanticTokenModifier] = &[
        SemanticTokenModifier::DECLARATION,
        SemanticTokenModifier::DEFINITION,
        SemanticTokenModifier::new("read"),
        SemanticTokenModifier::MODIFICATION,
        SemanticTokenModifier::DEFAULT_LIBRARY,
        SemanticTokenModifier::new("engineCallback"),
        SemanticTokenModifier::new("entryPoint"),
        SemanticTokenModifier::new("unused"),
    ];

    /// Delta-encode an ordered token stream.
    ///
    /// Columns and lengths stay in characters. They match the editor's UTF-16
    /// columns except on lines holding characters outside the Basic
    /// Multilingual Plane, where each such character shifts later columns by one.
    pub fn encode(tokens: &[Token]) -> Vec<SemanticToken> {
        let mut encoded = Vec::with_capacity(tokens.len());
        let mut pre_line = 0;
        let mut pre_start = 0;
        for token in tokens {
            if token.length == 0 {
                continue;
            }
            let delta_line = token.line - pre_line;
            let delta_start = if delta_line == 0 {
                token.start_column - pre_start
            } else {
                token.start_column
            };
            encoded.push(SemanticToken {
                delta_line,
                delta_start,
                length: token.length,
                token_type: token.token_type as u32,
                token_modifiers_bitset: token.modifiers.0,
            });
            pre_line = token.line;
            pre_start = token.start_column;
        }
        encoded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find<'a>(tokens: &'a [Token], text: &str, needle: &str) -> &'a Token {
        let (line, column) = text
            .lines()
            .enumerate()
            .find_map(|(line, content)| {
                content
                    .find(needle)
                    .map(|byte| (line as u32, content[..byte].chars().count() as u32))
            })
            .unwrap();
        tokens
            .iter()
            .find(|token| token.line == line && token.start_column == column)
            .unwrap()
    }

    #[test]
    fn stream_covers_every_character_at_most_once() {
        let text = "main:\n\t/* note */ local.x = \"a\" + 3 // tail\n\tthread helper `\nend\n\nhelper:\nend\n";
        let tokens = tokenize(text);

        for pair in tokens.windows(2) {
            assert!(
                (pair[0].line, pair[0].start_column + pair[0].length)
                    <= (pair[1].line, pair[1].start_column),
                "tokens must be ordered and non-overlapping: {:?}",
                pair
            );
        }

        for (line, content) in text.split('\n').enumerate() {
            for (column, c) in content.chars().enumerate() {
                let covered = tokens.iter().filter(|token| {
                    token.line == line as u32
                        && token.start_column <= column as u32
                        && (column as u32) < token.start_column + token.length
                });
                let count = covered.count();
                if c.is_whitespace() {
                    // Inside comments and strings whitespace belongs to the token.
                    assert!(count <= 1, "whitespace {:?} at {}:{} covered twice", c, line, column);
                } else {
                    assert_eq!(count, 1, "character {:?} at {}:{}", c, line, column);
                }
            }
        }
    }

    #[test]
    fn columns_count_characters_past_astral_text() {
        let tokens = tokenize("main:\n\tprintln \"\u{1F3AF}\" local.x\nend\n");
        let line: Vec<(u32, u32)> = tokens
            .iter()
            .filter(|token| token.line == 1)
            .map(|token| (token.start_column, token.length))
            .collect();
        assert_eq!(line[1], (9, 3), "the string is three characters wide");
        assert_eq!(line[2].0, 13);
    }

    #[test]
    fn identifiers_classified_after_definitions_are_known() {
        let text = "main:\n\tthread helper\n\twait 1\n\tgoto done\ndone:\nend\n\nhelper:\nend\n";
        let tokens = tokenize(text);

        let call = find(&tokens, text, "helper");
        assert_eq!(call.token_type, TokenType::Function);
        assert!(call.modifiers.is_empty());

        let wait = find(&tokens, text, "wait");
        assert_eq!(wait.token_type, TokenType::Function);
        assert!(wait.modifiers.contains(TokenModifiers::BUILTIN));

        let goto_target = find(&tokens, text, "done");
        assert_eq!(goto_target.token_type, TokenType::Label);

        let main = &tokens[0];
        assert_eq!(main.token_type, TokenType::Function);
        assert!(main.modifiers.contains(TokenModifiers::ENTRY_POINT));
        assert!(main.modifiers.contains(TokenModifiers::DEFINITION));
    }

    #[test]
    fn scoped_names_become_parameters_variables_or_properties() {
        let text = "go local.target:\n\tlocal.count = local.target\n\tprintln self.health\nend\n";
        let tokens = tokenize(text);

        let param_use = tokens
            .iter()
            .find(|token| token.line == 1 && token.token_type == TokenType::Parameter)
            .unwrap();
        assert!(param_use.modifiers.contains(TokenModifiers::READ));

        let count = tokens
            .iter()
            .find(|token| token.line == 1 && token.token_type == TokenType::Variable)
            .unwrap();
        assert!(count.modifiers.contains(TokenModifiers::WRITE));

        assert!(tokens
            .iter()
            .any(|token| token.line == 2 && token.token_type == TokenType::Property));
        assert!(tokens
            .iter()
            .any(|token| token.line == 2 && token.token_type == TokenType::Namespace));
    }

    #[test]
    fn delta_encoding() {
        let text = "main:\n\twait 1\nend";
        let encoded = SemanticTokenLegend::encode(&tokenize(text));
        // main, :, wait, 1, end
        assert_eq!(encoded.len(), 5);
        assert_eq!((encoded[1].delta_line, encoded[1].delta_start), (0, 4));
        assert_eq!((encoded[2].delta_line, encoded[2].delta_start), (1, 1));
        assert_eq!((encoded[3].delta_line, encoded[3].delta_start), (0, 5));
        assert_eq!((encoded[4].delta_line, encoded[4].delta_start), (1, 0));
        assert_eq!(encoded[2].token_type, TokenType::Function as u32);
    }

    #[test]
    fn legend_matches_enums() {
        assert_eq!(
            SemanticTokenLegend::LEGEND_TYPES.len(),
            TokenType::Operator as usize + 1
        );
        assert_eq!(
            SemanticTokenLegend::LEGEND_MODIFIERS.len(),
            TokenModifiers::NAMES.len()
        );
        assert_eq!(
            TokenModifiers(TokenModifiers::UNUSED.0 | TokenModifiers::READ.0).names(),
            vec!["read", "unused"]
        );
    }
}
