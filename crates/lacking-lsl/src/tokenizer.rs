// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Splits shader source into tokens.
//!
//! Whitespace (`' '` and `'\t'`) is skipped. Runs of `'\n'`/`'\r'` produce a
//! single [`TokenKind::NewLine`], `//` comments produce
//! [`TokenKind::Comment`], and operators are matched greedily so `>>=` is one
//! token. A byte that starts no known lexeme ends the stream.

use crate::error::Position;

/// Operators, longest first so that matching is greedy.
const OPERATORS: &[&str] = &[
    ">>=", "<<=", "==", "+=", "-=", "*=", "/=", "%=", "&=", "^=", "|=", "<<", ">>", "!=", ">=",
    "<=", "&&", "||", "(", ")", ",", "{", "}", "=", "+", "-", ".", "*", "/", "%", "^", "|", "&",
    "<", ">", "!",
];

/// The category of a [`Token`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// End of input.
    Eof,
    /// The source is not valid UTF-8. Always the only token of the stream.
    Error,
    /// One or more line breaks.
    NewLine,
    /// A `//` comment; the value is the text after the slashes.
    Comment,
    /// A name or keyword.
    Identifier,
    /// An operator or punctuation.
    Operator,
    /// An integer or decimal literal.
    Number,
}

/// A lexeme together with where it starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// The token category.
    pub kind: TokenKind,
    /// The token text.
    pub value: String,
    /// Where the token starts.
    pub position: Position,
}

impl Token {
    /// Returns `true` if this is the operator `op`.
    pub fn is_operator(&self, op: &str) -> bool {
        self.kind == TokenKind::Operator && self.value == op
    }

    /// Returns `true` if this is the identifier `name`.
    pub fn is_identifier(&self, name: &str) -> bool {
        self.kind == TokenKind::Identifier && self.value == name
    }

    /// Returns `true` for newlines and comments, which only terminate constructs.
    pub fn is_blank(&self) -> bool {
        matches!(self.kind, TokenKind::NewLine | TokenKind::Comment)
    }
}

/// Streams tokens out of shader source.
///
/// Implements [`Iterator`]; the last item is always a [`TokenKind::Eof`] or a
/// [`TokenKind::Error`] token.
#[derive(Debug, Clone)]
pub struct Tokenizer<'a> {
    source: &'a str,
    offset: usize,
    line: u32,
    column: u32,
    encoding_error: Option<Position>,
    finished: bool,
}

impl<'a> Tokenizer<'a> {
    /// Creates a tokenizer over valid UTF-8 text.
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            offset: 0,
            line: 1,
            column: 1,
            encoding_error: None,
            finished: false,
        }
    }

    /// Creates a tokenizer over raw bytes.
    ///
    /// Invalid UTF-8 anywhere in the input yields a single [`TokenKind::Error`]
    /// token and nothing else.
    pub fn from_bytes(source: &'a [u8]) -> Self {
        match std::str::from_utf8(source) {
            Ok(text) => Self::new(text),
            Err(err) => {
                let valid = &source[..err.valid_up_to()];
                let text = String::from_utf8_lossy(valid);
                let line = 1 + text.matches('\n').count() as u32;
                let column = 1 + text.rsplit('\n').next().map_or(0, |l| l.chars().count()) as u32;
                let mut tokenizer = Self::new("");
                tokenizer.encoding_error = Some(Position::new(line, column));
                tokenizer
            }
        }
    }

    /// Collects every remaining token, including the final one.
    pub fn tokenize(self) -> Vec<Token> {
        self.collect()
    }

    fn current_position(&self) -> Position {
        Position::new(self.line, self.column)
    }

    fn rest(&self) -> &'a str {
        &self.source[self.offset..]
    }

    fn bump(&mut self, bytes: usize) -> &'a str {
        let text = &self.source[self.offset..self.offset + bytes];
        for c in text.chars() {
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else if c != '\r' {
                self.column += 1;
            }
        }
        self.offset += bytes;
        text
    }

    fn token(&self, kind: TokenKind, value: &str, position: Position) -> Token {
        Token {
            kind,
            value: value.to_string(),
            position,
        }
    }

    /// Produces the next token. Returns `Eof` forever once the input is exhausted.
    pub fn next_token(&mut self) -> Token {
        if let Some(position) = self.encoding_error {
            return self.token(TokenKind::Error, "", position);
        }

        let skipped = self
            .rest()
            .bytes()
            .take_while(|b| matches!(b, b' ' | b'\t'))
            .count();
        self.bump(skipped);

        let position = self.current_position();
        let rest = self.rest();
        let Some(first) = rest.bytes().next() else {
            return self.token(TokenKind::Eof, "", position);
        };

        match first {
            b'\n' | b'\r' => {
                let len = rest
                    .bytes()
                    .take_while(|b| matches!(b, b'\n' | b'\r'))
                    .count();
                let text = self.bump(len);
                self.token(TokenKind::NewLine, text, position)
            }
            b'/' if rest.starts_with("//") => {
                let len = rest
                    .bytes()
                    .take_while(|b| !matches!(b, b'\n' | b'\r'))
                    .count();
                let text = self.bump(len);
                self.token(TokenKind::Comment, &text[2..], position)
            }
            b'A'..=b'Z' | b'a'..=b'z' | b'_' | b'#' => {
                let len = 1 + rest[1..]
                    .bytes()
                    .take_while(|b| b.is_ascii_alphanumeric() || *b == b'_')
                    .count();
                let text = self.bump(len);
                self.token(TokenKind::Identifier, text, position)
            }
            b'0'..=b'9' => {
                let integer = rest.bytes().take_while(u8::is_ascii_digit).count();
                let mut len = integer;
                let after = &rest.as_bytes()[integer..];
                if after.len() > 1 && after[0] == b'.' && after[1].is_ascii_digit() {
                    len += 1 + after[1..].iter().take_while(|b| b.is_ascii_digit()).count();
                }
                let text = self.bump(len);
                self.token(TokenKind::Number, text, position)
            }
            _ => match OPERATORS.iter().find(|op| rest.starts_with(**op)) {
                Some(op) => {
                    let text = self.bump(op.len());
                    self.token(TokenKind::Operator, text, position)
                }
                None => {
                    log::debug!("Unknown character at {position}, ending token stream.");
                    self.offset = self.source.len();
                    self.token(TokenKind::Eof, "", position)
                }
            },
        }
    }
}

impl Iterator for Tokenizer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if self.finished {
            return None;
        }
        let token = self.next_token();
        if matches!(token.kind, TokenKind::Eof | TokenKind::Error) {
            self.finished = true;
        }
        Some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds_and_values(source: &str) -> Vec<(TokenKind, String)> {
        Tokenizer::new(source)
            .map(|token| (token.kind, token.value))
            .collect()
    }

    #[test]
    fn operators_are_matched_greedily() {
        let tokens = kinds_and_values("a >>= b >> c");
        let operators: Vec<_> = tokens
            .iter()
            .filter(|(kind, _)| *kind == TokenKind::Operator)
            .map(|(_, value)| value.as_str())
            .collect();
        assert_eq!(operators, vec![">>=", ">>"]);
    }

    #[test]
    fn newline_runs_collapse_into_one_token() {
        let tokens = kinds_and_values("a\n\r\n\nb");
        assert_eq!(
            tokens,
            vec![
                (TokenKind::Identifier, "a".to_string()),
                (TokenKind::NewLine, "\n\r\n\n".to_string()),
                (TokenKind::Identifier, "b".to_string()),
                (TokenKind::Eof, String::new()),
            ]
        );
    }

    #[test]
    fn comments_keep_their_content() {
        let tokens = kinds_and_values("x // hello world\ny");
        assert_eq!(tokens[1], (TokenKind::Comment, " hello world".to_string()));
        assert_eq!(tokens[2].0, TokenKind::NewLine);
    }

    #[test]
    fn numbers_and_hash_identifiers() {
        let tokens = kinds_and_values("#fragment 12 3.25 4.");
        assert_eq!(tokens[0], (TokenKind::Identifier, "#fragment".to_string()));
        assert_eq!(tokens[1], (TokenKind::Number, "12".to_string()));
        assert_eq!(tokens[2], (TokenKind::Number, "3.25".to_string()));
        assert_eq!(tokens[3], (TokenKind::Number, "4".to_string()));
        assert_eq!(tokens[4], (TokenKind::Operator, ".".to_string()));
    }

    #[test]
    fn hash_is_only_allowed_in_first_position() {
        let tokens = kinds_and_values("a#b");
        assert_eq!(tokens[0], (TokenKind::Identifier, "a".to_string()));
        assert_eq!(tokens[1], (TokenKind::Identifier, "#b".to_string()));
    }

    #[test]
    fn unknown_bytes_end_the_stream() {
        let tokens = kinds_and_values("a @ b");
        assert_eq!(
            tokens,
            vec![
                (TokenKind::Identifier, "a".to_string()),
                (TokenKind::Eof, String::new()),
            ]
        );
    }

    #[test]
    fn invalid_utf8_yields_a_single_error_token() {
        let tokens: Vec<_> = Tokenizer::from_bytes(b"ok\n\xff\xfe").collect();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Error);
        assert_eq!(tokens[0].position, Position::new(2, 1));
    }

    #[test]
    fn positions_track_lines_and_columns() {
        let tokens: Vec<_> = Tokenizer::new("a\n  bc").collect();
        assert_eq!(tokens[0].position, Position::new(1, 1));
        assert_eq!(tokens[2].position, Position::new(2, 3));
    }

    #[test]
    fn next_token_reports_positions_and_repeats_eof() {
        let mut tokenizer = Tokenizer::new("x +
 y");
        let x = tokenizer.next_token();
        assert_eq!((x.kind, x.position), (TokenKind::Identifier, Position::new(1, 1)));
        let plus = tokenizer.next_token();
        assert_eq!((plus.kind, plus.position), (TokenKind::Operator, Position::new(1, 3)));
        assert_eq!(tokenizer.next_token().kind, TokenKind::NewLine);
        let y = tokenizer.next_token();
        assert_eq!((y.kind, y.position), (TokenKind::Identifier, Position::new(2, 2)));
        for _ in 0..2 {
            let eof = tokenizer.next_token();
            assert_eq!((eof.kind, eof.position), (TokenKind::Eof, Position::new(2, 3)));
        }
    }
}
