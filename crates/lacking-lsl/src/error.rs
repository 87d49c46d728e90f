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

//! Errors reported while reading shader source.

use std::fmt;
use thiserror::Error;

/// A 1-based line and column in shader source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Position {
    /// Line number, starting at 1.
    pub line: u32,
    /// Column number in characters, starting at 1.
    pub column: u32,
}

impl Position {
    /// Creates a new position.
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// An error produced by the tokenizer, the parser or the validator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// The source is not valid UTF-8.
    #[error("{position}: shader source is not valid UTF-8")]
    InvalidEncoding {
        /// Where the first invalid byte was found.
        position: Position,
    },

    /// A token did not match what the grammar expects.
    #[error("{position}: expected {expected}, found '{found}'")]
    UnexpectedToken {
        /// Where the token starts.
        position: Position,
        /// A description of what was expected.
        expected: &'static str,
        /// The text of the offending token.
        found: String,
    },

    /// The source ended in the middle of a construct.
    #[error("{position}: unexpected end of input, expected {expected}")]
    UnexpectedEof {
        /// The end-of-input position.
        position: Position,
        /// A description of what was expected.
        expected: &'static str,
    },

    /// A numeric literal could not be converted.
    #[error("{position}: invalid number '{value}'")]
    InvalidNumber {
        /// Where the literal starts.
        position: Position,
        /// The literal text.
        value: String,
    },

    /// A block kind was declared more than once.
    #[error("{position}: only one {block} block is allowed")]
    DuplicateBlock {
        /// Where the second block starts.
        position: Position,
        /// The block keyword.
        block: &'static str,
    },

    /// A field uses a reserved name.
    #[error("{position}: field name '{name}' is reserved")]
    ReservedName {
        /// Where the field is declared.
        position: Position,
        /// The reserved name.
        name: String,
    },

    /// A field uses a type the schema does not allow in its block.
    #[error("{position}: type '{type_name}' is not allowed in {block} block")]
    UnsupportedType {
        /// Where the field is declared.
        position: Position,
        /// The block keyword.
        block: &'static str,
        /// The rejected type name.
        type_name: String,
    },
}

impl Error {
    /// Returns where the error occurred.
    pub fn position(&self) -> Position {
        match self {
            Error::InvalidEncoding { position }
            | Error::UnexpectedToken { position, .. }
            | Error::UnexpectedEof { position, .. }
            | Error::InvalidNumber { position, .. }
            | Error::DuplicateBlock { position, .. }
            | Error::ReservedName { position, .. }
            | Error::UnsupportedType { position, .. } => *position,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_display_their_position() {
        let err = Error::UnexpectedToken {
            position: Position::new(3, 7),
            expected: "'{'",
            found: ")".to_string(),
        };
        assert_eq!(err.to_string(), "3:7: expected '{', found ')'");
        assert_eq!(err.position(), Position::new(3, 7));
    }
}
