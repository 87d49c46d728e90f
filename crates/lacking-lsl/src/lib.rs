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

//! # Lacking Shading Language
//!
//! A small, declarative shading description language. A shader declares the
//! textures, uniforms and varyings it needs, plus a handful of functions
//! written in a C-like expression syntax:
//!
//! ```text
//! textures {
//!   albedo sampler2D
//! }
//!
//! uniforms {
//!   color vec4
//!   intensity float
//! }
//!
//! func #fragment() {
//!   var tint vec4 = color * intensity
//!   if tint.a < 0.5 {
//!     discard
//!   }
//!   #color = tint
//! }
//! ```
//!
//! The crate only produces and checks the syntax tree. Turning it into GPU
//! program code is the job of the host's shader builder.

#![warn(missing_docs)]

pub mod ast;
pub mod error;
pub mod parser;
pub mod schema;
pub mod tokenizer;

pub use self::ast::Shader;
pub use self::error::{Error, Position};
pub use self::parser::Parser;
pub use self::schema::{validate, Schema};
pub use self::tokenizer::{Token, TokenKind, Tokenizer};

/// Parses a complete shader from source text.
///
/// # Errors
/// Returns the first tokenization or syntax error encountered.
pub fn parse(source: &str) -> Result<Shader, Error> {
    Parser::new(source).parse_shader()
}

/// Parses a complete shader from raw bytes, rejecting invalid UTF-8.
///
/// # Errors
/// Returns [`Error::InvalidEncoding`] for invalid UTF-8, otherwise behaves like [`parse`].
pub fn parse_bytes(source: &[u8]) -> Result<Shader, Error> {
    Parser::from_bytes(source).parse_shader()
}

/// Parses a shader and validates it against `schema`.
///
/// # Errors
/// Returns the first syntax or validation error encountered.
pub fn parse_and_validate(source: &str, schema: &Schema) -> Result<Shader, Error> {
    let shader = parse(source)?;
    validate(&shader, schema)?;
    Ok(shader)
}
