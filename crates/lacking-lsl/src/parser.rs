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

//! Recursive descent parser producing a [`Shader`].
//!
//! Newlines and comments only terminate constructs: they are skipped between
//! declarations, between statements and inside field lists, but they end an
//! expression.

use crate::ast::*;
use crate::error::{Error, Position};
use crate::tokenizer::{Token, TokenKind, Tokenizer};

/// Parses a token stream into a syntax tree.
#[derive(Debug, Clone)]
pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
}

type Result<T> = std::result::Result<T, Error>;

impl Parser {
    /// Creates a parser over UTF-8 source text.
    pub fn new(source: &str) -> Self {
        Self::from_tokens(Tokenizer::new(source).tokenize())
    }

    /// Creates a parser over raw bytes.
    pub fn from_bytes(source: &[u8]) -> Self {
        Self::from_tokens(Tokenizer::from_bytes(source).tokenize())
    }

    /// Creates a parser over an already tokenized stream.
    pub fn from_tokens(tokens: Vec<Token>) -> Self {
        Self { tokens, current: 0 }
    }

    /// Parses the whole stream as a shader.
    pub fn parse_shader(&mut self) -> Result<Shader> {
        let mut shader = Shader::default();
        loop {
            self.skip_blank();
            let token = self.peek().clone();
            match token.kind {
                TokenKind::Eof => return Ok(shader),
                TokenKind::Error => {
                    return Err(Error::InvalidEncoding {
                        position: token.position,
                    });
                }
                TokenKind::Identifier if token.value == "func" => {
                    self.advance();
                    let function = self.function(token.position)?;
                    shader.declarations.push(Declaration::Function(function));
                }
                TokenKind::Identifier => match BlockKind::from_keyword(&token.value) {
                    Some(kind) => {
                        self.advance();
                        let fields = self.block_fields()?;
                        shader.declarations.push(Declaration::Block(BlockDeclaration {
                            kind,
                            fields,
                            position: token.position,
                        }));
                    }
                    None => return Err(unexpected(&token, "a declaration")),
                },
                _ => return Err(unexpected(&token, "a declaration")),
            }
        }
    }

    /// Parses a single expression, for tooling and tests.
    pub fn parse_expression(&mut self) -> Result<Expression> {
        self.skip_blank();
        self.expression()
    }

    // === Token helpers ===

    fn peek(&self) -> &Token {
        // The stream always ends with an Eof or Error token.
        let index = self.current.min(self.tokens.len().saturating_sub(1));
        &self.tokens[index]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.current < self.tokens.len() {
            self.current += 1;
        }
        token
    }

    fn skip_blank(&mut self) {
        while self.peek().is_blank() {
            self.advance();
        }
    }

    fn check_operator(&self, op: &str) -> bool {
        self.peek().is_operator(op)
    }

    fn match_operator(&mut self, op: &str) -> bool {
        if self.check_operator(op) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_operator(&mut self, op: &str, expected: &'static str) -> Result<Token> {
        if self.check_operator(op) {
            Ok(self.advance())
        } else {
            Err(unexpected(self.peek(), expected))
        }
    }

    fn expect_identifier(&mut self, expected: &'static str) -> Result<Token> {
        if self.peek().kind == TokenKind::Identifier {
            Ok(self.advance())
        } else {
            Err(unexpected(self.peek(), expected))
        }
    }

    // === Declarations ===

    fn block_fields(&mut self) -> Result<Vec<Field>> {
        self.skip_blank();
        self.expect_operator("{", "'{' after block keyword")?;
        self.field_list("}")
    }

    /// Parses `name type` pairs separated by commas and/or line breaks, up to
    /// and including the closing operator.
    fn field_list(&mut self, close: &str) -> Result<Vec<Field>> {
        let mut fields = Vec::new();
        loop {
            self.skip_blank();
            if self.match_operator(close) {
                return Ok(fields);
            }
            let name = self.expect_identifier("a field name")?;
            let type_name = self.expect_identifier("a type name")?;
            fields.push(Field {
                name: name.value,
                type_name: type_name.value,
                position: name.position,
            });
            self.skip_blank();
            if !self.match_operator(",") && !self.check_operator(close) {
                let token = self.peek();
                if token.kind == TokenKind::Eof {
                    return Err(Error::UnexpectedEof {
                        position: token.position,
                        expected: "',' or the end of the list",
                    });
                }
                // A line break already separated the fields.
                if !self.tokens[self.current - 1].is_blank() {
                    return Err(unexpected(token, "',' or the end of the list"));
                }
            }
        }
    }

    fn function(&mut self, position: Position) -> Result<FunctionDeclaration> {
        let name = self.expect_identifier("a function name")?;
        self.expect_operator("(", "'(' after function name")?;
        let inputs = self.field_list(")")?;
        let outputs = if self.match_operator("(") {
            self.field_list(")")?
        } else {
            Vec::new()
        };
        self.skip_blank();
        self.expect_operator("{", "'{' before function body")?;
        let body = self.statements()?;
        Ok(FunctionDeclaration {
            name: name.value,
            inputs,
            outputs,
            body,
            position,
        })
    }

    // === Statements ===

    /// Parses statements up to and including the closing `}`.
    fn statements(&mut self) -> Result<Vec<Statement>> {
        let mut statements = Vec::new();
        loop {
            self.skip_blank();
            if self.match_operator("}") {
                return Ok(statements);
            }
            if self.peek().kind == TokenKind::Eof {
                return Err(Error::UnexpectedEof {
                    position: self.peek().position,
                    expected: "'}'",
                });
            }
            statements.push(self.statement()?);
        }
    }

    fn statement(&mut self) -> Result<Statement> {
        let token = self.expect_identifier("a statement")?;
        match token.value.as_str() {
            "var" => self.variable_declaration(),
            "if" => Ok(Statement::Conditional(self.conditional()?)),
            "discard" => Ok(Statement::Discard),
            _ => self.identifier_statement(token),
        }
    }

    fn variable_declaration(&mut self) -> Result<Statement> {
        let name = self.expect_identifier("a variable name")?;
        let type_name = self.expect_identifier("a variable type")?;
        let assignment = if self.match_operator("=") {
            Some(self.expression()?)
        } else {
            None
        };
        Ok(Statement::VariableDeclaration {
            name: name.value,
            type_name: type_name.value,
            assignment,
        })
    }

    fn conditional(&mut self) -> Result<Conditional> {
        let condition = self.expression()?;
        self.expect_operator("{", "'{' after condition")?;
        let then_body = self.statements()?;

        let mut else_ifs = Vec::new();
        let mut else_body = None;
        while self.peek().is_identifier("else") {
            self.advance();
            if self.peek().is_identifier("if") {
                self.advance();
                let condition = self.expression()?;
                self.expect_operator("{", "'{' after condition")?;
                else_ifs.push((condition, self.statements()?));
            } else {
                self.expect_operator("{", "'{' after 'else'")?;
                else_body = Some(self.statements()?);
                break;
            }
        }

        Ok(Conditional {
            condition,
            then_body,
            else_ifs,
            else_body,
        })
    }

    fn identifier_statement(&mut self, identifier: Token) -> Result<Statement> {
        if self.match_operator("(") {
            let arguments = self.arguments()?;
            return Ok(Statement::FunctionCall(FunctionCall {
                name: identifier.value,
                arguments,
            }));
        }

        let target = if self.match_operator(".") {
            let field = self.expect_identifier("a field name after '.'")?;
            Expression::FieldAccess {
                identifier: identifier.value,
                field: field.value,
            }
        } else {
            Expression::Identifier(identifier.value)
        };

        let token = self.peek().clone();
        let operator = match token.kind {
            TokenKind::Operator => AssignmentOperator::from_symbol(&token.value),
            _ => None,
        }
        .ok_or_else(|| unexpected(&token, "an assignment operator or '('"))?;
        self.advance();

        let expression = self.expression()?;
        Ok(Statement::Assignment {
            target,
            operator,
            expression,
        })
    }

    /// Parses call arguments after the opening parenthesis, up to and
    /// including the closing one.
    fn arguments(&mut self) -> Result<Vec<Expression>> {
        let mut arguments = Vec::new();
        self.skip_blank();
        if self.match_operator(")") {
            return Ok(arguments);
        }
        loop {
            self.skip_blank();
            arguments.push(self.expression()?);
            self.skip_blank();
            if self.match_operator(")") {
                return Ok(arguments);
            }
            self.expect_operator(",", "',' or ')' in argument list")?;
        }
    }

    // === Expressions ===

    fn expression(&mut self) -> Result<Expression> {
        self.binary(1)
    }

    fn peek_binary_operator(&self) -> Option<BinaryOperator> {
        let token = self.peek();
        if token.kind == TokenKind::Operator {
            BinaryOperator::from_symbol(&token.value)
        } else {
            None
        }
    }

    /// Precedence climbing over operators of at least `min_priority`.
    fn binary(&mut self, min_priority: u8) -> Result<Expression> {
        let mut left = self.value()?;
        while let Some(operator) = self.peek_binary_operator() {
            let priority = operator.priority();
            if priority < min_priority {
                break;
            }
            self.advance();
            let right = self.binary(priority + 1)?;
            left = Expression::Binary {
                left: Box::new(left),
                operator,
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn value(&mut self) -> Result<Expression> {
        let token = self.advance();
        match token.kind {
            TokenKind::Number => number(&token),
            TokenKind::Identifier => {
                if self.match_operator("(") {
                    let arguments = self.arguments()?;
                    Ok(Expression::FunctionCall(FunctionCall {
                        name: token.value,
                        arguments,
                    }))
                } else if self.match_operator(".") {
                    let field = self.expect_identifier("a field name after '.'")?;
                    Ok(Expression::FieldAccess {
                        identifier: token.value,
                        field: field.value,
                    })
                } else {
                    Ok(Expression::Identifier(token.value))
                }
            }
            TokenKind::Operator if token.value == "(" => {
                self.skip_blank();
                let inner = self.expression()?;
                self.skip_blank();
                self.expect_operator(")", "')' closing the group")?;
                Ok(Expression::Group(Box::new(inner)))
            }
            TokenKind::Operator => match UnaryOperator::from_symbol(&token.value) {
                Some(operator) => Ok(Expression::Unary {
                    operator,
                    operand: Box::new(self.value()?),
                }),
                None => Err(unexpected(&token, "a value")),
            },
            TokenKind::Eof => Err(Error::UnexpectedEof {
                position: token.position,
                expected: "a value",
            }),
            _ => Err(unexpected(&token, "a value")),
        }
    }
}

fn number(token: &Token) -> Result<Expression> {
    if let Ok(value) = token.value.parse::<i64>() {
        return Ok(Expression::IntLiteral(value));
    }
    token
        .value
        .parse::<f64>()
        .map(Expression::FloatLiteral)
        .map_err(|_| Error::InvalidNumber {
            position: token.position,
            value: token.value.clone(),
        })
}

fn unexpected(token: &Token, expected: &'static str) -> Error {
    match token.kind {
        TokenKind::Eof => Error::UnexpectedEof {
            position: token.position,
            expected,
        },
        TokenKind::Error => Error::InvalidEncoding {
            position: token.position,
        },
        TokenKind::NewLine => Error::UnexpectedToken {
            position: token.position,
            expected,
            found: "line break".to_string(),
        },
        _ => Error::UnexpectedToken {
            position: token.position,
            expected,
            found: token.value.clone(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expr(source: &str) -> Expression {
        Parser::new(source).parse_expression().unwrap()
    }

    fn binary(left: Expression, operator: BinaryOperator, right: Expression) -> Expression {
        Expression::Binary {
            left: Box::new(left),
            operator,
            right: Box::new(right),
        }
    }

    fn id(name: &str) -> Expression {
        Expression::Identifier(name.to_string())
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        assert_eq!(
            expr("a + b * c"),
            binary(
                id("a"),
                BinaryOperator::Add,
                binary(id("b"), BinaryOperator::Multiply, id("c"))
            )
        );
    }

    #[test]
    fn shift_binds_tighter_than_addition() {
        assert_eq!(
            expr("a + b << c"),
            binary(
                id("a"),
                BinaryOperator::Add,
                binary(id("b"), BinaryOperator::ShiftLeft, id("c"))
            )
        );
    }

    #[test]
    fn equal_priority_associates_left() {
        assert_eq!(
            expr("a - b - c"),
            binary(
                binary(id("a"), BinaryOperator::Subtract, id("b")),
                BinaryOperator::Subtract,
                id("c")
            )
        );
    }

    #[test]
    fn logical_operators_bind_loosest() {
        assert_eq!(
            expr("a < b || c && d"),
            binary(
                binary(id("a"), BinaryOperator::Less, id("b")),
                BinaryOperator::Or,
                binary(id("c"), BinaryOperator::And, id("d"))
            )
        );
    }

    #[test]
    fn literals_prefer_integers() {
        assert_eq!(expr("42"), Expression::IntLiteral(42));
        assert_eq!(expr("0.5"), Expression::FloatLiteral(0.5));
    }

    #[test]
    fn values_cover_calls_fields_groups_and_unary() {
        assert_eq!(
            expr("-mix(a, b.x, (c))"),
            Expression::Unary {
                operator: UnaryOperator::Negate,
                operand: Box::new(Expression::FunctionCall(FunctionCall {
                    name: "mix".to_string(),
                    arguments: vec![
                        id("a"),
                        Expression::FieldAccess {
                            identifier: "b".to_string(),
                            field: "x".to_string(),
                        },
                        Expression::Group(Box::new(id("c"))),
                    ],
                })),
            }
        );
    }

    #[test]
    fn missing_brace_reports_position() {
        let err = Parser::new("uniforms\n  color vec4").parse_shader().unwrap_err();
        assert_eq!(err.position(), Position::new(2, 3));
    }
}
