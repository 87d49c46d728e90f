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

//! The shader syntax tree.

use crate::error::Position;

/// The root of a parsed shader: its declarations in source order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Shader {
    /// Top-level declarations, in source order.
    pub declarations: Vec<Declaration>,
}

impl Shader {
    /// Returns the first `textures` block, if any.
    pub fn texture_block(&self) -> Option<&BlockDeclaration> {
        self.blocks(BlockKind::Textures).next()
    }

    /// Returns the first `uniforms` block, if any.
    pub fn uniform_block(&self) -> Option<&BlockDeclaration> {
        self.blocks(BlockKind::Uniforms).next()
    }

    /// Returns the first `varyings` block, if any.
    pub fn varying_block(&self) -> Option<&BlockDeclaration> {
        self.blocks(BlockKind::Varyings).next()
    }

    /// Iterates over every block of the given kind.
    pub fn blocks(&self, kind: BlockKind) -> impl Iterator<Item = &BlockDeclaration> {
        self.declarations.iter().filter_map(move |declaration| match declaration {
            Declaration::Block(block) if block.kind == kind => Some(block),
            _ => None,
        })
    }

    /// Iterates over every function, in source order.
    pub fn functions(&self) -> impl Iterator<Item = &FunctionDeclaration> {
        self.declarations
            .iter()
            .filter_map(|declaration| match declaration {
                Declaration::Function(function) => Some(function),
                Declaration::Block(_) => None,
            })
    }

    /// Finds a function by name.
    pub fn find_function(&self, name: &str) -> Option<&FunctionDeclaration> {
        self.functions().find(|function| function.name == name)
    }
}

/// A top-level declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum Declaration {
    /// A `textures`, `uniforms` or `varyings` block.
    Block(BlockDeclaration),
    /// A `func` declaration.
    Function(FunctionDeclaration),
}

/// The kind of a field block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    /// `textures { … }`
    Textures,
    /// `uniforms { … }`
    Uniforms,
    /// `varyings { … }`
    Varyings,
}

impl BlockKind {
    /// The keyword introducing the block.
    pub const fn keyword(&self) -> &'static str {
        match self {
            BlockKind::Textures => "textures",
            BlockKind::Uniforms => "uniforms",
            BlockKind::Varyings => "varyings",
        }
    }

    /// Maps a keyword back to a block kind.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "textures" => Some(BlockKind::Textures),
            "uniforms" => Some(BlockKind::Uniforms),
            "varyings" => Some(BlockKind::Varyings),
            _ => None,
        }
    }
}

/// A block of named, typed fields.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockDeclaration {
    /// The block kind.
    pub kind: BlockKind,
    /// The fields, in declaration order.
    pub fields: Vec<Field>,
    /// Where the block keyword appears.
    pub position: Position,
}

/// A `name type` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// The field name.
    pub name: String,
    /// The type name, e.g. `vec4` or `sampler2D`.
    pub type_name: String,
    /// Where the field name appears.
    pub position: Position,
}

impl Field {
    /// Returns `true` if the name is reserved for the framework.
    pub fn is_reserved(&self) -> bool {
        self.name.starts_with('#')
    }
}

/// A `func` declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDeclaration {
    /// The function name.
    pub name: String,
    /// Input parameters.
    pub inputs: Vec<Field>,
    /// Named results.
    pub outputs: Vec<Field>,
    /// The statements of the body.
    pub body: Vec<Statement>,
    /// Where the `func` keyword appears.
    pub position: Position,
}

/// A statement inside a function body.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `var name type (= expression)?`
    VariableDeclaration {
        /// The variable name.
        name: String,
        /// The variable type.
        type_name: String,
        /// The initial value.
        assignment: Option<Expression>,
    },
    /// A call whose result is discarded.
    FunctionCall(FunctionCall),
    /// `target op expression`
    Assignment {
        /// An identifier or a field access.
        target: Expression,
        /// `=` or a compound operator.
        operator: AssignmentOperator,
        /// The assigned value.
        expression: Expression,
    },
    /// `if … { … } else if … { … } else { … }`
    Conditional(Conditional),
    /// `discard`
    Discard,
}

/// A chain of conditional branches.
#[derive(Debug, Clone, PartialEq)]
pub struct Conditional {
    /// The `if` condition.
    pub condition: Expression,
    /// Statements run when the condition holds.
    pub then_body: Vec<Statement>,
    /// `else if` branches, tried in order.
    pub else_ifs: Vec<(Expression, Vec<Statement>)>,
    /// The final `else` body.
    pub else_body: Option<Vec<Statement>>,
}

/// A function call.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    /// The called function.
    pub name: String,
    /// The arguments, in order.
    pub arguments: Vec<Expression>,
}

/// An expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// An integer literal.
    IntLiteral(i64),
    /// A floating point literal.
    FloatLiteral(f64),
    /// `( expression )`
    Group(Box<Expression>),
    /// A variable or field reference.
    Identifier(String),
    /// `identifier.field`
    FieldAccess {
        /// The accessed value.
        identifier: String,
        /// The field or swizzle.
        field: String,
    },
    /// `op operand`
    Unary {
        /// The operator.
        operator: UnaryOperator,
        /// The operand.
        operand: Box<Expression>,
    },
    /// `left op right`
    Binary {
        /// The left operand.
        left: Box<Expression>,
        /// The operator.
        operator: BinaryOperator,
        /// The right operand.
        right: Box<Expression>,
    },
    /// A call used as a value.
    FunctionCall(FunctionCall),
}

/// A prefix operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
    /// `!`
    Not,
    /// `-`
    Negate,
    /// `+`
    Plus,
    /// `^`
    BitNot,
}

impl UnaryOperator {
    /// Parses an operator token.
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "!" => Some(UnaryOperator::Not),
            "-" => Some(UnaryOperator::Negate),
            "+" => Some(UnaryOperator::Plus),
            "^" => Some(UnaryOperator::BitNot),
            _ => None,
        }
    }
}

/// An infix operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    /// `||`
    Or,
    /// `&&`
    And,
    /// `==`
    Equal,
    /// `!=`
    NotEqual,
    /// `<`
    Less,
    /// `>`
    Greater,
    /// `<=`
    LessOrEqual,
    /// `>=`
    GreaterOrEqual,
    /// `|`
    BitOr,
    /// `^`
    BitXor,
    /// `&`
    BitAnd,
    /// `+`
    Add,
    /// `-`
    Subtract,
    /// `*`
    Multiply,
    /// `/`
    Divide,
    /// `%`
    Remainder,
    /// `<<`
    ShiftLeft,
    /// `>>`
    ShiftRight,
}

impl BinaryOperator {
    /// Parses an operator token.
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Some(match symbol {
            "||" => BinaryOperator::Or,
            "&&" => BinaryOperator::And,
            "==" => BinaryOperator::Equal,
            "!=" => BinaryOperator::NotEqual,
            "<" => BinaryOperator::Less,
            ">" => BinaryOperator::Greater,
            "<=" => BinaryOperator::LessOrEqual,
            ">=" => BinaryOperator::GreaterOrEqual,
            "|" => BinaryOperator::BitOr,
            "^" => BinaryOperator::BitXor,
            "&" => BinaryOperator::BitAnd,
            "+" => BinaryOperator::Add,
            "-" => BinaryOperator::Subtract,
            "*" => BinaryOperator::Multiply,
            "/" => BinaryOperator::Divide,
            "%" => BinaryOperator::Remainder,
            "<<" => BinaryOperator::ShiftLeft,
            ">>" => BinaryOperator::ShiftRight,
            _ => return None,
        })
    }

    /// Binding strength; higher binds tighter. Operators of equal priority
    /// associate left to right.
    ///
    /// Shifts bind tighter than multiplication, which binds tighter than
    /// addition.
    pub const fn priority(&self) -> u8 {
        match self {
            BinaryOperator::Or => 1,
            BinaryOperator::And => 2,
            BinaryOperator::Equal
            | BinaryOperator::NotEqual
            | BinaryOperator::Less
            | BinaryOperator::Greater
            | BinaryOperator::LessOrEqual
            | BinaryOperator::GreaterOrEqual => 3,
            BinaryOperator::BitOr => 4,
            BinaryOperator::BitXor => 5,
            BinaryOperator::BitAnd => 6,
            BinaryOperator::Add | BinaryOperator::Subtract => 7,
            BinaryOperator::Multiply | BinaryOperator::Divide | BinaryOperator::Remainder => 8,
            BinaryOperator::ShiftLeft | BinaryOperator::ShiftRight => 9,
        }
    }
}

/// `=` or a compound assignment operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssignmentOperator {
    /// `=`
    Assign,
    /// `+=`
    Add,
    /// `-=`
    Subtract,
    /// `*=`
    Multiply,
    /// `/=`
    Divide,
    /// `%=`
    Remainder,
    /// `&=`
    BitAnd,
    /// `^=`
    BitXor,
    /// `|=`
    BitOr,
    /// `<<=`
    ShiftLeft,
    /// `>>=`
    ShiftRight,
}

impl AssignmentOperator {
    /// Parses an operator token.
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Some(match symbol {
            "=" => AssignmentOperator::Assign,
            "+=" => AssignmentOperator::Add,
            "-=" => AssignmentOperator::Subtract,
            "*=" => AssignmentOperator::Multiply,
            "/=" => AssignmentOperator::Divide,
            "%=" => AssignmentOperator::Remainder,
            "&=" => AssignmentOperator::BitAnd,
            "^=" => AssignmentOperator::BitXor,
            "|=" => AssignmentOperator::BitOr,
            "<<=" => AssignmentOperator::ShiftLeft,
            ">>=" => AssignmentOperator::ShiftRight,
            _ => return None,
        })
    }
}
