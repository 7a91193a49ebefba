//! The abstract syntax tree.
//!
//! Every node owns its children. The only exception is the body of a
//! function literal, which is reference counted so that function objects
//! created at runtime can share it with the tree instead of copying it.

use std::fmt::Display;
use std::rc::Rc;

use crate::types::{AssignOp, BinOp, Key, UnOp};


/// Write a comma-separated sequence.
fn write_seq<T: Display>(f: &mut std::fmt::Formatter<'_>, items: &[T]) -> std::fmt::Result {
    let mut iter = items.iter().peekable();
    while let Some(item) = iter.next() {
        write!(f, "{}", item)?;
        if iter.peek().is_some() {
            f.write_str(", ")?;
        }
    }
    Ok(())
}


// Program and blocks
// ------------------------------------------------------------------------------------------------

/// The root of a parsed source file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub statements: Vec<Statement>,
}

impl Display for Program {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut iter = self.statements.iter().peekable();
        while let Some(stmt) = iter.next() {
            write!(f, "{}", stmt)?;
            if iter.peek().is_some() {
                f.write_str("; ")?;
            }
        }
        Ok(())
    }
}

/// A braced sequence of statements.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    pub statements: Vec<Statement>,
}

impl Display for Block {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.statements.is_empty() {
            return f.write_str("{ }");
        }
        f.write_str("{ ")?;
        let mut iter = self.statements.iter().peekable();
        while let Some(stmt) = iter.next() {
            write!(f, "{}", stmt)?;
            if iter.peek().is_some() {
                f.write_str("; ")?;
            }
        }
        f.write_str(" }")
    }
}


// Statements
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `let name = value`, always binding in the innermost scope
    Let {
        name: Key,
        value: Expr,
    },

    /// `return` with an optional value
    Return(Option<Expr>),

    /// `break` out of the innermost loop
    Break,

    /// A bare expression
    Expression(Expr),
}

impl Display for Statement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Let { name, value } => write!(f, "let {} = {}", name, value),
            Self::Return(Some(value)) => write!(f, "return {}", value),
            Self::Return(None) => f.write_str("return"),
            Self::Break => f.write_str("break"),
            Self::Expression(expr) => write!(f, "{}", expr),
        }
    }
}


// Expressions
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Identifier(Key),

    Integer(i64),
    Unsigned(u64),
    Float(f64),
    Str(String),
    Boolean(bool),

    /// `[a, b, ...]`
    Array(Vec<Expr>),

    /// `{key: value, ...}` in source order
    Hash(Vec<(Expr, Expr)>),

    Prefix {
        operator: UnOp,
        operand: Box<Expr>,
    },

    Infix {
        operator: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    If {
        condition: Box<Expr>,
        consequence: Block,
        alternative: Option<Block>,
    },

    While {
        condition: Box<Expr>,
        body: Block,
    },

    /// Cases are tried in order; there is no fallthrough.
    Switch {
        subject: Box<Expr>,
        cases: Vec<(Expr, Block)>,
        default: Option<Block>,
    },

    Function {
        parameters: Vec<Key>,
        body: Rc<Block>,
    },

    Call {
        function: Box<Expr>,
        arguments: Vec<Expr>,
    },

    Index {
        collection: Box<Expr>,
        index: Box<Expr>,
    },

    Assign {
        target: Key,
        operator: AssignOp,
        value: Box<Expr>,
    },

    /// `import path`: evaluate another source file in the current scope
    Import(Box<Expr>),

    /// `macro(params) { body }`, expanded away before evaluation
    Macro {
        parameters: Vec<Key>,
        body: Rc<Block>,
    },

    /// Stands in for an expression that failed to parse. Evaluates to nil.
    Invalid,
}

impl Expr {
    pub fn prefix(operator: UnOp, operand: Expr) -> Expr {
        Expr::Prefix { operator, operand: Box::new(operand) }
    }

    pub fn infix(operator: BinOp, left: Expr, right: Expr) -> Expr {
        Expr::Infix { operator, left: Box::new(left), right: Box::new(right) }
    }

    pub fn call(function: Expr, arguments: Vec<Expr>) -> Expr {
        Expr::Call { function: Box::new(function), arguments }
    }

    pub fn index(collection: Expr, index: Expr) -> Expr {
        Expr::Index { collection: Box::new(collection), index: Box::new(index) }
    }

    pub fn assign(target: Key, operator: AssignOp, value: Expr) -> Expr {
        Expr::Assign { target, operator, value: Box::new(value) }
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Identifier(name) => write!(f, "{}", name),
            Self::Integer(x) => write!(f, "{}", x),
            Self::Unsigned(x) => write!(f, "{}u", x),
            Self::Float(x) => write!(f, "{:?}", x),
            Self::Str(x) => write!(f, "{:?}", x),
            Self::Boolean(x) => write!(f, "{}", x),

            Self::Array(elements) => {
                f.write_str("[")?;
                write_seq(f, elements)?;
                f.write_str("]")
            },

            Self::Hash(pairs) => {
                f.write_str("{")?;
                let mut iter = pairs.iter().peekable();
                while let Some((k, v)) = iter.next() {
                    write!(f, "{}: {}", k, v)?;
                    if iter.peek().is_some() {
                        f.write_str(", ")?;
                    }
                }
                f.write_str("}")
            },

            Self::Prefix { operator, operand } => write!(f, "({}{})", operator, operand),
            Self::Infix { operator, left, right } => write!(f, "({} {} {})", left, operator, right),

            Self::If { condition, consequence, alternative } => {
                write!(f, "if {} {}", condition, consequence)?;
                if let Some(alt) = alternative {
                    write!(f, " else {}", alt)?;
                }
                Ok(())
            },

            Self::While { condition, body } => write!(f, "while {} {}", condition, body),

            Self::Switch { subject, cases, default } => {
                write!(f, "switch {} {{", subject)?;
                for (value, block) in cases {
                    write!(f, " case {} {}", value, block)?;
                }
                if let Some(block) = default {
                    write!(f, " default {}", block)?;
                }
                f.write_str(" }")
            },

            Self::Function { parameters, body } => {
                f.write_str("fn(")?;
                write_seq(f, parameters)?;
                write!(f, ") {}", body)
            },

            Self::Call { function, arguments } => {
                write!(f, "{}(", function)?;
                write_seq(f, arguments)?;
                f.write_str(")")
            },

            Self::Index { collection, index } => write!(f, "({}[{}])", collection, index),
            Self::Assign { target, operator, value } => write!(f, "({} {} {})", target, operator, value),
            Self::Import(path) => write!(f, "import {}", path),

            Self::Macro { parameters, body } => {
                f.write_str("macro(")?;
                write_seq(f, parameters)?;
                write!(f, ") {}", body)
            },

            Self::Invalid => f.write_str("<invalid>"),
        }
    }
}
