use std::fmt::{Debug, Display};

use symbol_table::GlobalSymbol;

use crate::builtins::Host;
use crate::object::{HashKey, Object};
use crate::wrappers::OrderedMap;

pub use gc::{Gc, GcCell};

/// Type used for all interned strings: variable names, parameters, builtin names.
pub type Key = GlobalSymbol;

/// Type used for array contents.
pub type List = Vec<Object>;

/// Type used for hash contents.
pub type Map = OrderedMap<HashKey, Object>;

/// Signature of every builtin. Builtins report failure through
/// [`Object::Error`], never by panicking.
pub type NativeFunction = fn(&[Object], &mut dyn Host) -> Object;

#[derive(Copy, Clone)]
pub struct Builtin {
    func: NativeFunction,
    name: Key,
}

impl Builtin {
    pub fn new(func: NativeFunction, name: Key) -> Builtin {
        Builtin { func, name }
    }

    pub fn call(&self, args: &[Object], host: &mut dyn Host) -> Object {
        (self.func)(args, host)
    }

    pub fn name(&self) -> Key {
        self.name
    }
}

impl Debug for Builtin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Builtin").field("name", &self.name).finish()
    }
}

/// Enumeration of all the different types a SkyLine object can have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Type {
    /// i64
    Integer,

    /// u64
    Unsigned,

    /// f64
    Float,

    /// String
    String,

    /// bool
    Boolean,

    /// Vec<Object>
    Array,

    /// OrderedMap<HashKey, Object>
    Hash,

    /// User-defined closures
    Function,

    /// Native functions
    Builtin,

    /// Macro definitions
    Macro,

    /// Quoted syntax trees
    Quote,

    /// Error objects
    Error,

    /// The empty variant
    Nil,
}

// These names appear verbatim in error messages, e.g. "argument to `first`
// must be Array, got Integer".
impl Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Integer => f.write_str("Integer"),
            Self::Unsigned => f.write_str("Unsigned"),
            Self::Float => f.write_str("Float"),
            Self::String => f.write_str("String"),
            Self::Boolean => f.write_str("Boolean"),
            Self::Array => f.write_str("Array"),
            Self::Hash => f.write_str("Hash"),
            Self::Function => f.write_str("Function"),
            Self::Builtin => f.write_str("Builtin"),
            Self::Macro => f.write_str("Macro"),
            Self::Quote => f.write_str("Quote"),
            Self::Error => f.write_str("Error"),
            Self::Nil => f.write_str("Nil"),
        }
    }
}

/// Enumerates all the unary operators in the SkyLine language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    /// Arithmetical negation (unary minus)
    ArithmeticalNegate,

    /// Logical negation (unary '!')
    LogicalNegate,
}

impl Display for UnOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ArithmeticalNegate => f.write_str("-"),
            Self::LogicalNegate => f.write_str("!"),
        }
    }
}

/// Enumerates all the binary operators in the SkyLine language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    /// Multiplication
    Multiply,

    /// Division
    Divide,

    /// Addition
    Add,

    /// Subtraction
    Subtract,

    /// Less-than
    Less,

    /// Greater-than
    Greater,

    /// Less-than-or-equal-to
    LessEqual,

    /// Greater-than-or-equal-to
    GreaterEqual,

    /// Equality
    Equal,

    /// Inequality
    NotEqual,
}

impl Display for BinOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Multiply => f.write_str("*"),
            Self::Divide => f.write_str("/"),
            Self::Add => f.write_str("+"),
            Self::Subtract => f.write_str("-"),
            Self::Less => f.write_str("<"),
            Self::Greater => f.write_str(">"),
            Self::LessEqual => f.write_str("<="),
            Self::GreaterEqual => f.write_str(">="),
            Self::Equal => f.write_str("=="),
            Self::NotEqual => f.write_str("!="),
        }
    }
}

/// Enumerates the assignment operators: plain `=` and the compound forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl AssignOp {
    /// The binary operator a compound assignment applies, if any.
    pub fn binop(&self) -> Option<BinOp> {
        match self {
            Self::Assign => None,
            Self::Add => Some(BinOp::Add),
            Self::Subtract => Some(BinOp::Subtract),
            Self::Multiply => Some(BinOp::Multiply),
            Self::Divide => Some(BinOp::Divide),
        }
    }
}

impl Display for AssignOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Assign => f.write_str("="),
            Self::Add => f.write_str("+="),
            Self::Subtract => f.write_str("-="),
            Self::Multiply => f.write_str("*="),
            Self::Divide => f.write_str("/="),
        }
    }
}
