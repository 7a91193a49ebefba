//! Runtime values.
//!
//! Objects are immutable once constructed. Arrays and hashes live behind
//! garbage-collected pointers and are never changed in place: operations
//! that "modify" a container build a new one, so any previously observed
//! container keeps its contents.
//!
//! [`Object::Nil`] is the single "no value" sentinel, used for example by
//! failed index lookups.

use std::fmt::{Debug, Display};
use std::rc::Rc;

use gc::{Finalize, Gc, Trace};
use json::JsonValue;
use num_traits::ToPrimitive;

use crate::ast::{Block, Expr};
use crate::scope::Environment;
use crate::traits::{ToMap, ToVec};
use crate::types::{BinOp, Builtin, Key, List, Map, Type};


/// Escape a string for display inside a container.
fn escape(s: &str) -> String {
    let mut r = String::with_capacity(s.len() + 2);
    r.push('"');
    for c in s.chars() {
        match c {
            '"' => r.push_str("\\\""),
            '\\' => r.push_str("\\\\"),
            '\n' => r.push_str("\\n"),
            '\t' => r.push_str("\\t"),
            _ => r.push(c),
        }
    }
    r.push('"');
    r
}

fn format_float(x: f64) -> String {
    if x.is_finite() && x.fract() == 0.0 {
        format!("{:.1}", x)
    } else {
        x.to_string()
    }
}


// Function
// ------------------------------------------------------------------------------------------------

/// A user-defined function or macro together with the environment it was
/// defined in.
///
/// The environment is shared, not copied: a closure sees later changes to
/// the bindings it captured.
#[derive(Trace, Finalize)]
pub struct Function {
    #[unsafe_ignore_trace]
    pub parameters: Vec<Key>,

    #[unsafe_ignore_trace]
    pub body: Rc<Block>,

    pub env: Environment,
}

impl Debug for Function {
    // The environment is left out, as it may well contain this function.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Function")
            .field("parameters", &self.parameters)
            .field("body", &self.body)
            .finish()
    }
}


// HashKey
// ------------------------------------------------------------------------------------------------

/// The subset of objects that may be used as hash keys.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum HashKey {
    Integer(i64),
    Unsigned(u64),
    Boolean(bool),
    Str(String),
}

impl HashKey {
    pub fn to_object(&self) -> Object {
        match self {
            Self::Integer(x) => Object::Integer(*x),
            Self::Unsigned(x) => Object::Unsigned(*x),
            Self::Boolean(x) => Object::Boolean(*x),
            Self::Str(x) => Object::str(x),
        }
    }
}

impl Display for HashKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Integer(x) => write!(f, "{}", x),
            Self::Unsigned(x) => write!(f, "{}", x),
            Self::Boolean(x) => write!(f, "{}", x),
            Self::Str(x) => f.write_str(&escape(x)),
        }
    }
}

impl From<&str> for HashKey {
    fn from(x: &str) -> HashKey { HashKey::Str(x.to_string()) }
}

impl From<i64> for HashKey {
    fn from(x: i64) -> HashKey { HashKey::Integer(x) }
}

impl From<i32> for HashKey {
    fn from(x: i32) -> HashKey { HashKey::Integer(x as i64) }
}

impl From<bool> for HashKey {
    fn from(x: bool) -> HashKey { HashKey::Boolean(x) }
}


// Object
// ------------------------------------------------------------------------------------------------

#[derive(Clone, Trace, Finalize)]
pub enum Object {
    Integer(i64),
    Unsigned(u64),
    Float(f64),
    Str(Gc<String>),
    Boolean(bool),
    Array(Gc<List>),
    Hash(Gc<Map>),
    Function(Gc<Function>),
    Builtin(#[unsafe_ignore_trace] Builtin),
    Macro(Gc<Function>),
    Quote(#[unsafe_ignore_trace] Rc<Expr>),
    Error(String),
    Nil,
}

impl Object {
    pub fn int(x: i64) -> Object {
        Object::Integer(x)
    }

    pub fn unsigned(x: u64) -> Object {
        Object::Unsigned(x)
    }

    pub fn float(x: f64) -> Object {
        Object::Float(x)
    }

    pub fn bool(x: bool) -> Object {
        Object::Boolean(x)
    }

    pub fn str<T: ToString>(x: T) -> Object {
        Object::Str(Gc::new(x.to_string()))
    }

    pub fn array<T>(x: T) -> Object where T: ToVec<Object> {
        Object::Array(Gc::new(x.to_vec()))
    }

    pub fn hash<T>(x: T) -> Object where T: ToMap<HashKey, Object> {
        Object::Hash(Gc::new(x.to_map()))
    }

    pub fn error<T: ToString>(msg: T) -> Object {
        Object::Error(msg.to_string())
    }

    pub fn type_of(&self) -> Type {
        match self {
            Self::Integer(_) => Type::Integer,
            Self::Unsigned(_) => Type::Unsigned,
            Self::Float(_) => Type::Float,
            Self::Str(_) => Type::String,
            Self::Boolean(_) => Type::Boolean,
            Self::Array(_) => Type::Array,
            Self::Hash(_) => Type::Hash,
            Self::Function(_) => Type::Function,
            Self::Builtin(_) => Type::Builtin,
            Self::Macro(_) => Type::Macro,
            Self::Quote(_) => Type::Quote,
            Self::Error(_) => Type::Error,
            Self::Nil => Type::Nil,
        }
    }

    /// Only `false` and nil are falsy. Zeros and empty containers are truthy.
    pub fn truthy(&self) -> bool {
        !matches!(self, Self::Boolean(false) | Self::Nil)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Self::Nil)
    }

    fn is_number(&self) -> bool {
        matches!(self, Self::Integer(_) | Self::Unsigned(_) | Self::Float(_))
    }

    pub fn get_str(&self) -> Option<&str> {
        match self {
            Self::Str(x) => Some(x.as_str()),
            _ => None,
        }
    }

    pub fn get_array(&self) -> Option<&List> {
        match self {
            Self::Array(x) => Some(&**x),
            _ => None,
        }
    }

    pub fn hash_key(&self) -> Option<HashKey> {
        match self {
            Self::Integer(x) => Some(HashKey::Integer(*x)),
            Self::Unsigned(x) => Some(HashKey::Unsigned(*x)),
            Self::Boolean(x) => Some(HashKey::Boolean(*x)),
            Self::Str(x) => Some(HashKey::Str(x.to_string())),
            _ => None,
        }
    }

    /// Value equality as used by `switch`, `==` and `!=`. Objects of different kinds are
    /// never equal, except numbers, which are compared by value.
    pub fn value_eq(&self, other: &Object) -> bool {
        match (self, other) {
            // Equality between disparate numeric types
            (Self::Integer(x), Self::Unsigned(y)) | (Self::Unsigned(y), Self::Integer(x)) => *x as i128 == *y as i128,
            (Self::Integer(x), Self::Float(y)) | (Self::Float(y), Self::Integer(x)) => *x as f64 == *y,
            (Self::Unsigned(x), Self::Float(y)) | (Self::Float(y), Self::Unsigned(x)) => *x as f64 == *y,

            // Structural equality
            (Self::Integer(x), Self::Integer(y)) => x == y,
            (Self::Unsigned(x), Self::Unsigned(y)) => x == y,
            (Self::Float(x), Self::Float(y)) => x == y,
            (Self::Str(x), Self::Str(y)) => x.as_str() == y.as_str(),
            (Self::Boolean(x), Self::Boolean(y)) => x == y,
            (Self::Nil, Self::Nil) => true,
            (Self::Builtin(x), Self::Builtin(y)) => x.name() == y.name(),
            (Self::Error(x), Self::Error(y)) => x == y,

            (Self::Array(x), Self::Array(y)) => {
                x.len() == y.len() && x.iter().zip(y.iter()).all(|(xx, yy)| xx.value_eq(yy))
            },

            (Self::Hash(x), Self::Hash(y)) => {
                x.len() == y.len() && x.iter().all(
                    |(k, xv)| y.get(k).is_some_and(|yv| xv.value_eq(yv))
                )
            },

            // Note: functions always compare false
            _ => false,
        }
    }

    // Operators
    // --------------------------------------------------------------------------------------------

    /// The unary minus operator.
    pub fn neg(&self) -> Result<Object, String> {
        match self {
            Self::Integer(x) => x.checked_neg().map(Object::Integer).ok_or_else(overflow),
            Self::Float(x) => Ok(Object::Float(-x)),
            _ => Err(format!("unknown operator: -{}", self.type_of())),
        }
    }

    /// The unary not operator.
    pub fn not(&self) -> Object {
        Object::Boolean(!self.truthy())
    }

    /// Apply a binary operator.
    ///
    /// Numbers are widened before the operation: two integers or two
    /// unsigned integers stay as they are, an integer with an unsigned
    /// integer works on integers (the unsigned value must fit), and anything
    /// involving a float works on floats. Equality is the exception, see
    /// [`Object::value_eq`].
    pub fn operate(&self, op: BinOp, other: &Object) -> Result<Object, String> {
        // Numeric equality compares exact values and never fails to widen
        if self.is_number() && other.is_number() {
            match op {
                BinOp::Equal => return Ok(Object::Boolean(self.value_eq(other))),
                BinOp::NotEqual => return Ok(Object::Boolean(!self.value_eq(other))),
                _ => {},
            }
        }

        if let Some(pair) = Numeric::widen(self, other)? {
            return pair.operate(op);
        }

        match (self, other, op) {
            (Self::Str(x), Self::Str(y), BinOp::Add) => Ok(Object::str(format!("{}{}", x.as_str(), y.as_str()))),

            (Self::Nil, _, BinOp::Equal) | (_, Self::Nil, BinOp::Equal) => Ok(Object::Boolean(self.is_nil() && other.is_nil())),
            (Self::Nil, _, BinOp::NotEqual) | (_, Self::Nil, BinOp::NotEqual) => Ok(Object::Boolean(!(self.is_nil() && other.is_nil()))),

            (x, y, BinOp::Equal) if x.type_of() == y.type_of() => Ok(Object::Boolean(x.value_eq(y))),
            (x, y, BinOp::NotEqual) if x.type_of() == y.type_of() => Ok(Object::Boolean(!x.value_eq(y))),

            (x, y, op) if x.type_of() == y.type_of() => {
                Err(format!("unknown operator: {} {} {}", x.type_of(), op, y.type_of()))
            },

            (x, y, op) => Err(format!("type mismatch: {} {} {}", x.type_of(), op, y.type_of())),
        }
    }

    /// The index operator. Lookups that find nothing return nil rather than
    /// an error.
    pub fn index(&self, index: &Object) -> Result<Object, String> {
        match (self, index) {
            (Self::Array(elements), Self::Integer(i)) => {
                Ok(usize::try_from(*i).ok().and_then(|i| elements.get(i)).cloned().unwrap_or(Object::Nil))
            },
            (Self::Array(elements), Self::Unsigned(i)) => {
                Ok(i.to_usize().and_then(|i| elements.get(i)).cloned().unwrap_or(Object::Nil))
            },
            (Self::Str(s), Self::Integer(i)) => {
                Ok(usize::try_from(*i).ok().and_then(|i| s.chars().nth(i)).map(Object::str).unwrap_or(Object::Nil))
            },
            (Self::Hash(pairs), key) => {
                let key = key.hash_key().ok_or_else(|| format!("unusable as hash key: {}", key.type_of()))?;
                Ok(pairs.get(&key).cloned().unwrap_or(Object::Nil))
            },
            _ => Err(format!("index operator not supported: {}", self.type_of())),
        }
    }

    /// Representation used inside containers, where strings are quoted.
    fn repr(&self) -> String {
        match self {
            Self::Str(x) => escape(x),
            _ => self.to_string(),
        }
    }
}

fn overflow() -> String {
    "integer overflow".to_string()
}

fn division_by_zero() -> String {
    "division by zero".to_string()
}


// Numeric widening
// ------------------------------------------------------------------------------------------------

/// A pair of numeric operands after widening to a common type.
enum Numeric {
    Integer(i64, i64),
    Unsigned(u64, u64),
    Float(f64, f64),
}

impl Numeric {
    /// Returns `Ok(None)` if either operand is not a number.
    fn widen(left: &Object, right: &Object) -> Result<Option<Numeric>, String> {
        let unsigned_to_int = |x: &u64| x.to_i64().ok_or_else(
            || format!("unsigned value {} does not fit in {}", x, Type::Integer)
        );

        Ok(Some(match (left, right) {
            (Object::Integer(x), Object::Integer(y)) => Numeric::Integer(*x, *y),
            (Object::Unsigned(x), Object::Unsigned(y)) => Numeric::Unsigned(*x, *y),
            (Object::Integer(x), Object::Unsigned(y)) => Numeric::Integer(*x, unsigned_to_int(y)?),
            (Object::Unsigned(x), Object::Integer(y)) => Numeric::Integer(unsigned_to_int(x)?, *y),
            (Object::Float(x), Object::Float(y)) => Numeric::Float(*x, *y),
            (Object::Float(x), Object::Integer(y)) => Numeric::Float(*x, *y as f64),
            (Object::Float(x), Object::Unsigned(y)) => Numeric::Float(*x, *y as f64),
            (Object::Integer(x), Object::Float(y)) => Numeric::Float(*x as f64, *y),
            (Object::Unsigned(x), Object::Float(y)) => Numeric::Float(*x as f64, *y),
            _ => return Ok(None),
        }))
    }

    fn operate(self, op: BinOp) -> Result<Object, String> {
        match self {
            Numeric::Integer(x, y) => match op {
                BinOp::Add => x.checked_add(y).map(Object::Integer).ok_or_else(overflow),
                BinOp::Subtract => x.checked_sub(y).map(Object::Integer).ok_or_else(overflow),
                BinOp::Multiply => x.checked_mul(y).map(Object::Integer).ok_or_else(overflow),
                BinOp::Divide if y == 0 => Err(division_by_zero()),
                BinOp::Divide => x.checked_div(y).map(Object::Integer).ok_or_else(overflow),
                cmp => Ok(Object::Boolean(compare(cmp, &x, &y))),
            },
            Numeric::Unsigned(x, y) => match op {
                BinOp::Add => x.checked_add(y).map(Object::Unsigned).ok_or_else(overflow),
                BinOp::Subtract => x.checked_sub(y).map(Object::Unsigned).ok_or_else(overflow),
                BinOp::Multiply => x.checked_mul(y).map(Object::Unsigned).ok_or_else(overflow),
                BinOp::Divide => x.checked_div(y).map(Object::Unsigned).ok_or_else(division_by_zero),
                cmp => Ok(Object::Boolean(compare(cmp, &x, &y))),
            },
            Numeric::Float(x, y) => match op {
                BinOp::Add => Ok(Object::Float(x + y)),
                BinOp::Subtract => Ok(Object::Float(x - y)),
                BinOp::Multiply => Ok(Object::Float(x * y)),
                BinOp::Divide => Ok(Object::Float(x / y)),
                cmp => Ok(Object::Boolean(compare(cmp, &x, &y))),
            },
        }
    }
}

fn compare<T: PartialOrd>(op: BinOp, x: &T, y: &T) -> bool {
    match op {
        BinOp::Less => x < y,
        BinOp::Greater => x > y,
        BinOp::LessEqual => x <= y,
        BinOp::GreaterEqual => x >= y,
        BinOp::Equal => x == y,
        BinOp::NotEqual => x != y,
        // Arithmetic operators are dispatched before getting here
        BinOp::Add | BinOp::Subtract | BinOp::Multiply | BinOp::Divide => false,
    }
}


// Trait implementations
// ------------------------------------------------------------------------------------------------

impl PartialEq<Object> for Object {
    fn eq(&self, other: &Object) -> bool {
        match (self, other) {
            (Self::Integer(x), Self::Integer(y)) => x.eq(y),
            (Self::Unsigned(x), Self::Unsigned(y)) => x.eq(y),
            (Self::Float(x), Self::Float(y)) => x.eq(y),
            (Self::Str(x), Self::Str(y)) => x.as_str().eq(y.as_str()),
            (Self::Boolean(x), Self::Boolean(y)) => x.eq(y),
            (Self::Array(x), Self::Array(y)) => (**x).eq(&**y),
            (Self::Hash(x), Self::Hash(y)) => (**x).eq(&**y),
            (Self::Function(x), Self::Function(y)) => Gc::ptr_eq(x, y),
            (Self::Builtin(x), Self::Builtin(y)) => x.name() == y.name(),
            (Self::Macro(x), Self::Macro(y)) => Gc::ptr_eq(x, y),
            (Self::Quote(x), Self::Quote(y)) => x.eq(y),
            (Self::Error(x), Self::Error(y)) => x.eq(y),
            (Self::Nil, Self::Nil) => true,
            _ => false,
        }
    }
}

impl Debug for Object {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Integer(x) => f.debug_tuple("Object::Integer").field(x).finish(),
            Self::Unsigned(x) => f.debug_tuple("Object::Unsigned").field(x).finish(),
            Self::Float(x) => f.debug_tuple("Object::Float").field(x).finish(),
            Self::Str(x) => f.debug_tuple("Object::Str").field(&**x).finish(),
            Self::Boolean(x) => f.debug_tuple("Object::Boolean").field(x).finish(),
            Self::Array(x) => f.debug_tuple("Object::Array").field(&**x).finish(),
            Self::Hash(x) => f.debug_tuple("Object::Hash").field(&**x).finish(),
            Self::Function(x) => f.debug_tuple("Object::Function").field(&**x).finish(),
            Self::Builtin(x) => f.debug_tuple("Object::Builtin").field(&x.name()).finish(),
            Self::Macro(x) => f.debug_tuple("Object::Macro").field(&**x).finish(),
            Self::Quote(x) => f.debug_tuple("Object::Quote").field(&**x).finish(),
            Self::Error(x) => f.debug_tuple("Object::Error").field(x).finish(),
            Self::Nil => f.write_str("Object::Nil"),
        }
    }
}

impl Display for Object {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Integer(x) => write!(f, "{}", x),
            Self::Unsigned(x) => write!(f, "{}", x),
            Self::Float(x) => f.write_str(&format_float(*x)),
            Self::Str(x) => f.write_str(x),
            Self::Boolean(x) => write!(f, "{}", x),
            Self::Nil => f.write_str("nil"),
            Self::Error(msg) => write!(f, "ERROR: {}", msg),
            Self::Builtin(x) => write!(f, "builtin {}", x.name()),
            Self::Quote(x) => write!(f, "QUOTE({})", x),

            Self::Array(elements) => {
                f.write_str("[")?;
                let mut iter = elements.iter().peekable();
                while let Some(element) = iter.next() {
                    f.write_str(&element.repr())?;
                    if iter.peek().is_some() {
                        f.write_str(", ")?;
                    }
                }
                f.write_str("]")
            },

            Self::Hash(pairs) => {
                f.write_str("{")?;
                let mut iter = pairs.iter().peekable();
                while let Some((k, v)) = iter.next() {
                    write!(f, "{}: {}", k, v.repr())?;
                    if iter.peek().is_some() {
                        f.write_str(", ")?;
                    }
                }
                f.write_str("}")
            },

            Self::Function(func) | Self::Macro(func) => {
                let keyword = if matches!(self, Self::Macro(_)) { "macro" } else { "fn" };
                write!(f, "{}(", keyword)?;
                let mut iter = func.parameters.iter().peekable();
                while let Some(param) = iter.next() {
                    write!(f, "{}", param)?;
                    if iter.peek().is_some() {
                        f.write_str(", ")?;
                    }
                }
                write!(f, ") {}", func.body)
            },
        }
    }
}

impl From<i64> for Object {
    fn from(x: i64) -> Object { Object::Integer(x) }
}

impl From<i32> for Object {
    fn from(x: i32) -> Object { Object::Integer(x as i64) }
}

impl From<u64> for Object {
    fn from(x: u64) -> Object { Object::Unsigned(x) }
}

impl From<f64> for Object {
    fn from(x: f64) -> Object { Object::Float(x) }
}

impl From<bool> for Object {
    fn from(x: bool) -> Object { Object::Boolean(x) }
}

impl From<&str> for Object {
    fn from(x: &str) -> Object { Object::str(x) }
}

impl From<String> for Object {
    fn from(x: String) -> Object { Object::Str(Gc::new(x)) }
}

impl From<Builtin> for Object {
    fn from(x: Builtin) -> Object { Object::Builtin(x) }
}

impl TryFrom<Object> for JsonValue {
    type Error = String;

    fn try_from(value: Object) -> Result<Self, Self::Error> {
        match &value {
            Object::Integer(x) => Ok(JsonValue::from(*x)),
            Object::Unsigned(x) => Ok(JsonValue::from(*x)),
            Object::Float(x) => Ok(JsonValue::from(*x)),
            Object::Str(x) => Ok(JsonValue::from(x.as_str())),
            Object::Boolean(x) => Ok(JsonValue::from(*x)),
            Object::Nil => Ok(JsonValue::Null),

            Object::Array(elements) => {
                let mut ret = JsonValue::new_array();
                for element in elements.iter() {
                    ret.push(JsonValue::try_from(element.clone())?).map_err(|e| e.to_string())?;
                }
                Ok(ret)
            },

            Object::Hash(pairs) => {
                let mut ret = json::object::Object::new();
                for (k, v) in pairs.iter() {
                    let key = match k {
                        HashKey::Str(s) => s.clone(),
                        other => other.to_string(),
                    };
                    ret.insert(&key, JsonValue::try_from(v.clone())?);
                }
                Ok(JsonValue::Object(ret))
            },

            other => Err(format!("{} has no JSON representation", other.type_of())),
        }
    }
}
