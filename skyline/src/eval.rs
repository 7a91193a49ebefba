//! The tree-walking evaluator.
//!
//! Every evaluation step returns `Result<Object, Signal>`. Errors, `return`
//! and `break` travel up the tree as [`Signal`]s through `?`, so each
//! composition point (statement sequences, argument lists, operands) stops
//! at the first one. Function calls unwrap `Signal::Return`, loops consume
//! `Signal::Break`, and [`Interpreter::eval_program`] turns what remains
//! into an ordinary object.

use std::path::PathBuf;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::ast::{Block, Expr, Program, Statement};
use crate::builtins::{Builtins, Host};
use crate::object::{Function, HashKey, Object};
use crate::parsing::parse;
use crate::scope::Environment;
use crate::types::{Gc, Key, Map, UnOp};


/// Maximum nesting of function calls and imports, unless configured otherwise.
pub const DEFAULT_MAX_DEPTH: usize = 128;


// Import resolvers
// ------------------------------------------------------------------------------------------------

/// Supplies the source text of imported files.
pub trait ImportResolver {
    fn resolve(&self, path: &str) -> Result<String, String>;
}

/// Refuses every import.
pub struct NullResolver;

impl ImportResolver for NullResolver {
    fn resolve(&self, path: &str) -> Result<String, String> {
        Err(format!("imports are disabled, cannot import {}", path))
    }
}

static NULL_RESOLVER: NullResolver = NullResolver;

/// Reads imported files relative to a root directory.
pub struct FileResolver {
    pub root: PathBuf,
}

impl ImportResolver for FileResolver {
    fn resolve(&self, path: &str) -> Result<String, String> {
        let target = self.root.join(path);
        std::fs::read_to_string(&target).map_err(|e| format!("{}: {}", target.display(), e))
    }
}


// Signals
// ------------------------------------------------------------------------------------------------

/// Anything that interrupts the normal flow of evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    Error(String),
    Return(Object),
    Break,
}

impl From<String> for Signal {
    fn from(msg: String) -> Signal {
        Signal::Error(msg)
    }
}

impl From<&str> for Signal {
    fn from(msg: &str) -> Signal {
        Signal::Error(msg.to_string())
    }
}

type EvalResult = Result<Object, Signal>;

fn unbound(key: Key) -> Signal {
    Signal::Error(format!("identifier not found: {}", key))
}


// Interpreter
// ------------------------------------------------------------------------------------------------

pub struct Interpreter<'a> {
    builtins: &'a Builtins,
    host: &'a mut dyn Host,
    resolver: &'a dyn ImportResolver,
    depth: usize,
    max_depth: usize,
}

impl<'a> Interpreter<'a> {
    /// Create an interpreter using the given builtins and host. Imports are
    /// refused until a resolver is configured.
    pub fn new(builtins: &'a Builtins, host: &'a mut dyn Host) -> Interpreter<'a> {
        Interpreter {
            builtins,
            host,
            resolver: &NULL_RESOLVER,
            depth: 0,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_resolver(self, resolver: &'a dyn ImportResolver) -> Interpreter<'a> {
        Interpreter { resolver, ..self }
    }

    pub fn with_max_depth(self, max_depth: usize) -> Interpreter<'a> {
        Interpreter { max_depth, ..self }
    }

    /// Evaluate a whole program. The result is the value of the last
    /// statement, or of the first top-level `return`. Errors come back as
    /// [`Object::Error`].
    pub fn eval_program(&mut self, program: &Program, env: &Environment) -> Object {
        match self.eval_statements(&program.statements, env) {
            Ok(value) | Err(Signal::Return(value)) => value,
            Err(Signal::Error(msg)) => Object::Error(msg),
            Err(Signal::Break) => Object::error("break outside of loop"),
        }
    }

    /// Blocks run in the scope they appear in. Only function calls open a
    /// new scope.
    pub fn eval_block(&mut self, block: &Block, env: &Environment) -> EvalResult {
        self.eval_statements(&block.statements, env)
    }

    fn eval_statements(&mut self, statements: &[Statement], env: &Environment) -> EvalResult {
        let mut result = Object::Nil;
        for statement in statements {
            result = self.eval_statement(statement, env)?;
        }
        Ok(result)
    }

    pub fn eval_statement(&mut self, statement: &Statement, env: &Environment) -> EvalResult {
        match statement {
            Statement::Let { name, value } => {
                let value = self.eval_expr(value, env)?;
                env.define(*name, value);
                Ok(Object::Nil)
            },
            Statement::Return(Some(value)) => Err(Signal::Return(self.eval_expr(value, env)?)),
            Statement::Return(None) => Err(Signal::Return(Object::Nil)),
            Statement::Break => Err(Signal::Break),
            Statement::Expression(expr) => self.eval_expr(expr, env),
        }
    }

    pub fn eval_expr(&mut self, expr: &Expr, env: &Environment) -> EvalResult {
        match expr {
            Expr::Identifier(key) => self.lookup(*key, env),

            Expr::Integer(x) => Ok(Object::Integer(*x)),
            Expr::Unsigned(x) => Ok(Object::Unsigned(*x)),
            Expr::Float(x) => Ok(Object::Float(*x)),
            Expr::Str(x) => Ok(Object::str(x)),
            Expr::Boolean(x) => Ok(Object::Boolean(*x)),

            Expr::Array(elements) => {
                let elements = self.eval_all(elements, env)?;
                Ok(Object::array(elements))
            },

            Expr::Hash(pairs) => {
                let mut map = Map::new();
                for (key, value) in pairs {
                    let key = self.eval_expr(key, env)?;
                    let key: HashKey = key.hash_key().ok_or_else(
                        || format!("unusable as hash key: {}", key.type_of())
                    )?;
                    let value = self.eval_expr(value, env)?;
                    map.insert(key, value);
                }
                Ok(Object::hash(map))
            },

            Expr::Prefix { operator, operand } => {
                let operand = self.eval_expr(operand, env)?;
                match operator {
                    UnOp::LogicalNegate => Ok(operand.not()),
                    UnOp::ArithmeticalNegate => Ok(operand.neg()?),
                }
            },

            Expr::Infix { operator, left, right } => {
                let left = self.eval_expr(left, env)?;
                let right = self.eval_expr(right, env)?;
                Ok(left.operate(*operator, &right)?)
            },

            Expr::If { condition, consequence, alternative } => {
                if self.eval_expr(condition, env)?.truthy() {
                    self.eval_block(consequence, env)
                } else if let Some(alternative) = alternative {
                    self.eval_block(alternative, env)
                } else {
                    Ok(Object::Nil)
                }
            },

            Expr::While { condition, body } => {
                while self.eval_expr(condition, env)?.truthy() {
                    match self.eval_block(body, env) {
                        Ok(_) => {},
                        Err(Signal::Break) => break,
                        Err(signal) => return Err(signal),
                    }
                }
                Ok(Object::Nil)
            },

            Expr::Switch { subject, cases, default } => {
                let subject = self.eval_expr(subject, env)?;
                for (case, block) in cases {
                    let value = self.eval_expr(case, env)?;
                    if subject.value_eq(&value) {
                        return self.eval_block(block, env);
                    }
                }
                match default {
                    Some(block) => self.eval_block(block, env),
                    None => Ok(Object::Nil),
                }
            },

            Expr::Function { parameters, body } => {
                Ok(Object::Function(Gc::new(Function {
                    parameters: parameters.clone(),
                    body: Rc::clone(body),
                    env: env.clone(),
                })))
            },

            Expr::Call { function, arguments } => {
                if let (Expr::Identifier(name), [quoted]) = (function.as_ref(), arguments.as_slice()) {
                    if name.as_str() == "quote" {
                        return self.quote(quoted, env);
                    }
                }
                let function = self.eval_expr(function, env)?;
                let arguments = self.eval_all(arguments, env)?;
                self.apply(&function, &arguments)
            },

            Expr::Index { collection, index } => {
                let collection = self.eval_expr(collection, env)?;
                let index = self.eval_expr(index, env)?;
                Ok(collection.index(&index)?)
            },

            Expr::Assign { target, operator, value } => {
                let value = self.eval_expr(value, env)?;
                let value = match operator.binop() {
                    None => value,
                    Some(op) => {
                        let current = env.get(*target).ok_or_else(|| unbound(*target))?;
                        current.operate(op, &value)?
                    },
                };
                if !env.assign(*target, value.clone()) {
                    env.define(*target, value.clone());
                }
                Ok(value)
            },

            Expr::Import(path) => {
                let path = self.eval_expr(path, env)?;
                let path = path.get_str().ok_or_else(
                    || format!("import path must be String, got {}", path.type_of())
                )?;
                self.import(path, env)
            },

            // Top-level definitions are removed before evaluation, so this is
            // a macro used as a value
            Expr::Macro { parameters, body } => {
                Ok(Object::Macro(Gc::new(Function {
                    parameters: parameters.clone(),
                    body: Rc::clone(body),
                    env: env.clone(),
                })))
            },

            Expr::Invalid => Ok(Object::Nil),
        }
    }

    /// Evaluate expressions left to right, stopping at the first signal.
    fn eval_all(&mut self, exprs: &[Expr], env: &Environment) -> Result<Vec<Object>, Signal> {
        exprs.iter().map(|expr| self.eval_expr(expr, env)).collect()
    }

    /// Names resolve in the environment first, then among the builtins.
    fn lookup(&self, key: Key, env: &Environment) -> EvalResult {
        env.get(key)
            .or_else(|| self.builtins.get(key.as_str()).map(Object::Builtin))
            .ok_or_else(|| unbound(key))
    }

    /// Call a function or builtin with already evaluated arguments.
    pub fn apply(&mut self, function: &Object, args: &[Object]) -> EvalResult {
        match function {
            Object::Function(func) => {
                if func.parameters.len() != args.len() {
                    return Err(Signal::Error(format!(
                        "wrong number of arguments. got={}, want={}",
                        args.len(),
                        func.parameters.len(),
                    )));
                }

                let scope = Environment::enclosed(&func.env);
                for (param, arg) in func.parameters.iter().zip(args) {
                    scope.define(*param, arg.clone());
                }

                trace!(nargs = args.len(), depth = self.depth, "calling function");
                self.call_body(&func.body, &scope)
            },

            Object::Builtin(builtin) => {
                trace!(name = builtin.name().as_str(), "calling builtin");
                match builtin.call(args, &mut *self.host) {
                    Object::Error(ref msg) => Err(Signal::Error(msg.clone())),
                    value => Ok(value),
                }
            },

            other => Err(Signal::Error(format!("not a function: {}", other.type_of()))),
        }
    }

    /// Run a function or macro body in its own scope, one level deeper.
    /// A `return` gives the value of the call.
    pub(crate) fn call_body(&mut self, body: &Block, scope: &Environment) -> EvalResult {
        let result = self.nested(|this| this.eval_block(body, scope));
        match result {
            Ok(value) | Err(Signal::Return(value)) => Ok(value),
            Err(Signal::Break) => Err(Signal::Error("break outside of loop".to_string())),
            Err(signal) => Err(signal),
        }
    }

    /// Evaluate another source file in the current environment, so that its
    /// top-level bindings become visible to the importer.
    fn import(&mut self, path: &str, env: &Environment) -> EvalResult {
        debug!(path, "importing");
        let source = self.resolver.resolve(path).map_err(
            |e| format!("could not import {}: {}", path, e)
        )?;

        let program = parse(&source).map_err(|errors| {
            let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
            format!("could not parse {}: {}", path, messages.join("; "))
        })?;
        let program = self.expand_macros(program, env)?;

        let result = self.nested(|this| this.eval_statements(&program.statements, env));
        match result {
            Ok(value) | Err(Signal::Return(value)) => Ok(value),
            Err(Signal::Break) => Err(Signal::Error("break outside of loop".to_string())),
            Err(signal) => Err(signal),
        }
    }

    /// Run `f` one level deeper, refusing to go past the maximum depth.
    fn nested<F>(&mut self, f: F) -> EvalResult
    where
        F: FnOnce(&mut Self) -> EvalResult,
    {
        if self.depth >= self.max_depth {
            return Err(Signal::Error("maximum call depth exceeded".to_string()));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }
}
