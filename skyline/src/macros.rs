//! Macros, `quote` and `unquote`.
//!
//! Before a program runs, its top-level `let name = macro(...) { ... }`
//! statements are taken out and bound in the environment. Every call to such
//! a name is then replaced by the syntax tree the macro body returns. Macro
//! arguments are not evaluated: each parameter is bound to a quote of the
//! argument expression.
//!
//! `quote(expr)` evaluates to the expression itself, except that any
//! `unquote(x)` inside it is evaluated and the result spliced back in.

use std::rc::Rc;

use tracing::debug;

use crate::ast::{Block, Expr, Program, Statement};
use crate::eval::{Interpreter, Signal};
use crate::object::{Function, Object};
use crate::scope::Environment;
use crate::types::Gc;


// Tree rewriting
// ------------------------------------------------------------------------------------------------

/// Rebuild an expression bottom-up, passing each node through `f` after its
/// children. Macro literals are left alone.
pub fn modify<E, F>(expr: Expr, f: &mut F) -> Result<Expr, E>
where
    F: FnMut(Expr) -> Result<Expr, E>,
{
    let expr = match expr {
        Expr::Array(elements) => Expr::Array(modify_all(elements, f)?),

        Expr::Hash(pairs) => {
            let mut ret = Vec::with_capacity(pairs.len());
            for (key, value) in pairs {
                ret.push((modify(key, f)?, modify(value, f)?));
            }
            Expr::Hash(ret)
        },

        Expr::Prefix { operator, operand } => Expr::Prefix {
            operator,
            operand: Box::new(modify(*operand, f)?),
        },

        Expr::Infix { operator, left, right } => Expr::Infix {
            operator,
            left: Box::new(modify(*left, f)?),
            right: Box::new(modify(*right, f)?),
        },

        Expr::If { condition, consequence, alternative } => Expr::If {
            condition: Box::new(modify(*condition, f)?),
            consequence: modify_block(consequence, f)?,
            alternative: match alternative {
                Some(block) => Some(modify_block(block, f)?),
                None => None,
            },
        },

        Expr::While { condition, body } => Expr::While {
            condition: Box::new(modify(*condition, f)?),
            body: modify_block(body, f)?,
        },

        Expr::Switch { subject, cases, default } => {
            let subject = Box::new(modify(*subject, f)?);
            let mut ret = Vec::with_capacity(cases.len());
            for (value, block) in cases {
                ret.push((modify(value, f)?, modify_block(block, f)?));
            }
            let default = match default {
                Some(block) => Some(modify_block(block, f)?),
                None => None,
            };
            Expr::Switch { subject, cases: ret, default }
        },

        Expr::Function { parameters, body } => Expr::Function {
            parameters,
            body: Rc::new(modify_block((*body).clone(), f)?),
        },

        Expr::Call { function, arguments } => Expr::Call {
            function: Box::new(modify(*function, f)?),
            arguments: modify_all(arguments, f)?,
        },

        Expr::Index { collection, index } => Expr::Index {
            collection: Box::new(modify(*collection, f)?),
            index: Box::new(modify(*index, f)?),
        },

        Expr::Assign { target, operator, value } => Expr::Assign {
            target,
            operator,
            value: Box::new(modify(*value, f)?),
        },

        Expr::Import(path) => Expr::Import(Box::new(modify(*path, f)?)),

        leaf => leaf,
    };

    f(expr)
}

fn modify_all<E, F>(exprs: Vec<Expr>, f: &mut F) -> Result<Vec<Expr>, E>
where
    F: FnMut(Expr) -> Result<Expr, E>,
{
    let mut ret = Vec::with_capacity(exprs.len());
    for expr in exprs {
        ret.push(modify(expr, f)?);
    }
    Ok(ret)
}

fn modify_statement<E, F>(statement: Statement, f: &mut F) -> Result<Statement, E>
where
    F: FnMut(Expr) -> Result<Expr, E>,
{
    Ok(match statement {
        Statement::Let { name, value } => Statement::Let { name, value: modify(value, f)? },
        Statement::Return(Some(value)) => Statement::Return(Some(modify(value, f)?)),
        Statement::Expression(expr) => Statement::Expression(modify(expr, f)?),
        other => other,
    })
}

fn modify_statements<E, F>(statements: Vec<Statement>, f: &mut F) -> Result<Vec<Statement>, E>
where
    F: FnMut(Expr) -> Result<Expr, E>,
{
    let mut ret = Vec::with_capacity(statements.len());
    for statement in statements {
        ret.push(modify_statement(statement, f)?);
    }
    Ok(ret)
}

fn modify_block<E, F>(block: Block, f: &mut F) -> Result<Block, E>
where
    F: FnMut(Expr) -> Result<Expr, E>,
{
    Ok(Block { statements: modify_statements(block.statements, f)? })
}


// Quoting
// ------------------------------------------------------------------------------------------------

fn is_call_to(function: &Expr, name: &str) -> bool {
    matches!(function, Expr::Identifier(key) if key.as_str() == name)
}

/// Convert the value of an `unquote` back into syntax.
fn to_expr(value: Object) -> Result<Expr, Signal> {
    match &value {
        Object::Integer(x) => Ok(Expr::Integer(*x)),
        Object::Unsigned(x) => Ok(Expr::Unsigned(*x)),
        Object::Float(x) => Ok(Expr::Float(*x)),
        Object::Boolean(x) => Ok(Expr::Boolean(*x)),
        Object::Str(x) => Ok(Expr::Str(x.as_str().to_string())),
        Object::Quote(expr) => Ok((**expr).clone()),
        other => Err(Signal::Error(format!("cannot unquote {}", other.type_of()))),
    }
}

/// Take the top-level macro definitions out of a program and bind them in
/// `env`.
pub fn define_macros(program: &mut Program, env: &Environment) {
    program.statements.retain(|statement| match statement {
        Statement::Let { name, value: Expr::Macro { parameters, body } } => {
            debug!(name = name.as_str(), "defining macro");
            env.define(*name, Object::Macro(Gc::new(Function {
                parameters: parameters.clone(),
                body: Rc::clone(body),
                env: env.clone(),
            })));
            false
        },
        _ => true,
    });
}

/// The macro a call expression refers to, if any.
fn called_macro(node: &Expr, env: &Environment) -> Option<Gc<Function>> {
    match node {
        Expr::Call { function, .. } => match function.as_ref() {
            Expr::Identifier(name) => match env.get(*name) {
                Some(Object::Macro(ref mac)) => Some(mac.clone()),
                _ => None,
            },
            _ => None,
        },
        _ => None,
    }
}

impl<'a> Interpreter<'a> {
    /// Evaluate `quote(expr)`.
    pub fn quote(&mut self, expr: &Expr, env: &Environment) -> Result<Object, Signal> {
        let quoted = modify(expr.clone(), &mut |node: Expr| -> Result<Expr, Signal> {
            match node {
                Expr::Call { function, arguments } if is_call_to(&function, "unquote") && arguments.len() == 1 => {
                    let value = self.eval_expr(&arguments[0], env)?;
                    to_expr(value)
                },
                other => Ok(other),
            }
        })?;
        Ok(Object::Quote(Rc::new(quoted)))
    }

    /// Define the program's macros in `env` and replace every call to a
    /// macro by its expansion.
    pub fn expand_macros(&mut self, mut program: Program, env: &Environment) -> Result<Program, String> {
        define_macros(&mut program, env);
        let statements = modify_statements(program.statements, &mut |node| self.expand_call(node, env));
        match statements {
            Ok(statements) => Ok(Program { statements }),
            Err(Signal::Error(msg)) => Err(msg),
            Err(Signal::Break) => Err("break outside of loop".to_string()),
            Err(Signal::Return(_)) => Err("return outside of function".to_string()),
        }
    }

    fn expand_call(&mut self, node: Expr, env: &Environment) -> Result<Expr, Signal> {
        let mac = match called_macro(&node, env) {
            Some(mac) => mac,
            None => return Ok(node),
        };
        let arguments = match node {
            Expr::Call { arguments, .. } => arguments,
            other => return Ok(other),
        };

        if mac.parameters.len() != arguments.len() {
            return Err(Signal::Error(format!(
                "wrong number of arguments. got={}, want={}",
                arguments.len(),
                mac.parameters.len(),
            )));
        }

        let scope = Environment::enclosed(&mac.env);
        for (param, arg) in mac.parameters.iter().zip(arguments) {
            scope.define(*param, Object::Quote(Rc::new(arg)));
        }

        debug!(nargs = mac.parameters.len(), "expanding macro");
        match self.call_body(&mac.body, &scope)? {
            Object::Quote(ref expr) => Ok((**expr).clone()),
            other => Err(Signal::Error(format!("macro must return a Quote, got {}", other.type_of()))),
        }
    }
}
