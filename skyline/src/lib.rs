#[macro_use]
extern crate lazy_static;

pub mod ast;
pub mod builtins;
pub mod error;
pub mod eval;
pub mod lexing;
pub mod macros;
pub mod object;
pub mod parsing;
pub mod scope;
pub mod types;

mod traits;
mod wrappers;

#[cfg(test)]
mod tests;

use std::fs::read_to_string;
use std::path::Path;

use builtins::{Host, StdHost, BUILTINS};
use eval::{FileResolver, ImportResolver, Interpreter, NullResolver};

pub use error::Error;
pub use object::Object;
pub use parsing::parse;
pub use scope::Environment;


/// Parse and evaluate source code in a fresh environment with the standard
/// builtins.
pub fn eval(input: &str, host: &mut dyn Host, resolver: &dyn ImportResolver) -> Result<Object, Error> {
    let program = parse(input).map_err(Error::Syntax)?;
    let env = Environment::new();
    let mut interpreter = Interpreter::new(&BUILTINS, host).with_resolver(resolver);
    let program = interpreter.expand_macros(program, &env).map_err(Error::Runtime)?;
    match interpreter.eval_program(&program, &env) {
        Object::Error(ref msg) => Err(Error::Runtime(msg.clone())),
        value => Ok(value),
    }
}


/// Evaluate source code against the process's standard streams. Imports are
/// refused.
pub fn eval_raw(input: &str) -> Result<Object, Error> {
    eval(input, &mut StdHost, &NullResolver)
}


/// Evaluate a source file. Imports resolve relative to its directory.
pub fn eval_file(input: &Path) -> Result<Object, Error> {
    let contents = read_to_string(input).map_err(|e| Error::Io(format!("{}: {}", input.display(), e)))?;
    let root = input.parent().map(Path::to_path_buf).unwrap_or_default();
    eval(&contents, &mut StdHost, &FileResolver { root })
}
