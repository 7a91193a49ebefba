//! Lexical environments.
//!
//! An [`Environment`] is a shared handle to one scope in a chain. Function
//! objects keep a handle to the scope they were defined in, and calls create
//! a fresh scope enclosed by it. Since scopes and functions may refer to each
//! other in cycles (a recursive function lives in the scope it captures),
//! they are managed by the garbage collector rather than by reference counts.

use std::fmt::Debug;

use gc::{Finalize, Gc, GcCell, Trace};

use crate::object::Object;
use crate::types::Key;
use crate::wrappers::OrderedMap;


#[derive(Trace, Finalize, Default)]
struct Scope {
    names: OrderedMap<Key, Object>,
    outer: Option<Environment>,
}


#[derive(Clone, Trace, Finalize)]
pub struct Environment(Gc<GcCell<Scope>>);

impl Environment {
    /// Create a new, empty top-level environment.
    pub fn new() -> Environment {
        Environment(Gc::new(GcCell::new(Scope::default())))
    }

    /// Create a new, empty scope whose lookups fall through to `outer`.
    pub fn enclosed(outer: &Environment) -> Environment {
        Environment(Gc::new(GcCell::new(Scope {
            names: OrderedMap::new(),
            outer: Some(outer.clone()),
        })))
    }

    /// Look up a name, walking outwards through enclosing scopes.
    pub fn get(&self, key: Key) -> Option<Object> {
        let mut env = self.clone();
        loop {
            let next = {
                let scope = env.0.borrow();
                if let Some(value) = scope.names.get(&key) {
                    return Some(value.clone());
                }
                scope.outer.clone()
            };
            env = next?;
        }
    }

    /// Bind a name in this scope, shadowing any binding further out.
    pub fn define(&self, key: Key, value: Object) {
        self.0.borrow_mut().names.insert(key, value);
    }

    /// Rebind a name in the innermost scope that already defines it.
    /// Returns false, without binding anything, if no scope does.
    pub fn assign(&self, key: Key, value: Object) -> bool {
        let mut env = self.clone();
        loop {
            let next = {
                let mut scope = env.0.borrow_mut();
                if let Some(slot) = scope.names.get_mut(&key) {
                    *slot = value;
                    return true;
                }
                scope.outer.clone()
            };
            match next {
                Some(outer) => env = outer,
                None => return false,
            }
        }
    }

    /// Names bound directly in this scope, in binding order.
    pub fn names(&self) -> Vec<Key> {
        self.0.borrow().names.iter().map(|(k, _)| *k).collect()
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for Environment {
    // Only the local names are shown, since values may refer back to this scope.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Environment").field(&self.names()).finish()
    }
}
