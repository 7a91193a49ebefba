mod builtins;
mod eval;

use std::collections::VecDeque;

use crate::builtins::{Host, OsKey, UserKey, BUILTINS};
use crate::eval::Interpreter;
use crate::object::Object;
use crate::parsing::parse;
use crate::scope::Environment;


/// In-memory host: collects output, serves canned input lines and reports
/// fixed system information.
#[derive(Default)]
pub(crate) struct TestHost {
    pub output: String,
    pub input: VecDeque<String>,
}

impl TestHost {
    pub fn with_input(lines: &[&str]) -> TestHost {
        TestHost {
            output: String::new(),
            input: lines.iter().map(|line| line.to_string()).collect(),
        }
    }
}

impl Host for TestHost {
    fn write(&mut self, text: &str) {
        self.output.push_str(text);
    }

    fn read_line(&mut self) -> Option<String> {
        self.input.pop_front()
    }

    fn os_info(&self, key: OsKey) -> Result<String, String> {
        match key {
            OsKey::Name => Ok("testos".to_string()),
            OsKey::Arch => Ok("testarch".to_string()),
        }
    }

    fn user_info(&self, key: UserKey) -> Result<String, String> {
        match key {
            UserKey::Username => Ok("tester".to_string()),
            UserKey::Name => Ok("Test User".to_string()),
            UserKey::Uid => Ok("1000".to_string()),
            UserKey::HomeDir => Ok("/home/tester".to_string()),
            UserKey::Gid => Err("no group database".to_string()),
        }
    }
}


/// Evaluate a program in a fresh environment against the given host.
pub(crate) fn run_with(code: &str, host: &mut TestHost) -> Object {
    let program = match parse(code) {
        Ok(program) => program,
        Err(errors) => panic!("unexpected parse errors in {:?}: {:?}", code, errors),
    };
    let env = Environment::new();
    let mut interpreter = Interpreter::new(&BUILTINS, host);
    match interpreter.expand_macros(program, &env) {
        Ok(program) => interpreter.eval_program(&program, &env),
        Err(msg) => Object::Error(msg),
    }
}

pub(crate) fn run(code: &str) -> Object {
    run_with(code, &mut TestHost::default())
}
