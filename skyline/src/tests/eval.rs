use std::collections::HashMap;

use crate::ast::Statement;
use crate::builtins::BUILTINS;
use crate::eval::{ImportResolver, Interpreter, NullResolver, Signal};
use crate::object::{HashKey, Object};
use crate::parsing::{parse, Parser};
use crate::scope::Environment;
use crate::types::{Key, Map};
use crate::{eval as eval_str, Error};

use super::{run, TestHost};


fn error(msg: &str) -> Object {
    Object::error(msg)
}


struct MapResolver(HashMap<&'static str, &'static str>);

impl ImportResolver for MapResolver {
    fn resolve(&self, path: &str) -> Result<String, String> {
        self.0.get(path).map(|source| source.to_string()).ok_or_else(|| "not found".to_string())
    }
}

fn run_import(code: &str) -> Object {
    let resolver = MapResolver(HashMap::from([
        ("lib", "let double = fn(x) { x * 2 }; 7"),
        ("bad", "let = 1"),
        ("early", "return 3; 4"),
        ("nested", "import \"lib\"; double(5)"),
    ]));
    let program = parse(code).unwrap();
    let env = Environment::new();
    let mut host = TestHost::default();
    Interpreter::new(&BUILTINS, &mut host).with_resolver(&resolver).eval_program(&program, &env)
}


#[test]
fn literals() {
    assert_eq!(run("5"), Object::int(5));
    assert_eq!(run("5u"), Object::unsigned(5));
    assert_eq!(run("2.5"), Object::float(2.5));
    assert_eq!(run("\"hello\""), Object::str("hello"));
    assert_eq!(run("true"), Object::bool(true));
    assert_eq!(run("[1, \"two\"]"), Object::array(vec![Object::int(1), Object::str("two")]));
    assert_eq!(run("[]"), Object::array(()));
    assert_eq!(run(""), Object::Nil);

    let mut map = Map::new();
    map.insert(HashKey::from("a"), Object::int(1));
    map.insert(HashKey::Integer(2), Object::bool(true));
    assert_eq!(run("{\"a\": 1, 2: true}"), Object::hash(map));
    assert_eq!(run("{\"a\": 1}"), Object::hash(vec![("a", 1)]));
}


#[test]
fn arithmetic() {
    assert_eq!(run("1 + 2 * 3"), Object::int(7));
    assert_eq!(run("(1 + 2) * 3"), Object::int(9));
    assert_eq!(run("1 - 2 - 3"), Object::int(-4));
    assert_eq!(run("10 / 3"), Object::int(3));
    assert_eq!(run("-5 + 2"), Object::int(-3));
    assert_eq!(run("-(2 * 3)"), Object::int(-6));
    assert_eq!(run("2.5 * 2"), Object::float(5.0));
    assert_eq!(run("1 + 0.5"), Object::float(1.5));
    assert_eq!(run("-1.5"), Object::float(-1.5));
    assert_eq!(run("3u + 4u"), Object::unsigned(7));
    assert_eq!(run("3u * 2"), Object::int(6));
    assert_eq!(run("2 - 3u"), Object::int(-1));
    assert_eq!(run("1u / 2.0"), Object::float(0.5));
    assert_eq!(run("1.0 / 0.0"), Object::float(f64::INFINITY));
}


#[test]
fn arithmetic_errors() {
    assert_eq!(run("1 / 0"), error("division by zero"));
    assert_eq!(run("1u / 0u"), error("division by zero"));
    assert_eq!(run("9223372036854775807 + 1"), error("integer overflow"));
    assert_eq!(run("3u - 4u"), error("integer overflow"));
    assert_eq!(
        run("18446744073709551615u + 1"),
        error("unsigned value 18446744073709551615 does not fit in Integer"),
    );
    assert_eq!(run("-5u"), error("unknown operator: -Unsigned"));
    assert_eq!(run("-true"), error("unknown operator: -Boolean"));
    assert_eq!(run("1 + true"), error("type mismatch: Integer + Boolean"));
    assert_eq!(run("\"a\" * 2"), error("type mismatch: String * Integer"));
    assert_eq!(run("true + false"), error("unknown operator: Boolean + Boolean"));
    assert_eq!(run("\"a\" - \"b\""), error("unknown operator: String - String"));
    assert_eq!(run("[1] + [2]"), error("unknown operator: Array + Array"));

    // Errors stop evaluation of everything that follows
    assert_eq!(run("let x = 1 + true; 5"), error("type mismatch: Integer + Boolean"));
    assert_eq!(run("[1, 2 / 0, undefined]"), error("division by zero"));
}


#[test]
fn comparisons() {
    assert_eq!(run("1 < 2"), Object::bool(true));
    assert_eq!(run("2 <= 1"), Object::bool(false));
    assert_eq!(run("2u > 1"), Object::bool(true));
    assert_eq!(run("1.5 >= 1.5"), Object::bool(true));
    assert_eq!(run("1 == 1.0"), Object::bool(true));
    assert_eq!(run("1 != 1u"), Object::bool(false));
    assert_eq!(run("\"a\" == \"a\""), Object::bool(true));
    assert_eq!(run("\"a\" != \"b\""), Object::bool(true));
    assert_eq!(run("true == false"), Object::bool(false));
    assert_eq!(run("\"a\" < \"b\""), error("unknown operator: String < String"));
    assert_eq!(run("1 == true"), error("type mismatch: Integer == Boolean"));

    // Equality never fails on mixed integer kinds, ordering still must widen
    assert_eq!(run("-1 == 18446744073709551615u"), Object::bool(false));
    assert_eq!(run("-1 != 18446744073709551615u"), Object::bool(true));
    assert_eq!(
        run("-1 < 18446744073709551615u"),
        error("unsigned value 18446744073709551615 does not fit in Integer"),
    );
}


#[test]
fn nil() {
    assert_eq!(run("[][0]"), Object::Nil);
    assert_eq!(run("[][0] == [][1]"), Object::bool(true));
    assert_eq!(run("[][0] == 0"), Object::bool(false));
    assert_eq!(run("\"x\" != {}[1]"), Object::bool(true));
}


#[test]
fn strings() {
    assert_eq!(run("\"foo\" + \"bar\""), Object::str("foobar"));
    assert_eq!(run("\"abc\"[1]"), Object::str("b"));
    assert_eq!(run("\"abc\"[3]"), Object::Nil);
}


#[test]
fn truthiness() {
    assert_eq!(run("!true"), Object::bool(false));
    assert_eq!(run("!false"), Object::bool(true));
    assert_eq!(run("!0"), Object::bool(false));
    assert_eq!(run("!\"\""), Object::bool(false));
    assert_eq!(run("![]"), Object::bool(false));
    assert_eq!(run("!![][0]"), Object::bool(false));
    assert_eq!(run("if 0 { 1 } else { 2 }"), Object::int(1));
    assert_eq!(run("if [][0] { 1 } else { 2 }"), Object::int(2));
    assert_eq!(run("if false { 1 }"), Object::Nil);
    assert_eq!(run("if 1 > 2 { 1 } else if 2 > 1 { 2 } else { 3 }"), Object::int(2));
}


#[test]
fn bindings() {
    assert_eq!(run("let x = 5; x * 2"), Object::int(10));
    assert_eq!(run("let x = 5; let x = x + 1; x"), Object::int(6));
    assert_eq!(run("let x = 5"), Object::Nil);
    assert_eq!(run("y"), error("identifier not found: y"));
    assert_eq!(run("let length = 5; length"), Object::int(5));
}


#[test]
fn assignment() {
    assert_eq!(run("let x = 1; x = 1 + 2; x"), Object::int(3));
    assert_eq!(run("let x = 1; x = 1 + 2"), Object::int(3));
    assert_eq!(run("x = 4; x"), Object::int(4));
    assert_eq!(run("let x = 2; x *= 5"), Object::int(10));
    assert_eq!(run("let x = 2; x -= 5; x"), Object::int(-3));
    assert_eq!(run("let x = 9; x /= 2; x"), Object::int(4));
    assert_eq!(run("let s = \"a\"; s += \"b\"; s"), Object::str("ab"));
    assert_eq!(run("let a = 1; let b = 1; a = b = 7; a + b"), Object::int(14));
    assert_eq!(run("x += 1"), error("identifier not found: x"));
    assert_eq!(run("let x = true; x += 1"), error("type mismatch: Boolean + Integer"));
}


#[test]
fn scoping() {
    // Assignment writes through to the scope that defines the name
    assert_eq!(run("let x = 1; let f = fn() { x = 2 }; f(); x"), Object::int(2));

    // let always binds in the innermost scope
    assert_eq!(run("let x = 1; let f = fn() { let x = 5; x }; f() + x"), Object::int(6));

    // Assigning an unbound name inside a function stays local to the call
    assert_eq!(run("let f = fn() { y = 3; y }; f(); y"), error("identifier not found: y"));

    // Blocks don't open scopes
    assert_eq!(run("if true { let z = 9 }; z"), Object::int(9));
}


#[test]
fn returns() {
    assert_eq!(run("return 1; 2"), Object::int(1));
    assert_eq!(run("return; 2"), Object::Nil);
    assert_eq!(run("let f = fn() { if true { return 10 } 20 }; f()"), Object::int(10));
    assert_eq!(run("let f = fn() { while true { return 3 } }; f()"), Object::int(3));
    assert_eq!(run("let f = fn(x) { x * 2 }; f(4) + 1"), Object::int(9));
    assert_eq!(run("let f = fn() { }; f()"), Object::Nil);
}


#[test]
fn loops() {
    assert_eq!(run("let i = 0; while i < 5 { i += 1 }; i"), Object::int(5));
    assert_eq!(run("let i = 0; while true { i += 1; if i == 3 { break } }; i"), Object::int(3));
    assert_eq!(run("while false { }"), Object::Nil);
    assert_eq!(
        run("let n = 0; let i = 0; while i < 3 { let j = 0; while true { j += 1; if j > 2 { break } n += 1 } i += 1 }; n"),
        Object::int(6),
    );
    assert_eq!(run("break"), error("break outside of loop"));
    assert_eq!(run("let f = fn() { break }; while true { f() }"), error("break outside of loop"));
    assert_eq!(run("while undefined { }"), error("identifier not found: undefined"));
}


#[test]
fn switch() {
    let code = "
        let hits = 0;
        let r = switch 2 {
            case 1 { hits += 1; \"one\" }
            case 2 { hits += 10; \"two\" }
            case 3 { hits += 100; \"three\" }
            default { hits += 1000; \"default\" }
        };
        [r, hits]
    ";
    assert_eq!(run(code), Object::array(vec![Object::str("two"), Object::int(10)]));

    assert_eq!(run("switch 9 { case 1 { 1 } default { \"default\" } }"), Object::str("default"));
    assert_eq!(run("switch 9 { case 1 { 1 } }"), Object::Nil);

    // Different kinds never match, numbers compare by value
    assert_eq!(run("switch \"1\" { case 1 { \"int\" } default { \"none\" } }"), Object::str("none"));
    assert_eq!(run("switch 1.0 { case 1 { \"int\" } default { \"none\" } }"), Object::str("int"));
    assert_eq!(run("switch [1, 2] { case [1, 2] { \"list\" } }"), Object::str("list"));
    assert_eq!(run("let f = fn() { }; switch f { case f { 1 } default { 2 } }"), Object::int(2));
    assert_eq!(run("switch length { case length { 1 } default { 2 } }"), Object::int(1));
    assert_eq!(run("switch -1 { case 18446744073709551615u { 1 } default { 2 } }"), Object::int(2));
    assert_eq!(
        run("let x = -1; let y = 18446744073709551615u; [x == y, switch x { case y { true } default { false } }]"),
        Object::array([false, false]),
    );

    // Case values after the match aren't evaluated
    assert_eq!(run("switch 1 { case 1 { 1 } case undefined { 2 } }"), Object::int(1));
}


#[test]
fn functions() {
    assert_eq!(run("let add = fn(a, b) { a + b }; add(1, 2)"), Object::int(3));
    assert_eq!(run("fn(x) { x }(5)"), Object::int(5));
    assert_eq!(run("let f = fn(a) { a }; f(1, 2)"), error("wrong number of arguments. got=2, want=1"));
    assert_eq!(run("let f = fn(a, b) { a }; f(1)"), error("wrong number of arguments. got=1, want=2"));
    assert_eq!(run("5(1)"), error("not a function: Integer"));
    assert_eq!(run("let f = fn(a, b) { a }; f(1 + true, undefined)"), error("type mismatch: Integer + Boolean"));
    assert_eq!(run("fn(x, y) { x + y }").to_string(), "fn(x, y) { (x + y) }");
}


#[test]
fn closures() {
    assert_eq!(run("let make = fn(x) { fn(y) { x + y } }; let add2 = make(2); add2(3)"), Object::int(5));

    // Captured by reference, not snapshotted
    assert_eq!(run("let x = 1; let f = fn() { x }; x = 42; f()"), Object::int(42));

    let counter = "
        let counter = fn() {
            let n = 0;
            fn() { n += 1 }
        };
        let c = counter();
        c(); c();
        c()
    ";
    assert_eq!(run(counter), Object::int(3));
}


#[test]
fn recursion() {
    assert_eq!(
        run("let fib = fn(n) { if n < 2 { n } else { fib(n - 1) + fib(n - 2) } }; fib(15)"),
        Object::int(610),
    );

    let program = parse("let f = fn() { f() }; f()").unwrap();
    let env = Environment::new();
    let mut host = TestHost::default();
    let result = Interpreter::new(&BUILTINS, &mut host).with_max_depth(20).eval_program(&program, &env);
    assert_eq!(result, error("maximum call depth exceeded"));
}


#[test]
fn indexing() {
    assert_eq!(run("[1, 2, 3][1]"), Object::int(2));
    assert_eq!(run("[1, 2, 3][1 + 1]"), Object::int(3));
    assert_eq!(run("let i = 0; [1][i]"), Object::int(1));
    assert_eq!(run("[1][5]"), Object::Nil);
    assert_eq!(run("[1][-1]"), Object::Nil);
    assert_eq!(run("[1, 2][1u]"), Object::int(2));
    assert_eq!(run("{\"a\": 1}[\"a\"]"), Object::int(1));
    assert_eq!(run("{\"a\": 1}[\"b\"]"), Object::Nil);
    assert_eq!(run("{1u: \"x\"}[1u]"), Object::str("x"));
    assert_eq!(run("{true: 5}[true]"), Object::int(5));
    assert_eq!(run("{}[fn() { }]"), error("unusable as hash key: Function"));
    assert_eq!(run("{[1]: 2}"), error("unusable as hash key: Array"));
    assert_eq!(run("5[0]"), error("index operator not supported: Integer"));
}


#[test]
fn builtins_in_expressions() {
    assert_eq!(run("let l = length; l([1, 2])"), Object::int(2));
    assert_eq!(run("length").to_string(), "builtin length");

    // Builtin errors halt the enclosing program
    assert_eq!(run("let r = length(1); 5"), error("argument to `length` must be String or Array, got Integer"));
}


#[test]
fn imports() {
    assert_eq!(run_import("import \"lib\""), Object::int(7));
    assert_eq!(run_import("import \"lib\"; double(21)"), Object::int(42));
    assert_eq!(run_import("import \"nested\""), Object::int(10));
    assert_eq!(run_import("import \"early\""), Object::int(3));
    assert_eq!(run_import("import \"nope\""), error("could not import nope: not found"));
    assert_eq!(run_import("import 5"), error("import path must be String, got Integer"));
    assert_eq!(
        run_import("import \"bad\""),
        error("could not parse bad: 1:5: expected next token to be identifier, got `=` instead"),
    );

    assert_eq!(run("import \"x\""), error("could not import x: imports are disabled, cannot import x"));
}


#[test]
fn persistent_environment() {
    let env = Environment::new();
    let mut host = TestHost::default();
    let mut interpreter = Interpreter::new(&BUILTINS, &mut host);

    let first = parse("let x = 3; let f = fn() { x * 2 }").unwrap();
    assert_eq!(interpreter.eval_program(&first, &env), Object::Nil);

    let second = parse("x = 4; f()").unwrap();
    assert_eq!(interpreter.eval_program(&second, &env), Object::int(8));

    assert_eq!(env.names(), vec![Key::from("x"), Key::from("f")]);
}


#[test]
fn signals() {
    let env = Environment::new();
    let mut host = TestHost::default();
    let mut interpreter = Interpreter::new(&BUILTINS, &mut host);
    assert_eq!(interpreter.eval_statement(&Statement::Break, &env), Err(Signal::Break));
    assert_eq!(interpreter.eval_statement(&Statement::Return(None), &env), Err(Signal::Return(Object::Nil)));
}


#[test]
fn partial_programs() {
    // What remains of a program with syntax errors can still be run
    let mut parser = Parser::from_source("let a = ; [a, 1]");
    let program = parser.parse_program();
    assert_eq!(parser.errors().len(), 1);

    let env = Environment::new();
    let mut host = TestHost::default();
    let result = Interpreter::new(&BUILTINS, &mut host).eval_program(&program, &env);
    assert_eq!(result, Object::array(vec![Object::Nil, Object::int(1)]));
}


#[test]
fn entry_point() {
    let mut host = TestHost::default();
    assert_eq!(eval_str("1 + 2", &mut host, &NullResolver), Ok(Object::int(3)));

    let result = eval_str("1 + true", &mut host, &NullResolver);
    assert_eq!(result, Err(Error::Runtime("type mismatch: Integer + Boolean".to_string())));
    assert_eq!(result.unwrap_err().render(), "ERROR: type mismatch: Integer + Boolean");

    let result = eval_str("1 +", &mut host, &NullResolver);
    assert!(matches!(result, Err(Error::Syntax(ref errors)) if errors.len() == 1));
    assert_eq!(
        result.unwrap_err().render(),
        "parse error: 1:4: no prefix parse function for end of input found",
    );
}
