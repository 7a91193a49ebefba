use crate::builtins::{Builtins, OsKey, UserKey, BUILTINS};
use crate::object::Object;

use super::{run, run_with, TestHost};


fn error(msg: &str) -> Object {
    Object::error(msg)
}


#[test]
fn registry() {
    assert_eq!(
        BUILTINS.names(),
        vec!["OS_", "SkyLine__", "USER_", "first", "input", "last", "length", "print", "println", "push", "rest", "sprint"],
    );
    assert_eq!(Builtins::standard().len(), 12);
    assert!(BUILTINS.get("length").is_some());
    assert!(BUILTINS.get("lenght").is_none());
}


#[test]
fn length() {
    assert_eq!(run("length(\"\")"), Object::int(0));
    assert_eq!(run("length(\"four\")"), Object::int(4));
    assert_eq!(run("length([1, 2, 3])"), Object::int(3));
    assert_eq!(run("length(1)"), error("argument to `length` must be String or Array, got Integer"));
    assert_eq!(run("length(\"one\", \"two\")"), error("wrong number of arguments. got=2, want=1"));
    assert_eq!(run("length()"), error("wrong number of arguments. got=0, want=1"));
}


#[test]
fn first_last_rest() {
    assert_eq!(run("first([1, 2, 3])"), Object::int(1));
    assert_eq!(run("last([1, 2, 3])"), Object::int(3));
    assert_eq!(run("rest([1, 2, 3])"), Object::array([2, 3]));
    assert_eq!(run("rest([1])"), Object::array(()));

    assert_eq!(run("first([])"), Object::Nil);
    assert_eq!(run("last([])"), Object::Nil);
    assert_eq!(run("rest([])"), Object::Nil);

    // rest leaves its argument alone
    assert_eq!(
        run("let a = [1, 2, 3]; let b = rest(a); [a, b]"),
        Object::array(vec![Object::array([1, 2, 3]), Object::array([2, 3])]),
    );

    assert_eq!(run("first(1)"), error("argument to `first` must be Array, got Integer"));
    assert_eq!(run("last(\"abc\")"), error("argument to `last` must be Array, got String"));
    assert_eq!(run("rest({})"), error("argument to `rest` must be Array, got Hash"));
    assert_eq!(run("first([1], [2])"), error("wrong number of arguments. got=2, want=1"));
    assert_eq!(run("rest()"), error("wrong number of arguments. got=0, want=1"));
}


#[test]
fn push() {
    assert_eq!(run("push([1, 2], 3)"), Object::array([1, 2, 3]));
    assert_eq!(run("push([], [])"), Object::array(vec![Object::array(())]));
    assert_eq!(
        run("let a = [1, 2]; let b = push(a, 3); [a, b]"),
        Object::array(vec![Object::array([1, 2]), Object::array([1, 2, 3])]),
    );
    assert_eq!(run("push(1, 2)"), error("argument to `push` must be Array, got Integer"));
    assert_eq!(run("push([1])"), error("wrong number of arguments. got=1, want=2"));
}


#[test]
fn output() {
    let mut host = TestHost::default();
    assert_eq!(run_with("print(\"a\", 1, [\"b\"])", &mut host), Object::str(""));
    assert_eq!(host.output, "a1[\"b\"]");

    let mut host = TestHost::default();
    assert_eq!(run_with("println(\"a\", 2.0); println()", &mut host), Object::str(""));
    assert_eq!(host.output, "a\n2.0\n");

    let mut host = TestHost::default();
    assert_eq!(run_with("sprint([1, \"x\"])", &mut host), Object::str("[1, \"x\"]"));
    assert_eq!(host.output, "");

    assert_eq!(run("sprint(\"x\") + sprint(5)"), Object::str("x5"));
    assert_eq!(run("sprint()"), error("wrong number of arguments. got=0, want=1"));
}


#[test]
fn input() {
    let mut host = TestHost::with_input(&["\n", "\r\n", "hello\n"]);
    assert_eq!(run_with("input(\"name? \", \"newline\")", &mut host), Object::str("hello"));
    assert_eq!(host.output, "name? ");
    assert!(host.input.is_empty());

    let mut host = TestHost::with_input(&["last line without terminator"]);
    assert_eq!(run_with("input(\"\", \"n\")", &mut host), Object::str("last line without terminator"));

    let mut host = TestHost::with_input(&["\n"]);
    assert_eq!(run_with("input(\"> \", \"n\")", &mut host), error("input: reached end of input"));

    let mut host = TestHost::with_input(&["ignored\n"]);
    assert_eq!(run_with("input(\"> \", \"tab\")", &mut host), error("unsupported input terminator: tab"));
    assert_eq!(host.output, "");

    assert_eq!(run("input(\"> \")"), error("wrong number of arguments. got=1, want=2"));
}


#[test]
fn os_info() {
    assert_eq!(run("OS_(\"os_name\")"), Object::str("testos"));
    assert_eq!(run("OS_(\"os_arch\")"), Object::str("testarch"));
    assert_eq!(run("OS_()"), error("wrong number of arguments. got=0, want=1"));

    // Unknown keys give back a string, not an error
    let unknown = run("OS_(\"kernel\")");
    assert!(!unknown.is_error());
    assert_eq!(unknown, Object::str("unknown value | run SkyLine__('OS') for more information"));
    assert_eq!(run("let v = OS_(\"kernel\"); 1"), Object::int(1));
}


#[test]
fn user_info() {
    assert_eq!(run("USER_(\"username\")"), Object::str("tester"));
    assert_eq!(run("USER_(\"name\")"), Object::str("Test User"));
    assert_eq!(run("USER_(\"uid\")"), Object::str("1000"));
    assert_eq!(run("USER_(\"hdir\")"), Object::str("/home/tester"));

    // Unknown keys give back a string, not an error
    assert_eq!(run("USER_(\"shell\")"), Object::str("unknown value | run SkyLine__('USER') for more information"));

    // Host failures are errors
    assert_eq!(
        run("USER_(\"gid\")"),
        error("SkyLine backend (ERR_OS_INFO) => got error when working with OS information gid: no group database"),
    );
}


#[test]
fn help() {
    let os = run("SkyLine__(\"OS\")").to_string();
    assert!(os.contains("OS_(\"os_name\")"));
    assert!(os.contains("OS_(\"os_arch\")"));

    let user = run("SkyLine__(\"USER\")").to_string();
    for key in ["username", "uid", "gid", "name", "hdir"] {
        assert!(user.contains(&format!("USER_(\"{}\")", key)));
    }

    assert_eq!(run("SkyLine__(\"NET\")"), Object::str("METHOD DOES NOT EXIST -> NET"));
}


#[test]
fn keys() {
    assert_eq!(OsKey::parse("os_name"), Some(OsKey::Name));
    assert_eq!(OsKey::parse("name"), None);
    assert_eq!(UserKey::parse("hdir"), Some(UserKey::HomeDir));
    assert_eq!(UserKey::parse("home"), None);
}
