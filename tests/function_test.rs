mod common;
use clu::lang::ErrorCode;
use clu::mach::{Config, Namespace, RecordingRenderer, Runtime};
use common::*;

#[test]
fn test_scalar_functions() {
    assert_eq!(run("?sqrt(16)"), "# = 4\n");
    assert_eq!(run("?floor(2.7)"), "# = 2\n");
    assert_eq!(run("?abs([-1, 2])"), "# = [1, 2]\n");
    assert_eq!(run("?Pi"), "Pi = 3.14159265359\n");
}

#[test]
fn test_function_errors() {
    let mut r = Runtime::default();
    assert!(r.enter("sin()").is_err());
    assert_eq!(r.errors().last().unwrap().code(), ErrorCode::WrongNoOfParams);
    assert!(r.enter("sqrt(-1)").is_err());
    assert_eq!(r.errors().last().unwrap().code(), ErrorCode::Math);
}

#[test]
fn test_size_and_type() {
    assert_eq!(run("?size([1, 2, 3])"), "# = 3\n");
    assert_eq!(run("?size(Matrix(2, 3))"), "# = [2, 3]\n");
    assert_eq!(run("?type(1.5)"), "# = double\n");
    assert_eq!(run("a = \"x\"; ?type(a)"), "# = string\n");
}

#[test]
fn test_sort() {
    assert_eq!(run("?sort([3, 1, 2])"), "# = [1, 2, 3]\n");
    assert_eq!(run("?sort([3, 1, 2], { _P(1) > _P(2) })"), "# = [3, 2, 1]\n");
    assert_eq!(run("l = [\"b\", \"a\"]; ?sort(l); ?l"), "# = [\"a\", \"b\"]\nl = [\"b\", \"a\"]\n");
}

#[test]
fn test_remove_and_insert() {
    assert_eq!(run("l = [1, 2, 3]; x = Remove(l, 2); ?l; ?x"), "l = [1, 3]\nx = 2\n");
    assert_eq!(run("l = [1, 3]; Insert(l, 2, 2); ?l"), "l = [1, 2, 3]\n");
    let mut r = Runtime::default();
    assert!(r.enter("l = [1]; Remove(l, 2)").is_err());
    assert_eq!(r.errors().last().unwrap().code(), ErrorCode::Math);
}

#[test]
fn test_user_functions() {
    let mut r = Runtime::default();
    r.enter("add = { _P(1) + _P(2) }").unwrap();
    assert_eq!(enter(&mut r, "?add(2, 3)"), "# = 5\n");
    assert_eq!(enter(&mut r, "?add(\"a\", \"b\")"), "# = ab\n");
}

#[test]
fn test_globals_from_functions() {
    let mut r = Runtime::default();
    r.enter("f = { ::g = 7; }; f()").unwrap();
    let g = r.storage().get_var("g", Namespace::Global);
    assert_eq!(r.storage().heap().cast_to_scalar(g, 0.0), Some(7.0));
}

#[test]
fn test_runaway_recursion() {
    let mut r = Runtime::default();
    let e = r.enter("f = { ::f() }; f()").unwrap_err();
    assert_eq!(e.code(), ErrorCode::OutOfMemory);
    assert_eq!(e.text(), "Function calls nested too deep.");
    exec(&mut r);
    assert_eq!(enter(&mut r, "?1"), "# = 1\n");
}

#[test]
fn test_call_depth_limit() {
    let mut r = Runtime::with_config(Config {
        max_call_depth: 5,
        ..Config::default()
    });
    assert!(r.enter("d = 0; f = { ::d = ::d + 1; ::f() }; f()").is_err());
    let d = r.storage().get_var("d", Namespace::Global);
    assert_eq!(r.storage().heap().cast_to_scalar(d, 0.0), Some(5.0));
}

#[test]
fn test_draw() {
    let renderer = RecordingRenderer::new();
    let log = renderer.log();
    let mut r = Runtime::default();
    r.set_renderer(Box::new(renderer));
    r.enter("DefVarsE3(); :Red; :e1 + e2").unwrap();
    assert_eq!(*log.borrow(), vec!["color Color(1, 0, 0, 1)", "draw e1 + e2"]);
    assert!(r.enter(":1").is_err());
}
