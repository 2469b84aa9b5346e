mod common;
use clu::lang::{ErrorCode, Level};
use clu::mach::{Namespace, Runtime};
use common::*;

#[test]
fn test_parse_error_through_runtime() {
    let mut r = Runtime::default();
    let e = r.enter("a = 1;\nb = (2").unwrap_err();
    assert_eq!(e.code(), ErrorCode::MissingCloseRound);
    assert_eq!(e.line_number(), Some(2));
    assert_eq!(r.line_count(), 0);
    assert_eq!(r.errors().len(), 1);
}

#[test]
fn test_first_error_stops_run() {
    let mut r = Runtime::default();
    assert!(r.enter("x = 1 / 0; y = 2").is_err());
    let y = r.storage().get_var("y", Namespace::Global);
    assert!(r.storage().is_invalid(y));
    assert_eq!(r.result_string(), None);
}

#[test]
fn test_error_levels() {
    let mut r = Runtime::default();
    r.storage_mut().set_loop_limit(5);
    let e = r.enter("loop { a = 1; }").unwrap_err();
    assert_eq!(e.level(), Level::Fatal);
    let e = r.enter("1 / 0").unwrap_err();
    assert_eq!(e.level(), Level::Error);
}

#[test]
fn test_errors_are_drained() {
    let mut r = Runtime::default();
    assert_eq!(enter(&mut r, "1 / 0"), "Error: Division by zero. (line 1, pos 2)\n");
    assert_eq!(exec(&mut r), "");
}

#[test]
fn test_edit_and_rerun() {
    let mut r = Runtime::default();
    assert_eq!(r.insert_text("a = 1;\n?a", 0).unwrap(), 2);
    assert_eq!(r.insert_text("b = 2;\n?b", 2).unwrap(), 2);
    r.run().unwrap();
    assert_eq!(exec(&mut r), "a = 1\nb = 2\n");
    r.remove_lines(0, 2);
    r.run().unwrap();
    assert_eq!(exec(&mut r), "b = 2\n");
}

#[test]
fn test_insert_in_front() {
    let mut r = Runtime::default();
    r.insert_text("?a", 0).unwrap();
    r.insert_text("a = 3;", 0).unwrap();
    r.run().unwrap();
    assert_eq!(exec(&mut r), "a = 3\n");
}

#[test]
fn test_run_clears_old_errors() {
    let mut r = Runtime::default();
    assert!(r.enter("1 / 0").is_err());
    r.remove_lines(0, 1);
    r.run().unwrap();
    assert!(r.errors().is_empty());
}

#[test]
fn test_tensor_division_by_zero() {
    let mut r = Runtime::default();
    r.enter("t = Tensor([2]); u = Tensor([2])").unwrap();
    for text in &["t / u", "1 / u", "t / 0"] {
        let e = r.enter(text).unwrap_err();
        assert_eq!(e.code(), ErrorCode::Math, "{}", text);
        assert_eq!(e.text(), "Division by zero.");
    }
    r.enter("t(1) = 1").unwrap();
    assert_eq!(r.enter("t / u").unwrap_err().code(), ErrorCode::Math);
}

#[test]
fn test_includes() {
    let mut files = std::collections::HashMap::new();
    files.insert("main.clu".to_string(), "#include \"lib.clu\"\n?sq(4)".to_string());
    files.insert("lib.clu".to_string(), "sq = { _P(1) * _P(1) }".to_string());
    files.insert("loop.clu".to_string(), "a = 1;\n// # include \"loop.clu\"".to_string());
    let mut r = Runtime::default();
    r.set_includes(files);
    assert_eq!(r.insert_file("main.clu", 0).unwrap(), 2);
    assert!(r.run().is_ok());
    assert_eq!(exec(&mut r), "# = 16\n");

    let e = r.insert_file("loop.clu", 0).unwrap_err();
    assert_eq!(e.code(), ErrorCode::RecursiveInclude);
    let e = r.insert_file("gone.clu", 0).unwrap_err();
    assert_eq!(e.code(), ErrorCode::IncludeNotFound);
    let e = r.enter("#include \"gone.clu\"").unwrap_err();
    assert_eq!(e.code(), ErrorCode::IncludeNotFound);
    assert_eq!(r.errors().len(), 3);
    assert_eq!(r.line_count(), 2);
}
