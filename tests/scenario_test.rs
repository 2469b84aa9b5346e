mod common;
use clu::lang::ErrorCode;
use clu::mach::Runtime;
use common::*;

#[test]
fn test_sum_of_literals() {
    let mut r = Runtime::default();
    r.enter("3 + 4").unwrap();
    assert_eq!(r.result_scalar(), Some(7.0));
    assert_eq!(r.result_string().as_deref(), Some("7"));
}

#[test]
fn test_list_index_is_one_based() {
    let mut r = Runtime::default();
    r.enter("a = [1, 2, 3]; a(2)").unwrap();
    assert_eq!(r.result_scalar(), Some(2.0));
    r.enter("a(1)").unwrap();
    assert_eq!(r.result_scalar(), Some(1.0));
    assert!(r.enter("a(0)").is_err());
    assert_eq!(r.errors().last().unwrap().code(), ErrorCode::Math);
}

#[test]
fn test_division_by_zero() {
    let mut r = Runtime::default();
    assert_eq!(
        enter(&mut r, "x = 5; x / 0"),
        "Error: Division by zero. (line 1, pos 9)\n"
    );
    assert_eq!(r.result_scalar(), None);
}

#[test]
fn test_immediate_break() {
    let mut r = Runtime::default();
    assert_eq!(enter(&mut r, "loop { break }"), "");
    assert_eq!(r.line_count(), 1);
    assert!(r.errors().is_empty());
}

#[test]
fn test_mixed_algebras() {
    let mut r = Runtime::default();
    let e = r
        .enter("a = VecE3(1, 0, 0); b = VecP3(1, 0, 0); a + b")
        .unwrap_err();
    assert_eq!(e.code(), ErrorCode::InvalidMVType);
    assert_eq!(e.text(), "Multivectors 'a' and 'b' are from different spaces.");
}
