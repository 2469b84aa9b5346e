use super::*;
use crate::lang::ErrorCode;

#[test]
fn test_print() {
    assert_eq!(run("a = 3; ?a"), "a = 3\n");
    assert_eq!(run("?1 + 2"), "# = 3\n");
    assert_eq!(run("b = 3; a -> b; ?a"), "a -> 3\n");
}

#[test]
fn test_reference_writes_through() {
    assert_eq!(run("b = 3; a -> b; a = 5; ?b"), "b = 5\n");
}

#[test]
fn test_list_element_assignment() {
    assert_eq!(run("a = [1, 2, 3]; a(2) = 5; ?a"), "a = [1, 5, 3]\n");
    assert_eq!(run("a = [[1, 2], 3]; a(1, 2) = 7; ?a"), "a = [[1, 7], 3]\n");
}

#[test]
fn test_list_copies_are_independent() {
    assert_eq!(run("a = [1, 2]; b = a; b(1) = 9; ?a; ?b"), "a = [1, 2]\nb = [9, 2]\n");
}

#[test]
fn test_destructuring() {
    assert_eq!(run("[x, y] = [1, 2]; ?x; ?y"), "x = 1\ny = 2\n");
}

#[test]
fn test_lookup_by_name() {
    let mut r = Runtime::default();
    r.enter("x = 4; l = [x, 2]; l(\"x\")").unwrap();
    assert_eq!(r.result_scalar(), Some(4.0));
    r.enter("l(\"y\")").unwrap();
    assert_eq!(r.result_string().as_deref(), Some("void"));
}

#[test]
fn test_strings() {
    assert_eq!(run("s = \"ab\"; s << \"c\"; s << 1; ?s"), "s = abc1\n");
    assert_eq!(run("s = \"hello\"; ?s(2, 4)"), "# = ell\n");
}

#[test]
fn test_matrix_element_assignment() {
    assert_eq!(
        run("M = Matrix([[1, 2], [3, 4]]); M(2, 1) = 7; ?M"),
        "M = (1, 2 | 7, 4)\n"
    );
}

#[test]
fn test_user_function() {
    assert_eq!(run("f = { _P(1) * 2 }; ?f(4)"), "# = 8\n");
}

#[test]
fn test_recursion_through_global() {
    let text = "fact = {
        n = _P(1);
        r = 1;
        if (n > 1) { r = n * ::fact(n - 1); }
        r
    }
    ?fact(5)";
    assert_eq!(run(text), "# = 120\n");
}

#[test]
fn test_locals_do_not_leak() {
    let mut r = Runtime::default();
    r.enter("f = { t = 1; t }; f()").unwrap();
    assert!(!r.storage().var_names().iter().any(|n| &**n == "t"));
}

#[test]
fn test_division_by_zero() {
    assert_eq!(run("x = 5; x / 0"), "Error: Division by zero. (line 1, pos 9)\n");
}

#[test]
fn test_assign_to_constant() {
    let mut r = Runtime::default();
    assert!(r.enter("Pi = 3").is_err());
    assert_eq!(r.errors().last().unwrap().code(), ErrorCode::InvalidLVal);
}

#[test]
fn test_mixed_algebras() {
    let mut r = Runtime::default();
    assert!(r.enter("a = VecE3(1, 0, 0); b = VecP3(1, 0, 0); a + b").is_err());
    assert_eq!(r.errors().last().unwrap().code(), ErrorCode::InvalidMVType);
    assert_eq!(r.result_scalar(), None);
}
