use super::ast::{Element, ElementList};
use super::*;
use crate::mach::{Data, Storage};

/// Postfix shape of a statement, one token per element.
fn shape(list: &ElementList) -> Vec<String> {
    list.iter()
        .map(|entry| match &entry.element {
            Element::Literal(_) => "lit".to_string(),
            Element::Label { name, global } => {
                if *global {
                    format!("::{}", name)
                } else {
                    name.to_string()
                }
            }
            Element::Unary(op) => format!("u{}", op.as_str()),
            Element::Binary(op) => op.as_str().to_string(),
            Element::FunctionCall(name) => format!("{}()", name),
            Element::ListBuilder { by_ref, parts } => {
                if *by_ref {
                    format!("args{}", parts.len())
                } else {
                    format!("list{}", parts.len())
                }
            }
            Element::List(_) => "group".to_string(),
            Element::Loop(_) => "loop".to_string(),
            Element::Break => "break".to_string(),
            Element::Branch { .. } => "if".to_string(),
        })
        .collect()
}

fn parse_one(text: &str) -> Vec<String> {
    let mut st = Storage::default();
    let lines = parse(text, &mut st).unwrap();
    assert_eq!(lines.len(), 1, "{:?}", lines);
    shape(&lines[0].statement)
}

fn literal(text: &str) -> Data {
    let mut st = Storage::default();
    let lines = parse(text, &mut st).unwrap();
    let id = lines[0].literals[0];
    st.heap().value(id).unwrap().data().clone()
}

#[test]
fn test_precedence() {
    assert_eq!(parse_one("a = b + 2 * c"), ["a", "b", "lit", "c", "*", "+", "="]);
    assert_eq!(parse_one("(a + b) * c"), ["group", "c", "*"]);
    assert_eq!(parse_one("-a * b"), ["a", "u-", "b", "*"]);
    assert_eq!(parse_one("a ^ b . c"), ["a", "b", "^", "c", "."]);
}

#[test]
fn test_associativity() {
    assert_eq!(parse_one("a - b - c"), ["a", "b", "-", "c", "-"]);
    assert_eq!(parse_one("a = b = 1"), ["a", "b", "lit", "=", "="]);
}

#[test]
fn test_calls_and_lists() {
    assert_eq!(parse_one("f(1, x)"), ["f", "args2", "call"]);
    assert_eq!(parse_one("sin(x)"), ["args1", "sin()"]);
    assert_eq!(parse_one("[1, 2, 3]"), ["list3"]);
    assert_eq!(parse_one("(1, 2)"), ["list2"]);
    assert_eq!(parse_one("::g = a(2)"), ["::g", "a", "args1", "call", "="]);
}

#[test]
fn test_statements() {
    let mut st = Storage::default();
    let lines = parse("a = 1; b = 2\nc = 3;;", &mut st).unwrap();
    let numbers: Vec<LineNumber> = lines.iter().map(|l| l.number).collect();
    assert_eq!(numbers, vec![Some(1), Some(1), Some(2)]);
}

#[test]
fn test_blocks() {
    let mut st = Storage::default();
    let lines = parse("f = {\n  x = 1;\n  x + 1\n}", &mut st).unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(shape(&lines[0].statement), ["f", "lit", "="]);
    let code = *lines[0].literals.last().unwrap();
    match st.heap().value(code).unwrap().data() {
        Data::Code(block) => assert_eq!(block.len(), 2),
        other => panic!("{:?}", other),
    }
}

#[test]
fn test_control_flow() {
    assert_eq!(parse_one("if (a > 1) { b = 1; } else { b = 2; }"), ["if"]);
    assert_eq!(parse_one("loop { break; }"), ["loop"]);
    let mut st = Storage::default();
    let lines = parse("if (a) { b }\nelse { c }", &mut st).unwrap();
    assert_eq!(lines.len(), 1);
    match &lines[0].statement.last().unwrap().element {
        Element::Branch { otherwise, .. } => assert!(otherwise.is_some()),
        other => panic!("{:?}", other),
    }
}

#[test]
fn test_numbers() {
    assert_eq!(literal("12"), Data::Int(12));
    assert_eq!(literal("1.5"), Data::Double(1.5));
    assert_eq!(literal(".5"), Data::Double(0.5));
    assert_eq!(literal("2e3"), Data::Double(2000.0));
    assert_eq!(literal("2f"), Data::Float(2.0));
    assert_eq!(literal("3d"), Data::Double(3.0));
    assert_eq!(literal("0x1F"), Data::Int(31));
    assert_eq!(literal("3000000000"), Data::Long(3_000_000_000));
}

#[test]
fn test_strings() {
    assert_eq!(literal(r#""a\tb""#), Data::Str("a\tb".to_string()));
    assert_eq!(literal(r#"@"a\tb""#), Data::Str("a\\tb".to_string()));
}

#[test]
fn test_parse_errors() {
    let code = |text: &str| {
        let mut st = Storage::default();
        parse(text, &mut st).unwrap_err().code()
    };
    assert_eq!(code("a = (1"), ErrorCode::MissingCloseRound);
    assert_eq!(code("a = 1)"), ErrorCode::MissingOpenRound);
    assert_eq!(code("a = [1,,2]"), ErrorCode::UnexpectedComma);
    assert_eq!(code("f = { a"), ErrorCode::MissingCloseCurly);
    assert_eq!(code("a = 1 !"), ErrorCode::NonBinaryOp);
    assert_eq!(code("a = 1 #"), ErrorCode::UnknownSymbol);
    assert_eq!(code("a b"), ErrorCode::UnexpectedSymbol);
    assert_eq!(code("if a"), ErrorCode::MissingIfCondition);
}

#[test]
fn test_error_location() {
    let mut st = Storage::default();
    let e = parse("a = 1;\nb = 2 #", &mut st).unwrap_err();
    assert_eq!(e.line_number(), Some(2));
    assert_eq!(e.column().start, 6);
}

#[test]
fn test_failed_parse_releases_literals() {
    let mut st = Storage::default();
    let before = st.heap().len();
    assert!(parse("a = 1; b = \"x\"; c = (2", &mut st).is_err());
    assert_eq!(st.heap().len(), before);
}

#[test]
fn test_nesting_limit() {
    let nested = |depth: usize| format!("a = {}1{}", "(".repeat(depth), ")".repeat(depth));
    let mut st = Storage::default();
    assert!(parse(&nested(100), &mut st).is_ok());
    let before = st.heap().len();
    let e = parse(&nested(3000), &mut st).unwrap_err();
    assert_eq!(e.code(), ErrorCode::ParseOutOfMemory);
    assert_eq!(st.heap().len(), before);
    let chain = format!("a{}1", " = a".repeat(3000));
    assert_eq!(parse(&chain, &mut st).unwrap_err().code(), ErrorCode::ParseOutOfMemory);
}

#[test]
fn test_parse_with_include() {
    let mut files = std::collections::HashMap::new();
    files.insert("lib.clu".to_string(), "b = 2;\n#include \"main.clu\"".to_string());
    files.insert("two.clu".to_string(), "b = 2; c = 3;".to_string());
    let mut st = Storage::default();
    let lines = parse_with("a = 1;\n#include \"two.clu\"", &files, &[], &mut st).unwrap();
    assert_eq!(lines.len(), 3);
    let open = vec!["main.clu".to_string()];
    let e = parse_with("#include \"lib.clu\"", &files, &open, &mut st).unwrap_err();
    assert_eq!(e.code(), ErrorCode::RecursiveInclude);
}
