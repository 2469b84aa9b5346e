use super::*;
use crate::lang::ErrorCode;
use crate::mach::{Config, Namespace};
use std::sync::atomic::Ordering;

#[test]
fn test_break_out_of_loop() {
    let text = "i = 0;
    loop {
        i = i + 1;
        if (i >= 5) { break; }
    }
    ?i";
    assert_eq!(run(text), "i = 5\n");
}

#[test]
fn test_break_only_leaves_inner_loop() {
    let text = "n = 0; i = 0;
    loop {
        i = i + 1;
        if (i > 3) { break; }
        j = 0;
        loop {
            j = j + 1;
            if (j > 2) { break; }
            n = n + 1;
        }
    }
    ?n";
    assert_eq!(run(text), "n = 6\n");
}

#[test]
fn test_immediate_break() {
    assert_eq!(run("loop { break }"), "");
}

#[test]
fn test_loop_limit() {
    let config = Config {
        loop_limit: 50,
        ..Config::default()
    };
    let mut r = Runtime::with_config(config);
    assert!(r.enter("i = 0; loop { i = i + 1; }").is_err());
    assert_eq!(r.errors().last().unwrap().code(), ErrorCode::MaxLoopCount);
    let i = r.storage().get_var("i", Namespace::Global);
    assert_eq!(r.storage().heap().cast_to_scalar(i, 0.0), Some(50.0));
}

#[test]
fn test_break_at_top_level_stops_run() {
    let mut r = Runtime::default();
    r.enter("break; a = 1").unwrap();
    let a = r.storage().get_var("a", Namespace::Global);
    assert!(r.storage().is_invalid(a));
}

#[test]
fn test_interrupt() {
    let mut r = Runtime::default();
    r.interrupt_handle().store(true, Ordering::SeqCst);
    assert!(r.enter("loop { a = 1; }").is_err());
    assert_eq!(r.errors().last().unwrap().code(), ErrorCode::General);
}
