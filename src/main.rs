//! # CLU
//!
//! Interactive prompt and script runner for the CLU language.
//!

mod term;

fn main() {
    term::main();
}
