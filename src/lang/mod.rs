/*!
# Rust Language Module

This Rust module turns script text into executable element lists.
Text is first pre-parsed into lines of bytes with keywords and
multi-character operators folded into special symbols, then a
handler-driven operator precedence parser builds postfix lists.

*/

#[macro_use]
mod error;
mod handler;
mod include;
mod operator;
mod parser;
mod text;

pub use error::{Error, ErrorCode, ErrorList, Level};
pub use include::{IncludeDir, Includes, NoIncludes};
pub use operator::{BinaryOp, UnaryOp};
pub use parser::{parse, parse_with, Line};
pub use text::{open_brackets, preparse, preparse_with, TextLine};

pub mod ast;

pub type LineNumber = Option<usize>;
pub type Column = std::ops::Range<usize>;

#[cfg(test)]
mod tests;
