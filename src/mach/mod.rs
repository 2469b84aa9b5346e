/*!
## Rust Machine Module

This Rust module executes the element lists built by the parser. Values
live in a generational heap and are reached through variable tables,
per-statement temporaries and an operand stack. Operators, built-in
functions and output formatting all work on heap handles.

*/

mod config;
mod exec;
mod function;
mod heap;
mod kind;
mod operation;
mod output;
mod render;
mod runtime;
mod stack;
mod storage;
mod value;
mod var;

pub use config::{Config, ConfigError};
pub use exec::Flow;
pub use function::Builtin;
pub use heap::{Heap, ValueId};
pub use kind::Kind;
pub use output::{format_value, Output};
pub use render::{Drawable, NullRenderer, RecordingRenderer, Renderer, Scene};
pub use runtime::Runtime;
pub use stack::Stack;
pub use storage::{Namespace, Storage};
pub use value::{Alias, Data, Field, TensorView, Value};
pub use var::VarMap;

#[cfg(test)]
mod tests;
