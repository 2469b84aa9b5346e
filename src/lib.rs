//! # CLU
//!
//! A dynamically typed scripting language for geometric algebra.
//!
//! Scripts manipulate scalars, strings, lists, matrices, tensors and
//! multivectors of the Euclidean, projective and conformal algebras of
//! three dimensional space. Objects handed to the `:` operator are
//! passed on to a renderer.
//!
//! ```
//! let mut runtime = clu::mach::Runtime::new();
//! runtime.enter("a = 2; b = a * 3 + 1").unwrap();
//! assert_eq!(runtime.result_scalar(), Some(7.0));
//! ```
//!
//! Run the `clu` executable for an interactive prompt, or pass it a
//! script file to run.

pub mod lang;
pub mod mach;
pub mod math;
