/*!
## Rust Math Module

Numeric kernels that sit behind the opaque value kinds of the engine.
They know nothing about values, variables or diagnostics; a failed
operation is an `Option::None` that the caller turns into an error.

*/

mod color;
mod image;
mod matrix;
mod multivector;
mod tensor;
mod vertex;

pub use color::Color;
pub use image::Image;
pub use matrix::Matrix;
pub use multivector::{Algebra, MultiVector};
pub use tensor::{Tensor, TensorIdx};
pub use vertex::VertexList;

/// Format a scalar the way the engine prints numbers: integral values
/// without a fractional part, everything else with up to 12 significant
/// decimals and no trailing zeros.
pub fn fmt_scalar(v: f64) -> String {
    if v == 0.0 {
        return "0".to_string();
    }
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 {
        return format!("{}", v as i64);
    }
    let s = format!("{:.12}", v);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "0" || s == "-0" || s.is_empty() {
        format!("{:e}", v)
    } else {
        s.to_string()
    }
}

/// Snap `v` to the nearest integer when it lies within `sensitivity` of it.
pub fn snap(v: f64, sensitivity: f64) -> f64 {
    let r = v.round();
    if (v - r).abs() <= sensitivity {
        r
    } else {
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fmt_scalar() {
        assert_eq!(fmt_scalar(7.0), "7");
        assert_eq!(fmt_scalar(-2.0), "-2");
        assert_eq!(fmt_scalar(0.25), "0.25");
        assert_eq!(fmt_scalar(1.0 / 3.0), "0.333333333333");
        assert_eq!(fmt_scalar(-0.0), "0");
    }

    #[test]
    fn test_snap() {
        assert_eq!(snap(2.0 + 1e-14, 1e-12), 2.0);
        assert_eq!(snap(2.1, 1e-12), 2.1);
    }
}
