use super::Ctx;
use crate::error;
use crate::lang::{BinaryOp, Error, UnaryOp};
use crate::mach::{Data, TensorView};
use crate::math::{fmt_scalar, Color, Matrix, MultiVector, Tensor, TensorIdx};
use std::cell::Cell;

type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Copy)]
enum Num {
    Int(i64, bool),
    Real(f64),
}

impl Num {
    fn of(data: &Data) -> Option<Num> {
        Some(match data {
            Data::Int(n) => Num::Int(i64::from(*n), false),
            Data::UInt(n) => Num::Int(i64::from(*n), false),
            Data::Long(n) => Num::Int(*n, true),
            Data::Float(n) => Num::Real(f64::from(*n)),
            Data::Double(n) => Num::Real(*n),
            _ => return None,
        })
    }

    fn real(self) -> f64 {
        match self {
            Num::Int(n, _) => n as f64,
            Num::Real(v) => v,
        }
    }
}

fn int_data(v: i64, long: bool) -> Data {
    if long {
        Data::Long(v)
    } else if v >= i64::from(i32::min_value()) && v <= i64::from(i32::max_value()) {
        Data::Int(v as i32)
    } else {
        Data::Double(v as f64)
    }
}

fn truth(b: bool) -> Data {
    Data::Int(if b { 1 } else { 0 })
}

fn type_error(op: BinaryOp, l: &Data, r: &Data) -> Error {
    Error::invalid_types(l.kind().name(), r.kind().name(), op.as_str())
}

fn div_by_zero() -> Error {
    error!(Math; "Division by zero.")
}

fn scalar(op: BinaryOp, a: Num, b: Num, cx: &Ctx) -> Result<Data> {
    use BinaryOp::*;
    let (x, y) = (a.real(), b.real());
    let ints = match (a, b) {
        (Num::Int(i, li), Num::Int(j, lj)) => Some((i, j, li || lj)),
        _ => None,
    };
    let data = match op {
        Add | Sub | Mul | Outer | Inner => {
            let checked = ints.and_then(|(i, j, long)| {
                let v = match op {
                    Add => i.checked_add(j),
                    Sub => i.checked_sub(j),
                    _ => i.checked_mul(j),
                };
                v.map(|v| int_data(v, long))
            });
            match checked {
                Some(data) => data,
                None => Data::Double(match op {
                    Add => x + y,
                    Sub => x - y,
                    _ => x * y,
                }),
            }
        }
        Div => {
            if y.abs() <= cx.sensitivity {
                return Err(div_by_zero());
            }
            Data::Double(x / y)
        }
        Mod => match ints {
            Some((_, 0, _)) => return Err(div_by_zero()),
            Some((i, j, long)) => int_data(i.wrapping_rem(j), long),
            None => {
                if y.abs() <= cx.sensitivity {
                    return Err(div_by_zero());
                }
                Data::Double(x % y)
            }
        },
        Pow => {
            let exact = ints.and_then(|(i, j, long)| {
                if j < 0 || j > i64::from(u32::max_value()) {
                    return None;
                }
                i.checked_pow(j as u32).map(|v| int_data(v, long))
            });
            match exact {
                Some(data) => data,
                None => Data::Double(x.powf(y)),
            }
        }
        Eq | Ne => {
            let same = match ints {
                Some((i, j, _)) => i == j,
                None => (x - y).abs() <= cx.sensitivity,
            };
            truth(same == (op == Eq))
        }
        Lt => truth(x < y),
        Gt => truth(x > y),
        Le => truth(x <= y),
        Ge => truth(x >= y),
        And => truth(x != 0.0 && y != 0.0),
        Or => truth(x != 0.0 || y != 0.0),
        _ => return Err(type_error(op, &Data::Double(x), &Data::Double(y))),
    };
    Ok(data)
}

/// Text used when a value is joined to a string.
fn text(data: &Data) -> Option<String> {
    Some(match data {
        Data::Str(s) => s.clone(),
        Data::Int(n) => n.to_string(),
        Data::UInt(n) => n.to_string(),
        Data::Long(n) => n.to_string(),
        Data::Float(n) => fmt_scalar(f64::from(*n)),
        Data::Double(n) => fmt_scalar(*n),
        Data::MultiV(mv) => mv.to_string(),
        Data::Matrix(m) => m.to_string(),
        Data::Color(c) => c.to_string(),
        Data::Tensor(t) => t.to_string(),
        _ => return None,
    })
}

fn view(view: TensorIdx) -> Data {
    Data::TensorIdx(TensorView { view, source: None })
}

fn tensor_zip(a: &Tensor, b: &Tensor, f: &dyn Fn(f64, f64) -> f64) -> Option<Tensor> {
    if a.dims() != b.dims() {
        return None;
    }
    let data = a
        .as_slice()
        .iter()
        .zip(b.as_slice().iter())
        .map(|(x, y)| f(*x, *y))
        .collect();
    Tensor::from_data(a.dims(), data)
}

/// Element by element combination of numeric containers with each other
/// or with scalars. `None` when neither operand is such a container.
fn ewise(l: &Data, r: &Data, f: &dyn Fn(f64, f64) -> f64) -> Option<Result<Data>> {
    let ls = l.as_scalar();
    let rs = r.as_scalar();
    let dims = || error!(InvalidType; "Operands have different dimensions.");
    Some(match (l, r, ls, rs) {
        (Data::Matrix(a), Data::Matrix(b), _, _) => {
            a.zip(b, |x, y| f(x, y)).map(Data::Matrix).ok_or_else(dims)
        }
        (Data::Matrix(a), _, _, Some(s)) => Ok(Data::Matrix(a.map(|x| f(x, s)))),
        (_, Data::Matrix(b), Some(s), _) => Ok(Data::Matrix(b.map(|y| f(s, y)))),
        (Data::Tensor(a), Data::Tensor(b), _, _) => {
            tensor_zip(a, b, f).map(Data::Tensor).ok_or_else(dims)
        }
        (Data::Tensor(a), _, _, Some(s)) => Ok(Data::Tensor(a.map(|x| f(x, s)))),
        (_, Data::Tensor(b), Some(s), _) => Ok(Data::Tensor(b.map(|y| f(s, y)))),
        (Data::TensorIdx(a), Data::TensorIdx(b), _, _) => a
            .view
            .combine(&b.view, |x, y| f(x, y))
            .map(view)
            .ok_or_else(|| error!(InvalidType; "Tensor indices do not match.")),
        (Data::TensorIdx(a), _, _, Some(s)) => Ok(view(a.view.map(|x| f(x, s)))),
        (_, Data::TensorIdx(b), Some(s), _) => Ok(view(b.view.map(|y| f(s, y)))),
        _ => return None,
    })
}

fn mv_pair<F>(l: &MultiVector, r: &MultiVector, cx: &Ctx, f: F) -> Result<Data>
where
    F: Fn(&MultiVector, &MultiVector) -> Option<MultiVector>,
{
    match f(l, r) {
        Some(mv) => Ok(Data::MultiV(mv)),
        None => Err(Error::invalid_mv_type(&cx.l_name, &cx.r_name)),
    }
}

fn add(l: &Data, r: &Data, cx: &Ctx) -> Result<Data> {
    match (l, r) {
        (Data::Str(a), _) => match text(r) {
            Some(b) => Ok(Data::Str(format!("{}{}", a, b))),
            None => Err(type_error(BinaryOp::Add, l, r)),
        },
        (_, Data::Str(b)) => match text(l) {
            Some(a) => Ok(Data::Str(format!("{}{}", a, b))),
            None => Err(type_error(BinaryOp::Add, l, r)),
        },
        (Data::MultiV(a), Data::MultiV(b)) => mv_pair(a, b, cx, MultiVector::add),
        (Data::MultiV(a), _) if r.as_scalar().is_some() => {
            Ok(Data::MultiV(a.add_scalar(r.as_scalar().unwrap_or(0.0))))
        }
        (_, Data::MultiV(b)) if l.as_scalar().is_some() => {
            Ok(Data::MultiV(b.add_scalar(l.as_scalar().unwrap_or(0.0))))
        }
        (Data::Color(a), Data::Color(b)) => Ok(Data::Color(a.add(*b))),
        (Data::Image(a), Data::Image(b)) => match a.zip(b, Color::add) {
            Some(image) => Ok(Data::Image(image)),
            None => Err(error!(InvalidType; "Images have different sizes.")),
        },
        (Data::Image(a), Data::Color(c)) => Ok(Data::Image(a.map(|p| p.add(*c)))),
        _ => ewise(l, r, &|x, y| x + y).unwrap_or_else(|| Err(type_error(BinaryOp::Add, l, r))),
    }
}

fn sub(l: &Data, r: &Data, cx: &Ctx) -> Result<Data> {
    match (l, r) {
        (Data::MultiV(a), Data::MultiV(b)) => mv_pair(a, b, cx, MultiVector::sub),
        (Data::MultiV(a), _) if r.as_scalar().is_some() => {
            Ok(Data::MultiV(a.add_scalar(-r.as_scalar().unwrap_or(0.0))))
        }
        (_, Data::MultiV(b)) if l.as_scalar().is_some() => {
            Ok(Data::MultiV(b.scale(-1.0).add_scalar(l.as_scalar().unwrap_or(0.0))))
        }
        (Data::Color(a), Data::Color(b)) => Ok(Data::Color(a.sub(*b))),
        (Data::Image(a), Data::Image(b)) => match a.zip(b, Color::sub) {
            Some(image) => Ok(Data::Image(image)),
            None => Err(error!(InvalidType; "Images have different sizes.")),
        },
        (Data::Image(a), Data::Color(c)) => Ok(Data::Image(a.map(|p| p.sub(*c)))),
        _ => ewise(l, r, &|x, y| x - y).unwrap_or_else(|| Err(type_error(BinaryOp::Sub, l, r))),
    }
}

fn mul(op: BinaryOp, l: &Data, r: &Data, cx: &Ctx) -> Result<Data> {
    let ls = l.as_scalar();
    let rs = r.as_scalar();
    match (l, r, ls, rs) {
        (Data::Matrix(a), Data::Matrix(b), _, _) if op == BinaryOp::Mul => match a.mul(b) {
            Some(m) => Ok(Data::Matrix(m)),
            None => Err(error!(InvalidType; "Matrix dimensions do not match for multiplication.")),
        },
        (Data::MultiV(a), Data::MultiV(b), _, _) => match op {
            BinaryOp::Outer => mv_pair(a, b, cx, MultiVector::op),
            BinaryOp::Inner => mv_pair(a, b, cx, MultiVector::ip),
            _ => mv_pair(a, b, cx, MultiVector::gp),
        },
        (Data::MultiV(a), _, _, Some(s)) => Ok(Data::MultiV(a.scale(s))),
        (_, Data::MultiV(b), Some(s), _) => Ok(Data::MultiV(b.scale(s))),
        (Data::TensorIdx(a), Data::TensorIdx(b), _, _) if op == BinaryOp::Mul => {
            match a.view.product(&b.view) {
                Some(v) => Ok(view(v)),
                None => Err(error!(InvalidType; "Tensor indices do not match.")),
            }
        }
        (Data::Color(a), Data::Color(b), _, _) => Ok(Data::Color(a.mul(*b))),
        (Data::Color(a), _, _, Some(s)) => Ok(Data::Color(a.scale(s as f32))),
        (_, Data::Color(b), Some(s), _) => Ok(Data::Color(b.scale(s as f32))),
        (Data::Image(a), Data::Image(b), _, _) => match a.zip(b, Color::mul) {
            Some(image) => Ok(Data::Image(image)),
            None => Err(error!(InvalidType; "Images have different sizes.")),
        },
        (Data::Image(a), Data::Color(c), _, _) => Ok(Data::Image(a.map(|p| p.mul(*c)))),
        (Data::Image(a), _, _, Some(s)) => Ok(Data::Image(a.map(|p| p.scale(s as f32)))),
        (Data::VertexList(v), _, _, Some(s)) => Ok(Data::VertexList(v.scale(s))),
        _ if op == BinaryOp::Mul => {
            ewise(l, r, &|x, y| x * y).unwrap_or_else(|| Err(type_error(op, l, r)))
        }
        (Data::Matrix(_), _, _, Some(_)) | (_, Data::Matrix(_), Some(_), _) => {
            ewise(l, r, &|x, y| x * y).unwrap_or_else(|| Err(type_error(op, l, r)))
        }
        _ => Err(type_error(op, l, r)),
    }
}

fn div(l: &Data, r: &Data, cx: &Ctx) -> Result<Data> {
    let rs = r.as_scalar();
    if let Some(s) = rs {
        if s.abs() <= cx.sensitivity {
            return Err(div_by_zero());
        }
    }
    let singular = || error!(Math; "Divisor has no inverse.");
    match (l, r, rs) {
        (_, Data::MultiV(b), _) => {
            let inv = b.inverse(cx.sensitivity).ok_or_else(singular)?;
            match l {
                Data::MultiV(a) => mv_pair(a, &inv, cx, MultiVector::gp),
                _ => match l.as_scalar() {
                    Some(s) => Ok(Data::MultiV(inv.scale(s))),
                    None => Err(type_error(BinaryOp::Div, l, r)),
                },
            }
        }
        (Data::MultiV(a), _, Some(s)) => Ok(Data::MultiV(a.scale(1.0 / s))),
        (_, Data::Matrix(b), _) => {
            let inv = b.inverse(cx.sensitivity).ok_or_else(singular)?;
            match l {
                Data::Matrix(a) => match a.mul(&inv) {
                    Some(m) => Ok(Data::Matrix(m)),
                    None => Err(error!(InvalidType; "Matrix dimensions do not match for division.")),
                },
                _ => match l.as_scalar() {
                    Some(s) => Ok(Data::Matrix(inv.map(|v| v * s))),
                    None => Err(type_error(BinaryOp::Div, l, r)),
                },
            }
        }
        (Data::Color(a), _, Some(s)) => Ok(Data::Color(a.scale((1.0 / s) as f32))),
        (Data::Image(a), _, Some(s)) => Ok(Data::Image(a.map(|p| p.scale((1.0 / s) as f32)))),
        _ => {
            let zero = Cell::new(false);
            let quotient = ewise(l, r, &|x, y| {
                if y.abs() <= cx.sensitivity {
                    zero.set(true);
                }
                x / y
            });
            match quotient {
                Some(_) if zero.get() => Err(div_by_zero()),
                Some(result) => result,
                None => Err(type_error(BinaryOp::Div, l, r)),
            }
        }
    }
}

fn pow(l: &Data, r: &Data, cx: &Ctx) -> Result<Data> {
    let n = match r.as_scalar() {
        Some(n) if n.fract() == 0.0 && n.abs() <= 1024.0 => n as i64,
        _ => return Err(type_error(BinaryOp::Pow, l, r)),
    };
    let singular = || error!(Math; "Base has no inverse.");
    match l {
        Data::Matrix(a) => {
            if a.rows() != a.cols() {
                return Err(error!(InvalidType; "Only square matrices have powers."));
            }
            let base = if n < 0 {
                a.inverse(cx.sensitivity).ok_or_else(singular)?
            } else {
                a.clone()
            };
            let mut m = Matrix::identity(a.rows());
            for _ in 0..n.abs() {
                m = m.mul(&base).unwrap_or(m);
            }
            Ok(Data::Matrix(m))
        }
        Data::MultiV(a) => {
            let base = if n < 0 {
                a.inverse(cx.sensitivity).ok_or_else(singular)?
            } else {
                a.clone()
            };
            let mut mv = MultiVector::scalar(a.algebra(), 1.0);
            for _ in 0..n.abs() {
                mv = mv.gp(&base).unwrap_or(mv);
            }
            Ok(Data::MultiV(mv))
        }
        _ => Err(type_error(BinaryOp::Pow, l, r)),
    }
}

fn equal(l: &Data, r: &Data, cx: &Ctx) -> Option<bool> {
    let close = |a: &[f64], b: &[f64]| {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() <= cx.sensitivity)
    };
    Some(match (l, r) {
        (Data::Str(a), Data::Str(b)) => a == b,
        (Data::MultiV(a), Data::MultiV(b)) => {
            a.same_algebra(b) && close(a.components(), b.components())
        }
        (Data::Matrix(a), Data::Matrix(b)) => {
            a.rows() == b.rows() && close(a.as_slice(), b.as_slice())
        }
        (Data::Tensor(a), Data::Tensor(b)) => {
            a.dims() == b.dims() && close(a.as_slice(), b.as_slice())
        }
        (Data::Color(a), Data::Color(b)) => a == b,
        (Data::Void, Data::Void) => true,
        _ if l.kind() != r.kind() => false,
        _ => return None,
    })
}

fn compare(op: BinaryOp, l: &Data, r: &Data, cx: &Ctx) -> Result<Data> {
    use BinaryOp::*;
    match (op, l, r) {
        (Eq, _, _) | (Ne, _, _) => match equal(l, r, cx) {
            Some(same) => Ok(truth(same == (op == Eq))),
            None => Err(type_error(op, l, r)),
        },
        (_, Data::Str(a), Data::Str(b)) => Ok(truth(match op {
            Lt => a < b,
            Gt => a > b,
            Le => a <= b,
            _ => a >= b,
        })),
        _ => Err(type_error(op, l, r)),
    }
}

fn first_non_finite(values: &[f64]) -> Option<f64> {
    values.iter().copied().find(|v| !v.is_finite())
}

/// Zero near-zero entries and reject results that are not real numbers.
fn finish(data: Data, cx: &Ctx) -> Result<Data> {
    let bad = match &data {
        Data::Double(v) => first_non_finite(&[*v]),
        Data::Float(v) => first_non_finite(&[f64::from(*v)]),
        Data::Matrix(m) => first_non_finite(m.as_slice()),
        Data::MultiV(mv) => first_non_finite(mv.components()),
        Data::Tensor(t) => first_non_finite(t.as_slice()),
        Data::TensorIdx(tv) => first_non_finite(tv.view.tensor().as_slice()),
        _ => None,
    };
    if let Some(v) = bad {
        return Err(Error::not_a_number(v));
    }
    match data {
        Data::Matrix(mut m) => {
            m.strip(cx.sensitivity);
            Ok(Data::Matrix(m))
        }
        Data::MultiV(mut mv) => {
            mv.strip(cx.sensitivity);
            Ok(Data::MultiV(mv))
        }
        Data::Tensor(mut t) => {
            t.strip(cx.sensitivity);
            Ok(Data::Tensor(t))
        }
        Data::TensorIdx(mut tv) => {
            tv.view.strip(cx.sensitivity);
            Ok(Data::TensorIdx(tv))
        }
        data => Ok(data),
    }
}

pub(super) fn binary(op: BinaryOp, l: &Data, r: &Data, cx: &Ctx) -> Result<Data> {
    use BinaryOp::*;
    let data = match (Num::of(l), Num::of(r)) {
        (Some(a), Some(b)) => scalar(op, a, b, cx)?,
        _ => match op {
            Add => add(l, r, cx)?,
            Sub => sub(l, r, cx)?,
            Mul | Outer | Inner => mul(op, l, r, cx)?,
            Div => div(l, r, cx)?,
            Pow => pow(l, r, cx)?,
            Meet => match (l, r) {
                (Data::MultiV(a), Data::MultiV(b)) => {
                    if !a.same_algebra(b) {
                        return Err(Error::invalid_mv_type(&cx.l_name, &cx.r_name));
                    }
                    match a.meet(b, cx.sensitivity) {
                        Some(mv) => Data::MultiV(mv),
                        None => return Err(error!(InvalidTypeDual)),
                    }
                }
                _ => return Err(type_error(op, l, r)),
            },
            Join => match (l, r) {
                (Data::MultiV(a), Data::MultiV(b)) => mv_pair(a, b, cx, MultiVector::join)?,
                _ => return Err(type_error(op, l, r)),
            },
            Eq | Ne | Lt | Gt | Le | Ge => compare(op, l, r, cx)?,
            _ => return Err(type_error(op, l, r)),
        },
    };
    finish(data, cx)
}

/// Element by element combination of matrices, used by the point
/// operators. Anything else falls back to the plain operator.
pub(super) fn pointwise(op: BinaryOp, l: &Data, r: &Data, cx: &Ctx) -> Result<Data> {
    let f = |x: f64, y: f64| -> Result<f64> {
        match scalar(op, Num::Real(x), Num::Real(y), cx)?.as_scalar() {
            Some(v) => Ok(v),
            None => Err(error!(Internal)),
        }
    };
    let m = match (l, r, l.as_scalar(), r.as_scalar()) {
        (Data::Matrix(a), Data::Matrix(b), _, _) => {
            if a.rows() != b.rows() || a.cols() != b.cols() {
                return Err(error!(InvalidType; "Matrices have different dimensions."));
            }
            let mut m = a.clone();
            for (v, y) in m.as_mut_slice().iter_mut().zip(b.as_slice()) {
                *v = f(*v, *y)?;
            }
            m
        }
        (Data::Matrix(a), _, _, Some(s)) => {
            let mut m = a.clone();
            for v in m.as_mut_slice() {
                *v = f(*v, s)?;
            }
            m
        }
        (_, Data::Matrix(b), Some(s), _) => {
            let mut m = b.clone();
            for v in m.as_mut_slice() {
                *v = f(s, *v)?;
            }
            m
        }
        _ => return binary(op, l, r, cx),
    };
    finish(Data::Matrix(m), cx)
}

pub(super) fn unary(op: UnaryOp, v: &Data, cx: &Ctx) -> Result<Data> {
    let invalid = || Error::invalid_type(&cx.l_name, v.kind().name(), op.as_str());
    let data = match op {
        UnaryOp::Negate => match v {
            Data::Int(n) => match n.checked_neg() {
                Some(n) => Data::Int(n),
                None => Data::Double(-f64::from(*n)),
            },
            Data::UInt(n) => int_data(-i64::from(*n), false),
            Data::Long(n) => match n.checked_neg() {
                Some(n) => Data::Long(n),
                None => Data::Double(-(*n as f64)),
            },
            Data::Float(n) => Data::Float(-n),
            Data::Double(n) => Data::Double(-n),
            Data::Matrix(m) => Data::Matrix(m.map(|x| -x)),
            Data::MultiV(mv) => Data::MultiV(mv.scale(-1.0)),
            Data::Tensor(t) => Data::Tensor(t.map(|x| -x)),
            Data::TensorIdx(tv) => view(tv.view.map(|x| -x)),
            Data::VertexList(vl) => Data::VertexList(vl.scale(-1.0)),
            _ => return Err(invalid()),
        },
        UnaryOp::Inverse => match v {
            Data::Matrix(m) => match m.inverse(cx.sensitivity) {
                Some(m) => Data::Matrix(m),
                None => return Err(error!(Math; "Matrix is singular.")),
            },
            Data::MultiV(mv) => match mv.inverse(cx.sensitivity) {
                Some(mv) => Data::MultiV(mv),
                None => return Err(error!(Math; "Multivector has no inverse.")),
            },
            _ => match v.as_scalar() {
                Some(x) if x.abs() <= cx.sensitivity => return Err(div_by_zero()),
                Some(x) => Data::Double(1.0 / x),
                None => return Err(invalid()),
            },
        },
        UnaryOp::Reverse => match v {
            Data::MultiV(mv) => Data::MultiV(mv.reverse()),
            Data::Matrix(m) => Data::Matrix(m.transpose()),
            Data::Str(s) => Data::Str(s.chars().rev().collect()),
            _ if v.as_scalar().is_some() => v.clone(),
            _ => return Err(invalid()),
        },
        UnaryOp::Involute => match v {
            Data::MultiV(mv) => Data::MultiV(mv.involute()),
            _ if v.as_scalar().is_some() => v.clone(),
            _ => return Err(invalid()),
        },
        UnaryOp::Dual => match v {
            Data::MultiV(mv) => match mv.dual(cx.sensitivity) {
                Some(mv) => Data::MultiV(mv),
                None => return Err(error!(InvalidTypeDual)),
            },
            _ => return Err(error!(InvalidTypeDual)),
        },
        UnaryOp::Not => match v.as_scalar() {
            Some(x) => truth(x == 0.0),
            None => return Err(invalid()),
        },
        UnaryOp::Print | UnaryOp::Draw => return Err(error!(Internal)),
    };
    finish(data, cx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Algebra;

    fn cx() -> Ctx {
        Ctx {
            sensitivity: 1e-12,
            l_name: "a".to_string(),
            r_name: "b".to_string(),
        }
    }

    #[test]
    fn test_integer_arithmetic() {
        let r = binary(BinaryOp::Add, &Data::Int(3), &Data::Int(4), &cx()).unwrap();
        assert_eq!(r, Data::Int(7));
        let r = binary(BinaryOp::Mul, &Data::Int(i32::max_value()), &Data::Int(2), &cx()).unwrap();
        assert_eq!(r, Data::Double(f64::from(i32::max_value()) * 2.0));
        let r = binary(BinaryOp::Div, &Data::Int(7), &Data::Int(2), &cx()).unwrap();
        assert_eq!(r, Data::Double(3.5));
        let r = binary(BinaryOp::Pow, &Data::Int(2), &Data::Int(10), &cx()).unwrap();
        assert_eq!(r, Data::Int(1024));
    }

    #[test]
    fn test_division_by_zero() {
        let e = binary(BinaryOp::Div, &Data::Int(1), &Data::Double(0.0), &cx()).unwrap_err();
        assert_eq!(e.code(), crate::lang::ErrorCode::Math);
        let e = binary(BinaryOp::Mod, &Data::Int(1), &Data::Int(0), &cx()).unwrap_err();
        assert_eq!(e.code(), crate::lang::ErrorCode::Math);
    }

    fn tensor(values: &[f64]) -> Data {
        Data::Tensor(Tensor::from_data(&[values.len()], values.to_vec()).unwrap())
    }

    #[test]
    fn test_tensor_division_by_zero() {
        let div = |l: &Data, r: &Data| binary(BinaryOp::Div, l, r, &cx());
        let e = div(&tensor(&[1.0, 2.0]), &tensor(&[0.0, 0.0])).unwrap_err();
        assert_eq!(e.text(), "Division by zero.");
        let e = div(&tensor(&[1.0, 2.0]), &tensor(&[2.0, 0.0])).unwrap_err();
        assert_eq!(e.text(), "Division by zero.");
        let e = div(&Data::Int(1), &tensor(&[0.0, 1.0])).unwrap_err();
        assert_eq!(e.text(), "Division by zero.");
        let e = div(&tensor(&[1.0, 2.0]), &Data::Int(0)).unwrap_err();
        assert_eq!(e.text(), "Division by zero.");
        let ok = div(&tensor(&[1.0, 3.0]), &tensor(&[2.0, 4.0])).unwrap();
        assert_eq!(ok, tensor(&[0.5, 0.75]));
    }

    #[test]
    fn test_index_view_division_by_zero() {
        let t = Tensor::from_data(&[2], vec![1.0, 2.0]).unwrap();
        let z = Tensor::from_data(&[2], vec![1.0, 0.0]).unwrap();
        let l = view(TensorIdx::whole(t));
        let r = view(TensorIdx::whole(z));
        let e = binary(BinaryOp::Div, &l, &r, &cx()).unwrap_err();
        assert_eq!(e.code(), crate::lang::ErrorCode::Math);
    }

    #[test]
    fn test_non_finite_containers() {
        let huge = Data::Matrix(Matrix::from_rows(&[vec![f64::MAX, 1.0]]).unwrap());
        let e = binary(BinaryOp::Mul, &huge, &Data::Int(10), &cx()).unwrap_err();
        assert_eq!(e.code(), crate::lang::ErrorCode::Math);
        let e = binary(BinaryOp::Add, &tensor(&[f64::MAX]), &tensor(&[f64::MAX]), &cx());
        assert_eq!(e.unwrap_err().code(), crate::lang::ErrorCode::Math);
    }

    #[test]
    fn test_not_a_number() {
        let e = binary(BinaryOp::Pow, &Data::Double(-8.0), &Data::Double(0.5), &cx()).unwrap_err();
        assert_eq!(e.code(), crate::lang::ErrorCode::Math);
    }

    #[test]
    fn test_string_join() {
        let r = binary(BinaryOp::Add, &Data::Str("x = ".into()), &Data::Double(0.5), &cx());
        assert_eq!(r.unwrap(), Data::Str("x = 0.5".into()));
    }

    #[test]
    fn test_multivector_spaces() {
        let a = Data::MultiV(MultiVector::basis(Algebra::E3, 1));
        let b = Data::MultiV(MultiVector::basis(Algebra::P3, 1));
        let e = binary(BinaryOp::Outer, &a, &b, &cx()).unwrap_err();
        assert_eq!(e.code(), crate::lang::ErrorCode::InvalidMVType);
    }

    #[test]
    fn test_matrix_pointwise() {
        let a = Matrix::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        let r = pointwise(BinaryOp::Mul, &Data::Matrix(a.clone()), &Data::Matrix(a), &cx());
        match r.unwrap() {
            Data::Matrix(m) => assert_eq!(m.as_slice(), &[1.0, 4.0, 9.0, 16.0]),
            _ => panic!(),
        }
    }

    #[test]
    fn test_unary() {
        assert_eq!(unary(UnaryOp::Negate, &Data::Int(3), &cx()).unwrap(), Data::Int(-3));
        assert_eq!(unary(UnaryOp::Not, &Data::Int(0), &cx()).unwrap(), Data::Int(1));
        let e = unary(UnaryOp::Dual, &Data::Int(3), &cx()).unwrap_err();
        assert_eq!(e.code(), crate::lang::ErrorCode::InvalidTypeDual);
        let e = unary(UnaryOp::Inverse, &Data::Int(0), &cx()).unwrap_err();
        assert_eq!(e.code(), crate::lang::ErrorCode::Math);
    }
}
