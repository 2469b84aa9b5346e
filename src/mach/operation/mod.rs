//! Operator dispatch.
//!
//! Operands arrive as heap handles and are looked at through their
//! dereferenced payload. Lists are handled here by recursion; everything
//! else is computed on plain payloads in `arith`.

mod arith;
mod assign;
mod element;

pub use assign::assign;
pub use element::element;

use super::{Data, Kind, Storage, ValueId};
use crate::error;
use crate::lang::{BinaryOp, Error, UnaryOp};

type Result<T> = std::result::Result<T, Error>;

/// What the payload kernels need to know about their operands.
struct Ctx {
    sensitivity: f64,
    l_name: String,
    r_name: String,
}

impl Ctx {
    fn new(st: &Storage, l: ValueId, r: ValueId) -> Result<Ctx> {
        Ok(Ctx {
            sensitivity: st.sensitivity(),
            l_name: display_name(st, l)?,
            r_name: display_name(st, r)?,
        })
    }
}

fn display_name(st: &Storage, id: ValueId) -> Result<String> {
    let name = st.heap.value(id)?.name();
    Ok(if name.is_empty() {
        "constant".to_string()
    } else {
        name.to_string()
    })
}

fn is_list(st: &Storage, id: ValueId) -> Result<bool> {
    Ok(st.heap.base_kind(id)? == Kind::List)
}

/// Collect computed payloads into fresh list elements, releasing what
/// was built so far on failure.
fn collect<I, F>(st: &mut Storage, items: I, mut f: F) -> Result<Data>
where
    I: IntoIterator<Item = (ValueId, ValueId)>,
    F: FnMut(&mut Storage, ValueId, ValueId) -> Result<Data>,
{
    let mut out = vec![];
    for (a, b) in items {
        match f(st, a, b) {
            Ok(data) => out.push(st.heap.alloc("", data)),
            Err(e) => {
                out.into_iter().for_each(|id| st.heap.destroy(id));
                return Err(e);
            }
        }
    }
    Ok(Data::List(out))
}

/// Pair up the elements of two lists, or broadcast a non-list operand
/// across the elements of the list on the other side.
fn zip_lists<F>(st: &mut Storage, l: ValueId, r: ValueId, f: F) -> Result<Data>
where
    F: FnMut(&mut Storage, ValueId, ValueId) -> Result<Data>,
{
    let le = if is_list(st, l)? {
        Some(st.heap.elements(l)?)
    } else {
        None
    };
    let re = if is_list(st, r)? {
        Some(st.heap.elements(r)?)
    } else {
        None
    };
    let pairs: Vec<(ValueId, ValueId)> = match (le, re) {
        (Some(a), Some(b)) => {
            if a.len() != b.len() {
                return Err(error!(InvalidType; "Lists have different lengths."));
            }
            a.into_iter().zip(b).collect()
        }
        (Some(a), None) => a.into_iter().map(|x| (x, r)).collect(),
        (None, Some(b)) => b.into_iter().map(|y| (l, y)).collect(),
        (None, None) => return Err(error!(Internal)),
    };
    collect(st, pairs, f)
}

fn lists_equal(st: &mut Storage, l: ValueId, r: ValueId) -> Result<bool> {
    if !(is_list(st, l)? && is_list(st, r)?) {
        return Ok(false);
    }
    let a = st.heap.elements(l)?;
    let b = st.heap.elements(r)?;
    if a.len() != b.len() {
        return Ok(false);
    }
    for (x, y) in a.into_iter().zip(b) {
        let same = if is_list(st, x)? || is_list(st, y)? {
            lists_equal(st, x, y)?
        } else {
            binary(st, BinaryOp::Eq, x, y)?.as_scalar() != Some(0.0)
        };
        if !same {
            return Ok(false);
        }
    }
    Ok(true)
}

/// `a ~ b`: the integers from `a` to `b`, counting down when `b < a`.
fn step(st: &mut Storage, l: ValueId, r: ValueId) -> Result<Data> {
    let precision = st.sensitivity();
    let bound = |st: &Storage, id: ValueId| -> Result<i64> {
        match st.heap.cast_to_counter(id, true, precision) {
            Some(v) => Ok(v),
            None => Err(Error::invalid_types(
                st.heap.base_kind(l)?.name(),
                st.heap.base_kind(r)?.name(),
                BinaryOp::Step.as_str(),
            )),
        }
    };
    let from = bound(st, l)?;
    let to = bound(st, r)?;
    let span = (i128::from(to) - i128::from(from)).unsigned_abs();
    if span >= st.config.loop_limit as u128 {
        return Err(error!(OutOfMemory; "Step list too long."));
    }
    let dir = if to < from { -1 } else { 1 };
    let elements = (0..=span as i64)
        .map(|i| {
            let v = from + dir * i;
            let data = if v >= i64::from(i32::min_value()) && v <= i64::from(i32::max_value()) {
                Data::Int(v as i32)
            } else {
                Data::Long(v)
            };
            st.heap.alloc("", data)
        })
        .collect();
    Ok(Data::List(elements))
}

pub fn unary(st: &mut Storage, op: UnaryOp, v: ValueId) -> Result<Data> {
    if is_list(st, v)? {
        let elements = st.heap.elements(v)?;
        let items = elements.into_iter().map(|e| (e, e));
        return collect(st, items, |st, e, _| unary(st, op, e));
    }
    let cx = Ctx::new(st, v, v)?;
    let data = st.heap.data(v)?;
    arith::unary(op, &data, &cx)
}

pub fn binary(st: &mut Storage, op: BinaryOp, l: ValueId, r: ValueId) -> Result<Data> {
    if let Some(base) = op.point_base() {
        return point(st, base, l, r);
    }
    if op == BinaryOp::Step {
        return step(st, l, r);
    }
    if is_list(st, l)? || is_list(st, r)? {
        return match op {
            BinaryOp::Eq | BinaryOp::Ne => {
                let same = lists_equal(st, l, r)?;
                Ok(Data::Int((same == (op == BinaryOp::Eq)) as i32))
            }
            op if op.recurses_lists() => zip_lists(st, l, r, |st, a, b| binary(st, op, a, b)),
            op => Err(Error::invalid_types(
                st.heap.base_kind(l)?.name(),
                st.heap.base_kind(r)?.name(),
                op.as_str(),
            )),
        };
    }
    let cx = Ctx::new(st, l, r)?;
    let ld = st.heap.data(l)?;
    let rd = st.heap.data(r)?;
    arith::binary(op, &ld, &rd, &cx)
}

/// Point operators recurse into lists pairwise, work element by element
/// on matrices, and otherwise behave like their base operator.
fn point(st: &mut Storage, base: BinaryOp, l: ValueId, r: ValueId) -> Result<Data> {
    if is_list(st, l)? || is_list(st, r)? {
        return zip_lists(st, l, r, |st, a, b| point(st, base, a, b));
    }
    let cx = Ctx::new(st, l, r)?;
    let ld = st.heap.data(l)?;
    let rd = st.heap.data(r)?;
    arith::pointwise(base, &ld, &rd, &cx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mach::Namespace;

    fn list(st: &mut Storage, values: &[i32]) -> ValueId {
        let elements = values
            .iter()
            .map(|v| st.heap.alloc("", Data::Int(*v)))
            .collect();
        st.new_temp(Data::List(elements)).unwrap()
    }

    fn ints(st: &Storage, data: Data) -> Vec<i32> {
        match data {
            Data::List(elements) => elements
                .iter()
                .map(|e| match &*st.heap.data(*e).unwrap() {
                    Data::Int(n) => *n,
                    other => panic!("{:?}", other),
                })
                .collect(),
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn test_list_broadcast() {
        let mut st = Storage::default();
        let l = list(&mut st, &[1, 2, 3]);
        let two = st.new_temp(Data::Int(2)).unwrap();
        let r = binary(&mut st, BinaryOp::Mul, l, two).unwrap();
        assert_eq!(ints(&st, r), vec![2, 4, 6]);
    }

    #[test]
    fn test_list_length_mismatch() {
        let mut st = Storage::default();
        let a = list(&mut st, &[1, 2]);
        let b = list(&mut st, &[1, 2, 3]);
        let before = st.heap().len();
        assert!(binary(&mut st, BinaryOp::Add, a, b).is_err());
        assert_eq!(st.heap().len(), before);
    }

    #[test]
    fn test_list_equality() {
        let mut st = Storage::default();
        let a = list(&mut st, &[1, 2]);
        let b = list(&mut st, &[1, 2]);
        let c = list(&mut st, &[2, 1]);
        assert_eq!(binary(&mut st, BinaryOp::Eq, a, b).unwrap(), Data::Int(1));
        assert_eq!(binary(&mut st, BinaryOp::Ne, a, c).unwrap(), Data::Int(1));
    }

    #[test]
    fn test_step() {
        let mut st = Storage::default();
        let a = st.new_temp(Data::Int(3)).unwrap();
        let b = st.new_temp(Data::Double(1.0)).unwrap();
        let r = binary(&mut st, BinaryOp::Step, a, b).unwrap();
        assert_eq!(ints(&st, r), vec![3, 2, 1]);
        let h = st.new_temp(Data::Double(1.5)).unwrap();
        assert!(binary(&mut st, BinaryOp::Step, a, h).is_err());
    }

    #[test]
    fn test_point_recursion() {
        let mut st = Storage::default();
        let a = list(&mut st, &[1, 5]);
        let b = st.new_var("b", Data::Int(3), Namespace::Current).unwrap();
        let r = binary(&mut st, BinaryOp::PLt, a, b).unwrap();
        assert_eq!(ints(&st, r), vec![1, 0]);
    }

    #[test]
    fn test_unary_on_list() {
        let mut st = Storage::default();
        let a = list(&mut st, &[1, -2]);
        let r = unary(&mut st, UnaryOp::Negate, a).unwrap();
        assert_eq!(ints(&st, r), vec![-1, 2]);
    }
}
