use super::output::format_value;
use super::render::Scene;
use super::{Data, Kind, Storage, ValueId};
use crate::error;
use crate::lang::ast::ElementList;
use crate::lang::Error;
use crate::math::{Algebra, Color, Image, Matrix, MultiVector, Tensor, VertexList};
use rand::Rng;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::rc::Rc;

type Result<T> = std::result::Result<T, Error>;

/// Native function. Arguments are the elements of the call's argument
/// list; named arguments arrive as references to the caller's variables.
pub type Builtin = fn(&mut Storage, &[ValueId]) -> Result<Data>;

pub fn table() -> HashMap<&'static str, Builtin> {
    let mut t: HashMap<&'static str, Builtin> = HashMap::new();
    t.insert("sin", sin);
    t.insert("cos", cos);
    t.insert("tan", tan);
    t.insert("asin", asin);
    t.insert("acos", acos);
    t.insert("atan", atan);
    t.insert("sqrt", sqrt);
    t.insert("abs", abs);
    t.insert("exp", exp);
    t.insert("log", log);
    t.insert("floor", floor);
    t.insert("ceil", ceil);
    t.insert("round", round);
    t.insert("sign", sign);
    t.insert("pow", pow);
    t.insert("random", random);
    t.insert("size", size);
    t.insert("type", type_name);
    t.insert("String", string);
    t.insert("Scalar", scalar);
    t.insert("Matrix", matrix);
    t.insert("Tensor", tensor);
    t.insert("Color", color);
    t.insert("Image", image);
    t.insert("VertexList", vertex_list);
    t.insert("Scene", scene);
    t.insert("VecE3", vec_e3);
    t.insert("VecP3", vec_p3);
    t.insert("VecN3", vec_n3);
    t.insert("DefVarsE3", def_vars_e3);
    t.insert("DefVarsP3", def_vars_p3);
    t.insert("DefVarsN3", def_vars_n3);
    t.insert("sort", sort);
    t.insert("Remove", remove);
    t.insert("Insert", insert);
    t
}

/// Values defined before any script runs.
pub fn constants() -> Vec<(&'static str, Data)> {
    vec![
        ("Pi", Data::Double(std::f64::consts::PI)),
        ("E", Data::Double(std::f64::consts::E)),
        ("Red", Data::Color(Color::rgb(1.0, 0.0, 0.0))),
        ("Green", Data::Color(Color::rgb(0.0, 1.0, 0.0))),
        ("Blue", Data::Color(Color::rgb(0.0, 0.0, 1.0))),
        ("Black", Data::Color(Color::rgb(0.0, 0.0, 0.0))),
        ("White", Data::Color(Color::rgb(1.0, 1.0, 1.0))),
        ("Yellow", Data::Color(Color::rgb(1.0, 1.0, 0.0))),
        ("Cyan", Data::Color(Color::rgb(0.0, 1.0, 1.0))),
        ("Magenta", Data::Color(Color::rgb(1.0, 0.0, 1.0))),
        ("Orange", Data::Color(Color::rgb(1.0, 0.5, 0.0))),
        ("Gray", Data::Color(Color::rgb(0.5, 0.5, 0.5))),
    ]
}

fn arg_count(args: &[ValueId], min: usize, max: usize) -> Result<()> {
    if args.len() < min || args.len() > max {
        Err(Error::wrong_param_count(if args.len() < min { min } else { max }))
    } else {
        Ok(())
    }
}

fn param_error(st: &Storage, args: &[ValueId], pos: usize) -> Error {
    let name = st
        .heap
        .get(args[pos])
        .map(|v| v.name().to_string())
        .unwrap_or_default();
    Error::invalid_param_type(&name, pos + 1)
}

fn scalar_arg(st: &Storage, args: &[ValueId], pos: usize) -> Result<f64> {
    st.heap
        .cast_to_scalar(args[pos], st.sensitivity())
        .ok_or_else(|| param_error(st, args, pos))
}

fn counter_arg(st: &Storage, args: &[ValueId], pos: usize) -> Result<i64> {
    st.heap
        .cast_to_counter(args[pos], true, st.sensitivity())
        .ok_or_else(|| param_error(st, args, pos))
}

fn size_arg(st: &Storage, args: &[ValueId], pos: usize) -> Result<usize> {
    match counter_arg(st, args, pos)? {
        n if n >= 1 && n <= i64::from(u16::max_value()) => Ok(n as usize),
        n => Err(Error::out_of_range(n as f64, 1.0, f64::from(u16::max_value()))),
    }
}

fn real(v: f64) -> Result<Data> {
    if v.is_finite() {
        Ok(Data::Double(v))
    } else {
        Err(Error::not_a_number(v))
    }
}

/// Apply a real function to a scalar, to every entry of a matrix, or to
/// every element of a list.
fn map_real<F>(st: &mut Storage, id: ValueId, f: &F) -> Result<Data>
where
    F: Fn(f64) -> Result<f64>,
{
    let kind = st.heap.base_kind(id)?;
    match kind {
        Kind::List => {
            let mut out = vec![];
            for element in st.heap.elements(id)? {
                match map_real(st, element, f) {
                    Ok(data) => out.push(st.heap.alloc("", data)),
                    Err(e) => {
                        out.into_iter().for_each(|id| st.heap.destroy(id));
                        return Err(e);
                    }
                }
            }
            Ok(Data::List(out))
        }
        Kind::Matrix => {
            let mut m = match &*st.heap.data(id)? {
                Data::Matrix(m) => m.clone(),
                _ => return Err(error!(Internal)),
            };
            for v in m.as_mut_slice() {
                *v = f(*v)?;
            }
            m.strip(st.sensitivity());
            Ok(Data::Matrix(m))
        }
        _ => match st.heap.cast_to_scalar(id, st.sensitivity()) {
            Some(v) => real(f(v)?),
            None => {
                let name = st.heap.value(id)?.name().to_string();
                Err(Error::invalid_param_type(&name, 1))
            }
        },
    }
}

fn unary_real<F>(st: &mut Storage, args: &[ValueId], f: F) -> Result<Data>
where
    F: Fn(f64) -> Result<f64>,
{
    arg_count(args, 1, 1)?;
    map_real(st, args[0], &f)
}

fn sin(st: &mut Storage, args: &[ValueId]) -> Result<Data> {
    unary_real(st, args, |x| Ok(x.sin()))
}

fn cos(st: &mut Storage, args: &[ValueId]) -> Result<Data> {
    unary_real(st, args, |x| Ok(x.cos()))
}

fn tan(st: &mut Storage, args: &[ValueId]) -> Result<Data> {
    unary_real(st, args, |x| Ok(x.tan()))
}

fn asin(st: &mut Storage, args: &[ValueId]) -> Result<Data> {
    unary_real(st, args, |x| {
        if x.abs() > 1.0 {
            return Err(Error::out_of_range(x, -1.0, 1.0));
        }
        Ok(x.asin())
    })
}

fn acos(st: &mut Storage, args: &[ValueId]) -> Result<Data> {
    unary_real(st, args, |x| {
        if x.abs() > 1.0 {
            return Err(Error::out_of_range(x, -1.0, 1.0));
        }
        Ok(x.acos())
    })
}

fn atan(st: &mut Storage, args: &[ValueId]) -> Result<Data> {
    unary_real(st, args, |x| Ok(x.atan()))
}

fn sqrt(st: &mut Storage, args: &[ValueId]) -> Result<Data> {
    unary_real(st, args, |x| {
        if x < 0.0 {
            return Err(Error::out_of_range(x, 0.0, f64::INFINITY));
        }
        Ok(x.sqrt())
    })
}

fn abs(st: &mut Storage, args: &[ValueId]) -> Result<Data> {
    unary_real(st, args, |x| Ok(x.abs()))
}

fn exp(st: &mut Storage, args: &[ValueId]) -> Result<Data> {
    unary_real(st, args, |x| Ok(x.exp()))
}

fn log(st: &mut Storage, args: &[ValueId]) -> Result<Data> {
    unary_real(st, args, |x| {
        if x <= 0.0 {
            return Err(Error::out_of_range(x, 0.0, f64::INFINITY));
        }
        Ok(x.ln())
    })
}

fn floor(st: &mut Storage, args: &[ValueId]) -> Result<Data> {
    unary_real(st, args, |x| Ok(x.floor()))
}

fn ceil(st: &mut Storage, args: &[ValueId]) -> Result<Data> {
    unary_real(st, args, |x| Ok(x.ceil()))
}

fn round(st: &mut Storage, args: &[ValueId]) -> Result<Data> {
    unary_real(st, args, |x| Ok(x.round()))
}

fn sign(st: &mut Storage, args: &[ValueId]) -> Result<Data> {
    unary_real(st, args, |x| {
        Ok(if x > 0.0 {
            1.0
        } else if x < 0.0 {
            -1.0
        } else {
            0.0
        })
    })
}

fn pow(st: &mut Storage, args: &[ValueId]) -> Result<Data> {
    arg_count(args, 2, 2)?;
    let x = scalar_arg(st, args, 0)?;
    let y = scalar_arg(st, args, 1)?;
    real(x.powf(y))
}

/// `random()` is uniform in `[0, 1)`, `random(n)` in `[0, n)`.
fn random(st: &mut Storage, args: &[ValueId]) -> Result<Data> {
    arg_count(args, 0, 1)?;
    let scale = if args.is_empty() {
        1.0
    } else {
        scalar_arg(st, args, 0)?
    };
    Ok(Data::Double(rand::thread_rng().gen::<f64>() * scale))
}

fn int(n: usize) -> Data {
    if n <= i32::max_value() as usize {
        Data::Int(n as i32)
    } else {
        Data::Long(n as i64)
    }
}

fn int_list(st: &mut Storage, values: &[usize]) -> Data {
    Data::List(values.iter().map(|v| st.heap.alloc("", int(*v))).collect())
}

fn size(st: &mut Storage, args: &[ValueId]) -> Result<Data> {
    arg_count(args, 1, 1)?;
    let dims: Vec<usize> = match &*st.heap.data(args[0])? {
        Data::List(elements) => return Ok(int(elements.len())),
        Data::Str(s) => return Ok(int(s.chars().count())),
        Data::VertexList(v) => return Ok(int(v.len())),
        Data::Matrix(m) => vec![m.rows(), m.cols()],
        Data::Image(i) => vec![i.width(), i.height()],
        Data::Tensor(t) => t.dims().to_vec(),
        Data::TensorIdx(tv) => tv.view.free().iter().map(|(_, d)| *d).collect(),
        Data::Void => return Ok(Data::Int(0)),
        _ => return Ok(Data::Int(1)),
    };
    Ok(int_list(st, &dims))
}

fn type_name(st: &mut Storage, args: &[ValueId]) -> Result<Data> {
    arg_count(args, 1, 1)?;
    Ok(Data::Str(st.heap.base_kind(args[0])?.name().to_string()))
}

fn string(st: &mut Storage, args: &[ValueId]) -> Result<Data> {
    arg_count(args, 1, 1)?;
    Ok(Data::Str(format_value(&st.heap, args[0])?))
}

fn scalar(st: &mut Storage, args: &[ValueId]) -> Result<Data> {
    arg_count(args, 1, 1)?;
    if let Data::Str(s) = &*st.heap.data(args[0])? {
        return match s.trim().parse::<f64>() {
            Ok(v) => real(v),
            Err(_) => Err(error!(InvalidParVal; format!("'{}' is not a number.", s))),
        };
    }
    Ok(Data::Double(scalar_arg(st, args, 0)?))
}

fn row_values(st: &Storage, id: ValueId) -> Result<Vec<f64>> {
    let precision = st.sensitivity();
    match &*st.heap.data(id)? {
        Data::List(elements) => elements
            .iter()
            .map(|e| {
                st.heap
                    .cast_to_scalar(*e, precision)
                    .ok_or_else(|| error!(InvalidParVal; "Matrix entries have to be scalars."))
            })
            .collect(),
        _ => match st.heap.cast_to_scalar(id, precision) {
            Some(v) => Ok(vec![v]),
            None => Err(error!(InvalidParVal; "Matrix entries have to be scalars.")),
        },
    }
}

/// `Matrix(rows, cols)` gives a zero matrix, `Matrix([[..], [..]])` one
/// built from nested lists.
fn matrix(st: &mut Storage, args: &[ValueId]) -> Result<Data> {
    arg_count(args, 1, 2)?;
    if args.len() == 2 {
        let rows = size_arg(st, args, 0)?;
        let cols = size_arg(st, args, 1)?;
        return Ok(Data::Matrix(Matrix::new(rows, cols)));
    }
    let rows = match &*st.heap.data(args[0])? {
        Data::List(rows) => rows.clone(),
        Data::Matrix(m) => return Ok(Data::Matrix(m.clone())),
        _ => return Err(param_error(st, args, 0)),
    };
    let rows = rows
        .iter()
        .map(|r| row_values(st, *r))
        .collect::<Result<Vec<_>>>()?;
    match Matrix::from_rows(&rows) {
        Some(m) => Ok(Data::Matrix(m)),
        None => Err(error!(InvalidParVal; "Matrix rows have different lengths.")),
    }
}

/// `Tensor([d1, d2, ..])` gives a zero tensor; a matrix becomes a rank
/// two tensor.
fn tensor(st: &mut Storage, args: &[ValueId]) -> Result<Data> {
    arg_count(args, 1, 1)?;
    let dims = match &*st.heap.data(args[0])? {
        Data::Matrix(m) => {
            return match Tensor::from_data(&[m.rows(), m.cols()], m.as_slice().to_vec()) {
                Some(t) => Ok(Data::Tensor(t)),
                None => Err(error!(Internal)),
            }
        }
        Data::Tensor(t) => return Ok(Data::Tensor(t.clone())),
        Data::List(elements) => elements.clone(),
        _ => vec![args[0]],
    };
    let dims = (0..dims.len())
        .map(|i| size_arg(st, &dims, i))
        .collect::<Result<Vec<_>>>()?;
    match Tensor::zeros(&dims) {
        Some(t) => Ok(Data::Tensor(t)),
        None => Err(error!(InvalidParVal; "Tensor dimensions have to be positive.")),
    }
}

fn color(st: &mut Storage, args: &[ValueId]) -> Result<Data> {
    arg_count(args, 3, 4)?;
    let mut c = [1.0f32; 4];
    for (i, slot) in c.iter_mut().enumerate().take(args.len()) {
        *slot = scalar_arg(st, args, i)? as f32;
    }
    Ok(Data::Color(Color::rgba(c[0], c[1], c[2], c[3])))
}

fn image(st: &mut Storage, args: &[ValueId]) -> Result<Data> {
    arg_count(args, 2, 3)?;
    let w = size_arg(st, args, 0)?;
    let h = size_arg(st, args, 1)?;
    let fill = if args.len() == 3 {
        match &*st.heap.data(args[2])? {
            Data::Color(c) => *c,
            _ => return Err(param_error(st, args, 2)),
        }
    } else {
        Color::rgb(0.0, 0.0, 0.0)
    };
    match Image::new(w, h, fill) {
        Some(i) => Ok(Data::Image(i)),
        None => Err(error!(InvalidParVal; "Image size has to be positive.")),
    }
}

fn vertex_list(_st: &mut Storage, args: &[ValueId]) -> Result<Data> {
    arg_count(args, 0, 0)?;
    Ok(Data::VertexList(VertexList::new()))
}

fn scene(st: &mut Storage, args: &[ValueId]) -> Result<Data> {
    arg_count(args, 0, 1)?;
    let name = match args.first() {
        Some(id) => match &*st.heap.data(*id)? {
            Data::Str(s) => s.clone(),
            _ => return Err(param_error(st, args, 0)),
        },
        None => String::new(),
    };
    Ok(Data::Scene(Scene { name }))
}

/// Coordinates from scalar arguments or from a single list.
fn coords(st: &Storage, args: &[ValueId], min: usize, max: usize) -> Result<Vec<f64>> {
    if args.len() == 1 {
        if let Data::List(elements) = &*st.heap.data(args[0])? {
            arg_count(elements, min, max)?;
            return (0..elements.len())
                .map(|i| scalar_arg(st, elements, i))
                .collect();
        }
    }
    arg_count(args, min, max)?;
    (0..args.len()).map(|i| scalar_arg(st, args, i)).collect()
}

fn vec_e3(st: &mut Storage, args: &[ValueId]) -> Result<Data> {
    let mut c = coords(st, args, 2, 3)?;
    c.resize(3, 0.0);
    Ok(Data::MultiV(MultiVector::vector(Algebra::E3, &c)))
}

/// Homogeneous point; the fourth coordinate defaults to one.
fn vec_p3(st: &mut Storage, args: &[ValueId]) -> Result<Data> {
    let mut c = coords(st, args, 2, 4)?;
    if c.len() < 3 {
        c.resize(3, 0.0);
    }
    if c.len() == 3 {
        c.push(1.0);
    }
    Ok(Data::MultiV(MultiVector::vector(Algebra::P3, &c)))
}

fn n3_infinity() -> MultiVector {
    let ep = MultiVector::basis(Algebra::N3, 3);
    let em = MultiVector::basis(Algebra::N3, 4);
    ep.add(&em).unwrap_or_else(|| MultiVector::zero(Algebra::N3))
}

fn n3_origin() -> MultiVector {
    let ep = MultiVector::basis(Algebra::N3, 3);
    let em = MultiVector::basis(Algebra::N3, 4);
    em.sub(&ep)
        .map(|v| v.scale(0.5))
        .unwrap_or_else(|| MultiVector::zero(Algebra::N3))
}

/// Conformal embedding of a Euclidean point.
fn vec_n3(st: &mut Storage, args: &[ValueId]) -> Result<Data> {
    let mut c = coords(st, args, 2, 3)?;
    c.resize(3, 0.0);
    let x = MultiVector::vector(Algebra::N3, &c);
    let square: f64 = c.iter().map(|v| v * v).sum();
    let point = x
        .add(&n3_infinity().scale(0.5 * square))
        .and_then(|p| p.add(&n3_origin()));
    match point {
        Some(mut p) => {
            p.strip(st.sensitivity());
            Ok(Data::MultiV(p))
        }
        None => Err(error!(Internal)),
    }
}

fn basis_vars(algebra: Algebra) -> Vec<(&'static str, Data)> {
    let mut vars = vec![("id", Data::MultiV(MultiVector::scalar(algebra, 1.0)))];
    for i in 0..algebra.dim() {
        vars.push((
            algebra.basis_name(i),
            Data::MultiV(MultiVector::basis(algebra, i)),
        ));
    }
    if algebra == Algebra::N3 {
        let einf = Data::MultiV(n3_infinity());
        let e0 = Data::MultiV(n3_origin());
        vars.push(("einf", einf.clone()));
        vars.push(("e", einf.clone()));
        vars.push(("n", einf.clone()));
        vars.push(("ni", einf));
        vars.push(("e0", e0.clone()));
        vars.push(("nb", e0.clone()));
        vars.push(("no", e0));
    }
    vars.push(("I", Data::MultiV(MultiVector::pseudoscalar(algebra))));
    vars
}

fn def_vars(st: &mut Storage, args: &[ValueId], algebra: Algebra) -> Result<Data> {
    arg_count(args, 0, 0)?;
    st.set_space_vars(basis_vars(algebra));
    Ok(Data::Void)
}

fn def_vars_e3(st: &mut Storage, args: &[ValueId]) -> Result<Data> {
    def_vars(st, args, Algebra::E3)
}

fn def_vars_p3(st: &mut Storage, args: &[ValueId]) -> Result<Data> {
    def_vars(st, args, Algebra::P3)
}

fn def_vars_n3(st: &mut Storage, args: &[ValueId]) -> Result<Data> {
    def_vars(st, args, Algebra::N3)
}

/// Natural order of two list elements: numbers by value, strings
/// lexically.
fn natural_order(st: &Storage, a: ValueId, b: ValueId) -> Result<Ordering> {
    let precision = st.sensitivity();
    if let (Some(x), Some(y)) = (
        st.heap.cast_to_scalar(a, precision),
        st.heap.cast_to_scalar(b, precision),
    ) {
        return Ok(x.partial_cmp(&y).unwrap_or(Ordering::Equal));
    }
    match (&*st.heap.data(a)?, &*st.heap.data(b)?) {
        (Data::Str(x), Data::Str(y)) => Ok(x.cmp(y)),
        (x, y) => Err(Error::invalid_types(
            x.kind().name(),
            y.kind().name(),
            "sorting",
        )),
    }
}

/// Ask the user comparator whether `a` goes before `b`.
fn user_order(st: &mut Storage, code: &Rc<ElementList>, a: ValueId, b: ValueId) -> Result<bool> {
    let mark = st.temp_count();
    let pa = st.heap.alloc("", Data::PtrVar(a));
    let pb = st.heap.alloc("", Data::PtrVar(b));
    let pair = st.new_temp(Data::List(vec![pa, pb]))?;
    let result = st.call_code(code, pair).and_then(|r| {
        st.heap
            .cast_to_scalar(r, st.sensitivity())
            .ok_or_else(|| error!(InvalidRVal; "Sort comparator has to return a scalar."))
    });
    st.reclaim_temps(mark, None);
    Ok(result? != 0.0)
}

/// Stable merge sort with a comparator that may fail.
fn merge_sort<F>(items: Vec<ValueId>, before: &mut F) -> Result<Vec<ValueId>>
where
    F: FnMut(ValueId, ValueId) -> Result<bool>,
{
    if items.len() <= 1 {
        return Ok(items);
    }
    let mut left = items;
    let right = left.split_off(left.len() / 2);
    let left = merge_sort(left, before)?;
    let right = merge_sort(right, before)?;
    let mut out = Vec::with_capacity(left.len() + right.len());
    let (mut i, mut j) = (0, 0);
    while i < left.len() && j < right.len() {
        if before(right[j], left[i])? {
            out.push(right[j]);
            j += 1;
        } else {
            out.push(left[i]);
            i += 1;
        }
    }
    out.extend_from_slice(&left[i..]);
    out.extend_from_slice(&right[j..]);
    Ok(out)
}

/// `sort(list)` or `sort(list, comparator)`: a sorted copy of the list.
fn sort(st: &mut Storage, args: &[ValueId]) -> Result<Data> {
    arg_count(args, 1, 2)?;
    if st.heap.base_kind(args[0])? != Kind::List {
        return Err(param_error(st, args, 0));
    }
    let code = match args.get(1) {
        Some(id) => match &*st.heap.data(*id)? {
            Data::Code(code) => Some(code.clone()),
            _ => return Err(param_error(st, args, 1)),
        },
        None => None,
    };
    let elements = match st.heap.clone_data(st.heap.target(args[0])?)? {
        Data::List(elements) => elements,
        _ => return Err(error!(Internal)),
    };
    let sorted = merge_sort(elements.clone(), &mut |a, b| match &code {
        Some(code) => user_order(st, code, a, b),
        None => Ok(natural_order(st, a, b)? == Ordering::Less),
    });
    match sorted {
        Ok(sorted) => Ok(Data::List(sorted)),
        Err(e) => {
            elements.into_iter().for_each(|id| st.heap.destroy(id));
            Err(e)
        }
    }
}

/// Check that `id` designates a list the script may change and return
/// the list value.
fn writable_list(st: &Storage, args: &[ValueId], pos: usize) -> Result<ValueId> {
    let list = st.heap.target(args[pos])?;
    let value = st.heap.value(list)?;
    if value.kind() != Kind::List {
        return Err(param_error(st, args, pos));
    }
    if value.is_protected() {
        return Err(Error::invalid_lval(value.name(), value.kind().name()));
    }
    Ok(list)
}

/// `Remove(list, i)` takes element `i` out of the list and returns it.
fn remove(st: &mut Storage, args: &[ValueId]) -> Result<Data> {
    arg_count(args, 2, 2)?;
    let list = writable_list(st, args, 0)?;
    let len = st.heap.elements(list)?.len();
    let i = counter_arg(st, args, 1)?;
    if i < 1 || i as usize > len {
        return Err(Error::out_of_range(i as f64, 1.0, len as f64));
    }
    let element = st.heap.elements_mut(list)?.remove(i as usize - 1);
    let data = st.heap.take_data(element);
    st.heap.destroy(element);
    data
}

/// `Insert(list, i, value)` puts a copy of `value` before position `i`.
fn insert(st: &mut Storage, args: &[ValueId]) -> Result<Data> {
    arg_count(args, 3, 3)?;
    let list = writable_list(st, args, 0)?;
    let len = st.heap.elements(list)?.len();
    let i = counter_arg(st, args, 1)?;
    if i < 1 || i as usize > len + 1 {
        return Err(Error::out_of_range(i as f64, 1.0, (len + 1) as f64));
    }
    let copy = st.heap.alloc("", Data::Void);
    let done = st
        .heap
        .copy_instance(copy, args[2])
        .and_then(|_| st.heap.materialize(copy))
        .and_then(|_| st.heap.set_name(copy, ""));
    if let Err(e) = done {
        st.heap.destroy(copy);
        return Err(e);
    }
    st.heap.elements_mut(list)?.insert(i as usize - 1, copy);
    Ok(Data::Void)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(st: &mut Storage, name: &str, args: Vec<Data>) -> Result<Data> {
        let ids: Vec<ValueId> = args.into_iter().map(|d| st.new_temp(d).unwrap()).collect();
        let f = st.function(name).unwrap();
        f(st, &ids)
    }

    #[test]
    fn test_scalar_functions() {
        let mut st = Storage::default();
        assert_eq!(call(&mut st, "sqrt", vec![Data::Int(9)]).unwrap(), Data::Double(3.0));
        let e = call(&mut st, "sqrt", vec![Data::Int(-1)]).unwrap_err();
        assert_eq!(e.code(), crate::lang::ErrorCode::Math);
        let e = call(&mut st, "sin", vec![]).unwrap_err();
        assert_eq!(e.code(), crate::lang::ErrorCode::WrongNoOfParams);
    }

    #[test]
    fn test_type_and_size() {
        let mut st = Storage::default();
        let t = call(&mut st, "type", vec![Data::Str("x".into())]).unwrap();
        assert_eq!(t, Data::Str("string".into()));
        let n = call(&mut st, "size", vec![Data::Str("four".into())]).unwrap();
        assert_eq!(n, Data::Int(4));
    }

    #[test]
    fn test_conformal_point() {
        let mut st = Storage::default();
        let p = call(&mut st, "VecN3", vec![Data::Int(1), Data::Int(0), Data::Int(0)]).unwrap();
        match p {
            Data::MultiV(p) => {
                let sq = p.gp(&p).unwrap().scalar_part();
                assert!(sq.abs() < 1e-12);
            }
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn test_def_vars_replaces_space() {
        let mut st = Storage::default();
        call(&mut st, "DefVarsP3", vec![]).unwrap();
        assert!(!st.is_invalid(st.get_var("e4", crate::mach::Namespace::Current)));
        call(&mut st, "DefVarsE3", vec![]).unwrap();
        assert!(st.is_invalid(st.get_var("e4", crate::mach::Namespace::Current)));
        let e1 = st.get_var("e1", crate::mach::Namespace::Current);
        match &*st.heap.data(e1).unwrap() {
            Data::MultiV(mv) => assert_eq!(mv.algebra(), Algebra::E3),
            _ => panic!(),
        }
    }

    #[test]
    fn test_sort_natural() {
        let mut st = Storage::default();
        let items = [3, 1, 2].iter().map(|v| st.heap.alloc("", Data::Int(*v))).collect();
        let sorted = call(&mut st, "sort", vec![Data::List(items)]).unwrap();
        let values: Vec<f64> = match sorted {
            Data::List(ids) => ids
                .iter()
                .map(|id| st.heap.data(*id).unwrap().as_scalar().unwrap())
                .collect(),
            _ => panic!(),
        };
        assert_eq!(values, vec![1.0, 2.0, 3.0]);
    }
}
