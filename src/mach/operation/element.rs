use crate::error;
use crate::lang::Error;
use crate::mach::{Alias, Data, Field, Kind, Storage, TensorView, ValueId};
use crate::math::{Algebra, MultiVector, TensorIdx};

type Result<T> = std::result::Result<T, Error>;

/// Select part of `target` with the one-based `args`. The result is a new
/// temporary. Parts of a variable are handed out as references so that
/// assigning to them writes through; parts of temporaries are copies.
pub fn element(st: &mut Storage, target: ValueId, args: &[ValueId]) -> Result<ValueId> {
    if args.is_empty() {
        return Err(error!(NoFuncParams));
    }
    let by_ref = !st.is_temp(target) || st.heap.value(target)?.is_ptr();
    let kind = st.heap.base_kind(target)?;
    match kind {
        Kind::List => list_element(st, target, args, by_ref),
        Kind::Str => substring(st, target, args),
        Kind::Matrix => matrix_element(st, target, args, by_ref),
        Kind::MultiV => component(st, target, args, by_ref),
        Kind::Tensor => tensor_element(st, target, args, by_ref),
        Kind::VertexList => vertex(st, target, args),
        Kind::Image => pixel(st, target, args),
        Kind::Color => color_component(st, target, args),
        kind => {
            let name = st.heap.value(target)?.name().to_string();
            Err(Error::invalid_type(&name, kind.name(), "element access"))
        }
    }
}

/// One-based index argument `pos` of `args`, checked against `max`.
fn index(st: &Storage, args: &[ValueId], pos: usize, max: usize) -> Result<usize> {
    let precision = st.sensitivity();
    let id = match args.get(pos) {
        Some(id) => *id,
        None => return Err(Error::wrong_param_count(pos + 1)),
    };
    match st.heap.cast_to_counter(id, true, precision) {
        Some(i) if i >= 1 && i as usize <= max => Ok(i as usize),
        Some(i) => Err(Error::out_of_range(i as f64, 1.0, max as f64)),
        None => {
            let name = st.heap.value(id)?.name().to_string();
            Err(Error::invalid_param_type(&name, pos + 1))
        }
    }
}

fn expect_args(args: &[ValueId], counts: &[usize]) -> Result<()> {
    if counts.contains(&args.len()) {
        Ok(())
    } else {
        Err(Error::wrong_param_count(counts[counts.len() - 1]))
    }
}

/// Copy of `id` as an unnamed temporary holding no pointer.
fn copy_temp(st: &mut Storage, id: ValueId) -> Result<ValueId> {
    let copy = st.new_temp(Data::Void)?;
    st.heap.copy_instance(copy, id)?;
    st.heap.materialize(copy)?;
    st.heap.set_name(copy, "")?;
    Ok(copy)
}

fn scalar_part(st: &mut Storage, owner: ValueId, field: usize, by_ref: bool) -> Result<ValueId> {
    if by_ref {
        st.new_temp(Data::Ptr(Alias {
            kind: Kind::Double,
            target: owner,
            field: Field::Element(field),
        }))
    } else {
        let alias = st.heap.alloc(
            "",
            Data::Ptr(Alias {
                kind: Kind::Double,
                target: owner,
                field: Field::Element(field),
            }),
        );
        let copied = copy_temp(st, alias);
        st.heap.destroy(alias);
        copied
    }
}

fn list_element(st: &mut Storage, target: ValueId, args: &[ValueId], by_ref: bool) -> Result<ValueId> {
    let elements = st.heap.elements(target)?;
    let key = match &*st.heap.data(args[0])? {
        Data::Str(key) => Some(key.clone()),
        _ => None,
    };
    let picked = match key {
        Some(key) => {
            let found = elements
                .iter()
                .copied()
                .find(|e| st.heap.get(*e).map(|v| v.name() == key).unwrap_or(false));
            match found {
                Some(id) => id,
                None => return st.new_named_temp(&format!("'{}' not found", key), Data::Void),
            }
        }
        None => elements[index(st, args, 0, elements.len())? - 1],
    };
    let part = if by_ref {
        let pointee = st.heap.resolve(picked);
        st.new_temp(Data::PtrVar(pointee))?
    } else {
        copy_temp(st, picked)?
    };
    if args.len() > 1 {
        element(st, part, &args[1..])
    } else {
        Ok(part)
    }
}

fn substring(st: &mut Storage, target: ValueId, args: &[ValueId]) -> Result<ValueId> {
    expect_args(args, &[1, 2])?;
    let chars: Vec<char> = match &*st.heap.data(target)? {
        Data::Str(s) => s.chars().collect(),
        _ => return Err(error!(Internal)),
    };
    let from = index(st, args, 0, chars.len())?;
    let to = if args.len() == 2 {
        index(st, args, 1, chars.len())?
    } else {
        from
    };
    let text = if to >= from {
        chars[from - 1..to].iter().collect()
    } else {
        String::new()
    };
    st.new_temp(Data::Str(text))
}

fn matrix_element(st: &mut Storage, target: ValueId, args: &[ValueId], by_ref: bool) -> Result<ValueId> {
    expect_args(args, &[1, 2])?;
    let owner = st.heap.target(target)?;
    let (rows, cols) = match &*st.heap.data(owner)? {
        Data::Matrix(m) => (m.rows(), m.cols()),
        _ => return Err(error!(Internal)),
    };
    let row = index(st, args, 0, rows)?;
    if args.len() == 1 {
        let sub = match &*st.heap.data(owner)? {
            Data::Matrix(m) => m.sub_matrix(row, 1, 1, cols),
            _ => None,
        };
        return match sub {
            Some(m) => st.new_temp(Data::Matrix(m)),
            None => Err(error!(Internal)),
        };
    }
    let col = index(st, args, 1, cols)?;
    scalar_part(st, owner, (row - 1) * cols + (col - 1), by_ref)
}

fn component(st: &mut Storage, target: ValueId, args: &[ValueId], by_ref: bool) -> Result<ValueId> {
    expect_args(args, &[1])?;
    let owner = st.heap.target(target)?;
    let algebra = match &*st.heap.data(owner)? {
        Data::MultiV(mv) => mv.algebra(),
        _ => return Err(error!(Internal)),
    };
    let i = index(st, args, 0, algebra.ga_dim())?;
    match MultiVector::zero(algebra).component_index(i) {
        Some(blade) => scalar_part(st, owner, blade, by_ref),
        None => Err(error!(Internal)),
    }
}

/// All indices positive and one per dimension select a single entry;
/// otherwise negative indices name free dimensions of a view.
fn tensor_element(st: &mut Storage, target: ValueId, args: &[ValueId], by_ref: bool) -> Result<ValueId> {
    let owner = st.heap.target(target)?;
    let precision = st.sensitivity();
    let mut indices = Vec::with_capacity(args.len());
    for (pos, arg) in args.iter().enumerate() {
        match st.heap.cast_to_counter(*arg, true, precision) {
            Some(i) if i != 0 && i.abs() <= i64::from(i32::max_value()) => indices.push(i as i32),
            _ => {
                let name = st.heap.value(*arg)?.name().to_string();
                return Err(Error::invalid_param_type(&name, pos + 1));
            }
        }
    }
    let tensor = match &*st.heap.data(owner)? {
        Data::Tensor(t) => t.clone(),
        _ => return Err(error!(Internal)),
    };
    if indices.iter().all(|i| *i > 0) {
        let idx: Vec<usize> = indices.iter().map(|i| *i as usize).collect();
        if let Some(flat) = tensor.flat_index(&idx) {
            return scalar_part(st, owner, flat, by_ref);
        }
    }
    match TensorIdx::new(tensor, indices) {
        Some(view) => st.new_temp(Data::TensorIdx(TensorView {
            view,
            source: if by_ref { Some(owner) } else { None },
        })),
        None => Err(error!(InvalidParVal; "Tensor index does not fit the tensor.")),
    }
}

fn vertex(st: &mut Storage, target: ValueId, args: &[ValueId]) -> Result<ValueId> {
    expect_args(args, &[1])?;
    let len = match &*st.heap.data(target)? {
        Data::VertexList(v) => v.len(),
        _ => return Err(error!(Internal)),
    };
    let i = index(st, args, 0, len)?;
    let coords = match &*st.heap.data(target)? {
        Data::VertexList(v) => v.get(i),
        _ => None,
    };
    match coords {
        Some(c) => st.new_temp(Data::MultiV(MultiVector::vector(Algebra::E3, &c))),
        None => Err(error!(Internal)),
    }
}

fn pixel(st: &mut Storage, target: ValueId, args: &[ValueId]) -> Result<ValueId> {
    expect_args(args, &[2])?;
    let (w, h) = match &*st.heap.data(target)? {
        Data::Image(i) => (i.width(), i.height()),
        _ => return Err(error!(Internal)),
    };
    let x = index(st, args, 0, w)?;
    let y = index(st, args, 1, h)?;
    let color = match &*st.heap.data(target)? {
        Data::Image(i) => i.pixel(x, y),
        _ => None,
    };
    match color {
        Some(c) => st.new_temp(Data::Color(c)),
        None => Err(error!(Internal)),
    }
}

fn color_component(st: &mut Storage, target: ValueId, args: &[ValueId]) -> Result<ValueId> {
    expect_args(args, &[1])?;
    let i = index(st, args, 0, 4)?;
    let v = match &*st.heap.data(target)? {
        Data::Color(c) => c.components()[i - 1],
        _ => return Err(error!(Internal)),
    };
    st.new_temp(Data::Double(f64::from(v)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mach::Namespace;
    use crate::math::Matrix;

    fn int(st: &mut Storage, v: i32) -> ValueId {
        st.new_temp(Data::Int(v)).unwrap()
    }

    #[test]
    fn test_named_list_gives_reference() {
        let mut st = Storage::default();
        let x = st.heap.alloc("", Data::Int(4));
        let y = st.heap.alloc("", Data::Int(5));
        let a = st
            .new_var("a", Data::List(vec![x, y]), Namespace::Current)
            .unwrap();
        let two = int(&mut st, 2);
        let e = element(&mut st, a, &[two]).unwrap();
        assert_eq!(st.heap.kind(e).unwrap(), Kind::PtrVar);
        st.heap.write(e, Data::Int(9)).unwrap();
        assert_eq!(st.heap.data(y).unwrap().as_scalar(), Some(9.0));
        let three = int(&mut st, 3);
        let err = element(&mut st, a, &[three]).unwrap_err();
        assert_eq!(err.code(), crate::lang::ErrorCode::Math);
    }

    #[test]
    fn test_lookup_by_name_is_soft() {
        let mut st = Storage::default();
        let x = st.heap.alloc("key", Data::Int(4));
        let a = st.new_var("a", Data::List(vec![x]), Namespace::Current).unwrap();
        let key = st.new_temp(Data::Str("key".into())).unwrap();
        let e = element(&mut st, a, &[key]).unwrap();
        assert_eq!(st.heap.data(e).unwrap().as_scalar(), Some(4.0));
        let missing = st.new_temp(Data::Str("nope".into())).unwrap();
        let e = element(&mut st, a, &[missing]).unwrap();
        assert_eq!(st.heap.kind(e).unwrap(), Kind::Void);
        assert_eq!(st.heap.value(e).unwrap().name(), "'nope' not found");
    }

    #[test]
    fn test_matrix_alias() {
        let mut st = Storage::default();
        let m = Matrix::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        let id = st.new_var("M", Data::Matrix(m), Namespace::Current).unwrap();
        let (two, one) = (int(&mut st, 2), int(&mut st, 1));
        let e = element(&mut st, id, &[two, one]).unwrap();
        assert_eq!(st.heap.data(e).unwrap().as_scalar(), Some(3.0));
        st.heap.write(e, Data::Double(7.0)).unwrap();
        match &*st.heap.data(id).unwrap() {
            Data::Matrix(m) => assert_eq!(m.as_slice(), &[1.0, 2.0, 7.0, 4.0]),
            _ => panic!(),
        }
        let row = element(&mut st, id, &[one]).unwrap();
        assert_eq!(st.heap.kind(row).unwrap(), Kind::Matrix);
    }

    #[test]
    fn test_substring() {
        let mut st = Storage::default();
        let s = st.new_temp(Data::Str("hello".into())).unwrap();
        let (two, four) = (int(&mut st, 2), int(&mut st, 4));
        let e = element(&mut st, s, &[two, four]).unwrap();
        assert_eq!(&*st.heap.data(e).unwrap(), &Data::Str("ell".into()));
    }
}
