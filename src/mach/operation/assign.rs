use crate::error;
use crate::lang::{BinaryOp, Error};
use crate::mach::{Data, Kind, Storage, TensorView, ValueId};
use crate::math::fmt_scalar;

type Result<T> = std::result::Result<T, Error>;

/// Operators that change their left operand: `=`, `->`, `<<` and `.<<`.
pub fn assign(st: &mut Storage, op: BinaryOp, l: ValueId, r: ValueId) -> Result<()> {
    match op {
        BinaryOp::Assign => assign_value(st, l, r),
        BinaryOp::Reference => reference(st, l, r),
        BinaryOp::Append => append(st, l, r, false),
        BinaryOp::PAppend => append(st, l, r, true),
        op => Err(error!(Internal; format!("'{}' is not an assignment.", op.as_str()))),
    }
}

fn lval_error(st: &Storage, id: ValueId) -> Result<Error> {
    let value = st.heap.value(id)?;
    Ok(Error::invalid_lval(value.name(), value.kind().name()))
}

/// Release a payload that could not be stored.
fn discard(st: &mut Storage, data: Data) {
    let id = st.heap.alloc("", data);
    st.heap.destroy(id);
}

/// Payload to store for `r`: temporaries give theirs up, everything
/// else is copied and dereferenced.
fn take_value(st: &mut Storage, r: ValueId) -> Result<Data> {
    if st.is_temp(r) && !st.heap.value(r)?.is_ptr() {
        return st.heap.take_data(r);
    }
    let copy = st.heap.alloc("", Data::Void);
    let data = st
        .heap
        .copy_instance(copy, r)
        .and_then(|_| st.heap.materialize(copy))
        .and_then(|_| st.heap.take_data(copy));
    st.heap.destroy(copy);
    data
}

fn assign_value(st: &mut Storage, l: ValueId, r: ValueId) -> Result<()> {
    let (is_list, sources) = {
        let value = st.heap.value(l)?;
        (value.kind() == Kind::List, value.sources.clone())
    };
    if is_list && st.is_temp(l) {
        if sources.iter().any(Option::is_some) {
            return destructure(st, &sources, r);
        }
        return Err(lval_error(st, l)?);
    }
    let view = match &*st.heap.data(l)? {
        Data::TensorIdx(tv) if st.is_temp(l) => Some(tv.clone()),
        _ => None,
    };
    if let Some(view) = view {
        return assign_view(st, view, r);
    }
    let data = take_value(st, r)?;
    if let Err(e) = st.heap.write(l, data.clone()) {
        discard(st, data);
        return Err(e);
    }
    Ok(())
}

/// `[a, b] = [x, y]` assigns element by element to the variables the
/// left list was built from.
fn destructure(st: &mut Storage, sources: &[Option<ValueId>], r: ValueId) -> Result<()> {
    let values = match st.heap.base_kind(r)? {
        Kind::List => st.heap.elements(r)?,
        _ => vec![r; sources.len()],
    };
    if values.len() != sources.len() {
        return Err(error!(InvalidRVal; "Lists have different lengths."));
    }
    for (source, value) in sources.iter().zip(values) {
        match source {
            Some(target) if st.heap.contains(*target) => assign_value(st, *target, value)?,
            _ => return Err(error!(InvalidLVal; "List element is not a variable.")),
        }
    }
    Ok(())
}

/// Write into the tensor a view was taken from.
fn assign_view(st: &mut Storage, target: TensorView, r: ValueId) -> Result<()> {
    let owner = match target.source {
        Some(owner) if st.heap.contains(owner) => owner,
        _ => return Err(error!(InvalidLVal; "Tensor view is not bound to a variable.")),
    };
    let mut tensor = match &*st.heap.data(owner)? {
        Data::Tensor(t) => t.clone(),
        _ => return Err(error!(InvalidLVal; "Tensor view is not bound to a tensor.")),
    };
    let precision = st.sensitivity();
    let indices = target.view.indices().to_vec();
    let done = match &*st.heap.data(r)? {
        Data::TensorIdx(src) => tensor.assign_view(&indices, &src.view),
        _ => match st.heap.cast_to_scalar(r, precision) {
            Some(v) => tensor.fill_view(&indices, v),
            None => {
                let value = st.heap.value(r)?;
                return Err(Error::invalid_rval(value.name(), value.kind().name()));
            }
        },
    };
    match done {
        Some(()) => st.heap.write(owner, Data::Tensor(tensor)),
        None => Err(error!(InvalidRVal; "Tensor indices do not match.")),
    }
}

/// `a -> b` binds `a` to `b` itself. References to parts of values are
/// copied as they are.
fn reference(st: &mut Storage, l: ValueId, r: ValueId) -> Result<()> {
    let (protected, named) = {
        let value = st.heap.value(l)?;
        (value.is_protected(), !value.name().is_empty())
    };
    if protected || !named || st.is_temp(l) {
        return Err(lval_error(st, l)?);
    }
    let data = match st.heap.value(r)?.data() {
        Data::Ptr(alias) => Data::Ptr(*alias),
        Data::PtrVar(_) => Data::PtrVar(st.heap.resolve(r)),
        _ if !st.is_temp(r) && !st.heap.value(r)?.name().is_empty() => Data::PtrVar(r),
        _ => {
            let value = st.heap.value(r)?;
            return Err(Error::invalid_rval(value.name(), value.kind().name()));
        }
    };
    if data.pointee().map(|t| st.heap.resolve(t)) == Some(l) {
        return Err(error!(InvalidRVal; "A variable cannot reference itself."));
    }
    st.heap.set_data(l, data)
}

/// Text appended to a string by `<<`.
fn text(data: &Data) -> Option<String> {
    match data {
        Data::Str(s) => Some(s.clone()),
        _ => data.as_scalar().map(fmt_scalar),
    }
}

/// `a << b` appends a copy of `b` to the list `a`, or its text to the
/// string `a`. `.<<` appends the elements of a list one by one.
fn append(st: &mut Storage, l: ValueId, r: ValueId, point: bool) -> Result<()> {
    let owner = st.heap.target(l)?;
    if st.heap.value(owner)?.is_protected() {
        return Err(lval_error(st, owner)?);
    }
    match st.heap.kind(owner)? {
        Kind::Void => {
            st.heap.set_data(owner, Data::List(vec![]))?;
            append_to_list(st, owner, r, point)
        }
        Kind::List => append_to_list(st, owner, r, point),
        Kind::Str => {
            let suffix = match text(&*st.heap.data(r)?) {
                Some(s) => s,
                None => {
                    let value = st.heap.value(r)?;
                    return Err(Error::invalid_rval(value.name(), value.kind().name()));
                }
            };
            let mut s = match &*st.heap.data(owner)? {
                Data::Str(s) => s.clone(),
                _ => return Err(error!(Internal)),
            };
            s.push_str(&suffix);
            st.heap.set_data(owner, Data::Str(s))
        }
        Kind::VertexList => {
            let precision = st.sensitivity();
            let coords = match &*st.heap.data(r)? {
                Data::MultiV(mv) => {
                    let c = mv.components();
                    let at = |i: usize| mv.component_index(i).map(|b| c[b]).unwrap_or(0.0);
                    Some([at(2), at(3), at(4)])
                }
                Data::List(elements) if elements.len() == 3 => {
                    let mut xyz = [0.0; 3];
                    for (slot, e) in xyz.iter_mut().zip(elements) {
                        match st.heap.cast_to_scalar(*e, precision) {
                            Some(v) => *slot = v,
                            None => return Err(error!(InvalidRVal; "Vertex needs three scalars.")),
                        }
                    }
                    Some(xyz)
                }
                _ => None,
            };
            let coords = match coords {
                Some(c) => c,
                None => return Err(error!(InvalidRVal; "Vertex needs three scalars.")),
            };
            let mut vertices = match &*st.heap.data(owner)? {
                Data::VertexList(v) => v.clone(),
                _ => return Err(error!(Internal)),
            };
            vertices.push(coords);
            st.heap.set_data(owner, Data::VertexList(vertices))
        }
        kind => Err(Error::invalid_type(
            st.heap.value(l)?.name(),
            kind.name(),
            BinaryOp::Append.as_str(),
        )),
    }
}

fn append_to_list(st: &mut Storage, list: ValueId, r: ValueId, point: bool) -> Result<()> {
    let items = if point && st.heap.base_kind(r)? == Kind::List {
        st.heap.elements(r)?
    } else {
        vec![r]
    };
    let mut copies = Vec::with_capacity(items.len());
    for item in items {
        let copy = st.heap.alloc("", Data::Void);
        let done = st
            .heap
            .copy_instance(copy, item)
            .and_then(|_| st.heap.materialize(copy));
        copies.push(copy);
        if let Err(e) = done {
            copies.into_iter().for_each(|id| st.heap.destroy(id));
            return Err(e);
        }
    }
    st.heap.elements_mut(list)?.extend(copies);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mach::Namespace;

    #[test]
    fn test_assign_moves_temporaries() {
        let mut st = Storage::default();
        let x = st.heap.alloc("", Data::Int(1));
        let t = st.new_temp(Data::List(vec![x])).unwrap();
        let a = st.new_var("a", Data::Void, Namespace::Current).unwrap();
        assign(&mut st, BinaryOp::Assign, a, t).unwrap();
        assert_eq!(st.heap.elements(a).unwrap(), vec![x]);
        assert_eq!(st.heap.kind(t).unwrap(), Kind::Void);
    }

    #[test]
    fn test_assign_to_constant_fails() {
        let mut st = Storage::default();
        let pi = st.get_var("Pi", Namespace::Current);
        let one = st.new_temp(Data::Int(1)).unwrap();
        let e = assign(&mut st, BinaryOp::Assign, pi, one).unwrap_err();
        assert_eq!(e.code(), crate::lang::ErrorCode::InvalidLVal);
    }

    #[test]
    fn test_reference_writes_through() {
        let mut st = Storage::default();
        let b = st.new_var("b", Data::Int(3), Namespace::Current).unwrap();
        let a = st.new_var("a", Data::Void, Namespace::Current).unwrap();
        assign(&mut st, BinaryOp::Reference, a, b).unwrap();
        let five = st.new_temp(Data::Int(5)).unwrap();
        assign(&mut st, BinaryOp::Assign, a, five).unwrap();
        assert_eq!(st.heap.data(b).unwrap().as_scalar(), Some(5.0));
        let e = assign(&mut st, BinaryOp::Reference, b, a).unwrap_err();
        assert_eq!(e.code(), crate::lang::ErrorCode::InvalidRVal);
    }

    #[test]
    fn test_append() {
        let mut st = Storage::default();
        let l = st.new_var("l", Data::Void, Namespace::Current).unwrap();
        let one = st.new_temp(Data::Int(1)).unwrap();
        assign(&mut st, BinaryOp::Append, l, one).unwrap();
        assign(&mut st, BinaryOp::Append, l, one).unwrap();
        assert_eq!(st.heap.elements(l).unwrap().len(), 2);
        let s = st.new_var("s", Data::Str("n = ".into()), Namespace::Current).unwrap();
        assign(&mut st, BinaryOp::Append, s, one).unwrap();
        assert_eq!(&*st.heap.data(s).unwrap(), &Data::Str("n = 1".into()));
    }

    #[test]
    fn test_destructure() {
        let mut st = Storage::default();
        let a = st.new_var("a", Data::Void, Namespace::Current).unwrap();
        let b = st.new_var("b", Data::Void, Namespace::Current).unwrap();
        let ca = st.heap.alloc("a", Data::Void);
        let cb = st.heap.alloc("b", Data::Void);
        let l = st.new_temp(Data::List(vec![ca, cb])).unwrap();
        st.heap.set_sources(l, vec![Some(a), Some(b)]).unwrap();
        let x = st.heap.alloc("", Data::Int(1));
        let y = st.heap.alloc("", Data::Int(2));
        let r = st.new_temp(Data::List(vec![x, y])).unwrap();
        assign(&mut st, BinaryOp::Assign, l, r).unwrap();
        assert_eq!(st.heap.data(a).unwrap().as_scalar(), Some(1.0));
        assert_eq!(st.heap.data(b).unwrap().as_scalar(), Some(2.0));
    }
}
