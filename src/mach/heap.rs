use super::{Alias, Data, Field, Kind, Value};
use crate::error;
use crate::lang::Error;
use crate::math::snap;
use std::borrow::Cow;

type Result<T> = std::result::Result<T, Error>;

const MAX_REFERENCE_DEPTH: usize = 1024;

/// Handle of a value in the `Heap`. A handle whose slot was released
/// never resolves again, even after the slot is reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValueId {
    index: u32,
    generation: u32,
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    value: Option<Value>,
}

/// ## Generational value arena
///
/// Owns every value of the engine. Lists own their elements, so releasing
/// a list releases its elements. Pointer payloads register themselves with
/// their target; releasing a target turns all of its referrers void.

#[derive(Debug, Default)]
pub struct Heap {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
}

impl Heap {
    pub fn new() -> Heap {
        Heap::default()
    }

    /// Number of live values.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn alloc(&mut self, name: &str, data: Data) -> ValueId {
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    value: None,
                });
                (self.slots.len() - 1) as u32
            }
        };
        let slot = &mut self.slots[index as usize];
        slot.value = Some(Value::new(name, Data::Void));
        let id = ValueId {
            index,
            generation: slot.generation,
        };
        self.live += 1;
        self.register(id, &data);
        if let Some(value) = self.get_mut(id) {
            value.data = data;
        }
        id
    }

    pub fn contains(&self, id: ValueId) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: ValueId) -> Option<&Value> {
        match self.slots.get(id.index as usize) {
            Some(slot) if slot.generation == id.generation => slot.value.as_ref(),
            _ => None,
        }
    }

    fn get_mut(&mut self, id: ValueId) -> Option<&mut Value> {
        match self.slots.get_mut(id.index as usize) {
            Some(slot) if slot.generation == id.generation => slot.value.as_mut(),
            _ => None,
        }
    }

    pub fn value(&self, id: ValueId) -> Result<&Value> {
        self.get(id)
            .ok_or_else(|| error!(Internal; "Access to a released value."))
    }

    fn value_mut(&mut self, id: ValueId) -> Result<&mut Value> {
        self.get_mut(id)
            .ok_or_else(|| error!(Internal; "Access to a released value."))
    }

    pub fn set_name(&mut self, id: ValueId, name: &str) -> Result<()> {
        self.value_mut(id)?.name = name.to_string();
        Ok(())
    }

    pub fn set_protected(&mut self, id: ValueId, protected: bool) -> Result<()> {
        self.value_mut(id)?.protected = protected;
        Ok(())
    }

    pub fn set_sources(&mut self, id: ValueId, sources: Vec<Option<ValueId>>) -> Result<()> {
        self.value_mut(id)?.sources = sources;
        Ok(())
    }

    pub fn kind(&self, id: ValueId) -> Result<Kind> {
        Ok(self.value(id)?.kind())
    }

    fn register(&mut self, id: ValueId, data: &Data) {
        if let Some(target) = data.pointee() {
            if let Some(value) = self.get_mut(target) {
                value.referrers.push(id);
            }
        }
    }

    fn deregister(&mut self, id: ValueId, data: &Data) {
        if let Some(target) = data.pointee() {
            if let Some(value) = self.get_mut(target) {
                value.referrers.retain(|r| *r != id);
            }
        }
    }

    /// Replace the payload of `id`, releasing the old one.
    pub fn set_data(&mut self, id: ValueId, data: Data) -> Result<()> {
        let old = self.take_data(id)?;
        self.release_payload(old);
        self.register(id, &data);
        self.value_mut(id)?.data = data;
        Ok(())
    }

    /// Move the payload out of `id`, leaving it void. List elements are
    /// not released; they move with the payload.
    pub fn take_data(&mut self, id: ValueId) -> Result<Data> {
        let old = std::mem::replace(&mut self.value_mut(id)?.data, Data::Void);
        self.deregister(id, &old);
        Ok(old)
    }

    fn release_payload(&mut self, data: Data) {
        if let Data::List(elements) = data {
            for element in elements {
                self.destroy(element);
            }
        }
    }

    /// Initialise `id` as a fresh value of `kind`. Returns false for kinds
    /// that cannot exist on their own.
    pub fn new_kind(&mut self, id: ValueId, kind: Kind) -> Result<bool> {
        match Data::default_for(kind) {
            Some(data) => {
                self.set_data(id, data)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Release `id` unless it is protected and `force` is not set.
    pub fn delete(&mut self, id: ValueId, force: bool) -> bool {
        match self.get(id) {
            Some(value) if value.protected && !force => false,
            Some(_) => {
                self.destroy(id);
                true
            }
            None => false,
        }
    }

    /// Release `id` unconditionally and void all of its referrers.
    pub fn destroy(&mut self, id: ValueId) {
        let value = match self.slots.get_mut(id.index as usize) {
            Some(slot) if slot.generation == id.generation => match slot.value.take() {
                Some(value) => {
                    slot.generation = slot.generation.wrapping_add(1);
                    value
                }
                None => return,
            },
            _ => return,
        };
        self.free.push(id.index);
        self.live -= 1;
        self.deregister(id, &value.data);
        for referrer in value.referrers {
            if let Some(r) = self.get_mut(referrer) {
                if r.data.pointee() == Some(id) {
                    r.data = Data::Void;
                    r.protected = false;
                }
            }
        }
        self.release_payload(value.data);
    }

    /// Move the payload of `src` into `dst`; `src` becomes void.
    pub fn set_content(&mut self, dst: ValueId, src: ValueId) -> Result<()> {
        if dst == src {
            return Ok(());
        }
        let data = self.take_data(src)?;
        self.set_data(dst, data)
    }

    /// Deep copy of the payload of `id`. List elements are duplicated,
    /// pointers keep their target.
    pub fn clone_data(&mut self, id: ValueId) -> Result<Data> {
        let data = self.value(id)?.data.clone();
        match data {
            Data::List(elements) => {
                let mut copies = Vec::with_capacity(elements.len());
                for element in elements {
                    let name = self.value(element)?.name.clone();
                    let data = match self.clone_data(element) {
                        Ok(data) => data,
                        Err(e) => {
                            copies.into_iter().for_each(|c| self.destroy(c));
                            return Err(e);
                        }
                    };
                    copies.push(self.alloc(&name, data));
                }
                Ok(Data::List(copies))
            }
            data => Ok(data),
        }
    }

    /// Deep copy of `src` into `dst`, name included.
    pub fn copy_instance(&mut self, dst: ValueId, src: ValueId) -> Result<()> {
        if dst == src {
            return Ok(());
        }
        let data = self.clone_data(src)?;
        let name = self.value(src)?.name.clone();
        self.set_data(dst, data)?;
        self.set_name(dst, &name)
    }

    /// Replace a pointer in place with a copy of what it points at, one
    /// level deep.
    pub fn dereference_ptr(&mut self, id: ValueId) -> Result<()> {
        let pointer = match &self.value(id)?.data {
            Data::PtrVar(target) => Data::PtrVar(*target),
            Data::Ptr(alias) => Data::Ptr(*alias),
            _ => return Ok(()),
        };
        let data = match pointer {
            Data::Ptr(alias) if alias.field != Field::Whole => self.read_alias(&alias)?.into_owned(),
            Data::Ptr(alias) => self.clone_data(alias.target)?,
            _ => match pointer.pointee() {
                Some(target) => self.clone_data(target)?,
                None => return Ok(()),
            },
        };
        self.set_data(id, data)
    }

    /// Dereference until `id` holds no pointer.
    pub fn materialize(&mut self, id: ValueId) -> Result<()> {
        for _ in 0..MAX_REFERENCE_DEPTH {
            if !self.value(id)?.is_ptr() {
                return Ok(());
            }
            self.dereference_ptr(id)?;
        }
        Err(error!(Internal; "Reference chain too deep."))
    }

    /// Target of a variable reference, one level or, with `complete`,
    /// the first value that is not a variable reference.
    pub fn dereference_var(&self, id: ValueId, complete: bool) -> ValueId {
        let mut id = id;
        for _ in 0..MAX_REFERENCE_DEPTH {
            match self.get(id).map(|v| &v.data) {
                Some(Data::PtrVar(target)) if self.contains(*target) => {
                    id = *target;
                    if !complete {
                        break;
                    }
                }
                _ => break,
            }
        }
        id
    }

    pub fn resolve(&self, id: ValueId) -> ValueId {
        self.dereference_var(id, true)
    }

    fn read_alias(&self, alias: &Alias) -> Result<Cow<'_, Data>> {
        match alias.field {
            Field::Whole => self.data(alias.target),
            Field::Element(i) => {
                let scalar = match &self.value(self.resolve(alias.target))?.data {
                    Data::Matrix(m) => m.as_slice().get(i).copied(),
                    Data::Tensor(t) => t.as_slice().get(i).copied(),
                    Data::MultiV(mv) => mv.components().get(i).copied(),
                    _ => None,
                };
                match scalar {
                    Some(v) => Ok(Cow::Owned(Data::Double(v))),
                    None => Err(error!(Internal; "Pointer to a missing element.")),
                }
            }
        }
    }

    /// The payload `id` stands for, following references and aliases.
    pub fn data(&self, id: ValueId) -> Result<Cow<'_, Data>> {
        let value = self.value(self.resolve(id))?;
        match &value.data {
            Data::Ptr(alias) => self.read_alias(alias),
            data => Ok(Cow::Borrowed(data)),
        }
    }

    /// Kind of the payload `id` stands for.
    pub fn base_kind(&self, id: ValueId) -> Result<Kind> {
        Ok(self.data(id)?.kind())
    }

    /// The value `id` finally designates: a variable reference is followed,
    /// a whole-value alias is followed to its target.
    pub fn target(&self, id: ValueId) -> Result<ValueId> {
        let mut id = self.resolve(id);
        for _ in 0..MAX_REFERENCE_DEPTH {
            match &self.value(id)?.data {
                Data::Ptr(Alias {
                    target,
                    field: Field::Whole,
                    ..
                }) => id = self.resolve(*target),
                _ => return Ok(id),
            }
        }
        Err(error!(Internal; "Reference chain too deep."))
    }

    /// Assignment through references and aliases.
    pub fn write(&mut self, id: ValueId, data: Data) -> Result<()> {
        let id = self.target(id)?;
        let alias = match &self.value(id)?.data {
            Data::Ptr(alias) => Some(*alias),
            _ => None,
        };
        let owner = match alias {
            Some(alias) => self.resolve(alias.target),
            None => id,
        };
        let value = self.value(owner)?;
        if value.protected {
            return Err(Error::invalid_lval(&value.name, value.kind().name()));
        }
        let alias = match alias {
            Some(alias) => alias,
            None => return self.set_data(id, data),
        };
        let index = match alias.field {
            Field::Element(index) => index,
            Field::Whole => return Err(error!(Internal)),
        };
        let scalar = match data.as_scalar() {
            Some(v) => v,
            None => return Err(Error::invalid_rval("", data.kind().name())),
        };
        let ok = match &mut self.value_mut(owner)?.data {
            Data::Matrix(m) => match m.as_mut_slice().get_mut(index) {
                Some(v) => {
                    *v = scalar;
                    true
                }
                None => false,
            },
            Data::Tensor(t) => match t.as_mut_slice().get_mut(index) {
                Some(v) => {
                    *v = scalar;
                    true
                }
                None => false,
            },
            Data::MultiV(mv) if index < mv.components().len() => {
                mv.set(index, scalar);
                true
            }
            _ => false,
        };
        if ok {
            Ok(())
        } else {
            Err(error!(Internal; "Pointer to a missing element."))
        }
    }

    /// Element ids of the list `id` stands for.
    pub fn elements(&self, id: ValueId) -> Result<Vec<ValueId>> {
        match &self.value(self.target(id)?)?.data {
            Data::List(elements) => Ok(elements.clone()),
            data => Err(Error::invalid_type(
                &self.value(id)?.name,
                data.kind().name(),
                "list access",
            )),
        }
    }

    pub fn elements_mut(&mut self, id: ValueId) -> Result<&mut Vec<ValueId>> {
        let target = self.target(id)?;
        let value = self.value_mut(target)?;
        let name = value.name.clone();
        match &mut value.data {
            Data::List(elements) => Ok(elements),
            data => Err(Error::invalid_type(&name, data.kind().name(), "list access")),
        }
    }

    /// Numeric value of `id` if it is scalar within `precision`. Values
    /// within `precision` of an integer are snapped to it.
    pub fn cast_to_scalar(&self, id: ValueId, precision: f64) -> Option<f64> {
        let data = self.data(id).ok()?;
        let v = match &*data {
            Data::Int(_) | Data::UInt(_) | Data::Long(_) => return data.as_scalar(),
            Data::Float(_) | Data::Double(_) => data.as_scalar()?,
            Data::MultiV(mv) => {
                let grades = mv.grades(precision);
                if !(grades.is_empty() || grades == [0]) {
                    return None;
                }
                mv.scalar_part()
            }
            Data::Matrix(m) if m.len() == 1 => m.as_slice()[0],
            Data::Tensor(t) if t.len() == 1 => t.as_slice()[0],
            Data::TensorIdx(tv) => tv.view.scalar()?,
            _ => return None,
        };
        Some(snap(v, precision))
    }

    /// Integral value of `id`. With `exact`, non-integral floating values
    /// are rejected instead of rounded. A one-element list counts as its
    /// element.
    pub fn cast_to_counter(&self, id: ValueId, exact: bool, precision: f64) -> Option<i64> {
        if let Data::List(elements) = &*self.data(id).ok()? {
            if elements.len() == 1 {
                return self.cast_to_counter(elements[0], exact, precision);
            }
            return None;
        }
        let v = self.cast_to_scalar(id, precision)?;
        if exact && v.fract() != 0.0 {
            return None;
        }
        if !v.is_finite() {
            return None;
        }
        Some(v.round() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{Algebra, Matrix, MultiVector};

    #[test]
    fn test_new_kind_payload() {
        let mut heap = Heap::new();
        let id = heap.alloc("a", Data::Void);
        assert!(heap.new_kind(id, Kind::Matrix).unwrap());
        assert_eq!(heap.kind(id).unwrap(), Kind::Matrix);
        assert!(!heap.new_kind(id, Kind::PtrDouble).unwrap());
        assert_eq!(heap.kind(id).unwrap(), Kind::Matrix);
    }

    #[test]
    fn test_destroy_voids_referrers() {
        let mut heap = Heap::new();
        let b = heap.alloc("b", Data::Int(3));
        let a = heap.alloc("a", Data::PtrVar(b));
        heap.set_protected(a, true).unwrap();
        assert_eq!(heap.value(b).unwrap().referrers(), &[a]);
        assert_eq!(heap.data(a).unwrap().as_scalar(), Some(3.0));
        heap.destroy(b);
        assert_eq!(heap.kind(a).unwrap(), Kind::Void);
        assert!(!heap.value(a).unwrap().is_protected());
        assert!(!heap.contains(b));
    }

    #[test]
    fn test_reassigning_pointer_deregisters() {
        let mut heap = Heap::new();
        let b = heap.alloc("b", Data::Int(3));
        let c = heap.alloc("c", Data::Int(4));
        let a = heap.alloc("a", Data::PtrVar(b));
        heap.set_data(a, Data::PtrVar(c)).unwrap();
        assert!(heap.value(b).unwrap().referrers().is_empty());
        assert_eq!(heap.value(c).unwrap().referrers(), &[a]);
    }

    #[test]
    fn test_list_owns_elements() {
        let mut heap = Heap::new();
        let x = heap.alloc("", Data::Int(1));
        let y = heap.alloc("", Data::Int(2));
        let list = heap.alloc("l", Data::List(vec![x, y]));
        let r = heap.alloc("r", Data::PtrVar(y));
        heap.destroy(list);
        assert!(!heap.contains(x));
        assert!(!heap.contains(y));
        assert_eq!(heap.kind(r).unwrap(), Kind::Void);
        assert_eq!(heap.len(), 1);
    }

    #[test]
    fn test_copy_is_independent() {
        let mut heap = Heap::new();
        let x = heap.alloc("", Data::Int(1));
        let list = heap.alloc("l", Data::List(vec![x]));
        let copy = heap.alloc("", Data::Void);
        heap.copy_instance(copy, list).unwrap();
        assert_eq!(heap.value(copy).unwrap().name(), "l");
        let element = heap.elements(copy).unwrap()[0];
        assert_ne!(element, x);
        heap.set_data(element, Data::Int(9)).unwrap();
        assert_eq!(heap.data(x).unwrap().as_scalar(), Some(1.0));
    }

    #[test]
    fn test_set_content_moves() {
        let mut heap = Heap::new();
        let x = heap.alloc("", Data::Int(1));
        let src = heap.alloc("", Data::List(vec![x]));
        let dst = heap.alloc("d", Data::Void);
        heap.set_content(dst, src).unwrap();
        assert_eq!(heap.kind(src).unwrap(), Kind::Void);
        assert_eq!(heap.elements(dst).unwrap(), vec![x]);
        assert!(heap.contains(x));
    }

    #[test]
    fn test_element_alias_writes_through() {
        let mut heap = Heap::new();
        let m = heap.alloc("m", Data::Matrix(Matrix::new(2, 2)));
        let p = heap.alloc(
            "",
            Data::Ptr(Alias {
                kind: Kind::Double,
                target: m,
                field: Field::Element(3),
            }),
        );
        assert_eq!(heap.kind(p).unwrap(), Kind::PtrDouble);
        heap.write(p, Data::Int(5)).unwrap();
        match &*heap.data(m).unwrap() {
            Data::Matrix(m) => assert_eq!(m.as_slice(), &[0.0, 0.0, 0.0, 5.0]),
            _ => panic!(),
        }
        heap.dereference_ptr(p).unwrap();
        assert_eq!(heap.kind(p).unwrap(), Kind::Double);
    }

    #[test]
    fn test_delete_respects_protection() {
        let mut heap = Heap::new();
        let a = heap.alloc("a", Data::Int(1));
        heap.set_protected(a, true).unwrap();
        assert!(!heap.delete(a, false));
        assert!(heap.contains(a));
        assert!(heap.delete(a, true));
        assert!(!heap.contains(a));
        assert!(!heap.delete(a, true));
        let b = heap.alloc("b", Data::Int(2));
        assert!(heap.delete(b, false));
        assert!(heap.is_empty());
    }

    #[test]
    fn test_dereference_var_levels() {
        let mut heap = Heap::new();
        let c = heap.alloc("c", Data::Int(3));
        let b = heap.alloc("b", Data::PtrVar(c));
        let a = heap.alloc("a", Data::PtrVar(b));
        assert_eq!(heap.dereference_var(a, false), b);
        assert_eq!(heap.dereference_var(b, false), c);
        assert_eq!(heap.dereference_var(c, false), c);
        assert_eq!(heap.dereference_var(a, true), c);
        heap.destroy(c);
        assert_eq!(heap.dereference_var(b, false), b);
        assert_eq!(heap.dereference_var(a, true), b);
    }

    #[test]
    fn test_casts() {
        let mut heap = Heap::new();
        let d = heap.alloc("", Data::Double(3.0 + 1e-13));
        assert_eq!(heap.cast_to_scalar(d, 1e-12), Some(3.0));
        assert_eq!(heap.cast_to_counter(d, true, 1e-12), Some(3));
        let h = heap.alloc("", Data::Double(2.5));
        assert_eq!(heap.cast_to_counter(h, true, 1e-12), None);
        assert_eq!(heap.cast_to_counter(h, false, 1e-12), Some(3));
        let mv = heap.alloc("", Data::MultiV(MultiVector::basis(Algebra::E3, 0)));
        assert_eq!(heap.cast_to_scalar(mv, 1e-12), None);
        let s = heap.alloc("", Data::MultiV(MultiVector::scalar(Algebra::E3, 2.0)));
        assert_eq!(heap.cast_to_scalar(s, 1e-12), Some(2.0));
        let list = heap.alloc("", Data::List(vec![d]));
        assert_eq!(heap.cast_to_counter(list, true, 1e-12), Some(3));
    }
}
