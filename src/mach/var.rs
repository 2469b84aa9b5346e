use super::ValueId;
use crate::error;
use crate::lang::Error;
use std::collections::HashMap;
use std::rc::Rc;

type Result<T> = std::result::Result<T, Error>;

/// ## Variable table
///
/// Maps names to values living in the heap. A table created with
/// `unique` rejects a second variable of the same name; otherwise the
/// new value replaces the old one, which is handed back to the caller
/// for release.

#[derive(Debug, Default)]
pub struct VarMap {
    vars: HashMap<Rc<str>, ValueId>,
    unique: bool,
}

impl VarMap {
    pub fn new() -> VarMap {
        VarMap::default()
    }

    pub fn unique() -> VarMap {
        VarMap {
            vars: HashMap::new(),
            unique: true,
        }
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn fetch(&self, name: &str) -> Option<ValueId> {
        self.vars.get(name).copied()
    }

    pub fn store(&mut self, name: &str, id: ValueId) -> Result<Option<ValueId>> {
        if self.vars.len() > u16::max_value() as usize {
            return Err(error!(OutOfMemory));
        }
        if self.unique && self.vars.contains_key(name) {
            return Err(error!(General; format!("Variable '{}' already exists.", name)));
        }
        Ok(self.vars.insert(name.into(), id))
    }

    /// Empty the table, handing back every value it held.
    pub fn drain(&mut self) -> Vec<ValueId> {
        self.vars.drain().map(|(_, id)| id).collect()
    }

    /// Variable names in sorted order.
    pub fn names(&self) -> Vec<Rc<str>> {
        let mut names: Vec<Rc<str>> = self.vars.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mach::{Data, Heap};

    #[test]
    fn test_unique_rejects_duplicates() {
        let mut heap = Heap::new();
        let a = heap.alloc("a", Data::Int(1));
        let b = heap.alloc("a", Data::Int(2));
        let mut shared = VarMap::new();
        assert_eq!(shared.store("a", a).unwrap(), None);
        assert_eq!(shared.store("a", b).unwrap(), Some(a));
        assert_eq!(shared.fetch("a"), Some(b));
        let mut unique = VarMap::unique();
        unique.store("a", a).unwrap();
        assert!(unique.store("a", b).is_err());
        assert_eq!(unique.fetch("a"), Some(a));
    }
}
