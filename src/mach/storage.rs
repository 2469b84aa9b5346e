use super::function::{self, Builtin};
use super::output::Output;
use super::render::{NullRenderer, Renderer};
use super::{Config, Data, Heap, Stack, ValueId, VarMap};
use crate::error;
use crate::lang::{Error, ErrorList};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

type Result<T> = std::result::Result<T, Error>;

/// Which variable table a lookup or definition addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    /// Whatever the current scope is.
    Current,
    Local,
    Global,
}

/// ## Execution state
///
/// Values live in the heap and are reached through the constant, global
/// and local tables, the temporaries of the current statement, or the
/// operand stack. Temporaries are protected while they sit on the stack;
/// they are reclaimed when their statement ends unless an assignment or
/// a list took ownership of them first.

pub struct Storage {
    pub(super) heap: Heap,
    constants: VarMap,
    /// Basis constants of the algebra chosen by a `DefVars` call.
    space: VarMap,
    globals: VarMap,
    pub(super) locals: Vec<VarMap>,
    pub(super) scope: Option<Namespace>,
    temps: Vec<ValueId>,
    pub(super) stack: Stack<ValueId>,
    errors: ErrorList,
    pub(super) config: Config,
    output: Vec<Output>,
    pub(super) renderer: Box<dyn Renderer>,
    functions: HashMap<&'static str, Builtin>,
    invalid: ValueId,
    interrupt: Arc<AtomicBool>,
}

impl Default for Storage {
    fn default() -> Self {
        Storage::new(Config::default())
    }
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage")
            .field("values", &self.heap.len())
            .field("globals", &self.globals.names())
            .field("locals", &self.locals.len())
            .field("temps", &self.temps.len())
            .field("stack", &self.stack)
            .finish()
    }
}

impl Storage {
    pub fn new(config: Config) -> Storage {
        let mut heap = Heap::new();
        let invalid = heap.alloc("", Data::Void);
        let _ = heap.set_protected(invalid, true);
        let mut storage = Storage {
            heap,
            constants: VarMap::unique(),
            space: VarMap::unique(),
            globals: VarMap::new(),
            locals: vec![],
            scope: None,
            temps: vec![],
            stack: Stack::new("Stack overflow.", config.max_stack),
            errors: ErrorList::new(),
            config,
            output: vec![],
            renderer: Box::new(NullRenderer),
            functions: function::table(),
            invalid,
            interrupt: Arc::new(AtomicBool::new(false)),
        };
        for (name, data) in function::constants() {
            storage.new_constant(name, data);
        }
        storage
    }

    fn new_constant(&mut self, name: &str, data: Data) {
        let id = self.heap.alloc(name, data);
        let _ = self.heap.set_protected(id, true);
        if self.constants.store(name, id).is_err() {
            self.heap.destroy(id);
        }
    }

    /// Replace the basis constants of the current algebra.
    pub(super) fn set_space_vars(&mut self, vars: Vec<(&str, Data)>) {
        for id in self.space.drain() {
            self.heap.destroy(id);
        }
        for (name, data) in vars {
            let id = self.heap.alloc(name, data);
            let _ = self.heap.set_protected(id, true);
            if self.space.store(name, id).is_err() {
                self.heap.destroy(id);
            }
        }
    }

    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    pub fn heap_mut(&mut self) -> &mut Heap {
        &mut self.heap
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sensitivity(&self) -> f64 {
        self.config.sensitivity
    }

    pub fn set_sensitivity(&mut self, sensitivity: f64) {
        self.config.sensitivity = sensitivity.abs();
    }

    pub fn set_loop_limit(&mut self, limit: usize) {
        self.config.loop_limit = limit;
    }

    pub fn errors(&self) -> &ErrorList {
        &self.errors
    }

    pub fn errors_mut(&mut self) -> &mut ErrorList {
        &mut self.errors
    }

    pub fn push_output(&mut self, output: Output) {
        debug!(%output, "print");
        self.output.push(output);
    }

    pub fn take_output(&mut self) -> Vec<Output> {
        std::mem::take(&mut self.output)
    }

    pub fn set_renderer(&mut self, renderer: Box<dyn Renderer>) {
        self.renderer = renderer;
    }

    /// Flag polled by loops; setting it stops execution with an error.
    pub fn interrupt_handle(&self) -> Arc<AtomicBool> {
        self.interrupt.clone()
    }

    pub(super) fn interrupted(&self) -> bool {
        self.interrupt.swap(false, Ordering::Relaxed)
    }

    /// Name under which `name` is known as a native function.
    pub fn builtin(&self, name: &str) -> Option<&'static str> {
        self.functions.get_key_value(name).map(|(k, _)| *k)
    }

    pub(super) fn function(&self, name: &str) -> Option<Builtin> {
        self.functions.get(name).copied()
    }

    /// Allocate a protected literal for the parser.
    pub fn new_literal(&mut self, data: Data) -> ValueId {
        let id = self.heap.alloc("", data);
        let _ = self.heap.set_protected(id, true);
        id
    }

    /// Release a value regardless of protection.
    pub fn release(&mut self, id: ValueId) {
        self.heap.destroy(id);
    }

    pub fn is_invalid(&self, id: ValueId) -> bool {
        id == self.invalid
    }

    fn table(&self, ns: Namespace) -> Option<Namespace> {
        match ns {
            Namespace::Current => self.scope,
            ns => Some(ns),
        }
    }

    /// Look a variable up. Constants win over everything; a miss yields
    /// the invalid sentinel.
    pub fn get_var(&self, name: &str, ns: Namespace) -> ValueId {
        if let Some(id) = self.constants.fetch(name).or_else(|| self.space.fetch(name)) {
            return id;
        }
        let found = match self.table(ns) {
            Some(Namespace::Global) => self.globals.fetch(name),
            Some(_) if !self.locals.is_empty() => {
                self.locals.last().and_then(|t| t.fetch(name))
            }
            _ => self
                .locals
                .last()
                .and_then(|t| t.fetch(name))
                .or_else(|| self.globals.fetch(name)),
        };
        found.unwrap_or(self.invalid)
    }

    /// Define a variable, replacing one of the same name in the target
    /// table.
    pub fn new_var(&mut self, name: &str, data: Data, ns: Namespace) -> Result<ValueId> {
        let local = !self.locals.is_empty() && self.table(ns) != Some(Namespace::Global);
        let id = self.heap.alloc(name, data);
        let stored = match (local, self.locals.last_mut()) {
            (true, Some(table)) => table.store(name, id),
            _ => self.globals.store(name, id),
        };
        match stored {
            Ok(Some(old)) => {
                self.heap.destroy(old);
                Ok(id)
            }
            Ok(None) => Ok(id),
            Err(e) => {
                self.heap.destroy(id);
                Err(e)
            }
        }
    }

    pub fn var_names(&self) -> Vec<std::rc::Rc<str>> {
        self.globals.names()
    }

    pub(super) fn push_locals(&mut self, table: VarMap) {
        self.locals.push(table);
    }

    pub(super) fn pop_locals(&mut self) {
        if let Some(mut table) = self.locals.pop() {
            for id in table.drain() {
                self.heap.destroy(id);
            }
        }
    }

    /// New protected temporary owned by the current statement.
    pub fn new_temp(&mut self, data: Data) -> Result<ValueId> {
        if self.temps.len() >= self.config.max_temp {
            return Err(error!(OutOfMemory; "Too many temporary values."));
        }
        let id = self.heap.alloc("", data);
        self.heap.set_protected(id, true)?;
        self.temps.push(id);
        Ok(id)
    }

    pub(super) fn new_named_temp(&mut self, name: &str, data: Data) -> Result<ValueId> {
        let id = self.new_temp(data)?;
        self.heap.set_name(id, name)?;
        Ok(id)
    }

    pub fn is_temp(&self, id: ValueId) -> bool {
        self.temps.iter().rev().any(|t| *t == id)
    }

    /// Take `id` out of the temporaries; the caller now owns it.
    pub fn forget_temp(&mut self, id: ValueId) -> bool {
        match self.temps.iter().rposition(|t| *t == id) {
            Some(pos) => {
                self.temps.remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn temp_count(&self) -> usize {
        self.temps.len()
    }

    /// Release `count` temporaries starting at `start`.
    pub fn delete_temps(&mut self, start: usize, count: usize) {
        let start = start.min(self.temps.len());
        let end = start.saturating_add(count).min(self.temps.len());
        let ids: Vec<ValueId> = self.temps.drain(start..end).collect();
        for id in ids {
            self.heap.destroy(id);
        }
    }

    /// Release every temporary created since `mark`, except `keep`.
    pub(super) fn reclaim_temps(&mut self, mark: usize, keep: Option<ValueId>) {
        if let Some(id) = keep {
            self.forget_temp(id);
        }
        let count = self.temps.len().saturating_sub(mark);
        self.delete_temps(mark, count);
        if let Some(id) = keep {
            self.temps.push(id);
        }
    }

    pub fn push(&mut self, id: ValueId) -> Result<()> {
        self.stack.push(id)
    }

    pub fn pop(&mut self) -> Result<ValueId> {
        self.stack.pop()
    }

    /// Run `f` in its own stack frame; whatever it leaves behind is
    /// dropped.
    pub fn in_frame<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Storage) -> Result<T>,
    {
        self.stack.lock();
        let result = f(self);
        self.stack.drain_frame();
        self.stack.unlock()?;
        result
    }

    /// Forget everything a previous statement may have left behind.
    pub fn reset_execution(&mut self) {
        self.stack.clear();
        let count = self.temps.len();
        self.delete_temps(0, count);
        while !self.locals.is_empty() {
            self.pop_locals();
        }
        self.scope = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants_shadow_variables() {
        let mut st = Storage::default();
        let pi = st.get_var("Pi", Namespace::Current);
        assert!(!st.is_invalid(pi));
        assert!(st.heap.value(pi).unwrap().is_protected());
        assert!(st.is_invalid(st.get_var("x", Namespace::Current)));
    }

    #[test]
    fn test_locals_and_globals() {
        let mut st = Storage::default();
        let g = st.new_var("x", Data::Int(1), Namespace::Current).unwrap();
        st.push_locals(VarMap::unique());
        st.scope = Some(Namespace::Local);
        assert!(st.is_invalid(st.get_var("x", Namespace::Current)));
        assert_eq!(st.get_var("x", Namespace::Global), g);
        let l = st.new_var("x", Data::Int(2), Namespace::Current).unwrap();
        assert_eq!(st.get_var("x", Namespace::Current), l);
        assert!(st.new_var("x", Data::Int(3), Namespace::Current).is_err());
        st.pop_locals();
        assert!(!st.heap.contains(l));
        st.scope = None;
        assert_eq!(st.get_var("x", Namespace::Current), g);
    }

    #[test]
    fn test_temps_are_reclaimed() {
        let mut st = Storage::default();
        let a = st.new_temp(Data::Int(1)).unwrap();
        let b = st.new_temp(Data::Int(2)).unwrap();
        let c = st.new_temp(Data::Int(3)).unwrap();
        assert!(st.forget_temp(b));
        st.reclaim_temps(0, Some(c));
        assert!(!st.heap.contains(a));
        assert!(st.heap.contains(b));
        assert!(st.is_temp(c));
        assert_eq!(st.temp_count(), 1);
    }

    #[test]
    fn test_temp_limit() {
        let mut st = Storage::new(Config {
            max_temp: 2,
            ..Config::default()
        });
        st.new_temp(Data::Void).unwrap();
        st.new_temp(Data::Void).unwrap();
        let e = st.new_temp(Data::Void).unwrap_err();
        assert_eq!(e.code(), crate::lang::ErrorCode::OutOfMemory);
    }
}
