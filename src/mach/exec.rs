use super::operation;
use super::output::Output;
use super::render::Drawable;
use super::storage::Namespace;
use super::{Alias, Data, Field, Kind, Storage, ValueId, VarMap};
use crate::error;
use crate::lang::ast::{Element, ElementList, Entry};
use crate::lang::{BinaryOp, Error, UnaryOp};
use std::rc::Rc;
use tracing::{trace, warn};

type Result<T> = std::result::Result<T, Error>;

/// How control leaves an element list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Next,
    Break,
}

impl Storage {
    /// Apply every element of `list` to the stack. Errors are located at
    /// the element that raised them.
    pub fn apply_list(&mut self, list: &ElementList) -> Result<Flow> {
        for entry in list {
            match self.apply(entry) {
                Ok(Flow::Next) => {}
                Ok(Flow::Break) => return Ok(Flow::Break),
                Err(e) => return Err(e.located(entry.line, &entry.column)),
            }
        }
        Ok(Flow::Next)
    }

    fn apply(&mut self, entry: &Entry) -> Result<Flow> {
        match &entry.element {
            Element::Literal(id) => {
                self.push(*id)?;
                Ok(Flow::Next)
            }
            Element::Label { name, global } => {
                let ns = if *global {
                    Namespace::Global
                } else {
                    Namespace::Current
                };
                let mut id = self.get_var(name, ns);
                if self.is_invalid(id) {
                    id = self.new_var(name, Data::Void, ns)?;
                }
                self.push(id)?;
                Ok(Flow::Next)
            }
            Element::Unary(op) => self.apply_unary(*op),
            Element::Binary(op) => self.apply_binary(*op),
            Element::FunctionCall(name) => self.apply_function(name),
            Element::ListBuilder { by_ref, parts } => self.build_list(*by_ref, parts),
            Element::List(list) => self.apply_list(list),
            Element::Loop(body) => self.run_loop(body),
            Element::Break => Ok(Flow::Break),
            Element::Branch {
                cond,
                then,
                otherwise,
            } => self.branch(cond, then, otherwise.as_ref()),
        }
    }

    fn apply_unary(&mut self, op: UnaryOp) -> Result<Flow> {
        let v = self.pop().map_err(|_| error!(NoRVal))?;
        match op {
            UnaryOp::Print => {
                let output = Output::describe(&self.heap, v)?;
                self.push_output(output);
            }
            UnaryOp::Draw => self.draw(v)?,
            op => {
                let data = operation::unary(self, op, v)?;
                let id = self.new_temp(data)?;
                self.push(id)?;
            }
        }
        Ok(Flow::Next)
    }

    fn apply_binary(&mut self, op: BinaryOp) -> Result<Flow> {
        let r = self.pop().map_err(|_| error!(NoRVal))?;
        let l = self.pop().map_err(|_| error!(NoLVal))?;
        match op {
            BinaryOp::Call => {
                let result = self.call(l, r)?;
                self.push(result)?;
            }
            op if op.is_assign() => {
                operation::assign(self, op, l, r)?;
                self.push(l)?;
            }
            op => {
                let data = operation::binary(self, op, l, r)?;
                let id = self.new_temp(data)?;
                self.push(id)?;
            }
        }
        Ok(Flow::Next)
    }

    fn apply_function(&mut self, name: &'static str) -> Result<Flow> {
        let args = self.pop().map_err(|_| error!(NoFuncParams))?;
        let function = match self.function(name) {
            Some(function) => function,
            None => return Err(error!(Internal; format!("Unknown function '{}'.", name))),
        };
        let args = self.heap.elements(args)?;
        trace!(function = name, args = args.len(), "call");
        let data = function(self, &args)?;
        let id = self.new_temp(data)?;
        self.push(id)?;
        Ok(Flow::Next)
    }

    /// Collect the values of `parts` into a new list. Temporaries move
    /// into the list; named values are referenced when `by_ref` is set,
    /// copied otherwise.
    fn build_list(&mut self, by_ref: bool, parts: &[ElementList]) -> Result<Flow> {
        let items = self.in_frame(|st| {
            for part in parts {
                if st.apply_list(part)? == Flow::Break {
                    return Err(error!(Break));
                }
            }
            Ok(st.stack.drain_frame())
        })?;
        let mut elements = Vec::with_capacity(items.len());
        let mut sources = Vec::with_capacity(items.len());
        for item in items {
            match self.list_element(item, by_ref) {
                Ok((element, source)) => {
                    elements.push(element);
                    sources.push(source);
                }
                Err(e) => {
                    elements.into_iter().for_each(|id| self.heap.destroy(id));
                    return Err(e);
                }
            }
        }
        let list = self.new_temp(Data::List(elements))?;
        self.heap.set_sources(list, sources)?;
        self.push(list)?;
        Ok(Flow::Next)
    }

    fn list_element(&mut self, item: ValueId, by_ref: bool) -> Result<(ValueId, Option<ValueId>)> {
        if self.forget_temp(item) {
            self.heap.set_protected(item, false)?;
            if !by_ref {
                self.heap.materialize(item)?;
            }
            return Ok((item, None));
        }
        let named = !self.heap.value(item)?.name().is_empty();
        let source = if named { Some(item) } else { None };
        if by_ref && named {
            let target = self.heap.resolve(item);
            return Ok((self.heap.alloc("", Data::PtrVar(target)), source));
        }
        let element = self.heap.alloc("", Data::Void);
        let copied = self
            .heap
            .copy_instance(element, item)
            .and_then(|_| self.heap.materialize(element));
        match copied {
            Ok(()) => Ok((element, source)),
            Err(e) => {
                self.heap.destroy(element);
                Err(e)
            }
        }
    }

    fn run_loop(&mut self, body: &ElementList) -> Result<Flow> {
        let limit = self.config.loop_limit;
        let mut count = 0;
        loop {
            if self.interrupted() {
                return Err(Error::general("Execution interrupted."));
            }
            if count >= limit {
                warn!(limit, "loop limit reached");
                return Err(error!(MaxLoopCount));
            }
            count += 1;
            match self.exec_statement(body, false) {
                Ok((Flow::Break, _)) => break,
                Ok(_) => {}
                Err(e) if e.is_break() => break,
                Err(e) => return Err(e),
            }
        }
        trace!(count, "loop done");
        Ok(Flow::Next)
    }

    fn branch(
        &mut self,
        cond: &ElementList,
        then: &ElementList,
        otherwise: Option<&ElementList>,
    ) -> Result<Flow> {
        let c = self.in_frame(|st| {
            st.apply_list(cond)?;
            let v = st.pop().map_err(|_| error!(MissingIfCondition))?;
            let precision = st.sensitivity();
            match st.heap.cast_to_scalar(v, precision) {
                Some(c) => Ok(c),
                None => {
                    let value = st.heap.value(v)?;
                    Err(Error::invalid_type(
                        value.name(),
                        st.heap.base_kind(v)?.name(),
                        "a condition",
                    ))
                }
            }
        })?;
        let branch = if c != 0.0 { Some(then) } else { otherwise };
        match branch {
            Some(list) => Ok(self.exec_statement(list, false)?.0),
            None => Ok(Flow::Next),
        }
    }

    /// Run one statement in its own stack frame and release the
    /// temporaries it created. With `keep`, a copy of the value left on
    /// top of the stack survives the cleanup and is returned.
    pub fn exec_statement(
        &mut self,
        statement: &ElementList,
        keep: bool,
    ) -> Result<(Flow, Option<ValueId>)> {
        let mark = self.temp_count();
        let result = self.in_frame(|st| {
            let flow = st.apply_in_place(statement)?;
            let top = st.stack.last().copied();
            match (flow, top) {
                (Flow::Next, Some(top)) if keep => Ok((flow, Some(st.snapshot(top)?))),
                _ => Ok((flow, None)),
            }
        });
        let kept = match &result {
            Ok((_, kept)) => *kept,
            Err(_) => None,
        };
        self.reclaim_temps(mark, kept);
        result
    }

    /// Apply a statement; a code literal left on top is run in place.
    fn apply_in_place(&mut self, statement: &ElementList) -> Result<Flow> {
        if self.apply_list(statement)? == Flow::Break {
            return Ok(Flow::Break);
        }
        let top = match self.stack.last().copied() {
            Some(top) => top,
            None => return Ok(Flow::Next),
        };
        let code = match self.heap.value(top)?.data() {
            Data::Code(code) if self.is_code_literal(top) => code.clone(),
            _ => return Ok(Flow::Next),
        };
        self.pop()?;
        Ok(self.exec_block(&code, false)?.0)
    }

    fn is_code_literal(&self, id: ValueId) -> bool {
        match self.heap.get(id) {
            Some(value) => value.is_protected() && value.name().is_empty() && !self.is_temp(id),
            None => false,
        }
    }

    /// Run the statements of a code block. With `keep_last`, a copy of
    /// the value of the last statement is returned.
    fn exec_block(&mut self, code: &ElementList, keep_last: bool) -> Result<(Flow, Option<ValueId>)> {
        let n = code.len();
        for (i, entry) in code.iter().enumerate() {
            let statement = match &entry.element {
                Element::List(statement) => statement,
                _ => continue,
            };
            let keep = keep_last && i + 1 == n;
            let (flow, value) = self.exec_statement(statement, keep)?;
            if flow == Flow::Break {
                return Ok((Flow::Break, None));
            }
            if keep {
                return Ok((Flow::Next, value));
            }
        }
        Ok((Flow::Next, None))
    }

    /// Fully dereferenced, unnamed copy of `id` as a new temporary.
    fn snapshot(&mut self, id: ValueId) -> Result<ValueId> {
        let copy = self.new_temp(Data::Void)?;
        self.heap.copy_instance(copy, id)?;
        self.heap.materialize(copy)?;
        self.heap.set_name(copy, "")?;
        Ok(copy)
    }

    /// Apply `l` to the argument list `r`: run it when it is code,
    /// otherwise select elements.
    fn call(&mut self, l: ValueId, r: ValueId) -> Result<ValueId> {
        let code = match &*self.heap.data(l)? {
            Data::Code(code) => Some(code.clone()),
            _ => None,
        };
        match code {
            Some(code) => self.call_code(&code, r),
            None => {
                let args = self.heap.elements(r)?;
                operation::element(self, l, &args)
            }
        }
    }

    /// Run user code with `args` bound to `_P` in a fresh local table.
    /// The value of the last statement is the result.
    pub fn call_code(&mut self, code: &Rc<ElementList>, args: ValueId) -> Result<ValueId> {
        if self.locals.len() >= self.config.max_call_depth {
            return Err(error!(OutOfMemory; "Function calls nested too deep."));
        }
        let target = self.heap.target(args)?;
        let params = self.heap.alloc(
            "_P",
            Data::Ptr(Alias {
                kind: Kind::List,
                target,
                field: Field::Whole,
            }),
        );
        let mut table = VarMap::unique();
        if let Err(e) = table.store("_P", params) {
            self.heap.destroy(params);
            return Err(e);
        }
        self.push_locals(table);
        let saved = self.scope;
        self.scope = Some(Namespace::Local);
        let result = self.in_frame(|st| st.exec_block(code, true));
        self.pop_locals();
        self.scope = if self.locals.is_empty() {
            Some(Namespace::Global)
        } else {
            saved
        };
        match result? {
            (Flow::Break, _) => Err(error!(Break)),
            (Flow::Next, Some(id)) => Ok(id),
            (Flow::Next, None) => self.new_temp(Data::Void),
        }
    }

    fn draw(&mut self, id: ValueId) -> Result<()> {
        let elements = match &*self.heap.data(id)? {
            Data::List(elements) => Some(elements.clone()),
            _ => None,
        };
        if let Some(elements) = elements {
            for element in elements {
                self.draw(element)?;
            }
            return Ok(());
        }
        let data = self.heap.data(id)?;
        let renderer = &mut self.renderer;
        match &*data {
            Data::Color(c) => renderer.set_color(*c),
            Data::MultiV(mv) => renderer.draw(Drawable::MultiVector(mv)),
            Data::Matrix(m) => renderer.draw(Drawable::Matrix(m)),
            Data::VertexList(v) => renderer.draw(Drawable::VertexList(v)),
            Data::Image(i) => renderer.draw(Drawable::Image(i)),
            Data::Scene(s) => renderer.draw(Drawable::Scene(s)),
            data => {
                let value = self.heap.value(id)?;
                return Err(Error::invalid_type(value.name(), data.kind().name(), "drawing"));
            }
        }
        Ok(())
    }
}
