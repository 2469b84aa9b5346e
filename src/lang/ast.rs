use super::operator::{BinaryOp, UnaryOp};
use super::{Column, LineNumber};
use crate::mach::ValueId;
use std::rc::Rc;

/// ## Executable element lists
///
/// Statements are stored as postfix lists of elements. Operands come
/// before their operator; nested lists stand for bracketed groups,
/// loop bodies and branches.

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementList {
    entries: Vec<Entry>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub element: Element,
    pub line: LineNumber,
    pub column: Column,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    /// Protected value allocated at parse time.
    Literal(ValueId),
    Label {
        name: Rc<str>,
        global: bool,
    },
    Unary(UnaryOp),
    Binary(BinaryOp),
    /// Native function applied to the argument list on top of the stack.
    FunctionCall(&'static str),
    ListBuilder {
        by_ref: bool,
        parts: Vec<ElementList>,
    },
    List(ElementList),
    Loop(ElementList),
    Break,
    Branch {
        cond: ElementList,
        then: ElementList,
        otherwise: Option<ElementList>,
    },
}

impl ElementList {
    pub fn new() -> ElementList {
        ElementList::default()
    }

    pub fn push(&mut self, element: Element, line: LineNumber, column: Column) {
        self.entries.push(Entry {
            element,
            line,
            column,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Entry> {
        self.entries.iter()
    }

    pub fn last(&self) -> Option<&Entry> {
        self.entries.last()
    }
}

impl<'a> IntoIterator for &'a ElementList {
    type Item = &'a Entry;
    type IntoIter = std::slice::Iter<'a, Entry>;
    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
