use super::ast::{Element, ElementList};
use super::handler::{HandlerKind, HandlerTable, Parsed};
use super::operator::Symbol;
use super::include::{Includes, NoIncludes};
use super::text::{preparse_with, TextLine, SPECIAL};
use super::{Column, Error, LineNumber};
use crate::error;
use crate::mach::{Data, Storage, ValueId};
use tracing::trace;

type Result<T> = std::result::Result<T, Error>;

/// Parse levels open at once. Brackets and right-binding operators each
/// hold native stack while open.
const MAX_NESTING: usize = 256;

/// Why a parse loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseSignal {
    WeakerOp,
    Comma,
    ClosedRound,
    ClosedCurly,
    ClosedSquare,
    EndOfLine,
    Then,
    Else,
}

/// ## Parsed statement
///
/// One top level statement with the literals allocated for it. The
/// literals are released when the line is removed.

#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub statement: ElementList,
    pub literals: Vec<ValueId>,
    pub number: LineNumber,
}

/// Parse `text` into top level statements. Literals are allocated in
/// `storage`; on failure every literal allocated so far is released.
pub fn parse(text: &str, storage: &mut Storage) -> Result<Vec<Line>> {
    parse_with(text, &NoIncludes, &[], storage)
}

/// `parse` with `#include` resolved through `includes`. `open` names the
/// files being read, the one holding `text` last.
pub fn parse_with(
    text: &str,
    includes: &dyn Includes,
    open: &[String],
    storage: &mut Storage,
) -> Result<Vec<Line>> {
    let lines = preparse_with(text, includes, open)?;
    let mut parser = Parser::new(&lines, storage);
    match parser.parse_all() {
        Ok(parsed) => Ok(parsed),
        Err(e) => {
            for id in parser.literals.drain(..) {
                parser.storage.release(id);
            }
            Err(e)
        }
    }
}

pub struct Parser<'a> {
    lines: &'a [TextLine],
    line: usize,
    pos: usize,
    levels: Vec<i32>,
    pub(super) round: usize,
    pub(super) square: usize,
    pub(super) prev: HandlerKind,
    cur: HandlerKind,
    pub(super) expect_operand: bool,
    lists: Vec<ElementList>,
    pub(super) storage: &'a mut Storage,
    literals: Vec<ValueId>,
    table: HandlerTable,
}

impl<'a> Parser<'a> {
    fn new(lines: &'a [TextLine], storage: &'a mut Storage) -> Parser<'a> {
        Parser {
            lines,
            line: 0,
            pos: 0,
            levels: vec![],
            round: 0,
            square: 0,
            prev: HandlerKind::Start,
            cur: HandlerKind::Start,
            expect_operand: true,
            lists: vec![],
            storage,
            literals: vec![],
            table: HandlerTable::new(),
        }
    }

    fn parse_all(&mut self) -> Result<Vec<Line>> {
        let mut parsed = vec![];
        while self.line < self.lines.len() {
            let start = self.literals.len();
            let (number, _) = self.location();
            let statement = match self.parse_statement() {
                Ok(statement) => statement,
                Err(e) => {
                    for line in parsed.drain(..) {
                        let Line { literals, .. } = line;
                        self.literals.extend(literals);
                    }
                    return Err(e);
                }
            };
            trace!(line = ?number, entries = statement.len(), "parsed statement");
            self.next_line();
            if !statement.is_empty() {
                parsed.push(Line {
                    statement,
                    literals: self.literals.split_off(start),
                    number,
                });
            }
        }
        Ok(parsed)
    }

    fn parse_statement(&mut self) -> Result<ElementList> {
        self.levels.clear();
        self.round = 0;
        self.square = 0;
        self.prev = HandlerKind::Start;
        self.cur = HandlerKind::Start;
        let (list, signal) = self.sub_parse()?;
        match signal {
            ParseSignal::EndOfLine => Ok(list),
            ParseSignal::Comma => Err(self.error(error!(UnexpectedComma))),
            ParseSignal::ClosedRound => Err(self.error(error!(MissingOpenRound))),
            ParseSignal::ClosedCurly => Err(self.error(error!(MissingOpenCurly))),
            ParseSignal::ClosedSquare => Err(self.error(error!(MissingOpenSquare))),
            ParseSignal::Then => Err(self.error(error!(MissingIfCondition))),
            ParseSignal::Else => Err(self.error(error!(MissingIfTrue))),
            ParseSignal::WeakerOp => Err(self.error(error!(Internal))),
        }
    }

    /// Run handlers until one of them signals.
    pub(super) fn basic_parse_loop(&mut self) -> Result<ParseSignal> {
        loop {
            let symbol = match self.symbol() {
                Some(symbol) => symbol,
                None => return Ok(ParseSignal::EndOfLine),
            };
            let handler = self.table.handler(symbol);
            let kind = handler.kind();
            if kind != HandlerKind::Separator {
                self.prev = self.cur;
                self.cur = kind;
            }
            if let Parsed::Signal(signal) = handler.parse(self)? {
                return Ok(signal);
            }
        }
    }

    /// Parse into a fresh element list at the reset level.
    pub(super) fn sub_parse(&mut self) -> Result<(ElementList, ParseSignal)> {
        self.enter_level(-1)?;
        self.lists.push(ElementList::new());
        self.expect_operand = true;
        let signal = self.basic_parse_loop();
        self.levels.pop();
        let list = self.lists.pop().unwrap_or_default();
        Ok((list, signal?))
    }

    /// Parse the right side of an operator bound at `level`.
    pub(super) fn parse_at_level(&mut self, level: i32) -> Result<ParseSignal> {
        self.enter_level(level)?;
        self.expect_operand = true;
        let signal = self.basic_parse_loop();
        self.levels.pop();
        signal
    }

    fn enter_level(&mut self, level: i32) -> Result<()> {
        if self.levels.len() >= MAX_NESTING {
            return Err(self.error(error!(ParseOutOfMemory; "Expression nested too deep.")));
        }
        self.levels.push(level);
        Ok(())
    }

    pub(super) fn level(&self) -> i32 {
        self.levels.last().copied().unwrap_or(-1)
    }

    fn text(&self) -> &'a [u8] {
        match self.lines.get(self.line) {
            Some(line) => line.bytes(),
            None => &[],
        }
    }

    pub(super) fn symbol(&self) -> Option<Symbol> {
        let text = self.text();
        match text.get(self.pos)? {
            &SPECIAL => text.get(self.pos + 1).map(|id| Symbol::Special(*id)),
            b => Some(Symbol::Plain(*b)),
        }
    }

    pub(super) fn byte(&self, ahead: usize) -> Option<u8> {
        self.text().get(self.pos + ahead).copied()
    }

    pub(super) fn advance(&mut self, n: usize) {
        self.pos += n;
    }

    pub(super) fn next_line(&mut self) -> bool {
        self.line += 1;
        self.pos = 0;
        self.line < self.lines.len()
    }

    pub(super) fn next_line_starts_with(&self, id: u8) -> bool {
        self.lines
            .get(self.line + 1)
            .map_or(false, |line| line.starts_with_special(id))
    }

    pub(super) fn location(&self) -> (LineNumber, Column) {
        match self.lines.get(self.line) {
            Some(line) => {
                let (number, col) = line.position(self.pos);
                (number, col..col + 1)
            }
            None => (None, 0..0),
        }
    }

    pub(super) fn error(&self, error: Error) -> Error {
        let (line, column) = self.location();
        error.located(line, &column)
    }

    pub(super) fn error_at(&self, error: Error, at: &(LineNumber, Column)) -> Error {
        error.located(at.0, &at.1)
    }

    pub(super) fn append(&mut self, element: Element, at: (LineNumber, Column)) {
        if let Some(list) = self.lists.last_mut() {
            list.push(element, at.0, at.1);
        }
    }

    pub(super) fn new_literal(&mut self, data: Data) -> ValueId {
        let id = self.storage.new_literal(data);
        self.literals.push(id);
        id
    }
}
