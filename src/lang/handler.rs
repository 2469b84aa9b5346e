use super::ast::{Element, ElementList};
use super::operator::{self, OpDef, Symbol};
use super::parser::{ParseSignal, Parser};
use super::text::{is_label_byte, special, GLOBAL, SPECIAL};
use super::{Column, Error, LineNumber};
use crate::error;
use crate::mach::Data;
use std::rc::Rc;

type Result<T> = std::result::Result<T, Error>;

/// Outcome of one handler invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parsed {
    Done,
    Signal(ParseSignal),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerKind {
    Start,
    Separator,
    Number,
    Label,
    Str,
    Operator,
    Call,
    OpenRound,
    CloseRound,
    OpenSquare,
    CloseSquare,
    OpenCurly,
    CloseCurly,
    Comma,
    If,
    Then,
    Else,
    Loop,
    Break,
    Unknown,
}

/// ## Symbol handler
///
/// The parser dispatches on the symbol under the cursor. A handler
/// consumes its symbol and whatever belongs to it, appends elements
/// and either lets the loop continue or stops it with a signal.

pub trait ParseHandler {
    fn kind(&self) -> HandlerKind;
    fn parse(&self, p: &mut Parser) -> Result<Parsed>;
}

pub struct HandlerTable {
    basic: Vec<&'static dyn ParseHandler>,
    special: Vec<&'static dyn ParseHandler>,
}

impl HandlerTable {
    pub fn new() -> HandlerTable {
        let unknown: &'static dyn ParseHandler = &UNKNOWN;
        let mut basic = vec![unknown; 256];
        let mut specials = vec![unknown; 256];
        for symbol in operator::symbols() {
            match symbol {
                Symbol::Plain(b) => basic[b as usize] = &OPERATOR,
                Symbol::Special(b) => specials[b as usize] = &OPERATOR,
            }
        }
        for b in (b'0'..=b'9').map(usize::from) {
            basic[b] = &NUMBER;
        }
        for b in (b'a'..=b'z').chain(b'A'..=b'Z').map(usize::from) {
            basic[b] = &LABEL;
        }
        basic[b'_' as usize] = &LABEL;
        basic[GLOBAL as usize] = &LABEL;
        basic[b' ' as usize] = &SEPARATOR;
        basic[b'"' as usize] = &STRING;
        basic[b'(' as usize] = &OPEN_ROUND;
        basic[b')' as usize] = &CLOSE_ROUND;
        basic[b'[' as usize] = &OPEN_SQUARE;
        basic[b']' as usize] = &CLOSE_SQUARE;
        basic[b'{' as usize] = &OPEN_CURLY;
        basic[b'}' as usize] = &CLOSE_CURLY;
        basic[b',' as usize] = &COMMA;
        specials[special::CALL as usize] = &CALL;
        specials[special::IF as usize] = &IF;
        specials[special::THEN as usize] = &THEN;
        specials[special::ELSE as usize] = &ELSE;
        specials[special::LOOP as usize] = &LOOP;
        specials[special::BREAK as usize] = &BREAK;
        HandlerTable {
            basic,
            special: specials,
        }
    }

    pub fn handler(&self, symbol: Symbol) -> &'static dyn ParseHandler {
        match symbol {
            Symbol::Plain(b) => self.basic[b as usize],
            Symbol::Special(b) => self.special[b as usize],
        }
    }
}

static UNKNOWN: Unknown = Unknown;
static SEPARATOR: Separator = Separator;
static NUMBER: Number = Number;
static LABEL: Label = Label;
static STRING: Str = Str;
static OPERATOR: Operator = Operator;
static CALL: Call = Call;
static OPEN_ROUND: OpenRound = OpenRound;
static CLOSE_ROUND: CloseRound = CloseRound;
static OPEN_SQUARE: OpenSquare = OpenSquare;
static CLOSE_SQUARE: CloseSquare = CloseSquare;
static OPEN_CURLY: OpenCurly = OpenCurly;
static CLOSE_CURLY: CloseCurly = CloseCurly;
static COMMA: Comma = Comma;
static IF: If = If;
static THEN: Then = Then;
static ELSE: Else = Else;
static LOOP: Loop = Loop;
static BREAK: Break = Break;

/// An operand may only start where one is expected.
fn operand_start(p: &Parser) -> Result<()> {
    if p.expect_operand {
        Ok(())
    } else {
        Err(p.error(error!(UnexpectedSymbol)))
    }
}

struct Unknown;

impl ParseHandler for Unknown {
    fn kind(&self) -> HandlerKind {
        HandlerKind::Unknown
    }
    fn parse(&self, p: &mut Parser) -> Result<Parsed> {
        Err(p.error(error!(UnknownSymbol)))
    }
}

struct Separator;

impl ParseHandler for Separator {
    fn kind(&self) -> HandlerKind {
        HandlerKind::Separator
    }
    fn parse(&self, p: &mut Parser) -> Result<Parsed> {
        p.advance(1);
        Ok(Parsed::Done)
    }
}

struct Number;

impl ParseHandler for Number {
    fn kind(&self) -> HandlerKind {
        HandlerKind::Number
    }
    fn parse(&self, p: &mut Parser) -> Result<Parsed> {
        operand_start(p)?;
        let at = p.location();
        let mut text = String::new();
        let digit = |b: Option<u8>| b.map_or(false, |b| b.is_ascii_digit());
        let data = if p.byte(0) == Some(b'0') && matches!(p.byte(1), Some(b'x') | Some(b'X')) {
            p.advance(2);
            while p.byte(0).map_or(false, |b| b.is_ascii_hexdigit()) {
                take(p, &mut text);
            }
            match i64::from_str_radix(&text, 16) {
                Ok(v) => integer(v),
                Err(_) => return Err(p.error_at(error!(InvalidSyntax), &at)),
            }
        } else {
            let mut float = false;
            while digit(p.byte(0)) {
                take(p, &mut text);
            }
            if p.byte(0) == Some(b'.') {
                float = true;
                take(p, &mut text);
                while digit(p.byte(0)) {
                    take(p, &mut text);
                }
            }
            let signed = matches!(p.byte(1), Some(b'+') | Some(b'-'));
            if matches!(p.byte(0), Some(b'e') | Some(b'E'))
                && (digit(p.byte(1)) || (signed && digit(p.byte(2))))
            {
                float = true;
                take(p, &mut text);
                if matches!(p.byte(0), Some(b'+') | Some(b'-')) {
                    take(p, &mut text);
                }
                while digit(p.byte(0)) {
                    take(p, &mut text);
                }
            }
            let suffix = match p.byte(0) {
                Some(b'f') | Some(b'F') => Some(true),
                Some(b'd') | Some(b'D') => Some(false),
                _ => None,
            };
            if suffix.is_some() {
                p.advance(1);
            }
            match (suffix, float) {
                (None, false) => match text.parse::<i64>() {
                    Ok(v) => integer(v),
                    Err(_) => double(&text, p, &at)?,
                },
                (Some(true), _) => match text.parse::<f32>() {
                    Ok(v) => Data::Float(v),
                    Err(_) => return Err(p.error_at(error!(InvalidSyntax), &at)),
                },
                _ => double(&text, p, &at)?,
            }
        };
        let id = p.new_literal(data);
        p.append(Element::Literal(id), at);
        p.expect_operand = false;
        Ok(Parsed::Done)
    }
}

fn take(p: &mut Parser, text: &mut String) {
    if let Some(b) = p.byte(0) {
        text.push(b as char);
        p.advance(1);
    }
}

fn integer(v: i64) -> Data {
    if v >= i64::from(i32::min_value()) && v <= i64::from(i32::max_value()) {
        Data::Int(v as i32)
    } else {
        Data::Long(v)
    }
}

fn double(text: &str, p: &Parser, at: &(LineNumber, Column)) -> Result<Data> {
    match text.parse::<f64>() {
        Ok(v) => Ok(Data::Double(v)),
        Err(_) => Err(p.error_at(error!(InvalidSyntax), at)),
    }
}

struct Label;

impl ParseHandler for Label {
    fn kind(&self) -> HandlerKind {
        HandlerKind::Label
    }
    fn parse(&self, p: &mut Parser) -> Result<Parsed> {
        operand_start(p)?;
        let at = p.location();
        let global = p.byte(0) == Some(GLOBAL);
        if global {
            p.advance(1);
        }
        let mut name = String::new();
        while let Some(b) = p.byte(0) {
            if !is_label_byte(b) || b == GLOBAL {
                break;
            }
            name.push(b as char);
            p.advance(1);
        }
        if name.is_empty() {
            return Err(p.error_at(error!(InvalidSyntax), &at));
        }
        let builtin = if global {
            None
        } else {
            p.storage.builtin(&name)
        };
        match builtin {
            Some(function) if p.symbol() == Some(Symbol::Special(special::CALL)) => {
                p.advance(2);
                p.prev = HandlerKind::Call;
                p.expect_operand = true;
                parse_round(p, true)?;
                p.append(Element::FunctionCall(function), at);
            }
            _ => p.append(
                Element::Label {
                    name: Rc::from(name.as_str()),
                    global,
                },
                at,
            ),
        }
        p.expect_operand = false;
        Ok(Parsed::Done)
    }
}

struct Str;

impl ParseHandler for Str {
    fn kind(&self) -> HandlerKind {
        HandlerKind::Str
    }
    fn parse(&self, p: &mut Parser) -> Result<Parsed> {
        operand_start(p)?;
        let at = p.location();
        p.advance(1);
        let mut bytes = vec![];
        loop {
            match p.byte(0) {
                Some(b'"') => {
                    p.advance(1);
                    break;
                }
                Some(SPECIAL) => {
                    if let Some(b) = p.byte(1) {
                        bytes.push(b);
                    }
                    p.advance(2);
                }
                Some(b) => {
                    bytes.push(b);
                    p.advance(1);
                }
                None => return Err(p.error_at(error!(InvalidSyntax; "Missing '\"'"), &at)),
            }
        }
        let text = String::from_utf8_lossy(&bytes).into_owned();
        let id = p.new_literal(Data::Str(text));
        p.append(Element::Literal(id), at);
        p.expect_operand = false;
        Ok(Parsed::Done)
    }
}

/// Operator precedence climbing. A binary operator bound no tighter than
/// the current level hands control back with `WeakerOp`; otherwise its
/// right operand is parsed at the operator's own level and the operator
/// is appended after it.
fn parse_operator(p: &mut Parser, def: &OpDef) -> Result<Parsed> {
    let at = p.location();
    let len = def.symbol.len();
    let (element, level) = if p.expect_operand {
        match def.unary {
            Some((op, level)) => (Element::Unary(op), level),
            None => return Err(p.error(error!(NonUnaryOp))),
        }
    } else {
        match def.binary {
            Some((op, level)) => {
                let current = p.level();
                if current >= 0
                    && (level > current || (level == current && !def.right_to_left))
                {
                    return Ok(Parsed::Signal(ParseSignal::WeakerOp));
                }
                (Element::Binary(op), level)
            }
            None => return Err(p.error(error!(NonBinaryOp))),
        }
    };
    p.advance(len);
    let signal = p.parse_at_level(level)?;
    p.append(element, at);
    p.expect_operand = false;
    match signal {
        ParseSignal::WeakerOp => Ok(Parsed::Done),
        signal => Ok(Parsed::Signal(signal)),
    }
}

struct Operator;

impl ParseHandler for Operator {
    fn kind(&self) -> HandlerKind {
        HandlerKind::Operator
    }
    fn parse(&self, p: &mut Parser) -> Result<Parsed> {
        match p.symbol().and_then(operator::lookup) {
            Some(def) => parse_operator(p, def),
            None => Err(p.error(error!(UnknownSymbol))),
        }
    }
}

struct Call;

impl ParseHandler for Call {
    fn kind(&self) -> HandlerKind {
        HandlerKind::Call
    }
    fn parse(&self, p: &mut Parser) -> Result<Parsed> {
        match operator::lookup(Symbol::Special(special::CALL)) {
            Some(def) => parse_operator(p, def),
            None => Err(p.error(error!(Internal))),
        }
    }
}

/// Parse a round bracket group. After a call it becomes the by-reference
/// argument list, otherwise a plain group or, with commas, a list.
fn parse_round(p: &mut Parser, by_ref: bool) -> Result<Parsed> {
    operand_start(p)?;
    let at = p.location();
    p.advance(1);
    p.round += 1;
    let mut parts = vec![];
    loop {
        let (part, signal) = p.sub_parse()?;
        match signal {
            ParseSignal::Comma => {
                if part.is_empty() {
                    return Err(p.error(error!(UnexpectedComma)));
                }
                parts.push(part);
                p.advance(1);
            }
            ParseSignal::ClosedRound => {
                if !part.is_empty() {
                    parts.push(part);
                }
                break;
            }
            _ => return Err(p.error_at(error!(MissingCloseRound), &at)),
        }
    }
    if by_ref {
        p.append(
            Element::ListBuilder {
                by_ref: true,
                parts,
            },
            at,
        );
    } else if parts.len() == 1 {
        let part = parts.pop().unwrap_or_default();
        p.append(Element::List(part), at);
    } else {
        p.append(
            Element::ListBuilder {
                by_ref: false,
                parts,
            },
            at,
        );
    }
    p.expect_operand = false;
    Ok(Parsed::Done)
}

struct OpenRound;

impl ParseHandler for OpenRound {
    fn kind(&self) -> HandlerKind {
        HandlerKind::OpenRound
    }
    fn parse(&self, p: &mut Parser) -> Result<Parsed> {
        let by_ref = p.prev == HandlerKind::Call;
        parse_round(p, by_ref)
    }
}

struct CloseRound;

impl ParseHandler for CloseRound {
    fn kind(&self) -> HandlerKind {
        HandlerKind::CloseRound
    }
    fn parse(&self, p: &mut Parser) -> Result<Parsed> {
        if p.round == 0 {
            return Err(p.error(error!(MissingOpenRound)));
        }
        p.round -= 1;
        p.advance(1);
        Ok(Parsed::Signal(ParseSignal::ClosedRound))
    }
}

struct OpenSquare;

impl ParseHandler for OpenSquare {
    fn kind(&self) -> HandlerKind {
        HandlerKind::OpenSquare
    }
    fn parse(&self, p: &mut Parser) -> Result<Parsed> {
        operand_start(p)?;
        let at = p.location();
        p.advance(1);
        p.square += 1;
        let mut parts = vec![];
        loop {
            let (part, signal) = p.sub_parse()?;
            match signal {
                ParseSignal::Comma => {
                    if part.is_empty() {
                        return Err(p.error(error!(UnexpectedComma)));
                    }
                    parts.push(part);
                    p.advance(1);
                }
                ParseSignal::ClosedSquare => {
                    if !part.is_empty() {
                        parts.push(part);
                    }
                    break;
                }
                _ => return Err(p.error_at(error!(MissingCloseSquare), &at)),
            }
        }
        p.append(
            Element::ListBuilder {
                by_ref: false,
                parts,
            },
            at,
        );
        p.expect_operand = false;
        Ok(Parsed::Done)
    }
}

struct CloseSquare;

impl ParseHandler for CloseSquare {
    fn kind(&self) -> HandlerKind {
        HandlerKind::CloseSquare
    }
    fn parse(&self, p: &mut Parser) -> Result<Parsed> {
        if p.square == 0 {
            return Err(p.error(error!(MissingOpenSquare)));
        }
        p.square -= 1;
        p.advance(1);
        Ok(Parsed::Signal(ParseSignal::ClosedSquare))
    }
}

struct OpenCurly;

impl ParseHandler for OpenCurly {
    fn kind(&self) -> HandlerKind {
        HandlerKind::OpenCurly
    }
    fn parse(&self, p: &mut Parser) -> Result<Parsed> {
        operand_start(p)?;
        let at = p.location();
        p.advance(1);
        let (round, square) = (p.round, p.square);
        let mut block = ElementList::new();
        loop {
            p.round = 0;
            p.square = 0;
            let start = p.location();
            let (statement, signal) = p.sub_parse()?;
            if !statement.is_empty() {
                block.push(Element::List(statement), start.0, start.1);
            }
            match signal {
                ParseSignal::EndOfLine => {
                    if !p.next_line() {
                        return Err(p.error_at(error!(MissingCloseCurly), &at));
                    }
                }
                ParseSignal::ClosedCurly => break,
                ParseSignal::Comma => return Err(p.error(error!(UnexpectedComma))),
                ParseSignal::Then => return Err(p.error(error!(MissingIfCondition))),
                ParseSignal::Else => return Err(p.error(error!(MissingIfTrue))),
                _ => return Err(p.error_at(error!(MissingCloseCurly), &at)),
            }
        }
        p.round = round;
        p.square = square;
        let id = p.new_literal(Data::Code(Rc::new(block)));
        p.append(Element::Literal(id), at);
        p.expect_operand = false;
        Ok(Parsed::Done)
    }
}

struct CloseCurly;

impl ParseHandler for CloseCurly {
    fn kind(&self) -> HandlerKind {
        HandlerKind::CloseCurly
    }
    fn parse(&self, p: &mut Parser) -> Result<Parsed> {
        p.advance(1);
        Ok(Parsed::Signal(ParseSignal::ClosedCurly))
    }
}

struct Comma;

impl ParseHandler for Comma {
    fn kind(&self) -> HandlerKind {
        HandlerKind::Comma
    }
    fn parse(&self, _p: &mut Parser) -> Result<Parsed> {
        Ok(Parsed::Signal(ParseSignal::Comma))
    }
}

struct If;

impl ParseHandler for If {
    fn kind(&self) -> HandlerKind {
        HandlerKind::If
    }
    fn parse(&self, p: &mut Parser) -> Result<Parsed> {
        operand_start(p)?;
        let at = p.location();
        p.advance(2);
        let (cond, signal) = p.sub_parse()?;
        if signal != ParseSignal::Then || cond.is_empty() {
            return Err(p.error_at(error!(MissingIfCondition), &at));
        }
        let (then, signal) = p.sub_parse()?;
        if then.is_empty() {
            return Err(p.error_at(error!(MissingIfTrue), &at));
        }
        let otherwise = match signal {
            ParseSignal::Else => Some(parse_else(p, &at)?),
            ParseSignal::EndOfLine if p.next_line_starts_with(special::ELSE) => {
                p.next_line();
                p.advance(2);
                Some(parse_else(p, &at)?)
            }
            ParseSignal::EndOfLine => None,
            _ => return Err(p.error_at(error!(IncompleteIf), &at)),
        };
        p.append(
            Element::Branch {
                cond,
                then,
                otherwise,
            },
            at,
        );
        p.expect_operand = false;
        Ok(Parsed::Signal(ParseSignal::EndOfLine))
    }
}

fn parse_else(p: &mut Parser, at: &(LineNumber, Column)) -> Result<ElementList> {
    let (otherwise, signal) = p.sub_parse()?;
    if otherwise.is_empty() {
        return Err(p.error_at(error!(MissingIfFalse), at));
    }
    if signal != ParseSignal::EndOfLine {
        return Err(p.error_at(error!(IncompleteIf), at));
    }
    Ok(otherwise)
}

struct Then;

impl ParseHandler for Then {
    fn kind(&self) -> HandlerKind {
        HandlerKind::Then
    }
    fn parse(&self, p: &mut Parser) -> Result<Parsed> {
        p.advance(2);
        Ok(Parsed::Signal(ParseSignal::Then))
    }
}

struct Else;

impl ParseHandler for Else {
    fn kind(&self) -> HandlerKind {
        HandlerKind::Else
    }
    fn parse(&self, p: &mut Parser) -> Result<Parsed> {
        p.advance(2);
        Ok(Parsed::Signal(ParseSignal::Else))
    }
}

struct Loop;

impl ParseHandler for Loop {
    fn kind(&self) -> HandlerKind {
        HandlerKind::Loop
    }
    fn parse(&self, p: &mut Parser) -> Result<Parsed> {
        operand_start(p)?;
        let at = p.location();
        p.advance(2);
        let (body, signal) = p.sub_parse()?;
        if body.is_empty() {
            return Err(p.error_at(error!(InvalidSyntax; "Missing loop body"), &at));
        }
        if signal != ParseSignal::EndOfLine {
            return Err(p.error(error!(UnexpectedSymbol)));
        }
        p.append(Element::Loop(body), at);
        p.expect_operand = false;
        Ok(Parsed::Signal(ParseSignal::EndOfLine))
    }
}

struct Break;

impl ParseHandler for Break {
    fn kind(&self) -> HandlerKind {
        HandlerKind::Break
    }
    fn parse(&self, p: &mut Parser) -> Result<Parsed> {
        operand_start(p)?;
        let at = p.location();
        p.advance(2);
        p.append(Element::Break, at);
        p.expect_operand = false;
        Ok(Parsed::Done)
    }
}
