use super::text::special;

/// A source symbol as the parser sees it: a plain byte or the id of a
/// special symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symbol {
    Plain(u8),
    Special(u8),
}

impl Symbol {
    /// Bytes the symbol occupies in a pre-parsed line.
    pub fn len(self) -> usize {
        match self {
            Symbol::Plain(_) => 1,
            Symbol::Special(_) => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Reverse,
    Inverse,
    Involute,
    Dual,
    Negate,
    Not,
    Print,
    Draw,
}

impl UnaryOp {
    pub fn as_str(self) -> &'static str {
        use UnaryOp::*;
        match self {
            Reverse => "~",
            Inverse => "!",
            Involute => "'",
            Dual => "*",
            Negate => "-",
            Not => "!!",
            Print => "?",
            Draw => ":",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Call,
    Step,
    Mul,
    Sub,
    Mod,
    Pow,
    Outer,
    Inner,
    Div,
    Meet,
    Join,
    Add,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    And,
    Or,
    Append,
    Assign,
    Reference,
    PAdd,
    PSub,
    PMul,
    PDiv,
    PInner,
    POuter,
    PAnd,
    POr,
    PEq,
    PNe,
    PLt,
    PGt,
    PLe,
    PGe,
    PAppend,
}

impl BinaryOp {
    /// Operators that change their left operand in place.
    pub fn is_assign(self) -> bool {
        use BinaryOp::*;
        matches!(self, Assign | Reference | Append | PAppend)
    }

    /// Operators applied element by element when an operand is a list.
    pub fn recurses_lists(self) -> bool {
        use BinaryOp::*;
        matches!(
            self,
            Mul | Sub | Mod | Pow | Outer | Inner | Div | Meet | Join | Add | Lt | Gt | Le | Ge
                | And | Or
        )
    }

    /// The ordinary operator behind a point operator.
    pub fn point_base(self) -> Option<BinaryOp> {
        use BinaryOp::*;
        Some(match self {
            PAdd => Add,
            PSub => Sub,
            PMul => Mul,
            PDiv => Div,
            PInner => Inner,
            POuter => Outer,
            PAnd => And,
            POr => Or,
            PEq => Eq,
            PNe => Ne,
            PLt => Lt,
            PGt => Gt,
            PLe => Le,
            PGe => Ge,
            _ => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        use BinaryOp::*;
        match self {
            Call => "call",
            Step => "~",
            Mul => "*",
            Sub => "-",
            Mod => "%",
            Pow => "^^",
            Outer => "^",
            Inner => ".",
            Div => "/",
            Meet => "&",
            Join => "|",
            Add => "+",
            Eq => "==",
            Ne => "!=",
            Lt => "<",
            Gt => ">",
            Le => "<=",
            Ge => ">=",
            And => "&&",
            Or => "||",
            Append => "<<",
            Assign => "=",
            Reference => "->",
            PAdd => ".+",
            PSub => ".-",
            PMul => ".*",
            PDiv => "./",
            PInner => "..",
            POuter => ".^",
            PAnd => ".&&",
            POr => ".||",
            PEq => ".==",
            PNe => ".!=",
            PLt => ".<",
            PGt => ".>",
            PLe => ".<=",
            PGe => ".>=",
            PAppend => ".<<",
        }
    }
}

/// ## Operator table entry
///
/// Levels are binding strength: the lower the level, the tighter the
/// operator binds.

#[derive(Debug)]
pub struct OpDef {
    pub symbol: Symbol,
    pub unary: Option<(UnaryOp, i32)>,
    pub binary: Option<(BinaryOp, i32)>,
    pub right_to_left: bool,
}

const fn op(
    symbol: Symbol,
    unary: Option<(UnaryOp, i32)>,
    binary: Option<(BinaryOp, i32)>,
    right_to_left: bool,
) -> OpDef {
    OpDef {
        symbol,
        unary,
        binary,
        right_to_left,
    }
}

use BinaryOp as B;
use Symbol::{Plain as P, Special as S};
use UnaryOp as U;

static OPERATORS: &[OpDef] = &[
    op(S(special::CALL), None, Some((B::Call, 2)), false),
    op(P(b'~'), Some((U::Reverse, 5)), Some((B::Step, 30)), true),
    op(P(b'!'), Some((U::Inverse, 5)), None, false),
    op(P(b'\''), Some((U::Involute, 5)), None, false),
    op(P(b'*'), Some((U::Dual, 5)), Some((B::Mul, 15)), false),
    op(P(b'-'), Some((U::Negate, 5)), Some((B::Sub, 19)), false),
    op(S(special::NOT), Some((U::Not, 51)), None, false),
    op(P(b'%'), None, Some((B::Mod, 6)), false),
    op(S(special::POW), None, Some((B::Pow, 7)), false),
    op(P(b'^'), None, Some((B::Outer, 10)), false),
    op(P(b'.'), None, Some((B::Inner, 13)), false),
    op(P(b'/'), None, Some((B::Div, 15)), false),
    op(P(b'&'), None, Some((B::Meet, 17)), false),
    op(P(b'|'), None, Some((B::Join, 17)), false),
    op(P(b'+'), None, Some((B::Add, 20)), false),
    op(S(special::EQUAL), None, Some((B::Eq, 50)), false),
    op(S(special::NOTEQUAL), None, Some((B::Ne, 50)), false),
    op(P(b'<'), None, Some((B::Lt, 50)), false),
    op(P(b'>'), None, Some((B::Gt, 50)), false),
    op(S(special::LE), None, Some((B::Le, 50)), false),
    op(S(special::GE), None, Some((B::Ge, 50)), false),
    op(S(special::AND), None, Some((B::And, 52)), false),
    op(S(special::OR), None, Some((B::Or, 53)), false),
    op(S(special::LSHIFT), None, Some((B::Append, 70)), false),
    op(P(b'='), None, Some((B::Assign, 100)), true),
    op(S(special::REF), None, Some((B::Reference, 100)), true),
    op(P(b'?'), Some((U::Print, 200)), None, false),
    op(P(b':'), Some((U::Draw, 200)), None, false),
    op(S(special::PPLUS), None, Some((B::PAdd, 20)), false),
    op(S(special::PMINUS), None, Some((B::PSub, 19)), false),
    op(S(special::PMUL), None, Some((B::PMul, 15)), false),
    op(S(special::PDIV), None, Some((B::PDiv, 15)), false),
    op(S(special::PIP), None, Some((B::PInner, 13)), false),
    op(S(special::POP), None, Some((B::POuter, 10)), false),
    op(S(special::PAND), None, Some((B::PAnd, 52)), false),
    op(S(special::POR), None, Some((B::POr, 53)), false),
    op(S(special::PEQUAL), None, Some((B::PEq, 50)), false),
    op(S(special::PNOTEQUAL), None, Some((B::PNe, 50)), false),
    op(S(special::PLT), None, Some((B::PLt, 50)), false),
    op(S(special::PGT), None, Some((B::PGt, 50)), false),
    op(S(special::PLE), None, Some((B::PLe, 50)), false),
    op(S(special::PGE), None, Some((B::PGe, 50)), false),
    op(S(special::PLSHIFT), None, Some((B::PAppend, 70)), false),
];

pub fn lookup(symbol: Symbol) -> Option<&'static OpDef> {
    OPERATORS.iter().find(|def| def.symbol == symbol)
}

/// Every symbol that names an operator.
pub fn symbols() -> impl Iterator<Item = Symbol> {
    OPERATORS.iter().map(|def| def.symbol)
}
