use super::include::{Includes, NoIncludes};
use super::{Error, LineNumber};
use crate::error;

type Result<T> = std::result::Result<T, Error>;

/// Escape byte; the byte after it names a special symbol.
pub const SPECIAL: u8 = 0x01;
/// Replaces the `::` global prefix. Counts as a label character.
pub const GLOBAL: u8 = 0x02;

/// Ids of the special symbols, each emitted as `SPECIAL, id`.
pub mod special {
    pub const CALL: u8 = b'(';
    pub const IF: u8 = b'I';
    pub const THEN: u8 = b'T';
    pub const ELSE: u8 = b'E';
    pub const LOOP: u8 = b'L';
    pub const BREAK: u8 = b'B';

    pub const POW: u8 = b'^';
    pub const EQUAL: u8 = b'=';
    pub const NOTEQUAL: u8 = b'!';
    pub const AND: u8 = b'&';
    pub const OR: u8 = b'|';
    pub const NOT: u8 = b'n';
    pub const LE: u8 = b'<';
    pub const GE: u8 = b'>';
    pub const LSHIFT: u8 = b's';
    pub const REF: u8 = b'r';

    pub const PPLUS: u8 = b'+';
    pub const PMINUS: u8 = b'-';
    pub const PMUL: u8 = b'*';
    pub const PDIV: u8 = b'/';
    pub const PIP: u8 = b'.';
    pub const POP: u8 = b'w';
    pub const PAND: u8 = b'a';
    pub const POR: u8 = b'o';
    pub const PEQUAL: u8 = b'q';
    pub const PNOTEQUAL: u8 = b'u';
    pub const PLT: u8 = b'l';
    pub const PGT: u8 = b'g';
    pub const PLE: u8 = b'k';
    pub const PGE: u8 = b'h';
    pub const PLSHIFT: u8 = b'S';
}

const PAIRS: &[(&[u8], u8)] = &[
    (b"==", special::EQUAL),
    (b"!=", special::NOTEQUAL),
    (b"!!", special::NOT),
    (b"<=", special::LE),
    (b">=", special::GE),
    (b"&&", special::AND),
    (b"||", special::OR),
    (b"^^", special::POW),
    (b"<<", special::LSHIFT),
    (b"->", special::REF),
];

const POINT_OPS: &[(&[u8], u8)] = &[
    (b".&&", special::PAND),
    (b".||", special::POR),
    (b".==", special::PEQUAL),
    (b".!=", special::PNOTEQUAL),
    (b".<=", special::PLE),
    (b".>=", special::PGE),
    (b".<<", special::PLSHIFT),
    (b".+", special::PPLUS),
    (b".-", special::PMINUS),
    (b".*", special::PMUL),
    (b"./", special::PDIV),
    (b"..", special::PIP),
    (b".^", special::POP),
    (b".<", special::PLT),
    (b".>", special::PGT),
];

pub fn is_label_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == GLOBAL
}

/// ## Pre-parsed line
///
/// Bytes ready for the parser, each with the (line, column) of the
/// source character it came from.

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextLine {
    bytes: Vec<u8>,
    pos: Vec<(usize, usize)>,
}

impl TextLine {
    fn push(&mut self, b: u8, at: (usize, usize)) {
        self.bytes.push(b);
        self.pos.push(at);
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Source line and column of byte `i`; past the end, just behind the
    /// last byte.
    pub fn position(&self, i: usize) -> (LineNumber, usize) {
        match self.pos.get(i) {
            Some((line, col)) => (Some(*line), *col),
            None => match self.pos.last() {
                Some((line, col)) => (Some(*line), col + 1),
                None => (None, 0),
            },
        }
    }

    pub fn starts_with_special(&self, id: u8) -> bool {
        self.bytes.len() >= 2 && self.bytes[0] == SPECIAL && self.bytes[1] == id
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Last {
    Operand,
    Other,
}

/// Turn source text into parser lines.
///
/// `;` ends a line, `}` always stands on a line of its own, newlines are
/// plain white space. Comments disappear, keywords and multi-character
/// operators become special symbols.
pub fn preparse(text: &str) -> Result<Vec<TextLine>> {
    preparse_with(text, &NoIncludes, &[])
}

/// Like `preparse`, with `#include "name"` lines resolved through
/// `includes`. `open` names the files already being read; including one
/// of them again is an error.
pub fn preparse_with(text: &str, includes: &dyn Includes, open: &[String]) -> Result<Vec<TextLine>> {
    let mut p = Preparser {
        includes,
        open,
        src: text.as_bytes(),
        i: 0,
        line: 1,
        col: 0,
        lines: vec![],
        cur: TextLine::default(),
        round: 0,
        square: 0,
        if_rounds: vec![],
        pending_if: None,
        last: Last::Other,
    };
    p.run()?;
    Ok(p.lines)
}

struct Preparser<'a> {
    includes: &'a dyn Includes,
    open: &'a [String],
    src: &'a [u8],
    i: usize,
    line: usize,
    col: usize,
    lines: Vec<TextLine>,
    cur: TextLine,
    round: usize,
    square: usize,
    if_rounds: Vec<usize>,
    pending_if: Option<(usize, usize)>,
    last: Last,
}

impl<'a> Preparser<'a> {
    fn peek(&self, ahead: usize) -> Option<u8> {
        self.src.get(self.i + ahead).copied()
    }

    fn at(&self) -> (usize, usize) {
        (self.line, self.col)
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek(0)?;
        self.i += 1;
        if b == b'\n' {
            self.line += 1;
            self.col = 0;
        } else {
            self.col += 1;
        }
        Some(b)
    }

    fn error_at(&self, at: (usize, usize), err: Error) -> Error {
        err.in_line_number(Some(at.0)).in_column(&(at.1..at.1 + 1))
    }

    fn emit(&mut self, b: u8, at: (usize, usize)) {
        self.cur.push(b, at);
    }

    fn emit_special(&mut self, id: u8, at: (usize, usize)) {
        self.cur.push(SPECIAL, at);
        self.cur.push(id, at);
    }

    fn emit_space(&mut self, at: (usize, usize)) {
        if !self.cur.is_empty() && self.cur.bytes.last() != Some(&b' ') {
            self.cur.push(b' ', at);
        }
    }

    fn end_line(&mut self) {
        while self.cur.bytes.last() == Some(&b' ') {
            self.cur.bytes.pop();
            self.cur.pos.pop();
        }
        if !self.cur.is_empty() {
            let line = std::mem::take(&mut self.cur);
            self.lines.push(line);
        }
    }

    fn starts_with(&self, pat: &[u8]) -> bool {
        self.src[self.i..].starts_with(pat)
    }

    /// Only blanks precede the current byte on its source line.
    fn at_line_start(&self) -> bool {
        self.src[..self.i]
            .iter()
            .rev()
            .take_while(|b| **b != b'\n')
            .all(|b| *b == b' ' || *b == b'\t' || *b == b'\r')
    }

    fn rest_of_line(&mut self) -> String {
        let start = self.i;
        while let Some(b) = self.peek(0) {
            if b == b'\n' {
                break;
            }
            self.bump();
        }
        String::from_utf8_lossy(&self.src[start..self.i]).to_string()
    }

    /// `#include "name"`, either on its own line or behind `//`. Other
    /// directives are ignored.
    fn directive(&mut self, text: &str, at: (usize, usize)) -> Result<()> {
        let text = text.trim_start_matches('#').trim_start();
        if !text.starts_with("include") {
            return Ok(());
        }
        let mut quoted = text.splitn(3, '"');
        let name = match (quoted.next(), quoted.next(), quoted.next()) {
            (Some(_), Some(name), Some(_)) if !name.is_empty() => name,
            _ => {
                return Err(self.error_at(at, error!(InvalidSyntax; "Include needs a quoted file name.")));
            }
        };
        if self.open.iter().any(|f| f == name) {
            return Err(self.error_at(
                at,
                error!(RecursiveInclude; format!("File '{}' is included recursively.", name)),
            ));
        }
        let text = match self.includes.fetch(name) {
            Some(text) => text,
            None => {
                return Err(self.error_at(
                    at,
                    error!(IncludeNotFound; format!("Include file '{}' could not be found.", name)),
                ))
            }
        };
        let mut open = self.open.to_vec();
        open.push(name.to_string());
        let lines = preparse_with(&text, self.includes, &open)?;
        self.end_line();
        self.lines.extend(lines);
        self.last = Last::Other;
        Ok(())
    }

    fn run(&mut self) -> Result<()> {
        while let Some(c) = self.peek(0) {
            let at = self.at();
            if c == b'#' && self.at_line_start() {
                let line = self.rest_of_line();
                self.directive(&line, at)?;
                continue;
            }
            if c == b'/' && self.peek(1) == Some(b'/') {
                self.bump();
                self.bump();
                let comment = self.rest_of_line();
                let comment = comment.trim_start();
                if comment.starts_with('#') {
                    self.directive(comment, at)?;
                }
                continue;
            }
            if c == b'/' && self.peek(1) == Some(b'*') {
                self.bump();
                self.bump();
                while self.peek(0).is_some() && !self.starts_with(b"*/") {
                    self.bump();
                }
                self.bump();
                self.bump();
                self.emit_space(at);
                continue;
            }
            if c.is_ascii_whitespace() {
                self.bump();
                self.emit_space(at);
                continue;
            }
            if let Some(if_at) = self.pending_if {
                if c != b'(' {
                    return Err(self.error_at(if_at, error!(MissingIfCondition)));
                }
            }
            match c {
                b';' => {
                    if !self.if_rounds.is_empty() {
                        return Err(self.error_at(at, error!(MissingIfCondition)));
                    }
                    if self.square > 0 {
                        return Err(self.error_at(at, error!(MissingCloseSquare)));
                    }
                    self.bump();
                    self.end_line();
                    self.round = 0;
                    self.last = Last::Other;
                }
                b'}' => {
                    self.bump();
                    self.end_line();
                    self.emit(b'}', at);
                    self.end_line();
                    self.last = Last::Other;
                }
                b'"' => {
                    self.bump();
                    self.string(at, false)?;
                }
                b'@' if self.peek(1) == Some(b'"') => {
                    self.bump();
                    self.bump();
                    self.string(at, true)?;
                }
                b':' if self.peek(1) == Some(b':') => {
                    self.bump();
                    self.bump();
                    self.emit(GLOBAL, at);
                    self.last = Last::Other;
                }
                b'.' if self.peek(1).map_or(false, |b| b.is_ascii_digit())
                    && self.last != Last::Operand =>
                {
                    self.emit(b'0', at);
                    self.number();
                }
                b'.' => self.point_op(at),
                b'(' => {
                    if self.pending_if.take().is_some() {
                        self.if_rounds.push(self.round);
                    } else if self.last == Last::Operand {
                        while self.cur.bytes.last() == Some(&b' ') {
                            self.cur.bytes.pop();
                            self.cur.pos.pop();
                        }
                        self.emit_special(special::CALL, at);
                    }
                    self.bump();
                    self.round += 1;
                    self.emit(b'(', at);
                    self.last = Last::Other;
                }
                b')' => {
                    self.bump();
                    self.emit(b')', at);
                    self.last = Last::Operand;
                    if self.round > 0 {
                        self.round -= 1;
                        if self.if_rounds.last() == Some(&self.round) {
                            self.if_rounds.pop();
                            self.emit_special(special::THEN, at);
                            self.last = Last::Other;
                        }
                    }
                }
                b'[' => {
                    self.bump();
                    self.square += 1;
                    self.emit(b'[', at);
                    self.last = Last::Other;
                }
                b']' => {
                    self.bump();
                    self.square = self.square.saturating_sub(1);
                    self.emit(b']', at);
                    self.last = Last::Operand;
                }
                c if c.is_ascii_alphabetic() || c == b'_' => self.word(at),
                c if c.is_ascii_digit() => self.number(),
                _ => {
                    let pair = PAIRS.iter().find(|(pat, _)| self.starts_with(pat));
                    match pair {
                        Some((pat, id)) => {
                            let (len, id) = (pat.len(), *id);
                            for _ in 0..len {
                                self.bump();
                            }
                            self.emit_special(id, at);
                        }
                        None => {
                            self.bump();
                            self.emit(c, at);
                        }
                    }
                    self.last = Last::Other;
                }
            }
        }
        if let Some(if_at) = self.pending_if {
            return Err(self.error_at(if_at, error!(MissingIfCondition)));
        }
        if !self.if_rounds.is_empty() {
            let at = self.at();
            return Err(self.error_at(at, error!(MissingIfCondition)));
        }
        if self.square > 0 {
            let at = self.at();
            return Err(self.error_at(at, error!(MissingCloseSquare)));
        }
        self.end_line();
        Ok(())
    }

    fn point_op(&mut self, at: (usize, usize)) {
        let op = POINT_OPS.iter().find(|(pat, _)| self.starts_with(pat));
        match op {
            Some((pat, id)) => {
                let (len, id) = (pat.len(), *id);
                for _ in 0..len {
                    self.bump();
                }
                self.emit_special(id, at);
            }
            None => {
                self.bump();
                self.emit(b'.', at);
            }
        }
        self.last = Last::Other;
    }

    fn word(&mut self, at: (usize, usize)) {
        let start = self.i;
        let mut end = start;
        while self.src.get(end).map_or(false, |b| is_label_byte(*b)) {
            end += 1;
        }
        let id = match &self.src[start..end] {
            b"if" => Some(special::IF),
            b"else" => Some(special::ELSE),
            b"loop" => Some(special::LOOP),
            b"break" => Some(special::BREAK),
            _ => None,
        };
        match id {
            Some(id) => {
                for _ in start..end {
                    self.bump();
                }
                self.emit_special(id, at);
                if id == special::IF {
                    self.pending_if = Some(at);
                }
                self.last = Last::Other;
            }
            None => {
                for _ in start..end {
                    let at = self.at();
                    if let Some(b) = self.bump() {
                        self.emit(b, at);
                    }
                }
                self.last = Last::Operand;
            }
        }
    }

    fn copy(&mut self) {
        let at = self.at();
        if let Some(b) = self.bump() {
            self.emit(b, at);
        }
    }

    fn number(&mut self) {
        let is_digit = |b: Option<u8>| b.map_or(false, |b| b.is_ascii_digit());
        if self.peek(0) == Some(b'0') && matches!(self.peek(1), Some(b'x') | Some(b'X')) {
            self.copy();
            self.copy();
            while self.peek(0).map_or(false, |b| b.is_ascii_hexdigit()) {
                self.copy();
            }
            self.last = Last::Operand;
            return;
        }
        while is_digit(self.peek(0)) {
            self.copy();
        }
        if self.peek(0) == Some(b'.') {
            let next = self.peek(1);
            let ends = next.map_or(true, |b| {
                b.is_ascii_whitespace() || b")],;}".contains(&b)
            });
            if is_digit(next) || ends {
                self.copy();
                while is_digit(self.peek(0)) {
                    self.copy();
                }
            }
        }
        if matches!(self.peek(0), Some(b'e') | Some(b'E')) {
            let signed = matches!(self.peek(1), Some(b'+') | Some(b'-'));
            if is_digit(self.peek(1)) || (signed && is_digit(self.peek(2))) {
                self.copy();
                if signed {
                    self.copy();
                }
                while is_digit(self.peek(0)) {
                    self.copy();
                }
            }
        }
        if matches!(self.peek(0), Some(b'f') | Some(b'F') | Some(b'd') | Some(b'D'))
            && !self.peek(1).map_or(false, is_label_byte)
        {
            self.copy();
        }
        self.last = Last::Operand;
    }

    fn string(&mut self, at: (usize, usize), raw: bool) -> Result<()> {
        self.emit(b'"', at);
        loop {
            let here = self.at();
            let b = match self.bump() {
                Some(b) => b,
                None => {
                    return Err(self.error_at(at, error!(InvalidSyntax; "Missing '\"'")));
                }
            };
            let b = match b {
                b'"' => break,
                b'\\' if !raw => match self.bump() {
                    Some(b'n') => b'\n',
                    Some(b't') => b'\t',
                    Some(b'"') => b'"',
                    Some(b'\\') => b'\\',
                    Some(b'x') => {
                        let hex: Vec<u8> = (0..2).filter_map(|_| self.bump()).collect();
                        let hex = String::from_utf8_lossy(&hex).to_string();
                        match u8::from_str_radix(&hex, 16) {
                            Ok(v) => v,
                            Err(_) => {
                                return Err(self.error_at(
                                    here,
                                    error!(InvalidSyntax; "Invalid escape sequence"),
                                ))
                            }
                        }
                    }
                    Some(other) => {
                        self.emit(b'\\', here);
                        other
                    }
                    None => continue,
                },
                b => b,
            };
            if b == b'"' || b == SPECIAL {
                self.emit(SPECIAL, here);
            }
            self.emit(b, here);
        }
        self.emit(b'"', at);
        self.last = Last::Operand;
        Ok(())
    }
}

/// Count of brackets still open at the end of `text`, skipping strings
/// and comments. A prompt keeps reading lines while this is positive.
pub fn open_brackets(text: &str) -> i32 {
    let mut depth = 0;
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                while let Some(c) = chars.next() {
                    match c {
                        '\\' => {
                            chars.next();
                        }
                        '"' => break,
                        _ => {}
                    }
                }
            }
            '/' if chars.peek() == Some(&'/') => {
                while let Some(c) = chars.next() {
                    if c == '\n' {
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut star = false;
                for c in chars.by_ref() {
                    if star && c == '/' {
                        break;
                    }
                    star = c == '*';
                }
            }
            '{' | '(' | '[' => depth += 1,
            '}' | ')' | ']' => depth -= 1,
            _ => {}
        }
    }
    depth
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::ErrorCode;

    fn lines(text: &str) -> Vec<Vec<u8>> {
        preparse(text)
            .unwrap()
            .iter()
            .map(|l| l.bytes().to_vec())
            .collect()
    }

    #[test]
    fn test_statements_and_comments() {
        assert_eq!(
            lines("a = 1; // one\nb = 2 /* two */ ;"),
            vec![b"a = 1".to_vec(), b"b = 2".to_vec()]
        );
    }

    #[test]
    fn test_close_curly_stands_alone() {
        assert_eq!(
            lines("f = { x } else"),
            vec![b"f = { x".to_vec(), b"}".to_vec(), vec![SPECIAL, special::ELSE]]
        );
    }

    #[test]
    fn test_call_and_then_markers() {
        assert_eq!(lines("f(1)"), vec![vec![b'f', SPECIAL, special::CALL, b'(', b'1', b')']]);
        assert_eq!(
            lines("if (a) b"),
            vec![vec![
                SPECIAL,
                special::IF,
                b' ',
                b'(',
                b'a',
                b')',
                SPECIAL,
                special::THEN,
                b' ',
                b'b'
            ]]
        );
    }

    #[test]
    fn test_operators() {
        assert_eq!(lines("a==b"), vec![vec![b'a', SPECIAL, special::EQUAL, b'b']]);
        assert_eq!(lines("a.*b"), vec![vec![b'a', SPECIAL, special::PMUL, b'b']]);
        assert_eq!(lines("::x"), vec![vec![GLOBAL, b'x']]);
        assert_eq!(lines("x=.5"), vec![b"x=0.5".to_vec()]);
        assert_eq!(lines("2.5e-3f"), vec![b"2.5e-3f".to_vec()]);
    }

    #[test]
    fn test_strings() {
        assert_eq!(lines(r#""a\"b""#), vec![vec![b'"', b'a', SPECIAL, b'"', b'b', b'"']]);
        assert_eq!(lines(r#"@"a\n""#), vec![b"\"a\\n\"".to_vec()]);
        assert_eq!(lines(r#""\x41;""#), vec![b"\"A;\"".to_vec()]);
    }

    #[test]
    fn test_errors() {
        let e = preparse("if a").unwrap_err();
        assert_eq!(e.code(), ErrorCode::MissingIfCondition);
        let e = preparse("a = [1, 2; 3]").unwrap_err();
        assert_eq!(e.code(), ErrorCode::MissingCloseSquare);
        assert_eq!(e.line_number(), Some(1));
        assert_eq!(e.column(), 9..10);
        let e = preparse("\"abc").unwrap_err();
        assert_eq!(e.code(), ErrorCode::InvalidSyntax);
    }

    #[test]
    fn test_include() {
        let mut files = std::collections::HashMap::new();
        files.insert("lib.clu".to_string(), "b = 2;\nc = 3;".to_string());
        let lines = preparse_with("a = 1;\n#include \"lib.clu\"\nd = 4;", &files, &[]).unwrap();
        let text: Vec<&[u8]> = lines.iter().map(|l| l.bytes()).collect();
        assert_eq!(text, vec![&b"a = 1"[..], b"b = 2", b"c = 3", b"d = 4"]);
        let lines = preparse_with("//# include \"lib.clu\"", &files, &[]).unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].position(0), (Some(2), 0));
    }

    #[test]
    fn test_include_errors() {
        let mut files = std::collections::HashMap::new();
        files.insert("self.clu".to_string(), "#include \"self.clu\"".to_string());
        files.insert("a.clu".to_string(), "x = 1;\n#include \"b.clu\"".to_string());
        files.insert("b.clu".to_string(), "#include \"a.clu\"".to_string());
        let e = preparse_with("#include \"nothere.clu\"", &files, &[]).unwrap_err();
        assert_eq!(e.code(), ErrorCode::IncludeNotFound);
        let e = preparse_with("#include \"self.clu\"", &files, &[]).unwrap_err();
        assert_eq!(e.code(), ErrorCode::RecursiveInclude);
        let e = preparse_with("#include \"a.clu\"", &files, &[]).unwrap_err();
        assert_eq!(e.code(), ErrorCode::RecursiveInclude);
        let e = preparse("#include lib.clu").unwrap_err();
        assert_eq!(e.code(), ErrorCode::InvalidSyntax);
        assert_eq!(preparse("  #pragma once\na").unwrap().len(), 1);
        assert_eq!(preparse("#include \"x.clu\"").unwrap_err().code(), ErrorCode::IncludeNotFound);
    }

    #[test]
    fn test_open_brackets() {
        assert_eq!(open_brackets("f = {"), 1);
        assert_eq!(open_brackets("f = { a(1) }"), 0);
        assert_eq!(open_brackets(r#"s = "{" // ("#), 0);
        assert_eq!(open_brackets("/* [ */ ["), 1);
        assert_eq!(open_brackets("a = (1, [2"), 2);
    }

    #[test]
    fn test_positions() {
        let l = preparse("a = 1;\n  b").unwrap();
        assert_eq!(l[1].position(0), (Some(2), 2));
    }
}
