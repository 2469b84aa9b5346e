use super::{Column, LineNumber};

/// ## Diagnostic record
///
/// Every failure the engine reports, from a missing bracket to a division
/// by zero, is one of these. The `Break` code at `Internal` level is not a
/// failure; it carries a loop exit across native code.

#[derive(Clone, PartialEq)]
pub struct Error {
    code: ErrorCode,
    level: Level,
    line_number: LineNumber,
    column: Column,
    message: String,
}

#[doc(hidden)]
#[macro_export]
macro_rules! error {
    ($err:ident) => {
        $crate::lang::Error::new($crate::lang::ErrorCode::$err)
    };
    ($err:ident, ..$col:expr) => {
        $crate::lang::Error::new($crate::lang::ErrorCode::$err).in_column($col)
    };
    ($err:ident, $line:expr) => {
        $crate::lang::Error::new($crate::lang::ErrorCode::$err).in_line_number($line)
    };
    ($err:ident; $msg:expr) => {
        $crate::lang::Error::new($crate::lang::ErrorCode::$err).message($msg)
    };
    ($err:ident, ..$col:expr;  $msg:expr) => {
        $crate::lang::Error::new($crate::lang::ErrorCode::$err)
            .in_column($col)
            .message($msg)
    };
    ($err:ident, $line:expr, ..$col:expr) => {
        $crate::lang::Error::new($crate::lang::ErrorCode::$err)
            .in_line_number($line)
            .in_column($col)
    };
    ($err:ident, $line:expr; $msg:expr) => {
        $crate::lang::Error::new($crate::lang::ErrorCode::$err)
            .in_line_number($line)
            .message($msg)
    };
    ($err:ident, $line:expr, ..$col:expr;  $msg:expr) => {
        $crate::lang::Error::new($crate::lang::ErrorCode::$err)
            .in_line_number($line)
            .in_column($col)
            .message($msg)
    };
}

impl Error {
    pub fn new(code: ErrorCode) -> Error {
        Error {
            code,
            level: code.level(),
            line_number: None,
            column: 0..0,
            message: String::new(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn number(&self) -> u16 {
        self.code.number()
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn line_number(&self) -> LineNumber {
        self.line_number
    }

    pub fn column(&self) -> Column {
        self.column.clone()
    }

    pub fn is_break(&self) -> bool {
        self.code == ErrorCode::Break && self.level == Level::Internal
    }

    pub fn is_located(&self) -> bool {
        self.line_number.is_some()
    }

    /// Message text, falling back to the canonical text of the code.
    pub fn text(&self) -> &str {
        if self.message.is_empty() {
            self.code.as_str()
        } else {
            &self.message
        }
    }

    pub fn in_line_number(self, line: LineNumber) -> Error {
        Error {
            line_number: line,
            ..self
        }
    }

    pub fn in_column(self, column: &Column) -> Error {
        Error {
            column: column.clone(),
            ..self
        }
    }

    /// Attach a location unless one was already set deeper down.
    pub fn located(self, line: LineNumber, column: &Column) -> Error {
        if self.is_located() {
            self
        } else {
            self.in_line_number(line).in_column(column)
        }
    }

    pub fn message<S: Into<String>>(self, message: S) -> Error {
        Error {
            message: message.into(),
            ..self
        }
    }

    pub fn with_level(self, level: Level) -> Error {
        Error { level, ..self }
    }

    pub fn invalid_lval(name: &str, type_name: &str) -> Error {
        error!(InvalidLVal; format!("'{}' of type '{}' is an invalid L-Value", name, type_name))
    }

    pub fn invalid_rval(name: &str, type_name: &str) -> Error {
        error!(InvalidRVal; format!("'{}' of type '{}' is an invalid R-Value", name, type_name))
    }

    pub fn invalid_type(name: &str, type_name: &str, op: &str) -> Error {
        error!(InvalidType; format!("'{}' ({}) is of invalid type for {}.", name, type_name, op))
    }

    pub fn invalid_types(l_type: &str, r_type: &str, op: &str) -> Error {
        error!(InvalidType; format!("Types '{}' and '{}' are invalid for {}.", l_type, r_type, op))
    }

    pub fn invalid_mv_type(l_name: &str, r_name: &str) -> Error {
        error!(InvalidMVType; format!(
            "Multivectors '{}' and '{}' are from different spaces.",
            l_name, r_name
        ))
    }

    pub fn wrong_param_count(expected: usize) -> Error {
        error!(WrongNoOfParams; format!("Expected {} parameters.", expected))
    }

    pub fn invalid_param_type(name: &str, index: usize) -> Error {
        error!(InvalidParType; format!("Parameter {} ('{}') is of invalid type.", index, name))
    }

    pub fn out_of_range(val: f64, min: f64, max: f64) -> Error {
        error!(Math; format!(
            "Parameter has to be in range [{}, {}]. Current value is {}.",
            min, max, val
        ))
    }

    pub fn not_a_number(val: f64) -> Error {
        error!(Math; format!(
            "Resultant value ({}) is not an expressible real number.",
            val
        ))
    }

    pub fn general<S: Into<String>>(message: S) -> Error {
        error!(General; message)
    }
}

impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Error {{ {} }}", self.to_string())
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}: {}", self.level, self.text())?;
        if let Some(line_number) = self.line_number {
            if (0..0) != self.column {
                write!(f, " (line {}, pos {})", line_number, self.column.start)?;
            } else {
                write!(f, " (line {})", line_number)?;
            }
        }
        Ok(())
    }
}

/// ## Severity

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Fatal = 1,
    Error = 2,
    Warning = 3,
    Internal = 4,
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let s = match self {
            Level::Fatal => "Fatal",
            Level::Error => "Error",
            Level::Warning => "Warning",
            Level::Internal => "Internal",
        };
        write!(f, "{}", s)
    }
}

/// Execution codes keep their numbers from the diagnostics table,
/// parse codes keep theirs from the parser table. The two families
/// overlap numerically, so they are told apart by `is_parse()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    NoLVal,
    NoRVal,
    InvalidLVal,
    NoFuncParams,
    InvalidType,
    WrongNoOfParams,
    InvalidRVal,
    InvalidParType,
    NoCode,
    InvalidTypeDual,
    InvalidParVal,
    InvalidMVType,
    MaxLoopCount,
    Internal,
    OutOfMemory,
    General,
    Math,
    Break,

    UnknownError,
    ParseOutOfMemory,
    InvalidSyntax,
    MissingOpenRound,
    MissingCloseRound,
    UnknownSymbol,
    UnexpectedSymbol,
    UnexpectedComma,
    NonUnaryOp,
    NonBinaryOp,
    MissingOpenCurly,
    MissingCloseCurly,
    MissingIfCondition,
    IncompleteIf,
    MissingIfTrue,
    MissingIfFalse,
    IncludeNotFound,
    MissingOpenSquare,
    MissingCloseSquare,
    UnexpectedOpenRound,
    RecursiveInclude,
}

impl ErrorCode {
    pub fn number(self) -> u16 {
        use ErrorCode::*;
        match self {
            NoLVal => 0x1,
            NoRVal => 0x2,
            InvalidLVal => 0x3,
            NoFuncParams => 0x4,
            InvalidType => 0x5,
            WrongNoOfParams => 0x6,
            InvalidRVal => 0x7,
            InvalidParType => 0x8,
            NoCode => 0x9,
            InvalidTypeDual => 0xA,
            InvalidParVal => 0xB,
            InvalidMVType => 0xC,
            MaxLoopCount => 0xD,
            Internal => 0x1000,
            OutOfMemory => 0x1001,
            General => 0x1002,
            Math => 0x1003,
            Break => 0xF000,
            UnknownError => 1,
            ParseOutOfMemory => 2,
            InvalidSyntax => 3,
            MissingOpenRound => 4,
            MissingCloseRound => 5,
            UnknownSymbol => 6,
            UnexpectedSymbol => 7,
            UnexpectedComma => 8,
            NonUnaryOp => 9,
            NonBinaryOp => 10,
            MissingOpenCurly => 11,
            MissingCloseCurly => 12,
            MissingIfCondition => 13,
            IncompleteIf => 14,
            MissingIfTrue => 15,
            MissingIfFalse => 16,
            IncludeNotFound => 17,
            MissingOpenSquare => 18,
            MissingCloseSquare => 19,
            UnexpectedOpenRound => 20,
            RecursiveInclude => 21,
        }
    }

    pub fn is_parse(self) -> bool {
        use ErrorCode::*;
        match self {
            NoLVal | NoRVal | InvalidLVal | NoFuncParams | InvalidType | WrongNoOfParams
            | InvalidRVal | InvalidParType | NoCode | InvalidTypeDual | InvalidParVal
            | InvalidMVType | MaxLoopCount | Internal | OutOfMemory | General | Math | Break => {
                false
            }
            _ => true,
        }
    }

    fn level(self) -> Level {
        use ErrorCode::*;
        match self {
            Break => Level::Internal,
            Internal | OutOfMemory | ParseOutOfMemory | MaxLoopCount => Level::Fatal,
            _ => Level::Error,
        }
    }

    pub fn as_str(self) -> &'static str {
        use ErrorCode::*;
        match self {
            NoLVal => "No L-Value",
            NoRVal => "No R-Value",
            InvalidLVal => "Invalid L-Value",
            NoFuncParams => "No function parameters",
            InvalidType => "Invalid type",
            WrongNoOfParams => "Wrong number of parameters",
            InvalidRVal => "Invalid R-Value",
            InvalidParType => "Invalid parameter type",
            NoCode => "No Code Available",
            InvalidTypeDual => "Dual of this type is not defined",
            InvalidParVal => "Invalid parameter value",
            InvalidMVType => "Multivectors are from different spaces.",
            MaxLoopCount => "Maximum allowed loop count reached",
            Internal => "Fatal Error: Unexpected internal error.",
            OutOfMemory => "Fatal Error: Out of memory.",
            General => "General error",
            Math => "Division by zero.",
            Break => "Internal break.",
            UnknownError => "Unknown Error",
            ParseOutOfMemory => "Out of Memory",
            InvalidSyntax => "Invalid Syntax",
            MissingOpenRound => "Missing '('",
            MissingCloseRound => "Missing ')'",
            UnknownSymbol => "Unknown Symbol",
            UnexpectedSymbol => "Unexpected Symbol",
            UnexpectedComma => "Unexpected Symbol ','",
            NonUnaryOp => "Non-Unary Operator",
            NonBinaryOp => "Non-Binary Operator",
            MissingOpenCurly => "Missing '{'",
            MissingCloseCurly => "Missing '}'",
            MissingIfCondition => "Missing 'if' condition",
            IncompleteIf => "Incomplete 'if' statement",
            MissingIfTrue => "Missing 'if' true branch",
            MissingIfFalse => "Missing 'if' false branch",
            IncludeNotFound => "Include file could not be found",
            MissingOpenSquare => "Missing '['",
            MissingCloseSquare => "Missing ']'",
            UnexpectedOpenRound => "Unexpected Symbol '('",
            RecursiveInclude => "File included recursively",
        }
    }
}

/// ## Ordered diagnostic log

#[derive(Debug, Default, Clone)]
pub struct ErrorList {
    errors: Vec<Error>,
}

impl ErrorList {
    pub fn new() -> ErrorList {
        ErrorList::default()
    }
    pub fn push(&mut self, error: Error) {
        self.errors.push(error);
    }
    pub fn last(&self) -> Option<&Error> {
        self.errors.last()
    }
    pub fn reset(&mut self) {
        self.errors.clear();
    }
    pub fn len(&self) -> usize {
        self.errors.len()
    }
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
    pub fn iter(&self) -> std::slice::Iter<'_, Error> {
        self.errors.iter()
    }
    pub fn take(&mut self) -> Vec<Error> {
        std::mem::take(&mut self.errors)
    }
    pub fn has_failures(&self) -> bool {
        self.errors.iter().any(|e| e.level() <= Level::Error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_location() {
        let e = error!(Math, Some(3), ..&(4..5); "Division by zero.");
        assert_eq!(e.to_string(), "Error: Division by zero. (line 3, pos 4)");
        assert_eq!(e.number(), 0x1003);
    }

    #[test]
    fn test_canonical_text() {
        assert_eq!(error!(NoCode).to_string(), "Error: No Code Available");
        assert_eq!(error!(MissingCloseRound).number(), 5);
        assert!(error!(MissingCloseRound).code().is_parse());
        assert!(!error!(InvalidMVType).code().is_parse());
    }

    #[test]
    fn test_break_is_internal() {
        let e = error!(Break);
        assert!(e.is_break());
        assert_eq!(e.level(), Level::Internal);
        assert!(!error!(General).with_level(Level::Internal).is_break());
    }

    #[test]
    fn test_located_keeps_inner_position() {
        let e = error!(General, Some(2), ..&(1..2)).located(Some(9), &(7..8));
        assert_eq!(e.line_number(), Some(2));
        assert_eq!(e.column(), 1..2);
    }
}
