use std::fmt::{Display, Write};

use crate::lexing::TokenType;
use crate::types::Type;

/// Marks a position in a text buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    offset: usize,
    line: u32,
    column: u32,
}

impl Position {
    /// Construct a new position from offset, line and column (all 0-indexed).
    pub fn new(offset: usize, line: u32, column: u32) -> Position {
        Position {
            offset,
            line,
            column,
        }
    }

    /// Construct a new position pointing to the beginning of a buffer.
    pub fn zero() -> Position {
        Position {
            offset: 0,
            line: 0,
            column: 0,
        }
    }

    /// Advance past `text`, which must be the text immediately following this
    /// position in the buffer.
    pub fn advance(&self, text: &str) -> Position {
        let mut ret = *self;
        for c in text.chars() {
            ret.offset += c.len_utf8();
            if c == '\n' {
                ret.line += 1;
                ret.column = 0;
            } else {
                ret.column += 1;
            }
        }
        ret
    }

    /// Return the zero-indexed offset into the buffer.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Return the zero-indexed line number.
    pub fn line(&self) -> u32 {
        self.line
    }

    /// Return the zero-indexed column number.
    pub fn column(&self) -> u32 {
        self.column
    }
}

impl Display for Position {
    /// Positions are displayed one-indexed, as editors expect.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line + 1, self.column + 1)
    }
}

/// Enumerates all the possible reasons for a syntax error.
#[derive(Debug, Clone, PartialEq)]
pub enum Syntax {
    /// The next token was not the one the grammar requires
    Expected {
        expected: TokenType,
        found: TokenType,
    },

    /// No expression can start with this token
    NoPrefix(TokenType),

    /// The left-hand side of an assignment is not a name
    AssignTarget(String),

    /// A numeric literal that doesn't fit its type
    Literal {
        literal: String,
        kind: Type,
    },

    /// The lexer could not make sense of this text
    Illegal(String),

    /// Expressions nested too deeply to parse
    TooDeep,
}

impl Display for Syntax {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Expected { expected, found } => write!(f, "expected next token to be {}, got {} instead", expected, found),
            Self::NoPrefix(kind) => write!(f, "no prefix parse function for {} found", kind),
            Self::AssignTarget(target) => write!(f, "cannot assign to {}", target),
            Self::Literal { literal, kind } => write!(f, "could not parse {} as {}", literal, kind),
            Self::Illegal(text) => write!(f, "illegal token {:?}", text),
            Self::TooDeep => f.write_str("expression nested too deeply"),
        }
    }
}

/// A single parse error, recorded by the parser and inspected after parsing.
#[derive(Clone, Debug, PartialEq)]
pub struct SyntaxError {
    position: Position,
    reason: Syntax,
}

impl SyntaxError {
    /// Create a new syntax error.
    pub fn new(position: Position, reason: Syntax) -> SyntaxError {
        SyntaxError { position, reason }
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn reason(&self) -> &Syntax {
        &self.reason
    }
}

impl Display for SyntaxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.position, self.reason)
    }
}

/// Error type returned by the convenience entry points in the crate root,
/// which fold the two error channels (parse errors and error objects) into one.
#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    /// Parsing failed with one or more errors
    Syntax(Vec<SyntaxError>),

    /// Evaluation produced an error object
    Runtime(String),

    /// A source file could not be read
    Io(String),
}

impl Error {
    /// Render the error for human consumption, one message per line.
    pub fn render(&self) -> String {
        match self {
            Self::Syntax(errors) => {
                let mut ret = String::new();
                for (i, error) in errors.iter().enumerate() {
                    if i > 0 {
                        ret.push('\n');
                    }
                    let _ = write!(ret, "parse error: {}", error);
                }
                ret
            },
            Self::Runtime(msg) => format!("ERROR: {}", msg),
            Self::Io(msg) => format!("io error: {}", msg),
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render())
    }
}
