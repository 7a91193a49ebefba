use std::fmt::Display;

use regex::Regex;

use crate::error::Position;


/// Every kind of token the parser knows how to consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenType {
    Ident,
    Int,
    Unsigned,
    Float,
    Str,

    Assign,
    Plus,
    Minus,
    Asterisk,
    Slash,
    Bang,
    Lt,
    Gt,
    LtEq,
    GtEq,
    Eq,
    NotEq,
    PlusEq,
    MinusEq,
    AsteriskEq,
    SlashEq,

    Comma,
    Semicolon,
    Colon,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,

    Let,
    Function,
    True,
    False,
    If,
    Else,
    Return,
    While,
    Switch,
    Case,
    Default,
    Break,
    Import,
    Macro,

    Illegal,
    Eof,
}

impl Display for TokenType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::Ident => "identifier",
            Self::Int => "integer",
            Self::Unsigned => "unsigned integer",
            Self::Float => "float",
            Self::Str => "string",
            Self::Assign => "`=`",
            Self::Plus => "`+`",
            Self::Minus => "`-`",
            Self::Asterisk => "`*`",
            Self::Slash => "`/`",
            Self::Bang => "`!`",
            Self::Lt => "`<`",
            Self::Gt => "`>`",
            Self::LtEq => "`<=`",
            Self::GtEq => "`>=`",
            Self::Eq => "`==`",
            Self::NotEq => "`!=`",
            Self::PlusEq => "`+=`",
            Self::MinusEq => "`-=`",
            Self::AsteriskEq => "`*=`",
            Self::SlashEq => "`/=`",
            Self::Comma => "`,`",
            Self::Semicolon => "`;`",
            Self::Colon => "`:`",
            Self::LParen => "`(`",
            Self::RParen => "`)`",
            Self::LBracket => "`[`",
            Self::RBracket => "`]`",
            Self::LBrace => "`{`",
            Self::RBrace => "`}`",
            Self::Let => "`let`",
            Self::Function => "`fn`",
            Self::True => "`true`",
            Self::False => "`false`",
            Self::If => "`if`",
            Self::Else => "`else`",
            Self::Return => "`return`",
            Self::While => "`while`",
            Self::Switch => "`switch`",
            Self::Case => "`case`",
            Self::Default => "`default`",
            Self::Break => "`break`",
            Self::Import => "`import`",
            Self::Macro => "`macro`",
            Self::Illegal => "illegal token",
            Self::Eof => "end of input",
        };
        f.write_str(text)
    }
}

/// A lexical token. For string tokens the literal holds the unescaped
/// contents; for all others it is the source text.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenType,
    pub literal: String,
    pub position: Position,
}

impl Token {
    pub fn new(kind: TokenType, literal: impl Into<String>, position: Position) -> Token {
        Token { kind, literal: literal.into(), position }
    }
}

/// Anything that can feed the parser. Once the input is exhausted, every
/// further call must return a token of type [`TokenType::Eof`].
pub trait TokenSource {
    fn next_token(&mut self) -> Token;
}

impl<T: Iterator<Item = Token>> TokenSource for std::iter::Fuse<T> {
    fn next_token(&mut self) -> Token {
        self.next().unwrap_or_else(|| Token::new(TokenType::Eof, "", Position::zero()))
    }
}


lazy_static! {
    static ref WHITESPACE: Regex = Regex::new(r"^\s*").unwrap();
    static ref NAME: Regex = Regex::new("^[[:alpha:]_][[:alnum:]_]*").unwrap();
    static ref FLOAT: Regex = Regex::new(r"^[[:digit:]]+\.[[:digit:]]+").unwrap();
    static ref UNSIGNED: Regex = Regex::new(r"^[[:digit:]]+u").unwrap();
    static ref DIGITS: Regex = Regex::new("^[[:digit:]]+").unwrap();
}


fn keyword(name: &str) -> Option<TokenType> {
    match name {
        "let" => Some(TokenType::Let),
        "fn" => Some(TokenType::Function),
        "true" => Some(TokenType::True),
        "false" => Some(TokenType::False),
        "if" => Some(TokenType::If),
        "else" => Some(TokenType::Else),
        "return" => Some(TokenType::Return),
        "while" => Some(TokenType::While),
        "switch" => Some(TokenType::Switch),
        "case" => Some(TokenType::Case),
        "default" => Some(TokenType::Default),
        "break" => Some(TokenType::Break),
        "import" => Some(TokenType::Import),
        "macro" => Some(TokenType::Macro),
        _ => None,
    }
}


/// Regex-driven lexer over a source string.
#[derive(Clone, Copy)]
pub struct Lexer<'a> {
    code: &'a str,
    position: Position,
}

impl<'a> Lexer<'a> {
    pub fn new(code: &'a str) -> Lexer<'a> {
        Lexer {
            code,
            position: Position::zero(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.code.chars().next()
    }

    fn satisfies_at(&self, i: usize, f: impl FnOnce(char) -> bool) -> bool {
        self.code.chars().nth(i).is_some_and(f)
    }

    fn skip(&mut self, offset: usize) -> &'a str {
        let skipped = &self.code[..offset];
        self.position = self.position.advance(skipped);
        self.code = &self.code[offset..];
        skipped
    }

    fn skip_tag(&mut self, offset: usize, kind: TokenType) -> Token {
        let position = self.position;
        let text = self.skip(offset);
        Token::new(kind, text, position)
    }

    fn traverse(&mut self, regex: &Regex) -> Option<(Position, &'a str)> {
        let m = regex.find(self.code)?;
        let position = self.position;
        Some((position, self.skip(m.end())))
    }

    fn skip_whitespace(&mut self) {
        loop {
            // The WHITESPACE regex cannot fail to match
            self.traverse(&WHITESPACE);

            let comment = match self.peek() {
                Some('#') => true,
                Some('/') => self.satisfies_at(1, |x| x == '/'),
                _ => false,
            };

            if !comment {
                break;
            }

            let end = self.code.find('\n').unwrap_or(self.code.len());
            self.skip(end);
        }
    }

    fn next_number(&mut self) -> Token {
        if let Some((position, text)) = self.traverse(&FLOAT) {
            return Token::new(TokenType::Float, text, position);
        }
        if let Some((position, text)) = self.traverse(&UNSIGNED) {
            return Token::new(TokenType::Unsigned, text, position);
        }
        match self.traverse(&DIGITS) {
            Some((position, text)) => Token::new(TokenType::Int, text, position),
            None => self.skip_tag(1, TokenType::Illegal),
        }
    }

    fn next_name(&mut self) -> Token {
        match self.traverse(&NAME) {
            Some((position, text)) => Token::new(keyword(text).unwrap_or(TokenType::Ident), text, position),
            None => self.skip_tag(1, TokenType::Illegal),
        }
    }

    fn next_string(&mut self) -> Token {
        let position = self.position;
        let mut value = String::new();
        let mut it = self.code.char_indices().skip(1);

        loop {
            match it.next() {
                Some((end, '"')) => {
                    self.skip(end + 1);
                    return Token::new(TokenType::Str, value, position);
                },

                Some((_, '\\')) => match it.next() {
                    Some((_, 'n')) => value.push('\n'),
                    Some((_, 't')) => value.push('\t'),
                    Some((_, 'r')) => value.push('\r'),
                    Some((_, c @ ('"' | '\\'))) => value.push(c),
                    Some((_, c)) => {
                        value.push('\\');
                        value.push(c);
                    },
                    None => break,
                },

                Some((_, c)) => value.push(c),

                None => break,
            }
        }

        // Unterminated string: swallow the rest of the input
        let rest = self.skip(self.code.len());
        Token::new(TokenType::Illegal, rest, position)
    }

    fn two_char(&mut self, second: char, double: TokenType, single: TokenType) -> Token {
        if self.satisfies_at(1, |x| x == second) {
            self.skip_tag(2, double)
        } else {
            self.skip_tag(1, single)
        }
    }
}

impl<'a> TokenSource for Lexer<'a> {
    fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        match self.peek() {
            Some('a'..='z') | Some('A'..='Z') | Some('_') => self.next_name(),
            Some(x) if x.is_ascii_digit() => self.next_number(),
            Some('"') => self.next_string(),

            Some('=') => self.two_char('=', TokenType::Eq, TokenType::Assign),
            Some('!') => self.two_char('=', TokenType::NotEq, TokenType::Bang),
            Some('<') => self.two_char('=', TokenType::LtEq, TokenType::Lt),
            Some('>') => self.two_char('=', TokenType::GtEq, TokenType::Gt),
            Some('+') => self.two_char('=', TokenType::PlusEq, TokenType::Plus),
            Some('-') => self.two_char('=', TokenType::MinusEq, TokenType::Minus),
            Some('*') => self.two_char('=', TokenType::AsteriskEq, TokenType::Asterisk),
            Some('/') => self.two_char('=', TokenType::SlashEq, TokenType::Slash),

            Some(',') => self.skip_tag(1, TokenType::Comma),
            Some(';') => self.skip_tag(1, TokenType::Semicolon),
            Some(':') => self.skip_tag(1, TokenType::Colon),
            Some('(') => self.skip_tag(1, TokenType::LParen),
            Some(')') => self.skip_tag(1, TokenType::RParen),
            Some('[') => self.skip_tag(1, TokenType::LBracket),
            Some(']') => self.skip_tag(1, TokenType::RBracket),
            Some('{') => self.skip_tag(1, TokenType::LBrace),
            Some('}') => self.skip_tag(1, TokenType::RBrace),

            Some(c) => self.skip_tag(c.len_utf8(), TokenType::Illegal),
            None => Token::new(TokenType::Eof, "", self.position),
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token;

    /// Iterate over all tokens up to, but not including, end of input.
    fn next(&mut self) -> Option<Token> {
        let token = self.next_token();
        if token.kind == TokenType::Eof {
            None
        } else {
            Some(token)
        }
    }
}
