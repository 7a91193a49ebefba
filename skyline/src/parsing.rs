//! Precedence-climbing parser.
//!
//! The parser holds two tokens of lookahead (`current` and `peek`) and
//! dispatches on token type to prefix and infix parse functions. Parse
//! functions return `None` after recording an error; the statement loop then
//! skips ahead to the next statement boundary and carries on, so a single
//! pass reports as many errors as possible. A token that can't begin an
//! expression is the exception: it is replaced by [`Expr::Invalid`] and
//! parsing continues in place.
//!
//! Every parse function starts with `current` on the first token of its
//! construct and leaves `current` on the last token it consumed.

use std::rc::Rc;

use tracing::debug;

use crate::ast::{Block, Expr, Program, Statement};
use crate::error::{Syntax, SyntaxError};
use crate::lexing::{Lexer, Token, TokenSource, TokenType};
use crate::types::{AssignOp, BinOp, Key, Type, UnOp};


/// Binding strength of operators, weakest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    Lowest,
    Assign,      // = += -= *= /=
    Equals,      // == !=
    LessGreater, // < > <= >=
    Sum,         // + -
    Product,     // * /
    Prefix,      // -x !x
    Call,        // f(x)
    Index,       // a[i]
}

impl Precedence {
    /// Look up the precedence of a token when used as an infix operator.
    /// Tokens that aren't operators bind at the lowest level.
    pub fn of(kind: TokenType) -> Precedence {
        match kind {
            TokenType::Assign
            | TokenType::PlusEq
            | TokenType::MinusEq
            | TokenType::AsteriskEq
            | TokenType::SlashEq => Precedence::Assign,
            TokenType::Eq | TokenType::NotEq => Precedence::Equals,
            TokenType::Lt | TokenType::Gt | TokenType::LtEq | TokenType::GtEq => Precedence::LessGreater,
            TokenType::Plus | TokenType::Minus => Precedence::Sum,
            TokenType::Asterisk | TokenType::Slash => Precedence::Product,
            TokenType::LParen => Precedence::Call,
            TokenType::LBracket => Precedence::Index,
            _ => Precedence::Lowest,
        }
    }
}

fn binop(kind: TokenType) -> Option<BinOp> {
    match kind {
        TokenType::Plus => Some(BinOp::Add),
        TokenType::Minus => Some(BinOp::Subtract),
        TokenType::Asterisk => Some(BinOp::Multiply),
        TokenType::Slash => Some(BinOp::Divide),
        TokenType::Lt => Some(BinOp::Less),
        TokenType::Gt => Some(BinOp::Greater),
        TokenType::LtEq => Some(BinOp::LessEqual),
        TokenType::GtEq => Some(BinOp::GreaterEqual),
        TokenType::Eq => Some(BinOp::Equal),
        TokenType::NotEq => Some(BinOp::NotEqual),
        _ => None,
    }
}

fn assignop(kind: TokenType) -> Option<AssignOp> {
    match kind {
        TokenType::Assign => Some(AssignOp::Assign),
        TokenType::PlusEq => Some(AssignOp::Add),
        TokenType::MinusEq => Some(AssignOp::Subtract),
        TokenType::AsteriskEq => Some(AssignOp::Multiply),
        TokenType::SlashEq => Some(AssignOp::Divide),
        _ => None,
    }
}


type PrefixFn<S> = fn(&mut Parser<S>) -> Option<Expr>;
type InfixFn<S> = fn(&mut Parser<S>, Expr) -> Option<Expr>;


/// How deeply expressions may nest before the parser gives up.
pub const MAX_NESTING: usize = 256;


pub struct Parser<S: TokenSource> {
    source: S,
    current: Token,
    peek: Token,
    errors: Vec<SyntaxError>,
    depth: usize,
}

impl<'a> Parser<Lexer<'a>> {
    /// Construct a parser reading directly from source text.
    pub fn from_source(code: &'a str) -> Self {
        Parser::new(Lexer::new(code))
    }
}

impl<S: TokenSource> Parser<S> {
    pub fn new(mut source: S) -> Self {
        // Read two tokens so that current and peek are both set
        let current = source.next_token();
        let peek = source.next_token();
        Parser {
            source,
            current,
            peek,
            errors: vec![],
            depth: 0,
        }
    }

    /// Errors recorded so far, in the order they were found.
    pub fn errors(&self) -> &[SyntaxError] {
        &self.errors
    }

    /// Errors recorded so far, rendered as human-readable strings.
    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(SyntaxError::to_string).collect()
    }

    pub fn into_errors(self) -> Vec<SyntaxError> {
        self.errors
    }

    fn next_token(&mut self) {
        let next = self.source.next_token();
        self.current = std::mem::replace(&mut self.peek, next);
    }

    fn current_is(&self, kind: TokenType) -> bool {
        self.current.kind == kind
    }

    fn peek_is(&self, kind: TokenType) -> bool {
        self.peek.kind == kind
    }

    fn peek_precedence(&self) -> Precedence {
        Precedence::of(self.peek.kind)
    }

    fn current_precedence(&self) -> Precedence {
        Precedence::of(self.current.kind)
    }

    fn record(&mut self, error: SyntaxError) {
        debug!(%error, "parse error");
        self.errors.push(error);
    }

    fn error_at_current(&mut self, reason: Syntax) {
        self.record(SyntaxError::new(self.current.position, reason));
    }

    /// Advance if the next token has the expected type, otherwise record an
    /// error and leave the parser where it is.
    fn expect_peek(&mut self, kind: TokenType) -> Option<()> {
        if self.peek_is(kind) {
            self.next_token();
            Some(())
        } else {
            let error = SyntaxError::new(
                self.peek.position,
                Syntax::Expected { expected: kind, found: self.peek.kind },
            );
            self.record(error);
            None
        }
    }

    fn expect_current(&mut self, kind: TokenType) -> Option<()> {
        if self.current_is(kind) {
            Some(())
        } else {
            let found = self.current.kind;
            self.error_at_current(Syntax::Expected { expected: kind, found });
            None
        }
    }

    fn skip_semicolon(&mut self) {
        if self.peek_is(TokenType::Semicolon) {
            self.next_token();
        }
    }

    /// Skip ahead after a failed statement. Stops on a `;`, a `}`, end of
    /// input, or just before a token that begins a new statement.
    fn synchronize(&mut self) {
        loop {
            match self.current.kind {
                TokenType::Semicolon | TokenType::RBrace | TokenType::Eof => return,
                _ => {},
            }
            match self.peek.kind {
                TokenType::Let | TokenType::Return | TokenType::Break | TokenType::RBrace | TokenType::Eof => return,
                _ => {},
            }
            self.next_token();
        }
    }

    // Parse-function tables
    // --------------------------------------------------------------------------------------------

    fn prefix_fn(kind: TokenType) -> Option<PrefixFn<S>> {
        match kind {
            TokenType::Ident => Some(Self::parse_identifier),
            TokenType::Int => Some(Self::parse_integer),
            TokenType::Unsigned => Some(Self::parse_unsigned),
            TokenType::Float => Some(Self::parse_float),
            TokenType::Str => Some(Self::parse_string),
            TokenType::True | TokenType::False => Some(Self::parse_boolean),
            TokenType::Bang | TokenType::Minus => Some(Self::parse_prefix),
            TokenType::LParen => Some(Self::parse_grouped),
            TokenType::LBracket => Some(Self::parse_array),
            TokenType::LBrace => Some(Self::parse_hash),
            TokenType::If => Some(Self::parse_if),
            TokenType::While => Some(Self::parse_while),
            TokenType::Switch => Some(Self::parse_switch),
            TokenType::Function => Some(Self::parse_function),
            TokenType::Import => Some(Self::parse_import),
            TokenType::Macro => Some(Self::parse_macro),
            _ => None,
        }
    }

    fn infix_fn(kind: TokenType) -> Option<InfixFn<S>> {
        match kind {
            TokenType::Plus
            | TokenType::Minus
            | TokenType::Asterisk
            | TokenType::Slash
            | TokenType::Eq
            | TokenType::NotEq
            | TokenType::Lt
            | TokenType::Gt
            | TokenType::LtEq
            | TokenType::GtEq => Some(Self::parse_infix),
            TokenType::LParen => Some(Self::parse_call),
            TokenType::LBracket => Some(Self::parse_index),
            TokenType::Assign
            | TokenType::PlusEq
            | TokenType::MinusEq
            | TokenType::AsteriskEq
            | TokenType::SlashEq => Some(Self::parse_assignment),
            _ => None,
        }
    }

    // Statements
    // --------------------------------------------------------------------------------------------

    /// Consume the whole token stream. Always returns a program, possibly
    /// partial; check [`Parser::errors`] afterwards.
    pub fn parse_program(&mut self) -> Program {
        let mut program = Program::default();

        while !self.current_is(TokenType::Eof) {
            match self.parse_statement() {
                Some(stmt) => program.statements.push(stmt),
                None => self.synchronize(),
            }
            self.next_token();
        }

        program
    }

    fn parse_statement(&mut self) -> Option<Statement> {
        match self.current.kind {
            TokenType::Let => self.parse_let(),
            TokenType::Return => self.parse_return(),
            TokenType::Break => {
                self.skip_semicolon();
                Some(Statement::Break)
            },
            TokenType::Semicolon => None,
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_let(&mut self) -> Option<Statement> {
        self.expect_peek(TokenType::Ident)?;
        let name = Key::from(self.current.literal.as_str());
        self.expect_peek(TokenType::Assign)?;
        self.next_token();
        let value = self.parse_expression(Precedence::Lowest)?;
        self.skip_semicolon();
        Some(Statement::Let { name, value })
    }

    fn parse_return(&mut self) -> Option<Statement> {
        if matches!(self.peek.kind, TokenType::Semicolon | TokenType::RBrace | TokenType::Eof) {
            self.skip_semicolon();
            return Some(Statement::Return(None));
        }
        self.next_token();
        let value = self.parse_expression(Precedence::Lowest)?;
        self.skip_semicolon();
        Some(Statement::Return(Some(value)))
    }

    fn parse_expression_statement(&mut self) -> Option<Statement> {
        let expr = self.parse_expression(Precedence::Lowest)?;
        self.skip_semicolon();
        Some(Statement::Expression(expr))
    }

    /// Parse a braced block. Starts on the opening brace and ends on the
    /// closing one.
    fn parse_block(&mut self) -> Option<Block> {
        let mut block = Block::default();
        self.next_token();

        while !self.current_is(TokenType::RBrace) && !self.current_is(TokenType::Eof) {
            match self.parse_statement() {
                Some(stmt) => block.statements.push(stmt),
                None => {
                    self.synchronize();
                    if self.current_is(TokenType::RBrace) {
                        break;
                    }
                },
            }
            self.next_token();
        }

        self.expect_current(TokenType::RBrace)?;
        Some(block)
    }

    // Expressions
    // --------------------------------------------------------------------------------------------

    /// Parse an expression whose operators bind tighter than `precedence`.
    ///
    /// A token that can't start an expression is recorded as an error and
    /// gives an [`Expr::Invalid`] in its place, so the surrounding statement
    /// survives. Nesting beyond [`MAX_NESTING`] levels abandons the statement.
    pub fn parse_expression(&mut self, precedence: Precedence) -> Option<Expr> {
        if self.depth >= MAX_NESTING {
            self.error_at_current(Syntax::TooDeep);
            return None;
        }
        self.depth += 1;
        let result = self.parse_expression_at(precedence);
        self.depth -= 1;
        result
    }

    fn parse_expression_at(&mut self, precedence: Precedence) -> Option<Expr> {
        let prefix = match Self::prefix_fn(self.current.kind) {
            Some(f) => f,
            None => {
                let reason = match self.current.kind {
                    TokenType::Illegal => Syntax::Illegal(self.current.literal.clone()),
                    kind => Syntax::NoPrefix(kind),
                };
                self.error_at_current(reason);

                // A stray closing delimiter belongs to an enclosing construct
                return match self.current.kind {
                    TokenType::RParen | TokenType::RBracket | TokenType::RBrace => None,
                    _ => Some(Expr::Invalid),
                };
            },
        };

        let mut left = prefix(self)?;

        while !self.peek_is(TokenType::Semicolon) && precedence < self.peek_precedence() {
            let infix = match Self::infix_fn(self.peek.kind) {
                Some(f) => f,
                None => return Some(left),
            };
            self.next_token();
            left = infix(self, left)?;
        }

        Some(left)
    }

    fn parse_identifier(&mut self) -> Option<Expr> {
        Some(Expr::Identifier(Key::from(self.current.literal.as_str())))
    }

    fn literal_error(&mut self, kind: Type) {
        let literal = self.current.literal.clone();
        self.error_at_current(Syntax::Literal { literal, kind });
    }

    fn parse_integer(&mut self) -> Option<Expr> {
        match self.current.literal.parse::<i64>() {
            Ok(x) => Some(Expr::Integer(x)),
            Err(_) => {
                self.literal_error(Type::Integer);
                None
            },
        }
    }

    fn parse_unsigned(&mut self) -> Option<Expr> {
        let digits = self.current.literal.trim_end_matches('u');
        match digits.parse::<u64>() {
            Ok(x) => Some(Expr::Unsigned(x)),
            Err(_) => {
                self.literal_error(Type::Unsigned);
                None
            },
        }
    }

    fn parse_float(&mut self) -> Option<Expr> {
        match self.current.literal.parse::<f64>() {
            Ok(x) => Some(Expr::Float(x)),
            Err(_) => {
                self.literal_error(Type::Float);
                None
            },
        }
    }

    fn parse_string(&mut self) -> Option<Expr> {
        Some(Expr::Str(self.current.literal.clone()))
    }

    fn parse_boolean(&mut self) -> Option<Expr> {
        Some(Expr::Boolean(self.current_is(TokenType::True)))
    }

    fn parse_prefix(&mut self) -> Option<Expr> {
        let operator = match self.current.kind {
            TokenType::Bang => UnOp::LogicalNegate,
            _ => UnOp::ArithmeticalNegate,
        };
        self.next_token();
        let operand = self.parse_expression(Precedence::Prefix)?;
        Some(Expr::prefix(operator, operand))
    }

    fn parse_grouped(&mut self) -> Option<Expr> {
        self.next_token();
        let expr = self.parse_expression(Precedence::Lowest)?;
        self.expect_peek(TokenType::RParen)?;
        Some(expr)
    }

    /// Parse a comma-separated list of expressions up to a closing token.
    /// Starts on the opening token.
    fn parse_expression_list(&mut self, end: TokenType) -> Option<Vec<Expr>> {
        let mut list = vec![];

        if self.peek_is(end) {
            self.next_token();
            return Some(list);
        }

        self.next_token();
        list.push(self.parse_expression(Precedence::Lowest)?);

        while self.peek_is(TokenType::Comma) {
            self.next_token();
            self.next_token();
            list.push(self.parse_expression(Precedence::Lowest)?);
        }

        self.expect_peek(end)?;
        Some(list)
    }

    fn parse_array(&mut self) -> Option<Expr> {
        self.parse_expression_list(TokenType::RBracket).map(Expr::Array)
    }

    fn parse_hash(&mut self) -> Option<Expr> {
        let mut pairs = vec![];

        while !self.peek_is(TokenType::RBrace) {
            self.next_token();
            let key = self.parse_expression(Precedence::Lowest)?;
            self.expect_peek(TokenType::Colon)?;
            self.next_token();
            let value = self.parse_expression(Precedence::Lowest)?;
            pairs.push((key, value));

            if !self.peek_is(TokenType::RBrace) {
                self.expect_peek(TokenType::Comma)?;
            }
        }

        self.expect_peek(TokenType::RBrace)?;
        Some(Expr::Hash(pairs))
    }

    fn parse_if(&mut self) -> Option<Expr> {
        self.next_token();
        let condition = self.parse_expression(Precedence::Lowest)?;
        self.expect_peek(TokenType::LBrace)?;
        let consequence = self.parse_block()?;

        let alternative = if self.peek_is(TokenType::Else) {
            self.next_token();
            if self.peek_is(TokenType::If) {
                self.next_token();
                let nested = self.parse_if()?;
                Some(Block { statements: vec![Statement::Expression(nested)] })
            } else {
                self.expect_peek(TokenType::LBrace)?;
                Some(self.parse_block()?)
            }
        } else {
            None
        };

        Some(Expr::If {
            condition: Box::new(condition),
            consequence,
            alternative,
        })
    }

    fn parse_while(&mut self) -> Option<Expr> {
        self.next_token();
        let condition = self.parse_expression(Precedence::Lowest)?;
        self.expect_peek(TokenType::LBrace)?;
        let body = self.parse_block()?;
        Some(Expr::While { condition: Box::new(condition), body })
    }

    fn parse_switch(&mut self) -> Option<Expr> {
        self.next_token();
        let subject = self.parse_expression(Precedence::Lowest)?;
        self.expect_peek(TokenType::LBrace)?;

        let mut cases = vec![];
        let mut default = None;

        loop {
            self.next_token();
            match self.current.kind {
                TokenType::RBrace => break,
                TokenType::Case => {
                    self.next_token();
                    let value = self.parse_expression(Precedence::Lowest)?;
                    self.expect_peek(TokenType::LBrace)?;
                    cases.push((value, self.parse_block()?));
                },
                TokenType::Default if default.is_none() => {
                    self.expect_peek(TokenType::LBrace)?;
                    default = Some(self.parse_block()?);
                },
                kind => {
                    let expected = if default.is_none() { TokenType::Case } else { TokenType::RBrace };
                    self.error_at_current(Syntax::Expected { expected, found: kind });
                    return None;
                },
            }
        }

        Some(Expr::Switch {
            subject: Box::new(subject),
            cases,
            default,
        })
    }

    fn parse_parameters(&mut self) -> Option<Vec<Key>> {
        let mut params = vec![];

        if self.peek_is(TokenType::RParen) {
            self.next_token();
            return Some(params);
        }

        self.next_token();
        self.expect_current(TokenType::Ident)?;
        params.push(Key::from(self.current.literal.as_str()));

        while self.peek_is(TokenType::Comma) {
            self.next_token();
            self.next_token();
            self.expect_current(TokenType::Ident)?;
            params.push(Key::from(self.current.literal.as_str()));
        }

        self.expect_peek(TokenType::RParen)?;
        Some(params)
    }

    /// Parameter list and body, shared by function and macro literals.
    fn parse_callable(&mut self) -> Option<(Vec<Key>, Rc<Block>)> {
        self.expect_peek(TokenType::LParen)?;
        let parameters = self.parse_parameters()?;
        self.expect_peek(TokenType::LBrace)?;
        let body = self.parse_block()?;
        Some((parameters, Rc::new(body)))
    }

    fn parse_function(&mut self) -> Option<Expr> {
        let (parameters, body) = self.parse_callable()?;
        Some(Expr::Function { parameters, body })
    }

    fn parse_macro(&mut self) -> Option<Expr> {
        let (parameters, body) = self.parse_callable()?;
        Some(Expr::Macro { parameters, body })
    }

    fn parse_import(&mut self) -> Option<Expr> {
        self.next_token();
        let path = self.parse_expression(Precedence::Prefix)?;
        Some(Expr::Import(Box::new(path)))
    }

    fn parse_infix(&mut self, left: Expr) -> Option<Expr> {
        // Only registered for operator tokens, so the lookup can't fail
        let operator = binop(self.current.kind)?;
        let precedence = self.current_precedence();
        self.next_token();
        let right = self.parse_expression(precedence)?;
        Some(Expr::infix(operator, left, right))
    }

    fn parse_call(&mut self, function: Expr) -> Option<Expr> {
        let arguments = self.parse_expression_list(TokenType::RParen)?;
        Some(Expr::call(function, arguments))
    }

    fn parse_index(&mut self, collection: Expr) -> Option<Expr> {
        self.next_token();
        let index = self.parse_expression(Precedence::Lowest)?;
        self.expect_peek(TokenType::RBracket)?;
        Some(Expr::index(collection, index))
    }

    /// Assignment is right-associative: the value is parsed one level below
    /// assignment so that `a = b = c` assigns `c` to `b` first.
    fn parse_assignment(&mut self, left: Expr) -> Option<Expr> {
        let operator = assignop(self.current.kind)?;
        let target = match left {
            Expr::Identifier(name) => name,
            other => {
                self.error_at_current(Syntax::AssignTarget(other.to_string()));
                return None;
            },
        };
        self.next_token();
        let value = self.parse_expression(Precedence::Lowest)?;
        Some(Expr::assign(target, operator, value))
    }
}


/// Parse source text into a program, failing if any syntax errors were found.
pub fn parse(input: &str) -> Result<Program, Vec<SyntaxError>> {
    let mut parser = Parser::from_source(input);
    let program = parser.parse_program();
    let errors = parser.into_errors();
    if errors.is_empty() {
        Ok(program)
    } else {
        Err(errors)
    }
}
