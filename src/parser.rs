use crate::ast::{BlockStatement, Expr, FunctionLiteral, Identifier, InfixOp, PrefixOp, Program, Stmt};
use crate::error::{MonkeyError, Span};
use crate::lexer::{Lexer, Token, TokenType};
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    Lowest,
    Equals,      // ==
    LessGreater, // > or <
    Sum,         // +
    Product,     // *
    Prefix,      // -X or !X
    Call,        // myFunction(X)
    Index,       // array[index]
}

impl Precedence {
    fn of(token_type: TokenType) -> Precedence {
        match token_type {
            TokenType::Equal | TokenType::NotEqual => Precedence::Equals,
            TokenType::LessThan | TokenType::GreaterThan => Precedence::LessGreater,
            TokenType::Plus | TokenType::Minus => Precedence::Sum,
            TokenType::Asterisk | TokenType::Slash => Precedence::Product,
            TokenType::LeftParen => Precedence::Call,
            TokenType::LeftBracket => Precedence::Index,
            _ => Precedence::Lowest,
        }
    }
}

type PrefixParseFn<'a> = fn(&mut Parser<'a>) -> Option<Expr>;
type InfixParseFn<'a> = fn(&mut Parser<'a>, Expr) -> Option<Expr>;

/// Pratt parser over a pulled token stream with one token of lookahead.
///
/// Productions return `None` after recording a diagnostic; the statement
/// that contained the failure is dropped and parsing resumes at the next
/// statement, so one pass reports every problem it can find.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    peek: Token,
    errors: Vec<MonkeyError>,
}

impl<'a> Parser<'a> {
    pub fn new(mut lexer: Lexer<'a>) -> Self {
        let current = lexer.next_token();
        let peek = lexer.next_token();
        Self {
            lexer,
            current,
            peek,
            errors: Vec::new(),
        }
    }

    pub fn parse_program(&mut self) -> Program {
        let mut program = Program::default();

        while !self.current_token_is(TokenType::Eof) {
            match self.parse_statement() {
                Some(statement) => program.statements.push(statement),
                None => self.synchronize(),
            }
            self.next_token();
        }

        tracing::debug!(
            statements = program.statements.len(),
            errors = self.errors.len(),
            "parsed program"
        );
        program
    }

    /// Messages of every syntax error seen so far, in source order.
    pub fn errors(&self) -> Vec<String> {
        self.errors.iter().map(|error| error.message.clone()).collect()
    }

    pub fn diagnostics(&self) -> &[MonkeyError] {
        &self.errors
    }

    fn next_token(&mut self) {
        let next = self.lexer.next_token();
        self.current = std::mem::replace(&mut self.peek, next);
    }

    /// Skips the rest of a statement that failed to parse. Stops on its
    /// terminating `;`, on a `}` it failed at, or just before a closing `}`
    /// or EOF.
    fn synchronize(&mut self) {
        while !self.current_token_is(TokenType::Semicolon)
            && !self.current_token_is(TokenType::RightBrace)
            && !self.peek_token_is(TokenType::Eof)
            && !self.peek_token_is(TokenType::RightBrace)
        {
            self.next_token();
        }
    }

    fn current_token_is(&self, token_type: TokenType) -> bool {
        self.current.token_type == token_type
    }

    fn peek_token_is(&self, token_type: TokenType) -> bool {
        self.peek.token_type == token_type
    }

    fn expect_peek(&mut self, token_type: TokenType) -> Option<()> {
        if self.peek_token_is(token_type) {
            self.next_token();
            Some(())
        } else {
            self.peek_error(token_type);
            None
        }
    }

    fn peek_error(&mut self, expected: TokenType) {
        let message = format!(
            "expected next token to be {}, got {} instead",
            expected, self.peek.token_type
        );
        let mut error = MonkeyError::parse_error(self.peek.span, message);
        if let Some(help) = expected_token_help(expected) {
            error = error.with_help(help);
        }
        self.push_error(error);
    }

    fn push_error(&mut self, error: MonkeyError) {
        tracing::trace!(message = %error.message, start = error.span.start, "syntax error");
        self.errors.push(error);
    }

    fn parse_statement(&mut self) -> Option<Stmt> {
        match self.current.token_type {
            TokenType::Let => self.parse_let_statement(),
            TokenType::Return => self.parse_return_statement(),
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_let_statement(&mut self) -> Option<Stmt> {
        let start = self.current.span.start;

        self.expect_peek(TokenType::Identifier)?;
        let name = Identifier {
            name: self.current.literal.clone(),
            span: self.current.span,
        };

        self.expect_peek(TokenType::Assign)?;
        self.next_token();

        let value = self.parse_expression(Precedence::Lowest)?;
        self.skip_optional_semicolon();

        Some(Stmt::Let {
            name,
            value,
            span: Span::new(start, self.current.span.end),
        })
    }

    fn parse_return_statement(&mut self) -> Option<Stmt> {
        let start = self.current.span.start;
        self.next_token();

        let value = self.parse_expression(Precedence::Lowest)?;
        self.skip_optional_semicolon();

        Some(Stmt::Return {
            value,
            span: Span::new(start, self.current.span.end),
        })
    }

    fn parse_expression_statement(&mut self) -> Option<Stmt> {
        let start = self.current.span.start;
        let expr = self.parse_expression(Precedence::Lowest)?;
        self.skip_optional_semicolon();

        Some(Stmt::Expression {
            expr,
            span: Span::new(start, self.current.span.end),
        })
    }

    fn skip_optional_semicolon(&mut self) {
        if self.peek_token_is(TokenType::Semicolon) {
            self.next_token();
        }
    }

    fn prefix_rule(token_type: TokenType) -> Option<PrefixParseFn<'a>> {
        match token_type {
            TokenType::Identifier => Some(Parser::parse_identifier),
            TokenType::Int => Some(Parser::parse_integer_literal),
            TokenType::String => Some(Parser::parse_string_literal),
            TokenType::True | TokenType::False => Some(Parser::parse_boolean_literal),
            TokenType::Null => Some(Parser::parse_null_literal),
            TokenType::Bang | TokenType::Minus => Some(Parser::parse_prefix_expression),
            TokenType::LeftParen => Some(Parser::parse_grouped_expression),
            TokenType::LeftBracket => Some(Parser::parse_array_literal),
            TokenType::LeftBrace => Some(Parser::parse_map_literal),
            TokenType::If => Some(Parser::parse_if_expression),
            TokenType::Function => Some(Parser::parse_function_literal),
            _ => None,
        }
    }

    fn infix_rule(token_type: TokenType) -> Option<InfixParseFn<'a>> {
        match token_type {
            TokenType::Plus
            | TokenType::Minus
            | TokenType::Asterisk
            | TokenType::Slash
            | TokenType::Equal
            | TokenType::NotEqual
            | TokenType::LessThan
            | TokenType::GreaterThan => Some(Parser::parse_infix_expression),
            TokenType::LeftParen => Some(Parser::parse_call_expression),
            TokenType::LeftBracket => Some(Parser::parse_index_expression),
            _ => None,
        }
    }

    fn parse_expression(&mut self, precedence: Precedence) -> Option<Expr> {
        let prefix = match Self::prefix_rule(self.current.token_type) {
            Some(prefix) => prefix,
            None => {
                self.no_prefix_parse_error();
                return None;
            }
        };

        let mut left = prefix(self)?;

        while !self.peek_token_is(TokenType::Semicolon) && precedence < self.peek_precedence() {
            let infix = match Self::infix_rule(self.peek.token_type) {
                Some(infix) => infix,
                None => return Some(left),
            };
            self.next_token();
            left = infix(self, left)?;
        }

        Some(left)
    }

    fn no_prefix_parse_error(&mut self) {
        let token_type = self.current.token_type;
        let mut error = MonkeyError::parse_error(
            self.current.span,
            format!("no prefix parse function for {} found", token_type),
        );
        let help = match token_type {
            TokenType::RightParen => Some("Found ')' without matching '('. Check for unbalanced parentheses."),
            TokenType::RightBrace => Some("Found '}' without matching '{'. Check for unbalanced braces."),
            TokenType::RightBracket => Some("Found ']' without matching '['. Check for unbalanced brackets."),
            TokenType::Eof => Some("Reached end of input while expecting an expression."),
            TokenType::Illegal => Some("This character is not part of the Monkey language."),
            _ => None,
        };
        if let Some(help) = help {
            error = error.with_help(help);
        }
        self.push_error(error);
    }

    fn peek_precedence(&self) -> Precedence {
        Precedence::of(self.peek.token_type)
    }

    fn current_precedence(&self) -> Precedence {
        Precedence::of(self.current.token_type)
    }

    fn parse_identifier(&mut self) -> Option<Expr> {
        Some(Expr::Identifier(Identifier {
            name: self.current.literal.clone(),
            span: self.current.span,
        }))
    }

    fn parse_integer_literal(&mut self) -> Option<Expr> {
        match self.current.literal.parse::<i64>() {
            Ok(value) => Some(Expr::Integer {
                value,
                span: self.current.span,
            }),
            Err(_) => {
                let error = MonkeyError::parse_error(
                    self.current.span,
                    format!("could not parse {} as integer", self.current.literal),
                )
                .with_help(format!("Integers must fit in 64 bits (at most {}).", i64::MAX));
                self.push_error(error);
                None
            }
        }
    }

    fn parse_string_literal(&mut self) -> Option<Expr> {
        Some(Expr::String {
            value: self.current.literal.clone(),
            span: self.current.span,
        })
    }

    fn parse_boolean_literal(&mut self) -> Option<Expr> {
        Some(Expr::Boolean {
            value: self.current_token_is(TokenType::True),
            span: self.current.span,
        })
    }

    fn parse_null_literal(&mut self) -> Option<Expr> {
        Some(Expr::Null {
            span: self.current.span,
        })
    }

    fn parse_prefix_expression(&mut self) -> Option<Expr> {
        let start = self.current.span.start;
        let operator = match self.current.token_type {
            TokenType::Bang => PrefixOp::Bang,
            TokenType::Minus => PrefixOp::Minus,
            _ => unreachable!("prefix rule registered for {}", self.current.token_type),
        };

        self.next_token();
        let right = self.parse_expression(Precedence::Prefix)?;
        let end = right.span().end;

        Some(Expr::Prefix {
            operator,
            right: Box::new(right),
            span: Span::new(start, end),
        })
    }

    fn parse_infix_expression(&mut self, left: Expr) -> Option<Expr> {
        let operator = match self.current.token_type {
            TokenType::Plus => InfixOp::Plus,
            TokenType::Minus => InfixOp::Minus,
            TokenType::Asterisk => InfixOp::Multiply,
            TokenType::Slash => InfixOp::Divide,
            TokenType::LessThan => InfixOp::LessThan,
            TokenType::GreaterThan => InfixOp::GreaterThan,
            TokenType::Equal => InfixOp::Equal,
            TokenType::NotEqual => InfixOp::NotEqual,
            _ => unreachable!("infix rule registered for {}", self.current.token_type),
        };
        let precedence = self.current_precedence();

        self.next_token();
        let right = self.parse_expression(precedence)?;
        let span = left.span().to(right.span());

        Some(Expr::Infix {
            left: Box::new(left),
            operator,
            right: Box::new(right),
            span,
        })
    }

    fn parse_grouped_expression(&mut self) -> Option<Expr> {
        self.next_token();
        let expr = self.parse_expression(Precedence::Lowest)?;
        self.expect_peek(TokenType::RightParen)?;
        Some(expr)
    }

    fn parse_if_expression(&mut self) -> Option<Expr> {
        let start = self.current.span.start;

        self.expect_peek(TokenType::LeftParen)?;
        self.next_token();
        let condition = self.parse_expression(Precedence::Lowest)?;
        self.expect_peek(TokenType::RightParen)?;

        self.expect_peek(TokenType::LeftBrace)?;
        let consequence = self.parse_block_statement()?;

        let alternative = if self.peek_token_is(TokenType::Else) {
            self.next_token();
            self.expect_peek(TokenType::LeftBrace)?;
            Some(self.parse_block_statement()?)
        } else {
            None
        };

        Some(Expr::If {
            condition: Box::new(condition),
            consequence,
            alternative,
            span: Span::new(start, self.current.span.end),
        })
    }

    fn parse_block_statement(&mut self) -> Option<BlockStatement> {
        let start = self.current.span.start;
        let mut statements = Vec::new();

        self.next_token();

        while !self.current_token_is(TokenType::RightBrace) {
            if self.current_token_is(TokenType::Eof) {
                let error = MonkeyError::parse_error(
                    self.current.span,
                    format!(
                        "expected next token to be {}, got {} instead",
                        TokenType::RightBrace,
                        TokenType::Eof
                    ),
                )
                .with_help("Blocks must be closed with '}' after the opening '{'.");
                self.push_error(error);
                return None;
            }

            match self.parse_statement() {
                Some(statement) => statements.push(statement),
                None => {
                    self.synchronize();
                    // Failed on the closing brace: leave it to end the block.
                    if self.current_token_is(TokenType::RightBrace) {
                        continue;
                    }
                }
            }
            self.next_token();
        }

        Some(BlockStatement {
            statements,
            span: Span::new(start, self.current.span.end),
        })
    }

    fn parse_function_literal(&mut self) -> Option<Expr> {
        let start = self.current.span.start;

        self.expect_peek(TokenType::LeftParen)?;
        let parameters = self.parse_function_parameters()?;

        self.expect_peek(TokenType::LeftBrace)?;
        let body = self.parse_block_statement()?;

        Some(Expr::Function(Rc::new(FunctionLiteral {
            parameters,
            body,
            span: Span::new(start, self.current.span.end),
        })))
    }

    fn parse_function_parameters(&mut self) -> Option<Vec<Identifier>> {
        let mut identifiers = Vec::new();

        if self.peek_token_is(TokenType::RightParen) {
            self.next_token();
            return Some(identifiers);
        }

        self.expect_peek(TokenType::Identifier)?;
        identifiers.push(self.current_identifier());

        while self.peek_token_is(TokenType::Comma) {
            self.next_token();
            self.expect_peek(TokenType::Identifier)?;
            identifiers.push(self.current_identifier());
        }

        self.expect_peek(TokenType::RightParen)?;
        Some(identifiers)
    }

    fn current_identifier(&self) -> Identifier {
        Identifier {
            name: self.current.literal.clone(),
            span: self.current.span,
        }
    }

    fn parse_call_expression(&mut self, function: Expr) -> Option<Expr> {
        let arguments = self.parse_expression_list(TokenType::RightParen)?;
        let span = function.span().to(self.current.span);

        Some(Expr::Call {
            function: Box::new(function),
            arguments,
            span,
        })
    }

    fn parse_index_expression(&mut self, left: Expr) -> Option<Expr> {
        self.next_token();
        let index = self.parse_expression(Precedence::Lowest)?;
        self.expect_peek(TokenType::RightBracket)?;
        let span = left.span().to(self.current.span);

        Some(Expr::Index {
            left: Box::new(left),
            index: Box::new(index),
            span,
        })
    }

    fn parse_array_literal(&mut self) -> Option<Expr> {
        let start = self.current.span.start;
        let elements = self.parse_expression_list(TokenType::RightBracket)?;

        Some(Expr::Array {
            elements,
            span: Span::new(start, self.current.span.end),
        })
    }

    fn parse_map_literal(&mut self) -> Option<Expr> {
        let start = self.current.span.start;
        let mut pairs = Vec::new();

        while !self.peek_token_is(TokenType::RightBrace) {
            self.next_token();
            let key = self.parse_expression(Precedence::Lowest)?;

            self.expect_peek(TokenType::Colon)?;
            self.next_token();
            let value = self.parse_expression(Precedence::Lowest)?;

            pairs.push((key, value));

            if !self.peek_token_is(TokenType::RightBrace) {
                self.expect_peek(TokenType::Comma)?;
            }
        }

        self.expect_peek(TokenType::RightBrace)?;

        Some(Expr::Map {
            pairs,
            span: Span::new(start, self.current.span.end),
        })
    }

    /// Comma-separated expressions up to `end`; the opening delimiter is the
    /// current token.
    fn parse_expression_list(&mut self, end: TokenType) -> Option<Vec<Expr>> {
        let mut list = Vec::new();

        if self.peek_token_is(end) {
            self.next_token();
            return Some(list);
        }

        self.next_token();
        list.push(self.parse_expression(Precedence::Lowest)?);

        while self.peek_token_is(TokenType::Comma) {
            self.next_token();
            self.next_token();
            list.push(self.parse_expression(Precedence::Lowest)?);
        }

        self.expect_peek(end)?;
        Some(list)
    }
}

fn expected_token_help(expected: TokenType) -> Option<&'static str> {
    match expected {
        TokenType::Identifier => Some("A name is required here, e.g. 'let x = 5;' or 'fn(x, y) { x + y }'."),
        TokenType::Assign => Some("Let statements bind with '=': let name = value;"),
        TokenType::RightParen => Some("Every opening parenthesis '(' must have a matching closing parenthesis ')'."),
        TokenType::RightBracket => Some("Array literals and index expressions must be closed with ']'."),
        TokenType::LeftBrace => Some("Function bodies and if branches are blocks: { ... }"),
        TokenType::Colon => Some("Map entries require a colon between key and value. Example: {\"key\": \"value\"}"),
        _ => None,
    }
}
