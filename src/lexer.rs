use crate::error::Span;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenType {
    Illegal,
    Eof,

    // Literals
    Identifier,
    Int,
    String,

    // Operators
    Assign,
    Bang,
    Plus,
    Minus,
    Asterisk,
    Slash,
    LessThan,
    GreaterThan,
    Equal,
    NotEqual,

    // Delimiters
    Comma,
    Semicolon,
    Colon,
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    LeftBrace,
    RightBrace,

    // Keywords
    Function,
    Let,
    True,
    False,
    Null,
    If,
    Else,
    Return,
}

impl TokenType {
    pub fn lookup_identifier(ident: &str) -> TokenType {
        match ident {
            "fn" => TokenType::Function,
            "let" => TokenType::Let,
            "true" => TokenType::True,
            "false" => TokenType::False,
            "null" => TokenType::Null,
            "if" => TokenType::If,
            "else" => TokenType::Else,
            "return" => TokenType::Return,
            _ => TokenType::Identifier,
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            TokenType::Illegal => "ILLEGAL",
            TokenType::Eof => "EOF",
            TokenType::Identifier => "IDENTIFIER",
            TokenType::Int => "INT",
            TokenType::String => "STRING",
            TokenType::Assign => "=",
            TokenType::Bang => "!",
            TokenType::Plus => "+",
            TokenType::Minus => "-",
            TokenType::Asterisk => "*",
            TokenType::Slash => "/",
            TokenType::LessThan => "<",
            TokenType::GreaterThan => ">",
            TokenType::Equal => "==",
            TokenType::NotEqual => "!=",
            TokenType::Comma => ",",
            TokenType::Semicolon => ";",
            TokenType::Colon => ":",
            TokenType::LeftParen => "(",
            TokenType::RightParen => ")",
            TokenType::LeftBracket => "[",
            TokenType::RightBracket => "]",
            TokenType::LeftBrace => "{",
            TokenType::RightBrace => "}",
            TokenType::Function => "FUNCTION",
            TokenType::Let => "LET",
            TokenType::True => "TRUE",
            TokenType::False => "FALSE",
            TokenType::Null => "NULL",
            TokenType::If => "IF",
            TokenType::Else => "ELSE",
            TokenType::Return => "RETURN",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub token_type: TokenType,
    pub literal: String,
    pub span: Span,
}

impl Token {
    pub fn new(token_type: TokenType, literal: impl Into<String>, span: Span) -> Self {
        Self {
            token_type,
            literal: literal.into(),
            span,
        }
    }
}

/// On-demand scanner: the parser pulls one token at a time with
/// [`Lexer::next_token`]. Once the input is exhausted every further call
/// yields another EOF token.
pub struct Lexer<'a> {
    source: &'a str,
    position: usize,
    read_position: usize,
    ch: Option<char>,
    finished: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        let mut lexer = Self {
            source,
            position: 0,
            read_position: 0,
            ch: None,
            finished: false,
        };
        lexer.read_char();
        lexer
    }

    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        let start = self.position;
        let c = match self.ch {
            Some(c) => c,
            None => return Token::new(TokenType::Eof, "", Span::new(start, start)),
        };

        let token_type = match c {
            '=' => {
                if self.peek_char() == Some('=') {
                    self.read_char();
                    TokenType::Equal
                } else {
                    TokenType::Assign
                }
            }
            '!' => {
                if self.peek_char() == Some('=') {
                    self.read_char();
                    TokenType::NotEqual
                } else {
                    TokenType::Bang
                }
            }
            '+' => TokenType::Plus,
            '-' => TokenType::Minus,
            '*' => TokenType::Asterisk,
            '/' => TokenType::Slash,
            '<' => TokenType::LessThan,
            '>' => TokenType::GreaterThan,
            ',' => TokenType::Comma,
            ';' => TokenType::Semicolon,
            ':' => TokenType::Colon,
            '(' => TokenType::LeftParen,
            ')' => TokenType::RightParen,
            '[' => TokenType::LeftBracket,
            ']' => TokenType::RightBracket,
            '{' => TokenType::LeftBrace,
            '}' => TokenType::RightBrace,
            '"' => return self.string(),
            c if is_letter(c) => {
                let literal = self.read_while(is_letter);
                let token_type = TokenType::lookup_identifier(literal);
                return Token::new(token_type, literal, Span::new(start, self.position));
            }
            c if c.is_ascii_digit() => {
                let literal = self.read_while(|c| c.is_ascii_digit());
                return Token::new(TokenType::Int, literal, Span::new(start, self.position));
            }
            _ => TokenType::Illegal,
        };

        self.read_char();
        Token::new(
            token_type,
            &self.source[start..self.position],
            Span::new(start, self.position),
        )
    }

    fn string(&mut self) -> Token {
        let start = self.position;
        // Skip the opening quote
        self.read_char();
        let content_start = self.position;

        while let Some(c) = self.ch {
            if c == '"' {
                break;
            }
            self.read_char();
        }

        let content = &self.source[content_start..self.position];

        // Consume the closing quote if there is one
        if self.ch.is_some() {
            self.read_char();
        }

        Token::new(TokenType::String, content, Span::new(start, self.position))
    }

    fn read_while(&mut self, predicate: impl Fn(char) -> bool) -> &'a str {
        let start = self.position;
        while let Some(c) = self.ch {
            if !predicate(c) {
                break;
            }
            self.read_char();
        }
        &self.source[start..self.position]
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.ch, Some(' ' | '\t' | '\n' | '\r')) {
            self.read_char();
        }
    }

    fn peek_char(&self) -> Option<char> {
        self.source[self.read_position..].chars().next()
    }

    fn read_char(&mut self) {
        self.position = self.read_position;
        self.ch = self.peek_char();
        if let Some(c) = self.ch {
            self.read_position += c.len_utf8();
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if self.finished {
            return None;
        }
        let token = self.next_token();
        if token.token_type == TokenType::Eof {
            self.finished = true;
            None
        } else {
            Some(token)
        }
    }
}

/// Identifiers are letters and underscores only; digits end an identifier.
fn is_letter(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

/// Scans the whole input, returning every token up to and including EOF.
pub fn tokenize(source: &str) -> Vec<Token> {
    let mut lexer = Lexer::new(source);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token();
        let done = token.token_type == TokenType::Eof;
        tokens.push(token);
        if done {
            return tokens;
        }
    }
}
