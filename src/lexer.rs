use std::fmt;

#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    Identifier(String),
    Keyword(Keyword),

    NumericLiteral(f64),
    StringLiteral(String),
    BooleanLiteral(bool),
    NullLiteral,
    UndefinedLiteral,

    // Punctuators
    LeftBrace,                // {
    RightBrace,               // }
    LeftParen,                // (
    RightParen,               // )
    LeftBracket,              // [
    RightBracket,             // ]
    Dot,                      // .
    Semicolon,                // ;
    Comma,                    // ,
    Question,                 // ?
    Colon,                    // :
    LessThan,                 // <
    LessThanEqual,            // <=
    GreaterThan,              // >
    GreaterThanEqual,         // >=
    Equal,                    // ==
    NotEqual,                 // !=
    Plus,                     // +
    Minus,                    // -
    Star,                     // *
    Slash,                    // /
    Percent,                  // %
    Increment,                // ++
    Decrement,                // --
    LeftShift,                // <<
    RightShift,               // >>
    UnsignedRightShift,       // >>>
    Ampersand,                // &
    Pipe,                     // |
    Caret,                    // ^
    Bang,                     // !
    Tilde,                    // ~
    LogicalAnd,               // &&
    LogicalOr,                // ||
    Assign,                   // =
    PlusAssign,               // +=
    MinusAssign,              // -=
    StarAssign,               // *=
    SlashAssign,              // /=
    PercentAssign,            // %=
    LeftShiftAssign,          // <<=
    RightShiftAssign,         // >>=
    UnsignedRightShiftAssign, // >>>=
    AmpersandAssign,          // &=
    PipeAssign,               // |=
    CaretAssign,              // ^=

    Eof,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Keyword {
    Break,
    Continue,
    Delete,
    Else,
    For,
    Function,
    If,
    New,
    Return,
    TypeOf,
    Var,
    Void,
    While,
    With,
}

fn keyword_or_identifier(word: String) -> Token {
    match word.as_str() {
        "break" => Token::Keyword(Keyword::Break),
        "continue" => Token::Keyword(Keyword::Continue),
        "delete" => Token::Keyword(Keyword::Delete),
        "else" => Token::Keyword(Keyword::Else),
        "for" => Token::Keyword(Keyword::For),
        "function" => Token::Keyword(Keyword::Function),
        "if" => Token::Keyword(Keyword::If),
        "new" => Token::Keyword(Keyword::New),
        "return" => Token::Keyword(Keyword::Return),
        "typeof" => Token::Keyword(Keyword::TypeOf),
        "var" => Token::Keyword(Keyword::Var),
        "void" => Token::Keyword(Keyword::Void),
        "while" => Token::Keyword(Keyword::While),
        "with" => Token::Keyword(Keyword::With),
        "true" => Token::BooleanLiteral(true),
        "false" => Token::BooleanLiteral(false),
        "null" => Token::NullLiteral,
        "undefined" => Token::UndefinedLiteral,
        _ => Token::Identifier(word),
    }
}

#[derive(Debug)]
pub struct LexError {
    pub message: String,
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}:{}", self.message, self.line, self.column)
    }
}

pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: u32,
    column: u32,
    token_line: u32,
    token_column: u32,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
            token_line: 1,
            token_column: 1,
        }
    }

    /// Line of the most recently returned token's first character.
    pub fn token_line(&self) -> u32 {
        self.token_line
    }

    /// Column of the most recently returned token's first character.
    pub fn token_column(&self) -> u32 {
        self.token_column
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn error(&self, message: impl Into<String>) -> LexError {
        LexError {
            message: message.into(),
            line: self.line,
            column: self.column,
        }
    }

    fn skip_whitespace_and_comments(&mut self) -> Result<(), LexError> {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.advance();
                }
                Some('/') if self.peek_at(1) == Some('/') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                Some('/') if self.peek_at(1) == Some('*') => {
                    self.advance();
                    self.advance();
                    loop {
                        match self.advance() {
                            Some('*') if self.peek() == Some('/') => {
                                self.advance();
                                break;
                            }
                            Some(_) => {}
                            None => return Err(self.error("Unterminated comment")),
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    pub fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_whitespace_and_comments()?;
        self.token_line = self.line;
        self.token_column = self.column;

        let Some(c) = self.peek() else {
            return Ok(Token::Eof);
        };

        if c.is_ascii_alphabetic() || c == '_' || c == '$' {
            return Ok(self.scan_identifier());
        }
        if c.is_ascii_digit() || (c == '.' && self.peek_at(1).is_some_and(|d| d.is_ascii_digit()))
        {
            return self.scan_number();
        }
        if c == '"' || c == '\'' {
            return self.scan_string();
        }
        self.scan_punctuator()
    }

    fn scan_identifier(&mut self) -> Token {
        let mut word = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' || c == '$' {
                word.push(c);
                self.advance();
            } else {
                break;
            }
        }
        keyword_or_identifier(word)
    }

    fn scan_number(&mut self) -> Result<Token, LexError> {
        if self.peek() == Some('0')
            && matches!(self.peek_at(1), Some('x') | Some('X'))
            && self.peek_at(2).is_some_and(|c| c.is_ascii_hexdigit())
        {
            self.advance();
            self.advance();
            let mut value = 0.0f64;
            while let Some(c) = self.peek() {
                let Some(digit) = c.to_digit(16) else { break };
                value = value * 16.0 + f64::from(digit);
                self.advance();
            }
            return Ok(Token::NumericLiteral(value));
        }

        let mut text = String::new();
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            text.push(self.advance().unwrap());
        }
        if self.peek() == Some('.') {
            text.push(self.advance().unwrap());
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                text.push(self.advance().unwrap());
            }
        }
        if matches!(self.peek(), Some('e') | Some('E')) {
            let exp_digit_at = match self.peek_at(1) {
                Some('+') | Some('-') => 2,
                _ => 1,
            };
            if self.peek_at(exp_digit_at).is_some_and(|c| c.is_ascii_digit()) {
                text.push(self.advance().unwrap());
                if matches!(self.peek(), Some('+') | Some('-')) {
                    text.push(self.advance().unwrap());
                }
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    text.push(self.advance().unwrap());
                }
            }
        }
        text.parse::<f64>()
            .map(Token::NumericLiteral)
            .map_err(|_| self.error(format!("Invalid numeric literal: {text}")))
    }

    fn scan_string(&mut self) -> Result<Token, LexError> {
        let quote = self.advance().unwrap();
        let mut value = String::new();
        loop {
            match self.advance() {
                None => return Err(self.error("Unterminated string literal")),
                Some('\n') => return Err(self.error("Line break in string literal")),
                Some(c) if c == quote => return Ok(Token::StringLiteral(value)),
                Some('\\') => {
                    let Some(esc) = self.advance() else {
                        return Err(self.error("Unterminated string literal"));
                    };
                    match esc {
                        'b' => value.push('\u{0008}'),
                        't' => value.push('\t'),
                        'n' => value.push('\n'),
                        'v' => value.push('\u{000B}'),
                        'f' => value.push('\u{000C}'),
                        'r' => value.push('\r'),
                        'x' => value.push(self.scan_hex_escape(2)?),
                        'u' => value.push(self.scan_hex_escape(4)?),
                        other => value.push(other),
                    }
                }
                Some(c) => value.push(c),
            }
        }
    }

    fn scan_hex_escape(&mut self, digits: u32) -> Result<char, LexError> {
        let mut code = 0u32;
        for _ in 0..digits {
            let Some(d) = self.advance().and_then(|c| c.to_digit(16)) else {
                return Err(self.error("Invalid escape sequence"));
            };
            code = code * 16 + d;
        }
        // Lone surrogates cannot be represented in a Rust string.
        char::from_u32(code).ok_or_else(|| self.error("Invalid escape sequence"))
    }

    fn scan_punctuator(&mut self) -> Result<Token, LexError> {
        let c = self.advance().unwrap();
        let token = match c {
            '{' => Token::LeftBrace,
            '}' => Token::RightBrace,
            '(' => Token::LeftParen,
            ')' => Token::RightParen,
            '[' => Token::LeftBracket,
            ']' => Token::RightBracket,
            '.' => Token::Dot,
            ';' => Token::Semicolon,
            ',' => Token::Comma,
            '?' => Token::Question,
            ':' => Token::Colon,
            '~' => Token::Tilde,
            '<' => {
                if self.eat('<') {
                    if self.eat('=') {
                        Token::LeftShiftAssign
                    } else {
                        Token::LeftShift
                    }
                } else if self.eat('=') {
                    Token::LessThanEqual
                } else {
                    Token::LessThan
                }
            }
            '>' => {
                if self.eat('>') {
                    if self.eat('>') {
                        if self.eat('=') {
                            Token::UnsignedRightShiftAssign
                        } else {
                            Token::UnsignedRightShift
                        }
                    } else if self.eat('=') {
                        Token::RightShiftAssign
                    } else {
                        Token::RightShift
                    }
                } else if self.eat('=') {
                    Token::GreaterThanEqual
                } else {
                    Token::GreaterThan
                }
            }
            '=' => {
                if self.eat('=') {
                    Token::Equal
                } else {
                    Token::Assign
                }
            }
            '!' => {
                if self.eat('=') {
                    Token::NotEqual
                } else {
                    Token::Bang
                }
            }
            '+' => {
                if self.eat('+') {
                    Token::Increment
                } else if self.eat('=') {
                    Token::PlusAssign
                } else {
                    Token::Plus
                }
            }
            '-' => {
                if self.eat('-') {
                    Token::Decrement
                } else if self.eat('=') {
                    Token::MinusAssign
                } else {
                    Token::Minus
                }
            }
            '*' => {
                if self.eat('=') {
                    Token::StarAssign
                } else {
                    Token::Star
                }
            }
            '/' => {
                if self.eat('=') {
                    Token::SlashAssign
                } else {
                    Token::Slash
                }
            }
            '%' => {
                if self.eat('=') {
                    Token::PercentAssign
                } else {
                    Token::Percent
                }
            }
            '&' => {
                if self.eat('&') {
                    Token::LogicalAnd
                } else if self.eat('=') {
                    Token::AmpersandAssign
                } else {
                    Token::Ampersand
                }
            }
            '|' => {
                if self.eat('|') {
                    Token::LogicalOr
                } else if self.eat('=') {
                    Token::PipeAssign
                } else {
                    Token::Pipe
                }
            }
            '^' => {
                if self.eat('=') {
                    Token::CaretAssign
                } else {
                    Token::Caret
                }
            }
            other => return Err(self.error(format!("Unexpected character: {other:?}"))),
        };
        Ok(token)
    }
}
