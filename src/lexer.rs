use crate::error::{BasicError, Span};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    // Single-character tokens
    LeftParen,
    RightParen,
    Comma,
    Semicolon,
    Plus,
    Minus,
    Star,
    Slash,
    Not,

    // One or two character tokens
    Assign,
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    And,
    Or,

    // Literals
    Identifier,
    NamedLabel,
    Builtin,
    Str,
    Int,
    Float,

    // Keywords
    Print,
    Input,
    Let,
    Goto,
    Gosub,
    Return,
    If,
    Then,
    Else,
    End,
    Clear,
    Run,
    List,

    // Structure
    Eol,
    Eof,
}

impl TokenKind {
    /// True for tokens that can follow an integer inside an expression.
    /// Used to tell a line number apart from a leading operand.
    pub fn is_operator(self) -> bool {
        matches!(
            self,
            TokenKind::Plus
                | TokenKind::Minus
                | TokenKind::Star
                | TokenKind::Slash
                | TokenKind::Assign
                | TokenKind::PlusAssign
                | TokenKind::MinusAssign
                | TokenKind::StarAssign
                | TokenKind::SlashAssign
                | TokenKind::Equal
                | TokenKind::NotEqual
                | TokenKind::Less
                | TokenKind::LessEqual
                | TokenKind::Greater
                | TokenKind::GreaterEqual
                | TokenKind::And
                | TokenKind::Or
        )
    }
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub span: Span,
    pub line: usize,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: String, span: Span, line: usize) -> Self {
        Self {
            kind,
            lexeme,
            span,
            line,
        }
    }
}

/// Saved lexer position for speculative parsing.
#[derive(Debug, Clone, Copy)]
pub struct Checkpoint {
    cursor: usize,
    line: usize,
}

pub struct Lexer {
    source: String,
    start: usize,
    cursor: usize,
    line: usize,
    keywords: HashMap<&'static str, TokenKind>,
}

const BUILTINS: [&str; 4] = ["rnd", "pow", "sqrt", "usr"];

impl Lexer {
    pub fn new(source: String) -> Self {
        let mut keywords = HashMap::new();
        keywords.insert("print", TokenKind::Print);
        keywords.insert("pr", TokenKind::Print);
        keywords.insert("input", TokenKind::Input);
        keywords.insert("let", TokenKind::Let);
        keywords.insert("goto", TokenKind::Goto);
        keywords.insert("gosub", TokenKind::Gosub);
        keywords.insert("return", TokenKind::Return);
        keywords.insert("if", TokenKind::If);
        keywords.insert("then", TokenKind::Then);
        keywords.insert("else", TokenKind::Else);
        keywords.insert("end", TokenKind::End);
        keywords.insert("clear", TokenKind::Clear);
        keywords.insert("run", TokenKind::Run);
        keywords.insert("list", TokenKind::List);

        Self {
            source,
            start: 0,
            cursor: 0,
            line: 1,
            keywords,
        }
    }

    /// Rewind to the beginning of the source so it can be lexed again.
    pub fn reset(&mut self) {
        self.start = 0;
        self.cursor = 0;
        self.line = 1;
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            cursor: self.cursor,
            line: self.line,
        }
    }

    pub fn restore(&mut self, checkpoint: Checkpoint) {
        self.cursor = checkpoint.cursor;
        self.line = checkpoint.line;
    }

    /// Scan and return the next token, skipping whitespace and comments.
    pub fn next_token(&mut self) -> Result<Token, BasicError> {
        loop {
            self.start = self.cursor;

            if self.is_at_end() {
                return Ok(Token::new(
                    TokenKind::Eof,
                    String::new(),
                    Span::single(self.cursor),
                    self.line,
                ));
            }

            let c = self.advance();
            match c {
                ' ' | '\t' | '\r' => continue,
                '\n' => {
                    let token = self.make_token(TokenKind::Eol);
                    self.line += 1;
                    return Ok(token);
                }
                '(' => return Ok(self.make_token(TokenKind::LeftParen)),
                ')' => return Ok(self.make_token(TokenKind::RightParen)),
                ',' => return Ok(self.make_token(TokenKind::Comma)),
                ';' => return Ok(self.make_token(TokenKind::Semicolon)),
                '!' => return Ok(self.make_token(TokenKind::Not)),
                '+' => {
                    let kind = if self.match_char('=') {
                        TokenKind::PlusAssign
                    } else {
                        TokenKind::Plus
                    };
                    return Ok(self.make_token(kind));
                }
                '-' => {
                    let kind = if self.match_char('=') {
                        TokenKind::MinusAssign
                    } else {
                        TokenKind::Minus
                    };
                    return Ok(self.make_token(kind));
                }
                '*' => {
                    let kind = if self.match_char('=') {
                        TokenKind::StarAssign
                    } else {
                        TokenKind::Star
                    };
                    return Ok(self.make_token(kind));
                }
                '/' => {
                    let kind = if self.match_char('=') {
                        TokenKind::SlashAssign
                    } else {
                        TokenKind::Slash
                    };
                    return Ok(self.make_token(kind));
                }
                '=' => {
                    let kind = if self.match_char('=') {
                        TokenKind::Equal
                    } else {
                        TokenKind::Assign
                    };
                    return Ok(self.make_token(kind));
                }
                '<' => {
                    let kind = if self.match_char('>') {
                        TokenKind::NotEqual
                    } else if self.match_char('=') {
                        TokenKind::LessEqual
                    } else {
                        TokenKind::Less
                    };
                    return Ok(self.make_token(kind));
                }
                '>' => {
                    let kind = if self.match_char('<') {
                        TokenKind::NotEqual
                    } else if self.match_char('=') {
                        TokenKind::GreaterEqual
                    } else {
                        TokenKind::Greater
                    };
                    return Ok(self.make_token(kind));
                }
                '&' => {
                    if self.match_char('&') {
                        return Ok(self.make_token(TokenKind::And));
                    }
                    return Err(self.unexpected(c));
                }
                '|' => {
                    if self.match_char('|') {
                        return Ok(self.make_token(TokenKind::Or));
                    }
                    return Err(self.unexpected(c));
                }
                '"' => return self.string(),
                c if c.is_ascii_digit() => return self.number(),
                c if c.is_alphabetic() || c == '_' => {
                    if let Some(token) = self.word()? {
                        return Ok(token);
                    }
                    // REM comment was skipped; keep scanning
                }
                _ => return Err(self.unexpected(c)),
            }
        }
    }

    fn is_at_end(&self) -> bool {
        self.cursor >= self.source.len()
    }

    fn advance(&mut self) -> char {
        let c = self.peek();
        if c != '\0' {
            self.cursor += c.len_utf8();
        }
        c
    }

    fn peek(&self) -> char {
        self.source[self.cursor..].chars().next().unwrap_or('\0')
    }

    fn peek_at(&self, n: usize) -> char {
        self.source[self.cursor..].chars().nth(n).unwrap_or('\0')
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.peek() == expected {
            self.advance();
            true
        } else {
            false
        }
    }

    fn make_token(&self, kind: TokenKind) -> Token {
        let lexeme = self.source[self.start..self.cursor].to_string();
        Token::new(kind, lexeme, Span::new(self.start, self.cursor), self.line)
    }

    fn make_token_with(&self, kind: TokenKind, lexeme: String) -> Token {
        Token::new(kind, lexeme, Span::new(self.start, self.cursor), self.line)
    }

    fn unexpected(&self, c: char) -> BasicError {
        BasicError::lex_error(
            Span::new(self.start, self.cursor),
            format!("Unexpected character '{}' on line {}", c, self.line),
        )
    }

    fn string(&mut self) -> Result<Token, BasicError> {
        while self.peek() != '"' && self.peek() != '\n' && !self.is_at_end() {
            self.advance();
        }

        if !self.match_char('"') {
            return Err(BasicError::lex_error(
                Span::new(self.start, self.cursor),
                format!("Unterminated string on line {}", self.line),
            ));
        }

        // Lexeme is the content between the quotes; no escapes
        let content = self.source[self.start + 1..self.cursor - 1].to_string();
        Ok(self.make_token_with(TokenKind::Str, content))
    }

    fn number(&mut self) -> Result<Token, BasicError> {
        // Hex literal: 0x / 0X prefix
        if &self.source[self.start..self.cursor] == "0" && matches!(self.peek(), 'x' | 'X') {
            self.advance();
            if !self.peek().is_ascii_hexdigit() {
                return Err(BasicError::lex_error(
                    Span::new(self.start, self.cursor),
                    format!("Invalid hex literal on line {}", self.line),
                ));
            }
            while self.peek().is_ascii_hexdigit() {
                self.advance();
            }
            return Ok(self.make_token(TokenKind::Int));
        }

        while self.peek().is_ascii_digit() {
            self.advance();
        }

        // Fraction makes it a float; an exponent is only recognized after one
        if self.peek() == '.' {
            self.advance();
            while self.peek().is_ascii_digit() {
                self.advance();
            }

            let e = self.peek();
            if (e == 'e' || e == 'E')
                && (self.peek_at(1).is_ascii_digit()
                    || (matches!(self.peek_at(1), '+' | '-') && self.peek_at(2).is_ascii_digit()))
            {
                self.advance();
                if matches!(self.peek(), '+' | '-') {
                    self.advance();
                }
                while self.peek().is_ascii_digit() {
                    self.advance();
                }
            }

            return Ok(self.make_token(TokenKind::Float));
        }

        Ok(self.make_token(TokenKind::Int))
    }

    /// Scan an identifier-shaped word and classify it: keyword, built-in
    /// function name, named label (trailing ':'), or identifier. Returns
    /// None when the word opened a REM comment, which runs to end of line.
    fn word(&mut self) -> Result<Option<Token>, BasicError> {
        while self.peek().is_alphanumeric() || self.peek() == '_' {
            self.advance();
        }

        let text = &self.source[self.start..self.cursor];
        let lowered = text.to_ascii_lowercase();

        if lowered == "rem" {
            while self.peek() != '\n' && !self.is_at_end() {
                self.advance();
            }
            return Ok(None);
        }

        if let Some(&kind) = self.keywords.get(lowered.as_str()) {
            return Ok(Some(self.make_token(kind)));
        }

        if BUILTINS.contains(&lowered.as_str()) {
            return Ok(Some(self.make_token_with(TokenKind::Builtin, lowered)));
        }

        if self.peek() == ':' {
            self.advance();
            let name = self.source[self.start..self.cursor - 1].to_string();
            return Ok(Some(self.make_token_with(TokenKind::NamedLabel, name)));
        }

        Ok(Some(self.make_token(TokenKind::Identifier)))
    }
}
