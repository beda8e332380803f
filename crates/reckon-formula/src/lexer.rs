//! Expression lexer
//!
//! A single-pass, hand-written scanner. Number literals keep their original
//! textual form so decimal precision is preserved end-to-end; only explicitly
//! float-typed literals (`f` suffix or scientific notation) become binary
//! floats.

use reckon_core::{EngineError, EngineResult};

/// Source position of a token, for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub offset: usize,
    pub line: u32,
    pub column: u32,
}

/// Token kinds
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    /// Decimal number, carried as its original text
    Decimal(String),
    /// Binary float, only when explicitly requested
    Float(f64),
    String(String),
    Bool(bool),
    Null,

    // Names
    Identifier(String),
    /// `$name`
    Variable(String),
    /// `@name`
    ContextVariable(String),

    // Delimiters
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    LeftBrace,
    RightBrace,
    Comma,
    Dot,
    Question,
    Colon,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
    Not,

    Eof,
}

impl TokenKind {
    /// Short human-readable form for error messages
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Decimal(text) => format!("number '{}'", text),
            TokenKind::Float(value) => format!("number '{}'", value),
            TokenKind::String(_) => "string literal".to_string(),
            TokenKind::Bool(b) => b.to_string(),
            TokenKind::Null => "null".to_string(),
            TokenKind::Identifier(name) => format!("identifier '{}'", name),
            TokenKind::Variable(name) => format!("variable '${}'", name),
            TokenKind::ContextVariable(name) => format!("context variable '@{}'", name),
            TokenKind::LeftParen => "'('".to_string(),
            TokenKind::RightParen => "')'".to_string(),
            TokenKind::LeftBracket => "'['".to_string(),
            TokenKind::RightBracket => "']'".to_string(),
            TokenKind::LeftBrace => "'{'".to_string(),
            TokenKind::RightBrace => "'}'".to_string(),
            TokenKind::Comma => "','".to_string(),
            TokenKind::Dot => "'.'".to_string(),
            TokenKind::Question => "'?'".to_string(),
            TokenKind::Colon => "':'".to_string(),
            TokenKind::Plus => "'+'".to_string(),
            TokenKind::Minus => "'-'".to_string(),
            TokenKind::Star => "'*'".to_string(),
            TokenKind::Slash => "'/'".to_string(),
            TokenKind::Percent => "'%'".to_string(),
            TokenKind::Caret => "'^'".to_string(),
            TokenKind::Eq => "'=='".to_string(),
            TokenKind::NotEq => "'!='".to_string(),
            TokenKind::Lt => "'<'".to_string(),
            TokenKind::LtEq => "'<='".to_string(),
            TokenKind::Gt => "'>'".to_string(),
            TokenKind::GtEq => "'>='".to_string(),
            TokenKind::And => "'&&'".to_string(),
            TokenKind::Or => "'||'".to_string(),
            TokenKind::Not => "'!'".to_string(),
            TokenKind::Eof => "end of expression".to_string(),
        }
    }
}

/// A token with its source position
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

/// The expression lexer
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    line: u32,
    column: u32,
    variable_prefix: char,
    context_prefix: char,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self::with_prefixes(input, '$', '@')
    }

    /// Lexer with configured variable/context prefixes
    pub fn with_prefixes(input: &'a str, variable_prefix: char, context_prefix: char) -> Self {
        Self {
            input,
            pos: 0,
            line: 1,
            column: 1,
            variable_prefix,
            context_prefix,
        }
    }

    /// Scan the whole input into tokens, ending with an EOF token
    pub fn tokenize(mut self) -> EngineResult<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let at_end = token.kind == TokenKind::Eof;
            tokens.push(token);
            if at_end {
                return Ok(tokens);
            }
        }
    }

    // === Scanning ===

    fn next_token(&mut self) -> EngineResult<Token> {
        self.skip_whitespace();
        let span = self.span();

        let c = match self.peek_char() {
            Some(c) => c,
            None => return Ok(Token { kind: TokenKind::Eof, span }),
        };

        // Single-character delimiters and operators
        let single = match c {
            '(' => Some(TokenKind::LeftParen),
            ')' => Some(TokenKind::RightParen),
            '[' => Some(TokenKind::LeftBracket),
            ']' => Some(TokenKind::RightBracket),
            '{' => Some(TokenKind::LeftBrace),
            '}' => Some(TokenKind::RightBrace),
            ',' => Some(TokenKind::Comma),
            '.' => Some(TokenKind::Dot),
            '?' => Some(TokenKind::Question),
            ':' => Some(TokenKind::Colon),
            '+' => Some(TokenKind::Plus),
            '-' => Some(TokenKind::Minus),
            '*' => Some(TokenKind::Star),
            '/' => Some(TokenKind::Slash),
            '%' => Some(TokenKind::Percent),
            '^' => Some(TokenKind::Caret),
            _ => None,
        };
        if let Some(kind) = single {
            self.advance();
            return Ok(Token { kind, span });
        }

        // Two-character operators, longest match first
        match c {
            '=' => {
                self.advance();
                if self.peek_char() == Some('=') {
                    self.advance();
                    return Ok(Token { kind: TokenKind::Eq, span });
                }
                return Err(self.syntax_error("unexpected '='; did you mean '=='?", span));
            }
            '!' => {
                self.advance();
                if self.peek_char() == Some('=') {
                    self.advance();
                    return Ok(Token { kind: TokenKind::NotEq, span });
                }
                return Ok(Token { kind: TokenKind::Not, span });
            }
            '<' => {
                self.advance();
                if self.peek_char() == Some('=') {
                    self.advance();
                    return Ok(Token { kind: TokenKind::LtEq, span });
                }
                return Ok(Token { kind: TokenKind::Lt, span });
            }
            '>' => {
                self.advance();
                if self.peek_char() == Some('=') {
                    self.advance();
                    return Ok(Token { kind: TokenKind::GtEq, span });
                }
                return Ok(Token { kind: TokenKind::Gt, span });
            }
            '&' => {
                self.advance();
                if self.peek_char() == Some('&') {
                    self.advance();
                    return Ok(Token { kind: TokenKind::And, span });
                }
                return Err(self.syntax_error("unexpected '&'; did you mean '&&'?", span));
            }
            '|' => {
                self.advance();
                if self.peek_char() == Some('|') {
                    self.advance();
                    return Ok(Token { kind: TokenKind::Or, span });
                }
                return Err(self.syntax_error("unexpected '|'; did you mean '||'?", span));
            }
            _ => {}
        }

        if c == self.variable_prefix {
            return self.scan_prefixed(span, false);
        }
        if c == self.context_prefix {
            return self.scan_prefixed(span, true);
        }

        if c == '"' || c == '\'' {
            return self.scan_string(c, span);
        }

        if c.is_ascii_digit() {
            return self.scan_number(span);
        }

        if c.is_ascii_alphabetic() || c == '_' {
            return Ok(self.scan_identifier(span));
        }

        Err(self.syntax_error(&format!("unexpected character '{}'", c), span))
    }

    fn scan_prefixed(&mut self, span: Span, context: bool) -> EngineResult<Token> {
        let prefix = if context {
            self.context_prefix
        } else {
            self.variable_prefix
        };
        self.advance(); // skip prefix
        let name = self.scan_identifier_text();
        if name.is_empty() {
            return Err(self.syntax_error(&format!("expected a name after '{}'", prefix), span));
        }
        let kind = if context {
            TokenKind::ContextVariable(name)
        } else {
            TokenKind::Variable(name)
        };
        Ok(Token { kind, span })
    }

    fn scan_string(&mut self, quote: char, span: Span) -> EngineResult<Token> {
        self.advance(); // skip opening quote

        let mut text = String::new();
        loop {
            match self.peek_char() {
                None => {
                    return Err(EngineError::UnterminatedString {
                        offset: span.offset,
                        line: span.line,
                        column: span.column,
                    })
                }
                Some(c) if c == quote => {
                    self.advance();
                    return Ok(Token {
                        kind: TokenKind::String(text),
                        span,
                    });
                }
                Some('\\') => {
                    self.advance();
                    match self.peek_char() {
                        None => {
                            return Err(EngineError::UnterminatedString {
                                offset: span.offset,
                                line: span.line,
                                column: span.column,
                            })
                        }
                        Some(escaped) => {
                            let resolved = match escaped {
                                'n' => '\n',
                                't' => '\t',
                                'r' => '\r',
                                // \\, \", \' and anything else pass through
                                other => other,
                            };
                            text.push(resolved);
                            self.advance();
                        }
                    }
                }
                Some(c) => {
                    text.push(c);
                    self.advance();
                }
            }
        }
    }

    fn scan_number(&mut self, span: Span) -> EngineResult<Token> {
        let start = self.pos;

        while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
            self.advance();
        }

        // Fractional part only when '.' is followed by a digit, so member
        // access on a literal still lexes.
        if self.peek_char() == Some('.')
            && self.peek_char_at(1).map_or(false, |c| c.is_ascii_digit())
        {
            self.advance();
            while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        // Exponent: e/E, optional sign, at least one digit
        let mut scientific = false;
        if let Some('e') | Some('E') = self.peek_char() {
            let mut lookahead = 1;
            if matches!(self.peek_char_at(1), Some('+') | Some('-')) {
                lookahead = 2;
            }
            if self.peek_char_at(lookahead).map_or(false, |c| c.is_ascii_digit()) {
                scientific = true;
                for _ in 0..=lookahead {
                    self.advance();
                }
                while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
                    self.advance();
                }
            }
        }

        let text = self.input[start..self.pos].to_string();

        // Type suffix
        let kind = match self.peek_char() {
            Some('f') | Some('F') => {
                self.advance();
                TokenKind::Float(self.parse_float(&text, span.offset)?)
            }
            Some('d') | Some('D') => {
                self.advance();
                TokenKind::Decimal(text)
            }
            _ if scientific => TokenKind::Float(self.parse_float(&text, span.offset)?),
            _ => TokenKind::Decimal(text),
        };

        Ok(Token { kind, span })
    }

    fn parse_float(&self, text: &str, offset: usize) -> EngineResult<f64> {
        match text.parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(value),
            _ => Err(EngineError::InvalidNumber {
                text: text.to_string(),
                offset,
            }),
        }
    }

    fn scan_identifier(&mut self, span: Span) -> Token {
        let name = self.scan_identifier_text();
        let kind = match name.as_str() {
            "true" => TokenKind::Bool(true),
            "false" => TokenKind::Bool(false),
            "null" => TokenKind::Null,
            _ => match name.to_ascii_uppercase().as_str() {
                "AND" => TokenKind::And,
                "OR" => TokenKind::Or,
                "NOT" => TokenKind::Not,
                _ => TokenKind::Identifier(name),
            },
        };
        Token { kind, span }
    }

    fn scan_identifier_text(&mut self) -> String {
        let start = self.pos;
        if self
            .peek_char()
            .map_or(false, |c| c.is_ascii_alphabetic() || c == '_')
        {
            self.advance();
            while self
                .peek_char()
                .map_or(false, |c| c.is_ascii_alphanumeric() || c == '_')
            {
                self.advance();
            }
        }
        self.input[start..self.pos].to_string()
    }

    // === Helpers ===

    fn span(&self) -> Span {
        Span {
            offset: self.pos,
            line: self.line,
            column: self.column,
        }
    }

    fn syntax_error(&self, message: &str, span: Span) -> EngineError {
        EngineError::Syntax {
            message: message.to_string(),
            offset: span.offset,
            line: span.line,
            column: span.column,
        }
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_char_at(&self, offset: usize) -> Option<char> {
        self.input[self.pos..].chars().nth(offset)
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek_char() {
            self.pos += c.len_utf8();
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek_char(), Some(' ') | Some('\t') | Some('\r') | Some('\n')) {
            self.advance();
        }
    }
}
