//! Expression parser
//!
//! A Pratt parser over the token stream. Precedence, low to high:
//! ternary `?:`, `||`, `&&`, equality, comparison, additive, multiplicative,
//! `^` (right-associative), unary, then member/index access.

use crate::ast::{BinaryOp, Expr, UnaryOp};
use crate::lexer::{Lexer, Token, TokenKind};
use reckon_core::{decimal, EngineError, EngineResult};

const PREC_TERNARY: u8 = 2;
const PREC_OR: u8 = 3;
const PREC_AND: u8 = 4;
const PREC_EQUALITY: u8 = 5;
const PREC_COMPARISON: u8 = 6;
const PREC_ADDITIVE: u8 = 7;
const PREC_MULTIPLICATIVE: u8 = 8;
const PREC_POWER: u8 = 9;
const PREC_UNARY: u8 = 10;
const PREC_MEMBER: u8 = 12;

/// Parse an expression string with the default `$`/`@` prefixes
///
/// # Example
/// ```rust
/// use reckon_formula::parse_expression;
///
/// let ast = parse_expression("$price * (1 + $taxRate)").unwrap();
/// let ast = parse_expression("LOOKUP($table, {region: \"EU\"}, \"rate\")").unwrap();
/// ```
pub fn parse_expression(source: &str) -> EngineResult<Expr> {
    let tokens = Lexer::new(source).tokenize()?;
    Parser::new(tokens).parse()
}

/// The expression parser
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    /// A parser over an already-lexed token stream (must end with EOF)
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.is_empty() {
            tokens.push(Token {
                kind: TokenKind::Eof,
                span: crate::lexer::Span { offset: 0, line: 1, column: 1 },
            });
        }
        Self { tokens, pos: 0 }
    }

    /// Parse a complete expression; surplus tokens are an error
    pub fn parse(mut self) -> EngineResult<Expr> {
        let expr = self.parse_expr(0)?;
        if self.peek().kind != TokenKind::Eof {
            return Err(self.unexpected(&["end of expression"]));
        }
        Ok(expr)
    }

    fn parse_expr(&mut self, min_bp: u8) -> EngineResult<Expr> {
        let mut lhs = self.parse_prefix()?;
        loop {
            let bp = match &self.peek().kind {
                TokenKind::Question => PREC_TERNARY,
                TokenKind::Or => PREC_OR,
                TokenKind::And => PREC_AND,
                TokenKind::Eq | TokenKind::NotEq => PREC_EQUALITY,
                TokenKind::Lt | TokenKind::LtEq | TokenKind::Gt | TokenKind::GtEq => {
                    PREC_COMPARISON
                }
                TokenKind::Plus | TokenKind::Minus => PREC_ADDITIVE,
                TokenKind::Star | TokenKind::Slash | TokenKind::Percent => PREC_MULTIPLICATIVE,
                TokenKind::Caret => PREC_POWER,
                TokenKind::Dot | TokenKind::LeftBracket => PREC_MEMBER,
                _ => break,
            };
            if bp <= min_bp {
                break;
            }
            lhs = self.parse_infix(lhs, bp)?;
        }
        Ok(lhs)
    }

    fn parse_infix(&mut self, lhs: Expr, bp: u8) -> EngineResult<Expr> {
        let token = self.advance();
        match token.kind {
            TokenKind::Question => {
                let consequent = self.parse_expr(0)?;
                self.expect(TokenKind::Colon, "':'")?;
                // alternate binds one below the ternary, so chains nest right
                let alternate = self.parse_expr(PREC_TERNARY - 1)?;
                Ok(Expr::Conditional {
                    condition: Box::new(lhs),
                    consequent: Box::new(consequent),
                    alternate: Box::new(alternate),
                })
            }

            TokenKind::Dot => {
                let property = match self.peek().kind.clone() {
                    TokenKind::Identifier(name)
                    | TokenKind::Variable(name)
                    | TokenKind::ContextVariable(name) => {
                        self.advance();
                        name
                    }
                    _ => return Err(self.unexpected(&["property name"])),
                };
                Ok(Expr::Member {
                    object: Box::new(lhs),
                    property,
                })
            }

            TokenKind::LeftBracket => {
                let index = self.parse_expr(0)?;
                self.expect(TokenKind::RightBracket, "']'")?;
                Ok(Expr::Index {
                    object: Box::new(lhs),
                    index: Box::new(index),
                })
            }

            kind => {
                let op = match kind {
                    TokenKind::Or => BinaryOp::Or,
                    TokenKind::And => BinaryOp::And,
                    TokenKind::Eq => BinaryOp::Eq,
                    TokenKind::NotEq => BinaryOp::NotEq,
                    TokenKind::Lt => BinaryOp::Lt,
                    TokenKind::LtEq => BinaryOp::LtEq,
                    TokenKind::Gt => BinaryOp::Gt,
                    TokenKind::GtEq => BinaryOp::GtEq,
                    TokenKind::Plus => BinaryOp::Add,
                    TokenKind::Minus => BinaryOp::Subtract,
                    TokenKind::Star => BinaryOp::Multiply,
                    TokenKind::Slash => BinaryOp::Divide,
                    TokenKind::Percent => BinaryOp::Modulo,
                    TokenKind::Caret => BinaryOp::Power,
                    _ => unreachable!("parse_expr only dispatches infix tokens"),
                };
                // `^` is right-associative; everything else is left
                let rhs_bp = if op == BinaryOp::Power { bp - 1 } else { bp };
                let rhs = self.parse_expr(rhs_bp)?;
                Ok(Expr::Binary {
                    op,
                    left: Box::new(lhs),
                    right: Box::new(rhs),
                })
            }
        }
    }

    fn parse_prefix(&mut self) -> EngineResult<Expr> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Decimal(text) => {
                // Validate now so evaluation never sees a bad literal
                if decimal::parse(&text).is_err() {
                    return Err(EngineError::InvalidNumber {
                        text,
                        offset: token.span.offset,
                    });
                }
                self.advance();
                Ok(Expr::DecimalLit(text))
            }
            TokenKind::Float(value) => {
                self.advance();
                Ok(Expr::FloatLit(value))
            }
            TokenKind::String(value) => {
                self.advance();
                Ok(Expr::StringLit(value))
            }
            TokenKind::Bool(value) => {
                self.advance();
                Ok(Expr::BoolLit(value))
            }
            TokenKind::Null => {
                self.advance();
                Ok(Expr::NullLit)
            }

            TokenKind::Variable(name) => {
                self.advance();
                Ok(Expr::Variable { name })
            }
            TokenKind::ContextVariable(name) => {
                self.advance();
                Ok(Expr::ContextVariable { name })
            }

            TokenKind::Identifier(name) => {
                // Bare identifiers are not operands; only a following '('
                // (function call) makes one legal.
                if self.peek_at(1).kind != TokenKind::LeftParen {
                    return Err(self.unexpected(&["'(' to make a function call"]));
                }
                self.advance(); // identifier
                self.advance(); // '('
                let args = self.parse_call_args()?;
                Ok(Expr::Call {
                    name: name.to_uppercase(),
                    args,
                })
            }

            TokenKind::LeftParen => {
                self.advance();
                let expr = self.parse_expr(0)?;
                self.expect(TokenKind::RightParen, "')'")?;
                Ok(expr)
            }

            TokenKind::LeftBracket => {
                self.advance();
                self.parse_array_literal()
            }
            TokenKind::LeftBrace => {
                self.advance();
                self.parse_object_literal()
            }

            TokenKind::Minus => {
                self.advance();
                let operand = self.parse_expr(PREC_UNARY)?;
                Ok(Expr::Unary {
                    op: UnaryOp::Negate,
                    operand: Box::new(operand),
                })
            }
            TokenKind::Not => {
                self.advance();
                let operand = self.parse_expr(PREC_UNARY)?;
                Ok(Expr::Unary {
                    op: UnaryOp::Not,
                    operand: Box::new(operand),
                })
            }

            _ => Err(self.unexpected(&["expression"])),
        }
    }

    fn parse_call_args(&mut self) -> EngineResult<Vec<Expr>> {
        let mut args = Vec::new();
        if self.peek().kind == TokenKind::RightParen {
            self.advance();
            return Ok(args);
        }
        loop {
            args.push(self.parse_expr(0)?);
            match self.peek().kind {
                TokenKind::Comma => {
                    self.advance();
                }
                TokenKind::RightParen => {
                    self.advance();
                    return Ok(args);
                }
                _ => return Err(self.unexpected(&["','", "')'"])),
            }
        }
    }

    fn parse_array_literal(&mut self) -> EngineResult<Expr> {
        let mut elements = Vec::new();
        if self.peek().kind == TokenKind::RightBracket {
            self.advance();
            return Ok(Expr::ArrayLit(elements));
        }
        loop {
            elements.push(self.parse_expr(0)?);
            match self.peek().kind {
                TokenKind::Comma => {
                    self.advance();
                }
                TokenKind::RightBracket => {
                    self.advance();
                    return Ok(Expr::ArrayLit(elements));
                }
                _ => return Err(self.unexpected(&["','", "']'"])),
            }
        }
    }

    fn parse_object_literal(&mut self) -> EngineResult<Expr> {
        let mut properties = Vec::new();
        if self.peek().kind == TokenKind::RightBrace {
            self.advance();
            return Ok(Expr::ObjectLit(properties));
        }
        loop {
            let key = match self.peek().kind.clone() {
                TokenKind::Identifier(name) => {
                    self.advance();
                    name
                }
                _ => return Err(self.unexpected(&["identifier key"])),
            };
            self.expect(TokenKind::Colon, "':'")?;
            let value = self.parse_expr(0)?;
            properties.push((key, value));
            match self.peek().kind {
                TokenKind::Comma => {
                    self.advance();
                }
                TokenKind::RightBrace => {
                    self.advance();
                    return Ok(Expr::ObjectLit(properties));
                }
                _ => return Err(self.unexpected(&["','", "'}'"])),
            }
        }
    }

    // === Helpers ===

    fn peek(&self) -> &Token {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> &Token {
        let idx = (self.pos + offset).min(self.tokens.len() - 1);
        &self.tokens[idx]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, kind: TokenKind, description: &str) -> EngineResult<()> {
        if self.peek().kind == kind {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(&[description]))
        }
    }

    fn unexpected(&self, expected: &[&str]) -> EngineError {
        let token = self.peek();
        EngineError::UnexpectedToken {
            token: token.kind.describe(),
            expected: expected.iter().map(|s| s.to_string()).collect(),
            offset: token.span.offset,
            line: token.span.line,
            column: token.span.column,
        }
    }
}
