//! # Expression Evaluation
//!
//! Numeric and symbolic expressions appear in instruction operands (`ld a,low(table)+1`)
//! and directive arguments (`ds buffer_end-buffer`). This module tokenizes them with
//! [`lexer::tokenize`] and evaluates them by recursive descent.
//!
//! ## Grammar
//!
//! ```text
//! expr     := and_expr ( '|' and_expr )*          ; also `or`
//! and_expr := sum ( '&' sum )*                    ; also `and`
//! sum      := product ( ('+' | '-') product )*
//! product  := unary ( ('*' | '/') unary )*
//! unary    := ('-' | '+') unary | primary
//! primary  := number | '$' | symbol | ('low' | 'high') '(' expr ')' | '(' expr ')'
//! ```
//!
//! Symbols are matched as whole tokens, so a short symbol never clobbers part of a
//! longer one. `$` is the address of the first byte of the statement being assembled.
//!
//! ## Example
//!
//! ```
//! use std::collections::HashMap;
//! use libz80::expression::Evaluator;
//!
//! let mut symbols = HashMap::new();
//! symbols.insert("table".to_string(), 0x1234u16);
//!
//! let eval = Evaluator::new(&symbols, 0x0100);
//! assert_eq!(eval.evaluate_byte("high(table)").unwrap(), 0x12);
//! assert_eq!(eval.evaluate_word("$+3").unwrap(), 0x0103);
//! assert_eq!(eval.evaluate("0FFh and 0Fh").unwrap(), 0x0F);
//! ```

pub mod lexer;

use std::collections::HashMap;

use lexer::{tokenize, Punct, Token, TokenType};

/// Reasons an expression can fail to evaluate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExpressionError {
    #[error("empty expression")]
    Empty,

    #[error("unexpected character '{ch}' at column {column}")]
    UnexpectedCharacter { ch: char, column: usize },

    #[error("invalid number '{text}' at column {column}")]
    InvalidNumber { text: String, column: usize },

    #[error("unknown symbol '{0}'")]
    UnknownSymbol(String),

    #[error("unexpected '{found}' at column {column}")]
    UnexpectedToken { found: String, column: usize },

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("unbalanced parentheses")]
    UnbalancedParentheses,

    #[error("division by zero")]
    DivisionByZero,

    #[error("value {value} out of range for a {width}")]
    OutOfRange { value: i64, width: &'static str },

    #[error("expression nested deeper than {0} levels")]
    TooDeep(usize),
}

/// Nesting limit for parentheses and unary operators.
pub const MAX_DEPTH: usize = 256;

/// Read-only symbol resolution used by the evaluator.
///
/// Names are passed lowercased.
pub trait SymbolLookup {
    fn lookup(&self, name: &str) -> Option<u16>;
}

impl SymbolLookup for HashMap<String, u16> {
    fn lookup(&self, name: &str) -> Option<u16> {
        self.get(name).copied().or_else(|| {
            self.iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, &value)| value)
        })
    }
}

/// A lookup with no symbols, for evaluating plain numeric text.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSymbols;

impl SymbolLookup for NoSymbols {
    fn lookup(&self, _name: &str) -> Option<u16> {
        None
    }
}

/// Evaluates expressions against a symbol table and a location counter.
#[derive(Clone, Copy)]
pub struct Evaluator<'a> {
    symbols: &'a dyn SymbolLookup,
    location: u16,
}

impl<'a> Evaluator<'a> {
    /// Creates an evaluator; `location` is the value of `$`.
    pub fn new(symbols: &'a dyn SymbolLookup, location: u16) -> Self {
        Self { symbols, location }
    }

    /// Value of `$`.
    pub fn location(&self) -> u16 {
        self.location
    }

    /// Evaluates `text` to an unbounded integer.
    pub fn evaluate(&self, text: &str) -> Result<i64, ExpressionError> {
        let tokens = tokenize(text)?;
        if tokens.is_empty() {
            return Err(ExpressionError::Empty);
        }
        let mut parser = Parser {
            tokens: &tokens,
            pos: 0,
            depth: 0,
            eval: self,
        };
        let value = parser.expr()?;
        match parser.peek() {
            None => Ok(value),
            Some(Token {
                token_type: TokenType::Punct(Punct::RParen),
                ..
            }) => Err(ExpressionError::UnbalancedParentheses),
            Some(token) => Err(unexpected(token)),
        }
    }

    /// Evaluates `text` to a byte. Values from -128 to 255 are accepted;
    /// negative values are stored in two's complement.
    pub fn evaluate_byte(&self, text: &str) -> Result<u8, ExpressionError> {
        let value = self.evaluate(text)?;
        if (-128..=255).contains(&value) {
            Ok(value as u8)
        } else {
            Err(ExpressionError::OutOfRange {
                value,
                width: "byte",
            })
        }
    }

    /// Evaluates `text` to a word. Values from -32768 to 65535 are accepted.
    pub fn evaluate_word(&self, text: &str) -> Result<u16, ExpressionError> {
        let value = self.evaluate(text)?;
        if (-32768..=65535).contains(&value) {
            Ok(value as u16)
        } else {
            Err(ExpressionError::OutOfRange {
                value,
                width: "word",
            })
        }
    }

    /// Evaluates `text` as a signed displacement in -128..=127.
    pub fn evaluate_displacement(&self, text: &str) -> Result<i8, ExpressionError> {
        let value = self.evaluate(text)?;
        i8::try_from(value).map_err(|_| ExpressionError::OutOfRange {
            value,
            width: "signed displacement",
        })
    }
}

/// True if `text` refers to `$` or to any symbol, i.e. its value depends on
/// where it is assembled rather than being a plain number.
///
/// `low` and `high` are functions, not symbols. Text that fails to tokenize is
/// reported as not position dependent; evaluating it will surface the error.
pub fn is_position_dependent(text: &str) -> bool {
    let Ok(tokens) = tokenize(text) else {
        return false;
    };
    tokens.iter().enumerate().any(|(i, token)| match &token.token_type {
        TokenType::Dollar => true,
        TokenType::Identifier(name) => {
            let is_call = matches!(name.as_str(), "low" | "high")
                && matches!(
                    tokens.get(i + 1).map(|t| &t.token_type),
                    Some(TokenType::Punct(Punct::LParen))
                );
            !is_call
        }
        _ => false,
    })
}

fn unexpected(token: &Token) -> ExpressionError {
    let found = match &token.token_type {
        TokenType::Number(n) => n.to_string(),
        TokenType::Identifier(name) => name.clone(),
        TokenType::Dollar => "$".to_string(),
        TokenType::Punct(p) => match p {
            Punct::Plus => "+",
            Punct::Minus => "-",
            Punct::Star => "*",
            Punct::Slash => "/",
            Punct::Ampersand => "&",
            Punct::Pipe => "|",
            Punct::LParen => "(",
            Punct::RParen => ")",
        }
        .to_string(),
    };
    ExpressionError::UnexpectedToken {
        found,
        column: token.column,
    }
}

struct Parser<'t, 'e> {
    tokens: &'t [Token],
    pos: usize,
    depth: usize,
    eval: &'e Evaluator<'e>,
}

impl<'t, 'e> Parser<'t, 'e> {
    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<&'t Token> {
        let token = self.tokens.get(self.pos)?;
        self.pos += 1;
        Some(token)
    }

    /// Consumes the next token if it is `punct`.
    fn eat(&mut self, punct: Punct) -> bool {
        match self.peek() {
            Some(Token {
                token_type: TokenType::Punct(p),
                ..
            }) if *p == punct => {
                self.pos += 1;
                true
            }
            _ => false,
        }
    }

    /// Runs `f` one nesting level down.
    fn nested<F>(&mut self, f: F) -> Result<i64, ExpressionError>
    where
        F: FnOnce(&mut Self) -> Result<i64, ExpressionError>,
    {
        if self.depth >= MAX_DEPTH {
            return Err(ExpressionError::TooDeep(MAX_DEPTH));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn expr(&mut self) -> Result<i64, ExpressionError> {
        let mut value = self.and_expr()?;
        while self.eat(Punct::Pipe) {
            value |= self.and_expr()?;
        }
        Ok(value)
    }

    fn and_expr(&mut self) -> Result<i64, ExpressionError> {
        let mut value = self.sum()?;
        while self.eat(Punct::Ampersand) {
            value &= self.sum()?;
        }
        Ok(value)
    }

    fn sum(&mut self) -> Result<i64, ExpressionError> {
        let mut value = self.product()?;
        loop {
            if self.eat(Punct::Plus) {
                value = value.wrapping_add(self.product()?);
            } else if self.eat(Punct::Minus) {
                value = value.wrapping_sub(self.product()?);
            } else {
                return Ok(value);
            }
        }
    }

    fn product(&mut self) -> Result<i64, ExpressionError> {
        let mut value = self.unary()?;
        loop {
            if self.eat(Punct::Star) {
                value = value.wrapping_mul(self.unary()?);
            } else if self.eat(Punct::Slash) {
                let divisor = self.unary()?;
                if divisor == 0 {
                    return Err(ExpressionError::DivisionByZero);
                }
                value = value.wrapping_div(divisor);
            } else {
                return Ok(value);
            }
        }
    }

    fn unary(&mut self) -> Result<i64, ExpressionError> {
        if self.eat(Punct::Minus) {
            return Ok(self.nested(Self::unary)?.wrapping_neg());
        }
        if self.eat(Punct::Plus) {
            return self.nested(Self::unary);
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<i64, ExpressionError> {
        let token = self.next().ok_or(ExpressionError::UnexpectedEnd)?;
        match &token.token_type {
            TokenType::Number(value) => Ok(*value),
            TokenType::Dollar => Ok(self.eval.location as i64),
            TokenType::Identifier(name) => {
                if matches!(name.as_str(), "low" | "high") && self.eat(Punct::LParen) {
                    let value = self.group()?;
                    return Ok(if name == "low" {
                        value & 0xFF
                    } else {
                        (value >> 8) & 0xFF
                    });
                }
                self.eval
                    .symbols
                    .lookup(name)
                    .map(i64::from)
                    .ok_or_else(|| ExpressionError::UnknownSymbol(name.clone()))
            }
            TokenType::Punct(Punct::LParen) => self.group(),
            TokenType::Punct(_) => Err(unexpected(token)),
        }
    }

    /// Parses the rest of a parenthesised group after its `(`.
    fn group(&mut self) -> Result<i64, ExpressionError> {
        let value = self.nested(Self::expr)?;
        if self.eat(Punct::RParen) {
            Ok(value)
        } else {
            Err(ExpressionError::UnbalancedParentheses)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(text: &str) -> Result<i64, ExpressionError> {
        Evaluator::new(&NoSymbols, 0x8000).evaluate(text)
    }

    #[test]
    fn test_precedence() {
        assert_eq!(eval("2+3*4").unwrap(), 14);
        assert_eq!(eval("(2+3)*4").unwrap(), 20);
        assert_eq!(eval("10-4-3").unwrap(), 3);
        assert_eq!(eval("0F0h | 0Fh & 3").unwrap(), 0xF3);
        assert_eq!(eval("100/7").unwrap(), 14);
        assert_eq!(eval("-1").unwrap(), -1);
        assert_eq!(eval("-(2+3)").unwrap(), -5);
    }

    #[test]
    fn test_low_high() {
        assert_eq!(eval("low(1234h)").unwrap(), 0x34);
        assert_eq!(eval("HIGH(1234h)").unwrap(), 0x12);
        assert_eq!(eval("high(1234h)+1").unwrap(), 0x13);
    }

    #[test]
    fn test_dollar_is_location() {
        assert_eq!(eval("$").unwrap(), 0x8000);
        assert_eq!(eval("$-2").unwrap(), 0x7FFE);
    }

    #[test]
    fn test_symbols_are_whole_tokens() {
        let mut symbols = HashMap::new();
        symbols.insert("a".to_string(), 1u16);
        symbols.insert("ab".to_string(), 0x10u16);
        let eval = Evaluator::new(&symbols, 0);
        assert_eq!(eval.evaluate("ab+a").unwrap(), 0x11);
        assert_eq!(eval.evaluate("AB").unwrap(), 0x10);
    }

    #[test]
    fn test_errors() {
        assert_eq!(eval(""), Err(ExpressionError::Empty));
        assert_eq!(eval("(1+2"), Err(ExpressionError::UnbalancedParentheses));
        assert_eq!(eval("1+2)"), Err(ExpressionError::UnbalancedParentheses));
        assert_eq!(eval("1/0"), Err(ExpressionError::DivisionByZero));
        assert_eq!(eval("1+"), Err(ExpressionError::UnexpectedEnd));
        assert_eq!(
            eval("missing"),
            Err(ExpressionError::UnknownSymbol("missing".to_string()))
        );
        assert!(matches!(
            eval("1 2"),
            Err(ExpressionError::UnexpectedToken { column: 2, .. })
        ));
    }

    #[test]
    fn test_ranges() {
        let e = Evaluator::new(&NoSymbols, 0);
        assert_eq!(e.evaluate_byte("-1").unwrap(), 0xFF);
        assert_eq!(e.evaluate_byte("255").unwrap(), 0xFF);
        assert!(e.evaluate_byte("256").is_err());
        assert_eq!(e.evaluate_word("0FFFFh").unwrap(), 0xFFFF);
        assert!(e.evaluate_word("10000h").is_err());
        assert_eq!(e.evaluate_displacement("-128").unwrap(), -128);
        assert!(e.evaluate_displacement("128").is_err());
    }

    #[test]
    fn test_nesting_limit() {
        let ok = format!("{}7{}", "(".repeat(MAX_DEPTH), ")".repeat(MAX_DEPTH));
        assert_eq!(eval(&ok), Ok(7));
        let deep = format!("{}7{}", "(".repeat(200_000), ")".repeat(200_000));
        assert_eq!(eval(&deep), Err(ExpressionError::TooDeep(MAX_DEPTH)));
        assert_eq!(eval(&"-".repeat(100_000)), Err(ExpressionError::TooDeep(MAX_DEPTH)));
        assert_eq!(eval(&format!("{}5", "--".repeat(64))), Ok(5));
    }

    #[test]
    fn test_position_dependence() {
        assert!(!is_position_dependent("5"));
        assert!(!is_position_dependent("low(1234h)"));
        assert!(is_position_dependent("$"));
        assert!(is_position_dependent("loop"));
        assert!(is_position_dependent("high(loop)"));
    }
}
