//! Expression lexer
//!
//! Converts an operand or directive argument into a flat token stream. Numbers
//! are decoded here so the parser only ever sees values, identifiers, `$` and
//! punctuation.

use super::ExpressionError;

/// Binary operators and grouping characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Punct {
    Plus,
    Minus,
    Star,
    Slash,
    Ampersand,
    Pipe,
    LParen,
    RParen,
}

impl Punct {
    fn from_char(ch: char) -> Option<Self> {
        match ch {
            '+' => Some(Punct::Plus),
            '-' => Some(Punct::Minus),
            '*' => Some(Punct::Star),
            '/' => Some(Punct::Slash),
            '&' => Some(Punct::Ampersand),
            '|' => Some(Punct::Pipe),
            '(' => Some(Punct::LParen),
            ')' => Some(Punct::RParen),
            _ => None,
        }
    }
}

/// Token types recognized inside an expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenType {
    /// Decoded numeric literal: `12`, `0FFh`, `0x1F`, `1010b`, `'A'`
    Number(i64),
    /// Symbol or function name, lowercased
    Identifier(String),
    /// `$`, the current location
    Dollar,
    Punct(Punct),
}

/// A token with its starting column (0-based) within the expression text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub token_type: TokenType,
    pub column: usize,
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
}

impl Lexer {
    fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_n(&self, n: usize) -> Option<char> {
        self.chars.get(self.pos + n).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += 1;
        Some(ch)
    }

    /// Identifier characters: letters, digits, `_`, `.`, `?`, `@`
    fn is_word_char(ch: char) -> bool {
        ch.is_ascii_alphanumeric() || matches!(ch, '_' | '.' | '?' | '@')
    }

    fn scan_word(&mut self) -> String {
        let mut word = String::new();
        while let Some(ch) = self.peek() {
            if Self::is_word_char(ch) {
                word.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        word
    }

    /// Scans a literal starting with a digit and decodes its radix from the
    /// `0x` prefix or the `h`/`b` suffix.
    fn scan_number(&mut self, column: usize) -> Result<Token, ExpressionError> {
        let word = self.scan_word();
        let lower = word.to_ascii_lowercase();

        let (digits, radix) = if let Some(hex) = lower.strip_prefix("0x") {
            (hex, 16)
        } else if let Some(hex) = lower.strip_suffix('h') {
            (hex, 16)
        } else if lower.len() > 1
            && lower.ends_with('b')
            && lower[..lower.len() - 1].chars().all(|c| c == '0' || c == '1')
        {
            (&lower[..lower.len() - 1], 2)
        } else {
            (lower.as_str(), 10)
        };

        let value = i64::from_str_radix(digits, radix)
            .ok()
            .filter(|_| !digits.is_empty())
            .ok_or_else(|| ExpressionError::InvalidNumber {
                text: word.clone(),
                column,
            })?;

        Ok(Token {
            token_type: TokenType::Number(value),
            column,
        })
    }

    /// `$` alone is the location counter; `$` followed by hex digits is a
    /// hexadecimal literal.
    fn scan_dollar(&mut self, column: usize) -> Result<Token, ExpressionError> {
        self.advance();
        if self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
            let word = self.scan_word();
            let value =
                i64::from_str_radix(&word, 16).map_err(|_| ExpressionError::InvalidNumber {
                    text: format!("${}", word),
                    column,
                })?;
            return Ok(Token {
                token_type: TokenType::Number(value),
                column,
            });
        }
        Ok(Token {
            token_type: TokenType::Dollar,
            column,
        })
    }

    fn scan_char(&mut self, column: usize) -> Result<Token, ExpressionError> {
        let quote = self.advance();
        match (self.peek(), self.peek_n(1)) {
            (Some(ch), close) if close == quote && ch.is_ascii() => {
                self.advance();
                self.advance();
                Ok(Token {
                    token_type: TokenType::Number(ch as i64),
                    column,
                })
            }
            _ => Err(ExpressionError::InvalidNumber {
                text: self.chars[column..].iter().collect(),
                column,
            }),
        }
    }

    fn next_token(&mut self) -> Result<Option<Token>, ExpressionError> {
        while self.peek().is_some_and(char::is_whitespace) {
            self.advance();
        }
        let Some(ch) = self.peek() else {
            return Ok(None);
        };
        let column = self.pos;

        match ch {
            '0'..='9' => self.scan_number(column).map(Some),
            '$' => self.scan_dollar(column).map(Some),
            '\'' | '"' => self.scan_char(column).map(Some),
            c if c.is_ascii_alphabetic() || matches!(c, '_' | '.' | '?' | '@') => {
                let word = self.scan_word().to_ascii_lowercase();
                let token_type = match word.as_str() {
                    "and" => TokenType::Punct(Punct::Ampersand),
                    "or" => TokenType::Punct(Punct::Pipe),
                    _ => TokenType::Identifier(word),
                };
                Ok(Some(Token { token_type, column }))
            }
            c => match Punct::from_char(c) {
                Some(punct) => {
                    self.advance();
                    Ok(Some(Token {
                        token_type: TokenType::Punct(punct),
                        column,
                    }))
                }
                None => Err(ExpressionError::UnexpectedCharacter { ch: c, column }),
            },
        }
    }
}

/// Tokenizes an expression.
///
/// The keywords `and` and `or` (any case) become the `&` and `|` operators.
pub fn tokenize(source: &str) -> Result<Vec<Token>, ExpressionError> {
    let mut lexer = Lexer::new(source);
    let mut tokens = Vec::new();
    while let Some(token) = lexer.next_token()? {
        tokens.push(token);
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn types(source: &str) -> Vec<TokenType> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| t.token_type)
            .collect()
    }

    #[test]
    fn test_number_radixes() {
        assert_eq!(types("42"), vec![TokenType::Number(42)]);
        assert_eq!(types("0FFh"), vec![TokenType::Number(0xFF)]);
        assert_eq!(types("1234H"), vec![TokenType::Number(0x1234)]);
        assert_eq!(types("0x1f"), vec![TokenType::Number(0x1F)]);
        assert_eq!(types("1010b"), vec![TokenType::Number(0b1010)]);
        assert_eq!(types("$c000"), vec![TokenType::Number(0xC000)]);
        assert_eq!(types("'A'"), vec![TokenType::Number(0x41)]);
    }

    #[test]
    fn test_hex_with_b_digit_is_hex() {
        assert_eq!(types("0Bh"), vec![TokenType::Number(0x0B)]);
        assert_eq!(types("1bh"), vec![TokenType::Number(0x1B)]);
    }

    #[test]
    fn test_keywords_become_operators() {
        assert_eq!(
            types("a AND b or c"),
            vec![
                TokenType::Identifier("a".into()),
                TokenType::Punct(Punct::Ampersand),
                TokenType::Identifier("b".into()),
                TokenType::Punct(Punct::Pipe),
                TokenType::Identifier("c".into()),
            ]
        );
    }

    #[test]
    fn test_dollar_and_columns() {
        let tokens = tokenize("$ + 2").unwrap();
        assert_eq!(tokens[0].token_type, TokenType::Dollar);
        assert_eq!(tokens[1].column, 2);
        assert_eq!(tokens[2].column, 4);
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            tokenize("12q"),
            Err(ExpressionError::InvalidNumber { .. })
        ));
        assert!(matches!(
            tokenize("1 # 2"),
            Err(ExpressionError::UnexpectedCharacter { ch: '#', column: 2 })
        ));
        assert!(matches!(
            tokenize("0FFG"),
            Err(ExpressionError::InvalidNumber { .. })
        ));
    }
}
