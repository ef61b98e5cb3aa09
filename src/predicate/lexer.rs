//! Tokenizer for predicate source text.

use super::PredicateError;

/// A token produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Character offset of the token start (0-based).
    pub offset: usize,
}

/// Token types.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Number(f64),
    Str(String),
    Ident(String),

    // Structural
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Dot,
    Semicolon,
    Question,
    Colon,
    Arrow,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    Lt,
    Le,
    Gt,
    Ge,
    EqEq,
    NotEq,
    StrictEq,
    StrictNotEq,
    AndAnd,
    OrOr,

    Eof,
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "number {}", n),
            Self::Str(s) => write!(f, "string '{}'", s),
            Self::Ident(s) => write!(f, "identifier '{}'", s),
            Self::LParen => write!(f, "("),
            Self::RParen => write!(f, ")"),
            Self::LBrace => write!(f, "{{"),
            Self::RBrace => write!(f, "}}"),
            Self::LBracket => write!(f, "["),
            Self::RBracket => write!(f, "]"),
            Self::Comma => write!(f, ","),
            Self::Dot => write!(f, "."),
            Self::Semicolon => write!(f, ";"),
            Self::Question => write!(f, "?"),
            Self::Colon => write!(f, ":"),
            Self::Arrow => write!(f, "=>"),
            Self::Plus => write!(f, "+"),
            Self::Minus => write!(f, "-"),
            Self::Star => write!(f, "*"),
            Self::Slash => write!(f, "/"),
            Self::Percent => write!(f, "%"),
            Self::Bang => write!(f, "!"),
            Self::Lt => write!(f, "<"),
            Self::Le => write!(f, "<="),
            Self::Gt => write!(f, ">"),
            Self::Ge => write!(f, ">="),
            Self::EqEq => write!(f, "=="),
            Self::NotEq => write!(f, "!="),
            Self::StrictEq => write!(f, "==="),
            Self::StrictNotEq => write!(f, "!=="),
            Self::AndAnd => write!(f, "&&"),
            Self::OrOr => write!(f, "||"),
            Self::Eof => write!(f, "end of input"),
        }
    }
}

/// Lexer over predicate source.
pub struct Lexer {
    input: Vec<char>,
    pos: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            pos: 0,
        }
    }

    /// Tokenize the entire input. The last token is always `Eof`.
    pub fn tokenize(&mut self) -> Result<Vec<Token>, PredicateError> {
        let mut tokens = Vec::new();

        loop {
            self.skip_whitespace_and_comments()?;

            if self.pos >= self.input.len() {
                tokens.push(Token {
                    kind: TokenKind::Eof,
                    offset: self.pos,
                });
                break;
            }

            tokens.push(self.next_token()?);
        }

        Ok(tokens)
    }

    fn peek_at(&self, ahead: usize) -> Option<char> {
        self.input.get(self.pos + ahead).copied()
    }

    fn skip_whitespace_and_comments(&mut self) -> Result<(), PredicateError> {
        while let Some(ch) = self.peek_at(0) {
            if ch.is_whitespace() {
                self.pos += 1;
            } else if ch == '/' && self.peek_at(1) == Some('/') {
                while let Some(c) = self.peek_at(0) {
                    if c == '\n' {
                        break;
                    }
                    self.pos += 1;
                }
            } else if ch == '/' && self.peek_at(1) == Some('*') {
                let start = self.pos;
                self.pos += 2;
                loop {
                    match self.peek_at(0) {
                        None => {
                            return Err(PredicateError::lex(start, "unterminated block comment"))
                        }
                        Some('*') if self.peek_at(1) == Some('/') => {
                            self.pos += 2;
                            break;
                        }
                        Some(_) => self.pos += 1,
                    }
                }
            } else {
                break;
            }
        }
        Ok(())
    }

    fn next_token(&mut self) -> Result<Token, PredicateError> {
        let offset = self.pos;
        let ch = self.input[self.pos];

        let single = |kind: TokenKind, lexer: &mut Self| -> Result<Token, PredicateError> {
            lexer.pos += 1;
            Ok(Token { kind, offset })
        };

        match ch {
            '(' => single(TokenKind::LParen, self),
            ')' => single(TokenKind::RParen, self),
            '{' => single(TokenKind::LBrace, self),
            '}' => single(TokenKind::RBrace, self),
            '[' => single(TokenKind::LBracket, self),
            ']' => single(TokenKind::RBracket, self),
            ',' => single(TokenKind::Comma, self),
            ';' => single(TokenKind::Semicolon, self),
            '?' => single(TokenKind::Question, self),
            ':' => single(TokenKind::Colon, self),
            '+' => single(TokenKind::Plus, self),
            '-' => single(TokenKind::Minus, self),
            '*' => single(TokenKind::Star, self),
            '/' => single(TokenKind::Slash, self),
            '%' => single(TokenKind::Percent, self),
            '.' if !self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) => {
                single(TokenKind::Dot, self)
            }
            '=' => self.lex_equals(offset),
            '!' => {
                let kind = if self.peek_at(1) == Some('=') {
                    if self.peek_at(2) == Some('=') {
                        self.pos += 3;
                        TokenKind::StrictNotEq
                    } else {
                        self.pos += 2;
                        TokenKind::NotEq
                    }
                } else {
                    self.pos += 1;
                    TokenKind::Bang
                };
                Ok(Token { kind, offset })
            }
            '<' | '>' => {
                let with_eq = self.peek_at(1) == Some('=');
                self.pos += if with_eq { 2 } else { 1 };
                let kind = match (ch, with_eq) {
                    ('<', false) => TokenKind::Lt,
                    ('<', true) => TokenKind::Le,
                    ('>', false) => TokenKind::Gt,
                    _ => TokenKind::Ge,
                };
                Ok(Token { kind, offset })
            }
            '&' | '|' => {
                if self.peek_at(1) != Some(ch) {
                    return Err(PredicateError::lex(
                        offset,
                        format!("bitwise operator '{}' is not supported", ch),
                    ));
                }
                self.pos += 2;
                let kind = if ch == '&' {
                    TokenKind::AndAnd
                } else {
                    TokenKind::OrOr
                };
                Ok(Token { kind, offset })
            }
            '\'' | '"' => self.lex_string(ch, offset),
            c if c.is_ascii_digit() || c == '.' => self.lex_number(offset),
            c if c.is_alphabetic() || c == '_' || c == '$' => Ok(self.lex_ident(offset)),
            other => Err(PredicateError::lex(
                offset,
                format!("unexpected character '{}'", other),
            )),
        }
    }

    fn lex_equals(&mut self, offset: usize) -> Result<Token, PredicateError> {
        let kind = match (self.peek_at(1), self.peek_at(2)) {
            (Some('='), Some('=')) => {
                self.pos += 3;
                TokenKind::StrictEq
            }
            (Some('='), _) => {
                self.pos += 2;
                TokenKind::EqEq
            }
            (Some('>'), _) => {
                self.pos += 2;
                TokenKind::Arrow
            }
            _ => return Err(PredicateError::lex(offset, "assignment is not supported")),
        };
        Ok(Token { kind, offset })
    }

    fn lex_string(&mut self, quote: char, offset: usize) -> Result<Token, PredicateError> {
        self.pos += 1;
        let mut text = String::new();

        loop {
            match self.peek_at(0) {
                None => return Err(PredicateError::lex(offset, "unterminated string literal")),
                Some(c) if c == quote => {
                    self.pos += 1;
                    break;
                }
                Some('\\') => {
                    let escaped = self
                        .peek_at(1)
                        .ok_or_else(|| PredicateError::lex(offset, "unterminated escape"))?;
                    text.push(match escaped {
                        'n' => '\n',
                        't' => '\t',
                        'r' => '\r',
                        '0' => '\0',
                        other => other,
                    });
                    self.pos += 2;
                }
                Some(c) => {
                    text.push(c);
                    self.pos += 1;
                }
            }
        }

        Ok(Token {
            kind: TokenKind::Str(text),
            offset,
        })
    }

    fn lex_number(&mut self, offset: usize) -> Result<Token, PredicateError> {
        let start = self.pos;
        let mut seen_dot = false;
        let mut seen_exp = false;

        while let Some(c) = self.peek_at(0) {
            if c.is_ascii_digit() || c == '_' {
                self.pos += 1;
            } else if c == '.' && !seen_dot && !seen_exp {
                seen_dot = true;
                self.pos += 1;
            } else if (c == 'e' || c == 'E') && !seen_exp {
                seen_exp = true;
                self.pos += 1;
                if matches!(self.peek_at(0), Some('+') | Some('-')) {
                    self.pos += 1;
                }
            } else {
                break;
            }
        }

        let text: String = self.input[start..self.pos]
            .iter()
            .filter(|c| **c != '_')
            .collect();
        let value = text
            .parse::<f64>()
            .map_err(|_| PredicateError::lex(offset, format!("invalid number '{}'", text)))?;

        Ok(Token {
            kind: TokenKind::Number(value),
            offset,
        })
    }

    fn lex_ident(&mut self, offset: usize) -> Token {
        let start = self.pos;
        while let Some(c) = self.peek_at(0) {
            if c.is_alphanumeric() || c == '_' || c == '$' {
                self.pos += 1;
            } else {
                break;
            }
        }
        Token {
            kind: TokenKind::Ident(self.input[start..self.pos].iter().collect()),
            offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::new(src)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_arrow_and_strict_equality() {
        assert_eq!(
            kinds("x => x % 2 === 0"),
            vec![
                TokenKind::Ident("x".into()),
                TokenKind::Arrow,
                TokenKind::Ident("x".into()),
                TokenKind::Percent,
                TokenKind::Number(2.0),
                TokenKind::StrictEq,
                TokenKind::Number(0.0),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_strings_and_comments() {
        assert_eq!(
            kinds("typeof v /* kind */ == 'num\\'ber' // done"),
            vec![
                TokenKind::Ident("typeof".into()),
                TokenKind::Ident("v".into()),
                TokenKind::EqEq,
                TokenKind::Str("num'ber".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("1.5 .25 1e3 1_000"),
            vec![
                TokenKind::Number(1.5),
                TokenKind::Number(0.25),
                TokenKind::Number(1000.0),
                TokenKind::Number(1000.0),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_rejects_assignment_and_bitwise() {
        assert!(Lexer::new("x = 1").tokenize().is_err());
        assert!(Lexer::new("x & 1").tokenize().is_err());
        assert!(Lexer::new("'open").tokenize().is_err());
    }
}
