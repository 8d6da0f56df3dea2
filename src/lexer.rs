use thiserror::Error;

use crate::{
    ast::{BinOp, Token, TokenKind, UnaryOp},
    grammar::{self, EntryKind},
};

/// Errors raised while splitting source text into tokens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    #[error("Unexpected character '{text}' at offset {offset}")]
    UnexpectedCharacter { text: String, offset: usize },

    #[error("Unterminated string starting at offset {offset}")]
    UnterminatedString { offset: usize },
}

pub struct Lexer {
    input: Vec<char>,
    position: usize,
    /// Kind of the last emitted token; decides whether `-` is unary.
    previous: Option<TokenKind>,
}

/// Splits `source` into tokens.
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(source).tokenize()
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            position: 0,
            previous: None,
        }
    }

    pub fn tokenize(&mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_char(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn raw_since(&self, start: usize) -> String {
        self.input[start..self.position].iter().collect()
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_word(&mut self) -> String {
        let mut result = String::new();
        while let Some(ch) = self.current_char() {
            if is_word_char(ch) {
                result.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        result
    }

    fn read_string(&mut self, quote: char) -> Result<String, LexError> {
        let start = self.position;
        let mut result = String::new();
        self.advance(); // opening quote

        while let Some(ch) = self.current_char() {
            match ch {
                c if c == quote => {
                    self.advance();
                    return Ok(result);
                }
                '\\' => {
                    self.advance();
                    match self.current_char() {
                        Some('n') => result.push('\n'),
                        Some('t') => result.push('\t'),
                        Some('r') => result.push('\r'),
                        // Any other escaped character stands for itself
                        Some(ch) => result.push(ch),
                        None => break,
                    }
                    self.advance();
                }
                _ => {
                    result.push(ch);
                    self.advance();
                }
            }
        }

        Err(LexError::UnterminatedString { offset: start })
    }

    fn read_number(&mut self) -> TokenKind {
        let mut number = String::new();
        let mut is_float = false;

        while let Some(ch) = self.current_char() {
            if ch.is_ascii_digit() {
                number.push(ch);
                self.advance();
            } else if ch == '.'
                && !is_float
                && self.peek_char(1).is_some_and(|c| c.is_ascii_digit())
            {
                is_float = true;
                number.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        // Digits with at most one inner dot always parse as f64
        let as_float = || TokenKind::Float(number.parse::<f64>().unwrap_or(f64::NAN));
        if is_float {
            as_float()
        } else {
            number
                .parse::<i64>()
                .map(TokenKind::Integer)
                .unwrap_or_else(|_| as_float())
        }
    }

    fn expects_operand(&self) -> bool {
        !self.previous.as_ref().is_some_and(grammar::ends_operand)
    }

    pub fn next_token(&mut self) -> Result<Option<Token>, LexError> {
        self.skip_whitespace();

        let start = self.position;
        let kind = match self.current_char() {
            None => return Ok(None),
            Some(q @ ('"' | '\'')) => TokenKind::String(self.read_string(q)?),
            Some(ch) if ch.is_ascii_digit() => self.read_number(),
            Some(ch) if is_word_start(ch) => {
                let word = self.read_word();
                match word.as_str() {
                    "true" => TokenKind::Boolean(true),
                    "false" => TokenKind::Boolean(false),
                    "null" => TokenKind::Null,
                    _ => match grammar::lookup_word(&word).map(|entry| entry.kind) {
                        Some(EntryKind::Binary(op)) => TokenKind::Binary(op),
                        _ => TokenKind::Identifier(word),
                    },
                }
            }
            Some(ch) => {
                let entry = grammar::longest_symbol(&self.input[self.position..]).ok_or_else(|| {
                    LexError::UnexpectedCharacter {
                        text: ch.to_string(),
                        offset: self.position,
                    }
                })?;
                self.position += entry.symbol.chars().count();
                match entry.kind {
                    EntryKind::Binary(BinOp::Subtract) if self.expects_operand() => {
                        TokenKind::Unary(UnaryOp::Negate)
                    }
                    EntryKind::Binary(op) => TokenKind::Binary(op),
                    EntryKind::Unary(op) => TokenKind::Unary(op),
                    EntryKind::Punct(p) => TokenKind::Punct(p),
                }
            }
        };

        self.previous = Some(kind.clone());
        Ok(Some(Token::new(kind, self.raw_since(start), start)))
    }
}

fn is_word_start(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_' || ch == '$'
}

fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == '$'
}
