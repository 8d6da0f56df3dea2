use crate::ast::{BinOp, UnaryOp};

/// A lexical token with its source text and position.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,

    /// The exact source text the token was read from
    pub raw: String,

    /// Offset of the first character in the source, counted in chars, not
    /// bytes
    pub offset: usize,
}

impl Token {
    pub fn new(kind: TokenKind, raw: impl Into<String>, offset: usize) -> Self {
        Token {
            kind,
            raw: raw.into(),
            offset,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    /// Decimal number
    ///
    /// # Examples
    /// ```text
    /// 3.14
    /// 0.5
    /// ```
    Float(f64),

    /// Integer
    ///
    /// # Examples
    /// ```text
    /// 42
    /// 10000
    /// ```
    Integer(i64),

    /// String literal in single or double quotes, escapes already resolved
    ///
    /// # Examples
    /// ```text
    /// "release"
    /// 'en-US'
    /// ```
    String(String),

    /// `true` / `false`
    Boolean(bool),

    /// `null`
    Null,

    /// Context key, property name or transform name
    ///
    /// # Examples
    /// ```text
    /// normandy
    /// userId
    /// stableSample
    /// ```
    Identifier(String),

    /// Binary operator, including the word operator `in`
    Binary(BinOp),

    /// Prefix operator. The lexer emits `-` as [`UnaryOp::Negate`] wherever
    /// an operand is expected.
    Unary(UnaryOp),

    /// Structural punctuation
    Punct(Punct),
}

/// Punctuation symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Punct {
    /// `.` attribute access, or a relative identifier at operand position
    Dot,
    /// `,` separates array elements, object entries and transform arguments
    Comma,
    /// `|` applies a transform
    Pipe,
    /// `:` object entries and the alternate of a conditional
    Colon,
    /// `?` starts the consequent of a conditional
    Question,
    /// `[` array literal or filter
    LBracket,
    /// `]`
    RBracket,
    /// `(` grouping or transform arguments
    LParen,
    /// `)`
    RParen,
    /// `{` object literal
    LBrace,
    /// `}`
    RBrace,
}

impl TokenKind {
    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            TokenKind::Float(_)
                | TokenKind::Integer(_)
                | TokenKind::String(_)
                | TokenKind::Boolean(_)
                | TokenKind::Null
        )
    }

    pub fn is_punct(&self, punct: Punct) -> bool {
        matches!(self, TokenKind::Punct(p) if *p == punct)
    }
}
