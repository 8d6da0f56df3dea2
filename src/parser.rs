use std::mem;

use thiserror::Error;

use crate::{
    ast::{BinOp, Expr, Punct, Token, TokenKind},
    grammar,
    value::Value,
};

/// Errors raised for structurally invalid token sequences.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Unexpected token '{found}' at offset {offset}, expected {expected}")]
    UnexpectedToken {
        found: String,
        offset: usize,
        expected: String,
    },

    #[error("Unexpected end of expression, expected {expected}")]
    UnexpectedEnd { expected: String },

    #[error("Unclosed '{open}' at offset {offset}")]
    Unclosed { open: String, offset: usize },

    #[error("Expression nested too deeply at offset {offset}")]
    TooDeep { offset: usize },

    #[error("Expression is {depth} levels deep, at most {} are allowed", MAX_TREE_DEPTH)]
    TooComplex { depth: usize },
}

impl ParseError {
    fn unexpected(token: &Token, expected: impl Into<String>) -> Self {
        ParseError::UnexpectedToken {
            found: token.raw.clone(),
            offset: token.offset,
            expected: expected.into(),
        }
    }

    fn end(expected: impl Into<String>) -> Self {
        ParseError::UnexpectedEnd {
            expected: expected.into(),
        }
    }
}

/// Deepest recursion the parser allows through groups, brackets, filters
/// and prefix operators.
pub const MAX_NESTING: usize = 128;

/// Deepest tree the parser hands to the evaluator. Long operator and
/// postfix chains grow the tree without growing parser recursion.
pub const MAX_TREE_DEPTH: usize = 512;

/// Pending binary operations of one expression level.
///
/// Holds one more operand than operators. Pushing an operator first reduces
/// every stacked operator that binds at least as tightly, so equal
/// precedence associates to the left.
#[derive(Default)]
struct OperatorStack {
    operands: Vec<Expr>,
    operators: Vec<BinOp>,
}

impl OperatorStack {
    fn push_operand(&mut self, operand: Expr) {
        self.operands.push(operand);
    }

    fn push_operator(&mut self, op: BinOp) {
        while self
            .operators
            .last()
            .is_some_and(|top| top.precedence() >= op.precedence())
        {
            self.reduce();
        }
        self.operators.push(op);
    }

    fn reduce(&mut self) {
        if let (Some(op), Some(right), Some(left)) =
            (self.operators.pop(), self.operands.pop(), self.operands.pop())
        {
            self.operands.push(Expr::binary(op, left, right));
        }
    }

    fn finish(mut self) -> Option<Expr> {
        while !self.operators.is_empty() {
            self.reduce();
        }
        self.operands.pop()
    }
}

pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
    /// Set when a relative identifier is parsed; scoped to the innermost
    /// filter predicate.
    relative: bool,
    depth: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser {
            tokens,
            position: 0,
            relative: false,
            depth: 0,
        }
    }

    /// Parses the whole token stream into a single expression.
    pub fn parse(&mut self) -> Result<Expr, ParseError> {
        self.check_adjacency()?;

        let expr = self.parse_expression()?;
        if let Some(token) = self.current() {
            return Err(ParseError::unexpected(
                token,
                grammar::expected_after(self.previous_kind()),
            ));
        }

        let depth = expr.depth();
        if depth > MAX_TREE_DEPTH {
            return Err(ParseError::TooComplex { depth });
        }
        Ok(expr)
    }

    /// Rejects token pairs the grammar never allows next to each other.
    fn check_adjacency(&self) -> Result<(), ParseError> {
        let mut previous: Option<&TokenKind> = None;
        for token in &self.tokens {
            if !grammar::can_follow(previous, &token.kind) {
                return Err(ParseError::unexpected(
                    token,
                    grammar::expected_after(previous),
                ));
            }
            previous = Some(&token.kind);
        }
        Ok(())
    }

    fn current(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn current_kind(&self) -> Option<&TokenKind> {
        self.current().map(|token| &token.kind)
    }

    fn previous_kind(&self) -> Option<&TokenKind> {
        self.position
            .checked_sub(1)
            .and_then(|index| self.tokens.get(index))
            .map(|token| &token.kind)
    }

    /// Enters one level of recursion; the error carries the offset of the
    /// token that opened it.
    fn descend(&mut self) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            let offset = self
                .position
                .checked_sub(1)
                .and_then(|index| self.tokens.get(index))
                .map_or(0, |token| token.offset);
            return Err(ParseError::TooDeep { offset });
        }
        Ok(())
    }

    fn ascend(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.position).cloned();
        if token.is_some() {
            self.position += 1;
        }
        token
    }

    fn check(&self, punct: Punct) -> bool {
        self.current_kind().is_some_and(|kind| kind.is_punct(punct))
    }

    fn expect(&mut self, punct: Punct, expected: &str) -> Result<(), ParseError> {
        match self.current() {
            Some(token) if token.kind.is_punct(punct) => {}
            Some(token) => return Err(ParseError::unexpected(token, expected)),
            None => return Err(ParseError::end(expected)),
        }
        self.advance();
        Ok(())
    }

    /// Consumes the bracket closing `open`.
    fn expect_closing(&mut self, close: Punct, open: &Token) -> Result<(), ParseError> {
        match self.current() {
            Some(token) if token.kind.is_punct(close) => {}
            Some(token) => {
                return Err(ParseError::unexpected(
                    token,
                    format!(
                        "'{}' to close '{}' at offset {}",
                        closing_symbol(close),
                        open.raw,
                        open.offset
                    ),
                ));
            }
            None => {
                return Err(ParseError::Unclosed {
                    open: open.raw.clone(),
                    offset: open.offset,
                });
            }
        }
        self.advance();
        Ok(())
    }

    fn expect_identifier(&mut self, expected: &str) -> Result<String, ParseError> {
        match self.advance() {
            Some(Token {
                kind: TokenKind::Identifier(name),
                ..
            }) => Ok(name),
            Some(token) => Err(ParseError::unexpected(&token, expected)),
            None => Err(ParseError::end(expected)),
        }
    }

    /// Full expression, including a trailing conditional.
    ///
    /// The conditional takes everything parsed so far at this level as its
    /// test; consequent and alternate are full expressions, which makes
    /// `?:` right-associative.
    pub fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        self.descend()?;
        let expr = self.parse_conditional();
        self.ascend();
        expr
    }

    fn parse_conditional(&mut self) -> Result<Expr, ParseError> {
        let test = self.parse_binary()?;

        if !self.check(Punct::Question) {
            return Ok(test);
        }
        self.advance();
        let consequent = self.parse_expression()?;
        self.expect(Punct::Colon, "':' in conditional expression")?;
        let alternate = self.parse_expression()?;

        Ok(Expr::Conditional {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
        })
    }

    fn parse_binary(&mut self) -> Result<Expr, ParseError> {
        let mut stack = OperatorStack::default();
        stack.push_operand(self.parse_unary()?);

        while let Some(TokenKind::Binary(op)) = self.current_kind() {
            let op = *op;
            self.advance();
            stack.push_operator(op);
            stack.push_operand(self.parse_unary()?);
        }

        stack.finish().ok_or_else(|| ParseError::end("an operand"))
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        if let Some(TokenKind::Unary(op)) = self.current_kind() {
            let op = *op;
            self.advance();
            self.descend()?;
            let operand = self.parse_unary(); // Right-associative
            self.ascend();
            return Ok(Expr::unary(op, operand?));
        }
        self.parse_postfix()
    }

    /// Operand followed by any chain of `.name`, `[predicate]` and
    /// `|transform(args)`.
    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;

        loop {
            match self.current_kind() {
                Some(TokenKind::Punct(Punct::Dot)) => {
                    self.advance();
                    let name = self.expect_identifier("a property name after '.'")?;
                    expr = Expr::attribute(expr, name);
                }
                Some(TokenKind::Punct(Punct::LBracket)) => {
                    let open = self.advance();
                    expr = self.parse_filter(expr, open)?;
                }
                Some(TokenKind::Punct(Punct::Pipe)) => {
                    self.advance();
                    let name = self.expect_identifier("a transform name after '|'")?;
                    let args = if self.check(Punct::LParen) {
                        let open = self.advance();
                        self.parse_list(Punct::RParen, open)?
                    } else {
                        vec![]
                    };
                    expr = Expr::Transform {
                        subject: Box::new(expr),
                        name,
                        args,
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_filter(&mut self, subject: Expr, open: Option<Token>) -> Result<Expr, ParseError> {
        let open = open.ok_or_else(|| ParseError::end("'['"))?;

        let outer = mem::replace(&mut self.relative, false);
        let predicate = self.parse_expression();
        let relative = mem::replace(&mut self.relative, outer);

        let predicate = predicate?;
        self.expect_closing(Punct::RBracket, &open)?;

        Ok(Expr::Filter {
            subject: Box::new(subject),
            predicate: Box::new(predicate),
            relative,
        })
    }

    /// Parse primary expressions: literals, identifiers, relative
    /// identifiers, groups, array and object literals.
    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let Some(token) = self.advance() else {
            return Err(ParseError::end("an operand"));
        };

        match token.kind {
            // Literals
            TokenKind::Float(n) => Ok(Expr::Literal(Value::Float(n))),
            TokenKind::Integer(n) => Ok(Expr::Literal(Value::Integer(n))),
            TokenKind::String(s) => Ok(Expr::Literal(Value::String(s))),
            TokenKind::Boolean(b) => Ok(Expr::Literal(Value::Boolean(b))),
            TokenKind::Null => Ok(Expr::Literal(Value::Null)),

            TokenKind::Identifier(name) => Ok(Expr::identifier(name)),

            // `.name` at operand position refers to the current filter element
            TokenKind::Punct(Punct::Dot) => {
                let name = self.expect_identifier("a property name after '.'")?;
                self.relative = true;
                Ok(Expr::relative(name))
            }

            TokenKind::Punct(Punct::LParen) => {
                let expr = self.parse_expression()?;
                self.expect_closing(Punct::RParen, &token)?;
                Ok(expr)
            }

            TokenKind::Punct(Punct::LBracket) => {
                let elements = self.parse_list(Punct::RBracket, Some(token))?;
                Ok(Expr::Array(elements))
            }

            TokenKind::Punct(Punct::LBrace) => self.parse_object_literal(token),

            _ => Err(ParseError::unexpected(&token, "an operand")),
        }
    }

    /// Comma-separated expressions up to `close`; the opening bracket has
    /// been consumed.
    fn parse_list(&mut self, close: Punct, open: Option<Token>) -> Result<Vec<Expr>, ParseError> {
        let open = open.ok_or_else(|| ParseError::end("an opening bracket"))?;
        let mut elements = vec![];

        if self.check(close) {
            self.advance();
            return Ok(elements);
        }

        loop {
            elements.push(self.parse_expression()?);
            if self.check(Punct::Comma) {
                self.advance();
            } else {
                self.expect_closing(close, &open)?;
                return Ok(elements);
            }
        }
    }

    fn parse_object_literal(&mut self, open: Token) -> Result<Expr, ParseError> {
        let mut entries = vec![];

        if self.check(Punct::RBrace) {
            self.advance();
            return Ok(Expr::Object(entries));
        }

        loop {
            let key = match self.advance() {
                Some(Token {
                    kind: TokenKind::Identifier(key) | TokenKind::String(key),
                    ..
                }) => key,
                Some(token) => return Err(ParseError::unexpected(&token, "an object key")),
                None => {
                    return Err(ParseError::Unclosed {
                        open: open.raw,
                        offset: open.offset,
                    });
                }
            };

            self.expect(Punct::Colon, "':' after object key")?;
            let value = self.parse_expression()?;
            entries.push((key, value));

            if self.check(Punct::Comma) {
                self.advance();
            } else {
                self.expect_closing(Punct::RBrace, &open)?;
                return Ok(Expr::Object(entries));
            }
        }
    }
}

fn closing_symbol(close: Punct) -> &'static str {
    match close {
        Punct::RParen => ")",
        Punct::RBracket => "]",
        Punct::RBrace => "}",
        _ => "?",
    }
}
