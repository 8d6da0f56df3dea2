//! Grammar table for targeting expressions.
//!
//! One static table drives the lexer (which symbols exist), the parser
//! (precedence and which tokens may follow which) and the evaluator
//! (elementary rules for every primitive operator).

use std::cmp::Ordering;

use rust_decimal::{
    Decimal,
    prelude::{FromPrimitive, ToPrimitive},
};

use crate::{
    ast::{BinOp, Punct, TokenKind, UnaryOp},
    evaluator::EvalError,
    value::Value,
};

/// What a grammar symbol produces.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EntryKind {
    Binary(BinOp),
    Unary(UnaryOp),
    Punct(Punct),
}

/// One row of the grammar table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrammarEntry {
    pub symbol: &'static str,
    pub kind: EntryKind,
    /// Binding strength; higher binds tighter. Zero for punctuation.
    pub precedence: u16,
}

const fn binary(symbol: &'static str, op: BinOp, precedence: u16) -> GrammarEntry {
    GrammarEntry {
        symbol,
        kind: EntryKind::Binary(op),
        precedence,
    }
}

const fn punct(symbol: &'static str, p: Punct) -> GrammarEntry {
    GrammarEntry {
        symbol,
        kind: EntryKind::Punct(p),
        precedence: 0,
    }
}

/// Precedence of prefix operators; above every binary operator.
pub const UNARY_PRECEDENCE: u16 = 1000;

pub static GRAMMAR: &[GrammarEntry] = &[
    punct(".", Punct::Dot),
    punct(",", Punct::Comma),
    punct("|", Punct::Pipe),
    punct(":", Punct::Colon),
    punct("?", Punct::Question),
    punct("[", Punct::LBracket),
    punct("]", Punct::RBracket),
    punct("(", Punct::LParen),
    punct(")", Punct::RParen),
    punct("{", Punct::LBrace),
    punct("}", Punct::RBrace),
    binary("||", BinOp::Or, 10),
    binary("&&", BinOp::And, 10),
    binary("==", BinOp::Equal, 20),
    binary("!=", BinOp::NotEqual, 20),
    binary("<", BinOp::LessThan, 20),
    binary("<=", BinOp::LessEqual, 20),
    binary(">", BinOp::GreaterThan, 20),
    binary(">=", BinOp::GreaterEqual, 20),
    binary("in", BinOp::In, 20),
    binary("+", BinOp::Add, 30),
    binary("-", BinOp::Subtract, 30),
    binary("*", BinOp::Multiply, 40),
    binary("/", BinOp::Divide, 40),
    binary("//", BinOp::FloorDivide, 40),
    binary("%", BinOp::Modulo, 40),
    binary("^", BinOp::Power, 50),
    GrammarEntry {
        symbol: "!",
        kind: EntryKind::Unary(UnaryOp::Not),
        precedence: UNARY_PRECEDENCE,
    },
];

/// Longest symbol of the table that `input` starts with. Word symbols
/// (`in`) are not matched here; see [`lookup_word`].
pub fn longest_symbol(input: &[char]) -> Option<&'static GrammarEntry> {
    GRAMMAR
        .iter()
        .filter(|entry| !is_word(entry.symbol))
        .filter(|entry| {
            let len = entry.symbol.chars().count();
            input.len() >= len && entry.symbol.chars().zip(input).all(|(a, b)| a == *b)
        })
        .max_by_key(|entry| entry.symbol.len())
}

/// Grammar entry for a whole word such as `in`.
pub fn lookup_word(word: &str) -> Option<&'static GrammarEntry> {
    GRAMMAR
        .iter()
        .find(|entry| is_word(entry.symbol) && entry.symbol == word)
}

fn is_word(symbol: &str) -> bool {
    symbol.chars().all(|c| c.is_ascii_alphabetic())
}

impl BinOp {
    pub fn symbol(self) -> &'static str {
        self.entry().map(|entry| entry.symbol).unwrap_or("?")
    }

    pub fn precedence(self) -> u16 {
        self.entry().map(|entry| entry.precedence).unwrap_or(0)
    }

    fn entry(self) -> Option<&'static GrammarEntry> {
        GRAMMAR
            .iter()
            .find(|entry| entry.kind == EntryKind::Binary(self))
    }

    /// Applies the operator to two already evaluated operands.
    ///
    /// `&&` and `||` are listed for completeness; the evaluator
    /// short-circuits them before both sides are known.
    pub fn apply(self, left: &Value, right: &Value) -> Result<Value, EvalError> {
        match self {
            BinOp::Or => Ok(if left.is_truthy() { left } else { right }.clone()),
            BinOp::And => Ok(if left.is_truthy() { right } else { left }.clone()),
            BinOp::Equal => Ok(Value::Boolean(loose_eq(left, right))),
            BinOp::NotEqual => Ok(Value::Boolean(!loose_eq(left, right))),
            BinOp::LessThan
            | BinOp::LessEqual
            | BinOp::GreaterThan
            | BinOp::GreaterEqual => compare(self, left, right),
            BinOp::In => membership(left, right),
            BinOp::Add if is_concatenation(left, right) => concatenate(left, right),
            BinOp::Add
            | BinOp::Subtract
            | BinOp::Multiply
            | BinOp::Divide
            | BinOp::FloorDivide
            | BinOp::Modulo
            | BinOp::Power => arithmetic(self, left, right),
        }
    }
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Not => "!",
            UnaryOp::Negate => "-",
        }
    }

    pub fn apply(self, operand: &Value) -> Result<Value, EvalError> {
        match (self, operand) {
            (UnaryOp::Not, v) => Ok(Value::Boolean(!v.is_truthy())),
            (UnaryOp::Negate, Value::Integer(n)) => Ok(n
                .checked_neg()
                .map(Value::Integer)
                .unwrap_or(Value::Float(-(*n as f64)))),
            (UnaryOp::Negate, Value::Float(n)) => Ok(Value::Float(-n)),
            (UnaryOp::Negate, v) => Err(EvalError::TypeError(format!(
                "Cannot negate {}",
                v.type_name()
            ))),
        }
    }
}

// ========================================
// Token adjacency
// ========================================

/// Tokens after which an operand is complete: literals, identifiers and
/// closing brackets.
pub fn ends_operand(kind: &TokenKind) -> bool {
    kind.is_literal()
        || matches!(
            kind,
            TokenKind::Identifier(_)
                | TokenKind::Punct(Punct::RParen | Punct::RBracket | Punct::RBrace)
        )
}

fn starts_operand(kind: &TokenKind) -> bool {
    kind.is_literal()
        || matches!(
            kind,
            TokenKind::Identifier(_)
                | TokenKind::Unary(_)
                | TokenKind::Punct(Punct::LParen | Punct::LBracket | Punct::LBrace | Punct::Dot)
        )
}

/// Whether `next` may immediately follow `prev` (`None` is the start of
/// input).
pub fn can_follow(prev: Option<&TokenKind>, next: &TokenKind) -> bool {
    match prev {
        Some(TokenKind::Punct(Punct::Dot | Punct::Pipe)) => {
            matches!(next, TokenKind::Identifier(_))
        }
        Some(prev) if ends_operand(prev) => match next {
            TokenKind::Binary(_) => true,
            // `name(` only occurs after a transform name; the parser
            // rejects it anywhere else.
            TokenKind::Punct(Punct::LParen) => matches!(prev, TokenKind::Identifier(_)),
            TokenKind::Punct(Punct::LBrace) => false,
            TokenKind::Punct(_) => true,
            _ => false,
        },
        Some(TokenKind::Punct(Punct::LBracket)) if next.is_punct(Punct::RBracket) => true,
        Some(TokenKind::Punct(Punct::LBrace)) if next.is_punct(Punct::RBrace) => true,
        Some(TokenKind::Punct(Punct::LParen)) if next.is_punct(Punct::RParen) => true,
        _ => starts_operand(next),
    }
}

/// Description of what may follow `prev`, for error messages.
pub fn expected_after(prev: Option<&TokenKind>) -> &'static str {
    match prev {
        Some(TokenKind::Punct(Punct::Dot)) => "a property name",
        Some(TokenKind::Punct(Punct::Pipe)) => "a transform name",
        Some(prev) if ends_operand(prev) => "an operator or the end of the expression",
        _ => "an operand",
    }
}

// ========================================
// Elementary evaluation rules
// ========================================

/// Structural equality; integers and floats compare by numeric value.
pub fn loose_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Integer(a), Value::Float(b)) | (Value::Float(b), Value::Integer(a)) => {
            (*a as f64) == *b
        }
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| loose_eq(x, y))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(key, x)| b.get(key).is_some_and(|y| loose_eq(x, y)))
        }
        (a, b) => a == b,
    }
}

fn compare(op: BinOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    let ordering = match (left, right) {
        // Absent values never order against anything
        (Value::Null, _) | (_, Value::Null) => return Ok(Value::Boolean(false)),
        (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (a, b) if a.is_number() && b.is_number() => match (a.as_float(), b.as_float()) {
            (Some(x), Some(y)) => x.partial_cmp(&y),
            _ => None,
        },
        (a, b) => {
            return Err(EvalError::TypeError(format!(
                "Cannot compare {} {} {}",
                a.type_name(),
                op.symbol(),
                b.type_name()
            )));
        }
    };

    let result = match ordering {
        // NaN
        None => false,
        Some(ordering) => match op {
            BinOp::LessThan => ordering == Ordering::Less,
            BinOp::LessEqual => ordering != Ordering::Greater,
            BinOp::GreaterThan => ordering == Ordering::Greater,
            BinOp::GreaterEqual => ordering != Ordering::Less,
            _ => false,
        },
    };
    Ok(Value::Boolean(result))
}

fn membership(needle: &Value, haystack: &Value) -> Result<Value, EvalError> {
    let found = match (needle, haystack) {
        (_, Value::Null) => false,
        (_, Value::Array(items)) => items.iter().any(|item| loose_eq(needle, item)),
        (Value::Array(_) | Value::Object(_), _) => {
            return Err(EvalError::TypeError(format!(
                "Cannot search for {} in {}",
                needle.type_name(),
                haystack.type_name()
            )));
        }
        (_, Value::String(s)) => s.contains(&needle.to_display_string()),
        (_, Value::Object(map)) => map.contains_key(&needle.to_display_string()),
        (_, other) => {
            return Err(EvalError::TypeError(format!(
                "'in' requires a string, array or object on the right, got {}",
                other.type_name()
            )));
        }
    };
    Ok(Value::Boolean(found))
}

fn is_concatenation(left: &Value, right: &Value) -> bool {
    matches!(left, Value::String(_)) || matches!(right, Value::String(_))
}

fn concatenate(left: &Value, right: &Value) -> Result<Value, EvalError> {
    for v in [left, right] {
        if matches!(v, Value::Array(_) | Value::Object(_)) {
            return Err(EvalError::TypeError(format!(
                "Cannot concatenate {} with a string",
                v.type_name()
            )));
        }
    }
    Ok(Value::String(format!(
        "{}{}",
        left.to_display_string(),
        right.to_display_string()
    )))
}

fn arithmetic(op: BinOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    match (left, right) {
        (Value::Integer(a), Value::Integer(b)) => integer_arithmetic(op, *a, *b),
        (Value::Float(a), Value::Float(b)) => float_arithmetic(op, *a, *b),
        (Value::Integer(_), Value::Float(_)) | (Value::Float(_), Value::Integer(_)) => {
            mixed_arithmetic(op, left, right)
        }
        (a, b) => Err(EvalError::TypeError(format!(
            "Cannot apply '{}' to {} and {}",
            op.symbol(),
            a.type_name(),
            b.type_name()
        ))),
    }
}

fn integer_arithmetic(op: BinOp, a: i64, b: i64) -> Result<Value, EvalError> {
    if b == 0 && matches!(op, BinOp::Divide | BinOp::FloorDivide | BinOp::Modulo) {
        return Err(EvalError::DivisionByZero);
    }

    let exact = match op {
        BinOp::Add => a.checked_add(b),
        BinOp::Subtract => a.checked_sub(b),
        BinOp::Multiply => a.checked_mul(b),
        // Inexact quotients become floats
        BinOp::Divide if a.checked_rem(b).is_some_and(|r| r != 0) => {
            return Ok(Value::Float(a as f64 / b as f64));
        }
        BinOp::Divide => a.checked_div(b),
        BinOp::FloorDivide => a.checked_div(b).map(|q| {
            if (a % b != 0) && ((a < 0) != (b < 0)) {
                q - 1
            } else {
                q
            }
        }),
        BinOp::Modulo => Some(a.checked_rem(b).unwrap_or(0)),
        BinOp::Power => u32::try_from(b).ok().and_then(|exp| a.checked_pow(exp)),
        _ => None,
    };

    match exact {
        Some(n) => Ok(Value::Integer(n)),
        // Overflow or negative exponent
        None => float_arithmetic(op, a as f64, b as f64),
    }
}

fn float_arithmetic(op: BinOp, a: f64, b: f64) -> Result<Value, EvalError> {
    if b == 0.0 && matches!(op, BinOp::Divide | BinOp::FloorDivide | BinOp::Modulo) {
        return Err(EvalError::DivisionByZero);
    }

    let result = match op {
        BinOp::Add => a + b,
        BinOp::Subtract => a - b,
        BinOp::Multiply => a * b,
        BinOp::Divide => a / b,
        BinOp::FloorDivide => {
            let q = (a / b).floor();
            if q.is_finite() && q.abs() < i64::MAX as f64 {
                return Ok(Value::Integer(q as i64));
            }
            q
        }
        BinOp::Modulo => a % b,
        BinOp::Power => a.powf(b),
        _ => {
            return Err(EvalError::TypeError(format!(
                "'{}' is not an arithmetic operator",
                op.symbol()
            )));
        }
    };
    Ok(Value::Float(result))
}

/// Integer/float mixes are computed in exact decimal so that `100 * 1.1`
/// is `110`, falling back to f64 when decimal cannot represent the values.
fn mixed_arithmetic(op: BinOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    let (Some(a), Some(b)) = (left.as_float(), right.as_float()) else {
        return Err(EvalError::TypeError(format!(
            "Cannot apply '{}' to {} and {}",
            op.symbol(),
            left.type_name(),
            right.type_name()
        )));
    };
    if b == 0.0 && matches!(op, BinOp::Divide | BinOp::FloorDivide | BinOp::Modulo) {
        return Err(EvalError::DivisionByZero);
    }

    if let Some(x) = to_decimal(left)
        && let Some(y) = to_decimal(right)
        && let Some(rd) = decimal_arithmetic(op, x, y)
    {
        if rd.is_integer()
            && let Some(n) = rd.to_i64()
        {
            return Ok(Value::Integer(n));
        } else if let Some(f) = rd.to_f64() {
            return Ok(Value::Float(f));
        }
    }

    float_arithmetic(op, a, b)
}

/// Exact decimal form of a number, or `None` when the conversion would
/// lose the value (magnitudes below decimal's 28-digit scale round to zero).
fn to_decimal(v: &Value) -> Option<Decimal> {
    match v {
        Value::Integer(n) => Some(Decimal::from(*n)),
        Value::Float(n) => Decimal::from_f64(*n).filter(|d| d.to_f64() == Some(*n)),
        _ => None,
    }
}

fn decimal_arithmetic(op: BinOp, a: Decimal, b: Decimal) -> Option<Decimal> {
    match op {
        BinOp::Add => a.checked_add(b),
        BinOp::Subtract => a.checked_sub(b),
        BinOp::Multiply => a.checked_mul(b),
        BinOp::Divide => a.checked_div(b),
        BinOp::FloorDivide => a.checked_div(b).map(|q| q.floor()),
        BinOp::Modulo => a.checked_rem(b),
        _ => None,
    }
}
