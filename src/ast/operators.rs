/// Binary operators.
///
/// Symbols and precedences live in the grammar table
/// ([`crate::grammar::GRAMMAR`]); evaluation rules in [`BinOp::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    // Logical
    /// Logical OR (`||`), yields the deciding operand
    Or,
    /// Logical AND (`&&`), yields the deciding operand
    And,

    // Comparison
    /// Equal (`==`)
    Equal,
    /// Not equal (`!=`)
    NotEqual,
    /// Less than (`<`)
    LessThan,
    /// Less than or equal (`<=`)
    LessEqual,
    /// Greater than (`>`)
    GreaterThan,
    /// Greater than or equal (`>=`)
    GreaterEqual,
    /// Membership (`in`): substring, array element or object key
    In,

    // Arithmetic
    /// Addition or string concatenation (`+`)
    Add,
    /// Subtraction (`-`)
    Subtract,
    /// Multiplication (`*`)
    Multiply,
    /// Division (`/`)
    Divide,
    /// Floor division (`//`)
    FloorDivide,
    /// Modulo (`%`)
    Modulo,
    /// Exponentiation (`^`)
    Power,
}

/// Prefix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// Logical negation (`!`)
    Not,
    /// Numeric negation (`-`)
    Negate,
}
