use crate::ast::{BinOp, UnaryOp};
use crate::value::Value;

/// Abstract Syntax Tree node representing a parsed expression.
///
/// The parser builds the tree bottom-up and never mutates a node after it
/// has been placed, so a finished `Expr` can be shared and evaluated any
/// number of times.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Literal value
    ///
    /// # Examples
    /// ```text
    /// 42
    /// "release"
    /// true
    /// ```
    Literal(Value),

    /// Identifier lookup
    ///
    /// Without `from` the name is looked up in the context (or, when
    /// `relative`, in the element currently tested by the enclosing filter).
    /// With `from` it is an attribute of the value `from` evaluates to.
    ///
    /// # Examples
    /// ```text
    /// normandy                      // Identifier { name: "normandy", from: None }
    /// normandy.channel              // Identifier { name: "channel", from: Some(normandy) }
    /// addons[.id == "x"]            // `.id` is relative
    /// ```
    Identifier {
        name: String,
        from: Option<Box<Expr>>,
        relative: bool,
    },

    /// Binary operation (arithmetic, comparison, logical, membership)
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// Prefix operation
    ///
    /// # Examples
    /// ```text
    /// !normandy.isFirstRun
    /// -1
    /// ```
    Unary { op: UnaryOp, operand: Box<Expr> },

    /// Ternary conditional; only the chosen branch is evaluated
    ///
    /// # Example
    /// ```text
    /// normandy.channel == "beta" ? 0.5 : 0.1
    /// ```
    Conditional {
        test: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
    },

    /// Array literal
    ///
    /// # Example
    /// ```text
    /// [normandy.userId, normandy.recipe.id]
    /// ```
    Array(Vec<Expr>),

    /// Object literal; entries keep source order
    ///
    /// # Example
    /// ```text
    /// {channel: normandy.channel, "min-version": 60}
    /// ```
    Object(Vec<(String, Expr)>),

    /// Filter or subscript
    ///
    /// A `relative` filter keeps the elements of `subject` for which
    /// `predicate` is truthy. Otherwise `predicate` is evaluated once and used
    /// as an index or key.
    ///
    /// # Examples
    /// ```text
    /// addons[.type == "extension"]  // relative
    /// locales[0]                    // static
    /// prefs["browser.startup"]      // static
    /// ```
    Filter {
        subject: Box<Expr>,
        predicate: Box<Expr>,
        relative: bool,
    },

    /// Transform application
    ///
    /// # Examples
    /// ```text
    /// normandy.userId|stableSample(0.1)
    /// normandy.addons|keys
    /// ```
    Transform {
        subject: Box<Expr>,
        name: String,
        args: Vec<Expr>,
    },
}

impl Expr {
    pub fn literal(value: impl Into<Value>) -> Self {
        Expr::Literal(value.into())
    }

    pub fn identifier(name: impl Into<String>) -> Self {
        Expr::Identifier {
            name: name.into(),
            from: None,
            relative: false,
        }
    }

    pub fn relative(name: impl Into<String>) -> Self {
        Expr::Identifier {
            name: name.into(),
            from: None,
            relative: true,
        }
    }

    pub fn attribute(from: Expr, name: impl Into<String>) -> Self {
        Expr::Identifier {
            name: name.into(),
            from: Some(Box::new(from)),
            relative: false,
        }
    }

    pub fn binary(op: BinOp, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        Expr::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    /// Number of nodes on the longest path from this node to a leaf.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut pending = vec![(self, 1)];
        while let Some((expr, depth)) = pending.pop() {
            deepest = deepest.max(depth);
            pending.extend(expr.children().into_iter().map(|child| (child, depth + 1)));
        }
        deepest
    }

    fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::Literal(_) => vec![],
            Expr::Identifier { from, .. } => from.iter().map(|from| &**from).collect(),
            Expr::Binary { left, right, .. } => vec![&**left, &**right],
            Expr::Unary { operand, .. } => vec![&**operand],
            Expr::Conditional {
                test,
                consequent,
                alternate,
            } => vec![&**test, &**consequent, &**alternate],
            Expr::Array(elements) => elements.iter().collect(),
            Expr::Object(entries) => entries.iter().map(|(_, value)| value).collect(),
            Expr::Filter {
                subject, predicate, ..
            } => vec![&**subject, &**predicate],
            Expr::Transform { subject, args, .. } => {
                let mut children = vec![&**subject];
                children.extend(args);
                children
            }
        }
    }
}
