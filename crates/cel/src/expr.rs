use serde::{Deserialize, Serialize};

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    /// Logical negation (`!expr`).
    Not,
    /// Arithmetic negation (`-expr`).
    Neg,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,

    // Comparison
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,

    // Logical (short-circuit)
    And,
    Or,

    // Strings and collections
    Contains,
    StartsWith,
    EndsWith,
    Matches,
    In,
}

/// The parsed expression tree.
///
/// Trees are serialisable so compiled rules can be inspected and
/// round-tripped through JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Expr {
    /// The null literal.
    Null,
    /// A boolean literal.
    Bool(bool),
    /// A 64-bit signed integer literal.
    Int(i64),
    /// A 64-bit floating-point literal.
    Float(f64),
    /// A string literal.
    String(String),
    /// A list literal.
    List(Vec<Expr>),
    /// A map literal with string keys.
    Map(Vec<(String, Expr)>),
    /// A variable reference.
    Ident(String),
    /// Field access: `expr.field`.
    Field(Box<Expr>, String),
    /// Index access: `expr[index]`.
    Index(Box<Expr>, Box<Expr>),
    /// A unary operation.
    Unary(UnaryOp, Box<Expr>),
    /// A binary operation.
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    /// A conditional: `cond ? then : else`.
    Ternary(Box<Expr>, Box<Expr>, Box<Expr>),
    /// A builtin function call.
    Call(String, Vec<Expr>),
}

impl Expr {
    /// Returns `true` if this expression is a literal value.
    #[must_use]
    pub fn is_constant(&self) -> bool {
        matches!(
            self,
            Self::Null | Self::Bool(_) | Self::Int(_) | Self::Float(_) | Self::String(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constants() {
        assert!(Expr::Null.is_constant());
        assert!(Expr::Int(3).is_constant());
        assert!(!Expr::Ident("alert_id".into()).is_constant());
        assert!(!Expr::List(vec![Expr::Int(1)]).is_constant());
    }

    #[test]
    fn expr_serde_roundtrip() {
        let expr = Expr::Binary(
            BinaryOp::Eq,
            Box::new(Expr::Index(
                Box::new(Expr::Ident("alert_labels".into())),
                Box::new(Expr::String("severity".into())),
            )),
            Box::new(Expr::String("critical".into())),
        );
        let json = serde_json::to_string(&expr).unwrap();
        let back: Expr = serde_json::from_str(&json).unwrap();
        assert_eq!(format!("{expr:?}"), format!("{back:?}"));
    }
}
