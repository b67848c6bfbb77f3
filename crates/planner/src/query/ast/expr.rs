use model::core::value::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A table or column name, rendered exactly as configured.
    Identifier(String),
    /// A bound value; rendering emits a placeholder and records the value.
    Value(Value),
    /// A positional placeholder whose value is supplied at execution time.
    Placeholder,
    /// Raw SQL text, rendered verbatim.
    Literal(String),
    BinaryOp(Box<BinaryOp>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryOp {
    pub left: Expr,
    pub op: BinaryOperator,
    pub right: Expr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Eq,
    GtEq,
    Lt,
    And,
}

impl BinaryOperator {
    pub fn as_sql(&self) -> &'static str {
        match self {
            BinaryOperator::Eq => "=",
            BinaryOperator::GtEq => ">=",
            BinaryOperator::Lt => "<",
            BinaryOperator::And => "AND",
        }
    }
}

impl Expr {
    pub fn binary(left: Expr, op: BinaryOperator, right: Expr) -> Expr {
        Expr::BinaryOp(Box::new(BinaryOp { left, op, right }))
    }

    pub fn and(self, other: Expr) -> Expr {
        Expr::binary(self, BinaryOperator::And, other)
    }
}
