/// Expression tree built while parsing
use crate::types::Value;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Constant, including bound parameters resolved at parse time
    Literal(Value),

    /// Column reference by name
    Column(String),

    Unary {
        op: UnaryOperator,
        expr: Box<Expr>,
    },

    BinaryOp {
        left: Box<Expr>,
        op: BinaryOperator,
        right: Box<Expr>,
    },

    /// Function call: only `COALESCE` is known to the evaluator
    Function {
        name: String,
        args: Vec<Expr>,
    },

    /// `expr [NOT] IN (...)` with the parenthesized list kept as raw token text
    In {
        expr: Box<Expr>,
        list: String,
        negated: bool,
    },
}

impl Expr {
    pub fn binary(left: Expr, op: BinaryOperator, right: Expr) -> Self {
        Expr::BinaryOp {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    pub fn unary(op: UnaryOperator, expr: Expr) -> Self {
        Expr::Unary {
            op,
            expr: Box::new(expr),
        }
    }

    /// Name given to a projected column: the canonical text, minus one
    /// enclosing parenthesis pair.
    pub fn column_label(&self) -> String {
        let text = self.to_string();
        if text.starts_with('(') && text.ends_with(')') && closing_paren(&text) == Some(text.len() - 1) {
            text[1..text.len() - 1].to_string()
        } else {
            text
        }
    }
}

/// Byte offset of the parenthesis closing the one at offset 0.
fn closing_paren(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut quoted = false;
    for (offset, ch) in text.char_indices() {
        match ch {
            '\'' => quoted = !quoted,
            '(' if !quoted => depth += 1,
            ')' if !quoted => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(offset);
                }
            }
            _ => {}
        }
    }
    None
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Concat,
    Eq,
    Ne,
    And,
    Or,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    ShiftLeft,
    ShiftRight,
}

impl BinaryOperator {
    /// Binding strength (higher binds tighter)
    pub fn precedence(&self) -> u8 {
        match self {
            BinaryOperator::And => 1,
            BinaryOperator::Or => 2,
            BinaryOperator::Eq | BinaryOperator::Ne => 3,
            BinaryOperator::Lt | BinaryOperator::Le | BinaryOperator::Gt | BinaryOperator::Ge => 4,
            BinaryOperator::ShiftLeft | BinaryOperator::ShiftRight => 5,
            BinaryOperator::Add | BinaryOperator::Sub => 6,
            BinaryOperator::Mul | BinaryOperator::Div | BinaryOperator::Mod => 7,
            BinaryOperator::Concat => 8,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOperator::Concat => "||",
            BinaryOperator::Eq => "==",
            BinaryOperator::Ne => "!=",
            BinaryOperator::And => "AND",
            BinaryOperator::Or => "OR",
            BinaryOperator::Lt => "<",
            BinaryOperator::Le => "<=",
            BinaryOperator::Gt => ">",
            BinaryOperator::Ge => ">=",
            BinaryOperator::Add => "+",
            BinaryOperator::Sub => "-",
            BinaryOperator::Mul => "*",
            BinaryOperator::Div => "/",
            BinaryOperator::Mod => "%",
            BinaryOperator::ShiftLeft => "<<",
            BinaryOperator::ShiftRight => ">>",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Not,
    Negate,
    NotNull,
    IsNull,
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(Value::Text(s)) => write!(f, "'{}'", s),
            Expr::Literal(v) => write!(f, "{}", v),
            Expr::Column(name) => f.write_str(name),
            Expr::Unary { op, expr } => match op {
                UnaryOperator::Not => write!(f, "NOT ({})", expr),
                UnaryOperator::Negate => write!(f, "-({})", expr),
                UnaryOperator::NotNull => write!(f, "({}) NOT NULL", expr),
                UnaryOperator::IsNull => write!(f, "({}) ISNULL", expr),
            },
            Expr::BinaryOp { left, op, right } => write!(f, "({} {} {})", left, op.symbol(), right),
            Expr::Function { name, args } => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                f.write_str(")")
            }
            Expr::In { expr, list, negated } => {
                let not = if *negated { "NOT " } else { "" };
                write!(f, "{} {}IN ({})", expr, not, list)
            }
        }
    }
}
