/// Expression evaluator - evaluates expressions against a table row
use super::ast::{BinaryOperator, Expr, UnaryOperator};
use crate::error::{PocketError, Result};
use crate::storage::Table;
use crate::types::{TypeTag, Value};
use std::cmp::Ordering;

/// Evaluates expressions in the context of an optional table.
///
/// Without a table (or without a row index) column references are a
/// processing fault, which is how constant expressions such as column
/// defaults are folded.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExprEvaluator<'a> {
    table: Option<&'a Table>,
}

impl<'a> ExprEvaluator<'a> {
    pub fn new() -> Self {
        Self { table: None }
    }

    pub fn with_table(table: &'a Table) -> Self {
        Self { table: Some(table) }
    }

    /// Evaluate an expression against row `row` of the context table
    pub fn eval(&self, expr: &Expr, row: Option<usize>) -> Result<Value> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),

            Expr::Column(name) => {
                let table = self.table.ok_or_else(|| {
                    PocketError::Processing(format!("Column \"{}\" referenced without a table", name))
                })?;
                let idx = table
                    .column_index(name)
                    .ok_or_else(|| PocketError::Processing(format!("No such column: {}", name)))?;
                let row = row.ok_or_else(|| {
                    PocketError::Processing(format!("Column \"{}\" referenced outside of a row", name))
                })?;
                Ok(table.get_cell(row, idx))
            }

            Expr::Unary { op, expr } => {
                let value = self.eval(expr, row)?;
                self.eval_unary_op(*op, value)
            }

            Expr::BinaryOp { left, op, right } => {
                let left = self.eval(left, row)?;
                let right = self.eval(right, row)?;
                self.eval_binary_op(*op, left, right)
            }

            Expr::Function { name, args } => {
                if !name.eq_ignore_ascii_case("COALESCE") {
                    return Err(PocketError::internal(format!("Unknown SQL function: {}", name)));
                }
                for arg in args {
                    let value = self.eval(arg, row)?;
                    if !value.is_null() {
                        return Ok(value);
                    }
                }
                Ok(Value::Null)
            }

            Expr::In { .. } => Err(PocketError::internal("IN expression not implemented")),
        }
    }

    /// Declared type of the values an expression produces
    pub fn static_type(&self, expr: &Expr) -> Result<TypeTag> {
        match expr {
            Expr::Literal(value) => Ok(value.type_tag()),
            Expr::Column(name) => self
                .table
                .and_then(|t| t.column_index(name).and_then(|idx| t.column(idx)))
                .map(|c| c.type_tag)
                .ok_or_else(|| PocketError::Processing(format!("No such column: {}", name))),
            Expr::Unary { op, expr } => match op {
                UnaryOperator::Negate => self.static_type(expr),
                UnaryOperator::Not | UnaryOperator::NotNull | UnaryOperator::IsNull => Ok(TypeTag::Integer),
            },
            Expr::BinaryOp { left, op, right } => match op {
                BinaryOperator::Concat => Ok(TypeTag::Text),
                BinaryOperator::Add
                | BinaryOperator::Sub
                | BinaryOperator::Mul
                | BinaryOperator::Div
                | BinaryOperator::Mod => {
                    let both_integer = self.static_type(left)? == TypeTag::Integer
                        && self.static_type(right)? == TypeTag::Integer;
                    Ok(if both_integer { TypeTag::Integer } else { TypeTag::Real })
                }
                _ => Ok(TypeTag::Integer),
            },
            Expr::Function { name, .. } => Err(PocketError::internal(format!(
                "Type of function {} not implemented",
                name
            ))),
            Expr::In { .. } => Ok(TypeTag::Integer),
        }
    }

    fn eval_unary_op(&self, op: UnaryOperator, value: Value) -> Result<Value> {
        match op {
            UnaryOperator::Not => Ok(flag(!value.to_bool())),
            UnaryOperator::NotNull => Ok(flag(!value.is_null())),
            UnaryOperator::IsNull => Ok(flag(value.is_null())),
            UnaryOperator::Negate => match value {
                Value::Null => Ok(Value::Null),
                Value::Integer(i) => Ok(Value::Integer(i.wrapping_neg())),
                Value::Real(r) => Ok(Value::Real(-r)),
                Value::Text(ref s) => match s.parse::<i64>() {
                    Ok(i) => Ok(Value::Integer(i.wrapping_neg())),
                    Err(_) => Ok(Value::Real(-value.to_f64()?)),
                },
                Value::Blob(_) => Ok(Value::Integer(0)),
            },
        }
    }

    fn eval_binary_op(&self, op: BinaryOperator, left: Value, right: Value) -> Result<Value> {
        match op {
            BinaryOperator::Concat => {
                if left.is_null() || right.is_null() {
                    Ok(Value::Null)
                } else {
                    Ok(Value::Text(format!("{}{}", left.as_string(), right.as_string())))
                }
            }
            BinaryOperator::Eq => Ok(flag(is_equal(&left, &right))),
            BinaryOperator::Ne => Ok(flag(!is_equal(&left, &right))),
            BinaryOperator::And => Ok(flag(left.to_bool() && right.to_bool())),
            BinaryOperator::Or => Ok(flag(left.to_bool() || right.to_bool())),
            BinaryOperator::Lt => Ok(flag(is_lesser(&left, &right)?)),
            BinaryOperator::Le => Ok(flag(is_lesser(&left, &right)? || is_equal(&left, &right))),
            BinaryOperator::Gt => Ok(flag(is_greater(&left, &right)?)),
            BinaryOperator::Ge => Ok(flag(is_greater(&left, &right)? || is_equal(&left, &right))),

            BinaryOperator::Add => self.arithmetic(left, right, i64::checked_add, |l, r| l + r),
            BinaryOperator::Sub => self.arithmetic(left, right, i64::checked_sub, |l, r| l - r),
            BinaryOperator::Mul => self.arithmetic(left, right, i64::checked_mul, |l, r| l * r),
            BinaryOperator::Div => self.div_values(left, right),
            BinaryOperator::Mod => self.mod_values(left, right),
            BinaryOperator::ShiftLeft => self.shift_values(left, right, true),
            BinaryOperator::ShiftRight => self.shift_values(left, right, false),
        }
    }

    // Helper functions

    /// Integer arithmetic when both sides are integers and the result fits,
    /// real arithmetic otherwise. Null on either side yields null.
    fn arithmetic(
        &self,
        left: Value,
        right: Value,
        int_op: fn(i64, i64) -> Option<i64>,
        real_op: fn(f64, f64) -> f64,
    ) -> Result<Value> {
        match (&left, &right) {
            (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
            (Value::Integer(l), Value::Integer(r)) => match int_op(*l, *r) {
                Some(v) => Ok(Value::Integer(v)),
                None => Ok(Value::Real(real_op(*l as f64, *r as f64))),
            },
            _ => Ok(Value::Real(real_op(left.to_f64()?, right.to_f64()?))),
        }
    }

    fn div_values(&self, left: Value, right: Value) -> Result<Value> {
        match (&left, &right) {
            (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
            (Value::Integer(_), Value::Integer(0)) => Ok(Value::Null),
            (Value::Integer(l), Value::Integer(r)) => Ok(l
                .checked_div(*r)
                .map(Value::Integer)
                .unwrap_or(Value::Real(*l as f64 / *r as f64))),
            _ => {
                let divisor = right.to_f64()?;
                if divisor == 0.0 {
                    return Ok(Value::Null);
                }
                Ok(Value::Real(left.to_f64()? / divisor))
            }
        }
    }

    fn mod_values(&self, left: Value, right: Value) -> Result<Value> {
        match (&left, &right) {
            (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
            (Value::Integer(_), Value::Integer(0)) => Ok(Value::Null),
            (Value::Integer(l), Value::Integer(r)) => Ok(Value::Integer(l.wrapping_rem(*r))),
            _ => {
                let divisor = right.to_f64()?;
                if divisor == 0.0 {
                    return Ok(Value::Null);
                }
                Ok(Value::Real(left.to_f64()? % divisor))
            }
        }
    }

    fn shift_values(&self, left: Value, right: Value, to_left: bool) -> Result<Value> {
        if left.is_null() || right.is_null() {
            return Ok(Value::Null);
        }
        let value = force_i64(&left)?;
        let amount = force_i64(&right)?;
        let (to_left, amount) = if amount < 0 {
            (!to_left, amount.unsigned_abs())
        } else {
            (to_left, amount as u64)
        };
        let shifted = match (to_left, amount) {
            (true, n) if n >= 64 => 0,
            (true, n) => value.wrapping_shl(n as u32),
            (false, n) if n >= 64 => {
                if value < 0 {
                    -1
                } else {
                    0
                }
            }
            (false, n) => value >> n,
        };
        Ok(Value::Integer(shifted))
    }
}

fn flag(b: bool) -> Value {
    Value::Integer(if b { 1 } else { 0 })
}

fn force_i64(value: &Value) -> Result<i64> {
    match value {
        Value::Integer(i) => Ok(*i),
        other => Ok(other.to_f64()?.trunc() as i64),
    }
}

/// Equality within a coercion class. Null equals nothing, not even null.
pub fn is_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::Integer(l), Value::Integer(r)) => l == r,
        (Value::Real(l), Value::Real(r)) => l == r,
        (Value::Integer(l), Value::Real(r)) => (*l as f64) == *r,
        (Value::Real(l), Value::Integer(r)) => *l == (*r as f64),
        (Value::Text(l), Value::Text(r)) => l == r,
        (Value::Blob(l), Value::Blob(r)) => l == r,
        _ => false,
    }
}

/// Strict "less than" across kinds: null < numbers < text < blobs.
///
/// Pairings outside that order fall back to comparing as doubles, which
/// fails for text that does not read as a number.
pub fn is_lesser(left: &Value, right: &Value) -> Result<bool> {
    match (left, right) {
        (Value::Null, _) => Ok(true),
        (_, Value::Null) => Ok(false),
        (Value::Integer(_) | Value::Real(_), Value::Text(_) | Value::Blob(_)) => Ok(true),
        (Value::Text(_), Value::Blob(_)) => Ok(true),
        (Value::Text(l), Value::Text(r)) => Ok(l < r),
        (Value::Blob(l), Value::Blob(r)) => Ok(compare_blobs(l, r) == Ordering::Less),
        (Value::Integer(l), Value::Integer(r)) => Ok(l < r),
        _ => Ok(left.to_f64()? < right.to_f64()?),
    }
}

/// Strict "greater than" across kinds: blobs > text > numbers > null.
pub fn is_greater(left: &Value, right: &Value) -> Result<bool> {
    match (left, right) {
        (Value::Null, _) => Ok(false),
        (_, Value::Null) => Ok(true),
        (Value::Text(_) | Value::Blob(_), Value::Integer(_) | Value::Real(_)) => Ok(true),
        (Value::Blob(_), Value::Text(_)) => Ok(true),
        (Value::Text(l), Value::Text(r)) => Ok(l > r),
        (Value::Blob(l), Value::Blob(r)) => Ok(compare_blobs(l, r) == Ordering::Greater),
        (Value::Integer(l), Value::Integer(r)) => Ok(l > r),
        _ => Ok(left.to_f64()? > right.to_f64()?),
    }
}

/// Shorter blobs order first; equal lengths compare byte by byte.
fn compare_blobs(left: &[u8], right: &[u8]) -> Ordering {
    left.len().cmp(&right.len()).then_with(|| left.cmp(right))
}
