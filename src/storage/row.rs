//! Row representation
//!
//! A row is either a plain value vector owned by its table, or a handle to an
//! externally owned record implementing [`RowSource`].

use crate::types::Value;
use std::fmt;
use std::sync::Arc;

/// Accessor capability for rows whose storage lives outside the table.
///
/// Implementors map column indices onto their own fields. Columns the host
/// type does not know should read as `Value::Null` and ignore writes.
pub trait RowSource: Send + Sync {
    fn get(&self, column: usize) -> Value;

    fn set(&self, column: usize, value: Value);

    /// Called when the owning table grows a column at `column`. Host types
    /// have a fixed shape, so the default ignores it.
    fn add_column(&self, column: usize, default: Value) {
        let _ = (column, default);
    }
}

#[derive(Clone)]
pub enum Row {
    Owned(Vec<Value>),
    Linked(Arc<dyn RowSource>),
}

impl Row {
    pub(crate) fn with_width(width: usize) -> Self {
        Row::Owned(vec![Value::Null; width])
    }

    pub fn get(&self, column: usize) -> Value {
        match self {
            Row::Owned(values) => values.get(column).cloned().unwrap_or(Value::Null),
            Row::Linked(source) => source.get(column),
        }
    }

    pub(crate) fn set(&mut self, column: usize, value: Value) {
        match self {
            Row::Owned(values) => {
                if column >= values.len() {
                    values.resize(column + 1, Value::Null);
                }
                values[column] = value;
            }
            Row::Linked(source) => source.set(column, value),
        }
    }

    pub(crate) fn add_column(&mut self, column: usize, default: Value) {
        match self {
            Row::Owned(values) => values.push(default),
            Row::Linked(source) => source.add_column(column, default),
        }
    }

    pub fn is_linked(&self) -> bool {
        matches!(self, Row::Linked(_))
    }
}

impl fmt::Debug for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Row::Owned(values) => f.debug_tuple("Owned").field(values).finish(),
            Row::Linked(_) => f.write_str("Linked(..)"),
        }
    }
}
