//! In-memory relation: typed columns over value rows
//!
//! Every write is coerced to the declared column type. Writing past the last
//! row back-fills synthesized rows so the row list never has holes.

use super::row::{Row, RowSource};
use crate::error::{PocketError, Result};
use crate::sql::ast::Expr;
use crate::sql::evaluator::ExprEvaluator;
use crate::types::{Column, ColumnFlags, TypeTag, Value};
use serde_json::{Map, Number};
use std::fmt;
use std::sync::Arc;

const NULL_TEXT: &str = "NULL";

#[derive(Debug, Clone, Default)]
pub struct Table {
    columns: Vec<Column>,
    rows: Vec<Row>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// One-column, one-row table, used for statement results.
    pub(crate) fn single(name: &str, type_tag: TypeTag, value: Value) -> Result<Self> {
        let mut table = Table::new();
        table.add_column(name, type_tag, ColumnFlags::EMPTY, Value::Null)?;
        table.set(0, 0, value)?;
        Ok(table)
    }

    /// No columns and a single empty row: the source of a SELECT without FROM.
    pub(crate) fn unit() -> Self {
        Self {
            columns: Vec::new(),
            rows: vec![Row::Owned(Vec::new())],
        }
    }

    /// Appends a column. Existing rows receive the coerced default.
    pub fn add_column(
        &mut self,
        name: &str,
        type_tag: TypeTag,
        flags: ColumnFlags,
        default: Value,
    ) -> Result<usize> {
        let column = Column::new(name, type_tag)
            .with_flags(flags)
            .with_default(default)?;
        Ok(self.push_column(column))
    }

    pub(crate) fn push_column(&mut self, column: Column) -> usize {
        let idx = self.columns.len();
        for row in &mut self.rows {
            row.add_column(idx, column.default.clone());
        }
        self.columns.push(column);
        idx
    }

    /// Writes a cell, coercing the value to the column type.
    pub fn set(&mut self, row: usize, column: usize, value: Value) -> Result<()> {
        let type_tag = self
            .columns
            .get(column)
            .map(|c| c.type_tag)
            .ok_or_else(|| PocketError::InvalidArgument(format!("Column index {} out of range", column)))?;
        let value = value.coerce(type_tag)?;
        while self.rows.len() <= row {
            let fresh = self.synthesize_row();
            self.rows.push(fresh);
        }
        self.rows[row].set(column, value);
        Ok(())
    }

    fn synthesize_row(&mut self) -> Row {
        let mut row = Row::with_width(self.columns.len());
        for (idx, column) in self.columns.iter_mut().enumerate() {
            if column.is_auto_increment() {
                row.set(idx, Value::Integer(column.take_auto_value()));
            } else if !column.default.is_null() {
                row.set(idx, column.default.clone());
            }
        }
        row
    }

    /// Appends an externally owned row. Its values are not coerced.
    pub fn link_row(&mut self, source: Arc<dyn RowSource>) {
        self.rows.push(Row::Linked(source));
    }

    /// Sources of all linked rows, in row order.
    pub fn linked_sources(&self) -> Vec<Arc<dyn RowSource>> {
        self.rows
            .iter()
            .filter_map(|row| match row {
                Row::Linked(source) => Some(source.clone()),
                Row::Owned(_) => None,
            })
            .collect()
    }

    /// Indices of rows for which `predicate` evaluates to integer 1, ascending.
    pub fn rows_where(&self, predicate: Option<&Expr>) -> Result<Vec<usize>> {
        let predicate = match predicate {
            Some(p) => p,
            None => return Ok((0..self.rows.len()).collect()),
        };
        let evaluator = ExprEvaluator::with_table(self);
        let mut matched = Vec::new();
        for idx in 0..self.rows.len() {
            if evaluator.eval(predicate, Some(idx))? == Value::Integer(1) {
                matched.push(idx);
            }
        }
        Ok(matched)
    }

    /// Projects and filters into a new table.
    ///
    /// `None` copies the full schema and the matching rows; linked rows are
    /// shared, not copied. Otherwise one column per expression is created,
    /// named after the expression's text and typed by its static type.
    pub fn extract(&self, columns: Option<&[Expr]>, predicate: Option<&Expr>) -> Result<Table> {
        let matched = self.rows_where(predicate)?;
        let mut sub = Table::new();

        let exprs = match columns {
            None => {
                for column in &self.columns {
                    sub.push_column(column.fresh_copy());
                }
                for idx in matched {
                    sub.rows.push(self.rows[idx].clone());
                }
                return Ok(sub);
            }
            Some(exprs) => exprs,
        };

        let evaluator = ExprEvaluator::with_table(self);
        let mut types = exprs
            .iter()
            .map(|expr| evaluator.static_type(expr))
            .collect::<Result<Vec<_>>>()?;
        let mut values = Vec::with_capacity(matched.len());
        for idx in matched {
            let row = exprs
                .iter()
                .map(|expr| evaluator.eval(expr, Some(idx)))
                .collect::<Result<Vec<_>>>()?;
            values.push(row);
        }
        // Integer arithmetic that overflowed came back real
        for (x, type_tag) in types.iter_mut().enumerate() {
            if *type_tag == TypeTag::Integer && values.iter().any(|row| matches!(row[x], Value::Real(_))) {
                *type_tag = TypeTag::Real;
            }
        }

        for (expr, type_tag) in exprs.iter().zip(types) {
            sub.add_column(&expr.column_label(), type_tag, ColumnFlags::EMPTY, Value::Null)?;
        }
        for (y, row) in values.into_iter().enumerate() {
            for (x, value) in row.into_iter().enumerate() {
                sub.set(y, x, value)?;
            }
        }
        Ok(sub)
    }

    /// Appends `other`'s columns, then its rows.
    ///
    /// Rows are matched onto columns by name, first match wins. Duplicate
    /// detection for `allow_duplicates == false` never finds a duplicate.
    pub fn union(&mut self, other: &Table, allow_duplicates: bool) -> Result<()> {
        for column in &other.columns {
            self.push_column(column.fresh_copy());
        }
        for idx in other.rows_where(None)? {
            if allow_duplicates || self.index_of(other, idx).is_none() {
                self.copy_row(other, idx)?;
            }
        }
        Ok(())
    }

    fn copy_row(&mut self, source: &Table, idx: usize) -> Result<()> {
        let target = self.rows.len();
        for (col, column) in source.columns.iter().enumerate() {
            if let Some(dest) = self.column_index(&column.name) {
                self.set(target, dest, source.get_cell(idx, col))?;
            }
        }
        Ok(())
    }

    // TODO: compare the candidate row against every row of this table once
    // UNION deduplication is wanted.
    fn index_of(&self, _other: &Table, _idx: usize) -> Option<usize> {
        None
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, idx: usize) -> Option<&Column> {
        self.columns.get(idx)
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_name(&self, idx: usize) -> Option<&str> {
        self.columns.get(idx).map(|c| c.name.as_str())
    }

    /// Index of the first column with the given name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// A table is empty when it has no rows, whatever its columns.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Raw cell value. Out-of-range cells read as null.
    pub fn get_cell(&self, row: usize, column: usize) -> Value {
        self.rows.get(row).map(|r| r.get(column)).unwrap_or(Value::Null)
    }

    pub fn is_null(&self, row: usize, column: usize) -> bool {
        self.get_cell(row, column).is_null()
    }

    pub fn get_int(&self, row: usize, column: usize) -> Result<i32> {
        self.get_cell(row, column).as_int()
    }

    pub fn get_long(&self, row: usize, column: usize) -> Result<i64> {
        self.get_cell(row, column).as_long()
    }

    pub fn get_double(&self, row: usize, column: usize) -> Result<f64> {
        self.get_cell(row, column).as_double()
    }

    pub fn get_string(&self, row: usize, column: usize) -> String {
        self.get_cell(row, column).as_string()
    }

    pub fn get_bool(&self, row: usize, column: usize) -> Result<bool> {
        self.get_cell(row, column).as_bool()
    }

    /// Renders the rows as a JSON array of objects keyed by column name.
    pub fn to_json(&self) -> serde_json::Value {
        let rows = (0..self.rows.len())
            .map(|row| {
                let mut object = Map::new();
                for (col, column) in self.columns.iter().enumerate() {
                    object.insert(column.name.clone(), value_to_json(&self.get_cell(row, col)));
                }
                serde_json::Value::Object(object)
            })
            .collect();
        serde_json::Value::Array(rows)
    }
}

fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Integer(i) => serde_json::Value::Number((*i).into()),
        Value::Real(r) => Number::from_f64(*r)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::Text(s) => serde_json::Value::String(s.clone()),
        Value::Blob(_) => serde_json::Value::String(value.to_string()),
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cell_text = |row: usize, col: usize| -> String {
            match self.get_cell(row, col) {
                Value::Null => NULL_TEXT.to_string(),
                other => other.to_string(),
            }
        };

        let widths: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .map(|(col, column)| {
                (0..self.rows.len())
                    .map(|row| cell_text(row, col).chars().count())
                    .fold(column.name.chars().count(), usize::max)
                    + 2
            })
            .collect();

        let separator: String = widths
            .iter()
            .map(|w| format!("+{}", "-".repeat(*w)))
            .chain(std::iter::once("+\n".to_string()))
            .collect();
        let line = |cells: Vec<String>| -> String {
            let mut out = String::new();
            for (text, width) in cells.iter().zip(&widths) {
                let pad = width.saturating_sub(text.chars().count() + 1);
                out.push_str(&format!("| {}{}", text, " ".repeat(pad)));
            }
            out.push_str("|\n");
            out
        };

        f.write_str(&separator)?;
        f.write_str(&line(self.columns.iter().map(|c| c.name.clone()).collect()))?;
        f.write_str(&separator)?;
        for row in 0..self.rows.len() {
            let cells = (0..self.columns.len()).map(|col| cell_text(row, col)).collect();
            f.write_str(&line(cells))?;
        }
        f.write_str(&separator)
    }
}
