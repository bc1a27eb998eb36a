//! Prepared statements
//!
//! A prepared statement only remembers its SQL text; each run parses it
//! again against the current bindings.

use super::core::Database;
use crate::error::Result;
use crate::storage::Table;
use crate::types::Value;
use std::fmt;

pub struct PreparedStatement<'db> {
    db: &'db Database,
    sql: String,
}

impl<'db> PreparedStatement<'db> {
    pub(crate) fn new(db: &'db Database, sql: &str) -> Self {
        Self {
            db,
            sql: sql.to_string(),
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Runs the statement with fresh parameters.
    pub fn run(&self, params: &[Value]) -> Result<Table> {
        self.db.query(&self.sql, params)
    }
}

impl fmt::Display for PreparedStatement<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}

impl fmt::Debug for PreparedStatement<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreparedStatement").field("sql", &self.sql).finish()
    }
}
