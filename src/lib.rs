//! PocketSQL - in-memory SQL interpreter
//!
//! A small SQL dialect with SQLite-style weak typing, parsed and executed in
//! a single pass over the statement text.
//!
//! ## Architecture
//! - SQL layer: tokenizer, expression trees, precedence-climbing parser
//! - Interpreter: each statement handler acts as soon as its clause is parsed
//! - Storage layer: typed columns over owned or externally linked rows
//!
//! ## Quick start
//!
//! ```
//! use pocketsql::Database;
//!
//! let db = Database::new();
//! db.query("CREATE TABLE t (a INTEGER, b TEXT)", &[])?;
//! db.query("INSERT INTO t (a, b) VALUES (1, 'x')", &[])?;
//! let result = db.query("SELECT a * 2 FROM t", &[])?;
//! assert_eq!(result.column_name(0), Some("a * 2"));
//! assert_eq!(result.get_long(0, 0)?, 2);
//! # Ok::<(), pocketsql::PocketError>(())
//! ```

pub mod config;
pub mod storage;
pub mod types;
pub mod sql;
pub mod database;

mod error;

pub use config::{DBConfig, STAT_TABLE};
pub use error::{PocketError, Result};

pub use database::{Database, DatabaseResolver, NoResolver, PreparedStatement};
pub use storage::{Row, RowSource, Table};
pub use types::{Column, ColumnFlags, TypeTag, Value};
