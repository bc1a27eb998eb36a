//! Table store
//!
//! Row-oriented, in-memory relations with coercing writes.

pub mod row;
pub mod table;

pub use row::{Row, RowSource};
pub use table::Table;
