//! Database Module
//!
//! # Module Structure
//! - `core`: Database handle, shared state and attachment resolution
//! - `statement`: Prepared statements bound to a database

pub mod core;
pub mod statement;

pub use self::core::{Database, DatabaseResolver, NoResolver};
pub(crate) use self::core::DatabaseState;
pub use statement::PreparedStatement;
