//! Database configuration
//!
//! The interpreter is purely in-memory, so configuration only covers what a
//! fresh database looks like.

use serde::{Deserialize, Serialize};

/// Name of the statistics placeholder table registered on creation.
pub const STAT_TABLE: &str = "sqlite_stat1";

/// Database configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DBConfig {
    /// Register the statistics placeholder table (`sqlite_stat1`) on creation.
    pub create_system_tables: bool,

    /// Value reported by `PRAGMA user_version` before any assignment.
    pub initial_user_version: u64,
}

impl Default for DBConfig {
    fn default() -> Self {
        Self {
            create_system_tables: true,
            initial_user_version: 0,
        }
    }
}

impl DBConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_system_tables(mut self, enabled: bool) -> Self {
        self.create_system_tables = enabled;
        self
    }

    pub fn with_user_version(mut self, version: u64) -> Self {
        self.initial_user_version = version;
        self
    }
}
