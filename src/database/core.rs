//! Database Core - handle, state and the query entry point
//!
//! This module contains:
//! - `Database`: the public handle, safe to share across threads
//! - `DatabaseState`: tables, bindings and pragmas behind one mutex
//! - `DatabaseResolver`: hook used by `ATTACH` to find other databases

use super::statement::PreparedStatement;
use crate::config::{DBConfig, STAT_TABLE};
use crate::error::{PocketError, Result};
use crate::sql::executor::Executor;
use crate::sql::Bindings;
use crate::storage::{RowSource, Table};
use crate::types::{Column, TypeTag, Value};
use ahash::AHashMap;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Resolves the file name given to `ATTACH` to another database.
///
/// The default resolves nothing, which leaves `ATTACH` a logged no-op.
pub trait DatabaseResolver: Send + Sync {
    fn resolve(&self, file_name: &str) -> Option<Arc<Database>> {
        let _ = file_name;
        None
    }
}

/// Resolver that never finds anything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoResolver;

impl DatabaseResolver for NoResolver {}

/// Everything a statement may read or mutate
pub(crate) struct DatabaseState {
    pub(crate) tables: AHashMap<String, Table>,
    pub(crate) bindings: Bindings,
    pub(crate) user_version: u64,
    pub(crate) dropped: bool,
    pub(crate) attached: AHashMap<String, Arc<Database>>,
}

impl DatabaseState {
    fn new(config: &DBConfig) -> Self {
        let mut tables = AHashMap::new();
        if config.create_system_tables {
            // Only the columns ANALYZE output would need; no `contacts` column
            let mut stat = Table::new();
            for name in ["tbl", "idx", "stat"] {
                stat.push_column(Column::new(name, TypeTag::Text));
            }
            tables.insert(STAT_TABLE.to_string(), stat);
        }
        Self {
            tables,
            bindings: Bindings::new(),
            user_version: config.initial_user_version,
            dropped: false,
            attached: AHashMap::new(),
        }
    }

    /// Null unbinds, which reads the same as never bound.
    fn bind(&mut self, idx: usize, value: Value) {
        if value.is_null() {
            self.bindings.remove(&idx);
        } else {
            self.bindings.insert(idx, value);
        }
    }
}

/// Holds the statement's bindings and drops them when it goes out of scope,
/// unwinding included.
struct BoundState<'a>(&'a mut DatabaseState);

impl<'a> BoundState<'a> {
    fn new(state: &'a mut DatabaseState, params: &[Value]) -> Self {
        for (idx, value) in params.iter().enumerate() {
            state.bind(idx, value.clone());
        }
        Self(state)
    }
}

impl Drop for BoundState<'_> {
    fn drop(&mut self) {
        self.0.bindings.clear();
    }
}

/// In-memory SQL database
///
/// Statements run one at a time: `query` holds the state lock for the whole
/// statement, so concurrent callers are serialized.
///
/// ```
/// use pocketsql::{Database, Value};
///
/// let db = Database::new();
/// db.query("CREATE TABLE t (a INTEGER, b TEXT)", &[])?;
/// db.query("INSERT INTO t (a, b) VALUES (?, ?)", &[Value::from(1), Value::from("x")])?;
/// let result = db.query("SELECT a FROM t WHERE b = 'x'", &[])?;
/// assert_eq!(result.get_long(0, 0)?, 1);
/// # Ok::<(), pocketsql::PocketError>(())
/// ```
pub struct Database {
    config: DBConfig,
    pub(crate) state: Mutex<DatabaseState>,
    resolver: Arc<dyn DatabaseResolver>,
}

impl Database {
    pub fn new() -> Self {
        Self::with_config(DBConfig::default())
    }

    pub fn with_config(config: DBConfig) -> Self {
        Self::with_resolver(config, Arc::new(NoResolver))
    }

    pub fn with_resolver(config: DBConfig, resolver: Arc<dyn DatabaseResolver>) -> Self {
        let state = DatabaseState::new(&config);
        debug!(system_tables = config.create_system_tables, "database created");
        Self {
            config,
            state: Mutex::new(state),
            resolver,
        }
    }

    pub fn config(&self) -> &DBConfig {
        &self.config
    }

    /// Executes one statement with positional parameters.
    ///
    /// `params[i]` binds `?` number `i`. Bindings are cleared when the
    /// statement finishes, whether it succeeded or not. Parse and processing
    /// faults come back as [`PocketError::InvalidSql`].
    pub fn query(&self, sql: &str, params: &[Value]) -> Result<Table> {
        let mut state = self.state.lock();
        if state.dropped {
            return Err(PocketError::Dropped);
        }

        debug!(sql, params = params.len(), "executing statement");
        let result = {
            let mut bound = BoundState::new(&mut state, params);
            let result = Executor::new(sql, &mut *bound.0, self.resolver.as_ref()).execute();
            result
        };

        result.map_err(|err| {
            debug!(error = %err, "statement failed");
            err.wrap_for_query(sql)
        })
    }

    /// Keeps `sql` for repeated execution. Nothing is parsed up front.
    pub fn prepare(&self, sql: &str) -> PreparedStatement<'_> {
        PreparedStatement::new(self, sql)
    }

    /// Drops the database. Every later query fails.
    pub fn close(&self) {
        let mut state = self.state.lock();
        if !state.dropped {
            state.dropped = true;
            state.tables.clear();
            state.attached.clear();
            info!("database closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().dropped
    }

    pub fn user_version(&self) -> u64 {
        self.state.lock().user_version
    }

    /// Names of all tables, sorted.
    pub fn table_names(&self) -> Vec<String> {
        let state = self.state.lock();
        let mut names: Vec<String> = state.tables.keys().cloned().collect();
        names.sort();
        names
    }

    /// Snapshot of a table, if it exists. Linked rows stay linked.
    pub fn table(&self, name: &str) -> Option<Table> {
        self.state.lock().tables.get(name).cloned()
    }

    /// Appends externally backed rows to `table`.
    ///
    /// Reads and writes of those rows go through the given sources.
    pub fn link_rows<I>(&self, table: &str, sources: I) -> Result<usize>
    where
        I: IntoIterator<Item = Arc<dyn RowSource>>,
    {
        let mut state = self.state.lock();
        if state.dropped {
            return Err(PocketError::Dropped);
        }
        let target = state
            .tables
            .get_mut(table)
            .ok_or_else(|| PocketError::Processing(format!("Table \"{}\" does not exist", table)))?;
        let mut linked = 0;
        for source in sources {
            target.link_row(source);
            linked += 1;
        }
        debug!(table, linked, "linked rows");
        Ok(linked)
    }

    /// Database attached under `alias`, if one was resolved.
    pub fn attached(&self, alias: &str) -> Option<Arc<Database>> {
        self.state.lock().attached.get(alias).cloned()
    }

    pub fn attached_aliases(&self) -> Vec<String> {
        let state = self.state.lock();
        let mut aliases: Vec<String> = state.attached.keys().cloned().collect();
        aliases.sort();
        aliases
    }
}

impl Default for Database {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Database")
            .field("tables", &state.tables.len())
            .field("user_version", &state.user_version)
            .field("dropped", &state.dropped)
            .finish()
    }
}

/// Dumps the user version and every user table, in name order.
impl fmt::Display for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        writeln!(f, "Database")?;
        writeln!(f, "========")?;
        writeln!(f, "user_version: {}", state.user_version)?;
        let mut names: Vec<&String> = state.tables.keys().filter(|n| n.as_str() != STAT_TABLE).collect();
        names.sort();
        for name in names {
            writeln!(f)?;
            writeln!(f, "{}:", name)?;
            write!(f, "{}", state.tables[name])?;
        }
        Ok(())
    }
}
