/// Statement interpreter - parses and executes SQL in a single pass
///
/// Each handler consumes its clause through the parser primitives and
/// mutates the table store as soon as it has what it needs. There is no
/// separate plan: a statement is done when its last token is consumed.
use super::evaluator::ExprEvaluator;
use super::parser::Parser;
use super::token::{Token, TokenKind};
use crate::database::{DatabaseResolver, DatabaseState};
use crate::error::{PocketError, Result};
use crate::storage::Table;
use crate::types::{Column, ColumnFlags, TypeTag, Value};
use ahash::AHashMap;
use tracing::{debug, info, trace, warn};

const STATEMENTS: [&str; 14] = [
    "CREATE", "DROP", "PRAGMA", "BEGIN", "END", "COMMIT", "ROLLBACK", "INSERT", "SELECT", "UPDATE",
    "DELETE", "ATTACH", "ANALYZE", "DESC",
];

const CONFLICT_ACTIONS: [&str; 5] = ["ROLLBACK", "ABORT", "FAIL", "IGNORE", "REPLACE"];

const COLLATIONS: [&str; 5] = ["BINARY", "NOCASE", "RTRIM", "LOCALIZED", "UNICODE"];

const TYPE_FRAGMENTS: [&str; 8] = ["INT", "CHAR", "CLOB", "TEXT", "BLOB", "REAL", "FLOA", "DOUB"];

/// Keywords that start a column modifier rather than a type name.
const COLUMN_MODIFIERS: [&str; 8] = [
    "NOT", "PRIMARY", "UNIQUE", "DEFAULT", "REFERENCES", "COLLATE", "CONSTRAINT", "NULL",
];

const JOIN_OPERATORS: [&str; 7] = [",", "JOIN", "NATURAL", "LEFT", "OUTER", "INNER", "CROSS"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Compound {
    Union,
    UnionAll,
    Intersect,
    Except,
}

/// Row source of a SELECT core
enum Source {
    Named(String),
    Derived(Table),
    Unit(Table),
}

pub(crate) struct Executor<'a> {
    parser: Parser,
    state: &'a mut DatabaseState,
    resolver: &'a dyn DatabaseResolver,
}

impl<'a> Executor<'a> {
    pub(crate) fn new(sql: &str, state: &'a mut DatabaseState, resolver: &'a dyn DatabaseResolver) -> Self {
        Self {
            parser: Parser::new(sql),
            state,
            resolver,
        }
    }

    /// Executes one statement and returns its result table (often empty).
    pub(crate) fn execute(&mut self) -> Result<Table> {
        let result = match self.parser.eat_one_of(&STATEMENTS, false)? {
            Some(0) => {
                self.execute_create()?;
                Table::new()
            }
            Some(1) => {
                self.execute_drop()?;
                Table::new()
            }
            Some(2) => self.execute_pragma()?,
            Some(3) => {
                self.execute_begin()?;
                Table::new()
            }
            Some(4) | Some(5) => {
                self.parser.eat_optional("TRANSACTION")?;
                self.end_transaction();
                Table::new()
            }
            Some(6) => {
                self.parser.eat_optional("TRANSACTION")?;
                self.rollback_transaction();
                Table::new()
            }
            Some(7) => {
                let inserted = self.execute_insert()?;
                Table::single("inserted_rows", TypeTag::Integer, Value::Integer(inserted))?
            }
            Some(8) => self.execute_select(None, None)?,
            Some(9) => {
                let updated = self.execute_update()?;
                Table::single("updated_rows", TypeTag::Integer, Value::Integer(updated))?
            }
            Some(10) => {
                let deleted = self.execute_delete()?;
                Table::single("deleted_rows", TypeTag::Integer, Value::Integer(deleted))?
            }
            Some(11) => {
                self.execute_attach()?;
                Table::new()
            }
            Some(12) => {
                self.execute_analyze()?;
                Table::new()
            }
            Some(13) => self.execute_describe_table()?,
            _ => return Err(PocketError::internal("unhandled statement keyword")),
        };
        self.parser.eat_statement_end()?;
        Ok(result)
    }

    fn eat_identifier(&mut self) -> Result<String> {
        Ok(force_identifier(self.parser.eat_any()?))
    }

    /// `IF [NOT] EXISTS`
    fn parse_if_exists(&mut self, not: bool) -> Result<bool> {
        if !self.parser.eat_optional("IF")? {
            return Ok(false);
        }
        if not {
            self.parser.eat("NOT")?;
        }
        self.parser.eat("EXISTS")?;
        Ok(true)
    }

    /// `ON CONFLICT action`, returning the action index when present
    fn parse_conflict_clause(&mut self) -> Result<Option<usize>> {
        if !self.parser.eat_optional("ON")? {
            return Ok(None);
        }
        self.parser.eat("CONFLICT")?;
        self.parser.eat_one_of(&CONFLICT_ACTIONS, false)
    }

    fn parse_collation(&mut self) -> Result<()> {
        self.parser.eat_one_of(&COLLATIONS, false)?;
        Ok(())
    }

    /// `( name [COLLATE c] [ASC|DESC], ... )`
    fn parse_indexed_columns(&mut self) -> Result<Vec<String>> {
        self.parser.eat("(")?;
        let mut columns = Vec::new();
        loop {
            columns.push(self.eat_identifier()?);
            if self.parser.eat_optional("COLLATE")? {
                self.parse_collation()?;
            }
            self.parser.eat_one_of(&["ASC", "DESC"], true)?;
            if !self.parser.eat_optional(",")? {
                break;
            }
        }
        self.parser.eat(")")?;
        Ok(columns)
    }

    // CREATE / DROP

    fn execute_create(&mut self) -> Result<()> {
        self.parser.eat_one_of(&["TEMP", "TEMPORARY"], true)?;
        match self.parser.eat_one_of(&["TABLE", "TRIGGER", "INDEX", "UNIQUE", "VIEW"], false)? {
            Some(0) => self.execute_create_table(),
            Some(1) => self.parse_create_trigger(),
            Some(2) => self.parse_create_index(false),
            Some(3) => {
                self.parser.eat("INDEX")?;
                self.parse_create_index(true)
            }
            Some(4) => self.parse_create_view(),
            _ => Err(PocketError::internal("unhandled CREATE kind")),
        }
    }

    /// The table is registered only once the whole definition has parsed.
    fn execute_create_table(&mut self) -> Result<()> {
        let if_not_exists = self.parse_if_exists(true)?;
        let id = self.eat_identifier()?;
        self.parser.eat("(")?;

        let mut table = Table::new();
        loop {
            if self.parse_table_constraint()? {
                while self.parser.eat_optional(",")? {
                    if !self.parse_table_constraint()? {
                        let pos = self.parser.position();
                        return Err(PocketError::parse("PRIMARY or UNIQUE expected", pos));
                    }
                }
                break;
            }
            let column = self.parse_column_def()?;
            table.push_column(column);
            if !self.parser.eat_optional(",")? {
                break;
            }
        }
        self.parser.eat(")")?;

        if self.state.tables.contains_key(&id) && !if_not_exists {
            return Err(PocketError::Processing(format!("Table \"{}\" already exists", id)));
        }
        info!(table = %id, columns = table.column_count(), "created table");
        self.state.tables.insert(id, table);
        Ok(())
    }

    /// `[CONSTRAINT name] PRIMARY KEY (...)` or `UNIQUE (...)` at table level.
    fn parse_table_constraint(&mut self) -> Result<bool> {
        let named = self.parser.look_ahead(&["CONSTRAINT"])?;
        if named {
            self.parser.eat("CONSTRAINT")?;
            self.parser.eat_name()?;
        }
        match self.parser.eat_one_of(&["PRIMARY", "UNIQUE"], !named)? {
            Some(0) => self.parser.eat("KEY")?,
            Some(_) => {}
            None => return Ok(false),
        }
        let columns = self.parse_indexed_columns()?;
        self.parse_conflict_clause()?;
        trace!(?columns, "table constraint accepted, not enforced");
        Ok(true)
    }

    fn parse_column_def(&mut self) -> Result<Column> {
        let name = self.eat_identifier()?;
        // Tolerate the name being repeated
        self.parser.eat_optional(&name)?;

        let mut type_tag = None;
        if !self.parser.look_ahead(&COLUMN_MODIFIERS)? {
            type_tag = match self.parser.eat_fuzzy(&TYPE_FRAGMENTS)? {
                Some(0) => Some(TypeTag::Integer),
                Some(1..=3) => {
                    if self.parser.eat_optional("(")? {
                        self.parser.eat_number()?;
                        if self.parser.eat_optional(",")? {
                            self.parser.eat_number()?;
                        }
                        self.parser.eat(")")?;
                    }
                    Some(TypeTag::Text)
                }
                Some(4) => Some(TypeTag::None),
                Some(_) => Some(TypeTag::Real),
                None => None,
            };
        }
        if type_tag.is_none()
            && !self.parser.at_end()?
            && !self.parser.look_ahead(&[",", ")"])?
            && !self.parser.look_ahead(&COLUMN_MODIFIERS)?
        {
            // Unknown type name: swallow it and guess numeric affinity
            self.parser.eat_any()?;
            type_tag = Some(TypeTag::Numeric);
        }

        let mut flags = ColumnFlags::EMPTY;
        let mut default = Value::Null;
        loop {
            match self.parser.eat_one_of(&COLUMN_MODIFIERS, true)? {
                Some(0) => {
                    self.parser.eat("NULL")?;
                    self.parse_conflict_clause()?;
                    flags |= ColumnFlags::NOT_NULL;
                }
                Some(1) => {
                    self.parser.eat("KEY")?;
                    flags |= ColumnFlags::PRIMARY_KEY;
                    self.parser.eat_one_of(&["ASC", "DESC"], true)?;
                    self.parse_conflict_clause()?;
                    if self.parser.eat_optional("AUTOINCREMENT")? {
                        flags |= ColumnFlags::AUTO_INCREMENT;
                    }
                }
                Some(2) => {
                    self.parse_conflict_clause()?;
                }
                Some(3) => default = self.parse_default_value()?,
                Some(4) => {
                    self.parser.eat_name()?;
                    if self.parser.look_ahead(&["("])? {
                        self.parse_indexed_columns()?;
                    }
                }
                Some(5) => self.parse_collation()?,
                Some(6) => {
                    self.parser.eat_name()?;
                }
                Some(_) => {}
                None => break,
            }
        }

        Column::new(name, type_tag.unwrap_or(TypeTag::None))
            .with_flags(flags)
            .with_default(default)
    }

    /// `DEFAULT [+] expr`, folded to a constant right away. A trailing
    /// `NOT NULL` is left for the modifier loop.
    fn parse_default_value(&mut self) -> Result<Value> {
        self.parser.eat_optional("+")?;
        let expr = self.parser.parse_constant_expr(&self.state.bindings)?;
        ExprEvaluator::new().eval(&expr, None)
    }

    fn parse_create_trigger(&mut self) -> Result<()> {
        let if_not_exists = self.parse_if_exists(true)?;
        let name = self.eat_identifier()?;
        if self.parser.eat_one_of(&["BEFORE", "AFTER", "INSTEAD"], true)? == Some(2) {
            self.parser.eat("OF")?;
        }
        let event = self.parser.eat_one_of(&["DELETE", "INSERT", "UPDATE"], false)?;
        if event == Some(2) && self.parser.eat_optional("OF")? {
            loop {
                self.parser.eat_name()?;
                if !self.parser.eat_optional(",")? {
                    break;
                }
            }
        }
        self.parser.eat("ON")?;
        let table = self.eat_identifier()?;
        if self.parser.eat_optional("FOR")? {
            self.parser.eat("EACH")?;
            self.parser.eat("ROW")?;
        }
        if self.parser.eat_optional("WHEN")? {
            self.parser.parse_expr(&self.state.bindings)?;
        }
        self.parser.eat("BEGIN")?;
        let mut actions = Vec::new();
        loop {
            let mut action = Vec::new();
            while !self.parser.eat_optional(";")? {
                action.push(self.parser.eat_name()?);
            }
            actions.push(action.join(" "));
            if self.parser.eat_optional("END")? {
                break;
            }
        }
        debug!(trigger = %name, table = %table, actions = actions.len(), if_not_exists, "trigger parsed, not stored");
        Ok(())
    }

    fn parse_create_view(&mut self) -> Result<()> {
        let if_not_exists = self.parse_if_exists(true)?;
        let name = self.eat_identifier()?;
        self.parser.eat("AS")?;
        let mut body = Vec::new();
        while !self.parser.at_end()? && !self.parser.look_ahead(&[";"])? {
            body.push(self.parser.eat_name()?);
        }
        debug!(view = %name, body = %body.join(" "), if_not_exists, "view parsed, not stored");
        Ok(())
    }

    fn parse_create_index(&mut self, unique: bool) -> Result<()> {
        let if_not_exists = self.parse_if_exists(true)?;
        let name = self.eat_identifier()?;
        self.parser.eat("ON")?;
        let table = self.eat_identifier()?;
        let columns = self.parse_indexed_columns()?;
        debug!(index = %name, table = %table, ?columns, unique, if_not_exists, "index parsed, not stored");
        Ok(())
    }

    fn execute_drop(&mut self) -> Result<()> {
        let kind = self.parser.eat_one_of(&["TABLE", "INDEX", "VIEW", "TRIGGER"], false)?;
        let if_exists = self.parse_if_exists(false)?;
        let id = self.eat_identifier()?;
        match kind {
            Some(0) => {
                if self.state.tables.remove(&id).is_some() {
                    info!(table = %id, "dropped table");
                } else if !if_exists {
                    return Err(missing_table(&id));
                }
            }
            _ => debug!(name = %id, "drop of unstored object ignored"),
        }
        Ok(())
    }

    // PRAGMA / DESC

    fn execute_pragma(&mut self) -> Result<Table> {
        if self.parser.eat_optional("user_version")? {
            if self.parser.eat_optional("=")? {
                self.state.user_version = self.parser.eat_number()? as u64;
                return Ok(Table::new());
            }
            return Table::single(
                "user_version",
                TypeTag::Integer,
                Value::Integer(self.state.user_version as i64),
            );
        }
        if self.parser.eat_optional("table_info")? {
            self.parser.eat("(")?;
            let id = self.eat_identifier()?;
            self.parser.eat(")")?;
            let source = lookup(&self.state.tables, &id)?;

            let mut info = Table::new();
            info.add_column("cid", TypeTag::Integer, ColumnFlags::EMPTY, Value::Null)?;
            info.add_column("name", TypeTag::Text, ColumnFlags::EMPTY, Value::Null)?;
            info.add_column("type", TypeTag::None, ColumnFlags::EMPTY, Value::Null)?;
            info.add_column("notnull", TypeTag::None, ColumnFlags::EMPTY, Value::Null)?;
            info.add_column("dflt_value", TypeTag::Text, ColumnFlags::EMPTY, Value::Null)?;
            for (idx, column) in source.columns().iter().enumerate() {
                info.set(idx, 0, Value::Integer(idx as i64))?;
                info.set(idx, 1, Value::Text(column.name.clone()))?;
                info.set(idx, 4, column.default.clone())?;
            }
            return Ok(info);
        }
        Err(PocketError::InvalidArgument("Unsupported pragma".to_string()))
    }

    fn execute_describe_table(&mut self) -> Result<Table> {
        let id = self.eat_identifier()?;
        let source = lookup(&self.state.tables, &id)?;

        let mut desc = Table::new();
        let empty = || Value::Text(String::new());
        desc.add_column("Field", TypeTag::Text, ColumnFlags::EMPTY, Value::Null)?;
        desc.add_column("Type", TypeTag::Text, ColumnFlags::EMPTY, Value::Null)?;
        desc.add_column("Null", TypeTag::Text, ColumnFlags::EMPTY, Value::Null)?;
        desc.add_column("Key", TypeTag::Text, ColumnFlags::EMPTY, empty())?;
        desc.add_column("Default", TypeTag::Text, ColumnFlags::EMPTY, empty())?;
        desc.add_column("Extra", TypeTag::Text, ColumnFlags::EMPTY, empty())?;

        for (idx, column) in source.columns().iter().enumerate() {
            desc.set(idx, 0, Value::Text(column.name.clone()))?;
            desc.set(idx, 1, Value::Text(column.type_tag.name().to_lowercase()))?;
            desc.set(idx, 2, Value::from(if column.is_not_null() { "NO" } else { "YES" }))?;
            desc.set(idx, 3, Value::from(if column.is_primary_key() { "PRI" } else { "" }))?;
            let default = if column.default.is_null() { empty() } else { column.default.clone() };
            desc.set(idx, 4, default)?;
        }
        Ok(desc)
    }

    // Transactions: accepted, no isolation

    fn execute_begin(&mut self) -> Result<()> {
        let mode = self.parser.eat_one_of(&["DEFERRED", "IMMEDIATE", "EXCLUSIVE"], true)?;
        self.parser.eat_optional("TRANSACTION")?;
        self.begin_transaction(mode);
        Ok(())
    }

    fn begin_transaction(&mut self, mode: Option<usize>) {
        trace!(?mode, "begin transaction (no-op)");
    }

    fn end_transaction(&mut self) {
        trace!("end transaction (no-op)");
    }

    fn rollback_transaction(&mut self) {
        trace!("rollback transaction (no-op)");
    }

    // INSERT / UPDATE / DELETE

    /// Values are checked against the column list before any row is written.
    fn execute_insert(&mut self) -> Result<i64> {
        if self.parser.eat_optional("OR")? {
            self.parser.eat_one_of(&CONFLICT_ACTIONS, false)?;
        }
        self.parser.eat("INTO")?;
        let id = self.eat_identifier()?;
        self.parser.eat("(")?;
        let mut columns = Vec::new();
        loop {
            columns.push(self.eat_identifier()?);
            if !self.parser.eat_optional(",")? {
                break;
            }
        }
        self.parser.eat(")")?;
        self.parser.eat("VALUES")?;
        self.parser.eat("(")?;

        let table = lookup(&self.state.tables, &id)?;
        let evaluator = ExprEvaluator::with_table(table);
        let mut cells: Vec<(usize, Value)> = Vec::with_capacity(columns.len());
        loop {
            if cells.len() == columns.len() {
                return Err(PocketError::Processing("More values than columns".to_string()));
            }
            let expr = self.parser.parse_expr(&self.state.bindings)?;
            let value = evaluator.eval(&expr, None)?;
            let name = &columns[cells.len()];
            let idx = table.column_index(name).ok_or_else(|| {
                PocketError::Processing(format!("Column \"{}\" not present in table \"{}\"", name, id))
            })?;
            let type_tag = table.columns()[idx].type_tag;
            cells.push((idx, value.coerce(type_tag)?));
            if !self.parser.eat_optional(",")? {
                break;
            }
        }
        self.parser.eat(")")?;
        if columns.len() > cells.len() {
            return Err(PocketError::Processing("Fewer values than columns".to_string()));
        }

        let table = self
            .state
            .tables
            .get_mut(&id)
            .ok_or_else(|| missing_table(&id))?;
        let row = table.row_count();
        for (idx, value) in cells {
            table.set(row, idx, value)?;
        }
        debug!(table = %id, row, "inserted row");
        Ok(1)
    }

    /// Parsed in full; rows are never modified.
    fn execute_update(&mut self) -> Result<i64> {
        if self.parser.eat_optional("OR")? {
            self.parser.eat_one_of(&CONFLICT_ACTIONS, false)?;
        }
        let id = self.eat_identifier()?;
        self.parser.eat("SET")?;
        let mut assignments = Vec::new();
        loop {
            let column = self.eat_identifier()?;
            self.parser.eat("=")?;
            let expr = self.parser.parse_expr(&self.state.bindings)?;
            assignments.push((column, expr));
            if !self.parser.eat_optional(",")? {
                break;
            }
        }
        let predicate = if self.parser.eat_optional("WHERE")? {
            Some(self.parser.parse_expr(&self.state.bindings)?)
        } else {
            None
        };
        lookup(&self.state.tables, &id)?;
        debug!(table = %id, assignments = assignments.len(), filtered = predicate.is_some(), "update parsed, no rows changed");
        Ok(0)
    }

    /// Parsed in full; rows are never removed.
    fn execute_delete(&mut self) -> Result<i64> {
        self.parser.eat("FROM")?;
        let id = self.eat_identifier()?;
        let predicate = if self.parser.eat_optional("WHERE")? {
            Some(self.parser.parse_expr(&self.state.bindings)?)
        } else {
            None
        };
        lookup(&self.state.tables, &id)?;
        debug!(table = %id, filtered = predicate.is_some(), "delete parsed, no rows removed");
        Ok(0)
    }

    // ATTACH / ANALYZE

    fn execute_attach(&mut self) -> Result<()> {
        self.parser.eat_optional("DATABASE")?;
        let file_name = self.eat_identifier()?;
        self.parser.eat("AS")?;
        let alias = self.eat_identifier()?;
        match self.resolver.resolve(&file_name) {
            Some(db) => {
                info!(file = %file_name, alias = %alias, "attached database");
                self.state.attached.insert(alias, db);
            }
            None => warn!(file = %file_name, alias = %alias, "could not resolve attached database"),
        }
        Ok(())
    }

    fn execute_analyze(&mut self) -> Result<()> {
        if !self.parser.at_end()? && !self.parser.look_ahead(&[";"])? {
            let target = self.eat_identifier()?;
            trace!(target = %target, "analyze (no-op)");
        }
        Ok(())
    }

    // SELECT

    /// Parses a SELECT (after the keyword) including compound segments.
    ///
    /// A compound is applied to the accumulated left result as soon as the
    /// next core has been parsed, before any further segment is read.
    fn execute_select(&mut self, left: Option<Table>, joiner: Option<Compound>) -> Result<Table> {
        let mut result = self.parse_select_core()?;

        if let (Some(left), Some(joiner)) = (left, joiner) {
            match joiner {
                Compound::Union => result.union(&left, false)?,
                Compound::UnionAll => result.union(&left, true)?,
                Compound::Intersect => return Err(PocketError::internal("INTERSECT not implemented")),
                Compound::Except => return Err(PocketError::internal("EXCEPT not implemented")),
            }
        }

        let compound = match self.parser.eat_one_of(&["UNION", "INTERSECT", "EXCEPT"], true)? {
            Some(0) if self.parser.eat_optional("ALL")? => Some(Compound::UnionAll),
            Some(0) => Some(Compound::Union),
            Some(1) => Some(Compound::Intersect),
            Some(2) => Some(Compound::Except),
            _ => None,
        };
        if let Some(compound) = compound {
            self.parser.eat("SELECT")?;
            result = self.execute_select(Some(result), Some(compound))?;
        }

        // ORDER BY and LIMIT are accepted but do not shape the result
        if self.parser.eat_optional("ORDER")? {
            self.parser.eat("BY")?;
            loop {
                self.parser.parse_expr(&self.state.bindings)?;
                self.parser.eat_one_of(&["ASC", "DESC"], true)?;
                if !self.parser.eat_optional(",")? {
                    break;
                }
            }
        }
        if self.parser.eat_optional("LIMIT")? {
            let limit = self.parser.eat_number()?;
            let offset = match self.parser.eat_one_of(&[",", "OFFSET"], true)? {
                Some(_) => Some(self.parser.eat_number()?),
                None => None,
            };
            trace!(limit, ?offset, "limit ignored");
        }
        Ok(result)
    }

    fn parse_select_core(&mut self) -> Result<Table> {
        let distinct = self.parser.eat_one_of(&["ALL", "DISTINCT"], true)? == Some(1);

        let columns = if self.parser.eat_optional("*")? {
            None
        } else {
            let mut exprs = Vec::new();
            loop {
                exprs.push(self.parser.parse_expr(&self.state.bindings)?);
                if !self.parser.eat_optional(",")? {
                    break;
                }
            }
            Some(exprs)
        };

        let source = if self.parser.eat_optional("FROM")? {
            self.parse_join_source()?
        } else if columns.is_none() {
            return Err(PocketError::Processing("No tables specified".to_string()));
        } else {
            Source::Unit(Table::unit())
        };

        let predicate = if self.parser.eat_optional("WHERE")? {
            Some(self.parser.parse_expr(&self.state.bindings)?)
        } else {
            None
        };
        if self.parser.eat_optional("GROUP")? {
            self.parser.eat("BY")?;
            loop {
                self.parser.parse_expr(&self.state.bindings)?;
                if !self.parser.eat_optional(",")? {
                    break;
                }
            }
            if self.parser.eat_optional("HAVING")? {
                self.parser.parse_expr(&self.state.bindings)?;
            }
        }
        trace!(distinct, "select core parsed");

        let table = match &source {
            Source::Named(name) => lookup(&self.state.tables, name)?,
            Source::Derived(table) | Source::Unit(table) => table,
        };
        table.extract(columns.as_deref(), predicate.as_ref())
    }

    fn parse_single_source(&mut self) -> Result<Source> {
        let source = if self.parser.eat_optional("(")? {
            let inner = if self.parser.eat_optional("SELECT")? {
                Source::Derived(self.execute_select(None, None)?)
            } else {
                self.parse_join_source()?
            };
            self.parser.eat(")")?;
            inner
        } else {
            let name = self.eat_identifier()?;
            lookup(&self.state.tables, &name)?;
            Source::Named(name)
        };
        if self.parser.eat_optional("AS")? {
            self.parser.eat_name()?;
        }
        Ok(source)
    }

    /// A source optionally followed by a join. Joins parse, then fault.
    fn parse_join_source(&mut self) -> Result<Source> {
        let source = self.parse_single_source()?;
        let op = match self.parser.eat_one_of(&JOIN_OPERATORS, true)? {
            Some(op) => op,
            None => return Ok(source),
        };
        while self.parser.eat_one_of(&JOIN_OPERATORS[1..], true)?.is_some() {}
        self.parse_single_source()?;
        if self.parser.eat_optional("ON")? {
            self.parser.parse_expr(&self.state.bindings)?;
        } else if self.parser.eat_optional("USING")? {
            self.parse_indexed_columns()?;
        }
        Err(PocketError::internal(format!("{} join not implemented", JOIN_OPERATORS[op])))
    }
}

/// Names may be quoted to dodge keywords; the quotes are not part of the name.
fn force_identifier(token: Token) -> String {
    match token.kind {
        TokenKind::Str | TokenKind::QuotedIdent => token.unquoted().to_string(),
        _ => token.text,
    }
}

fn lookup<'t>(tables: &'t AHashMap<String, Table>, name: &str) -> Result<&'t Table> {
    tables.get(name).ok_or_else(|| missing_table(name))
}

fn missing_table(name: &str) -> PocketError {
    PocketError::Processing(format!("Table \"{}\" does not exist", name))
}
