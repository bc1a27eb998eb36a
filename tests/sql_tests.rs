//! End-to-end statement tests through `Database::query`

use parking_lot::Mutex;
use pocketsql::{DBConfig, Database, DatabaseResolver, PocketError, RowSource, Table, TypeTag, Value};
use std::sync::Arc;

fn setup() -> Database {
    let db = Database::new();
    db.query("CREATE TABLE t (a INTEGER, b TEXT)", &[]).unwrap();
    db
}

fn scalar(db: &Database, sql: &str) -> Value {
    let result = db.query(sql, &[]).unwrap();
    assert_eq!(result.row_count(), 1, "{}", sql);
    result.get_cell(0, 0)
}

fn invalid_sql_message(result: pocketsql::Result<Table>) -> String {
    match result {
        Err(PocketError::InvalidSql(message)) => message,
        Err(other) => panic!("expected InvalidSql, got {:?}", other),
        Ok(table) => panic!("expected InvalidSql, got table:\n{}", table),
    }
}

#[test]
fn test_arithmetic_precedence() {
    let db = Database::new();
    assert_eq!(scalar(&db, "SELECT 1 + 2 * 3"), Value::Integer(7));
    assert_eq!(scalar(&db, "SELECT (1 + 2) * 3"), Value::Integer(9));
    assert_eq!(scalar(&db, "SELECT 2 < 3 AND 3 < 4"), Value::Integer(1));
    assert_eq!(scalar(&db, "SELECT 2 < 3 OR 4 < 3"), Value::Integer(1));
    assert_eq!(scalar(&db, "SELECT 10 - 4 - 3"), Value::Integer(3));
    assert_eq!(scalar(&db, "SELECT 7 % 0"), Value::Null);
    assert_eq!(scalar(&db, "SELECT 1 << 2 + 1"), Value::Integer(8));
}

#[test]
fn test_integer_limits() {
    let db = Database::new();
    assert_eq!(scalar(&db, "SELECT -9223372036854775808"), Value::Integer(i64::MIN));

    let result = db.query("SELECT 9223372036854775807 + 1", &[]).unwrap();
    assert_eq!(result.columns()[0].type_tag, TypeTag::Real);
    assert_eq!(result.get_cell(0, 0), Value::Real(9223372036854775808.0));

    let result = db.query("SELECT 1 + 1", &[]).unwrap();
    assert_eq!(result.columns()[0].type_tag, TypeTag::Integer);
}

#[test]
fn test_projection_names_follow_expression_text() {
    let db = Database::new();
    let result = db.query("SELECT 1 + 2 * 3, 'a' || 'b'", &[]).unwrap();
    assert_eq!(result.column_name(0), Some("1 + (2 * 3)"));
    assert_eq!(result.column_name(1), Some("'a' || 'b'"));
    assert_eq!(result.columns()[1].type_tag, TypeTag::Text);
    assert_eq!(result.get_string(0, 1), "ab");
}

#[test]
fn test_create_table_collision() {
    let db = Database::new();
    db.query("CREATE TABLE t (a)", &[]).unwrap();
    let message = invalid_sql_message(db.query("CREATE TABLE t (b)", &[]));
    assert!(message.contains("already exists"), "{}", message);

    db.query("CREATE TABLE IF NOT EXISTS t (b)", &[]).unwrap();
    let t = db.table("t").unwrap();
    assert_eq!(t.column_count(), 1);
    assert_eq!(t.column_name(0), Some("b"));
}

#[test]
fn test_create_table_failure_registers_nothing() {
    let db = Database::new();
    let message = invalid_sql_message(db.query("CREATE TABLE p (a INTEGER, b TEXT DEFAULT missing)", &[]));
    assert!(message.contains("missing"), "{}", message);
    assert!(db.table("p").is_none());

    assert!(db.query("CREATE TABLE p (a INTEGER, b TEXT", &[]).is_err());
    assert!(db.table("p").is_none());
}

#[test]
fn test_column_types_and_modifiers() {
    let db = Database::new();
    db.query(
        "CREATE TABLE m (
            id INTEGER PRIMARY KEY ASC ON CONFLICT ABORT AUTOINCREMENT,
            name VARCHAR(40) NOT NULL COLLATE NOCASE,
            score DOUBLE DEFAULT 1,
            data BLOB,
            owner INTEGER REFERENCES people(id),
            flag BOOLEAN,
            plain,
            CONSTRAINT uq UNIQUE (name)
        )",
        &[],
    )
    .unwrap();
    let m = db.table("m").unwrap();
    let types: Vec<TypeTag> = m.columns().iter().map(|c| c.type_tag).collect();
    assert_eq!(
        types,
        vec![
            TypeTag::Integer,
            TypeTag::Text,
            TypeTag::Real,
            TypeTag::None,
            TypeTag::Integer,
            TypeTag::Numeric,
            TypeTag::None,
        ]
    );
    assert!(m.columns()[0].is_primary_key());
    assert!(m.columns()[0].is_auto_increment());
    assert!(m.columns()[1].is_not_null());
    assert_eq!(m.columns()[2].default, Value::Real(1.0));
}

#[test]
fn test_repeated_column_name_is_tolerated() {
    let db = Database::new();
    db.query("CREATE TABLE r (a a INTEGER, b TEXT)", &[]).unwrap();
    let r = db.table("r").unwrap();
    assert_eq!(r.column_count(), 2);
    assert_eq!(r.columns()[0].type_tag, TypeTag::Integer);
}

#[test]
fn test_defaults_and_auto_increment_fill_new_rows() {
    let db = Database::new();
    db.query(
        "CREATE TABLE d (id INTEGER PRIMARY KEY AUTOINCREMENT, label TEXT DEFAULT 'none', n INTEGER DEFAULT -5 NOT NULL, note TEXT)",
        &[],
    )
    .unwrap();
    db.query("INSERT INTO d (note) VALUES ('first')", &[]).unwrap();
    db.query("INSERT INTO d (note) VALUES ('second')", &[]).unwrap();

    let d = db.table("d").unwrap();
    assert_eq!(d.row_count(), 2);
    assert_eq!(d.get_long(0, 0).unwrap(), 0);
    assert_eq!(d.get_long(1, 0).unwrap(), 1);
    assert_eq!(d.get_string(1, 1), "none");
    assert_eq!(d.get_long(1, 2).unwrap(), -5);
    assert!(d.columns()[2].is_not_null());
}

#[test]
fn test_default_takes_full_expression() {
    let db = Database::new();
    db.query(
        "CREATE TABLE d (x INTEGER DEFAULT 1 + 2, s TEXT DEFAULT 'a' || 'b' NOT NULL, n INTEGER DEFAULT -2 * 3, note TEXT)",
        &[],
    )
    .unwrap();
    let d = db.table("d").unwrap();
    assert_eq!(d.columns()[0].default, Value::Integer(3));
    assert_eq!(d.columns()[1].default, Value::from("ab"));
    assert!(d.columns()[1].is_not_null());
    assert_eq!(d.columns()[2].default, Value::Integer(-6));

    db.query("INSERT INTO d (note) VALUES ('x')", &[]).unwrap();
    let d = db.table("d").unwrap();
    assert_eq!(d.get_long(0, 0).unwrap(), 3);
    assert_eq!(d.get_string(0, 1), "ab");
}

#[test]
fn test_insert_returns_inserted_rows() {
    let db = setup();
    let result = db.query("INSERT INTO t (a, b) VALUES (1, 'x')", &[]).unwrap();
    assert_eq!(result.column_name(0), Some("inserted_rows"));
    assert_eq!(result.get_long(0, 0).unwrap(), 1);

    db.query("INSERT OR REPLACE INTO t (b, a) VALUES ('y', 2)", &[]).unwrap();
    let t = db.table("t").unwrap();
    assert_eq!(t.row_count(), 2);
    assert_eq!(t.get_long(1, 0).unwrap(), 2);
    assert_eq!(t.get_string(1, 1), "y");
}

#[test]
fn test_insert_arity_mismatch_leaves_table_unchanged() {
    let db = setup();
    let message = invalid_sql_message(db.query("INSERT INTO t (a, b) VALUES (1)", &[]));
    assert!(message.contains("Fewer values than columns"), "{}", message);
    let message = invalid_sql_message(db.query("INSERT INTO t (a, b) VALUES (1, 'x', 3)", &[]));
    assert!(message.contains("More values than columns"), "{}", message);
    assert_eq!(db.table("t").unwrap().row_count(), 0);
}

#[test]
fn test_insert_into_missing_table_or_column() {
    let db = setup();
    let message = invalid_sql_message(db.query("INSERT INTO nope (a) VALUES (1)", &[]));
    assert_eq!(message, "Table \"nope\" does not exist: INSERT INTO nope (a) VALUES (1)");

    let message = invalid_sql_message(db.query("INSERT INTO t (zz) VALUES (1)", &[]));
    assert!(message.contains("Column \"zz\" not present in table \"t\""), "{}", message);
    assert_eq!(db.table("t").unwrap().row_count(), 0);
}

#[test]
fn test_coercion_failure_is_not_wrapped() {
    let db = setup();
    let err = db.query("INSERT INTO t (a, b) VALUES ('abc', 'x')", &[]).unwrap_err();
    assert!(matches!(err, PocketError::Coercion { target: TypeTag::Integer, .. }), "{:?}", err);
    assert_eq!(db.table("t").unwrap().row_count(), 0);

    db.query("INSERT INTO t (a, b) VALUES ('42', 7)", &[]).unwrap();
    let t = db.table("t").unwrap();
    assert_eq!(t.get_cell(0, 0), Value::Integer(42));
    assert_eq!(t.get_cell(0, 1), Value::Text("7".into()));
}

#[test]
fn test_binding_cursor() {
    let db = Database::new();
    let params = [Value::from(10), Value::from(20), Value::from(30)];
    let result = db.query("SELECT ?, ?2, ?", &params).unwrap();
    assert_eq!(result.column_count(), 3);
    assert_eq!(result.get_cell(0, 0), Value::Integer(10));
    assert_eq!(result.get_cell(0, 1), Value::Integer(30));
    assert!(result.is_null(0, 2));
}

#[test]
fn test_parameter_index_out_of_range() {
    let db = Database::new();
    let message = invalid_sql_message(db.query("SELECT ?18446744073709551615", &[Value::from(1)]));
    assert!(message.contains("Parameter index out of range"), "{}", message);
    let message = invalid_sql_message(db.query("SELECT ?99999999999999999999", &[Value::from(1)]));
    assert!(message.contains("Parameter index out of range"), "{}", message);

    assert_eq!(scalar(&db, "SELECT ?"), Value::Null);
}

#[test]
fn test_bindings_do_not_leak_between_statements() {
    let db = setup();
    db.query("INSERT INTO t (a, b) VALUES (?, ?)", &[Value::from(1), Value::from("x")])
        .unwrap();
    db.query("INSERT INTO t (a, b) VALUES (?, ?)", &[]).unwrap();
    let t = db.table("t").unwrap();
    assert!(t.is_null(1, 0));
    assert!(t.is_null(1, 1));
}

#[test]
fn test_update_and_delete_change_nothing() {
    let db = setup();
    db.query("INSERT INTO t (a, b) VALUES (0, 'x')", &[]).unwrap();

    let result = db.query("UPDATE t SET a = 1 WHERE a = 0", &[]).unwrap();
    assert_eq!(result.column_name(0), Some("updated_rows"));
    assert_eq!(result.get_long(0, 0).unwrap(), 0);

    let result = db.query("DELETE FROM t WHERE a = 0", &[]).unwrap();
    assert_eq!(result.column_name(0), Some("deleted_rows"));
    assert_eq!(result.get_long(0, 0).unwrap(), 0);

    let t = db.table("t").unwrap();
    assert_eq!(t.row_count(), 1);
    assert_eq!(t.get_long(0, 0).unwrap(), 0);

    assert!(db.query("UPDATE nope SET a = 1", &[]).is_err());
}

#[test]
fn test_union_never_deduplicates() {
    let db = Database::new();
    db.query("CREATE TABLE t (a INTEGER)", &[]).unwrap();
    db.query("INSERT INTO t (a) VALUES (1)", &[]).unwrap();
    db.query("INSERT INTO t (a) VALUES (2)", &[]).unwrap();

    let result = db.query("SELECT * FROM t UNION SELECT * FROM t", &[]).unwrap();
    assert_eq!(result.row_count(), 4);
    assert_eq!(result.column_count(), 2);
    let firsts: Vec<i64> = (0..4).map(|r| result.get_long(r, 0).unwrap()).collect();
    assert_eq!(firsts, vec![1, 2, 1, 2]);

    let result = db.query("SELECT * FROM t UNION ALL SELECT * FROM t WHERE a > 1", &[]).unwrap();
    assert_eq!(result.row_count(), 3);
}

#[test]
fn test_select_where_and_projection() {
    let db = setup();
    for (a, b) in [(1, "one"), (2, "two"), (3, "three")] {
        db.query("INSERT INTO t (a, b) VALUES (?, ?)", &[Value::from(a), Value::from(b)])
            .unwrap();
    }
    let result = db.query("SELECT b, a * 10 FROM t WHERE a >= 2", &[]).unwrap();
    assert_eq!(result.row_count(), 2);
    assert_eq!(result.column_name(1), Some("a * 10"));
    assert_eq!(result.get_string(0, 0), "two");
    assert_eq!(result.get_long(1, 1).unwrap(), 30);

    let result = db.query("SELECT * FROM t WHERE b = 'one' OR a == 3", &[]).unwrap();
    assert_eq!(result.row_count(), 2);

    let result = db.query("SELECT a FROM t WHERE COALESCE(NULL, a) != 2", &[]).unwrap();
    assert_eq!(result.row_count(), 2);
}

#[test]
fn test_order_by_and_limit_do_not_shape_result() {
    let db = setup();
    for a in [3, 1, 2] {
        db.query("INSERT INTO t (a) VALUES (?)", &[Value::from(a)]).unwrap();
    }
    let result = db
        .query("SELECT a FROM t GROUP BY a ORDER BY a DESC, b LIMIT 1 OFFSET 1", &[])
        .unwrap();
    assert_eq!(result.row_count(), 3);
    assert_eq!(result.get_long(0, 0).unwrap(), 3);
}

#[test]
fn test_select_from_subquery() {
    let db = setup();
    for a in [1, 2, 3] {
        db.query("INSERT INTO t (a) VALUES (?)", &[Value::from(a)]).unwrap();
    }
    let result = db.query("SELECT a + 1 FROM (SELECT a FROM t WHERE a > 1) AS s", &[]).unwrap();
    assert_eq!(result.row_count(), 2);
    assert_eq!(result.get_long(1, 0).unwrap(), 4);
}

#[test]
fn test_select_star_without_from() {
    let db = Database::new();
    let message = invalid_sql_message(db.query("SELECT *", &[]));
    assert!(message.starts_with("No tables specified"), "{}", message);
}

#[test]
fn test_unimplemented_features_are_internal() {
    let db = setup();
    db.query("CREATE TABLE u (c INTEGER)", &[]).unwrap();

    for sql in [
        "SELECT * FROM t, u",
        "SELECT * FROM t LEFT OUTER JOIN u ON a = c",
        "SELECT * FROM t INTERSECT SELECT * FROM u",
        "SELECT * FROM t EXCEPT SELECT * FROM u",
        "SELECT 1 IN (1, 2)",
        "SELECT COALESCE(1, 2)",
    ] {
        let err = db.query(sql, &[]).unwrap_err();
        assert!(err.is_internal(), "{}: {:?}", sql, err);
    }
}

#[test]
fn test_parse_fault_marks_position() {
    let db = Database::new();
    let message = invalid_sql_message(db.query("CREATE TABLE t a INTEGER)", &[]));
    assert!(message.starts_with("( expected at "), "{}", message);
    assert!(message.contains("<<here>>"), "{}", message);

    let message = invalid_sql_message(db.query("SELECT 1 2", &[]));
    assert!(message.contains("; or end of statement expected"), "{}", message);
    assert!(message.ends_with("<<here>>2"), "{}", message);
}

#[test]
fn test_lex_fault_is_not_wrapped() {
    let db = Database::new();
    let err = db.query("SELECT #", &[]).unwrap_err();
    assert_eq!(err, PocketError::Lex { ch: '#', pos: 7 });
}

#[test]
fn test_unknown_statement() {
    let db = Database::new();
    let message = invalid_sql_message(db.query("VACUUM", &[]));
    assert!(message.contains("expected"), "{}", message);
}

#[test]
fn test_drop_table() {
    let db = setup();
    db.query("DROP TABLE t", &[]).unwrap();
    assert!(db.table("t").is_none());

    let message = invalid_sql_message(db.query("DROP TABLE t", &[]));
    assert!(message.contains("Table \"t\" does not exist"), "{}", message);
    db.query("DROP TABLE IF EXISTS t", &[]).unwrap();
    db.query("DROP INDEX IF EXISTS idx_t", &[]).unwrap();
}

#[test]
fn test_pragmas() {
    let db = setup();
    assert_eq!(scalar(&db, "PRAGMA user_version"), Value::Integer(0));
    let result = db.query("PRAGMA user_version = 12", &[]).unwrap();
    assert_eq!(result.column_count(), 0);
    assert_eq!(scalar(&db, "PRAGMA user_version;"), Value::Integer(12));
    assert_eq!(db.user_version(), 12);

    db.query("CREATE TABLE k (id INTEGER NOT NULL, name TEXT DEFAULT 'anon')", &[])
        .unwrap();
    let info = db.query("PRAGMA table_info(k)", &[]).unwrap();
    let names: Vec<&str> = (0..5).filter_map(|i| info.column_name(i)).collect();
    assert_eq!(names, vec!["cid", "name", "type", "notnull", "dflt_value"]);
    assert_eq!(info.row_count(), 2);
    assert_eq!(info.get_long(1, 0).unwrap(), 1);
    assert_eq!(info.get_string(1, 1), "name");
    assert!(info.is_null(1, 2));
    assert!(info.is_null(1, 3));
    assert_eq!(info.get_string(1, 4), "anon");
    assert!(info.is_null(0, 4));

    let err = db.query("PRAGMA foreign_keys", &[]).unwrap_err();
    assert!(matches!(err, PocketError::InvalidArgument(_)), "{:?}", err);
}

#[test]
fn test_desc() {
    let db = Database::new();
    db.query(
        "CREATE TABLE p (id INTEGER PRIMARY KEY, name TEXT NOT NULL, weight REAL DEFAULT 2)",
        &[],
    )
    .unwrap();
    let desc = db.query("DESC p", &[]).unwrap();
    let header: Vec<&str> = (0..6).filter_map(|i| desc.column_name(i)).collect();
    assert_eq!(header, vec!["Field", "Type", "Null", "Key", "Default", "Extra"]);
    assert_eq!(desc.row_count(), 3);

    let row = |r: usize| -> Vec<String> { (0..6).map(|c| desc.get_string(r, c)).collect() };
    assert_eq!(row(0), vec!["id", "integer", "YES", "PRI", "", ""]);
    assert_eq!(row(1), vec!["name", "text", "NO", "", "", ""]);
    assert_eq!(row(2), vec!["weight", "real", "YES", "", "2.0", ""]);

    let message = invalid_sql_message(db.query("DESC missing", &[]));
    assert!(message.contains("does not exist"), "{}", message);
}

#[test]
fn test_transactions_are_accepted() {
    let db = setup();
    for sql in [
        "BEGIN",
        "BEGIN IMMEDIATE TRANSACTION",
        "BEGIN deferred",
        "COMMIT",
        "COMMIT TRANSACTION",
        "END",
        "END TRANSACTION",
        "ROLLBACK",
        "ROLLBACK TRANSACTION;",
    ] {
        let result = db.query(sql, &[]).unwrap();
        assert_eq!(result.column_count(), 0, "{}", sql);
    }
}

#[test]
fn test_unstored_definitions_parse() {
    let db = setup();
    for sql in [
        "CREATE INDEX IF NOT EXISTS idx_a ON t (a)",
        "CREATE UNIQUE INDEX idx_ab ON t (a DESC, b COLLATE NOCASE)",
        "CREATE VIEW v AS SELECT a FROM t WHERE a > 1",
        "CREATE TEMP VIEW IF NOT EXISTS w AS SELECT * FROM t",
        "CREATE TRIGGER tr AFTER INSERT ON t FOR EACH ROW BEGIN UPDATE t SET a = 1; END",
        "CREATE TRIGGER tu BEFORE UPDATE OF a, b ON t WHEN 1 = 1 BEGIN DELETE FROM t; SELECT 1; END",
        "ANALYZE",
        "ANALYZE t",
    ] {
        db.query(sql, &[]).unwrap_or_else(|e| panic!("{}: {}", sql, e));
    }
    assert_eq!(db.table_names(), vec!["sqlite_stat1".to_string(), "t".to_string()]);
}

#[test]
fn test_temp_table_and_table_constraints() {
    let db = Database::new();
    db.query(
        "CREATE TEMPORARY TABLE IF NOT EXISTS pairs (x INTEGER, y INTEGER, PRIMARY KEY (x, y) ON CONFLICT REPLACE, UNIQUE (y))",
        &[],
    )
    .unwrap();
    assert_eq!(db.table("pairs").unwrap().column_count(), 2);
}

struct Catalog {
    db: Arc<Database>,
}

impl DatabaseResolver for Catalog {
    fn resolve(&self, file_name: &str) -> Option<Arc<Database>> {
        (file_name == "other.db").then(|| self.db.clone())
    }
}

#[test]
fn test_attach_through_resolver() {
    let other = Arc::new(Database::new());
    other.query("CREATE TABLE remote (x INTEGER)", &[]).unwrap();

    let db = Database::with_resolver(DBConfig::default(), Arc::new(Catalog { db: other.clone() }));
    db.query("ATTACH DATABASE 'other.db' AS aux", &[]).unwrap();
    db.query("ATTACH 'missing.db' AS gone", &[]).unwrap();

    assert_eq!(db.attached_aliases(), vec!["aux".to_string()]);
    let aux = db.attached("aux").unwrap();
    assert!(Arc::ptr_eq(&aux, &other));
    assert!(db.attached("gone").is_none());

    // Default resolver finds nothing
    let plain = Database::new();
    plain.query("ATTACH DATABASE 'other.db' AS aux", &[]).unwrap();
    assert!(plain.attached("aux").is_none());
}

struct Sensor {
    fields: Mutex<Vec<Value>>,
}

impl RowSource for Sensor {
    fn get(&self, column: usize) -> Value {
        self.fields.lock().get(column).cloned().unwrap_or_default()
    }

    fn set(&self, column: usize, value: Value) {
        let mut fields = self.fields.lock();
        if fields.len() <= column {
            fields.resize(column + 1, Value::Null);
        }
        fields[column] = value;
    }
}

#[test]
fn test_linked_rows() {
    let db = Database::new();
    db.query("CREATE TABLE sensors (id INTEGER, reading REAL)", &[]).unwrap();
    let sensor = Arc::new(Sensor {
        fields: Mutex::new(vec![Value::Integer(7), Value::Real(21.5)]),
    });
    let linked = db
        .link_rows("sensors", vec![sensor.clone() as Arc<dyn RowSource>])
        .unwrap();
    assert_eq!(linked, 1);

    let result = db.query("SELECT reading FROM sensors WHERE id = 7", &[]).unwrap();
    assert_eq!(result.get_double(0, 0).unwrap(), 21.5);

    sensor.set(1, Value::Real(30.0));
    let all = db.query("SELECT * FROM sensors", &[]).unwrap();
    assert_eq!(all.get_double(0, 1).unwrap(), 30.0);

    assert!(db.link_rows("missing", Vec::<Arc<dyn RowSource>>::new()).is_err());
}

#[test]
fn test_union_leaves_linked_rows_untouched() {
    let db = Database::new();
    db.query("CREATE TABLE sensors (id INTEGER, reading REAL)", &[]).unwrap();
    let sensor = Arc::new(Sensor {
        fields: Mutex::new(vec![Value::Integer(7), Value::Real(21.5)]),
    });
    db.link_rows("sensors", vec![sensor.clone() as Arc<dyn RowSource>])
        .unwrap();

    let result = db.query("SELECT * FROM sensors UNION SELECT 5", &[]).unwrap();
    assert_eq!(result.column_count(), 3);
    assert!(result.is_null(0, 2));
    assert_eq!(sensor.fields.lock().len(), 2);
}

#[test]
fn test_closed_database_rejects_queries() {
    let db = setup();
    db.close();
    assert!(matches!(db.query("SELECT 1", &[]), Err(PocketError::Dropped)));
    assert!(matches!(db.link_rows("t", Vec::<Arc<dyn RowSource>>::new()), Err(PocketError::Dropped)));
}

#[test]
fn test_prepared_statement() {
    let db = setup();
    let insert = db.prepare("INSERT INTO t (a, b) VALUES (?, ?)");
    insert.run(&[Value::from(1), Value::from("a")]).unwrap();
    insert.run(&[Value::from(2), Value::from("b")]).unwrap();
    let select = db.prepare("SELECT b FROM t WHERE a = ?");
    assert_eq!(select.run(&[Value::from(2)]).unwrap().get_string(0, 0), "b");
}

#[test]
fn test_concurrent_inserts_are_serialized() {
    let db = Arc::new(setup());
    let handles: Vec<_> = (0..4)
        .map(|worker| {
            let db = db.clone();
            std::thread::spawn(move || {
                for i in 0..25 {
                    db.query("INSERT INTO t (a) VALUES (?)", &[Value::from(worker * 100 + i)])
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(db.table("t").unwrap().row_count(), 100);
}

#[test]
fn test_database_dump() {
    let db = setup();
    db.query("INSERT INTO t (a, b) VALUES (1, 'x')", &[]).unwrap();
    let dump = db.to_string();
    assert!(dump.contains("user_version: 0"));
    assert!(dump.contains("t:"));
    assert!(!dump.contains("sqlite_stat1"));
}
