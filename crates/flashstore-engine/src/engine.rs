// ABOUTME: The live in-memory SQL execution context backed by a rusqlite connection.
// ABOUTME: Executes statements with JSON params, materializes rows as JSON objects, introspects columns.

use rusqlite::types::{ToSql, ToSqlOutput, Value as SqlValue, ValueRef};
use rusqlite::{Connection, params_from_iter};
use serde_json::Value;

use crate::error::EngineError;

/// A query result row: column name to JSON value.
pub type Row = serde_json::Map<String, Value>;

/// The live in-memory engine instance.
///
/// Holds the loaded dataset in volatile memory. Not safe for access from
/// more than one logical flow of control; the store serializes all access
/// through a single writer. During recovery the whole instance is replaced
/// by a fresh one loaded from the snapshot; instances are never merged.
#[derive(Debug)]
pub struct Engine {
    conn: Connection,
}

impl Engine {
    /// Create an empty in-memory engine.
    pub fn in_memory() -> Result<Self, EngineError> {
        let conn = Connection::open_in_memory().map_err(EngineError::classify)?;
        Ok(Self { conn })
    }

    /// Wrap an existing connection, e.g. one populated from a snapshot.
    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    /// Borrow the underlying connection for snapshot export.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Execute a single mutating or DDL statement with positional JSON params.
    /// Returns the number of rows changed.
    pub fn execute(&self, sql: &str, params: &[Value]) -> Result<usize, EngineError> {
        self.conn
            .execute(sql, params_from_iter(params.iter().map(JsonParam)))
            .map_err(EngineError::classify)
    }

    /// Run a query and return the first row, or None if the result is empty.
    pub fn query_one(&self, sql: &str, params: &[Value]) -> Result<Option<Row>, EngineError> {
        let mut rows = self.query_all(sql, params)?;
        if rows.is_empty() {
            Ok(None)
        } else {
            Ok(Some(rows.swap_remove(0)))
        }
    }

    /// Run a query and return all rows as JSON objects, or an empty Vec.
    pub fn query_all(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, EngineError> {
        let mut stmt = self.conn.prepare(sql).map_err(EngineError::classify)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        let mut rows = stmt
            .query(params_from_iter(params.iter().map(JsonParam)))
            .map_err(EngineError::classify)?;

        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(EngineError::classify)? {
            let mut object = Row::new();
            for (idx, name) in columns.iter().enumerate() {
                let value = row.get_ref(idx).map_err(EngineError::classify)?;
                object.insert(name.clone(), column_value(value));
            }
            out.push(object);
        }

        Ok(out)
    }

    /// List the column names of a table via `PRAGMA table_info`.
    /// Returns an empty Vec if the table does not exist.
    pub fn table_columns(&self, table: &str) -> Result<Vec<String>, EngineError> {
        let sql = format!("PRAGMA table_info({table})");
        let mut stmt = self.conn.prepare(&sql).map_err(EngineError::classify)?;
        let mut rows = stmt.query([]).map_err(EngineError::classify)?;

        let mut names = Vec::new();
        while let Some(row) = rows.next().map_err(EngineError::classify)? {
            let name: String = row.get(1).map_err(EngineError::classify)?;
            names.push(name);
        }

        Ok(names)
    }
}

/// Adapter binding a JSON value as a positional SQL parameter.
struct JsonParam<'a>(&'a Value);

impl ToSql for JsonParam<'_> {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self.0 {
            Value::Null => ToSqlOutput::Owned(SqlValue::Null),
            Value::Bool(b) => ToSqlOutput::Owned(SqlValue::Integer(i64::from(*b))),
            Value::Number(n) => match n.as_i64() {
                Some(i) => ToSqlOutput::Owned(SqlValue::Integer(i)),
                None => ToSqlOutput::Owned(SqlValue::Real(n.as_f64().unwrap_or_default())),
            },
            Value::String(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            // Arrays and objects are stored as their JSON text form
            other => ToSqlOutput::Owned(SqlValue::Text(other.to_string())),
        })
    }
}

/// Convert a SQLite column value to its JSON representation.
fn column_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::from(b.to_vec()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn engine_with_table() -> Engine {
        let engine = Engine::in_memory().unwrap();
        engine
            .execute(
                "CREATE TABLE items (id INTEGER PRIMARY KEY, name TEXT NOT NULL, score REAL, flag BOOLEAN)",
                &[],
            )
            .unwrap();
        engine
    }

    #[test]
    fn execute_and_query_round_trip() {
        let engine = engine_with_table();

        let changed = engine
            .execute(
                "INSERT INTO items (name, score, flag) VALUES (?1, ?2, ?3)",
                &[json!("widget"), json!(4.5), json!(true)],
            )
            .unwrap();
        assert_eq!(changed, 1);

        let row = engine
            .query_one("SELECT name, score, flag FROM items WHERE name = ?1", &[json!("widget")])
            .unwrap()
            .expect("row should exist");

        assert_eq!(row["name"], json!("widget"));
        assert_eq!(row["score"], json!(4.5));
        assert_eq!(row["flag"], json!(1));
    }

    #[test]
    fn query_one_returns_none_on_empty_result() {
        let engine = engine_with_table();
        let row = engine
            .query_one("SELECT * FROM items WHERE name = ?1", &[json!("missing")])
            .unwrap();
        assert!(row.is_none());
    }

    #[test]
    fn query_all_returns_empty_vec_for_no_rows() {
        let engine = engine_with_table();
        let rows = engine.query_all("SELECT * FROM items", &[]).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn query_all_preserves_insertion_order() {
        let engine = engine_with_table();
        for name in ["a", "b", "c"] {
            engine
                .execute("INSERT INTO items (name) VALUES (?1)", &[json!(name)])
                .unwrap();
        }

        let rows = engine
            .query_all("SELECT name FROM items ORDER BY id", &[])
            .unwrap();
        let names: Vec<_> = rows.iter().map(|r| r["name"].clone()).collect();
        assert_eq!(names, vec![json!("a"), json!("b"), json!("c")]);
    }

    #[test]
    fn null_params_bind_as_null() {
        let engine = engine_with_table();
        engine
            .execute(
                "INSERT INTO items (name, score) VALUES (?1, ?2)",
                &[json!("nothing"), Value::Null],
            )
            .unwrap();

        let row = engine
            .query_one("SELECT score FROM items WHERE name = 'nothing'", &[])
            .unwrap()
            .unwrap();
        assert_eq!(row["score"], Value::Null);
    }

    #[test]
    fn malformed_sql_is_terminal() {
        let engine = engine_with_table();
        let err = engine.execute("INSRT INTO items VALUES (1)", &[]).unwrap_err();
        assert!(!err.is_recoverable());
    }

    #[test]
    fn constraint_violation_is_terminal() {
        let engine = engine_with_table();
        let err = engine
            .execute("INSERT INTO items (name) VALUES (?1)", &[Value::Null])
            .unwrap_err();
        assert!(!err.is_recoverable(), "NOT NULL violation must not be retried");
    }

    #[test]
    fn table_columns_lists_declared_columns() {
        let engine = engine_with_table();
        let columns = engine.table_columns("items").unwrap();
        assert_eq!(columns, vec!["id", "name", "score", "flag"]);
    }

    #[test]
    fn table_columns_empty_for_missing_table() {
        let engine = Engine::in_memory().unwrap();
        let columns = engine.table_columns("ghost").unwrap();
        assert!(columns.is_empty());
    }
}
