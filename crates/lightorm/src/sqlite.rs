//! SQLite executor backed by `rusqlite`.
//!
//! SQLite understands the dialect the query builder emits: backtick-quoted
//! identifiers, `:name` and `?` placeholders, and `limit <offset>, <take>`.
//! This makes it the bundled engine for tests and embedded use.

use crate::error::OrmResult;
use crate::executor::{Executor, Params};
use crate::row::{Row, RowSet};
use crate::value::Value;
use rusqlite::types::{ToSql, ToSqlOutput, ValueRef};

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        use rusqlite::types::Value as Sv;

        Ok(match self {
            Value::Null => ToSqlOutput::Owned(Sv::Null),
            Value::Bool(b) => ToSqlOutput::Owned(Sv::Integer(i64::from(*b))),
            Value::Int(v) => ToSqlOutput::Owned(Sv::Integer(*v)),
            Value::Float(v) => ToSqlOutput::Owned(Sv::Real(*v)),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Value::Bytes(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
        })
    }
}

impl From<ValueRef<'_>> for Value {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(v) => Value::Int(v),
            ValueRef::Real(v) => Value::Float(v),
            ValueRef::Text(b) => Value::Text(String::from_utf8_lossy(b).into_owned()),
            ValueRef::Blob(b) => Value::Bytes(b.to_vec()),
        }
    }
}

impl Executor for rusqlite::Connection {
    fn execute(&self, sql: &str, params: &Params) -> OrmResult<RowSet> {
        let mut stmt = self.prepare(sql)?;

        match params {
            Params::Named(bindings) => {
                for (name, value) in bindings {
                    let placeholder = format!(":{name}");
                    match stmt.parameter_index(&placeholder)? {
                        Some(idx) => stmt.raw_bind_parameter(idx, value)?,
                        // Bindings are accumulated per builder, so a statement
                        // may legitimately not reference every one of them.
                        None => tracing::trace!(
                            target: "lightorm.sql",
                            placeholder = %placeholder,
                            "binding not referenced by statement"
                        ),
                    }
                }
            }
            Params::Positional(values) => {
                for (i, value) in values.iter().enumerate() {
                    stmt.raw_bind_parameter(i + 1, value)?;
                }
            }
        }

        if stmt.column_count() > 0 {
            let names: Vec<String> = stmt
                .column_names()
                .into_iter()
                .map(str::to_string)
                .collect();

            let mut out = Vec::new();
            let mut rows = stmt.raw_query();
            while let Some(row) = rows.next()? {
                let mut mapped = Row::new();
                for (i, name) in names.iter().enumerate() {
                    mapped.insert(name.as_str(), Value::from(row.get_ref(i)?));
                }
                out.push(mapped);
            }
            Ok(RowSet::from_rows(out))
        } else {
            let affected = stmt.raw_execute()?;
            Ok(RowSet::affected(affected as u64).with_last_insert_id(self.last_insert_rowid()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::Bindings;

    fn conn() -> rusqlite::Connection {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE t (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT, score REAL);",
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_positional_insert_reports_rowid() {
        let conn = conn();
        let set = Executor::execute(
            &conn,
            "insert into `t` ( `name` ) values ( ? ) ;",
            &Params::Positional(vec![Value::from("a")]),
        )
        .unwrap();
        assert_eq!(set.row_count, 1);
        assert_eq!(set.last_insert_id, Some(Value::Int(1)));
    }

    #[test]
    fn test_named_select_ignores_unreferenced_bindings() {
        let conn = conn();
        conn.execute("INSERT INTO t (name, score) VALUES ('a', 1.5)", [])
            .unwrap();

        let mut bindings = Bindings::new();
        bindings.insert("placeholder0".into(), Value::from("a"));
        bindings.insert("unused".into(), Value::from(1));

        let set = Executor::execute(
            &conn,
            "select * from `t` where (`name` = :placeholder0) ;",
            &Params::Named(bindings),
        )
        .unwrap();

        assert_eq!(set.row_count, 1);
        let row = &set.rows[0];
        assert_eq!(row.get("id"), Some(&Value::Int(1)));
        assert_eq!(row.get("score"), Some(&Value::Float(1.5)));
    }

    #[test]
    fn test_store_error_propagates() {
        let conn = conn();
        let err = Executor::execute(&conn, "select * from `missing` ;", &Params::none())
            .unwrap_err();
        assert!(matches!(err, crate::OrmError::Sqlite(_)));
    }
}
