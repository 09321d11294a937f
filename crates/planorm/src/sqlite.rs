//! [`Executor`] implementation for `rusqlite::Connection`.
//!
//! Statements go through the connection's prepared-statement cache, so a compiled plan that
//! is reused also reuses the prepared statement. Time values are bound as
//! `YYYY-MM-DD hh:mm:ss` text.

use crate::error::{OrmError, OrmResult};
use crate::executor::{ExecResult, Executor, Row};
use crate::timefmt::format_time;
use crate::value::Value;
use rusqlite::types::{ToSql, ToSqlOutput, ValueRef};
use rusqlite::{Connection, params_from_iter};

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        use rusqlite::types::Value as Sql;

        Ok(match self {
            Value::Null => ToSqlOutput::Owned(Sql::Null),
            Value::Bool(b) => ToSqlOutput::Owned(Sql::Integer(i64::from(*b))),
            Value::Int(i) => ToSqlOutput::Owned(Sql::Integer(*i)),
            Value::Float(f) => ToSqlOutput::Owned(Sql::Real(*f)),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Value::Bytes(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b.as_slice())),
            Value::Time(t) => ToSqlOutput::Owned(Sql::Text(format_time(t))),
        })
    }
}

fn read_column(row: &rusqlite::Row<'_>, index: usize) -> OrmResult<Value> {
    Ok(match row.get_ref(index)? {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Int(i),
        ValueRef::Real(f) => Value::Float(f),
        ValueRef::Text(bytes) => Value::Text(
            std::str::from_utf8(bytes)
                .map_err(|e| OrmError::conversion("", format!("column {index} is not UTF-8: {e}")))?
                .to_string(),
        ),
        ValueRef::Blob(bytes) => Value::Bytes(bytes.to_vec()),
    })
}

fn read_row(row: &rusqlite::Row<'_>, width: usize) -> OrmResult<Row> {
    (0..width).map(|i| read_column(row, i)).collect()
}

impl Executor for Connection {
    fn query_row(&self, sql: &str, args: &[Value]) -> OrmResult<Option<Row>> {
        let mut stmt = self.prepare_cached(sql)?;
        let width = stmt.column_count();
        let mut rows = stmt.query(params_from_iter(args.iter()))?;
        match rows.next()? {
            Some(row) => read_row(row, width).map(Some),
            None => Ok(None),
        }
    }

    fn query(&self, sql: &str, args: &[Value]) -> OrmResult<Vec<Row>> {
        let mut stmt = self.prepare_cached(sql)?;
        let width = stmt.column_count();
        let mut rows = stmt.query(params_from_iter(args.iter()))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(read_row(row, width)?);
        }
        Ok(out)
    }

    fn execute(&self, sql: &str, args: &[Value]) -> OrmResult<ExecResult> {
        let mut stmt = self.prepare_cached(sql)?;
        let affected = stmt.execute(params_from_iter(args.iter()))?;
        Ok(ExecResult {
            rows_affected: affected as u64,
            last_insert_id: Some(self.last_insert_rowid()),
        })
    }
}
