//! Executor trait for running compiled SQL.

use crate::error::OrmResult;
use crate::value::Value;
use std::sync::Arc;

/// One result row, columns in projection order.
pub type Row = Vec<Value>;

/// Outcome of a statement that does not return rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecResult {
    pub rows_affected: u64,
    /// Id generated by the last insert, when the backend reports one.
    pub last_insert_id: Option<i64>,
}

/// A connection, transaction or any other handle that can run SQL.
///
/// SQL uses `?` placeholders and backtick-quoted identifiers. Implementations bind `args`
/// positionally and surface their own failures as [`OrmError::Execution`](crate::OrmError).
pub trait Executor {
    /// Run a query and return the first row.
    ///
    /// Semantics:
    /// - 0 rows: returns `Ok(None)`
    /// - 1 or more rows: returns the first row
    fn query_row(&self, sql: &str, args: &[Value]) -> OrmResult<Option<Row>>;

    /// Run a query and return all rows.
    fn query(&self, sql: &str, args: &[Value]) -> OrmResult<Vec<Row>>;

    /// Run a statement and report affected rows and the generated id.
    fn execute(&self, sql: &str, args: &[Value]) -> OrmResult<ExecResult>;
}

impl<E: Executor + ?Sized> Executor for &E {
    fn query_row(&self, sql: &str, args: &[Value]) -> OrmResult<Option<Row>> {
        (**self).query_row(sql, args)
    }

    fn query(&self, sql: &str, args: &[Value]) -> OrmResult<Vec<Row>> {
        (**self).query(sql, args)
    }

    fn execute(&self, sql: &str, args: &[Value]) -> OrmResult<ExecResult> {
        (**self).execute(sql, args)
    }
}

impl<E: Executor + ?Sized> Executor for Box<E> {
    fn query_row(&self, sql: &str, args: &[Value]) -> OrmResult<Option<Row>> {
        (**self).query_row(sql, args)
    }

    fn query(&self, sql: &str, args: &[Value]) -> OrmResult<Vec<Row>> {
        (**self).query(sql, args)
    }

    fn execute(&self, sql: &str, args: &[Value]) -> OrmResult<ExecResult> {
        (**self).execute(sql, args)
    }
}

impl<E: Executor + ?Sized> Executor for Arc<E> {
    fn query_row(&self, sql: &str, args: &[Value]) -> OrmResult<Option<Row>> {
        (**self).query_row(sql, args)
    }

    fn query(&self, sql: &str, args: &[Value]) -> OrmResult<Vec<Row>> {
        (**self).query(sql, args)
    }

    fn execute(&self, sql: &str, args: &[Value]) -> OrmResult<ExecResult> {
        (**self).execute(sql, args)
    }
}

/// Serializes access to an executor that is not itself `Sync`, such as a single SQLite
/// connection shared between threads.
impl<E: Executor> Executor for parking_lot::Mutex<E> {
    fn query_row(&self, sql: &str, args: &[Value]) -> OrmResult<Option<Row>> {
        self.lock().query_row(sql, args)
    }

    fn query(&self, sql: &str, args: &[Value]) -> OrmResult<Vec<Row>> {
        self.lock().query(sql, args)
    }

    fn execute(&self, sql: &str, args: &[Value]) -> OrmResult<ExecResult> {
        self.lock().execute(sql, args)
    }
}
