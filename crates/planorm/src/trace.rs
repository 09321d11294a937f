//! `tracing` events for executed and compiled SQL.
//!
//! Statements are logged at `DEBUG` on the `planorm.sql` target, before execution, when a
//! table runs in debug mode. Plan compilations are logged at `TRACE` regardless.

use crate::plan::Operation;
use crate::value::Value;
use std::borrow::Cow;

/// Tracing target for all SQL events.
pub const SQL_TARGET: &str = "planorm.sql";

pub(crate) fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}

fn display_sql(sql: &str, max: Option<usize>) -> Cow<'_, str> {
    match max {
        Some(max) if sql.len() > max => Cow::Owned(format!("{}...", truncate_sql_bytes(sql, max))),
        _ => Cow::Borrowed(sql),
    }
}

/// Emit the statement that is about to run.
pub(crate) fn statement(
    table: &str,
    op: Operation,
    reused: bool,
    sql: &str,
    args: &[Value],
    max_sql_length: Option<usize>,
) {
    let sql = display_sql(sql, max_sql_length);
    tracing::debug!(
        target: SQL_TARGET,
        table,
        op = op.as_str(),
        reused,
        param_count = args.len(),
        sql = %sql,
        args = ?args,
    );
}

/// Emit a freshly compiled plan.
pub(crate) fn compiled(table: &str, op: Operation, signature: &str, sql: &str) {
    tracing::trace!(
        target: SQL_TARGET,
        table,
        op = op.as_str(),
        signature,
        sql,
        "compiled plan",
    );
}
