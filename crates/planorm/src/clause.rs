//! Query clauses.
//!
//! Every operation takes an ordered list of [`Clause`] values. Each clause renders its own
//! SQL fragment ([`Clause::emit_sql`]) and its own positional arguments
//! ([`Clause::emit_args`]); both walk the clause in the same order so placeholders and
//! arguments always line up.
//!
//! The rendered fragment of each clause is also part of a call's shape signature, which is
//! why fragments never contain literal values.

use crate::cond::{Cond, emit_wrapped};
use crate::ident::write_field;
use crate::value::{Assign, Value, ValueMap};

/// Discriminant of a [`Clause`], recorded in shape signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClauseKind {
    Fields,
    Join,
    Where,
    GroupBy,
    Having,
    OrderBy,
    Limit,
    IndexedBy,
    OnConflictUpdate,
}

impl ClauseKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ClauseKind::Fields => "fields",
            ClauseKind::Join => "join",
            ClauseKind::Where => "where",
            ClauseKind::GroupBy => "group_by",
            ClauseKind::Having => "having",
            ClauseKind::OrderBy => "order_by",
            ClauseKind::Limit => "limit",
            ClauseKind::IndexedBy => "indexed_by",
            ClauseKind::OnConflictUpdate => "on_conflict",
        }
    }
}

/// Join flavour for the typed join constructors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Left,
    Right,
    Inner,
    Full,
}

impl JoinKind {
    pub fn keyword(self) -> &'static str {
        match self {
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Right => "RIGHT JOIN",
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Full => "FULL OUTER JOIN",
        }
    }
}

/// The `ON` part of a typed join.
#[derive(Debug, Clone, PartialEq)]
pub enum JoinOn {
    None,
    Raw { sql: String, args: Vec<Value> },
    Conds(Vec<Cond>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Join {
    /// Appended verbatim after a space, e.g. `join b on a.id=b.aid`.
    Raw(String),
    Typed {
        kind: JoinKind,
        table: String,
        on: JoinOn,
    },
}

/// Rendered `on conflict(...) do update set ...` text with its arguments.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OnConflict {
    sql: String,
    args: Vec<Value>,
}

/// A single query clause.
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    /// Column list. As the first clause of a select it defines the projection; for insert and
    /// update it restricts the written columns.
    Fields(Vec<String>),
    Join(Join),
    Where(Vec<Cond>),
    GroupBy(Vec<String>),
    Having(Vec<Cond>),
    OrderBy(Vec<String>),
    Limit { limit: i64, offset: Option<i64> },
    IndexedBy(String),
    OnConflictUpdate(OnConflict),
}

impl Clause {
    pub fn kind(&self) -> ClauseKind {
        match self {
            Clause::Fields(_) => ClauseKind::Fields,
            Clause::Join(_) => ClauseKind::Join,
            Clause::Where(_) => ClauseKind::Where,
            Clause::GroupBy(_) => ClauseKind::GroupBy,
            Clause::Having(_) => ClauseKind::Having,
            Clause::OrderBy(_) => ClauseKind::OrderBy,
            Clause::Limit { .. } => ClauseKind::Limit,
            Clause::IndexedBy(_) => ClauseKind::IndexedBy,
            Clause::OnConflictUpdate(_) => ClauseKind::OnConflictUpdate,
        }
    }

    /// The column list of a [`Clause::Fields`].
    pub fn as_fields(&self) -> Option<&[String]> {
        match self {
            Clause::Fields(fields) => Some(fields),
            _ => None,
        }
    }

    /// Append this clause's SQL fragment.
    pub fn emit_sql(&self, out: &mut String) {
        match self {
            Clause::Fields(fields) => {
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    if field == "*" {
                        out.push('*');
                    } else {
                        write_field(out, field);
                    }
                }
            }
            Clause::Join(join) => emit_join(join, out),
            Clause::Where(conds) => emit_predicate(" where ", conds, out),
            Clause::Having(conds) => emit_predicate(" having ", conds, out),
            Clause::GroupBy(fields) => emit_list(" group by ", fields, out),
            Clause::OrderBy(orders) => emit_list(" order by ", orders, out),
            Clause::Limit { offset, .. } => {
                out.push_str(" limit ?");
                if offset.is_some() {
                    out.push_str(" offset ?");
                }
            }
            Clause::IndexedBy(index) => {
                out.push_str(" indexed by ");
                out.push_str(index);
            }
            Clause::OnConflictUpdate(oc) => out.push_str(&oc.sql),
        }
    }

    /// Append this clause's positional arguments.
    pub fn emit_args(&self, out: &mut Vec<Value>) {
        match self {
            Clause::Join(Join::Typed { on, .. }) => match on {
                JoinOn::None => {}
                JoinOn::Raw { args, .. } => out.extend(args.iter().cloned()),
                JoinOn::Conds(conds) => conds.iter().for_each(|c| c.emit_args(out)),
            },
            Clause::Where(conds) | Clause::Having(conds) => {
                conds.iter().for_each(|c| c.emit_args(out));
            }
            Clause::Limit { limit, offset } => {
                out.push(Value::Int(*limit));
                if let Some(offset) = offset {
                    out.push(Value::Int(*offset));
                }
            }
            Clause::OnConflictUpdate(oc) => out.extend(oc.args.iter().cloned()),
            Clause::Fields(_)
            | Clause::Join(Join::Raw(_))
            | Clause::GroupBy(_)
            | Clause::OrderBy(_)
            | Clause::IndexedBy(_) => {}
        }
    }

    /// Rendered SQL fragment as an owned string.
    pub fn to_sql(&self) -> String {
        let mut out = String::new();
        self.emit_sql(&mut out);
        out
    }
}

fn emit_list(keyword: &str, items: &[String], out: &mut String) {
    out.push_str(keyword);
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        write_field(out, item);
    }
}

// An `or` group is wrapped only when it sits next to other top-level conditions.
fn emit_predicate(keyword: &str, conds: &[Cond], out: &mut String) {
    if conds.is_empty() {
        return;
    }
    out.push_str(keyword);
    for (i, cond) in conds.iter().enumerate() {
        if i > 0 {
            out.push_str(" and ");
        }
        let wrap = cond.is_or() && cond.width() > 1 && conds.len() > 1;
        emit_wrapped(cond, out, wrap);
    }
}

fn emit_join(join: &Join, out: &mut String) {
    out.push(' ');
    match join {
        Join::Raw(stmt) => out.push_str(stmt),
        Join::Typed { kind, table, on } => {
            out.push_str(kind.keyword());
            out.push(' ');
            write_field(out, table);
            match on {
                JoinOn::None => {}
                JoinOn::Raw { sql, .. } => {
                    out.push_str(" ON ");
                    out.push_str(sql);
                }
                JoinOn::Conds(conds) if conds.is_empty() => {}
                JoinOn::Conds(conds) => {
                    out.push_str(" ON ");
                    for (i, cond) in conds.iter().enumerate() {
                        if i > 0 {
                            out.push_str(" AND ");
                        }
                        emit_wrapped(cond, out, cond.is_group() && cond.width() > 1);
                    }
                }
            }
        }
    }
}

fn strings<I>(items: I) -> Vec<String>
where
    I: IntoIterator,
    I::Item: Into<String>,
{
    items.into_iter().map(Into::into).collect()
}

fn predicate(conds: impl IntoIterator<Item = Cond>) -> Vec<Cond> {
    conds.into_iter().filter(|c| !c.is_empty_group()).collect()
}

/// Column list; `*` is kept as is.
pub fn fields<I>(names: I) -> Clause
where
    I: IntoIterator,
    I::Item: Into<String>,
{
    Clause::Fields(strings(names))
}

/// A raw join statement, appended after a space.
pub fn join(stmt: impl Into<String>) -> Clause {
    Clause::Join(Join::Raw(stmt.into()))
}

fn typed_join(kind: JoinKind, table: impl Into<String>, on: JoinOn) -> Clause {
    Clause::Join(Join::Typed {
        kind,
        table: table.into(),
        on,
    })
}

fn raw_on<I>(sql: impl Into<String>, args: I) -> JoinOn
where
    I: IntoIterator,
    I::Item: Into<Value>,
{
    JoinOn::Raw {
        sql: sql.into(),
        args: args.into_iter().map(Into::into).collect(),
    }
}

/// `LEFT JOIN table ON c1 AND c2`
pub fn left_join(table: impl Into<String>, on: impl IntoIterator<Item = Cond>) -> Clause {
    typed_join(JoinKind::Left, table, JoinOn::Conds(on.into_iter().collect()))
}

/// `RIGHT JOIN table ON c1 AND c2`
pub fn right_join(table: impl Into<String>, on: impl IntoIterator<Item = Cond>) -> Clause {
    typed_join(JoinKind::Right, table, JoinOn::Conds(on.into_iter().collect()))
}

/// `INNER JOIN table ON c1 AND c2`
pub fn inner_join(table: impl Into<String>, on: impl IntoIterator<Item = Cond>) -> Clause {
    typed_join(JoinKind::Inner, table, JoinOn::Conds(on.into_iter().collect()))
}

/// `FULL OUTER JOIN table ON c1 AND c2`
pub fn full_join(table: impl Into<String>, on: impl IntoIterator<Item = Cond>) -> Clause {
    typed_join(JoinKind::Full, table, JoinOn::Conds(on.into_iter().collect()))
}

/// `LEFT JOIN table ON <sql>` with placeholder arguments.
pub fn left_join_raw<I>(table: impl Into<String>, on: impl Into<String>, args: I) -> Clause
where
    I: IntoIterator,
    I::Item: Into<Value>,
{
    typed_join(JoinKind::Left, table, raw_on(on, args))
}

/// `RIGHT JOIN table ON <sql>` with placeholder arguments.
pub fn right_join_raw<I>(table: impl Into<String>, on: impl Into<String>, args: I) -> Clause
where
    I: IntoIterator,
    I::Item: Into<Value>,
{
    typed_join(JoinKind::Right, table, raw_on(on, args))
}

/// `INNER JOIN table ON <sql>` with placeholder arguments.
pub fn inner_join_raw<I>(table: impl Into<String>, on: impl Into<String>, args: I) -> Clause
where
    I: IntoIterator,
    I::Item: Into<Value>,
{
    typed_join(JoinKind::Inner, table, raw_on(on, args))
}

/// `FULL OUTER JOIN table ON <sql>` with placeholder arguments.
pub fn full_join_raw<I>(table: impl Into<String>, on: impl Into<String>, args: I) -> Clause
where
    I: IntoIterator,
    I::Item: Into<Value>,
{
    typed_join(JoinKind::Full, table, raw_on(on, args))
}

/// ` where c1 and c2`. Empty combinators are dropped; with no conditions left the clause
/// renders nothing.
pub fn where_(conds: impl IntoIterator<Item = Cond>) -> Clause {
    Clause::Where(predicate(conds))
}

/// ` group by f1,f2`
pub fn group_by<I>(names: I) -> Clause
where
    I: IntoIterator,
    I::Item: Into<String>,
{
    Clause::GroupBy(strings(names))
}

/// ` having c1 and c2`, rendered like [`where_`].
pub fn having(conds: impl IntoIterator<Item = Cond>) -> Clause {
    Clause::Having(predicate(conds))
}

/// ` order by o1,o2`. Entries such as `id desc` are written verbatim.
pub fn order_by<I>(orders: I) -> Clause
where
    I: IntoIterator,
    I::Item: Into<String>,
{
    Clause::OrderBy(strings(orders))
}

/// ` limit ?`
pub fn limit(n: i64) -> Clause {
    Clause::Limit {
        limit: n,
        offset: None,
    }
}

/// ` limit ? offset ?`
pub fn limit_offset(n: i64, offset: i64) -> Clause {
    Clause::Limit {
        limit: n,
        offset: Some(offset),
    }
}

/// ` indexed by <index>`
pub fn indexed_by(index: impl Into<String>) -> Clause {
    Clause::IndexedBy(index.into())
}

/// ` on conflict(k1,k2) do update set a=?,b=b+1`.
///
/// Assignments are rendered in column order. [`Assign::Expr`] entries are written verbatim
/// after `=`; bound entries become placeholders. An empty map renders nothing.
pub fn on_conflict_do_update_set<I>(keys: I, set: &ValueMap) -> Clause
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut oc = OnConflict::default();
    if set.is_empty() {
        return Clause::OnConflictUpdate(oc);
    }

    oc.sql.push_str(" on conflict(");
    for (i, key) in keys.into_iter().enumerate() {
        if i > 0 {
            oc.sql.push(',');
        }
        write_field(&mut oc.sql, key.as_ref());
    }
    oc.sql.push_str(") do update set ");

    for (i, (column, assign)) in set.iter().enumerate() {
        if i > 0 {
            oc.sql.push(',');
        }
        write_field(&mut oc.sql, column);
        match assign {
            Assign::Expr(expr) => {
                oc.sql.push('=');
                oc.sql.push_str(expr);
            }
            Assign::Bind(value) => {
                oc.sql.push_str("=?");
                oc.args.push(value.clone());
            }
        }
    }

    Clause::OnConflictUpdate(oc)
}
