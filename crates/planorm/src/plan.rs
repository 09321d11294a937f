//! Plan compilation.
//!
//! A [`CompiledPlan`] holds everything about a call that does not depend on the values being
//! bound: the SQL text, where each per-row argument comes from ([`Binding`]), and where each
//! result column goes ([`Projection`]). Clause arguments are not part of the plan; they are
//! collected fresh from the clauses on every call.

use crate::clause::Clause;
use crate::error::{OrmError, OrmResult};
use crate::ident::write_field;
use crate::record::RecordShape;
use crate::value::{Assign, ValueMap};
use std::sync::Arc;

/// Statement prefix for the insert family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InsertMode {
    Insert,
    Ignore,
    Replace,
}

impl InsertMode {
    pub fn prefix(self) -> &'static str {
        match self {
            InsertMode::Insert => "insert into ",
            InsertMode::Ignore => "insert or ignore into ",
            InsertMode::Replace => "replace into ",
        }
    }
}

/// The operation a plan was compiled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Select,
    Insert(InsertMode),
    Update,
    Delete,
    Exec,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Select => "select",
            Operation::Insert(InsertMode::Insert) => "insert",
            Operation::Insert(InsertMode::Ignore) => "insert_ignore",
            Operation::Insert(InsertMode::Replace) => "replace_into",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::Exec => "exec",
        }
    }
}

/// Source of one per-row argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    /// Record field at this descriptor index.
    Field(usize),
    /// Value stored under this key of a [`ValueMap`].
    Key(String),
}

/// Destination of one result column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    /// Record field at this descriptor index.
    Field(usize),
    /// Key of a [`ValueMap`] destination.
    Key(String),
    /// The single column of a scalar destination.
    Scalar,
}

/// SQL text plus value plumbing for one call shape.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledPlan {
    sql: Arc<str>,
    bindings: Vec<Binding>,
    projection: Vec<Projection>,
    rows: usize,
}

impl CompiledPlan {
    fn new(sql: String, bindings: Vec<Binding>, projection: Vec<Projection>, rows: usize) -> Self {
        Self {
            sql: Arc::from(sql),
            bindings,
            projection,
            rows,
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn shared_sql(&self) -> Arc<str> {
        Arc::clone(&self.sql)
    }

    /// Per-row argument sources, in placeholder order.
    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    /// Result column destinations, in column order.
    pub fn projection(&self) -> &[Projection] {
        &self.projection
    }

    /// Number of rows the bindings repeat for (batch inserts); 1 otherwise.
    pub fn rows(&self) -> usize {
        self.rows
    }
}

/// What a select writes into.
#[derive(Debug, Clone, Copy)]
pub enum SelectInto<'a> {
    Record(&'a RecordShape),
    Map,
    Scalar,
}

/// Where insert and update values come from.
#[derive(Debug, Clone, Copy)]
pub enum Columns<'a> {
    Record(&'a RecordShape),
    Map(&'a ValueMap),
}

/// Split a leading `Fields` clause from the rest.
pub fn split_fields(clauses: &[Clause]) -> (Option<&[String]>, &[Clause]) {
    match clauses.split_first() {
        Some((first, rest)) => match first.as_fields() {
            Some(fields) => (Some(fields), rest),
            None => (None, clauses),
        },
        None => (None, clauses),
    }
}

fn emit_rest(sql: &mut String, rest: &[Clause]) {
    for clause in rest {
        clause.emit_sql(sql);
    }
}

fn push_column(sql: &mut String, first: &mut bool, column: &str) {
    if !*first {
        sql.push(',');
    }
    *first = false;
    write_field(sql, column);
}

/// Compile `select <cols> from <table><clauses>`.
pub fn compile_select(
    table: &str,
    into: SelectInto<'_>,
    clauses: &[Clause],
    use_name_when_tag_empty: bool,
) -> OrmResult<CompiledPlan> {
    let (fields, rest) = split_fields(clauses);
    let mut sql = String::with_capacity(64);
    let mut projection = Vec::new();
    sql.push_str("select ");

    match into {
        SelectInto::Record(shape) => match fields {
            Some(fields) => {
                // `*` is expanded so result columns line up with the projection.
                let mut first = true;
                for name in fields {
                    if name == "*" {
                        for field in shape.mapped_fields() {
                            push_column(&mut sql, &mut first, &field.column);
                            projection.push(Projection::Field(field.index));
                        }
                    } else {
                        let field = shape.require_column(name)?;
                        push_column(&mut sql, &mut first, name);
                        projection.push(Projection::Field(field.index));
                    }
                }
            }
            None => {
                let mut first = true;
                for field in shape.participating_fields(use_name_when_tag_empty) {
                    push_column(&mut sql, &mut first, &field.column);
                    projection.push(Projection::Field(field.index));
                }
            }
        },
        SelectInto::Map => {
            let fields = fields.ok_or_else(|| {
                OrmError::argument("selecting into a map requires a leading fields(..) clause")
            })?;
            let mut first = true;
            for name in fields {
                if name == "*" {
                    return Err(OrmError::argument(
                        "`*` cannot be selected into a map; name the columns",
                    ));
                }
                push_column(&mut sql, &mut first, name);
                projection.push(Projection::Key(name.clone()));
            }
        }
        SelectInto::Scalar => {
            let name = fields.and_then(<[String]>::first).ok_or_else(|| {
                OrmError::argument("selecting a scalar requires fields(..) with one column")
            })?;
            if name == "*" {
                sql.push('*');
            } else {
                write_field(&mut sql, name);
            }
            projection.push(Projection::Scalar);
        }
    }

    if projection.is_empty() {
        return Err(OrmError::argument(
            "no columns to select; annotate fields, pass fields(..) or enable use_name_when_tag_empty",
        ));
    }

    sql.push_str(" from ");
    write_field(&mut sql, table);
    emit_rest(&mut sql, rest);

    Ok(CompiledPlan::new(sql, Vec::new(), projection, 1))
}

/// Compile an insert of `rows` rows. Map sources contribute their keys in sorted order;
/// expression entries are written into the values tuple verbatim.
pub fn compile_insert(
    table: &str,
    mode: InsertMode,
    source: Columns<'_>,
    rows: usize,
    clauses: &[Clause],
) -> OrmResult<CompiledPlan> {
    let (fields, rest) = split_fields(clauses);
    let mut sql = String::with_capacity(64);
    let mut bindings = Vec::new();
    // Each tuple slot is a placeholder (None) or a verbatim expression.
    let mut slots: Vec<Option<&str>> = Vec::new();

    sql.push_str(mode.prefix());
    write_field(&mut sql, table);
    sql.push_str(" (");

    let mut first = true;
    match source {
        Columns::Record(shape) => {
            let mut add = |column: &str, index: usize| {
                push_column(&mut sql, &mut first, column);
                bindings.push(Binding::Field(index));
                slots.push(None);
            };
            match fields {
                Some(fields) => {
                    for name in fields {
                        let field = shape.require_column(name)?;
                        add(&field.column, field.index);
                    }
                }
                None => {
                    for field in shape.insert_fields() {
                        add(&field.column, field.index);
                    }
                }
            }
        }
        Columns::Map(map) => {
            let keys: Vec<&str> = match fields {
                Some(fields) => fields
                    .iter()
                    .map(String::as_str)
                    .filter(|k| map.contains_key(k))
                    .collect(),
                None => map.keys().collect(),
            };
            for key in keys {
                push_column(&mut sql, &mut first, key);
                match map.get_assign(key) {
                    Some(Assign::Expr(expr)) => slots.push(Some(expr.as_str())),
                    _ => {
                        bindings.push(Binding::Key(key.to_string()));
                        slots.push(None);
                    }
                }
            }
        }
    }

    if slots.is_empty() {
        return Err(OrmError::argument("insert has no columns to write"));
    }

    sql.push_str(") values ");
    for row in 0..rows {
        if row > 0 {
            sql.push(',');
        }
        sql.push('(');
        for (i, slot) in slots.iter().enumerate() {
            if i > 0 {
                sql.push(',');
            }
            sql.push_str(slot.unwrap_or("?"));
        }
        sql.push(')');
    }

    emit_rest(&mut sql, rest);
    Ok(CompiledPlan::new(sql, bindings, Vec::new(), rows))
}

/// Compile `update <table> set ...<clauses>`. At least one clause is required.
pub fn compile_update(
    table: &str,
    source: Columns<'_>,
    clauses: &[Clause],
    use_name_when_tag_empty: bool,
) -> OrmResult<CompiledPlan> {
    if clauses.is_empty() {
        return Err(OrmError::argument("update requires at least one clause"));
    }

    let (fields, rest) = split_fields(clauses);
    let mut sql = String::with_capacity(64);
    let mut bindings = Vec::new();
    let mut first = true;

    sql.push_str("update ");
    write_field(&mut sql, table);
    sql.push_str(" set ");

    match source {
        Columns::Record(shape) => {
            let mut assign = |column: &str, index: usize| {
                push_column(&mut sql, &mut first, column);
                sql.push_str("=?");
                bindings.push(Binding::Field(index));
            };
            match fields {
                Some(fields) => {
                    for name in fields {
                        let field = shape.require_column(name)?;
                        assign(&field.column, field.index);
                    }
                }
                None => {
                    for field in shape.participating_fields(use_name_when_tag_empty) {
                        assign(&field.column, field.index);
                    }
                }
            }
        }
        Columns::Map(map) => {
            let keys: Vec<&str> = match fields {
                Some(fields) => fields.iter().map(String::as_str).collect(),
                None => map.keys().collect(),
            };
            for key in keys {
                match map.get_assign(key) {
                    Some(Assign::Bind(_)) => {
                        push_column(&mut sql, &mut first, key);
                        sql.push_str("=?");
                        bindings.push(Binding::Key(key.to_string()));
                    }
                    Some(Assign::Expr(expr)) => {
                        push_column(&mut sql, &mut first, key);
                        sql.push('=');
                        sql.push_str(expr);
                    }
                    None => {}
                }
            }
        }
    }

    if first {
        return Err(OrmError::argument("update has no columns to set"));
    }

    emit_rest(&mut sql, rest);
    Ok(CompiledPlan::new(sql, bindings, Vec::new(), 1))
}

/// Compile `delete from <table><clauses>`. Refuses to compile an unconditional delete.
pub fn compile_delete(table: &str, clauses: &[Clause]) -> OrmResult<CompiledPlan> {
    if clauses.is_empty() {
        return Err(OrmError::argument("delete requires at least one clause"));
    }

    let mut sql = String::with_capacity(64);
    sql.push_str("delete from ");
    write_field(&mut sql, table);
    let header = sql.len();
    emit_rest(&mut sql, clauses);

    if sql.len() == header {
        return Err(OrmError::argument(
            "delete clauses render no SQL; refusing to delete every row",
        ));
    }

    Ok(CompiledPlan::new(sql, Vec::new(), Vec::new(), 1))
}
