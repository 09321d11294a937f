//! Condition trees for `where`, `having` and `join ... on`.
//!
//! A [`Cond`] is either a leaf (an optional field, an operator template and its arguments) or
//! an `and`/`or` combinator over child conditions. Literal values always travel as
//! placeholder arguments, so two conditions that differ only in their values render the same
//! SQL text.
//!
//! # Example
//! ```ignore
//! use planorm::cond::{and, eq, gt, in_list, or};
//!
//! let c = and([eq("status", "active"), or([gt("age", 18), in_list("role", ["admin", "ops"])])]);
//! ```

use crate::ident::write_field;
use crate::value::{ToValue, Value};
use std::borrow::Cow;

/// Logical combinator of a [`Cond::Group`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Logic {
    And,
    Or,
}

impl Logic {
    fn separator(self) -> &'static str {
        match self {
            Logic::And => " and ",
            Logic::Or => " or ",
        }
    }
}

/// A node in a condition tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Cond {
    /// `field` followed by an operator template such as `=?` or ` in (?,?)`. Raw conditions
    /// carry no field and put their whole text in `op`.
    Leaf {
        field: Option<String>,
        op: Cow<'static, str>,
        args: Vec<Value>,
    },
    /// Children joined by `and` / `or`.
    Group { logic: Logic, children: Vec<Cond> },
}

impl Cond {
    /// Number of direct children; a leaf counts as one.
    pub fn width(&self) -> usize {
        match self {
            Cond::Leaf { .. } => 1,
            Cond::Group { children, .. } => children.len(),
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self, Cond::Group { .. })
    }

    pub fn is_or(&self) -> bool {
        matches!(
            self,
            Cond::Group {
                logic: Logic::Or,
                ..
            }
        )
    }

    /// Whether this is a combinator without children.
    pub fn is_empty_group(&self) -> bool {
        matches!(self, Cond::Group { children, .. } if children.is_empty())
    }

    /// Append this condition's SQL text.
    pub fn emit_sql(&self, out: &mut String) {
        match self {
            Cond::Leaf { field, op, .. } => {
                if let Some(field) = field {
                    write_field(out, field);
                }
                out.push_str(op);
            }
            Cond::Group { logic, children } => {
                let wrap_children = children.len() > 1;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        out.push_str(logic.separator());
                    }
                    let wrap = wrap_children && child.is_group() && child.width() > 1;
                    emit_wrapped(child, out, wrap);
                }
            }
        }
    }

    /// Append this condition's positional arguments, in the same order as [`Cond::emit_sql`].
    pub fn emit_args(&self, out: &mut Vec<Value>) {
        match self {
            Cond::Leaf { args, .. } => out.extend(args.iter().cloned()),
            Cond::Group { children, .. } => {
                for child in children {
                    child.emit_args(out);
                }
            }
        }
    }
}

pub(crate) fn emit_wrapped(cond: &Cond, out: &mut String, wrap: bool) {
    if wrap {
        out.push('(');
    }
    cond.emit_sql(out);
    if wrap {
        out.push(')');
    }
}

fn leaf(field: impl Into<String>, op: &'static str, args: Vec<Value>) -> Cond {
    Cond::Leaf {
        field: Some(field.into()),
        op: Cow::Borrowed(op),
        args,
    }
}

/// `field=?`
pub fn eq(field: impl Into<String>, value: impl ToValue) -> Cond {
    leaf(field, "=?", vec![value.to_value()])
}

/// `field<>?`
pub fn neq(field: impl Into<String>, value: impl ToValue) -> Cond {
    leaf(field, "<>?", vec![value.to_value()])
}

/// `field>?`
pub fn gt(field: impl Into<String>, value: impl ToValue) -> Cond {
    leaf(field, ">?", vec![value.to_value()])
}

/// `field>=?`
pub fn gte(field: impl Into<String>, value: impl ToValue) -> Cond {
    leaf(field, ">=?", vec![value.to_value()])
}

/// `field<?`
pub fn lt(field: impl Into<String>, value: impl ToValue) -> Cond {
    leaf(field, "<?", vec![value.to_value()])
}

/// `field<=?`
pub fn lte(field: impl Into<String>, value: impl ToValue) -> Cond {
    leaf(field, "<=?", vec![value.to_value()])
}

/// `field between ? and ?`
pub fn between(field: impl Into<String>, low: impl ToValue, high: impl ToValue) -> Cond {
    leaf(
        field,
        " between ? and ?",
        vec![low.to_value(), high.to_value()],
    )
}

/// `field like ?`
pub fn like(field: impl Into<String>, pattern: impl ToValue) -> Cond {
    leaf(field, " like ?", vec![pattern.to_value()])
}

/// `field glob ?`
pub fn glob(field: impl Into<String>, pattern: impl ToValue) -> Cond {
    leaf(field, " glob ?", vec![pattern.to_value()])
}

/// `field in (?,?,...)`.
///
/// An empty list degrades to the always-true `1=1`, a single value to `field=?`.
pub fn in_list<I>(field: impl Into<String>, values: I) -> Cond
where
    I: IntoIterator,
    I::Item: ToValue,
{
    let args: Vec<Value> = values.into_iter().map(|v| v.to_value()).collect();
    match args.len() {
        0 => raw("1=1"),
        1 => leaf(field, "=?", args),
        n => {
            let mut op = String::with_capacity(6 + n * 2);
            op.push_str(" in (");
            for i in 0..n {
                if i > 0 {
                    op.push(',');
                }
                op.push('?');
            }
            op.push(')');
            Cond::Leaf {
                field: Some(field.into()),
                op: Cow::Owned(op),
                args,
            }
        }
    }
}

/// A raw SQL condition with its own placeholder arguments.
///
/// The text is emitted verbatim and becomes part of the plan's cache key. Build the text from
/// constants only; interpolating values defeats both parameterization and plan reuse.
pub fn cond<I>(sql: impl Into<String>, args: I) -> Cond
where
    I: IntoIterator,
    I::Item: Into<Value>,
{
    Cond::Leaf {
        field: None,
        op: Cow::Owned(sql.into()),
        args: args.into_iter().map(Into::into).collect(),
    }
}

/// A raw SQL condition without arguments, e.g. `deleted_at is null`.
pub fn raw(sql: impl Into<String>) -> Cond {
    Cond::Leaf {
        field: None,
        op: Cow::Owned(sql.into()),
        args: Vec::new(),
    }
}

/// Join conditions with `and`.
pub fn and(conds: impl IntoIterator<Item = Cond>) -> Cond {
    Cond::Group {
        logic: Logic::And,
        children: conds.into_iter().collect(),
    }
}

/// Join conditions with `or`.
pub fn or(conds: impl IntoIterator<Item = Cond>) -> Cond {
    Cond::Group {
        logic: Logic::Or,
        children: conds.into_iter().collect(),
    }
}
