//! # planorm
//!
//! A record-to-SQL mapping layer for SQLite-flavoured SQL, built around compiled query plans.
//!
//! ## Features
//!
//! - **Typed records**: `#[derive(Record)]` generates a static field table plus index-based
//!   accessors; no runtime reflection
//! - **Composable clauses**: `fields`, `where_`, joins, `group_by`, `order_by`, `limit`,
//!   `on_conflict_do_update_set` and a small condition tree (`eq`, `in_list`, `or`, ...)
//! - **Plan reuse**: the SQL for a call is compiled once per call site and clause shape, then
//!   reused with fresh argument values
//! - **Safe defaults**: DELETE and UPDATE refuse to run without a clause
//! - **Pluggable execution**: anything implementing [`Executor`]; `rusqlite::Connection` out of
//!   the box with the `sqlite` feature
//!
//! ## Example
//!
//! ```ignore
//! use planorm::prelude::*;
//!
//! #[derive(Debug, Default, Record)]
//! struct User {
//!     #[orm(auto_incr)]
//!     id: i64,
//!     #[orm]
//!     name: String,
//!     #[orm]
//!     age: i32,
//! }
//!
//! let users = Table::new(&conn, "users");
//!
//! let mut bob = User { name: "bob".into(), age: 30, ..Default::default() };
//! users.insert(&mut bob, &[])?;
//!
//! let mut adults = Vec::<User>::new();
//! users.select(&mut adults, &[where_([gte("age", 18)]), order_by(["id"])])?;
//!
//! users.update(
//!     &ValueMap::new().with_expr("age", "age+1"),
//!     &[where_([eq("id", bob.id)])],
//! )?;
//! ```

pub mod cache;
pub mod clause;
pub mod cond;
pub mod config;
pub mod error;
pub mod executor;
pub mod ident;
pub mod plan;
pub mod pool;
pub mod prelude;
pub mod record;
pub mod scan;
pub mod table;
pub mod target;
pub mod timefmt;
pub mod trace;
pub mod value;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use cache::{CacheStats, PlanRegistry, ShapeCache};
pub use clause::{
    Clause, ClauseKind, JoinKind, fields, full_join, full_join_raw, group_by, having, indexed_by,
    inner_join, inner_join_raw, join, left_join, left_join_raw, limit, limit_offset,
    on_conflict_do_update_set, order_by, right_join, right_join_raw, where_,
};
pub use cond::{
    Cond, Logic, and, between, cond, eq, glob, gt, gte, in_list, like, lt, lte, neq, or, raw,
};
pub use config::{RegistryConfig, TableConfig};
pub use error::{OrmError, OrmResult};
pub use executor::{ExecResult, Executor, Row};
pub use plan::{CompiledPlan, InsertMode, Operation};
pub use record::{FieldDescriptor, Record, RecordShape, camel_to_snake};
pub use scan::FromValue;
pub use table::Table;
pub use target::{InsertSource, Scalar, SelectTarget, UpdateSource};
pub use value::{Assign, ToValue, Value, ValueKind, ValueMap};

#[cfg(feature = "derive")]
pub use planorm_derive::Record;
