//! Convenient imports for typical `planorm` usage.
//!
//! ```ignore
//! use planorm::prelude::*;
//! ```

pub use crate::{
    Executor, OrmError, OrmResult, Record, Scalar, Table, TableConfig, Value, ValueMap,
};

pub use crate::{
    and, between, cond, eq, fields, full_join, glob, group_by, gt, gte, having, in_list,
    indexed_by, inner_join, join, left_join, like, limit, limit_offset, lt, lte, neq,
    on_conflict_do_update_set, or, order_by, right_join, where_,
};
