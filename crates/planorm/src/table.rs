//! Table handle: the entry point for every operation.
//!
//! ```ignore
//! use planorm::prelude::*;
//!
//! let users = Table::new(&conn, "users").debug();
//!
//! let mut user = User::default();
//! users.select(&mut user, &[where_([eq("id", 1)])])?;
//!
//! let mut bob = User { name: "bob".into(), age: 30, ..Default::default() };
//! users.insert(&mut bob, &[])?;
//! assert!(bob.id > 0);
//!
//! users.update(&bob, &[fields(["age"]), where_([eq("id", bob.id)])])?;
//! users.delete(&[where_([eq("id", bob.id)])])?;
//! ```
//!
//! Every mapped operation is `#[track_caller]`: the call site is part of the shape signature,
//! so the same call expression with the same clause shape reuses its compiled plan.

use crate::cache::{PlanRegistry, write_call_site, write_clauses};
use crate::clause::{Clause, ClauseKind};
use crate::config::TableConfig;
use crate::error::OrmResult;
use crate::executor::Executor;
use crate::plan::{
    CompiledPlan, InsertMode, Operation, compile_delete, compile_insert, compile_select,
    compile_update,
};
use crate::target::{InsertSource, SelectTarget, TimeBinding, UpdateSource};
use crate::trace;
use crate::value::Value;
use std::fmt::Write as _;
use std::panic::Location;
use std::sync::Arc;

/// A table name bound to an executor, a configuration and a plan registry.
#[derive(Debug, Clone)]
pub struct Table<E> {
    executor: E,
    name: String,
    config: TableConfig,
    registry: Arc<PlanRegistry>,
}

impl<E: Executor> Table<E> {
    /// Bind `name` to `executor`, using the global registry.
    pub fn new(executor: E, name: impl Into<String>) -> Self {
        Self {
            executor,
            name: name.into(),
            config: TableConfig::default(),
            registry: PlanRegistry::global(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<PlanRegistry> {
        &self.registry
    }

    /// Log every statement.
    pub fn debug(mut self) -> Self {
        self.config.debug = true;
        self
    }

    pub fn reuse(mut self) -> Self {
        self.config.reuse = true;
        self
    }

    /// Compile every call from scratch.
    pub fn no_reuse(mut self) -> Self {
        self.config.reuse = false;
        self
    }

    pub fn use_name_when_tag_empty(mut self) -> Self {
        self.config.use_name_when_tag_empty = true;
        self
    }

    pub fn to_timestamp(mut self) -> Self {
        self.config.to_timestamp = true;
        self
    }

    pub fn with_config(mut self, config: TableConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_registry(mut self, registry: Arc<PlanRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Fetch the cached plan for this call shape, or compile and store it.
    fn plan<S, C>(
        &self,
        site: &Location<'_>,
        op: Operation,
        clauses: &[Clause],
        shape: S,
        compile: C,
    ) -> OrmResult<(Arc<CompiledPlan>, bool)>
    where
        S: FnOnce(&mut String),
        C: FnOnce() -> OrmResult<CompiledPlan>,
    {
        if !self.config.reuse {
            return compile().map(|plan| (Arc::new(plan), false));
        }

        let mut signature = self.registry.pool().string();
        write_call_site(
            &mut signature,
            site,
            op,
            &self.name,
            self.config.use_name_when_tag_empty,
        );
        shape(&mut *signature);
        write_clauses(&mut signature, clauses);

        if let Some(plan) = self.registry.lookup(&signature) {
            return Ok((plan, true));
        }

        let plan = compile()?;
        trace::compiled(&self.name, op, &signature, plan.sql());
        Ok((self.registry.store(&signature, plan), false))
    }

    fn log(&self, op: Operation, reused: bool, sql: &str, args: &[Value]) {
        if self.config.debug {
            trace::statement(&self.name, op, reused, sql, args, self.config.max_sql_length);
        }
    }

    fn time_binding(&self) -> TimeBinding {
        if self.config.to_timestamp {
            TimeBinding::Timestamp
        } else {
            TimeBinding::Text
        }
    }

    /// Select into `dest` and return the number of rows written.
    ///
    /// Single destinations fetch the first row; vectors fetch all rows. No row is `Ok(0)`.
    #[track_caller]
    pub fn select<D>(&self, dest: &mut D, clauses: &[Clause]) -> OrmResult<usize>
    where
        D: SelectTarget + ?Sized,
    {
        let site = Location::caller();
        let form = D::form(&self.registry);
        let (plan, reused) = self.plan(
            site,
            Operation::Select,
            clauses,
            |sig| form.write_signature(sig, D::MANY),
            || {
                compile_select(
                    &self.name,
                    form.as_into(),
                    clauses,
                    self.config.use_name_when_tag_empty,
                )
            },
        )?;

        let mut args = self.registry.pool().args();
        clauses.iter().for_each(|c| c.emit_args(&mut args));
        self.log(Operation::Select, reused, plan.sql(), &args);

        let rows = if D::MANY {
            self.executor.query(plan.sql(), &args)?
        } else {
            self.executor
                .query_row(plan.sql(), &args)?
                .into_iter()
                .collect()
        };
        dest.absorb(&plan, rows)
    }

    /// `insert into`. Generated ids are written back into records with an id field, except
    /// when an `on_conflict_do_update_set` clause is present: the backend cannot tell which
    /// rows were inserted and which were updated.
    #[track_caller]
    pub fn insert<S>(&self, source: &mut S, clauses: &[Clause]) -> OrmResult<usize>
    where
        S: InsertSource + ?Sized,
    {
        self.insert_with(Location::caller(), InsertMode::Insert, source, clauses)
    }

    /// `insert or ignore into`.
    #[track_caller]
    pub fn insert_ignore<S>(&self, source: &mut S, clauses: &[Clause]) -> OrmResult<usize>
    where
        S: InsertSource + ?Sized,
    {
        self.insert_with(Location::caller(), InsertMode::Ignore, source, clauses)
    }

    /// `replace into`.
    #[track_caller]
    pub fn replace_into<S>(&self, source: &mut S, clauses: &[Clause]) -> OrmResult<usize>
    where
        S: InsertSource + ?Sized,
    {
        self.insert_with(Location::caller(), InsertMode::Replace, source, clauses)
    }

    fn insert_with<S>(
        &self,
        site: &Location<'_>,
        mode: InsertMode,
        source: &mut S,
        clauses: &[Clause],
    ) -> OrmResult<usize>
    where
        S: InsertSource + ?Sized,
    {
        let rows = source.row_count();
        if rows == 0 {
            return Ok(0);
        }

        let op = Operation::Insert(mode);
        let mut args = self.registry.pool().args();
        let (plan, reused) = {
            let columns = source.columns(&self.registry)?;
            let (plan, reused) = self.plan(
                site,
                op,
                clauses,
                |sig| {
                    columns.write_signature(sig);
                    let _ = write!(sig, "#{rows}");
                },
                || compile_insert(&self.name, mode, columns.as_columns(), rows, clauses),
            )?;
            source.bind_rows(plan.bindings(), TimeBinding::Native, &mut args)?;
            (plan, reused)
        };
        clauses.iter().for_each(|c| c.emit_args(&mut args));
        self.log(op, reused, plan.sql(), &args);

        let result = self.executor.execute(plan.sql(), &args)?;
        // An upsert that took the update path leaves the last insert id on an older row.
        let upsert = clauses
            .iter()
            .any(|c| matches!(c.kind(), ClauseKind::OnConflictUpdate));
        if let (Some(id), false) = (result.last_insert_id, upsert) {
            source.assign_ids(&self.registry, id, result.rows_affected)?;
        }
        Ok(result.rows_affected as usize)
    }

    /// `update ... set`. At least one clause is required; record time fields are bound as
    /// text, or as Unix seconds with [`Table::to_timestamp`].
    #[track_caller]
    pub fn update<S>(&self, source: &S, clauses: &[Clause]) -> OrmResult<usize>
    where
        S: UpdateSource + ?Sized,
    {
        let site = Location::caller();
        let columns = source.columns(&self.registry)?;
        let (plan, reused) = self.plan(
            site,
            Operation::Update,
            clauses,
            |sig| columns.write_signature(sig),
            || {
                compile_update(
                    &self.name,
                    columns.as_columns(),
                    clauses,
                    self.config.use_name_when_tag_empty,
                )
            },
        )?;

        let mut args = self.registry.pool().args();
        source.bind_rows(plan.bindings(), self.time_binding(), &mut args)?;
        clauses.iter().for_each(|c| c.emit_args(&mut args));
        self.log(Operation::Update, reused, plan.sql(), &args);

        let result = self.executor.execute(plan.sql(), &args)?;
        Ok(result.rows_affected as usize)
    }

    /// `delete from`. Refuses to run without a clause that renders SQL.
    #[track_caller]
    pub fn delete(&self, clauses: &[Clause]) -> OrmResult<usize> {
        let site = Location::caller();
        let (plan, reused) = self.plan(
            site,
            Operation::Delete,
            clauses,
            |_| {},
            || compile_delete(&self.name, clauses),
        )?;

        let mut args = self.registry.pool().args();
        clauses.iter().for_each(|c| c.emit_args(&mut args));
        self.log(Operation::Delete, reused, plan.sql(), &args);

        let result = self.executor.execute(plan.sql(), &args)?;
        Ok(result.rows_affected as usize)
    }

    /// Run raw SQL with positional arguments. Nothing is compiled or cached.
    pub fn exec(&self, sql: &str, args: &[Value]) -> OrmResult<usize> {
        self.log(Operation::Exec, false, sql, args);
        let result = self.executor.execute(sql, args)?;
        Ok(result.rows_affected as usize)
    }
}

#[cfg(test)]
mod tests;
