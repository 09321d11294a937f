//! What a call reads into and writes from.
//!
//! [`SelectTarget`] covers select destinations: a record, `Vec<record>`, a [`ValueMap`],
//! `Vec<ValueMap>` and [`Scalar<T>`]. [`InsertSource`] covers insert sources: a record, a slice
//! or `Vec` of records, a [`ValueMap`] and a slice or `Vec` of maps. [`UpdateSource`] narrows
//! that to a single record or map.

use crate::cache::PlanRegistry;
use crate::error::{OrmError, OrmResult};
use crate::executor::Row;
use crate::plan::{Binding, Columns, CompiledPlan, Projection, SelectInto};
use crate::record::{Record, RecordShape};
use crate::scan::FromValue;
use crate::timefmt::format_time;
use crate::value::{Assign, Value, ValueMap};
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

/// A single-column select destination.
///
/// ```ignore
/// let mut n = Scalar(0i64);
/// users.select(&mut n, &[fields(["count(1)"])])?;
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Scalar<T>(pub T);

impl<T> Scalar<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Scalar<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> DerefMut for Scalar<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.0
    }
}

/// Resolved destination form of a select.
#[derive(Debug, Clone)]
pub enum SelectForm {
    Record(Arc<RecordShape>),
    Map,
    Scalar,
}

impl SelectForm {
    pub(crate) fn as_into(&self) -> SelectInto<'_> {
        match self {
            SelectForm::Record(shape) => SelectInto::Record(shape),
            SelectForm::Map => SelectInto::Map,
            SelectForm::Scalar => SelectInto::Scalar,
        }
    }

    pub(crate) fn write_signature(&self, out: &mut String, many: bool) {
        match self {
            SelectForm::Record(shape) => {
                out.push_str("record:");
                out.push_str(shape.fingerprint());
            }
            SelectForm::Map => out.push_str("map"),
            SelectForm::Scalar => out.push_str("scalar"),
        }
        if many {
            out.push_str("[]");
        }
    }
}

/// A select destination.
pub trait SelectTarget {
    /// Fetch every row instead of the first one.
    const MANY: bool;

    fn form(registry: &PlanRegistry) -> SelectForm;

    /// Move fetched rows into the destination and report how many were written.
    fn absorb(&mut self, plan: &CompiledPlan, rows: Vec<Row>) -> OrmResult<usize>;
}

fn fill_record<R: Record>(record: &mut R, projection: &[Projection], row: Row) -> OrmResult<()> {
    let descriptors = R::descriptors();
    for (target, value) in projection.iter().zip(row) {
        if let Projection::Field(index) = *target {
            record
                .set(index, value)
                .map_err(|e| e.with_column(descriptors[index].ident))?;
        }
    }
    Ok(())
}

fn fill_map(map: &mut ValueMap, projection: &[Projection], row: Row) {
    for (target, value) in projection.iter().zip(row) {
        if let Projection::Key(key) = target {
            map.set(key.as_str(), value);
        }
    }
}

/// Only the selected fields are overwritten; the rest keep their values.
impl<R: Record> SelectTarget for R {
    const MANY: bool = false;

    fn form(registry: &PlanRegistry) -> SelectForm {
        SelectForm::Record(registry.shape_of::<R>())
    }

    fn absorb(&mut self, plan: &CompiledPlan, rows: Vec<Row>) -> OrmResult<usize> {
        match rows.into_iter().next() {
            Some(row) => fill_record(self, plan.projection(), row).map(|()| 1),
            None => Ok(0),
        }
    }
}

/// The vector is cleared first, then holds one record per row.
impl<R: Record> SelectTarget for Vec<R> {
    const MANY: bool = true;

    fn form(registry: &PlanRegistry) -> SelectForm {
        SelectForm::Record(registry.shape_of::<R>())
    }

    fn absorb(&mut self, plan: &CompiledPlan, rows: Vec<Row>) -> OrmResult<usize> {
        self.clear();
        self.reserve(rows.len());
        for row in rows {
            let mut record = R::default();
            fill_record(&mut record, plan.projection(), row)?;
            self.push(record);
        }
        Ok(self.len())
    }
}

impl SelectTarget for ValueMap {
    const MANY: bool = false;

    fn form(_: &PlanRegistry) -> SelectForm {
        SelectForm::Map
    }

    fn absorb(&mut self, plan: &CompiledPlan, rows: Vec<Row>) -> OrmResult<usize> {
        match rows.into_iter().next() {
            Some(row) => {
                fill_map(self, plan.projection(), row);
                Ok(1)
            }
            None => Ok(0),
        }
    }
}

impl SelectTarget for Vec<ValueMap> {
    const MANY: bool = true;

    fn form(_: &PlanRegistry) -> SelectForm {
        SelectForm::Map
    }

    fn absorb(&mut self, plan: &CompiledPlan, rows: Vec<Row>) -> OrmResult<usize> {
        self.clear();
        for row in rows {
            let mut map = ValueMap::new();
            fill_map(&mut map, plan.projection(), row);
            self.push(map);
        }
        Ok(self.len())
    }
}

impl<T: FromValue> SelectTarget for Scalar<T> {
    const MANY: bool = false;

    fn form(_: &PlanRegistry) -> SelectForm {
        SelectForm::Scalar
    }

    fn absorb(&mut self, _: &CompiledPlan, rows: Vec<Row>) -> OrmResult<usize> {
        let Some(value) = rows.into_iter().next().and_then(|row| row.into_iter().next()) else {
            return Ok(0);
        };
        self.0 = T::from_value(value)?;
        Ok(1)
    }
}

/// How record time fields are bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeBinding {
    /// Pass `Value::Time` through to the executor.
    Native,
    /// Unix seconds.
    Timestamp,
    /// `YYYY-MM-DD hh:mm:ss` text.
    Text,
}

impl TimeBinding {
    fn apply(self, value: Value) -> Value {
        match (self, value) {
            (TimeBinding::Timestamp, Value::Time(t)) => Value::Int(t.timestamp()),
            (TimeBinding::Text, Value::Time(t)) => Value::Text(format_time(&t)),
            (_, value) => value,
        }
    }
}

/// Resolved column source of an insert or update.
#[derive(Debug, Clone)]
pub enum SourceColumns<'a> {
    Record(Arc<RecordShape>),
    Map(&'a ValueMap),
}

impl SourceColumns<'_> {
    pub(crate) fn as_columns(&self) -> Columns<'_> {
        match self {
            SourceColumns::Record(shape) => Columns::Record(shape),
            SourceColumns::Map(map) => Columns::Map(map),
        }
    }

    pub(crate) fn write_signature(&self, out: &mut String) {
        match self {
            SourceColumns::Record(shape) => {
                out.push_str("record:");
                out.push_str(shape.fingerprint());
            }
            SourceColumns::Map(map) => {
                out.push_str("map:");
                write_map_layout(out, map);
            }
        }
    }
}

/// Keys with their bind/expr flag. Expressions are part of the SQL, so their text is too.
fn write_map_layout(out: &mut String, map: &ValueMap) {
    for (key, assign) in map.iter() {
        out.push_str(key);
        match assign {
            Assign::Bind(_) => out.push_str("=?"),
            Assign::Expr(expr) => {
                out.push('=');
                out.push_str(expr);
            }
        }
        out.push(';');
    }
}

fn map_layout(map: &ValueMap) -> String {
    let mut out = String::new();
    write_map_layout(&mut out, map);
    out
}

fn bind_record<R: Record>(
    record: &R,
    bindings: &[Binding],
    time: TimeBinding,
    out: &mut Vec<Value>,
) {
    for binding in bindings {
        if let Binding::Field(index) = binding {
            out.push(time.apply(record.get(*index)));
        }
    }
}

fn bind_map(map: &ValueMap, bindings: &[Binding], out: &mut Vec<Value>) -> OrmResult<()> {
    for binding in bindings {
        if let Binding::Key(key) = binding {
            let value = map
                .get(key)
                .ok_or_else(|| OrmError::argument(format!("map has no value for key '{key}'")))?;
            out.push(value.clone());
        }
    }
    Ok(())
}

/// Write the generated id into the id field of `record`.
fn assign_id<R: Record>(record: &mut R, shape: &RecordShape, id: i64) -> OrmResult<()> {
    match shape.id_field() {
        Some(field) => record
            .set(field.index, Value::Int(id))
            .map_err(|e| e.with_column(field.ident)),
        None => Ok(()),
    }
}

/// Batch ids are assumed contiguous, ending at the last generated id.
fn assign_batch_ids<R: Record>(
    records: &mut [R],
    registry: &PlanRegistry,
    last_insert_id: i64,
    rows_affected: u64,
) -> OrmResult<()> {
    if rows_affected != records.len() as u64 {
        return Ok(());
    }
    let shape = registry.shape_of::<R>();
    let len = records.len() as i64;
    for (i, record) in records.iter_mut().enumerate() {
        assign_id(record, &shape, last_insert_id - (len - i as i64 - 1))?;
    }
    Ok(())
}

/// An insert source.
pub trait InsertSource {
    /// Rows written per statement.
    fn row_count(&self) -> usize;

    fn columns(&self, registry: &PlanRegistry) -> OrmResult<SourceColumns<'_>>;

    /// Push per-row arguments for every row, in placeholder order.
    fn bind_rows(&self, bindings: &[Binding], time: TimeBinding, out: &mut Vec<Value>)
    -> OrmResult<()>;

    /// Write back the generated id(s) after a successful insert.
    fn assign_ids(
        &mut self,
        _registry: &PlanRegistry,
        _last_insert_id: i64,
        _rows_affected: u64,
    ) -> OrmResult<()> {
        Ok(())
    }
}

/// An update source: one record or one map.
pub trait UpdateSource: InsertSource {}

impl<R: Record> InsertSource for R {
    fn row_count(&self) -> usize {
        1
    }

    fn columns(&self, registry: &PlanRegistry) -> OrmResult<SourceColumns<'_>> {
        Ok(SourceColumns::Record(registry.shape_of::<R>()))
    }

    fn bind_rows(
        &self,
        bindings: &[Binding],
        time: TimeBinding,
        out: &mut Vec<Value>,
    ) -> OrmResult<()> {
        bind_record(self, bindings, time, out);
        Ok(())
    }

    fn assign_ids(
        &mut self,
        registry: &PlanRegistry,
        last_insert_id: i64,
        rows_affected: u64,
    ) -> OrmResult<()> {
        if rows_affected == 0 {
            return Ok(());
        }
        assign_id(self, &registry.shape_of::<R>(), last_insert_id)
    }
}

impl<R: Record> UpdateSource for R {}

impl<R: Record> InsertSource for [R] {
    fn row_count(&self) -> usize {
        self.len()
    }

    fn columns(&self, registry: &PlanRegistry) -> OrmResult<SourceColumns<'_>> {
        Ok(SourceColumns::Record(registry.shape_of::<R>()))
    }

    fn bind_rows(
        &self,
        bindings: &[Binding],
        time: TimeBinding,
        out: &mut Vec<Value>,
    ) -> OrmResult<()> {
        out.reserve(bindings.len() * self.len());
        for record in self {
            bind_record(record, bindings, time, out);
        }
        Ok(())
    }

    fn assign_ids(
        &mut self,
        registry: &PlanRegistry,
        last_insert_id: i64,
        rows_affected: u64,
    ) -> OrmResult<()> {
        assign_batch_ids(self, registry, last_insert_id, rows_affected)
    }
}

impl<R: Record> InsertSource for Vec<R> {
    fn row_count(&self) -> usize {
        self.len()
    }

    fn columns(&self, registry: &PlanRegistry) -> OrmResult<SourceColumns<'_>> {
        self.as_slice().columns(registry)
    }

    fn bind_rows(
        &self,
        bindings: &[Binding],
        time: TimeBinding,
        out: &mut Vec<Value>,
    ) -> OrmResult<()> {
        self.as_slice().bind_rows(bindings, time, out)
    }

    fn assign_ids(
        &mut self,
        registry: &PlanRegistry,
        last_insert_id: i64,
        rows_affected: u64,
    ) -> OrmResult<()> {
        assign_batch_ids(self, registry, last_insert_id, rows_affected)
    }
}

impl InsertSource for ValueMap {
    fn row_count(&self) -> usize {
        1
    }

    fn columns(&self, _: &PlanRegistry) -> OrmResult<SourceColumns<'_>> {
        Ok(SourceColumns::Map(self))
    }

    fn bind_rows(
        &self,
        bindings: &[Binding],
        _: TimeBinding,
        out: &mut Vec<Value>,
    ) -> OrmResult<()> {
        bind_map(self, bindings, out)
    }
}

impl UpdateSource for ValueMap {}

impl InsertSource for [ValueMap] {
    fn row_count(&self) -> usize {
        self.len()
    }

    /// Every map must carry the same keys, with the same expressions, as the first one.
    fn columns(&self, _: &PlanRegistry) -> OrmResult<SourceColumns<'_>> {
        let Some((first, rest)) = self.split_first() else {
            return Err(OrmError::argument("batch insert needs at least one map"));
        };
        let layout = map_layout(first);
        for (i, map) in rest.iter().enumerate() {
            if map_layout(map) != layout {
                return Err(OrmError::argument(format!(
                    "map {} in batch has different keys than map 0",
                    i + 1
                )));
            }
        }
        Ok(SourceColumns::Map(first))
    }

    fn bind_rows(
        &self,
        bindings: &[Binding],
        _: TimeBinding,
        out: &mut Vec<Value>,
    ) -> OrmResult<()> {
        for map in self {
            bind_map(map, bindings, out)?;
        }
        Ok(())
    }
}

impl InsertSource for Vec<ValueMap> {
    fn row_count(&self) -> usize {
        self.len()
    }

    fn columns(&self, registry: &PlanRegistry) -> OrmResult<SourceColumns<'_>> {
        self.as_slice().columns(registry)
    }

    fn bind_rows(
        &self,
        bindings: &[Binding],
        time: TimeBinding,
        out: &mut Vec<Value>,
    ) -> OrmResult<()> {
        self.as_slice().bind_rows(bindings, time, out)
    }
}
