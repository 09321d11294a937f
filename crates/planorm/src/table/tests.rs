use super::*;
use crate::clause::{fields, limit, on_conflict_do_update_set, where_};
use crate::cond::{eq, gt};
use crate::error::OrmError;
use crate::executor::{ExecResult, Row};
use crate::record::{FieldDescriptor, Record};
use crate::scan::FromValue;
use crate::target::Scalar;
use crate::value::{ValueKind, ValueMap};
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;

// ── Recording executor ──

#[derive(Default)]
struct Recorder {
    calls: Mutex<Vec<(String, Vec<Value>)>>,
    rows: Mutex<Vec<Row>>,
    last_insert_id: Option<i64>,
    rows_affected: u64,
}

impl Recorder {
    fn returning(rows: Vec<Row>) -> Self {
        Self {
            rows: Mutex::new(rows),
            ..Self::default()
        }
    }

    fn affecting(rows_affected: u64, last_insert_id: i64) -> Self {
        Self {
            rows_affected,
            last_insert_id: Some(last_insert_id),
            ..Self::default()
        }
    }

    fn record(&self, sql: &str, args: &[Value]) {
        self.calls.lock().push((sql.to_string(), args.to_vec()));
    }

    fn last(&self) -> (String, Vec<Value>) {
        self.calls.lock().last().cloned().unwrap()
    }

    fn count(&self) -> usize {
        self.calls.lock().len()
    }
}

impl Executor for Recorder {
    fn query_row(&self, sql: &str, args: &[Value]) -> OrmResult<Option<Row>> {
        self.record(sql, args);
        Ok(self.rows.lock().first().cloned())
    }

    fn query(&self, sql: &str, args: &[Value]) -> OrmResult<Vec<Row>> {
        self.record(sql, args);
        Ok(self.rows.lock().clone())
    }

    fn execute(&self, sql: &str, args: &[Value]) -> OrmResult<ExecResult> {
        self.record(sql, args);
        Ok(ExecResult {
            rows_affected: self.rows_affected,
            last_insert_id: self.last_insert_id,
        })
    }
}

// ── Test record ──

#[derive(Debug, Default, Clone, PartialEq)]
struct User {
    id: i64,
    name: String,
    age: i32,
    updated: DateTime<Utc>,
}

impl Record for User {
    fn descriptors() -> &'static [FieldDescriptor] {
        const D: &[FieldDescriptor] = &[
            FieldDescriptor::new("id", ValueKind::Int(64)).tag("id,auto_incr"),
            FieldDescriptor::new("name", ValueKind::Text).tag("name"),
            FieldDescriptor::new("age", ValueKind::Int(32)).tag("age"),
            FieldDescriptor::new("updated", ValueKind::Time),
        ];
        D
    }

    fn get(&self, index: usize) -> Value {
        match index {
            0 => Value::Int(self.id),
            1 => Value::Text(self.name.clone()),
            2 => Value::Int(i64::from(self.age)),
            3 => Value::Time(self.updated),
            _ => Value::Null,
        }
    }

    fn set(&mut self, index: usize, value: Value) -> OrmResult<()> {
        match index {
            0 => self.id = FromValue::from_value(value)?,
            1 => self.name = FromValue::from_value(value)?,
            2 => self.age = FromValue::from_value(value)?,
            3 => self.updated = FromValue::from_value(value)?,
            _ => return Err(OrmError::argument(format!("no field at index {index}"))),
        }
        Ok(())
    }
}

fn table(exec: &Recorder) -> Table<&Recorder> {
    Table::new(exec, "users").with_registry(Arc::new(PlanRegistry::new()))
}

// ── Select ──

#[test]
fn select_record_binds_clause_values() {
    let exec = Recorder::returning(vec![vec![
        Value::Int(1),
        Value::Text("alice".into()),
        Value::Int(20),
    ]]);
    let users = table(&exec);

    let mut user = User::default();
    let n = users.select(&mut user, &[where_([eq("id", 1)])]).unwrap();

    assert_eq!(n, 1);
    assert_eq!(user.name, "alice");
    assert_eq!(user.age, 20);
    assert_eq!(
        exec.last(),
        (
            "select `id`,`name`,`age` from `users` where `id`=?".to_string(),
            vec![Value::Int(1)]
        )
    );
}

#[test]
fn select_without_rows_is_zero() {
    let exec = Recorder::default();
    let users = table(&exec);

    let mut user = User {
        name: "kept".into(),
        ..User::default()
    };
    assert_eq!(users.select(&mut user, &[where_([eq("id", 9)])]).unwrap(), 0);
    assert_eq!(user.name, "kept");

    let mut all = vec![User::default()];
    assert_eq!(users.select(&mut all, &[]).unwrap(), 0);
    assert!(all.is_empty());
}

#[test]
fn select_scalar_and_maps() {
    let exec = Recorder::returning(vec![vec![Value::Int(3)]]);
    let users = table(&exec);

    let mut n = Scalar(0u32);
    users
        .select(&mut n, &[fields(["count(1)"]), where_([gt("age", 18)])])
        .unwrap();
    assert_eq!(*n, 3);
    assert_eq!(exec.last().0, "select count(1) from `users` where `age`>?");

    let mut row = ValueMap::new();
    users.select(&mut row, &[fields(["age"])]).unwrap();
    assert_eq!(row.get("age"), Some(&Value::Int(3)));

    let err = users.select(&mut row, &[]).unwrap_err();
    assert!(err.is_argument());
}

// ── Plan reuse ──

#[test]
fn repeated_call_site_reuses_plan_with_fresh_values() {
    let exec = Recorder::default();
    let users = table(&exec);

    let mut seen = Vec::new();
    for id in 1..=3 {
        let mut user = User::default();
        users.select(&mut user, &[where_([eq("id", id)])]).unwrap();
        seen.push(exec.last());
    }

    assert!(seen.windows(2).all(|w| w[0].0 == w[1].0));
    let args: Vec<_> = seen.into_iter().map(|(_, args)| args).collect();
    assert_eq!(
        args,
        [vec![Value::Int(1)], vec![Value::Int(2)], vec![Value::Int(3)]]
    );

    let stats = users.registry().stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 2);
    assert_eq!(stats.plans, 1);
}

#[test]
fn different_field_lists_do_not_share_plans() {
    let exec = Recorder::default();
    let users = table(&exec);
    let user = User::default();

    let mut sql = Vec::new();
    for field in ["age", "name"] {
        users
            .update(&user, &[fields([field]), where_([eq("id", 1)])])
            .unwrap();
        sql.push(exec.last().0);
    }

    assert_eq!(sql[0], "update `users` set `age`=? where `id`=?");
    assert_eq!(sql[1], "update `users` set `name`=? where `id`=?");
    assert_eq!(users.registry().stats().plans, 2);
}

#[test]
fn distinct_call_sites_get_distinct_plans() {
    let exec = Recorder::default();
    let users = table(&exec);
    let mut user = User::default();

    users.select(&mut user, &[where_([eq("id", 1)])]).unwrap();
    users.select(&mut user, &[where_([eq("id", 1)])]).unwrap();

    let stats = users.registry().stats();
    assert_eq!(stats.misses, 2);
    assert_eq!(stats.plans, 2);
}

#[test]
fn no_reuse_skips_registry() {
    let exec = Recorder::default();
    let users = table(&exec).no_reuse();
    let mut user = User::default();

    for _ in 0..2 {
        users.select(&mut user, &[limit(1)]).unwrap();
    }
    assert_eq!(users.registry().stats(), Default::default());
    assert_eq!(exec.last().0, "select `id`,`name`,`age` from `users` limit ?");
}

// ── Insert ──

#[test]
fn insert_writes_back_generated_id() {
    let exec = Recorder::affecting(1, 42);
    let users = table(&exec);

    let mut bob = User {
        name: "bob".into(),
        age: 30,
        ..User::default()
    };
    assert_eq!(users.insert(&mut bob, &[]).unwrap(), 1);
    assert_eq!(bob.id, 42);

    let (sql, args) = exec.last();
    assert_eq!(sql, "insert into `users` (`name`,`age`,`updated`) values (?,?,?)");
    assert_eq!(args[..2], [Value::Text("bob".into()), Value::Int(30)]);
    assert!(matches!(args[2], Value::Time(_)));
}

#[test]
fn batch_insert_assigns_descending_ids() {
    let exec = Recorder::affecting(3, 12);
    let users = table(&exec);

    let mut batch = vec![User::default(); 3];
    assert_eq!(users.insert(&mut batch, &[fields(["name"])]).unwrap(), 3);
    assert_eq!(batch.iter().map(|u| u.id).collect::<Vec<_>>(), [10, 11, 12]);
    assert_eq!(
        exec.last().0,
        "insert into `users` (`name`) values (?),(?),(?)"
    );
}

#[test]
fn upsert_does_not_write_back_ids() {
    // The executor reports the id of an earlier insert, as SQLite does on the update path.
    let exec = Recorder::affecting(1, 2);
    let users = table(&exec);
    let set = ValueMap::new().with("age", 41);

    let mut dup = User {
        name: "alice".into(),
        ..User::default()
    };
    assert_eq!(
        users
            .insert(&mut dup, &[on_conflict_do_update_set(["name"], &set)])
            .unwrap(),
        1
    );
    assert_eq!(dup.id, 0);

    let mut batch = vec![User::default(); 2];
    let exec = Recorder::affecting(2, 7);
    let users = table(&exec);
    users
        .insert(&mut batch, &[on_conflict_do_update_set(["name"], &set)])
        .unwrap();
    assert!(batch.iter().all(|u| u.id == 0));
}

#[test]
fn empty_batch_is_not_executed() {
    let exec = Recorder::default();
    let users = table(&exec);

    let mut none: Vec<User> = Vec::new();
    assert_eq!(users.insert(&mut none, &[]).unwrap(), 0);
    let mut none: Vec<ValueMap> = Vec::new();
    assert_eq!(users.replace_into(&mut none, &[]).unwrap(), 0);
    assert_eq!(exec.count(), 0);
}

#[test]
fn map_insert_with_upsert_orders_arguments() {
    let exec = Recorder::affecting(1, 1);
    let users = table(&exec);

    let mut row = ValueMap::new().with("id", 1).with("name", "x");
    let set = ValueMap::new().with("name", "y");
    users
        .insert_ignore(&mut row, &[on_conflict_do_update_set(["id"], &set)])
        .unwrap();

    let (sql, args) = exec.last();
    assert_eq!(
        sql,
        "insert or ignore into `users` (`id`,`name`) values (?,?) \
         on conflict(`id`) do update set `name`=?"
    );
    assert_eq!(
        args,
        [
            Value::Int(1),
            Value::Text("x".into()),
            Value::Text("y".into())
        ]
    );
}

#[test]
fn batch_sizes_compile_separately() {
    let exec = Recorder::affecting(1, 1);
    let users = table(&exec);

    for n in [1, 2] {
        let mut batch = vec![User::default(); n];
        users.insert(&mut batch, &[fields(["age"])]).unwrap();
    }
    assert_eq!(users.registry().stats().plans, 2);
    assert_eq!(exec.last().0, "insert into `users` (`age`) values (?),(?)");
}

// ── Update / delete / exec ──

#[test]
fn update_binds_times_as_text_or_timestamp() {
    let exec = Recorder::default();
    let at = Utc.with_ymd_and_hms(2020, 5, 6, 7, 8, 9).unwrap();
    let user = User {
        updated: at,
        ..User::default()
    };
    let clauses = [fields(["updated"]), where_([eq("id", 1)])];

    table(&exec).update(&user, &clauses).unwrap();
    assert_eq!(exec.last().1[0], Value::Text("2020-05-06 07:08:09".into()));

    table(&exec).to_timestamp().update(&user, &clauses).unwrap();
    assert_eq!(exec.last().1[0], Value::Int(at.timestamp()));
}

#[test]
fn update_and_delete_require_clauses() {
    let exec = Recorder::default();
    let users = table(&exec);

    let map = ValueMap::new().with("age", 1);
    assert!(users.update(&map, &[]).unwrap_err().is_argument());
    assert!(users.delete(&[]).unwrap_err().is_argument());
    assert_eq!(exec.count(), 0);
}

#[test]
fn update_map_with_expression() {
    let exec = Recorder::affecting(1, 0);
    let users = table(&exec);

    let map = ValueMap::new().with_expr("age", "age+1");
    let n = users.update(&map, &[where_([eq("id", 5)])]).unwrap();
    assert_eq!(n, 1);
    assert_eq!(
        exec.last(),
        (
            "update `users` set `age`=age+1 where `id`=?".to_string(),
            vec![Value::Int(5)]
        )
    );
}

#[test]
fn delete_and_exec_pass_through() {
    let exec = Recorder::affecting(2, 0);
    let users = table(&exec);

    assert_eq!(users.delete(&[where_([gt("age", 60)])]).unwrap(), 2);
    assert_eq!(exec.last().0, "delete from `users` where `age`>?");

    assert_eq!(users.exec("vacuum", &[]).unwrap(), 2);
    assert_eq!(exec.last().0, "vacuum");
}

#[test]
fn builder_toggles_update_config() {
    let exec = Recorder::default();
    let users = table(&exec).debug().no_reuse().use_name_when_tag_empty();
    assert!(users.config().debug);
    assert!(!users.config().reuse);
    assert!(users.config().use_name_when_tag_empty);
    assert_eq!(users.name(), "users");

    let users = users.reuse().with_config(TableConfig::new().with_to_timestamp(true));
    assert!(users.config().reuse);
    assert!(users.config().to_timestamp);
}

#[test]
fn use_name_when_tag_empty_widens_select() {
    let exec = Recorder::default();
    let users = table(&exec).use_name_when_tag_empty();
    let mut user = User::default();
    users.select(&mut user, &[]).unwrap();
    assert_eq!(exec.last().0, "select `id`,`name`,`age`,`updated` from `users`");
}
