//! End-to-end CRUD against an in-memory SQLite database.

#![cfg(all(feature = "derive", feature = "sqlite"))]

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use planorm::prelude::*;
use planorm::PlanRegistry;
use rusqlite::Connection;
use std::sync::Arc;

// ── Fixtures ─────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Clone, PartialEq, Record)]
struct User {
    #[orm(auto_incr)]
    id: i64,
    #[orm]
    name: String,
    #[orm]
    age: i32,
    nickname: Option<String>,
    #[orm(skip)]
    scratch: Vec<u8>,
}

#[derive(Debug, Default, Clone, PartialEq, Record)]
struct Stamped {
    #[orm]
    created: DateTime<Utc>,
    #[orm]
    updated: i64,
}

#[derive(Debug, Default, Clone, PartialEq, Record)]
struct Event {
    #[orm(auto_incr)]
    id: i64,
    #[orm]
    title: String,
    #[orm(flatten)]
    stamps: Stamped,
}

#[derive(Debug, Default, Clone, PartialEq, Record)]
struct LegacyUser {
    #[orm]
    name: String,
    #[orm]
    age: i32,
    #[orm(skip)]
    last_insert_id: i64,
}

#[derive(Debug, Default, Clone, PartialEq, Record)]
struct Holiday {
    #[orm]
    id: i64,
    #[orm]
    day: NaiveDate,
}

#[derive(Debug, Default, Clone, PartialEq, Record)]
struct PostWithAuthor {
    #[orm(table = "posts", column = "id")]
    post_id: i64,
    #[orm(table = "posts")]
    title: String,
    #[orm(table = "users", column = "name")]
    author: String,
}

fn setup() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "
        create table users (
            id integer primary key autoincrement,
            name text not null default '',
            age integer not null default 0,
            nickname text
        );
        create unique index users_name on users(name);
        create table events (
            id integer primary key autoincrement,
            title text not null,
            created,
            updated integer
        );
        create table posts (
            id integer primary key autoincrement,
            user_id integer not null,
            title text not null
        );
        insert into users (id, name, age) values (1, 'alice', 20);
        ",
    )
    .unwrap();
    conn
}

fn users(conn: &Connection) -> Table<&Connection> {
    Table::new(conn, "users").with_registry(Arc::new(PlanRegistry::new()))
}

// ── Scenarios ────────────────────────────────────────────────────────────────

#[test]
fn select_seeded_row() {
    let conn = setup();
    let users = users(&conn);

    let mut user = User::default();
    let n = users.select(&mut user, &[where_([eq("id", 1)])]).unwrap();

    assert_eq!(n, 1);
    assert_eq!(
        user,
        User {
            id: 1,
            name: "alice".into(),
            age: 20,
            ..User::default()
        }
    );
}

#[test]
fn insert_then_select_by_generated_id() {
    let conn = setup();
    let users = users(&conn);

    let mut bob = User {
        name: "bob".into(),
        age: 30,
        nickname: Some("b".into()),
        ..User::default()
    };
    assert_eq!(users.insert(&mut bob, &[]).unwrap(), 1);
    assert!(bob.id > 1);

    // Untagged fields are only read back on request.
    let mut loaded = User::default();
    users
        .select(&mut loaded, &[where_([eq("id", bob.id)])])
        .unwrap();
    assert_eq!(loaded.name, "bob");
    assert_eq!(loaded.age, 30);
    assert_eq!(loaded.nickname, None);

    let mut loaded = User::default();
    users
        .select(&mut loaded, &[fields(["*"]), where_([eq("id", bob.id)])])
        .unwrap();
    assert_eq!(loaded, bob);
}

#[test]
fn update_selected_field_keeps_others() {
    let conn = setup();
    let users = users(&conn);

    let patch = User {
        age: 21,
        ..User::default()
    };
    let n = users
        .update(&patch, &[fields(["age"]), where_([eq("id", 1)])])
        .unwrap();
    assert_eq!(n, 1);

    let mut user = User::default();
    users.select(&mut user, &[where_([eq("id", 1)])]).unwrap();
    assert_eq!(user.name, "alice");
    assert_eq!(user.age, 21);
}

#[test]
fn delete_without_clauses_is_refused() {
    let conn = setup();
    let users = users(&conn);

    let err = users.delete(&[]).unwrap_err();
    assert!(err.is_argument());

    let mut n = Scalar(0i64);
    users.select(&mut n, &[fields(["count(1)"])]).unwrap();
    assert_eq!(n.into_inner(), 1);
}

#[test]
fn delete_with_where() {
    let conn = setup();
    let users = users(&conn);

    assert_eq!(users.delete(&[where_([eq("id", 1)])]).unwrap(), 1);
    let mut user = User::default();
    assert_eq!(users.select(&mut user, &[where_([eq("id", 1)])]).unwrap(), 0);
}

// ── Inserts ──────────────────────────────────────────────────────────────────

#[test]
fn on_conflict_updates_existing_row() {
    let conn = setup();
    let users = users(&conn);

    let set = ValueMap::new().with_expr("age", "age+1");
    for _ in 0..2 {
        let mut row = ValueMap::new().with("name", "carol").with("age", 40);
        users
            .insert(&mut row, &[on_conflict_do_update_set(["name"], &set)])
            .unwrap();
    }

    let mut user = User::default();
    users
        .select(&mut user, &[where_([eq("name", "carol")])])
        .unwrap();
    assert_eq!(user.age, 41);
}

#[test]
fn upsert_leaves_record_id_alone() {
    let conn = setup();
    let users = users(&conn);

    let mut bob = User {
        name: "bob".into(),
        age: 30,
        ..User::default()
    };
    users.insert(&mut bob, &[]).unwrap();
    assert_eq!(bob.id, 2);

    // alice exists: the conflict path updates row 1 while SQLite still reports bob's rowid.
    let set = ValueMap::new().with("age", 21);
    let mut dup = User {
        name: "alice".into(),
        age: 99,
        ..User::default()
    };
    let n = users
        .insert(&mut dup, &[on_conflict_do_update_set(["name"], &set)])
        .unwrap();
    assert_eq!(n, 1);
    assert_eq!(dup.id, 0);

    let mut alice = User::default();
    users.select(&mut alice, &[where_([eq("id", 1)])]).unwrap();
    assert_eq!((alice.name.as_str(), alice.age), ("alice", 21));
}

#[test]
fn insert_ignore_and_replace() {
    let conn = setup();
    let users = users(&conn);

    let mut dup = User {
        name: "alice".into(),
        age: 99,
        ..User::default()
    };
    assert_eq!(users.insert_ignore(&mut dup, &[]).unwrap(), 0);
    assert_eq!(dup.id, 0);

    let mut replacement = ValueMap::new().with("id", 1).with("name", "alice").with("age", 5);
    assert_eq!(users.replace_into(&mut replacement, &[]).unwrap(), 1);

    let mut user = User::default();
    users.select(&mut user, &[where_([eq("id", 1)])]).unwrap();
    assert_eq!(user.age, 5);
}

#[test]
fn batch_insert_writes_back_contiguous_ids() {
    let conn = setup();
    let users = users(&conn);

    let mut batch: Vec<User> = ["d", "e", "f"]
        .into_iter()
        .map(|name| User {
            name: name.into(),
            ..User::default()
        })
        .collect();
    assert_eq!(users.insert(&mut batch, &[]).unwrap(), 3);
    assert_eq!(
        batch.iter().map(|u| u.id).collect::<Vec<_>>(),
        [2, 3, 4]
    );

    let mut loaded = Vec::<User>::new();
    users
        .select(&mut loaded, &[where_([gt("id", 1)]), order_by(["id"])])
        .unwrap();
    assert_eq!(
        loaded.iter().map(|u| u.name.as_str()).collect::<Vec<_>>(),
        ["d", "e", "f"]
    );
}

#[test]
fn map_batch_insert_and_select_into_maps() {
    let conn = setup();
    let users = users(&conn);

    let mut rows = vec![
        ValueMap::new().with("name", "g").with("age", 1),
        ValueMap::new().with("name", "h").with("age", 2),
    ];
    assert_eq!(users.insert(&mut rows, &[]).unwrap(), 2);

    let mut out = Vec::<ValueMap>::new();
    users
        .select(
            &mut out,
            &[
                fields(["name", "age"]),
                where_([in_list("name", ["g", "h"])]),
                order_by(["name desc"]),
            ],
        )
        .unwrap();
    assert_eq!(out.len(), 2);
    assert_eq!(out[0].get("name"), Some(&Value::Text("h".into())));
    assert_eq!(out[1].get("age"), Some(&Value::Int(1)));

    let mut uneven = vec![
        ValueMap::new().with("name", "i"),
        ValueMap::new().with("age", 3),
    ];
    assert!(users.insert(&mut uneven, &[]).unwrap_err().is_argument());
}

#[test]
fn legacy_id_field_receives_generated_id() {
    let conn = setup();
    let users = Table::new(&conn, "users").with_registry(Arc::new(PlanRegistry::new()));

    let mut dave = LegacyUser {
        name: "dave".into(),
        age: 50,
        ..LegacyUser::default()
    };
    users.insert(&mut dave, &[]).unwrap();
    assert_eq!(dave.last_insert_id, 2);
}

// ── Conversions ──────────────────────────────────────────────────────────────

#[test]
fn null_scans_into_none() {
    let conn = setup();
    let users = users(&conn).use_name_when_tag_empty();

    let mut user = User {
        nickname: Some("stale".into()),
        ..User::default()
    };
    users.select(&mut user, &[where_([eq("id", 1)])]).unwrap();
    assert_eq!(user.nickname, None);
}

#[test]
fn flattened_record_and_time_round_trip() {
    let conn = setup();
    let events = Table::new(&conn, "events").with_registry(Arc::new(PlanRegistry::new()));
    let created = Utc.with_ymd_and_hms(2024, 2, 29, 12, 0, 1).unwrap();

    let mut event = Event {
        title: "leap".into(),
        stamps: Stamped {
            created,
            updated: 7,
        },
        ..Event::default()
    };
    events.insert(&mut event, &[]).unwrap();
    assert_eq!(event.id, 1);

    let mut raw = ValueMap::new();
    events.select(&mut raw, &[fields(["created"])]).unwrap();
    assert_eq!(raw.get("created"), Some(&Value::Text("2024-02-29 12:00:01".into())));

    let mut loaded = Event::default();
    events
        .select(&mut loaded, &[where_([eq("id", event.id)])])
        .unwrap();
    assert_eq!(loaded, event);

    // A time column read into an integer field is Unix seconds.
    let mut secs = Scalar(0i64);
    events.select(&mut secs, &[fields(["created"])]).unwrap();
    assert_eq!(*secs, created.timestamp());
}

#[test]
fn update_time_as_timestamp() {
    let conn = setup();
    let events = Table::new(&conn, "events")
        .with_registry(Arc::new(PlanRegistry::new()))
        .to_timestamp();
    let created = Utc.with_ymd_and_hms(2001, 9, 9, 1, 46, 40).unwrap();

    let mut event = Event {
        title: "t".into(),
        ..Event::default()
    };
    events.insert(&mut event, &[]).unwrap();

    let patch = Stamped {
        created,
        updated: 0,
    };
    events
        .update(&patch, &[fields(["created"]), where_([eq("id", event.id)])])
        .unwrap();

    let mut secs = Scalar(Value::Null);
    events.select(&mut secs, &[fields(["created"])]).unwrap();
    assert_eq!(secs.into_inner(), Value::Int(1_000_000_000));

    // Integer seconds still scan back into a time field.
    let mut loaded = Event::default();
    events.select(&mut loaded, &[]).unwrap();
    assert_eq!(loaded.stamps.created, created);
}

// ── Clauses ──────────────────────────────────────────────────────────────────

#[test]
fn join_with_qualified_fields() {
    let conn = setup();
    conn.execute_batch("insert into posts (user_id, title) values (1, 'hello'), (1, 'again');")
        .unwrap();
    let posts = Table::new(&conn, "posts").with_registry(Arc::new(PlanRegistry::new()));

    let mut rows = Vec::<PostWithAuthor>::new();
    posts
        .select(
            &mut rows,
            &[
                left_join("users", [cond("users.id = posts.user_id", Vec::<Value>::new())]),
                where_([or([eq("posts.id", 1), like("title", "ag%")])]),
                order_by(["posts.id"]),
            ],
        )
        .unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].title, "hello");
    assert_eq!(rows[1].author, "alice");
}

#[test]
fn limit_offset_and_group_by() {
    let conn = setup();
    let users = users(&conn);
    let mut batch: Vec<User> = (0..5)
        .map(|i| User {
            name: format!("u{i}"),
            age: i % 2,
            ..User::default()
        })
        .collect();
    users.insert(&mut batch, &[]).unwrap();

    let mut page = Vec::<User>::new();
    users
        .select(&mut page, &[order_by(["id"]), limit_offset(2, 1)])
        .unwrap();
    assert_eq!(page.iter().map(|u| u.id).collect::<Vec<_>>(), [2, 3]);

    let mut groups = Vec::<ValueMap>::new();
    users
        .select(
            &mut groups,
            &[
                fields(["age", "count(1)"]),
                where_([between("age", 0, 1)]),
                group_by(["age"]),
                having([cond("count(1) > ?", [1])]),
                order_by(["age"]),
            ],
        )
        .unwrap();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].get("count(1)"), Some(&Value::Int(3)));
}

#[test]
fn executor_errors_surface_unchanged() {
    let conn = setup();
    let missing = Table::new(&conn, "missing").with_registry(Arc::new(PlanRegistry::new()));
    let mut user = User::default();
    let err = missing.select(&mut user, &[]).unwrap_err();
    assert!(err.is_execution());
}

#[test]
fn date_column_scans_into_dates_and_times() {
    let conn = setup();
    conn.execute_batch(
        "
        create table holidays (id integer primary key, day date);
        insert into holidays (id, day) values (1, '2019-03-01'), (2, '2020-02-29');
        ",
    )
    .unwrap();
    let holidays = Table::new(&conn, "holidays").with_registry(Arc::new(PlanRegistry::new()));

    let mut rows = Vec::<Holiday>::new();
    holidays.select(&mut rows, &[order_by(["id"])]).unwrap();
    assert_eq!(
        rows.iter().map(|h| h.day).collect::<Vec<_>>(),
        [
            NaiveDate::from_ymd_opt(2019, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2020, 2, 29).unwrap(),
        ]
    );

    let mut at = Scalar(DateTime::<Utc>::default());
    holidays
        .select(&mut at, &[fields(["day"]), where_([eq("id", 1)])])
        .unwrap();
    assert_eq!(*at, Utc.with_ymd_and_hms(2019, 3, 1, 0, 0, 0).unwrap());
}
