use std::sync::Arc;

use orma_core::DatabaseConfig;
use orma_data::{Crud, DataError, Database, Entity, LinkCrud, Pager, Params, QueryBuilder, Registry};
use orma_data_sqlx::{connect, connect_with_sink, SqlxDriver};
use orma_macros::{Entity, Link};
use orma_test::CapturingSink;

#[derive(Debug, Clone, Default, PartialEq, Entity)]
#[entity(table = "widget", key = "widget_id")]
#[entity(query(name = "by_mess", sql = "SELECT {readspec} FROM {table} WHERE `mess`=:mess"))]
struct Widget {
    id: i64,
    a_date: i64,
    mess: String,
}

#[derive(Debug, Clone, Default, PartialEq, Entity)]
#[entity(table = "user", key = "user_id")]
struct User {
    id: i64,
    name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Entity)]
#[entity(table = "groups", key = "group_id")]
struct Group {
    id: i64,
    title: String,
}

#[derive(Debug, Clone, Link)]
#[orma(table = "user_group", to_key = "group_id", order_from = "`joined` DESC")]
struct Membership {
    #[orma(from)]
    user: User,
    #[orma(to)]
    group: Group,
    #[orma(additional_key)]
    role: String,
    joined: i64,
}

const SCHEMA: &[&str] = &[
    "CREATE TABLE widget (widget_id INTEGER PRIMARY KEY AUTOINCREMENT, a_date DATE, mess TEXT NOT NULL DEFAULT '')",
    "CREATE TABLE `user` (user_id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL)",
    "CREATE TABLE `groups` (group_id INTEGER PRIMARY KEY AUTOINCREMENT, title TEXT NOT NULL)",
    "CREATE TABLE user_group (user_id INTEGER NOT NULL, group_id INTEGER NOT NULL, role TEXT NOT NULL, joined DATETIME)",
];

async fn memory_db() -> Database {
    let driver = SqlxDriver::connect("sqlite::memory:").await.unwrap();
    let mut db = Database::new(driver).with_registry(Arc::new(Registry::new()));
    for ddl in SCHEMA {
        db.perform(ddl, "schema").await.unwrap();
    }
    db
}

#[tokio::test]
async fn test_entity_round_trip() {
    let mut db = memory_db().await;

    let mut widget = Widget {
        a_date: 1_700_000_000,
        mess: "first".into(),
        ..Default::default()
    };
    let id = widget.create(&mut db).await.unwrap();
    assert!(id > 0);
    assert_eq!(widget.id, id);

    // DATE keeps only the day
    let loaded = Widget::load(&mut db, id).await.unwrap().unwrap();
    assert_eq!(loaded.a_date, 1_699_920_000);
    assert_eq!(loaded.mess, "first");

    widget.mess = "second".into();
    assert_eq!(widget.update(&mut db).await.unwrap(), 1);
    let loaded = Widget::load(&mut db, id).await.unwrap().unwrap();
    assert_eq!(loaded.mess, "second");

    widget.delete(&mut db).await.unwrap();
    assert!(!widget.is_saved());
    assert!(Widget::load(&mut db, id).await.unwrap().is_none());
    assert_eq!(db.open_cursors(), 0);
}

#[tokio::test]
async fn test_custom_query() {
    let mut db = memory_db().await;
    for mess in ["a", "b", "a"] {
        let mut widget = Widget {
            mess: mess.into(),
            ..Default::default()
        };
        widget.save(&mut db).await.unwrap();
    }

    let mut cursor = Widget::run_query(&mut db, "by_mess", Params::named([("mess", "a")]))
        .await
        .unwrap();
    assert_eq!(cursor.remaining(), 2);
    let first: Widget = cursor.next_object().unwrap().unwrap();
    assert_eq!(first.mess, "a");
    cursor.free();
    assert_eq!(db.open_cursors(), 0);
}

#[tokio::test]
async fn test_links_round_trip() {
    let mut db = memory_db().await;

    let mut ann = User {
        name: "ann".into(),
        ..Default::default()
    };
    ann.create(&mut db).await.unwrap();
    let mut admins = Group {
        title: "admins".into(),
        ..Default::default()
    };
    admins.create(&mut db).await.unwrap();
    let mut members = Group {
        title: "members".into(),
        ..Default::default()
    };
    members.create(&mut db).await.unwrap();

    for (group, role, joined) in [(&admins, "admin", 100), (&members, "member", 200)] {
        let mut link = Membership::between(ann.clone(), group.clone()).unwrap();
        link.role = role.into();
        link.joined = joined;
        link.insert(&mut db).await.unwrap();
    }

    let links = Membership::load_for(&mut db, &ann).await.unwrap();
    assert_eq!(links.len(), 2);
    assert_eq!(links[0].group, members);
    assert_eq!(links[0].joined, 200);
    assert_eq!(links[1].group, admins);
    assert_eq!(links[1].role, "admin");

    let mut first = links[1].clone();
    first.joined = 300;
    assert_eq!(first.update(&mut db).await.unwrap(), 1);

    let of_admins = Membership::load_for(&mut db, &admins).await.unwrap();
    assert_eq!(of_admins.len(), 1);
    assert_eq!(of_admins[0].user, ann);
    assert_eq!(of_admins[0].joined, 300);

    // The opposite endpoint is gone: the row is skipped.
    members.delete(&mut db).await.unwrap();
    let links = Membership::load_for(&mut db, &ann).await.unwrap();
    assert_eq!(links.len(), 1);

    assert_eq!(Membership::delete_for(&mut db, &ann).await.unwrap(), 2);
    assert!(Membership::load_for(&mut db, &admins).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_paged_query() {
    let mut db = memory_db().await;
    for n in 0..7 {
        let mut widget = Widget {
            mess: format!("w{n}"),
            a_date: 86_400 * n,
            ..Default::default()
        };
        widget.create(&mut db).await.unwrap();
    }

    let mut query = QueryBuilder::<Widget>::select()
        .filter("`a_date` >= date(?, 'unixepoch')")
        .bind(86_400i64)
        .order_by("`widget_id`")
        .pager(Pager::new(1, 4))
        .unwrap();
    let page = query.fetch_page(&mut db).await.unwrap();
    assert_eq!(page.total_elements, 6);
    assert_eq!(page.total_pages, 2);
    assert_eq!(page.page, 1);
    assert_eq!(page.content.len(), 2);
    assert_eq!(page.content[0].mess, "w5");
    assert_eq!(page.content[1].a_date, 86_400 * 6);

    let removed = QueryBuilder::<Widget>::delete()
        .filter_in("mess", &["w0", "w1"])
        .execute(&mut db)
        .await
        .unwrap();
    assert_eq!(removed, 2);
}

#[tokio::test]
async fn test_missing_column_is_schema_error() {
    let driver = SqlxDriver::connect("sqlite::memory:").await.unwrap();
    let mut db = Database::new(driver).with_registry(Arc::new(Registry::new()));
    db.perform("CREATE TABLE widget (widget_id INTEGER PRIMARY KEY, mess TEXT)", "schema")
        .await
        .unwrap();

    match db.descriptor::<Widget>().await {
        Err(DataError::Schema { table, missing }) => {
            assert_eq!(table, "widget");
            assert_eq!(missing, vec!["a_date".to_string()]);
        }
        other => panic!("expected schema error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_statement_failure_reaches_sink() {
    let sink = Arc::new(CapturingSink::new());
    let mut config = DatabaseConfig::new("sqlite::memory:");
    config.log_statements = true;
    let mut db = connect_with_sink(&config, sink.clone())
        .await
        .unwrap()
        .with_registry(Arc::new(Registry::new()));

    let err = db.perform("INSERT INTO nowhere VALUES (1)", "orphan").await.unwrap_err();
    assert!(err.is_statement_failure());
    let errors = sink.errors();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].starts_with("[orphan] "));
    assert!(errors[0].ends_with(": INSERT INTO nowhere VALUES (1)"));

    db.perform("CREATE TABLE t (x INTEGER)", "schema").await.unwrap();
    assert_eq!(sink.infos(), vec!["[schema] CREATE TABLE t (x INTEGER)".to_string()]);
}

#[tokio::test]
async fn test_connect_rejects_unknown_scheme() {
    let config = DatabaseConfig::new("postgres://localhost/db");
    assert!(matches!(connect(&config).await, Err(DataError::Config(_))));
}
