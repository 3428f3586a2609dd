use std::sync::Arc;

use orma_data::{
    DataError, Database, DatabaseOptions, LinkCrud, Registry, Row, Value, LINK_BUILTINS,
};
use orma_macros::{Entity, Link};
use orma_test::{Recording, RecordingDriver};

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

#[derive(Debug, Clone, Default, Entity)]
struct Widget {
    id: i64,
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

#[derive(Debug, Clone, Link)]
#[orma(table = "friendship")]
struct Friendship {
    #[orma(from)]
    a: User,
    #[orma(to)]
    b: User,
}

#[derive(Debug, Clone, Link)]
#[orma(table = "follow", to_key = "group_id")]
struct Follow {
    #[orma(from)]
    user: User,
    #[orma(to)]
    group: Group,
}

fn driver() -> RecordingDriver {
    RecordingDriver::mysql()
        .with_column("user", "name", "varchar(64)")
        .with_column("groups", "title", "varchar(64)")
        .with_table("user_group", &[("role", "varchar(16)"), ("joined", "datetime")])
}

fn database(driver: RecordingDriver) -> Database {
    Database::new(driver).with_registry(Arc::new(Registry::new()))
}

fn ann() -> User {
    User {
        id: 1,
        name: "ann".into(),
    }
}

fn admins() -> Group {
    Group {
        id: 10,
        title: "admins".into(),
    }
}

fn membership(role: &str, joined: i64) -> Membership {
    let mut link = Membership::between(ann(), admins()).unwrap();
    link.role = role.into();
    link.joined = joined;
    link
}

#[tokio::test]
async fn test_link_sql() {
    let mut db = database(driver());
    let descriptor = db.link_descriptor::<Membership>().await.unwrap();

    assert_eq!(descriptor.from_key(), "user_id");
    assert_eq!(descriptor.to_key(), "group_id");
    assert_eq!(descriptor.key_columns(), vec!["user_id", "group_id", "role"]);
    assert_eq!(descriptor.payload_columns(), vec!["role", "joined"]);
    let operations: Vec<&str> = descriptor.operations().collect();
    assert!(LINK_BUILTINS.iter().all(|op| operations.contains(op)));
    assert_eq!(
        &*descriptor.sql("insert").unwrap(),
        "INSERT INTO `user_group` SET `user_id`=:user_id, `group_id`=:group_id, `role`=:role, `joined`=FROM_UNIXTIME(:joined)"
    );
    assert_eq!(
        &*descriptor.sql("update").unwrap(),
        "UPDATE `user_group` SET `joined`=FROM_UNIXTIME(:joined) WHERE `user_id`=:user_id AND `group_id`=:group_id AND `role`=:role"
    );
    assert_eq!(
        &*descriptor.sql("load_from").unwrap(),
        "SELECT `group_id`, `role`, UNIX_TIMESTAMP(`joined`) AS `joined` FROM `user_group` WHERE `user_id`=:user_id ORDER BY `joined` DESC"
    );
    assert_eq!(
        &*descriptor.sql("load_to").unwrap(),
        "SELECT `user_id`, `role`, UNIX_TIMESTAMP(`joined`) AS `joined` FROM `user_group` WHERE `group_id`=:group_id"
    );
}

#[test]
fn test_between_requires_saved_endpoints() {
    assert!(matches!(
        Membership::between(User::default(), admins()),
        Err(DataError::InvalidArgument(_))
    ));
    assert!(Membership::between(ann(), admins()).is_ok());
}

#[tokio::test]
async fn test_insert_locks_all_three_tables() {
    let driver = driver();
    let recording = driver.recording();
    let mut db = database(driver);

    membership("admin", 100).insert(&mut db).await.unwrap();

    let statements = recording.statements();
    let tail = &statements[statements.len() - 3..];
    assert_eq!(tail[0], "LOCK TABLES `user_group` WRITE, `user` WRITE, `groups` WRITE");
    assert_eq!(
        tail[1],
        "INSERT INTO `user_group` SET `user_id`=?, `group_id`=?, `role`=?, `joined`=FROM_UNIXTIME(?)"
    );
    assert_eq!(tail[2], "UNLOCK TABLES");
    let insert = recording.last_matching("INSERT").unwrap();
    assert_eq!(
        insert.values,
        vec![Value::Int(1), Value::Int(10), Value::Text("admin".into()), Value::Int(100)]
    );
    assert!(!db.is_locked());
}

#[tokio::test]
async fn test_failed_link_insert_still_unlocks() {
    let driver = driver().fail_on("INSERT INTO `user_group`", "foreign key violation");
    let recording = driver.recording();
    let mut db = database(driver);

    let err = membership("admin", 100).insert(&mut db).await.unwrap_err();
    assert!(err.is_statement_failure());
    assert_eq!(recording.count("LOCK TABLES `user_group`"), 1);
    assert_eq!(recording.count("UNLOCK TABLES"), 1);
    assert!(!db.is_locked());
    assert_eq!(db.open_cursors(), 0);
}

#[tokio::test]
async fn test_update_and_delete_match_full_key() {
    let driver = driver();
    let recording = driver.recording();
    let mut db = database(driver);

    let link = membership("admin", 200);
    assert_eq!(link.update(&mut db).await.unwrap(), 1);
    let update = recording.last_matching("UPDATE").unwrap();
    assert_eq!(
        update.values,
        vec![Value::Int(200), Value::Int(1), Value::Int(10), Value::Text("admin".into())]
    );

    assert_eq!(link.delete(&mut db).await.unwrap(), 1);
    let delete = recording.last_matching("DELETE").unwrap();
    assert_eq!(
        delete.sql,
        "DELETE FROM `user_group` WHERE `user_id`=? AND `group_id`=? AND `role`=?"
    );
}

#[tokio::test]
async fn test_update_without_payload_is_a_no_op() {
    let driver = driver();
    let recording = driver.recording();
    let mut db = database(driver);

    let follow = Follow::between(ann(), admins()).unwrap();
    assert_eq!(follow.update(&mut db).await.unwrap(), 0);
    assert_eq!(recording.count("UPDATE"), 0);

    follow.insert(&mut db).await.unwrap();
    assert_eq!(
        recording.last_matching("INSERT").unwrap().sql,
        "INSERT INTO `follow` SET `user_id`=?, `group_id`=?"
    );
}

fn script_groups(recording: &Recording) {
    recording.on_fetch_for(
        "FROM `groups` WHERE",
        vec![Value::Int(10)],
        vec![Row::new().with("title", "admins")],
    );
    recording.on_fetch_for(
        "FROM `groups` WHERE",
        vec![Value::Int(11)],
        vec![Row::new().with("title", "members")],
    );
}

#[tokio::test]
async fn test_load_from_side() {
    let driver = driver().on_fetch(
        "FROM `user_group` WHERE `user_id`",
        vec![
            Row::new().with("group_id", 10i64).with("role", "admin").with("joined", 100i64),
            Row::new().with("group_id", 99i64).with("role", "ghost").with("joined", 75i64),
            Row::new().with("group_id", 11i64).with("role", "member").with("joined", 50i64),
        ],
    );
    script_groups(&driver.recording());
    let mut db = database(driver);

    let links = Membership::load_for(&mut db, &ann()).await.unwrap();
    assert_eq!(links.len(), 2);
    assert_eq!(links[0].user, ann());
    assert_eq!(links[0].group, admins());
    assert_eq!(links[0].role, "admin");
    assert_eq!(links[0].joined, 100);
    assert_eq!(links[1].group.title, "members");
    assert_eq!(links[1].group.id, 11);
    assert_eq!(db.open_cursors(), 0);
}

#[tokio::test]
async fn test_row_without_endpoint_id_skipped() {
    let driver = driver().on_fetch(
        "FROM `user_group` WHERE `user_id`",
        vec![
            Row::new().with("group_id", Value::Null).with("role", "orphan").with("joined", 1i64),
            Row::new().with("group_id", 10i64).with("role", "admin").with("joined", 100i64),
        ],
    );
    script_groups(&driver.recording());
    let mut db = database(driver);

    let links = Membership::load_for(&mut db, &ann()).await.unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].role, "admin");
    assert_eq!(db.open_cursors(), 0);
}

#[tokio::test]
async fn test_load_to_side() {
    let driver = driver()
        .on_fetch(
            "FROM `user_group` WHERE `group_id`",
            vec![Row::new().with("user_id", 1i64).with("role", "admin").with("joined", 100i64)],
        )
        .on_fetch_for(
            "FROM `user` WHERE",
            vec![Value::Int(1)],
            vec![Row::new().with("name", "ann")],
        );
    let recording = driver.recording();
    let mut db = database(driver);

    let links = Membership::load_for(&mut db, &admins()).await.unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].user, ann());
    assert_eq!(links[0].group, admins());

    let load = recording.last_matching("FROM `user_group`").unwrap();
    assert!(!load.sql.contains("ORDER BY"));
    assert_eq!(load.values, vec![Value::Int(10)]);
}

#[tokio::test]
async fn test_delete_for_endpoint() {
    let driver = driver();
    let recording = driver.recording();
    let mut db = database(driver);

    Membership::delete_for(&mut db, &admins()).await.unwrap();
    let delete = recording.last_matching("DELETE").unwrap();
    assert_eq!(delete.sql, "DELETE FROM `user_group` WHERE `group_id`=?");
    assert_eq!(delete.values, vec![Value::Int(10)]);
}

#[tokio::test]
async fn test_foreign_entity_rejected() {
    let driver = driver();
    let recording = driver.recording();
    let mut db = database(driver);

    let widget = Widget { id: 3 };
    assert!(matches!(
        Membership::load_for(&mut db, &widget).await,
        Err(DataError::InvalidArgument(_))
    ));
    assert!(matches!(
        Membership::delete_for(&mut db, &widget).await,
        Err(DataError::InvalidArgument(_))
    ));
    assert!(recording.statements().is_empty());
}

#[tokio::test]
async fn test_same_endpoint_keys_rejected() {
    let mut db = database(driver());
    assert!(matches!(
        db.link_descriptor::<Friendship>().await,
        Err(DataError::Config(_))
    ));
}

#[tokio::test]
async fn test_additional_key_column_required_even_when_lenient() {
    let driver = RecordingDriver::mysql().with_column("user_group", "joined", "datetime");
    let mut db = database(driver).with_options(DatabaseOptions {
        strict_schema: false,
        ..Default::default()
    });
    match db.link_descriptor::<Membership>().await {
        Err(DataError::Schema { missing, .. }) => assert_eq!(missing, vec!["role".to_string()]),
        other => panic!("expected schema error, got {other:?}"),
    }
}
