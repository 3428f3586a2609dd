use orma_data::{Database, Dialect, Row, Value};
use orma_test::{RecordedKind, RecordingDriver};

#[tokio::test]
async fn test_unmatched_statements_succeed() {
    let driver = RecordingDriver::mysql();
    let recording = driver.recording();
    let mut db = Database::new(driver);

    let cursor = db.query("SELECT 1").await.unwrap();
    assert_eq!(cursor.remaining(), 0);
    db.perform("INSERT INTO `t` SET `a`=1", "insert").await.unwrap();
    assert_eq!(db.last_insert_id(), Some(1));
    db.perform("INSERT INTO `t` SET `a`=2", "insert").await.unwrap();
    assert_eq!(db.last_insert_id(), Some(2));

    let entries = recording.entries();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].kind, RecordedKind::Fetch);
    assert_eq!(entries[1].kind, RecordedKind::Execute);
}

#[tokio::test]
async fn test_latest_rule_wins() {
    let driver = RecordingDriver::mysql()
        .on_fetch("FROM `t`", vec![Row::new().with("a", 1i64)])
        .on_fetch("FROM `t`", vec![Row::new().with("a", 2i64)]);
    let mut db = Database::new(driver);
    let value = db.query("SELECT `a` FROM `t`").await.unwrap().scalar();
    assert_eq!(value, Some(Value::Int(2)));
}

#[tokio::test]
async fn test_scripted_describe_and_failure() {
    let driver = RecordingDriver::sqlite().with_column("widget", "mess", "TEXT");
    let recording = driver.recording();
    let mut db = Database::new(driver);

    let sql = Dialect::Sqlite.describe_sql("widget", "mess");
    let row = db.query(&sql).await.unwrap().row().unwrap();
    assert_eq!(row.get("Type"), Some(&Value::Text("TEXT".into())));

    recording.fail_on("DELETE", "boom");
    let err = db.perform("DELETE FROM `widget`", "delete").await.unwrap_err();
    assert!(err.is_statement_failure());
    assert_eq!(recording.count("DELETE"), 1);
}
