use std::fs;

use orma_core::config::{ConfigError, ConfigValue, OrmaConfig, PROFILE_ENV};
use orma_core::DatabaseConfig;
use serial_test::serial;

#[test]
fn test_empty_config() {
    let config = OrmaConfig::empty();
    assert!(matches!(
        config.get::<String>("nonexistent"),
        Err(ConfigError::NotFound(_))
    ));
}

#[test]
fn test_set_and_get() {
    let mut config = OrmaConfig::empty();
    config.set("orma.database.url", ConfigValue::String("sqlite::memory:".into()));
    assert_eq!(
        config.get::<String>("orma.database.url").unwrap(),
        "sqlite::memory:"
    );
    assert_eq!(config.get_or("missing", 7i64), 7);
}

#[test]
fn test_database_section_defaults() {
    let config = OrmaConfig::from_yaml_str(
        r#"
orma:
  database:
    url: "mysql://app:pw@localhost/shop"
    log_statements: true
"#,
        "test",
    )
    .unwrap();
    let db: DatabaseConfig = config.section().unwrap();
    assert_eq!(db.url, "mysql://app:pw@localhost/shop");
    assert!(db.log_statements);
    assert!(!db.time_statements);
    assert!(db.strict_schema);
    assert_eq!(db.target, None);
    assert_eq!(db.target_name(), "mysql://localhost/shop");
}

#[test]
fn test_database_section_requires_url() {
    let config = OrmaConfig::from_yaml_str("orma:\n  database:\n    strict_schema: false\n", "test")
        .unwrap();
    let err = config.section::<DatabaseConfig>().unwrap_err();
    assert!(matches!(err, ConfigError::NotFound(key) if key == "orma.database.url"));
}

#[test]
fn test_type_mismatch() {
    let config =
        OrmaConfig::from_yaml_str("orma:\n  database:\n    url: x\n    log_statements: loud\n", "test")
            .unwrap();
    // optional flags fall back to their default on mismatch
    let db = config.section::<DatabaseConfig>().unwrap();
    assert!(!db.log_statements);
    assert!(matches!(
        config.get::<bool>("orma.database.log_statements"),
        Err(ConfigError::TypeMismatch { expected: "bool", .. })
    ));
}

#[test]
#[serial]
fn test_profile_overrides_and_env_overlay() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("application.yaml"),
        "orma:\n  database:\n    url: \"sqlite::memory:\"\n    time_statements: false\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("application-prod.yaml"),
        "orma:\n  database:\n    url: \"mysql://db/prod\"\n",
    )
    .unwrap();
    fs::write(dir.path().join(".env"), "ORMA_DATABASE_TIME_STATEMENTS=true\n").unwrap();

    std::env::remove_var(PROFILE_ENV);
    std::env::remove_var("ORMA_DATABASE_TIME_STATEMENTS");
    let config = OrmaConfig::load_from(dir.path(), "prod").unwrap();
    assert_eq!(config.profile(), "prod");

    let db: DatabaseConfig = config.section().unwrap();
    assert_eq!(db.url, "mysql://db/prod");
    assert!(db.time_statements);

    std::env::remove_var("ORMA_DATABASE_TIME_STATEMENTS");
}

#[test]
#[serial]
fn test_profile_env_wins() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("application-staging.yaml"),
        "orma:\n  database:\n    url: \"mysql://db/staging\"\n",
    )
    .unwrap();

    std::env::set_var(PROFILE_ENV, "staging");
    let config = OrmaConfig::load_from(dir.path(), "dev").unwrap();
    std::env::remove_var(PROFILE_ENV);

    assert_eq!(config.profile(), "staging");
    assert_eq!(
        config.get::<String>("orma.database.url").unwrap(),
        "mysql://db/staging"
    );
}
