use super::*;
use ratchet_core::LockMode;

fn args(config: Option<&Path>) -> GlobalArgs {
    GlobalArgs {
        verbose: false,
        config: config.map(|p| p.display().to_string()),
        database: None,
        migrations_dir: None,
    }
}

#[test]
fn explicit_config_file_is_loaded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("custom.yml");
    std::fs::write(
        &path,
        "database:\n  path: app.duckdb\nmigrations_dir: sql\nlock: table\n",
    )
    .unwrap();

    let config = resolve_config(&args(Some(&path))).unwrap();
    assert_eq!(config.database.path, "app.duckdb");
    assert_eq!(config.migrations_dir, "sql");
    assert_eq!(config.lock, LockMode::Table);
}

#[test]
fn flags_override_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ratchet.yml");
    std::fs::write(&path, "database:\n  path: app.duckdb\nmigrations_dir: sql\n").unwrap();

    let mut global = args(Some(&path));
    global.database = Some(":memory:".to_string());
    global.migrations_dir = Some("other".to_string());

    let config = resolve_config(&global).unwrap();
    assert_eq!(config.database.path, ":memory:");
    assert_eq!(config.migrations_dir, "other");
}

#[test]
fn empty_override_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ratchet.yml");
    std::fs::write(&path, "migrations_dir: sql\n").unwrap();

    let mut global = args(Some(&path));
    global.migrations_dir = Some(" ".to_string());
    assert!(resolve_config(&global).is_err());
}

#[test]
fn missing_explicit_config_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.yml");
    assert!(resolve_config(&args(Some(&missing))).is_err());
}

#[test]
fn in_memory_context_connects() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ratchet.yml");
    std::fs::write(&path, "database:\n  path: \":memory:\"\n").unwrap();

    let ctx = RuntimeContext::new(&args(Some(&path))).unwrap();
    assert_eq!(ctx.db.db_type(), "duckdb");
}
