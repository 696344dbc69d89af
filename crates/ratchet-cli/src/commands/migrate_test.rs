use super::*;

fn args(exec_timeout: Option<u64>, timeout: Option<u64>) -> MigrateArgs {
    MigrateArgs {
        exec_timeout,
        timeout,
    }
}

#[tokio::test]
async fn defaults_come_from_config() {
    let config = Config::default();
    let options = run_options(&config, &args(None, None)).unwrap();

    assert_eq!(options.exec_timeout, Duration::from_secs(30));
    let remaining = options
        .deadline
        .unwrap()
        .saturating_duration_since(tokio::time::Instant::now());
    assert!(remaining <= Duration::from_secs(120));
    assert!(remaining > Duration::from_secs(100));
}

#[tokio::test]
async fn flags_override_config() {
    let config = Config::default();
    let options = run_options(&config, &args(Some(5), Some(10))).unwrap();

    assert_eq!(options.exec_timeout, Duration::from_secs(5));
    let remaining = options
        .deadline
        .unwrap()
        .saturating_duration_since(tokio::time::Instant::now());
    assert!(remaining <= Duration::from_secs(10));
}

#[tokio::test]
async fn zero_flag_is_rejected() {
    let config = Config::default();
    let err = run_options(&config, &args(Some(0), None)).unwrap_err();
    assert!(err.to_string().contains("--exec-timeout"));
}

#[tokio::test]
async fn end_to_end_against_temp_project() {
    let dir = tempfile::tempdir().unwrap();
    let migrations = dir.path().join("migrations");
    std::fs::create_dir(&migrations).unwrap();
    std::fs::write(migrations.join("0001_init.up.sql"), "CREATE TABLE t (id INT);").unwrap();
    let config_path = dir.path().join("ratchet.yml");
    std::fs::write(
        &config_path,
        format!(
            "database:\n  path: \"{}\"\nmigrations_dir: \"{}\"\nlock: table\n",
            dir.path().join("app.duckdb").display(),
            migrations.display()
        ),
    )
    .unwrap();
    let global = GlobalArgs {
        verbose: false,
        config: Some(config_path.display().to_string()),
        database: None,
        migrations_dir: None,
    };

    execute(&args(None, None), &global).await.unwrap();
    // Second run is a no-op and the lock was released in between.
    execute(&args(None, None), &global).await.unwrap();
}
