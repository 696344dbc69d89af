use super::*;

fn versions(units: &[MigrationUnit]) -> Vec<&str> {
    units.iter().map(|u| u.version.as_str()).collect()
}

// ── version_from_name ──────────────────────────────────────────────────

#[test]
fn version_from_up_sql_name() {
    assert_eq!(version_from_name("0001_init.up.sql").unwrap(), "0001_init");
}

#[test]
fn version_rejects_other_suffixes() {
    assert!(version_from_name("0001_init.down.sql").is_none());
    assert!(version_from_name("0001_init.sql").is_none());
    assert!(version_from_name("notes.txt").is_none());
    assert!(version_from_name("0001_init.up.sql.bak").is_none());
}

#[test]
fn version_rejects_bare_suffix() {
    assert!(version_from_name(".up.sql").is_none());
}

// ── FsSource ───────────────────────────────────────────────────────────

#[test]
fn fs_discover_filters_and_sorts() {
    let dir = tempfile::tempdir().unwrap();
    for name in [
        "0002_add_col.up.sql",
        "0001_init.up.sql",
        "0001_init.down.sql",
        "README.txt",
        ".up.sql",
    ] {
        std::fs::write(dir.path().join(name), "SELECT 1;").unwrap();
    }
    std::fs::create_dir(dir.path().join("0000_dir.up.sql")).unwrap();

    let source = FsSource::new(dir.path());
    let units = discover(&source).unwrap();

    assert_eq!(versions(&units), vec!["0001_init", "0002_add_col"]);
    assert_eq!(units[0].location, dir.path().join("0001_init.up.sql"));
}

#[test]
fn fs_discover_is_not_recursive() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("nested");
    std::fs::create_dir(&nested).unwrap();
    std::fs::write(nested.join("0001_hidden.up.sql"), "SELECT 1;").unwrap();

    let units = discover(&FsSource::new(dir.path())).unwrap();
    assert!(units.is_empty());
}

#[test]
fn fs_discover_does_not_read_contents() {
    let dir = tempfile::tempdir().unwrap();
    // Invalid UTF-8 would fail a read; discovery must still succeed.
    std::fs::write(dir.path().join("0001_binary.up.sql"), [0xff, 0xfe, 0x00]).unwrap();

    let units = discover(&FsSource::new(dir.path())).unwrap();
    assert_eq!(versions(&units), vec!["0001_binary"]);
}

#[test]
fn fs_discover_missing_root_is_discovery_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("does_not_exist");

    let err = discover(&FsSource::new(&missing)).unwrap_err();
    match err {
        MigrateError::Discovery { root, .. } => assert!(root.ends_with("does_not_exist")),
        other => panic!("expected Discovery error, got {other:?}"),
    }
}

#[test]
fn fs_read_loads_file_contents() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("0001_init.up.sql");
    std::fs::write(&path, "CREATE TABLE t (id INT);").unwrap();

    let source = FsSource::new(dir.path());
    assert_eq!(source.read(&path).unwrap(), "CREATE TABLE t (id INT);");
}

// ── Ordering ───────────────────────────────────────────────────────────

#[test]
fn ordering_is_plain_string_order() {
    let source = EmbeddedSource::new("m")
        .with_file("9_nine.up.sql", "")
        .with_file("10_ten.up.sql", "")
        .with_file("20240102T0000_b.up.sql", "")
        .with_file("20240101T0000_a.up.sql", "");

    let units = discover(&source).unwrap();
    assert_eq!(
        versions(&units),
        vec![
            "10_ten",
            "20240101T0000_a",
            "20240102T0000_b",
            "9_nine"
        ]
    );
}

// ── EmbeddedSource ─────────────────────────────────────────────────────

#[test]
fn embedded_discover_skips_dirs() {
    let source = EmbeddedSource::from_static(
        "embedded",
        &[("0001_init.up.sql", "CREATE TABLE t (id INT);")],
    )
    .with_dir("0000_folder.up.sql");

    let units = discover(&source).unwrap();
    assert_eq!(versions(&units), vec!["0001_init"]);
    assert_eq!(units[0].location, PathBuf::from("embedded/0001_init.up.sql"));
}

#[test]
fn embedded_read_resolves_location() {
    let source = EmbeddedSource::from_static("embedded", &[("0001_init.up.sql", "SELECT 1;")]);
    let units = discover(&source).unwrap();
    assert_eq!(source.read(&units[0].location).unwrap(), "SELECT 1;");
}

#[test]
fn embedded_read_unknown_location_is_not_found() {
    let source = EmbeddedSource::new("embedded");
    let err = source
        .read(Path::new("embedded/0009_missing.up.sql"))
        .unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::NotFound);
}
