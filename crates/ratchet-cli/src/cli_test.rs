use super::*;
use clap::CommandFactory;

#[test]
fn verify_cli_args() {
    // Catches short flag conflicts and other clap definition errors.
    Cli::command().debug_assert();
}

#[test]
fn migrate_parses_timeouts() {
    let cli = Cli::try_parse_from([
        "ratchet",
        "migrate",
        "--exec-timeout",
        "10",
        "--timeout",
        "60",
    ])
    .unwrap();
    match cli.command {
        Commands::Migrate(args) => {
            assert_eq!(args.exec_timeout, Some(10));
            assert_eq!(args.timeout, Some(60));
        }
        other => panic!("expected migrate, got {other:?}"),
    }
}

#[test]
fn global_flags_accepted_after_subcommand() {
    let cli = Cli::try_parse_from([
        "ratchet",
        "history",
        "--database",
        "app.duckdb",
        "-m",
        "db/migrations",
        "-v",
    ])
    .unwrap();
    assert_eq!(cli.global.database.as_deref(), Some("app.duckdb"));
    assert_eq!(cli.global.migrations_dir.as_deref(), Some("db/migrations"));
    assert!(cli.global.verbose);
}

#[test]
fn history_defaults_to_table() {
    let cli = Cli::try_parse_from(["ratchet", "history"]).unwrap();
    match cli.command {
        Commands::History(args) => assert_eq!(args.output, OutputFormat::Table),
        other => panic!("expected history, got {other:?}"),
    }

    let cli = Cli::try_parse_from(["ratchet", "history", "--output", "json"]).unwrap();
    match cli.command {
        Commands::History(args) => assert_eq!(args.output, OutputFormat::Json),
        other => panic!("expected history, got {other:?}"),
    }
}

#[test]
fn rejects_non_numeric_timeout() {
    assert!(Cli::try_parse_from(["ratchet", "migrate", "--timeout", "soon"]).is_err());
}
