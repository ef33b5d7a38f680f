use clap::Parser;

use crate::domain::api_keys::ApiRole;

use super::*;

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.server.port = Some(4000);
    raw.logging.level = Some("info".to_string());

    let overrides = ServeOverrides {
        server_port: Some(4321),
        log_level: Some("debug".to_string()),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.addr.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
}

#[test]
fn defaults_match_documented_values() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.server.addr.port(), DEFAULT_PORT);
    assert!(settings.server.public_url.is_none());
    assert!(settings.database.url.is_none());
    assert_eq!(settings.database.max_connections.get(), 8);
    assert!(settings.cache.enabled);
    assert_eq!(settings.cache.capacity, 1024);
    assert!(settings.cache.ttl.is_none());
    assert!(settings.cache.single_flight);
    assert_eq!(settings.pagination.default_page, 1);
    assert_eq!(settings.pagination.default_limit, 3);
    assert_eq!(settings.pagination.max_limit, 100);
    assert_eq!(settings.api.default_version, ApiVersion::V1);
}

#[test]
fn zero_port_is_rejected() {
    let mut raw = RawSettings::default();
    raw.server.port = Some(0);

    let err = Settings::from_raw(raw).expect_err("zero port");
    assert!(matches!(err, LoadError::Invalid { key: "server.port", .. }));
}

#[test]
fn public_url_must_be_absolute() {
    let mut raw = RawSettings::default();
    raw.server.public_url = Some("example.com".to_string());
    let err = Settings::from_raw(raw).expect_err("relative url");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "server.public_url",
            ..
        }
    ));

    let mut raw = RawSettings::default();
    raw.server.public_url = Some("https://books.example.com/".to_string());
    let settings = Settings::from_raw(raw).expect("absolute url");
    assert_eq!(
        settings.server.public_url.as_deref(),
        Some("https://books.example.com")
    );
}

#[test]
fn blank_database_url_selects_memory_store() {
    let mut raw = RawSettings::default();
    raw.database.url = Some("   ".to_string());

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(settings.database.url.is_none());
}

#[test]
fn cache_capacity_is_clamped_and_ttl_zero_disables_expiry() {
    let mut raw = RawSettings::default();
    raw.cache.capacity = Some(0);
    raw.cache.ttl_seconds = Some(0);

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.cache.capacity, 1);
    assert!(settings.cache.ttl.is_none());
}

#[test]
fn cache_overrides_apply_from_cli() {
    let mut raw = RawSettings::default();
    let overrides = ServeOverrides {
        cache_enabled: Some(false),
        cache_ttl_seconds: Some(90),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(!settings.cache.enabled);
    assert_eq!(settings.cache.ttl, Some(Duration::from_secs(90)));
}

#[test]
fn default_limit_cannot_exceed_max_limit() {
    let mut raw = RawSettings::default();
    raw.pagination.default_limit = Some(50);
    raw.pagination.max_limit = Some(10);

    let err = Settings::from_raw(raw).expect_err("limit above max");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "pagination.default_limit",
            ..
        }
    ));
}

#[test]
fn unsupported_api_version_is_rejected() {
    let mut raw = RawSettings::default();
    raw.api.default_version = Some("3.0".to_string());

    let err = Settings::from_raw(raw).expect_err("unknown version");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "api.default_version",
            ..
        }
    ));
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = ServeOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn default_to_serve_command() {
    let args = CliArgs::parse_from(["bookapi"]);
    let command = args
        .command
        .unwrap_or(Command::Serve(Box::<ServeArgs>::default()));
    assert!(matches!(command, Command::Serve(_)));
}

#[test]
fn parse_serve_overrides() {
    let args = CliArgs::parse_from([
        "bookapi",
        "serve",
        "--server-host",
        "0.0.0.0",
        "--database-url",
        "postgres://override",
        "--seed",
    ]);

    match args.command.expect("serve command") {
        Command::Serve(serve) => {
            assert_eq!(serve.overrides.server_host.as_deref(), Some("0.0.0.0"));
            assert_eq!(
                serve.overrides.database_url.as_deref(),
                Some("postgres://override")
            );
            assert!(serve.seed);
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_issue_key_arguments() {
    let args = CliArgs::parse_from([
        "bookapi",
        "issue-key",
        "--name",
        "librarian",
        "--role",
        "admin",
        "--expires-in-days",
        "30",
    ]);

    match args.command.expect("issue-key command") {
        Command::IssueKey(issue) => {
            assert_eq!(issue.name, "librarian");
            assert_eq!(issue.role, ApiRole::Admin);
            assert_eq!(issue.expires_in_days, Some(30));
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn issue_key_rejects_unknown_role() {
    let result = CliArgs::try_parse_from(["bookapi", "issue-key", "--name", "x", "--role", "root"]);
    assert!(result.is_err());
}

#[test]
fn parse_seed_arguments() {
    let args = CliArgs::parse_from(["bookapi", "seed", "--database-url", "postgres://example"]);

    match args.command.expect("seed command") {
        Command::Seed(seed) => {
            assert_eq!(
                seed.database.database_url.as_deref(),
                Some("postgres://example")
            );
        }
        _ => panic!("wrong command parsed"),
    }
}
