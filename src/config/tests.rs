use super::*;

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.server.port = Some(4000);
    raw.logging.level = Some("info".to_string());

    let overrides = ServeOverrides {
        port: Some(4321),
        log_level: Some("debug".to_string()),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.addr.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
}

#[test]
fn defaults_resolve_without_any_source() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.server.addr.to_string(), "127.0.0.1:3000");
    assert_eq!(settings.server.graceful_shutdown, Duration::from_secs(30));
    assert!(matches!(settings.logging.format, LogFormat::Compact));
    assert!(settings.database.url.is_none());
    assert_eq!(settings.database.max_connections.get(), 8);
    assert_eq!(settings.images.base_url.as_str(), "https://api.cloudinary.com/");
    assert_eq!(settings.images.folder, "blog-posts");
    assert_eq!(settings.images.timeout, Duration::from_secs(30));
    assert_eq!(
        settings.uploads.max_request_bytes.get(),
        DEFAULT_UPLOAD_REQUEST_LIMIT_BYTES
    );
    assert_eq!(settings.sessions.cookie_name, "postdesk_session");
    assert_eq!(settings.sessions.default_ttl(), time::Duration::days(14));
}

#[test]
fn uploads_limit_can_be_overridden_via_cli() {
    let mut raw = RawSettings::default();
    let overrides = ServeOverrides {
        uploads_max_request_bytes: Some(1_572_864),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.uploads.max_request_bytes.get(), 1_572_864);
    assert_eq!(settings.uploads.max_request_bytes_usize(), 1_572_864);
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
fn blank_database_url_is_treated_as_absent() {
    let mut raw = RawSettings::default();
    raw.database.url = Some("   ".to_string());

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(settings.database.url.is_none());
}

#[test]
fn zero_port_is_rejected() {
    let mut raw = RawSettings::default();
    raw.server.port = Some(0);

    match Settings::from_raw(raw) {
        Err(LoadError::Invalid { key, .. }) => assert_eq!(key, "server.port"),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn unparsable_log_level_is_rejected() {
    let mut raw = RawSettings::default();
    raw.logging.level = Some("chatty".to_string());

    match Settings::from_raw(raw) {
        Err(LoadError::Invalid { key, .. }) => assert_eq!(key, "logging.level"),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn images_folder_is_normalised_and_checked() {
    let mut raw = RawSettings::default();
    raw.images.folder = Some("/covers/2024/".to_string());
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.images.folder, "covers/2024");

    let mut raw = RawSettings::default();
    raw.images.folder = Some("covers/../avatars".to_string());
    match Settings::from_raw(raw) {
        Err(LoadError::Invalid { key, .. }) => assert_eq!(key, "images.folder"),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn images_base_url_must_be_http() {
    let mut raw = RawSettings::default();
    raw.images.base_url = Some("ftp://files.example".to_string());

    match Settings::from_raw(raw) {
        Err(LoadError::Invalid { key, .. }) => assert_eq!(key, "images.base_url"),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn image_credentials_are_required_only_on_demand() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");
    match settings.images.require_credentials() {
        Err(LoadError::Invalid { key, .. }) => assert_eq!(key, "images.cloud_name"),
        other => panic!("unexpected result: {other:?}"),
    }

    let mut raw = RawSettings::default();
    raw.images.cloud_name = Some("demo".to_string());
    raw.images.api_key = Some("key".to_string());
    raw.images.api_secret = Some("secret".to_string());
    let settings = Settings::from_raw(raw).expect("valid settings");
    settings
        .images
        .require_credentials()
        .expect("credentials present");
}

#[test]
fn image_secret_is_redacted_in_debug_output() {
    let mut raw = RawSettings::default();
    raw.images.api_secret = Some("hunter2".to_string());
    let settings = Settings::from_raw(raw).expect("valid settings");

    let rendered = format!("{:?}", settings.images);
    assert!(!rendered.contains("hunter2"));
    assert!(rendered.contains("<redacted>"));
}

#[test]
fn raw_settings_debug_hides_image_secret() {
    let mut raw = RawSettings::default();
    raw.images.api_key = Some("key-123".to_string());
    raw.images.api_secret = Some("hunter2".to_string());

    let rendered = format!("{raw:?}");
    assert!(rendered.contains("key-123"));
    assert!(!rendered.contains("hunter2"));
    assert!(rendered.contains("<redacted>"));
}

#[test]
fn cookie_name_rejects_separators() {
    let mut raw = RawSettings::default();
    raw.sessions.cookie_name = Some("bad;name".to_string());

    match Settings::from_raw(raw) {
        Err(LoadError::Invalid { key, .. }) => assert_eq!(key, "sessions.cookie_name"),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn default_to_serve_command() {
    let args = CliArgs::parse_from(["postdesk"]);
    let command = args
        .command
        .unwrap_or(Command::Serve(Box::<ServeArgs>::default()));
    assert!(matches!(command, Command::Serve(_)));
}

#[test]
fn parse_serve_overrides() {
    let args = CliArgs::parse_from([
        "postdesk",
        "serve",
        "--server-host",
        "0.0.0.0",
        "--port",
        "8080",
        "--database-url",
        "postgres://override",
        "--log-json",
        "yes",
    ]);

    match args.command.expect("serve command") {
        Command::Serve(serve) => {
            assert_eq!(serve.overrides.server_host.as_deref(), Some("0.0.0.0"));
            assert_eq!(serve.overrides.port, Some(8080));
            assert_eq!(
                serve.overrides.database_url.as_deref(),
                Some("postgres://override")
            );
            assert_eq!(serve.overrides.log_json, Some(true));
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_authors_create_arguments() {
    let args = CliArgs::parse_from([
        "postdesk",
        "authors",
        "create",
        "--database-url",
        "postgres://example",
        "--name",
        "Ada",
        "--image",
        "https://img.test/ada.png",
    ]);

    match args.command.expect("authors command") {
        Command::Authors(AuthorsArgs {
            command: AuthorsCommand::Create(create),
        }) => {
            assert_eq!(
                create.database.database_url.as_deref(),
                Some("postgres://example")
            );
            assert_eq!(create.name, "Ada");
            assert_eq!(create.image.as_deref(), Some("https://img.test/ada.png"));
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_sessions_arguments() {
    let author = "0b6e1c8a-3f0e-4c5e-9d2a-6f1f3b8a9c10";
    let args = CliArgs::parse_from([
        "postdesk",
        "sessions",
        "issue",
        "--author-id",
        author,
        "--ttl-hours",
        "2",
    ]);

    match args.command.expect("sessions command") {
        Command::Sessions(SessionsArgs {
            command: SessionsCommand::Issue(issue),
        }) => {
            assert_eq!(issue.author_id.to_string(), author);
            assert_eq!(issue.ttl_hours, Some(2));
            assert!(issue.database.database_url.is_none());
        }
        _ => panic!("wrong command parsed"),
    }

    let args = CliArgs::parse_from(["postdesk", "sessions", "revoke", "--id", author]);
    match args.command.expect("sessions command") {
        Command::Sessions(SessionsArgs {
            command: SessionsCommand::Revoke(revoke),
        }) => assert_eq!(revoke.id.to_string(), author),
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn malformed_author_id_is_a_parse_error() {
    let result = CliArgs::try_parse_from([
        "postdesk",
        "sessions",
        "issue",
        "--author-id",
        "not-a-uuid",
    ]);
    assert!(result.is_err());
}

#[test]
fn database_override_applies_to_management_commands() {
    let mut raw = RawSettings::default();
    raw.apply_database_override(&DatabaseOverride {
        database_url: Some("postgres://cli".to_string()),
    });

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.database.url.as_deref(), Some("postgres://cli"));
}
