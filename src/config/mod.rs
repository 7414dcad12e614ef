//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{
    net::SocketAddr,
    num::{NonZeroU32, NonZeroU64},
    str::FromStr,
    time::Duration,
};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

mod cli;

pub use cli::{
    AuthorsArgs, AuthorsCommand, CliArgs, Command, CreateAuthorArgs, DatabaseOverride,
    IssueSessionArgs, RevokeSessionArgs, ServeArgs, ServeOverrides, SessionsArgs,
    SessionsCommand,
};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "postdesk";
const ENV_PREFIX: &str = "POSTDESK";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 8;
const DEFAULT_IMAGES_BASE_URL: &str = "https://api.cloudinary.com";
const DEFAULT_IMAGES_FOLDER: &str = "blog-posts";
const DEFAULT_IMAGES_TIMEOUT_SECS: u64 = 30;
const DEFAULT_UPLOAD_REQUEST_LIMIT_BYTES: u64 = 10 * 1024 * 1024;
const DEFAULT_SESSION_TTL_HOURS: u32 = 24 * 14;
const DEFAULT_SESSION_COOKIE: &str = "postdesk_session";

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub database: DatabaseSettings,
    pub images: ImagesSettings,
    pub uploads: UploadSettings,
    pub sessions: SessionSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub max_connections: NonZeroU32,
}

/// Credentials and placement for the external image host.
#[derive(Clone)]
pub struct ImagesSettings {
    pub base_url: Url,
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    pub folder: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for ImagesSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImagesSettings")
            .field("base_url", &self.base_url.as_str())
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .field("folder", &self.folder)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ImagesSettings {
    /// Only `serve` talks to the image host, so credentials are checked there.
    pub fn require_credentials(&self) -> Result<(), LoadError> {
        for (key, value) in [
            ("images.cloud_name", &self.cloud_name),
            ("images.api_key", &self.api_key),
            ("images.api_secret", &self.api_secret),
        ] {
            if value.is_empty() {
                return Err(LoadError::invalid(key, "must be set to serve requests"));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct UploadSettings {
    pub max_request_bytes: NonZeroU64,
}

impl UploadSettings {
    pub fn max_request_bytes_usize(&self) -> usize {
        // Range checked while loading.
        usize::try_from(self.max_request_bytes.get()).unwrap_or(usize::MAX)
    }
}

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub default_ttl_hours: NonZeroU32,
    pub cookie_name: String,
}

impl SessionSettings {
    pub fn default_ttl(&self) -> time::Duration {
        time::Duration::hours(i64::from(self.default_ttl_hours.get()))
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Authors(args)) => match &args.command {
            AuthorsCommand::Create(create) => raw.apply_database_override(&create.database),
        },
        Some(Command::Sessions(args)) => match &args.command {
            SessionsCommand::Issue(issue) => raw.apply_database_override(&issue.database),
            SessionsCommand::Revoke(revoke) => raw.apply_database_override(&revoke.database),
        },
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    database: RawDatabaseSettings,
    images: RawImagesSettings,
    uploads: RawUploadSettings,
    sessions: RawSessionSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.port {
            self.server.port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(url) = overrides.database_url.as_ref() {
            self.database.url = Some(url.clone());
        }
        if let Some(max) = overrides.database_max_connections {
            self.database.max_connections = Some(max);
        }
        if let Some(folder) = overrides.images_folder.as_ref() {
            self.images.folder = Some(folder.clone());
        }
        if let Some(seconds) = overrides.images_timeout_seconds {
            self.images.timeout_seconds = Some(seconds);
        }
        if let Some(limit) = overrides.uploads_max_request_bytes {
            self.uploads.max_request_bytes = Some(limit);
        }
        if let Some(name) = overrides.sessions_cookie_name.as_ref() {
            self.sessions.cookie_name = Some(name.clone());
        }
    }

    fn apply_database_override(&mut self, overrides: &DatabaseOverride) {
        if let Some(url) = overrides.database_url.as_ref() {
            self.database.url = Some(url.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            database,
            images,
            uploads,
            sessions,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            database: build_database_settings(database)?,
            images: build_images_settings(images)?,
            uploads: build_upload_settings(uploads)?,
            sessions: build_session_settings(sessions)?,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ServerSettings {
        addr,
        graceful_shutdown: Duration::from_secs(graceful_secs),
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_database_settings(database: RawDatabaseSettings) -> Result<DatabaseSettings, LoadError> {
    let url = non_blank(database.url);
    let max_connections = non_zero_u32(
        database
            .max_connections
            .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS)
            .into(),
        "database.max_connections",
    )?;

    Ok(DatabaseSettings {
        url,
        max_connections,
    })
}

fn build_images_settings(images: RawImagesSettings) -> Result<ImagesSettings, LoadError> {
    let base_url = match non_blank(images.base_url) {
        Some(value) => Url::parse(&value)
            .map_err(|err| LoadError::invalid("images.base_url", format!("invalid url: {err}")))?,
        None => Url::parse(DEFAULT_IMAGES_BASE_URL)
            .map_err(|err| LoadError::invalid("images.base_url", err.to_string()))?,
    };
    if !matches!(base_url.scheme(), "http" | "https") {
        return Err(LoadError::invalid(
            "images.base_url",
            "scheme must be http or https",
        ));
    }

    let folder = non_blank(images.folder)
        .map(|value| value.trim_matches('/').to_string())
        .unwrap_or_else(|| DEFAULT_IMAGES_FOLDER.to_string());
    if folder.is_empty() || folder.split('/').any(|segment| segment.is_empty() || segment == "..")
    {
        return Err(LoadError::invalid(
            "images.folder",
            "must be a non-empty path without empty or `..` segments",
        ));
    }

    let timeout_secs = images
        .timeout_seconds
        .unwrap_or(DEFAULT_IMAGES_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(LoadError::invalid(
            "images.timeout_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ImagesSettings {
        base_url,
        cloud_name: non_blank(images.cloud_name).unwrap_or_default(),
        api_key: non_blank(images.api_key).unwrap_or_default(),
        api_secret: non_blank(images.api_secret).unwrap_or_default(),
        folder,
        timeout: Duration::from_secs(timeout_secs),
    })
}

fn build_upload_settings(uploads: RawUploadSettings) -> Result<UploadSettings, LoadError> {
    let max_request_bytes_value = uploads
        .max_request_bytes
        .unwrap_or(DEFAULT_UPLOAD_REQUEST_LIMIT_BYTES);
    let max_request_bytes = NonZeroU64::new(max_request_bytes_value).ok_or_else(|| {
        LoadError::invalid("uploads.max_request_bytes", "must be greater than zero")
    })?;
    usize::try_from(max_request_bytes_value).map_err(|_| {
        LoadError::invalid(
            "uploads.max_request_bytes",
            "value exceeds supported range for usize",
        )
    })?;

    Ok(UploadSettings { max_request_bytes })
}

fn build_session_settings(sessions: RawSessionSettings) -> Result<SessionSettings, LoadError> {
    let default_ttl_hours = non_zero_u32(
        sessions
            .default_ttl_hours
            .unwrap_or(DEFAULT_SESSION_TTL_HOURS.into()),
        "sessions.default_ttl_hours",
    )?;

    let cookie_name = non_blank(sessions.cookie_name)
        .unwrap_or_else(|| DEFAULT_SESSION_COOKIE.to_string());
    if !cookie_name
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-')
    {
        return Err(LoadError::invalid(
            "sessions.cookie_name",
            "only ASCII letters, digits, `_` and `-` are allowed",
        ));
    }

    Ok(SessionSettings {
        default_ttl_hours,
        cookie_name,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDatabaseSettings {
    url: Option<String>,
    max_connections: Option<u32>,
}

#[derive(Clone, Deserialize, Default)]
#[serde(default)]
struct RawImagesSettings {
    base_url: Option<String>,
    cloud_name: Option<String>,
    api_key: Option<String>,
    api_secret: Option<String>,
    folder: Option<String>,
    timeout_seconds: Option<u64>,
}

impl std::fmt::Debug for RawImagesSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawImagesSettings")
            .field("base_url", &self.base_url)
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .field("api_secret", &self.api_secret.as_ref().map(|_| "<redacted>"))
            .field("folder", &self.folder)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawUploadSettings {
    max_request_bytes: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSessionSettings {
    default_ttl_hours: Option<u64>,
    cookie_name: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    let value_u32: u32 = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;
    NonZeroU32::new(value_u32).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

#[cfg(test)]
mod tests;
