use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};
use uuid::Uuid;

/// Command-line arguments for the postdesk binary.
#[derive(Debug, Parser)]
#[command(name = "postdesk", version, about = "Postdesk blog post API")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "POSTDESK_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the HTTP API.
    Serve(Box<ServeArgs>),
    /// Author management.
    #[command(name = "authors")]
    Authors(AuthorsArgs),
    /// Session token management.
    #[command(name = "sessions")]
    Sessions(SessionsArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct DatabaseOverride {
    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "port", value_name = "PORT")]
    pub port: Option<u16>,

    /// Override the graceful shutdown timeout in seconds.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the log level directive.
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Emit logs as JSON.
    #[arg(long = "log-json", value_name = "BOOL", value_parser = BoolishValueParser::new())]
    pub log_json: Option<bool>,

    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,

    /// Override the database pool size.
    #[arg(long = "database-max-connections", value_name = "COUNT")]
    pub database_max_connections: Option<u32>,

    /// Override the image host folder uploads are filed under.
    #[arg(long = "images-folder", value_name = "FOLDER")]
    pub images_folder: Option<String>,

    /// Override the image host request timeout in seconds.
    #[arg(long = "images-timeout-seconds", value_name = "SECONDS")]
    pub images_timeout_seconds: Option<u64>,

    /// Override the maximum upload request size in bytes.
    #[arg(long = "uploads-max-request-bytes", value_name = "BYTES")]
    pub uploads_max_request_bytes: Option<u64>,

    /// Override the session cookie name.
    #[arg(long = "sessions-cookie-name", value_name = "NAME")]
    pub sessions_cookie_name: Option<String>,
}

#[derive(Debug, Args, Clone)]
pub struct AuthorsArgs {
    #[command(subcommand)]
    pub command: AuthorsCommand,
}

#[derive(Debug, Subcommand, Clone)]
pub enum AuthorsCommand {
    /// Register a new author.
    #[command(name = "create")]
    Create(CreateAuthorArgs),
}

#[derive(Debug, Args, Clone)]
pub struct CreateAuthorArgs {
    #[command(flatten)]
    pub database: DatabaseOverride,

    /// Display name.
    #[arg(long, value_name = "NAME")]
    pub name: String,

    /// Avatar URL.
    #[arg(long, value_name = "URL")]
    pub image: Option<String>,
}

#[derive(Debug, Args, Clone)]
pub struct SessionsArgs {
    #[command(subcommand)]
    pub command: SessionsCommand,
}

#[derive(Debug, Subcommand, Clone)]
pub enum SessionsCommand {
    /// Issue a session token for an author and print it once.
    #[command(name = "issue")]
    Issue(IssueSessionArgs),
    /// Revoke a session by id.
    #[command(name = "revoke")]
    Revoke(RevokeSessionArgs),
}

#[derive(Debug, Args, Clone)]
pub struct IssueSessionArgs {
    #[command(flatten)]
    pub database: DatabaseOverride,

    #[arg(long = "author-id", value_name = "UUID")]
    pub author_id: Uuid,

    /// Lifetime in hours; falls back to `sessions.default_ttl_hours`.
    #[arg(long = "ttl-hours", value_name = "HOURS")]
    pub ttl_hours: Option<u32>,
}

#[derive(Debug, Args, Clone)]
pub struct RevokeSessionArgs {
    #[command(flatten)]
    pub database: DatabaseOverride,

    #[arg(long, value_name = "UUID")]
    pub id: Uuid,
}
