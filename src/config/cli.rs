use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};

use crate::domain::api_keys::ApiRole;

/// Command-line arguments for the bookapi binary.
#[derive(Debug, Parser)]
#[command(name = "bookapi", version, about = "Authors and books REST API")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "BOOKAPI_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the HTTP API.
    Serve(Box<ServeArgs>),
    /// Load demo authors, books and keys into the configured store.
    Seed(SeedArgs),
    /// Issue a new API key and print its token once.
    #[command(name = "issue-key")]
    IssueKey(IssueKeyArgs),
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

    /// Load demo fixtures before accepting requests.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub seed: bool,
}

#[derive(Debug, Args, Default, Clone)]
pub struct SeedArgs {
    #[command(flatten)]
    pub database: DatabaseOverride,
}

#[derive(Debug, Args, Clone)]
pub struct IssueKeyArgs {
    #[command(flatten)]
    pub database: DatabaseOverride,

    /// Human readable label stored with the key.
    #[arg(long, value_name = "NAME")]
    pub name: String,

    /// Role granted to the key (user|admin).
    #[arg(long, value_name = "ROLE", default_value = "user", value_parser = parse_role)]
    pub role: ApiRole,

    /// Expire the key after this many days.
    #[arg(long = "expires-in-days", value_name = "DAYS")]
    pub expires_in_days: Option<u32>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the absolute base URL used in `Location` headers.
    #[arg(long = "server-public-url", value_name = "URL")]
    pub server_public_url: Option<String>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,

    /// Override the database pool size.
    #[arg(long = "database-max-connections", value_name = "COUNT")]
    pub database_max_connections: Option<u32>,

    /// Enable or disable the listing cache.
    #[arg(
        long = "cache-enabled",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub cache_enabled: Option<bool>,

    /// Override the maximum number of cached listing pages.
    #[arg(long = "cache-capacity", value_name = "COUNT")]
    pub cache_capacity: Option<usize>,

    /// Override the cache expiry hint.
    #[arg(long = "cache-ttl-seconds", value_name = "SECONDS")]
    pub cache_ttl_seconds: Option<u64>,

    /// Override the default API version (1.0|2.0).
    #[arg(long = "api-default-version", value_name = "VERSION")]
    pub api_default_version: Option<String>,
}

fn parse_role(value: &str) -> Result<ApiRole, String> {
    value
        .parse::<ApiRole>()
        .map_err(|_| format!("unknown role `{value}`, expected user or admin"))
}
