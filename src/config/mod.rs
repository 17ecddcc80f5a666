//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{
    net::SocketAddr,
    num::{NonZeroU32, NonZeroU64, NonZeroUsize},
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

use axum::http::StatusCode;
use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use time::UtcOffset;
use tracing::level_filters::LevelFilter;
use url::Url;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "quillpress";
const ENV_PREFIX: &str = "QUILLPRESS";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 8;
const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 10;
const DEFAULT_STORAGE_DIR: &str = "storage";
const DEFAULT_STORAGE_PUBLIC_BASE_URL: &str = "/storage";
const DEFAULT_MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024;
const DEFAULT_THUMBNAIL_CACHE_CAPACITY: u64 = 512;
const DEFAULT_CONTACT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_SITE_TITLE: &str = "Blog";
const DEFAULT_UTC_OFFSET_MINUTES: i32 = 9 * 60;

pub use quillpress_api_types::THUMBNAIL_BUCKET as DEFAULT_STORAGE_BUCKET;

/// Command-line arguments for the quillpress server binary.
#[derive(Debug, Parser)]
#[command(name = "quillpress", version, about = "quillpress blog server")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "QUILLPRESS_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the HTTP server.
    Serve(Box<ServeArgs>),
    /// Apply pending database migrations and exit.
    Migrate(MigrateArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct DatabaseOverride {
    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct MigrateArgs {
    #[command(flatten)]
    pub database: DatabaseOverride,
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
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

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

    /// Override the session provider base URL.
    #[arg(long = "auth-provider-url", value_name = "URL")]
    pub auth_provider_url: Option<String>,

    /// Override the status returned for missing or rejected tokens (bad_request|unauthorized).
    #[arg(long = "auth-failure-status", value_name = "STATUS")]
    pub auth_failure_status: Option<String>,

    /// Override the object storage directory.
    #[arg(long = "storage-directory", value_name = "PATH")]
    pub storage_directory: Option<PathBuf>,

    /// Override the public base URL for stored objects.
    #[arg(long = "storage-public-base-url", value_name = "URL")]
    pub storage_public_base_url: Option<String>,

    /// Override the maximum upload size in bytes.
    #[arg(long = "storage-max-upload-bytes", value_name = "BYTES")]
    pub storage_max_upload_bytes: Option<u64>,

    /// Override the thumbnail URL cache capacity.
    #[arg(long = "thumbnails-cache-capacity", value_name = "COUNT")]
    pub thumbnails_cache_capacity: Option<u64>,

    /// Override the contact form delivery endpoint.
    #[arg(long = "contact-endpoint", value_name = "URL")]
    pub contact_endpoint: Option<String>,
}

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub database: DatabaseSettings,
    pub auth: AuthSettings,
    pub storage: StorageSettings,
    pub thumbnails: ThumbnailSettings,
    pub contact: ContactSettings,
    pub site: SiteSettings,
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

#[derive(Debug, Clone)]
pub struct AuthSettings {
    /// Provider base URL, always ending in `/`.
    pub provider_url: Option<Url>,
    pub service_key: String,
    pub failure_status: StatusCode,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct StorageSettings {
    pub directory: PathBuf,
    pub bucket: String,
    pub public_base_url: String,
    pub max_upload_bytes: NonZeroU64,
}

#[derive(Debug, Clone)]
pub struct ThumbnailSettings {
    pub cache_capacity: NonZeroUsize,
}

#[derive(Debug, Clone)]
pub struct ContactSettings {
    pub endpoint: Option<Url>,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct SiteSettings {
    pub title: String,
    pub utc_offset: UtcOffset,
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
        Some(Command::Migrate(args)) => raw.apply_database_override(&args.database),
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
    auth: RawAuthSettings,
    storage: RawStorageSettings,
    thumbnails: RawThumbnailSettings,
    contact: RawContactSettings,
    site: RawSiteSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
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
        if let Some(url) = overrides.auth_provider_url.as_ref() {
            self.auth.provider_url = Some(url.clone());
        }
        if let Some(status) = overrides.auth_failure_status.as_ref() {
            self.auth.auth_failure_status = Some(status.clone());
        }
        if let Some(directory) = overrides.storage_directory.as_ref() {
            self.storage.directory = Some(directory.clone());
        }
        if let Some(base) = overrides.storage_public_base_url.as_ref() {
            self.storage.public_base_url = Some(base.clone());
        }
        if let Some(limit) = overrides.storage_max_upload_bytes {
            self.storage.max_upload_bytes = Some(limit);
        }
        if let Some(capacity) = overrides.thumbnails_cache_capacity {
            self.thumbnails.cache_capacity = Some(capacity);
        }
        if let Some(endpoint) = overrides.contact_endpoint.as_ref() {
            self.contact.endpoint = Some(endpoint.clone());
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
            auth,
            storage,
            thumbnails,
            contact,
            site,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            database: build_database_settings(database)?,
            auth: build_auth_settings(auth)?,
            storage: build_storage_settings(storage)?,
            thumbnails: build_thumbnail_settings(thumbnails)?,
            contact: build_contact_settings(contact)?,
            site: build_site_settings(site)?,
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
    let max_value = database
        .max_connections
        .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS);
    let max_connections = non_zero_u32(max_value.into(), "database.max_connections")?;

    Ok(DatabaseSettings {
        url,
        max_connections,
    })
}

fn build_auth_settings(auth: RawAuthSettings) -> Result<AuthSettings, LoadError> {
    let provider_url = match non_blank(auth.provider_url) {
        Some(value) => Some(parse_base_url(&value, "auth.provider_url")?),
        None => None,
    };

    let failure_status = match auth.auth_failure_status.as_deref().map(str::trim) {
        None | Some("") | Some("bad_request") => StatusCode::BAD_REQUEST,
        Some("unauthorized") => StatusCode::UNAUTHORIZED,
        Some(other) => {
            return Err(LoadError::invalid(
                "auth.auth_failure_status",
                format!("expected `bad_request` or `unauthorized`, got `{other}`"),
            ));
        }
    };

    let timeout_secs = auth
        .timeout_seconds
        .unwrap_or(DEFAULT_PROVIDER_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(LoadError::invalid(
            "auth.timeout_seconds",
            "must be greater than zero",
        ));
    }

    Ok(AuthSettings {
        provider_url,
        service_key: auth.service_key.unwrap_or_default(),
        failure_status,
        timeout: Duration::from_secs(timeout_secs),
    })
}

fn build_storage_settings(storage: RawStorageSettings) -> Result<StorageSettings, LoadError> {
    let directory = storage
        .directory
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STORAGE_DIR));
    if directory.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "storage.directory",
            "path must not be empty",
        ));
    }

    let bucket =
        non_blank(storage.bucket).unwrap_or_else(|| DEFAULT_STORAGE_BUCKET.to_string());
    if bucket.contains('/') {
        return Err(LoadError::invalid(
            "storage.bucket",
            "bucket name must not contain `/`",
        ));
    }

    let public_base_url = non_blank(storage.public_base_url)
        .unwrap_or_else(|| DEFAULT_STORAGE_PUBLIC_BASE_URL.to_string())
        .trim_end_matches('/')
        .to_string();

    let max_value = storage
        .max_upload_bytes
        .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);
    let max_upload_bytes = NonZeroU64::new(max_value).ok_or_else(|| {
        LoadError::invalid("storage.max_upload_bytes", "must be greater than zero")
    })?;
    usize::try_from(max_value).map_err(|_| {
        LoadError::invalid(
            "storage.max_upload_bytes",
            "value exceeds supported range for usize",
        )
    })?;

    Ok(StorageSettings {
        directory,
        bucket,
        public_base_url,
        max_upload_bytes,
    })
}

fn build_thumbnail_settings(
    thumbnails: RawThumbnailSettings,
) -> Result<ThumbnailSettings, LoadError> {
    let capacity = thumbnails
        .cache_capacity
        .unwrap_or(DEFAULT_THUMBNAIL_CACHE_CAPACITY);
    let capacity = usize::try_from(capacity).map_err(|_| {
        LoadError::invalid(
            "thumbnails.cache_capacity",
            "value exceeds supported range for usize",
        )
    })?;
    let cache_capacity = NonZeroUsize::new(capacity).ok_or_else(|| {
        LoadError::invalid("thumbnails.cache_capacity", "must be greater than zero")
    })?;

    Ok(ThumbnailSettings { cache_capacity })
}

fn build_contact_settings(contact: RawContactSettings) -> Result<ContactSettings, LoadError> {
    let endpoint = match non_blank(contact.endpoint) {
        Some(value) => Some(
            Url::parse(&value)
                .map_err(|err| LoadError::invalid("contact.endpoint", err.to_string()))?,
        ),
        None => None,
    };

    let timeout_secs = contact
        .timeout_seconds
        .unwrap_or(DEFAULT_CONTACT_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(LoadError::invalid(
            "contact.timeout_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ContactSettings {
        endpoint,
        timeout: Duration::from_secs(timeout_secs),
    })
}

fn build_site_settings(site: RawSiteSettings) -> Result<SiteSettings, LoadError> {
    let title = non_blank(site.title).unwrap_or_else(|| DEFAULT_SITE_TITLE.to_string());

    let minutes = site
        .utc_offset_minutes
        .unwrap_or(DEFAULT_UTC_OFFSET_MINUTES);
    let seconds = minutes
        .checked_mul(60)
        .ok_or_else(|| LoadError::invalid("site.utc_offset_minutes", "offset out of range"))?;
    let utc_offset = UtcOffset::from_whole_seconds(seconds)
        .map_err(|err| LoadError::invalid("site.utc_offset_minutes", err.to_string()))?;

    Ok(SiteSettings { title, utc_offset })
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

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawAuthSettings {
    provider_url: Option<String>,
    service_key: Option<String>,
    auth_failure_status: Option<String>,
    timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawStorageSettings {
    directory: Option<PathBuf>,
    bucket: Option<String>,
    public_base_url: Option<String>,
    max_upload_bytes: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawThumbnailSettings {
    cache_capacity: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawContactSettings {
    endpoint: Option<String>,
    timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSiteSettings {
    title: Option<String>,
    utc_offset_minutes: Option<i32>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

fn parse_base_url(value: &str, key: &'static str) -> Result<Url, LoadError> {
    let mut url = Url::parse(value).map_err(|err| LoadError::invalid(key, err.to_string()))?;
    if url.cannot_be_a_base() {
        return Err(LoadError::invalid(key, "URL cannot be used as a base"));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
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
