//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{
    num::{NonZeroU32, NonZeroUsize},
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

use clap::{ArgGroup, Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::cache::CacheBackend;
use crate::domain::patch::STATE_UNCHANGED;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "pressroom";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 8;
const DEFAULT_DB_ACQUIRE_TIMEOUT_SECS: u64 = 5;
const DEFAULT_CACHE_TTL_SECS: u64 = 3600;
const MAX_CACHE_TTL_SECS: u64 = 365 * 24 * 60 * 60;
const DEFAULT_CACHE_KEY_PREFIX: &str = "pressroom";
const DEFAULT_CACHE_MEMORY_CAPACITY: usize = 1024;
const DEFAULT_CACHE_REDIS_TIMEOUT_MS: u64 = 250;
const DEFAULT_PAGE_SIZE: u32 = 10;
const PUBLISHED_STATE: i16 = 1;

/// Command-line arguments for the Pressroom binary.
#[derive(Debug, Parser)]
#[command(
    name = "pressroom",
    version,
    about = "Cache-aside article and tag store"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "PRESSROOM_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: Overrides,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args, Default, Clone)]
pub struct Overrides {
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

    /// Override the cache backend (memory|redis|disabled).
    #[arg(long = "cache-backend", value_name = "BACKEND")]
    pub cache_backend: Option<String>,

    /// Override the cache entry lifetime.
    #[arg(long = "cache-ttl-seconds", value_name = "SECONDS")]
    pub cache_ttl_seconds: Option<u64>,

    /// Override the Redis connection URL.
    #[arg(long = "redis-url", value_name = "URL")]
    pub redis_url: Option<String>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Article operations.
    #[command(subcommand)]
    Articles(ArticlesCommand),
    /// Tag operations.
    #[command(subcommand)]
    Tags(TagsCommand),
    /// Apply pending database migrations.
    Migrate,
}

#[derive(Debug, Subcommand, Clone)]
pub enum ArticlesCommand {
    /// List articles with their total count.
    List(ArticleListArgs),
    /// Fetch one article.
    Get(IdArg),
    /// Create an article under an existing tag.
    Add(ArticleAddArgs),
    /// Change the supplied fields of an article.
    Edit(ArticleEditArgs),
    /// Delete an article.
    Delete(IdArg),
    /// Report whether an article exists.
    Exists(IdArg),
    /// Count articles matching the filters.
    Count(ArticleFilterArgs),
}

#[derive(Debug, Subcommand, Clone)]
pub enum TagsCommand {
    /// List tags with their total count.
    List(TagListArgs),
    /// Fetch one tag.
    Get(IdArg),
    /// Create a tag.
    Add(TagAddArgs),
    /// Change the supplied fields of a tag.
    Edit(TagEditArgs),
    /// Delete a tag.
    Delete(IdArg),
    /// Report whether a tag exists, by id or by name.
    Exists(TagExistsArgs),
    /// Count tags matching the filters.
    Count(TagFilterArgs),
    /// Export tags to a TOML archive.
    Export(TagExportArgs),
    /// Import tags from a TOML archive, skipping names that already exist.
    Import(TagImportArgs),
}

#[derive(Debug, Args, Clone)]
pub struct IdArg {
    #[arg(value_name = "ID")]
    pub id: i64,
}

#[derive(Debug, Args, Default, Clone)]
pub struct PageArgs {
    /// 1-based page number.
    #[arg(long = "page", value_name = "NUM", default_value_t = 1)]
    pub page_num: u32,

    /// Rows per page; defaults to `app.page_size`. Zero lists every row.
    #[arg(long = "page-size", value_name = "COUNT")]
    pub page_size: Option<u32>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ArticleFilterArgs {
    #[arg(long = "tag-id", value_name = "ID")]
    pub tag_id: Option<i64>,

    /// 0 = hidden, 1 = published.
    #[arg(long, value_name = "STATE")]
    pub state: Option<i16>,
}

#[derive(Debug, Args, Clone)]
pub struct ArticleListArgs {
    #[command(flatten)]
    pub filter: ArticleFilterArgs,

    #[command(flatten)]
    pub page: PageArgs,
}

#[derive(Debug, Args, Clone)]
pub struct ArticleAddArgs {
    #[arg(long = "tag-id", value_name = "ID")]
    pub tag_id: i64,

    #[arg(long)]
    pub title: String,

    #[arg(long, default_value = "")]
    pub description: String,

    #[arg(long)]
    pub content: String,

    #[arg(long = "cover-image-url", value_name = "URL")]
    pub cover_image_url: String,

    #[arg(long, default_value_t = PUBLISHED_STATE)]
    pub state: i16,

    #[arg(long = "created-by", value_name = "ACTOR")]
    pub created_by: String,
}

/// Omitted fields keep their stored value: text defaults to `""`, ids to `0`,
/// and state to `-1`, all of which mean "unchanged".
#[derive(Debug, Args, Clone)]
pub struct ArticleEditArgs {
    #[arg(value_name = "ID")]
    pub id: i64,

    #[arg(long = "tag-id", value_name = "ID", default_value_t = 0)]
    pub tag_id: i64,

    #[arg(long, default_value = "")]
    pub title: String,

    #[arg(long, default_value = "")]
    pub description: String,

    #[arg(long, default_value = "")]
    pub content: String,

    #[arg(long = "cover-image-url", value_name = "URL", default_value = "")]
    pub cover_image_url: String,

    #[arg(long, default_value_t = STATE_UNCHANGED, allow_negative_numbers = true)]
    pub state: i16,

    #[arg(long = "modified-by", value_name = "ACTOR")]
    pub modified_by: String,
}

#[derive(Debug, Args, Default, Clone)]
pub struct TagFilterArgs {
    /// Exact tag name.
    #[arg(long)]
    pub name: Option<String>,

    /// 0 = hidden, 1 = published.
    #[arg(long, value_name = "STATE")]
    pub state: Option<i16>,
}

#[derive(Debug, Args, Clone)]
pub struct TagListArgs {
    #[command(flatten)]
    pub filter: TagFilterArgs,

    #[command(flatten)]
    pub page: PageArgs,
}

#[derive(Debug, Args, Clone)]
pub struct TagAddArgs {
    #[arg(long)]
    pub name: String,

    #[arg(long, default_value_t = PUBLISHED_STATE)]
    pub state: i16,

    #[arg(long = "created-by", value_name = "ACTOR")]
    pub created_by: String,
}

#[derive(Debug, Args, Clone)]
pub struct TagEditArgs {
    #[arg(value_name = "ID")]
    pub id: i64,

    #[arg(long, default_value = "")]
    pub name: String,

    #[arg(long, default_value_t = STATE_UNCHANGED, allow_negative_numbers = true)]
    pub state: i16,

    #[arg(long = "modified-by", value_name = "ACTOR")]
    pub modified_by: String,
}

#[derive(Debug, Args, Clone)]
#[command(group(ArgGroup::new("selector").required(true).args(["id", "name"])))]
pub struct TagExistsArgs {
    #[arg(long)]
    pub id: Option<i64>,

    #[arg(long)]
    pub name: Option<String>,
}

#[derive(Debug, Args, Clone)]
pub struct TagExportArgs {
    /// Path to the archive to write.
    #[arg(value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub file: PathBuf,

    #[command(flatten)]
    pub filter: TagFilterArgs,
}

#[derive(Debug, Args, Clone)]
pub struct TagImportArgs {
    /// Path to the archive to read.
    #[arg(value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub file: PathBuf,

    /// Author recorded for entries that do not name one.
    #[arg(long, value_name = "ACTOR", default_value = "import")]
    pub actor: String,
}

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub database: DatabaseSettings,
    pub cache: CacheSettings,
    pub app: AppSettings,
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
    /// Repository timeout: how long a query waits for a pooled connection.
    pub acquire_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub backend: CacheBackend,
    pub ttl: Duration,
    pub key_prefix: String,
    pub memory_capacity: usize,
    pub redis_url: Option<String>,
    pub redis_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct AppSettings {
    /// Page size used when a list command does not pass one.
    pub page_size: NonZeroU32,
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

    builder = builder.add_source(Environment::with_prefix("PRESSROOM").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_overrides(&cli.overrides)?;

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    database: RawDatabaseSettings,
    cache: RawCacheSettings,
    app: RawAppSettings,
}

impl RawSettings {
    fn apply_overrides(&mut self, overrides: &Overrides) -> Result<(), LoadError> {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(url) = overrides.database_url.as_ref() {
            self.database.url = Some(url.clone());
        }
        if let Some(backend) = overrides.cache_backend.as_deref() {
            self.cache.backend = Some(parse_backend(backend)?);
        }
        if let Some(ttl) = overrides.cache_ttl_seconds {
            self.cache.ttl_seconds = Some(ttl);
        }
        if let Some(url) = overrides.redis_url.as_ref() {
            self.cache.redis_url = Some(url.clone());
        }
        Ok(())
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            logging,
            database,
            cache,
            app,
        } = raw;

        Ok(Self {
            logging: build_logging_settings(logging)?,
            database: build_database_settings(database)?,
            cache: build_cache_settings(cache)?,
            app: build_app_settings(app)?,
        })
    }
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

    let acquire_secs = database
        .acquire_timeout_seconds
        .unwrap_or(DEFAULT_DB_ACQUIRE_TIMEOUT_SECS);
    if acquire_secs == 0 {
        return Err(LoadError::invalid(
            "database.acquire_timeout_seconds",
            "must be greater than zero",
        ));
    }

    Ok(DatabaseSettings {
        url,
        max_connections,
        acquire_timeout: Duration::from_secs(acquire_secs),
    })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let backend = cache.backend.unwrap_or(CacheBackend::Memory);

    let ttl_seconds = cache.ttl_seconds.unwrap_or(DEFAULT_CACHE_TTL_SECS);
    if ttl_seconds == 0 {
        return Err(LoadError::invalid(
            "cache.ttl_seconds",
            "must be greater than zero",
        ));
    }
    if ttl_seconds > MAX_CACHE_TTL_SECS {
        return Err(LoadError::invalid(
            "cache.ttl_seconds",
            "must not exceed one year",
        ));
    }

    let key_prefix = cache
        .key_prefix
        .unwrap_or_else(|| DEFAULT_CACHE_KEY_PREFIX.to_string());
    if key_prefix.trim().is_empty() {
        return Err(LoadError::invalid("cache.key_prefix", "must not be empty"));
    }
    if key_prefix.contains(':') {
        return Err(LoadError::invalid(
            "cache.key_prefix",
            "must not contain `:`",
        ));
    }

    let memory_capacity = cache
        .memory_capacity
        .unwrap_or(DEFAULT_CACHE_MEMORY_CAPACITY);
    NonZeroUsize::new(memory_capacity)
        .ok_or_else(|| LoadError::invalid("cache.memory_capacity", "must be greater than zero"))?;

    let redis_url = non_blank(cache.redis_url);
    if backend == CacheBackend::Redis && redis_url.is_none() {
        return Err(LoadError::invalid(
            "cache.redis_url",
            "required when cache.backend is `redis`",
        ));
    }

    let redis_timeout_ms = cache
        .redis_timeout_ms
        .unwrap_or(DEFAULT_CACHE_REDIS_TIMEOUT_MS);
    if redis_timeout_ms == 0 {
        return Err(LoadError::invalid(
            "cache.redis_timeout_ms",
            "must be greater than zero",
        ));
    }

    Ok(CacheSettings {
        backend,
        ttl: Duration::from_secs(ttl_seconds),
        key_prefix,
        memory_capacity,
        redis_url,
        redis_timeout: Duration::from_millis(redis_timeout_ms),
    })
}

fn build_app_settings(app: RawAppSettings) -> Result<AppSettings, LoadError> {
    let page_size = app.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
    Ok(AppSettings {
        page_size: non_zero_u32(page_size.into(), "app.page_size")?,
    })
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
    acquire_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    backend: Option<CacheBackend>,
    ttl_seconds: Option<u64>,
    key_prefix: Option<String>,
    memory_capacity: Option<usize>,
    redis_url: Option<String>,
    redis_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawAppSettings {
    page_size: Option<u32>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

fn parse_backend(value: &str) -> Result<CacheBackend, LoadError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "memory" => Ok(CacheBackend::Memory),
        "redis" => Ok(CacheBackend::Redis),
        "disabled" | "none" => Ok(CacheBackend::Disabled),
        other => Err(LoadError::invalid(
            "cache.backend",
            format!("unknown backend `{other}`"),
        )),
    }
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

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}
