//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{
    net::SocketAddr,
    num::{NonZeroU32, NonZeroU64, NonZeroUsize},
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

use clap::{Args, Parser, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::application::{
    listing::DEFAULT_PAGE_SIZE, pagination::MAX_PER_PAGE, revalidation::DEFAULT_REFRESH_TIMEOUT,
};
use crate::cache::CacheConfig;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "javea";
const ENV_PREFIX: &str = "JAVEA";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_STORE_TIMEOUT_SECS: u64 = 10;
const DEFAULT_PROPERTIES_TABLE: &str = "properties";
const DEFAULT_CARDS_VIEW: &str = "property_cards";
const DEFAULT_REFRESH_PROCEDURE: &str = "refresh_property_cards";
const DEFAULT_TRACK_PROCEDURE: &str = "track_property_view";
const DEFAULT_SITE_URL: &str = "http://localhost:3000";
const DEFAULT_SITE_NAME: &str = "Jávea Estates";
const DEFAULT_SITE_DESCRIPTION: &str =
    "Homes, apartments and plots for sale and rent in Jávea and the Costa Blanca.";

/// Command-line arguments for the Jávea listing server.
#[derive(Debug, Parser)]
#[command(name = "javea", version, about = "Jávea Estates listing server")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "JAVEA_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

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

    /// Override the tracing level (e.g. info, debug).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Force JSON logging output.
    #[arg(long = "log-json", value_parser = BoolishValueParser::new(), value_name = "BOOL")]
    pub log_json: Option<bool>,

    /// Base URL of the property store.
    #[arg(long = "store-url", env = "SUPABASE_URL", value_name = "URL")]
    pub store_url: Option<String>,

    /// Public (anon) key for the property store.
    #[arg(
        long = "store-anon-key",
        env = "SUPABASE_ANON_KEY",
        hide_env_values = true,
        value_name = "KEY"
    )]
    pub store_anon_key: Option<String>,

    /// Service-role key used to refresh the card view.
    #[arg(
        long = "store-service-key",
        env = "SUPABASE_SERVICE_ROLE_KEY",
        hide_env_values = true,
        value_name = "KEY"
    )]
    pub store_service_key: Option<String>,

    /// Shared secret expected in the `x-revalidate-secret` header.
    #[arg(
        long = "revalidate-secret",
        env = "REVALIDATE_SECRET",
        hide_env_values = true,
        value_name = "SECRET"
    )]
    pub revalidate_secret: Option<String>,

    /// Upper bound for the card view refresh in seconds.
    #[arg(long = "refresh-timeout-seconds", value_name = "SECONDS")]
    pub refresh_timeout_seconds: Option<u64>,

    /// Enable or disable the response cache.
    #[arg(long = "cache-enabled", value_parser = BoolishValueParser::new(), value_name = "BOOL")]
    pub cache_enabled: Option<bool>,

    /// Public base URL used for canonical and Open Graph links.
    #[arg(long = "site-url", value_name = "URL")]
    pub site_url: Option<String>,
}

/// Fully resolved application settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub store: StoreSettings,
    pub revalidation: RevalidationSettings,
    pub cache: CacheSettings,
    pub site: SiteSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

/// Connection details for the PostgREST property store.
#[derive(Debug, Clone)]
pub struct StoreSettings {
    pub url: Option<String>,
    pub anon_key: Option<String>,
    pub service_key: Option<String>,
    pub timeout_seconds: NonZeroU64,
    pub properties_table: String,
    pub cards_view: String,
    pub refresh_procedure: String,
    pub track_procedure: String,
}

#[derive(Debug, Clone)]
pub struct RevalidationSettings {
    /// `None` rejects every revalidation request.
    pub secret: Option<String>,
    pub refresh_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub enabled: bool,
    pub response_limit: usize,
    pub response_body_limit_bytes: usize,
}

#[derive(Debug, Clone)]
pub struct SiteSettings {
    pub public_url: String,
    pub name: String,
    pub description: String,
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

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_serve_overrides(&cli.overrides);

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    store: RawStoreSettings,
    revalidation: RawRevalidationSettings,
    cache: RawCacheSettings,
    site: RawSiteSettings,
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
        if let Some(url) = overrides.store_url.as_ref() {
            self.store.url = Some(url.clone());
        }
        if let Some(key) = overrides.store_anon_key.as_ref() {
            self.store.anon_key = Some(key.clone());
        }
        if let Some(key) = overrides.store_service_key.as_ref() {
            self.store.service_key = Some(key.clone());
        }
        if let Some(secret) = overrides.revalidate_secret.as_ref() {
            self.revalidation.secret = Some(secret.clone());
        }
        if let Some(seconds) = overrides.refresh_timeout_seconds {
            self.revalidation.refresh_timeout_seconds = Some(seconds);
        }
        if let Some(enabled) = overrides.cache_enabled {
            self.cache.enabled = Some(enabled);
        }
        if let Some(url) = overrides.site_url.as_ref() {
            self.site.public_url = Some(url.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            store,
            revalidation,
            cache,
            site,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            store: build_store_settings(store)?,
            revalidation: build_revalidation_settings(revalidation)?,
            cache: build_cache_settings(cache)?,
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

fn build_store_settings(store: RawStoreSettings) -> Result<StoreSettings, LoadError> {
    let timeout = store.timeout_seconds.unwrap_or(DEFAULT_STORE_TIMEOUT_SECS);
    let timeout_seconds = NonZeroU64::new(timeout)
        .ok_or_else(|| LoadError::invalid("store.timeout_seconds", "must be greater than zero"))?;

    Ok(StoreSettings {
        url: non_blank(store.url),
        anon_key: non_blank(store.anon_key),
        service_key: non_blank(store.service_key),
        timeout_seconds,
        properties_table: relation_name(
            store.properties_table,
            DEFAULT_PROPERTIES_TABLE,
            "store.properties_table",
        )?,
        cards_view: relation_name(store.cards_view, DEFAULT_CARDS_VIEW, "store.cards_view")?,
        refresh_procedure: relation_name(
            store.refresh_procedure,
            DEFAULT_REFRESH_PROCEDURE,
            "store.refresh_procedure",
        )?,
        track_procedure: relation_name(
            store.track_procedure,
            DEFAULT_TRACK_PROCEDURE,
            "store.track_procedure",
        )?,
    })
}

fn build_revalidation_settings(
    revalidation: RawRevalidationSettings,
) -> Result<RevalidationSettings, LoadError> {
    let secret = match revalidation.secret {
        Some(secret) if secret.trim().is_empty() => {
            return Err(LoadError::invalid(
                "revalidation.secret",
                "must not be empty; leave it unset to disable revalidation",
            ));
        }
        other => other,
    };

    let seconds = revalidation
        .refresh_timeout_seconds
        .unwrap_or(DEFAULT_REFRESH_TIMEOUT.as_secs());
    if seconds == 0 {
        return Err(LoadError::invalid(
            "revalidation.refresh_timeout_seconds",
            "must be greater than zero",
        ));
    }

    Ok(RevalidationSettings {
        secret,
        refresh_timeout: Duration::from_secs(seconds),
    })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let defaults = CacheConfig::default();
    let response_limit = non_zero_usize(
        cache.response_limit.unwrap_or(defaults.response_limit),
        "cache.response_limit",
    )?;
    let response_body_limit_bytes = non_zero_usize(
        cache
            .response_body_limit_bytes
            .unwrap_or(defaults.response_body_limit_bytes),
        "cache.response_body_limit_bytes",
    )?;

    Ok(CacheSettings {
        enabled: cache.enabled.unwrap_or(defaults.enabled),
        response_limit: response_limit.get(),
        response_body_limit_bytes: response_body_limit_bytes.get(),
    })
}

fn build_site_settings(site: RawSiteSettings) -> Result<SiteSettings, LoadError> {
    let public_url = non_blank(site.public_url).unwrap_or_else(|| DEFAULT_SITE_URL.to_string());
    if !(public_url.starts_with("http://") || public_url.starts_with("https://")) {
        return Err(LoadError::invalid(
            "site.public_url",
            format!("expected an http(s) URL, got `{public_url}`"),
        ));
    }

    let page_size = site.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
    if page_size > MAX_PER_PAGE {
        return Err(LoadError::invalid(
            "site.page_size",
            format!("must not exceed {MAX_PER_PAGE}"),
        ));
    }
    let page_size = NonZeroU32::new(page_size)
        .ok_or_else(|| LoadError::invalid("site.page_size", "must be greater than zero"))?;

    Ok(SiteSettings {
        public_url,
        name: non_blank(site.name).unwrap_or_else(|| DEFAULT_SITE_NAME.to_string()),
        description: non_blank(site.description)
            .unwrap_or_else(|| DEFAULT_SITE_DESCRIPTION.to_string()),
        page_size,
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
struct RawStoreSettings {
    url: Option<String>,
    anon_key: Option<String>,
    service_key: Option<String>,
    timeout_seconds: Option<u64>,
    properties_table: Option<String>,
    cards_view: Option<String>,
    refresh_procedure: Option<String>,
    track_procedure: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRevalidationSettings {
    secret: Option<String>,
    refresh_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    enabled: Option<bool>,
    response_limit: Option<usize>,
    response_body_limit_bytes: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSiteSettings {
    public_url: Option<String>,
    name: Option<String>,
    description: Option<String>,
    page_size: Option<u32>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn non_zero_usize(value: usize, key: &'static str) -> Result<NonZeroUsize, LoadError> {
    NonZeroUsize::new(value).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

/// Table, view and procedure names are interpolated into request paths.
fn relation_name(
    value: Option<String>,
    default: &str,
    key: &'static str,
) -> Result<String, LoadError> {
    let name = non_blank(value).unwrap_or_else(|| default.to_string());
    if name
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
    {
        Ok(name)
    } else {
        Err(LoadError::invalid(
            key,
            format!("`{name}` is not a plain identifier"),
        ))
    }
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}
