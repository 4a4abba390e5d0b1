use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub feed: FeedConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub refresh: RefreshConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    /// History endpoint (without query string)
    pub base_url: String,
    /// Upstream game identifier (e.g., "ktrng_3979")
    pub game_id: String,
    /// Upstream table identifier
    pub table_id: String,
    /// Number of results requested per refresh
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Maximum retry attempts per refresh
    #[serde(default = "default_max_retries")]
    pub max_retries: u8,
    /// Base delay between retries in milliseconds (multiplied by attempt)
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    /// User-Agent values rotated across requests
    #[serde(default = "default_user_agents")]
    pub user_agents: Vec<String>,
}

fn default_page_size() -> usize {
    100
}

fn default_timeout_ms() -> u64 {
    8000
}

fn default_max_retries() -> u8 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    500
}

fn default_user_agents() -> Vec<String> {
    vec![
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36".to_string(),
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_4) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15".to_string(),
        "Mozilla/5.0 (X11; Linux x86_64; rv:125.0) Gecko/20100101 Firefox/125.0".to_string(),
    ]
}

/// Prediction engine tuning
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Minimum history length before the ensemble runs
    #[serde(default = "default_min_history")]
    pub min_history: usize,
    /// Realized transitions inspected per model when scoring accuracy
    #[serde(default = "default_performance_lookback")]
    pub performance_lookback: usize,
    /// Sessions retained per model in the prediction log
    #[serde(default = "default_log_retention")]
    pub log_retention: usize,
}

fn default_min_history() -> usize {
    10
}

fn default_performance_lookback() -> usize {
    10
}

fn default_log_retention() -> usize {
    200
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_history: default_min_history(),
            performance_lookback: default_performance_lookback(),
            log_retention: default_log_retention(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefreshConfig {
    /// Seconds between feed refreshes
    #[serde(default = "default_refresh_interval")]
    pub interval_secs: u64,
}

fn default_refresh_interval() -> u64 {
    5
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_refresh_interval(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// HTTP API port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL; in-memory storage when unset
    #[serde(default)]
    pub url: Option<String>,
    /// Maximum connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable JSON formatted logs
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            // Start with default values
            .set_default("feed.base_url", "https://api.wsktnus8.net/v2/history/getLastResult")?
            .set_default("feed.game_id", "ktrng_3979")?
            .set_default("feed.table_id", "39791215743193")?
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?
            // Load default config file
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Load environment-specific config (e.g., config/production.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("SICBO_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // Override with environment variables (SICBO__FEED__BASE_URL, etc.)
            .add_source(
                Environment::with_prefix("SICBO")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Create a default configuration for CLI usage
    pub fn default_config() -> Self {
        Self {
            feed: FeedConfig {
                base_url: "https://api.wsktnus8.net/v2/history/getLastResult".to_string(),
                game_id: "ktrng_3979".to_string(),
                table_id: "39791215743193".to_string(),
                page_size: default_page_size(),
                timeout_ms: default_timeout_ms(),
                max_retries: default_max_retries(),
                retry_backoff_ms: default_retry_backoff_ms(),
                user_agents: default_user_agents(),
            },
            engine: EngineConfig::default(),
            refresh: RefreshConfig::default(),
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.feed.base_url.trim().is_empty() {
            errors.push("feed.base_url must not be empty".to_string());
        }

        if self.feed.page_size == 0 || self.feed.page_size > 1000 {
            errors.push(format!(
                "feed.page_size must be between 1 and 1000, got {}",
                self.feed.page_size
            ));
        }

        if self.feed.user_agents.is_empty() {
            errors.push("feed.user_agents must contain at least one value".to_string());
        }

        if self.engine.min_history < 2 {
            errors.push("engine.min_history must be at least 2".to_string());
        }

        if self.engine.performance_lookback == 0 {
            errors.push("engine.performance_lookback must be positive".to_string());
        }

        if self.engine.log_retention < self.engine.performance_lookback + 1 {
            errors.push(format!(
                "engine.log_retention ({}) must exceed performance_lookback ({})",
                self.engine.log_retention, self.engine.performance_lookback
            ));
        }

        if self.refresh.interval_secs == 0 {
            errors.push("refresh.interval_secs must be positive".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
