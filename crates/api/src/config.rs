use std::str::FromStr;
use std::time::Duration;

use trainrelay_cloud::retry::RetryPolicy;

/// Error raised while reading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} has an invalid value '{value}'")]
    Invalid { key: &'static str, value: String },

    #[error(
        "REQUEST_TIMEOUT_SECS ({configured}s) is shorter than the upload pipeline can take ({required}s)"
    )]
    TimeoutBudget { configured: u64, required: u64 },
}

/// Log output format, selected with `LOG_FORMAT` (`pretty` or `json`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    pub fn from_env() -> Self {
        Self::parse(std::env::var("LOG_FORMAT").ok().as_deref())
    }

    fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Pretty,
        }
    }
}

/// Object storage settings.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Storage service base URL (`SUPABASE_URL`).
    pub url: String,
    /// Service key used for both `Authorization` and `apikey` (`SUPABASE_KEY`).
    pub service_key: String,
    /// Bucket receiving datasets (default: `datasets`).
    pub bucket: String,
    /// Per-request timeout in seconds (default: `30`).
    pub timeout_secs: u64,
}

/// External trainer settings.
#[derive(Debug, Clone)]
pub struct TrainerConfig {
    /// Webhook that starts training (`TRAINER_WEBHOOK_URL`).
    pub webhook_url: String,
    /// Per-attempt timeout in seconds (default: `10`).
    pub timeout_secs: u64,
    /// Retries after a failed trigger (default: `0`).
    pub max_retries: u32,
    /// URL the trainer calls when done (default: `http://localhost:{PORT}/api/callback`).
    pub callback_url: String,
}

/// Server configuration loaded from environment variables.
///
/// Everything except the storage and trainer endpoints has a default
/// suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `5000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `60`).
    pub request_timeout_secs: u64,
    /// Largest accepted upload body in bytes (default: 50 MiB).
    pub max_upload_bytes: usize,
    pub storage: StorageConfig,
    pub trainer: TrainerConfig,
}

impl TrainerConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::with_max_retries(self.max_retries)
    }
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                                |
    /// |------------------------|----------------------------------------|
    /// | `HOST`                 | `0.0.0.0`                              |
    /// | `PORT`                 | `5000`                                 |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`                |
    /// | `REQUEST_TIMEOUT_SECS` | `60`                                   |
    /// | `MAX_UPLOAD_BYTES`     | `52428800`                             |
    /// | `SUPABASE_URL`         | required                               |
    /// | `SUPABASE_KEY`         | required                               |
    /// | `STORAGE_BUCKET`       | `datasets`                             |
    /// | `STORAGE_TIMEOUT_SECS` | `30`                                   |
    /// | `TRAINER_WEBHOOK_URL`  | required                               |
    /// | `TRAINER_TIMEOUT_SECS` | `10`                                   |
    /// | `TRAINER_MAX_RETRIES`  | `0`                                    |
    /// | `CALLBACK_URL`         | `http://localhost:{PORT}/api/callback` |
    ///
    /// Panics on missing or malformed values so misconfiguration fails at startup.
    /// `REQUEST_TIMEOUT_SECS` must cover [`Self::upload_budget`].
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
            .unwrap_or_else(|e| panic!("Invalid configuration: {e}"))
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = get("HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = parse_or(&get, "PORT", 5000)?;

        let cors_origins: Vec<String> = get("CORS_ORIGINS")
            .unwrap_or_else(|| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let storage = StorageConfig {
            url: required(&get, "SUPABASE_URL")?,
            service_key: required(&get, "SUPABASE_KEY")?,
            bucket: get("STORAGE_BUCKET").unwrap_or_else(|| "datasets".into()),
            timeout_secs: parse_or(&get, "STORAGE_TIMEOUT_SECS", 30)?,
        };

        let trainer = TrainerConfig {
            webhook_url: required(&get, "TRAINER_WEBHOOK_URL")?,
            timeout_secs: parse_or(&get, "TRAINER_TIMEOUT_SECS", 10)?,
            max_retries: parse_or(&get, "TRAINER_MAX_RETRIES", 0)?,
            callback_url: get("CALLBACK_URL")
                .unwrap_or_else(|| format!("http://localhost:{port}/api/callback")),
        };

        let config = Self {
            host,
            port,
            cors_origins,
            request_timeout_secs: parse_or(&get, "REQUEST_TIMEOUT_SECS", 60)?,
            max_upload_bytes: parse_or(&get, "MAX_UPLOAD_BYTES", 50 * 1024 * 1024)?,
            storage,
            trainer,
        };

        let required = config.upload_budget().as_secs();
        if config.request_timeout_secs < required {
            return Err(ConfigError::TimeoutBudget {
                configured: config.request_timeout_secs,
                required,
            });
        }

        Ok(config)
    }

    /// Worst-case duration of the upload pipeline: one storage call plus
    /// every trainer attempt and the backoff between them.
    pub fn upload_budget(&self) -> Duration {
        let attempts = u64::from(self.trainer.max_retries) + 1;
        Duration::from_secs(self.storage.timeout_secs)
            + Duration::from_secs(self.trainer.timeout_secs.saturating_mul(attempts))
            + self.trainer.retry_policy().total_backoff()
    }
}

fn required<F>(get: &F, key: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    get(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing(key))
}

fn parse_or<F, T>(get: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
    }
}
