use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Deployment {
    Local,
    Dev,
    Stage,
    Prod,
}

impl Deployment {
    #[must_use]
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "dev" | "development" => Self::Dev,
            "stage" | "staging" => Self::Stage,
            "prod" | "production" => Self::Prod,
            _ => Self::Local,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    // Sensor data service
    pub api_base_url: String,
    pub http_timeout_seconds: u64,

    // Data sync
    pub page_size: usize,
    pub poll_interval_ms: u64,
    pub min_refresh_interval_ms: u64,
    pub predictions_interval_ms: u64,

    // Local cache
    pub cache_key: String,
    pub cache_ttl_ms: u64,
    /// `None` keeps the cache in memory only.
    pub cache_dir: Option<PathBuf>,
    pub cache_max_bytes: u64,

    // Dashboard server
    pub dashboard_host: String,
    pub dashboard_port: u16,
    pub upload_max_bytes: usize,

    // Application metadata
    pub deployment: Deployment,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000".to_string(),
            http_timeout_seconds: 30,
            page_size: 1000,
            poll_interval_ms: 60_000,
            min_refresh_interval_ms: 60_000,
            predictions_interval_ms: 3_600_000,
            cache_key: "sensor_data_cache".to_string(),
            cache_ttl_ms: 60_000,
            cache_dir: Some(PathBuf::from(".cache/sensor-dashboard")),
            cache_max_bytes: 5 * 1024 * 1024,
            dashboard_host: "0.0.0.0".to_string(),
            dashboard_port: 3000,
            upload_max_bytes: 50 * 1024 * 1024,
            deployment: Deployment::Local,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Every setting has a default; see [`Config::default`].
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if a value is out of range (e.g. `PAGE_SIZE=0`).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        let config = Self {
            // Sensor data service
            api_base_url: env::var("API_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_base_url),
            http_timeout_seconds: parse_var("HTTP_TIMEOUT_SECONDS", defaults.http_timeout_seconds),

            // Data sync
            page_size: parse_var("PAGE_SIZE", defaults.page_size),
            poll_interval_ms: parse_var("POLL_INTERVAL_MS", defaults.poll_interval_ms),
            min_refresh_interval_ms: parse_var(
                "MIN_REFRESH_INTERVAL_MS",
                defaults.min_refresh_interval_ms,
            ),
            predictions_interval_ms: parse_var(
                "PREDICTIONS_INTERVAL_MS",
                defaults.predictions_interval_ms,
            ),

            // Local cache
            cache_key: env::var("CACHE_KEY").unwrap_or(defaults.cache_key),
            cache_ttl_ms: parse_var("CACHE_TTL_MS", defaults.cache_ttl_ms),
            cache_dir: match env::var("CACHE_DIR") {
                Ok(dir) if dir.trim().is_empty() => None,
                Ok(dir) => Some(PathBuf::from(dir)),
                Err(_) => defaults.cache_dir,
            },
            cache_max_bytes: parse_var("CACHE_MAX_BYTES", defaults.cache_max_bytes),

            // Dashboard server
            dashboard_host: env::var("DASHBOARD_HOST").unwrap_or(defaults.dashboard_host),
            dashboard_port: parse_var("DASHBOARD_PORT", defaults.dashboard_port),
            upload_max_bytes: parse_var("UPLOAD_MAX_BYTES", defaults.upload_max_bytes),

            // Application metadata
            deployment: Deployment::from_str(
                &env::var("DEPLOYMENT").unwrap_or_else(|_| "local".to_string()),
            ),
        };

        if config.page_size == 0 {
            return Err(ConfigError::Invalid("PAGE_SIZE", "must be at least 1"));
        }
        if config.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid("POLL_INTERVAL_MS", "must be at least 1"));
        }

        Ok(config)
    }

    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.dashboard_host, self.dashboard_port)
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    #[must_use]
    pub fn predictions_interval(&self) -> Duration {
        Duration::from_millis(self.predictions_interval_ms)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, &'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deployment_parses_aliases() {
        assert_eq!(Deployment::from_str("Production"), Deployment::Prod);
        assert_eq!(Deployment::from_str("staging"), Deployment::Stage);
        assert_eq!(Deployment::from_str("dev"), Deployment::Dev);
        assert_eq!(Deployment::from_str("anything"), Deployment::Local);
    }

    #[test]
    fn defaults_match_dashboard_constants() {
        let config = Config::default();
        assert_eq!(config.page_size, 1000);
        assert_eq!(config.poll_interval(), Duration::from_secs(60));
        assert_eq!(config.cache_ttl_ms, 60_000);
        assert_eq!(config.predictions_interval(), Duration::from_secs(3600));
        assert_eq!(config.bind_address(), "0.0.0.0:3000");
    }
}
