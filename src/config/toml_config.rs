use crate::core::retry::{RetryPolicy, DEFAULT_MAX_RETRIES};
use crate::core::ConfigProvider;
use crate::utils::error::{GatewayError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_GATEWAY_BIND: &str = "127.0.0.1:8082";
pub const DEFAULT_MOVIES_INFO_BIND: &str = "127.0.0.1:8080";
pub const DEFAULT_REVIEWS_BIND: &str = "127.0.0.1:8081";
pub const DEFAULT_MOVIES_INFO_URL: &str = "http://localhost:8080/v1/moviesinfo";
pub const DEFAULT_REVIEWS_URL: &str = "http://localhost:8081/v1/reviews";
pub const DEFAULT_RETRY_DELAY_MILLIS: u64 = 1000;
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 10;

const MAX_RETRY_ATTEMPTS: u32 = 10;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub gateway: ServerConfig,
    #[serde(default)]
    pub movies_info: ServerConfig,
    #[serde(default)]
    pub reviews: ServerConfig,
    #[serde(default)]
    pub upstreams: UpstreamsConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpstreamsConfig {
    pub movies_info_url: Option<String>,
    pub reviews_url: Option<String>,
    /// `0` disables the per-request timeout.
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetryConfig {
    pub attempts: Option<u32>,
    pub delay_millis: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: Option<String>,
    pub json: Option<bool>,
}

/// Which of the three services this process runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Gateway,
    MoviesInfo,
    Reviews,
}

impl GatewayConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(GatewayError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| GatewayError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${MOVIES_INFO_URL})
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| GatewayError::config(e.to_string()))?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn bind_for(&self, role: Role) -> &str {
        let (server, default) = match role {
            Role::Gateway => (&self.gateway, DEFAULT_GATEWAY_BIND),
            Role::MoviesInfo => (&self.movies_info, DEFAULT_MOVIES_INFO_BIND),
            Role::Reviews => (&self.reviews, DEFAULT_REVIEWS_BIND),
        };
        server.bind.as_deref().unwrap_or(default)
    }

    pub fn bind_addr(&self, role: Role) -> Result<SocketAddr> {
        validation::validate_socket_addr("bind", self.bind_for(role))
    }

    pub fn retry_attempts(&self) -> u32 {
        self.retry.attempts.unwrap_or(DEFAULT_MAX_RETRIES)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry.delay_millis.unwrap_or(DEFAULT_RETRY_DELAY_MILLIS))
    }

    pub fn log_level(&self) -> Option<&str> {
        self.logging.level.as_deref()
    }

    pub fn json_logs(&self) -> bool {
        self.logging.json.unwrap_or(false)
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_url("upstreams.movies_info_url", self.movies_info_url())?;
        validation::validate_url("upstreams.reviews_url", self.reviews_url())?;

        validation::validate_socket_addr("gateway.bind", self.bind_for(Role::Gateway))?;
        validation::validate_socket_addr("movies_info.bind", self.bind_for(Role::MoviesInfo))?;
        validation::validate_socket_addr("reviews.bind", self.bind_for(Role::Reviews))?;

        validation::validate_range("retry.attempts", self.retry_attempts(), 0, MAX_RETRY_ATTEMPTS)?;

        if let Some(level) = self.log_level() {
            let valid_levels = ["trace", "debug", "info", "warn", "error"];
            if !valid_levels.contains(&level) {
                return Err(GatewayError::InvalidConfigValueError {
                    field: "logging.level".to_string(),
                    value: level.to_string(),
                    reason: format!("Valid levels: {}", valid_levels.join(", ")),
                });
            }
        }

        Ok(())
    }
}

impl ConfigProvider for GatewayConfig {
    fn movies_info_url(&self) -> &str {
        self.upstreams
            .movies_info_url
            .as_deref()
            .unwrap_or(DEFAULT_MOVIES_INFO_URL)
    }

    fn reviews_url(&self) -> &str {
        self.upstreams
            .reviews_url
            .as_deref()
            .unwrap_or(DEFAULT_REVIEWS_URL)
    }

    fn request_timeout(&self) -> Option<Duration> {
        match self.upstreams.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS) {
            0 => None,
            seconds => Some(Duration::from_secs(seconds)),
        }
    }

    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry_attempts(), self.retry_delay())
    }
}

impl Validate for GatewayConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
