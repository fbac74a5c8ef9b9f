// ABOUTME: Environment configuration management for deployment-specific settings
// ABOUTME: Parses environment variables into typed server, LLM, image, messaging and schedule settings
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! Environment-based configuration management for production deployment

use crate::constants::{limits, network, notifications};
use crate::errors::{AppError, AppResult, ErrorCode};
use chrono::{FixedOffset, NaiveTime, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{info, warn};

/// Environment type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Local development
    #[default]
    Development,
    /// Production deployment
    Production,
    /// Automated tests
    Testing,
}

impl Environment {
    /// Parse from string with fallback
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "testing" | "test" => Self::Testing,
            _ => Self::Development,
        }
    }

    /// Check if this is a production environment
    #[must_use]
    pub const fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
            Self::Testing => write!(f, "testing"),
        }
    }
}

/// Type-safe database configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatabaseUrl {
    /// `SQLite` database with file path
    SQLite {
        /// Database file path
        path: PathBuf,
    },
    /// In-memory `SQLite` (for testing)
    Memory,
}

impl DatabaseUrl {
    /// Parse from string; anything without a `sqlite:` prefix is treated as a file path
    #[must_use]
    pub fn parse_url(s: &str) -> Self {
        let path_str = s.strip_prefix("sqlite:").unwrap_or(s);
        if path_str == ":memory:" {
            Self::Memory
        } else {
            Self::SQLite {
                path: PathBuf::from(path_str.trim_start_matches("//")),
            }
        }
    }

    /// Convert to connection string
    #[must_use]
    pub fn to_connection_string(&self) -> String {
        match self {
            Self::SQLite { path } => format!("sqlite:{}", path.display()),
            Self::Memory => "sqlite::memory:".to_owned(),
        }
    }

    /// Check if this is an in-memory database
    #[must_use]
    pub const fn is_memory(&self) -> bool {
        matches!(self, Self::Memory)
    }
}

impl Default for DatabaseUrl {
    fn default() -> Self {
        Self::parse_url(network::DEFAULT_DATABASE_URL)
    }
}

impl fmt::Display for DatabaseUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_connection_string())
    }
}

/// Hosted language-model backends
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProviderType {
    /// Google Gemini (function calling and JSON mode)
    #[default]
    Gemini,
    /// Groq `OpenAI`-compatible endpoint
    Groq,
}

impl LlmProviderType {
    /// Environment variable for pipeline agent provider selection
    pub const ENV_VAR: &'static str = "NOURISH_LLM_PROVIDER";
    /// Environment variable for message-writer provider selection
    pub const MESSAGE_ENV_VAR: &'static str = "NOURISH_MESSAGE_LLM_PROVIDER";

    /// Parse from string with fallback to Gemini
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "groq" => Self::Groq,
            _ => Self::Gemini,
        }
    }

    /// Environment variable holding this provider's API key
    #[must_use]
    pub const fn api_key_env_var(&self) -> &'static str {
        match self {
            Self::Gemini => "GEMINI_API_KEY",
            Self::Groq => "GROQ_API_KEY",
        }
    }
}

impl fmt::Display for LlmProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gemini => write!(f, "gemini"),
            Self::Groq => write!(f, "groq"),
        }
    }
}

/// Agent invocation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider for the pipeline agents
    pub provider: LlmProviderType,
    /// Provider for the message writer
    pub message_provider: LlmProviderType,
    /// Model override for the pipeline agents
    pub model: Option<String>,
    /// Model override for the message writer
    pub message_model: Option<String>,
    /// Per-invocation timeout
    pub agent_timeout_secs: u64,
    /// Retries for retryable failures
    pub max_retries: u32,
    /// Initial backoff, doubled on each retry
    pub retry_backoff_ms: u64,
    /// Request structured JSON output where the provider supports it
    pub structured_output: bool,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProviderType::Gemini,
            message_provider: LlmProviderType::Groq,
            model: None,
            message_model: None,
            agent_timeout_secs: limits::DEFAULT_AGENT_TIMEOUT_SECS,
            max_retries: 0,
            retry_backoff_ms: limits::DEFAULT_RETRY_BACKOFF_MS,
            structured_output: true,
        }
    }
}

/// Dish image generation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageConfig {
    /// Image generation model
    pub model: String,
    /// Base URL used when publishing image links
    pub public_base_url: String,
    /// Whether the images stage runs
    pub enabled: bool,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.0-flash-preview-image-generation".to_owned(),
            public_base_url: format!("http://localhost:{}", network::DEFAULT_HTTP_PORT),
            enabled: true,
        }
    }
}

/// Twilio `WhatsApp` credentials
#[derive(Clone, Serialize, Deserialize)]
pub struct TwilioConfig {
    /// Account SID
    pub account_sid: String,
    /// Auth token
    pub auth_token: String,
    /// Sender number (E.164, without the `whatsapp:` prefix)
    pub from_number: String,
}

impl fmt::Debug for TwilioConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TwilioConfig")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"[REDACTED]")
            .field("from_number", &self.from_number)
            .finish()
    }
}

/// Outbound messaging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagingConfig {
    /// Twilio credentials; `None` selects the log-only sender
    pub twilio: Option<TwilioConfig>,
    /// Country code prefixed to numbers without one
    pub default_country_code: String,
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            twilio: None,
            default_country_code: notifications::DEFAULT_COUNTRY_CODE.to_owned(),
        }
    }
}

/// Daily reminder schedule settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Local reminder times; time `i` dispatches meal slot `i`
    pub times: Vec<NaiveTime>,
    /// Offset of local time from UTC
    pub utc_offset_minutes: i32,
    /// Whether the server runs the scheduler
    pub enabled: bool,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            times: parse_notify_times(notifications::DEFAULT_NOTIFY_TIMES).unwrap_or_default(),
            utc_offset_minutes: notifications::DEFAULT_UTC_OFFSET_MINUTES,
            enabled: true,
        }
    }
}

impl ScheduleConfig {
    /// Offset of the reminder calendar, UTC when out of range
    #[must_use]
    pub fn fixed_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).unwrap_or_else(|| Utc.fix())
    }
}

/// Batch pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Users processed concurrently in a batch run (1 = sequential)
    pub concurrency: usize,
    /// Days requested from the meal planner
    pub plan_days: u8,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrency: 1,
            plan_days: limits::DEFAULT_PLAN_DAYS,
        }
    }
}

/// Complete server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP API port
    pub http_port: u16,
    /// Bind address
    pub host: String,
    /// Deployment environment
    pub environment: Environment,
    /// Log level directive
    pub log_level: String,
    /// Comma-separated CORS origins, `*` for any
    pub cors_allowed_origins: String,
    /// Database location
    pub database: DatabaseUrl,
    /// Agent settings
    pub llm: LlmConfig,
    /// Image settings
    pub images: ImageConfig,
    /// Messaging settings
    pub messaging: MessagingConfig,
    /// Reminder schedule
    pub schedule: ScheduleConfig,
    /// Batch pipeline settings
    pub pipeline: PipelineConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: network::DEFAULT_HTTP_PORT,
            host: network::DEFAULT_HOST.to_owned(),
            environment: Environment::Development,
            log_level: "info".to_owned(),
            cors_allowed_origins: "*".to_owned(),
            database: DatabaseUrl::default(),
            llm: LlmConfig::default(),
            images: ImageConfig::default(),
            messaging: MessagingConfig::default(),
            schedule: ScheduleConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns `ConfigInvalid` when a variable is present but cannot be parsed
    pub fn from_env() -> AppResult<Self> {
        info!("Loading configuration from environment variables");

        let http_port: u16 = parse_env("HTTP_PORT", network::DEFAULT_HTTP_PORT)?;

        let twilio = match (
            non_empty_var("TWILIO_ACCOUNT_SID"),
            non_empty_var("TWILIO_AUTH_TOKEN"),
            non_empty_var("TWILIO_WHATSAPP_FROM"),
        ) {
            (Some(account_sid), Some(auth_token), Some(from_number)) => Some(TwilioConfig {
                account_sid,
                auth_token,
                from_number: from_number
                    .strip_prefix("whatsapp:")
                    .unwrap_or(&from_number)
                    .to_owned(),
            }),
            _ => None,
        };

        let config = Self {
            http_port,
            host: env_var_or("HOST", network::DEFAULT_HOST),
            environment: Environment::from_str_or_default(&env_var_or("ENVIRONMENT", "development")),
            log_level: env_var_or("RUST_LOG", "info"),
            cors_allowed_origins: env_var_or("CORS_ALLOWED_ORIGINS", "*"),
            database: DatabaseUrl::parse_url(&env_var_or(
                "DATABASE_URL",
                network::DEFAULT_DATABASE_URL,
            )),
            llm: LlmConfig {
                provider: LlmProviderType::from_str_or_default(&env_var_or(
                    LlmProviderType::ENV_VAR,
                    "gemini",
                )),
                message_provider: LlmProviderType::from_str_or_default(&env_var_or(
                    LlmProviderType::MESSAGE_ENV_VAR,
                    "groq",
                )),
                model: non_empty_var("NOURISH_LLM_MODEL"),
                message_model: non_empty_var("NOURISH_MESSAGE_LLM_MODEL"),
                agent_timeout_secs: parse_env(
                    "NOURISH_AGENT_TIMEOUT_SECS",
                    limits::DEFAULT_AGENT_TIMEOUT_SECS,
                )?,
                max_retries: parse_env("NOURISH_AGENT_MAX_RETRIES", 0)?,
                retry_backoff_ms: parse_env(
                    "NOURISH_AGENT_RETRY_BACKOFF_MS",
                    limits::DEFAULT_RETRY_BACKOFF_MS,
                )?,
                structured_output: parse_bool_env("NOURISH_STRUCTURED_OUTPUT", true)?,
            },
            images: ImageConfig {
                model: env_var_or(
                    "NOURISH_IMAGE_MODEL",
                    "gemini-2.0-flash-preview-image-generation",
                ),
                public_base_url: env_var_or(
                    "NOURISH_PUBLIC_BASE_URL",
                    &format!("http://localhost:{http_port}"),
                )
                .trim_end_matches('/')
                .to_owned(),
                enabled: parse_bool_env("NOURISH_IMAGES_ENABLED", true)?,
            },
            messaging: MessagingConfig {
                twilio,
                default_country_code: env_var_or(
                    "NOURISH_DEFAULT_COUNTRY_CODE",
                    notifications::DEFAULT_COUNTRY_CODE,
                ),
            },
            schedule: ScheduleConfig {
                times: parse_notify_times(&env_var_or(
                    "NOURISH_NOTIFY_TIMES",
                    notifications::DEFAULT_NOTIFY_TIMES,
                ))?,
                utc_offset_minutes: parse_env(
                    "NOURISH_NOTIFY_UTC_OFFSET_MINUTES",
                    notifications::DEFAULT_UTC_OFFSET_MINUTES,
                )?,
                enabled: parse_bool_env("NOURISH_SCHEDULER_ENABLED", true)?,
            },
            pipeline: PipelineConfig {
                concurrency: parse_env("NOURISH_PIPELINE_CONCURRENCY", 1)?,
                plan_days: parse_env("NOURISH_PLAN_DAYS", limits::DEFAULT_PLAN_DAYS)?,
            },
        };

        config.validate()?;
        info!("Configuration loaded successfully");
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns `ConfigInvalid` for values outside their allowed range
    pub fn validate(&self) -> AppResult<()> {
        if self.pipeline.concurrency == 0 {
            return Err(invalid("NOURISH_PIPELINE_CONCURRENCY must be at least 1"));
        }
        if self.pipeline.plan_days == 0 {
            return Err(invalid("NOURISH_PLAN_DAYS must be at least 1"));
        }
        if self.llm.agent_timeout_secs == 0 {
            return Err(invalid("NOURISH_AGENT_TIMEOUT_SECS must be at least 1"));
        }
        if self.schedule.utc_offset_minutes.abs() > 14 * 60 {
            return Err(invalid(
                "NOURISH_NOTIFY_UTC_OFFSET_MINUTES must be within +/-840",
            ));
        }
        if self.schedule.enabled && self.schedule.times.is_empty() {
            return Err(invalid(
                "NOURISH_NOTIFY_TIMES must contain at least one time when the scheduler is enabled",
            ));
        }
        if !self.messaging.default_country_code.starts_with('+') {
            return Err(invalid("NOURISH_DEFAULT_COUNTRY_CODE must start with '+'"));
        }
        if self.messaging.twilio.is_none() {
            warn!("Twilio credentials not set; notifications will be logged only");
        }
        Ok(())
    }

    /// Get a summary of the configuration for logging (without secrets)
    #[must_use]
    pub fn summary(&self) -> String {
        let times: Vec<String> = self
            .schedule
            .times
            .iter()
            .map(|t| t.format("%H:%M").to_string())
            .collect();
        format!(
            "Nourish Server Configuration:\n\
             - HTTP: {}:{}\n\
             - Environment: {}\n\
             - Database: {}\n\
             - Agents: {} (model: {}), messages: {} (model: {})\n\
             - Agent timeout: {}s, retries: {}, structured output: {}\n\
             - Images: {} ({})\n\
             - Messaging: {}\n\
             - Scheduler: {} at [{}] UTC{:+}m\n\
             - Pipeline concurrency: {}, plan days: {}",
            self.host,
            self.http_port,
            self.environment,
            if self.database.is_memory() {
                "SQLite (memory)"
            } else {
                "SQLite"
            },
            self.llm.provider,
            self.llm.model.as_deref().unwrap_or("default"),
            self.llm.message_provider,
            self.llm.message_model.as_deref().unwrap_or("default"),
            self.llm.agent_timeout_secs,
            self.llm.max_retries,
            self.llm.structured_output,
            if self.images.enabled {
                "Enabled"
            } else {
                "Disabled"
            },
            self.images.model,
            if self.messaging.twilio.is_some() {
                "Twilio WhatsApp"
            } else {
                "Log only"
            },
            if self.schedule.enabled {
                "Enabled"
            } else {
                "Disabled"
            },
            times.join(", "),
            self.schedule.utc_offset_minutes,
            self.pipeline.concurrency,
            self.pipeline.plan_days,
        )
    }
}

fn invalid(message: &str) -> AppError {
    AppError::new(ErrorCode::ConfigInvalid, message)
}

/// Get environment variable or default value
fn env_var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

fn parse_env<T>(key: &str, default: T) -> AppResult<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match non_empty_var(key) {
        Some(raw) => raw.parse().map_err(|e| {
            AppError::new(
                ErrorCode::ConfigInvalid,
                format!("Invalid {key} value '{raw}': {e}"),
            )
        }),
        None => Ok(default),
    }
}

fn parse_bool_env(key: &str, default: bool) -> AppResult<bool> {
    match non_empty_var(key) {
        Some(raw) => match raw.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(AppError::new(
                ErrorCode::ConfigInvalid,
                format!("Invalid {key} value '{raw}': expected true or false"),
            )),
        },
        None => Ok(default),
    }
}

/// Parse comma-separated `HH:MM` times, sorted and de-duplicated
///
/// # Errors
///
/// Returns `ConfigInvalid` for any entry that is not a valid `HH:MM` time
pub fn parse_notify_times(raw: &str) -> AppResult<Vec<NaiveTime>> {
    let mut times = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            NaiveTime::parse_from_str(s, "%H:%M").map_err(|e| {
                AppError::new(
                    ErrorCode::ConfigInvalid,
                    format!("Invalid notification time '{s}': {e}"),
                )
            })
        })
        .collect::<AppResult<Vec<_>>>()?;
    times.sort_unstable();
    times.dedup();
    Ok(times)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_url_parsing() {
        assert_eq!(DatabaseUrl::parse_url("sqlite::memory:"), DatabaseUrl::Memory);
        assert_eq!(
            DatabaseUrl::parse_url("sqlite:./data/nourish.db"),
            DatabaseUrl::SQLite {
                path: PathBuf::from("./data/nourish.db")
            }
        );
        assert_eq!(
            DatabaseUrl::parse_url("/tmp/plans.db").to_connection_string(),
            "sqlite:/tmp/plans.db"
        );
    }

    #[test]
    fn test_provider_parsing() {
        assert_eq!(
            LlmProviderType::from_str_or_default("GROQ"),
            LlmProviderType::Groq
        );
        assert_eq!(
            LlmProviderType::from_str_or_default("unknown"),
            LlmProviderType::Gemini
        );
        assert_eq!(LlmProviderType::Groq.api_key_env_var(), "GROQ_API_KEY");
    }

    #[test]
    fn test_notify_times_sorted_and_validated() {
        let times = parse_notify_times("20:00, 07:00,12:00,07:00").unwrap();
        assert_eq!(times.len(), 3);
        assert_eq!(times[0], NaiveTime::from_hms_opt(7, 0, 0).unwrap());
        assert!(parse_notify_times("25:00").is_err());
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = ServerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.schedule.times.len(), 3);
        assert!(config.summary().contains("Log only"));
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let mut config = ServerConfig::default();
        config.pipeline.concurrency = 0;
        let err = config.validate().unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigInvalid);
    }

    #[test]
    fn test_twilio_debug_redacts_token() {
        let twilio = TwilioConfig {
            account_sid: "AC123".into(),
            auth_token: "secret-token".into(),
            from_number: "+14155238886".into(),
        };
        let debug = format!("{twilio:?}");
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("REDACTED"));
    }
}
