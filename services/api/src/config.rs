//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// SMTP settings for the reminder mailer. Absent entirely when any of
/// the EMAIL_* variables is missing, in which case the mail service
/// degrades to a logged no-op and the scheduler runs harmlessly.
#[derive(Clone, Debug)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Implicit TLS on connect instead of STARTTLS.
    pub secure: bool,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    pub jwt_secret: String,
    pub jwt_expires_hours: i64,
    pub frontend_url: String,
    pub smtp: Option<SmtpConfig>,
    /// UTC hour at which the daily reminder check fires.
    pub reminder_hour_utc: u32,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Server and Database Settings ---
        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:5000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Load Auth Settings ---
        let jwt_secret = std::env::var("JWT_SECRET")
            .map_err(|_| ConfigError::MissingVar("JWT_SECRET".to_string()))?;

        let jwt_expires_hours = match std::env::var("JWT_EXPIRES_HOURS") {
            Ok(s) => s.parse::<i64>().map_err(|_| {
                ConfigError::InvalidValue("JWT_EXPIRES_HOURS".to_string(), s.clone())
            })?,
            Err(_) => 24,
        };

        let frontend_url = std::env::var("FRONTEND_URL")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());

        // --- Load Mail Settings (as optional) ---
        let smtp = Self::smtp_from_env()?;

        let reminder_hour_utc = match std::env::var("REMINDER_HOUR_UTC") {
            Ok(s) => {
                let hour = s.parse::<u32>().map_err(|_| {
                    ConfigError::InvalidValue("REMINDER_HOUR_UTC".to_string(), s.clone())
                })?;
                if hour > 23 {
                    return Err(ConfigError::InvalidValue(
                        "REMINDER_HOUR_UTC".to_string(),
                        format!("{} is not an hour of the day", hour),
                    ));
                }
                hour
            }
            Err(_) => 9,
        };

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            jwt_secret,
            jwt_expires_hours,
            frontend_url,
            smtp,
            reminder_hour_utc,
        })
    }

    /// The SMTP block is all-or-nothing: any missing variable disables
    /// outbound mail rather than failing startup.
    fn smtp_from_env() -> Result<Option<SmtpConfig>, ConfigError> {
        let vars = ["EMAIL_HOST", "EMAIL_PORT", "EMAIL_USER", "EMAIL_PASS"];
        let missing: Vec<&str> = vars
            .iter()
            .filter(|name| std::env::var(name).is_err())
            .copied()
            .collect();

        if !missing.is_empty() {
            if missing.len() < vars.len() {
                tracing::warn!(
                    "Missing email environment variables: {}. Email service will be disabled",
                    missing.join(", ")
                );
            }
            return Ok(None);
        }

        let port_str = std::env::var("EMAIL_PORT").unwrap_or_default();
        let port = port_str
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidValue("EMAIL_PORT".to_string(), port_str.clone()))?;

        Ok(Some(SmtpConfig {
            host: std::env::var("EMAIL_HOST").unwrap_or_default(),
            port,
            username: std::env::var("EMAIL_USER").unwrap_or_default(),
            password: std::env::var("EMAIL_PASS").unwrap_or_default(),
            secure: std::env::var("EMAIL_SECURE").map(|v| v == "true").unwrap_or(false),
        }))
    }
}
