use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::workflows::scope2::emissions::DEFAULT_GRID_EMISSION_FACTOR;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the assessment service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub mail: MailConfig,
    pub storage: StorageConfig,
    pub emissions: EmissionsConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let smtp_host = env::var("SMTP_HOST").ok().filter(|v| !v.trim().is_empty());
        let smtp_port = env::var("SMTP_PORT")
            .unwrap_or_else(|_| "587".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidSmtpPort)?;
        let smtp_user = env::var("SMTP_USER").ok();
        let smtp_pass = env::var("SMTP_PASS").ok();
        let admin_email =
            env::var("ADMIN_EMAIL").unwrap_or_else(|_| "admin@sustally.com".to_string());
        let from_address = env::var("MAIL_FROM")
            .unwrap_or_else(|_| "Sustally System <no-reply@sustally.com>".to_string());
        let base_url =
            env::var("PUBLIC_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());
        let send_timeout_secs = env::var("MAIL_SEND_TIMEOUT_SECS")
            .unwrap_or_else(|_| "10".to_string())
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidSendTimeout)?;

        let data_file = env::var("SCOPE2_DATA_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("scope2_submissions.json"));

        let grid_factor = match env::var("GRID_EMISSION_FACTOR") {
            Ok(raw) => raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|factor| factor.is_finite() && *factor >= 0.0)
                .ok_or(ConfigError::InvalidEmissionFactor)?,
            Err(_) => DEFAULT_GRID_EMISSION_FACTOR,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            mail: MailConfig {
                smtp_host,
                smtp_port,
                smtp_user,
                smtp_pass,
                admin_email,
                from_address,
                base_url,
                send_timeout: Duration::from_secs(send_timeout_secs),
            },
            storage: StorageConfig { data_file },
            emissions: EmissionsConfig { grid_factor },
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Outbound mail transport and addressing settings.
///
/// When `smtp_host` is unset the service falls back to a logging-only
/// transport instead of a real SMTP relay.
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub smtp_user: Option<String>,
    pub smtp_pass: Option<String>,
    pub admin_email: String,
    pub from_address: String,
    pub base_url: String,
    pub send_timeout: Duration,
}

/// Location of the submission collection file.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_file: PathBuf,
}

/// Grid emission intensity used by the calculator.
#[derive(Debug, Clone)]
pub struct EmissionsConfig {
    pub grid_factor: f64,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidSmtpPort,
    InvalidSendTimeout,
    InvalidEmissionFactor,
    InvalidHost { source: std::net::AddrParseError },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidSmtpPort => write!(f, "SMTP_PORT must be a valid u16"),
            ConfigError::InvalidSendTimeout => {
                write!(f, "MAIL_SEND_TIMEOUT_SECS must be a whole number of seconds")
            }
            ConfigError::InvalidEmissionFactor => {
                write!(f, "GRID_EMISSION_FACTOR must be a non-negative number")
            }
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for key in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "SMTP_HOST",
            "SMTP_PORT",
            "SMTP_USER",
            "SMTP_PASS",
            "ADMIN_EMAIL",
            "MAIL_FROM",
            "PUBLIC_BASE_URL",
            "MAIL_SEND_TIMEOUT_SECS",
            "SCOPE2_DATA_FILE",
            "GRID_EMISSION_FACTOR",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert!(config.mail.smtp_host.is_none());
        assert_eq!(config.mail.admin_email, "admin@sustally.com");
        assert_eq!(config.mail.send_timeout, Duration::from_secs(10));
        assert_eq!(
            config.storage.data_file,
            PathBuf::from("scope2_submissions.json")
        );
        assert!((config.emissions.grid_factor - DEFAULT_GRID_EMISSION_FACTOR).abs() < 1e-9);
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
    }

    #[test]
    fn rejects_malformed_emission_factor() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("GRID_EMISSION_FACTOR", "-0.5");
        match AppConfig::load() {
            Err(ConfigError::InvalidEmissionFactor) => {}
            other => panic!("expected invalid factor error, got {other:?}"),
        }
        env::remove_var("GRID_EMISSION_FACTOR");
    }

    #[test]
    fn blank_smtp_host_means_no_relay() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("SMTP_HOST", "  ");
        let config = AppConfig::load().expect("config loads");
        assert!(config.mail.smtp_host.is_none());
        env::remove_var("SMTP_HOST");
    }
}
