use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use crate::workflows::donation::eligibility::{CooldownPolicy, EligibilityError};

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

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub eligibility: CooldownPolicy,
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
        let log_format = LogFormat::from_str(
            &env::var("APP_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string()),
        );

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig {
                log_level,
                log_format,
            },
            eligibility: load_policy()?,
        })
    }
}

fn load_policy() -> Result<CooldownPolicy, ConfigError> {
    let defaults = CooldownPolicy::default();
    let policy = CooldownPolicy {
        blood_cooldown_days: policy_var("APP_BLOOD_COOLDOWN_DAYS", defaults.blood_cooldown_days)?,
        plasma_cooldown_days: policy_var(
            "APP_PLASMA_COOLDOWN_DAYS",
            defaults.plasma_cooldown_days,
        )?,
        min_age_years: policy_var("APP_MIN_AGE_YEARS", defaults.min_age_years)?,
        max_age_years: policy_var("APP_MAX_AGE_YEARS", defaults.max_age_years)?,
        min_weight_kg_blood: policy_var("APP_MIN_WEIGHT_KG_BLOOD", defaults.min_weight_kg_blood)?,
        min_weight_kg_plasma: policy_var(
            "APP_MIN_WEIGHT_KG_PLASMA",
            defaults.min_weight_kg_plasma,
        )?,
    };

    policy.validate().map_err(ConfigError::Policy)?;
    Ok(policy)
}

fn policy_var<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidPolicyValue { key, raw }),
        Err(_) => Ok(default),
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

/// Output layout for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

impl LogFormat {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Compact,
        }
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub log_format: LogFormat,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidPolicyValue { key: &'static str, raw: String },
    Policy(EligibilityError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidPolicyValue { key, raw } => {
                write!(f, "{key} must be numeric (found '{raw}')")
            }
            ConfigError::Policy(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidPolicyValue { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::Policy(err) => Some(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    const POLICY_KEYS: [&str; 6] = [
        "APP_BLOOD_COOLDOWN_DAYS",
        "APP_PLASMA_COOLDOWN_DAYS",
        "APP_MIN_AGE_YEARS",
        "APP_MAX_AGE_YEARS",
        "APP_MIN_WEIGHT_KG_BLOOD",
        "APP_MIN_WEIGHT_KG_PLASMA",
    ];

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        env::remove_var("APP_ENV");
        env::remove_var("APP_HOST");
        env::remove_var("APP_PORT");
        env::remove_var("APP_LOG_LEVEL");
        env::remove_var("APP_LOG_FORMAT");
        for key in POLICY_KEYS {
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
        assert_eq!(config.telemetry.log_format, LogFormat::Compact);
        assert_eq!(config.eligibility, CooldownPolicy::default());
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        reset_env();
    }

    #[test]
    fn policy_overrides_are_applied() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_BLOOD_COOLDOWN_DAYS", "84");
        env::set_var("APP_MIN_WEIGHT_KG_PLASMA", "52.5");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.eligibility.blood_cooldown_days, 84);
        assert_eq!(config.eligibility.min_weight_kg_plasma, 52.5);
        assert_eq!(config.eligibility.plasma_cooldown_days, 14);
        reset_env();
    }

    #[test]
    fn rejects_unparseable_and_negative_policy_values() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_PLASMA_COOLDOWN_DAYS", "two weeks");
        match AppConfig::load() {
            Err(ConfigError::InvalidPolicyValue { key, .. }) => {
                assert_eq!(key, "APP_PLASMA_COOLDOWN_DAYS")
            }
            other => panic!("expected invalid policy value, got {other:?}"),
        }

        env::set_var("APP_PLASMA_COOLDOWN_DAYS", "-3");
        assert!(matches!(AppConfig::load(), Err(ConfigError::Policy(_))));
        reset_env();
    }
}
