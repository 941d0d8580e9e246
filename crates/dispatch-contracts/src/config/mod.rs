use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

use crate::workflows::assignment::conflict::{DEFAULT_DANGER_DAYS, DEFAULT_WARNING_DAYS};
use crate::workflows::assignment::policy::{DEFAULT_DURATION_MONTHS, DEFAULT_RATE_WARNING_PCT};
use crate::workflows::contracts::store::DEFAULT_CONTRACT_PREFIX;

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

    pub fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub advisor: AdvisorConfig,
    pub session: SessionConfig,
    pub seed: SeedConfig,
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

        let advisor = AdvisorConfig {
            rate_warning_threshold_pct: parse_var(
                "APP_RATE_WARNING_PCT",
                DEFAULT_RATE_WARNING_PCT,
            )?,
            conflict_warning_days: parse_var("APP_CONFLICT_WARNING_DAYS", DEFAULT_WARNING_DAYS)?,
            conflict_danger_days: parse_var("APP_CONFLICT_DANGER_DAYS", DEFAULT_DANGER_DAYS)?,
            default_duration_months: parse_var(
                "APP_DEFAULT_DURATION_MONTHS",
                DEFAULT_DURATION_MONTHS,
            )?,
            contract_prefix: non_empty_var("APP_CONTRACT_PREFIX")
                .unwrap_or_else(|| DEFAULT_CONTRACT_PREFIX.to_string()),
        };
        if advisor.default_duration_months == 0 {
            return Err(ConfigError::InvalidNumber {
                key: "APP_DEFAULT_DURATION_MONTHS",
                value: "0".to_string(),
            });
        }

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig {
                log_level,
                ansi: !environment.is_production(),
            },
            advisor,
            session: SessionConfig {
                api_token: non_empty_var("APP_API_TOKEN"),
            },
            seed: SeedConfig {
                employees_csv: non_empty_var("APP_EMPLOYEES_CSV").map(PathBuf::from),
                factories_csv: non_empty_var("APP_FACTORIES_CSV").map(PathBuf::from),
            },
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_var<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match non_empty_var(key) {
        Some(value) => value
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber { key, value }),
        None => Ok(default),
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

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub ansi: bool,
}

/// Thresholds the assignment advisor applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvisorConfig {
    pub rate_warning_threshold_pct: u32,
    pub conflict_warning_days: i64,
    pub conflict_danger_days: i64,
    pub default_duration_months: u32,
    pub contract_prefix: String,
}

/// When `api_token` is set, `/api/` requests must carry it as a bearer token.
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    pub api_token: Option<String>,
}

/// Optional roster exports loaded into the store at startup.
#[derive(Debug, Clone, Default)]
pub struct SeedConfig {
    pub employees_csv: Option<PathBuf>,
    pub factories_csv: Option<PathBuf>,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { key: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { key, value } => {
                write!(f, "{key} must be a valid number, got '{value}'")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidNumber { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
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
            "APP_RATE_WARNING_PCT",
            "APP_CONFLICT_WARNING_DAYS",
            "APP_CONFLICT_DANGER_DAYS",
            "APP_DEFAULT_DURATION_MONTHS",
            "APP_CONTRACT_PREFIX",
            "APP_API_TOKEN",
            "APP_EMPLOYEES_CSV",
            "APP_FACTORIES_CSV",
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
        assert_eq!(config.advisor.rate_warning_threshold_pct, 10);
        assert_eq!(config.advisor.conflict_warning_days, 90);
        assert_eq!(config.advisor.conflict_danger_days, 30);
        assert_eq!(config.advisor.default_duration_months, 3);
        assert_eq!(config.advisor.contract_prefix, "KK");
        assert!(config.session.api_token.is_none());
        assert!(config.seed.employees_csv.is_none());
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
    fn advisor_thresholds_come_from_env() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_ENV", "production");
        env::set_var("APP_RATE_WARNING_PCT", "15");
        env::set_var("APP_CONFLICT_WARNING_DAYS", "120");
        env::set_var("APP_CONTRACT_PREFIX", "HK");
        env::set_var("APP_API_TOKEN", " secret ");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.environment, AppEnvironment::Production);
        assert!(!config.telemetry.ansi);
        assert_eq!(config.advisor.rate_warning_threshold_pct, 15);
        assert_eq!(config.advisor.conflict_warning_days, 120);
        assert_eq!(config.advisor.contract_prefix, "HK");
        assert_eq!(config.session.api_token.as_deref(), Some("secret"));
        reset_env();
    }

    #[test]
    fn rejects_malformed_numbers() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_RATE_WARNING_PCT", "ten");
        match AppConfig::load() {
            Err(ConfigError::InvalidNumber { key, .. }) => {
                assert_eq!(key, "APP_RATE_WARNING_PCT")
            }
            other => panic!("expected invalid number, got {other:?}"),
        }

        reset_env();
        env::set_var("APP_DEFAULT_DURATION_MONTHS", "0");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidNumber {
                key: "APP_DEFAULT_DURATION_MONTHS",
                ..
            })
        ));
        reset_env();
    }
}
