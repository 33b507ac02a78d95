use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use crate::rewards::MilestoneSettings;

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

/// Top-level configuration for the reward router.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub storage: StorageConfig,
    pub milestone: MilestoneSettings,
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
        let data_dir = env::var("APP_DATA_DIR").unwrap_or_else(|_| "data".to_string());

        let defaults = MilestoneSettings::default();
        let milestone = MilestoneSettings {
            high_pct: env_f64("REWARDS_MILESTONE_HIGH_PCT", defaults.high_pct)?,
            low_pct: env_f64("REWARDS_MILESTONE_LOW_PCT", defaults.low_pct)?,
            pacing_tolerance: env_f64("REWARDS_PACING_TOLERANCE", defaults.pacing_tolerance)?,
            pacing_damping: env_f64("REWARDS_PACING_DAMPING", defaults.pacing_damping)?,
        };
        validate_milestone(&milestone)?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            storage: StorageConfig {
                data_dir: PathBuf::from(data_dir),
            },
            milestone,
        })
    }
}

fn env_f64(key: &'static str, default: f64) -> Result<f64, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .ok_or(ConfigError::InvalidNumber { key }),
        Err(_) => Ok(default),
    }
}

fn validate_milestone(settings: &MilestoneSettings) -> Result<(), ConfigError> {
    if settings.low_pct < 0.0 || settings.low_pct >= settings.high_pct {
        return Err(ConfigError::InvalidMilestoneRates {
            low: settings.low_pct,
            high: settings.high_pct,
        });
    }
    if settings.pacing_damping <= 0.0 || settings.pacing_damping > 1.0 {
        return Err(ConfigError::InvalidDamping(settings.pacing_damping));
    }
    if settings.pacing_tolerance < 0.0 {
        return Err(ConfigError::InvalidTolerance(settings.pacing_tolerance));
    }
    Ok(())
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
}

/// Location of the persisted method table and ledger.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { key: &'static str },
    InvalidMilestoneRates { low: f64, high: f64 },
    InvalidDamping(f64),
    InvalidTolerance(f64),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { key } => write!(f, "{key} must be a finite number"),
            ConfigError::InvalidMilestoneRates { low, high } => write!(
                f,
                "milestone low rate ({low}) must be non-negative and below the high rate ({high})"
            ),
            ConfigError::InvalidDamping(value) => {
                write!(f, "REWARDS_PACING_DAMPING must be in (0, 1], got {value}")
            }
            ConfigError::InvalidTolerance(value) => {
                write!(f, "REWARDS_PACING_TOLERANCE must not be negative, got {value}")
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
