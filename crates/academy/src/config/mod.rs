use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

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
    pub admission: AdmissionPolicy,
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

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            admission: AdmissionPolicy::from_env()?,
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

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// When, if ever, a cohort's capacity limits admissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapacityPolicy {
    /// Capacity is stored but never checked.
    Advisory,
    /// Approvals fail once approved enrollments fill the cohort.
    OnApproval,
    /// Applications fail once pending plus approved enrollments fill the cohort.
    /// Approvals are checked as well.
    OnApplication,
}

impl CapacityPolicy {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "advisory" | "off" => Some(Self::Advisory),
            "on_approval" | "approval" => Some(Self::OnApproval),
            "on_application" | "application" => Some(Self::OnApplication),
            _ => None,
        }
    }
}

/// Admission rules for cohorts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdmissionPolicy {
    pub capacity: CapacityPolicy,
    /// Reject applications submitted after the cohort's application deadline.
    pub enforce_deadline: bool,
    /// Capacity given to cohorts created without an explicit one.
    pub default_capacity: u32,
}

impl Default for AdmissionPolicy {
    fn default() -> Self {
        Self {
            capacity: CapacityPolicy::OnApproval,
            enforce_deadline: true,
            default_capacity: 30,
        }
    }
}

impl AdmissionPolicy {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let capacity = match env::var("APP_CAPACITY_POLICY") {
            Ok(raw) => CapacityPolicy::parse(&raw).ok_or(ConfigError::InvalidCapacityPolicy(raw))?,
            Err(_) => defaults.capacity,
        };

        let enforce_deadline = match env::var("APP_ENFORCE_APPLICATION_DEADLINE") {
            Ok(raw) => parse_flag(&raw).ok_or(ConfigError::InvalidFlag {
                name: "APP_ENFORCE_APPLICATION_DEADLINE",
                value: raw,
            })?,
            Err(_) => defaults.enforce_deadline,
        };

        let default_capacity = match env::var("APP_DEFAULT_COHORT_CAPACITY") {
            Ok(raw) => raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|capacity| *capacity > 0)
                .ok_or(ConfigError::InvalidCapacity)?,
            Err(_) => defaults.default_capacity,
        };

        Ok(Self {
            capacity,
            enforce_deadline,
            default_capacity,
        })
    }

    /// Seat limit applied when inserting a new application.
    pub fn application_seat_limit(&self, capacity: u32) -> Option<u32> {
        match self.capacity {
            CapacityPolicy::OnApplication => Some(capacity),
            CapacityPolicy::Advisory | CapacityPolicy::OnApproval => None,
        }
    }

    /// Seat limit applied when approving an application.
    pub fn approval_seat_limit(&self, capacity: u32) -> Option<u32> {
        match self.capacity {
            CapacityPolicy::Advisory => None,
            CapacityPolicy::OnApproval | CapacityPolicy::OnApplication => Some(capacity),
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidCapacityPolicy(String),
    InvalidCapacity,
    InvalidFlag { name: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidCapacityPolicy(value) => write!(
                f,
                "APP_CAPACITY_POLICY must be advisory, on_approval, or on_application (got '{}')",
                value
            ),
            ConfigError::InvalidCapacity => {
                write!(f, "APP_DEFAULT_COHORT_CAPACITY must be a positive integer")
            }
            ConfigError::InvalidFlag { name, value } => {
                write!(f, "{} must be true or false (got '{}')", name, value)
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
        env::remove_var("APP_ENV");
        env::remove_var("APP_HOST");
        env::remove_var("APP_PORT");
        env::remove_var("APP_LOG_LEVEL");
        env::remove_var("APP_CAPACITY_POLICY");
        env::remove_var("APP_ENFORCE_APPLICATION_DEADLINE");
        env::remove_var("APP_DEFAULT_COHORT_CAPACITY");
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
        assert_eq!(config.admission, AdmissionPolicy::default());
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
    fn reads_admission_overrides() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_CAPACITY_POLICY", "on-application");
        env::set_var("APP_ENFORCE_APPLICATION_DEADLINE", "false");
        env::set_var("APP_DEFAULT_COHORT_CAPACITY", "12");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.admission.capacity, CapacityPolicy::OnApplication);
        assert!(!config.admission.enforce_deadline);
        assert_eq!(config.admission.default_capacity, 12);
        reset_env();
    }

    #[test]
    fn rejects_unknown_capacity_policy() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_CAPACITY_POLICY", "lottery");
        let err = AppConfig::load().expect_err("policy rejected");
        assert!(matches!(err, ConfigError::InvalidCapacityPolicy(ref value) if value == "lottery"));
        reset_env();
    }

    #[test]
    fn seat_limits_follow_policy() {
        let advisory = AdmissionPolicy {
            capacity: CapacityPolicy::Advisory,
            ..AdmissionPolicy::default()
        };
        assert_eq!(advisory.application_seat_limit(5), None);
        assert_eq!(advisory.approval_seat_limit(5), None);

        let approval = AdmissionPolicy::default();
        assert_eq!(approval.application_seat_limit(5), None);
        assert_eq!(approval.approval_seat_limit(5), Some(5));
    }
}
