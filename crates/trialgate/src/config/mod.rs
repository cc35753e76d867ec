use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use crate::workflows::registration::policy::{RegistrationPolicy, ResubmissionPolicy};

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
    pub registration: RegistrationPolicy,
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
            registration: registration_policy_from_env()?,
        })
    }
}

fn registration_policy_from_env() -> Result<RegistrationPolicy, ConfigError> {
    let mut policy = RegistrationPolicy::default();

    if let Ok(raw) = env::var("APP_SIGNED_URL_TTL_SECS") {
        policy.signed_url_ttl_secs = raw
            .parse::<u32>()
            .map_err(|_| ConfigError::InvalidPolicyValue {
                key: "APP_SIGNED_URL_TTL_SECS",
            })?;
    }

    if let Ok(raw) = env::var("APP_REQUIRE_DOCUMENT_EVIDENCE") {
        policy.require_document_evidence =
            parse_bool(&raw).ok_or(ConfigError::InvalidPolicyValue {
                key: "APP_REQUIRE_DOCUMENT_EVIDENCE",
            })?;
    }

    if let Ok(raw) = env::var("APP_ALLOW_DRAFT_REJECTION") {
        policy.allow_draft_rejection = parse_bool(&raw).ok_or(ConfigError::InvalidPolicyValue {
            key: "APP_ALLOW_DRAFT_REJECTION",
        })?;
    }

    if let Ok(raw) = env::var("APP_RESUBMISSION_POLICY") {
        policy.resubmission = match raw.trim().to_ascii_lowercase().as_str() {
            "one_shot" | "one-shot" => ResubmissionPolicy::OneShot,
            "reopen" | "reopen_to_draft" => ResubmissionPolicy::ReopenToDraft,
            _ => {
                return Err(ConfigError::InvalidPolicyValue {
                    key: "APP_RESUBMISSION_POLICY",
                })
            }
        };
    }

    Ok(policy)
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
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

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidPolicyValue { key: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidPolicyValue { key } => {
                write!(f, "{key} carries an unsupported value")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidPolicyValue { .. } => None,
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
        env::remove_var("APP_ENV");
        env::remove_var("APP_HOST");
        env::remove_var("APP_PORT");
        env::remove_var("APP_LOG_LEVEL");
        env::remove_var("APP_SIGNED_URL_TTL_SECS");
        env::remove_var("APP_REQUIRE_DOCUMENT_EVIDENCE");
        env::remove_var("APP_ALLOW_DRAFT_REJECTION");
        env::remove_var("APP_RESUBMISSION_POLICY");
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
        assert_eq!(config.registration, RegistrationPolicy::default());
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
    fn registration_policy_reads_env_overrides() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_SIGNED_URL_TTL_SECS", "120");
        env::set_var("APP_REQUIRE_DOCUMENT_EVIDENCE", "true");
        env::set_var("APP_RESUBMISSION_POLICY", "reopen");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.registration.signed_url_ttl_secs, 120);
        assert!(config.registration.require_document_evidence);
        assert_eq!(
            config.registration.resubmission,
            ResubmissionPolicy::ReopenToDraft
        );
        reset_env();
    }

    #[test]
    fn rejects_unsupported_policy_values() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_REQUIRE_DOCUMENT_EVIDENCE", "maybe");
        match AppConfig::load() {
            Err(ConfigError::InvalidPolicyValue { key }) => {
                assert_eq!(key, "APP_REQUIRE_DOCUMENT_EVIDENCE");
            }
            other => panic!("expected invalid policy value, got {other:?}"),
        }
        reset_env();
    }
}
