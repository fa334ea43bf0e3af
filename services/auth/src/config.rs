//! Portal configuration
//!
//! Loaded from an optional `sims.toml` next to the binary, then from
//! `SIMS_`-prefixed environment variables with `__` between nested keys,
//! e.g. `SIMS_SECURITY__MAX_LOGIN_ATTEMPTS=3`. Lists are comma separated:
//! `SIMS_SERVER__TRUSTED_PROXIES=10.0.0.1,10.0.0.2`. Connection strings stay in
//! `DATABASE_URL` / `REDIS_URL`, read by `common`.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::net::IpAddr;

use crate::throttle::ThrottleConfig;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    pub server: ServerConfig,
    pub security: SecurityConfig,
    pub session: SessionConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    /// Reverse proxies whose `X-Forwarded-For` header is believed. Requests
    /// from any other peer are attributed to the peer address.
    pub trusted_proxies: Vec<IpAddr>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            trusted_proxies: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Failed logins within the window before a username is locked
    pub max_login_attempts: u32,
    pub lockout_window_seconds: u64,
    /// Idle time after which a session expires
    pub session_timeout_seconds: u64,
    /// Argon2 memory cost in KiB
    pub argon2_memory_kib: u32,
    pub argon2_iterations: u32,
    pub argon2_parallelism: u32,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_login_attempts: 5,
            lockout_window_seconds: 900,
            session_timeout_seconds: 1800,
            argon2_memory_kib: 19_456,
            argon2_iterations: 2,
            argon2_parallelism: 1,
        }
    }
}

impl SecurityConfig {
    pub fn throttle(&self) -> ThrottleConfig {
        ThrottleConfig {
            max_attempts: self.max_login_attempts,
            window_seconds: self.lockout_window_seconds,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionBackend {
    Postgres,
    Redis,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub cookie_name: String,
    /// Set the `Secure` cookie attribute; enable behind TLS
    pub cookie_secure: bool,
    pub store: SessionBackend,
    /// Cron expression (with seconds) for the idle-session sweep; empty disables it
    pub sweep_schedule: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "sims_session".to_string(),
            cookie_secure: false,
            store: SessionBackend::Postgres,
            sweep_schedule: "0 */5 * * * *".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Seeds an `admin` account on startup when set and no such account exists
    pub bootstrap_admin_password: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Postgres,
            bootstrap_admin_password: None,
        }
    }
}

impl PortalConfig {
    /// Load from `sims.toml` (optional) and the environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("sims")
    }

    /// Load from the named file (extension optional, file optional) and the environment
    pub fn load_from(file: &str) -> Result<Self, ConfigError> {
        let config: PortalConfig = Config::builder()
            .add_source(File::with_name(file).required(false))
            .add_source(
                Environment::with_prefix("SIMS")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("server.trusted_proxies")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.check()?;
        Ok(config)
    }

    fn check(&self) -> Result<(), ConfigError> {
        if self.security.max_login_attempts == 0 {
            return Err(ConfigError::Message(
                "security.max_login_attempts must be at least 1".to_string(),
            ));
        }
        if self.security.session_timeout_seconds == 0 {
            return Err(ConfigError::Message(
                "security.session_timeout_seconds must be at least 1".to_string(),
            ));
        }
        if self.session.cookie_name.trim().is_empty() {
            return Err(ConfigError::Message(
                "session.cookie_name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
