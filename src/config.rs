use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;

use chrono::Duration;
use thiserror::Error;
use zeroize::Zeroizing;

use crate::crypto::{TokenService, PBKDF2_ITERATIONS};

/// Application-level constants
pub const APP_NAME: &str = "Clinic";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_ADDR: &str = "0.0.0.0:5007";
pub const DEFAULT_DB_PATH: &str = "clinic.db";
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 30 * 24 * 60 * 60;
pub const DEFAULT_DOCTOR_PASSWORD: &str = "doctor123";

/// Tracing filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "clinic_lib=info,clinic=info,tower_http=info"
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0} must be set together with {1}")]
    Incomplete(&'static str, &'static str),

    #[error("CLINIC_TOKEN_SECRET is required in production")]
    MissingTokenSecret,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }
}

/// Bootstrap admin account created at startup when absent.
#[derive(Clone)]
pub struct AdminSeed {
    pub email: String,
    pub password: Zeroizing<String>,
}

impl fmt::Debug for AdminSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminSeed")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Runtime configuration, read from `CLINIC_*` environment variables.
#[derive(Clone)]
pub struct ClinicConfig {
    pub addr: SocketAddr,
    pub db_path: PathBuf,
    pub token_secret: Option<Zeroizing<String>>,
    pub token_ttl: Duration,
    pub password_iterations: u32,
    pub default_doctor_password: Zeroizing<String>,
    pub admin: Option<AdminSeed>,
    pub environment: Environment,
    /// Honour `X-Forwarded-For` for rate limiting. Only safe behind a proxy
    /// that sets the header itself.
    pub trust_proxy: bool,
}

impl fmt::Debug for ClinicConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClinicConfig")
            .field("addr", &self.addr)
            .field("db_path", &self.db_path)
            .field(
                "token_secret",
                &self.token_secret.as_ref().map(|_| "<redacted>"),
            )
            .field("token_ttl", &self.token_ttl)
            .field("password_iterations", &self.password_iterations)
            .field("default_doctor_password", &"<redacted>")
            .field("admin", &self.admin)
            .field("environment", &self.environment)
            .field("trust_proxy", &self.trust_proxy)
            .finish()
    }
}

impl ClinicConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let addr: SocketAddr = match get("CLINIC_ADDR") {
            Some(raw) => raw.trim().parse().map_err(|e: std::net::AddrParseError| {
                ConfigError::Invalid {
                    key: "CLINIC_ADDR",
                    value: raw.clone(),
                    reason: e.to_string(),
                }
            })?,
            None => DEFAULT_ADDR.parse().map_err(|e: std::net::AddrParseError| {
                ConfigError::Invalid {
                    key: "CLINIC_ADDR",
                    value: DEFAULT_ADDR.into(),
                    reason: e.to_string(),
                }
            })?,
        };

        let db_path = PathBuf::from(get("CLINIC_DB_PATH").unwrap_or_else(|| DEFAULT_DB_PATH.into()));

        let token_ttl_secs: i64 =
            parse_positive(get("CLINIC_TOKEN_TTL_SECS"), "CLINIC_TOKEN_TTL_SECS")?
                .unwrap_or(DEFAULT_TOKEN_TTL_SECS);
        let token_ttl = Duration::try_seconds(token_ttl_secs).ok_or(ConfigError::Invalid {
            key: "CLINIC_TOKEN_TTL_SECS",
            value: token_ttl_secs.to_string(),
            reason: "out of range".into(),
        })?;

        let password_iterations: u32 =
            parse_positive(get("CLINIC_PASSWORD_ITERATIONS"), "CLINIC_PASSWORD_ITERATIONS")?
                .unwrap_or(PBKDF2_ITERATIONS);

        let environment = match get("CLINIC_ENV").map(|v| v.trim().to_ascii_lowercase()) {
            None => Environment::Development,
            Some(v) if v == "development" || v == "dev" => Environment::Development,
            Some(v) if v == "production" || v == "prod" => Environment::Production,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "CLINIC_ENV",
                    value: other,
                    reason: "expected development or production".into(),
                })
            }
        };

        let trust_proxy = match get("CLINIC_TRUST_PROXY").map(|v| v.trim().to_ascii_lowercase()) {
            None => false,
            Some(v) if matches!(v.as_str(), "true" | "1" | "yes") => true,
            Some(v) if matches!(v.as_str(), "false" | "0" | "no") => false,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "CLINIC_TRUST_PROXY",
                    value: other,
                    reason: "expected true or false".into(),
                })
            }
        };

        let admin = match (get("CLINIC_ADMIN_EMAIL"), get("CLINIC_ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(AdminSeed {
                email: email.trim().to_lowercase(),
                password: Zeroizing::new(password),
            }),
            (None, None) => None,
            (Some(_), None) => {
                return Err(ConfigError::Incomplete(
                    "CLINIC_ADMIN_EMAIL",
                    "CLINIC_ADMIN_PASSWORD",
                ))
            }
            (None, Some(_)) => {
                return Err(ConfigError::Incomplete(
                    "CLINIC_ADMIN_PASSWORD",
                    "CLINIC_ADMIN_EMAIL",
                ))
            }
        };

        Ok(Self {
            addr,
            db_path,
            token_secret: get("CLINIC_TOKEN_SECRET").map(Zeroizing::new),
            token_ttl,
            password_iterations,
            default_doctor_password: Zeroizing::new(
                get("CLINIC_DEFAULT_DOCTOR_PASSWORD")
                    .unwrap_or_else(|| DEFAULT_DOCTOR_PASSWORD.into()),
            ),
            admin,
            environment,
            trust_proxy,
        })
    }

    /// Token service for this configuration. Without a configured secret,
    /// development falls back to a per-process random one.
    pub fn token_service(&self) -> Result<TokenService, ConfigError> {
        match (&self.token_secret, self.environment) {
            (Some(secret), _) => {
                TokenService::new(secret.as_bytes(), self.token_ttl).map_err(|e| {
                    ConfigError::Invalid {
                        key: "CLINIC_TOKEN_SECRET",
                        value: "<redacted>".into(),
                        reason: e.to_string(),
                    }
                })
            }
            (None, Environment::Production) => Err(ConfigError::MissingTokenSecret),
            (None, Environment::Development) => {
                tracing::warn!(
                    "CLINIC_TOKEN_SECRET not set; using a random secret, tokens will not survive a restart"
                );
                Ok(TokenService::ephemeral(self.token_ttl))
            }
        }
    }
}

fn parse_positive<T>(raw: Option<String>, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr + PartialOrd + Default,
    T::Err: fmt::Display,
{
    let Some(raw) = raw else {
        return Ok(None);
    };
    let value: T = raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        value: raw.clone(),
        reason: e.to_string(),
    })?;
    if value <= T::default() {
        return Err(ConfigError::Invalid {
            key,
            value: raw,
            reason: "must be greater than zero".into(),
        });
    }
    Ok(Some(value))
}
