//! Shared application state.
//!
//! Holds settings and the token service only. Every request opens its own
//! SQLite connection, so no mutable data is shared between requests.

use std::path::{Path, PathBuf};

use zeroize::Zeroizing;

use crate::config::{ClinicConfig, ConfigError, Environment};
use crate::crypto::TokenService;
use crate::db;

#[derive(Debug)]
pub struct CoreState {
    db_path: PathBuf,
    pub tokens: TokenService,
    pub password_iterations: u32,
    pub default_doctor_password: Zeroizing<String>,
    pub environment: Environment,
    pub trust_proxy: bool,
}

impl CoreState {
    /// Build state from configuration and bring the database schema up to date.
    pub fn from_config(config: &ClinicConfig) -> Result<Self, CoreError> {
        let tokens = config.token_service()?;
        let state = Self {
            db_path: config.db_path.clone(),
            tokens,
            password_iterations: config.password_iterations,
            default_doctor_password: config.default_doctor_password.clone(),
            environment: config.environment,
            trust_proxy: config.trust_proxy,
        };
        state.migrate()?;
        Ok(state)
    }

    /// Assemble state directly. Callers are responsible for migrating.
    pub fn new(
        db_path: impl Into<PathBuf>,
        tokens: TokenService,
        password_iterations: u32,
        default_doctor_password: &str,
    ) -> Self {
        Self {
            db_path: db_path.into(),
            tokens,
            password_iterations,
            default_doctor_password: Zeroizing::new(default_doctor_password.to_string()),
            environment: Environment::Development,
            trust_proxy: false,
        }
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Apply pending migrations. Opening runs them; the connection is dropped.
    pub fn migrate(&self) -> Result<(), CoreError> {
        db::open_database(&self.db_path)?;
        Ok(())
    }

    /// Open a fresh connection for one unit of work.
    pub fn open_db(&self) -> Result<rusqlite::Connection, CoreError> {
        db::connect(&self.db_path).map_err(CoreError::Database)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Database error: {0}")]
    Database(#[from] db::DatabaseError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}
