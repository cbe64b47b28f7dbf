pub mod api;
pub mod clinic;
pub mod config;
pub mod core_state;
pub mod crypto;
pub mod db;
pub mod models;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::config::ClinicConfig;
use crate::core_state::CoreState;

/// Install the global tracing subscriber. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();
}

/// Load configuration, prepare storage, seed the bootstrap admin and serve
/// until Ctrl-C.
pub async fn run() -> anyhow::Result<()> {
    let config = ClinicConfig::from_env()?;
    tracing::info!(
        "{} starting v{} ({})",
        config::APP_NAME,
        config::APP_VERSION,
        config.environment.as_str()
    );

    let core = Arc::new(CoreState::from_config(&config)?);
    tracing::info!(db = %core.db_path().display(), "Database ready");

    if let Some(seed) = config.admin.clone() {
        let core = core.clone();
        tokio::task::spawn_blocking(move || -> anyhow::Result<bool> {
            let conn = core.open_db()?;
            Ok(clinic::accounts::seed_admin(
                &conn,
                &seed.email,
                &seed.password,
                core.password_iterations,
            )?)
        })
        .await??;
    }

    let mut server = api::start_server(core, config.addr).await?;
    tracing::info!(addr = %server.addr(), "Listening");

    tokio::signal::ctrl_c().await?;
    server.shutdown();
    server.wait().await?;
    Ok(())
}
