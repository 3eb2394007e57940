//! Command implementations for the quill CLI

pub mod init_db;
pub mod seed;
pub mod serve;

pub use init_db::run_init_db;
pub use seed::run_seed;
pub use serve::run_serve;

use anyhow::{Context, Result};
use quill_server::config::DatabaseSettings;
use quill_server::db::{self, PgBootstrap, PgPool};

/// Database settings from the environment, with `--database-url` winning
/// over `DATABASE_URL` and the discrete `DB_*` fields.
pub fn database_settings(url: Option<&str>) -> Result<DatabaseSettings> {
    let settings = match url {
        Some(url) => DatabaseSettings::from_lookup(|key| match key {
            "DATABASE_URL" => Some(url.to_owned()),
            _ => std::env::var(key).ok(),
        }),
        None => DatabaseSettings::from_env(),
    };
    settings.context("Invalid database configuration")
}

/// Bootstrap once and hand back the coordinator with its pool.
pub async fn connect(url: Option<&str>) -> Result<(PgBootstrap, PgPool)> {
    let settings = database_settings(url)?;
    tracing::info!(db = %settings.descriptor, "connecting");

    let bootstrap = db::bootstrap(&settings);
    let pool = bootstrap
        .acquire()
        .await
        .context("Database bootstrap failed")?;
    Ok((bootstrap, pool))
}
