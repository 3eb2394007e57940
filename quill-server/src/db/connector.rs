//! sqlx-backed connector for the bootstrap coordinator
//!
//! Opens a `PgPool` with explicit connection limits and timeouts. The pool is
//! created with `connect` (not `connect_lazy`) so a bad target fails the
//! attempt instead of the first request.

use std::time::Duration;

use async_trait::async_trait;
use quill_core::{Bootstrap, ConnectionDescriptor, ConnectionResolver, Connector, SchemaReport};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use sqlx::PgPool;

use super::schema;
use crate::config::DatabaseSettings;

/// Bootstrap coordinator over Postgres.
pub type PgBootstrap = Bootstrap<PgConnector>;

/// Opens and validates Postgres pools.
#[derive(Debug, Clone)]
pub struct PgConnector {
    max_connections: u32,
    connect_timeout: Duration,
    statement_timeout: Duration,
    ssl_relaxed: bool,
}

impl PgConnector {
    pub fn new(settings: &DatabaseSettings) -> Self {
        Self {
            max_connections: settings.max_connections,
            connect_timeout: settings.connect_timeout,
            statement_timeout: settings.statement_timeout,
            ssl_relaxed: settings.ssl_relaxed,
        }
    }

    fn connect_options(&self, target: &ConnectionDescriptor) -> Result<PgConnectOptions, sqlx::Error> {
        let mut options: PgConnectOptions = target.as_str().parse()?;

        let statement_timeout = self.statement_timeout.as_millis().to_string();
        options = options.options([("statement_timeout", statement_timeout.as_str())]);

        if self.ssl_relaxed {
            // encrypted, but the certificate is not verified
            options = options.ssl_mode(PgSslMode::Require);
        }

        Ok(options)
    }
}

/// Build the coordinator described by `settings`.
pub fn bootstrap(settings: &DatabaseSettings) -> PgBootstrap {
    let bootstrap = Bootstrap::new(PgConnector::new(settings), settings.descriptor.clone())
        .with_policy(settings.retry);

    if settings.resolve_ipv4 {
        bootstrap
    } else {
        bootstrap.with_resolver(ConnectionResolver::disabled())
    }
}

#[async_trait]
impl Connector for PgConnector {
    type Pool = PgPool;
    type Error = sqlx::Error;

    async fn connect(&self, target: &ConnectionDescriptor) -> Result<PgPool, sqlx::Error> {
        let options = self.connect_options(target)?;

        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .acquire_timeout(self.connect_timeout)
            .connect_with(options)
            .await
    }

    async fn ping(&self, pool: &PgPool) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(pool).await?;
        Ok(())
    }

    async fn ensure_schema(&self, pool: &PgPool) -> Result<SchemaReport, sqlx::Error> {
        schema::ensure_schema(pool).await
    }

    async fn discard(&self, pool: PgPool) {
        pool.close().await;
    }

    async fn close(&self, pool: &PgPool) {
        pool.close().await;
    }

    fn is_retryable(&self, error: &sqlx::Error) -> bool {
        !matches!(error, sqlx::Error::Configuration(_) | sqlx::Error::Tls(_))
    }
}
