//! HTTP server command
//!
//! Bootstraps the database (retrying with backoff) and serves the API until
//! Ctrl+C or SIGTERM, then closes the pool.

use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;

use quill_server::auth::TokenIssuer;
use quill_server::config::AuthSettings;
use quill_server::db;
use quill_server::http::{run_server, ServerConfig};

/// Arguments for the serve command
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Address to bind to
    #[arg(long, short = 'b', default_value = "127.0.0.1:4000")]
    pub bind: SocketAddr,

    /// Port override for the bind address
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Origin allowed by CORS
    #[arg(long, env = "CORS_ORIGIN", default_value = "http://localhost:3000")]
    pub cors_origin: String,

    /// Allow permissive CORS (all origins) - use with caution
    #[arg(long)]
    pub cors_permissive: bool,

    /// Database URL (overrides DATABASE_URL and DB_* fields)
    #[arg(long)]
    pub database_url: Option<String>,
}

impl ServeArgs {
    fn server_config(&self) -> ServerConfig {
        let mut bind_addr = self.bind;
        if let Some(port) = self.port {
            bind_addr.set_port(port);
        }

        ServerConfig {
            bind_addr,
            cors_origin: self.cors_origin.clone(),
            cors_permissive: self.cors_permissive,
        }
    }
}

/// Run the HTTP server
pub async fn run_serve(args: ServeArgs) -> Result<()> {
    let settings = super::database_settings(args.database_url.as_deref())?;
    let auth = AuthSettings::from_env().context("Invalid auth configuration")?;
    let config = args.server_config();

    tracing::info!(db = %settings.descriptor, "Starting quill server on {}", config.bind_addr);

    let bootstrap = db::bootstrap(&settings);
    run_server(&bootstrap, TokenIssuer::from_settings(&auth), config)
        .await
        .context("Server error")?;

    Ok(())
}
