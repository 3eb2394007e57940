//! Database initialization command

use anyhow::{Context, Result};
use clap::Parser;

use quill_server::db::seed;

#[derive(Parser, Debug)]
pub struct InitDbArgs {
    /// Database URL (overrides DATABASE_URL and DB_* fields)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Also create the test account and a welcome post
    #[arg(long)]
    pub with_sample: bool,
}

/// Create the tables; the bootstrap does the work.
pub async fn run_init_db(args: InitDbArgs) -> Result<()> {
    let (bootstrap, pool) = super::connect(args.database_url.as_deref()).await?;
    tracing::info!("Tables are in place");

    let sample = if args.with_sample {
        Some(
            seed::sample_data(&pool)
                .await
                .context("Failed to insert sample data"),
        )
    } else {
        None
    };
    bootstrap.close().await;

    if let Some(report) = sample.transpose()? {
        tracing::info!(
            user_id = report.user_id,
            posts = report.posts_inserted,
            email = seed::TEST_ACCOUNT.email,
            "Sample data ready"
        );
    }

    Ok(())
}
