//! Sample content command

use anyhow::{Context, Result};
use clap::Parser;

use quill_server::db::seed;

#[derive(Parser, Debug)]
pub struct SeedArgs {
    /// Database URL (overrides DATABASE_URL and DB_* fields)
    #[arg(long)]
    pub database_url: Option<String>,
}

pub async fn run_seed(args: SeedArgs) -> Result<()> {
    let (bootstrap, pool) = super::connect(args.database_url.as_deref()).await?;

    let result = seed::seed(&pool).await;
    bootstrap.close().await;
    let report = result.context("Failed to seed data")?;

    tracing::info!(
        user_id = report.user_id,
        inserted = report.posts_inserted,
        skipped = seed::SAMPLE_POSTS.len() as u64 - report.posts_inserted,
        "Seed data inserted"
    );
    Ok(())
}
