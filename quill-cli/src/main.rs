//! quill CLI - blogging API server and database setup
//!
//! - `serve`: bootstrap the database and run the HTTP API
//! - `init-db`: create the tables, optionally with a sample account
//! - `seed`: insert the admin account and sample posts
//!
//! A `.env` file in the working directory is loaded before parsing.

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod tracing_setup;

#[derive(Parser, Debug)]
#[command(
    name = "quill",
    author,
    version,
    about = "Minimal blogging backend over PostgreSQL",
    long_about = "Serve the quill JSON API. The database connection is retried with \
                  exponential backoff and the required tables are created on first connect."
)]
struct Cli {
    /// Debug logging (ignored when RUST_LOG is set)
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API server
    Serve(commands::serve::ServeArgs),
    /// Create the tables (optionally with a sample account and post)
    InitDb(commands::init_db::InitDbArgs),
    /// Insert the admin account and sample posts
    Seed(commands::seed::SeedArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    tracing_setup::init(&tracing_setup::TracingConfig { debug: cli.debug }).ok();

    match cli.command {
        Commands::Serve(args) => commands::run_serve(args).await?,
        Commands::InitDb(args) => commands::run_init_db(args).await?,
        Commands::Seed(args) => commands::run_seed(args).await?,
    }
    Ok(())
}
