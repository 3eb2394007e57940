//! quill-server: blogging API over PostgreSQL
//!
//! Accounts with email/password and bearer tokens, posts with owner-only
//! edits. The database pool comes from the bootstrap coordinator in
//! `quill-core`, which retries until the tables are in place.

pub mod auth;
pub mod config;
pub mod db;
pub mod http;
pub mod models;

pub use config::{AuthSettings, ConfigError, DatabaseSettings};
pub use http::{build_router, run_server, AppState, ServerConfig, ServerError};
