//! Database layer: bootstrap connector, schema, repositories
//!
//! - One pool per process, published by the bootstrap coordinator
//! - List operations JOIN the author name in (no N+1)
//! - Ownership and uniqueness are enforced by the statements themselves

pub mod connector;
pub mod repos;
pub mod schema;
pub mod seed;

pub use connector::{bootstrap, PgBootstrap, PgConnector};
pub use repos::*;
pub use sqlx::PgPool;
