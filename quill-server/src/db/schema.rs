//! Required tables and their idempotent creation statements
//!
//! There is no migration system: each table is checked by name and created
//! when missing. The check and the creation run in one transaction holding a
//! transaction-scoped advisory lock, so concurrent bootstraps (in any number
//! of processes) serialize and every one after the first sees the tables.

use quill_core::SchemaReport;
use sqlx::{PgExecutor, PgPool};

/// Advisory lock key held while the schema is checked and created.
pub const SCHEMA_LOCK_KEY: i64 = 0x7175_696c_6c00_0001;

/// A table the application cannot run without.
#[derive(Debug, Clone, Copy)]
pub struct TableDef {
    pub name: &'static str,
    /// Executed in order when the table is missing.
    pub statements: &'static [&'static str],
}

pub const USERS: TableDef = TableDef {
    name: "users",
    statements: &[r#"
        CREATE TABLE IF NOT EXISTS users (
            id BIGSERIAL PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#],
};

pub const POSTS: TableDef = TableDef {
    name: "posts",
    statements: &[
        r#"
        CREATE TABLE IF NOT EXISTS posts (
            id BIGSERIAL PRIMARY KEY,
            title TEXT NOT NULL,
            content TEXT NOT NULL,
            user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
        "CREATE INDEX IF NOT EXISTS posts_user_id_idx ON posts (user_id)",
        "CREATE INDEX IF NOT EXISTS posts_created_at_idx ON posts (created_at DESC)",
    ],
};

/// Tables in dependency order (posts references users).
pub const REQUIRED_TABLES: [TableDef; 2] = [USERS, POSTS];

/// Whether `name` exists in the public schema.
pub async fn table_exists<'e, E>(executor: E, name: &str) -> Result<bool, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let (exists,): (bool,) = sqlx::query_as(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM information_schema.tables
            WHERE table_schema = 'public' AND table_name = $1
        )
        "#,
    )
    .bind(name)
    .fetch_one(executor)
    .await?;

    Ok(exists)
}

/// Create every missing required table.
///
/// The advisory lock is released when the transaction ends, including on
/// rollback after an error.
pub async fn ensure_schema(pool: &PgPool) -> Result<SchemaReport, sqlx::Error> {
    let mut report = SchemaReport::default();
    let mut tx = pool.begin().await?;

    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(SCHEMA_LOCK_KEY)
        .execute(&mut *tx)
        .await?;

    for table in REQUIRED_TABLES {
        // checked under the lock: a concurrent creator has committed by now
        if table_exists(&mut *tx, table.name).await? {
            report.present.push(table.name.to_owned());
            continue;
        }

        tracing::info!(table = table.name, "creating table");
        for statement in table.statements {
            sqlx::query(statement).execute(&mut *tx).await?;
        }
        report.created.push(table.name.to_owned());
    }

    tx.commit().await?;
    Ok(report)
}
