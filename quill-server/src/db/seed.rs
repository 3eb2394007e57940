//! Sample accounts and posts for `init-db --with-sample` and `seed`
//!
//! Everything here is safe to re-run: accounts are upserted by email and a
//! post is skipped when its author already has one with the same title.

use sqlx::PgPool;

use crate::auth::{hash_password, PasswordError};
use crate::models::{DisplayName, Email, Password, ValidationError};

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("invalid sample data: {0}")]
    Invalid(#[from] ValidationError),

    #[error(transparent)]
    Password(#[from] PasswordError),
}

/// Sample account created by `init-db --with-sample`
pub const TEST_ACCOUNT: SampleAccount = SampleAccount {
    name: "Test User",
    email: "test@example.com",
    password: "test123",
};

/// Owner of the seeded posts
pub const ADMIN_ACCOUNT: SampleAccount = SampleAccount {
    name: "Admin User",
    email: "admin@example.com",
    password: "admin123",
};

pub const WELCOME_POST: SamplePost = SamplePost {
    title: "Welcome to My Blog",
    content: "This is a test post created during database initialization.",
};

#[derive(Debug, Clone, Copy)]
pub struct SampleAccount {
    pub name: &'static str,
    pub email: &'static str,
    pub password: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct SamplePost {
    pub title: &'static str,
    pub content: &'static str,
}

pub const SAMPLE_POSTS: &[SamplePost] = &[
    SamplePost {
        title: "Getting Started with Rust",
        content: "Rust pairs low-level control with a type system that catches whole classes of bugs at compile time.\n\nWhat you get:\n- Ownership instead of a garbage collector\n- Fearless concurrency\n- Cargo for builds, tests, and dependencies\n\nThe rest of this post walks through a first project.",
    },
    SamplePost {
        title: "The Art of Writing Clean Code",
        content: "Clean code is code that the next reader understands quickly.\n\n1. Keep functions small and focused\n2. Use meaningful names\n3. Delete what you do not need\n4. Format consistently\n\nCode is read far more often than it is written.",
    },
    SamplePost {
        title: "Building JSON APIs with Axum",
        content: "Axum routes requests through extractors and handlers built on tower services.\n\nTopics covered:\n- Routing and shared state\n- Extractors for auth and validation\n- Error responses\n- Graceful shutdown",
    },
    SamplePost {
        title: "Database Design Basics",
        content: "A well-designed schema keeps the application honest.\n\n1. Normalize your data\n2. Use appropriate types\n3. Index what you query\n4. Let constraints enforce invariants",
    },
    SamplePost {
        title: "Introduction to Docker",
        content: "Containers package an application with everything it needs to run.\n\nLearn about:\n- Containers vs VMs\n- Dockerfile basics\n- Docker Compose\n- Development workflows",
    },
    SamplePost {
        title: "Mastering Git Version Control",
        content: "Git is the backbone of collaborative development.\n\nKey topics:\n- Branching strategies\n- Commit messages\n- Resolving conflicts\n- Rewriting history safely",
    },
    SamplePost {
        title: "Web Security Fundamentals",
        content: "Security is part of the design, not a final step.\n\nTopics include:\n- XSS prevention\n- CSRF protection\n- SQL injection\n- Password storage\n- HTTPS and TLS",
    },
];

/// Summary of one seeding run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub user_id: i64,
    pub posts_inserted: u64,
}

/// Insert the account or return the id of the existing one with that email.
///
/// An existing account keeps its password.
pub async fn ensure_account(pool: &PgPool, account: &SampleAccount) -> Result<i64, SeedError> {
    let name = DisplayName::new(account.name)?;
    let email = Email::new(account.email)?;
    let password = Password::new(account.password)?;
    let hash = hash_password(password.expose())?;

    let (id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO users (name, email, password_hash)
        VALUES ($1, $2, $3)
        ON CONFLICT (email) DO UPDATE SET email = EXCLUDED.email
        RETURNING id
        "#,
    )
    .bind(name.as_str())
    .bind(email.as_str())
    .bind(hash)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Insert `posts` for `user_id`, skipping titles the user already has.
pub async fn insert_posts(pool: &PgPool, user_id: i64, posts: &[SamplePost]) -> Result<u64, SeedError> {
    let mut tx = pool.begin().await?;
    let mut inserted = 0;

    for post in posts {
        let result = sqlx::query(
            r#"
            INSERT INTO posts (title, content, user_id)
            SELECT $1, $2, $3
            WHERE NOT EXISTS (SELECT 1 FROM posts WHERE user_id = $3 AND title = $1)
            "#,
        )
        .bind(post.title)
        .bind(post.content)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
        inserted += result.rows_affected();
    }

    tx.commit().await?;
    Ok(inserted)
}

/// Test account plus the welcome post.
pub async fn sample_data(pool: &PgPool) -> Result<SeedReport, SeedError> {
    let user_id = ensure_account(pool, &TEST_ACCOUNT).await?;
    let posts_inserted = insert_posts(pool, user_id, &[WELCOME_POST]).await?;
    Ok(SeedReport {
        user_id,
        posts_inserted,
    })
}

/// Admin account plus the sample post set.
pub async fn seed(pool: &PgPool) -> Result<SeedReport, SeedError> {
    let user_id = ensure_account(pool, &ADMIN_ACCOUNT).await?;
    let posts_inserted = insert_posts(pool, user_id, SAMPLE_POSTS).await?;
    Ok(SeedReport {
        user_id,
        posts_inserted,
    })
}
