//! Post repository
//!
//! - list: JOIN for the author name, `COUNT(*) OVER()` for the total
//! - update/delete: owner is part of the WHERE clause, so a foreign post
//!   and a missing post are indistinguishable

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool, Row};

use super::DbError;
use crate::models::{Pagination, PostContent, PostTitle};

/// Post record from database
#[derive(Debug, Clone, FromRow)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Post joined with its author's display name
#[derive(Debug, Clone, FromRow)]
pub struct PostWithAuthor {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub user_id: i64,
    pub author_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One page of posts, newest first
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostPage<T> {
    pub posts: Vec<T>,
    pub current_page: u32,
    pub total_pages: i64,
    pub total_posts: i64,
}

impl<T> PostPage<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PostPage<U> {
        PostPage {
            posts: self.posts.into_iter().map(f).collect(),
            current_page: self.current_page,
            total_pages: self.total_pages,
            total_posts: self.total_posts,
        }
    }
}

const NOT_FOUND: &str = "post";

/// Post repository
pub struct PostRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> PostRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        user_id: i64,
        title: &PostTitle,
        content: &PostContent,
    ) -> Result<Post, DbError> {
        let post = sqlx::query_as(
            r#"
            INSERT INTO posts (title, content, user_id)
            VALUES ($1, $2, $3)
            RETURNING id, title, content, user_id, created_at, updated_at
            "#,
        )
        .bind(title.as_str())
        .bind(content.as_str())
        .bind(user_id)
        .fetch_one(self.pool)
        .await?;

        Ok(post)
    }

    /// List all posts, newest first.
    pub async fn list(&self, page: Pagination) -> Result<PostPage<PostWithAuthor>, DbError> {
        let rows = sqlx::query(
            r#"
            SELECT
                p.id, p.title, p.content, p.user_id, p.created_at, p.updated_at,
                u.name AS author_name,
                COUNT(*) OVER() AS total
            FROM posts p
            JOIN users u ON u.id = p.user_id
            ORDER BY p.created_at DESC, p.id DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(page.limit as i64)
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        let total = match rows.first() {
            Some(row) => row.try_get::<i64, _>("total")?,
            // past the last page: the window count is unavailable
            None if page.page > 1 => self.count().await?,
            None => 0,
        };

        let posts = rows
            .iter()
            .map(PostWithAuthor::from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(PostPage {
            posts,
            current_page: page.page,
            total_pages: page.total_pages(total),
            total_posts: total,
        })
    }

    async fn count(&self) -> Result<i64, DbError> {
        let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM posts")
            .fetch_one(self.pool)
            .await?;
        Ok(total)
    }

    pub async fn get(&self, id: i64) -> Result<PostWithAuthor, DbError> {
        sqlx::query_as(
            r#"
            SELECT p.id, p.title, p.content, p.user_id, p.created_at, p.updated_at,
                   u.name AS author_name
            FROM posts p
            JOIN users u ON u.id = p.user_id
            WHERE p.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::NotFound {
            resource: NOT_FOUND,
            id: id.to_string(),
        })
    }

    /// Every post of one author, newest first.
    pub async fn list_by_user(&self, user_id: i64) -> Result<Vec<PostWithAuthor>, DbError> {
        let posts = sqlx::query_as(
            r#"
            SELECT p.id, p.title, p.content, p.user_id, p.created_at, p.updated_at,
                   u.name AS author_name
            FROM posts p
            JOIN users u ON u.id = p.user_id
            WHERE p.user_id = $1
            ORDER BY p.created_at DESC, p.id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(posts)
    }

    /// Replace title and content of a post owned by `owner_id`.
    pub async fn update(
        &self,
        id: i64,
        owner_id: i64,
        title: &PostTitle,
        content: &PostContent,
    ) -> Result<Post, DbError> {
        sqlx::query_as(
            r#"
            UPDATE posts
            SET title = $1, content = $2, updated_at = NOW()
            WHERE id = $3 AND user_id = $4
            RETURNING id, title, content, user_id, created_at, updated_at
            "#,
        )
        .bind(title.as_str())
        .bind(content.as_str())
        .bind(id)
        .bind(owner_id)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::NotFound {
            resource: NOT_FOUND,
            id: id.to_string(),
        })
    }

    pub async fn delete(&self, id: i64, owner_id: i64) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner_id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound {
                resource: NOT_FOUND,
                id: id.to_string(),
            });
        }
        Ok(())
    }
}
