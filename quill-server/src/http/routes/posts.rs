//! Post endpoints

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::db::repos::{DbError, Post, PostPage, PostRepo, PostWithAuthor};
use crate::http::error::ApiError;
use crate::http::extractors::{ApiJson, ApiQuery, ValidId};
use crate::http::server::AppState;
use crate::models::{PageParams, Pagination, PostContent, PostTitle};

/// Create or replace request
#[derive(Deserialize)]
pub struct PostRequest {
    pub title: String,
    pub content: String,
}

/// Post response; `author_name` is present when the author was joined in
#[derive(Debug, Serialize)]
pub struct PostResponse {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub user_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Post> for PostResponse {
    fn from(p: Post) -> Self {
        Self {
            id: p.id,
            title: p.title,
            content: p.content,
            user_id: p.user_id,
            author_name: None,
            created_at: p.created_at.to_rfc3339(),
            updated_at: p.updated_at.to_rfc3339(),
        }
    }
}

impl From<PostWithAuthor> for PostResponse {
    fn from(p: PostWithAuthor) -> Self {
        Self {
            id: p.id,
            title: p.title,
            content: p.content,
            user_id: p.user_id,
            author_name: Some(p.author_name),
            created_at: p.created_at.to_rfc3339(),
            updated_at: p.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

fn validate(req: &PostRequest) -> Result<(PostTitle, PostContent), ApiError> {
    Ok((PostTitle::new(&req.title)?, PostContent::new(&req.content)?))
}

/// Absent and foreign posts are reported alike.
fn not_owned(e: DbError) -> ApiError {
    match e {
        DbError::NotFound { .. } => ApiError::not_found("Post not found or unauthorized"),
        other => other.into(),
    }
}

/// GET /api/posts - newest first, paginated
async fn list_posts(
    State(state): State<Arc<AppState>>,
    ApiQuery(params): ApiQuery<PageParams>,
) -> Result<Json<PostPage<PostResponse>>, ApiError> {
    let page = Pagination::from(params);
    let result = PostRepo::new(&state.pool).list(page).await?;
    Ok(Json(result.map(PostResponse::from)))
}

/// GET /api/posts/{id}
async fn get_post(
    State(state): State<Arc<AppState>>,
    ValidId(id): ValidId,
) -> Result<Json<PostResponse>, ApiError> {
    let post = PostRepo::new(&state.pool)
        .get(id)
        .await
        .map_err(|e| match e {
            DbError::NotFound { .. } => ApiError::not_found("Post not found"),
            other => other.into(),
        })?;
    Ok(Json(PostResponse::from(post)))
}

/// POST /api/posts
async fn create_post(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiJson(req): ApiJson<PostRequest>,
) -> Result<(StatusCode, Json<PostResponse>), ApiError> {
    let (title, content) = validate(&req)?;
    let post = PostRepo::new(&state.pool)
        .create(auth.id, &title, &content)
        .await?;
    tracing::debug!(post_id = post.id, user_id = auth.id, "post created");

    Ok((StatusCode::CREATED, Json(PostResponse::from(post))))
}

/// PUT /api/posts/{id} - owner only
async fn update_post(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ValidId(id): ValidId,
    ApiJson(req): ApiJson<PostRequest>,
) -> Result<Json<PostResponse>, ApiError> {
    let (title, content) = validate(&req)?;
    let post = PostRepo::new(&state.pool)
        .update(id, auth.id, &title, &content)
        .await
        .map_err(not_owned)?;

    Ok(Json(PostResponse::from(post)))
}

/// DELETE /api/posts/{id} - owner only
async fn delete_post(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ValidId(id): ValidId,
) -> Result<Json<MessageResponse>, ApiError> {
    PostRepo::new(&state.pool)
        .delete(id, auth.id)
        .await
        .map_err(not_owned)?;

    Ok(Json(MessageResponse {
        message: "Post deleted successfully",
    }))
}

/// GET /api/posts/user/me - the caller's posts
async fn my_posts(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<Vec<PostResponse>>, ApiError> {
    let posts = PostRepo::new(&state.pool).list_by_user(auth.id).await?;
    Ok(Json(posts.into_iter().map(PostResponse::from).collect()))
}

/// Post routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/posts", get(list_posts).post(create_post))
        .route(
            "/api/posts/{id}",
            get(get_post).put(update_post).delete(delete_post),
        )
        .route("/api/posts/user/me", get(my_posts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn plain_post_omits_author() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let response = PostResponse::from(Post {
            id: 1,
            title: "t".into(),
            content: "c".into(),
            user_id: 2,
            created_at: at,
            updated_at: at,
        });
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("author_name").is_none());
        assert_eq!(json["created_at"], "2024-05-01T12:00:00+00:00");
    }

    #[test]
    fn not_owned_hides_existence() {
        let err = not_owned(DbError::NotFound {
            resource: "post",
            id: "3".into(),
        });
        assert!(
            matches!(err, ApiError::NotFound { ref message } if message == "Post not found or unauthorized")
        );
    }

    #[test]
    fn blank_title_rejected() {
        let req = PostRequest {
            title: "  ".into(),
            content: "body".into(),
        };
        assert!(matches!(validate(&req), Err(ApiError::Validation(_))));
    }
}
