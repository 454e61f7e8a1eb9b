use crate::{
    error::Result,
    models::post::{AddCommentRequest, CreatePostRequest},
    state::AppState,
    utils::middleware::CurrentUser,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{delete, get, post, put},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(create_post))
        .route("/feed", get(get_feed))
        .route("/:id/like", put(toggle_like))
        .route("/:id/comment", post(add_comment))
        .route("/:id", delete(delete_post))
}

/// 发布新帖子
/// POST /api/posts
async fn create_post(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<CreatePostRequest>,
) -> Result<impl IntoResponse> {
    debug!("User {} creating post", user.id);

    let post = state.post_service.create_post(&user.id, payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "data": post
        })),
    ))
}

/// 信息流
/// GET /api/posts/feed
async fn get_feed(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Value>> {
    debug!("Fetching feed for user: {}", user.id);

    let posts = state.post_service.get_feed().await?;

    Ok(Json(json!({
        "success": true,
        "data": posts
    })))
}

/// 点赞/取消点赞
/// PUT /api/posts/:id/like
async fn toggle_like(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(post_id): Path<String>,
) -> Result<Json<Value>> {
    let result = state.post_service.toggle_like(&user.id, &post_id).await?;

    Ok(Json(json!({
        "success": true,
        "data": result
    })))
}

/// 添加评论
/// POST /api/posts/:id/comment
async fn add_comment(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(post_id): Path<String>,
    Json(payload): Json<AddCommentRequest>,
) -> Result<Json<Value>> {
    let comments = state
        .post_service
        .add_comment(&user.id, &post_id, payload)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": comments
    })))
}

/// 删除自己的帖子
/// DELETE /api/posts/:id
async fn delete_post(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(post_id): Path<String>,
) -> Result<Json<Value>> {
    state.post_service.delete_post(&user.id, &post_id).await?;

    Ok(Json(json!({
        "success": true,
        "data": { "message": "Post deleted successfully" }
    })))
}
