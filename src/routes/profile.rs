use crate::{
    error::{AppError, Result},
    models::user::UpdateProfileRequest,
    state::AppState,
    utils::middleware::CurrentUser,
};
use axum::{
    extract::{Path, State},
    response::Json,
    routing::{get, post, put},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/me", get(get_my_profile))
        .route("/", put(update_profile))
        .route("/:handle", get(get_profile_by_handle))
        .route("/:handle/follow", post(toggle_follow))
}

/// 当前用户的完整资料
/// GET /api/profile/me
async fn get_my_profile(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Value>> {
    let account = state
        .user_service
        .get_user(&user.id)
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;

    let profile = state.user_service.get_profile(&account).await?;

    Ok(Json(json!({
        "success": true,
        "data": profile
    })))
}

/// 按句柄查看资料（含帖子和关系标志）
/// GET /api/profile/:handle
async fn get_profile_by_handle(
    State(state): State<Arc<AppState>>,
    CurrentUser(viewer): CurrentUser,
    Path(handle): Path<String>,
) -> Result<Json<Value>> {
    debug!("User {} viewing profile: {}", viewer.id, handle);

    let target = state
        .user_service
        .get_by_handle(&handle)
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;

    let profile = state.user_service.get_profile(&target).await?;
    let posts = state.post_service.posts_by_author(&target.id).await?;

    let is_own_profile = viewer.id == target.id;
    let is_following = if is_own_profile {
        false
    } else {
        state.user_service.is_following(&viewer.id, &target.id).await?
    };

    Ok(Json(json!({
        "success": true,
        "data": {
            "user": profile,
            "posts": posts,
            "is_own_profile": is_own_profile,
            "is_following": is_following
        }
    })))
}

/// 更新个人资料
/// PUT /api/profile
async fn update_profile(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<Value>> {
    let updated = state.user_service.update_profile(&user.id, payload).await?;
    let profile = state.user_service.get_profile(&updated).await?;

    Ok(Json(json!({
        "success": true,
        "data": {
            "message": "Profile updated",
            "user": profile
        }
    })))
}

/// 关注/取消关注
/// POST /api/profile/:handle/follow
async fn toggle_follow(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(handle): Path<String>,
) -> Result<Json<Value>> {
    let result = state.user_service.toggle_follow(&user.id, &handle).await?;

    Ok(Json(json!({
        "success": true,
        "data": result
    })))
}
