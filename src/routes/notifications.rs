use crate::{error::Result, state::AppState, utils::middleware::CurrentUser};
use axum::{
    extract::State,
    response::Json,
    routing::{get, put},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_notifications))
        .route("/read", put(mark_all_read))
}

/// 当前用户的通知，按时间倒序
/// GET /api/notifications
async fn list_notifications(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Value>> {
    let notifications = state
        .notification_service
        .list_notifications(&user.id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": notifications
    })))
}

/// 全部标记已读，返回更新后的列表
/// PUT /api/notifications/read
async fn mark_all_read(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Value>> {
    let notifications = state.notification_service.mark_all_read(&user.id).await?;

    Ok(Json(json!({
        "success": true,
        "data": notifications
    })))
}
