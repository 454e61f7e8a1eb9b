use crate::{
    error::Result,
    models::message::SendMessageRequest,
    state::AppState,
    utils::middleware::CurrentUser,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post, put},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/conversations", get(list_conversations))
        .route("/conversations/:id", get(list_messages))
        .route("/send", post(send_message))
        .route("/mark-read/:id", put(mark_read))
}

/// 会话列表，按最近活动倒序
/// GET /api/messages/conversations
async fn list_conversations(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Value>> {
    let conversations = state.message_service.list_conversations(&user.id).await?;

    Ok(Json(json!({
        "success": true,
        "data": conversations
    })))
}

/// 会话内的消息，按时间正序；非发送方拉取即标记已读
/// GET /api/messages/conversations/:id
async fn list_messages(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(conversation_id): Path<String>,
) -> Result<Json<Value>> {
    debug!(
        "User {} fetching messages in conversation {}",
        user.id, conversation_id
    );

    let messages = state
        .message_service
        .list_messages(&conversation_id, &user.id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": messages
    })))
}

/// 发送私信（必要时创建会话）
/// POST /api/messages/send
async fn send_message(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<SendMessageRequest>,
) -> Result<impl IntoResponse> {
    let message = state.message_service.send_message(&user.id, payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "data": message
        })),
    ))
}

/// 显式标记会话为已读
/// PUT /api/messages/mark-read/:id
async fn mark_read(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(conversation_id): Path<String>,
) -> Result<Json<Value>> {
    state
        .message_service
        .mark_read(&conversation_id, &user.id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": { "message": "Conversation marked as read" }
    })))
}
