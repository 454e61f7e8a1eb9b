use crate::{error::Result, state::AppState};
use axum::{
    extract::{ws::WebSocketUpgrade, State},
    response::{Json, Response},
    routing::get,
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        // WebSocket连接端点
        .route("/connect", get(websocket_handler))
        // 在线名单的 REST 拉取（错过广播时的兜底）
        .route("/online-users", get(list_online_users))
}

/// WebSocket连接处理器
/// 连接本身不要求会话：身份在通道内通过 register 事件绑定
async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    info!("WebSocket upgrade request");

    ws.on_upgrade(move |socket| async move {
        state.realtime_service.handle_connection(socket).await;
    })
}

/// 获取在线用户列表
/// GET /api/realtime/online-users
async fn list_online_users(State(state): State<Arc<AppState>>) -> Result<Json<Value>> {
    let online_users = state.realtime_service.roster();
    let total_count = online_users.len();

    Ok(Json(json!({
        "success": true,
        "data": {
            "online_users": online_users,
            "total_count": total_count
        }
    })))
}
