use crate::{
    error::{AppError, Result},
    models::user::{LoginRequest, RegisterRequest, User},
    state::AppState,
    utils::middleware::CurrentUser,
};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{AppendHeaders, IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(get_current_user))
}

/// 注册新账户
/// POST /api/auth/register
async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse> {
    let (user, token) = state.auth_service.register(payload).await?;
    let cookie = state.auth_service.session_cookie(&token);

    Ok((
        StatusCode::CREATED,
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        Json(json!({
            "success": true,
            "data": {
                "message": "User registered successfully",
                "user": account_json(&user)
            }
        })),
    ))
}

/// 登录
/// POST /api/auth/login
async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse> {
    let (user, token) = state.auth_service.login(payload).await?;
    let cookie = state.auth_service.session_cookie(&token);

    Ok((
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        Json(json!({
            "success": true,
            "data": {
                "message": "Login successful",
                "user": account_json(&user)
            }
        })),
    ))
}

/// 登出：清除会话 Cookie
/// POST /api/auth/logout
async fn logout(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse> {
    let cookie = state.auth_service.clear_session_cookie();

    Ok((
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        Json(json!({
            "success": true,
            "data": { "message": "Logged out successfully" }
        })),
    ))
}

/// 获取当前登录账户
/// GET /api/auth/me
async fn get_current_user(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Value>> {
    debug!("Getting current account for user: {}", user.id);

    let user = state
        .user_service
        .get_user(&user.id)
        .await?
        .ok_or_else(|| AppError::unauthorized("Token invalid or expired"))?;

    Ok(Json(json!({
        "success": true,
        "data": { "user": account_json(&user) }
    })))
}

/// 账户自身可见的字段；凭据散列永远不出现在响应里
fn account_json(user: &User) -> Value {
    json!({
        "id": user.id,
        "name": user.name,
        "handle": user.handle,
        "email": user.email,
        "bio": user.bio,
        "avatar_url": user.avatar_url,
        "skills": user.skills,
        "github_url": user.github_url,
        "linkedin_url": user.linkedin_url,
        "created_at": user.created_at,
    })
}
