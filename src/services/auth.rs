use crate::{
    config::Config,
    error::{AppError, Result},
    models::user::{LoginRequest, RegisterRequest, User},
    services::Database,
    utils::validation,
};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};
use validator::Validate;

#[derive(Clone)]
pub struct AuthService {
    db: Arc<Database>,
    config: Config,
}

/// 会话令牌声明
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // 用户ID
    pub exp: i64,    // 过期时间
    pub iat: i64,    // 签发时间
}

/// 经过认证的请求身份，由认证中间件写入请求扩展
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub name: String,
    pub handle: String,
    pub email: String,
    pub avatar_url: Option<String>,
}

impl From<&User> for AuthUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            handle: user.handle.clone(),
            email: user.email.clone(),
            avatar_url: user.avatar_url.clone(),
        }
    }
}

impl AuthService {
    pub async fn new(db: Arc<Database>, config: &Config) -> Result<Self> {
        Ok(Self {
            db,
            config: config.clone(),
        })
    }

    /// 注册新账户，返回账户和会话令牌
    pub async fn register(&self, request: RegisterRequest) -> Result<(User, String)> {
        request.validate()?;
        validation::validate_handle(&request.handle)?;
        validation::validate_email_format(&request.email)?;

        if !self.config.enable_registrations {
            return Err(AppError::forbidden("Registrations are disabled"));
        }

        // 唯一字段冲突要给出具体的错误，而不是笼统的失败
        let existing: Option<User> = self.db.find_one("user", "email", &request.email).await?;
        if existing.is_some() {
            return Err(AppError::conflict("User already exists"));
        }

        let existing: Option<User> = self.db.find_one("user", "handle", &request.handle).await?;
        if existing.is_some() {
            return Err(AppError::conflict("Handle already taken"));
        }

        let password_hash = hash_password(&request.password)?;
        let user = User::new(request.name, request.handle, request.email, password_hash);
        let created = self.db.create("user", user).await?;

        let token = create_session_token(
            &self.config.jwt_secret,
            self.config.jwt_expiry_days,
            &created.id,
        )?;

        info!("Registered new user: {} ({})", created.handle, created.id);
        Ok((created, token))
    }

    /// 登录，返回账户和会话令牌
    pub async fn login(&self, request: LoginRequest) -> Result<(User, String)> {
        request.validate()?;

        let user: User = self
            .db
            .find_one("user", "email", &request.email)
            .await?
            .ok_or_else(|| AppError::not_found("User"))?;

        if !verify_password(&user.password_hash, &request.password)? {
            warn!("Failed login attempt for user: {}", user.id);
            return Err(AppError::unauthorized("Invalid credentials"));
        }

        let token = create_session_token(
            &self.config.jwt_secret,
            self.config.jwt_expiry_days,
            &user.id,
        )?;

        debug!("Login successful for user: {}", user.id);
        Ok((user, token))
    }

    /// 验证会话令牌并解析账户
    pub async fn resolve_session(&self, token: &str) -> Result<User> {
        let claims = decode_session_token(&self.config.jwt_secret, token)?;

        self.db
            .get_by_id("user", &claims.sub)
            .await?
            .ok_or_else(|| AppError::unauthorized("Token invalid or expired"))
    }

    /// 构造会话 Cookie
    pub fn session_cookie(&self, token: &str) -> String {
        format!(
            "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}{}",
            self.config.session_cookie_name,
            token,
            self.config.jwt_expiry_days * 24 * 60 * 60,
            if self.config.secure_cookies { "; Secure" } else { "" },
        )
    }

    /// 构造清除会话的 Cookie
    pub fn clear_session_cookie(&self) -> String {
        format!(
            "{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0{}",
            self.config.session_cookie_name,
            if self.config.secure_cookies { "; Secure" } else { "" },
        )
    }

    pub fn cookie_name(&self) -> &str {
        &self.config.session_cookie_name
    }
}

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string();
    Ok(hash)
}

pub fn verify_password(stored_hash: &str, password: &str) -> Result<bool> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|e| AppError::Internal(format!("Stored password hash is invalid: {}", e)))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AppError::from(e)),
    }
}

pub fn create_session_token(secret: &str, expiry_days: i64, user_id: &str) -> Result<String> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id.to_string(),
        exp: (now + Duration::days(expiry_days)).timestamp(),
        iat: now.timestamp(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok(token)
}

pub fn decode_session_token(secret: &str, token: &str) -> Result<Claims> {
    let validation = Validation::new(Algorithm::HS256);

    match decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    ) {
        Ok(token_data) => {
            debug!("Session token verified for user: {}", token_data.claims.sub);
            Ok(token_data.claims)
        }
        Err(e) => {
            debug!("Session token verification failed: {}", e);
            Err(AppError::unauthorized("Token invalid or expired"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_round_trip() {
        let hash = hash_password("correct horse battery staple").unwrap();
        assert_ne!(hash, "correct horse battery staple");
        assert!(verify_password(&hash, "correct horse battery staple").unwrap());
        assert!(!verify_password(&hash, "wrong password").unwrap());
    }

    #[test]
    fn test_session_token_round_trip() {
        let token = create_session_token("test-secret", 7, "user-42").unwrap();
        let claims = decode_session_token("test-secret", &token).unwrap();
        assert_eq!(claims.sub, "user-42");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_session_token_rejects_wrong_secret() {
        let token = create_session_token("test-secret", 7, "user-42").unwrap();
        assert!(decode_session_token("other-secret", &token).is_err());
    }
}
