use crate::{
    error::{AppError, Result},
    models::{
        notification::NotificationType,
        user::{Follow, FollowToggleResponse, ProfileResponse, UpdateProfileRequest, User, UserSummary},
    },
    services::{Database, NotificationService},
};
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;
use validator::Validate;

#[derive(Clone)]
pub struct UserService {
    db: Arc<Database>,
    notification_service: NotificationService,
}

impl UserService {
    pub async fn new(db: Arc<Database>, notification_service: NotificationService) -> Result<Self> {
        Ok(Self {
            db,
            notification_service,
        })
    }

    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        self.db.get_by_id("user", user_id).await
    }

    pub async fn get_by_handle(&self, handle: &str) -> Result<Option<User>> {
        self.db.find_one("user", "handle", handle).await
    }

    /// 组装带关系数据的公开资料
    pub async fn get_profile(&self, user: &User) -> Result<ProfileResponse> {
        let followers = self.followers_of(&user.id).await?;
        let following = self.following_of(&user.id).await?;
        Ok(user.to_profile(followers, following))
    }

    /// 更新个人资料，只合并提交的字段
    pub async fn update_profile(
        &self,
        user_id: &str,
        request: UpdateProfileRequest,
    ) -> Result<User> {
        request.validate()?;

        let mut updates = serde_json::Map::new();
        if let Some(name) = request.name {
            updates.insert("name".to_string(), json!(name));
        }
        if let Some(bio) = request.bio {
            updates.insert("bio".to_string(), json!(bio));
        }
        if let Some(skills) = request.skills {
            updates.insert("skills".to_string(), json!(skills.normalize()));
        }
        if let Some(avatar_url) = request.avatar_url {
            updates.insert("avatar_url".to_string(), json!(avatar_url));
        }
        if let Some(github_url) = request.github_url {
            updates.insert("github_url".to_string(), json!(github_url));
        }
        if let Some(linkedin_url) = request.linkedin_url {
            updates.insert("linkedin_url".to_string(), json!(linkedin_url));
        }

        if updates.is_empty() {
            return Err(AppError::bad_request("No fields to update"));
        }
        updates.insert("updated_at".to_string(), json!(Utc::now()));

        let updated: Option<User> = self
            .db
            .update_by_id_with_json("user", user_id, Value::Object(updates))
            .await?;

        updated.ok_or_else(|| AppError::not_found("User"))
    }

    /// 关注/取消关注切换
    /// 关注建立时产生通知，取消时不产生；自我关注被拒绝
    pub async fn toggle_follow(
        &self,
        follower_id: &str,
        target_handle: &str,
    ) -> Result<FollowToggleResponse> {
        let target = self
            .get_by_handle(target_handle)
            .await?
            .ok_or_else(|| AppError::not_found("User"))?;

        if target.id == follower_id {
            return Err(AppError::conflict("You cannot follow or unfollow yourself"));
        }

        let already_following = self.is_following(follower_id, &target.id).await?;

        if already_following {
            self.db
                .query_with_params(
                    "DELETE follow WHERE follower_id = $follower_id AND following_id = $following_id",
                    json!({
                        "follower_id": follower_id,
                        "following_id": target.id
                    }),
                )
                .await?;
            debug!("User {} unfollowed user {}", follower_id, target.id);
        } else {
            let follow = Follow {
                id: Uuid::new_v4().to_string(),
                follower_id: follower_id.to_string(),
                following_id: target.id.clone(),
                created_at: Utc::now(),
            };
            self.db.create("follow", follow).await?;

            self.notification_service
                .create_notification(&target.id, follower_id, NotificationType::Follow, None)
                .await?;

            info!("User {} followed user {}", follower_id, target.id);
        }

        let followers_count = self.follower_count(&target.id).await?;

        Ok(FollowToggleResponse {
            following: !already_following,
            followers_count,
        })
    }

    pub async fn is_following(&self, follower_id: &str, following_id: &str) -> Result<bool> {
        let mut response = self
            .db
            .query_with_params(
                r#"
                    SELECT count() AS count FROM follow
                    WHERE follower_id = $follower_id
                    AND following_id = $following_id
                    GROUP ALL
                "#,
                json!({
                    "follower_id": follower_id,
                    "following_id": following_id
                }),
            )
            .await?;
        let rows: Vec<Value> = response.take(0)?;

        let count = rows
            .first()
            .and_then(|v| v.get("count"))
            .and_then(|v| v.as_i64())
            .unwrap_or(0);

        Ok(count > 0)
    }

    pub async fn follower_count(&self, user_id: &str) -> Result<i64> {
        let mut response = self
            .db
            .query_with_params(
                "SELECT count() AS count FROM follow WHERE following_id = $user_id GROUP ALL",
                json!({ "user_id": user_id }),
            )
            .await?;
        let rows: Vec<Value> = response.take(0)?;

        Ok(rows
            .first()
            .and_then(|v| v.get("count"))
            .and_then(|v| v.as_i64())
            .unwrap_or(0))
    }

    /// 粉丝列表（摘要形式）
    pub async fn followers_of(&self, user_id: &str) -> Result<Vec<UserSummary>> {
        let mut response = self
            .db
            .query_with_params(
                "SELECT * FROM follow WHERE following_id = $user_id ORDER BY created_at DESC",
                json!({ "user_id": user_id }),
            )
            .await?;
        let edges: Vec<Follow> = response.take(0)?;

        let mut result = Vec::new();
        for edge in edges {
            if let Some(user) = self.get_user(&edge.follower_id).await? {
                result.push(user.summary());
            }
        }
        Ok(result)
    }

    /// 关注列表（摘要形式）
    pub async fn following_of(&self, user_id: &str) -> Result<Vec<UserSummary>> {
        let mut response = self
            .db
            .query_with_params(
                "SELECT * FROM follow WHERE follower_id = $user_id ORDER BY created_at DESC",
                json!({ "user_id": user_id }),
            )
            .await?;
        let edges: Vec<Follow> = response.take(0)?;

        let mut result = Vec::new();
        for edge in edges {
            if let Some(user) = self.get_user(&edge.following_id).await? {
                result.push(user.summary());
            }
        }
        Ok(result)
    }
}
