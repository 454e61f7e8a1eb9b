use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use validator::Validate;
use uuid::Uuid;

/// 用户账户记录
/// password_hash 永远不会出现在任何响应类型中
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub handle: String,
    pub email: String,
    pub password_hash: String,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub skills: Vec<String>,
    pub github_url: Option<String>,
    pub linkedin_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 嵌入在帖子、消息、通知中的用户摘要
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserSummary {
    pub id: String,
    pub name: String,
    pub handle: String,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 50))]
    pub name: String,

    #[validate(length(min = 3, max = 30))]
    pub handle: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 8, max = 128))]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1))]
    pub password: String,
}

/// 个人资料更新请求
/// skills 接受数组或逗号分隔的字符串（与前端两种提交方式兼容）
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 50))]
    pub name: Option<String>,

    #[validate(length(max = 160))]
    pub bio: Option<String>,

    pub skills: Option<SkillsField>,

    #[validate(url)]
    pub avatar_url: Option<String>,

    #[validate(url)]
    pub github_url: Option<String>,

    #[validate(url)]
    pub linkedin_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SkillsField {
    List(Vec<String>),
    Csv(String),
}

impl SkillsField {
    pub fn normalize(&self) -> Vec<String> {
        match self {
            SkillsField::List(list) => list
                .iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            SkillsField::Csv(csv) => csv
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }
}

/// 公开的个人资料（含关系数据）
#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub id: String,
    pub name: String,
    pub handle: String,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub skills: Vec<String>,
    pub github_url: Option<String>,
    pub linkedin_url: Option<String>,
    pub followers: Vec<UserSummary>,
    pub following: Vec<UserSummary>,
    pub followers_count: usize,
    pub following_count: usize,
}

/// 关注关系边记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Follow {
    pub id: String,
    pub follower_id: String,
    pub following_id: String,
    pub created_at: DateTime<Utc>,
}

/// 关注切换结果
#[derive(Debug, Serialize, Deserialize)]
pub struct FollowToggleResponse {
    pub following: bool,
    pub followers_count: i64,
}

impl User {
    pub fn new(name: String, handle: String, email: String, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            handle,
            email,
            password_hash,
            bio: None,
            avatar_url: None,
            skills: Vec::new(),
            github_url: None,
            linkedin_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            handle: self.handle.clone(),
            avatar_url: self.avatar_url.clone(),
        }
    }

    pub fn to_profile(&self, followers: Vec<UserSummary>, following: Vec<UserSummary>) -> ProfileResponse {
        ProfileResponse {
            id: self.id.clone(),
            name: self.name.clone(),
            handle: self.handle.clone(),
            bio: self.bio.clone(),
            avatar_url: self.avatar_url.clone(),
            skills: self.skills.clone(),
            github_url: self.github_url.clone(),
            linkedin_url: self.linkedin_url.clone(),
            followers_count: followers.len(),
            following_count: following.len(),
            followers,
            following,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skills_field_normalization() {
        let list = SkillsField::List(vec!["rust".to_string(), "  axum ".to_string(), "".to_string()]);
        assert_eq!(list.normalize(), vec!["rust", "axum"]);

        let csv = SkillsField::Csv("rust, axum,,surrealdb ".to_string());
        assert_eq!(csv.normalize(), vec!["rust", "axum", "surrealdb"]);
    }

    #[test]
    fn test_summary_excludes_credentials() {
        let user = User::new(
            "Alice".to_string(),
            "alice".to_string(),
            "alice@example.com".to_string(),
            "argon2-hash".to_string(),
        );

        let value = serde_json::to_value(user.summary()).unwrap();
        assert!(value.get("password_hash").is_none());
        assert!(value.get("email").is_none());
        assert_eq!(value["handle"], "alice");
    }
}
