use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use validator::Validate;
use uuid::Uuid;

use crate::models::user::UserSummary;

/// 帖子记录
/// likes 是点赞用户ID集合（每个用户至多一次），comments 按插入顺序嵌入
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub author_id: String,
    pub text: String,
    pub image_url: Option<String>,
    pub likes: Vec<String>,
    pub comments: Vec<Comment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 嵌入式评论
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub user_id: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreatePostRequest {
    #[validate(length(min = 1, max = 5000))]
    pub text: String,

    #[validate(url)]
    pub image_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct AddCommentRequest {
    #[validate(length(min = 1, max = 1000))]
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CommentResponse {
    pub id: String,
    pub user: UserSummary,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PostResponse {
    pub id: String,
    pub author: UserSummary,
    pub text: String,
    pub image_url: Option<String>,
    pub like_count: usize,
    pub likes: Vec<String>,
    pub comments: Vec<CommentResponse>,
    pub created_at: DateTime<Utc>,
}

/// 点赞切换结果
#[derive(Debug, Serialize, Deserialize)]
pub struct LikeResponse {
    pub liked: bool,
    pub likes: usize,
}

impl Post {
    pub fn new(author_id: String, text: String, image_url: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            author_id,
            text,
            image_url,
            likes: Vec::new(),
            comments: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_liked_by(&self, user_id: &str) -> bool {
        self.likes.iter().any(|id| id == user_id)
    }
}

impl Comment {
    pub fn new(user_id: String, text: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id,
            text,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_liked_by() {
        let mut post = Post::new("author-1".to_string(), "hello".to_string(), None);
        assert!(!post.is_liked_by("user-1"));

        post.likes.push("user-1".to_string());
        assert!(post.is_liked_by("user-1"));
        assert!(!post.is_liked_by("user-2"));
    }
}
