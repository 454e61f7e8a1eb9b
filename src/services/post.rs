use crate::{
    error::{AppError, Result},
    models::{
        notification::NotificationType,
        post::{
            AddCommentRequest, Comment, CommentResponse, CreatePostRequest, LikeResponse, Post,
            PostResponse,
        },
        user::{User, UserSummary},
    },
    services::{Database, NotificationService},
};
use chrono::Utc;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};
use validator::Validate;

#[derive(Clone)]
pub struct PostService {
    db: Arc<Database>,
    notification_service: NotificationService,
}

impl PostService {
    pub async fn new(db: Arc<Database>, notification_service: NotificationService) -> Result<Self> {
        Ok(Self {
            db,
            notification_service,
        })
    }

    pub async fn create_post(&self, author_id: &str, request: CreatePostRequest) -> Result<PostResponse> {
        request.validate()?;

        let post = Post::new(author_id.to_string(), request.text, request.image_url);
        let created = self.db.create("post", post).await?;

        info!("User {} created post {}", author_id, created.id);

        let mut users = HashMap::new();
        self.resolve_post(created, &mut users).await
    }

    /// 信息流：全部帖子按时间倒序，作者与评论作者已解析
    pub async fn get_feed(&self) -> Result<Vec<PostResponse>> {
        let mut response = self
            .db
            .query("SELECT * FROM post ORDER BY created_at DESC")
            .await?;
        let posts: Vec<Post> = response.take(0)?;

        let mut users = HashMap::new();
        let mut result = Vec::new();
        for post in posts {
            result.push(self.resolve_post(post, &mut users).await?);
        }
        Ok(result)
    }

    /// 某个作者的全部帖子（个人主页用）
    pub async fn posts_by_author(&self, author_id: &str) -> Result<Vec<PostResponse>> {
        let mut response = self
            .db
            .query_with_params(
                "SELECT * FROM post WHERE author_id = $author_id ORDER BY created_at DESC",
                json!({ "author_id": author_id }),
            )
            .await?;
        let posts: Vec<Post> = response.take(0)?;

        let mut users = HashMap::new();
        let mut result = Vec::new();
        for post in posts {
            result.push(self.resolve_post(post, &mut users).await?);
        }
        Ok(result)
    }

    /// 点赞切换
    /// 只有建立点赞（而不是取消）时才产生通知；给自己的帖子点赞不通知
    pub async fn toggle_like(&self, user_id: &str, post_id: &str) -> Result<LikeResponse> {
        let post: Post = self
            .db
            .get_by_id("post", post_id)
            .await?
            .ok_or_else(|| AppError::not_found("Post"))?;

        let liked = post.is_liked_by(user_id);

        let likes: Vec<String> = if liked {
            post.likes
                .iter()
                .filter(|id| id.as_str() != user_id)
                .cloned()
                .collect()
        } else {
            let mut likes = post.likes.clone();
            likes.push(user_id.to_string());
            likes
        };

        let like_count = likes.len();
        let _: Option<Post> = self
            .db
            .update_by_id_with_json(
                "post",
                post_id,
                json!({ "likes": likes, "updated_at": Utc::now() }),
            )
            .await?;

        if !liked {
            self.notification_service
                .create_notification(
                    &post.author_id,
                    user_id,
                    NotificationType::Like,
                    Some(post.id.clone()),
                )
                .await?;
        }

        debug!(
            "User {} {} post {}",
            user_id,
            if liked { "unliked" } else { "liked" },
            post_id
        );

        Ok(LikeResponse {
            liked: !liked,
            likes: like_count,
        })
    }

    /// 添加评论，返回更新后的完整评论列表
    pub async fn add_comment(
        &self,
        user_id: &str,
        post_id: &str,
        request: AddCommentRequest,
    ) -> Result<Vec<CommentResponse>> {
        request.validate()?;

        let post: Post = self
            .db
            .get_by_id("post", post_id)
            .await?
            .ok_or_else(|| AppError::not_found("Post"))?;

        let comment = Comment::new(user_id.to_string(), request.text);
        let mut comments = post.comments.clone();
        comments.push(comment);

        let updated: Post = self
            .db
            .update_by_id_with_json(
                "post",
                post_id,
                json!({ "comments": comments, "updated_at": Utc::now() }),
            )
            .await?
            .ok_or_else(|| AppError::not_found("Post"))?;

        self.notification_service
            .create_notification(
                &post.author_id,
                user_id,
                NotificationType::Comment,
                Some(post.id.clone()),
            )
            .await?;

        let mut users = HashMap::new();
        self.resolve_comments(&updated.comments, &mut users).await
    }

    /// 删除帖子，仅作者可删
    pub async fn delete_post(&self, user_id: &str, post_id: &str) -> Result<()> {
        let post: Post = self
            .db
            .get_by_id("post", post_id)
            .await?
            .ok_or_else(|| AppError::not_found("Post"))?;

        if post.author_id != user_id {
            return Err(AppError::forbidden("You can delete only your own post"));
        }

        self.db.delete_by_id("post", post_id).await?;
        info!("User {} deleted post {}", user_id, post_id);
        Ok(())
    }

    async fn resolve_post(
        &self,
        post: Post,
        users: &mut HashMap<String, UserSummary>,
    ) -> Result<PostResponse> {
        let author = self
            .user_summary(&post.author_id, users)
            .await?
            .ok_or_else(|| AppError::not_found("User"))?;

        let comments = self.resolve_comments(&post.comments, users).await?;

        Ok(PostResponse {
            id: post.id,
            author,
            text: post.text,
            image_url: post.image_url,
            like_count: post.likes.len(),
            likes: post.likes,
            comments,
            created_at: post.created_at,
        })
    }

    async fn resolve_comments(
        &self,
        comments: &[Comment],
        users: &mut HashMap<String, UserSummary>,
    ) -> Result<Vec<CommentResponse>> {
        let mut result = Vec::new();
        for comment in comments {
            // 作者已注销的评论直接跳过
            if let Some(user) = self.user_summary(&comment.user_id, users).await? {
                result.push(CommentResponse {
                    id: comment.id.clone(),
                    user,
                    text: comment.text.clone(),
                    created_at: comment.created_at,
                });
            }
        }
        Ok(result)
    }

    /// 每次请求内的用户摘要缓存，避免同一作者被重复查询
    async fn user_summary(
        &self,
        user_id: &str,
        cache: &mut HashMap<String, UserSummary>,
    ) -> Result<Option<UserSummary>> {
        if let Some(summary) = cache.get(user_id) {
            return Ok(Some(summary.clone()));
        }

        let user: Option<User> = self.db.get_by_id("user", user_id).await?;
        match user {
            Some(user) => {
                let summary = user.summary();
                cache.insert(user_id.to_string(), summary.clone());
                Ok(Some(summary))
            }
            None => Ok(None),
        }
    }
}
