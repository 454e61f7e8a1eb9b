use crate::{
    error::Result,
    models::{
        notification::{Notification, NotificationResponse, NotificationType},
        post::Post,
        user::User,
    },
    services::{Database, RealtimeService},
};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Clone)]
pub struct NotificationService {
    db: Arc<Database>,
    realtime: RealtimeService,
}

impl NotificationService {
    pub async fn new(db: Arc<Database>, realtime: RealtimeService) -> Result<Self> {
        Ok(Self { db, realtime })
    }

    /// 创建一条持久化通知并尽力实时推送
    ///
    /// 自己对自己的动作一律不产生通知。投递失败不是错误：
    /// 接收方下次通过 REST 拉取时依然能看到这条记录。
    pub async fn create_notification(
        &self,
        recipient_id: &str,
        sender_id: &str,
        notification_type: NotificationType,
        post_id: Option<String>,
    ) -> Result<()> {
        if recipient_id == sender_id {
            debug!("Suppressing self-directed notification for user: {}", sender_id);
            return Ok(());
        }

        let notification = Notification::new(
            recipient_id.to_string(),
            sender_id.to_string(),
            notification_type,
            post_id,
        );
        let created = self.db.create("notification", notification).await?;

        info!(
            "Created {:?} notification {} for user {}",
            notification_type, created.id, recipient_id
        );

        if let Some(resolved) = self.resolve(created).await? {
            self.realtime.push_notification(recipient_id, &resolved);
        }

        Ok(())
    }

    /// 按时间倒序列出用户的通知，发送方与帖子已解析
    pub async fn list_notifications(&self, recipient_id: &str) -> Result<Vec<NotificationResponse>> {
        debug!("Listing notifications for user: {}", recipient_id);

        let mut response = self
            .db
            .query_with_params(
                "SELECT * FROM notification WHERE recipient_id = $recipient_id ORDER BY created_at DESC",
                json!({ "recipient_id": recipient_id }),
            )
            .await?;
        let notifications: Vec<Notification> = response.take(0)?;

        let mut result = Vec::new();
        for notification in notifications {
            if let Some(resolved) = self.resolve(notification).await? {
                result.push(resolved);
            }
        }

        Ok(result)
    }

    /// 批量标记已读并返回更新后的列表
    pub async fn mark_all_read(&self, recipient_id: &str) -> Result<Vec<NotificationResponse>> {
        self.db
            .query_with_params(
                "UPDATE notification SET read = true WHERE recipient_id = $recipient_id AND read = false",
                json!({ "recipient_id": recipient_id }),
            )
            .await?;

        self.list_notifications(recipient_id).await
    }

    /// 解析发送方摘要和帖子图片；发送方已不存在的通知被跳过
    async fn resolve(&self, notification: Notification) -> Result<Option<NotificationResponse>> {
        let sender: Option<User> = self.db.get_by_id("user", &notification.sender_id).await?;

        let sender = match sender {
            Some(sender) => sender,
            None => {
                warn!(
                    "Skipping notification {} with missing sender {}",
                    notification.id, notification.sender_id
                );
                return Ok(None);
            }
        };

        let post_image = match &notification.post_id {
            Some(post_id) => {
                let post: Option<Post> = self.db.get_by_id("post", post_id).await?;
                post.and_then(|p| p.image_url)
            }
            None => None,
        };

        Ok(Some(NotificationResponse {
            id: notification.id,
            sender: sender.summary(),
            notification_type: notification.notification_type,
            post_id: notification.post_id,
            post_image,
            read: notification.read,
            created_at: notification.created_at,
        }))
    }
}
