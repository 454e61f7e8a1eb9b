use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::user::UserSummary;

/// 持久化通知记录
/// message 类型保留在数据模型中，但本服务不再产生它：
/// 消息未读数完全由 message.read 派生，实时提醒走独立的 message-alert 通道
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub recipient_id: String,
    pub sender_id: String,
    pub notification_type: NotificationType,
    pub post_id: Option<String>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    Follow,
    Like,
    Comment,
    Message,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NotificationResponse {
    pub id: String,
    pub sender: UserSummary,
    pub notification_type: NotificationType,
    pub post_id: Option<String>,
    pub post_image: Option<String>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        recipient_id: String,
        sender_id: String,
        notification_type: NotificationType,
        post_id: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            recipient_id,
            sender_id,
            notification_type,
            post_id,
            read: false,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_type_wire_format() {
        assert_eq!(
            serde_json::to_string(&NotificationType::Follow).unwrap(),
            "\"follow\""
        );
        assert_eq!(
            serde_json::from_str::<NotificationType>("\"message\"").unwrap(),
            NotificationType::Message
        );
    }

    #[test]
    fn test_new_notification_starts_unread() {
        let n = Notification::new(
            "recipient".to_string(),
            "sender".to_string(),
            NotificationType::Like,
            Some("post-1".to_string()),
        );
        assert!(!n.read);
    }
}
