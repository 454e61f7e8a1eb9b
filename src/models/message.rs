use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use validator::Validate;
use uuid::Uuid;

use crate::models::user::UserSummary;

/// 两方会话
/// participants 始终按排序后的顺序存储，每个无序用户对至多一条记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub participants: Vec<String>,
    pub last_message_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 会话消息
/// read 只会从 false 变为 true，且只由非发送方触发
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub text: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct SendMessageRequest {
    #[validate(length(min = 1))]
    pub receiver_id: String,

    #[validate(length(min = 1, max = 2000))]
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub id: String,
    pub conversation_id: String,
    pub sender: UserSummary,
    pub text: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConversationResponse {
    pub id: String,
    pub participants: Vec<UserSummary>,
    pub last_message: Option<MessageResponse>,
    pub unread_count: i64,
    pub updated_at: DateTime<Utc>,
}

/// 轻量级未读提醒
/// 与完整的 receive-message 推送分离：客户端可能只订阅其中之一
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessageAlert {
    pub conversation_id: String,
    pub sender_id: String,
    pub preview: String,
}

impl MessageAlert {
    pub fn from_message(message: &Message, preview_length: usize) -> Self {
        Self {
            conversation_id: message.conversation_id.clone(),
            sender_id: message.sender_id.clone(),
            preview: truncate_preview(&message.text, preview_length),
        }
    }
}

/// 无序用户对的规范化键，决定会话记录ID
pub fn conversation_key(a: &str, b: &str) -> String {
    if a <= b {
        format!("{}_{}", a, b)
    } else {
        format!("{}_{}", b, a)
    }
}

fn truncate_preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let truncated: String = text.chars().take(max_chars).collect();
    format!("{}…", truncated)
}

impl Conversation {
    pub fn new(a: &str, b: &str) -> Self {
        let mut participants = vec![a.to_string(), b.to_string()];
        participants.sort();
        let now = Utc::now();
        Self {
            id: conversation_key(a, b),
            participants,
            last_message_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_participant(&self, user_id: &str) -> bool {
        self.participants.iter().any(|id| id == user_id)
    }
}

impl Message {
    pub fn new(conversation_id: String, sender_id: String, text: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            conversation_id,
            sender_id,
            text,
            read: false,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversation_key_is_order_independent() {
        assert_eq!(conversation_key("alice", "bob"), conversation_key("bob", "alice"));
        assert_eq!(conversation_key("alice", "bob"), "alice_bob");
    }

    #[test]
    fn test_conversation_participants_sorted() {
        let conv = Conversation::new("zoe", "adam");
        assert_eq!(conv.participants, vec!["adam", "zoe"]);
        assert_eq!(conv.id, "adam_zoe");
        assert!(conv.has_participant("zoe"));
        assert!(!conv.has_participant("nobody"));
    }

    #[test]
    fn test_new_message_starts_unread() {
        let msg = Message::new("adam_zoe".to_string(), "adam".to_string(), "hi".to_string());
        assert!(!msg.read);
    }

    #[test]
    fn test_alert_preview_truncation() {
        let mut msg = Message::new("a_b".to_string(), "a".to_string(), "short".to_string());
        let alert = MessageAlert::from_message(&msg, 80);
        assert_eq!(alert.preview, "short");

        msg.text = "x".repeat(100);
        let alert = MessageAlert::from_message(&msg, 80);
        assert_eq!(alert.preview.chars().count(), 81);
        assert!(alert.preview.ends_with('…'));
    }

    #[test]
    fn test_preview_respects_char_boundaries() {
        let msg = Message::new("a_b".to_string(), "a".to_string(), "日本語のテキスト".to_string());
        let alert = MessageAlert::from_message(&msg, 4);
        assert_eq!(alert.preview, "日本語の…");
    }
}
