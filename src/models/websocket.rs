use serde::{Deserialize, Serialize};

use crate::models::message::MessageAlert;

/// 客户端 → 服务端事件
/// 畸形或未授权的事件会被静默丢弃，通道上没有错误响应
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    /// 握手：把当前连接绑定到一个用户身份
    Register { user_id: String },
    /// 点对点转发一条已经持久化的消息（打开的聊天窗口直接中继）
    SendMessage {
        receiver_id: String,
        message: serde_json::Value,
    },
    /// 输入提示，仅在接收方在线时转发
    Typing {
        receiver_id: String,
        sender_id: String,
    },
    /// 按需拉取在线名单
    GetOnlineUsers,
}

/// 服务端 → 客户端事件
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// 完整在线名单广播（不做增量 online/offline，避免乱序竞争）
    OnlineUsers { users: Vec<String> },
    /// 完整消息推送（发送方资料已解析）
    ReceiveMessage { message: serde_json::Value },
    /// 未读角标提醒，与 ReceiveMessage 是两个独立通道
    NewMessageAlert(MessageAlert),
    Typing { sender_id: String },
    /// 持久化通知的实时推送
    NewNotification { notification: serde_json::Value },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_client_event_vocabulary() {
        let event: ClientEvent = serde_json::from_value(json!({
            "event": "register",
            "data": { "user_id": "user-1" }
        }))
        .unwrap();
        assert!(matches!(event, ClientEvent::Register { user_id } if user_id == "user-1"));

        let event: ClientEvent = serde_json::from_value(json!({
            "event": "typing",
            "data": { "receiver_id": "user-2", "sender_id": "user-1" }
        }))
        .unwrap();
        assert!(matches!(event, ClientEvent::Typing { .. }));

        let event: ClientEvent = serde_json::from_value(json!({
            "event": "get-online-users"
        }))
        .unwrap();
        assert!(matches!(event, ClientEvent::GetOnlineUsers));
    }

    #[test]
    fn test_server_event_names_are_kebab_case() {
        let roster = ServerEvent::OnlineUsers {
            users: vec!["user-1".to_string()],
        };
        let value = serde_json::to_value(&roster).unwrap();
        assert_eq!(value["event"], "online-users");
        assert_eq!(value["data"]["users"][0], "user-1");

        let alert = ServerEvent::NewMessageAlert(MessageAlert {
            conversation_id: "a_b".to_string(),
            sender_id: "a".to_string(),
            preview: "hi".to_string(),
        });
        let value = serde_json::to_value(&alert).unwrap();
        assert_eq!(value["event"], "new-message-alert");
        assert_eq!(value["data"]["preview"], "hi");
    }

    #[test]
    fn test_malformed_event_fails_to_parse() {
        let result: std::result::Result<ClientEvent, _> =
            serde_json::from_str("{\"event\": \"unknown-event\"}");
        assert!(result.is_err());
    }
}
