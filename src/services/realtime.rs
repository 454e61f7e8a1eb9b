use crate::{
    models::{
        message::{MessageAlert, MessageResponse},
        notification::NotificationResponse,
        websocket::{ClientEvent, ServerEvent},
    },
    services::presence::{ConnectionHandle, PresenceRegistry, RegisterOutcome},
};
use axum::extract::ws::{Message as WsMessage, WebSocket};
use futures::{sink::SinkExt, stream::StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info};
use uuid::Uuid;

/// 实时网关
/// 持有在线注册表并负责连接生命周期与三类事件的分发：
/// 在线名单广播、私信/提醒投递、通知投递。
///
/// 所有推送都是尽力而为：接收方不在线就静默丢弃，没有队列、
/// 没有重试。持久化的 Message 和 Notification 记录才是最终
/// 可见性的保证（客户端随后通过 REST 拉取）。
#[derive(Clone)]
pub struct RealtimeService {
    presence: Arc<PresenceRegistry>,
}

impl RealtimeService {
    pub fn new() -> Self {
        Self {
            presence: Arc::new(PresenceRegistry::new()),
        }
    }

    /// 当前在线名单（REST 按需拉取用）
    pub fn roster(&self) -> Vec<String> {
        self.presence.roster()
    }

    /// 处理一条新的 WebSocket 连接，直到断开
    pub async fn handle_connection(&self, socket: WebSocket) {
        let connection_id = format!("conn_{}", Uuid::new_v4());
        info!("New realtime connection: {}", connection_id);

        let (mut ws_tx, mut ws_rx) = socket.split();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = ConnectionHandle::new(connection_id.clone(), tx);

        // 发送任务：把推送事件序列化后写入套接字
        let send_connection_id = connection_id.clone();
        let send_task = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                match serde_json::to_string(&event) {
                    Ok(json_str) => {
                        if ws_tx.send(WsMessage::Text(json_str)).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        error!("Failed to serialize event: {}", e);
                    }
                }
            }
            debug!("Send task ended for connection: {}", send_connection_id);
        });

        // 接收循环：解析客户端事件，畸形输入静默丢弃
        while let Some(msg_result) = ws_rx.next().await {
            match msg_result {
                Ok(WsMessage::Text(text)) => {
                    self.handle_client_event(&handle, &text);
                }
                Ok(WsMessage::Close(_)) => {
                    info!("Realtime connection closed: {}", connection_id);
                    break;
                }
                Ok(WsMessage::Ping(_)) | Ok(WsMessage::Pong(_)) => {}
                Ok(WsMessage::Binary(data)) => {
                    debug!("Ignoring binary frame of {} bytes", data.len());
                }
                Err(e) => {
                    debug!("Realtime connection error on {}: {}", connection_id, e);
                    break;
                }
            }
        }

        // 释放绑定并广播更新后的名单；半路的推送随发送任务一起丢弃
        if let Some(user_id) = self.presence.unregister(&connection_id) {
            info!("User went offline: {}", user_id);
            self.broadcast_roster();
        }
        send_task.abort();
    }

    fn handle_client_event(&self, handle: &ConnectionHandle, text: &str) {
        let event: ClientEvent = match serde_json::from_str(text) {
            Ok(event) => event,
            Err(e) => {
                debug!("Dropping malformed client event: {}", e);
                return;
            }
        };

        match event {
            ClientEvent::Register { user_id } => {
                if user_id.trim().is_empty() {
                    debug!("Dropping register event without user id");
                    return;
                }

                match self.presence.register(&user_id, handle.clone()) {
                    RegisterOutcome::Unchanged => {
                        debug!("Duplicate register for user {} ignored", user_id);
                    }
                    outcome => {
                        info!("User registered: {} ({:?})", user_id, outcome);
                        self.broadcast_roster();
                    }
                }
            }
            ClientEvent::SendMessage {
                receiver_id,
                message,
            } => {
                self.relay_message(&receiver_id, message);
            }
            ClientEvent::Typing {
                receiver_id,
                sender_id,
            } => {
                self.push_typing(&receiver_id, &sender_id);
            }
            ClientEvent::GetOnlineUsers => {
                handle.push(ServerEvent::OnlineUsers {
                    users: self.presence.roster(),
                });
            }
        }
    }

    /// 向所有连接广播完整在线名单
    /// 快照在锁内完成，推送在锁外进行，扇出不会阻塞并发注册
    fn broadcast_roster(&self) {
        let (users, handles) = self.presence.snapshot();
        debug!("Broadcasting roster of {} users to {} connections", users.len(), handles.len());

        for handle in handles {
            handle.push(ServerEvent::OnlineUsers {
                users: users.clone(),
            });
        }
    }

    /// REST 层创建消息后的投递副作用：完整消息 + 独立的角标提醒
    /// 两条推送的载荷和用途不同（打开的聊天窗口 / 全局未读角标），
    /// 客户端可能各自只订阅其一，因此不能合并
    pub fn deliver_message(&self, receiver_id: &str, message: &MessageResponse, alert: MessageAlert) {
        let handle = match self.presence.lookup(receiver_id) {
            Some(handle) => handle,
            None => {
                debug!("Receiver {} not online, dropping message push", receiver_id);
                return;
            }
        };

        match serde_json::to_value(message) {
            Ok(value) => handle.push(ServerEvent::ReceiveMessage { message: value }),
            Err(e) => error!("Failed to encode message push: {}", e),
        }

        handle.push(ServerEvent::NewMessageAlert(alert));
    }

    /// 持久化通知创建后的实时推送
    pub fn push_notification(&self, recipient_id: &str, notification: &NotificationResponse) {
        let handle = match self.presence.lookup(recipient_id) {
            Some(handle) => handle,
            None => {
                debug!(
                    "Recipient {} not online, dropping notification push",
                    recipient_id
                );
                return;
            }
        };

        match serde_json::to_value(notification) {
            Ok(value) => handle.push(ServerEvent::NewNotification {
                notification: value,
            }),
            Err(e) => error!("Failed to encode notification push: {}", e),
        }
    }

    /// 输入提示：仅在接收方在线时转发，无持久化、无回执
    pub fn push_typing(&self, receiver_id: &str, sender_id: &str) {
        if let Some(handle) = self.presence.lookup(receiver_id) {
            handle.push(ServerEvent::Typing {
                sender_id: sender_id.to_string(),
            });
        }
    }

    /// 点对点中继客户端转发的消息载荷
    fn relay_message(&self, receiver_id: &str, payload: serde_json::Value) {
        match self.presence.lookup(receiver_id) {
            Some(handle) => handle.push(ServerEvent::ReceiveMessage { message: payload }),
            None => debug!("Receiver {} not online, dropping relay", receiver_id),
        }
    }
}

impl Default for RealtimeService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::UserSummary;
    use chrono::Utc;
    use serde_json::json;

    fn connect(
        service: &RealtimeService,
        user_id: &str,
        connection_id: &str,
    ) -> mpsc::UnboundedReceiver<ServerEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = ConnectionHandle::new(connection_id.to_string(), tx);
        service.handle_client_event(
            &handle,
            &json!({ "event": "register", "data": { "user_id": user_id } }).to_string(),
        );
        rx
    }

    fn sample_message(receiver: &str) -> MessageResponse {
        MessageResponse {
            id: "msg-1".to_string(),
            conversation_id: format!("alice_{}", receiver),
            sender: UserSummary {
                id: "alice".to_string(),
                name: "Alice".to_string(),
                handle: "alice".to_string(),
                avatar_url: None,
            },
            text: "hi".to_string(),
            read: false,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_register_broadcasts_roster_once() {
        let service = RealtimeService::new();
        let mut rx = connect(&service, "alice", "conn-1");

        let first = rx.try_recv().unwrap();
        assert!(matches!(first, ServerEvent::OnlineUsers { users } if users == vec!["alice"]));

        // 相同 (user, connection) 的重复注册不得再广播
        let (tx, _unused_rx) = mpsc::unbounded_channel();
        let same_connection = ConnectionHandle::new("conn-1".to_string(), tx);
        service.handle_client_event(
            &same_connection,
            &json!({ "event": "register", "data": { "user_id": "alice" } }).to_string(),
        );
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_register_with_empty_user_id_is_dropped() {
        let service = RealtimeService::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = ConnectionHandle::new("conn-1".to_string(), tx);

        service.handle_client_event(
            &handle,
            &json!({ "event": "register", "data": { "user_id": "  " } }).to_string(),
        );

        assert!(service.roster().is_empty());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_malformed_event_is_dropped_silently() {
        let service = RealtimeService::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = ConnectionHandle::new("conn-1".to_string(), tx);

        service.handle_client_event(&handle, "not json at all");
        service.handle_client_event(&handle, "{\"event\": \"unknown\"}");

        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_deliver_message_pushes_message_and_alert() {
        let service = RealtimeService::new();
        let mut rx = connect(&service, "bob", "conn-1");
        let _ = rx.try_recv(); // 注册时的名单广播

        let message = sample_message("bob");
        let alert = MessageAlert {
            conversation_id: message.conversation_id.clone(),
            sender_id: "alice".to_string(),
            preview: "hi".to_string(),
        };
        service.deliver_message("bob", &message, alert.clone());

        let first = rx.try_recv().unwrap();
        assert!(matches!(first, ServerEvent::ReceiveMessage { message } if message["id"] == "msg-1"));

        let second = rx.try_recv().unwrap();
        assert!(matches!(second, ServerEvent::NewMessageAlert(a) if a == alert));
    }

    #[tokio::test]
    async fn test_deliver_message_to_offline_user_is_dropped() {
        let service = RealtimeService::new();
        let message = sample_message("bob");
        let alert = MessageAlert {
            conversation_id: message.conversation_id.clone(),
            sender_id: "alice".to_string(),
            preview: "hi".to_string(),
        };

        // 不在线：静默丢弃，不报错
        service.deliver_message("bob", &message, alert);
    }

    #[tokio::test]
    async fn test_client_send_message_is_relayed_to_receiver() {
        let service = RealtimeService::new();
        let mut bob_rx = connect(&service, "bob", "conn-1");
        let _ = bob_rx.try_recv();

        let (tx, _alice_rx) = mpsc::unbounded_channel();
        let alice = ConnectionHandle::new("conn-2".to_string(), tx);
        service.handle_client_event(
            &alice,
            &json!({
                "event": "send-message",
                "data": {
                    "receiver_id": "bob",
                    "message": { "id": "msg-9", "text": "hey" }
                }
            })
            .to_string(),
        );

        let event = bob_rx.try_recv().unwrap();
        assert!(matches!(event, ServerEvent::ReceiveMessage { message } if message["id"] == "msg-9"));
    }

    #[tokio::test]
    async fn test_typing_relayed_only_to_present_receiver() {
        let service = RealtimeService::new();
        let mut bob_rx = connect(&service, "bob", "conn-1");
        let _ = bob_rx.try_recv();

        service.push_typing("bob", "alice");
        let event = bob_rx.try_recv().unwrap();
        assert!(matches!(event, ServerEvent::Typing { sender_id } if sender_id == "alice"));

        // 不在线的接收方：无事发生
        service.push_typing("carol", "alice");
    }

    #[tokio::test]
    async fn test_get_online_users_returns_roster_to_caller_only() {
        let service = RealtimeService::new();
        let mut alice_rx = connect(&service, "alice", "conn-1");
        let _ = alice_rx.try_recv();

        let (tx, mut anon_rx) = mpsc::unbounded_channel();
        let anon = ConnectionHandle::new("conn-2".to_string(), tx);
        service.handle_client_event(&anon, &json!({ "event": "get-online-users" }).to_string());

        let event = anon_rx.try_recv().unwrap();
        assert!(matches!(event, ServerEvent::OnlineUsers { users } if users == vec!["alice"]));
        assert!(alice_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_roster_broadcast_reaches_all_connections() {
        let service = RealtimeService::new();
        let mut alice_rx = connect(&service, "alice", "conn-1");
        let _ = alice_rx.try_recv();

        let mut bob_rx = connect(&service, "bob", "conn-2");
        let _ = bob_rx.try_recv();

        // bob 上线时 alice 也收到更新后的完整名单
        let event = alice_rx.try_recv().unwrap();
        assert!(
            matches!(event, ServerEvent::OnlineUsers { users } if users == vec!["alice", "bob"])
        );
    }
}
