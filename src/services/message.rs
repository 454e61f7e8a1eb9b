use crate::{
    config::Config,
    error::{AppError, Result},
    models::{
        message::{
            conversation_key, Conversation, ConversationResponse, Message, MessageAlert,
            MessageResponse, SendMessageRequest,
        },
        user::{User, UserSummary},
    },
    services::{Database, RealtimeService},
};
use chrono::Utc;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};
use validator::Validate;

#[derive(Clone)]
pub struct MessageService {
    db: Arc<Database>,
    realtime: RealtimeService,
    config: Config,
}

impl MessageService {
    pub async fn new(db: Arc<Database>, realtime: RealtimeService, config: &Config) -> Result<Self> {
        Ok(Self {
            db,
            realtime,
            config: config.clone(),
        })
    }

    /// 发送私信
    ///
    /// 持久化在前、投递在后：REST 响应只取决于存储结果，
    /// 推送是否送达不影响返回值。自己发给自己不产生任何提醒。
    pub async fn send_message(
        &self,
        sender_id: &str,
        request: SendMessageRequest,
    ) -> Result<MessageResponse> {
        request.validate()?;

        if request.text.trim().is_empty() {
            return Err(AppError::validation("Message text cannot be empty"));
        }

        let receiver: User = self
            .db
            .get_by_id("user", &request.receiver_id)
            .await?
            .ok_or_else(|| AppError::not_found("User"))?;

        let sender: User = self
            .db
            .get_by_id("user", sender_id)
            .await?
            .ok_or_else(|| AppError::not_found("User"))?;

        let conversation = self
            .find_or_create_conversation(sender_id, &receiver.id)
            .await?;

        let message = Message::new(
            conversation.id.clone(),
            sender_id.to_string(),
            request.text,
        );
        let created = self.db.create("message", message).await?;

        let _: Option<Conversation> = self
            .db
            .update_by_id_with_json(
                "conversation",
                &conversation.id,
                json!({
                    "last_message_id": created.id,
                    "updated_at": Utc::now()
                }),
            )
            .await?;

        info!(
            "User {} sent message {} in conversation {}",
            sender_id, created.id, conversation.id
        );

        let response = MessageResponse {
            id: created.id.clone(),
            conversation_id: created.conversation_id.clone(),
            sender: sender.summary(),
            text: created.text.clone(),
            read: created.read,
            created_at: created.created_at,
        };

        if receiver.id != sender_id {
            let alert = MessageAlert::from_message(&created, self.config.message_preview_length);
            self.realtime.deliver_message(&receiver.id, &response, alert);
        }

        Ok(response)
    }

    /// 无序参与者对的原子 find-or-create
    ///
    /// 会话记录ID由规范化的参与者对键决定，存储层的记录ID唯一性
    /// 提供原子保证：两端同时发起首次私信时，后到的 CREATE 会
    /// 因记录已存在而失败，改为读取既有记录。不用先查再写。
    async fn find_or_create_conversation(&self, a: &str, b: &str) -> Result<Conversation> {
        let key = conversation_key(a, b);
        let conversation = Conversation::new(a, b);

        let mut response = self
            .db
            .query_with_params(
                "CREATE type::thing('conversation', $key) CONTENT $data",
                json!({ "key": key, "data": conversation }),
            )
            .await?;

        let created: std::result::Result<Vec<Conversation>, surrealdb::Error> = response.take(0);
        match created {
            Ok(mut rows) if !rows.is_empty() => Ok(rows.remove(0)),
            Ok(_) => self.require_conversation(&key).await,
            Err(e) if e.to_string().contains("already exists") => {
                debug!("Conversation {} already exists, fetching", key);
                self.require_conversation(&key).await
            }
            Err(e) => Err(AppError::from(e)),
        }
    }

    async fn require_conversation(&self, conversation_id: &str) -> Result<Conversation> {
        self.db
            .get_by_id("conversation", conversation_id)
            .await?
            .ok_or_else(|| AppError::not_found("Conversation"))
    }

    /// 用户的会话列表，按最近活动倒序
    pub async fn list_conversations(&self, user_id: &str) -> Result<Vec<ConversationResponse>> {
        debug!("Listing conversations for user: {}", user_id);

        let mut response = self
            .db
            .query_with_params(
                "SELECT * FROM conversation WHERE participants CONTAINS $user_id ORDER BY updated_at DESC",
                json!({ "user_id": user_id }),
            )
            .await?;
        let conversations: Vec<Conversation> = response.take(0)?;

        let mut users = HashMap::new();
        let mut result = Vec::new();
        for conversation in conversations {
            let mut participants = Vec::new();
            for participant_id in &conversation.participants {
                if let Some(summary) = self.user_summary(participant_id, &mut users).await? {
                    participants.push(summary);
                }
            }

            let last_message = match &conversation.last_message_id {
                Some(message_id) => {
                    let message: Option<Message> = self.db.get_by_id("message", message_id).await?;
                    match message {
                        Some(message) => self.resolve_message(message, &mut users).await?,
                        None => None,
                    }
                }
                None => None,
            };

            let unread_count = self.unread_count(&conversation.id, user_id).await?;

            result.push(ConversationResponse {
                id: conversation.id,
                participants,
                last_message,
                unread_count,
                updated_at: conversation.updated_at,
            });
        }

        Ok(result)
    }

    /// 拉取会话消息，按时间正序
    ///
    /// 作为副作用，会话中发送方不是请求者的未读消息会被标记为
    /// 已读。读操作耦合写操作是有意为之：它是在没有独立回执协议
    /// 的情况下维持未读角标准确的唯一机制。
    pub async fn list_messages(
        &self,
        conversation_id: &str,
        requester_id: &str,
    ) -> Result<Vec<MessageResponse>> {
        let conversation = self.require_conversation(conversation_id).await?;

        if !conversation.has_participant(requester_id) {
            return Err(AppError::forbidden(
                "You are not a participant in this conversation",
            ));
        }

        self.mark_messages_read(&conversation.id, requester_id).await?;

        let mut response = self
            .db
            .query_with_params(
                "SELECT * FROM message WHERE conversation_id = $conversation_id ORDER BY created_at ASC",
                json!({ "conversation_id": conversation.id }),
            )
            .await?;
        let messages: Vec<Message> = response.take(0)?;

        let mut users = HashMap::new();
        let mut result = Vec::new();
        for message in messages {
            if let Some(resolved) = self.resolve_message(message, &mut users).await? {
                result.push(resolved);
            }
        }

        Ok(result)
    }

    /// 显式的已读标记（同一读状态转换的主动触发变体）
    pub async fn mark_read(&self, conversation_id: &str, requester_id: &str) -> Result<()> {
        let conversation = self.require_conversation(conversation_id).await?;

        if !conversation.has_participant(requester_id) {
            return Err(AppError::forbidden(
                "You are not a participant in this conversation",
            ));
        }

        self.mark_messages_read(&conversation.id, requester_id).await
    }

    /// read 只从 false 变 true，且只针对发送方不是读者的消息
    async fn mark_messages_read(&self, conversation_id: &str, reader_id: &str) -> Result<()> {
        self.db
            .query_with_params(
                r#"
                    UPDATE message SET read = true
                    WHERE conversation_id = $conversation_id
                    AND sender_id != $reader_id
                    AND read = false
                "#,
                json!({
                    "conversation_id": conversation_id,
                    "reader_id": reader_id
                }),
            )
            .await?;
        Ok(())
    }

    /// 未读数完全由未读消息行派生，这是未读角标的唯一权威来源
    async fn unread_count(&self, conversation_id: &str, user_id: &str) -> Result<i64> {
        let mut response = self
            .db
            .query_with_params(
                r#"
                    SELECT count() AS count FROM message
                    WHERE conversation_id = $conversation_id
                    AND sender_id != $user_id
                    AND read = false
                    GROUP ALL
                "#,
                json!({
                    "conversation_id": conversation_id,
                    "user_id": user_id
                }),
            )
            .await?;
        let rows: Vec<Value> = response.take(0)?;

        Ok(rows
            .first()
            .and_then(|v| v.get("count"))
            .and_then(|v| v.as_i64())
            .unwrap_or(0))
    }

    async fn resolve_message(
        &self,
        message: Message,
        users: &mut HashMap<String, UserSummary>,
    ) -> Result<Option<MessageResponse>> {
        let sender = match self.user_summary(&message.sender_id, users).await? {
            Some(sender) => sender,
            None => return Ok(None),
        };

        Ok(Some(MessageResponse {
            id: message.id,
            conversation_id: message.conversation_id,
            sender,
            text: message.text,
            read: message.read,
            created_at: message.created_at,
        }))
    }

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
