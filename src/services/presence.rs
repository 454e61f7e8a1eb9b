use crate::models::websocket::ServerEvent;
use parking_lot::RwLock;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::debug;

/// 在线连接的推送句柄
/// 推送走无界通道，永不阻塞调用方；连接关闭后的发送失败被静默忽略
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    connection_id: String,
    tx: mpsc::UnboundedSender<ServerEvent>,
}

impl ConnectionHandle {
    pub fn new(connection_id: String, tx: mpsc::UnboundedSender<ServerEvent>) -> Self {
        Self { connection_id, tx }
    }

    pub fn connection_id(&self) -> &str {
        &self.connection_id
    }

    /// 非阻塞、尽力而为的推送
    pub fn push(&self, event: ServerEvent) {
        if self.tx.send(event).is_err() {
            debug!(
                "Dropped event for closing connection: {}",
                self.connection_id
            );
        }
    }
}

/// register 的结果，调用方据此决定是否广播名单
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOutcome {
    /// 用户上线（此前不在名单中）
    Registered,
    /// 绑定被替换（同一用户的新连接顶掉旧连接）
    Replaced,
    /// 完全相同的 (user, connection) 重复注册，严格无操作
    Unchanged,
}

/// 在线注册表：用户身份 ↔ 活跃连接的双射
///
/// 策略：每个用户至多一个连接。第二个标签页/设备注册时会顶掉
/// 第一个的绑定，这是有意的简化，不是实现疏漏。
/// 反向同样成立：一个连接至多绑定一个用户，重复握手把连接
/// 切换到新用户时会先清掉旧用户的条目。
///
/// register 是先扫描后插入的非原子序列，所有读-写路径都在
/// 一次写锁内完成；广播只在锁内做快照，推送发生在锁外。
pub struct PresenceRegistry {
    entries: RwLock<HashMap<String, ConnectionHandle>>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// 建立或替换 user_id 的在线绑定
    ///
    /// 先移除映射同一用户（旧连接）或同一连接（重复握手竞争）的
    /// 过期条目以保持双射。对相同 (user, connection) 的重复调用
    /// 返回 Unchanged，调用方不得重复广播：心跳风暴下的重复
    /// 上线广播是正确性问题，不只是浪费。
    pub fn register(&self, user_id: &str, handle: ConnectionHandle) -> RegisterOutcome {
        let mut entries = self.entries.write();

        if let Some(existing) = entries.get(user_id) {
            if existing.connection_id == handle.connection_id {
                return RegisterOutcome::Unchanged;
            }
        }

        // 同一连接之前绑定过别的用户：先清掉那条
        let stale_users: Vec<String> = entries
            .iter()
            .filter(|(_, h)| h.connection_id == handle.connection_id)
            .map(|(user, _)| user.clone())
            .collect();
        let evicted_other = !stale_users.is_empty();
        for user in stale_users {
            entries.remove(&user);
        }

        let replaced_own = entries.insert(user_id.to_string(), handle).is_some();

        if replaced_own || evicted_other {
            RegisterOutcome::Replaced
        } else {
            RegisterOutcome::Registered
        }
    }

    /// 查找用户的活跃连接
    pub fn lookup(&self, user_id: &str) -> Option<ConnectionHandle> {
        self.entries.read().get(user_id).cloned()
    }

    /// 按连接移除绑定，返回被释放的用户ID供调用方广播下线
    pub fn unregister(&self, connection_id: &str) -> Option<String> {
        let mut entries = self.entries.write();

        let user_id = entries
            .iter()
            .find(|(_, h)| h.connection_id == connection_id)
            .map(|(user, _)| user.clone())?;

        entries.remove(&user_id);
        Some(user_id)
    }

    /// 在线用户名单快照
    pub fn roster(&self) -> Vec<String> {
        let mut users: Vec<String> = self.entries.read().keys().cloned().collect();
        users.sort();
        users
    }

    /// 名单与全部连接句柄的一致快照，供锁外扇出使用
    pub fn snapshot(&self) -> (Vec<String>, Vec<ConnectionHandle>) {
        let entries = self.entries.read();
        let mut users: Vec<String> = entries.keys().cloned().collect();
        users.sort();
        let handles = entries.values().cloned().collect();
        (users, handles)
    }

    pub fn is_online(&self, user_id: &str) -> bool {
        self.entries.read().contains_key(user_id)
    }

    pub fn online_count(&self) -> usize {
        self.entries.read().len()
    }
}

impl Default for PresenceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(connection_id: &str) -> (ConnectionHandle, mpsc::UnboundedReceiver<ServerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ConnectionHandle::new(connection_id.to_string(), tx), rx)
    }

    #[test]
    fn test_register_new_user() {
        let registry = PresenceRegistry::new();
        let (conn, _rx) = handle("conn-1");

        assert_eq!(registry.register("alice", conn), RegisterOutcome::Registered);
        assert!(registry.is_online("alice"));
        assert_eq!(registry.roster(), vec!["alice"]);
    }

    #[test]
    fn test_register_is_idempotent_for_same_pair() {
        let registry = PresenceRegistry::new();
        let (conn, _rx) = handle("conn-1");

        assert_eq!(
            registry.register("alice", conn.clone()),
            RegisterOutcome::Registered
        );
        assert_eq!(registry.register("alice", conn), RegisterOutcome::Unchanged);
        assert_eq!(registry.online_count(), 1);
    }

    #[test]
    fn test_second_connection_evicts_first() {
        let registry = PresenceRegistry::new();
        let (first, mut first_rx) = handle("conn-1");
        let (second, mut second_rx) = handle("conn-2");

        registry.register("alice", first);
        assert_eq!(registry.register("alice", second), RegisterOutcome::Replaced);

        assert_eq!(registry.online_count(), 1);

        // 投递只会到达最近的连接
        let bound = registry.lookup("alice").unwrap();
        bound.push(ServerEvent::Typing {
            sender_id: "bob".to_string(),
        });
        assert!(second_rx.try_recv().is_ok());
        assert!(first_rx.try_recv().is_err());
    }

    #[test]
    fn test_rebinding_connection_to_new_user_clears_old_entry() {
        let registry = PresenceRegistry::new();
        let (conn, _rx) = handle("conn-1");

        registry.register("alice", conn.clone());
        assert_eq!(registry.register("bob", conn), RegisterOutcome::Replaced);

        assert!(!registry.is_online("alice"));
        assert!(registry.is_online("bob"));
        assert_eq!(registry.online_count(), 1);
    }

    #[test]
    fn test_unregister_returns_freed_user() {
        let registry = PresenceRegistry::new();
        let (conn, _rx) = handle("conn-1");

        registry.register("alice", conn);
        assert_eq!(registry.unregister("conn-1"), Some("alice".to_string()));
        assert!(!registry.is_online("alice"));
        assert_eq!(registry.unregister("conn-1"), None);
    }

    #[test]
    fn test_unregister_ignores_superseded_connection() {
        let registry = PresenceRegistry::new();
        let (first, _rx1) = handle("conn-1");
        let (second, _rx2) = handle("conn-2");

        registry.register("alice", first);
        registry.register("alice", second);

        // 被顶掉的旧连接断开时不能把新的绑定清掉
        assert_eq!(registry.unregister("conn-1"), None);
        assert!(registry.is_online("alice"));
    }

    #[test]
    fn test_roster_is_sorted() {
        let registry = PresenceRegistry::new();
        let (a, _rx1) = handle("conn-1");
        let (b, _rx2) = handle("conn-2");
        let (c, _rx3) = handle("conn-3");

        registry.register("carol", a);
        registry.register("alice", b);
        registry.register("bob", c);

        assert_eq!(registry.roster(), vec!["alice", "bob", "carol"]);
    }

    #[test]
    fn test_push_to_closed_connection_is_silent() {
        let (conn, rx) = handle("conn-1");
        drop(rx);

        // 不 panic、不报错
        conn.push(ServerEvent::OnlineUsers { users: vec![] });
    }
}
