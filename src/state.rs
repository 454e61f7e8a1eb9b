use crate::{
    config::Config,
    services::{
        auth::AuthService, database::Database, message::MessageService,
        notification::NotificationService, post::PostService, realtime::RealtimeService,
        user::UserService,
    },
};

/// 应用程序的共享状态
/// 包含所有服务和配置的引用
#[derive(Clone)]
pub struct AppState {
    /// 应用配置
    pub config: Config,

    /// 数据库连接
    pub db: Database,

    /// 认证服务
    pub auth_service: AuthService,

    /// 用户与关注服务
    pub user_service: UserService,

    /// 帖子服务
    pub post_service: PostService,

    /// 私信服务
    pub message_service: MessageService,

    /// 通知服务
    pub notification_service: NotificationService,

    /// 实时网关
    pub realtime_service: RealtimeService,
}

impl AppState {
    /// 检查是否为生产环境
    pub fn is_production(&self) -> bool {
        self.config.is_production()
    }

    /// 检查是否为开发环境
    pub fn is_development(&self) -> bool {
        self.config.is_development()
    }
}
