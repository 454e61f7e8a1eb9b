pub mod database;
pub mod auth;
pub mod user;
pub mod post;
pub mod message;
pub mod notification;
pub mod presence;
pub mod realtime;

// 重新导出常用类型
pub use database::Database;
pub use auth::AuthService;
pub use user::UserService;
pub use post::PostService;
pub use message::MessageService;
pub use notification::NotificationService;
pub use realtime::RealtimeService;
