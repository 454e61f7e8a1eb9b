pub mod auth;
pub mod posts;
pub mod profile;
pub mod messages;
pub mod notifications;
pub mod websocket;
