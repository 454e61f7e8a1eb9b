pub mod user;
pub mod post;
pub mod message;
pub mod notification;
pub mod websocket;
