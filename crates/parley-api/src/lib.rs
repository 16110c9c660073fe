pub mod auth;
pub mod chats;
pub mod error;
pub mod lists;
pub mod messages;
pub mod middleware;
pub mod router;
