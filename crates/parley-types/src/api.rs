use serde::{Deserialize, Serialize};

use crate::models::{MessageDraft, MessagePage};

// -- JWT Claims --

/// Token claims; `sub` is the user's login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub login: String,
    pub phone: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub login: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub login: String,
    pub token: String,
}

// -- Account --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SetStatusRequest {
    pub status: Option<String>,
}

// -- Chats --

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatCreatedResponse {
    pub chat_id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddChatMemberRequest {
    pub login: String,
}

// -- Messages --

pub type SendMessageRequest = MessageDraft;

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageCreatedResponse {
    pub message_id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EditMessageRequest {
    pub body: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    #[serde(flatten)]
    pub page: MessagePage,
    pub has_older: bool,
    pub has_newer: bool,
}

impl From<MessagePage> for HistoryResponse {
    fn from(page: MessagePage) -> Self {
        Self {
            has_older: page.has_older(),
            has_newer: page.has_newer(),
            page,
        }
    }
}

// -- Errors --

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub kind: String,
    pub message: String,
}
