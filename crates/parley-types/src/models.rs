use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Chats with fewer members than this are private; the rest are groups.
pub const GROUP_THRESHOLD: usize = 3;

/// Page size used when a caller does not ask for one.
pub const DEFAULT_WINDOW_SIZE: u32 = 10;

/// Upper bound on a single history page.
pub const MAX_WINDOW_SIZE: u32 = 100;

/// The acting user, as established by whoever authenticated the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub login: String,
}

impl Session {
    pub fn new(login: impl Into<String>) -> Self {
        Self {
            login: login.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub login: String,
    pub phone_num: String,
    pub status: Option<String>,
}

/// How a caller names another user: by login or by phone number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRef {
    Login(String),
    Phone(String),
}

impl fmt::Display for UserRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Login(login) => write!(f, "{}", login),
            Self::Phone(phone) => write!(f, "phone {}", phone),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListKind {
    Contact,
    Block,
}

impl ListKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Contact => "contact",
            Self::Block => "block",
        }
    }
}

impl fmt::Display for ListKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListMember {
    pub login: String,
    pub status: Option<String>,
}

/// Derived from the live member count, never from a stored flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatKind {
    Private,
    Group,
}

impl ChatKind {
    pub fn from_member_count(count: usize) -> Self {
        if count < GROUP_THRESHOLD {
            Self::Private
        } else {
            Self::Group
        }
    }

    /// Value written to the `chat.chat_type` column.
    pub fn as_db_str(&self) -> &'static str {
        match self {
            Self::Private => "Private",
            Self::Group => "Public",
        }
    }
}


/// One row of a user's chat listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSummary {
    pub id: i64,
    pub kind: ChatKind,
    pub initiator: String,
    pub member_count: usize,
    pub last_activity: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaAttachment {
    pub media_type: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub chat_id: i64,
    pub author: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub edited_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub media: Option<MediaAttachment>,
}

/// Everything needed to post a message, apart from the chat and the author.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageDraft {
    pub body: String,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub media: Option<MediaAttachment>,
}

impl MessageDraft {
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            ..Self::default()
        }
    }

    pub fn expires_at(mut self, at: DateTime<Utc>) -> Self {
        self.expires_at = Some(at);
        self
    }

    pub fn with_media(mut self, media_type: impl Into<String>, url: impl Into<String>) -> Self {
        self.media = Some(MediaAttachment {
            media_type: media_type.into(),
            url: url.into(),
        });
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub message_id: i64,
    pub chat_id: i64,
    pub sender: String,
    pub sent_at: DateTime<Utc>,
}

/// A fixed-size slice of a chat's history, counted from the newest message.
///
/// Offsets never error: they are clamped to the available range when a page
/// is fetched, so stepping past either end simply stays on the last page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageWindow {
    pub offset: u32,
    pub size: u32,
}

impl Default for MessageWindow {
    fn default() -> Self {
        Self::newest(DEFAULT_WINDOW_SIZE)
    }
}

impl MessageWindow {
    pub fn new(offset: u32, size: u32) -> Self {
        Self {
            offset,
            size: size.clamp(1, MAX_WINDOW_SIZE),
        }
    }

    pub fn newest(size: u32) -> Self {
        Self::new(0, size)
    }

    pub fn older(self) -> Self {
        Self::new(self.offset.saturating_add(self.size), self.size)
    }

    pub fn newer(self) -> Self {
        Self::new(self.offset.saturating_sub(self.size), self.size)
    }

    /// Pull the offset back so the window ends no later than the oldest message.
    pub fn clamp_to(self, total: u32) -> Self {
        let last_start = total.saturating_sub(self.size);
        Self::new(self.offset.min(last_start), self.size)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagePage {
    /// Newest first.
    pub messages: Vec<Message>,
    pub window: MessageWindow,
    pub total: u32,
}

impl MessagePage {
    pub fn has_older(&self) -> bool {
        self.window.offset.saturating_add(self.window.size) < self.total
    }

    pub fn has_newer(&self) -> bool {
        self.window.offset > 0
    }
}
