/// Database row types. These map directly to SQLite rows and stay
/// independent of the serde models in parley-types.
/// Timestamps are Unix milliseconds.

pub struct UserRow {
    pub login: String,
    pub password: String,
    pub phone_num: String,
    pub status: Option<String>,
    pub contact_list: i64,
    pub block_list: i64,
}

pub struct ListMemberRow {
    pub login: String,
    pub status: Option<String>,
}

pub struct ChatRow {
    pub chat_id: i64,
    pub chat_type: String,
    pub init_sender: String,
}

pub struct ChatSummaryRow {
    pub chat_id: i64,
    pub init_sender: String,
    pub member_count: i64,
    pub last_activity: Option<i64>,
}

pub struct MessageRow {
    pub msg_id: i64,
    pub chat_id: i64,
    pub sender_login: String,
    pub msg_text: String,
    pub msg_timestamp: i64,
    pub edited_at: Option<i64>,
    pub destr_timestamp: Option<i64>,
    pub media_type: Option<String>,
    pub url: Option<String>,
}

pub struct NotificationRow {
    pub msg_id: i64,
    pub chat_id: i64,
    pub sender_login: String,
    pub msg_timestamp: i64,
}
