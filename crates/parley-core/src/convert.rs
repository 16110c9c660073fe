use chrono::{DateTime, Utc};
use parley_db::models::{ChatSummaryRow, MessageRow, NotificationRow};
use parley_types::models::{ChatKind, ChatSummary, MediaAttachment, Message, Notification};
use tracing::warn;

pub(crate) fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_else(|| {
        warn!("Corrupt timestamp {} in store", ms);
        DateTime::default()
    })
}

pub(crate) fn message_from_row(row: MessageRow) -> Message {
    let media = match (row.media_type, row.url) {
        (Some(media_type), Some(url)) => Some(MediaAttachment { media_type, url }),
        _ => None,
    };

    Message {
        id: row.msg_id,
        chat_id: row.chat_id,
        author: row.sender_login,
        body: row.msg_text,
        created_at: from_millis(row.msg_timestamp),
        edited_at: row.edited_at.map(from_millis),
        expires_at: row.destr_timestamp.map(from_millis),
        media,
    }
}

pub(crate) fn notification_from_row(row: NotificationRow) -> Notification {
    Notification {
        message_id: row.msg_id,
        chat_id: row.chat_id,
        sender: row.sender_login,
        sent_at: from_millis(row.msg_timestamp),
    }
}

pub(crate) fn summary_from_row(row: ChatSummaryRow) -> ChatSummary {
    let member_count = usize::try_from(row.member_count).unwrap_or_default();
    ChatSummary {
        id: row.chat_id,
        kind: ChatKind::from_member_count(member_count),
        initiator: row.init_sender,
        member_count,
        last_activity: row.last_activity.map(from_millis),
    }
}
