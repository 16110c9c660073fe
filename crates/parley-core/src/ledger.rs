use std::sync::Arc;

use chrono::{DateTime, Utc};
use parley_db::models::MessageRow;
use parley_db::{Database, queries};
use parley_types::models::{MessageDraft, MessagePage, MessageWindow};
use rusqlite::Connection;
use tracing::{debug, info};

use crate::chats::{load_chat, require_member};
use crate::convert::message_from_row;
use crate::error::{DomainError, Entity};
use crate::notify::NotificationHub;

/// Message history of every chat.
///
/// Lifecycle of a message: active until its author deletes it, or until its
/// expiry passes and someone next opens the chat. Expired messages are
/// hidden from every read as soon as the expiry passes, whether or not they
/// have been purged yet.
pub struct MessageLedger {
    db: Arc<Database>,
}

impl MessageLedger {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Post a message as `author`, who must currently belong to the chat.
    /// The notification fan-out commits with the message or not at all.
    pub fn create(&self, chat_id: i64, author: &str, draft: &MessageDraft) -> Result<i64, DomainError> {
        self.db.with_tx(|tx| {
            load_chat(tx, chat_id)?;
            require_member(tx, chat_id, author)?;
            Self::record_in(tx, chat_id, author, draft, Utc::now())
        })
    }

    /// Replace the body of one of `author`'s messages and re-notify the
    /// chat's current members.
    pub fn edit(&self, message_id: i64, author: &str, new_body: &str) -> Result<(), DomainError> {
        let now = Utc::now();
        self.db.with_tx(|tx| {
            let row = owned_message(tx, message_id, author, now)?;

            queries::update_message_text(tx, message_id, new_body, now.timestamp_millis())?;
            NotificationHub::regenerate_in(tx, message_id, row.chat_id, author)?;

            info!("Message {} edited by {}", message_id, author);
            Ok(())
        })
    }

    /// Delete one of `author`'s messages along with its notifications.
    pub fn delete(&self, message_id: i64, author: &str) -> Result<(), DomainError> {
        let now = Utc::now();
        self.db.with_tx(|tx| {
            owned_message(tx, message_id, author, now)?;
            queries::delete_message(tx, message_id)?;

            info!("Message {} deleted by {}", message_id, author);
            Ok(())
        })
    }

    /// One window of the history `viewer` is allowed to see, newest first.
    pub fn list_visible(
        &self,
        chat_id: i64,
        viewer: &str,
        window: MessageWindow,
    ) -> Result<MessagePage, DomainError> {
        self.db
            .with_tx(|tx| Self::list_visible_in(tx, chat_id, viewer, window, Utc::now()))
    }

    /// Physically remove every message in `chat_id` whose expiry has passed.
    pub fn purge_expired(&self, chat_id: i64) -> Result<usize, DomainError> {
        self.db
            .with_tx(|tx| Self::purge_expired_in(tx, chat_id, Utc::now()))
    }

    pub(crate) fn record_in(
        conn: &Connection,
        chat_id: i64,
        author: &str,
        draft: &MessageDraft,
        now: DateTime<Utc>,
    ) -> Result<i64, DomainError> {
        let message_id = queries::insert_message(
            conn,
            chat_id,
            author,
            &draft.body,
            now.timestamp_millis(),
            draft.expires_at.map(|at| at.timestamp_millis()),
        )?;

        if let Some(media) = &draft.media {
            queries::insert_media(conn, message_id, &media.media_type, &media.url)?;
        }

        NotificationHub::fan_out_in(conn, message_id, chat_id, author)?;

        debug!("Message {} posted to chat {} by {}", message_id, chat_id, author);
        Ok(message_id)
    }

    pub(crate) fn list_visible_in(
        conn: &Connection,
        chat_id: i64,
        viewer: &str,
        window: MessageWindow,
        now: DateTime<Utc>,
    ) -> Result<MessagePage, DomainError> {
        load_chat(conn, chat_id)?;
        require_member(conn, chat_id, viewer)?;

        let now = now.timestamp_millis();
        let total = queries::count_visible_messages(conn, chat_id, viewer, now)?;
        let total = u32::try_from(total).unwrap_or(u32::MAX);
        let window = window.clamp_to(total);

        let messages = queries::visible_messages(conn, chat_id, viewer, now, window.size, window.offset)?
            .into_iter()
            .map(message_from_row)
            .collect();

        Ok(MessagePage {
            messages,
            window,
            total,
        })
    }

    pub(crate) fn purge_expired_in(
        conn: &Connection,
        chat_id: i64,
        now: DateTime<Utc>,
    ) -> Result<usize, DomainError> {
        let purged = queries::delete_expired_messages(conn, chat_id, now.timestamp_millis())?;
        if purged > 0 {
            info!("Purged {} expired messages from chat {}", purged, chat_id);
        }
        Ok(purged)
    }
}

/// Load a live message and check that `author` wrote it. Messages past their
/// expiry count as gone even before the purge removes them.
fn owned_message(
    conn: &Connection,
    message_id: i64,
    author: &str,
    now: DateTime<Utc>,
) -> Result<MessageRow, DomainError> {
    let row = queries::get_message(conn, message_id)?
        .filter(|row| row.destr_timestamp.is_none_or(|at| at > now.timestamp_millis()))
        .ok_or_else(|| DomainError::not_found(Entity::Message, message_id))?;

    if row.sender_login != author {
        return Err(DomainError::not_authorized(author, Entity::Message, message_id));
    }
    Ok(row)
}
