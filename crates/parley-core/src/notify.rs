use std::sync::Arc;

use parley_db::{Database, queries};
use parley_types::models::Notification;
use rusqlite::Connection;
use tracing::debug;

use crate::convert::notification_from_row;
use crate::error::{DomainError, Entity};

/// Unread markers: one row per (message, recipient).
pub struct NotificationHub {
    db: Arc<Database>,
}

impl NotificationHub {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Notify every current member of `chat_id` except `actor` about
    /// `message_id`. Returns the number of notifications written.
    pub fn fan_out(&self, message_id: i64, chat_id: i64, actor: &str) -> Result<usize, DomainError> {
        self.db.with_tx(|tx| {
            match queries::get_message(tx, message_id)? {
                Some(row) if row.chat_id == chat_id => {}
                _ => return Err(DomainError::not_found(Entity::Message, message_id)),
            }
            Self::fan_out_in(tx, message_id, chat_id, actor)
        })
    }

    /// Clear `viewer`'s notifications for messages in `chat_id`.
    pub fn clear(&self, viewer: &str, chat_id: i64) -> Result<usize, DomainError> {
        self.db.with_tx(|tx| Self::clear_in(tx, viewer, chat_id))
    }

    /// Outstanding notifications for `login`, newest first.
    pub fn pending_for(&self, login: &str) -> Result<Vec<Notification>, DomainError> {
        let rows = self
            .db
            .with_conn(|conn| queries::notifications_for(conn, login))?;
        Ok(rows.into_iter().map(notification_from_row).collect())
    }

    /// Logins currently holding a notification for `message_id`.
    pub fn recipients(&self, message_id: i64) -> Result<Vec<String>, DomainError> {
        Ok(self
            .db
            .with_conn(|conn| queries::notification_recipients(conn, message_id))?)
    }

    pub(crate) fn fan_out_in(
        conn: &Connection,
        message_id: i64,
        chat_id: i64,
        actor: &str,
    ) -> Result<usize, DomainError> {
        let n = queries::insert_notifications(conn, message_id, chat_id, actor)?;
        debug!("Fan-out for message {} in chat {}: {} recipients", message_id, chat_id, n);
        Ok(n)
    }

    /// Replace the notification set of an edited message with one built from
    /// the membership as it stands now.
    pub(crate) fn regenerate_in(
        conn: &Connection,
        message_id: i64,
        chat_id: i64,
        actor: &str,
    ) -> Result<usize, DomainError> {
        queries::delete_notifications_for_message(conn, message_id)?;
        Self::fan_out_in(conn, message_id, chat_id, actor)
    }

    pub(crate) fn clear_in(conn: &Connection, viewer: &str, chat_id: i64) -> Result<usize, DomainError> {
        let n = queries::clear_notifications(conn, viewer, chat_id)?;
        if n > 0 {
            debug!("Cleared {} notifications for {} in chat {}", n, viewer, chat_id);
        }
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chats::ChatDirectory;
    use crate::ledger::MessageLedger;
    use crate::testutil::{seed_users, test_db};
    use parley_types::models::MessageDraft;

    struct Fixture {
        hub: NotificationHub,
        chats: ChatDirectory,
        ledger: MessageLedger,
    }

    fn fixture() -> Fixture {
        let db = test_db();
        seed_users(&db, &["alice", "bob", "dave"]);
        Fixture {
            hub: NotificationHub::new(db.clone()),
            chats: ChatDirectory::new(db.clone()),
            ledger: MessageLedger::new(db),
        }
    }

    #[test]
    fn test_create_notifies_everyone_but_author() {
        let f = fixture();
        let chat = f.chats.create_chat("alice").unwrap();
        f.chats.add_member(chat, "alice", "bob").unwrap();
        f.chats.add_member(chat, "alice", "dave").unwrap();

        let msg = f.ledger.create(chat, "alice", &MessageDraft::text("hello")).unwrap();
        assert_eq!(f.hub.recipients(msg).unwrap(), vec!["bob", "dave"]);
        assert!(f.hub.pending_for("alice").unwrap().is_empty());
    }

    #[test]
    fn test_clear_only_touches_viewer_and_chat() {
        let f = fixture();
        let first = f.chats.create_chat("alice").unwrap();
        f.chats.add_member(first, "alice", "bob").unwrap();
        f.chats.add_member(first, "alice", "dave").unwrap();
        let second = f.chats.create_chat("dave").unwrap();
        f.chats.add_member(second, "dave", "bob").unwrap();

        f.ledger.create(first, "alice", &MessageDraft::text("one")).unwrap();
        f.ledger.create(second, "dave", &MessageDraft::text("two")).unwrap();
        assert_eq!(f.hub.pending_for("bob").unwrap().len(), 2);

        assert_eq!(f.hub.clear("bob", first).unwrap(), 1);

        let left = f.hub.pending_for("bob").unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].chat_id, second);
        assert_eq!(left[0].sender, "dave");
        assert_eq!(f.hub.pending_for("dave").unwrap().len(), 1);
    }

    #[test]
    fn test_fan_out_uses_current_membership() {
        let f = fixture();
        let chat = f.chats.create_chat("alice").unwrap();
        f.chats.add_member(chat, "alice", "bob").unwrap();
        let msg = f.ledger.create(chat, "alice", &MessageDraft::text("hi")).unwrap();

        f.chats.add_member(chat, "alice", "dave").unwrap();

        // bob already holds one; only dave is new
        assert_eq!(f.hub.fan_out(msg, chat, "alice").unwrap(), 1);
        assert_eq!(f.hub.recipients(msg).unwrap(), vec!["bob", "dave"]);
    }

    #[test]
    fn test_fan_out_rejects_foreign_message() {
        let f = fixture();
        let chat = f.chats.create_chat("alice").unwrap();
        let other = f.chats.create_chat("bob").unwrap();
        let msg = f.ledger.create(chat, "alice", &MessageDraft::text("hi")).unwrap();

        assert!(matches!(
            f.hub.fan_out(msg, other, "alice"),
            Err(DomainError::NotFound { entity: Entity::Message, .. })
        ));
    }
}
