use std::sync::Arc;

use chrono::Utc;
use parley_db::models::ChatRow;
use parley_db::{Database, is_constraint_violation, queries};
use parley_types::models::{ChatKind, ChatSummary, MessageDraft};
use rusqlite::Connection;
use tracing::{debug, info};

use crate::convert::summary_from_row;
use crate::error::{DomainError, Entity, Scope};
use crate::ledger::MessageLedger;
use crate::notify::NotificationHub;

/// Chats and their membership.
///
/// The user who creates a chat is its only administrator, for as long as the
/// chat exists. Nobody else can change who is in it or delete it.
pub struct ChatDirectory {
    db: Arc<Database>,
}

impl ChatDirectory {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Start a chat with `initiator` as its sole member and administrator.
    pub fn create_chat(&self, initiator: &str) -> Result<i64, DomainError> {
        self.db.with_tx(|tx| {
            if !queries::user_exists(tx, initiator)? {
                return Err(DomainError::not_found(Entity::User, initiator));
            }

            let chat_id = queries::insert_chat(tx, ChatKind::Private.as_db_str(), initiator)?;
            queries::insert_chat_member(tx, chat_id, initiator)?;

            let opening = MessageDraft::text(format!("{} created this chat", initiator));
            MessageLedger::record_in(tx, chat_id, initiator, &opening, Utc::now())?;

            info!("Chat {} created by {}", chat_id, initiator);
            Ok(chat_id)
        })
    }

    pub fn add_member(&self, chat_id: i64, actor: &str, candidate: &str) -> Result<(), DomainError> {
        self.db.with_tx(|tx| {
            let chat = load_chat(tx, chat_id)?;
            require_admin(&chat, actor)?;

            if candidate == actor {
                return Err(DomainError::SelfReference {
                    action: "add",
                    login: actor.to_string(),
                });
            }
            if !queries::user_exists(tx, candidate)? {
                return Err(DomainError::not_found(Entity::User, candidate));
            }

            let already_member = || DomainError::AlreadyMember {
                scope: Scope::Chat(chat_id),
                member: candidate.to_string(),
            };

            if queries::is_chat_member(tx, chat_id, candidate)? {
                return Err(already_member());
            }
            queries::insert_chat_member(tx, chat_id, candidate).map_err(|e| {
                if is_constraint_violation(&e) {
                    already_member()
                } else {
                    DomainError::StoreUnavailable(e)
                }
            })?;

            let kind = reclassify(tx, chat_id)?;
            info!("{} added {} to chat {} (now {:?})", actor, candidate, chat_id, kind);
            Ok(())
        })
    }

    pub fn remove_member(&self, chat_id: i64, actor: &str, candidate: &str) -> Result<(), DomainError> {
        self.db.with_tx(|tx| {
            let chat = load_chat(tx, chat_id)?;
            require_admin(&chat, actor)?;

            // The administrator leaves only by deleting the chat
            if candidate == actor {
                return Err(DomainError::SelfReference {
                    action: "remove",
                    login: actor.to_string(),
                });
            }
            if queries::delete_chat_member(tx, chat_id, candidate)? == 0 {
                return Err(DomainError::NotMember {
                    scope: Scope::Chat(chat_id),
                    member: candidate.to_string(),
                });
            }
            // A former member can no longer open the chat to clear these
            NotificationHub::clear_in(tx, candidate, chat_id)?;

            let kind = reclassify(tx, chat_id)?;
            info!("{} removed {} from chat {} (now {:?})", actor, candidate, chat_id, kind);
            Ok(())
        })
    }

    /// Delete the chat with its memberships, messages and notifications.
    pub fn delete_chat(&self, chat_id: i64, actor: &str) -> Result<(), DomainError> {
        self.db.with_tx(|tx| {
            let chat = load_chat(tx, chat_id)?;
            require_admin(&chat, actor)?;

            queries::delete_chat(tx, chat_id)?;

            info!("Chat {} deleted by {}", chat_id, actor);
            Ok(())
        })
    }

    /// Classification from the membership as it is right now.
    pub fn classify(&self, chat_id: i64) -> Result<ChatKind, DomainError> {
        self.db.with_tx(|tx| {
            load_chat(tx, chat_id)?;
            live_kind(tx, chat_id)
        })
    }

    /// Members of `chat_id`, visible to members only.
    pub fn members(&self, chat_id: i64, viewer: &str) -> Result<Vec<String>, DomainError> {
        self.db.with_tx(|tx| {
            load_chat(tx, chat_id)?;
            require_member(tx, chat_id, viewer)?;
            Ok(queries::chat_members(tx, chat_id)?)
        })
    }

    /// Every chat `login` belongs to, most recently active first.
    pub fn chats_for(&self, login: &str) -> Result<Vec<ChatSummary>, DomainError> {
        let rows = self
            .db
            .with_conn(|conn| queries::chats_for_member(conn, login))?;
        debug!("{} belongs to {} chats", login, rows.len());
        Ok(rows.into_iter().map(summary_from_row).collect())
    }

    /// Chats `login` started and therefore administers.
    pub fn administered_by(&self, login: &str) -> Result<Vec<i64>, DomainError> {
        Ok(self
            .db
            .with_conn(|conn| queries::chats_initiated_by(conn, login))?)
    }
}

pub(crate) fn load_chat(conn: &Connection, chat_id: i64) -> Result<ChatRow, DomainError> {
    queries::get_chat(conn, chat_id)?.ok_or_else(|| DomainError::not_found(Entity::Chat, chat_id))
}

pub(crate) fn require_member(conn: &Connection, chat_id: i64, login: &str) -> Result<(), DomainError> {
    if queries::is_chat_member(conn, chat_id, login)? {
        Ok(())
    } else {
        Err(DomainError::not_authorized(login, Entity::Chat, chat_id))
    }
}

fn require_admin(chat: &ChatRow, actor: &str) -> Result<(), DomainError> {
    if chat.init_sender == actor {
        Ok(())
    } else {
        Err(DomainError::not_authorized(actor, Entity::Chat, chat.chat_id))
    }
}

pub(crate) fn live_kind(conn: &Connection, chat_id: i64) -> Result<ChatKind, DomainError> {
    let count = queries::count_chat_members(conn, chat_id)?;
    Ok(ChatKind::from_member_count(usize::try_from(count).unwrap_or_default()))
}

/// Keep the stored `chat_type` column in step with the membership. Reads go
/// through [`live_kind`] regardless.
fn reclassify(conn: &Connection, chat_id: i64) -> Result<ChatKind, DomainError> {
    let kind = live_kind(conn, chat_id)?;
    queries::set_chat_type(conn, chat_id, kind.as_db_str())?;
    Ok(kind)
}
