//! Parameterized statements against the messenger schema.
//!
//! Every function takes a plain `&Connection` so the domain layer can compose
//! several of them inside one `Database::with_tx` call.

use crate::models::{
    ChatRow, ChatSummaryRow, ListMemberRow, MessageRow, NotificationRow, UserRow,
};
use anyhow::Result;
use rusqlite::{Connection, params};

// -- Users --

/// Insert an empty contact or block list and return its generated id.
pub fn insert_list(conn: &Connection, list_type: &str) -> Result<i64> {
    let id = conn.query_row(
        "INSERT INTO user_list (list_type) VALUES (?1) RETURNING list_id",
        [list_type],
        |row| row.get(0),
    )?;
    Ok(id)
}

pub fn insert_user(
    conn: &Connection,
    login: &str,
    password: &str,
    phone_num: &str,
    contact_list: i64,
    block_list: i64,
) -> Result<()> {
    conn.execute(
        "INSERT INTO usr (login, password, phone_num, contact_list, block_list)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![login, password, phone_num, contact_list, block_list],
    )?;
    Ok(())
}

pub fn get_user(conn: &Connection, login: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(
        "SELECT login, password, phone_num, status, contact_list, block_list
         FROM usr WHERE login = ?1",
    )?;

    let row = stmt
        .query_row([login], |row| {
            Ok(UserRow {
                login: row.get(0)?,
                password: row.get(1)?,
                phone_num: row.get(2)?,
                status: row.get(3)?,
                contact_list: row.get(4)?,
                block_list: row.get(5)?,
            })
        })
        .optional()?;

    Ok(row)
}

pub fn user_exists(conn: &Connection, login: &str) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row("SELECT 1 FROM usr WHERE login = ?1", [login], |row| row.get(0))
        .optional()?;
    Ok(found.is_some())
}

/// Every login registered under `phone_num`. The column is unique, so a
/// healthy store returns zero or one entries.
pub fn logins_by_phone(conn: &Connection, phone_num: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT login FROM usr WHERE phone_num = ?1")?;
    let logins = stmt
        .query_map([phone_num], |row| row.get(0))?
        .collect::<std::result::Result<Vec<String>, _>>()?;
    Ok(logins)
}

pub fn set_status(conn: &Connection, login: &str, status: Option<&str>) -> Result<usize> {
    let n = conn.execute(
        "UPDATE usr SET status = ?2 WHERE login = ?1",
        params![login, status],
    )?;
    Ok(n)
}

/// Remove a user row. Foreign keys cascade to list and chat memberships,
/// initiated chats, authored messages and addressed notifications; the
/// user's own lists are removed separately with [`delete_list`].
pub fn delete_user(conn: &Connection, login: &str) -> Result<usize> {
    let n = conn.execute("DELETE FROM usr WHERE login = ?1", [login])?;
    Ok(n)
}

pub fn delete_list(conn: &Connection, list_id: i64) -> Result<usize> {
    conn.execute("DELETE FROM user_list_contains WHERE list_id = ?1", [list_id])?;
    let n = conn.execute("DELETE FROM user_list WHERE list_id = ?1", [list_id])?;
    Ok(n)
}

// -- Lists --

/// Id of `owner`'s contact or block list.
pub fn list_id_for(conn: &Connection, owner: &str, list_type: &str) -> Result<Option<i64>> {
    let id = conn
        .query_row(
            "SELECT CASE ?2 WHEN 'block' THEN block_list ELSE contact_list END
             FROM usr WHERE login = ?1",
            params![owner, list_type],
            |row| row.get(0),
        )
        .optional()?;
    Ok(id)
}

pub fn list_contains(conn: &Connection, list_id: i64, member: &str) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM user_list_contains WHERE list_id = ?1 AND list_member = ?2",
            params![list_id, member],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

pub fn insert_list_member(conn: &Connection, list_id: i64, member: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO user_list_contains (list_id, list_member) VALUES (?1, ?2)",
        params![list_id, member],
    )?;
    Ok(())
}

pub fn delete_list_member(conn: &Connection, list_id: i64, member: &str) -> Result<usize> {
    let n = conn.execute(
        "DELETE FROM user_list_contains WHERE list_id = ?1 AND list_member = ?2",
        params![list_id, member],
    )?;
    Ok(n)
}

pub fn list_members(conn: &Connection, list_id: i64) -> Result<Vec<ListMemberRow>> {
    let mut stmt = conn.prepare(
        "SELECT u.login, u.status
         FROM user_list_contains c
         JOIN usr u ON u.login = c.list_member
         WHERE c.list_id = ?1
         ORDER BY u.login",
    )?;

    let rows = stmt
        .query_map([list_id], |row| {
            Ok(ListMemberRow {
                login: row.get(0)?,
                status: row.get(1)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

// -- Chats --

pub fn insert_chat(conn: &Connection, chat_type: &str, init_sender: &str) -> Result<i64> {
    let id = conn.query_row(
        "INSERT INTO chat (chat_type, init_sender) VALUES (?1, ?2) RETURNING chat_id",
        params![chat_type, init_sender],
        |row| row.get(0),
    )?;
    Ok(id)
}

pub fn get_chat(conn: &Connection, chat_id: i64) -> Result<Option<ChatRow>> {
    let row = conn
        .query_row(
            "SELECT chat_id, chat_type, init_sender FROM chat WHERE chat_id = ?1",
            [chat_id],
            |row| {
                Ok(ChatRow {
                    chat_id: row.get(0)?,
                    chat_type: row.get(1)?,
                    init_sender: row.get(2)?,
                })
            },
        )
        .optional()?;
    Ok(row)
}

pub fn set_chat_type(conn: &Connection, chat_id: i64, chat_type: &str) -> Result<()> {
    conn.execute(
        "UPDATE chat SET chat_type = ?2 WHERE chat_id = ?1",
        params![chat_id, chat_type],
    )?;
    Ok(())
}

pub fn insert_chat_member(conn: &Connection, chat_id: i64, member: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO chat_list (chat_id, member) VALUES (?1, ?2)",
        params![chat_id, member],
    )?;
    Ok(())
}

pub fn delete_chat_member(conn: &Connection, chat_id: i64, member: &str) -> Result<usize> {
    let n = conn.execute(
        "DELETE FROM chat_list WHERE chat_id = ?1 AND member = ?2",
        params![chat_id, member],
    )?;
    Ok(n)
}

pub fn is_chat_member(conn: &Connection, chat_id: i64, member: &str) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM chat_list WHERE chat_id = ?1 AND member = ?2",
            params![chat_id, member],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

pub fn count_chat_members(conn: &Connection, chat_id: i64) -> Result<i64> {
    let n = conn.query_row(
        "SELECT COUNT(*) FROM chat_list WHERE chat_id = ?1",
        [chat_id],
        |row| row.get(0),
    )?;
    Ok(n)
}

pub fn chat_members(conn: &Connection, chat_id: i64) -> Result<Vec<String>> {
    let mut stmt =
        conn.prepare("SELECT member FROM chat_list WHERE chat_id = ?1 ORDER BY member")?;
    let members = stmt
        .query_map([chat_id], |row| row.get(0))?
        .collect::<std::result::Result<Vec<String>, _>>()?;
    Ok(members)
}

/// Chats `login` belongs to, most recently active first. Chats without any
/// message sort last.
pub fn chats_for_member(conn: &Connection, login: &str) -> Result<Vec<ChatSummaryRow>> {
    let mut stmt = conn.prepare(
        "SELECT c.chat_id, c.init_sender,
                (SELECT COUNT(*) FROM chat_list cl WHERE cl.chat_id = c.chat_id),
                (SELECT MAX(m.msg_timestamp) FROM message m WHERE m.chat_id = c.chat_id) AS last_activity
         FROM chat c
         JOIN chat_list me ON me.chat_id = c.chat_id AND me.member = ?1
         ORDER BY last_activity IS NULL, last_activity DESC, c.chat_id DESC",
    )?;

    let rows = stmt
        .query_map([login], |row| {
            Ok(ChatSummaryRow {
                chat_id: row.get(0)?,
                init_sender: row.get(1)?,
                member_count: row.get(2)?,
                last_activity: row.get(3)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

pub fn chats_initiated_by(conn: &Connection, login: &str) -> Result<Vec<i64>> {
    let mut stmt =
        conn.prepare("SELECT chat_id FROM chat WHERE init_sender = ?1 ORDER BY chat_id")?;
    let ids = stmt
        .query_map([login], |row| row.get(0))?
        .collect::<std::result::Result<Vec<i64>, _>>()?;
    Ok(ids)
}

/// Remove a chat and everything hanging off it. Callers run this inside a
/// transaction so the cascade is all-or-nothing.
pub fn delete_chat(conn: &Connection, chat_id: i64) -> Result<usize> {
    conn.execute(
        "DELETE FROM notification
         WHERE msg_id IN (SELECT msg_id FROM message WHERE chat_id = ?1)",
        [chat_id],
    )?;
    conn.execute(
        "DELETE FROM media_attachment
         WHERE msg_id IN (SELECT msg_id FROM message WHERE chat_id = ?1)",
        [chat_id],
    )?;
    conn.execute("DELETE FROM message WHERE chat_id = ?1", [chat_id])?;
    conn.execute("DELETE FROM chat_list WHERE chat_id = ?1", [chat_id])?;
    let n = conn.execute("DELETE FROM chat WHERE chat_id = ?1", [chat_id])?;
    Ok(n)
}

// -- Messages --

pub fn insert_message(
    conn: &Connection,
    chat_id: i64,
    sender_login: &str,
    msg_text: &str,
    msg_timestamp: i64,
    destr_timestamp: Option<i64>,
) -> Result<i64> {
    let id = conn.query_row(
        "INSERT INTO message (chat_id, sender_login, msg_text, msg_timestamp, destr_timestamp)
         VALUES (?1, ?2, ?3, ?4, ?5)
         RETURNING msg_id",
        params![chat_id, sender_login, msg_text, msg_timestamp, destr_timestamp],
        |row| row.get(0),
    )?;
    Ok(id)
}

pub fn insert_media(conn: &Connection, msg_id: i64, media_type: &str, url: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO media_attachment (msg_id, media_type, url) VALUES (?1, ?2, ?3)",
        params![msg_id, media_type, url],
    )?;
    Ok(())
}

pub fn get_message(conn: &Connection, msg_id: i64) -> Result<Option<MessageRow>> {
    let mut stmt = conn.prepare(
        "SELECT m.msg_id, m.chat_id, m.sender_login, m.msg_text, m.msg_timestamp,
                m.edited_at, m.destr_timestamp, a.media_type, a.url
         FROM message m
         LEFT JOIN media_attachment a ON a.msg_id = m.msg_id
         WHERE m.msg_id = ?1",
    )?;
    let row = stmt.query_row([msg_id], map_message_row).optional()?;
    Ok(row)
}

pub fn update_message_text(
    conn: &Connection,
    msg_id: i64,
    msg_text: &str,
    edited_at: i64,
) -> Result<usize> {
    let n = conn.execute(
        "UPDATE message SET msg_text = ?2, edited_at = ?3 WHERE msg_id = ?1",
        params![msg_id, msg_text, edited_at],
    )?;
    Ok(n)
}

pub fn delete_message(conn: &Connection, msg_id: i64) -> Result<usize> {
    conn.execute("DELETE FROM notification WHERE msg_id = ?1", [msg_id])?;
    conn.execute("DELETE FROM media_attachment WHERE msg_id = ?1", [msg_id])?;
    let n = conn.execute("DELETE FROM message WHERE msg_id = ?1", [msg_id])?;
    Ok(n)
}

/// Number of messages in `chat_id` that `viewer` may see at `now`.
pub fn count_visible_messages(
    conn: &Connection,
    chat_id: i64,
    viewer: &str,
    now: i64,
) -> Result<i64> {
    let n = conn.query_row(
        "SELECT COUNT(*)
         FROM message m
         WHERE m.chat_id = ?1
           AND (m.destr_timestamp IS NULL OR m.destr_timestamp > ?3)
           AND m.sender_login NOT IN (
               SELECT c.list_member
               FROM user_list_contains c
               JOIN usr u ON u.block_list = c.list_id
               WHERE u.login = ?2
           )",
        params![chat_id, viewer, now],
        |row| row.get(0),
    )?;
    Ok(n)
}

/// One page of visible messages, newest first. Hides authors on the viewer's
/// block list and anything already past its expiry.
pub fn visible_messages(
    conn: &Connection,
    chat_id: i64,
    viewer: &str,
    now: i64,
    limit: u32,
    offset: u32,
) -> Result<Vec<MessageRow>> {
    let mut stmt = conn.prepare(
        "SELECT m.msg_id, m.chat_id, m.sender_login, m.msg_text, m.msg_timestamp,
                m.edited_at, m.destr_timestamp, a.media_type, a.url
         FROM message m
         LEFT JOIN media_attachment a ON a.msg_id = m.msg_id
         WHERE m.chat_id = ?1
           AND (m.destr_timestamp IS NULL OR m.destr_timestamp > ?3)
           AND m.sender_login NOT IN (
               SELECT c.list_member
               FROM user_list_contains c
               JOIN usr u ON u.block_list = c.list_id
               WHERE u.login = ?2
           )
         ORDER BY m.msg_timestamp DESC, m.msg_id DESC
         LIMIT ?4 OFFSET ?5",
    )?;

    let rows = stmt
        .query_map(params![chat_id, viewer, now, limit, offset], map_message_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

/// Delete every message in `chat_id` whose expiry is at or before `now`,
/// along with its notifications and attachment. Returns the messages removed.
pub fn delete_expired_messages(conn: &Connection, chat_id: i64, now: i64) -> Result<usize> {
    conn.execute(
        "DELETE FROM notification
         WHERE msg_id IN (
             SELECT msg_id FROM message
             WHERE chat_id = ?1 AND destr_timestamp IS NOT NULL AND destr_timestamp <= ?2
         )",
        params![chat_id, now],
    )?;
    conn.execute(
        "DELETE FROM media_attachment
         WHERE msg_id IN (
             SELECT msg_id FROM message
             WHERE chat_id = ?1 AND destr_timestamp IS NOT NULL AND destr_timestamp <= ?2
         )",
        params![chat_id, now],
    )?;
    let n = conn.execute(
        "DELETE FROM message
         WHERE chat_id = ?1 AND destr_timestamp IS NOT NULL AND destr_timestamp <= ?2",
        params![chat_id, now],
    )?;
    Ok(n)
}

fn map_message_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        msg_id: row.get(0)?,
        chat_id: row.get(1)?,
        sender_login: row.get(2)?,
        msg_text: row.get(3)?,
        msg_timestamp: row.get(4)?,
        edited_at: row.get(5)?,
        destr_timestamp: row.get(6)?,
        media_type: row.get(7)?,
        url: row.get(8)?,
    })
}

// -- Notifications --

/// Notify every current member of `chat_id` except `actor` about `msg_id`.
/// Membership is read by the same statement that writes the rows; members
/// already holding a notification for the message are skipped.
pub fn insert_notifications(
    conn: &Connection,
    msg_id: i64,
    chat_id: i64,
    actor: &str,
) -> Result<usize> {
    let n = conn.execute(
        "INSERT OR IGNORE INTO notification (msg_id, usr_login)
         SELECT ?1, member FROM chat_list WHERE chat_id = ?2 AND member != ?3",
        params![msg_id, chat_id, actor],
    )?;
    Ok(n)
}

pub fn delete_notifications_for_message(conn: &Connection, msg_id: i64) -> Result<usize> {
    let n = conn.execute("DELETE FROM notification WHERE msg_id = ?1", [msg_id])?;
    Ok(n)
}

/// Drop `viewer`'s notifications for messages in `chat_id`.
pub fn clear_notifications(conn: &Connection, viewer: &str, chat_id: i64) -> Result<usize> {
    let n = conn.execute(
        "DELETE FROM notification
         WHERE usr_login = ?1
           AND msg_id IN (SELECT msg_id FROM message WHERE chat_id = ?2)",
        params![viewer, chat_id],
    )?;
    Ok(n)
}

pub fn notifications_for(conn: &Connection, login: &str) -> Result<Vec<NotificationRow>> {
    let mut stmt = conn.prepare(
        "SELECT n.msg_id, m.chat_id, m.sender_login, m.msg_timestamp
         FROM notification n
         JOIN message m ON m.msg_id = n.msg_id
         WHERE n.usr_login = ?1
         ORDER BY m.msg_timestamp DESC, n.msg_id DESC",
    )?;

    let rows = stmt
        .query_map([login], |row| {
            Ok(NotificationRow {
                msg_id: row.get(0)?,
                chat_id: row.get(1)?,
                sender_login: row.get(2)?,
                msg_timestamp: row.get(3)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

pub fn notification_recipients(conn: &Connection, msg_id: i64) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare("SELECT usr_login FROM notification WHERE msg_id = ?1 ORDER BY usr_login")?;
    let logins = stmt
        .query_map([msg_id], |row| row.get(0))?
        .collect::<std::result::Result<Vec<String>, _>>()?;
    Ok(logins)
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, is_constraint_violation};

    fn seed_user(conn: &Connection, login: &str, phone: &str) {
        let block = insert_list(conn, "block").unwrap();
        let contact = insert_list(conn, "contact").unwrap();
        insert_user(conn, login, "x", phone, contact, block).unwrap();
    }

    #[test]
    fn test_insert_returns_fresh_ids() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let a = insert_list(conn, "contact")?;
            let b = insert_list(conn, "block")?;
            assert_ne!(a, b);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_duplicate_list_member_is_constraint_violation() {
        let db = Database::open_in_memory().unwrap();
        let err = db
            .with_conn(|conn| {
                seed_user(conn, "alice", "1");
                seed_user(conn, "bob", "2");
                let list = list_id_for(conn, "alice", "contact")?.unwrap();
                insert_list_member(conn, list, "bob")?;
                insert_list_member(conn, list, "bob")
            })
            .unwrap_err();
        assert!(is_constraint_violation(&err));
    }

    #[test]
    fn test_list_id_for_selects_by_kind() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            seed_user(conn, "alice", "1");
            let user = get_user(conn, "alice")?.unwrap();
            assert_eq!(list_id_for(conn, "alice", "block")?, Some(user.block_list));
            assert_eq!(list_id_for(conn, "alice", "contact")?, Some(user.contact_list));
            assert_eq!(list_id_for(conn, "nobody", "block")?, None);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_notifications_skip_actor() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            for (login, phone) in [("alice", "1"), ("bob", "2"), ("dave", "3")] {
                seed_user(conn, login, phone);
            }
            let chat = insert_chat(conn, "Public", "alice")?;
            for member in ["alice", "bob", "dave"] {
                insert_chat_member(conn, chat, member)?;
            }
            let msg = insert_message(conn, chat, "alice", "hi", 1, None)?;

            assert_eq!(insert_notifications(conn, msg, chat, "alice")?, 2);
            assert_eq!(notification_recipients(conn, msg)?, vec!["bob", "dave"]);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_tx_rolls_back_on_error() {
        let db = Database::open_in_memory().unwrap();
        let result: Result<()> = db.with_tx(|tx| {
            seed_user(tx, "alice", "1");
            anyhow::bail!("abort")
        });
        assert!(result.is_err());

        let exists = db.with_conn(|conn| user_exists(conn, "alice")).unwrap();
        assert!(!exists);
    }
}
