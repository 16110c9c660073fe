use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            BEGIN;

            CREATE TABLE user_list (
                list_id     INTEGER PRIMARY KEY AUTOINCREMENT,
                list_type   TEXT NOT NULL CHECK (list_type IN ('contact', 'block'))
            );

            CREATE TABLE usr (
                login           TEXT PRIMARY KEY,
                password        TEXT NOT NULL,
                phone_num       TEXT NOT NULL UNIQUE,
                status          TEXT,
                contact_list    INTEGER NOT NULL REFERENCES user_list(list_id),
                block_list      INTEGER NOT NULL REFERENCES user_list(list_id)
            );

            CREATE TABLE user_list_contains (
                list_id     INTEGER NOT NULL REFERENCES user_list(list_id) ON DELETE CASCADE,
                list_member TEXT NOT NULL REFERENCES usr(login) ON DELETE CASCADE,
                PRIMARY KEY (list_id, list_member)
            );

            CREATE TABLE chat (
                chat_id     INTEGER PRIMARY KEY AUTOINCREMENT,
                chat_type   TEXT NOT NULL CHECK (chat_type IN ('Private', 'Public')),
                init_sender TEXT NOT NULL REFERENCES usr(login) ON DELETE CASCADE
            );

            CREATE TABLE chat_list (
                chat_id     INTEGER NOT NULL REFERENCES chat(chat_id) ON DELETE CASCADE,
                member      TEXT NOT NULL REFERENCES usr(login) ON DELETE CASCADE,
                PRIMARY KEY (chat_id, member)
            );

            CREATE INDEX idx_chat_list_member ON chat_list(member);

            CREATE TABLE message (
                msg_id          INTEGER PRIMARY KEY AUTOINCREMENT,
                chat_id         INTEGER NOT NULL REFERENCES chat(chat_id) ON DELETE CASCADE,
                sender_login    TEXT NOT NULL REFERENCES usr(login) ON DELETE CASCADE,
                msg_text        TEXT NOT NULL,
                msg_timestamp   INTEGER NOT NULL,
                edited_at       INTEGER,
                destr_timestamp INTEGER
            );

            CREATE INDEX idx_message_chat ON message(chat_id, msg_timestamp);

            CREATE TABLE media_attachment (
                msg_id      INTEGER NOT NULL UNIQUE REFERENCES message(msg_id) ON DELETE CASCADE,
                media_type  TEXT NOT NULL,
                url         TEXT NOT NULL
            );

            CREATE TABLE notification (
                msg_id      INTEGER NOT NULL REFERENCES message(msg_id) ON DELETE CASCADE,
                usr_login   TEXT NOT NULL REFERENCES usr(login) ON DELETE CASCADE,
                PRIMARY KEY (msg_id, usr_login)
            );

            CREATE INDEX idx_notification_user ON notification(usr_login);

            INSERT INTO schema_version (version) VALUES (1);

            COMMIT;
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
