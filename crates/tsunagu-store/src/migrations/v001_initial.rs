//! v001 -- Initial schema creation.
//!
//! Creates the two core tables: `rooms` and `messages`.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Rooms: one conversation thread per candidate/company pairing,
-- scoped to a job posting. Participants never change after creation
-- and rooms are never deleted.
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS rooms (
    id                        TEXT PRIMARY KEY NOT NULL,  -- UUID v4
    candidate_id              TEXT NOT NULL,              -- UUID v4
    company_user_id           TEXT NOT NULL,              -- UUID v4
    company_name              TEXT NOT NULL,
    candidate_name            TEXT NOT NULL,
    job_title                 TEXT NOT NULL,
    candidate_current_company TEXT,
    last_message_preview      TEXT,
    last_message_at           TEXT,                       -- ISO-8601 / RFC-3339
    candidate_unread          INTEGER NOT NULL DEFAULT 0 CHECK (candidate_unread >= 0),
    company_unread            INTEGER NOT NULL DEFAULT 0 CHECK (company_unread >= 0),
    created_at                TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_rooms_candidate ON rooms(candidate_id);
CREATE INDEX IF NOT EXISTS idx_rooms_company_user ON rooms(company_user_id);

-- ----------------------------------------------------------------
-- Messages: append-only log keyed by room. Rows are never deleted;
-- only status / read_at / replied_at are mutable.
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS messages (
    id          TEXT PRIMARY KEY NOT NULL,  -- UUID v4
    room_id     TEXT NOT NULL,              -- FK -> rooms(id)
    sender_role TEXT NOT NULL CHECK (sender_role IN ('candidate', 'company_user')),
    sender_id   TEXT NOT NULL,              -- UUID v4
    subject     TEXT,
    content     TEXT NOT NULL,
    file_urls   TEXT NOT NULL,              -- JSON array of strings
    status      TEXT NOT NULL CHECK (status IN ('SENT', 'READ', 'REPLIED')),
    sent_at     TEXT NOT NULL,              -- ISO-8601
    read_at     TEXT,
    replied_at  TEXT,

    FOREIGN KEY (room_id) REFERENCES rooms(id)
);

CREATE INDEX IF NOT EXISTS idx_messages_room_sent
    ON messages(room_id, sent_at ASC);

CREATE INDEX IF NOT EXISTS idx_messages_room_status
    ON messages(room_id, status, sender_role);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
