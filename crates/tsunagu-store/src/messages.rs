//! The append-only message log and the read-state reconciliation pass.
//!
//! Unread counters are touched in exactly two places, both here and both
//! transactional: [`Database::append_message`] (recipient-side recount
//! after insert) and [`Database::reconcile_room`] (viewer-side recount
//! after marking the snapshot READ).

use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter};
use serde::{Deserialize, Serialize};

use tsunagu_shared::constants::{PREVIEW_ATTACHMENT_FALLBACK, PREVIEW_MAX_CHARS};
use tsunagu_shared::types::{MessageId, MessageStatus, Role, RoomId, UserId};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::Message;
use crate::rooms::{parse_timestamp, parse_uuid, recount_unread};

/// Result of one reconciliation pass over a room.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Messages transitioned SENT -> READ by this call.
    pub marked: u64,
    /// Viewer-side unread count after the pass. Non-zero when a send
    /// raced past the snapshot.
    pub unread_count: i64,
}

const MESSAGE_COLUMNS: &str = "id, room_id, sender_role, sender_id, subject, content, \
     file_urls, status, sent_at, read_at, replied_at";

impl Database {
    // ------------------------------------------------------------------
    // Append
    // ------------------------------------------------------------------

    /// Append a message to its room's log.
    ///
    /// One transaction covers the insert, reply detection (the
    /// counterpart's READ messages become REPLIED), the last-message
    /// cache, and the recipient-side unread recount.
    pub fn append_message(&mut self, message: &Message) -> Result<()> {
        if !message.carries_something() {
            return Err(StoreError::EmptyMessage);
        }

        let tx = self.conn_mut().transaction()?;

        tx.execute(
            "INSERT INTO messages (id, room_id, sender_role, sender_id, subject,
                                   content, file_urls, status, sent_at, read_at, replied_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                message.id.to_string(),
                message.room_id.to_string(),
                message.sender_role.as_str(),
                message.sender_id.to_string(),
                message.subject,
                message.content,
                serde_json::to_string(&message.file_urls)?,
                message.status.as_str(),
                message.sent_at.to_rfc3339(),
                message.read_at.map(|t| t.to_rfc3339()),
                message.replied_at.map(|t| t.to_rfc3339()),
            ],
        )?;

        // Reply detection: sending counts as replying to everything of the
        // counterpart's that the sender has already read.
        tx.execute(
            "UPDATE messages SET status = 'REPLIED', replied_at = ?1
             WHERE room_id = ?2 AND sender_role = ?3 AND status = 'READ'",
            params![
                message.sent_at.to_rfc3339(),
                message.room_id.to_string(),
                message.sender_role.counterpart().as_str(),
            ],
        )?;

        tx.execute(
            "UPDATE rooms SET last_message_preview = ?1, last_message_at = ?2
             WHERE id = ?3",
            params![
                preview_of(message),
                message.sent_at.to_rfc3339(),
                message.room_id.to_string(),
            ],
        )?;

        // Recipient-side increment, computed rather than blindly bumped.
        recount_unread(&tx, message.room_id, message.sender_role.counterpart())?;

        tx.commit()?;

        tracing::debug!(
            message_id = %message.id,
            room_id = %message.room_id,
            sender = %message.sender_role,
            "appended message"
        );
        Ok(())
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// All messages of a room, `sent_at` ascending (server-assigned display
    /// order), message id as a stable tiebreak.
    pub fn messages_for_room(&self, room: RoomId) -> Result<Vec<Message>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages
             WHERE room_id = ?1
             ORDER BY sent_at ASC, id ASC"
        ))?;

        let rows = stmt.query_map(params![room.to_string()], row_to_message)?;

        let mut messages = Vec::new();
        for row in rows {
            messages.push(row?);
        }
        Ok(messages)
    }

    /// Fetch a single message by id.
    pub fn get_message(&self, id: MessageId) -> Result<Message> {
        self.conn()
            .query_row(
                &format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?1"),
                params![id.to_string()],
                row_to_message,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// Ids of the viewer's unread messages: SENT rows from the counterpart.
    /// This is the snapshot a reconciliation pass operates on.
    pub fn unread_message_ids(&self, room: RoomId, viewer: Role) -> Result<Vec<MessageId>> {
        let mut stmt = self.conn().prepare(
            "SELECT id FROM messages
             WHERE room_id = ?1 AND sender_role = ?2 AND status = 'SENT'
             ORDER BY sent_at ASC",
        )?;

        let rows = stmt.query_map(
            params![room.to_string(), viewer.counterpart().as_str()],
            |row| {
                let id: String = row.get(0)?;
                Ok(MessageId(parse_uuid(&id, 0)?))
            },
        )?;

        let mut ids = Vec::new();
        for row in rows {
            ids.push(row?);
        }
        Ok(ids)
    }

    // ------------------------------------------------------------------
    // Status transitions
    // ------------------------------------------------------------------

    /// Transition a snapshot of messages SENT -> READ with one shared
    /// `read_at`. The `status = 'SENT'` guard makes the call idempotent:
    /// rows a concurrent pass already marked are skipped, and `read_at` is
    /// never overwritten. Returns the number of rows transitioned.
    pub fn mark_messages_read(
        &self,
        ids: &[MessageId],
        read_at: DateTime<Utc>,
    ) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "UPDATE messages SET status = 'READ', read_at = ?
             WHERE status = 'SENT' AND id IN ({placeholders})"
        );

        let mut values = Vec::with_capacity(ids.len() + 1);
        values.push(read_at.to_rfc3339());
        values.extend(ids.iter().map(|id| id.to_string()));

        Ok(self.conn().execute(&sql, params_from_iter(values.iter()))?)
    }

    /// Apply a single validated status transition. Rejects anything that
    /// would move backwards or skip READ.
    pub fn set_message_status(
        &mut self,
        id: MessageId,
        next: MessageStatus,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let tx = self.conn_mut().transaction()?;

        let current: String = tx
            .query_row(
                "SELECT status FROM messages WHERE id = ?1",
                params![id.to_string()],
                |row| row.get(0),
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })?;
        let current: MessageStatus = current.parse().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })?;

        if !current.can_become(next) {
            return Err(StoreError::InvalidStatusTransition {
                from: current,
                to: next,
            });
        }

        let timestamp_column = match next {
            MessageStatus::Read => "read_at",
            MessageStatus::Replied => "replied_at",
            MessageStatus::Sent => unreachable!("no transition leads back to SENT"),
        };
        tx.execute(
            &format!("UPDATE messages SET status = ?1, {timestamp_column} = ?2 WHERE id = ?3"),
            params![next.as_str(), at.to_rfc3339(), id.to_string()],
        )?;

        tx.commit()?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Reconciliation
    // ------------------------------------------------------------------

    /// One read-state reconciliation pass for a viewer over a room:
    /// snapshot the unread set, transition exactly those rows to READ, and
    /// recount the viewer-side unread counter from what is still SENT.
    ///
    /// A message appended after the snapshot is not retroactively marked;
    /// the recount sees it and keeps the counter non-zero, so the pass
    /// under-marks but never undercounts. Calling this twice in a row is a
    /// no-op the second time.
    pub fn reconcile_room(&mut self, room: RoomId, viewer: Role) -> Result<ReconcileOutcome> {
        // Room must exist; reconciliation of an unknown room is an error,
        // not a silent zero.
        self.get_room(room)?;

        let read_at = Utc::now();
        let tx = self.conn_mut().transaction()?;

        let mut stmt = tx.prepare(
            "SELECT id FROM messages
             WHERE room_id = ?1 AND sender_role = ?2 AND status = 'SENT'",
        )?;
        let snapshot: Vec<String> = stmt
            .query_map(
                params![room.to_string(), viewer.counterpart().as_str()],
                |row| row.get(0),
            )?
            .collect::<rusqlite::Result<_>>()?;
        drop(stmt);

        let marked = if snapshot.is_empty() {
            0
        } else {
            let placeholders = vec!["?"; snapshot.len()].join(", ");
            let sql = format!(
                "UPDATE messages SET status = 'READ', read_at = ?
                 WHERE status = 'SENT' AND id IN ({placeholders})"
            );
            let mut values = Vec::with_capacity(snapshot.len() + 1);
            values.push(read_at.to_rfc3339());
            values.extend(snapshot.iter().cloned());
            tx.execute(&sql, params_from_iter(values.iter()))?
        };

        let unread_count = recount_unread(&tx, room, viewer)?;
        tx.commit()?;

        tracing::debug!(
            room_id = %room,
            viewer = %viewer,
            marked,
            unread_count,
            "reconciled read state"
        );

        Ok(ReconcileOutcome {
            marked: marked as u64,
            unread_count,
        })
    }
}

/// Room-list preview for a message: trimmed text truncated to a fixed
/// number of characters, or a fixed marker when only attachments exist.
fn preview_of(message: &Message) -> String {
    let trimmed = message.content.trim();
    if trimmed.is_empty() {
        return PREVIEW_ATTACHMENT_FALLBACK.to_string();
    }
    trimmed.chars().take(PREVIEW_MAX_CHARS).collect()
}

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    let id: String = row.get(0)?;
    let room_id: String = row.get(1)?;
    let sender_role: String = row.get(2)?;
    let sender_id: String = row.get(3)?;
    let file_urls: String = row.get(6)?;
    let status: String = row.get(7)?;
    let read_at: Option<String> = row.get(9)?;
    let replied_at: Option<String> = row.get(10)?;

    let sender_role: Role = sender_role.parse().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let status: MessageStatus = status.parse().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(7, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let file_urls: Vec<String> = serde_json::from_str(&file_urls).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(6, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(Message {
        id: MessageId(parse_uuid(&id, 0)?),
        room_id: RoomId(parse_uuid(&room_id, 1)?),
        sender_role,
        sender_id: UserId(parse_uuid(&sender_id, 3)?),
        subject: row.get(4)?,
        content: row.get(5)?,
        file_urls,
        status,
        sent_at: parse_timestamp(&row.get::<_, String>(8)?, 8)?,
        read_at: read_at.map(|s| parse_timestamp(&s, 9)).transpose()?,
        replied_at: replied_at.map(|s| parse_timestamp(&s, 10)).transpose()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{new_message, new_room, open_db};

    #[test]
    fn append_and_fetch_in_sent_order() {
        let mut db = open_db();
        let room = new_room("Acme", "佐藤 花子", "Engineer");
        db.create_room(&room).unwrap();

        let first = new_message(&room, Role::Candidate, "よろしくお願いします");
        let mut second = new_message(&room, Role::CompanyUser, "こちらこそ");
        second.sent_at = first.sent_at + chrono::Duration::seconds(5);

        // Insert out of order; display order is sent_at, not insert order.
        db.append_message(&second).unwrap();
        db.append_message(&first).unwrap();

        let fetched = db.messages_for_room(room.id).unwrap();
        assert_eq!(fetched.len(), 2);
        assert_eq!(fetched[0].id, first.id);
        assert_eq!(fetched[1].id, second.id);
        assert_eq!(fetched[0].file_urls, first.file_urls);
    }

    #[test]
    fn empty_message_is_rejected() {
        let mut db = open_db();
        let room = new_room("Acme", "A", "Engineer");
        db.create_room(&room).unwrap();

        let msg = new_message(&room, Role::Candidate, "   ");
        assert!(matches!(
            db.append_message(&msg),
            Err(StoreError::EmptyMessage)
        ));
        assert!(db.messages_for_room(room.id).unwrap().is_empty());
    }

    #[test]
    fn attachment_only_message_is_accepted() {
        let mut db = open_db();
        let room = new_room("Acme", "A", "Engineer");
        db.create_room(&room).unwrap();

        let mut msg = new_message(&room, Role::Candidate, "");
        msg.file_urls = vec!["https://files.example.com/x/resume.pdf".into()];
        db.append_message(&msg).unwrap();

        let stored = db.get_room(room.id).unwrap();
        assert_eq!(
            stored.last_message_preview.as_deref(),
            Some(PREVIEW_ATTACHMENT_FALLBACK)
        );
    }

    #[test]
    fn append_bumps_recipient_unread_and_preview() {
        let mut db = open_db();
        let room = new_room("Acme", "A", "Engineer");
        db.create_room(&room).unwrap();

        let msg = new_message(&room, Role::CompanyUser, "書類選考を通過されました");
        db.append_message(&msg).unwrap();

        let stored = db.get_room(room.id).unwrap();
        // Recipient (candidate) side goes up; sender side does not.
        assert_eq!(stored.candidate_unread, 1);
        assert_eq!(stored.company_unread, 0);
        assert_eq!(stored.last_message_at, Some(msg.sent_at));
        assert!(stored
            .last_message_preview
            .as_deref()
            .unwrap()
            .starts_with("書類選考"));
    }

    #[test]
    fn reconcile_marks_read_and_zeroes_unread() {
        let mut db = open_db();
        let room = new_room("Acme", "A", "Engineer");
        db.create_room(&room).unwrap();

        db.append_message(&new_message(&room, Role::CompanyUser, "one"))
            .unwrap();
        db.append_message(&new_message(&room, Role::CompanyUser, "two"))
            .unwrap();

        let outcome = db.reconcile_room(room.id, Role::Candidate).unwrap();
        assert_eq!(outcome.marked, 2);
        assert_eq!(outcome.unread_count, 0);

        let messages = db.messages_for_room(room.id).unwrap();
        assert!(messages
            .iter()
            .all(|m| m.status == MessageStatus::Read && m.read_at.is_some()));
        assert_eq!(db.get_room(room.id).unwrap().candidate_unread, 0);
    }

    #[test]
    fn reconcile_is_idempotent() {
        let mut db = open_db();
        let room = new_room("Acme", "A", "Engineer");
        db.create_room(&room).unwrap();
        let msg = new_message(&room, Role::CompanyUser, "hello");
        db.append_message(&msg).unwrap();

        let first = db.reconcile_room(room.id, Role::Candidate).unwrap();
        let read_at_after_first = db.get_message(msg.id).unwrap().read_at;

        let second = db.reconcile_room(room.id, Role::Candidate).unwrap();
        assert_eq!(first.marked, 1);
        assert_eq!(second.marked, 0);
        assert_eq!(second.unread_count, 0);

        // read_at is set exactly once, not overwritten by the second pass.
        assert_eq!(db.get_message(msg.id).unwrap().read_at, read_at_after_first);
    }

    #[test]
    fn reconcile_of_unknown_room_fails() {
        let mut db = open_db();
        assert!(matches!(
            db.reconcile_room(RoomId::new(), Role::Candidate),
            Err(StoreError::NotFound)
        ));
    }

    #[test]
    fn message_racing_past_the_snapshot_stays_unread() {
        let mut db = open_db();
        let room = new_room("Acme", "A", "Engineer");
        db.create_room(&room).unwrap();

        db.append_message(&new_message(&room, Role::CompanyUser, "before snapshot"))
            .unwrap();

        // The reconciliation pass decomposed: snapshot first, then a send
        // lands, then the snapshot is marked and the counter recounted.
        let snapshot = db.unread_message_ids(room.id, Role::Candidate).unwrap();
        assert_eq!(snapshot.len(), 1);

        db.append_message(&new_message(&room, Role::CompanyUser, "after snapshot"))
            .unwrap();

        let marked = db.mark_messages_read(&snapshot, Utc::now()).unwrap();
        assert_eq!(marked, 1);

        // The late message is not retroactively marked, and the counter
        // never undercounts to zero while it exists.
        let unread = db.refresh_unread_count(room.id, Role::Candidate).unwrap();
        assert_eq!(unread, 1);
    }

    #[test]
    fn reply_detection_marks_read_messages_replied() {
        let mut db = open_db();
        let room = new_room("Acme", "A", "Engineer");
        db.create_room(&room).unwrap();

        let scout = new_message(&room, Role::CompanyUser, "スカウトです");
        db.append_message(&scout).unwrap();
        db.reconcile_room(room.id, Role::Candidate).unwrap();

        // The candidate replies; the scout message they read rolls over to
        // REPLIED with the reply's timestamp.
        let reply = new_message(&room, Role::Candidate, "ぜひお話したいです");
        db.append_message(&reply).unwrap();

        let stored = db.get_message(scout.id).unwrap();
        assert_eq!(stored.status, MessageStatus::Replied);
        assert_eq!(stored.replied_at, Some(reply.sent_at));
    }

    #[test]
    fn reply_does_not_touch_unseen_messages() {
        let mut db = open_db();
        let room = new_room("Acme", "A", "Engineer");
        db.create_room(&room).unwrap();

        // Company message never reconciled: still SENT.
        let unseen = new_message(&room, Role::CompanyUser, "unseen");
        db.append_message(&unseen).unwrap();

        db.append_message(&new_message(&room, Role::Candidate, "reply"))
            .unwrap();

        // REPLIED cannot precede READ, so the unseen message stays SENT.
        assert_eq!(
            db.get_message(unseen.id).unwrap().status,
            MessageStatus::Sent
        );
    }

    #[test]
    fn status_regressions_are_rejected() {
        let mut db = open_db();
        let room = new_room("Acme", "A", "Engineer");
        db.create_room(&room).unwrap();
        let msg = new_message(&room, Role::CompanyUser, "hello");
        db.append_message(&msg).unwrap();

        // SENT cannot skip to REPLIED.
        assert!(matches!(
            db.set_message_status(msg.id, MessageStatus::Replied, Utc::now()),
            Err(StoreError::InvalidStatusTransition { .. })
        ));

        db.set_message_status(msg.id, MessageStatus::Read, Utc::now())
            .unwrap();

        // READ cannot go back to SENT.
        assert!(matches!(
            db.set_message_status(msg.id, MessageStatus::Sent, Utc::now()),
            Err(StoreError::InvalidStatusTransition { .. })
        ));

        db.set_message_status(msg.id, MessageStatus::Replied, Utc::now())
            .unwrap();
        assert_eq!(
            db.get_message(msg.id).unwrap().status,
            MessageStatus::Replied
        );
    }
}
