//! CRUD operations for [`Room`] records.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use tsunagu_shared::types::{Role, RoomId, UserId};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::Room;

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a new room. Participants are fixed at creation and cannot
    /// be renegotiated afterwards.
    pub fn create_room(&self, room: &Room) -> Result<()> {
        self.conn().execute(
            "INSERT INTO rooms (id, candidate_id, company_user_id, company_name,
                                candidate_name, job_title, candidate_current_company,
                                last_message_preview, last_message_at,
                                candidate_unread, company_unread, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                room.id.to_string(),
                room.candidate_id.to_string(),
                room.company_user_id.to_string(),
                room.company_name,
                room.candidate_name,
                room.job_title,
                room.candidate_current_company,
                room.last_message_preview,
                room.last_message_at.map(|t| t.to_rfc3339()),
                room.candidate_unread,
                room.company_unread,
                room.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Fetch a single room by id.
    pub fn get_room(&self, id: RoomId) -> Result<Room> {
        self.conn()
            .query_row(
                &format!("SELECT {ROOM_COLUMNS} FROM rooms WHERE id = ?1"),
                params![id.to_string()],
                row_to_room,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// List the rooms visible to a viewer: candidates see rooms where they
    /// are the candidate, company users see rooms belonging to them.
    /// Ordered by last activity, newest first; rooms without any message
    /// yet come last, by creation date.
    pub fn list_rooms_for_viewer(&self, user: UserId, role: Role) -> Result<Vec<Room>> {
        let column = match role {
            Role::Candidate => "candidate_id",
            Role::CompanyUser => "company_user_id",
        };
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {ROOM_COLUMNS} FROM rooms
             WHERE {column} = ?1
             ORDER BY last_message_at IS NULL, last_message_at DESC, created_at DESC"
        ))?;

        let rows = stmt.query_map(params![user.to_string()], row_to_room)?;

        let mut rooms = Vec::new();
        for row in rows {
            rooms.push(row?);
        }
        Ok(rooms)
    }

    // ------------------------------------------------------------------
    // Unread bookkeeping
    // ------------------------------------------------------------------

    /// Recompute the viewer-side unread counter from the authoritative set
    /// of still-unread messages and persist it. Never a blind decrement:
    /// a message that raced past a reconciliation snapshot keeps the
    /// counter non-zero.
    pub fn refresh_unread_count(&self, room: RoomId, viewer: Role) -> Result<i64> {
        Ok(recount_unread(self.conn(), room, viewer)?)
    }
}

pub(crate) const ROOM_COLUMNS: &str = "id, candidate_id, company_user_id, company_name, \
     candidate_name, job_title, candidate_current_company, last_message_preview, \
     last_message_at, candidate_unread, company_unread, created_at";

/// Count the viewer's unread messages (SENT rows from the counterpart) and
/// store the result in the viewer-side counter column. Shared between the
/// reconcile transaction and the append transaction.
pub(crate) fn recount_unread(
    conn: &Connection,
    room: RoomId,
    viewer: Role,
) -> rusqlite::Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM messages
         WHERE room_id = ?1 AND sender_role = ?2 AND status = 'SENT'",
        params![room.to_string(), viewer.counterpart().as_str()],
        |row| row.get(0),
    )?;

    let column = match viewer {
        Role::Candidate => "candidate_unread",
        Role::CompanyUser => "company_unread",
    };
    conn.execute(
        &format!("UPDATE rooms SET {column} = ?1 WHERE id = ?2"),
        params![count, room.to_string()],
    )?;

    Ok(count)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map a `rusqlite::Row` to a [`Room`].
pub(crate) fn row_to_room(row: &rusqlite::Row<'_>) -> rusqlite::Result<Room> {
    let id: String = row.get(0)?;
    let candidate_id: String = row.get(1)?;
    let company_user_id: String = row.get(2)?;
    let last_message_at: Option<String> = row.get(8)?;

    Ok(Room {
        id: RoomId(parse_uuid(&id, 0)?),
        candidate_id: UserId(parse_uuid(&candidate_id, 1)?),
        company_user_id: UserId(parse_uuid(&company_user_id, 2)?),
        company_name: row.get(3)?,
        candidate_name: row.get(4)?,
        job_title: row.get(5)?,
        candidate_current_company: row.get(6)?,
        last_message_preview: row.get(7)?,
        last_message_at: last_message_at
            .map(|s| parse_timestamp(&s, 8))
            .transpose()?,
        candidate_unread: row.get(9)?,
        company_unread: row.get(10)?,
        created_at: parse_timestamp(&row.get::<_, String>(11)?, 11)?,
    })
}

pub(crate) fn parse_uuid(s: &str, idx: usize) -> rusqlite::Result<uuid::Uuid> {
    uuid::Uuid::parse_str(s).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

pub(crate) fn parse_timestamp(s: &str, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}
