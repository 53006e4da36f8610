//! Domain model structs persisted in the database.
//!
//! Every struct derives `Serialize` and `Deserialize` so the server can
//! map it onto wire records without intermediate types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tsunagu_shared::types::{MessageId, MessageStatus, Role, RoomId, UserId};

// ---------------------------------------------------------------------------
// Room
// ---------------------------------------------------------------------------

/// A conversation thread between exactly one candidate and one company
/// user, scoped to a job posting. Carries a per-side unread counter and a
/// cache of the last message for list rendering.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Room {
    pub id: RoomId,
    pub candidate_id: UserId,
    pub company_user_id: UserId,
    pub company_name: String,
    pub candidate_name: String,
    pub job_title: String,
    /// The candidate's current employer; searchable from the company side.
    pub candidate_current_company: Option<String>,
    pub last_message_preview: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
    /// Messages the candidate has not read yet.
    pub candidate_unread: i64,
    /// Messages the company side has not read yet.
    pub company_unread: i64,
    pub created_at: DateTime<Utc>,
}

impl Room {
    /// The unread counter belonging to the given viewer.
    pub fn unread_for(&self, viewer: Role) -> i64 {
        match viewer {
            Role::Candidate => self.candidate_unread,
            Role::CompanyUser => self.company_unread,
        }
    }

    /// The participant id for the given side.
    pub fn participant(&self, side: Role) -> UserId {
        match side {
            Role::Candidate => self.candidate_id,
            Role::CompanyUser => self.company_user_id,
        }
    }

    /// Whether the given user takes part in this room as `role`.
    pub fn is_participant(&self, user: UserId, role: Role) -> bool {
        self.participant(role) == user
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// A single message. Created once by the send pipeline; afterwards only
/// `status`, `read_at` and `replied_at` change, and only forwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub id: MessageId,
    pub room_id: RoomId,
    pub sender_role: Role,
    pub sender_id: UserId,
    pub subject: Option<String>,
    pub content: String,
    /// Public attachment URLs, in upload order.
    pub file_urls: Vec<String>,
    pub status: MessageStatus,
    pub sent_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
    pub replied_at: Option<DateTime<Utc>>,
}

impl Message {
    /// A brand-new outgoing message in the SENT state.
    pub fn new_sent(
        room_id: RoomId,
        sender_role: Role,
        sender_id: UserId,
        subject: Option<String>,
        content: String,
        file_urls: Vec<String>,
        sent_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MessageId::new(),
            room_id,
            sender_role,
            sender_id,
            subject,
            content,
            file_urls,
            status: MessageStatus::Sent,
            sent_at,
            read_at: None,
            replied_at: None,
        }
    }

    /// A message must carry text or at least one attachment.
    pub fn carries_something(&self) -> bool {
        !self.content.trim().is_empty() || !self.file_urls.is_empty()
    }
}
