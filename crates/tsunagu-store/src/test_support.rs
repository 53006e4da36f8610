//! Shared fixtures for the crate's unit tests.

use chrono::Utc;

use tsunagu_shared::types::{Role, RoomId, UserId};

use crate::database::Database;
use crate::models::{Message, Room};

pub(crate) fn open_db() -> Database {
    Database::open_in_memory().expect("in-memory database should open")
}

pub(crate) fn new_room(company: &str, candidate: &str, job_title: &str) -> Room {
    Room {
        id: RoomId::new(),
        candidate_id: UserId::new(),
        company_user_id: UserId::new(),
        company_name: company.to_string(),
        candidate_name: candidate.to_string(),
        job_title: job_title.to_string(),
        candidate_current_company: None,
        last_message_preview: None,
        last_message_at: None,
        candidate_unread: 0,
        company_unread: 0,
        created_at: Utc::now(),
    }
}

pub(crate) fn new_message(room: &Room, sender: Role, content: &str) -> Message {
    Message::new_sent(
        room.id,
        sender,
        room.participant(sender),
        None,
        content.to_string(),
        Vec::new(),
        Utc::now(),
    )
}
