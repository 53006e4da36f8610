//! JSON payloads exchanged over the HTTP API.
//!
//! Field names are camelCase on the wire so the records can be handed to a
//! web frontend unchanged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{MessageId, MessageStatus, Role, RoomId, UserId};

/// One conversation thread as seen by a specific viewer. The unread count
/// is the viewer-side counter; `is_unread` is derived from it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub id: RoomId,
    pub candidate_id: UserId,
    pub company_user_id: UserId,
    pub company_name: String,
    pub candidate_name: String,
    pub job_title: String,
    /// The candidate's current employer, shown in the company-side list.
    pub candidate_current_company: Option<String>,
    pub last_message_preview: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub unread_count: i64,
    pub is_unread: bool,
}

/// One message inside a room. `is_own_message` is derived server-side from
/// the caller's identity, never trusted from the client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MessageRecord {
    pub id: MessageId,
    pub room_id: RoomId,
    pub sender_role: Role,
    pub sender_id: UserId,
    pub subject: Option<String>,
    pub content: String,
    pub file_urls: Vec<String>,
    pub status: MessageStatus,
    pub sent_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
    pub replied_at: Option<DateTime<Utc>>,
    pub is_own_message: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomRequest {
    pub candidate_id: UserId,
    pub company_user_id: UserId,
    pub company_name: String,
    pub candidate_name: String,
    pub job_title: String,
    pub candidate_current_company: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomResponse {
    pub id: RoomId,
}

/// Body of the send endpoint. Attachments are uploaded beforehand; this
/// request only carries their public URLs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default)]
    pub file_urls: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageResponse {
    pub id: MessageId,
    pub sent_at: DateTime<Utc>,
}

/// Result of a read reconciliation pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadResponse {
    /// Number of messages transitioned to READ by this call.
    pub marked: u64,
    /// Viewer-side unread count after the pass. Non-zero when a message
    /// arrived after the read snapshot was taken.
    pub unread_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub url: String,
    pub file_name: String,
    pub size: u64,
}
