//! In-memory [`MessagingApi`] double for tests.
//!
//! Keeps rooms and transcripts in shared maps, counts every call, and can
//! be told to fail specific uploads, fetches, or the read pass. Fetches and sends
//! can be held open with [`Notify`] gates so tests can interleave
//! overlapping requests deterministically.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{Duration, Utc};
use tokio::sync::Notify;

use tsunagu_shared::protocol::{
    MarkReadResponse, MessageRecord, RoomSummary, SendMessageRequest, SendMessageResponse,
    UploadResponse,
};
use tsunagu_shared::types::{MessageId, MessageStatus, Role, RoomId, UserId};

use crate::api::{MessagingApi, OutgoingFile};
use crate::error::ClientError;

struct Inner {
    viewer_id: UserId,
    viewer_role: Role,
    rooms: Mutex<Vec<RoomSummary>>,
    messages: Mutex<HashMap<RoomId, Vec<MessageRecord>>>,
    clock_ticks: AtomicUsize,
    fail_uploads: Mutex<HashSet<String>>,
    fail_mark_read: AtomicBool,
    fail_fetch: AtomicBool,
    fetch_calls: AtomicUsize,
    send_calls: AtomicUsize,
    mark_read_calls: AtomicUsize,
    upload_calls: AtomicUsize,
    fetch_gates: Mutex<HashMap<RoomId, Arc<Notify>>>,
    send_gate: Mutex<Option<Arc<Notify>>>,
}

/// Cloning shares the underlying state, so a test can drive the
/// controller through one handle and inspect through another.
#[derive(Clone)]
pub struct FakeApi {
    inner: Arc<Inner>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                viewer_id: UserId::new(),
                viewer_role: Role::Candidate,
                rooms: Mutex::new(Vec::new()),
                messages: Mutex::new(HashMap::new()),
                clock_ticks: AtomicUsize::new(0),
                fail_uploads: Mutex::new(HashSet::new()),
                fail_mark_read: AtomicBool::new(false),
                fail_fetch: AtomicBool::new(false),
                fetch_calls: AtomicUsize::new(0),
                send_calls: AtomicUsize::new(0),
                mark_read_calls: AtomicUsize::new(0),
                upload_calls: AtomicUsize::new(0),
                fetch_gates: Mutex::new(HashMap::new()),
                send_gate: Mutex::new(None),
            }),
        }
    }

    pub fn add_room(&self, company: &str, job_title: &str) -> RoomId {
        let room = RoomSummary {
            id: RoomId::new(),
            candidate_id: self.inner.viewer_id,
            company_user_id: UserId::new(),
            company_name: company.to_string(),
            candidate_name: "山田 太郎".to_string(),
            job_title: job_title.to_string(),
            candidate_current_company: None,
            last_message_preview: None,
            last_message_at: None,
            unread_count: 0,
            is_unread: false,
        };
        let id = room.id;
        self.inner.rooms.lock().unwrap().push(room);
        self.inner.messages.lock().unwrap().insert(id, Vec::new());
        id
    }

    /// Seed an incoming SENT message from the counterpart and bump the
    /// viewer-side unread counter, as a server append would.
    pub fn seed_incoming(&self, room: RoomId, content: &str) -> MessageId {
        let sent_at = self.tick();
        let record = MessageRecord {
            id: MessageId::new(),
            room_id: room,
            sender_role: self.inner.viewer_role.counterpart(),
            sender_id: UserId::new(),
            subject: None,
            content: content.to_string(),
            file_urls: Vec::new(),
            status: MessageStatus::Sent,
            sent_at,
            read_at: None,
            replied_at: None,
            is_own_message: false,
        };
        let id = record.id;
        self.inner
            .messages
            .lock()
            .unwrap()
            .entry(room)
            .or_default()
            .push(record);
        let mut rooms = self.inner.rooms.lock().unwrap();
        if let Some(summary) = rooms.iter_mut().find(|r| r.id == room) {
            summary.unread_count += 1;
            summary.is_unread = true;
            summary.last_message_preview = Some(content.to_string());
            summary.last_message_at = Some(sent_at);
        }
        id
    }

    pub fn fail_upload_of(&self, file_name: &str) {
        self.inner
            .fail_uploads
            .lock()
            .unwrap()
            .insert(file_name.to_string());
    }

    pub fn fail_mark_read(&self, fail: bool) {
        self.inner.fail_mark_read.store(fail, Ordering::SeqCst);
    }

    pub fn fail_fetch(&self, fail: bool) {
        self.inner.fail_fetch.store(fail, Ordering::SeqCst);
    }

    /// Hold the next fetch for `room` open until [`FakeApi::release_fetch`].
    pub fn hold_fetch(&self, room: RoomId) {
        self.inner
            .fetch_gates
            .lock()
            .unwrap()
            .insert(room, Arc::new(Notify::new()));
    }

    pub fn release_fetch(&self, room: RoomId) {
        if let Some(gate) = self.inner.fetch_gates.lock().unwrap().get(&room) {
            gate.notify_one();
        }
    }

    /// Hold the next send open until [`FakeApi::release_send`].
    pub fn hold_send(&self) {
        *self.inner.send_gate.lock().unwrap() = Some(Arc::new(Notify::new()));
    }

    pub fn release_send(&self) {
        if let Some(gate) = self.inner.send_gate.lock().unwrap().as_ref() {
            gate.notify_one();
        }
    }

    pub fn messages_in(&self, room: RoomId) -> Vec<MessageRecord> {
        self.inner
            .messages
            .lock()
            .unwrap()
            .get(&room)
            .cloned()
            .unwrap_or_default()
    }

    pub fn fetch_calls(&self) -> usize {
        self.inner.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn send_calls(&self) -> usize {
        self.inner.send_calls.load(Ordering::SeqCst)
    }

    pub fn mark_read_calls(&self) -> usize {
        self.inner.mark_read_calls.load(Ordering::SeqCst)
    }

    pub fn upload_calls(&self) -> usize {
        self.inner.upload_calls.load(Ordering::SeqCst)
    }

    // Strictly increasing timestamps so transcript order is deterministic.
    fn tick(&self) -> chrono::DateTime<Utc> {
        let n = self.inner.clock_ticks.fetch_add(1, Ordering::SeqCst) as i64;
        Utc::now() + Duration::milliseconds(n)
    }

    fn fetch_gate(&self, room: RoomId) -> Option<Arc<Notify>> {
        self.inner.fetch_gates.lock().unwrap().get(&room).cloned()
    }
}

impl MessagingApi for FakeApi {
    async fn list_rooms(&self) -> Result<Vec<RoomSummary>, ClientError> {
        Ok(self.inner.rooms.lock().unwrap().clone())
    }

    async fn fetch_messages(&self, room: RoomId) -> Result<Vec<MessageRecord>, ClientError> {
        self.inner.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = self.fetch_gate(room) {
            gate.notified().await;
        }
        if self.inner.fail_fetch.load(Ordering::SeqCst) {
            return Err(ClientError::Api {
                status: 500,
                message: "transcript unavailable".to_string(),
            });
        }
        Ok(self.messages_in(room))
    }

    async fn send_message(
        &self,
        room: RoomId,
        request: SendMessageRequest,
    ) -> Result<SendMessageResponse, ClientError> {
        self.inner.send_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.inner.send_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let sent_at = self.tick();
        let record = MessageRecord {
            id: MessageId::new(),
            room_id: room,
            sender_role: self.inner.viewer_role,
            sender_id: self.inner.viewer_id,
            subject: request.subject,
            content: request.content.clone(),
            file_urls: request.file_urls,
            status: MessageStatus::Sent,
            sent_at,
            read_at: None,
            replied_at: None,
            is_own_message: true,
        };
        let id = record.id;
        self.inner
            .messages
            .lock()
            .unwrap()
            .entry(room)
            .or_default()
            .push(record);
        let mut rooms = self.inner.rooms.lock().unwrap();
        if let Some(summary) = rooms.iter_mut().find(|r| r.id == room) {
            summary.last_message_preview = Some(request.content);
            summary.last_message_at = Some(sent_at);
        }
        Ok(SendMessageResponse { id, sent_at })
    }

    async fn mark_read(&self, room: RoomId) -> Result<MarkReadResponse, ClientError> {
        self.inner.mark_read_calls.fetch_add(1, Ordering::SeqCst);
        if self.inner.fail_mark_read.load(Ordering::SeqCst) {
            return Err(ClientError::Api {
                status: 500,
                message: "reconciliation failed".to_string(),
            });
        }

        let read_at = self.tick();
        let mut marked = 0;
        if let Some(transcript) = self.inner.messages.lock().unwrap().get_mut(&room) {
            for message in transcript.iter_mut() {
                if !message.is_own_message && message.status == MessageStatus::Sent {
                    message.status = MessageStatus::Read;
                    message.read_at = Some(read_at);
                    marked += 1;
                }
            }
        }
        let mut rooms = self.inner.rooms.lock().unwrap();
        if let Some(summary) = rooms.iter_mut().find(|r| r.id == room) {
            summary.unread_count = 0;
            summary.is_unread = false;
        }
        Ok(MarkReadResponse {
            marked,
            unread_count: 0,
        })
    }

    async fn upload_attachment(&self, file: &OutgoingFile) -> Result<UploadResponse, ClientError> {
        self.inner.upload_calls.fetch_add(1, Ordering::SeqCst);
        if self
            .inner
            .fail_uploads
            .lock()
            .unwrap()
            .contains(&file.file_name)
        {
            return Err(ClientError::Api {
                status: 500,
                message: format!("storage rejected {}", file.file_name),
            });
        }
        Ok(UploadResponse {
            url: format!(
                "https://files.test/{}/{}",
                uuid::Uuid::new_v4(),
                file.file_name
            ),
            file_name: file.file_name.clone(),
            size: file.size() as u64,
        })
    }
}
