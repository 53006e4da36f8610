use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::Method,
    middleware,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Serialize;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

use tsunagu_shared::constants::{
    MAX_ATTACHMENTS_PER_MESSAGE, MAX_ATTACHMENT_BATCH_BYTES, MAX_MESSAGE_CONTENT_BYTES,
};
use tsunagu_shared::protocol::{
    CreateRoomRequest, CreateRoomResponse, MarkReadResponse, MessageRecord, RoomSummary,
    SendMessageRequest, SendMessageResponse, UploadResponse,
};
use tsunagu_shared::types::{Role, RoomId};
use tsunagu_store::{Database, Message, Room, StoreError};

use crate::blob_store::BlobStore;
use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::identity::Identity;
use crate::rate_limit::{rate_limit_middleware, RateLimiter};

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Database>>,
    pub blob_store: Arc<BlobStore>,
    pub rate_limiter: RateLimiter,
    pub config: Arc<ServerConfig>,
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/rooms", get(list_rooms).post(create_room))
        .route(
            "/rooms/:room_id/messages",
            get(get_messages).post(send_message),
        )
        .route("/rooms/:room_id/read", post(mark_read))
        .route("/attachments", post(upload_attachment))
        .route("/files/:id/:name", get(download_attachment))
        // One attachment per request plus multipart framing overhead.
        .layer(DefaultBodyLimit::max(MAX_ATTACHMENT_BATCH_BYTES + 64 * 1024))
        .layer(middleware::from_fn_with_state(
            state.rate_limiter.clone(),
            rate_limit_middleware,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ─── Rooms ───

async fn create_room(
    State(state): State<AppState>,
    identity: Identity,
    Json(req): Json<CreateRoomRequest>,
) -> Result<Json<CreateRoomResponse>, ServerError> {
    let room = Room {
        id: RoomId::new(),
        candidate_id: req.candidate_id,
        company_user_id: req.company_user_id,
        company_name: req.company_name,
        candidate_name: req.candidate_name,
        job_title: req.job_title,
        candidate_current_company: req.candidate_current_company,
        last_message_preview: None,
        last_message_at: None,
        candidate_unread: 0,
        company_unread: 0,
        created_at: Utc::now(),
    };

    state.db.lock().await.create_room(&room)?;

    info!(room_id = %room.id, created_by = %identity.user_id, "room created");
    Ok(Json(CreateRoomResponse { id: room.id }))
}

async fn list_rooms(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<Vec<RoomSummary>>, ServerError> {
    let rooms = state
        .db
        .lock()
        .await
        .list_rooms_for_viewer(identity.user_id, identity.role)?;

    let summaries = rooms
        .iter()
        .map(|room| room_summary(room, identity.role))
        .collect();
    Ok(Json(summaries))
}

// ─── Messages ───

async fn get_messages(
    State(state): State<AppState>,
    identity: Identity,
    Path(room_id): Path<Uuid>,
) -> Result<Json<Vec<MessageRecord>>, ServerError> {
    let room_id = RoomId(room_id);
    let db = state.db.lock().await;

    let room = load_room(&db, room_id)?;
    ensure_participant(&room, &identity)?;

    let messages = db.messages_for_room(room_id)?;
    let records = messages
        .into_iter()
        .map(|m| message_record(m, identity.role))
        .collect();
    Ok(Json(records))
}

async fn send_message(
    State(state): State<AppState>,
    identity: Identity,
    Path(room_id): Path<Uuid>,
    Json(req): Json<SendMessageRequest>,
) -> Result<Json<SendMessageResponse>, ServerError> {
    let room_id = RoomId(room_id);

    if req.content.trim().is_empty() && req.file_urls.is_empty() {
        return Err(ServerError::BadRequest(
            "Message must carry text or at least one attachment".to_string(),
        ));
    }
    if req.content.len() > MAX_MESSAGE_CONTENT_BYTES {
        return Err(ServerError::BadRequest(format!(
            "Message content exceeds {MAX_MESSAGE_CONTENT_BYTES} bytes"
        )));
    }
    if req.file_urls.len() > MAX_ATTACHMENTS_PER_MESSAGE {
        return Err(ServerError::BadRequest(format!(
            "At most {MAX_ATTACHMENTS_PER_MESSAGE} attachments per message"
        )));
    }

    let mut db = state.db.lock().await;
    let room = load_room(&db, room_id)?;
    ensure_participant(&room, &identity)?;

    let message = Message::new_sent(
        room_id,
        identity.role,
        identity.user_id,
        req.subject,
        req.content,
        req.file_urls,
        Utc::now(),
    );
    db.append_message(&message)?;

    info!(
        room_id = %room_id,
        message_id = %message.id,
        sender = %identity.role,
        attachments = message.file_urls.len(),
        "message sent"
    );
    Ok(Json(SendMessageResponse {
        id: message.id,
        sent_at: message.sent_at,
    }))
}

async fn mark_read(
    State(state): State<AppState>,
    identity: Identity,
    Path(room_id): Path<Uuid>,
) -> Result<Json<MarkReadResponse>, ServerError> {
    let room_id = RoomId(room_id);
    let mut db = state.db.lock().await;

    let room = load_room(&db, room_id)?;
    ensure_participant(&room, &identity)?;

    let outcome = db.reconcile_room(room_id, identity.role)?;
    Ok(Json(MarkReadResponse {
        marked: outcome.marked,
        unread_count: outcome.unread_count,
    }))
}

// ─── Attachments ───

async fn upload_attachment(
    State(state): State<AppState>,
    identity: Identity,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ServerError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(format!("Multipart error: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| ServerError::BadRequest("Missing attachment file name".to_string()))?;
        let data = field
            .bytes()
            .await
            .map_err(|e| ServerError::BadRequest(format!("Failed to read field: {}", e)))?;

        let blob = state.blob_store.store(&file_name, &data).await?;

        info!(
            id = %blob.id,
            name = %blob.file_name,
            size = blob.size,
            uploader = %identity.user_id,
            "attachment uploaded"
        );

        let url = blob.public_url(&state.config.public_base_url);
        return Ok(Json(UploadResponse {
            url,
            file_name: blob.file_name,
            size: blob.size,
        }));
    }

    Err(ServerError::BadRequest(
        "Missing 'file' field in multipart form".to_string(),
    ))
}

async fn download_attachment(
    State(state): State<AppState>,
    Path((id, _name)): Path<(Uuid, String)>,
) -> Result<Vec<u8>, ServerError> {
    // The trailing name segment only exists for display purposes; the
    // blob is addressed by its UUID.
    let data = state.blob_store.read(id).await?;
    Ok(data)
}

// ─── Helpers ───

fn load_room(db: &Database, room_id: RoomId) -> Result<Room, ServerError> {
    db.get_room(room_id).map_err(|e| match e {
        StoreError::NotFound => ServerError::RoomNotFound(room_id.0),
        other => ServerError::Store(other),
    })
}

fn ensure_participant(room: &Room, identity: &Identity) -> Result<(), ServerError> {
    if room.is_participant(identity.user_id, identity.role) {
        Ok(())
    } else {
        Err(ServerError::Forbidden(
            "Not a participant of this room".to_string(),
        ))
    }
}

fn room_summary(room: &Room, viewer: Role) -> RoomSummary {
    let unread = room.unread_for(viewer);
    RoomSummary {
        id: room.id,
        candidate_id: room.candidate_id,
        company_user_id: room.company_user_id,
        company_name: room.company_name.clone(),
        candidate_name: room.candidate_name.clone(),
        job_title: room.job_title.clone(),
        candidate_current_company: room.candidate_current_company.clone(),
        last_message_preview: room.last_message_preview.clone(),
        last_message_at: room.last_message_at,
        unread_count: unread,
        is_unread: unread > 0,
    }
}

fn message_record(message: Message, viewer: Role) -> MessageRecord {
    let is_own_message = message.sender_role == viewer;
    MessageRecord {
        id: message.id,
        room_id: message.room_id,
        sender_role: message.sender_role,
        sender_id: message.sender_id,
        subject: message.subject,
        content: message.content,
        file_urls: message.file_urls,
        status: message.status,
        sent_at: message.sent_at,
        read_at: message.read_at,
        replied_at: message.replied_at,
        is_own_message,
    }
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
