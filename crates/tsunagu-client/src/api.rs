//! The client's view of the server API.
//!
//! [`MessagingApi`] is the synchronization seam: every operation is an
//! explicit request/response call, and "refresh" means calling
//! [`MessagingApi::fetch_messages`] or [`MessagingApi::list_rooms`] again.
//! A future push transport would implement this same trait and feed the
//! controller identically.

use serde::de::DeserializeOwned;

use tsunagu_shared::constants::{USER_ID_HEADER, USER_ROLE_HEADER};
use tsunagu_shared::protocol::{
    MarkReadResponse, MessageRecord, RoomSummary, SendMessageRequest, SendMessageResponse,
    UploadResponse,
};
use tsunagu_shared::types::{Role, RoomId, UserId};

use crate::error::ClientError;

/// One file picked for upload, already read into memory.
#[derive(Debug, Clone)]
pub struct OutgoingFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl OutgoingFile {
    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// Server operations the controller depends on.
pub trait MessagingApi {
    fn list_rooms(&self) -> impl std::future::Future<Output = Result<Vec<RoomSummary>, ClientError>> + Send;

    fn fetch_messages(
        &self,
        room: RoomId,
    ) -> impl std::future::Future<Output = Result<Vec<MessageRecord>, ClientError>> + Send;

    fn send_message(
        &self,
        room: RoomId,
        request: SendMessageRequest,
    ) -> impl std::future::Future<Output = Result<SendMessageResponse, ClientError>> + Send;

    /// Run a read reconciliation pass for the caller over the room.
    /// Idempotent server-side.
    fn mark_read(
        &self,
        room: RoomId,
    ) -> impl std::future::Future<Output = Result<MarkReadResponse, ClientError>> + Send;

    fn upload_attachment(
        &self,
        file: &OutgoingFile,
    ) -> impl std::future::Future<Output = Result<UploadResponse, ClientError>> + Send;
}

/// HTTP implementation backed by reqwest. The identity headers mirror
/// what the auth gateway stamps server-side; in a deployed client they
/// come from the session layer.
pub struct HttpApi {
    http: reqwest::Client,
    base_url: String,
    user_id: UserId,
    role: Role,
}

impl HttpApi {
    pub fn new(base_url: &str, user_id: UserId, role: Role) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            user_id,
            role,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, self.url(path))
            .header(USER_ID_HEADER, self.user_id.to_string())
            .header(USER_ROLE_HEADER, self.role.as_str())
    }

    async fn parse<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        #[derive(serde::Deserialize)]
        struct ErrorBody {
            error: String,
        }
        let message = response
            .json::<ErrorBody>()
            .await
            .map(|b| b.error)
            .unwrap_or_else(|_| status.to_string());
        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

impl MessagingApi for HttpApi {
    async fn list_rooms(&self) -> Result<Vec<RoomSummary>, ClientError> {
        let response = self.request(reqwest::Method::GET, "/rooms").send().await?;
        Self::parse(response).await
    }

    async fn fetch_messages(&self, room: RoomId) -> Result<Vec<MessageRecord>, ClientError> {
        let response = self
            .request(reqwest::Method::GET, &format!("/rooms/{room}/messages"))
            .send()
            .await?;
        Self::parse(response).await
    }

    async fn send_message(
        &self,
        room: RoomId,
        request: SendMessageRequest,
    ) -> Result<SendMessageResponse, ClientError> {
        let response = self
            .request(reqwest::Method::POST, &format!("/rooms/{room}/messages"))
            .json(&request)
            .send()
            .await?;
        Self::parse(response).await
    }

    async fn mark_read(&self, room: RoomId) -> Result<MarkReadResponse, ClientError> {
        let response = self
            .request(reqwest::Method::POST, &format!("/rooms/{room}/read"))
            .send()
            .await?;
        Self::parse(response).await
    }

    async fn upload_attachment(&self, file: &OutgoingFile) -> Result<UploadResponse, ClientError> {
        let part = reqwest::multipart::Part::bytes(file.bytes.clone())
            .file_name(file.file_name.clone());
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .request(reqwest::Method::POST, "/attachments")
            .multipart(form)
            .send()
            .await?;
        Self::parse(response).await
    }
}
