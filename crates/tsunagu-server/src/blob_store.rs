//! Disk-backed storage for message attachments.
//!
//! Blobs are stored under a UUID key; the original file name only lives in
//! the public URL so the client can derive a display name. This layer is a
//! thin size/naming policy over the filesystem — it knows nothing about
//! rooms or messages.

use std::path::PathBuf;

use tokio::fs;
use tracing::{debug, info};
use uuid::Uuid;

use tsunagu_shared::attachment::encode_file_name;

use crate::error::ServerError;

/// Maximum accepted file-name length in bytes.
const MAX_FILE_NAME_BYTES: usize = 255;

#[derive(Debug, Clone)]
pub struct StoredBlob {
    pub id: Uuid,
    pub file_name: String,
    pub size: u64,
}

impl StoredBlob {
    /// Public download URL for this blob, filename-preserving so the
    /// client can show it without another lookup.
    pub fn public_url(&self, base_url: &str) -> String {
        format!(
            "{}/files/{}/{}",
            base_url,
            self.id,
            encode_file_name(&self.file_name)
        )
    }
}

#[derive(Debug, Clone)]
pub struct BlobStore {
    base_path: PathBuf,
    max_file_bytes: usize,
}

impl BlobStore {
    pub async fn new(base_path: PathBuf, max_file_bytes: usize) -> Result<Self, ServerError> {
        fs::create_dir_all(&base_path).await.map_err(|e| {
            ServerError::BlobStorage(format!(
                "Failed to create attachment directory '{}': {}",
                base_path.display(),
                e
            ))
        })?;

        info!(path = %base_path.display(), "Attachment store initialized");

        Ok(Self {
            base_path,
            max_file_bytes,
        })
    }

    /// Persist one attachment and return its key. The file name is kept
    /// only as metadata for URL construction; on disk the blob is the
    /// UUID.
    pub async fn store(&self, file_name: &str, data: &[u8]) -> Result<StoredBlob, ServerError> {
        let file_name = sanitize_file_name(file_name)?;

        if data.is_empty() {
            return Err(ServerError::BadRequest("Empty attachment".to_string()));
        }
        if data.len() > self.max_file_bytes {
            return Err(ServerError::AttachmentTooLarge {
                size: data.len(),
                max: self.max_file_bytes,
            });
        }

        let id = Uuid::new_v4();
        let path = self.blob_path(&id);

        fs::write(&path, data).await.map_err(|e| {
            ServerError::BlobStorage(format!("Failed to write attachment {}: {}", id, e))
        })?;

        debug!(id = %id, name = %file_name, size = data.len(), "Stored attachment");
        Ok(StoredBlob {
            id,
            file_name,
            size: data.len() as u64,
        })
    }

    pub async fn read(&self, id: Uuid) -> Result<Vec<u8>, ServerError> {
        let path = self.blob_path(&id);

        if !path.exists() {
            return Err(ServerError::AttachmentNotFound(id));
        }

        let data = fs::read(&path).await.map_err(|e| {
            ServerError::BlobStorage(format!("Failed to read attachment {}: {}", id, e))
        })?;

        debug!(id = %id, size = data.len(), "Retrieved attachment");
        Ok(data)
    }

    /// The on-disk key is a UUID string, which cannot traverse out of the
    /// base directory.
    fn blob_path(&self, id: &Uuid) -> PathBuf {
        self.base_path.join(id.to_string())
    }
}

/// Validate a client-supplied file name: non-empty, bounded, and free of
/// path separators or traversal sequences.
fn sanitize_file_name(name: &str) -> Result<String, ServerError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ServerError::BadRequest("Missing file name".to_string()));
    }
    if name.len() > MAX_FILE_NAME_BYTES {
        return Err(ServerError::BadRequest("File name too long".to_string()));
    }
    if name.contains('/') || name.contains('\\') || name.contains("..") {
        return Err(ServerError::BadRequest(
            "File name must not contain path separators".to_string(),
        ));
    }
    Ok(name.to_string())
}
