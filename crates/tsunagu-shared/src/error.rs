use thiserror::Error;

#[derive(Error, Debug)]
pub enum SharedError {
    #[error("Unknown role: {0}")]
    InvalidRole(String),

    #[error("Unknown message status: {0}")]
    InvalidStatus(String),
}
