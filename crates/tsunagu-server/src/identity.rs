//! Caller identity, supplied by the out-of-scope auth layer.
//!
//! Authentication happens upstream; by the time a request reaches this
//! service the gateway has already verified the session and stamped the
//! caller's id and role onto the request headers. This extractor only
//! parses those headers — it performs no credential checks itself.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use tsunagu_shared::types::{Role, UserId};

use crate::error::ServerError;

pub use tsunagu_shared::constants::{USER_ID_HEADER, USER_ROLE_HEADER};

/// The verified caller: who they are and which side of the conversation
/// they sit on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub role: Role,
}

#[async_trait]
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = header_value(parts, USER_ID_HEADER)?
            .parse::<Uuid>()
            .map_err(|e| ServerError::Unauthorized(format!("invalid {USER_ID_HEADER}: {e}")))?;

        let role = header_value(parts, USER_ROLE_HEADER)?
            .parse::<Role>()
            .map_err(|e| ServerError::Unauthorized(format!("invalid {USER_ROLE_HEADER}: {e}")))?;

        Ok(Identity {
            user_id: UserId(user_id),
            role,
        })
    }
}

fn header_value<'a>(parts: &'a Parts, name: &str) -> Result<&'a str, ServerError> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ServerError::Unauthorized(format!("missing {name} header")))
}
