use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::SharedError;

/// The two participant kinds of a conversation. Closed by design: every
/// room pairs exactly one candidate with one company user, and all
/// role-dependent behavior dispatches on this enum rather than on flags.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Candidate,
    CompanyUser,
}

impl Role {
    /// The other side of the conversation.
    pub fn counterpart(self) -> Role {
        match self {
            Role::Candidate => Role::CompanyUser,
            Role::CompanyUser => Role::Candidate,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Candidate => "candidate",
            Role::CompanyUser => "company_user",
        }
    }
}

impl FromStr for Role {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "candidate" => Ok(Role::Candidate),
            "company_user" => Ok(Role::CompanyUser),
            other => Err(SharedError::InvalidRole(other.to_string())),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Delivery status of a message. Transitions are monotonic:
/// `Sent -> Read -> Replied`, one step at a time, never backwards.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageStatus {
    Sent,
    Read,
    Replied,
}

impl MessageStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageStatus::Sent => "SENT",
            MessageStatus::Read => "READ",
            MessageStatus::Replied => "REPLIED",
        }
    }

    fn rank(self) -> u8 {
        match self {
            MessageStatus::Sent => 0,
            MessageStatus::Read => 1,
            MessageStatus::Replied => 2,
        }
    }

    /// Whether `next` is a legal transition from this status.
    /// Skipping Read (Sent -> Replied) is not allowed: a reply implies
    /// the message was read first.
    pub fn can_become(self, next: MessageStatus) -> bool {
        next.rank() == self.rank() + 1
    }
}

impl FromStr for MessageStatus {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SENT" => Ok(MessageStatus::Sent),
            "READ" => Ok(MessageStatus::Read),
            "REPLIED" => Ok(MessageStatus::Replied),
            other => Err(SharedError::InvalidStatus(other.to_string())),
        }
    }
}

impl std::fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoomId(pub Uuid);

impl RoomId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RoomId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RoomId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(pub Uuid);

impl MessageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(pub Uuid);

impl UserId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_counterpart_is_involutive() {
        assert_eq!(Role::Candidate.counterpart(), Role::CompanyUser);
        assert_eq!(Role::CompanyUser.counterpart().counterpart(), Role::CompanyUser);
    }

    #[test]
    fn role_round_trip() {
        for role in [Role::Candidate, Role::CompanyUser] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("admin".parse::<Role>().is_err());
    }

    #[test]
    fn status_transitions_are_monotonic() {
        assert!(MessageStatus::Sent.can_become(MessageStatus::Read));
        assert!(MessageStatus::Read.can_become(MessageStatus::Replied));

        // No regressions, no skipping Read.
        assert!(!MessageStatus::Read.can_become(MessageStatus::Sent));
        assert!(!MessageStatus::Replied.can_become(MessageStatus::Read));
        assert!(!MessageStatus::Sent.can_become(MessageStatus::Replied));
        assert!(!MessageStatus::Sent.can_become(MessageStatus::Sent));
    }

    #[test]
    fn status_round_trip() {
        for status in [
            MessageStatus::Sent,
            MessageStatus::Read,
            MessageStatus::Replied,
        ] {
            assert_eq!(status.as_str().parse::<MessageStatus>().unwrap(), status);
        }
        assert!("DELETED".parse::<MessageStatus>().is_err());
    }
}
