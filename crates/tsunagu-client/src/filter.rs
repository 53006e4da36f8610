//! The room list filter/sort engine.
//!
//! A deliberately pure function over a room-list snapshot: identical
//! inputs always produce the identical ordered subset, with no caching or
//! incremental derivation. The caller re-runs it whenever the snapshot or
//! the filters change.

use std::cmp::Ordering;

use icu_collator::{Collator, CollatorOptions, Strength};
use icu_locid::locale;

use tsunagu_shared::protocol::RoomSummary;
use tsunagu_shared::types::{Role, RoomId};

/// Read-state filter, used on the company side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Unread,
    Read,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    /// Unread rooms first, then most recent activity.
    #[default]
    Date,
    /// Candidate name, Japanese collation.
    Name,
    /// Company name, Japanese collation.
    Company,
}

/// Ephemeral, client-held view filters. Rebuilt from defaults each
/// session, never persisted.
#[derive(Debug, Clone, Default)]
pub struct RoomFilters {
    pub status: StatusFilter,
    /// Company-side grouping: exact company-name match.
    pub group: Option<String>,
    /// Candidate-side narrowing to a single room.
    pub room: Option<RoomId>,
    /// Case-insensitive substring match. Empty matches everything.
    pub keyword: String,
    pub sort: SortKey,
}

/// Derive the displayed, ordered room subset for a viewer.
pub fn visible_rooms(rooms: &[RoomSummary], role: Role, filters: &RoomFilters) -> Vec<RoomSummary> {
    let keyword = filters.keyword.trim().to_lowercase();

    let mut visible: Vec<RoomSummary> = rooms
        .iter()
        .filter(|room| matches_filters(room, role, filters, &keyword))
        .cloned()
        .collect();

    let collator = japanese_collator();
    visible.sort_by(|a, b| compare_rooms(a, b, filters.sort, collator.as_ref()));
    visible
}

fn matches_filters(
    room: &RoomSummary,
    role: Role,
    filters: &RoomFilters,
    keyword: &str,
) -> bool {
    let keyword_haystack = match role {
        Role::Candidate => {
            if let Some(wanted) = filters.room {
                if room.id != wanted {
                    return false;
                }
            }
            format!("{} {}", room.company_name, room.job_title)
        }
        Role::CompanyUser => {
            let read_state_ok = match filters.status {
                StatusFilter::All => true,
                StatusFilter::Unread => room.is_unread,
                StatusFilter::Read => !room.is_unread,
            };
            if !read_state_ok {
                return false;
            }
            if let Some(ref group) = filters.group {
                if &room.company_name != group {
                    return false;
                }
            }
            format!(
                "{} {}",
                room.candidate_name,
                room.candidate_current_company.as_deref().unwrap_or("")
            )
        }
    };

    keyword.is_empty() || keyword_haystack.to_lowercase().contains(keyword)
}

fn compare_rooms(
    a: &RoomSummary,
    b: &RoomSummary,
    sort: SortKey,
    collator: Option<&Collator>,
) -> Ordering {
    let by_recency = |a: &RoomSummary, b: &RoomSummary| {
        // Descending; rooms without any message sort last.
        b.last_message_at.cmp(&a.last_message_at)
    };
    let by_text = |x: &str, y: &str| match collator {
        Some(c) => c.compare(x, y),
        None => x.cmp(y),
    };

    let primary = match sort {
        SortKey::Date => b
            .is_unread
            .cmp(&a.is_unread)
            .then_with(|| by_recency(a, b)),
        SortKey::Name => {
            by_text(&a.candidate_name, &b.candidate_name).then_with(|| by_recency(a, b))
        }
        SortKey::Company => {
            by_text(&a.company_name, &b.company_name).then_with(|| by_recency(a, b))
        }
    };

    // Stable final tiebreak so equal rooms keep a deterministic order.
    primary.then_with(|| a.id.cmp(&b.id))
}

/// Japanese-locale collator for name/company ordering. Falls back to
/// plain code-point comparison if collation data is unavailable.
fn japanese_collator() -> Option<Collator> {
    let mut options = CollatorOptions::new();
    options.strength = Some(Strength::Tertiary);
    Collator::try_new(&locale!("ja").into(), options).ok()
}
