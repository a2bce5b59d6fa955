//! Party types: a reader's traversal session through a story.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

use super::page::PageId;
use super::story::StoryId;

/// Unique identifier for a party.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PartyId(Uuid);

impl PartyId {
    /// Create a new PartyId from a UUID.
    pub fn new(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }

    /// Generate a new random PartyId.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for PartyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for the reader owning a party.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(Uuid);

impl UserId {
    /// Create a new UserId from a UUID.
    pub fn new(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }

    /// Generate a new random UserId.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A reader's traversal session through a story's graph.
///
/// `path` is an append-only visit log: it grows on every page visit and
/// is never rewritten, which makes progress monotonic by construction.
/// `end_date` is set exactly once, on first arrival at an ending page;
/// [`Party::finish`] is idempotent after that.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Party {
    /// Unique party identifier.
    pub id: PartyId,
    /// Owning reader.
    pub user_id: UserId,
    /// Story being read.
    pub story_id: StoryId,
    /// When the session started.
    pub start_date: DateTime<Utc>,
    /// When the first ending was reached, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
    /// Ordered visit log of page ids.
    pub path: Vec<PageId>,
    /// The ending page reached, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ending_page_id: Option<PageId>,
}

impl Party {
    /// Create a fresh party with an empty path.
    pub fn new(id: PartyId, user_id: UserId, story_id: StoryId, start_date: DateTime<Utc>) -> Self {
        Self {
            id,
            user_id,
            story_id,
            start_date,
            end_date: None,
            path: Vec::new(),
            ending_page_id: None,
        }
    }

    /// Append a page visit to the log.
    pub fn record_visit(&mut self, page: PageId) {
        self.path.push(page);
    }

    /// Mark the session finished on `page`, if not already finished.
    ///
    /// Returns `true` when this call set `end_date` (the caller should
    /// fire the one-time completion side effect), `false` when the party
    /// had already ended.
    pub fn finish(&mut self, page: PageId, at: DateTime<Utc>) -> bool {
        if self.end_date.is_some() {
            return false;
        }
        self.end_date = Some(at);
        self.ending_page_id = Some(page);
        true
    }

    /// Whether the party has reached an ending.
    pub fn is_ended(&self) -> bool {
        self.end_date.is_some()
    }

    /// The page the reader is currently on, if any visit was recorded.
    pub fn current_page(&self) -> Option<PageId> {
        self.path.last().copied()
    }

    /// Number of distinct pages visited.
    pub fn distinct_visited(&self) -> usize {
        self.path.iter().collect::<BTreeSet<_>>().len()
    }
}

/// Partial update for a party, used to append path entries and set the
/// end date through the persistence collaborator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyUpdate {
    /// Page visits to append to the path.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub append_path: Vec<PageId>,
    /// End date to set (only honored if not already set).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
    /// Ending page to record.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ending_page_id: Option<PageId>,
}

impl PartyUpdate {
    /// Append a single visit.
    pub fn visit(page: PageId) -> Self {
        Self {
            append_path: vec![page],
            ..Self::default()
        }
    }

    /// Append a visit and finish the party.
    pub fn visit_and_finish(page: PageId, at: DateTime<Utc>) -> Self {
        Self {
            append_path: vec![page],
            end_date: Some(at),
            ending_page_id: Some(page),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_party() -> Party {
        Party::new(
            PartyId::new(Uuid::from_u128(1)),
            UserId::new(Uuid::from_u128(2)),
            StoryId::new(Uuid::from_u128(3)),
            Utc::now(),
        )
    }

    fn pid(id: u128) -> PageId {
        PageId::new(Uuid::from_u128(id))
    }

    #[test]
    fn test_path_is_append_only() {
        let mut party = make_party();
        party.record_visit(pid(1));
        party.record_visit(pid(2));
        party.record_visit(pid(1));
        assert_eq!(party.path.len(), 3);
        assert_eq!(party.distinct_visited(), 2);
        assert_eq!(party.current_page(), Some(pid(1)));
    }

    #[test]
    fn test_finish_is_idempotent() {
        let mut party = make_party();
        let t1 = Utc::now();
        assert!(party.finish(pid(5), t1));
        assert!(!party.finish(pid(6), Utc::now()));
        assert_eq!(party.end_date, Some(t1));
        assert_eq!(party.ending_page_id, Some(pid(5)));
    }

    #[test]
    fn test_party_json_shape() {
        let mut party = make_party();
        party.record_visit(pid(1));
        let json = serde_json::to_value(&party).unwrap();
        assert!(json.get("userId").is_some());
        assert!(json.get("startDate").is_some());
        assert!(json.get("endDate").is_none());
        assert_eq!(json["path"].as_array().unwrap().len(), 1);
    }
}
