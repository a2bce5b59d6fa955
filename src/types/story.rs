//! Story types: the owning collection of pages and choices.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a story.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StoryId(Uuid);

impl StoryId {
    /// Create a new StoryId from a UUID.
    pub fn new(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Create a new StoryId from a UUID string.
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }

    /// Get the inner UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }

    /// Generate a new random StoryId.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for StoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for StoryId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Publication status of a story.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoryStatus {
    /// Visible to its author only.
    Draft,
    /// Visible to readers.
    Published,
}

impl StoryStatus {
    /// Parse status from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "draft" => Some(Self::Draft),
            "published" => Some(Self::Published),
            _ => None,
        }
    }
}

impl Default for StoryStatus {
    fn default() -> Self {
        Self::Draft
    }
}

impl fmt::Display for StoryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Draft => write!(f, "draft"),
            Self::Published => write!(f, "published"),
        }
    }
}

/// The owning collection of pages and choices.
///
/// Beyond acting as the partition key for one graph instance, the story
/// record only carries its publication status and title.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Story {
    /// Unique story identifier.
    pub id: StoryId,
    /// Display title.
    pub title: String,
    /// Publication status.
    pub status: StoryStatus,
}

impl Story {
    /// Create a new draft story.
    pub fn new(id: StoryId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            status: StoryStatus::Draft,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parsing() {
        assert_eq!(StoryStatus::parse("draft"), Some(StoryStatus::Draft));
        assert_eq!(StoryStatus::parse("PUBLISHED"), Some(StoryStatus::Published));
        assert_eq!(StoryStatus::parse("archived"), None);
    }

    #[test]
    fn test_status_serde() {
        let json = serde_json::to_string(&StoryStatus::Published).unwrap();
        assert_eq!(json, "\"published\"");
    }
}
