//! Page types for the narrative graph.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::story::StoryId;

/// Unique identifier for a page in the story graph.
///
/// Wraps a UUID and implements `Ord` for deterministic ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PageId(Uuid);

impl PageId {
    /// Create a new PageId from a UUID.
    pub fn new(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Create a new PageId from a UUID string.
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }

    /// Get the inner UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }

    /// Generate a new random PageId.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for PageId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// A node of narrative content in a story graph.
///
/// Pages belong to exactly one story and are connected by [`Choice`]
/// edges. Empty content is allowed: authors create pages before writing
/// them. A page flagged `is_ending` terminates a reader session when
/// reached; its outgoing choices are hidden from navigation.
///
/// [`Choice`]: super::choice::Choice
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    /// Unique page identifier.
    pub id: PageId,
    /// Owning story.
    pub story_id: StoryId,
    /// Narrative text (may be empty while drafting).
    pub content: String,
    /// Whether reaching this page ends a reader session.
    pub is_ending: bool,
    /// Optional label shown when this ending is reached.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ending_label: Option<String>,
    /// Optional illustration reference.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub illustration: Option<String>,
}

impl Page {
    /// Create a new page with the given content.
    pub fn new(id: PageId, story_id: StoryId, content: impl Into<String>, is_ending: bool) -> Self {
        Self {
            id,
            story_id,
            content: content.into(),
            is_ending,
            ending_label: None,
            illustration: None,
        }
    }

    /// Set the ending label.
    pub fn with_ending_label(mut self, label: impl Into<String>) -> Self {
        self.ending_label = Some(label.into());
        self
    }

    /// Set the illustration reference.
    pub fn with_illustration(mut self, illustration: impl Into<String>) -> Self {
        self.illustration = Some(illustration.into());
        self
    }
}

// Identity and ordering follow the id, as for all graph records.
impl PartialEq for Page {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Page {}

impl PartialOrd for Page {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Page {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.id.cmp(&other.id)
    }
}

/// Partial update for a page.
///
/// `None` fields are left untouched by the store. `ending_label` and
/// `illustration` use a double `Option`: the outer layer means "change
/// this field", the inner layer is the new value (possibly cleared).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageUpdate {
    /// New narrative text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// New ending flag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_ending: Option<bool>,
    /// New ending label (outer None = untouched, inner None = cleared).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ending_label: Option<Option<String>>,
    /// New illustration reference.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub illustration: Option<Option<String>>,
}

impl PageUpdate {
    /// Update only the content.
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    /// Update only the ending flag and label.
    pub fn ending(is_ending: bool, label: Option<String>) -> Self {
        Self {
            is_ending: Some(is_ending),
            ending_label: Some(label),
            ..Self::default()
        }
    }

    /// Apply this update to a page in place.
    pub fn apply(&self, page: &mut Page) {
        if let Some(content) = &self.content {
            page.content = content.clone();
        }
        if let Some(is_ending) = self.is_ending {
            page.is_ending = is_ending;
        }
        if let Some(label) = &self.ending_label {
            page.ending_label = label.clone();
        }
        if let Some(illustration) = &self.illustration {
            page.illustration = illustration.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(id: u128) -> Page {
        Page::new(
            PageId::new(Uuid::from_u128(id)),
            StoryId::new(Uuid::from_u128(1)),
            "Once upon a time",
            false,
        )
    }

    #[test]
    fn test_page_id_ordering() {
        let id1 = PageId::parse("00000000-0000-0000-0000-000000000001").unwrap();
        let id2 = PageId::parse("00000000-0000-0000-0000-000000000002").unwrap();
        assert!(id1 < id2);
    }

    #[test]
    fn test_page_identity_is_id() {
        let mut a = page(1);
        let b = page(1);
        a.content = "edited".to_string();
        assert_eq!(a, b);
    }

    #[test]
    fn test_page_json_shape() {
        let p = page(7).with_ending_label("The End");
        let json = serde_json::to_value(&p).unwrap();
        assert!(json.get("storyId").is_some());
        assert!(json.get("isEnding").is_some());
        assert_eq!(json["endingLabel"], "The End");
        assert!(json.get("illustration").is_none());
    }

    #[test]
    fn test_page_update_apply() {
        let mut p = page(1);
        PageUpdate::ending(true, Some("Defeat".to_string())).apply(&mut p);
        assert!(p.is_ending);
        assert_eq!(p.ending_label.as_deref(), Some("Defeat"));

        // Clearing the label without touching the flag
        let clear = PageUpdate {
            ending_label: Some(None),
            ..PageUpdate::default()
        };
        clear.apply(&mut p);
        assert!(p.is_ending);
        assert!(p.ending_label.is_none());
    }
}
