//! Choice types for the narrative graph.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::page::PageId;

/// Unique identifier for a choice edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChoiceId(Uuid);

impl ChoiceId {
    /// Create a new ChoiceId from a UUID.
    pub fn new(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Create a new ChoiceId from a UUID string.
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }

    /// Get the inner UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }

    /// Generate a new random ChoiceId.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ChoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for ChoiceId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// A directed, labeled edge from one page to another.
///
/// A choice with no target is a valid, incomplete edge: the author wrote
/// the option but has not yet developed the page it leads to. The
/// optional `condition` string is carried for the caller but never
/// evaluated by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Choice {
    /// Unique choice identifier.
    pub id: ChoiceId,
    /// Source page this choice hangs off.
    pub page_id: PageId,
    /// Label shown to the reader.
    pub text: String,
    /// Target page, absent while the choice is undeveloped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_page_id: Option<PageId>,
    /// Opaque condition string, carried but not evaluated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

impl Choice {
    /// Create a new choice.
    pub fn new(
        id: ChoiceId,
        page_id: PageId,
        text: impl Into<String>,
        target_page_id: Option<PageId>,
    ) -> Self {
        Self {
            id,
            page_id,
            text: text.into(),
            target_page_id,
            condition: None,
        }
    }

    /// Create a linked choice between two pages.
    pub fn linked(id: ChoiceId, source: PageId, target: PageId, text: impl Into<String>) -> Self {
        Self::new(id, source, text, Some(target))
    }

    /// Whether this choice has a target page yet.
    pub fn is_developed(&self) -> bool {
        self.target_page_id.is_some()
    }

    /// Set the condition string.
    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }
}

impl PartialEq for Choice {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Choice {}

// Canonical ordering: source page, then target, then id. Undeveloped
// choices sort before developed ones from the same page.
impl PartialOrd for Choice {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Choice {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        match self.page_id.cmp(&other.page_id) {
            std::cmp::Ordering::Equal => match self.target_page_id.cmp(&other.target_page_id) {
                std::cmp::Ordering::Equal => self.id.cmp(&other.id),
                ord => ord,
            },
            ord => ord,
        }
    }
}

/// Partial update for a choice.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceUpdate {
    /// New label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// New target (outer None = untouched, inner None = unlinked).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_page_id: Option<Option<PageId>>,
    /// New condition string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<Option<String>>,
}

impl ChoiceUpdate {
    /// Link the choice to a target page.
    pub fn link(target: PageId) -> Self {
        Self {
            target_page_id: Some(Some(target)),
            ..Self::default()
        }
    }

    /// Replace the label.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    /// Apply this update to a choice in place.
    pub fn apply(&self, choice: &mut Choice) {
        if let Some(text) = &self.text {
            choice.text = text.clone();
        }
        if let Some(target) = self.target_page_id {
            choice.target_page_id = target;
        }
        if let Some(condition) = &self.condition {
            choice.condition = condition.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(id: u128) -> PageId {
        PageId::new(Uuid::from_u128(id))
    }

    #[test]
    fn test_choice_development() {
        let undeveloped = Choice::new(ChoiceId::new(Uuid::from_u128(1)), pid(1), "Go north", None);
        assert!(!undeveloped.is_developed());

        let linked = Choice::linked(ChoiceId::new(Uuid::from_u128(2)), pid(1), pid(2), "Go south");
        assert!(linked.is_developed());
    }

    #[test]
    fn test_choice_ordering() {
        let c1 = Choice::linked(ChoiceId::new(Uuid::from_u128(1)), pid(1), pid(2), "a");
        let c2 = Choice::linked(ChoiceId::new(Uuid::from_u128(2)), pid(1), pid(3), "b");
        let c3 = Choice::linked(ChoiceId::new(Uuid::from_u128(3)), pid(2), pid(3), "c");

        // Same source, different target
        assert!(c1 < c2);
        // Different source
        assert!(c1 < c3);
        assert!(c2 < c3);
    }

    #[test]
    fn test_choice_json_shape() {
        let c = Choice::linked(ChoiceId::new(Uuid::from_u128(1)), pid(1), pid(2), "Open the door");
        let json = serde_json::to_value(&c).unwrap();
        assert!(json.get("pageId").is_some());
        assert!(json.get("targetPageId").is_some());
        assert!(json.get("condition").is_none());
    }

    #[test]
    fn test_choice_update_link() {
        let mut c = Choice::new(ChoiceId::new(Uuid::from_u128(1)), pid(1), "Go", None);
        ChoiceUpdate::link(pid(9)).apply(&mut c);
        assert_eq!(c.target_page_id, Some(pid(9)));
    }
}
