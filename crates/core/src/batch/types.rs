//! Batch data types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::post::PostType;

/// Pipeline state of a batch.
///
/// State machine flow:
/// ```text
/// S1_SETUP -> S2_SEEDED -> S4_SCRIPTED -> S5_PROMPTS_BUILT -> S6_QA -> S7_PUBLISH_PLAN -> S8_COMPLETE
///                                ^                  ^           |
///                                +------------------+-----------+  (QA rework)
/// ```
/// S8_COMPLETE is terminal. State numbering is part of the persisted wire
/// format, including the historical gap at S3.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum BatchState {
    #[serde(rename = "S1_SETUP")]
    Setup,
    #[serde(rename = "S2_SEEDED")]
    Seeded,
    #[serde(rename = "S4_SCRIPTED")]
    Scripted,
    #[serde(rename = "S5_PROMPTS_BUILT")]
    PromptsBuilt,
    #[serde(rename = "S6_QA")]
    Qa,
    #[serde(rename = "S7_PUBLISH_PLAN")]
    PublishPlan,
    #[serde(rename = "S8_COMPLETE")]
    Complete,
}

impl BatchState {
    /// Returns the state as its persisted string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchState::Setup => "S1_SETUP",
            BatchState::Seeded => "S2_SEEDED",
            BatchState::Scripted => "S4_SCRIPTED",
            BatchState::PromptsBuilt => "S5_PROMPTS_BUILT",
            BatchState::Qa => "S6_QA",
            BatchState::PublishPlan => "S7_PUBLISH_PLAN",
            BatchState::Complete => "S8_COMPLETE",
        }
    }

    /// All states in pipeline order.
    pub fn all() -> [BatchState; 7] {
        [
            BatchState::Setup,
            BatchState::Seeded,
            BatchState::Scripted,
            BatchState::PromptsBuilt,
            BatchState::Qa,
            BatchState::PublishPlan,
            BatchState::Complete,
        ]
    }
}

impl std::fmt::Display for BatchState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for BatchState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "S1_SETUP" => Ok(BatchState::Setup),
            "S2_SEEDED" => Ok(BatchState::Seeded),
            "S4_SCRIPTED" => Ok(BatchState::Scripted),
            "S5_PROMPTS_BUILT" => Ok(BatchState::PromptsBuilt),
            "S6_QA" => Ok(BatchState::Qa),
            "S7_PUBLISH_PLAN" => Ok(BatchState::PublishPlan),
            "S8_COMPLETE" => Ok(BatchState::Complete),
            other => Err(format!("unknown batch state: {}", other)),
        }
    }
}

/// Requested post counts per type for a batch.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct PostTypeCounts {
    #[serde(default)]
    pub value: u32,
    #[serde(default)]
    pub lifestyle: u32,
    #[serde(default)]
    pub product: u32,
}

impl PostTypeCounts {
    pub fn new(value: u32, lifestyle: u32, product: u32) -> Self {
        Self {
            value,
            lifestyle,
            product,
        }
    }

    /// Total posts requested across all types.
    pub fn total(&self) -> u32 {
        self.value + self.lifestyle + self.product
    }

    /// Count for one post type.
    pub fn count_for(&self, post_type: PostType) -> u32 {
        match post_type {
            PostType::Value => self.value,
            PostType::Lifestyle => self.lifestyle,
            PostType::Product => self.product,
        }
    }

    /// Iterate (type, count) pairs with count > 0, in fixed order.
    pub fn non_empty(&self) -> impl Iterator<Item = (PostType, u32)> {
        [
            (PostType::Value, self.value),
            (PostType::Lifestyle, self.lifestyle),
            (PostType::Product, self.product),
        ]
        .into_iter()
        .filter(|(_, n)| *n > 0)
    }
}

/// A batch of posts for one brand, moving through the pipeline together.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Batch {
    /// Unique identifier (UUID).
    pub id: String,

    /// Brand the batch is produced for.
    pub brand: String,

    /// Requested post counts per type.
    pub post_type_counts: PostTypeCounts,

    /// Current pipeline state.
    pub state: BatchState,

    /// Soft-delete flag. Batches are never hard-deleted.
    #[serde(default)]
    pub archived: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Batch {
    /// Create a new batch in the initial state.
    pub fn new(brand: impl Into<String>, counts: PostTypeCounts) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            brand: brand.into(),
            post_type_counts: counts,
            state: BatchState::Setup,
            archived: false,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_serialization_uses_wire_names() {
        let json = serde_json::to_string(&BatchState::PromptsBuilt).unwrap();
        assert_eq!(json, r#""S5_PROMPTS_BUILT""#);

        let state: BatchState = serde_json::from_str(r#""S6_QA""#).unwrap();
        assert_eq!(state, BatchState::Qa);
    }

    #[test]
    fn test_state_round_trips_through_str() {
        for state in BatchState::all() {
            let parsed: BatchState = state.as_str().parse().unwrap();
            assert_eq!(parsed, state);
        }
        assert!("S3_SOMETHING".parse::<BatchState>().is_err());
    }

    #[test]
    fn test_counts_total_and_lookup() {
        let counts = PostTypeCounts::new(2, 1, 0);
        assert_eq!(counts.total(), 3);
        assert_eq!(counts.count_for(PostType::Value), 2);
        assert_eq!(counts.count_for(PostType::Product), 0);

        let non_empty: Vec<_> = counts.non_empty().collect();
        assert_eq!(
            non_empty,
            vec![(PostType::Value, 2), (PostType::Lifestyle, 1)]
        );
    }

    #[test]
    fn test_new_batch_starts_in_setup() {
        let batch = Batch::new("Acme", PostTypeCounts::new(1, 0, 0));
        assert_eq!(batch.state, BatchState::Setup);
        assert!(!batch.archived);
        assert_eq!(batch.brand, "Acme");
    }
}
