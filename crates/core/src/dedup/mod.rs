//! Topic deduplication by weighted token similarity.
//!
//! Pure functions over topic fields. Similarity is a weighted sum of
//! per-field Jaccard scores; title carries the most weight because rotations
//! and CTAs repeat across legitimately distinct topics.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Default similarity threshold against the long-lived topic registry.
pub const DEFAULT_THRESHOLD: f64 = 0.7;

const TITLE_WEIGHT: f64 = 0.5;
const ROTATION_WEIGHT: f64 = 0.3;
const CTA_WEIGHT: f64 = 0.2;

/// The three fields a topic is compared on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TopicFields {
    pub title: String,
    pub rotation: String,
    pub cta: String,
}

impl TopicFields {
    pub fn new(
        title: impl Into<String>,
        rotation: impl Into<String>,
        cta: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            rotation: rotation.into(),
            cta: cta.into(),
        }
    }
}

/// An accepted duplicate verdict.
#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateMatch {
    /// Identifier of the existing topic that matched.
    pub matched_id: String,
    pub similarity: f64,
}

/// Lowercase, strip punctuation, split on whitespace, collect unique tokens.
pub fn tokenize(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Jaccard similarity of two token sets. Both empty yields 0.0.
pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

/// Weighted similarity of two topics in [0.0, 1.0].
pub fn topic_similarity(a: &TopicFields, b: &TopicFields) -> f64 {
    let title = jaccard(&tokenize(&a.title), &tokenize(&b.title));
    let rotation = jaccard(&tokenize(&a.rotation), &tokenize(&b.rotation));
    let cta = jaccard(&tokenize(&a.cta), &tokenize(&b.cta));
    title * TITLE_WEIGHT + rotation * ROTATION_WEIGHT + cta * CTA_WEIGHT
}

/// First existing topic whose similarity reaches `threshold`, if any.
///
/// Scans in order and returns on the first hit, so callers comparing against
/// a registry pay for the full scan only when the candidate is novel.
pub fn find_duplicate(
    candidate: &TopicFields,
    existing: &[(String, TopicFields)],
    threshold: f64,
) -> Option<DuplicateMatch> {
    for (id, fields) in existing {
        let similarity = topic_similarity(candidate, fields);
        if similarity >= threshold {
            return Some(DuplicateMatch {
                matched_id: id.clone(),
                similarity,
            });
        }
    }
    None
}

/// Filter candidates against existing topics and against the candidates
/// already accepted in this pass. Returns (accepted, rejected-with-match).
pub fn deduplicate(
    candidates: Vec<TopicFields>,
    existing: &[(String, TopicFields)],
    threshold: f64,
) -> (Vec<TopicFields>, Vec<(TopicFields, DuplicateMatch)>) {
    let mut accepted: Vec<TopicFields> = Vec::new();
    let mut rejected: Vec<(TopicFields, DuplicateMatch)> = Vec::new();

    for candidate in candidates {
        if let Some(found) = find_duplicate(&candidate, existing, threshold) {
            rejected.push((candidate, found));
            continue;
        }
        let within_pass: Vec<(String, TopicFields)> = accepted
            .iter()
            .map(|t| (t.title.clone(), t.clone()))
            .collect();
        if let Some(found) = find_duplicate(&candidate, &within_pass, threshold) {
            rejected.push((candidate, found));
            continue;
        }
        accepted.push(candidate);
    }

    (accepted, rejected)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topic(title: &str, rotation: &str, cta: &str) -> TopicFields {
        TopicFields::new(title, rotation, cta)
    }

    #[test]
    fn test_tokenize_strips_punctuation_and_case() {
        let tokens = tokenize("Drink MORE water, every day!");
        let expected: HashSet<String> = ["drink", "more", "water", "every", "day"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(tokens, expected);
    }

    #[test]
    fn test_jaccard_empty_sets_is_zero() {
        assert_eq!(jaccard(&HashSet::new(), &HashSet::new()), 0.0);
        assert_eq!(jaccard(&tokenize(""), &tokenize("something")), 0.0);
    }

    #[test]
    fn test_identical_topics_similarity_is_one() {
        let a = topic("Morning hydration", "education", "drink up today");
        assert!((topic_similarity(&a, &a) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_disjoint_topics_similarity_is_zero() {
        let a = topic("Morning hydration", "education", "drink up");
        let b = topic("Evening stretching", "lifestyle", "move now");
        assert_eq!(topic_similarity(&a, &b), 0.0);
    }

    #[test]
    fn test_similarity_is_symmetric() {
        let a = topic("Morning hydration habits", "education", "drink up today");
        let b = topic("Morning hydration myths", "education", "stay hydrated today");
        assert!((topic_similarity(&a, &b) - topic_similarity(&b, &a)).abs() < 1e-12);
    }

    #[test]
    fn test_title_weighs_more_than_cta() {
        let base = topic("alpha beta", "gamma", "delta");
        let same_title = topic("alpha beta", "other", "other");
        let same_cta = topic("other other", "other", "delta");
        assert!(topic_similarity(&base, &same_title) > topic_similarity(&base, &same_cta));
    }

    #[test]
    fn test_find_duplicate_returns_first_hit() {
        let candidate = topic("Morning hydration", "education", "drink up today");
        let existing = vec![
            ("t1".to_string(), topic("Evening run", "fitness", "go run")),
            (
                "t2".to_string(),
                topic("Morning hydration", "education", "drink up today"),
            ),
            (
                "t3".to_string(),
                topic("Morning hydration", "education", "drink up now"),
            ),
        ];
        let found = find_duplicate(&candidate, &existing, DEFAULT_THRESHOLD).unwrap();
        assert_eq!(found.matched_id, "t2");
        assert!(found.similarity >= DEFAULT_THRESHOLD);
    }

    #[test]
    fn test_find_duplicate_below_threshold_is_none() {
        let candidate = topic("Totally fresh topic", "new angle", "unique call");
        let existing = vec![(
            "t1".to_string(),
            topic("Morning hydration", "education", "drink up"),
        )];
        assert!(find_duplicate(&candidate, &existing, DEFAULT_THRESHOLD).is_none());
    }

    #[test]
    fn test_deduplicate_rejects_within_pass_duplicates() {
        let candidates = vec![
            topic("Morning hydration", "education", "drink up today"),
            topic("Morning hydration", "education", "drink up today"),
            topic("Evening stretching", "lifestyle", "move tonight"),
        ];
        let (accepted, rejected) = deduplicate(candidates, &[], DEFAULT_THRESHOLD);
        assert_eq!(accepted.len(), 2);
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].0.title, "Morning hydration");
    }

    #[test]
    fn test_deduplicate_rejects_against_existing() {
        let candidates = vec![topic("Morning hydration", "education", "drink up today")];
        let existing = vec![(
            "reg-1".to_string(),
            topic("Morning hydration", "education", "drink up today"),
        )];
        let (accepted, rejected) = deduplicate(candidates, &existing, DEFAULT_THRESHOLD);
        assert!(accepted.is_empty());
        assert_eq!(rejected[0].1.matched_id, "reg-1");
    }
}
