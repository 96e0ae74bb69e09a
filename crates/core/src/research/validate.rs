//! Validation of parsed research items.

use std::collections::{HashMap, HashSet};

use serde_json::json;

use super::types::{extract_cta, ResearchItem};
use crate::error::CoreError;

/// Words spoken per second, used to derive duration from word count.
pub const WORDS_PER_SECOND: f64 = 2.6;

/// Hard ceiling on spoken duration.
pub const MAX_DURATION_S: u32 = 8;

/// Maximum bigram overlap allowed between a script and its source summary.
pub const MAX_SUMMARY_OVERLAP: f64 = 0.35;

/// Spoken duration in whole seconds for a given word count.
pub fn duration_for_words(word_count: usize) -> u32 {
    (word_count as f64 / WORDS_PER_SECOND).ceil() as u32
}

/// Jaccard similarity over word bigrams. Either side with fewer than two
/// words yields 0.0.
pub fn bigram_jaccard(a: &str, b: &str) -> f64 {
    fn bigrams(text: &str) -> HashSet<(String, String)> {
        let tokens: Vec<String> = text.to_lowercase().split_whitespace().map(str::to_string).collect();
        tokens
            .windows(2)
            .map(|w| (w[0].clone(), w[1].clone()))
            .collect()
    }
    let ba = bigrams(a);
    let bb = bigrams(b);
    if ba.is_empty() || bb.is_empty() {
        return 0.0;
    }
    let intersection = ba.intersection(&bb).count();
    let union = ba.union(&bb).count();
    intersection as f64 / union as f64
}

/// Enforce the duration ceiling and correct the model-reported duration.
///
/// The computed value replaces whatever the model claimed; only scripts that
/// genuinely exceed the ceiling are rejected.
pub fn validate_duration(item: &mut ResearchItem) -> Result<(), CoreError> {
    let word_count = item.script.split_whitespace().count();
    if word_count == 0 {
        return Err(CoreError::validation("script is empty"));
    }
    let calculated = duration_for_words(word_count);
    if calculated > MAX_DURATION_S {
        return Err(CoreError::validation_with(
            format!("script exceeds {} seconds", MAX_DURATION_S),
            json!({ "word_count": word_count, "calculated": calculated }),
        ));
    }
    item.estimated_duration_s = Some(calculated as f64);
    Ok(())
}

/// Source summary must paraphrase, not quote, the script.
pub fn validate_summary(item: &ResearchItem) -> Result<(), CoreError> {
    let overlap = bigram_jaccard(&item.script, &item.source_summary);
    if overlap > MAX_SUMMARY_OVERLAP {
        return Err(CoreError::validation_with(
            "source summary overlaps too much with script",
            json!({ "jaccard": overlap, "topic": item.topic }),
        ));
    }
    Ok(())
}

/// Topic ordering must rotate: no consecutive repeats, and per-topic counts
/// may differ by at most one.
pub fn validate_round_robin(items: &[ResearchItem]) -> Result<(), CoreError> {
    for idx in 1..items.len() {
        if items[idx].topic == items[idx - 1].topic {
            return Err(CoreError::validation_with(
                "topics must not repeat consecutively",
                json!({ "index": idx, "topic": items[idx].topic }),
            ));
        }
    }
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for item in items {
        *counts.entry(item.topic.as_str()).or_insert(0) += 1;
    }
    if let (Some(max), Some(min)) = (counts.values().max(), counts.values().min()) {
        if max - min > 1 {
            return Err(CoreError::validation_with(
                "topic distribution must be balanced",
                json!({ "counts": counts }),
            ));
        }
    }
    Ok(())
}

/// Every script must end in a distinct call to action.
pub fn validate_unique_ctas(items: &[ResearchItem]) -> Result<(), CoreError> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    for (idx, item) in items.iter().enumerate() {
        let cta = extract_cta(&item.script);
        if let Some(first) = seen.get(&cta) {
            return Err(CoreError::validation_with(
                "cta reuse detected",
                json!({ "cta": cta, "first_index": first, "duplicate_index": idx }),
            ));
        }
        seen.insert(cta, idx);
    }
    Ok(())
}

const DEFAULT_TONE: &str = "warm, direkt, alltagsnah";
const DEFAULT_DISCLAIMER: &str = "Keine Heilversprechen; individuelle Ergebnisse können abweichen.";

/// Fill defaults the model may omit.
pub fn apply_defaults(item: &mut ResearchItem) {
    if item.tone.as_deref().map_or(true, |t| t.trim().is_empty()) {
        item.tone = Some(DEFAULT_TONE.to_string());
    }
    if item
        .disclaimer
        .as_deref()
        .map_or(true, |d| d.trim().is_empty())
    {
        item.disclaimer = Some(DEFAULT_DISCLAIMER.to_string());
    }
}

/// Run the full validation pass over a parsed batch, mutating items where
/// validation corrects them (duration, defaults).
pub fn validate_batch(items: &mut [ResearchItem]) -> Result<(), CoreError> {
    if items.is_empty() {
        return Err(CoreError::validation("research response contains no items"));
    }
    for item in items.iter_mut() {
        validate_duration(item)?;
        validate_summary(item)?;
        apply_defaults(item);
    }
    validate_round_robin(items)?;
    validate_unique_ctas(items)?;
    Ok(())
}
