//! Retry-with-feedback policy for generation loops.
//!
//! Only validation failures are retried: the failed output's error message
//! and details are appended to the prompt so the model can correct itself.
//! Transport failures propagate immediately to the caller.

use crate::error::CoreError;

const MAX_FEEDBACK_DETAILS_CHARS: usize = 500;

/// Retry budget for one generation task.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3 }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self { max_attempts }
    }
}

/// Append structured feedback about a failed attempt to the prompt.
pub fn feedback_prompt(prompt: &str, error: &CoreError) -> String {
    let details = serde_json::to_string(&error.details()).unwrap_or_default();
    let truncated: String = details.chars().take(MAX_FEEDBACK_DETAILS_CHARS).collect();
    format!("{}\n\nFEEDBACK: {}. Details: {}", prompt, error, truncated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_policy_allows_three_attempts() {
        assert_eq!(RetryPolicy::default().max_attempts, 3);
    }

    #[test]
    fn test_feedback_appends_message_and_details() {
        let err = CoreError::validation_with("cta reuse detected", json!({"duplicate_index": 3}));
        let amended = feedback_prompt("base prompt", &err);
        assert!(amended.starts_with("base prompt"));
        assert!(amended.contains("FEEDBACK: cta reuse detected."));
        assert!(amended.contains("\"duplicate_index\":3"));
    }

    #[test]
    fn test_feedback_truncates_long_details() {
        let big: Vec<String> = (0..200).map(|i| format!("entry-{}", i)).collect();
        let err = CoreError::validation_with("too much", json!({ "entries": big }));
        let amended = feedback_prompt("p", &err);
        let details_part = amended.split("Details: ").nth(1).unwrap();
        assert!(details_part.chars().count() <= MAX_FEEDBACK_DETAILS_CHARS);
    }
}
