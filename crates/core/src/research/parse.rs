//! Tolerant parsing of model output.
//!
//! Research output arrives as JSON in the happy case, but models wrap it in
//! markdown fences, use typographic quotes, leave trailing commas, or fall
//! back to YAML. Parsing tries the strict form first and degrades gracefully;
//! anything unrecoverable is a validation error carrying a snippet of the raw
//! text so the retry loop can feed it back.

use serde_json::Value;

use super::types::{DialogScripts, ResearchItem};
use crate::error::CoreError;

/// Strip a surrounding markdown code fence, if present.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the language tag line.
    let body = match rest.split_once('\n') {
        Some((_, body)) => body,
        None => rest,
    };
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// Replace typographic quotes with their ASCII forms.
fn normalize_quotes(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{201C}' | '\u{201D}' | '\u{201E}' => '"',
            '\u{2018}' | '\u{2019}' => '\'',
            other => other,
        })
        .collect()
}

/// Drop commas that directly precede a closing bracket or brace.
fn strip_trailing_commas(text: &str) -> String {
    let re = regex_lite::Regex::new(r",\s*([}\]])").unwrap();
    re.replace_all(text, "$1").into_owned()
}

fn items_from_value(value: Value) -> Result<Vec<ResearchItem>, serde_json::Error> {
    let items_value = match value {
        Value::Object(mut map) => map.remove("items").unwrap_or(Value::Array(Vec::new())),
        other => other,
    };
    serde_json::from_value(items_value)
}

/// Parse research items from raw model output.
///
/// Accepts a top-level array or an `{"items": [...]}` object, with or
/// without a code fence, and falls back to YAML when JSON fails.
pub fn parse_research_items(raw: &str) -> Result<Vec<ResearchItem>, CoreError> {
    let unfenced = strip_code_fence(raw);

    // Strict JSON first so well-formed output is untouched.
    if let Ok(value) = serde_json::from_str::<Value>(unfenced) {
        if let Ok(items) = items_from_value(value) {
            return Ok(items);
        }
    }

    // Normalized JSON.
    let normalized = strip_trailing_commas(&normalize_quotes(unfenced));
    if let Ok(value) = serde_json::from_str::<Value>(&normalized) {
        if let Ok(items) = items_from_value(value) {
            return Ok(items);
        }
    }

    // YAML fallback.
    if let Ok(yaml) = serde_yaml::from_str::<serde_yaml::Value>(unfenced) {
        if let Ok(value) = serde_json::to_value(&yaml) {
            if let Ok(items) = items_from_value(value) {
                return Ok(items);
            }
        }
    }

    Err(CoreError::validation_with(
        "research response is not parseable as json or yaml",
        serde_json::json!({ "snippet": snippet(raw) }),
    ))
}

/// First 200 characters of raw output, for error details.
fn snippet(raw: &str) -> String {
    raw.chars().take(200).collect()
}

/// Parse a single JSON value from model output, tolerating fences and
/// typographic artifacts. Used for structured outputs other than the
/// research batch (seed facts).
pub fn parse_json_lenient<T: serde::de::DeserializeOwned>(raw: &str) -> Result<T, CoreError> {
    let unfenced = strip_code_fence(raw);
    if let Ok(value) = serde_json::from_str::<T>(unfenced) {
        return Ok(value);
    }
    let normalized = strip_trailing_commas(&normalize_quotes(unfenced));
    serde_json::from_str::<T>(&normalized).map_err(|e| {
        CoreError::validation_with(
            format!("model output is not valid json: {}", e),
            serde_json::json!({ "snippet": snippet(raw) }),
        )
    })
}

// ============================================================================
// Dialogue script parsing
// ============================================================================

// Recognized category headings, lowercase.
const HEADINGS: [(&str, ScriptCategory); 3] = [
    ("problem-agitieren-lösung ads", ScriptCategory::Problem),
    ("testimonial-stil ads", ScriptCategory::Testimonial),
    ("transformations-geschichten ads", ScriptCategory::Transformation),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScriptCategory {
    Problem,
    Testimonial,
    Transformation,
}

/// Match a line against the known headings, tolerating `#`/`*` decoration
/// plus case and whitespace variation.
fn heading_category(line: &str) -> Option<ScriptCategory> {
    let cleaned = line
        .trim()
        .trim_matches(|c| c == '#' || c == '*' || c == ':')
        .trim()
        .to_lowercase();
    HEADINGS
        .iter()
        .find(|(name, _)| *name == cleaned)
        .map(|(_, cat)| *cat)
}

/// Parse heading-bucketed dialogue scripts from raw model output.
///
/// Consecutive non-blank lines under a heading accumulate into one script;
/// a blank line or a new heading closes the current script. Over-produced
/// buckets are truncated to `per_category`; short buckets fail.
pub fn parse_dialog_scripts(raw: &str, per_category: usize) -> Result<DialogScripts, CoreError> {
    let mut scripts = DialogScripts::default();
    let mut current: Option<ScriptCategory> = None;
    let mut pending: Vec<String> = Vec::new();

    fn flush(scripts: &mut DialogScripts, category: Option<ScriptCategory>, pending: &mut Vec<String>) {
        if pending.is_empty() {
            return;
        }
        let script = pending.join(" ");
        pending.clear();
        match category {
            Some(ScriptCategory::Problem) => scripts.problem.push(script),
            Some(ScriptCategory::Testimonial) => scripts.testimonial.push(script),
            Some(ScriptCategory::Transformation) => scripts.transformation.push(script),
            None => {}
        }
    }

    for line in strip_code_fence(raw).lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            flush(&mut scripts, current, &mut pending);
            continue;
        }
        if let Some(category) = heading_category(trimmed) {
            flush(&mut scripts, current, &mut pending);
            current = Some(category);
            continue;
        }
        if current.is_none() {
            return Err(CoreError::validation_with(
                "dialogue script output missing category headings",
                serde_json::json!({ "line": trimmed }),
            ));
        }
        pending.push(trimmed.to_string());
    }
    flush(&mut scripts, current, &mut pending);

    scripts.problem.truncate(per_category);
    scripts.testimonial.truncate(per_category);
    scripts.transformation.truncate(per_category);

    let counts = [
        ("problem", scripts.problem.len()),
        ("testimonial", scripts.testimonial.len()),
        ("transformation", scripts.transformation.len()),
    ];
    for (name, count) in counts {
        if count < per_category {
            return Err(CoreError::validation_with(
                format!(
                    "dialogue scripts incomplete: category '{}' has {} of {}",
                    name, count, per_category
                ),
                serde_json::json!({ "category": name, "count": count, "expected": per_category }),
            ));
        }
    }

    Ok(scripts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::research::Framework;

    const ITEM_JSON: &str = r#"{"topic":"Sleep","framework":"PAL","script":"Go to bed earlier tonight","source_summary":"Rest research overview","estimated_duration_s":2,"sources":[{"url":"https://example.com"}]}"#;

    #[test]
    fn test_parse_plain_array() {
        let raw = format!("[{}]", ITEM_JSON);
        let items = parse_research_items(&raw).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].framework, Framework::Pal);
    }

    #[test]
    fn test_parse_items_object() {
        let raw = format!(r#"{{"items":[{}]}}"#, ITEM_JSON);
        let items = parse_research_items(&raw).unwrap();
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn test_parse_fenced_json() {
        let raw = format!("```json\n[{}]\n```", ITEM_JSON);
        let items = parse_research_items(&raw).unwrap();
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn test_parse_trailing_comma_and_smart_quotes() {
        let raw = "[{\u{201C}topic\u{201D}: \u{201C}Sleep\u{201D}, \"framework\": \"PAL\", \"script\": \"Go to bed\",}]";
        let items = parse_research_items(raw).unwrap();
        assert_eq!(items[0].topic, "Sleep");
    }

    #[test]
    fn test_parse_yaml_fallback() {
        let raw = "items:\n  - topic: Sleep\n    framework: PAL\n    script: Go to bed earlier\n";
        let items = parse_research_items(raw).unwrap();
        assert_eq!(items[0].script, "Go to bed earlier");
    }

    #[test]
    fn test_parse_garbage_is_validation_error() {
        let err = parse_research_items("{{{{ not anything").unwrap_err();
        assert_eq!(err.code(), "validation_error");
        assert!(err.details()["snippet"].as_str().unwrap().contains("not anything"));
    }

    fn dialog_raw() -> String {
        [
            "Problem-Agitieren-Lösung Ads",
            "Script one problem.",
            "",
            "Script two problem.",
            "",
            "## Testimonial-Stil Ads",
            "Script one testimonial.",
            "",
            "Script two testimonial.",
            "",
            "**Transformations-Geschichten Ads**",
            "Script one transformation.",
            "",
            "Script two transformation.",
        ]
        .join("\n")
    }

    #[test]
    fn test_parse_dialog_scripts_buckets_by_heading() {
        let scripts = parse_dialog_scripts(&dialog_raw(), 2).unwrap();
        assert_eq!(scripts.problem.len(), 2);
        assert_eq!(scripts.testimonial.len(), 2);
        assert_eq!(scripts.transformation.len(), 2);
        assert_eq!(scripts.problem[0], "Script one problem.");
    }

    #[test]
    fn test_parse_dialog_scripts_accumulates_multiline() {
        let raw = "Problem-Agitieren-Lösung Ads\nFirst half of script\ncontinues on next line.\n\nSecond script.\n\nTestimonial-Stil Ads\nT one.\n\nTransformations-Geschichten Ads\nTr one.";
        let scripts = parse_dialog_scripts(raw, 1).unwrap();
        assert_eq!(
            scripts.problem[0],
            "First half of script continues on next line."
        );
    }

    #[test]
    fn test_parse_dialog_scripts_truncates_excess() {
        let scripts = parse_dialog_scripts(&dialog_raw(), 1).unwrap();
        assert_eq!(scripts.problem.len(), 1);
    }

    #[test]
    fn test_parse_dialog_scripts_short_bucket_fails() {
        let err = parse_dialog_scripts(&dialog_raw(), 3).unwrap_err();
        assert_eq!(err.code(), "validation_error");
        assert_eq!(err.details()["expected"], 3);
    }

    #[test]
    fn test_parse_dialog_scripts_missing_heading_fails() {
        let err = parse_dialog_scripts("just a line with no heading", 1).unwrap_err();
        assert_eq!(err.code(), "validation_error");
    }

    #[test]
    fn test_heading_tolerates_decoration_and_case() {
        assert!(heading_category("### PROBLEM-AGITIEREN-LÖSUNG ADS").is_some());
        assert!(heading_category("  **testimonial-stil ads:**  ").is_some());
        assert!(heading_category("random line").is_none());
    }
}
