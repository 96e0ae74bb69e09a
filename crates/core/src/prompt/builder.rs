//! Video prompt assembly.
//!
//! Pure functions: the same seed always produces the same prompt, and
//! rebuilding an already-built post yields an identical result.

use tracing::info;

use super::types::{
    AudioSection, VideoPrompt, ACTION_TEMPLATE, AUDIO_DIALOGUE_DIRECTIVE, CLOSING_PAUSE_MARKER,
    SCRIPT_PLACEHOLDER,
};
use crate::error::CoreError;
use crate::post::SeedData;

// Marker variants seen in stored dialogue, stripped before re-appending.
const MARKER_VARIANTS: [&str; 2] = ["(stiller Halt)", "( stiller Halt)"];

/// Assemble the video generation prompt from a post's seed data.
///
/// Prefers the manually edited `script` over the generated `dialog_script`.
/// The dialogue is normalized so the closing pause marker appears exactly
/// once regardless of how many times the builder runs.
pub fn build_video_prompt_from_seed(seed: &SeedData) -> Result<VideoPrompt, CoreError> {
    let (dialogue, dialogue_source) = match (&seed.script, &seed.dialog_script) {
        (Some(s), _) if !s.trim().is_empty() => (s.as_str(), "seed_script"),
        (_, Some(d)) if !d.trim().is_empty() => (d.as_str(), "dialog_script"),
        _ => {
            return Err(CoreError::validation_with(
                "missing dialogue in seed data: post must have script or dialog_script",
                serde_json::json!({
                    "has_script": seed.script.is_some(),
                    "has_dialog_script": seed.dialog_script.is_some(),
                }),
            ))
        }
    };

    let mut normalized = dialogue.trim();
    for suffix in MARKER_VARIANTS {
        if let Some(stripped) = normalized.strip_suffix(suffix) {
            normalized = stripped.trim_end();
            break;
        }
    }
    let script_line = format!("{} {}", normalized, CLOSING_PAUSE_MARKER);

    let prompt = VideoPrompt {
        action: ACTION_TEMPLATE.replace(SCRIPT_PLACEHOLDER, &script_line),
        audio: AudioSection {
            dialogue: AUDIO_DIALOGUE_DIRECTIVE.to_string(),
            ..AudioSection::default()
        },
        ..VideoPrompt::default()
    };

    info!(
        dialogue_length = dialogue.len(),
        dialogue_source, "video prompt assembled"
    );

    Ok(prompt)
}

/// Structural re-validation of a prompt before provider submission.
pub fn validate_video_prompt(prompt: &VideoPrompt) -> Result<(), CoreError> {
    let required = [
        ("character", &prompt.character),
        ("action", &prompt.action),
        ("style", &prompt.style),
        ("universal_negatives", &prompt.universal_negatives),
    ];
    for (name, value) in required {
        if value.trim().is_empty() {
            return Err(CoreError::validation_with(
                format!("video prompt validation failed: empty section '{}'", name),
                serde_json::json!({ "section": name }),
            ));
        }
    }
    if prompt.audio.dialogue.trim().is_empty() {
        return Err(CoreError::validation(
            "video prompt validation failed: empty audio dialogue",
        ));
    }
    if prompt.action.contains(SCRIPT_PLACEHOLDER) {
        return Err(CoreError::validation(
            "video prompt validation failed: script placeholder was not replaced",
        ));
    }
    let markers = prompt.action.matches(CLOSING_PAUSE_MARKER).count();
    if markers != 1 {
        return Err(CoreError::validation_with(
            "video prompt validation failed: closing pause marker must appear exactly once",
            serde_json::json!({ "marker_count": markers }),
        ));
    }
    Ok(())
}

// Field order is part of the provider contract.
const PROMPT_FIELD_ORDER: usize = 15;

/// Canonical provider prompt text: sections in fixed order, blank sections
/// skipped, joined by blank lines, followed by audio dialogue and capture.
pub fn compose_prompt_text(prompt: &VideoPrompt) -> String {
    let ordered: [&str; PROMPT_FIELD_ORDER] = [
        &prompt.character,
        &prompt.action,
        &prompt.style,
        &prompt.scene,
        &prompt.cinematography,
        &prompt.lighting,
        &prompt.color_and_grade,
        &prompt.camera_positioning_and_motion,
        &prompt.composition,
        &prompt.focus_and_lens_effects,
        &prompt.atmosphere,
        &prompt.authenticity_modifiers,
        &prompt.universal_negatives,
        &prompt.post,
        &prompt.sound_effects,
    ];

    let mut sections: Vec<&str> = ordered
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    let dialogue = prompt.audio.dialogue.trim();
    if !dialogue.is_empty() {
        sections.push(dialogue);
    }
    let capture = prompt.audio.capture.trim();
    if !capture.is_empty() && capture != dialogue {
        sections.push(capture);
    }

    sections.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed_with_dialogue(dialogue: &str) -> SeedData {
        SeedData {
            dialog_script: Some(dialogue.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_build_inserts_dialogue_into_action() {
        let prompt = build_video_prompt_from_seed(&seed_with_dialogue("Hydration matters")).unwrap();
        assert!(prompt.action.contains("Hydration matters (stiller Halt)"));
        assert!(!prompt.action.contains(SCRIPT_PLACEHOLDER));
    }

    #[test]
    fn test_build_prefers_manual_script() {
        let seed = SeedData {
            script: Some("edited take".into()),
            dialog_script: Some("generated take".into()),
            ..Default::default()
        };
        let prompt = build_video_prompt_from_seed(&seed).unwrap();
        assert!(prompt.action.contains("edited take (stiller Halt)"));
        assert!(!prompt.action.contains("generated take"));
    }

    #[test]
    fn test_build_missing_dialogue_fails() {
        let err = build_video_prompt_from_seed(&SeedData::default()).unwrap_err();
        assert_eq!(err.code(), "validation_error");
    }

    #[test]
    fn test_marker_appended_exactly_once() {
        for dialogue in [
            "Plain line",
            "Already marked (stiller Halt)",
            "Spaced marker ( stiller Halt)",
            "Trailing space (stiller Halt)   ",
        ] {
            let prompt = build_video_prompt_from_seed(&seed_with_dialogue(dialogue)).unwrap();
            assert_eq!(
                prompt.action.matches(CLOSING_PAUSE_MARKER).count(),
                1,
                "input: {:?}",
                dialogue
            );
        }
    }

    #[test]
    fn test_build_is_idempotent() {
        let seed = seed_with_dialogue("Consistent output");
        let first = build_video_prompt_from_seed(&seed).unwrap();
        let second = build_video_prompt_from_seed(&seed).unwrap();
        assert_eq!(first, second);

        // Rebuilding from the already-marked line changes nothing either.
        let remarked = seed_with_dialogue("Consistent output (stiller Halt)");
        let third = build_video_prompt_from_seed(&remarked).unwrap();
        assert_eq!(first, third);
    }

    #[test]
    fn test_validate_accepts_built_prompt() {
        let prompt = build_video_prompt_from_seed(&seed_with_dialogue("ok")).unwrap();
        assert!(validate_video_prompt(&prompt).is_ok());
    }

    #[test]
    fn test_validate_rejects_unreplaced_placeholder() {
        let prompt = VideoPrompt::default();
        let err = validate_video_prompt(&prompt).unwrap_err();
        assert_eq!(err.code(), "validation_error");
    }

    #[test]
    fn test_validate_rejects_empty_section() {
        let mut prompt = build_video_prompt_from_seed(&seed_with_dialogue("ok")).unwrap();
        prompt.character = String::new();
        let err = validate_video_prompt(&prompt).unwrap_err();
        assert_eq!(err.details()["section"], "character");
    }

    #[test]
    fn test_compose_orders_sections_and_skips_empty() {
        let mut prompt = build_video_prompt_from_seed(&seed_with_dialogue("hello")).unwrap();
        prompt.scene = String::new();
        let text = compose_prompt_text(&prompt);

        let character_pos = text.find("Character:").unwrap();
        let action_pos = text.find("Action:").unwrap();
        assert!(character_pos < action_pos);
        assert!(!text.contains("Scene:"));
        // Resolution section is not part of the provider text.
        assert!(!text.contains("Resolution & Aspect Ratio"));
        assert!(text.contains(&prompt.audio.dialogue));
    }

    #[test]
    fn test_compose_skips_capture_equal_to_dialogue() {
        let mut prompt = build_video_prompt_from_seed(&seed_with_dialogue("hello")).unwrap();
        prompt.audio.capture = prompt.audio.dialogue.clone();
        let text = compose_prompt_text(&prompt);
        assert_eq!(text.matches(&prompt.audio.dialogue).count(), 1);
    }
}
