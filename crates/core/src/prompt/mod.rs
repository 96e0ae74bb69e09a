//! Video prompt assembly (S4_SCRIPTED -> S5_PROMPTS_BUILT).

mod builder;
mod types;

pub use builder::{build_video_prompt_from_seed, compose_prompt_text, validate_video_prompt};
pub use types::{
    AudioSection, VideoPrompt, AUDIO_DIALOGUE_DIRECTIVE, CLOSING_PAUSE_MARKER, SCRIPT_PLACEHOLDER,
};
