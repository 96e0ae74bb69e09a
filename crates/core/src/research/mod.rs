//! Topic research and script generation (S1_SETUP -> S2_SEEDED inputs).

mod orchestrator;
mod parse;
mod prompts;
mod retry;
mod types;
mod validate;

pub use orchestrator::{
    ResearchOrchestrator, CHUNK_SIZE, SCRIPTS_PER_CATEGORY, WITHIN_PASS_THRESHOLD,
};
pub use parse::{parse_dialog_scripts, parse_json_lenient, parse_research_items};
pub use prompts::{
    build_dialog_prompt, build_extractor_prompt, build_research_prompt, STRICT_EXTRACTOR_SYSTEM,
};
pub use retry::{feedback_prompt, RetryPolicy};
pub use types::{
    extract_cta, rotation_from_script, strip_cta_punctuation, DialogScripts, Framework,
    ResearchItem, SeedFacts, SourceRef,
};
pub use validate::{
    apply_defaults, bigram_jaccard, duration_for_words, validate_batch, validate_duration,
    validate_round_robin, validate_summary, validate_unique_ctas, MAX_DURATION_S,
    MAX_SUMMARY_OVERLAP, WORDS_PER_SECOND,
};
