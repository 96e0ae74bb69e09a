//! Research generation orchestration: chunked topic research with
//! retry-with-feedback, dialogue script generation, and strict seed
//! extraction.

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info, warn};

use super::parse::{parse_dialog_scripts, parse_json_lenient, parse_research_items};
use super::prompts::{
    build_dialog_prompt, build_extractor_prompt, build_research_prompt, STRICT_EXTRACTOR_SYSTEM,
};
use super::retry::{feedback_prompt, RetryPolicy};
use super::types::{extract_cta, rotation_from_script, DialogScripts, ResearchItem, SeedFacts};
use super::validate::validate_batch;
use crate::dedup::{find_duplicate, TopicFields};
use crate::error::CoreError;
use crate::llm::{GenerationRequest, TextGenerator, TokenUsage};
use crate::metrics::{DEDUP_REJECTIONS, LLM_TOKENS, RESEARCH_ATTEMPTS, RESEARCH_RETRIES};
use crate::post::PostType;

/// Topics requested per generation call. Small chunks keep each validation
/// failure cheap to retry.
pub const CHUNK_SIZE: u32 = 2;

/// Similarity threshold between items of the same research pass. Tighter
/// than the registry threshold because same-pass topics share one brand
/// prompt and cluster close together.
pub const WITHIN_PASS_THRESHOLD: f64 = 0.35;

/// Dialogue variants requested per category.
pub const SCRIPTS_PER_CATEGORY: usize = 2;

fn topic_fields(item: &ResearchItem) -> TopicFields {
    TopicFields::new(
        item.topic.clone(),
        rotation_from_script(&item.script),
        extract_cta(&item.script),
    )
}

/// Drives the LLM through topic research, dialogue generation and seed
/// extraction, owning the retry budget for each.
pub struct ResearchOrchestrator {
    llm: Arc<dyn TextGenerator>,
    policy: RetryPolicy,
}

impl ResearchOrchestrator {
    pub fn new(llm: Arc<dyn TextGenerator>) -> Self {
        Self {
            llm,
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    fn record_usage(&self, usage: &TokenUsage) {
        let provider = self.llm.provider().to_string();
        LLM_TOKENS
            .with_label_values(&[&provider, "input"])
            .inc_by(usage.input_tokens as u64);
        LLM_TOKENS
            .with_label_values(&[&provider, "output"])
            .inc_by(usage.output_tokens as u64);
    }

    /// Research `desired` topics for one brand and post type.
    ///
    /// Generation is chunked; each chunk gets its own retry budget, and
    /// accepted items from earlier chunks are deduplicated against later
    /// ones at [`WITHIN_PASS_THRESHOLD`]. The result may be shorter than
    /// `desired` when chunks collapse into duplicates; the caller decides
    /// whether a shortfall is fatal.
    pub async fn research_topics(
        &self,
        brand: &str,
        post_type: PostType,
        desired: u32,
    ) -> Result<Vec<ResearchItem>, CoreError> {
        if desired == 0 {
            return Ok(Vec::new());
        }
        let total_chunks = desired.div_ceil(CHUNK_SIZE);
        let mut accepted: Vec<ResearchItem> = Vec::new();

        for chunk_index in 0..total_chunks {
            let chunk_count = CHUNK_SIZE.min(desired - chunk_index * CHUNK_SIZE);
            let prompt = build_research_prompt(
                brand,
                post_type,
                chunk_count,
                chunk_index + 1,
                total_chunks,
            );
            let items = self.generate_research_chunk(prompt, brand, post_type).await?;

            for item in items {
                let existing: Vec<(String, TopicFields)> = accepted
                    .iter()
                    .map(|it| (it.topic.clone(), topic_fields(it)))
                    .collect();
                match find_duplicate(&topic_fields(&item), &existing, WITHIN_PASS_THRESHOLD) {
                    Some(found) => {
                        DEDUP_REJECTIONS.with_label_values(&["within_pass"]).inc();
                        debug!(
                            topic = %item.topic,
                            matched = %found.matched_id,
                            similarity = found.similarity,
                            "dropping within-pass duplicate"
                        );
                    }
                    None => accepted.push(item),
                }
            }
        }

        info!(
            brand,
            post_type = %post_type,
            desired,
            accepted = accepted.len(),
            "topic research finished"
        );
        Ok(accepted)
    }

    async fn generate_research_chunk(
        &self,
        mut prompt: String,
        brand: &str,
        post_type: PostType,
    ) -> Result<Vec<ResearchItem>, CoreError> {
        let mut last_error: Option<String> = None;

        for attempt in 1..=self.policy.max_attempts {
            let request = GenerationRequest::new(prompt.clone())
                .with_temperature(0.2)
                .with_max_tokens(3200)
                .with_web_search(true);
            let response = self.llm.generate(request).await?;
            self.record_usage(&response.usage);

            let result = parse_research_items(&response.text).and_then(|mut items| {
                validate_batch(&mut items)?;
                Ok(items)
            });

            match result {
                Ok(items) => {
                    RESEARCH_ATTEMPTS.with_label_values(&["accepted"]).inc();
                    info!(brand, post_type = %post_type, attempt, items = items.len(), "research chunk accepted");
                    return Ok(items);
                }
                Err(err @ CoreError::Validation { .. }) => {
                    RESEARCH_ATTEMPTS.with_label_values(&["rejected"]).inc();
                    RESEARCH_RETRIES.inc();
                    warn!(brand, post_type = %post_type, attempt, error = %err, "research chunk rejected, retrying with feedback");
                    prompt = feedback_prompt(&prompt, &err);
                    last_error = Some(err.to_string());
                }
                Err(other) => return Err(other),
            }
        }

        Err(CoreError::validation_with(
            "unable to produce valid topics",
            json!({
                "attempts": self.policy.max_attempts,
                "last_error": last_error,
            }),
        ))
    }

    /// Generate the three dialogue script buckets for one topic.
    pub async fn generate_dialog_scripts(
        &self,
        brand: &str,
        topic: &str,
    ) -> Result<DialogScripts, CoreError> {
        let mut prompt = build_dialog_prompt(brand, topic, SCRIPTS_PER_CATEGORY);
        let mut last_error: Option<String> = None;

        for attempt in 1..=self.policy.max_attempts {
            let request = GenerationRequest::new(prompt.clone())
                .with_temperature(0.5)
                .with_max_tokens(900);
            let response = self.llm.generate(request).await?;
            self.record_usage(&response.usage);

            match parse_dialog_scripts(&response.text, SCRIPTS_PER_CATEGORY) {
                Ok(scripts) => {
                    info!(brand, topic, attempt, "dialogue scripts accepted");
                    return Ok(scripts);
                }
                Err(err @ CoreError::Validation { .. }) => {
                    warn!(brand, topic, attempt, error = %err, "dialogue scripts rejected, retrying with feedback");
                    prompt = feedback_prompt(&prompt, &err);
                    last_error = Some(err.to_string());
                }
                Err(other) => return Err(other),
            }
        }

        Err(CoreError::validation_with(
            "unable to produce dialogue scripts",
            json!({
                "attempts": self.policy.max_attempts,
                "last_error": last_error,
            }),
        ))
    }

    /// Extract factual seed data for a topic. No retry: the extractor runs
    /// at temperature 0 and either produces facts or fails validation.
    pub async fn extract_seed(
        &self,
        title: &str,
        rotation: &str,
        cta: &str,
    ) -> Result<SeedFacts, CoreError> {
        let request = GenerationRequest::new(build_extractor_prompt(title, rotation, cta))
            .with_system(STRICT_EXTRACTOR_SYSTEM)
            .with_temperature(0.0)
            .with_max_tokens(1024);
        let response = self.llm.generate(request).await?;
        self.record_usage(&response.usage);
        let facts: SeedFacts = parse_json_lenient(&response.text)?;
        if facts.facts.is_empty() {
            return Err(CoreError::validation("seed extraction produced no facts"));
        }
        info!(topic = title, facts = facts.facts.len(), "seed facts extracted");
        Ok(facts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockTextGenerator;

    fn research_json(entries: &[(&str, &str)]) -> String {
        let items: Vec<serde_json::Value> = entries
            .iter()
            .map(|(topic, script)| {
                json!({
                    "topic": topic,
                    "framework": "PAL",
                    "sources": [{"url": "https://example.com/a"}],
                    "script": script,
                    "source_summary": "independent paraphrase of cited research",
                    "estimated_duration_s": 2,
                })
            })
            .collect();
        serde_json::to_string(&items).unwrap()
    }

    fn dialog_text() -> String {
        [
            "Problem-Agitieren-Lösung Ads",
            "P one.",
            "",
            "P two.",
            "",
            "Testimonial-Stil Ads",
            "T one.",
            "",
            "T two.",
            "",
            "Transformations-Geschichten Ads",
            "X one.",
            "",
            "X two.",
        ]
        .join("\n")
    }

    #[tokio::test]
    async fn test_research_accepts_valid_first_attempt() {
        let llm = Arc::new(MockTextGenerator::new());
        llm.push_response(research_json(&[
            ("Sleep", "go to bed early tonight"),
            ("Water", "drink a glass right away"),
        ]));

        let orchestrator = ResearchOrchestrator::new(llm.clone());
        let items = orchestrator
            .research_topics("Acme", PostType::Value, 2)
            .await
            .unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(llm.calls().len(), 1);
        // Duration was recomputed from word count.
        assert_eq!(items[0].estimated_duration_s, Some(2.0));
    }

    #[tokio::test]
    async fn test_research_retries_with_feedback_on_validation_failure() {
        let llm = Arc::new(MockTextGenerator::new());
        llm.push_response("not json at all".to_string());
        llm.push_response(research_json(&[
            ("Sleep", "go to bed early tonight"),
            ("Water", "drink a glass right away"),
        ]));

        let orchestrator = ResearchOrchestrator::new(llm.clone());
        let items = orchestrator
            .research_topics("Acme", PostType::Value, 2)
            .await
            .unwrap();

        assert_eq!(items.len(), 2);
        let calls = llm.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[1].prompt.contains("FEEDBACK:"));
    }

    #[tokio::test]
    async fn test_research_exhausts_budget_with_validation_error() {
        let llm = Arc::new(MockTextGenerator::new());
        for _ in 0..3 {
            llm.push_response("garbage".to_string());
        }

        let orchestrator = ResearchOrchestrator::new(llm.clone());
        let err = orchestrator
            .research_topics("Acme", PostType::Value, 2)
            .await
            .unwrap_err();

        assert_eq!(err.code(), "validation_error");
        assert_eq!(err.details()["attempts"], 3);
        assert_eq!(llm.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_research_transport_error_not_retried() {
        let llm = Arc::new(MockTextGenerator::new());
        llm.push_error(CoreError::third_party("provider down"));

        let orchestrator = ResearchOrchestrator::new(llm.clone());
        let err = orchestrator
            .research_topics("Acme", PostType::Value, 2)
            .await
            .unwrap_err();

        assert_eq!(err.code(), "third_party_fail");
        assert_eq!(llm.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_research_chunks_and_dedups_across_chunks() {
        let llm = Arc::new(MockTextGenerator::new());
        llm.push_response(research_json(&[
            ("Sleep", "go to bed early tonight"),
            ("Water", "drink a glass right away"),
        ]));
        // Second chunk repeats "Sleep" nearly verbatim; it must be dropped.
        llm.push_response(research_json(&[
            ("Sleep", "go to bed early tonight"),
            ("Steps", "walk ten minutes after lunch"),
        ]));

        let orchestrator = ResearchOrchestrator::new(llm.clone());
        let items = orchestrator
            .research_topics("Acme", PostType::Value, 4)
            .await
            .unwrap();

        assert_eq!(llm.calls().len(), 2);
        let topics: Vec<&str> = items.iter().map(|i| i.topic.as_str()).collect();
        assert_eq!(topics, vec!["Sleep", "Water", "Steps"]);
    }

    #[tokio::test]
    async fn test_dialog_scripts_retry_then_success() {
        let llm = Arc::new(MockTextGenerator::new());
        llm.push_response("no headings here".to_string());
        llm.push_response(dialog_text());

        let orchestrator = ResearchOrchestrator::new(llm.clone());
        let scripts = orchestrator
            .generate_dialog_scripts("Acme", "Sleep")
            .await
            .unwrap();

        assert_eq!(scripts.total(), 6);
        assert_eq!(llm.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_extract_seed_parses_fenced_json() {
        let llm = Arc::new(MockTextGenerator::new());
        llm.push_response(
            "```json\n{\"facts\": [\"hydration supports focus\"], \"source_context\": \"brief\"}\n```".to_string(),
        );

        let orchestrator = ResearchOrchestrator::new(llm.clone());
        let seed = orchestrator
            .extract_seed("Water", "drink a glass", "right away")
            .await
            .unwrap();

        assert_eq!(seed.facts, vec!["hydration supports focus".to_string()]);
    }

    #[tokio::test]
    async fn test_extract_seed_requires_facts() {
        let llm = Arc::new(MockTextGenerator::new());
        llm.push_response(r#"{"facts": []}"#.to_string());

        let orchestrator = ResearchOrchestrator::new(llm);
        let err = orchestrator
            .extract_seed("Water", "drink", "now")
            .await
            .unwrap_err();
        assert_eq!(err.code(), "validation_error");
    }
}
