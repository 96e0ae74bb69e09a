//! Topic discovery: researches topics for a fresh batch, deduplicates them
//! against the cross-batch registry, and seeds the batch's posts.
//!
//! All-or-nothing: posts are only inserted once every requested slot has a
//! fully assembled seed. A shortfall anywhere leaves the batch in setup with
//! zero posts, so a retry starts clean.

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info};

use crate::batch::{Batch, BatchState};
use crate::dedup::{find_duplicate, TopicFields, DEFAULT_THRESHOLD};
use crate::error::CoreError;
use crate::metrics::DEDUP_REJECTIONS;
use crate::post::{Post, PostType, SeedData};
use crate::research::{
    extract_cta, rotation_from_script, DialogScripts, Framework, ResearchItem,
    ResearchOrchestrator,
};
use crate::store::{require_batch, BatchStore, PostStore, TopicRegistry};

/// Topics researched per requested slot. Over-generating gives the registry
/// dedup room to reject without starving the batch.
pub const OVERGENERATION_FACTOR: u32 = 2;

/// Outcome of a discovery run.
#[derive(Debug)]
pub struct DiscoveryReport {
    pub batch: Batch,
    pub posts: Vec<Post>,
    /// Candidates dropped as duplicates of registry or same-run topics.
    pub rejected_duplicates: usize,
}

/// Research, deduplicate and seed every post of a batch, then advance it
/// from setup to seeded.
pub async fn discover_topics(
    batches: &Arc<dyn BatchStore>,
    posts: &Arc<dyn PostStore>,
    registry: &Arc<dyn TopicRegistry>,
    orchestrator: &ResearchOrchestrator,
    batch_id: &str,
) -> Result<DiscoveryReport, CoreError> {
    let batch = require_batch(batches.as_ref(), batch_id)?;
    if batch.state != BatchState::Setup {
        return Err(CoreError::StateTransition {
            current: batch.state.to_string(),
            target: BatchState::Seeded.to_string(),
            allowed: vec![BatchState::Setup.to_string()],
        });
    }

    let mut pool: Vec<(String, TopicFields)> = registry
        .all_topics()?
        .into_iter()
        .map(|record| (record.id, record.fields))
        .collect();
    let mut accepted: Vec<(PostType, ResearchItem, TopicFields)> = Vec::new();
    let mut rejected_duplicates = 0usize;

    for (post_type, desired) in batch.post_type_counts.non_empty() {
        let candidates = orchestrator
            .research_topics(&batch.brand, post_type, desired * OVERGENERATION_FACTOR)
            .await?;

        let mut kept = 0u32;
        for item in candidates {
            if kept == desired {
                break;
            }
            let fields = topic_fields(&item);
            match find_duplicate(&fields, &pool, DEFAULT_THRESHOLD) {
                Some(found) => {
                    rejected_duplicates += 1;
                    DEDUP_REJECTIONS.with_label_values(&["registry"]).inc();
                    debug!(
                        topic = %item.topic,
                        matched = %found.matched_id,
                        similarity = found.similarity,
                        "dropping registry duplicate"
                    );
                }
                None => {
                    pool.push((item.topic.clone(), fields.clone()));
                    accepted.push((post_type, item, fields));
                    kept += 1;
                }
            }
        }

        if kept < desired {
            return Err(CoreError::validation_with(
                "not enough unique topics survived deduplication",
                json!({
                    "post_type": post_type.as_str(),
                    "desired": desired,
                    "unique": kept,
                    "rejected_duplicates": rejected_duplicates,
                }),
            ));
        }
    }

    // Assemble every post before touching the store.
    let mut new_posts: Vec<Post> = Vec::with_capacity(accepted.len());
    for (post_type, item, fields) in &accepted {
        let scripts = orchestrator
            .generate_dialog_scripts(&batch.brand, &item.topic)
            .await?;
        let dialog_script = select_dialog_script(&scripts, item.framework).ok_or_else(|| {
            CoreError::validation_with(
                "no dialogue script available for topic",
                json!({ "topic": item.topic, "framework": item.framework.as_str() }),
            )
        })?;
        let facts = orchestrator
            .extract_seed(&fields.title, &fields.rotation, &fields.cta)
            .await?;

        let seed = SeedData {
            script: None,
            dialog_script: Some(dialog_script),
            framework: Some(item.framework),
            tone: item.tone.clone(),
            estimated_duration_s: item.estimated_duration_s,
            cta: Some(fields.cta.clone()),
            sources: item.sources.clone(),
            source_summary: Some(item.source_summary.clone()),
            dialog_scripts: Some(scripts),
            strict_seed: Some(facts),
            disclaimer: item.disclaimer.clone(),
        };
        new_posts.push(Post::new(
            &batch.id,
            *post_type,
            &item.topic,
            &fields.rotation,
            &fields.cta,
            item.estimated_duration_s.unwrap_or_default(),
            seed,
        ));
    }

    for (_, _, fields) in &accepted {
        registry.upsert_topic(fields)?;
    }
    posts.insert_posts(&new_posts)?;
    let seeded = batches.update_state(&batch.id, BatchState::Seeded)?;

    info!(
        batch_id = %batch.id,
        brand = %batch.brand,
        posts = new_posts.len(),
        rejected_duplicates,
        "topic discovery finished, batch seeded"
    );
    Ok(DiscoveryReport {
        batch: seeded,
        posts: new_posts,
        rejected_duplicates,
    })
}

fn topic_fields(item: &ResearchItem) -> TopicFields {
    let rotation = if item.rotation.trim().is_empty() {
        rotation_from_script(&item.script)
    } else {
        item.rotation.clone()
    };
    TopicFields::new(item.topic.clone(), rotation, extract_cta(&item.script))
}

/// Pick the dialogue line matching the topic's framework, falling back to
/// whichever bucket is populated.
fn select_dialog_script(scripts: &DialogScripts, framework: Framework) -> Option<String> {
    let preferred = match framework {
        Framework::Pal => &scripts.problem,
        Framework::Testimonial => &scripts.testimonial,
        Framework::Transformation => &scripts.transformation,
    };
    preferred
        .first()
        .or_else(|| scripts.problem.first())
        .or_else(|| scripts.testimonial.first())
        .or_else(|| scripts.transformation.first())
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::PostTypeCounts;
    use crate::store::SqliteStore;
    use crate::testing::MockTextGenerator;

    fn stores() -> (
        Arc<dyn BatchStore>,
        Arc<dyn PostStore>,
        Arc<dyn TopicRegistry>,
    ) {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        (store.clone(), store.clone(), store)
    }

    fn research_json(entries: &[(&str, &str)]) -> String {
        let items: Vec<serde_json::Value> = entries
            .iter()
            .map(|(topic, script)| {
                serde_json::json!({
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

    fn seed_json() -> String {
        r#"{"facts": ["hydration supports focus"], "source_context": "brief"}"#.to_string()
    }

    fn setup_batch(batches: &Arc<dyn BatchStore>, counts: PostTypeCounts) -> Batch {
        let batch = Batch::new("Acme", counts);
        batches.insert_batch(&batch).unwrap();
        batch
    }

    #[tokio::test]
    async fn test_discovery_seeds_batch_and_advances() {
        let (batches, posts, registry) = stores();
        let batch = setup_batch(&batches, PostTypeCounts::new(1, 0, 0));

        let llm = Arc::new(MockTextGenerator::new());
        // One research chunk (over-generated to 2), then dialogue and seed
        // extraction for the single accepted topic.
        llm.push_response(research_json(&[
            ("Sleep", "go to bed early tonight"),
            ("Water", "drink a glass right away"),
        ]));
        llm.push_response(dialog_text());
        llm.push_response(seed_json());
        let orchestrator = ResearchOrchestrator::new(llm);

        let report = discover_topics(&batches, &posts, &registry, &orchestrator, &batch.id)
            .await
            .unwrap();

        assert_eq!(report.batch.state, BatchState::Seeded);
        assert_eq!(report.posts.len(), 1);
        let post = &report.posts[0];
        assert_eq!(post.topic_title, "Sleep");
        assert_eq!(post.post_type, PostType::Value);
        assert_eq!(post.seed_data.dialog_script.as_deref(), Some("P one."));
        assert!(post.seed_data.strict_seed.is_some());

        // Posts landed and the registry remembers the topic.
        assert_eq!(posts.list_posts(&batch.id).unwrap().len(), 1);
        assert_eq!(registry.all_topics().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_discovery_requires_setup_state() {
        let (batches, posts, registry) = stores();
        let batch = setup_batch(&batches, PostTypeCounts::new(1, 0, 0));
        batches
            .update_state(&batch.id, BatchState::Seeded)
            .unwrap();

        let orchestrator = ResearchOrchestrator::new(Arc::new(MockTextGenerator::new()));
        let err = discover_topics(&batches, &posts, &registry, &orchestrator, &batch.id)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "state_transition_error");
    }

    #[tokio::test]
    async fn test_discovery_shortfall_leaves_batch_untouched() {
        let (batches, posts, registry) = stores();
        let batch = setup_batch(&batches, PostTypeCounts::new(1, 0, 0));

        // Every candidate collides with a topic already in the registry.
        registry
            .upsert_topic(&TopicFields::new(
                "Sleep",
                rotation_from_script("go to bed early tonight"),
                extract_cta("go to bed early tonight"),
            ))
            .unwrap();
        registry
            .upsert_topic(&TopicFields::new(
                "Water",
                rotation_from_script("drink a glass right away"),
                extract_cta("drink a glass right away"),
            ))
            .unwrap();

        let llm = Arc::new(MockTextGenerator::new());
        llm.push_response(research_json(&[
            ("Sleep", "go to bed early tonight"),
            ("Water", "drink a glass right away"),
        ]));
        let orchestrator = ResearchOrchestrator::new(llm);

        let err = discover_topics(&batches, &posts, &registry, &orchestrator, &batch.id)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "validation_error");
        assert_eq!(err.details()["desired"], 1);
        assert_eq!(err.details()["unique"], 0);

        // Nothing was written: batch still in setup, zero posts.
        let unchanged = require_batch(batches.as_ref(), &batch.id).unwrap();
        assert_eq!(unchanged.state, BatchState::Setup);
        assert!(posts.list_posts(&batch.id).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_discovery_dedups_against_registry_but_fills_from_extras() {
        let (batches, posts, registry) = stores();
        let batch = setup_batch(&batches, PostTypeCounts::new(1, 0, 0));

        registry
            .upsert_topic(&TopicFields::new(
                "Sleep",
                rotation_from_script("go to bed early tonight"),
                extract_cta("go to bed early tonight"),
            ))
            .unwrap();

        let llm = Arc::new(MockTextGenerator::new());
        llm.push_response(research_json(&[
            ("Sleep", "go to bed early tonight"),
            ("Water", "drink a glass right away"),
        ]));
        llm.push_response(dialog_text());
        llm.push_response(seed_json());
        let orchestrator = ResearchOrchestrator::new(llm);

        let report = discover_topics(&batches, &posts, &registry, &orchestrator, &batch.id)
            .await
            .unwrap();

        assert_eq!(report.rejected_duplicates, 1);
        assert_eq!(report.posts[0].topic_title, "Water");
        // "Sleep" stays at one use, "Water" was added.
        assert_eq!(registry.all_topics().unwrap().len(), 2);
    }

    #[test]
    fn test_select_dialog_script_prefers_framework_bucket() {
        let scripts = DialogScripts {
            problem: vec!["p".into()],
            testimonial: vec!["t".into()],
            transformation: vec!["x".into()],
        };
        assert_eq!(
            select_dialog_script(&scripts, Framework::Testimonial),
            Some("t".into())
        );

        let only_problem = DialogScripts {
            problem: vec!["p".into()],
            ..Default::default()
        };
        assert_eq!(
            select_dialog_script(&only_problem, Framework::Transformation),
            Some("p".into())
        );
        assert_eq!(
            select_dialog_script(&DialogScripts::default(), Framework::Pal),
            None
        );
    }
}
