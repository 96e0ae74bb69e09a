//! Prompt templates for the research and dialogue agents.

use crate::post::PostType;

fn post_type_context(post_type: PostType) -> &'static str {
    match post_type {
        PostType::Value => "Educational Mehrwert-Clips",
        PostType::Lifestyle => "Lifestyle-Vibes mit Community-Touch",
        PostType::Product => "Produktnahe Alltagshilfen",
    }
}

fn join_sections(sections: &[String]) -> String {
    sections
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Render the topic research prompt for one chunk.
pub fn build_research_prompt(
    brand: &str,
    post_type: PostType,
    desired_topics: u32,
    chunk_index: u32,
    total_chunks: u32,
) -> String {
    let context = post_type_context(post_type);
    join_sections(&[
        format!(
            "You are a short-form video researcher for the brand \"{}\". \
             Research {} fresh, source-backed topics in the category: {}. \
             Use web search to ground every claim.",
            brand, desired_topics, context
        ),
        format!(
            "Brand context: content is spoken to camera in German, one take, \
             no cuts. Scripts must be speakable in at most 8 seconds \
             (roughly 2.6 words per second)."
        ),
        format!(
            "Output STRICT JSON: an array of {} objects with fields \
             topic (string), framework (one of \"PAL\", \"Testimonial\", \
             \"Transformation\"), sources (1-2 objects with url and optional \
             title), script (the spoken German line, ending in a short call \
             to action), source_summary (paraphrase of the sources in \
             different words than the script), estimated_duration_s \
             (integer seconds), tone (string), disclaimer (string). \
             No markdown, no commentary.",
            desired_topics
        ),
        format!(
            "Rules: rotate topics so no topic repeats consecutively and \
             topic counts stay balanced; every script must end in a distinct \
             call to action; the source_summary must not quote the script. \
             This is chunk {} of {}; do not repeat topics from other chunks.",
            chunk_index, total_chunks
        ),
    ])
}

/// Render the dialogue script prompt for one topic.
pub fn build_dialog_prompt(brand: &str, topic: &str, per_category: usize) -> String {
    join_sections(&[
        format!(
            "Write UGC ad dialogue variants for the brand \"{}\" on the \
             topic \"{}\". All lines in German, spoken to camera, at most \
             8 seconds each.",
            brand, topic
        ),
        format!(
            "Output plain text with exactly these three headings, each \
             followed by {} scripts separated by blank lines:\n\
             Problem-Agitieren-Lösung Ads\n\
             Testimonial-Stil Ads\n\
             Transformations-Geschichten Ads",
            per_category
        ),
        "Rules: no numbering, no markdown emphasis, no commentary outside the scripts.".to_string(),
    ])
}

/// System prompt for the strict fact extractor.
pub const STRICT_EXTRACTOR_SYSTEM: &str = "You are a strict fact extractor for a UGC video system.\n\
Your ONLY job is to extract factual information from the provided topic.\n\n\
Rules:\n\
1. Extract ONLY facts that are explicitly stated or clearly implied\n\
2. DO NOT add creative interpretations or embellishments\n\
3. DO NOT hallucinate information\n\
4. Keep facts concise and clear\n\
5. If no clear facts are present, extract the core message/claim\n\n\
Output ONLY valid JSON with a \"facts\" array of strings.";

/// Render the strict extractor prompt for one topic.
pub fn build_extractor_prompt(title: &str, rotation: &str, cta: &str) -> String {
    format!(
        "Extract factual seed information from this topic:\n\n\
         Title: {}\n\
         Rotation: {}\n\
         CTA: {}\n\n\
         Extract ONLY the factual claims, core messages, or key points. \
         Do not add any creative interpretation.\n\n\
         Return JSON format:\n\
         {{\n  \"facts\": [\"fact 1\", \"fact 2\", ...],\n  \"source_context\": \"brief context if needed\"\n}}\n\n\
         Extract facts now:",
        title, rotation, cta
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_research_prompt_carries_chunk_context() {
        let prompt = build_research_prompt("Acme", PostType::Value, 2, 2, 3);
        assert!(prompt.contains("Acme"));
        assert!(prompt.contains("Educational Mehrwert-Clips"));
        assert!(prompt.contains("chunk 2 of 3"));
        assert!(prompt.contains("array of 2 objects"));
    }

    #[test]
    fn test_dialog_prompt_lists_all_headings() {
        let prompt = build_dialog_prompt("Acme", "Hydration", 2);
        assert!(prompt.contains("Problem-Agitieren-Lösung Ads"));
        assert!(prompt.contains("Testimonial-Stil Ads"));
        assert!(prompt.contains("Transformations-Geschichten Ads"));
    }

    #[test]
    fn test_extractor_prompt_includes_topic_fields() {
        let prompt = build_extractor_prompt("Title", "Rotation", "Cta");
        assert!(prompt.contains("Title: Title"));
        assert!(prompt.contains("CTA: Cta"));
    }
}
