//! Research output data types.

use serde::{Deserialize, Serialize};

/// Copywriting framework a script follows.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Framework {
    /// Problem / Agitate / soLution.
    #[serde(rename = "PAL")]
    Pal,
    Testimonial,
    Transformation,
}

impl Framework {
    pub fn as_str(&self) -> &'static str {
        match self {
            Framework::Pal => "PAL",
            Framework::Testimonial => "Testimonial",
            Framework::Transformation => "Transformation",
        }
    }
}

impl std::fmt::Display for Framework {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A research source backing a script claim.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceRef {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl SourceRef {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// Ad-style dialogue scripts bucketed by category.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct DialogScripts {
    /// Problem / agitate / solution ads.
    #[serde(default)]
    pub problem: Vec<String>,
    /// Testimonial-style ads.
    #[serde(default)]
    pub testimonial: Vec<String>,
    /// Transformation-story ads.
    #[serde(default)]
    pub transformation: Vec<String>,
}

impl DialogScripts {
    pub fn total(&self) -> usize {
        self.problem.len() + self.testimonial.len() + self.transformation.len()
    }
}

/// Structured facts extracted from the brand brief by the strict extractor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct SeedFacts {
    #[serde(default)]
    pub facts: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_context: Option<String>,
}

/// One researched topic with its generated script.
///
/// This is the model-facing shape: fields the model may omit are optional
/// here and filled in by validation (`tone`, `disclaimer`, duration).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResearchItem {
    /// Topic headline.
    pub topic: String,

    /// Content rotation/angle label.
    #[serde(default)]
    pub rotation: String,

    pub framework: Framework,

    /// Backing sources, 1 to 2 entries.
    #[serde(default)]
    pub sources: Vec<SourceRef>,

    /// The spoken script.
    pub script: String,

    /// Short summary of what the sources say, in different words than the
    /// script.
    #[serde(default)]
    pub source_summary: String,

    /// Model-reported spoken duration. Recomputed during validation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_duration_s: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disclaimer: Option<String>,
}

impl ResearchItem {
    /// Trailing call-to-action clause: the last words of the script.
    pub fn cta(&self) -> String {
        extract_cta(&self.script)
    }
}

/// Last min(4, n) words of a script, with trailing punctuation stripped.
pub fn extract_cta(script: &str) -> String {
    let words: Vec<&str> = script.split_whitespace().collect();
    let take = words.len().min(4);
    let tail = words[words.len() - take..].join(" ");
    strip_cta_punctuation(&tail)
}

/// Strip trailing punctuation that varies between otherwise identical CTAs.
pub fn strip_cta_punctuation(cta: &str) -> String {
    cta.trim_end_matches(['-', '–', '—', ',', ':', ';', '.', '!', '?'])
        .trim()
        .to_string()
}

/// Script body with the trailing CTA clause removed, used as the topic
/// rotation text. Falls back to the full script when removing the CTA would
/// leave nothing.
pub fn rotation_from_script(script: &str) -> String {
    let words: Vec<&str> = script.split_whitespace().collect();
    let take = words.len().min(4);
    let head = words[..words.len() - take].join(" ");
    let trimmed = head
        .trim_end_matches(['-', '–', '—', ',', ':', ';'])
        .trim()
        .to_string();
    if trimmed.is_empty() {
        script.trim().to_string()
    } else {
        trimmed
    }
}
