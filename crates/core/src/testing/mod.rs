//! Testing utilities and mock implementations for E2E tests.
//!
//! This module provides mock implementations of the external service traits
//! (text generation, video generation, CDN upload), allowing pipeline tests
//! without real infrastructure.
//!
//! # Example
//!
//! ```rust,ignore
//! use reelforge_core::testing::{MockTextGenerator, MockVideoGenerator};
//!
//! let llm = MockTextGenerator::new();
//! llm.push_response("[{\"topic\": \"Sleep\", ...}]".to_string());
//!
//! let video = MockVideoGenerator::new(VideoProviderKind::Sora2Pro)
//!     .with_operation_id("op-1");
//! ```

mod mock_cdn;
mod mock_text_generator;
mod mock_video_generator;

pub use mock_cdn::MockCdnUploader;
pub use mock_text_generator::MockTextGenerator;
pub use mock_video_generator::MockVideoGenerator;

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::batch::{Batch, PostTypeCounts};
    use crate::post::{Post, PostType, SeedData};
    use crate::research::{Framework, SourceRef};

    /// Create a setup-state batch with the given counts.
    pub fn batch(brand: &str, value: u32, lifestyle: u32, product: u32) -> Batch {
        Batch::new(brand, PostTypeCounts::new(value, lifestyle, product))
    }

    /// Create a seeded post with reasonable defaults.
    pub fn seeded_post(batch_id: &str, post_type: PostType, topic: &str) -> Post {
        Post::new(
            batch_id,
            post_type,
            topic,
            format!("{} explained in thirty seconds", topic),
            "starte heute damit",
            6.0,
            seed_data(),
        )
    }

    /// A seed payload with every field the prompt builder reads.
    pub fn seed_data() -> SeedData {
        SeedData {
            dialog_script: Some(
                "Trink morgens ein Glas Wasser. Starte heute damit".to_string(),
            ),
            framework: Some(Framework::Pal),
            tone: Some("warm".to_string()),
            estimated_duration_s: Some(6.0),
            cta: Some("starte heute damit".to_string()),
            sources: vec![SourceRef::new("https://example.com/study")],
            source_summary: Some("independent paraphrase of cited research".to_string()),
            ..Default::default()
        }
    }
}
