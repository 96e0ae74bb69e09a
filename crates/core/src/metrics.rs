//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Topic research (attempts, retries, dedup rejections)
//! - Video generation (submissions, polls, completions, recovery)
//! - Batch progression and LLM token usage

use once_cell::sync::Lazy;
use prometheus::{IntCounter, IntCounterVec, Opts};

// =============================================================================
// Research Metrics
// =============================================================================

/// Research chunk attempts total by result.
pub static RESEARCH_ATTEMPTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "reelforge_research_attempts_total",
            "Total research generation attempts",
        ),
        &["result"], // "accepted", "rejected", "failed"
    )
    .unwrap()
});

/// Research retries after validation feedback.
pub static RESEARCH_RETRIES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "reelforge_research_retries_total",
        "Total research retries with validation feedback",
    )
    .unwrap()
});

/// Topics rejected as duplicates by stage.
pub static DEDUP_REJECTIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "reelforge_dedup_rejections_total",
            "Topics rejected as duplicates",
        ),
        &["stage"], // "within_pass", "registry"
    )
    .unwrap()
});

// =============================================================================
// Video Metrics
// =============================================================================

/// Video submissions total by provider.
pub static VIDEO_SUBMISSIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "reelforge_video_submissions_total",
            "Total video generation submissions",
        ),
        &["provider"],
    )
    .unwrap()
});

/// Videos completed total by provider.
pub static VIDEOS_COMPLETED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "reelforge_videos_completed_total",
            "Total videos completed and uploaded",
        ),
        &["provider"],
    )
    .unwrap()
});

/// Videos failed total by provider.
pub static VIDEOS_FAILED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "reelforge_videos_failed_total",
            "Total videos that failed generation",
        ),
        &["provider"],
    )
    .unwrap()
});

/// Poll passes executed by the video poller.
pub static POLL_PASSES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "reelforge_poll_passes_total",
        "Total poll passes over active videos",
    )
    .unwrap()
});

/// Recovery records written after failed store updates.
pub static RECOVERY_RECORDS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "reelforge_recovery_records_total",
        "Total recovery records written",
    )
    .unwrap()
});

// =============================================================================
// Batch Metrics
// =============================================================================

/// Batch state transitions total.
pub static BATCH_TRANSITIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "reelforge_batch_transitions_total",
            "Total batch state transitions",
        ),
        &["to_state"],
    )
    .unwrap()
});

/// Batches completed (reached the terminal state).
pub static BATCHES_COMPLETED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "reelforge_batches_completed_total",
        "Total batches completed",
    )
    .unwrap()
});

// =============================================================================
// LLM Metrics
// =============================================================================

/// LLM tokens used.
pub static LLM_TOKENS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("reelforge_llm_tokens_total", "Total LLM tokens used"),
        &["provider", "direction"], // direction: "input", "output"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Research
        Box::new(RESEARCH_ATTEMPTS.clone()),
        Box::new(RESEARCH_RETRIES.clone()),
        Box::new(DEDUP_REJECTIONS.clone()),
        // Video
        Box::new(VIDEO_SUBMISSIONS.clone()),
        Box::new(VIDEOS_COMPLETED.clone()),
        Box::new(VIDEOS_FAILED.clone()),
        Box::new(POLL_PASSES.clone()),
        Box::new(RECOVERY_RECORDS.clone()),
        // Batches
        Box::new(BATCH_TRANSITIONS.clone()),
        Box::new(BATCHES_COMPLETED.clone()),
        // LLM
        Box::new(LLM_TOKENS.clone()),
    ]
}
