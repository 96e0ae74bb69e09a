//! Publish planning: per-post schedules and batch completion.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::batch::{Batch, BatchState};
use crate::error::CoreError;
use crate::post::{Post, PublishStatus};
use crate::store::{require_batch, require_post, BatchStore, PostStore};

/// One entry of a batch publish plan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PostSchedule {
    pub post_id: String,
    pub scheduled_at: DateTime<Utc>,
    #[serde(default)]
    pub social_networks: Vec<String>,
}

/// The stored plan of a batch, one row per post.
#[derive(Debug, Clone, Serialize)]
pub struct BatchPlan {
    pub batch_id: String,
    pub entries: Vec<PlanEntry>,
    pub all_scheduled: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanEntry {
    pub post_id: String,
    pub topic_title: String,
    pub publish_status: PublishStatus,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub social_networks: Vec<String>,
}

/// Schedule one post for publication at a future time.
pub fn schedule_post(
    posts: &Arc<dyn PostStore>,
    post_id: &str,
    scheduled_at: DateTime<Utc>,
    social_networks: Vec<String>,
) -> Result<Post, CoreError> {
    if scheduled_at <= Utc::now() {
        return Err(CoreError::validation_with(
            "scheduled_at must be in the future",
            serde_json::json!({ "scheduled_at": scheduled_at.to_rfc3339() }),
        ));
    }
    if social_networks.is_empty() {
        return Err(CoreError::validation("at least one social network required"));
    }

    let mut post = require_post(posts.as_ref(), post_id)?;
    post.scheduled_at = Some(scheduled_at);
    post.social_networks = social_networks;
    post.publish_status = PublishStatus::Scheduled;
    let stored = posts.update_post(&post)?;

    info!(
        post_id = post_id,
        scheduled_at = %scheduled_at,
        "post scheduled"
    );
    Ok(stored)
}

/// Apply a full plan to a batch. The batch must be in the publish-plan
/// state; every referenced post must belong to it.
pub fn set_batch_plan(
    batches: &Arc<dyn BatchStore>,
    posts: &Arc<dyn PostStore>,
    batch_id: &str,
    schedules: Vec<PostSchedule>,
) -> Result<BatchPlan, CoreError> {
    let batch = require_batch(batches.as_ref(), batch_id)?;
    require_publish_plan_state(&batch)?;

    for schedule in &schedules {
        let post = require_post(posts.as_ref(), &schedule.post_id)?;
        if post.batch_id != batch_id {
            return Err(CoreError::validation_with(
                "post does not belong to batch",
                serde_json::json!({ "post_id": schedule.post_id, "batch_id": batch_id }),
            ));
        }
        schedule_post(
            posts,
            &schedule.post_id,
            schedule.scheduled_at,
            schedule.social_networks.clone(),
        )?;
    }

    get_batch_plan(batches, posts, batch_id)
}

/// Read back the current plan of a batch.
pub fn get_batch_plan(
    batches: &Arc<dyn BatchStore>,
    posts: &Arc<dyn PostStore>,
    batch_id: &str,
) -> Result<BatchPlan, CoreError> {
    let batch = require_batch(batches.as_ref(), batch_id)?;
    let batch_posts = posts.list_posts(&batch.id)?;

    let entries: Vec<PlanEntry> = batch_posts
        .iter()
        .map(|p| PlanEntry {
            post_id: p.id.clone(),
            topic_title: p.topic_title.clone(),
            publish_status: p.publish_status,
            scheduled_at: p.scheduled_at,
            social_networks: p.social_networks.clone(),
        })
        .collect();
    let all_scheduled = !entries.is_empty()
        && entries
            .iter()
            .all(|e| e.publish_status == PublishStatus::Scheduled);

    Ok(BatchPlan {
        batch_id: batch.id,
        entries,
        all_scheduled,
    })
}

/// Close out a batch: every post must be scheduled, then S7 -> S8.
pub fn confirm_publish(
    batches: &Arc<dyn BatchStore>,
    posts: &Arc<dyn PostStore>,
    batch_id: &str,
) -> Result<Batch, CoreError> {
    let batch = require_batch(batches.as_ref(), batch_id)?;
    require_publish_plan_state(&batch)?;

    let plan = get_batch_plan(batches, posts, batch_id)?;
    if !plan.all_scheduled {
        let unscheduled: Vec<&str> = plan
            .entries
            .iter()
            .filter(|e| e.publish_status != PublishStatus::Scheduled)
            .map(|e| e.post_id.as_str())
            .collect();
        return Err(CoreError::validation_with(
            "all posts must be scheduled before publish confirmation",
            serde_json::json!({ "unscheduled_post_ids": unscheduled }),
        ));
    }

    let completed = batches.update_state(batch_id, BatchState::Complete)?;
    info!(batch_id = batch_id, "batch publish confirmed");
    Ok(completed)
}

fn require_publish_plan_state(batch: &Batch) -> Result<(), CoreError> {
    if batch.state != BatchState::PublishPlan {
        return Err(CoreError::StateTransition {
            current: batch.state.to_string(),
            target: BatchState::PublishPlan.to_string(),
            allowed: vec![BatchState::PublishPlan.to_string()],
        });
    }
    Ok(())
}
