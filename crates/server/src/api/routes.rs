use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::{batches, handlers, posts, publish, qa, topics, videos};
use crate::api::middleware::metrics_middleware;
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        // Batches
        .route("/batches", post(batches::create_batch))
        .route("/batches", get(batches::list_batches))
        .route("/batches/{id}", get(batches::get_batch))
        .route("/batches/{id}/advance", post(batches::advance_batch))
        .route("/batches/{id}/archive", post(batches::archive_batch))
        .route("/batches/{id}/duplicate", post(batches::duplicate_batch))
        .route("/batches/{id}/discover", post(batches::discover))
        // Posts and prompts
        .route("/batches/{id}/posts", get(posts::list_posts))
        .route("/batches/{id}/prompts", post(posts::build_prompts))
        .route("/posts/{id}", get(posts::get_post))
        .route("/posts/{id}/script", put(posts::update_script))
        .route("/posts/{id}/prompt", post(posts::build_prompt))
        // Video generation
        .route("/posts/{id}/video", post(videos::submit))
        .route("/batches/{id}/videos", post(videos::generate_batch))
        .route("/videos/poll", post(videos::poll_once))
        .route("/videos/recovery/replay", post(videos::replay_recovery))
        // QA
        .route("/posts/{id}/qa", post(qa::review_post))
        .route("/posts/{id}/qa/auto", post(qa::auto_checks))
        .route("/batches/{id}/qa", get(qa::batch_status))
        // Publish planning
        .route("/posts/{id}/schedule", post(publish::schedule))
        .route("/batches/{id}/plan", put(publish::set_plan))
        .route("/batches/{id}/plan", get(publish::get_plan))
        .route("/batches/{id}/publish", post(publish::confirm))
        // Topic registry
        .route("/topics", get(topics::list_topics))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::metrics))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
