use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - LLM section exists (enforced by serde) and its key is non-empty
/// - Server port is not 0
/// - Video providers with a key require a CDN to land the result
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.llm.api_key.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "llm.api_key cannot be empty".to_string(),
        ));
    }

    if config.video.poll_interval_secs == 0 {
        return Err(ConfigError::ValidationError(
            "video.poll_interval_secs cannot be 0".to_string(),
        ));
    }

    let any_video_key = config
        .video
        .openai_api_key
        .as_ref()
        .is_some_and(|k| !k.trim().is_empty())
        || config
            .video
            .gemini_api_key
            .as_ref()
            .is_some_and(|k| !k.trim().is_empty());
    if any_video_key && config.cdn.is_none() {
        return Err(ConfigError::ValidationError(
            "cdn section is required when a video provider is configured".to_string(),
        ));
    }
    if let Some(cdn) = &config.cdn {
        if cdn.imagekit_private_key.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "cdn.imagekit_private_key cannot be empty".to_string(),
            ));
        }
    }

    Ok(())
}
