use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub llm: LlmConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub video: VideoConfig,
    #[serde(default)]
    pub cdn: Option<CdnConfig>,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    "0.0.0.0".parse().unwrap()
}

fn default_port() -> u16 {
    8080
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("reelforge.db")
}

/// Text generation provider configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub provider: LlmProvider,
    pub api_key: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    #[default]
    Openai,
    Anthropic,
}

fn default_llm_model() -> String {
    "gpt-5".to_string()
}

/// Video generation configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VideoConfig {
    /// OpenAI API key for the Sora providers. Absent means Sora is
    /// unavailable.
    #[serde(default)]
    pub openai_api_key: Option<String>,
    /// Google API key for the Veo provider. Absent means Veo is
    /// unavailable.
    #[serde(default)]
    pub gemini_api_key: Option<String>,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Directory for submission recovery logs.
    #[serde(default = "default_recovery_dir")]
    pub recovery_dir: PathBuf,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            gemini_api_key: None,
            poll_interval_secs: default_poll_interval(),
            recovery_dir: default_recovery_dir(),
        }
    }
}

fn default_poll_interval() -> u64 {
    10
}

fn default_recovery_dir() -> PathBuf {
    PathBuf::from("recovery_logs")
}

/// CDN upload configuration (required when videos are generated)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CdnConfig {
    pub imagekit_private_key: String,
    #[serde(default)]
    pub folder: Option<String>,
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub llm: SanitizedLlmConfig,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub video: SanitizedVideoConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cdn: Option<SanitizedCdnConfig>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedLlmConfig {
    pub provider: String,
    pub model: String,
    pub api_key_configured: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedVideoConfig {
    pub sora_configured: bool,
    pub veo_configured: bool,
    pub poll_interval_secs: u64,
    pub recovery_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedCdnConfig {
    pub imagekit_key_configured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            llm: SanitizedLlmConfig {
                provider: match config.llm.provider {
                    LlmProvider::Openai => "openai".to_string(),
                    LlmProvider::Anthropic => "anthropic".to_string(),
                },
                model: config.llm.model.clone(),
                api_key_configured: !config.llm.api_key.is_empty(),
            },
            server: config.server.clone(),
            database: config.database.clone(),
            video: SanitizedVideoConfig {
                sora_configured: config
                    .video
                    .openai_api_key
                    .as_ref()
                    .is_some_and(|k| !k.is_empty()),
                veo_configured: config
                    .video
                    .gemini_api_key
                    .as_ref()
                    .is_some_and(|k| !k.is_empty()),
                poll_interval_secs: config.video.poll_interval_secs,
                recovery_dir: config.video.recovery_dir.clone(),
            },
            cdn: config.cdn.as_ref().map(|c| SanitizedCdnConfig {
                imagekit_key_configured: !c.imagekit_private_key.is_empty(),
                folder: c.folder.clone(),
            }),
        }
    }
}
