pub mod advance;
pub mod batch;
pub mod cdn;
pub mod config;
pub mod dedup;
pub mod discovery;
pub mod error;
pub mod llm;
pub mod metrics;
pub mod post;
pub mod prompt;
pub mod publish;
pub mod qa;
pub mod research;
pub mod store;
pub mod testing;
pub mod video;

pub use batch::{Batch, BatchOps, BatchState, PostTypeCounts};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
};
pub use error::CoreError;
pub use post::{Post, PostType, PublishStatus, SeedData, VideoStatus};
pub use store::{BatchStore, PostStore, SqliteStore, TopicRegistry};
