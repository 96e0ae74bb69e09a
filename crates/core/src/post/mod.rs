//! Post domain types.

mod types;

pub use types::{Post, PostType, PublishStatus, SeedData, VideoStatus};
