pub mod batches;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod posts;
pub mod publish;
pub mod qa;
pub mod routes;
pub mod topics;
pub mod videos;

pub use routes::create_router;
