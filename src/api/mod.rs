//! HTTP API for the OKR tracker

pub mod access_handlers;
pub mod handlers;
pub mod hierarchy_handlers;
pub mod import_handlers;
pub mod routes;
pub mod user_handlers;

pub use handlers::{ApiState, ServerState};
pub use routes::create_router;
