//! Access control: users, roles, scopes, and the resolver over them.

pub mod models;
pub mod resolver;
pub mod service;

pub use models::*;
pub use service::AccessService;
