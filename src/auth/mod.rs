//! JWT identity extraction and route protection

pub mod jwt;
pub mod middleware;

pub use jwt::{decode_jwt, encode_jwt, Claims};
pub use middleware::require_auth;
