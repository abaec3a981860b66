//! Request middleware
//!
//! - [`api_key_middleware`]: optional `X-API-KEY` gate
//! - [`request_log_middleware`]: one structured event per request

pub mod api_key;
pub mod request_log;

pub use api_key::{api_key_middleware, is_public_path, API_KEY_HEADER};
pub use request_log::request_log_middleware;
