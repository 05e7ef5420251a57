mod auth;
mod error_handler;

pub use auth::session_middleware;
pub use error_handler::log_errors;
