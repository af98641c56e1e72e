//! # HTTP transport
//!
//! Axum routes over the session, roster and promotion operations.

mod actor;
mod error;
mod promotion_routes;
mod server;
mod session_id;
mod session_routes;
mod state;
mod student_routes;

pub use server::HttpServer;
pub use state::HttpState;
