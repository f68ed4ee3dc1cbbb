//! HTTP API layer for beacon.
//!
//! This crate provides the console's two surfaces:
//!
//! - **Admin endpoints**: announcement registry CRUD and activation, plus
//!   the plain content collections, behind a static credential check
//! - **Widget endpoints**: read-only popup bootstrap, display bookkeeping,
//!   and a WebSocket session that runs the whole engine server-side
//!
//! Built on Axum 0.8 with Tower middleware stack.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;

pub use endpoints::router;
pub use middleware::{AppState, admin_auth_middleware};
