//! API endpoints.

mod announcements;
mod content;
mod widget;

use axum::Router;

use crate::middleware::AppState;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/announcements", announcements::router())
        .nest("/content", content::router())
        .nest("/widget", widget::router())
}
