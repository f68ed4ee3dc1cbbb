//! API middleware.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use beacon_core::{RegistryService, WidgetService};
use beacon_store::repositories::ContentRepository;

use crate::extractors::AdminUser;

/// Application state.
#[derive(Clone)]
pub struct AppState {
    /// Announcement registry service (admin surface).
    pub registry_service: RegistryService,
    /// Widget service (visitor surface).
    pub widget_service: WidgetService,
    /// Content collections repository (admin surface).
    pub content_repo: ContentRepository,
    /// Static admin credential.
    pub admin_token: String,
}

/// Admin authentication middleware.
///
/// The console has a single static credential: a bearer token compared
/// against the configured value. On match an [`AdminUser`] marker lands in
/// the request extensions; admin extractors reject requests without it.
pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(auth_header) = req.headers().get("Authorization")
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
        && token == state.admin_token
    {
        req.extensions_mut().insert(AdminUser);
    }

    next.run(req).await
}
