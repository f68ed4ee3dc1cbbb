//! Request extractors.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
};

/// Marker inserted by the admin auth middleware on a valid credential.
#[derive(Debug, Clone, Copy)]
pub struct AdminUser;

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Self>()
            .copied()
            .ok_or((StatusCode::UNAUTHORIZED, "Unauthorized"))
    }
}

/// Visitor identity for widget endpoints.
///
/// The widget supplies a long-lived visitor ID and a browsing-session ID as
/// headers; marker keys are namespaced by them. Absent headers fall back to
/// a shared anonymous identity, reproducing the original single-browser
/// behavior.
#[derive(Debug, Clone)]
pub struct Visitor {
    /// Long-lived visitor identity (`X-Visitor-Id`).
    pub visitor_id: String,
    /// Browsing-session identity (`X-Session-Id`).
    pub session_id: String,
}

impl<S> FromRequestParts<S> for Visitor
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .filter(|v| !v.is_empty())
                .unwrap_or("anonymous")
                .to_string()
        };

        Ok(Self {
            visitor_id: header("X-Visitor-Id"),
            session_id: header("X-Session-Id"),
        })
    }
}
