use axum::http::{HeaderName, HeaderValue, Method, header};
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Suffix accepted in addition to the explicit allow-list, so that preview
/// deployments of the frontend keep working.
const VERCEL_SUFFIX: &str = ".vercel.app";

const PREFLIGHT_MAX_AGE: Duration = Duration::from_secs(86_400);

/// How a non-matching origin is treated. `LogOnly` mirrors the historically
/// observed behavior: log the origin and let the request through. `Enforce`
/// rejects it. Selected by configuration so the stricter mode needs no code
/// change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorsMode {
    Enforce,
    LogOnly,
}

/// Cross-origin policy: an explicit allow-list plus the *.vercel.app suffix,
/// with a mode knob for unmatched origins.
#[derive(Debug, Clone)]
pub struct OriginPolicy {
    allowed: Vec<String>,
    mode: CorsMode,
}

impl OriginPolicy {
    pub fn new(allowed: Vec<String>, mode: CorsMode) -> Self {
        Self { allowed, mode }
    }

    /// True when the origin is on the allow-list or under *.vercel.app.
    pub fn is_allowed(&self, origin: &str) -> bool {
        self.allowed.iter().any(|o| o == origin) || origin.ends_with(VERCEL_SUFFIX)
    }

    /// Admission decision for a single request origin.
    pub fn decide(&self, origin: &str) -> bool {
        if self.is_allowed(origin) {
            return true;
        }
        match self.mode {
            CorsMode::Enforce => {
                tracing::warn!(%origin, "Rejecting origin not allowed by CORS policy");
                false
            }
            CorsMode::LogOnly => {
                tracing::warn!(%origin, "Origin not allowed by CORS policy, allowing anyway (log-only mode)");
                true
            }
        }
    }

    /// Builds the tower-http layer for this policy.
    pub fn layer(&self) -> CorsLayer {
        let policy = self.clone();
        CorsLayer::new()
            .allow_origin(AllowOrigin::predicate(
                move |origin: &HeaderValue, _request_parts| {
                    origin.to_str().map(|o| policy.decide(o)).unwrap_or(false)
                },
            ))
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([
                header::CONTENT_TYPE,
                header::AUTHORIZATION,
                HeaderName::from_static("user-id"),
            ])
            .max_age(PREFLIGHT_MAX_AGE)
    }
}
