use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Public Router Module
///
/// Defines endpoints that are **unauthenticated** and accessible to any client
/// (anonymous or logged-in): the marketing pages and the read-only content API
/// the frontend consumes. The access gate is deliberately not layered here — the
/// marketing site must render for everyone, and none of these handlers touch the
/// session.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // A simple, unauthenticated endpoint used for monitoring and load balancer checks.
        // Returns "ok" immediately to verify the service is running and responsive.
        .route("/health", get(|| async { "ok" }))
        // --- Marketing Pages ---
        // GET /
        // The landing page, including the static testimonials catalog. Also the
        // target of the gate's redirect-to-home outcome.
        .route("/", get(handlers::home))
        .route("/services", get(handlers::services_page))
        .route("/pricing", get(handlers::pricing_page))
        // GET /blog, /blog/{slug}
        // Content is proxied from the external content API; an absent or
        // unreachable API degrades to an empty listing.
        .route("/blog", get(handlers::blog_index))
        .route("/blog/{slug}", get(handlers::blog_post))
        .route("/case-studies", get(handlers::case_studies_page))
        // --- Content API (JSON, consumed by the frontend) ---
        .route("/api/posts", get(handlers::list_posts))
        .route("/api/posts/{slug}", get(handlers::get_post))
        .route("/api/case-studies", get(handlers::list_case_studies))
        .route("/api/pricing", get(handlers::list_pricing))
        .route("/api/testimonials", get(handlers::list_testimonials))
        .route("/api/services", get(handlers::list_services))
}
