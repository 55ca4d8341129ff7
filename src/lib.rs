use axum::{Router, extract::FromRef, http::HeaderName, middleware};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod admin;
pub mod auth;
pub mod config;
pub mod content;
pub mod gate;
pub mod handlers;
pub mod identity;
pub mod models;

// Module for routing segregation (Public, Portal, Admin).
pub mod routes;
use routes::{admin as admin_routes, portal, public};

// --- Public Re-exports ---

// Makes core state types easily accessible to the main application entry point (main.rs).
pub use config::AppConfig;
pub use content::{ApiState, HttpBusinessApi};
pub use identity::{HttpIdentityProvider, IdentityState};

/// ApiDoc
///
/// Auto-generates the OpenAPI documentation (Swagger JSON) for the JSON surface
/// of the application: the content API, the portal proxy, and the admin check.
/// The server-rendered HTML pages are deliberately not part of the document.
/// The resulting JSON is served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::list_posts, handlers::get_post, handlers::list_case_studies,
        handlers::list_pricing, handlers::list_testimonials, handlers::list_services,
        handlers::portal_projects, admin::admin_check,
    ),
    components(
        schemas(
            models::Post, models::CaseStudy, models::PricingPlan, models::Testimonial,
            models::Service, models::ClientProject, models::AdminCheckResponse,
        )
    ),
    tags(
        (name = "agency-portal", description = "Northlight Studio site & portal API")
    )
)]
struct ApiDoc;

/// AppState
///
/// Implements the **Unified State Pattern**. This is the single, thread-safe, and
/// immutable container holding all essential application services and
/// configuration, shared across all incoming requests. There is no other
/// process-wide state: the admin allow-list lives inside `config` and is
/// read-only after startup.
#[derive(Clone)]
pub struct AppState {
    /// Identity boundary: session resolution, credential validation, code exchange.
    pub identity: IdentityState,
    /// Business-API boundary: content listings, portal projects, admin confirmation.
    pub api: ApiState,
    /// Configuration: the loaded, immutable environment configuration.
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

// These implementations allow extractors to selectively pull components from the
// shared AppState, keeping handler dependencies explicit.

impl FromRef<AppState> for IdentityState {
    fn from_ref(app_state: &AppState) -> IdentityState {
        app_state.identity.clone()
    }
}

impl FromRef<AppState> for ApiState {
    fn from_ref(app_state: &AppState) -> ApiState {
        app_state.api.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the application's entire routing structure, applies global and scoped
/// middleware, and registers the application state.
///
/// Gate placement:
/// - `public_routes` + `portal_routes` + `/admin` pages — wrapped by
///   `gate::access_gate`, which runs once per request before any page logic.
///   The marketing/content surface classifies as open, so anonymous visitors
///   pass through, but session cookies still refresh on every request.
/// - `/admin` pages — additionally wrapped by `admin::admin_guard` (server-side
///   re-check; innermost layer, runs after the gate).
/// - `/admin/check` — bearer-credential contract, outside the cookie gate.
/// - Swagger UI / OpenAPI JSON — documentation tooling, outside the gate.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Gated Subtree Assembly
    // Route layers run outermost-last: the access gate added here wraps the open
    // site surface, the portal routes, and the admin pages (which carry their own
    // inner guard).
    let gated = public::public_routes()
        .merge(portal::portal_routes())
        .nest(
            "/admin",
            admin_routes::admin_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                admin::admin_guard,
            )),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            gate::access_gate,
        ));

    // 3. Base Router Assembly
    let base_router = Router::new()
        // Documentation: Serve the auto-generated Swagger UI.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Gated Routes: access gate (+ admin guard on the admin pages).
        .merge(gated)
        // Admin Credential API: bearer contract, no cookie gate.
        .nest("/admin", admin_routes::admin_api_routes())
        // Apply the Unified State to all routes.
        .with_state(state);

    // 4. Observability and Correlation Layers (Applied outermost/first)
    base_router
        .layer(
            ServiceBuilder::new()
                // 4a. Request ID Generation: a unique UUID for every incoming request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 4b. Request Tracing: wraps the request/response lifecycle in a span
                // correlated on the generated request ID.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 4c. Request ID Propagation: returns the x-request-id header to the
                // client and injects it into downstream service calls.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 5. CORS Layer
        .layer(cors)
}

/// trace_span_logger
///
/// Helper used by `TraceLayer` to customize span creation: extracts the
/// `x-request-id` header (if present) and includes it in the structured logging
/// metadata alongside the HTTP method and URI, so every log line for a single
/// request is correlated by a unique ID.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
