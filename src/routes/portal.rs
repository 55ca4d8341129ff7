use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Portal Router Module
///
/// Defines every route the access gate runs in front of: the authentication
/// entry pages and the client portal.
///
/// Access Control Strategy:
/// The gate is applied as a route layer over this entire module (see
/// `create_router`). It classifies `/login`, `/signup` and `/auth/callback` as
/// Public — they pass through without a session, and an *authenticated* caller
/// hitting `/login` or `/signup` is redirected home instead. Everything else in
/// this module requires a valid session; unauthenticated callers are redirected
/// to `/login` with their original destination preserved in `next`.
pub fn portal_routes() -> Router<AppState> {
    Router::new()
        // --- Auth Entry Pages (Public classification) ---
        // GET /login
        // Renders the sign-in page, echoing the gate's `message` and `next`
        // parameters.
        .route("/login", get(handlers::login_page))
        // GET /signup
        .route("/signup", get(handlers::signup_page))
        // GET /auth/callback
        // The identity provider's return leg: exchanges the one-time code for a
        // session and writes the session cookies onto the redirect response.
        .route("/auth/callback", get(handlers::auth_callback))
        // GET /signout
        // Expires both session cookies and redirects home.
        .route("/signout", get(handlers::signout))
        // --- Client Portal (session required) ---
        // GET /portal
        // The portal dashboard. The caller's identity is resolved via the
        // `CurrentUser` extractor from the session the gate already validated.
        .route("/portal", get(handlers::portal_dashboard))
        // GET /portal/api/projects
        // Proxies the signed-in client's project list from the business API.
        .route("/portal/api/projects", get(handlers::portal_projects))
}
