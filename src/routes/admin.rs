use crate::{AppState, admin, handlers};
use axum::{Router, routing::get};

/// Admin Router Module
///
/// Defines the routes exclusively accessible to allow-listed administrators.
///
/// Access Control:
/// The page router below is wrapped (in `create_router`) by two layers: the
/// access gate (session required) and `admin_guard`, which re-validates the
/// session's access token against the identity provider and tests the verified
/// email against the allow-list on **every** navigation. The callback-time
/// allow-list shortcut never substitutes for this check.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /admin
        // The privileged dashboard page.
        .route("/", get(handlers::admin_dashboard))
}

/// Admin Credential API
///
/// The `/admin/check` endpoint lives outside the cookie-based gate: its contract
/// is bearer-credential in, `{isAdmin}` out, with 401/500 instead of redirects,
/// so the privileged frontend can probe admin status without triggering a
/// navigation.
pub fn admin_api_routes() -> Router<AppState> {
    Router::new().route("/check", get(admin::admin_check))
}
