use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use url::form_urlencoded;

use crate::{
    AppState,
    identity::{
        CookieSettings, IdentityProvider, Session, SessionCookies, SessionLookup, apply_cookies,
    },
};

// --- Route Classification ---

/// The authentication flow pages: entry pages plus the provider callback,
/// including their sub-paths. Fixed at compile time so classification never
/// does I/O.
pub const AUTH_FLOW_PATHS: &[&str] = &["/login", "/signup", "/auth/callback"];

/// The open site surface: marketing pages, the read-only content API and the
/// health probe. Served to anonymous visitors, but still behind the gate so
/// every request refreshes the session cookies and authenticated callers are
/// recognized. The bare "/" entry matches the landing page only (sub-path
/// matching requires a following slash, and every other root path has its own
/// entry).
pub const OPEN_SITE_PATHS: &[&str] = &[
    "/",
    "/health",
    "/services",
    "/pricing",
    "/blog",
    "/case-studies",
    "/api",
];

/// The subset of public paths that an already-authenticated caller is bounced
/// away from. The callback is deliberately not in this set: it must stay
/// reachable mid-flow even when a stale session cookie is still around.
const AUTH_ENTRY_PATHS: &[&str] = &["/login", "/signup"];

/// Redirect target for authenticated callers hitting an auth entry page.
pub const HOME_PATH: &str = "/";
/// Redirect target for unauthenticated callers hitting a protected path.
pub const LOGIN_PATH: &str = "/login";
/// Default post-login destination when no `next` parameter survived the flow.
pub const PORTAL_PATH: &str = "/portal";
/// Human-readable reason attached to every login redirect.
pub const LOGIN_MESSAGE: &str = "Please sign in to continue.";

/// RouteClass
///
/// Exactly one classification per path, computed by pure prefix/set membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    /// Reachable without a session (auth flow pages and the open site surface).
    Public,
    /// Requires a valid session.
    Authenticated,
    /// Requires a valid session *and* the admin re-check (see `admin.rs`).
    Admin,
}

/// classify
///
/// Maps a request path to its classification. `/admin` and everything under it is
/// Admin; the fixed allow-list (auth flow plus open site paths, and their
/// sub-paths) is Public; everything else requires a session.
pub fn classify(path: &str) -> RouteClass {
    if matches_prefix(path, "/admin") {
        return RouteClass::Admin;
    }
    if AUTH_FLOW_PATHS
        .iter()
        .chain(OPEN_SITE_PATHS)
        .any(|p| matches_prefix(path, p))
    {
        return RouteClass::Public;
    }
    RouteClass::Authenticated
}

/// Exact match or sub-path match: "/login" covers "/login" and "/login/reset",
/// never "/loginx".
fn matches_prefix(path: &str, prefix: &str) -> bool {
    path == prefix
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}

fn is_auth_entry(path: &str) -> bool {
    AUTH_ENTRY_PATHS.iter().any(|p| matches_prefix(path, p))
}

// --- Gate Decision ---

/// GateDecision
///
/// The three possible outcomes of the gate, exactly one per request.
#[derive(Debug, Clone, PartialEq)]
pub enum GateDecision {
    /// Forward the request unchanged (aside from refreshed session cookies).
    PassThrough,
    /// No valid session on a protected path. The location preserves the original
    /// path and query as a percent-encoded `next` parameter plus a reason message.
    RedirectToLogin { location: String },
    /// Valid session on an auth entry page: send the caller home instead of
    /// letting them re-enter the auth flow.
    RedirectToHome,
}

/// GateVerdict
///
/// The full result of one gate evaluation: the decision, the session it resolved
/// (threaded to handlers via request extensions on pass-through), and the cookie
/// writes the provider requested along the way. The verdict is applied to a
/// single outgoing response at the end — cookie writes are never lost to a
/// redirect constructed earlier in the evaluation.
#[derive(Debug, Clone)]
pub struct GateVerdict {
    pub decision: GateDecision,
    pub session: Option<Session>,
    pub refreshed_cookies: Vec<CookieSettings>,
}

/// login_redirect_location
///
/// Builds the `/login?message=...&next=...` target. `next` is the original path
/// plus its query string, percent-encoded, so the caller lands back on their
/// original destination after authenticating.
pub fn login_redirect_location(path: &str, query: Option<&str>) -> String {
    let next = match query {
        Some(q) if !q.is_empty() => format!("{path}?{q}"),
        _ => path.to_string(),
    };
    let params = form_urlencoded::Serializer::new(String::new())
        .append_pair("message", LOGIN_MESSAGE)
        .append_pair("next", &next)
        .finish();
    format!("{LOGIN_PATH}?{params}")
}

/// evaluate
///
/// The per-request decision function. Resolves the caller's identity from the
/// request cookies (failing closed on provider errors), classifies the path, and
/// emits exactly one decision:
///
/// - session + auth entry page      → RedirectToHome
/// - public path                    → PassThrough
/// - session + protected path       → PassThrough
/// - no session + protected path    → RedirectToLogin
///
/// Idempotence invariant: the login redirect target classifies as Public, so
/// applying the gate to its own output always passes through — no redirect loops.
pub async fn evaluate(
    path: &str,
    query: Option<&str>,
    cookies: &SessionCookies,
    provider: &dyn IdentityProvider,
) -> GateVerdict {
    // Fail closed: a provider failure is indistinguishable from "no session" for
    // this request; the next request re-evaluates from scratch.
    let lookup = match provider.get_session(cookies).await {
        Ok(lookup) => lookup,
        Err(err) => {
            tracing::warn!(%path, error = %err, "identity resolution failed; treating request as unauthenticated");
            SessionLookup::anonymous()
        }
    };

    let decision = match (&lookup.session, classify(path)) {
        (Some(_), RouteClass::Public) if is_auth_entry(path) => GateDecision::RedirectToHome,
        (_, RouteClass::Public) => GateDecision::PassThrough,
        (Some(_), _) => GateDecision::PassThrough,
        (None, _) => GateDecision::RedirectToLogin {
            location: login_redirect_location(path, query),
        },
    };

    GateVerdict {
        decision,
        session: lookup.session,
        refreshed_cookies: lookup.refreshed_cookies,
    }
}

// --- Axum Middleware ---

/// access_gate
///
/// The gate as a route layer: runs once per incoming request before any page
/// logic. Whatever branch is taken, refreshed session cookies are applied to the
/// one response that actually goes out — including redirect responses.
///
/// On pass-through the resolved session is stashed in the request extensions so
/// downstream handlers (and the `CurrentUser` extractor) reuse it instead of
/// calling the provider again.
pub async fn access_gate(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let query = request.uri().query().map(str::to_string);

    let cookies = SessionCookies::from_jar(&jar);
    let verdict = evaluate(&path, query.as_deref(), &cookies, state.identity.as_ref()).await;

    // Single response-side cookie builder: every branch below returns through it.
    let response_jar = apply_cookies(jar, verdict.refreshed_cookies);

    match verdict.decision {
        GateDecision::PassThrough => {
            if let Some(session) = verdict.session {
                request.extensions_mut().insert(session);
            }
            let response = next.run(request).await;
            (response_jar, response).into_response()
        }
        GateDecision::RedirectToLogin { location } => {
            tracing::debug!(%path, "no session on protected path; redirecting to login");
            (response_jar, Redirect::temporary(&location)).into_response()
        }
        GateDecision::RedirectToHome => {
            tracing::debug!(%path, "authenticated caller on auth entry page; redirecting home");
            (response_jar, Redirect::temporary(HOME_PATH)).into_response()
        }
    }
}
