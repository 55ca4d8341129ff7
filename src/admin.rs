use axum::{
    Json,
    extract::{OriginalUri, Request, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;

use crate::{
    AppState,
    config::AdminAllowList,
    content::BusinessApi,
    gate::{HOME_PATH, login_redirect_location},
    identity::{IdentityClaim, IdentityError, IdentityProvider, Session, SessionCookies},
    models::AdminCheckResponse,
};

// --- Credential Verification ---

/// AdminAccess
///
/// The per-navigation state machine for a privileged page load. Evaluation always
/// starts in the implicit `checking` state and resolves to exactly one terminal
/// variant; there is no transition back without a fresh navigation.
#[derive(Debug, Clone, PartialEq)]
pub enum AdminAccess {
    /// The credential proved a verified admin identity. Privileged content renders.
    Authorized(IdentityClaim),
    /// Everything else. The denial reason picks the redirect target.
    Unauthorized(Denial),
}

/// Denial
///
/// Why a privileged navigation was refused.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Denial {
    /// No session at all: the caller is sent to the login page.
    NoSession,
    /// A session exists but does not prove an admin: the caller is sent home.
    NotAdmin,
}

/// verify_admin_credential
///
/// The canonical admin decision. The bearer credential is re-validated against
/// the identity provider — the client-supplied session is never trusted alone —
/// and the verified email is tested against the process-wide allow-list. Only
/// when the local test fails is the business API consulted as a secondary
/// confirmation.
///
/// Return values:
/// - `Ok(Some(true))`  — verified admin.
/// - `Ok(Some(false))` — valid credential, but not an admin (unverified email,
///   not allow-listed, remote confirmation declined or unavailable).
/// - `Ok(None)`        — the provider rejected the credential outright.
/// - `Err(_)`          — the provider could not be reached.
pub async fn verify_admin_credential(
    token: &str,
    allow_list: &AdminAllowList,
    provider: &dyn IdentityProvider,
    api: &dyn BusinessApi,
) -> Result<Option<bool>, IdentityError> {
    let Some(claim) = provider.exchange_credential(token).await? else {
        return Ok(None);
    };
    Ok(Some(claim_is_admin(&claim, allow_list, api).await))
}

/// claim_is_admin
///
/// The authorization half of the re-check, applied to an already-validated claim:
/// verified email, allow-list membership, then the business API as a secondary
/// confirmation when the local test fails.
async fn claim_is_admin(
    claim: &IdentityClaim,
    allow_list: &AdminAllowList,
    api: &dyn BusinessApi,
) -> bool {
    // An unverified email never authorizes privileged access, regardless of any
    // allow-list or remote match.
    if !claim.verified {
        return false;
    }

    if allow_list.contains(&claim.email) {
        return true;
    }

    // Secondary confirmation, fail closed: an unreachable business API reads as
    // "not admin" for this request only.
    match api.confirm_admin(&claim.email).await {
        Ok(confirmed) => confirmed,
        Err(err) => {
            tracing::warn!(error = %err, "admin confirmation via business API failed");
            false
        }
    }
}

/// resolve_admin_access
///
/// Drives the `checking → {authorized, unauthorized}` transition for a privileged
/// page load. The session's current access token is the bearer credential; its
/// absence means no session at all. Every failure path lands on a Denial;
/// "unknown" is never treated as permissive.
pub async fn resolve_admin_access(
    bearer: Option<&str>,
    allow_list: &AdminAllowList,
    provider: &dyn IdentityProvider,
    api: &dyn BusinessApi,
) -> AdminAccess {
    let Some(token) = bearer else {
        return AdminAccess::Unauthorized(Denial::NoSession);
    };

    let claim = match provider.exchange_credential(token).await {
        Ok(Some(claim)) => claim,
        // Rejected credential: the session cookie is stale, treat as signed out.
        Ok(None) => return AdminAccess::Unauthorized(Denial::NoSession),
        Err(err) => {
            tracing::warn!(error = %err, "admin credential validation failed; denying access");
            return AdminAccess::Unauthorized(Denial::NotAdmin);
        }
    };

    if claim_is_admin(&claim, allow_list, api).await {
        AdminAccess::Authorized(claim)
    } else {
        AdminAccess::Unauthorized(Denial::NotAdmin)
    }
}

// --- Axum Integration ---

/// admin_guard
///
/// Route layer for the privileged page subtree. Runs *after* the access gate, but
/// deliberately does not trust it: the credential is re-validated server-side on
/// every admin navigation (the callback-time allow-list shortcut is a convenience
/// only, never the canonical decision).
///
/// The credential comes from the session the gate stashed in the request
/// extensions. When the gate rotated an expired access token, that session
/// carries the rotated token while the incoming cookie still holds the old one,
/// so the extension must win. The cookie jar is only a fallback for a guard
/// invoked without the gate in front of it.
///
/// Redirects are built from the `OriginalUri`: inside the nested subtree the
/// request URI has the mount prefix stripped, and a `next` parameter without the
/// prefix would land the caller on the wrong page after login.
pub async fn admin_guard(
    State(state): State<AppState>,
    OriginalUri(original_uri): OriginalUri,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Response {
    let bearer = request
        .extensions()
        .get::<Session>()
        .map(|session| session.tokens.access_token.clone())
        .or_else(|| SessionCookies::from_jar(&jar).access_token);

    let access = resolve_admin_access(
        bearer.as_deref(),
        &state.config.admin_emails,
        state.identity.as_ref(),
        state.api.as_ref(),
    )
    .await;

    match access {
        AdminAccess::Authorized(claim) => {
            tracing::debug!(email = %claim.email, "admin navigation authorized");
            next.run(request).await
        }
        AdminAccess::Unauthorized(Denial::NoSession) => {
            let location = login_redirect_location(original_uri.path(), original_uri.query());
            Redirect::temporary(&location).into_response()
        }
        AdminAccess::Unauthorized(Denial::NotAdmin) => {
            Redirect::temporary(HOME_PATH).into_response()
        }
    }
}

/// no_store_headers
///
/// Cache-disabling headers attached to every admin-check response. The admin
/// decision must never be served from an intermediary or browser cache.
fn no_store_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-store, no-cache, must-revalidate"),
    );
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers
}

/// bearer_token
///
/// Extracts the credential from `Authorization: Bearer <token>`. Missing header,
/// non-UTF-8 value, or a different scheme all read as "no credential".
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .filter(|token| !token.is_empty())
}

/// admin_check
///
/// [Credential Route] The admin-check endpoint consumed by the privileged UI.
/// Contract: `{ "isAdmin": bool }`, always with cache-disabling headers.
/// 401 on a missing or rejected credential, 500 when the provider is unreachable;
/// both carry `isAdmin: false` so the caller needs no special error handling.
#[utoipa::path(
    get,
    path = "/admin/check",
    responses(
        (status = 200, description = "Credential validated", body = AdminCheckResponse),
        (status = 401, description = "Missing or invalid credential", body = AdminCheckResponse),
        (status = 500, description = "Identity provider unreachable", body = AdminCheckResponse),
    ),
    security(("bearer" = []))
)]
pub async fn admin_check(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let respond = |status: StatusCode, is_admin: bool| {
        (status, no_store_headers(), Json(AdminCheckResponse { is_admin })).into_response()
    };

    let Some(token) = bearer_token(&headers) else {
        return respond(StatusCode::UNAUTHORIZED, false);
    };

    match verify_admin_credential(
        token,
        &state.config.admin_emails,
        state.identity.as_ref(),
        state.api.as_ref(),
    )
    .await
    {
        Ok(Some(is_admin)) => respond(StatusCode::OK, is_admin),
        Ok(None) => respond(StatusCode::UNAUTHORIZED, false),
        Err(err) => {
            tracing::error!(error = %err, "admin check could not reach the identity provider");
            respond(StatusCode::INTERNAL_SERVER_ERROR, false)
        }
    }
}
