use axum::{
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, request::Parts},
};
use axum_extra::extract::cookie::CookieJar;

use crate::identity::{IdentityState, Session, SessionCookies};

/// CurrentUser
///
/// The resolved identity of an authenticated request. This is the core output of
/// the extractor below; portal handlers use it to retrieve the caller's email
/// without re-implementing session resolution.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    /// The account email, as verified by the identity provider.
    pub email: String,
    /// Whether the provider has verified the email address.
    pub verified: bool,
}

impl From<&Session> for CurrentUser {
    fn from(session: &Session) -> Self {
        Self {
            email: session.claim.email.clone(),
            verified: session.claim.verified,
        }
    }
}

/// CurrentUser Extractor Implementation
///
/// Implements Axum's FromRequestParts trait, making CurrentUser usable as a
/// function argument in any authenticated handler. This cleanly separates
/// authentication (gate/extractor) from business logic (the handler).
///
/// Resolution order:
/// 1. Request extensions: the access gate stashes the session it resolved, so the
///    common path costs no extra provider call.
/// 2. Fallback: resolve the session cookies against the provider directly. This
///    covers handlers invoked outside the gated subtree (tests, internal calls).
///
/// Rejection: StatusCode::UNAUTHORIZED (401) on any failure — a provider error is
/// treated the same as a missing session (fail closed).
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
    IdentityState: FromRef<S>,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // 1. Session threaded through by the access gate.
        if let Some(session) = parts.extensions.get::<Session>() {
            return Ok(CurrentUser::from(session));
        }

        // 2. Fallback: resolve directly from the request cookies.
        let provider = IdentityState::from_ref(state);
        let jar = CookieJar::from_headers(&parts.headers);
        let cookies = SessionCookies::from_jar(&jar);

        let lookup = provider
            .get_session(&cookies)
            .await
            .map_err(|_| StatusCode::UNAUTHORIZED)?;

        match lookup.session {
            Some(session) => Ok(CurrentUser::from(&session)),
            None => Err(StatusCode::UNAUTHORIZED),
        }
    }
}
