use agency_portal::{
    AppState, create_router,
    config::{AdminAllowList, AppConfig},
    content::{ApiError, BusinessApi},
    identity::{
        CookieSettings, IdentityClaim, IdentityError, IdentityProvider, Session, SessionCookies,
        SessionLookup, SessionTokens,
    },
    models::{CaseStudy, ClientProject, Post},
};
use async_trait::async_trait;
use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use chrono::Utc;
use std::{collections::HashMap, sync::Arc};
use tower::util::ServiceExt;
use url::form_urlencoded;

// --- Mock Identity Provider ---

#[derive(Default)]
struct MockIdentity {
    // access token -> session it resolves to
    sessions: HashMap<String, Session>,
    // refresh token -> rotated session handed out when the access token is stale
    refresh_sessions: HashMap<String, Session>,
    // cookie writes requested alongside every successful access-token lookup
    refreshed: Vec<CookieSettings>,
    // access tokens the provider has revoked since they were issued
    revoked: Vec<String>,
}

#[async_trait]
impl IdentityProvider for MockIdentity {
    async fn get_session(&self, cookies: &SessionCookies) -> Result<SessionLookup, IdentityError> {
        if let Some(session) = cookies
            .access_token
            .as_deref()
            .and_then(|token| self.sessions.get(token))
        {
            return Ok(SessionLookup {
                session: Some(session.clone()),
                refreshed_cookies: self.refreshed.clone(),
            });
        }

        // Stale access token: fall back to the refresh token and rotate.
        if let Some(session) = cookies
            .refresh_token
            .as_deref()
            .and_then(|token| self.refresh_sessions.get(token))
        {
            return Ok(SessionLookup {
                session: Some(session.clone()),
                refreshed_cookies: CookieSettings::session_pair(&session.tokens, None),
            });
        }

        Ok(SessionLookup::anonymous())
    }

    async fn exchange_credential(
        &self,
        token: &str,
    ) -> Result<Option<IdentityClaim>, IdentityError> {
        if self.revoked.iter().any(|t| t == token) {
            return Ok(None);
        }
        Ok(self.sessions.get(token).map(|s| s.claim.clone()))
    }

    async fn exchange_code(&self, code: &str) -> Result<Option<Session>, IdentityError> {
        match code {
            "valid-code" => Ok(Some(session("fresh-token", "new@example.com"))),
            "admin-code" => Ok(Some(session("fresh-admin-token", "admin@example.com"))),
            "unverified-admin-code" => {
                let mut unverified = session("fresh-admin-token", "admin@example.com");
                unverified.claim.verified = false;
                Ok(Some(unverified))
            }
            _ => Ok(None),
        }
    }
}

// --- Mock Business API ---

#[derive(Default)]
struct MockApi {
    projects: Vec<ClientProject>,
    confirm: bool,
}

#[async_trait]
impl BusinessApi for MockApi {
    async fn posts(&self) -> Result<Vec<Post>, ApiError> {
        Ok(vec![])
    }
    async fn post(&self, _slug: &str) -> Result<Option<Post>, ApiError> {
        Ok(None)
    }
    async fn case_studies(&self) -> Result<Vec<CaseStudy>, ApiError> {
        Ok(vec![])
    }
    async fn client_projects(&self, _email: &str) -> Result<Vec<ClientProject>, ApiError> {
        Ok(self.projects.clone())
    }
    async fn confirm_admin(&self, _email: &str) -> Result<bool, ApiError> {
        Ok(self.confirm)
    }
}

// --- Helper Functions ---

const CLIENT_TOKEN: &str = "client-token";
const ADMIN_TOKEN: &str = "admin-token";

fn session(token: &str, email: &str) -> Session {
    Session {
        tokens: SessionTokens {
            access_token: token.to_string(),
            refresh_token: format!("{token}-refresh"),
        },
        claim: IdentityClaim {
            email: email.to_string(),
            verified: true,
        },
    }
}

fn test_state(identity: MockIdentity, api: MockApi) -> AppState {
    let mut config = AppConfig::default();
    config.admin_emails = AdminAllowList::from_lists("admin@example.com", "");
    AppState {
        identity: Arc::new(identity),
        api: Arc::new(api),
        config,
    }
}

fn default_identity() -> MockIdentity {
    let mut sessions = HashMap::new();
    sessions.insert(CLIENT_TOKEN.to_string(), session(CLIENT_TOKEN, "client@example.com"));
    sessions.insert(ADMIN_TOKEN.to_string(), session(ADMIN_TOKEN, "admin@example.com"));
    MockIdentity {
        sessions,
        ..Default::default()
    }
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn get_authed(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(
            header::COOKIE,
            format!("portal-access-token={token}; portal-refresh-token={token}-refresh"),
        )
        .body(Body::empty())
        .unwrap()
}

fn location(response: &axum::response::Response) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .expect("redirect must carry a Location header")
        .to_str()
        .unwrap()
        .to_string()
}

fn decoded_next(location: &str) -> Option<String> {
    let (_, query) = location.split_once('?')?;
    form_urlencoded::parse(query.as_bytes())
        .find(|(k, _)| k == "next")
        .map(|(_, v)| v.into_owned())
}

// --- Public Surface ---

#[tokio::test]
async fn test_health_is_open_to_everyone() {
    let app = create_router(test_state(default_identity(), MockApi::default()));
    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_marketing_pages_render_without_a_session() {
    let app = create_router(test_state(default_identity(), MockApi::default()));
    for uri in ["/", "/services", "/pricing", "/blog", "/case-studies"] {
        let response = app.clone().oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "uri: {uri}");
    }
}

#[tokio::test]
async fn test_content_api_degrades_to_empty_lists() {
    // MockApi returns empty lists, standing in for an unconfigured API base.
    let app = create_router(test_state(default_identity(), MockApi::default()));
    let response = app.oneshot(get("/api/posts")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"[]");
}

// --- Access Gate over the Portal ---

#[tokio::test]
async fn test_anonymous_portal_request_redirects_to_login() {
    let app = create_router(test_state(default_identity(), MockApi::default()));
    let response = app.oneshot(get("/portal?tab=invoices")).await.unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    let location = location(&response);
    assert!(location.starts_with("/login?"), "location: {location}");
    assert_eq!(decoded_next(&location).as_deref(), Some("/portal?tab=invoices"));
}

#[tokio::test]
async fn test_login_redirect_target_does_not_loop() {
    let app = create_router(test_state(default_identity(), MockApi::default()));
    let response = app.clone().oneshot(get("/portal")).await.unwrap();
    let location = location(&response);

    // Follow the redirect the gate produced: the login page renders, no redirect.
    let second = app.oneshot(get(&location)).await.unwrap();
    assert_eq!(second.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_authenticated_login_request_redirects_home() {
    let app = create_router(test_state(default_identity(), MockApi::default()));
    for uri in ["/login", "/signup"] {
        let response = app
            .clone()
            .oneshot(get_authed(uri, CLIENT_TOKEN))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT, "uri: {uri}");
        // Straight home, no query string.
        assert_eq!(location(&response), "/");
    }
}

#[tokio::test]
async fn test_authenticated_portal_request_passes_through() {
    let app = create_router(test_state(default_identity(), MockApi::default()));
    let response = app
        .oneshot(get_authed("/portal", CLIENT_TOKEN))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let page = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(page.contains("client@example.com"));
}

#[tokio::test]
async fn test_portal_projects_are_proxied_for_the_session_email() {
    let api = MockApi {
        projects: vec![ClientProject {
            id: "p-1".to_string(),
            name: "Relaunch".to_string(),
            status: "in-progress".to_string(),
            updated_at: Utc::now(),
        }],
        confirm: false,
    };
    let app = create_router(test_state(default_identity(), api));
    let response = app
        .oneshot(get_authed("/portal/api/projects", CLIENT_TOKEN))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let projects: Vec<ClientProject> = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0].name, "Relaunch");
}

#[tokio::test]
async fn test_refreshed_cookies_ride_on_the_redirect_response() {
    // The provider rotates tokens while validating the session of a caller who
    // is being redirected away from /login; the Set-Cookie writes must be on
    // that same redirect response.
    let mut identity = default_identity();
    identity.refreshed =
        CookieSettings::session_pair(&session("rotated", "client@example.com").tokens, None);
    let app = create_router(test_state(identity, MockApi::default()));

    let response = app
        .oneshot(get_authed("/login", CLIENT_TOKEN))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);

    let set_cookies: Vec<_> = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect();
    assert!(
        set_cookies
            .iter()
            .any(|c| c.starts_with("portal-access-token=rotated")),
        "set-cookie headers: {set_cookies:?}"
    );
}

#[tokio::test]
async fn test_session_cookies_refresh_on_marketing_pages_too() {
    // The open site surface sits behind the same gate as the portal, so a
    // token rotation during a blog visit still reaches the browser.
    let mut identity = default_identity();
    identity.refreshed =
        CookieSettings::session_pair(&session("rotated", "client@example.com").tokens, None);
    let app = create_router(test_state(identity, MockApi::default()));

    let response = app.oneshot(get_authed("/blog", CLIENT_TOKEN)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let set_cookies: Vec<_> = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect();
    assert!(
        set_cookies
            .iter()
            .any(|c| c.starts_with("portal-access-token=rotated")),
        "set-cookie headers: {set_cookies:?}"
    );
}

// --- Auth Lifecycle ---

#[tokio::test]
async fn test_callback_establishes_a_session_and_honors_next() {
    let app = create_router(test_state(default_identity(), MockApi::default()));
    let response = app
        .oneshot(get("/auth/callback?code=valid-code&next=/portal"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), "/portal");
    let set_cookies: Vec<_> = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect();
    assert!(
        set_cookies
            .iter()
            .any(|c| c.starts_with("portal-access-token=fresh-token"))
    );
}

#[tokio::test]
async fn test_callback_routes_verified_admins_to_the_dashboard() {
    let app = create_router(test_state(default_identity(), MockApi::default()));
    let response = app
        .oneshot(get("/auth/callback?code=admin-code&next=/portal"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), "/admin");
}

#[tokio::test]
async fn test_callback_shortcut_skips_unverified_allow_listed_emails() {
    // An allow-listed email with an unverified claim follows the ordinary
    // `next` path instead of the admin shortcut.
    let app = create_router(test_state(default_identity(), MockApi::default()));
    let response = app
        .oneshot(get("/auth/callback?code=unverified-admin-code&next=/portal"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), "/portal");
}

#[tokio::test]
async fn test_callback_rejects_external_next_targets() {
    let app = create_router(test_state(default_identity(), MockApi::default()));
    let response = app
        .oneshot(get("/auth/callback?code=valid-code&next=//evil.example.com"))
        .await
        .unwrap();
    // Protocol-relative targets fall back to the portal.
    assert_eq!(location(&response), "/portal");
}

#[tokio::test]
async fn test_callback_without_code_returns_to_login() {
    let app = create_router(test_state(default_identity(), MockApi::default()));
    let response = app.oneshot(get("/auth/callback")).await.unwrap();
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert!(location(&response).starts_with("/login?"));
}

#[tokio::test]
async fn test_signout_expires_both_session_cookies() {
    let app = create_router(test_state(default_identity(), MockApi::default()));
    let response = app
        .oneshot(get_authed("/signout", CLIENT_TOKEN))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), "/");
    let set_cookies: Vec<_> = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect();
    assert!(set_cookies.iter().any(|c| c.starts_with("portal-access-token=;")));
    assert!(set_cookies.iter().any(|c| c.starts_with("portal-refresh-token=;")));
}

// --- Admin Subtree ---

#[tokio::test]
async fn test_anonymous_admin_request_redirects_to_login() {
    let app = create_router(test_state(default_identity(), MockApi::default()));
    let response = app.oneshot(get("/admin")).await.unwrap();
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    let location = location(&response);
    assert!(location.starts_with("/login?"), "location: {location}");
    assert_eq!(decoded_next(&location).as_deref(), Some("/admin"));
}

#[tokio::test]
async fn test_admin_reaches_the_dashboard_through_a_token_rotation() {
    // The access token cookie has expired; the refresh token still resolves,
    // so the gate rotates the pair. The guard must validate the rotated token,
    // not the stale one still sitting in the request cookie.
    let mut identity = default_identity();
    identity.refresh_sessions.insert(
        "expired-admin-refresh".to_string(),
        session(ADMIN_TOKEN, "admin@example.com"),
    );
    let app = create_router(test_state(identity, MockApi::default()));

    let response = app
        .oneshot(get_authed("/admin", "expired-admin"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // The rotated pair rides on the dashboard response.
    let set_cookies: Vec<_> = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect();
    assert!(
        set_cookies
            .iter()
            .any(|c| c.starts_with(&format!("portal-access-token={ADMIN_TOKEN}"))),
        "set-cookie headers: {set_cookies:?}"
    );
}

#[tokio::test]
async fn test_admin_login_redirect_preserves_the_full_path() {
    // The session resolves at the gate but the provider revokes the token before
    // the guard re-validates it. The resulting login redirect must carry the
    // full admin path, not the path with the mount prefix stripped.
    let mut identity = default_identity();
    identity.revoked.push(ADMIN_TOKEN.to_string());
    let app = create_router(test_state(identity, MockApi::default()));

    let response = app
        .oneshot(get_authed("/admin?tab=users", ADMIN_TOKEN))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    let location = location(&response);
    assert!(location.starts_with("/login?"), "location: {location}");
    assert_eq!(decoded_next(&location).as_deref(), Some("/admin?tab=users"));
}

#[tokio::test]
async fn test_authenticated_non_admin_is_sent_home() {
    let app = create_router(test_state(default_identity(), MockApi::default()));
    let response = app
        .oneshot(get_authed("/admin", CLIENT_TOKEN))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), "/");
}

#[tokio::test]
async fn test_allow_listed_admin_reaches_the_dashboard() {
    let app = create_router(test_state(default_identity(), MockApi::default()));
    let response = app
        .oneshot(get_authed("/admin", ADMIN_TOKEN))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let page = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(page.contains("admin@example.com"));
}

#[tokio::test]
async fn test_admin_check_endpoint_skips_the_cookie_gate() {
    // No cookies at all: the credential contract answers 401 JSON, it does not
    // redirect to the login page.
    let app = create_router(test_state(default_identity(), MockApi::default()));
    let response = app.oneshot(get("/admin/check")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["isAdmin"], false);
}

#[tokio::test]
async fn test_admin_check_accepts_a_bearer_credential() {
    let app = create_router(test_state(default_identity(), MockApi::default()));
    let request = Request::builder()
        .uri("/admin/check")
        .header(header::AUTHORIZATION, format!("Bearer {ADMIN_TOKEN}"))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["isAdmin"], true);
}
