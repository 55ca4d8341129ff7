use async_trait::async_trait;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// --- Cookie Names ---

/// Cookie carrying the short-lived access token issued by the identity provider.
pub const ACCESS_TOKEN_COOKIE: &str = "portal-access-token";
/// Cookie carrying the long-lived refresh token used to mint new access tokens.
pub const REFRESH_TOKEN_COOKIE: &str = "portal-refresh-token";

// Lifetimes mirror the provider's token policy: access tokens last an hour,
// refresh tokens a week.
const ACCESS_TOKEN_MAX_AGE_SECS: i64 = 60 * 60;
const REFRESH_TOKEN_MAX_AGE_SECS: i64 = 60 * 60 * 24 * 7;

// --- Errors ---

/// IdentityError
///
/// Failures crossing the identity-provider boundary. Every caller resolves these
/// locally (fail closed: no session, not admin); they never escape as a generic
/// failure page.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// The provider could not be reached or the connection failed mid-flight.
    #[error("identity provider request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// The provider answered with a payload we could not interpret.
    #[error("identity provider returned a malformed payload: {0}")]
    Malformed(String),
}

// --- Data Model ---

/// IdentityClaim
///
/// The minimal identity derived from a validated session or credential:
/// the account email and whether the provider has verified it. Claims are only
/// ever produced by a server-side provider lookup; client-supplied headers are
/// never promoted into one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IdentityClaim {
    pub email: String,
    pub verified: bool,
}

/// SessionTokens
///
/// The opaque token pair the provider issues at login and rotates on refresh.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: String,
}

/// Session
///
/// A resolved, provider-validated session: the token pair plus the identity it
/// proves. At most one session exists per request; it is created at login,
/// refreshed by the gate, and destroyed on sign-out or provider-side expiry.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub tokens: SessionTokens,
    pub claim: IdentityClaim,
}

/// SessionCookies
///
/// The raw cookie material extracted from an incoming request, before any
/// provider validation. Either token may be missing or stale.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionCookies {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

impl SessionCookies {
    /// Reads the two session cookies out of a parsed jar.
    pub fn from_jar(jar: &CookieJar) -> Self {
        Self {
            access_token: jar.get(ACCESS_TOKEN_COOKIE).map(|c| c.value().to_string()),
            refresh_token: jar.get(REFRESH_TOKEN_COOKIE).map(|c| c.value().to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none()
    }
}

/// CookieSettings
///
/// Explicit enumeration of every cookie attribute this application sets. This
/// replaces ad-hoc option bags: a cookie write is a value of this struct, applied
/// to the outgoing response exactly once.
#[derive(Debug, Clone, PartialEq)]
pub struct CookieSettings {
    pub name: String,
    pub value: String,
    pub domain: Option<String>,
    pub path: String,
    /// Lifetime in seconds; zero expires the cookie immediately (removal).
    pub max_age: i64,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: SameSite,
}

impl CookieSettings {
    /// session_pair
    ///
    /// The canonical pair of cookie writes for a (possibly refreshed) token set.
    /// HttpOnly + Lax keeps the tokens away from page scripts while still allowing
    /// the auth-callback navigation to carry them.
    pub fn session_pair(tokens: &SessionTokens, domain: Option<&str>) -> Vec<CookieSettings> {
        vec![
            Self::session_cookie(
                ACCESS_TOKEN_COOKIE,
                &tokens.access_token,
                ACCESS_TOKEN_MAX_AGE_SECS,
                domain,
            ),
            Self::session_cookie(
                REFRESH_TOKEN_COOKIE,
                &tokens.refresh_token,
                REFRESH_TOKEN_MAX_AGE_SECS,
                domain,
            ),
        ]
    }

    /// removal_pair
    ///
    /// Expires both session cookies. Used by sign-out and when the provider
    /// reports the session as gone.
    pub fn removal_pair(domain: Option<&str>) -> Vec<CookieSettings> {
        vec![
            Self::session_cookie(ACCESS_TOKEN_COOKIE, "", 0, domain),
            Self::session_cookie(REFRESH_TOKEN_COOKIE, "", 0, domain),
        ]
    }

    fn session_cookie(name: &str, value: &str, max_age: i64, domain: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
            domain: domain.map(str::to_string),
            path: "/".to_string(),
            max_age,
            secure: true,
            http_only: true,
            same_site: SameSite::Lax,
        }
    }

    /// into_cookie
    ///
    /// Materializes the settings into an `axum-extra` cookie ready to be added to
    /// a jar on the outgoing response.
    pub fn into_cookie(self) -> Cookie<'static> {
        let mut builder = Cookie::build((self.name, self.value))
            .path(self.path)
            .max_age(time::Duration::seconds(self.max_age))
            .secure(self.secure)
            .http_only(self.http_only)
            .same_site(self.same_site);
        if let Some(domain) = self.domain {
            builder = builder.domain(domain);
        }
        builder.build()
    }
}

/// apply_cookies
///
/// Folds a set of cookie writes onto a jar. The jar is the single response-side
/// cookie builder: whichever response the caller ultimately returns, these writes
/// ride along with it.
pub fn apply_cookies(jar: CookieJar, cookies: Vec<CookieSettings>) -> CookieJar {
    cookies
        .into_iter()
        .fold(jar, |jar, settings| jar.add(settings.into_cookie()))
}

// --- Provider Contract ---

/// SessionLookup
///
/// The result of resolving request cookies against the provider: the session (if
/// any) and the cookie writes the provider requested during validation (token
/// refresh). Refreshed cookies must be applied to the outgoing response even when
/// that response is a redirect.
#[derive(Debug, Clone, Default)]
pub struct SessionLookup {
    pub session: Option<Session>,
    pub refreshed_cookies: Vec<CookieSettings>,
}

impl SessionLookup {
    pub fn anonymous() -> Self {
        Self::default()
    }
}

/// IdentityProvider Trait
///
/// Defines the abstract contract with the external identity provider. This is the
/// same seam pattern used for every external collaborator in this codebase: the
/// handlers and the gate depend only on this trait, allowing the concrete HTTP
/// client to be swapped for an in-memory mock during testing.
///
/// **Send + Sync + async_trait** are required to make the trait object
/// (`Arc<dyn IdentityProvider>`) safely shareable across Axum's task boundaries.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolves the session carried by the request cookies. A stale access token
    /// with a usable refresh token yields a refreshed session plus the cookie
    /// writes that persist it. No cookies, or tokens the provider rejects, yield
    /// an anonymous lookup. Transport failures are returned as errors; callers
    /// fail closed.
    async fn get_session(&self, cookies: &SessionCookies) -> Result<SessionLookup, IdentityError>;

    /// Independently validates a bearer credential against the provider and
    /// returns the identity it proves. `Ok(None)` means the provider rejected the
    /// credential (malformed, expired, revoked).
    async fn exchange_credential(
        &self,
        token: &str,
    ) -> Result<Option<IdentityClaim>, IdentityError>;

    /// Exchanges an auth-callback code for a fresh session. `Ok(None)` means the
    /// provider refused the code.
    async fn exchange_code(&self, code: &str) -> Result<Option<Session>, IdentityError>;
}

/// IdentityState
///
/// The concrete type used to share the identity boundary across the application state.
pub type IdentityState = Arc<dyn IdentityProvider>;

// --- HTTP Implementation ---

/// HttpIdentityProvider
///
/// The production implementation, speaking the provider's REST surface over
/// `reqwest`. Endpoints used:
/// - `GET  {base}/auth/v1/user`   — validate an access token, fetch the account.
/// - `POST {base}/auth/v1/token`  — refresh-token and auth-code grants.
pub struct HttpIdentityProvider {
    http: reqwest::Client,
    base_url: String,
    cookie_domain: Option<String>,
}

/// Wire shape of the provider's user record. Only the fields the gate needs are
/// deserialized.
#[derive(Deserialize)]
struct ProviderUser {
    email: String,
    #[serde(default)]
    email_verified: bool,
}

/// Wire shape of the provider's token grant response (refresh and code exchange).
#[derive(Deserialize)]
struct ProviderGrant {
    access_token: String,
    refresh_token: String,
    user: ProviderUser,
}

impl HttpIdentityProvider {
    pub fn new(http: reqwest::Client, base_url: &str, cookie_domain: Option<String>) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            cookie_domain,
        }
    }

    /// Validates an access token by fetching the account it belongs to.
    /// 401/403 means the token is no longer good; other statuses are malformed
    /// provider behavior.
    async fn fetch_user(&self, access_token: &str) -> Result<Option<IdentityClaim>, IdentityError> {
        let response = self
            .http
            .get(format!("{}/auth/v1/user", self.base_url))
            .bearer_auth(access_token)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {
                let user: ProviderUser = response
                    .json()
                    .await
                    .map_err(|e| IdentityError::Malformed(e.to_string()))?;
                Ok(Some(IdentityClaim {
                    email: user.email,
                    verified: user.email_verified,
                }))
            }
            reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => Ok(None),
            status => Err(IdentityError::Malformed(format!(
                "unexpected status {status} from user endpoint"
            ))),
        }
    }

    /// Runs a token grant (refresh or code exchange) and maps the response into a
    /// session. `Ok(None)` when the provider refuses the grant.
    async fn token_grant(
        &self,
        grant_type: &str,
        body: serde_json::Value,
    ) -> Result<Option<Session>, IdentityError> {
        let response = self
            .http
            .post(format!(
                "{}/auth/v1/token?grant_type={grant_type}",
                self.base_url
            ))
            .json(&body)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED
            || response.status() == reqwest::StatusCode::BAD_REQUEST
        {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(IdentityError::Malformed(format!(
                "unexpected status {} from token endpoint",
                response.status()
            )));
        }

        let grant: ProviderGrant = response
            .json()
            .await
            .map_err(|e| IdentityError::Malformed(e.to_string()))?;

        Ok(Some(Session {
            tokens: SessionTokens {
                access_token: grant.access_token,
                refresh_token: grant.refresh_token,
            },
            claim: IdentityClaim {
                email: grant.user.email,
                verified: grant.user.email_verified,
            },
        }))
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    /// get_session
    ///
    /// Two-step resolution, bounded at two provider calls per request:
    /// 1. Validate the access token, if present.
    /// 2. On rejection (or a missing access token), spend the refresh token on a
    ///    new pair; the rotated tokens are handed back as cookie writes for the
    ///    outgoing response.
    async fn get_session(&self, cookies: &SessionCookies) -> Result<SessionLookup, IdentityError> {
        if cookies.is_empty() {
            return Ok(SessionLookup::anonymous());
        }

        if let Some(access_token) = &cookies.access_token {
            if let Some(claim) = self.fetch_user(access_token).await? {
                return Ok(SessionLookup {
                    session: Some(Session {
                        tokens: SessionTokens {
                            access_token: access_token.clone(),
                            refresh_token: cookies.refresh_token.clone().unwrap_or_default(),
                        },
                        claim,
                    }),
                    refreshed_cookies: Vec::new(),
                });
            }
        }

        // Access token missing or rejected: try the refresh token.
        let Some(refresh_token) = &cookies.refresh_token else {
            return Ok(SessionLookup::anonymous());
        };

        let refreshed = self
            .token_grant(
                "refresh_token",
                serde_json::json!({ "refresh_token": refresh_token }),
            )
            .await?;

        Ok(match refreshed {
            Some(session) => {
                let refreshed_cookies =
                    CookieSettings::session_pair(&session.tokens, self.cookie_domain.as_deref());
                SessionLookup {
                    session: Some(session),
                    refreshed_cookies,
                }
            }
            None => SessionLookup::anonymous(),
        })
    }

    async fn exchange_credential(
        &self,
        token: &str,
    ) -> Result<Option<IdentityClaim>, IdentityError> {
        self.fetch_user(token).await
    }

    async fn exchange_code(&self, code: &str) -> Result<Option<Session>, IdentityError> {
        self.token_grant("authorization_code", serde_json::json!({ "auth_code": code }))
            .await
    }
}
