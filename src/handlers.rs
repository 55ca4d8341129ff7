use crate::{
    AppState,
    auth::CurrentUser,
    content,
    gate::{LOGIN_PATH, PORTAL_PATH},
    identity::{CookieSettings, apply_cookies},
    models::{CaseStudy, ClientProject, Post, PricingPlan, Service, Testimonial},
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use url::form_urlencoded;

// --- Query Structs ---

/// LoginPageParams
///
/// Query parameters the access gate attaches to a login redirect: a
/// human-readable reason and the destination to return to after signing in.
#[derive(Deserialize, utoipa::IntoParams)]
pub struct LoginPageParams {
    pub message: Option<String>,
    pub next: Option<String>,
}

/// CallbackParams
///
/// Query parameters of the identity provider's redirect back to us after login.
#[derive(Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub next: Option<String>,
}

// --- Page Rendering Helpers ---

/// Minimal HTML shell shared by every server-rendered page. Styling and layout
/// live in the frontend assets; the server only emits structure.
fn render_page(title: &str, body: &str) -> Html<String> {
    Html(format!(
        "<!doctype html>\n<html lang=\"en\">\n<head><meta charset=\"utf-8\"><title>{} — Northlight Studio</title></head>\n<body>\n{}\n</body>\n</html>\n",
        escape_html(title),
        body
    ))
}

/// Escapes user-influenced text before it is interpolated into a page.
fn escape_html(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// safe_next
///
/// Validates a `next` destination before redirecting to it. Only absolute local
/// paths are accepted; anything else (external URLs, protocol-relative `//host`
/// forms) would be an open redirect and falls back to the portal.
fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(n) if n.starts_with('/') && !n.starts_with("//") => n,
        _ => PORTAL_PATH,
    }
}

fn login_failure_location(message: &str) -> String {
    let params = form_urlencoded::Serializer::new(String::new())
        .append_pair("message", message)
        .finish();
    format!("{LOGIN_PATH}?{params}")
}

// --- Marketing Pages ---

/// home
///
/// [Public Route] The marketing landing page: hero copy plus the static
/// testimonials catalog.
pub async fn home() -> Html<String> {
    let testimonials = content::testimonials()
        .iter()
        .map(|t| {
            format!(
                "<blockquote><p>{}</p><footer>{}, {}</footer></blockquote>",
                escape_html(&t.quote),
                escape_html(&t.author),
                escape_html(&t.company)
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    render_page(
        "Home",
        &format!(
            "<h1>Northlight Studio</h1>\n<p>Web development for small businesses.</p>\n<section id=\"testimonials\">\n{testimonials}\n</section>"
        ),
    )
}

/// services_page
///
/// [Public Route] Renders the static services catalog.
pub async fn services_page() -> Html<String> {
    let items = content::services()
        .iter()
        .map(|s| {
            format!(
                "<li><h2>{}</h2><p>{}</p></li>",
                escape_html(&s.name),
                escape_html(&s.description)
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    render_page("Services", &format!("<h1>Services</h1>\n<ul>\n{items}\n</ul>"))
}

/// pricing_page
///
/// [Public Route] Renders the static pricing table.
pub async fn pricing_page() -> Html<String> {
    let plans = content::pricing_plans()
        .iter()
        .map(|p| {
            let features = p
                .features
                .iter()
                .map(|f| format!("<li>{}</li>", escape_html(f)))
                .collect::<Vec<_>>()
                .join("");
            let class = if p.highlighted { " class=\"highlighted\"" } else { "" };
            format!(
                "<article{class}><h2>{}</h2><p>€{} / month</p><p>{}</p><ul>{features}</ul></article>",
                escape_html(&p.name),
                p.price_per_month,
                escape_html(&p.description),
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    render_page("Pricing", &format!("<h1>Pricing</h1>\n{plans}"))
}

/// blog_index
///
/// [Public Route] Lists blog posts from the external content API. An unreachable
/// or unconfigured API degrades to an empty list, never a failed page.
pub async fn blog_index(State(state): State<AppState>) -> Html<String> {
    let posts = state.api.posts().await.unwrap_or_else(|err| {
        tracing::warn!(error = %err, "blog listing unavailable; rendering empty index");
        Vec::new()
    });

    let items = posts
        .iter()
        .map(|p| {
            format!(
                "<li><a href=\"/blog/{}\">{}</a><p>{}</p></li>",
                escape_html(&p.slug),
                escape_html(&p.title),
                escape_html(&p.excerpt)
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    render_page("Blog", &format!("<h1>Blog</h1>\n<ul>\n{items}\n</ul>"))
}

/// blog_post
///
/// [Public Route] Renders a single post, 404 when the API has no such slug.
pub async fn blog_post(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Html<String>, StatusCode> {
    let post = state
        .api
        .post(&slug)
        .await
        .map_err(|err| {
            tracing::warn!(error = %err, %slug, "post fetch failed");
            StatusCode::NOT_FOUND
        })?
        .ok_or(StatusCode::NOT_FOUND)?;

    let body = post.body.as_deref().unwrap_or(&post.excerpt);
    Ok(render_page(
        &post.title,
        &format!(
            "<article><h1>{}</h1><p>by {}</p><div>{}</div></article>",
            escape_html(&post.title),
            escape_html(&post.author),
            escape_html(body)
        ),
    ))
}

/// case_studies_page
///
/// [Public Route] Lists case studies from the external content API, degrading to
/// an empty list when the API is absent.
pub async fn case_studies_page(State(state): State<AppState>) -> Html<String> {
    let studies = state.api.case_studies().await.unwrap_or_else(|err| {
        tracing::warn!(error = %err, "case studies unavailable; rendering empty list");
        Vec::new()
    });

    let items = studies
        .iter()
        .map(|c| {
            format!(
                "<article><h2>{}</h2><p>{}</p><p>{}</p><p><em>{}</em></p></article>",
                escape_html(&c.title),
                escape_html(&c.client),
                escape_html(&c.summary),
                escape_html(&c.outcome)
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    render_page("Case Studies", &format!("<h1>Case Studies</h1>\n{items}"))
}

// --- Content API (consumed by the frontend) ---

/// list_posts
///
/// [Public Route] JSON listing of blog posts, proxied from the content API.
#[utoipa::path(
    get,
    path = "/api/posts",
    responses((status = 200, description = "Published posts", body = [Post]))
)]
pub async fn list_posts(State(state): State<AppState>) -> Json<Vec<Post>> {
    Json(state.api.posts().await.unwrap_or_default())
}

/// get_post
///
/// [Public Route] JSON detail of a single post.
#[utoipa::path(
    get,
    path = "/api/posts/{slug}",
    params(("slug" = String, Path, description = "Post slug")),
    responses((status = 200, description = "Found", body = Post))
)]
pub async fn get_post(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Post>, StatusCode> {
    match state.api.post(&slug).await {
        Ok(Some(post)) => Ok(Json(post)),
        Ok(None) => Err(StatusCode::NOT_FOUND),
        Err(err) => {
            tracing::warn!(error = %err, %slug, "post fetch failed");
            Err(StatusCode::NOT_FOUND)
        }
    }
}

/// list_case_studies
///
/// [Public Route] JSON listing of case studies, proxied from the content API.
#[utoipa::path(
    get,
    path = "/api/case-studies",
    responses((status = 200, description = "Case studies", body = [CaseStudy]))
)]
pub async fn list_case_studies(State(state): State<AppState>) -> Json<Vec<CaseStudy>> {
    Json(state.api.case_studies().await.unwrap_or_default())
}

/// list_pricing
///
/// [Public Route] JSON pricing table (static catalog).
#[utoipa::path(
    get,
    path = "/api/pricing",
    responses((status = 200, description = "Pricing plans", body = [PricingPlan]))
)]
pub async fn list_pricing() -> Json<Vec<PricingPlan>> {
    Json(content::pricing_plans())
}

/// list_testimonials
///
/// [Public Route] JSON testimonials (static catalog).
#[utoipa::path(
    get,
    path = "/api/testimonials",
    responses((status = 200, description = "Testimonials", body = [Testimonial]))
)]
pub async fn list_testimonials() -> Json<Vec<Testimonial>> {
    Json(content::testimonials())
}

/// list_services
///
/// [Public Route] JSON services catalog (static catalog).
#[utoipa::path(
    get,
    path = "/api/services",
    responses((status = 200, description = "Services", body = [Service]))
)]
pub async fn list_services() -> Json<Vec<Service>> {
    Json(content::services())
}

// --- Auth Entry Pages & Session Lifecycle ---

/// login_page
///
/// [Gated Route, Public classification] Renders the sign-in page. The gate
/// guarantees an authenticated caller never sees this page (redirect-to-home);
/// the `message` and `next` parameters come from a gate redirect and are echoed
/// into the page escaped.
pub async fn login_page(Query(params): Query<LoginPageParams>) -> Html<String> {
    let notice = params
        .message
        .as_deref()
        .map(|m| format!("<p class=\"notice\">{}</p>", escape_html(m)))
        .unwrap_or_default();
    let next = escape_html(safe_next(params.next.as_deref()));

    render_page(
        "Sign in",
        &format!(
            "<h1>Sign in</h1>\n{notice}\n<form method=\"get\" action=\"/auth/callback\">\n<input type=\"hidden\" name=\"next\" value=\"{next}\">\n<button type=\"submit\">Continue with Northlight ID</button>\n</form>"
        ),
    )
}

/// signup_page
///
/// [Gated Route, Public classification] Renders the account-creation page.
/// Account creation itself happens at the identity provider.
pub async fn signup_page() -> Html<String> {
    render_page(
        "Sign up",
        "<h1>Create an account</h1>\n<form method=\"get\" action=\"/auth/callback\">\n<button type=\"submit\">Sign up with Northlight ID</button>\n</form>",
    )
}

/// auth_callback
///
/// [Gated Route, Public classification] The identity provider redirects here
/// after login with a one-time code. The code is exchanged for a session, the
/// session cookies are written onto the redirect response, and the caller is sent
/// to their original destination.
///
/// The allow-list match here is a convenience shortcut that lands admins on the
/// dashboard directly; the canonical admin decision is always the server-side
/// re-validation performed by `admin_guard` on the next navigation.
pub async fn auth_callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
    jar: CookieJar,
) -> Response {
    let Some(code) = params.code.as_deref().filter(|c| !c.is_empty()) else {
        return Redirect::temporary(&login_failure_location(
            "Sign-in was cancelled. Please try again.",
        ))
        .into_response();
    };

    match state.identity.exchange_code(code).await {
        Ok(Some(session)) => {
            let cookies =
                CookieSettings::session_pair(&session.tokens, state.config.cookie_domain.as_deref());
            let jar = apply_cookies(jar, cookies);

            // Convenience shortcut only; the admin guard re-validates on arrival.
            // Unverified emails never take it, mirroring the guard's own rule.
            let target = if session.claim.verified
                && state.config.admin_emails.contains(&session.claim.email)
            {
                "/admin"
            } else {
                safe_next(params.next.as_deref())
            };
            (jar, Redirect::temporary(target)).into_response()
        }
        Ok(None) => Redirect::temporary(&login_failure_location(
            "Sign-in failed. Please try again.",
        ))
        .into_response(),
        Err(err) => {
            // Fail closed: a provider failure means no session was established.
            tracing::warn!(error = %err, "code exchange failed");
            Redirect::temporary(&login_failure_location(
                "Sign-in is temporarily unavailable. Please try again.",
            ))
            .into_response()
        }
    }
}

/// signout
///
/// [Gated Route] Destroys the session by expiring both session cookies on the
/// redirect response. Provider-side revocation is the provider's concern; from
/// this application's perspective the session ends here.
pub async fn signout(State(state): State<AppState>, jar: CookieJar) -> Response {
    let jar = apply_cookies(
        jar,
        CookieSettings::removal_pair(state.config.cookie_domain.as_deref()),
    );
    (jar, Redirect::temporary("/")).into_response()
}

// --- Client Portal ---

/// portal_dashboard
///
/// [Authenticated Route] The client portal landing page. The caller's identity is
/// resolved securely via the `CurrentUser` extractor.
pub async fn portal_dashboard(user: CurrentUser) -> Html<String> {
    render_page(
        "Portal",
        &format!(
            "<h1>Client Portal</h1>\n<p>Signed in as {}</p>\n<p><a href=\"/portal/api/projects\">Your projects</a> · <a href=\"/signout\">Sign out</a></p>",
            escape_html(&user.email)
        ),
    )
}

/// portal_projects
///
/// [Authenticated Route] Proxies the caller's project list from the business API.
/// The email used for the lookup comes from the validated session, never from
/// request parameters.
#[utoipa::path(
    get,
    path = "/portal/api/projects",
    responses((status = 200, description = "Projects for the signed-in client", body = [ClientProject]))
)]
pub async fn portal_projects(
    user: CurrentUser,
    State(state): State<AppState>,
) -> Json<Vec<ClientProject>> {
    let projects = state
        .api
        .client_projects(&user.email)
        .await
        .unwrap_or_else(|err| {
            tracing::warn!(error = %err, "project listing unavailable; returning empty list");
            Vec::new()
        });
    Json(projects)
}

// --- Admin Dashboard ---

/// admin_dashboard
///
/// [Admin Route] The privileged dashboard page. Reaching this handler means the
/// request already passed both the access gate and the server-side admin
/// re-check in `admin_guard`.
pub async fn admin_dashboard(user: CurrentUser) -> Html<String> {
    render_page(
        "Admin",
        &format!(
            "<h1>Admin Dashboard</h1>\n<p>Signed in as {}</p>\n<p><a href=\"/signout\">Sign out</a></p>",
            escape_html(&user.email)
        ),
    )
}
