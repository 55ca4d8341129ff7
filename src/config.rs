use std::collections::BTreeSet;
use std::env;

/// AppConfig
///
/// Holds the application's entire configuration state. This struct is designed to be
/// immutable once loaded, ensuring consistency across all threads and services
/// (identity provider client, business-API client, access gate). It is pulled into
/// the application state via FromRef, embodying the "immutable AppConfig" part of
/// the Unified State Pattern: there is no module-level mutable state anywhere in
/// the application, every request handler reads from this one object.
#[derive(Clone)]
pub struct AppConfig {
    // Runtime environment marker. Controls log formatting and local conveniences.
    pub env: Env,
    // Base URL of the external identity provider (session lookup, token refresh,
    // credential validation).
    pub auth_url: String,
    // Normalized base URL of the external content/business API. Optional: when the
    // variable is absent the dependent features degrade to empty/default results
    // instead of failing requests.
    pub api_base: Option<ApiBaseUrl>,
    // Process-wide admin allow-list, merged from two environment lists at startup
    // and immutable thereafter. Safe for concurrent reads without locking.
    pub admin_emails: AdminAllowList,
    // Optional Domain attribute stamped onto session cookies.
    pub cookie_domain: Option<String>,
}

/// Env
///
/// Defines the runtime context, used to switch between development conveniences
/// (pretty logs) and production-grade output (JSON logs for aggregators).
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

impl Default for AppConfig {
    /// default
    ///
    /// Provides a safe, non-panicking AppConfig instance primarily used for test setup.
    /// This allows tests to instantiate the configuration without touching process
    /// environment variables.
    fn default() -> Self {
        Self {
            env: Env::Local,
            auth_url: "http://localhost:9999".to_string(),
            api_base: None,
            admin_emails: AdminAllowList::from_lists("", ""),
            cookie_domain: None,
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// The canonical function for initializing the application configuration at startup.
    /// It reads all parameters from environment variables and implements the **fail-fast**
    /// principle.
    ///
    /// # Panics
    /// Panics if a critical environment variable required for the current runtime
    /// environment (especially Production) is not found. This prevents the application
    /// from starting with an incomplete or insecure configuration.
    pub fn load() -> Self {
        let env_str = env::var("APP_ENV").unwrap_or_else(|_| "local".to_string());
        let env = match env_str.as_str() {
            "production" => Env::Production,
            _ => Env::Local,
        };

        // Identity Provider Resolution
        // The production URL is mandatory and must be explicitly set. Locally we fall
        // back to the Dockerized provider used by the development stack.
        let auth_url = match env {
            Env::Production => {
                env::var("AUTH_URL").expect("FATAL: AUTH_URL must be set in production.")
            }
            _ => env::var("AUTH_URL").unwrap_or_else(|_| "http://localhost:9999".to_string()),
        };

        // The business API is optional in every environment: the marketing site and
        // the gate keep working without it, content lists simply come back empty.
        let api_base = env::var("API_BASE_URL").ok().map(|raw| ApiBaseUrl::parse(&raw));

        // Two comma-separated lists are merged into one de-duplicated allow-list.
        // The split mirrors how the deployment pipeline provides them: one list
        // managed by the agency, one per-environment override.
        let admin_emails = AdminAllowList::from_lists(
            &env::var("ADMIN_EMAILS").unwrap_or_default(),
            &env::var("PORTAL_ADMIN_EMAILS").unwrap_or_default(),
        );

        Self {
            env,
            auth_url,
            api_base,
            admin_emails,
            cookie_domain: env::var("COOKIE_DOMAIN").ok(),
        }
    }
}

/// AdminAllowList
///
/// The process-wide set of administrator email addresses. Entries are normalized
/// (trimmed, lower-cased) on the way in, so the membership test is case-insensitive
/// and whitespace-tolerant. The set is built once at startup and never mutated,
/// which makes it trivially safe to share across request handlers.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AdminAllowList {
    emails: BTreeSet<String>,
}

impl AdminAllowList {
    /// from_lists
    ///
    /// Builds the allow-list by merging two comma-separated email lists. Empty
    /// entries (consecutive commas, trailing commas, blank lists) are discarded.
    /// Merging is idempotent: feeding the merged output back in yields the same set.
    pub fn from_lists(primary: &str, secondary: &str) -> Self {
        let emails = primary
            .split(',')
            .chain(secondary.split(','))
            .map(normalize_email)
            .filter(|e| !e.is_empty())
            .collect();
        Self { emails }
    }

    /// contains
    ///
    /// Case-insensitive, whitespace-tolerant membership test. The candidate goes
    /// through the same normalization as the configured entries.
    pub fn contains(&self, email: &str) -> bool {
        self.emails.contains(&normalize_email(email))
    }

    pub fn is_empty(&self) -> bool {
        self.emails.is_empty()
    }

    pub fn len(&self) -> usize {
        self.emails.len()
    }

    /// as_csv
    ///
    /// Renders the set back to a comma-separated list, primarily so tests can
    /// verify that merging is idempotent.
    pub fn as_csv(&self) -> String {
        self.emails.iter().cloned().collect::<Vec<_>>().join(",")
    }
}

/// normalize_email
///
/// The single normalization rule applied to every email before storage or
/// comparison: surrounding whitespace removed, ASCII lower-cased.
fn normalize_email(raw: &str) -> String {
    raw.trim().to_ascii_lowercase()
}

/// ApiBaseUrl
///
/// Normalized base URL for the external content/business API. Deployments provide
/// the value inconsistently ("https://api.example.com", ".../api", with or without
/// a trailing slash), so normalization strips trailing slashes and one trailing
/// "/api" suffix; `endpoint` re-appends the canonical "/api" prefix to every path.
#[derive(Clone, Debug, PartialEq)]
pub struct ApiBaseUrl {
    base: String,
}

impl ApiBaseUrl {
    pub fn parse(raw: &str) -> Self {
        let mut base = raw.trim().trim_end_matches('/').to_string();
        if let Some(stripped) = base.strip_suffix("/api") {
            base = stripped.to_string();
        }
        // A suffixed "/api/" leaves another trailing slash behind after the strip.
        let base = base.trim_end_matches('/').to_string();
        Self { base }
    }

    /// endpoint
    ///
    /// Joins an API path ("/posts", "/admin/confirm") onto the normalized base.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/api{}", self.base, path)
    }
}
