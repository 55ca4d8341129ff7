use async_trait::async_trait;
use std::sync::Arc;

use crate::{
    config::ApiBaseUrl,
    models::{CaseStudy, ClientProject, Post, PricingPlan, Service, Testimonial},
};

// --- Errors ---

/// ApiError
///
/// Failures crossing the business-API boundary. Callers degrade: content lists
/// come back empty, admin confirmation reads as "not admin".
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("business API request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("business API returned a malformed payload: {0}")]
    Malformed(String),
}

// --- Contract ---

/// BusinessApi Trait
///
/// Defines the abstract contract for the external content/business API. Handlers
/// depend only on this trait; the concrete HTTP client is swapped for a mock
/// during testing, the same seam pattern used for the identity provider.
#[async_trait]
pub trait BusinessApi: Send + Sync {
    /// Lists published blog posts, newest first.
    async fn posts(&self) -> Result<Vec<Post>, ApiError>;

    /// Fetches a single post by slug. `Ok(None)` when the API has no such post.
    async fn post(&self, slug: &str) -> Result<Option<Post>, ApiError>;

    /// Lists published case studies.
    async fn case_studies(&self) -> Result<Vec<CaseStudy>, ApiError>;

    /// Lists the projects the business API associates with a client email.
    async fn client_projects(&self, email: &str) -> Result<Vec<ClientProject>, ApiError>;

    /// Secondary admin confirmation, consulted only when the local allow-list
    /// test fails. `Ok(false)` when the API does not recognize the email as an
    /// administrator.
    async fn confirm_admin(&self, email: &str) -> Result<bool, ApiError>;
}

/// ApiState
///
/// The concrete type used to share the business-API boundary across the application state.
pub type ApiState = Arc<dyn BusinessApi>;

// --- HTTP Implementation ---

/// HttpBusinessApi
///
/// The production client over `reqwest`. Constructed with the normalized base URL
/// from configuration; when no base URL is configured every operation degrades to
/// an empty/default result instead of failing the request (the marketing site and
/// the gate keep working without the API).
pub struct HttpBusinessApi {
    http: reqwest::Client,
    base: Option<ApiBaseUrl>,
}

impl HttpBusinessApi {
    pub fn new(http: reqwest::Client, base: Option<ApiBaseUrl>) -> Self {
        Self { http, base }
    }

    /// GET an endpoint and deserialize the JSON body. `Ok(None)` on 404.
    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        base: &ApiBaseUrl,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Option<T>, ApiError> {
        let response = self
            .http
            .get(base.endpoint(path))
            .query(query)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(ApiError::Malformed(format!(
                "unexpected status {} from {path}",
                response.status()
            )));
        }

        let body = response
            .json()
            .await
            .map_err(|e| ApiError::Malformed(e.to_string()))?;
        Ok(Some(body))
    }
}

#[async_trait]
impl BusinessApi for HttpBusinessApi {
    async fn posts(&self) -> Result<Vec<Post>, ApiError> {
        let Some(base) = &self.base else {
            return Ok(Vec::new());
        };
        Ok(self
            .get_json(base, "/posts", &[])
            .await?
            .unwrap_or_default())
    }

    async fn post(&self, slug: &str) -> Result<Option<Post>, ApiError> {
        let Some(base) = &self.base else {
            return Ok(None);
        };
        self.get_json(base, &format!("/posts/{slug}"), &[]).await
    }

    async fn case_studies(&self) -> Result<Vec<CaseStudy>, ApiError> {
        let Some(base) = &self.base else {
            return Ok(Vec::new());
        };
        Ok(self
            .get_json(base, "/case-studies", &[])
            .await?
            .unwrap_or_default())
    }

    async fn client_projects(&self, email: &str) -> Result<Vec<ClientProject>, ApiError> {
        let Some(base) = &self.base else {
            return Ok(Vec::new());
        };
        Ok(self
            .get_json(base, "/projects", &[("client", email)])
            .await?
            .unwrap_or_default())
    }

    /// confirm_admin
    ///
    /// Asks the business API whether it recognizes the email as an administrator.
    /// No configured API means no secondary confirmation: the answer is false and
    /// the local allow-list stays the only authority.
    async fn confirm_admin(&self, email: &str) -> Result<bool, ApiError> {
        let Some(base) = &self.base else {
            return Ok(false);
        };

        #[derive(serde::Deserialize)]
        struct Confirmation {
            #[serde(rename = "isAdmin")]
            is_admin: bool,
        }

        let confirmation: Option<Confirmation> = self
            .get_json(base, "/admin/confirm", &[("email", email)])
            .await?;
        Ok(confirmation.map(|c| c.is_admin).unwrap_or(false))
    }
}

// --- Static Catalogs ---

// The marketing catalogs are fixed content, shipped with the binary. They change
// with a deploy, not at runtime.

/// services
///
/// The static services catalog rendered on `/services`.
pub fn services() -> Vec<Service> {
    vec![
        Service {
            name: "Web Development".to_string(),
            description: "Design and build of marketing sites, portals and web apps."
                .to_string(),
        },
        Service {
            name: "E-Commerce".to_string(),
            description: "Storefront builds and checkout integrations.".to_string(),
        },
        Service {
            name: "Maintenance & Support".to_string(),
            description: "Monitoring, updates and incident response for running sites."
                .to_string(),
        },
        Service {
            name: "Consulting".to_string(),
            description: "Architecture reviews and technical roadmaps.".to_string(),
        },
    ]
}

/// pricing_plans
///
/// The static pricing table rendered on `/pricing`.
pub fn pricing_plans() -> Vec<PricingPlan> {
    vec![
        PricingPlan {
            name: "Starter".to_string(),
            price_per_month: 290,
            description: "A maintained one-page presence.".to_string(),
            features: vec![
                "Single landing page".to_string(),
                "Hosting included".to_string(),
                "Monthly content update".to_string(),
            ],
            highlighted: false,
        },
        PricingPlan {
            name: "Business".to_string(),
            price_per_month: 690,
            description: "A full site with ongoing development.".to_string(),
            features: vec![
                "Up to ten pages".to_string(),
                "Blog and case studies".to_string(),
                "Weekly development hours".to_string(),
                "Priority support".to_string(),
            ],
            highlighted: true,
        },
        PricingPlan {
            name: "Scale".to_string(),
            price_per_month: 1490,
            description: "A dedicated team for product work.".to_string(),
            features: vec![
                "Custom web application".to_string(),
                "Dedicated developer".to_string(),
                "Same-day support".to_string(),
            ],
            highlighted: false,
        },
    ]
}

/// testimonials
///
/// Static client quotes for the home page.
pub fn testimonials() -> Vec<Testimonial> {
    vec![
        Testimonial {
            author: "Maya Lindqvist".to_string(),
            company: "Nordic Interiors".to_string(),
            quote: "Our new site doubled inbound leads within a quarter.".to_string(),
        },
        Testimonial {
            author: "Tom Becker".to_string(),
            company: "Becker Logistics".to_string(),
            quote: "The portal gives our clients live visibility into every project."
                .to_string(),
        },
        Testimonial {
            author: "Priya Nair".to_string(),
            company: "Sundial Coffee".to_string(),
            quote: "Fast, pragmatic, and they actually answer the phone.".to_string(),
        },
    ]
}
