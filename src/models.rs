use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;

// --- Content Schemas (served to the marketing site and the portal frontend) ---

/// Post
///
/// A blog post, fetched from the external content API. Only the fields the site
/// renders are modelled; the API may carry more.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct Post {
    // URL-safe identifier, unique per post.
    pub slug: String,
    pub title: String,
    pub excerpt: String,
    // Full body is only present on the detail endpoint.
    #[serde(default)]
    pub body: Option<String>,
    pub author: String,
    #[ts(type = "string")]
    pub published_at: DateTime<Utc>,
}

/// CaseStudy
///
/// A client case study, fetched from the external content API.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CaseStudy {
    pub slug: String,
    pub client: String,
    pub title: String,
    pub summary: String,
    pub outcome: String,
}

/// PricingPlan
///
/// One entry of the static pricing table. Prices are whole euros per month;
/// `highlighted` marks the plan the pricing page visually promotes.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct PricingPlan {
    pub name: String,
    pub price_per_month: i32,
    pub description: String,
    pub features: Vec<String>,
    pub highlighted: bool,
}

/// Testimonial
///
/// A static client quote shown on the home page.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct Testimonial {
    pub author: String,
    pub company: String,
    pub quote: String,
}

/// Service
///
/// One entry of the static services catalog.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct Service {
    pub name: String,
    pub description: String,
}

/// ClientProject
///
/// A project row from the business API, proxied into the client portal. The id is
/// opaque to this application.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ClientProject {
    pub id: String,
    pub name: String,
    pub status: String,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

// --- Admin Check Wire Format ---

/// AdminCheckResponse
///
/// Response body of the admin-check endpoint. The field name is part of the
/// frontend contract, hence the camelCase rename.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct AdminCheckResponse {
    #[serde(rename = "isAdmin")]
    #[ts(rename = "isAdmin")]
    pub is_admin: bool,
}
