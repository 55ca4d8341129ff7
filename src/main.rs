use agency_portal::{
    AppState, HttpBusinessApi, HttpIdentityProvider,
    config::{AppConfig, Env},
    create_router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// The asynchronous entry point for the application, responsible for initializing
/// all core components: Configuration, Logging, the identity-provider client, the
/// business-API client, and the HTTP server.
#[tokio::main]
async fn main() {
    // 1. Configuration & Environment Loading (Fail-Fast)
    // Loads .env file settings before configuration can be read.
    dotenv::dotenv().ok();
    // AppConfig::load() implements the fail-fast principle for missing Production secrets.
    let config = AppConfig::load();

    // 2. Logging Filter Setup
    // Prioritizes the RUST_LOG environment variable, falling back to sensible
    // defaults for local development.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "agency_portal=debug,tower_http=info,axum=trace".into());

    // 3. Initialize Logging based on Environment
    // The structured logging format is dynamically selected based on APP_ENV.
    match config.env {
        Env::Local => {
            // LOCAL: Pretty print output for human readability during local debugging.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            // PROD: JSON format output for ingestion by centralized log aggregators.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);
    if config.admin_emails.is_empty() {
        tracing::warn!("no admin emails configured; the admin dashboard is unreachable");
    }
    if config.api_base.is_none() {
        tracing::warn!("API_BASE_URL not set; content listings will be empty");
    }

    // 4. External Collaborator Clients
    // One shared HTTP client backs both boundaries; connection pooling is handled
    // inside reqwest.
    let http = reqwest::Client::new();

    let identity = Arc::new(HttpIdentityProvider::new(
        http.clone(),
        &config.auth_url,
        config.cookie_domain.clone(),
    )) as agency_portal::IdentityState;

    let api = Arc::new(HttpBusinessApi::new(http, config.api_base.clone()))
        as agency_portal::ApiState;

    // 5. Unified State Assembly
    let app_state = AppState {
        identity,
        api,
        config,
    };

    // 6. Router and Server Startup
    let app = create_router(app_state);

    let listener = TcpListener::bind("0.0.0.0:3000").await.unwrap();

    tracing::info!("HTTP server bound successfully.");
    tracing::info!("Listening on 0.0.0.0:3000");
    tracing::info!("API Documentation (Swagger UI) available at: http://localhost:3000/swagger-ui");

    axum::serve(listener, app).await.unwrap();
}
