//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{FileStore, OpenAiGeneratorAdapter, RelayGeneratorAdapter},
    config::{Config, GenerationBackend},
    error::ApiError,
    web::{self, rest::ApiDoc, state::AppState},
};
use async_openai::{config::OpenAIConfig, Client};
use axum::http::{
    header::{ACCEPT, CONTENT_TYPE},
    HeaderValue, Method,
};
use axum::Router;
use promptsmith_core::{
    KeyValueStore, PromptGenerationService, SessionContext, SessionController, SystemClock,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Open Local Storage ---
    let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(&config.data_dir)?);
    info!("Storing usage and history under {}", config.data_dir.display());

    // --- 3. Initialize the Generation Collaborator ---
    let generator: Arc<dyn PromptGenerationService> = match &config.backend {
        GenerationBackend::OpenAi { api_key, model } => {
            info!("Generating prompts with OpenAI model '{}'", model);
            let openai_config = OpenAIConfig::new().with_api_key(api_key);
            Arc::new(OpenAiGeneratorAdapter::new(
                Client::with_config(openai_config),
                model.clone(),
            ))
        }
        GenerationBackend::Relay { url } => {
            info!("Generating prompts through relay at {}", url);
            let client = reqwest::Client::builder()
                .timeout(Duration::from_secs(60))
                .build()?;
            Arc::new(RelayGeneratorAdapter::new(client, url.clone()))
        }
    };

    // --- 4. Build the Shared AppState ---
    let controller = Arc::new(SessionController::new(
        store,
        generator,
        Arc::new(SystemClock),
        config.limits,
        &SessionContext::new(config.default_plan),
    ));
    let app_state = Arc::new(AppState::new(config.clone(), controller));

    // --- 5. Create the Web Router ---
    let origin = config.cors_origin.parse::<HeaderValue>().map_err(|e| {
        ApiError::Internal(format!("Invalid CORS origin '{}': {}", config.cors_origin, e))
    })?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, ACCEPT]);

    let app = Router::new()
        .merge(web::router(app_state).layer(cors))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
