//! REST API server module
//!
//! Provides an OpenAPI 3 compliant REST API for submitting acquisition tasks,
//! polling their status and browsing the resulting songs.

use crate::{Config, Result, TaskManager};
use auth::{HeaderIdentityProvider, IdentityProvider};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware,
    routing::{get, post, put},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod auth;
pub mod error_response;
pub mod openapi;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use state::AppState;

/// Create the API router with all route definitions
///
/// Callers are identified with the [`HeaderIdentityProvider`] built from
/// `server.api.auth`. Use [`create_router_with_identity`] to plug in another provider.
///
/// # Routes
///
/// ## Acquisition tasks (caller identity required)
/// - `POST /download` - Submit a source URL
/// - `GET /download?task_id=N` - Get a single task
/// - `GET /download` - List recent tasks
///
/// ## Songs (caller identity required)
/// - `GET /songs?page=&limit=` - List songs with pagination
/// - `GET /songs/:id` - Get a single song
/// - `POST /songs` - Create a song record and reserve its upload target
/// - `PUT /songs/:id` - Record the processing outcome (and analysis) of a song
/// - `PUT /songs/:id/audio` - Upload the audio bytes of a song
///
/// ## Events (caller identity required)
/// - `GET /events` - Server-sent events for the caller's tasks
///
/// ## Users (webhook secret required)
/// - `POST /webhooks/users` - User lifecycle webhook
///
/// ## System
/// - `GET /health` - Health check
/// - `GET /openapi.json` - OpenAPI specification
/// - `GET /swagger-ui` - Interactive Swagger UI documentation (if enabled)
pub fn create_router(manager: Arc<TaskManager>, config: Arc<Config>) -> Router {
    let identity: Arc<dyn IdentityProvider> =
        Arc::new(HeaderIdentityProvider::new(&config.server.api.auth));
    create_router_with_identity(manager, config, identity)
}

/// Create the API router with a custom [`IdentityProvider`]
pub fn create_router_with_identity(
    manager: Arc<TaskManager>,
    config: Arc<Config>,
    identity: Arc<dyn IdentityProvider>,
) -> Router {
    let state = AppState::new(manager, config.clone(), identity.clone());

    // Routes scoped to the authenticated caller
    let caller_routes = Router::new()
        .route(
            "/download",
            post(routes::submit_download).get(routes::get_downloads),
        )
        .route("/songs", get(routes::list_songs).post(routes::create_song))
        .route(
            "/songs/:id",
            get(routes::get_song).put(routes::update_song),
        )
        .route(
            "/songs/:id/audio",
            put(routes::upload_song_audio).layer(DefaultBodyLimit::max(
                config.server.api.max_upload_bytes,
            )),
        )
        .route("/events", get(routes::event_stream))
        .route_layer(middleware::from_fn_with_state(
            identity,
            auth::require_caller,
        ));

    let webhook_routes = Router::new()
        .route("/webhooks/users", post(routes::user_webhook))
        .route_layer(middleware::from_fn_with_state(
            config.server.api.auth.webhook_secret.clone(),
            auth::require_webhook_secret,
        ));

    let router = Router::new()
        .merge(caller_routes)
        .merge(webhook_routes)
        .route("/health", get(routes::health_check))
        .route("/openapi.json", get(routes::openapi_spec));

    // Swagger UI serves its own copy of the document under a separate path
    let router = if config.server.api.swagger_ui {
        router.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
    } else {
        router
    };

    // Add state to all routes
    let router = router
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    // Apply CORS middleware if enabled in config
    if config.server.api.cors_enabled {
        let cors = build_cors_layer(&config.server.api.cors_origins);
        router.layer(cors)
    } else {
        router
    }
}

/// Build a CORS layer based on configured origins
///
/// # Arguments
///
/// * `origins` - List of allowed origins (supports "*" for any origin)
///
/// # Returns
///
/// A configured CorsLayer that allows the specified origins, all methods,
/// and all headers for cross-origin requests.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    // Check if "*" (all origins) is in the list
    let allow_any = origins.iter().any(|o| o == "*");

    if allow_any || origins.is_empty() {
        // Allow all origins (default for local development)
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        // Allow specific origins
        let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Start the API server on the configured bind address.
///
/// This function creates a TCP listener, binds it to the configured address,
/// and starts serving the API router. It runs until the server is shut down.
///
/// # Example
///
/// ```no_run
/// use tunefetch::{Config, TaskManager};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Arc::new(Config::default());
/// let manager = Arc::new(TaskManager::new((*config).clone()).await?);
///
/// // Start API server (blocks until shutdown)
/// tunefetch::api::start_api_server(manager, config).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_api_server(manager: Arc<TaskManager>, config: Arc<Config>) -> Result<()> {
    let bind_address = config.server.api.bind_address;

    tracing::info!(
        address = %bind_address,
        "Starting API server"
    );

    let app = create_router(manager, config);

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    tracing::info!(
        address = %bind_address,
        "API server listening"
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
