//! OpenAPI documentation and schema generation
//!
//! This module defines the OpenAPI specification for the tunefetch REST API
//! using utoipa for compile-time spec generation.

use utoipa::OpenApi;

/// OpenAPI documentation for the tunefetch REST API
///
/// The document is served at:
/// - `/openapi.json` - JSON format OpenAPI specification
/// - `/swagger-ui` - Interactive Swagger UI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "tunefetch REST API",
        version = "0.1.0",
        description = "Submit audio source URLs for background acquisition, poll task status and browse the resulting song library",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:3900", description = "Local development server")
    ),
    paths(
        // Acquisition tasks
        crate::api::routes::submit_download,
        crate::api::routes::get_downloads,

        // Songs
        crate::api::routes::list_songs,
        crate::api::routes::get_song,
        crate::api::routes::create_song,
        crate::api::routes::update_song,
        crate::api::routes::upload_song_audio,

        // Users
        crate::api::routes::user_webhook,

        // System
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
        crate::api::routes::event_stream,
    ),
    components(schemas(
        // Core types from types.rs
        crate::types::TaskId,
        crate::types::SongId,
        crate::types::UserId,
        crate::types::TaskStatus,
        crate::types::SourcePlatform,
        crate::types::TaskInfo,
        crate::types::SongInfo,
        crate::types::Pagination,
        crate::types::SongPage,
        crate::types::SubmitReceipt,
        crate::types::SongUpload,
        crate::types::AudioAnalysis,
        crate::types::Event,

        // Webhook payload
        crate::manager::UserEvent,
        crate::manager::UserEventData,
        crate::manager::EmailAddress,

        // API request/response types from routes
        crate::api::routes::SubmitRequest,
        crate::api::routes::TaskQuery,
        crate::api::routes::SongsQuery,
        crate::api::routes::CreateSongRequest,
        crate::api::routes::UpdateSongRequest,
        crate::api::routes::RecentTasks,
        crate::api::routes::HealthStatus,

        // Error types from error.rs
        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "download", description = "Acquisition tasks - Submit source URLs and poll their status"),
        (name = "songs", description = "Songs - The caller's library, uploads and analysis results"),
        (name = "users", description = "Users - Lifecycle webhook from the authentication provider"),
        (name = "system", description = "System endpoints - Health checks, OpenAPI spec, events"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Security addon describing the caller identity headers
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = &mut openapi.components {
            components.add_security_scheme(
                "user_id",
                utoipa::openapi::security::SecurityScheme::ApiKey(
                    utoipa::openapi::security::ApiKey::Header(
                        utoipa::openapi::security::ApiKeyValue::new("X-User-Id"),
                    ),
                ),
            );
            components.add_security_scheme(
                "api_key",
                utoipa::openapi::security::SecurityScheme::ApiKey(
                    utoipa::openapi::security::ApiKey::Header(
                        utoipa::openapi::security::ApiKeyValue::new("X-Api-Key"),
                    ),
                ),
            );
        }
    }
}
