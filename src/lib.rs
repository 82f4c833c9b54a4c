use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod repository;

// Routing, segregated by access level (public vs bearer-token gated).
pub mod routes;
use auth::AuthUser;
use routes::{protected, public};

// --- Public Re-exports ---

// Core state types used by the binary entry point and the integration tests.
pub use config::AppConfig;
pub use repository::{MockRepository, MongoRepository, RepositoryState};

/// ApiDoc
///
/// Aggregates the OpenAPI documentation for every handler and schema, served as
/// JSON at `/api-docs/openapi.json` and browsable at `/swagger-ui`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::list_users, handlers::get_user, handlers::create_user,
        handlers::update_user, handlers::delete_user, handlers::login,
        handlers::list_subjects, handlers::create_subject,
        handlers::update_subject, handlers::delete_subject,
    ),
    components(
        schemas(
            models::CreateUserRequest, models::UpdateUserRequest, models::LoginRequest,
            models::LoginResponse, models::UserSummary, models::UserProfile,
            models::CreateSubjectRequest, models::UpdateSubjectRequest,
            models::SubjectResponse, models::MessageResponse,
        )
    ),
    tags(
        (name = "subject-registry", description = "User and academic subject management API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single shared container for everything a handler needs: the persistence
/// layer behind its trait object, and the immutable configuration.
#[derive(Clone)]
pub struct AppState {
    /// Repository layer, abstracting the MongoDB client (or the mock in tests).
    pub repo: RepositoryState,
    /// Loaded, immutable environment configuration.
    pub config: AppConfig,
}

// FromRef implementations let extractors pull individual components out of the
// shared state; the AuthUser extractor only needs AppConfig.

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Forces the AuthUser extractor on every route it is layered over. A missing
/// token rejects with 401 and an invalid or expired one with 403 before the
/// handler runs; a valid token lets the request through unchanged.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles the full application: Swagger UI, the public user/login routes, the
/// token-gated subject routes, the JSON 404 fallback, and the observability and
/// CORS layers on the outside.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for request correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        // Auto-generated API documentation.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // User CRUD and login: no middleware.
        .merge(public::public_routes())
        // Subject CRUD: every request must pass the bearer-token check first.
        .merge(
            protected::protected_routes()
                .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware)),
        )
        // Unmatched routes answer with the same JSON error shape as everything else.
        .fallback(handlers::route_not_found)
        .with_state(state);

    // Observability and correlation layers, applied outermost.
    base_router
        .layer(
            ServiceBuilder::new()
                // Unique request id for every incoming request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // Wrap the request/response lifecycle in a correlated tracing span.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // Echo the request id back to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// Builds the per-request tracing span, carrying the x-request-id so every log
/// line for one request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
