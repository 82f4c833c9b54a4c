use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Public Router Module
///
/// Endpoints accessible without a token: the full user CRUD surface and login.
/// User records returned from these routes are always projected through the
/// password-free DTOs.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Unauthenticated liveness probe for monitoring and load balancer checks.
        .route("/health", get(|| async { "ok" }))
        // GET /api/users
        // Lists user summaries (id, username, createdAt).
        .route("/api/users", get(handlers::list_users))
        // POST /api/users/create
        // Registration. Any other method on this exact path answers 405 with a
        // message naming the offending method.
        .route(
            "/api/users/create",
            post(handlers::create_user).fallback(handlers::create_user_method_not_allowed),
        )
        // GET/DELETE /api/users/{id}
        // Single-user fetch (404 on unknown id) and unconditional delete.
        .route(
            "/api/users/{id}",
            get(handlers::get_user).delete(handlers::delete_user),
        )
        // PUT /api/users/edit/{id}
        // Partial update; re-checks username uniqueness on rename.
        .route("/api/users/edit/{id}", put(handlers::update_user))
        // POST /api/login
        // Credential check and bearer token issuance.
        .route("/api/login", post(handlers::login))
}
