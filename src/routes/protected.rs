use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, put},
};

/// Protected Router Module
///
/// The subject CRUD surface. The `AuthUser` middleware layered on in
/// `create_router` guarantees every request reaching these handlers carried a
/// valid, unexpired bearer token; the handlers additionally take `AuthUser` so
/// the claims are available if needed.
pub fn protected_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /api/subjects — list all subjects.
        // POST /api/subjects — create; duplicate subjectCode surfaces as Conflict
        // straight from the unique index, there is no handler-side pre-check.
        .route(
            "/api/subjects",
            get(handlers::list_subjects).post(handlers::create_subject),
        )
        // PUT /api/subjects/{id} — apply supplied fields, acknowledge generically.
        // DELETE /api/subjects/{id} — remove, acknowledge regardless of existence.
        .route(
            "/api/subjects/{id}",
            put(handlers::update_subject).delete(handlers::delete_subject),
        )
}
