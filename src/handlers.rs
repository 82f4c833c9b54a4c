use crate::{
    AppState, auth,
    auth::AuthUser,
    errors::ApiError,
    models::{
        CreateSubjectRequest, CreateUserRequest, LoginRequest, LoginResponse, MessageResponse,
        SubjectDoc, SubjectResponse, UpdateSubjectRequest, UpdateUserRequest, UserDoc,
        UserProfile, UserSummary, normalize_username,
    },
};
use axum::{
    Json,
    extract::{FromRequestParts, Path, State},
    http::{Method, StatusCode, request::Parts},
};
use chrono::Utc;
use uuid::Uuid;

/// UuidPath
///
/// Path extractor for `{id}` segments. Wraps axum's `Path<Uuid>` so that a
/// malformed id rejects with the same `{"message": ...}` JSON shape as every
/// other error, instead of the extractor's plain-text default.
pub struct UuidPath(pub Uuid);

impl<S> FromRequestParts<S> for UuidPath
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<Uuid>::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::Validation("Invalid id".to_string()))?;
        Ok(UuidPath(id))
    }
}

// --- User Handlers ---

/// list_users
///
/// [Public Route] Lists every user as a summary record. Names and the password
/// hash are projected away; only id, username, and creation time leave the server.
#[utoipa::path(
    get,
    path = "/api/users",
    responses((status = 200, description = "All users", body = [UserSummary]))
)]
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<UserSummary>>, ApiError> {
    let users = state.repo.list_users().await?;
    Ok(Json(users.into_iter().map(UserSummary::from).collect()))
}

/// get_user
///
/// [Public Route] Retrieves one user's full profile, minus the password hash.
#[utoipa::path(
    get,
    path = "/api/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Found", body = UserProfile),
        (status = 404, description = "Unknown user")
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    UuidPath(id): UuidPath,
) -> Result<Json<UserProfile>, ApiError> {
    match state.repo.get_user(id).await? {
        Some(user) => Ok(Json(UserProfile::from(user))),
        None => Err(ApiError::NotFound("User not found".to_string())),
    }
}

/// create_user
///
/// [Public Route] Registers a new user. All four fields must be non-empty after
/// trimming. The username is normalized (trimmed, lowercased) before the
/// case-insensitive duplicate check; the unique index on `username` remains the
/// authority if two creates race past the pre-check.
#[utoipa::path(
    post,
    path = "/api/users/create",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "Created", body = MessageResponse),
        (status = 400, description = "Missing fields or duplicate username")
    )
)]
pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    let first_name = payload.first_name.trim();
    let last_name = payload.last_name.trim();
    let username = normalize_username(&payload.username);
    if first_name.is_empty() || last_name.is_empty() || username.is_empty() || payload.password.is_empty()
    {
        return Err(ApiError::Validation("Missing fields".to_string()));
    }

    // Pre-check is an optimization for a friendly error; the unique index catches
    // whatever slips through concurrently.
    if state.repo.find_user_by_username(&username).await?.is_some() {
        return Err(ApiError::Conflict("Username already taken".to_string()));
    }

    let user = UserDoc {
        id: Uuid::new_v4(),
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        username,
        password: auth::hash_password(&payload.password)?,
        created_at: Utc::now(),
    };
    state.repo.insert_user(user).await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("User created")),
    ))
}

/// Rejects any non-POST method on /api/users/create with a 405 naming the method.
pub async fn create_user_method_not_allowed(method: Method) -> ApiError {
    ApiError::MethodNotAllowed(format!("Method {method} not allowed on /api/users/create"))
}

/// update_user
///
/// [Public Route] Partial update of a user record. Only supplied, non-empty
/// fields change. A changed username is re-checked for uniqueness; a supplied
/// password is re-hashed. Responds with the updated profile, never the hash.
#[utoipa::path(
    put,
    path = "/api/users/edit/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated", body = UserProfile),
        (status = 400, description = "Duplicate username"),
        (status = 404, description = "Unknown user")
    )
)]
pub async fn update_user(
    State(state): State<AppState>,
    UuidPath(id): UuidPath,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<UserProfile>, ApiError> {
    let mut user = state
        .repo
        .get_user(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    if let Some(username) = payload.username.as_deref() {
        let normalized = normalize_username(username);
        if !normalized.is_empty() && normalized != user.username {
            if state
                .repo
                .find_user_by_username(&normalized)
                .await?
                .is_some()
            {
                return Err(ApiError::Conflict("Username already taken".to_string()));
            }
            user.username = normalized;
        }
    }

    if let Some(first_name) = payload.first_name.filter(|v| !v.trim().is_empty()) {
        user.first_name = first_name.trim().to_string();
    }
    if let Some(last_name) = payload.last_name.filter(|v| !v.trim().is_empty()) {
        user.last_name = last_name.trim().to_string();
    }
    if let Some(password) = payload.password.filter(|v| !v.is_empty()) {
        user.password = auth::hash_password(&password)?;
    }

    state.repo.update_user(user.clone()).await?;
    Ok(Json(UserProfile::from(user)))
}

/// delete_user
///
/// [Public Route] Removes a user by id. Acknowledges regardless of prior
/// existence; there is no pre-delete lookup.
#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses((status = 200, description = "Deleted", body = MessageResponse))
)]
pub async fn delete_user(
    State(state): State<AppState>,
    UuidPath(id): UuidPath,
) -> Result<Json<MessageResponse>, ApiError> {
    state.repo.delete_user(id).await?;
    Ok(Json(MessageResponse::new("User deleted")))
}

/// login
///
/// [Public Route] Verifies credentials and issues a one-hour bearer token.
/// Unknown usernames and wrong passwords produce the same 401 message, so the
/// response does not reveal which half was wrong.
#[utoipa::path(
    post,
    path = "/api/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated", body = LoginResponse),
        (status = 400, description = "Missing credentials"),
        (status = 401, description = "Bad credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    if payload.username.trim().is_empty() || payload.password.is_empty() {
        return Err(ApiError::Validation(
            "Missing username or password".to_string(),
        ));
    }

    let username = normalize_username(&payload.username);
    let user = state
        .repo
        .find_user_by_username(&username)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid username or password".to_string()))?;

    if !auth::verify_password(&payload.password, &user.password)? {
        return Err(ApiError::Unauthorized(
            "Invalid username or password".to_string(),
        ));
    }

    let access_token = auth::issue_token(&user, &state.config.jwt_secret)?;
    Ok(Json(LoginResponse {
        username: user.username,
        firstname: user.first_name,
        lastname: user.last_name,
        access_token,
    }))
}

// --- Subject Handlers (bearer-token gated) ---

/// list_subjects
///
/// [Protected Route] Lists every subject record.
#[utoipa::path(
    get,
    path = "/api/subjects",
    responses(
        (status = 200, description = "All subjects", body = [SubjectResponse]),
        (status = 401, description = "No token"),
        (status = 403, description = "Invalid token")
    )
)]
pub async fn list_subjects(
    _auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<SubjectResponse>>, ApiError> {
    let subjects = state.repo.list_subjects().await?;
    Ok(Json(
        subjects.into_iter().map(SubjectResponse::from).collect(),
    ))
}

/// create_subject
///
/// [Protected Route] Persists a new subject. No duplicate pre-check here: the
/// unique index on `subjectCode` is the only gate, and its violation is mapped
/// to a Conflict rather than a generic server error.
#[utoipa::path(
    post,
    path = "/api/subjects",
    request_body = CreateSubjectRequest,
    responses(
        (status = 201, description = "Created", body = MessageResponse),
        (status = 400, description = "Duplicate subject code")
    )
)]
pub async fn create_subject(
    _auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateSubjectRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    let subject = SubjectDoc {
        id: Uuid::new_v4(),
        subject_code: payload.subject_code,
        subject_name: payload.subject_name,
        credit: payload.credit,
    };
    state.repo.insert_subject(subject).await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("Subject created")),
    ))
}

/// update_subject
///
/// [Protected Route] Applies the supplied fields to a subject by id. Returns a
/// generic acknowledgement, not the updated record, and does so regardless of
/// whether the id existed.
#[utoipa::path(
    put,
    path = "/api/subjects/{id}",
    params(("id" = Uuid, Path, description = "Subject ID")),
    request_body = UpdateSubjectRequest,
    responses((status = 200, description = "Updated", body = MessageResponse))
)]
pub async fn update_subject(
    _auth: AuthUser,
    State(state): State<AppState>,
    UuidPath(id): UuidPath,
    Json(payload): Json<UpdateSubjectRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.repo.update_subject(id, payload).await?;
    Ok(Json(MessageResponse::new("Subject updated")))
}

/// delete_subject
///
/// [Protected Route] Removes a subject by id; acknowledges regardless of prior
/// existence.
#[utoipa::path(
    delete,
    path = "/api/subjects/{id}",
    params(("id" = Uuid, Path, description = "Subject ID")),
    responses((status = 200, description = "Deleted", body = MessageResponse))
)]
pub async fn delete_subject(
    _auth: AuthUser,
    State(state): State<AppState>,
    UuidPath(id): UuidPath,
) -> Result<Json<MessageResponse>, ApiError> {
    state.repo.delete_subject(id).await?;
    Ok(Json(MessageResponse::new("Subject deleted")))
}

/// Global fallback for unmatched routes, keeping 404s in the same JSON shape as
/// every other error.
pub async fn route_not_found() -> ApiError {
    ApiError::NotFound("Route not found".to_string())
}
