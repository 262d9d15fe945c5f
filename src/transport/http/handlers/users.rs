use crate::crypto::password::hash_password;
use crate::domain::error::ServiceError;
use crate::domain::model::{MetadataFilter, User, UserFilter, UserPatch};
use crate::domain::validation::FieldErrors;
use crate::transport::http::auth::RequestIdentity;
use crate::transport::http::error::ApiError;
use crate::transport::http::types::{
    json_body, query_params, ApiResponse, AppState, CreateUserRequest, LoginRequest,
    UpdateUserRequest, UserQuery, UserView,
};
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

/// Argon2 is deliberately slow; keep it off the async workers.
async fn hash_off_thread(password: String) -> Result<String, ApiError> {
    let hashed = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(ServiceError::internal)?
        .map_err(ServiceError::internal)?;
    Ok(hashed)
}

/// The user joined with its play-session records.
async fn user_view(state: &AppState, user: User, token: Option<String>) -> Result<UserView, ApiError> {
    let metadata = state.metadata.find(MetadataFilter::for_player(user.id)).await?;
    Ok(UserView::new(user, metadata, token))
}

#[utoipa::path(
    post,
    path = "/api/v1/users",
    tag = "users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User registered", body = ApiResponse),
        (status = 409, description = "Email or username already in use", body = ApiResponse),
        (status = 422, description = "Invalid fields", body = ApiResponse)
    )
)]
pub async fn create_user_handler(
    State(state): State<AppState>,
    request: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let request = json_body(request, r#"{"user": {"email", "username", "age", "password"}}"#)?;
    let input = request.user.validate()?;

    let password_hash = hash_off_thread(input.password).await?;
    let user = state
        .users
        .create(User::new(input.email, input.username, input.age, password_hash))
        .await?;
    tracing::info!(user_id = user.id, "user registered");

    let view = user_view(&state, user, None).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(serde_json::json!({ "user": view }))),
    )
        .into_response())
}

#[utoipa::path(
    post,
    path = "/api/v1/users/login",
    tag = "users",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in; the user carries a fresh token", body = ApiResponse),
        (status = 401, description = "Invalid credentials", body = ApiResponse)
    )
)]
pub async fn login_handler(
    State(state): State<AppState>,
    request: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let request = json_body(request, r#"{"user": {"email", "password"}}"#)?;
    let user = state
        .users
        .authenticate(&request.user.email, &request.user.password)
        .await?;
    let token = state.tokens.issue(&user).map_err(ServiceError::internal)?;

    let view = user_view(&state, user, Some(token)).await?;
    Ok((
        StatusCode::OK,
        Json(ApiResponse::ok(serde_json::json!({ "user": view }))),
    )
        .into_response())
}

#[utoipa::path(
    get,
    path = "/api/v1/users",
    tag = "users",
    params(UserQuery),
    responses(
        (status = 200, description = "Matching users with their metadata", body = ApiResponse),
        (status = 401, description = "Missing or invalid token", body = ApiResponse)
    )
)]
pub async fn list_users_handler(
    State(state): State<AppState>,
    identity: RequestIdentity,
    query: Result<Query<UserQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    identity.require_user()?;
    let filter = UserFilter::from(query_params(query)?);

    let users = state.users.find(filter).await?;
    let mut views = Vec::with_capacity(users.len());
    for user in users {
        views.push(user_view(&state, user, None).await?);
    }

    Ok((
        StatusCode::OK,
        Json(ApiResponse::ok(serde_json::json!({ "users": views }))),
    )
        .into_response())
}

#[utoipa::path(
    put,
    path = "/api/v1/users",
    tag = "users",
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Current user updated", body = ApiResponse),
        (status = 401, description = "Missing or invalid token", body = ApiResponse),
        (status = 409, description = "Email or username already in use", body = ApiResponse),
        (status = 422, description = "Invalid fields", body = ApiResponse)
    )
)]
pub async fn update_user_handler(
    State(state): State<AppState>,
    identity: RequestIdentity,
    request: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let current = identity.require_user()?.clone();
    let changes = json_body(request, r#"{"user": {...}}"#)?.user;
    changes.validate()?;

    let password_hash = match changes.password {
        Some(password) => Some(hash_off_thread(password).await?),
        None => None,
    };
    let patch = UserPatch {
        email: changes.email,
        username: changes.username,
        age: changes.age,
        password_hash,
    };
    let previous_email = current.email.clone();
    let user = state.users.update_one(current, patch).await?;

    // Claims carry the email, so the old token no longer resolves.
    let token = if user.email == previous_email {
        identity.token.clone()
    } else {
        Some(state.tokens.issue(&user).map_err(ServiceError::internal)?)
    };

    let view = user_view(&state, user, token).await?;
    Ok((
        StatusCode::OK,
        Json(ApiResponse::ok(serde_json::json!({ "user": view }))),
    )
        .into_response())
}

#[utoipa::path(
    delete,
    path = "/api/v1/users",
    tag = "users",
    params(UserQuery),
    responses(
        (status = 204, description = "Every matching user deleted"),
        (status = 401, description = "Missing or invalid token", body = ApiResponse),
        (status = 404, description = "No user matched", body = ApiResponse),
        (status = 422, description = "No predicate given", body = ApiResponse)
    )
)]
pub async fn delete_users_handler(
    State(state): State<AppState>,
    identity: RequestIdentity,
    query: Result<Query<UserQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    identity.require_user()?;
    let filter = UserFilter::from(query_params(query)?);
    if !filter.has_predicates() {
        return Err(FieldErrors::single(
            "filter",
            "at least one of id, email, username, age is required",
        )
        .into());
    }

    let deleted = state.users.delete_matching(filter).await?;
    tracing::info!(count = deleted.len(), ids = ?deleted, "users deleted");
    Ok(StatusCode::NO_CONTENT.into_response())
}
