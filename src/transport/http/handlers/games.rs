use crate::domain::model::GameFilter;
use crate::domain::validation::FieldErrors;
use crate::transport::http::auth::RequestIdentity;
use crate::transport::http::error::ApiError;
use crate::transport::http::types::{
    json_body, query_params, ApiResponse, AppState, CreateGameRequest, GameQuery, GameView,
    LinkRequest, MetadataView, UpdateGameRequest,
};
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

#[utoipa::path(
    post,
    path = "/api/v1/games",
    tag = "games",
    request_body = CreateGameRequest,
    responses(
        (status = 201, description = "Game created", body = ApiResponse),
        (status = 401, description = "Missing or invalid token", body = ApiResponse),
        (status = 422, description = "Invalid fields", body = ApiResponse)
    )
)]
pub async fn create_game_handler(
    State(state): State<AppState>,
    identity: RequestIdentity,
    request: Result<Json<CreateGameRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    identity.require_user()?;
    let request = json_body(request, r#"{"game": {"title", ...}}"#)?;
    let game = state.games.create(request.game.validate()?).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            serde_json::json!({ "game": GameView::from(game) }),
        )),
    )
        .into_response())
}

#[utoipa::path(
    get,
    path = "/api/v1/games",
    tag = "games",
    params(GameQuery),
    responses(
        (status = 200, description = "Matching games, newest first", body = ApiResponse),
        (status = 401, description = "Missing or invalid token", body = ApiResponse)
    )
)]
pub async fn list_games_handler(
    State(state): State<AppState>,
    identity: RequestIdentity,
    query: Result<Query<GameQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    identity.require_user()?;
    let filter = GameFilter::from(query_params(query)?);

    let games: Vec<GameView> = state
        .games
        .find(filter)
        .await?
        .into_iter()
        .map(GameView::from)
        .collect();

    Ok((
        StatusCode::OK,
        Json(ApiResponse::ok(serde_json::json!({
            "gamesCount": games.len(),
            "games": games,
        }))),
    )
        .into_response())
}

#[utoipa::path(
    put,
    path = "/api/v1/games",
    tag = "games",
    params(GameQuery),
    request_body = UpdateGameRequest,
    responses(
        (status = 200, description = "First matching game updated", body = ApiResponse),
        (status = 401, description = "Missing or invalid token", body = ApiResponse),
        (status = 404, description = "No game matched", body = ApiResponse)
    )
)]
pub async fn update_games_handler(
    State(state): State<AppState>,
    identity: RequestIdentity,
    query: Result<Query<GameQuery>, QueryRejection>,
    request: Result<Json<UpdateGameRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    identity.require_user()?;
    let filter = GameFilter::from(query_params(query)?);
    let patch = json_body(request, r#"{"game": {...}}"#)?.game.into_patch()?;

    let game = state.games.update_first(filter, patch).await?;
    Ok((
        StatusCode::OK,
        Json(ApiResponse::ok(
            serde_json::json!({ "game": GameView::from(game) }),
        )),
    )
        .into_response())
}

#[utoipa::path(
    delete,
    path = "/api/v1/games",
    tag = "games",
    params(GameQuery),
    responses(
        (status = 204, description = "Every matching game deleted"),
        (status = 401, description = "Missing or invalid token", body = ApiResponse),
        (status = 404, description = "No game matched", body = ApiResponse),
        (status = 422, description = "No predicate given", body = ApiResponse)
    )
)]
pub async fn delete_games_handler(
    State(state): State<AppState>,
    identity: RequestIdentity,
    query: Result<Query<GameQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    identity.require_user()?;
    let filter = GameFilter::from(query_params(query)?);
    if !filter.has_predicates() {
        return Err(FieldErrors::single(
            "filter",
            "at least one of id, title, desc, url, age_rating, publisher is required",
        )
        .into());
    }

    let deleted = state.games.delete_matching(filter).await?;
    tracing::info!(count = deleted.len(), ids = ?deleted, "games deleted");
    Ok(StatusCode::NO_CONTENT.into_response())
}

#[utoipa::path(
    post,
    path = "/api/v1/games/link",
    tag = "games",
    request_body = LinkRequest,
    responses(
        (status = 201, description = "Player linked to game with zero play time", body = ApiResponse),
        (status = 401, description = "Missing or invalid token, or user below the age rating", body = ApiResponse),
        (status = 422, description = "Invalid fields, or no user/game matched", body = ApiResponse)
    )
)]
pub async fn link_game_handler(
    State(state): State<AppState>,
    identity: RequestIdentity,
    request: Result<Json<LinkRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    identity.require_user()?;
    let (user_selector, game_selector) =
        json_body(request, r#"{"user": {"username", ...}, "game": {"title", ...}}"#)?
            .into_filters()?;

    let md = state.links.link(user_selector, game_selector).await?;
    tracing::info!(
        metadata_id = md.id,
        player_id = md.player_id,
        game_id = md.played_game_id,
        "player linked to game"
    );
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            serde_json::json!({ "metadata": MetadataView::from(md) }),
        )),
    )
        .into_response())
}
