use crate::transport::http::auth::require_auth;
use crate::transport::http::handlers::{games, health, users};
use crate::transport::http::types::{
    ApiResponse, AppState, CreateGameRequest, CreateUserRequest, Credentials, GameChanges,
    GameSelector, GameView, LinkRequest, LoginRequest, MetadataView, NewGame, NewUser,
    UpdateGameRequest, UpdateUserRequest, UserChanges, UserSelector, UserView,
};
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use std::time::Duration;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        health::healthcheck_handler,
        users::create_user_handler,
        users::login_handler,
        users::list_users_handler,
        users::update_user_handler,
        users::delete_users_handler,
        games::create_game_handler,
        games::list_games_handler,
        games::update_games_handler,
        games::delete_games_handler,
        games::link_game_handler
    ),
    components(schemas(
        ApiResponse,
        CreateUserRequest,
        NewUser,
        LoginRequest,
        Credentials,
        UpdateUserRequest,
        UserChanges,
        CreateGameRequest,
        NewGame,
        UpdateGameRequest,
        GameChanges,
        LinkRequest,
        UserSelector,
        GameSelector,
        UserView,
        GameView,
        MetadataView
    )),
    tags(
        (name = "health"),
        (name = "users", description = "Registration, login and user management"),
        (name = "games", description = "Game catalog and player links")
    )
)]
pub struct ApiDoc;

/// Every route lives under `/api/v1`. Health, registration and login are
/// public; everything else goes through [`require_auth`].
pub fn create_router(app_state: AppState, request_timeout: Duration) -> Router {
    let public = Router::new()
        .route("/health", get(health::healthcheck_handler))
        .route("/users", post(users::create_user_handler))
        .route("/users/login", post(users::login_handler));

    let protected = Router::new()
        .route(
            "/users",
            get(users::list_users_handler)
                .put(users::update_user_handler)
                .patch(users::update_user_handler)
                .delete(users::delete_users_handler),
        )
        .route(
            "/games",
            get(games::list_games_handler)
                .post(games::create_game_handler)
                .put(games::update_games_handler)
                .patch(games::update_games_handler)
                .delete(games::delete_games_handler),
        )
        .route("/games/link", post(games::link_game_handler))
        .route_layer(middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    Router::new()
        .nest("/api/v1", public.merge(protected))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
