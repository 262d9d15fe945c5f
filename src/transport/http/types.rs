use crate::app::{GameService, LinkWorkflow, MetadataService, UserService};
use crate::crypto::token::TokenKeys;
use crate::domain::model::{Game, GameFilter, GamePatch, Metadata, Page, User, UserFilter};
use crate::domain::validation::FieldErrors;
use crate::storage::Store;
use crate::transport::http::error::ApiError;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Json, Query};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub users: UserService,
    pub games: GameService,
    pub metadata: MetadataService,
    pub links: LinkWorkflow,
    pub tokens: Arc<TokenKeys>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, tokens: TokenKeys) -> Self {
        Self {
            users: UserService::new(store.clone()),
            games: GameService::new(store.clone()),
            metadata: MetadataService::new(store.clone()),
            links: LinkWorkflow::new(store.clone()),
            tokens: Arc::new(tokens),
            store,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct ApiResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Object)]
    pub data: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApiResponse {
    pub fn ok(data: JsonValue) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>, data: Option<JsonValue>) -> Self {
        Self {
            success: false,
            data,
            error: Some(error.into()),
        }
    }
}

/// Unwraps a JSON body or reports what shape was expected.
pub fn json_body<T>(
    request: Result<Json<T>, JsonRejection>,
    expected: &str,
) -> Result<T, ApiError> {
    match request {
        Ok(Json(body)) => Ok(body),
        Err(e) => Err(ApiError::InvalidBody(format!(
            "Invalid JSON body: {} (expected: {})",
            e.body_text(),
            expected
        ))),
    }
}

pub fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, ApiError> {
    match query {
        Ok(Query(params)) => Ok(params),
        Err(e) => Err(ApiError::InvalidQuery(e.body_text())),
    }
}

// ---- requests ----

#[derive(Deserialize, Debug, Default, ToSchema)]
pub struct NewUser {
    pub email: Option<String>,
    pub username: Option<String>,
    pub age: Option<i32>,
    pub password: Option<String>,
}

/// A registration payload that passed validation.
pub struct ValidNewUser {
    pub email: String,
    pub username: String,
    pub age: i32,
    pub password: String,
}

impl NewUser {
    pub fn validate(self) -> Result<ValidNewUser, FieldErrors> {
        let mut errors = FieldErrors::new();
        if errors.required("email", self.email.as_deref()) {
            errors.email("email", self.email.as_deref().unwrap_or_default());
        }
        if errors.required("username", self.username.as_deref()) {
            errors.length("username", self.username.as_deref().unwrap_or_default(), 2, None);
        }
        match self.age {
            Some(age) => errors.at_least("age", i64::from(age), 1),
            None => errors.add("age", "this field is required"),
        }
        if errors.required("password", self.password.as_deref()) {
            errors.length("password", self.password.as_deref().unwrap_or_default(), 8, Some(72));
        }
        errors.into_result()?;

        Ok(ValidNewUser {
            email: self.email.unwrap_or_default(),
            username: self.username.unwrap_or_default(),
            age: self.age.unwrap_or_default(),
            password: self.password.unwrap_or_default(),
        })
    }
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct CreateUserRequest {
    pub user: NewUser,
}

#[derive(Deserialize, Debug, Default, ToSchema)]
pub struct Credentials {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct LoginRequest {
    pub user: Credentials,
}

/// Fields of the current user to overwrite. Absent fields are left alone.
#[derive(Deserialize, Debug, Default, ToSchema)]
pub struct UserChanges {
    pub email: Option<String>,
    pub username: Option<String>,
    pub age: Option<i32>,
    pub password: Option<String>,
}

impl UserChanges {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if let Some(email) = &self.email {
            errors.email("email", email);
        }
        if let Some(username) = &self.username {
            errors.length("username", username, 2, None);
        }
        if let Some(age) = self.age {
            errors.at_least("age", i64::from(age), 1);
        }
        if let Some(password) = &self.password {
            errors.length("password", password, 8, Some(72));
        }
        errors.into_result()
    }
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct UpdateUserRequest {
    pub user: UserChanges,
}

#[derive(Deserialize, Debug, Default, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewGame {
    pub title: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub age_rating: i32,
    #[serde(default)]
    pub publisher: String,
}

impl NewGame {
    pub fn validate(self) -> Result<Game, FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.required("title", self.title.as_deref());
        errors.at_least("ageRating", i64::from(self.age_rating), 0);
        errors.into_result()?;

        Ok(Game {
            description: self.description,
            url: self.url,
            publisher: self.publisher,
            ..Game::new(self.title.unwrap_or_default(), self.age_rating)
        })
    }
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct CreateGameRequest {
    pub game: NewGame,
}

#[derive(Deserialize, Debug, Default, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GameChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub age_rating: Option<i32>,
    pub publisher: Option<String>,
}

impl GameChanges {
    pub fn into_patch(self) -> Result<GamePatch, FieldErrors> {
        let mut errors = FieldErrors::new();
        if self.title.is_some() {
            errors.required("title", self.title.as_deref());
        }
        if let Some(rating) = self.age_rating {
            errors.at_least("ageRating", i64::from(rating), 0);
        }
        errors.into_result()?;

        Ok(GamePatch {
            title: self.title,
            description: self.description,
            url: self.url,
            age_rating: self.age_rating,
            publisher: self.publisher,
        })
    }
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct UpdateGameRequest {
    pub game: GameChanges,
}

#[derive(Deserialize, Debug, Default, ToSchema)]
pub struct UserSelector {
    pub email: Option<String>,
    pub username: Option<String>,
    pub age: Option<i32>,
}

#[derive(Deserialize, Debug, Default, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GameSelector {
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub age_rating: Option<i32>,
    pub publisher: Option<String>,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct LinkRequest {
    #[serde(default)]
    pub user: UserSelector,
    #[serde(default)]
    pub game: GameSelector,
}

impl LinkRequest {
    pub fn into_filters(self) -> Result<(UserFilter, GameFilter), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.required("username", self.user.username.as_deref());
        errors.required("title", self.game.title.as_deref());
        errors.into_result()?;

        let user = UserFilter {
            email: self.user.email,
            username: self.user.username,
            age: self.user.age,
            ..UserFilter::default()
        };
        let game = GameFilter {
            title: self.game.title,
            description: self.game.description,
            url: self.game.url,
            age_rating: self.game.age_rating,
            publisher: self.game.publisher,
            ..GameFilter::default()
        };
        Ok((user, game))
    }
}

// ---- query strings ----

#[derive(Deserialize, Debug, Default, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserQuery {
    pub id: Option<i64>,
    pub email: Option<String>,
    pub username: Option<String>,
    pub age: Option<i32>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl From<UserQuery> for UserFilter {
    fn from(q: UserQuery) -> Self {
        Self {
            id: q.id,
            email: q.email,
            username: q.username,
            age: q.age,
            page: Page {
                limit: q.limit,
                offset: q.offset,
            },
        }
    }
}

#[derive(Deserialize, Debug, Default, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct GameQuery {
    pub id: Option<i64>,
    pub title: Option<String>,
    #[serde(rename = "desc")]
    pub description: Option<String>,
    pub url: Option<String>,
    /// Also accepted as `age`.
    #[serde(alias = "age")]
    pub age_rating: Option<i32>,
    pub publisher: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl From<GameQuery> for GameFilter {
    fn from(q: GameQuery) -> Self {
        Self {
            id: q.id,
            title: q.title,
            description: q.description,
            url: q.url,
            age_rating: q.age_rating,
            publisher: q.publisher,
            page: Page {
                limit: q.limit,
                offset: q.offset,
            },
        }
    }
}

// ---- responses ----

#[derive(Serialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MetadataView {
    pub id: i64,
    pub player_id: i64,
    pub played_game_id: i64,
    /// Minutes.
    pub play_time: i64,
    pub play_time_human: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Metadata> for MetadataView {
    fn from(md: Metadata) -> Self {
        Self {
            play_time_human: md.play_time_display(),
            id: md.id,
            player_id: md.player_id,
            played_game_id: md.played_game_id,
            play_time: md.play_time,
            created_at: md.created_at,
            updated_at: md.updated_at,
        }
    }
}

/// A user merged with its play-session records. The password hash never
/// leaves the server.
#[derive(Serialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub age: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub metadata: Vec<MetadataView>,
}

impl UserView {
    pub fn new(user: User, metadata: Vec<Metadata>, token: Option<String>) -> Self {
        Self {
            id: user.id,
            email: user.email,
            username: user.username,
            age: user.age,
            created_at: user.created_at,
            updated_at: user.updated_at,
            token,
            metadata: metadata.into_iter().map(MetadataView::from).collect(),
        }
    }
}

#[derive(Serialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GameView {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub url: String,
    pub age_rating: i32,
    pub publisher: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Game> for GameView {
    fn from(game: Game) -> Self {
        Self {
            id: game.id,
            title: game.title,
            description: game.description,
            url: game.url,
            age_rating: game.age_rating,
            publisher: game.publisher,
            created_at: game.created_at,
            updated_at: game.updated_at,
        }
    }
}
