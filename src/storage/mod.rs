//! Entity store adapter.
//!
//! A [`Store`] hands out [`Transaction`]s; every service operation runs inside
//! exactly one of them via [`with_transaction`]. The adapter holds no entity
//! state of its own: entities are copied in on write and copied out on read.

pub mod memory;
pub mod postgres;
pub mod schema;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

use crate::domain::model::{
    EntityId, Game, GameFilter, Metadata, MetadataFilter, User, UserFilter,
};
use async_trait::async_trait;
use std::future::Future;
use std::pin::Pin;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
pub type StoreResult<T> = Result<T, StoreError>;

/// Unique constraint names, shared by every backend so callers can tell the
/// violated constraint apart.
pub const USERS_EMAIL_KEY: &str = "users_email_key";
pub const USERS_USERNAME_KEY: &str = "users_username_key";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("unique constraint violated ({})", constraint.as_deref().unwrap_or("unnamed"))]
    UniqueViolation { constraint: Option<String> },
    #[error("foreign key constraint violated ({})", constraint.as_deref().unwrap_or("unnamed"))]
    ForeignKeyViolation { constraint: Option<String> },
    #[error("no row matched")]
    RowNotFound,
    #[error("transaction already committed or rolled back")]
    TransactionClosed,
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Self::RowNotFound,
            sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505") => {
                Self::UniqueViolation {
                    constraint: db_err.constraint().map(str::to_owned),
                }
            }
            sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23503") => {
                Self::ForeignKeyViolation {
                    constraint: db_err.constraint().map(str::to_owned),
                }
            }
            sqlx::Error::PoolTimedOut => Self::Unavailable("connection pool timed out".into()),
            sqlx::Error::PoolClosed => Self::Unavailable("connection pool closed".into()),
            other => Self::Database(other),
        }
    }
}

/// A backing store able to open transactions.
#[async_trait]
pub trait Store: Send + Sync {
    async fn begin(&self) -> StoreResult<Box<dyn Transaction>>;

    /// Cheap reachability check used by the health endpoint.
    async fn ping(&self) -> StoreResult<()>;
}

/// Typed create/find/update/delete primitives scoped to one transaction.
///
/// Inserts and updates write the generated fields (`id`, `created_at`,
/// `updated_at`) back onto the entity they were given. Updates and deletes of
/// a row that does not exist fail with [`StoreError::RowNotFound`].
///
/// Ordering of `find_*`: users by id ascending (insertion order), games and
/// metadata most recent first.
#[async_trait]
pub trait Transaction: Send {
    async fn insert_user(&mut self, user: &mut User) -> StoreResult<()>;
    async fn find_users(&mut self, filter: &UserFilter) -> StoreResult<Vec<User>>;
    async fn update_user(&mut self, user: &mut User) -> StoreResult<()>;
    async fn delete_user(&mut self, id: EntityId) -> StoreResult<()>;

    async fn insert_game(&mut self, game: &mut Game) -> StoreResult<()>;
    async fn find_games(&mut self, filter: &GameFilter) -> StoreResult<Vec<Game>>;
    async fn update_game(&mut self, game: &mut Game) -> StoreResult<()>;
    async fn delete_game(&mut self, id: EntityId) -> StoreResult<()>;

    async fn insert_metadata(&mut self, md: &mut Metadata) -> StoreResult<()>;
    async fn find_metadata(&mut self, filter: &MetadataFilter) -> StoreResult<Vec<Metadata>>;
    async fn update_metadata(&mut self, md: &mut Metadata) -> StoreResult<()>;
    async fn delete_metadata(&mut self, id: EntityId) -> StoreResult<()>;

    async fn commit(&mut self) -> StoreResult<()>;
    async fn rollback(&mut self) -> StoreResult<()>;
}

/// Runs `op` inside a fresh transaction.
///
/// Commits when `op` returns `Ok`, rolls back when it returns `Err` and hands
/// the error back to the caller. A failed commit is reported as the error.
pub async fn with_transaction<T, E, F>(store: &dyn Store, op: F) -> Result<T, E>
where
    T: Send,
    E: From<StoreError> + Send,
    F: for<'t> FnOnce(&'t mut dyn Transaction) -> BoxFuture<'t, Result<T, E>> + Send,
{
    let mut tx = store.begin().await?;
    match op(&mut *tx).await {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                tracing::warn!(error = %rollback_err, "rollback failed");
            }
            Err(err)
        }
    }
}
