//! Persistent entity store implementation using PostgreSQL.

use crate::domain::model::{
    EntityId, Game, GameFilter, Metadata, MetadataFilter, Page, User, UserFilter,
};
use crate::infra::config::Config;
use crate::storage::{schema, Store, StoreError, StoreResult, Transaction};
use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use std::str::FromStr;

const USER_COLUMNS: &str = "id, email, username, age, password_hash, created_at, updated_at";
const GAME_COLUMNS: &str =
    "id, title, description, url, age_rating, publisher, created_at, updated_at";
const METADATA_COLUMNS: &str =
    "id, player_id, played_game_id, play_time, created_at, updated_at";

/// An entity store backed by a PostgreSQL connection pool.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens the pool. Connection acquisition and every statement are bounded
    /// by `config.store_timeout`.
    pub async fn connect(config: &Config) -> anyhow::Result<Self> {
        let options = PgConnectOptions::from_str(&config.database_url)?.options([(
            "statement_timeout",
            config.store_timeout.as_millis().to_string(),
        )]);

        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .acquire_timeout(config.store_timeout)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Creates the `users`, `games` and `metadata` relations if missing.
    pub async fn ensure_schema(&self) -> anyhow::Result<()> {
        for statement in schema::STATEMENTS {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Store for PostgresStore {
    async fn begin(&self) -> StoreResult<Box<dyn Transaction>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PostgresTransaction { tx: Some(tx) }))
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

pub struct PostgresTransaction {
    tx: Option<sqlx::Transaction<'static, Postgres>>,
}

impl PostgresTransaction {
    fn conn(&mut self) -> StoreResult<&mut sqlx::Transaction<'static, Postgres>> {
        self.tx.as_mut().ok_or(StoreError::TransactionClosed)
    }

    async fn delete_by_id(&mut self, table: &str, id: EntityId) -> StoreResult<()> {
        let tx = self.conn()?;
        let sql = format!("DELETE FROM {table} WHERE id = $1");
        let result = sqlx::query(&sql).bind(id).execute(&mut **tx).await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::RowNotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl Transaction for PostgresTransaction {
    async fn insert_user(&mut self, user: &mut User) -> StoreResult<()> {
        let tx = self.conn()?;
        let row = sqlx::query(
            "INSERT INTO users (email, username, age, password_hash)
             VALUES ($1, $2, $3, $4)
             RETURNING id, created_at, updated_at",
        )
        .bind(&user.email)
        .bind(&user.username)
        .bind(user.age)
        .bind(&user.password_hash)
        .fetch_one(&mut **tx)
        .await?;

        user.id = row.try_get("id")?;
        user.created_at = row.try_get("created_at")?;
        user.updated_at = row.try_get("updated_at")?;
        Ok(())
    }

    async fn find_users(&mut self, filter: &UserFilter) -> StoreResult<Vec<User>> {
        let tx = self.conn()?;
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {USER_COLUMNS} FROM users"));
        let mut clauses = 0;
        if let Some(v) = filter.id {
            push_eq(&mut qb, &mut clauses, "id", v);
        }
        if let Some(v) = &filter.email {
            push_eq(&mut qb, &mut clauses, "email", v.clone());
        }
        if let Some(v) = &filter.username {
            push_eq(&mut qb, &mut clauses, "username", v.clone());
        }
        if let Some(v) = filter.age {
            push_eq(&mut qb, &mut clauses, "age", v);
        }
        qb.push(" ORDER BY id ASC");
        push_page(&mut qb, &filter.page);

        let rows = qb.build().fetch_all(&mut **tx).await?;
        Ok(rows.iter().map(user_from_row).collect::<Result<Vec<_>, _>>()?)
    }

    async fn update_user(&mut self, user: &mut User) -> StoreResult<()> {
        let tx = self.conn()?;
        let row = sqlx::query(
            "UPDATE users
             SET email = $1, username = $2, age = $3, password_hash = $4, updated_at = now()
             WHERE id = $5
             RETURNING updated_at",
        )
        .bind(&user.email)
        .bind(&user.username)
        .bind(user.age)
        .bind(&user.password_hash)
        .bind(user.id)
        .fetch_one(&mut **tx)
        .await?;

        user.updated_at = row.try_get("updated_at")?;
        Ok(())
    }

    async fn delete_user(&mut self, id: EntityId) -> StoreResult<()> {
        self.delete_by_id("users", id).await
    }

    async fn insert_game(&mut self, game: &mut Game) -> StoreResult<()> {
        let tx = self.conn()?;
        let row = sqlx::query(
            "INSERT INTO games (title, description, url, age_rating, publisher)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id, created_at, updated_at",
        )
        .bind(&game.title)
        .bind(&game.description)
        .bind(&game.url)
        .bind(game.age_rating)
        .bind(&game.publisher)
        .fetch_one(&mut **tx)
        .await?;

        game.id = row.try_get("id")?;
        game.created_at = row.try_get("created_at")?;
        game.updated_at = row.try_get("updated_at")?;
        Ok(())
    }

    async fn find_games(&mut self, filter: &GameFilter) -> StoreResult<Vec<Game>> {
        let tx = self.conn()?;
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {GAME_COLUMNS} FROM games"));
        let mut clauses = 0;
        if let Some(v) = filter.id {
            push_eq(&mut qb, &mut clauses, "id", v);
        }
        if let Some(v) = &filter.title {
            push_eq(&mut qb, &mut clauses, "title", v.clone());
        }
        if let Some(v) = &filter.description {
            push_eq(&mut qb, &mut clauses, "description", v.clone());
        }
        if let Some(v) = &filter.url {
            push_eq(&mut qb, &mut clauses, "url", v.clone());
        }
        if let Some(v) = filter.age_rating {
            push_eq(&mut qb, &mut clauses, "age_rating", v);
        }
        if let Some(v) = &filter.publisher {
            push_eq(&mut qb, &mut clauses, "publisher", v.clone());
        }
        qb.push(" ORDER BY created_at DESC, id DESC");
        push_page(&mut qb, &filter.page);

        let rows = qb.build().fetch_all(&mut **tx).await?;
        Ok(rows.iter().map(game_from_row).collect::<Result<Vec<_>, _>>()?)
    }

    async fn update_game(&mut self, game: &mut Game) -> StoreResult<()> {
        let tx = self.conn()?;
        let row = sqlx::query(
            "UPDATE games
             SET title = $1, description = $2, url = $3, age_rating = $4, publisher = $5,
                 updated_at = now()
             WHERE id = $6
             RETURNING updated_at",
        )
        .bind(&game.title)
        .bind(&game.description)
        .bind(&game.url)
        .bind(game.age_rating)
        .bind(&game.publisher)
        .bind(game.id)
        .fetch_one(&mut **tx)
        .await?;

        game.updated_at = row.try_get("updated_at")?;
        Ok(())
    }

    async fn delete_game(&mut self, id: EntityId) -> StoreResult<()> {
        self.delete_by_id("games", id).await
    }

    async fn insert_metadata(&mut self, md: &mut Metadata) -> StoreResult<()> {
        let tx = self.conn()?;
        let row = sqlx::query(
            "INSERT INTO metadata (player_id, played_game_id, play_time)
             VALUES ($1, $2, $3)
             RETURNING id, created_at, updated_at",
        )
        .bind(md.player_id)
        .bind(md.played_game_id)
        .bind(md.play_time)
        .fetch_one(&mut **tx)
        .await?;

        md.id = row.try_get("id")?;
        md.created_at = row.try_get("created_at")?;
        md.updated_at = row.try_get("updated_at")?;
        Ok(())
    }

    async fn find_metadata(&mut self, filter: &MetadataFilter) -> StoreResult<Vec<Metadata>> {
        let tx = self.conn()?;
        let mut qb =
            QueryBuilder::<Postgres>::new(format!("SELECT {METADATA_COLUMNS} FROM metadata"));
        let mut clauses = 0;
        if let Some(v) = filter.id {
            push_eq(&mut qb, &mut clauses, "id", v);
        }
        if let Some(v) = filter.player_id {
            push_eq(&mut qb, &mut clauses, "player_id", v);
        }
        if let Some(v) = filter.played_game_id {
            push_eq(&mut qb, &mut clauses, "played_game_id", v);
        }
        if let Some(v) = filter.play_time {
            push_eq(&mut qb, &mut clauses, "play_time", v);
        }
        qb.push(" ORDER BY created_at DESC, id DESC");
        push_page(&mut qb, &filter.page);

        let rows = qb.build().fetch_all(&mut **tx).await?;
        Ok(rows.iter().map(metadata_from_row).collect::<Result<Vec<_>, _>>()?)
    }

    async fn update_metadata(&mut self, md: &mut Metadata) -> StoreResult<()> {
        let tx = self.conn()?;
        let row = sqlx::query(
            "UPDATE metadata
             SET play_time = $1, updated_at = now()
             WHERE id = $2
             RETURNING updated_at",
        )
        .bind(md.play_time)
        .bind(md.id)
        .fetch_one(&mut **tx)
        .await?;

        md.updated_at = row.try_get("updated_at")?;
        Ok(())
    }

    async fn delete_metadata(&mut self, id: EntityId) -> StoreResult<()> {
        self.delete_by_id("metadata", id).await
    }

    async fn commit(&mut self) -> StoreResult<()> {
        let tx = self.tx.take().ok_or(StoreError::TransactionClosed)?;
        tx.commit().await?;
        Ok(())
    }

    async fn rollback(&mut self) -> StoreResult<()> {
        let tx = self.tx.take().ok_or(StoreError::TransactionClosed)?;
        tx.rollback().await?;
        Ok(())
    }
}

/// Appends `column = $n`, joined to earlier predicates with AND.
fn push_eq<'args, T>(
    qb: &mut QueryBuilder<'args, Postgres>,
    clauses: &mut usize,
    column: &str,
    value: T,
) where
    T: 'args + sqlx::Encode<'args, Postgres> + sqlx::Type<Postgres> + Send,
{
    qb.push(if *clauses == 0 { " WHERE " } else { " AND " });
    qb.push(column).push(" = ").push_bind(value);
    *clauses += 1;
}

fn push_page(qb: &mut QueryBuilder<'_, Postgres>, page: &Page) {
    if let Some(limit) = page.limit {
        qb.push(" LIMIT ").push_bind(i64::from(limit));
    }
    if let Some(offset) = page.offset {
        qb.push(" OFFSET ").push_bind(i64::from(offset));
    }
}

fn user_from_row(row: &PgRow) -> Result<User, sqlx::Error> {
    Ok(User {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        username: row.try_get("username")?,
        age: row.try_get("age")?,
        password_hash: row.try_get("password_hash")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn game_from_row(row: &PgRow) -> Result<Game, sqlx::Error> {
    Ok(Game {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        url: row.try_get("url")?,
        age_rating: row.try_get("age_rating")?,
        publisher: row.try_get("publisher")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn metadata_from_row(row: &PgRow) -> Result<Metadata, sqlx::Error> {
    Ok(Metadata {
        id: row.try_get("id")?,
        player_id: row.try_get("player_id")?,
        played_game_id: row.try_get("played_game_id")?,
        play_time: row.try_get("play_time")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
