//! In-process entity store.
//!
//! Honors the same contract as the Postgres backend (constraint names,
//! ordering, cascading deletes, rollback) so services and the HTTP surface can
//! run without a database. Transactions are serialized: `begin` takes the one
//! state lock and holds it until commit or rollback.

use crate::domain::model::{
    EntityId, Game, GameFilter, Metadata, MetadataFilter, User, UserFilter,
};
use crate::storage::{
    Store, StoreError, StoreResult, Transaction, USERS_EMAIL_KEY, USERS_USERNAME_KEY,
};
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    users: Vec<User>,
    games: Vec<Game>,
    metadata: Vec<Metadata>,
    last_id: EntityId,
    clock: DateTime<Utc>,
}

impl MemoryState {
    fn next_id(&mut self) -> EntityId {
        self.last_id += 1;
        self.last_id
    }

    /// Wall-clock time, forced to move forward between calls.
    fn now(&mut self) -> DateTime<Utc> {
        let now = Utc::now().max(self.clock + TimeDelta::microseconds(1));
        self.clock = now;
        now
    }

    fn check_user_unique(&self, user: &User) -> StoreResult<()> {
        let others = self.users.iter().filter(|u| u.id != user.id);
        for other in others {
            if other.email == user.email {
                return Err(unique(USERS_EMAIL_KEY));
            }
            if other.username == user.username {
                return Err(unique(USERS_USERNAME_KEY));
            }
        }
        Ok(())
    }
}

fn unique(constraint: &str) -> StoreError {
    StoreError::UniqueViolation {
        constraint: Some(constraint.to_string()),
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn Transaction>> {
        let guard = self.state.clone().lock_owned().await;
        let snapshot = guard.clone();
        Ok(Box::new(MemoryTransaction {
            guard: Some(guard),
            snapshot,
        }))
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

pub struct MemoryTransaction {
    guard: Option<OwnedMutexGuard<MemoryState>>,
    snapshot: MemoryState,
}

impl MemoryTransaction {
    fn state(&mut self) -> StoreResult<&mut MemoryState> {
        self.guard.as_deref_mut().ok_or(StoreError::TransactionClosed)
    }

    fn restore(&mut self) -> StoreResult<()> {
        let mut guard = self.guard.take().ok_or(StoreError::TransactionClosed)?;
        *guard = std::mem::take(&mut self.snapshot);
        Ok(())
    }
}

impl Drop for MemoryTransaction {
    // Dropped without commit: behave like a rollback.
    fn drop(&mut self) {
        let _ = self.restore();
    }
}

#[async_trait]
impl Transaction for MemoryTransaction {
    async fn insert_user(&mut self, user: &mut User) -> StoreResult<()> {
        let state = self.state()?;
        let mut row = user.clone();
        row.id = 0;
        state.check_user_unique(&row)?;
        row.id = state.next_id();
        row.created_at = state.now();
        row.updated_at = row.created_at;
        *user = row.clone();
        state.users.push(row);
        Ok(())
    }

    async fn find_users(&mut self, filter: &UserFilter) -> StoreResult<Vec<User>> {
        let state = self.state()?;
        let mut rows: Vec<User> = state
            .users
            .iter()
            .filter(|u| filter.matches(u))
            .cloned()
            .collect();
        rows.sort_by_key(|u| u.id);
        Ok(filter.page.apply(rows))
    }

    async fn update_user(&mut self, user: &mut User) -> StoreResult<()> {
        let state = self.state()?;
        state.check_user_unique(user)?;
        let now = state.now();
        let row = state
            .users
            .iter_mut()
            .find(|u| u.id == user.id)
            .ok_or(StoreError::RowNotFound)?;
        *row = User {
            created_at: row.created_at,
            updated_at: now,
            ..user.clone()
        };
        user.updated_at = now;
        Ok(())
    }

    async fn delete_user(&mut self, id: EntityId) -> StoreResult<()> {
        let state = self.state()?;
        let before = state.users.len();
        state.users.retain(|u| u.id != id);
        if state.users.len() == before {
            return Err(StoreError::RowNotFound);
        }
        state.metadata.retain(|md| md.player_id != id);
        Ok(())
    }

    async fn insert_game(&mut self, game: &mut Game) -> StoreResult<()> {
        let state = self.state()?;
        game.id = state.next_id();
        game.created_at = state.now();
        game.updated_at = game.created_at;
        state.games.push(game.clone());
        Ok(())
    }

    async fn find_games(&mut self, filter: &GameFilter) -> StoreResult<Vec<Game>> {
        let state = self.state()?;
        let mut rows: Vec<Game> = state
            .games
            .iter()
            .filter(|g| filter.matches(g))
            .cloned()
            .collect();
        rows.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(filter.page.apply(rows))
    }

    async fn update_game(&mut self, game: &mut Game) -> StoreResult<()> {
        let state = self.state()?;
        let now = state.now();
        let row = state
            .games
            .iter_mut()
            .find(|g| g.id == game.id)
            .ok_or(StoreError::RowNotFound)?;
        *row = Game {
            created_at: row.created_at,
            updated_at: now,
            ..game.clone()
        };
        game.updated_at = now;
        Ok(())
    }

    async fn delete_game(&mut self, id: EntityId) -> StoreResult<()> {
        let state = self.state()?;
        let before = state.games.len();
        state.games.retain(|g| g.id != id);
        if state.games.len() == before {
            return Err(StoreError::RowNotFound);
        }
        state.metadata.retain(|md| md.played_game_id != id);
        Ok(())
    }

    async fn insert_metadata(&mut self, md: &mut Metadata) -> StoreResult<()> {
        let state = self.state()?;
        if !state.users.iter().any(|u| u.id == md.player_id) {
            return Err(StoreError::ForeignKeyViolation {
                constraint: Some("metadata_player_id_fkey".to_string()),
            });
        }
        if !state.games.iter().any(|g| g.id == md.played_game_id) {
            return Err(StoreError::ForeignKeyViolation {
                constraint: Some("metadata_played_game_id_fkey".to_string()),
            });
        }
        md.id = state.next_id();
        md.created_at = state.now();
        md.updated_at = md.created_at;
        state.metadata.push(md.clone());
        Ok(())
    }

    async fn find_metadata(&mut self, filter: &MetadataFilter) -> StoreResult<Vec<Metadata>> {
        let state = self.state()?;
        let mut rows: Vec<Metadata> = state
            .metadata
            .iter()
            .filter(|md| filter.matches(md))
            .cloned()
            .collect();
        rows.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(filter.page.apply(rows))
    }

    async fn update_metadata(&mut self, md: &mut Metadata) -> StoreResult<()> {
        let state = self.state()?;
        let now = state.now();
        let row = state
            .metadata
            .iter_mut()
            .find(|r| r.id == md.id)
            .ok_or(StoreError::RowNotFound)?;
        row.play_time = md.play_time;
        row.updated_at = now;
        md.updated_at = now;
        Ok(())
    }

    async fn delete_metadata(&mut self, id: EntityId) -> StoreResult<()> {
        let state = self.state()?;
        let before = state.metadata.len();
        state.metadata.retain(|md| md.id != id);
        if state.metadata.len() == before {
            return Err(StoreError::RowNotFound);
        }
        Ok(())
    }

    async fn commit(&mut self) -> StoreResult<()> {
        self.guard.take().ok_or(StoreError::TransactionClosed)?;
        Ok(())
    }

    async fn rollback(&mut self) -> StoreResult<()> {
        self.restore()
    }
}
