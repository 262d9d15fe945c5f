use crate::app::transact;
use crate::domain::error::{ServiceError, ServiceResult};
use crate::domain::model::{EntityId, Game, GameFilter, GamePatch};
use crate::storage::Store;
use std::sync::Arc;

#[derive(Clone)]
pub struct GameService {
    store: Arc<dyn Store>,
}

impl GameService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn create(&self, mut game: Game) -> ServiceResult<Game> {
        transact(self.store.as_ref(), move |tx| {
            Box::pin(async move {
                tx.insert_game(&mut game).await?;
                Ok(game)
            })
        })
        .await
    }

    /// Matching games, most recently created first.
    pub async fn find(&self, filter: GameFilter) -> ServiceResult<Vec<Game>> {
        transact(self.store.as_ref(), move |tx| {
            Box::pin(async move { Ok(tx.find_games(&filter).await?) })
        })
        .await
    }

    pub async fn update_one(&self, mut game: Game, patch: GamePatch) -> ServiceResult<Game> {
        patch.apply(&mut game);
        transact(self.store.as_ref(), move |tx| {
            Box::pin(async move {
                tx.update_game(&mut game).await?;
                Ok(game)
            })
        })
        .await
    }

    /// Patches the first game matching `filter` (read and write share one
    /// transaction).
    pub async fn update_first(&self, mut filter: GameFilter, patch: GamePatch) -> ServiceResult<Game> {
        filter.page.limit = Some(1);
        transact(self.store.as_ref(), move |tx| {
            Box::pin(async move {
                let mut game = tx
                    .find_games(&filter)
                    .await?
                    .into_iter()
                    .next()
                    .ok_or(ServiceError::NotFound)?;
                patch.apply(&mut game);
                tx.update_game(&mut game).await?;
                Ok(game)
            })
        })
        .await
    }

    pub async fn delete_by_id(&self, id: EntityId) -> ServiceResult<()> {
        transact(self.store.as_ref(), move |tx| {
            Box::pin(async move { Ok(tx.delete_game(id).await?) })
        })
        .await
    }

    pub async fn delete_matching(&self, filter: GameFilter) -> ServiceResult<Vec<EntityId>> {
        transact(self.store.as_ref(), move |tx| {
            Box::pin(async move {
                let games = tx.find_games(&filter).await?;
                if games.is_empty() {
                    return Err(ServiceError::NotFound);
                }
                let mut deleted = Vec::with_capacity(games.len());
                for game in games {
                    tx.delete_game(game.id).await?;
                    deleted.push(game.id);
                }
                Ok(deleted)
            })
        })
        .await
    }
}
