//! Linking a player to a game.

use crate::app::transact;
use crate::domain::error::{ServiceError, ServiceResult};
use crate::domain::model::{GameFilter, Metadata, Page, UserFilter};
use crate::storage::Store;
use std::sync::Arc;

/// The only path that creates [`Metadata`] rows.
#[derive(Clone)]
pub struct LinkWorkflow {
    store: Arc<dyn Store>,
}

impl LinkWorkflow {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Resolves one user and one game (first match in each service's default
    /// order), checks `user.age >= game.age_rating`, and records a new link
    /// with zero play time. Everything happens in one transaction.
    ///
    /// No match on either side is `BadRequest`; a user below the rating is
    /// `InvalidUserAge` and nothing is written.
    pub async fn link(
        &self,
        mut user_selector: UserFilter,
        mut game_selector: GameFilter,
    ) -> ServiceResult<Metadata> {
        let first = Page {
            limit: Some(1),
            offset: None,
        };
        user_selector.page = first;
        game_selector.page = first;

        transact(self.store.as_ref(), move |tx| {
            Box::pin(async move {
                let user = tx
                    .find_users(&user_selector)
                    .await?
                    .into_iter()
                    .next()
                    .ok_or(ServiceError::BadRequest)?;
                let game = tx
                    .find_games(&game_selector)
                    .await?
                    .into_iter()
                    .next()
                    .ok_or(ServiceError::BadRequest)?;

                if user.age < game.age_rating {
                    tracing::debug!(
                        user_id = user.id,
                        game_id = game.id,
                        age = user.age,
                        age_rating = game.age_rating,
                        "link rejected by age rating"
                    );
                    return Err(ServiceError::InvalidUserAge);
                }

                let mut md = Metadata::link(user.id, game.id);
                tx.insert_metadata(&mut md).await?;
                Ok(md)
            })
        })
        .await
    }
}
