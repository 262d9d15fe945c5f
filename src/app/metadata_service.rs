use crate::app::transact;
use crate::domain::error::ServiceResult;
use crate::domain::model::{EntityId, Metadata, MetadataFilter, MetadataPatch};
use crate::storage::Store;
use std::sync::Arc;

/// Play-session records. Shared by the request path and the traffic simulator.
#[derive(Clone)]
pub struct MetadataService {
    store: Arc<dyn Store>,
}

impl MetadataService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn create(&self, mut md: Metadata) -> ServiceResult<Metadata> {
        transact(self.store.as_ref(), move |tx| {
            Box::pin(async move {
                tx.insert_metadata(&mut md).await?;
                Ok(md)
            })
        })
        .await
    }

    pub async fn find(&self, filter: MetadataFilter) -> ServiceResult<Vec<Metadata>> {
        transact(self.store.as_ref(), move |tx| {
            Box::pin(async move { Ok(tx.find_metadata(&filter).await?) })
        })
        .await
    }

    /// Read-merge-write without a version check; see `UserService::update_one`.
    pub async fn update_one(&self, mut md: Metadata, patch: MetadataPatch) -> ServiceResult<Metadata> {
        patch.apply(&mut md);
        transact(self.store.as_ref(), move |tx| {
            Box::pin(async move {
                tx.update_metadata(&mut md).await?;
                Ok(md)
            })
        })
        .await
    }

    pub async fn delete_by_id(&self, id: EntityId) -> ServiceResult<()> {
        transact(self.store.as_ref(), move |tx| {
            Box::pin(async move { Ok(tx.delete_metadata(id).await?) })
        })
        .await
    }
}
