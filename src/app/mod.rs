//! Entity services. Each public operation is exactly one store transaction.

pub mod game_service;
pub mod link_workflow;
pub mod metadata_service;
pub mod user_service;

pub use game_service::GameService;
pub use link_workflow::LinkWorkflow;
pub use metadata_service::MetadataService;
pub use user_service::UserService;

use crate::domain::error::ServiceResult;
use crate::storage::{with_transaction, BoxFuture, Store, Transaction};

/// [`with_transaction`] specialised to the service error type.
pub(crate) async fn transact<T, F>(store: &dyn Store, op: F) -> ServiceResult<T>
where
    T: Send,
    F: for<'t> FnOnce(&'t mut dyn Transaction) -> BoxFuture<'t, ServiceResult<T>> + Send,
{
    with_transaction(store, op).await
}
