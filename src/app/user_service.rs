use crate::app::transact;
use crate::crypto::password::verify_password_or_dummy;
use crate::domain::error::{ServiceError, ServiceResult};
use crate::domain::model::{EntityId, User, UserFilter, UserPatch};
use crate::storage::{Store, StoreError, USERS_EMAIL_KEY, USERS_USERNAME_KEY};
use std::sync::Arc;

#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn Store>,
}

impl UserService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Inserts `user` and returns it with `id` and timestamps filled in.
    pub async fn create(&self, mut user: User) -> ServiceResult<User> {
        transact(self.store.as_ref(), move |tx| {
            Box::pin(async move {
                tx.insert_user(&mut user).await.map_err(map_write_error)?;
                Ok(user)
            })
        })
        .await
    }

    pub async fn find(&self, filter: UserFilter) -> ServiceResult<Vec<User>> {
        transact(self.store.as_ref(), move |tx| {
            Box::pin(async move { Ok(tx.find_users(&filter).await?) })
        })
        .await
    }

    /// First user matching `filter`, or `NotFound`.
    pub async fn find_one(&self, mut filter: UserFilter) -> ServiceResult<User> {
        filter.page.limit = Some(1);
        self.find(filter)
            .await?
            .into_iter()
            .next()
            .ok_or(ServiceError::NotFound)
    }

    pub async fn by_id(&self, id: EntityId) -> ServiceResult<User> {
        self.find_one(UserFilter::by_id(id)).await
    }

    pub async fn by_email(&self, email: &str) -> ServiceResult<User> {
        self.find_one(UserFilter::by_email(email)).await
    }

    pub async fn by_username(&self, username: &str) -> ServiceResult<User> {
        self.find_one(UserFilter::by_username(username)).await
    }

    /// Resolves the user owning `email` and checks `password` against the
    /// stored hash.
    ///
    /// An unknown email and a wrong password both yield `Unauthorized`, so the
    /// caller cannot probe which emails are registered.
    pub async fn authenticate(&self, email: &str, password: &str) -> ServiceResult<User> {
        let user = match self.by_email(email).await {
            Ok(user) => Some(user),
            Err(ServiceError::NotFound) => None,
            Err(other) => return Err(other),
        };

        // An unknown email still pays for one argon2 verification.
        let password = password.to_owned();
        let hash = user.as_ref().map(|u| u.password_hash.clone());
        let verified = tokio::task::spawn_blocking(move || {
            verify_password_or_dummy(&password, hash.as_deref())
        })
        .await
        .map_err(ServiceError::internal)?;

        match user {
            Some(user) if verified => Ok(user),
            _ => Err(ServiceError::Unauthorized),
        }
    }

    /// Applies `patch` onto the `user` snapshot and writes the whole row.
    ///
    /// No version check: a concurrent writer to the same row may be
    /// overwritten (last writer wins).
    pub async fn update_one(&self, mut user: User, patch: UserPatch) -> ServiceResult<User> {
        patch.apply(&mut user);
        transact(self.store.as_ref(), move |tx| {
            Box::pin(async move {
                tx.update_user(&mut user).await.map_err(map_write_error)?;
                Ok(user)
            })
        })
        .await
    }

    pub async fn delete_by_id(&self, id: EntityId) -> ServiceResult<()> {
        transact(self.store.as_ref(), move |tx| {
            Box::pin(async move { Ok(tx.delete_user(id).await?) })
        })
        .await
    }

    /// Deletes every user matching `filter` in one transaction and returns
    /// their ids. Nothing matching is `NotFound`.
    pub async fn delete_matching(&self, filter: UserFilter) -> ServiceResult<Vec<EntityId>> {
        transact(self.store.as_ref(), move |tx| {
            Box::pin(async move {
                let users = tx.find_users(&filter).await?;
                if users.is_empty() {
                    return Err(ServiceError::NotFound);
                }
                let mut deleted = Vec::with_capacity(users.len());
                for user in users {
                    tx.delete_user(user.id).await?;
                    deleted.push(user.id);
                }
                Ok(deleted)
            })
        })
        .await
    }
}

/// Unique violations become domain errors only when the store names the
/// violated constraint.
fn map_write_error(err: StoreError) -> ServiceError {
    match &err {
        StoreError::UniqueViolation {
            constraint: Some(name),
        } if name == USERS_EMAIL_KEY => ServiceError::DuplicateEmail,
        StoreError::UniqueViolation {
            constraint: Some(name),
        } if name == USERS_USERNAME_KEY => ServiceError::DuplicateUsername,
        _ => err.into(),
    }
}
