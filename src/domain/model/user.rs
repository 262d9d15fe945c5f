use super::{matches, EntityId, Page};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: EntityId,
    pub email: String,
    pub username: String,
    pub age: i32,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// A user that has not been persisted yet; the store fills in `id` and
    /// both timestamps on insert.
    pub fn new(
        email: impl Into<String>,
        username: impl Into<String>,
        age: i32,
        password_hash: impl Into<String>,
    ) -> Self {
        Self {
            id: 0,
            email: email.into(),
            username: username.into(),
            age,
            password_hash: password_hash.into(),
            created_at: DateTime::<Utc>::default(),
            updated_at: DateTime::<Utc>::default(),
        }
    }
}

/// Equality predicates over users. Absent fields impose no constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFilter {
    pub id: Option<EntityId>,
    pub email: Option<String>,
    pub username: Option<String>,
    pub age: Option<i32>,
    pub page: Page,
}

impl UserFilter {
    pub fn by_id(id: EntityId) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }

    pub fn by_email(email: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            ..Self::default()
        }
    }

    pub fn by_username(username: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            ..Self::default()
        }
    }

    pub fn has_predicates(&self) -> bool {
        self.id.is_some() || self.email.is_some() || self.username.is_some() || self.age.is_some()
    }

    pub fn matches(&self, user: &User) -> bool {
        matches(&self.id, &user.id)
            && matches(&self.email, &user.email)
            && matches(&self.username, &user.username)
            && matches(&self.age, &user.age)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserPatch {
    pub email: Option<String>,
    pub username: Option<String>,
    pub age: Option<i32>,
    pub password_hash: Option<String>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.username.is_none()
            && self.age.is_none()
            && self.password_hash.is_none()
    }

    /// Overwrites the fields present in the patch.
    pub fn apply(&self, user: &mut User) {
        if let Some(v) = &self.email {
            user.email = v.clone();
        }
        if let Some(v) = &self.username {
            user.username = v.clone();
        }
        if let Some(v) = self.age {
            user.age = v;
        }
        if let Some(v) = &self.password_hash {
            user.password_hash = v.clone();
        }
    }
}

/// The identity attached to a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    Anonymous,
    Authenticated(User),
}

impl Principal {
    pub fn is_anonymous(&self) -> bool {
        matches!(self, Self::Anonymous)
    }

    pub fn user(&self) -> Option<&User> {
        match self {
            Self::Anonymous => None,
            Self::Authenticated(user) => Some(user),
        }
    }
}
