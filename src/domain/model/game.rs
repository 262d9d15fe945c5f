use super::{matches, EntityId, Page};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Game {
    pub id: EntityId,
    pub title: String,
    pub description: String,
    pub url: String,
    pub age_rating: i32,
    pub publisher: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Game {
    pub fn new(title: impl Into<String>, age_rating: i32) -> Self {
        Self {
            id: 0,
            title: title.into(),
            description: String::new(),
            url: String::new(),
            age_rating,
            publisher: String::new(),
            created_at: DateTime::<Utc>::default(),
            updated_at: DateTime::<Utc>::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GameFilter {
    pub id: Option<EntityId>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub age_rating: Option<i32>,
    pub publisher: Option<String>,
    pub page: Page,
}

impl GameFilter {
    pub fn by_title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn has_predicates(&self) -> bool {
        self.id.is_some()
            || self.title.is_some()
            || self.description.is_some()
            || self.url.is_some()
            || self.age_rating.is_some()
            || self.publisher.is_some()
    }

    pub fn matches(&self, game: &Game) -> bool {
        matches(&self.id, &game.id)
            && matches(&self.title, &game.title)
            && matches(&self.description, &game.description)
            && matches(&self.url, &game.url)
            && matches(&self.age_rating, &game.age_rating)
            && matches(&self.publisher, &game.publisher)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GamePatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub age_rating: Option<i32>,
    pub publisher: Option<String>,
}

impl GamePatch {
    pub fn apply(&self, game: &mut Game) {
        if let Some(v) = &self.title {
            game.title = v.clone();
        }
        if let Some(v) = &self.description {
            game.description = v.clone();
        }
        if let Some(v) = &self.url {
            game.url = v.clone();
        }
        if let Some(v) = self.age_rating {
            game.age_rating = v;
        }
        if let Some(v) = &self.publisher {
            game.publisher = v.clone();
        }
    }
}
