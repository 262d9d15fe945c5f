//! Entity definitions: the persisted records, the filters that select them and
//! the patches that overwrite them.

pub mod game;
pub mod metadata;
pub mod user;

pub use game::{Game, GameFilter, GamePatch};
pub use metadata::{Metadata, MetadataFilter, MetadataPatch};
pub use user::{Principal, User, UserFilter, UserPatch};

/// Row identifier assigned by the store.
pub type EntityId = i64;

/// Limit/offset pagination shared by every filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Page {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl Page {
    /// Applies the page to an already ordered sequence.
    pub fn apply<T>(&self, rows: Vec<T>) -> Vec<T> {
        let offset = self.offset.unwrap_or(0) as usize;
        let rows = rows.into_iter().skip(offset);
        match self.limit {
            Some(limit) => rows.take(limit as usize).collect(),
            None => rows.collect(),
        }
    }
}

/// `true` when the predicate is unconstrained or equals `actual`.
pub(crate) fn matches<T: PartialEq>(predicate: &Option<T>, actual: &T) -> bool {
    predicate.as_ref().map_or(true, |expected| expected == actual)
}
