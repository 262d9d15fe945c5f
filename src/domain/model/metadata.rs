use super::{matches, EntityId, Page};
use chrono::{DateTime, Utc};

/// Play-session record joining a player and a game. Play time is in minutes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    pub id: EntityId,
    pub player_id: EntityId,
    pub played_game_id: EntityId,
    pub play_time: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Metadata {
    /// A fresh link between a player and a game, with no play time yet.
    pub fn link(player_id: EntityId, played_game_id: EntityId) -> Self {
        Self {
            id: 0,
            player_id,
            played_game_id,
            play_time: 0,
            created_at: DateTime::<Utc>::default(),
            updated_at: DateTime::<Utc>::default(),
        }
    }

    /// Play time rendered as hours and minutes, e.g. `2 h 5 min`.
    pub fn play_time_display(&self) -> String {
        let hours = self.play_time / 60;
        let minutes = self.play_time % 60;
        match (hours, minutes) {
            (0, m) if m > 0 => format!("{m} min"),
            (0, _) => "No data".to_string(),
            (h, 0) => format!("{h} h"),
            (h, m) => format!("{h} h {m} min"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataFilter {
    pub id: Option<EntityId>,
    pub player_id: Option<EntityId>,
    pub played_game_id: Option<EntityId>,
    pub play_time: Option<i64>,
    pub page: Page,
}

impl MetadataFilter {
    pub fn for_player(player_id: EntityId) -> Self {
        Self {
            player_id: Some(player_id),
            ..Self::default()
        }
    }

    pub fn matches(&self, md: &Metadata) -> bool {
        matches(&self.id, &md.id)
            && matches(&self.player_id, &md.player_id)
            && matches(&self.played_game_id, &md.played_game_id)
            && matches(&self.play_time, &md.play_time)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataPatch {
    pub play_time: Option<i64>,
}

impl MetadataPatch {
    pub fn apply(&self, md: &mut Metadata) {
        if let Some(v) = self.play_time {
            md.play_time = v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_play_time(play_time: i64) -> Metadata {
        Metadata {
            play_time,
            ..Metadata::link(1, 1)
        }
    }

    #[test]
    fn play_time_display_covers_hours_and_minutes() {
        assert_eq!(with_play_time(0).play_time_display(), "No data");
        assert_eq!(with_play_time(45).play_time_display(), "45 min");
        assert_eq!(with_play_time(120).play_time_display(), "2 h");
        assert_eq!(with_play_time(125).play_time_display(), "2 h 5 min");
    }
}
