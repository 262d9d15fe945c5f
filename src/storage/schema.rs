//! Relational layout for the Postgres backend.

pub const CREATE_USERS: &str = "CREATE TABLE IF NOT EXISTS users (
    id BIGSERIAL PRIMARY KEY,
    email TEXT NOT NULL,
    username TEXT NOT NULL,
    age INTEGER NOT NULL CHECK (age >= 0),
    password_hash TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT users_email_key UNIQUE (email),
    CONSTRAINT users_username_key UNIQUE (username)
)";

pub const CREATE_GAMES: &str = "CREATE TABLE IF NOT EXISTS games (
    id BIGSERIAL PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    url TEXT NOT NULL DEFAULT '',
    age_rating INTEGER NOT NULL DEFAULT 0 CHECK (age_rating >= 0),
    publisher TEXT NOT NULL DEFAULT '',
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
)";

// Multiple rows per (player, game) pair are allowed on purpose.
pub const CREATE_METADATA: &str = "CREATE TABLE IF NOT EXISTS metadata (
    id BIGSERIAL PRIMARY KEY,
    player_id BIGINT NOT NULL REFERENCES users (id) ON DELETE CASCADE,
    played_game_id BIGINT NOT NULL REFERENCES games (id) ON DELETE CASCADE,
    play_time BIGINT NOT NULL DEFAULT 0 CHECK (play_time >= 0),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
)";

pub const CREATE_METADATA_PLAYER_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS metadata_player_id_idx ON metadata (player_id)";

/// Statements applied in order on startup. All are idempotent.
pub const STATEMENTS: &[&str] = &[
    CREATE_USERS,
    CREATE_GAMES,
    CREATE_METADATA,
    CREATE_METADATA_PLAYER_INDEX,
];
