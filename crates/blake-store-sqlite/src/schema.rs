//! SQL schema for the Blake Vision SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    user_id       TEXT PRIMARY KEY,
    email         TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,    -- argon2 PHC string
    created_at    TEXT NOT NULL
);

-- Only the SHA-256 digest of a bearer token is stored.
CREATE TABLE IF NOT EXISTS sessions (
    token_hash  TEXT PRIMARY KEY,
    user_id     TEXT NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    created_at  TEXT NOT NULL,
    expires_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS universes (
    universe_id TEXT PRIMARY KEY,
    owner_id    TEXT NOT NULL,
    name        TEXT NOT NULL,
    description TEXT,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS worlds (
    world_id     TEXT PRIMARY KEY,
    universe_id  TEXT NOT NULL REFERENCES universes(universe_id) ON DELETE CASCADE,
    owner_id     TEXT NOT NULL,
    name         TEXT NOT NULL,
    description  TEXT,
    is_root      INTEGER NOT NULL DEFAULT 0,
    has_episodes INTEGER NOT NULL DEFAULT 0,
    prefix       TEXT NOT NULL,
    order_index  INTEGER NOT NULL,
    created_at   TEXT NOT NULL,
    updated_at   TEXT NOT NULL,
    UNIQUE (owner_id, prefix)
);

CREATE UNIQUE INDEX IF NOT EXISTS worlds_root_idx
    ON worlds(universe_id) WHERE is_root = 1;

-- owner_id and universe_id are both NULL for base categories.
CREATE TABLE IF NOT EXISTS categories (
    category_id TEXT PRIMARY KEY,
    universe_id TEXT REFERENCES universes(universe_id) ON DELETE CASCADE,
    owner_id    TEXT,
    slug        TEXT NOT NULL,
    label       TEXT NOT NULL,
    description TEXT,
    prefix      TEXT NOT NULL,
    created_at  TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS categories_slug_idx
    ON categories(COALESCE(universe_id, ''), slug);
CREATE UNIQUE INDEX IF NOT EXISTS categories_prefix_idx
    ON categories(owner_id, prefix) WHERE owner_id IS NOT NULL;

CREATE TABLE IF NOT EXISTS episodes (
    episode_id TEXT PRIMARY KEY,
    owner_id   TEXT NOT NULL,
    world_id   TEXT NOT NULL REFERENCES worlds(world_id) ON DELETE CASCADE,
    number     INTEGER NOT NULL CHECK (number >= 1),
    title      TEXT,
    created_at TEXT NOT NULL,
    UNIQUE (world_id, number)
);

CREATE TABLE IF NOT EXISTS fichas (
    ficha_id       TEXT PRIMARY KEY,
    owner_id       TEXT NOT NULL,
    universe_id    TEXT NOT NULL REFERENCES universes(universe_id) ON DELETE CASCADE,
    world_id       TEXT REFERENCES worlds(world_id) ON DELETE CASCADE,
    category       TEXT NOT NULL,   -- category slug
    title          TEXT NOT NULL,
    code           TEXT NOT NULL,
    summary        TEXT,
    content        TEXT,
    tags           TEXT NOT NULL DEFAULT '[]',
    diegetic_year  INTEGER,
    temporal_layer TEXT,
    episode_id     TEXT REFERENCES episodes(episode_id) ON DELETE SET NULL,
    images         TEXT NOT NULL DEFAULT '[]',
    embedding      TEXT,            -- JSON array of f32 or NULL
    created_at     TEXT NOT NULL,
    updated_at     TEXT NOT NULL,
    UNIQUE (owner_id, code)
);

-- At most one sinopse per (world, episode).
CREATE UNIQUE INDEX IF NOT EXISTS fichas_sinopse_idx
    ON fichas(world_id, episode_id)
    WHERE category = 'sinopse' AND episode_id IS NOT NULL;

CREATE INDEX IF NOT EXISTS fichas_universe_idx ON fichas(owner_id, universe_id);
CREATE INDEX IF NOT EXISTS fichas_world_idx    ON fichas(world_id);

CREATE TABLE IF NOT EXISTS relations (
    relation_id   TEXT PRIMARY KEY,
    owner_id      TEXT NOT NULL,
    source_id     TEXT NOT NULL REFERENCES fichas(ficha_id) ON DELETE CASCADE,
    target_id     TEXT NOT NULL REFERENCES fichas(ficha_id) ON DELETE CASCADE,
    relation_type TEXT NOT NULL,
    description   TEXT,
    created_at    TEXT NOT NULL,
    UNIQUE (source_id, target_id, relation_type),
    CHECK  (source_id != target_id)
);

CREATE INDEX IF NOT EXISTS relations_source_idx ON relations(source_id);
CREATE INDEX IF NOT EXISTS relations_target_idx ON relations(target_id);

PRAGMA user_version = 1;
";

/// Base categories are seeded with fixed ids so reopening a database never
/// duplicates them.
pub const SEED_BASE_CATEGORY: &str = "
INSERT OR IGNORE INTO categories
    (category_id, universe_id, owner_id, slug, label, description, prefix, created_at)
VALUES (?1, NULL, NULL, ?2, ?3, ?4, ?5, ?6)";
