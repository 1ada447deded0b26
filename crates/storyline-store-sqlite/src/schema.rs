//! SQL schema for the Storyline SQLite store.
//!
//! Ownership is expressed with foreign keys. Deleting a story removes its
//! pages, choices, sessions and completions. Deleting a page removes the
//! choices touching it; sessions standing on it lose their position and
//! completions of it are kept.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS stories (
    story_id      TEXT PRIMARY KEY,
    title         TEXT NOT NULL,
    description   TEXT,
    author        TEXT,
    status        TEXT NOT NULL DEFAULT 'draft',  -- 'draft' | 'published' | 'suspended'
    tags          TEXT NOT NULL DEFAULT '[]',     -- JSON array
    start_page_id TEXT REFERENCES pages(page_id) ON DELETE SET NULL,
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS pages (
    page_id      TEXT PRIMARY KEY,
    story_id     TEXT NOT NULL REFERENCES stories(story_id) ON DELETE CASCADE,
    page_key     TEXT NOT NULL,
    content      TEXT NOT NULL,
    is_ending    INTEGER NOT NULL DEFAULT 0,
    ending_label TEXT,
    created_at   TEXT NOT NULL,
    UNIQUE (story_id, page_key)
);

-- Both endpoints are pages of the same story; enforced on write.
CREATE TABLE IF NOT EXISTS choices (
    choice_id    TEXT PRIMARY KEY,
    from_page_id TEXT NOT NULL REFERENCES pages(page_id) ON DELETE CASCADE,
    to_page_id   TEXT NOT NULL REFERENCES pages(page_id) ON DELETE CASCADE,
    choice_text  TEXT NOT NULL,
    choice_order INTEGER NOT NULL DEFAULT 0,
    time_change  INTEGER NOT NULL DEFAULT 0,
    created_at   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS sessions (
    session_id      TEXT PRIMARY KEY,
    story_id        TEXT NOT NULL REFERENCES stories(story_id) ON DELETE CASCADE,
    current_page_id TEXT REFERENCES pages(page_id) ON DELETE SET NULL,  -- NULL once the page is deleted
    reader          TEXT,
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS completions (
    completion_id  TEXT PRIMARY KEY,
    story_id       TEXT NOT NULL REFERENCES stories(story_id) ON DELETE CASCADE,
    ending_page_id TEXT NOT NULL,  -- not a foreign key: outlives the page
    reader         TEXT,
    recorded_at    TEXT NOT NULL
);

-- Anonymous readers share one identity.
CREATE UNIQUE INDEX IF NOT EXISTS completions_once
    ON completions(story_id, ending_page_id, COALESCE(reader, ''));

CREATE INDEX IF NOT EXISTS pages_story_idx     ON pages(story_id);
CREATE INDEX IF NOT EXISTS choices_from_idx    ON choices(from_page_id);
CREATE INDEX IF NOT EXISTS choices_to_idx      ON choices(to_page_id);
CREATE INDEX IF NOT EXISTS sessions_story_idx  ON sessions(story_id);
CREATE INDEX IF NOT EXISTS sessions_page_idx   ON sessions(current_page_id);
CREATE INDEX IF NOT EXISTS stories_start_idx   ON stories(start_page_id);

PRAGMA user_version = 1;
";
