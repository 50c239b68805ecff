/// Schema for the offline tables.
pub const SCHEMA: &str = r#"
-- Mutations waiting to be replayed, in insertion order
CREATE TABLE IF NOT EXISTS pending_requests (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    path TEXT NOT NULL,
    method TEXT NOT NULL,
    body TEXT,
    created_at INTEGER NOT NULL
);

-- Last-known-good payload per read signature
CREATE TABLE IF NOT EXISTS cached_responses (
    cache_key TEXT PRIMARY KEY,
    payload TEXT NOT NULL,
    cached_at INTEGER NOT NULL
);
"#;
