pub const SCHEMA: &str = r#"
-- Users authenticate with a name and an argon2id password hash
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    email TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    created_at TEXT DEFAULT (datetime('now'))
);

-- Repositories map one-to-one onto storage buckets
CREATE TABLE IF NOT EXISTS repositories (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    view_name TEXT NOT NULL,
    name TEXT NOT NULL UNIQUE,    -- bucket name
    link TEXT NOT NULL UNIQUE,    -- public read-only link token
    created_at TEXT DEFAULT (datetime('now'))
);

-- Files are objects inside a repository bucket
CREATE TABLE IF NOT EXISTS files (
    id TEXT PRIMARY KEY,
    rep_id TEXT NOT NULL REFERENCES repositories(id) ON DELETE CASCADE,
    view_name TEXT NOT NULL,
    name TEXT NOT NULL,           -- object key
    download_link TEXT NOT NULL UNIQUE,
    created_at TEXT DEFAULT (datetime('now')),

    UNIQUE(rep_id, name)
);

CREATE INDEX IF NOT EXISTS idx_repositories_user ON repositories(user_id);
CREATE INDEX IF NOT EXISTS idx_files_repository ON files(rep_id);
"#;
