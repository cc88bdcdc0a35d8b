//! SQL schema definitions.

/// Current schema: secrets keyed by provider id, catalog keyed by provider id.
pub const SCHEMA_V2: &str = r#"
-- ============================================================
-- Secret records (one per provider id)
-- ============================================================

CREATE TABLE IF NOT EXISTS secrets (
    provider_id TEXT PRIMARY KEY,
    encrypted INTEGER NOT NULL DEFAULT 0,
    secret BLOB NOT NULL,
    iv BLOB,
    salt BLOB,
    iterations INTEGER,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

-- ============================================================
-- Cached model catalogs (one per provider id)
-- ============================================================

CREATE TABLE IF NOT EXISTS catalog (
    provider_id TEXT PRIMARY KEY,
    models TEXT NOT NULL,
    fetched_at INTEGER NOT NULL,
    ttl_ms INTEGER NOT NULL
);
"#;

/// Legacy v1 schema: a single secret record with no provider keying.
/// Kept only so tests can construct a pre-upgrade database.
pub const SCHEMA_V1: &str = r#"
CREATE TABLE IF NOT EXISTS secret (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    encrypted INTEGER NOT NULL DEFAULT 0,
    secret BLOB NOT NULL,
    iv BLOB,
    salt BLOB,
    iterations INTEGER,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);
"#;
