//! SQL schema for the fieldtrack SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! the `PRAGMA user_version` number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS surveyors (
    surveyor_id   TEXT PRIMARY KEY,
    name          TEXT NOT NULL,
    city          TEXT,
    project       TEXT,
    username      TEXT NOT NULL UNIQUE,
    password_hash TEXT              -- argon2 PHC string; NULL until provisioned
);

-- Location samples are strictly append-only.
-- No UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS location_track (
    sample_id   INTEGER PRIMARY KEY AUTOINCREMENT,
    surveyor_id TEXT NOT NULL REFERENCES surveyors(surveyor_id),
    latitude    REAL NOT NULL,
    longitude   REAL NOT NULL,
    timestamp   TEXT NOT NULL,     -- RFC 3339 UTC; client event time
    geom        TEXT               -- JSON-encoded WGS 84 point or NULL
);

CREATE INDEX IF NOT EXISTS track_surveyor_ts_idx
    ON location_track(surveyor_id, timestamp);

PRAGMA user_version = 1;
";
