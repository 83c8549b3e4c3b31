//! # Play Database Module
//!
//! SQLite schema and low-level helpers for the `plays` table — one row per
//! listening event imported from a streaming-service export. Deduplication
//! happens at the schema level: `(played_at, track_uri)` is unique and
//! inserts use `INSERT OR IGNORE`, so re-importing the same export is
//! harmless.
//!
//! ## Schema notes
//!
//! - `played_at` is an ISO 8601 UTC timestamp stored as TEXT; range queries
//!   compare lexicographically, which is correct for this format.
//! - `ms_played` is nullable: exports carry exact durations, other sources
//!   may not. Aggregations substitute
//!   [`crate::config::DEFAULT_MS_PER_PLAY`] for NULL.
//! - WAL journal mode is applied per connection for concurrent readers.

use anyhow::{Context, Result};
use log::debug;
use rusqlite::{params, Connection};
use std::path::Path;

/// Source tag for rows created by the export importer.
pub const SOURCE_IMPORT: &str = "import";

const DDL: &str = "
CREATE TABLE IF NOT EXISTS plays (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    played_at   TEXT    NOT NULL,
    track_uri   TEXT,
    track_name  TEXT,
    artist_name TEXT,
    album_name  TEXT,
    ms_played   INTEGER,
    source      TEXT    NOT NULL DEFAULT 'import',
    UNIQUE(played_at, track_uri)
);

CREATE INDEX IF NOT EXISTS idx_plays_played_at ON plays(played_at);
";

/// One listening event, shaped like a `plays` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Play {
    /// ISO 8601 UTC timestamp, e.g. `2024-01-06T21:03:11Z`.
    pub played_at: String,
    pub track_uri: Option<String>,
    pub track_name: Option<String>,
    pub artist_name: Option<String>,
    pub album_name: Option<String>,
    /// Exact played duration when known.
    pub ms_played: Option<i64>,
    /// Where the row came from; see [`SOURCE_IMPORT`].
    pub source: String,
}

/// Open (creating if necessary) the database at `path` with per-connection
/// pragmas applied.
pub fn open_connection(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)
        .with_context(|| format!("failed to open play database at {}", path.display()))?;
    // WAL mode must be set per-connection.
    conn.pragma_update(None, "journal_mode", "WAL")
        .context("failed to enable WAL journal mode")?;
    conn.pragma_update(None, "foreign_keys", "ON")
        .context("failed to enable foreign keys")?;
    Ok(conn)
}

/// Create tables and indexes if they don't exist. Safe to call every run.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(DDL)
        .context("failed to create plays schema")?;
    debug!("plays schema ensured");
    Ok(())
}

/// Insert a single play, ignoring duplicates.
///
/// Returns `true` when a row actually landed, `false` when the unique
/// constraint swallowed it.
pub fn insert_play(conn: &Connection, play: &Play) -> Result<bool> {
    let changed = conn
        .execute(
            "INSERT OR IGNORE INTO plays
                (played_at, track_uri, track_name, artist_name, album_name, ms_played, source)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                play.played_at,
                play.track_uri,
                play.track_name,
                play.artist_name,
                play.album_name,
                play.ms_played,
                play.source,
            ],
        )
        .with_context(|| format!("failed to insert play at {}", play.played_at))?;
    Ok(changed == 1)
}

/// Batch-insert plays inside a single transaction.
///
/// Returns the number of rows actually inserted (duplicates are skipped
/// silently).
pub fn insert_plays_batch(conn: &mut Connection, plays: &[Play]) -> Result<usize> {
    let tx = conn.transaction().context("failed to begin transaction")?;
    let mut inserted = 0;
    for play in plays {
        if insert_play(&tx, play)? {
            inserted += 1;
        }
    }
    tx.commit().context("failed to commit play batch")?;
    debug!("inserted {inserted} of {} plays", plays.len());
    Ok(inserted)
}

/// Total number of stored plays.
pub fn play_count(conn: &Connection) -> Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM plays", [], |row| row.get(0))
        .context("failed to count plays")
}
