//! # Listening Analytics Module
//!
//! Aggregate queries against the `plays` table: ranked artists and tracks,
//! daily and yearly totals, listening streaks, and the densified
//! [`TimeSeriesSet`] that drives the braille history chart.
//!
//! All functions borrow an open [`Connection`]; callers open one via
//! [`crate::db::open_connection`] and can run several queries on it. Plays
//! with NULL `ms_played` count as [`DEFAULT_MS_PER_PLAY`] in every duration
//! sum, and results carry an `estimated` flag when that substitution
//! happened.

use anyhow::{Context, Result};
use chrono::{Datelike, Duration, Local, NaiveDate, Utc};
use clap::ValueEnum;
use rusqlite::{Connection, ToSql};
use std::collections::HashMap;

use crate::chart::{Entity, TimeSeriesSet};
use crate::config::DEFAULT_MS_PER_PLAY;

/// SQL expression substituting the default duration for NULL `ms_played`.
fn ms_expr() -> String {
    format!("COALESCE(ms_played, {DEFAULT_MS_PER_PLAY})")
}

// ---------------------------------------------------------------------------
// Time ranges
// ---------------------------------------------------------------------------

/// Named look-back windows for the ranked queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TimeRange {
    /// Last 7 days.
    Week,
    /// Last 30 days.
    Month,
    /// Last 90 days.
    Quarter,
    /// Last 365 days.
    Year,
    /// No cutoff.
    All,
}

impl TimeRange {
    fn days(self) -> Option<i64> {
        match self {
            Self::Week => Some(7),
            Self::Month => Some(30),
            Self::Quarter => Some(90),
            Self::Year => Some(365),
            Self::All => None,
        }
    }

    /// Human label for headings.
    pub fn label(self) -> &'static str {
        match self {
            Self::Week => "7 days",
            Self::Month => "30 days",
            Self::Quarter => "90 days",
            Self::Year => "1 year",
            Self::All => "all time",
        }
    }

    /// UTC cutoff timestamp for this range, formatted to compare
    /// lexicographically against stored `played_at` values. `None` for
    /// [`TimeRange::All`].
    fn cutoff(self) -> Option<String> {
        self.days()
            .map(|d| (Utc::now() - Duration::days(d)).format("%Y-%m-%dT%H:%M:%SZ").to_string())
    }
}

// ---------------------------------------------------------------------------
// Result row types
// ---------------------------------------------------------------------------

/// One entry of the ranked-artists listing.
#[derive(Debug, Clone)]
pub struct ArtistStat {
    pub artist_name: String,
    pub play_count: i64,
    pub total_ms: i64,
    /// True when any aggregated play had an unknown duration.
    pub estimated: bool,
}

/// One entry of the ranked-tracks listing.
#[derive(Debug, Clone)]
pub struct TrackStat {
    pub track_name: Option<String>,
    pub artist_name: Option<String>,
    pub play_count: i64,
    pub total_ms: i64,
    pub estimated: bool,
}

/// Whole-year aggregate for the stats summary.
#[derive(Debug, Clone, Default)]
pub struct YearSummary {
    pub year: i32,
    pub total_plays: i64,
    pub total_ms: i64,
    pub unique_artists: i64,
    pub unique_tracks: i64,
}

/// Consecutive-day listening streaks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Streaks {
    pub current: i64,
    pub longest: i64,
}

/// Everything the `stats` CLI command prints.
#[derive(Debug)]
pub struct Summary {
    pub today_ms: i64,
    pub top_artists: Vec<ArtistStat>,
    pub top_tracks: Vec<TrackStat>,
    pub yearly: YearSummary,
    pub streaks: Streaks,
}

// ---------------------------------------------------------------------------
// Ranked queries
// ---------------------------------------------------------------------------

/// Artists ranked by total listening time within `range`.
pub fn top_artists(conn: &Connection, range: TimeRange, limit: usize) -> Result<Vec<ArtistStat>> {
    let cutoff = range.cutoff();
    let limit = limit as i64;

    let mut sql = format!(
        "SELECT artist_name,
                COUNT(*) AS play_count,
                SUM({expr}) AS total_ms,
                SUM(CASE WHEN ms_played IS NULL THEN 1 ELSE 0 END) > 0 AS has_estimates
         FROM plays
         WHERE artist_name IS NOT NULL",
        expr = ms_expr()
    );
    let mut params: Vec<&dyn ToSql> = Vec::new();
    if let Some(ref c) = cutoff {
        sql.push_str(" AND played_at >= ?");
        params.push(c);
    }
    sql.push_str(" GROUP BY artist_name ORDER BY total_ms DESC LIMIT ?");
    params.push(&limit);

    let mut stmt = conn.prepare(&sql).context("failed to prepare top-artists query")?;
    let rows = stmt
        .query_map(params.as_slice(), |row| {
            Ok(ArtistStat {
                artist_name: row.get(0)?,
                play_count: row.get(1)?,
                total_ms: row.get(2)?,
                estimated: row.get(3)?,
            })
        })
        .context("failed to run top-artists query")?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .context("failed to read top-artists rows")
}

/// Tracks ranked by total listening time within `range`.
pub fn top_tracks(conn: &Connection, range: TimeRange, limit: usize) -> Result<Vec<TrackStat>> {
    let cutoff = range.cutoff();
    let limit = limit as i64;

    let mut sql = format!(
        "SELECT track_name,
                artist_name,
                COUNT(*) AS play_count,
                SUM({expr}) AS total_ms,
                SUM(CASE WHEN ms_played IS NULL THEN 1 ELSE 0 END) > 0 AS has_estimates
         FROM plays
         WHERE track_name IS NOT NULL",
        expr = ms_expr()
    );
    let mut params: Vec<&dyn ToSql> = Vec::new();
    if let Some(ref c) = cutoff {
        sql.push_str(" AND played_at >= ?");
        params.push(c);
    }
    sql.push_str(" GROUP BY track_name, artist_name ORDER BY total_ms DESC LIMIT ?");
    params.push(&limit);

    let mut stmt = conn.prepare(&sql).context("failed to prepare top-tracks query")?;
    let rows = stmt
        .query_map(params.as_slice(), |row| {
            Ok(TrackStat {
                track_name: row.get(0)?,
                artist_name: row.get(1)?,
                play_count: row.get(2)?,
                total_ms: row.get(3)?,
                estimated: row.get(4)?,
            })
        })
        .context("failed to run top-tracks query")?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .context("failed to read top-tracks rows")
}

// ---------------------------------------------------------------------------
// Aggregates
// ---------------------------------------------------------------------------

/// Total ms listened on a given calendar day.
pub fn daily_listening_time(conn: &Connection, day: NaiveDate) -> Result<i64> {
    let total: Option<i64> = conn
        .query_row(
            &format!(
                "SELECT SUM({expr}) FROM plays WHERE date(played_at) = ?1",
                expr = ms_expr()
            ),
            [day.format("%Y-%m-%d").to_string()],
            |row| row.get(0),
        )
        .context("failed to query daily listening time")?;
    Ok(total.unwrap_or(0))
}

/// One row of a day listing: a single play with its metadata.
#[derive(Debug, Clone)]
pub struct DayPlay {
    pub played_at: String,
    pub track_name: Option<String>,
    pub artist_name: Option<String>,
    pub album_name: Option<String>,
    pub ms_played: Option<i64>,
}

/// Every play on a given calendar day, in listening order.
pub fn plays_on_day(conn: &Connection, day: NaiveDate) -> Result<Vec<DayPlay>> {
    let mut stmt = conn
        .prepare(
            "SELECT played_at, track_name, artist_name, album_name, ms_played
             FROM plays WHERE date(played_at) = ?1 ORDER BY played_at",
        )
        .context("failed to prepare day-listing query")?;
    let rows = stmt
        .query_map([day.format("%Y-%m-%d").to_string()], |row| {
            Ok(DayPlay {
                played_at: row.get(0)?,
                track_name: row.get(1)?,
                artist_name: row.get(2)?,
                album_name: row.get(3)?,
                ms_played: row.get(4)?,
            })
        })
        .context("failed to run day-listing query")?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .context("failed to read day-listing rows")
}

/// Summary stats for a full calendar year.
pub fn yearly_aggregate(conn: &Connection, year: i32) -> Result<YearSummary> {
    let start = format!("{year:04}-01-01");
    let end = format!("{year:04}-12-31");
    conn.query_row(
        &format!(
            "SELECT COUNT(*),
                    COALESCE(SUM({expr}), 0),
                    COUNT(DISTINCT artist_name),
                    COUNT(DISTINCT track_name)
             FROM plays
             WHERE date(played_at) BETWEEN ?1 AND ?2",
            expr = ms_expr()
        ),
        [start, end],
        |row| {
            Ok(YearSummary {
                year,
                total_plays: row.get(0)?,
                total_ms: row.get(1)?,
                unique_artists: row.get(2)?,
                unique_tracks: row.get(3)?,
            })
        },
    )
    .context("failed to query yearly aggregate")
}

/// Current and longest consecutive-day listening streaks, as of today.
pub fn streaks(conn: &Connection) -> Result<Streaks> {
    streaks_as_of(conn, Local::now().date_naive())
}

/// Streak computation with an explicit "today" so it can be tested without
/// wall-clock dependence. The current streak may end yesterday — not having
/// listened *yet* today doesn't break it.
pub fn streaks_as_of(conn: &Connection, today: NaiveDate) -> Result<Streaks> {
    let mut stmt = conn
        .prepare("SELECT DISTINCT date(played_at) AS day FROM plays ORDER BY day")
        .context("failed to prepare streaks query")?;
    let days = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .context("failed to run streaks query")?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("failed to read streak days")?;

    let days: Vec<NaiveDate> = days
        .iter()
        .map(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d"))
        .collect::<Result<_, _>>()
        .context("malformed date in plays table")?;
    if days.is_empty() {
        return Ok(Streaks::default());
    }

    let mut longest = 1;
    let mut run = 1;
    for pair in days.windows(2) {
        if (pair[1] - pair[0]).num_days() == 1 {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 1;
        }
    }

    let day_set: std::collections::HashSet<NaiveDate> = days.iter().copied().collect();
    let mut cursor = today;
    if !day_set.contains(&cursor) && day_set.contains(&(cursor - Duration::days(1))) {
        cursor -= Duration::days(1);
    }
    let mut current = 0;
    while day_set.contains(&cursor) {
        current += 1;
        cursor -= Duration::days(1);
    }

    Ok(Streaks {
        current,
        longest: longest.max(current),
    })
}

/// Aggregate summary used by the CLI stats command.
pub fn summary(conn: &Connection) -> Result<Summary> {
    let today = Local::now().date_naive();
    Ok(Summary {
        today_ms: daily_listening_time(conn, today)?,
        top_artists: top_artists(conn, TimeRange::Month, 10)?,
        top_tracks: top_tracks(conn, TimeRange::Month, 10)?,
        yearly: yearly_aggregate(conn, today.year())?,
        streaks: streaks(conn)?,
    })
}

// ---------------------------------------------------------------------------
// Historical chart data
// ---------------------------------------------------------------------------

/// Daily listening series for the top `limit` artists across all history,
/// shaped for the chart renderer.
///
/// The day axis covers *every* calendar day between the first and last
/// observed play; days an artist didn't play hold `0.0`, so each series
/// aligns positionally with the axis (the chart's hard precondition).
/// An empty database yields an empty set.
pub fn artist_daily_history(conn: &Connection, limit: usize) -> Result<TimeSeriesSet> {
    let bounds: (Option<String>, Option<String>) = conn
        .query_row(
            "SELECT MIN(date(played_at)), MAX(date(played_at)) FROM plays",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .context("failed to query play date bounds")?;
    let (Some(first), Some(last)) = bounds else {
        return Ok(TimeSeriesSet::default());
    };

    let start = NaiveDate::parse_from_str(&first, "%Y-%m-%d").context("malformed first play date")?;
    let end = NaiveDate::parse_from_str(&last, "%Y-%m-%d").context("malformed last play date")?;
    let n_days = (end - start).num_days() as usize + 1;
    let days: Vec<NaiveDate> = (0..n_days)
        .map(|i| start + Duration::days(i as i64))
        .collect();

    let mut stmt = conn
        .prepare(&format!(
            "SELECT artist_name, SUM({expr}) AS total_ms
             FROM plays WHERE artist_name IS NOT NULL
             GROUP BY artist_name ORDER BY total_ms DESC LIMIT ?1",
            expr = ms_expr()
        ))
        .context("failed to prepare top-artists-by-total query")?;
    let top: Vec<(String, i64)> = stmt
        .query_map([limit as i64], |row| Ok((row.get(0)?, row.get(1)?)))
        .context("failed to rank artists")?
        .collect::<rusqlite::Result<_>>()
        .context("failed to read ranked artists")?;
    if top.is_empty() {
        return Ok(TimeSeriesSet::default());
    }

    let band_index: HashMap<&str, usize> = top
        .iter()
        .enumerate()
        .map(|(i, (name, _))| (name.as_str(), i))
        .collect();
    let mut series = vec![vec![0.0_f64; n_days]; top.len()];

    let placeholders = vec!["?"; top.len()].join(",");
    let sql = format!(
        "SELECT artist_name, date(played_at) AS day, SUM({expr}) AS ms
         FROM plays WHERE artist_name IN ({placeholders})
         GROUP BY artist_name, day ORDER BY day",
        expr = ms_expr()
    );
    let mut stmt = conn
        .prepare(&sql)
        .context("failed to prepare per-day artist query")?;
    let name_params: Vec<&dyn ToSql> = top.iter().map(|(name, _)| name as &dyn ToSql).collect();
    let rows = stmt
        .query_map(name_params.as_slice(), |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
            ))
        })
        .context("failed to run per-day artist query")?;

    for row in rows {
        let (name, day, ms) = row.context("failed to read per-day artist row")?;
        let date = NaiveDate::parse_from_str(&day, "%Y-%m-%d").context("malformed play date")?;
        let day_idx = (date - start).num_days();
        if let (Some(&band), true) = (band_index.get(name.as_str()), day_idx >= 0) {
            if let Some(slot) = series[band].get_mut(day_idx as usize) {
                *slot = ms as f64;
            }
        }
    }

    let entities = top
        .into_iter()
        .zip(series)
        .map(|((name, total_ms), daily_ms)| Entity {
            name,
            total_ms,
            daily_ms,
        })
        .collect();

    Ok(TimeSeriesSet { days, entities })
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

/// Convert milliseconds to a human-readable string like `3h 42m`.
pub fn ms_to_human(ms: i64) -> String {
    let total_seconds = ms / 1000;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}
