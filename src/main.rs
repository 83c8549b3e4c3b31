//! # Replay - Personal Listening Analytics
//!
//! Replay keeps your full streaming listening history in a local SQLite
//! database and answers questions about it: ranked artists and tracks,
//! daily and yearly totals, streaks, and an interactive braille chart of
//! your listening over the years.
//!
//! ## Architecture
//!
//! - `cli`: Command-line interface definitions
//! - `db`: SQLite play database and schema
//! - `importer`: Spotify Extended Streaming History import
//! - `stats`: Analytics queries and aggregates
//! - `chart`: Pure braille chart renderer
//! - `tui`: Interactive terminal host for the chart
//! - `config`: Data directory management
//!
//! ## Usage
//!
//! ```bash
//! # Load your streaming export
//! replay import ~/Downloads/my_spotify_data
//!
//! # Summary stats
//! replay stats
//!
//! # Ranked listings
//! replay top artists --range year
//! replay top tracks --limit 50
//!
//! # Every play of one day
//! replay day --date 2024-01-06
//!
//! # Interactive history chart
//! replay history
//! ```

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{CommandFactory, Parser};
use log::info;

use replay::{cli, completion, config, db, importer, stats, tui};

/// Main entry point for the Replay application.
///
/// Initializes logging, parses command-line arguments, and routes commands
/// to the appropriate module functions. All operations return Results for
/// consistent error handling throughout the application.
///
/// # Logging
///
/// Initializes environment logger which can be controlled via `RUST_LOG`:
/// - `RUST_LOG=debug replay command` - Enable debug logging
/// - `RUST_LOG=replay::importer=trace replay import ...` - Module-specific logging
fn main() -> Result<()> {
    env_logger::init();

    let args = cli::Args::parse();

    match args.command {
        cli::Command::Import { path } => {
            info!("importing streaming history from: {}", path.display());
            let mut conn = db::open_connection(&config::get_db_path()?)?;
            db::init_db(&conn)?;
            let report = importer::import_history(&mut conn, &path)?;
            println!(
                "Imported {} plays ({} records parsed, {} skipped as duplicates or too short)",
                report.inserted,
                report.parsed,
                report.parsed - report.inserted
            );
        }
        cli::Command::Stats { year } => {
            let conn = db::open_connection(&config::get_db_path()?)?;
            db::init_db(&conn)?;
            print_stats(&conn, year)?;
        }
        cli::Command::Top { what, range, limit } => {
            let conn = db::open_connection(&config::get_db_path()?)?;
            db::init_db(&conn)?;
            print_top(&conn, what, range, limit)?;
        }
        cli::Command::Day { date } => {
            let conn = db::open_connection(&config::get_db_path()?)?;
            db::init_db(&conn)?;
            let day: NaiveDate = match date {
                Some(d) => d
                    .parse()
                    .with_context(|| format!("invalid date {d:?}, expected YYYY-MM-DD"))?,
                None => chrono::Local::now().date_naive(),
            };
            print_day(&conn, day)?;
        }
        cli::Command::History => {
            tui::run()?;
        }
        cli::Command::Completion { shell } => {
            let mut cmd = cli::Args::command();
            completion::generate_completions(completion::shell_to_completion_shell(&shell), &mut cmd);
        }
    }

    Ok(())
}

/// Print the summary stats sections: today, streaks, year, top listings.
fn print_stats(conn: &rusqlite::Connection, year: Option<i32>) -> Result<()> {
    let s = stats::summary(conn)?;
    let yearly = match year {
        Some(y) if y != s.yearly.year => stats::yearly_aggregate(conn, y)?,
        _ => s.yearly,
    };

    println!("── Today ──────────────────────────────");
    println!("Listened: {}", stats::ms_to_human(s.today_ms));

    println!();
    println!("── Streaks ────────────────────────────");
    println!(
        "Current: {} days  |  Longest: {} days",
        s.streaks.current, s.streaks.longest
    );

    println!();
    println!("── {} Summary ───────────────────────", yearly.year);
    println!(
        "Total: {}  ({} plays, {} artists, {} tracks)",
        stats::ms_to_human(yearly.total_ms),
        yearly.total_plays,
        yearly.unique_artists,
        yearly.unique_tracks
    );

    println!();
    println!("── Top Artists — Last 30 Days ─────────");
    for (i, artist) in s.top_artists.iter().enumerate() {
        println!(
            "{:>3}  {:<32} {:>6}  {:>9}{}",
            i + 1,
            artist.artist_name,
            artist.play_count,
            stats::ms_to_human(artist.total_ms),
            if artist.estimated { " ~" } else { "" }
        );
    }

    println!();
    println!("── Top Tracks — Last 30 Days ──────────");
    for (i, track) in s.top_tracks.iter().enumerate() {
        println!(
            "{:>3}  {:<32} {:<24} {:>6}  {:>9}{}",
            i + 1,
            track.track_name.as_deref().unwrap_or("—"),
            track.artist_name.as_deref().unwrap_or("—"),
            track.play_count,
            stats::ms_to_human(track.total_ms),
            if track.estimated { " ~" } else { "" }
        );
    }

    Ok(())
}

/// Print every play of one day with its time, metadata, and duration.
fn print_day(conn: &rusqlite::Connection, day: NaiveDate) -> Result<()> {
    let plays = stats::plays_on_day(conn, day)?;
    println!("── Plays on {day} ────────────────────");
    if plays.is_empty() {
        println!("No plays recorded.");
        return Ok(());
    }
    for play in &plays {
        let time = play.played_at.get(11..16).unwrap_or("--:--");
        println!(
            "{}  {:<32} {:<24} {:<24} {:>9}{}",
            time,
            play.track_name.as_deref().unwrap_or("—"),
            play.artist_name.as_deref().unwrap_or("—"),
            play.album_name.as_deref().unwrap_or("—"),
            stats::ms_to_human(play.ms_played.unwrap_or(config::DEFAULT_MS_PER_PLAY)),
            if play.ms_played.is_none() { " ~" } else { "" }
        );
    }
    println!();
    println!(
        "Total: {} over {} plays",
        stats::ms_to_human(stats::daily_listening_time(conn, day)?),
        plays.len()
    );
    Ok(())
}

/// Print one ranked listing.
fn print_top(
    conn: &rusqlite::Connection,
    what: cli::TopKind,
    range: stats::TimeRange,
    limit: usize,
) -> Result<()> {
    match what {
        cli::TopKind::Artists => {
            println!("Top Artists — {}", range.label());
            println!("{:>3}  {:<40} {:>6}  {:>9}", "#", "Artist", "Plays", "Time");
            for (i, artist) in stats::top_artists(conn, range, limit)?.iter().enumerate() {
                println!(
                    "{:>3}  {:<40} {:>6}  {:>9}{}",
                    i + 1,
                    artist.artist_name,
                    artist.play_count,
                    stats::ms_to_human(artist.total_ms),
                    if artist.estimated { " ~" } else { "" }
                );
            }
        }
        cli::TopKind::Tracks => {
            println!("Top Tracks — {}", range.label());
            println!(
                "{:>3}  {:<40} {:<28} {:>6}  {:>9}",
                "#", "Track", "Artist", "Plays", "Time"
            );
            for (i, track) in stats::top_tracks(conn, range, limit)?.iter().enumerate() {
                println!(
                    "{:>3}  {:<40} {:<28} {:>6}  {:>9}{}",
                    i + 1,
                    track.track_name.as_deref().unwrap_or("—"),
                    track.artist_name.as_deref().unwrap_or("—"),
                    track.play_count,
                    stats::ms_to_human(track.total_ms),
                    if track.estimated { " ~" } else { "" }
                );
            }
        }
    }
    Ok(())
}
