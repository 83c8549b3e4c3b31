//! Personal listening analytics: import your streaming history, query it,
//! and watch it as a braille chart in the terminal.
//!
//! Core modules:
//! - [`chart`] - Braille history chart renderer (pure: data + viewport → styled lines)
//! - [`stats`] - Analytics queries (rankings, aggregates, streaks, chart series)
//! - [`db`] - Play database schema and inserts
//! - [`importer`] - Spotify Extended Streaming History import
//! - [`tui`] - Interactive terminal host for the chart
//!
//! ### Supporting Modules
//!
//! - [`config`] - Data directory management and tuning constants
//! - [`cli`] - Command-line interface definitions with clap integration
//! - [`completion`] - Shell completion generation
//!
//! ## Quick Start Example
//!
//! ```no_run
//! use replay::{chart, db, stats};
//! use anyhow::Result;
//!
//! # fn main() -> Result<()> {
//! // Open the play database and build chart data for the top 10 artists.
//! let conn = db::open_connection(&replay::config::get_db_path()?)?;
//! db::init_db(&conn)?;
//! let data = stats::artist_daily_history(&conn, 10)?;
//!
//! // Render a frame: the chart is a pure function of its inputs.
//! let view = chart::Viewport::default();
//! let lines = chart::render(&data, &view, 120, 40)?;
//! println!("{} lines rendered", lines.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Chart Pipeline
//!
//! The history chart reduces each artist's daily series to the visible
//! window, samples it to two braille dot-columns per character (keeping
//! bucket *maxima* so spikes survive), spreads spikes with a Gaussian
//! max-kernel so they stay findable at low resolution, and scales every
//! band against one global peak so bar heights never change as you zoom or
//! pan. See [`chart`] for the details and the tuning constants.
//!
//! ## Error Handling
//!
//! All public functions return `Result<T, anyhow::Error>`. Contract
//! violations (e.g. a chart series whose length disagrees with the day
//! axis) fail fast; degenerate data (empty database, all-zero days) renders
//! cleanly.

pub mod chart;
pub mod cli;
pub mod completion;
pub mod config;
pub mod db;
pub mod importer;
pub mod stats;
pub mod tui;
