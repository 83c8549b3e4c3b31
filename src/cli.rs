//! # Command-Line Interface Module
//!
//! This module defines the command-line interface for Replay using Clap
//! derive macros. It provides a type-safe way to parse command-line
//! arguments and route them to appropriate functionality.
//!
//! ## Commands
//!
//! - `import`: Load a Spotify Extended Streaming History export
//! - `stats`: Print summary listening stats
//! - `top`: Ranked artists or tracks over a named time range
//! - `day`: List the individual plays of one day
//! - `history`: Interactive braille history chart
//! - `completion`: Generate shell completion scripts
//!
//! ## Examples
//!
//! ```bash
//! replay import ~/Downloads/my_spotify_data
//! replay top artists --range year --limit 25
//! replay history
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::stats::TimeRange;

/// Shell types supported for completion generation
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    /// Bash shell
    Bash,
    /// Zsh shell
    Zsh,
    /// Fish shell
    Fish,
    /// PowerShell
    PowerShell,
    /// Elvish shell
    Elvish,
}

/// Which ranking the `top` command prints.
#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum TopKind {
    /// Artists ranked by total listening time
    Artists,
    /// Tracks ranked by total listening time
    Tracks,
}

/// Main application arguments structure.
///
/// Uses Clap derive macros to automatically generate argument parsing,
/// help text, and validation. The main structure contains only a subcommand
/// since all functionality is accessed through specific commands.
#[derive(Parser)]
#[command(name = "replay")]
#[command(about = "Replay: personal listening analytics - history charts & stats from your streaming data")]
#[command(version)]
pub struct Args {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Enumeration of all available subcommands.
#[derive(Subcommand)]
pub enum Command {
    /// Import a Spotify Extended Streaming History export
    ///
    /// Accepts the extracted export directory (or a single history JSON
    /// file). Re-importing is safe: duplicate plays are skipped.
    Import {
        /// Path to the extracted export directory or a history JSON file
        path: PathBuf,
    },

    /// Print summary listening stats to the terminal
    Stats {
        /// Year for the aggregate section (default: current year)
        #[arg(long)]
        year: Option<i32>,
    },

    /// Ranked artists or tracks by total listening time
    Top {
        /// What to rank
        what: TopKind,

        /// Look-back window
        #[arg(long, value_enum, default_value_t = TimeRange::Month)]
        range: TimeRange,

        /// Maximum number of rows to print
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// List the individual plays of one day
    Day {
        /// Day to list, YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<String>,
    },

    /// Interactive braille chart of your listening history
    ///
    /// Keys: +/- zoom, 0 reset, arrows pan, [/] change artist count,
    /// r reload, q quit.
    History,

    /// Generate shell completion scripts
    Completion {
        /// Target shell
        shell: Shell,
    },
}
