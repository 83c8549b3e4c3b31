//! # Configuration Module
//!
//! This module handles configuration management and data directory setup for
//! Replay. It provides platform-appropriate data storage locations and the
//! tuning constants shared across the analytics queries and the importer.
//!
//! ## Data Storage
//!
//! Replay stores its database in the platform-standard data directory:
//! - Linux: `~/.local/share/replay/`
//! - macOS: `~/Library/Application Support/replay/`
//! - Windows: `%APPDATA%\replay\`
//!
//! The `REPLAY_DATA_DIR` environment variable overrides the location, which
//! is how the integration tests point the CLI at a throwaway directory.

use anyhow::{Context, Result};
use std::env;
use std::fs;
use std::path::PathBuf;

/// Duration substituted when a play's `ms_played` is NULL: 3.5 minutes, a
/// rough average track length.
pub const DEFAULT_MS_PER_PLAY: i64 = 210_000;

/// Minimum play duration to import (ms). Shorter plays are likely skips.
pub const MIN_IMPORT_MS: i64 = 30_000;

/// Returns the Replay data directory, creating it if necessary.
///
/// Honors the `REPLAY_DATA_DIR` override, otherwise resolves the
/// platform-standard data directory via [`dirs::data_dir`].
///
/// # Errors
///
/// Fails if the system data directory cannot be determined or the directory
/// cannot be created (e.g. read-only filesystem, permissions).
pub fn get_data_dir() -> Result<PathBuf> {
    let dir = match env::var_os("REPLAY_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => dirs::data_dir()
            .context("could not determine the system data directory")?
            .join("replay"),
    };
    fs::create_dir_all(&dir).with_context(|| {
        format!(
            "failed to create Replay data directory at {}",
            dir.display()
        )
    })?;
    Ok(dir)
}

/// Returns the path to the play database, ensuring its directory exists.
pub fn get_db_path() -> Result<PathBuf> {
    Ok(get_data_dir()?.join("replay.db"))
}
