//! # Streaming-Export Importer
//!
//! Imports a Spotify "Extended Streaming History" export (the GDPR privacy
//! download) into the play database. Point it at the downloaded ZIP itself,
//! the extracted directory, or a single history JSON file. Both the current
//! export layout (`Streaming_History_Audio_*.json`) and the older one
//! (`endsong_*.json`) are recognized; they share field names.
//!
//! Files are parsed in parallel with rayon, then rows land in 1000-row
//! transactions. Duplicate plays are skipped by the database's unique
//! constraint, so importing the same export twice (or an export overlapping
//! previously imported data) is safe.

use anyhow::{bail, Context, Result};
use log::{debug, info};
use rayon::prelude::*;
use rusqlite::Connection;
use serde::Deserialize;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use zip::ZipArchive;

use crate::config::MIN_IMPORT_MS;
use crate::db::{self, Play, SOURCE_IMPORT};

/// Rows per insert transaction.
const BATCH_SIZE: usize = 1_000;

/// Counts reported back to the CLI after an import run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    /// Records read from the export files.
    pub parsed: usize,
    /// Rows actually inserted (parsed minus skips and duplicates).
    pub inserted: usize,
}

/// One raw record as it appears in the export JSON. Unknown fields are
/// ignored; every field of interest is nullable in real exports.
#[derive(Debug, Deserialize)]
struct RawRecord {
    ts: Option<String>,
    ms_played: Option<i64>,
    spotify_track_uri: Option<String>,
    master_metadata_track_name: Option<String>,
    master_metadata_album_artist_name: Option<String>,
    master_metadata_album_album_name: Option<String>,
}

/// Map a raw export record to a play row, or `None` to skip it.
///
/// Records without a timestamp are unusable; plays shorter than
/// [`MIN_IMPORT_MS`] are near-certain skips and would only add noise to the
/// listening totals.
fn parse_record(raw: RawRecord) -> Option<Play> {
    if let Some(ms) = raw.ms_played {
        if ms < MIN_IMPORT_MS {
            return None;
        }
    }
    let played_at = raw.ts?;
    Some(Play {
        played_at,
        track_uri: raw.spotify_track_uri,
        track_name: raw.master_metadata_track_name,
        artist_name: raw.master_metadata_album_artist_name,
        album_name: raw.master_metadata_album_album_name,
        ms_played: raw.ms_played,
        source: SOURCE_IMPORT.to_string(),
    })
}

/// Map parsed records to play rows, keeping the raw record count.
fn records_to_plays(records: Vec<RawRecord>) -> (usize, Vec<Play>) {
    let parsed = records.len();
    let plays = records.into_iter().filter_map(parse_record).collect();
    (parsed, plays)
}

/// True for file names that look like export history files.
fn is_history_file(name: &str) -> bool {
    let stem = Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("");
    stem.starts_with("Streaming_History_Audio_") || stem.starts_with("endsong_")
}

/// Collect the history JSON files to import, sorted by name so multi-part
/// exports load in order.
fn discover_files(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if !path.is_dir() {
        bail!(
            "expected an extracted export directory or a history JSON file, got: {}",
            path.display()
        );
    }
    let mut files: Vec<PathBuf> = fs::read_dir(path)
        .with_context(|| format!("failed to read export directory {}", path.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.extension().is_some_and(|ext| ext == "json")
                && p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(is_history_file)
        })
        .collect();
    files.sort();
    if files.is_empty() {
        bail!(
            "no history files (Streaming_History_Audio_*.json or endsong_*.json) found in {}",
            path.display()
        );
    }
    Ok(files)
}

/// True when the path is the downloaded export archive itself.
fn is_zip_file(path: &Path) -> bool {
    path.is_file() && path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("zip"))
}

/// Parse history files straight out of the export ZIP, no extraction needed.
/// Entries are read in name order, matching the directory path.
fn parse_zip(path: &Path) -> Result<Vec<(usize, Vec<Play>)>> {
    let file = fs::File::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let mut archive = ZipArchive::new(file)
        .with_context(|| format!("failed to read archive {}", path.display()))?;

    let mut names: Vec<String> = archive
        .file_names()
        .filter(|name| name.ends_with(".json") && is_history_file(name))
        .map(String::from)
        .collect();
    names.sort();
    if names.is_empty() {
        bail!(
            "no history files (Streaming_History_Audio_*.json or endsong_*.json) found in {}",
            path.display()
        );
    }

    let mut results = Vec::with_capacity(names.len());
    for name in &names {
        let mut entry = archive
            .by_name(name)
            .with_context(|| format!("failed to open archive entry {name}"))?;
        let mut text = String::new();
        entry
            .read_to_string(&mut text)
            .with_context(|| format!("failed to read archive entry {name}"))?;
        let records: Vec<RawRecord> = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse archive entry {name}"))?;
        results.push(records_to_plays(records));
    }
    Ok(results)
}

/// Parse one export file into play rows. Returns the raw record count
/// alongside the surviving rows.
fn parse_file(file: &Path) -> Result<(usize, Vec<Play>)> {
    let text = fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let records: Vec<RawRecord> = serde_json::from_str(&text)
        .with_context(|| format!("failed to parse {}", file.display()))?;
    Ok(records_to_plays(records))
}

/// Import a streaming-history export.
///
/// `path` is the export ZIP, its extracted directory, or a single history
/// JSON file. Returns parsed/inserted counts; the difference is skips
/// (too-short plays, missing timestamps) plus duplicates already in the
/// database.
pub fn import_history(conn: &mut Connection, path: &Path) -> Result<ImportReport> {
    let results: Vec<(usize, Vec<Play>)> = if is_zip_file(path) {
        info!("importing history from archive {}", path.display());
        parse_zip(path)?
    } else {
        let files = discover_files(path)?;
        info!("importing {} history file(s) from {}", files.len(), path.display());
        files
            .par_iter()
            .map(|file| parse_file(file))
            .collect::<Result<_>>()?
    };

    let mut report = ImportReport::default();
    let mut batch: Vec<Play> = Vec::with_capacity(BATCH_SIZE);
    for (parsed, plays) in results {
        report.parsed += parsed;
        for play in plays {
            batch.push(play);
            if batch.len() >= BATCH_SIZE {
                report.inserted += db::insert_plays_batch(conn, &batch)?;
                debug!("{} plays inserted so far", report.inserted);
                batch.clear();
            }
        }
    }
    if !batch.is_empty() {
        report.inserted += db::insert_plays_batch(conn, &batch)?;
    }

    info!(
        "import complete: {} records parsed, {} plays inserted",
        report.parsed, report.inserted
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(ts: Option<&str>, ms: Option<i64>) -> RawRecord {
        RawRecord {
            ts: ts.map(String::from),
            ms_played: ms,
            spotify_track_uri: Some("spotify:track:x".to_string()),
            master_metadata_track_name: Some("Track".to_string()),
            master_metadata_album_artist_name: Some("Artist".to_string()),
            master_metadata_album_album_name: Some("Album".to_string()),
        }
    }

    #[test]
    fn test_parse_record_maps_fields() {
        let play = parse_record(raw(Some("2024-01-01T10:00:00Z"), Some(200_000)))
            .expect("valid record parses");
        assert_eq!(play.played_at, "2024-01-01T10:00:00Z");
        assert_eq!(play.artist_name.as_deref(), Some("Artist"));
        assert_eq!(play.ms_played, Some(200_000));
        assert_eq!(play.source, SOURCE_IMPORT);
    }

    #[test]
    fn test_parse_record_skips_short_plays() {
        assert!(
            parse_record(raw(Some("2024-01-01T10:00:00Z"), Some(MIN_IMPORT_MS - 1))).is_none(),
            "plays under the minimum duration are skips"
        );
    }

    #[test]
    fn test_parse_record_skips_missing_timestamp() {
        assert!(parse_record(raw(None, Some(200_000))).is_none());
    }

    #[test]
    fn test_parse_record_keeps_unknown_duration() {
        let play = parse_record(raw(Some("2024-01-01T10:00:00Z"), None))
            .expect("unknown duration is not a skip");
        assert_eq!(play.ms_played, None);
    }

    #[test]
    fn test_is_history_file_recognizes_both_formats() {
        assert!(is_history_file("Streaming_History_Audio_2023_4.json"));
        assert!(is_history_file("endsong_12.json"));
        assert!(!is_history_file("Streaming_History_Video_2023.json"));
        assert!(!is_history_file("Userdata.json"));
    }

    #[test]
    fn test_zip_archive_read_without_extraction() {
        use std::io::Write;
        use zip::write::SimpleFileOptions;

        let dir = tempfile::TempDir::new().expect("temp dir");
        let zip_path = dir.path().join("my_spotify_data.zip");
        let file = fs::File::create(&zip_path).expect("archive file created");
        let mut zw = zip::ZipWriter::new(file);
        let opts = SimpleFileOptions::default();

        zw.start_file(
            "Spotify Extended Streaming History/Streaming_History_Audio_2024_0.json",
            opts,
        )
        .expect("entry started");
        zw.write_all(
            br#"[{"ts": "2024-03-01T10:00:00Z", "ms_played": 200000,
                  "spotify_track_uri": "spotify:track:z",
                  "master_metadata_track_name": "Song",
                  "master_metadata_album_artist_name": "Band",
                  "master_metadata_album_album_name": "LP"}]"#,
        )
        .expect("entry written");
        zw.start_file("Spotify Extended Streaming History/Userdata.json", opts)
            .expect("entry started");
        zw.write_all(b"{}").expect("entry written");
        zw.finish().expect("archive finished");

        let results = parse_zip(&zip_path).expect("archive parses");
        assert_eq!(results.len(), 1, "only history entries are read");
        let (parsed, plays) = &results[0];
        assert_eq!(*parsed, 1);
        assert_eq!(plays[0].artist_name.as_deref(), Some("Band"));
    }

    #[test]
    fn test_zip_without_history_entries_is_an_error() {
        use std::io::Write;
        use zip::write::SimpleFileOptions;

        let dir = tempfile::TempDir::new().expect("temp dir");
        let zip_path = dir.path().join("empty.zip");
        let mut zw = zip::ZipWriter::new(fs::File::create(&zip_path).expect("archive file"));
        zw.start_file("ReadMeFirst.json", SimpleFileOptions::default())
            .expect("entry started");
        zw.write_all(b"{}").expect("entry written");
        zw.finish().expect("archive finished");

        assert!(parse_zip(&zip_path).is_err());
    }

    #[test]
    fn test_deserialize_tolerates_extra_fields() {
        let json = r#"{
            "ts": "2024-01-01T10:00:00Z",
            "platform": "ios",
            "ms_played": 215000,
            "conn_country": "DE",
            "master_metadata_track_name": "Song",
            "master_metadata_album_artist_name": "Band",
            "master_metadata_album_album_name": "LP",
            "spotify_track_uri": "spotify:track:abc",
            "shuffle": false,
            "skipped": false
        }"#;
        let record: RawRecord = serde_json::from_str(json).expect("extra fields are ignored");
        let play = parse_record(record).expect("record parses");
        assert_eq!(play.track_name.as_deref(), Some("Song"));
    }
}
