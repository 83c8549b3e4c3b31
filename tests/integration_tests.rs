//! # Integration Tests for Replay
//!
//! End-to-end tests over a throwaway database: export import, analytics
//! queries, and the full chart rendering path from stored plays to styled
//! lines.

use anyhow::Result;
use chrono::NaiveDate;
use rusqlite::Connection;
use std::fs;
use tempfile::TempDir;

use replay::chart::{self, Viewport, ZoomLevel};
use replay::db::{self, Play, SOURCE_IMPORT};
use replay::importer;
use replay::stats::{self, TimeRange};

/// Test helper: a temp-dir database seeded with two artists across January.
fn create_test_database() -> Result<(TempDir, Connection)> {
    let temp_dir = TempDir::new()?;
    let conn = db::open_connection(&temp_dir.path().join("replay_test.db"))?;
    db::init_db(&conn)?;

    // "Heavy" listens 10 minutes on each of the first 10 days of January,
    // "Light" listens 2 minutes on the 1st and the 10th.
    for day in 1..=10 {
        let play = Play {
            played_at: format!("2024-01-{day:02}T20:00:00Z"),
            track_uri: Some(format!("spotify:track:heavy{day}")),
            track_name: Some("Anthem".to_string()),
            artist_name: Some("Heavy".to_string()),
            album_name: Some("LP".to_string()),
            ms_played: Some(600_000),
            source: SOURCE_IMPORT.to_string(),
        };
        assert!(db::insert_play(&conn, &play)?);
    }
    for day in [1, 10] {
        let play = Play {
            played_at: format!("2024-01-{day:02}T08:00:00Z"),
            track_uri: Some(format!("spotify:track:light{day}")),
            track_name: Some("B-Side".to_string()),
            artist_name: Some("Light".to_string()),
            album_name: None,
            ms_played: Some(120_000),
            source: SOURCE_IMPORT.to_string(),
        };
        assert!(db::insert_play(&conn, &play)?);
    }

    Ok((temp_dir, conn))
}

mod import_tests {
    use super::*;

    fn write_export_file(dir: &TempDir, name: &str, body: &str) {
        fs::write(dir.path().join(name), body).expect("test file written");
    }

    const EXPORT_BODY: &str = r#"[
        {"ts": "2024-02-01T10:00:00Z", "ms_played": 215000,
         "spotify_track_uri": "spotify:track:aaa",
         "master_metadata_track_name": "Song A",
         "master_metadata_album_artist_name": "Band",
         "master_metadata_album_album_name": "Album"},
        {"ts": "2024-02-01T10:04:00Z", "ms_played": 12000,
         "spotify_track_uri": "spotify:track:bbb",
         "master_metadata_track_name": "Skipped",
         "master_metadata_album_artist_name": "Band",
         "master_metadata_album_album_name": "Album"},
        {"ts": "2024-02-02T11:00:00Z", "ms_played": 180000,
         "spotify_track_uri": "spotify:track:ccc",
         "master_metadata_track_name": "Song C",
         "master_metadata_album_artist_name": "Band",
         "master_metadata_album_album_name": "Album"}
    ]"#;

    #[test]
    fn test_import_filters_and_counts() -> Result<()> {
        let export_dir = TempDir::new()?;
        write_export_file(&export_dir, "Streaming_History_Audio_2024_0.json", EXPORT_BODY);
        write_export_file(&export_dir, "Userdata.json", "{}"); // must be ignored

        let db_dir = TempDir::new()?;
        let mut conn = db::open_connection(&db_dir.path().join("replay.db"))?;
        db::init_db(&conn)?;

        let report = importer::import_history(&mut conn, export_dir.path())?;
        assert_eq!(report.parsed, 3);
        assert_eq!(report.inserted, 2, "the 12s play is filtered as a skip");
        assert_eq!(db::play_count(&conn)?, 2);
        Ok(())
    }

    #[test]
    fn test_reimport_is_idempotent() -> Result<()> {
        let export_dir = TempDir::new()?;
        write_export_file(&export_dir, "endsong_0.json", EXPORT_BODY);

        let db_dir = TempDir::new()?;
        let mut conn = db::open_connection(&db_dir.path().join("replay.db"))?;
        db::init_db(&conn)?;

        let first = importer::import_history(&mut conn, export_dir.path())?;
        let second = importer::import_history(&mut conn, export_dir.path())?;
        assert_eq!(first.inserted, 2);
        assert_eq!(second.inserted, 0, "re-import must not duplicate plays");
        assert_eq!(db::play_count(&conn)?, 2);
        Ok(())
    }

    #[test]
    fn test_import_from_zip_archive() -> Result<()> {
        use std::io::Write;
        use zip::write::SimpleFileOptions;

        let export_dir = TempDir::new()?;
        let zip_path = export_dir.path().join("my_spotify_data.zip");
        let mut zw = zip::ZipWriter::new(fs::File::create(&zip_path)?);
        zw.start_file(
            "Spotify Extended Streaming History/Streaming_History_Audio_2024_0.json",
            SimpleFileOptions::default(),
        )?;
        zw.write_all(EXPORT_BODY.as_bytes())?;
        zw.finish()?;

        let db_dir = TempDir::new()?;
        let mut conn = db::open_connection(&db_dir.path().join("replay.db"))?;
        db::init_db(&conn)?;

        let report = importer::import_history(&mut conn, &zip_path)?;
        assert_eq!(report.parsed, 3);
        assert_eq!(report.inserted, 2, "the archive path behaves like the extracted directory");
        assert_eq!(db::play_count(&conn)?, 2);
        Ok(())
    }

    #[test]
    fn test_import_rejects_directory_without_history_files() -> Result<()> {
        let export_dir = TempDir::new()?;
        write_export_file(&export_dir, "ReadMeFirst.json", "{}");

        let db_dir = TempDir::new()?;
        let mut conn = db::open_connection(&db_dir.path().join("replay.db"))?;
        db::init_db(&conn)?;

        let err = importer::import_history(&mut conn, export_dir.path());
        assert!(err.is_err(), "a directory with no history files is an error");
        Ok(())
    }
}

mod stats_tests {
    use super::*;

    #[test]
    fn test_top_artists_over_seeded_history() -> Result<()> {
        let (_tmp, conn) = create_test_database()?;
        let ranked = stats::top_artists(&conn, TimeRange::All, 10)?;
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].artist_name, "Heavy");
        assert_eq!(ranked[0].total_ms, 6_000_000);
        assert_eq!(ranked[1].artist_name, "Light");
        assert_eq!(ranked[1].total_ms, 240_000);
        Ok(())
    }

    #[test]
    fn test_streaks_over_seeded_history() -> Result<()> {
        let (_tmp, conn) = create_test_database()?;
        let today: NaiveDate = "2024-01-10".parse()?;
        let s = stats::streaks_as_of(&conn, today)?;
        assert_eq!(s.current, 10);
        assert_eq!(s.longest, 10);
        Ok(())
    }

    #[test]
    fn test_day_listing_over_seeded_history() -> Result<()> {
        let (_tmp, conn) = create_test_database()?;
        let day: NaiveDate = "2024-01-01".parse()?;
        let plays = stats::plays_on_day(&conn, day)?;
        assert_eq!(plays.len(), 2, "both artists played on the 1st");
        // Ordered by time of day: Light at 08:00, Heavy at 20:00.
        assert_eq!(plays[0].artist_name.as_deref(), Some("Light"));
        assert_eq!(plays[0].ms_played, Some(120_000));
        assert_eq!(plays[1].artist_name.as_deref(), Some("Heavy"));
        assert_eq!(plays[1].album_name.as_deref(), Some("LP"));
        Ok(())
    }

    #[test]
    fn test_history_series_shape() -> Result<()> {
        let (_tmp, conn) = create_test_database()?;
        let set = stats::artist_daily_history(&conn, 10)?;
        assert_eq!(set.days.len(), 10);
        assert_eq!(set.entities.len(), 2);
        for entity in &set.entities {
            assert_eq!(
                entity.daily_ms.len(),
                set.days.len(),
                "every series aligns with the day axis"
            );
        }
        // Light has zero-filled interior days.
        let light = &set.entities[1];
        assert_eq!(light.name, "Light");
        assert_eq!(light.daily_ms[0], 120_000.0);
        assert!(light.daily_ms[1..9].iter().all(|&v| v == 0.0));
        assert_eq!(light.daily_ms[9], 120_000.0);
        Ok(())
    }
}

mod chart_tests {
    use super::*;

    #[test]
    fn test_full_pipeline_plays_to_rendered_lines() -> Result<()> {
        let (_tmp, conn) = create_test_database()?;
        let data = stats::artist_daily_history(&conn, 10)?;
        let view = Viewport {
            zoom: ZoomLevel::AllTime,
            offset: 0,
            entity_limit: 10,
        };
        let lines = chart::render(&data, &view, 80, 24)?;

        // Header + rows per artist + year axis.
        let rows_per = ((24 - 2) / 2).max(2);
        assert_eq!(lines.len(), 1 + 2 * rows_per + 1);

        let header: String = lines[0].iter().map(|s| s.text.as_str()).collect();
        assert!(header.contains("2024-01 → 2024-01"), "header was: {header}");
        assert!(header.contains("all time"));

        // The dominant artist's band must contain braille glyphs.
        let band: String = lines[1].iter().map(|s| s.text.as_str()).collect();
        assert!(band.starts_with(" Heavy"));
        let lit = lines[1..=rows_per]
            .iter()
            .flat_map(|l| l.iter())
            .flat_map(|s| s.text.chars())
            .filter(|&c| ('\u{2800}'..='\u{28FF}').contains(&c) && c != '\u{2800}')
            .count();
        assert!(lit > 0, "steady listening must light up the chart");
        Ok(())
    }

    #[test]
    fn test_entity_count_change_keeps_scale_for_existing_bands() -> Result<()> {
        // The global peak comes from the loudest artist; trimming or adding
        // quieter artists must leave the loud band's rasterization alone.
        let (_tmp, conn) = create_test_database()?;
        let data_two = stats::artist_daily_history(&conn, 10)?;
        let data_one = stats::artist_daily_history(&conn, 1)?;

        let view = Viewport {
            zoom: ZoomLevel::AllTime,
            offset: 0,
            entity_limit: 10,
        };
        // Same height per band: give the single-artist render half the rows.
        let lines_two = chart::render(&data_two, &view, 80, 2 + 2 * 11)?;
        let lines_one = chart::render(&data_one, &view, 80, 2 + 11)?;

        let band_two: Vec<String> = lines_two[1..12]
            .iter()
            .map(|l| l.last().map(|s| s.text.clone()).unwrap_or_default())
            .collect();
        let band_one: Vec<String> = lines_one[1..12]
            .iter()
            .map(|l| l.last().map(|s| s.text.clone()).unwrap_or_default())
            .collect();
        assert_eq!(
            band_two, band_one,
            "dropping a quieter artist must not rescale the loud band"
        );
        Ok(())
    }

    #[test]
    fn test_spike_glow_end_to_end() -> Result<()> {
        // One 100s-equivalent spike among silent days renders as a fading
        // smear around the spike column, not a lone dot.
        let temp_dir = TempDir::new()?;
        let conn = db::open_connection(&temp_dir.path().join("replay.db"))?;
        db::init_db(&conn)?;
        // Day axis needs bounds: a tiny play on day 1 and day 10 anchors
        // the range; the spike sits on day 6.
        for (day, ms) in [(1, 31_000), (6, 100_000_000), (10, 31_000)] {
            let play = Play {
                played_at: format!("2024-01-{day:02}T12:00:00Z"),
                track_uri: Some(format!("spotify:track:s{day}")),
                track_name: Some("Track".to_string()),
                artist_name: Some("Solo".to_string()),
                album_name: None,
                ms_played: Some(ms),
                source: SOURCE_IMPORT.to_string(),
            };
            db::insert_play(&conn, &play)?;
        }

        let data = stats::artist_daily_history(&conn, 10)?;
        let view = Viewport {
            zoom: ZoomLevel::AllTime,
            offset: 0,
            entity_limit: 10,
        };
        let lines = chart::render(&data, &view, 40, 10)?;

        let mut lit_cols = std::collections::BTreeSet::new();
        for line in &lines[1..lines.len() - 1] {
            let text: String = line.iter().map(|s| s.text.as_str()).collect();
            for (i, ch) in text.chars().skip(chart::LABEL_WIDTH).enumerate() {
                if ch != ' ' {
                    lit_cols.insert(i);
                }
            }
        }
        assert!(
            lit_cols.len() > 1,
            "spike must smear into neighbouring columns, lit: {lit_cols:?}"
        );
        Ok(())
    }
}
