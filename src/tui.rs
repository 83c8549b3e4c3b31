//! # Interactive History View
//!
//! The terminal host for the braille history chart: owns raw mode, the
//! alternate screen, key dispatch, and the [`Viewport`] state. The chart
//! itself is the pure renderer in [`crate::chart`] — this module just calls
//! it with fresh state after every keypress or resize and paints the
//! resulting segment runs.
//!
//! ## Keys
//!
//! | Key       | Action                              |
//! |-----------|-------------------------------------|
//! | `+` / `=` | Zoom in (window snaps to newest)    |
//! | `-`       | Zoom out                            |
//! | `0`       | Reset to the all-time view          |
//! | `←` / `→` | Pan by an eighth of the window      |
//! | `]` / `[` | More / fewer artists (reloads data) |
//! | `r`       | Reload data from the database       |
//! | `q` / Esc | Quit                                |

use anyhow::{Context, Result};
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    event::{self, Event, KeyCode, KeyEventKind},
    execute, queue,
    style::{Attribute, Print, ResetColor, SetAttribute, SetForegroundColor},
    terminal::{
        self, disable_raw_mode, enable_raw_mode, Clear, ClearType, EnterAlternateScreen,
        LeaveAlternateScreen,
    },
};
use log::{debug, info};
use rusqlite::Connection;
use std::io::{self, Write};

use crate::chart::{self, Line, Viewport};
use crate::{config, db, stats};

/// Restores the terminal when dropped, so neither an error return nor a
/// panic inside the event loop can leave the user's shell in raw mode on
/// the alternate screen. Restore failures are swallowed: they must not
/// mask whatever unwound the loop.
struct RestoreGuard;

impl RestoreGuard {
    fn acquire() -> Result<Self> {
        enable_raw_mode().context("failed to enable raw mode")?;
        execute!(io::stdout(), EnterAlternateScreen, Hide)
            .context("failed to enter alternate screen")?;
        Ok(Self)
    }
}

impl Drop for RestoreGuard {
    fn drop(&mut self) {
        let _ = execute!(io::stdout(), Show, LeaveAlternateScreen);
        let _ = disable_raw_mode();
    }
}

/// Run the interactive history chart until the user quits.
///
/// Sets up the terminal, runs the event loop, and restores the terminal on
/// every exit path via [`RestoreGuard`].
pub fn run() -> Result<()> {
    let conn = db::open_connection(&config::get_db_path()?)?;
    db::init_db(&conn)?;

    let _guard = RestoreGuard::acquire()?;
    event_loop(&conn, &mut io::stdout())
}

fn event_loop(conn: &Connection, out: &mut impl Write) -> Result<()> {
    let mut view = Viewport::default();
    let mut data = stats::artist_daily_history(conn, view.entity_limit)?;
    view.snap_to_latest(data.days.len());
    info!(
        "history view: {} days, {} artists",
        data.days.len(),
        data.entities.len()
    );

    loop {
        let (width, height) = terminal::size().context("failed to query terminal size")?;
        let lines = chart::render(&data, &view, width, height)?;
        draw(out, &lines, height)?;

        match event::read().context("failed to read terminal event")? {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                let n_days = data.days.len();
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => break,
                    KeyCode::Char('+') | KeyCode::Char('=') => view.zoom_in(n_days),
                    KeyCode::Char('-') => view.zoom_out(n_days),
                    KeyCode::Char('0') => view.reset(),
                    KeyCode::Left => view.pan_left(n_days),
                    KeyCode::Right => view.pan_right(n_days),
                    KeyCode::Char(']') => {
                        view.more_entities();
                        data = reload(conn, &mut view)?;
                    }
                    KeyCode::Char('[') => {
                        view.fewer_entities();
                        data = reload(conn, &mut view)?;
                    }
                    KeyCode::Char('r') => {
                        data = reload(conn, &mut view)?;
                    }
                    _ => {}
                }
            }
            Event::Resize(w, h) => {
                debug!("terminal resized to {w}x{h}");
            }
            _ => {}
        }
    }
    Ok(())
}

/// Re-query the chart data and re-align the window. The entity list may
/// have changed, so the offset must be re-clamped as part of the mutation.
fn reload(conn: &Connection, view: &mut Viewport) -> Result<chart::TimeSeriesSet> {
    let data = stats::artist_daily_history(conn, view.entity_limit)?;
    view.snap_to_latest(data.days.len());
    Ok(data)
}

/// Paint rendered lines to the terminal, one queued batch per frame.
fn draw(out: &mut impl Write, lines: &[Line], height: u16) -> Result<()> {
    queue!(out, Clear(ClearType::All)).context("failed to clear screen")?;
    for (row, line) in lines.iter().take(height as usize).enumerate() {
        queue!(out, MoveTo(0, row as u16)).context("failed to move cursor")?;
        for seg in line {
            queue!(
                out,
                SetAttribute(Attribute::Reset),
                SetForegroundColor(seg.color)
            )
            .context("failed to set style")?;
            if seg.bold {
                queue!(out, SetAttribute(Attribute::Bold)).context("failed to set style")?;
            }
            if seg.dim {
                queue!(out, SetAttribute(Attribute::Dim)).context("failed to set style")?;
            }
            queue!(out, Print(seg.text.as_str())).context("failed to print segment")?;
        }
    }
    queue!(out, SetAttribute(Attribute::Reset), ResetColor).context("failed to reset style")?;
    out.flush().context("failed to flush frame")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_restore_guard_drop_never_panics() {
        // Dropping without acquired terminal state (as after a mid-loop
        // panic in a headless environment) must swallow restore errors.
        drop(RestoreGuard);
    }
}
