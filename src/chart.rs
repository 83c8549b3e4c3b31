//! # Braille History Chart Renderer
//!
//! This module converts irregular daily listening-time series for multiple
//! artists into a fixed-size Unicode braille dot-matrix chart with zoom and
//! pan. It is a pure function from (time series data, viewport state,
//! terminal size) to rows of colored text segments — it performs no I/O,
//! keeps no state between calls, and never mutates its inputs. The host UI
//! loop in [`crate::tui`] owns the terminal and the viewport mutations.
//!
//! ## Pipeline
//!
//! For each rendered artist band:
//!
//! 1. **Sample** the visible day window down (or up) to two dot-columns per
//!    character cell, taking the *maximum* of each bucket so listening
//!    spikes survive instead of being averaged into invisibility.
//! 2. **Spread** the sampled columns with a Gaussian max-kernel so an
//!    isolated heavy-listening day renders as a short fading glow rather
//!    than a single-dot blip.
//! 3. **Scale** against one global peak — the maximum raw daily value across
//!    every rendered artist over all time — so bar heights never "pop" when
//!    the user zooms or pans.
//! 4. **Rasterize** the scaled columns into 2×4 braille dot cells, bars
//!    growing upward from the baseline.
//!
//! ## Braille dot bit layout (offset from U+2800)
//!
//! ```text
//!   Left col  → dots 1-2-3-7 → bits 0x01 0x02 0x04 0x40   (rows 0-3)
//!   Right col → dots 4-5-6-8 → bits 0x08 0x10 0x20 0x80   (rows 0-3)
//! ```
//!
//! Each character cell therefore addresses a 2-wide × 4-tall sub-grid,
//! doubling horizontal and quadrupling vertical resolution.

use anyhow::{bail, Result};
use chrono::{Datelike, NaiveDate};
use crossterm::style::Color;

use crate::stats::ms_to_human;

/// Character columns reserved on the left for the artist name and totals.
pub const LABEL_WIDTH: usize = 24;

/// Standard deviation (in dot-columns) of the spread kernel.
///
/// Tuning constant carried over unchanged; together with [`SPREAD_RADIUS`]
/// it controls how far a spike's glow reaches.
pub const SPREAD_SIGMA: f64 = 3.0;

/// Maximum distance (in dot-columns) a spike propagates.
pub const SPREAD_RADIUS: usize = 9;

/// Columns whose dot fill would be below this render as fully blank.
///
/// Suppresses single-dot noise from near-zero days; a deliberate
/// cleanliness-over-completeness trade.
pub const FILL_SUPPRESS_THRESHOLD: usize = 2;

/// Rows reserved above/below the artist bands: header line + year axis.
const HEADER_ROWS: usize = 2;

/// Braille dot bit per (cell row 0-3 top-to-bottom, sub-column 0=left 1=right).
const BRAILLE_DOTS: [[u8; 2]; 4] = [
    [0x01, 0x08], // cell row 0 (top)
    [0x02, 0x10], // cell row 1
    [0x04, 0x20], // cell row 2
    [0x40, 0x80], // cell row 3 (bottom)
];

/// Base codepoint for braille patterns; `BRAILLE_BASE + mask` is the glyph.
const BRAILLE_BASE: u32 = 0x2800;

/// Band colors, assigned by rendering order. Vibrant on dark backgrounds.
pub const PALETTE: [Color; 12] = [
    Color::Rgb { r: 0x1D, g: 0xB9, b: 0x54 }, // green
    Color::Rgb { r: 0x5B, g: 0x9B, b: 0xD5 }, // sky blue
    Color::Rgb { r: 0xFF, g: 0x6B, b: 0x6B }, // coral
    Color::Rgb { r: 0xFF, g: 0xD9, b: 0x3D }, // gold
    Color::Rgb { r: 0xC7, g: 0x7D, b: 0xFF }, // violet
    Color::Rgb { r: 0x06, g: 0xD6, b: 0xA0 }, // mint
    Color::Rgb { r: 0xFF, g: 0x4D, b: 0x6D }, // hot pink
    Color::Rgb { r: 0x4C, g: 0xC9, b: 0xF0 }, // cyan
    Color::Rgb { r: 0xF8, g: 0x96, b: 0x1E }, // orange
    Color::Rgb { r: 0x90, g: 0xBE, b: 0x6D }, // sage
    Color::Rgb { r: 0x43, g: 0xAA, b: 0x8B }, // teal
    Color::Rgb { r: 0xF9, g: 0x41, b: 0x44 }, // red
];

// ---------------------------------------------------------------------------
// Input data model
// ---------------------------------------------------------------------------

/// One charted subject: an artist with its daily listening series.
///
/// `daily_ms[i]` aligns positionally with `TimeSeriesSet::days[i]`; days with
/// no listening hold `0.0` rather than being omitted.
#[derive(Debug, Clone)]
pub struct Entity {
    /// Display name.
    pub name: String,
    /// All-time listening total in milliseconds.
    pub total_ms: i64,
    /// Per-day listening milliseconds, dense, aligned with the day axis.
    pub daily_ms: Vec<f64>,
}

/// The chart's input: a shared day axis plus per-entity aligned series.
///
/// Ordering of `entities` is caller-provided (typically descending
/// `total_ms`) and preserved; the renderer never re-sorts.
#[derive(Debug, Clone, Default)]
pub struct TimeSeriesSet {
    /// Every calendar day between the first and last observed play,
    /// ascending and contiguous.
    pub days: Vec<NaiveDate>,
    /// Ranked entities with series aligned to `days`.
    pub entities: Vec<Entity>,
}

impl TimeSeriesSet {
    /// True when there is nothing to chart.
    pub fn is_empty(&self) -> bool {
        self.days.is_empty() || self.entities.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Output data model
// ---------------------------------------------------------------------------

/// A run of identically-styled text. Pure data; any terminal styling layer
/// can paint it.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub text: String,
    pub color: Color,
    pub bold: bool,
    pub dim: bool,
}

impl Segment {
    /// A segment in the given color with no attributes.
    pub fn new(text: impl Into<String>, color: Color) -> Self {
        Self {
            text: text.into(),
            color,
            bold: false,
            dim: false,
        }
    }

    /// A segment in the terminal's default color.
    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(text, Color::Reset)
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub fn dim(mut self) -> Self {
        self.dim = true;
        self
    }
}

/// One rendered terminal row.
pub type Line = Vec<Segment>;

// ---------------------------------------------------------------------------
// Viewport
// ---------------------------------------------------------------------------

/// Minimum number of artists the viewport will show.
pub const MIN_ENTITIES: usize = 3;
/// Maximum number of artists the viewport will show.
pub const MAX_ENTITIES: usize = 15;

/// How many days the chart window covers.
///
/// The enumeration is fixed: `AllTime` has no span cap; the remaining
/// levels cap the window at 365, 182, 91, and 30 days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ZoomLevel {
    AllTime,
    /// Default so the chart starts populated rather than squashed.
    #[default]
    Year,
    HalfYear,
    Quarter,
    Month,
}

impl ZoomLevel {
    /// Day cap for this level; `None` means show all days.
    pub fn day_span(self) -> Option<usize> {
        match self {
            Self::AllTime => None,
            Self::Year => Some(365),
            Self::HalfYear => Some(182),
            Self::Quarter => Some(91),
            Self::Month => Some(30),
        }
    }

    /// Human label shown in the chart header.
    pub fn label(self) -> &'static str {
        match self {
            Self::AllTime => "all time",
            Self::Year => "1 year",
            Self::HalfYear => "6 months",
            Self::Quarter => "3 months",
            Self::Month => "1 month",
        }
    }

    /// One step toward the shortest span. Saturates at `Month`.
    pub fn zoomed_in(self) -> Self {
        match self {
            Self::AllTime => Self::Year,
            Self::Year => Self::HalfYear,
            Self::HalfYear => Self::Quarter,
            Self::Quarter | Self::Month => Self::Month,
        }
    }

    /// One step toward the widest span. Saturates at `AllTime`.
    pub fn zoomed_out(self) -> Self {
        match self {
            Self::AllTime | Self::Year => Self::AllTime,
            Self::HalfYear => Self::Year,
            Self::Quarter => Self::HalfYear,
            Self::Month => Self::Quarter,
        }
    }
}

/// Caller-owned per-render chart state: zoom level, pan offset, artist count.
///
/// The renderer itself is stateless; the host UI mutates a `Viewport` in
/// response to keys and passes it to every [`render`] call. Every mutating
/// transition re-clamps `offset` so the window always stays inside the day
/// axis — clamping is part of the transition, not an internal renderer
/// concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub zoom: ZoomLevel,
    /// Index into the day axis marking the left edge of the window.
    pub offset: usize,
    /// How many leading entities to render.
    pub entity_limit: usize,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            zoom: ZoomLevel::default(),
            offset: 0,
            entity_limit: 10,
        }
    }
}

impl Viewport {
    /// Number of days visible given a day axis of length `n_days`.
    pub fn span(&self, n_days: usize) -> usize {
        match self.zoom.day_span() {
            Some(cap) => cap.min(n_days),
            None => n_days,
        }
    }

    /// Clamp `offset` into `[0, n_days - span]`.
    pub fn clamp_offset(&mut self, n_days: usize) {
        self.offset = self.offset.min(n_days.saturating_sub(self.span(n_days)));
    }

    /// Align the window to the most recent days.
    pub fn snap_to_latest(&mut self, n_days: usize) {
        self.offset = n_days.saturating_sub(self.span(n_days));
    }

    /// Zoom one level in; the window snaps to the newest days.
    pub fn zoom_in(&mut self, n_days: usize) {
        self.zoom = self.zoom.zoomed_in();
        self.snap_to_latest(n_days);
    }

    /// Zoom one level out; the window snaps to the newest days.
    pub fn zoom_out(&mut self, n_days: usize) {
        self.zoom = self.zoom.zoomed_out();
        self.snap_to_latest(n_days);
    }

    /// Back to the full all-time view.
    pub fn reset(&mut self) {
        self.zoom = ZoomLevel::AllTime;
        self.offset = 0;
    }

    /// Pan one step (an eighth of the window) toward older days.
    pub fn pan_left(&mut self, n_days: usize) {
        let step = (self.span(n_days) / 8).max(1);
        self.offset = self.offset.saturating_sub(step);
        self.clamp_offset(n_days);
    }

    /// Pan one step (an eighth of the window) toward newer days.
    pub fn pan_right(&mut self, n_days: usize) {
        let step = (self.span(n_days) / 8).max(1);
        self.offset += step;
        self.clamp_offset(n_days);
    }

    /// Show one more artist band, up to [`MAX_ENTITIES`].
    pub fn more_entities(&mut self) {
        self.entity_limit = (self.entity_limit + 1).min(MAX_ENTITIES);
    }

    /// Show one fewer artist band, down to [`MIN_ENTITIES`].
    pub fn fewer_entities(&mut self) {
        self.entity_limit = self.entity_limit.saturating_sub(1).max(MIN_ENTITIES);
    }
}

// ---------------------------------------------------------------------------
// Sampler
// ---------------------------------------------------------------------------

/// Reduce `series` to exactly `n_cols` buckets, each holding the maximum of
/// its proportional index range.
///
/// Bucket `c` covers `[c·n/n_cols, (c+1)·n/n_cols)`; when that range rounds
/// to zero width (more columns than days) it is forced to at least one
/// element, so no bucket is ever empty. An empty input yields all zeros of
/// the requested length, never an error.
pub fn sample(series: &[f64], n_cols: usize) -> Vec<f64> {
    if series.is_empty() {
        return vec![0.0; n_cols];
    }
    let n = series.len();
    let mut out = Vec::with_capacity(n_cols);
    for c in 0..n_cols {
        let lo = c * n / n_cols;
        let hi = ((c + 1) * n / n_cols).max(lo + 1).min(n);
        let bucket_max = series[lo..hi]
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        out.push(bucket_max);
    }
    out
}

// ---------------------------------------------------------------------------
// Spreader
// ---------------------------------------------------------------------------

/// Gaussian max-spread in column space (σ = [`SPREAD_SIGMA`], radius =
/// [`SPREAD_RADIUS`]).
///
/// Every non-zero column decays as a Gaussian into its neighbours; each
/// output position keeps the *maximum* contribution it receives (its own
/// unspread value included), never a sum. The result is a "glow": a single
/// tall spike widens into a smooth fading hill without inflating the
/// perceived area elsewhere. Zero and negative inputs never propagate.
///
/// This is purely a column-space rendering aid — exact values shown
/// elsewhere in the UI are unaffected.
pub fn gaussian_spread(sampled: &[f64]) -> Vec<f64> {
    let mut weights = [0.0_f64; SPREAD_RADIUS + 1];
    for (d, w) in weights.iter_mut().enumerate() {
        *w = (-0.5 * (d as f64 / SPREAD_SIGMA).powi(2)).exp();
    }

    let n = sampled.len();
    let mut out = vec![0.0; n];
    for i in 0..n {
        let v = sampled[i];
        if v <= 0.0 {
            continue;
        }
        if v > out[i] {
            out[i] = v;
        }
        for (d, &weight) in weights.iter().enumerate().skip(1) {
            let w = v * weight;
            if i + d < n && w > out[i + d] {
                out[i + d] = w;
            }
            if i >= d && w > out[i - d] {
                out[i - d] = w;
            }
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Scaler
// ---------------------------------------------------------------------------

/// The single peak shared by every band in a render pass: the maximum raw
/// daily value across all rendered entities over all time — *unsampled and
/// unspread*, so the vertical scale is identical no matter where the window
/// sits. A dataset with no listening at all yields `1.0` so downstream
/// division is safe (every fill is then zero, which is correct).
pub fn global_peak(entities: &[Entity]) -> f64 {
    let peak = entities
        .iter()
        .flat_map(|e| e.daily_ms.iter().copied())
        .fold(0.0_f64, f64::max);
    if peak > 0.0 {
        peak
    } else {
        1.0
    }
}

// ---------------------------------------------------------------------------
// Grid rasterizer
// ---------------------------------------------------------------------------

/// Quantize spread column values into per-cell braille dot masks.
///
/// `spread` holds one value per dot-column (two per character column); the
/// returned grid is `char_rows × char_cols` of 8-bit dot masks. Bars grow
/// upward from the baseline: a column at height `fill` sets the bottom
/// `fill` of the `char_rows × 4` dot rows. Fills below
/// [`FILL_SUPPRESS_THRESHOLD`] are clamped to zero.
pub fn rasterize(spread: &[f64], peak: f64, char_rows: usize, char_cols: usize) -> Vec<Vec<u8>> {
    let dot_rows = char_rows * 4;
    let mut grid = vec![vec![0u8; char_cols]; char_rows];
    for (dc, &val) in spread.iter().enumerate() {
        let cc = dc / 2;
        if cc >= char_cols {
            break;
        }
        let wc = dc % 2;
        let mut fill = ((val / peak) * dot_rows as f64).floor() as usize;
        if fill < FILL_SUPPRESS_THRESHOLD {
            fill = 0;
        }
        fill = fill.min(dot_rows);
        for dr in (dot_rows - fill)..dot_rows {
            grid[dr / 4][cc] |= BRAILLE_DOTS[dr % 4][wc];
        }
    }
    grid
}

/// A grid row as displayable text: braille glyphs, with zero-mask cells as
/// plain spaces to avoid the visual clutter of empty braille characters.
fn grid_row_text(row: &[u8]) -> String {
    row.iter()
        .map(|&bits| {
            if bits == 0 {
                ' '
            } else {
                char::from_u32(BRAILLE_BASE + u32::from(bits)).unwrap_or(' ')
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Layout engine
// ---------------------------------------------------------------------------

/// Render the history chart into styled lines.
///
/// The output is one header line, `rows_per_entity` lines per rendered
/// artist, and a trailing year axis. The caller owns `view` and the
/// terminal; this function only derives lines from its arguments.
///
/// # Errors
///
/// Fails fast if any entity's series length disagrees with the day axis —
/// that is a programming-contract violation, not a data condition to
/// recover from. Degenerate but well-formed inputs (no days, no entities,
/// all-zero data) render cleanly.
pub fn render(data: &TimeSeriesSet, view: &Viewport, width: u16, height: u16) -> Result<Vec<Line>> {
    let n_days = data.days.len();
    for entity in &data.entities {
        if entity.daily_ms.len() != n_days {
            bail!(
                "time series length mismatch: artist {:?} has {} daily values but the day axis has {}",
                entity.name,
                entity.daily_ms.len(),
                n_days
            );
        }
    }

    let width = width as usize;
    let height = height as usize;

    let entity_count = data.entities.len().min(view.entity_limit);
    let entities = &data.entities[..entity_count];

    let span = view.span(n_days);
    let offset = view.offset.min(n_days.saturating_sub(span));
    let end = (offset + span).min(n_days);

    let chart_w = width.saturating_sub(LABEL_WIDTH).max(4);
    let dot_cols = chart_w * 2;

    let mut lines = Vec::new();
    lines.push(header_line(data, view, offset, span));

    if n_days == 0 || entities.is_empty() {
        lines.push(vec![Segment::plain(" ".repeat(LABEL_WIDTH + chart_w)).dim()]);
        return Ok(lines);
    }

    let rows_per = (height.saturating_sub(HEADER_ROWS) / entity_count).max(2);
    let peak = global_peak(entities);

    for (band, entity) in entities.iter().enumerate() {
        let color = PALETTE[band % PALETTE.len()];
        let visible = &entity.daily_ms[offset..end];
        let window_ms: f64 = visible.iter().sum();

        let sampled = sample(visible, dot_cols);
        let spread = gaussian_spread(&sampled);
        let grid = rasterize(&spread, peak, rows_per, chart_w);

        for (r, grid_row) in grid.iter().enumerate() {
            let mut line = Vec::with_capacity(2);
            line.push(band_label(entity, r, rows_per, window_ms, color));
            line.push(Segment::new(grid_row_text(grid_row), color));
            lines.push(line);
        }
    }

    lines.push(year_axis(&data.days, offset, span, chart_w, dot_cols));
    Ok(lines)
}

/// Header: title, visible month range, zoom label, key hints.
fn header_line(data: &TimeSeriesSet, view: &Viewport, offset: usize, span: usize) -> Line {
    let range = if data.days.is_empty() || span == 0 {
        "no data".to_string()
    } else {
        let first = data.days[offset];
        let last = data.days[(offset + span - 1).min(data.days.len() - 1)];
        format!("{} → {}", first.format("%Y-%m"), last.format("%Y-%m"))
    };
    vec![
        Segment::new("Artist History  ", Color::White).bold(),
        Segment::new(range, Color::Cyan),
        Segment::plain(format!("  {}", view.zoom.label())).dim(),
        Segment::plain(format!(
            "  [+/-] zoom  [←/→] pan  [[/]] artists ({})",
            view.entity_limit
        ))
        .dim(),
    ]
}

/// Left-gutter label for one band row.
///
/// Row 0 carries the artist name. With three or more rows the window total
/// and the all-time total get a line each; with exactly two rows they
/// collapse onto one; a single effective content row shows only the name.
fn band_label(entity: &Entity, row: usize, rows_per: usize, window_ms: f64, color: Color) -> Segment {
    let inner = LABEL_WIDTH - 2;
    match row {
        0 => {
            let name: String = entity.name.chars().take(inner).collect();
            Segment::new(format!(" {:<width$}", name, width = LABEL_WIDTH - 1), color).bold()
        }
        1 if rows_per >= 3 => {
            let window = ms_to_human(window_ms as i64);
            Segment::new(format!("  {:>inner$}", window), color).dim()
        }
        1 => {
            let both = format!(
                "{} / {}",
                ms_to_human(window_ms as i64),
                ms_to_human(entity.total_ms)
            );
            Segment::new(format!("  {:>inner$}", both), color).dim()
        }
        2 if rows_per >= 3 => {
            let total = ms_to_human(entity.total_ms);
            Segment::new(format!("  {:>inner$}", total), color).dim()
        }
        _ => Segment::plain(" ".repeat(LABEL_WIDTH)),
    }
}

/// Year axis: the year number stamped at the proportional column of each
/// year transition inside the window, one stamp per transition, everything
/// else blank. The first visible day always counts as a transition.
fn year_axis(
    days: &[NaiveDate],
    offset: usize,
    span: usize,
    chart_w: usize,
    dot_cols: usize,
) -> Line {
    let mut axis = vec![' '; chart_w];
    let mut prev_year: Option<i32> = None;
    if span > 0 {
        for i in offset..(offset + span).min(days.len()) {
            let year = days[i].year();
            if prev_year != Some(year) {
                let col = (i - offset) * dot_cols / span / 2;
                for (j, ch) in year.to_string().chars().enumerate() {
                    if col + j < chart_w {
                        axis[col + j] = ch;
                    }
                }
                prev_year = Some(year);
            }
        }
    }
    vec![
        Segment::plain(" ".repeat(LABEL_WIDTH)).dim(),
        Segment::plain(axis.into_iter().collect::<String>()).dim(),
    ]
}
