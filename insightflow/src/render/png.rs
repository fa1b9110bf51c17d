//! PNG chart painter.
//!
//! Draws straight into an RGBA buffer and hands it to the image crate's
//! PNG encoder. No plotting dependency, just axes, lines, bars and the
//! bitmap font from [`super::font`].

// Pixel math moves between f64 and u32 constantly; the ranges involved
// are all well inside u32.
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]

use chrono::NaiveDate;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, Rgba, RgbaImage};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use super::font;
use super::{ChartArtifact, ChartKind, ChartRenderer, ChartSpec, RenderError};
use crate::dataset::ProcessedDataset;

const WIDTH: u32 = 960;
const HEIGHT: u32 = 600;
const PLOT_LEFT: u32 = 70;
const PLOT_RIGHT: u32 = WIDTH - 30;
const PLOT_TOP: u32 = 60;
const PLOT_BOTTOM: u32 = HEIGHT - 70;
const TITLE_Y: u32 = 20;
const CAPTION_Y: u32 = HEIGHT - 30;
const GRID_DIVISIONS: u32 = 5;

const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);
const AXIS: Rgba<u8> = Rgba([40, 40, 40, 255]);
const GRID: Rgba<u8> = Rgba([225, 225, 225, 255]);
const TEXT: Rgba<u8> = Rgba([30, 30, 30, 255]);
const CAPTION: Rgba<u8> = Rgba([90, 90, 90, 255]);

// Series colors, reused round-robin past six.
const PALETTE: [Rgba<u8>; 6] = [
    Rgba([31, 119, 180, 255]),
    Rgba([255, 127, 14, 255]),
    Rgba([44, 160, 44, 255]),
    Rgba([214, 39, 40, 255]),
    Rgba([148, 103, 189, 255]),
    Rgba([140, 86, 75, 255]),
];

/// Paints chart specs into fixed-size PNG files under one directory.
///
/// Output is deterministic for a given spec and dataset, which the
/// pipeline tests lean on.
#[derive(Debug, Clone)]
pub struct PngChartRenderer {
    out_dir: PathBuf,
}

impl PngChartRenderer {
    /// Creates a renderer writing into `out_dir`, created on demand.
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
        }
    }

    /// Returns the configured output directory.
    #[must_use]
    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }
}

impl ChartRenderer for PngChartRenderer {
    fn render(
        &self,
        spec: &ChartSpec,
        dataset: &ProcessedDataset,
    ) -> Result<ChartArtifact, RenderError> {
        std::fs::create_dir_all(&self.out_dir).map_err(|source| RenderError::OutDir {
            path: self.out_dir.display().to_string(),
            source,
        })?;

        let mut canvas = RgbaImage::from_pixel(WIDTH, HEIGHT, BACKGROUND);
        draw_title(&mut canvas, &spec.title);
        draw_text(&mut canvas, PLOT_LEFT, CAPTION_Y, &spec.caption, 1, CAPTION);

        match spec.kind {
            ChartKind::TimeSeries => paint_time_series(&mut canvas, dataset),
            ChartKind::Bar => paint_bars(&mut canvas, dataset),
        }

        let path = self.out_dir.join(format!("{}.png", spec.file_stem));
        save_png(&canvas, &path).map_err(|source| RenderError::Write {
            path: path.display().to_string(),
            source,
        })?;

        tracing::debug!(path = %path.display(), kind = ?spec.kind, "chart written");

        Ok(ChartArtifact {
            kind: spec.kind,
            path: path.display().to_string(),
        })
    }
}

fn save_png(canvas: &RgbaImage, path: &Path) -> Result<(), image::ImageError> {
    let file = File::create(path)?;
    let encoder = PngEncoder::new(BufWriter::new(file));
    encoder.write_image(
        canvas.as_raw(),
        canvas.width(),
        canvas.height(),
        ExtendedColorType::Rgba8,
    )
}

fn paint_time_series(canvas: &mut RgbaImage, dataset: &ProcessedDataset) {
    let series = dataset.series_by_category();
    let y_max = series
        .values()
        .flatten()
        .map(|(_, revenue)| *revenue)
        .fold(0.0_f64, f64::max)
        .max(1.0);

    draw_frame(canvas, y_max);

    let Some((first_date, last_date)) = dataset.date_span() else {
        return;
    };
    draw_date_labels(canvas, first_date, last_date);

    for (index, (name, points)) in series.iter().enumerate() {
        let color = PALETTE[index % PALETTE.len()];
        let positions: Vec<(u32, u32)> = points
            .iter()
            .map(|(date, revenue)| {
                (
                    x_for_date(*date, first_date, last_date),
                    y_for_value(*revenue, y_max),
                )
            })
            .collect();

        for pair in positions.windows(2) {
            draw_line(canvas, pair[0], pair[1], color);
        }
        for (x, y) in &positions {
            fill_rect(canvas, x.saturating_sub(1), y.saturating_sub(1), 3, 3, color);
        }

        draw_legend_entry(canvas, index, name, color);
    }
}

fn paint_bars(canvas: &mut RgbaImage, dataset: &ProcessedDataset) {
    let totals = dataset.revenue_by_product();
    let y_max = totals
        .first()
        .map_or(1.0, |(_, revenue)| revenue.max(1.0));

    draw_frame(canvas, y_max);

    if totals.is_empty() {
        return;
    }

    let plot_width = PLOT_RIGHT - PLOT_LEFT;
    let slot = (plot_width / totals.len() as u32).max(1);
    let bar_width = (slot * 3 / 5).max(1);
    let label_chars = (slot / font::GLYPH_ADVANCE).max(1) as usize;

    for (index, (name, revenue)) in totals.iter().enumerate() {
        let color = PALETTE[index % PALETTE.len()];
        let slot_left = PLOT_LEFT + index as u32 * slot;
        let bar_left = slot_left + slot.saturating_sub(bar_width) / 2;
        let bar_top = y_for_value(*revenue, y_max);

        fill_rect(
            canvas,
            bar_left,
            bar_top,
            bar_width,
            PLOT_BOTTOM.saturating_sub(bar_top),
            color,
        );

        let value_text = format_value(*revenue);
        let value_x = centered_x(bar_left, bar_width, &value_text);
        draw_text(canvas, value_x, bar_top.saturating_sub(12), &value_text, 1, TEXT);

        let label: String = name.chars().take(label_chars).collect();
        let label_x = centered_x(slot_left, slot, &label);
        draw_text(canvas, label_x, PLOT_BOTTOM + 8, &label, 1, TEXT);
    }
}

fn draw_frame(canvas: &mut RgbaImage, y_max: f64) {
    for step in 0..=GRID_DIVISIONS {
        let y = PLOT_BOTTOM - (PLOT_BOTTOM - PLOT_TOP) * step / GRID_DIVISIONS;
        if step > 0 {
            draw_hline(canvas, PLOT_LEFT, PLOT_RIGHT, y, GRID);
        }
        let value = y_max * f64::from(step) / f64::from(GRID_DIVISIONS);
        let label = format_value(value);
        let label_x = PLOT_LEFT.saturating_sub(font::text_width(&label) + 8);
        draw_text(canvas, label_x, y.saturating_sub(3), &label, 1, TEXT);
    }

    draw_hline(canvas, PLOT_LEFT, PLOT_RIGHT, PLOT_BOTTOM, AXIS);
    draw_vline(canvas, PLOT_LEFT, PLOT_TOP, PLOT_BOTTOM, AXIS);
}

fn draw_date_labels(canvas: &mut RgbaImage, first: NaiveDate, last: NaiveDate) {
    let first_text = first.format("%Y-%m-%d").to_string();
    draw_text(canvas, PLOT_LEFT, PLOT_BOTTOM + 8, &first_text, 1, TEXT);

    if last > first {
        let last_text = last.format("%Y-%m-%d").to_string();
        let x = PLOT_RIGHT.saturating_sub(font::text_width(&last_text));
        draw_text(canvas, x, PLOT_BOTTOM + 8, &last_text, 1, TEXT);
    }
}

fn draw_legend_entry(canvas: &mut RgbaImage, index: usize, name: &str, color: Rgba<u8>) {
    let x = PLOT_RIGHT.saturating_sub(170);
    let y = PLOT_TOP + 10 + index as u32 * 14;
    fill_rect(canvas, x, y, 10, 8, color);
    draw_text(canvas, x + 16, y, name, 1, TEXT);
}

fn draw_title(canvas: &mut RgbaImage, title: &str) {
    let width = font::text_width(title) * 2;
    let x = WIDTH.saturating_sub(width) / 2;
    draw_text(canvas, x, TITLE_Y, title, 2, TEXT);
}

fn x_for_date(date: NaiveDate, first: NaiveDate, last: NaiveDate) -> u32 {
    let span = (last - first).num_days();
    if span <= 0 {
        return (PLOT_LEFT + PLOT_RIGHT) / 2;
    }
    let fraction = (date - first).num_days() as f64 / span as f64;
    PLOT_LEFT + (f64::from(PLOT_RIGHT - PLOT_LEFT) * fraction) as u32
}

fn y_for_value(value: f64, y_max: f64) -> u32 {
    let fraction = (value / y_max).clamp(0.0, 1.0);
    PLOT_BOTTOM - (f64::from(PLOT_BOTTOM - PLOT_TOP) * fraction) as u32
}

fn format_value(value: f64) -> String {
    format!("{value:.0}")
}

fn centered_x(left: u32, width: u32, text: &str) -> u32 {
    left + width.saturating_sub(font::text_width(text)) / 2
}

fn draw_text(canvas: &mut RgbaImage, x: u32, y: u32, text: &str, scale: u32, color: Rgba<u8>) {
    let mut cursor = x;
    for c in text.chars() {
        let columns = font::glyph(c);
        for (col, bits) in columns.iter().enumerate() {
            for row in 0..font::GLYPH_HEIGHT {
                if (bits >> row) & 1 == 1 {
                    fill_rect(
                        canvas,
                        cursor + col as u32 * scale,
                        y + row * scale,
                        scale,
                        scale,
                        color,
                    );
                }
            }
        }
        cursor += font::GLYPH_ADVANCE * scale;
        if cursor >= WIDTH {
            break;
        }
    }
}

fn draw_line(canvas: &mut RgbaImage, from: (u32, u32), to: (u32, u32), color: Rgba<u8>) {
    let (mut x0, mut y0) = (i64::from(from.0), i64::from(from.1));
    let (x1, y1) = (i64::from(to.0), i64::from(to.1));
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let step_x = if x0 < x1 { 1 } else { -1 };
    let step_y = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        put_pixel(canvas, x0, y0, color);
        if x0 == x1 && y0 == y1 {
            break;
        }
        let doubled = 2 * err;
        if doubled >= dy {
            err += dy;
            x0 += step_x;
        }
        if doubled <= dx {
            err += dx;
            y0 += step_y;
        }
    }
}

fn draw_hline(canvas: &mut RgbaImage, x0: u32, x1: u32, y: u32, color: Rgba<u8>) {
    for x in x0..=x1 {
        put_pixel(canvas, i64::from(x), i64::from(y), color);
    }
}

fn draw_vline(canvas: &mut RgbaImage, x: u32, y0: u32, y1: u32, color: Rgba<u8>) {
    for y in y0..=y1 {
        put_pixel(canvas, i64::from(x), i64::from(y), color);
    }
}

fn fill_rect(canvas: &mut RgbaImage, x: u32, y: u32, width: u32, height: u32, color: Rgba<u8>) {
    for dy in 0..height {
        for dx in 0..width {
            put_pixel(canvas, i64::from(x + dx), i64::from(y + dy), color);
        }
    }
}

fn put_pixel(canvas: &mut RgbaImage, x: i64, y: i64, color: Rgba<u8>) {
    if x >= 0 && y >= 0 && x < i64::from(WIDTH) && y < i64::from(HEIGHT) {
        canvas.put_pixel(x as u32, y as u32, color);
    }
}
