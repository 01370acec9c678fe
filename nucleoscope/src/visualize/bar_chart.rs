//! Grouped bar charts of condition statistics with standard-error bars.

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;
use strum_macros::{Display, EnumIter};

use super::colors;
use crate::aggregate::ConditionStats;
use crate::metadata::{Genotype, Region};

const PANEL_WIDTH: u32 = 480;
const PANEL_HEIGHT: u32 = 360;
const MARGIN_LEFT: u32 = 48;
const MARGIN_RIGHT: u32 = 16;
const MARGIN_TOP: u32 = 24;
const MARGIN_BOTTOM: u32 = 32;
const GRID_LINES: u32 = 4;
/// Fraction of a region slot covered by its bars.
const GROUP_FILL: f32 = 0.8;
const CAP_HALF_WIDTH: f32 = 5.0;

/// Quantity plotted in one chart panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum Metric {
    IntegratedIntensity,
    TotalArea,
}

impl Metric {
    /// Mean and standard error of this metric.
    pub fn value(&self, stats: &ConditionStats) -> (f64, Option<f64>) {
        match self {
            Metric::IntegratedIntensity => (stats.integrated_intensity_mean, stats.integrated_intensity_sem),
            Metric::TotalArea => (stats.total_area_mean, stats.total_area_sem),
        }
    }
}

fn genotype_color(genotype: Genotype) -> Rgb<u8> {
    match genotype {
        Genotype::Control => colors::CONTROL,
        Genotype::Mutant => colors::MUTANT,
        Genotype::Unknown => colors::UNKNOWN,
    }
}

/// Both metrics side by side: integrated intensity, then area.
pub fn render_bar_chart(stats: &[ConditionStats]) -> RgbImage {
    let left = render_metric_panel(stats, Metric::IntegratedIntensity);
    let right = render_metric_panel(stats, Metric::TotalArea);

    let mut canvas = RgbImage::from_pixel(PANEL_WIDTH * 2, PANEL_HEIGHT, colors::WHITE);
    image::imageops::replace(&mut canvas, &left, 0, 0);
    image::imageops::replace(&mut canvas, &right, PANEL_WIDTH as i64, 0);
    canvas
}

/// One panel: a group of bars per region, one bar per genotype.
///
/// The y axis starts at zero and ends 10% above the tallest bar plus error.
pub fn render_metric_panel(stats: &[ConditionStats], metric: Metric) -> RgbImage {
    let mut image = RgbImage::from_pixel(PANEL_WIDTH, PANEL_HEIGHT, colors::WHITE);

    let plot_x0 = MARGIN_LEFT as f32;
    let plot_x1 = (PANEL_WIDTH - MARGIN_RIGHT) as f32;
    let plot_y0 = MARGIN_TOP as f32;
    let plot_y1 = (PANEL_HEIGHT - MARGIN_BOTTOM) as f32;
    let plot_h = plot_y1 - plot_y0;

    for i in 0..=GRID_LINES {
        let y = plot_y1 - plot_h * i as f32 / GRID_LINES as f32;
        draw_line_segment_mut(&mut image, (plot_x0, y), (plot_x1, y), colors::GRID);
    }

    let mut regions: Vec<Region> = stats.iter().map(|s| s.region).collect();
    regions.sort();
    regions.dedup();
    let mut genotypes: Vec<Genotype> = stats.iter().map(|s| s.genotype).collect();
    genotypes.sort();
    genotypes.dedup();

    let y_max = stats
        .iter()
        .map(|s| {
            let (mean, sem) = metric.value(s);
            mean + sem.unwrap_or(0.0)
        })
        .filter(|v| v.is_finite())
        .fold(0.0f64, f64::max);
    let y_max = if y_max > 0.0 { y_max * 1.1 } else { 1.0 };
    let to_y = |v: f64| plot_y1 - (v.max(0.0) / y_max) as f32 * plot_h;

    if !regions.is_empty() {
        let slot_w = (plot_x1 - plot_x0) / regions.len() as f32;
        let bar_w = slot_w * GROUP_FILL / genotypes.len() as f32;

        for s in stats {
            let Some(ri) = regions.iter().position(|&r| r == s.region) else {
                continue;
            };
            let Some(gi) = genotypes.iter().position(|&g| g == s.genotype) else {
                continue;
            };
            let (mean, sem) = metric.value(s);
            if !mean.is_finite() {
                continue;
            }

            let bar_x = plot_x0 + slot_w * ri as f32 + slot_w * (1.0 - GROUP_FILL) / 2.0 + bar_w * gi as f32;
            let top = to_y(mean);
            let bar_h = (plot_y1 - top).round() as u32;
            if bar_h > 0 {
                let rect = Rect::at(bar_x.round() as i32, top.round() as i32)
                    .of_size((bar_w.round() as u32).max(1), bar_h);
                draw_filled_rect_mut(&mut image, rect, genotype_color(s.genotype));
                draw_hollow_rect_mut(&mut image, rect, colors::DARK_GRAY);
            }

            if let Some(sem) = sem.filter(|v| v.is_finite() && *v > 0.0) {
                let cx = bar_x + bar_w / 2.0;
                let (lo, hi) = (to_y(mean - sem), to_y(mean + sem));
                draw_line_segment_mut(&mut image, (cx, lo), (cx, hi), colors::DARK_GRAY);
                for y in [lo, hi] {
                    draw_line_segment_mut(
                        &mut image,
                        (cx - CAP_HALF_WIDTH, y),
                        (cx + CAP_HALF_WIDTH, y),
                        colors::DARK_GRAY,
                    );
                }
            }
        }
    }

    // Axes
    draw_line_segment_mut(&mut image, (plot_x0, plot_y0), (plot_x0, plot_y1), colors::BLACK);
    draw_line_segment_mut(&mut image, (plot_x0, plot_y1), (plot_x1, plot_y1), colors::BLACK);

    image
}
