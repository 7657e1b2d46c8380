//! Chart construction.
//!
//! Builds the three report charts as [`Canvas`] values: a two panel
//! time series of all readings, a morning/evening comparison, and a
//! grouped bar chart of cohort averages with error bars. Charts are
//! laid out in screen coordinates (origin top-left) and carry no
//! backend specifics, so the same canvas renders to SVG and PDF.

use chrono::{DateTime, Duration, FixedOffset};

use super::{approx_text_width, Canvas, Color, RenderError, Stroke, TextAnchor};
use crate::data::{ChannelStats, CohortSummary, Reading};

/// Pixel dimensions of a chart canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartSize {
    pub width: f64,
    pub height: f64,
}

impl ChartSize {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

const SERIES_SYS: Color = Color::rgb(255, 0, 0);
const SERIES_DIA: Color = Color::rgb(0, 0, 255);
const SERIES_PULSE: Color = Color::rgb(0, 128, 0);

// Softer tones for the comparison lines and the bars, blended toward
// the white page background.
const COMPARE_SYS: Color = Color::rgb(255, 51, 51);
const COMPARE_DIA: Color = Color::rgb(51, 51, 255);
const COMPARE_PULSE: Color = Color::rgb(51, 153, 51);
const BAR_SYS: Color = Color::rgb(255, 76, 76);
const BAR_DIA: Color = Color::rgb(76, 76, 255);
const BAR_PULSE: Color = Color::rgb(76, 166, 76);

const GRID_COLOR: Color = Color::rgb(231, 231, 231);
const LEGEND_BORDER: Color = Color::rgb(120, 120, 120);

const MARGIN_LEFT: f64 = 90.0;
const MARGIN_RIGHT: f64 = 30.0;
const TITLE_BAND: f64 = 40.0;
const PANEL_GAP: f64 = 30.0;
/// Vertical room under the bottom panel for rotated time labels.
const TIME_LABEL_BAND: f64 = 90.0;
const AXIS_LABEL_BAND: f64 = 25.0;

const TITLE_SIZE: f64 = 14.0;
const LABEL_SIZE: f64 = 12.0;
const TICK_SIZE: f64 = 10.0;
const LEGEND_SIZE: f64 = 11.0;

const TICK_MARK: f64 = 4.0;
const MARKER_RADIUS: f64 = 3.0;
const MARKER_SIDE: f64 = 6.0;

/// Two panel time series of systolic/diastolic pressure and pulse.
///
/// Readings are expected in chronological order. The x axis spans
/// whole calendar days with one tick per midnight.
pub fn time_series_chart(
    readings: &[Reading],
    title: &str,
    size: ChartSize,
) -> Result<Canvas, RenderError> {
    if readings.is_empty() {
        return Err(RenderError::EmptyData(title.to_string()));
    }

    let mut canvas = Canvas::new(size.width, size.height);
    let (upper, lower) = two_panels(size);

    let ticks = day_ticks(
        readings[0].timestamp,
        readings[readings.len() - 1].timestamp,
    );
    let xscale = time_scale(&ticks, upper);

    let pressure_domain = padded_domain(
        readings
            .iter()
            .flat_map(|r| [f64::from(r.systolic), f64::from(r.diastolic)]),
    );
    let pressure_scale = LinearScale::new(pressure_domain, (upper.bottom, upper.top));
    let pressure_ticks = nice_ticks(pressure_domain.0, pressure_domain.1, 5);

    let pulse_domain = padded_domain(readings.iter().map(|r| f64::from(r.pulse)));
    let pulse_scale = LinearScale::new(pulse_domain, (lower.bottom, lower.top));
    let pulse_ticks = nice_ticks(pulse_domain.0, pulse_domain.1, 5);

    draw_title(&mut canvas, size, title);
    draw_time_grid(&mut canvas, upper, &xscale, &ticks);
    draw_time_grid(&mut canvas, lower, &xscale, &ticks);
    draw_y_axis(&mut canvas, upper, &pressure_scale, &pressure_ticks);
    draw_y_axis(&mut canvas, lower, &pulse_scale, &pulse_ticks);

    let line = |color: Color| SeriesStyle {
        stroke: Stroke::solid(color, 2.0),
        marker: Marker::None,
    };
    draw_series(
        &mut canvas,
        &xscale,
        &pressure_scale,
        &series_points(readings, |r| f64::from(r.systolic)),
        line(SERIES_SYS),
    );
    draw_series(
        &mut canvas,
        &xscale,
        &pressure_scale,
        &series_points(readings, |r| f64::from(r.diastolic)),
        line(SERIES_DIA),
    );
    draw_series(
        &mut canvas,
        &xscale,
        &pulse_scale,
        &series_points(readings, |r| f64::from(r.pulse)),
        line(SERIES_PULSE),
    );

    draw_frame(&mut canvas, upper);
    draw_frame(&mut canvas, lower);
    draw_legend(
        &mut canvas,
        upper,
        &[
            ("Systolisch".to_string(), LegendSample::Line(line(SERIES_SYS))),
            (
                "Diastolisch".to_string(),
                LegendSample::Line(line(SERIES_DIA)),
            ),
        ],
    );
    draw_legend(
        &mut canvas,
        lower,
        &[("Puls".to_string(), LegendSample::Line(line(SERIES_PULSE)))],
    );

    draw_time_labels(&mut canvas, lower, &xscale, &ticks, "%d.%m.%Y %H:%M");
    draw_ylabel(&mut canvas, upper, "Blutdruck (mmHg)");
    draw_ylabel(&mut canvas, lower, "Puls (bpm)");
    draw_xlabel(&mut canvas, size, lower, "Datum/Zeit");

    Ok(canvas)
}

/// Morning and evening cohorts side by side.
///
/// Morning series are solid with circle markers, evening series dashed
/// with square markers. A cohort without readings contributes neither
/// lines nor legend entries.
pub fn comparison_chart(
    morning: &[Reading],
    evening: &[Reading],
    size: ChartSize,
) -> Result<Canvas, RenderError> {
    let (first, last) = match joint_bounds(morning, evening) {
        Some(bounds) => bounds,
        None => {
            return Err(RenderError::EmptyData("Morgen- und Abendwerte".to_string()));
        }
    };

    let mut canvas = Canvas::new(size.width, size.height);
    let (upper, lower) = two_panels(size);

    let ticks = day_ticks(first, last);
    let xscale = time_scale(&ticks, upper);

    let pressure_domain = padded_domain(
        morning
            .iter()
            .chain(evening)
            .flat_map(|r| [f64::from(r.systolic), f64::from(r.diastolic)]),
    );
    let pressure_scale = LinearScale::new(pressure_domain, (upper.bottom, upper.top));
    let pressure_ticks = nice_ticks(pressure_domain.0, pressure_domain.1, 5);

    let pulse_domain = padded_domain(morning.iter().chain(evening).map(|r| f64::from(r.pulse)));
    let pulse_scale = LinearScale::new(pulse_domain, (lower.bottom, lower.top));
    let pulse_ticks = nice_ticks(pulse_domain.0, pulse_domain.1, 5);

    draw_title(
        &mut canvas,
        size,
        "Morgen- und Abendblutdruckwerte im Vergleich",
    );
    draw_time_grid(&mut canvas, upper, &xscale, &ticks);
    draw_time_grid(&mut canvas, lower, &xscale, &ticks);
    draw_y_axis(&mut canvas, upper, &pressure_scale, &pressure_ticks);
    draw_y_axis(&mut canvas, lower, &pulse_scale, &pulse_ticks);

    let mut pressure_entries: Vec<(String, LegendSample)> = Vec::new();
    let mut pulse_entries: Vec<(String, LegendSample)> = Vec::new();

    for (cohort, suffix, is_evening) in [(morning, "Morgens", false), (evening, "Abends", true)] {
        if cohort.is_empty() {
            continue;
        }

        draw_series(
            &mut canvas,
            &xscale,
            &pressure_scale,
            &series_points(cohort, |r| f64::from(r.systolic)),
            cohort_style(COMPARE_SYS, is_evening),
        );
        draw_series(
            &mut canvas,
            &xscale,
            &pressure_scale,
            &series_points(cohort, |r| f64::from(r.diastolic)),
            cohort_style(COMPARE_DIA, is_evening),
        );
        draw_series(
            &mut canvas,
            &xscale,
            &pulse_scale,
            &series_points(cohort, |r| f64::from(r.pulse)),
            cohort_style(COMPARE_PULSE, is_evening),
        );

        pressure_entries.push((
            format!("Systolisch ({})", suffix),
            LegendSample::Line(cohort_style(COMPARE_SYS, is_evening)),
        ));
        pressure_entries.push((
            format!("Diastolisch ({})", suffix),
            LegendSample::Line(cohort_style(COMPARE_DIA, is_evening)),
        ));
        pulse_entries.push((
            format!("Puls ({})", suffix),
            LegendSample::Line(cohort_style(COMPARE_PULSE, is_evening)),
        ));
    }

    draw_frame(&mut canvas, upper);
    draw_frame(&mut canvas, lower);
    draw_legend(&mut canvas, upper, &pressure_entries);
    draw_legend(&mut canvas, lower, &pulse_entries);

    draw_time_labels(&mut canvas, lower, &xscale, &ticks, "%d.%m.%Y");
    draw_ylabel(&mut canvas, upper, "Blutdruck (mmHg)");
    draw_ylabel(&mut canvas, lower, "Puls (bpm)");
    draw_xlabel(&mut canvas, size, lower, "Datum");

    Ok(canvas)
}

/// Grouped bar chart of per-cohort channel means with one standard
/// deviation as error bars. One category per summary, three bars per
/// category, y axis anchored at zero.
pub fn averages_chart(summaries: &[CohortSummary], size: ChartSize) -> Result<Canvas, RenderError> {
    if summaries.is_empty() {
        return Err(RenderError::EmptyData("Durchschnittswerte".to_string()));
    }

    let mut canvas = Canvas::new(size.width, size.height);
    let panel = single_panel(size);

    let x_domain = (-0.5, summaries.len() as f64 - 0.5);
    let xscale = LinearScale::new(x_domain, (panel.left, panel.right));

    let mut y_max = 0.0f64;
    for summary in summaries {
        for stats in [summary.systolic, summary.diastolic, summary.pulse] {
            y_max = y_max.max(stats.mean + stats.std_dev);
        }
    }
    let y_max = (y_max * 1.05).max(1.0);
    let yscale = LinearScale::new((0.0, y_max), (panel.bottom, panel.top));
    let y_ticks = nice_ticks(0.0, y_max, 6);

    draw_title(
        &mut canvas,
        size,
        "Durchschnittliche Blutdruckwerte mit Standardabweichung",
    );
    draw_y_axis(&mut canvas, panel, &yscale, &y_ticks);

    let base = yscale.scale(0.0);
    for (i, summary) in summaries.iter().enumerate() {
        let center = i as f64;
        let bars = [
            (center - 0.25, summary.systolic, BAR_SYS),
            (center, summary.diastolic, BAR_DIA),
            (center + 0.25, summary.pulse, BAR_PULSE),
        ];
        for (x, stats, color) in bars {
            let left = xscale.scale(x - 0.125);
            let right = xscale.scale(x + 0.125);
            let top = yscale.scale(stats.mean);
            canvas.rect(left, top, right - left, base - top, color);
            draw_error_bar(&mut canvas, xscale.scale(x), &yscale, stats);
        }

        canvas.text_anchored(
            xscale.scale(center),
            panel.bottom + 20.0,
            summary.label.clone(),
            LABEL_SIZE,
            Color::BLACK,
            TextAnchor::Middle,
        );
    }

    draw_frame(&mut canvas, panel);
    draw_legend(
        &mut canvas,
        panel,
        &[
            ("Systolisch".to_string(), LegendSample::Swatch(BAR_SYS)),
            ("Diastolisch".to_string(), LegendSample::Swatch(BAR_DIA)),
            ("Puls".to_string(), LegendSample::Swatch(BAR_PULSE)),
        ],
    );
    draw_ylabel(&mut canvas, panel, "Werte");
    draw_xlabel(&mut canvas, size, panel, "Kategorie");

    Ok(canvas)
}

/// Plot area bounds in screen coordinates.
#[derive(Debug, Clone, Copy)]
struct Panel {
    left: f64,
    top: f64,
    right: f64,
    bottom: f64,
}

fn two_panels(size: ChartSize) -> (Panel, Panel) {
    let left = MARGIN_LEFT;
    let right = size.width - MARGIN_RIGHT;
    let plot_top = TITLE_BAND;
    let plot_bottom = size.height - TIME_LABEL_BAND - AXIS_LABEL_BAND;
    let panel_height = (plot_bottom - plot_top - PANEL_GAP) / 2.0;

    let upper = Panel {
        left,
        top: plot_top,
        right,
        bottom: plot_top + panel_height,
    };
    let lower = Panel {
        left,
        top: plot_bottom - panel_height,
        right,
        bottom: plot_bottom,
    };
    (upper, lower)
}

fn single_panel(size: ChartSize) -> Panel {
    Panel {
        left: MARGIN_LEFT,
        top: TITLE_BAND,
        right: size.width - MARGIN_RIGHT,
        bottom: size.height - 70.0,
    }
}

/// Maps data values to screen positions. The range may be inverted,
/// which is how y axes are drawn with a top-left origin.
#[derive(Debug, Clone, Copy)]
struct LinearScale {
    domain: (f64, f64),
    range: (f64, f64),
}

impl LinearScale {
    /// A degenerate domain is widened so the mapping stays defined.
    fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
        let domain = if domain.0 == domain.1 {
            (domain.0 - 0.5, domain.0 + 0.5)
        } else {
            domain
        };
        Self { domain, range }
    }

    fn scale(&self, value: f64) -> f64 {
        let t = (value - self.domain.0) / (self.domain.1 - self.domain.0);
        self.range.0 + t * (self.range.1 - self.range.0)
    }
}

/// Rounded tick positions covering `min..=max` with a step of
/// 1, 2 or 5 times a power of ten.
fn nice_ticks(min: f64, max: f64, target: usize) -> Vec<f64> {
    let span = max - min;
    if span <= 0.0 {
        return vec![min];
    }

    let raw_step = span / target.max(1) as f64;
    let magnitude = 10f64.powf(raw_step.log10().floor());
    let normalized = raw_step / magnitude;
    let factor = if normalized <= 1.0 {
        1.0
    } else if normalized <= 2.0 {
        2.0
    } else if normalized <= 5.0 {
        5.0
    } else {
        10.0
    };
    let step = factor * magnitude;

    let first = (min / step).ceil() as i64;
    let last = ((max / step) + 1e-9).floor() as i64;
    (first..=last).map(|i| i as f64 * step).collect()
}

fn tick_label(value: f64) -> String {
    if value.fract().abs() < 1e-9 {
        format!("{}", value as i64)
    } else {
        format!("{:.1}", value)
    }
}

/// Midnight ticks from the start of the first day through the midnight
/// after the last, one per calendar day.
fn day_ticks(
    first: DateTime<FixedOffset>,
    last: DateTime<FixedOffset>,
) -> Vec<DateTime<FixedOffset>> {
    let offset = *first.offset();
    let mut ticks = Vec::new();

    let mut day = first.date_naive();
    let end = last.date_naive() + Duration::days(1);
    while day <= end {
        let midnight = day.and_hms_opt(0, 0, 0).expect("valid time");
        if let chrono::LocalResult::Single(tick) = midnight.and_local_timezone(offset) {
            ticks.push(tick);
        }
        day = day + Duration::days(1);
    }
    ticks
}

/// Scale over the full padded day range. Day ticks always hold at
/// least two entries, so the domain is never degenerate.
fn time_scale(ticks: &[DateTime<FixedOffset>], panel: Panel) -> LinearScale {
    let domain = (
        ticks[0].timestamp() as f64,
        ticks[ticks.len() - 1].timestamp() as f64,
    );
    LinearScale::new(domain, (panel.left, panel.right))
}

fn joint_bounds(
    a: &[Reading],
    b: &[Reading],
) -> Option<(DateTime<FixedOffset>, DateTime<FixedOffset>)> {
    let mut bounds: Option<(DateTime<FixedOffset>, DateTime<FixedOffset>)> = None;
    for reading in a.iter().chain(b) {
        bounds = Some(match bounds {
            Some((first, last)) => (
                first.min(reading.timestamp),
                last.max(reading.timestamp),
            ),
            None => (reading.timestamp, reading.timestamp),
        });
    }
    bounds
}

/// The axis domain with 5 percent padding on each side, at least one
/// unit when the values are flat.
fn padded_domain(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for value in values {
        min = min.min(value);
        max = max.max(value);
    }
    if min > max {
        return (0.0, 1.0);
    }
    let pad = ((max - min) * 0.05).max(1.0);
    (min - pad, max + pad)
}

fn series_points(readings: &[Reading], value: impl Fn(&Reading) -> f64) -> Vec<(f64, f64)> {
    readings
        .iter()
        .map(|r| (r.timestamp.timestamp() as f64, value(r)))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Marker {
    None,
    Circle,
    Square,
}

#[derive(Debug, Clone, Copy)]
struct SeriesStyle {
    stroke: Stroke,
    marker: Marker,
}

fn cohort_style(color: Color, is_evening: bool) -> SeriesStyle {
    if is_evening {
        SeriesStyle {
            stroke: Stroke::dashed(color, 2.0),
            marker: Marker::Square,
        }
    } else {
        SeriesStyle {
            stroke: Stroke::solid(color, 2.0),
            marker: Marker::Circle,
        }
    }
}

enum LegendSample {
    Line(SeriesStyle),
    Swatch(Color),
}

fn draw_series(
    canvas: &mut Canvas,
    xscale: &LinearScale,
    yscale: &LinearScale,
    points: &[(f64, f64)],
    style: SeriesStyle,
) {
    let scaled: Vec<(f64, f64)> = points
        .iter()
        .map(|&(x, y)| (xscale.scale(x), yscale.scale(y)))
        .collect();

    if scaled.len() > 1 {
        canvas.polyline(scaled.clone(), style.stroke);
    }
    for &(x, y) in &scaled {
        draw_marker(canvas, x, y, style);
    }
}

fn draw_marker(canvas: &mut Canvas, x: f64, y: f64, style: SeriesStyle) {
    match style.marker {
        Marker::Circle => canvas.circle(x, y, MARKER_RADIUS, style.stroke.color),
        Marker::Square => canvas.square(x, y, MARKER_SIDE, style.stroke.color),
        Marker::None => {}
    }
}

fn draw_frame(canvas: &mut Canvas, panel: Panel) {
    draw_box(
        canvas,
        panel.left,
        panel.top,
        panel.right,
        panel.bottom,
        Stroke::solid(Color::BLACK, 1.0),
    );
}

fn draw_box(canvas: &mut Canvas, x0: f64, y0: f64, x1: f64, y1: f64, stroke: Stroke) {
    canvas.line(x0, y0, x1, y0, stroke);
    canvas.line(x0, y1, x1, y1, stroke);
    canvas.line(x0, y0, x0, y1, stroke);
    canvas.line(x1, y0, x1, y1, stroke);
}

/// Horizontal grid lines, tick marks and value labels for a y axis.
fn draw_y_axis(canvas: &mut Canvas, panel: Panel, scale: &LinearScale, ticks: &[f64]) {
    for &tick in ticks {
        let y = scale.scale(tick);
        canvas.line(panel.left, y, panel.right, y, Stroke::solid(GRID_COLOR, 1.0));
        canvas.line(
            panel.left - TICK_MARK,
            y,
            panel.left,
            y,
            Stroke::solid(Color::BLACK, 1.0),
        );
        canvas.text_anchored(
            panel.left - TICK_MARK - 4.0,
            y + TICK_SIZE / 3.0,
            tick_label(tick),
            TICK_SIZE,
            Color::BLACK,
            TextAnchor::End,
        );
    }
}

/// Vertical grid lines and tick marks at each day boundary.
fn draw_time_grid(
    canvas: &mut Canvas,
    panel: Panel,
    xscale: &LinearScale,
    ticks: &[DateTime<FixedOffset>],
) {
    for tick in ticks {
        let x = xscale.scale(tick.timestamp() as f64);
        canvas.line(x, panel.top, x, panel.bottom, Stroke::solid(GRID_COLOR, 1.0));
        canvas.line(
            x,
            panel.bottom,
            x,
            panel.bottom + TICK_MARK,
            Stroke::solid(Color::BLACK, 1.0),
        );
    }
}

/// Rotated timestamp labels under a panel, right ends at the ticks.
fn draw_time_labels(
    canvas: &mut Canvas,
    panel: Panel,
    xscale: &LinearScale,
    ticks: &[DateTime<FixedOffset>],
    format: &str,
) {
    for tick in ticks {
        let x = xscale.scale(tick.timestamp() as f64);
        canvas.rotated_text(
            x,
            panel.bottom + TICK_MARK + 10.0,
            tick.format(format).to_string(),
            TICK_SIZE,
            Color::BLACK,
            TextAnchor::End,
            45.0,
        );
    }
}

fn draw_title(canvas: &mut Canvas, size: ChartSize, title: &str) {
    canvas.bold_text(
        size.width / 2.0,
        25.0,
        title,
        TITLE_SIZE,
        Color::BLACK,
        TextAnchor::Middle,
    );
}

fn draw_ylabel(canvas: &mut Canvas, panel: Panel, text: &str) {
    canvas.rotated_text(
        panel.left - 55.0,
        (panel.top + panel.bottom) / 2.0,
        text,
        LABEL_SIZE,
        Color::BLACK,
        TextAnchor::Middle,
        90.0,
    );
}

fn draw_xlabel(canvas: &mut Canvas, size: ChartSize, panel: Panel, text: &str) {
    canvas.text_anchored(
        (panel.left + panel.right) / 2.0,
        size.height - 10.0,
        text,
        LABEL_SIZE,
        Color::BLACK,
        TextAnchor::Middle,
    );
}

fn draw_error_bar(canvas: &mut Canvas, x: f64, yscale: &LinearScale, stats: ChannelStats) {
    let stroke = Stroke::solid(Color::BLACK, 1.5);
    let low = (stats.mean - stats.std_dev).max(0.0);
    let high = stats.mean + stats.std_dev;
    let y_low = yscale.scale(low);
    let y_high = yscale.scale(high);

    canvas.line(x, y_high, x, y_low, stroke);
    canvas.line(x - 4.0, y_high, x + 4.0, y_high, stroke);
    canvas.line(x - 4.0, y_low, x + 4.0, y_low, stroke);
}

fn draw_legend(canvas: &mut Canvas, panel: Panel, entries: &[(String, LegendSample)]) {
    if entries.is_empty() {
        return;
    }

    let text_width = entries
        .iter()
        .map(|(label, _)| approx_text_width(label, LEGEND_SIZE))
        .fold(0.0, f64::max);
    let width = text_width + 48.0;
    let row = 16.0;
    let height = entries.len() as f64 * row + 8.0;
    let x0 = panel.right - width - 8.0;
    let y0 = panel.top + 8.0;

    canvas.rect(x0, y0, width, height, Color::WHITE);
    draw_box(
        canvas,
        x0,
        y0,
        x0 + width,
        y0 + height,
        Stroke::solid(LEGEND_BORDER, 1.0),
    );

    for (i, (label, sample)) in entries.iter().enumerate() {
        let cy = y0 + 12.0 + i as f64 * row;
        let x_sample = x0 + 6.0;
        match sample {
            LegendSample::Line(style) => {
                canvas.line(x_sample, cy, x_sample + 24.0, cy, style.stroke);
                draw_marker(canvas, x_sample + 12.0, cy, *style);
            }
            LegendSample::Swatch(color) => {
                canvas.rect(x_sample, cy - 5.0, 24.0, 10.0, *color);
            }
        }
        canvas.text(
            x_sample + 30.0,
            cy + LEGEND_SIZE / 3.0,
            label.clone(),
            LEGEND_SIZE,
            Color::BLACK,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{parse_timestamp, parse_utc_offset, ChannelStats};
    use crate::render::Primitive;

    fn reading(ts: &str, systolic: i32, diastolic: i32, pulse: i32) -> Reading {
        let offset = parse_utc_offset("+02:00").unwrap();
        Reading::new(parse_timestamp(ts, offset).unwrap(), systolic, diastolic, pulse)
    }

    fn texts(canvas: &Canvas) -> Vec<&str> {
        canvas
            .primitives()
            .iter()
            .filter_map(|p| match p {
                Primitive::Text { content, .. } => Some(content.as_str()),
                _ => None,
            })
            .collect()
    }

    fn size() -> ChartSize {
        ChartSize::new(1200.0, 800.0)
    }

    #[test]
    fn test_linear_scale_maps_endpoints() {
        let scale = LinearScale::new((0.0, 10.0), (0.0, 100.0));
        assert!((scale.scale(0.0) - 0.0).abs() < 1e-9);
        assert!((scale.scale(10.0) - 100.0).abs() < 1e-9);
        assert!((scale.scale(5.0) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_linear_scale_inverted_range() {
        let scale = LinearScale::new((0.0, 10.0), (100.0, 0.0));
        assert!((scale.scale(2.5) - 75.0).abs() < 1e-9);
    }

    #[test]
    fn test_linear_scale_degenerate_domain() {
        let scale = LinearScale::new((5.0, 5.0), (0.0, 100.0));
        assert!((scale.scale(5.0) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_nice_ticks_round_steps() {
        assert_eq!(nice_ticks(0.0, 200.0, 5), vec![0.0, 50.0, 100.0, 150.0, 200.0]);
        assert_eq!(
            nice_ticks(97.0, 143.0, 5),
            vec![100.0, 110.0, 120.0, 130.0, 140.0]
        );
    }

    #[test]
    fn test_nice_ticks_flat_domain() {
        assert_eq!(nice_ticks(5.0, 5.0, 5), vec![5.0]);
    }

    #[test]
    fn test_tick_label_trims_integers() {
        assert_eq!(tick_label(50.0), "50");
        assert_eq!(tick_label(8.5), "8.5");
    }

    #[test]
    fn test_padded_domain() {
        let (min, max) = padded_domain([120.0, 140.0].into_iter());
        assert!((min - 119.0).abs() < 1e-9);
        assert!((max - 141.0).abs() < 1e-9);
    }

    #[test]
    fn test_padded_domain_flat_values() {
        let (min, max) = padded_domain([80.0, 80.0].into_iter());
        assert!((min - 79.0).abs() < 1e-9);
        assert!((max - 81.0).abs() < 1e-9);
    }

    #[test]
    fn test_day_ticks_cover_whole_days() {
        let offset = parse_utc_offset("+02:00").unwrap();
        let first = parse_timestamp("2024-03-01 10:00:00", offset).unwrap();
        let last = parse_timestamp("2024-03-02 20:00:00", offset).unwrap();

        let ticks = day_ticks(first, last);
        assert_eq!(ticks.len(), 3);
        assert_eq!(ticks[0].to_rfc3339(), "2024-03-01T00:00:00+02:00");
        assert_eq!(ticks[2].to_rfc3339(), "2024-03-03T00:00:00+02:00");
    }

    #[test]
    fn test_time_series_chart_empty_input() {
        let result = time_series_chart(&[], "Alle Blutdruckdaten", size());
        assert!(matches!(result, Err(RenderError::EmptyData(_))));
    }

    #[test]
    fn test_time_series_chart_labels() {
        let readings = vec![
            reading("2024-03-01 07:30:00", 120, 80, 60),
            reading("2024-03-01 19:30:00", 130, 85, 65),
            reading("2024-03-02 07:45:00", 125, 82, 62),
        ];

        let canvas = time_series_chart(&readings, "Alle Blutdruckdaten", size()).unwrap();
        assert_eq!(canvas.width, 1200.0);
        let labels = texts(&canvas);
        assert!(labels.contains(&"Alle Blutdruckdaten"));
        assert!(labels.contains(&"Systolisch"));
        assert!(labels.contains(&"Diastolisch"));
        assert!(labels.contains(&"Puls"));
        assert!(labels.contains(&"Blutdruck (mmHg)"));
        assert!(labels.contains(&"Datum/Zeit"));
        // Day boundary ticks for 01.03 through 03.03.
        assert!(labels.contains(&"01.03.2024 00:00"));
        assert!(labels.contains(&"03.03.2024 00:00"));
    }

    #[test]
    fn test_time_series_chart_has_three_polylines() {
        let readings = vec![
            reading("2024-03-01 07:30:00", 120, 80, 60),
            reading("2024-03-01 19:30:00", 130, 85, 65),
        ];

        let canvas = time_series_chart(&readings, "Alle Blutdruckdaten", size()).unwrap();
        let polylines = canvas
            .primitives()
            .iter()
            .filter(|p| matches!(p, Primitive::Polyline { .. }))
            .count();
        assert_eq!(polylines, 3);
    }

    #[test]
    fn test_comparison_chart_empty_cohorts() {
        let result = comparison_chart(&[], &[], size());
        assert!(matches!(result, Err(RenderError::EmptyData(_))));
    }

    #[test]
    fn test_comparison_chart_morning_only() {
        let morning = vec![
            reading("2024-03-01 07:30:00", 120, 80, 60),
            reading("2024-03-02 07:45:00", 125, 82, 62),
        ];

        let canvas = comparison_chart(&morning, &[], size()).unwrap();
        let labels = texts(&canvas);
        assert!(labels.contains(&"Systolisch (Morgens)"));
        assert!(labels.contains(&"Puls (Morgens)"));
        assert!(!labels.contains(&"Systolisch (Abends)"));
        // Date only tick labels.
        assert!(labels.contains(&"01.03.2024"));
    }

    #[test]
    fn test_comparison_chart_evening_markers_are_squares() {
        let morning = vec![reading("2024-03-01 07:30:00", 120, 80, 60)];
        let evening = vec![reading("2024-03-01 19:30:00", 130, 85, 65)];

        let canvas = comparison_chart(&morning, &evening, size()).unwrap();
        let squares = canvas
            .primitives()
            .iter()
            .filter(|p| matches!(p, Primitive::Square { .. }))
            .count();
        let circles = canvas
            .primitives()
            .iter()
            .filter(|p| matches!(p, Primitive::Circle { .. }))
            .count();
        // Three series per cohort plus one legend sample per series.
        assert_eq!(squares, 6);
        assert_eq!(circles, 6);
    }

    #[test]
    fn test_averages_chart_empty_input() {
        let result = averages_chart(&[], size());
        assert!(matches!(result, Err(RenderError::EmptyData(_))));
    }

    #[test]
    fn test_averages_chart_bars_and_labels() {
        let stats = ChannelStats::compute(&[120, 130, 140]).unwrap();
        let summaries = vec![
            CohortSummary {
                label: "Komplett".to_string(),
                count: 3,
                systolic: stats,
                diastolic: stats,
                pulse: stats,
            },
            CohortSummary {
                label: "Morgens".to_string(),
                count: 3,
                systolic: stats,
                diastolic: stats,
                pulse: stats,
            },
        ];

        let canvas = averages_chart(&summaries, size()).unwrap();
        let labels = texts(&canvas);
        assert!(labels.contains(&"Komplett"));
        assert!(labels.contains(&"Morgens"));
        assert!(labels.contains(&"Kategorie"));
        assert!(labels.contains(&"Werte"));
        // Legend carries the full German channel names, not the
        // column abbreviations of the data table.
        assert!(labels.contains(&"Systolisch"));
        assert!(labels.contains(&"Diastolisch"));
        assert!(labels.contains(&"Puls"));
        assert!(!labels.contains(&"SYS"));
        assert!(!labels.contains(&"DIA"));

        // Six bars, one legend background and three legend swatches.
        let rects = canvas
            .primitives()
            .iter()
            .filter(|p| matches!(p, Primitive::Rect { .. }))
            .count();
        assert_eq!(rects, 10);
    }

    #[test]
    fn test_averages_chart_y_axis_starts_at_zero() {
        let stats = ChannelStats::compute(&[120]).unwrap();
        let summaries = vec![CohortSummary {
            label: "Komplett".to_string(),
            count: 1,
            systolic: stats,
            diastolic: stats,
            pulse: stats,
        }];

        let canvas = averages_chart(&summaries, size()).unwrap();
        let labels = texts(&canvas);
        assert!(labels.contains(&"0"));
    }
}
