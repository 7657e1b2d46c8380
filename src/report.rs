//! Report generation.
//!
//! Turns classified readings into the final deliverables: one SVG per
//! chart and a multi page PDF report with a title page, the charts,
//! and the full reading list as colored tables.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, FixedOffset};
use tracing::info;

use crate::data::{Cohorts, CohortSummary, MINUTE_FORMAT};
use crate::render::{
    averages_chart, comparison_chart, render_pdf, render_svg, table_pages, time_series_chart,
    Canvas, ChartSize, Color, RenderError, TextAnchor, PAGE_HEIGHT, PAGE_WIDTH, SVG_CHART_HEIGHT,
    SVG_CHART_WIDTH,
};

/// Report title used when none is given on the command line.
pub const DEFAULT_TITLE: &str = "Blutdruckdaten Sascha Effert";

const COMPLETE_TITLE: &str = "Alle Blutdruckdaten";
const MORNING_TITLE: &str = "Morgendliche Blutdruckdaten";
const EVENING_TITLE: &str = "Abendliche Blutdruckdaten";
const NO_COHORTS_MESSAGE: &str = "Keine Morgen- oder Abenddaten vorhanden";

/// Where and how to write the report.
#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub output_dir: PathBuf,
    pub title: String,
    /// Requested period start, shown on the title page. Falls back to
    /// the first reading.
    pub start: Option<DateTime<FixedOffset>>,
    /// Requested period end. Falls back to the last reading.
    pub end: Option<DateTime<FixedOffset>>,
}

/// Paths of everything a report run wrote.
#[derive(Debug)]
pub struct ReportFiles {
    pub pdf: PathBuf,
    pub svgs: Vec<PathBuf>,
}

/// Write all chart SVGs and the PDF report into the output directory.
///
/// Charts for empty cohorts are skipped; the comparison page of the
/// PDF is replaced with a note when neither morning nor evening
/// readings exist. Fails when there are no readings at all.
pub fn generate(cohorts: &Cohorts, options: &ReportOptions) -> Result<ReportFiles> {
    if cohorts.complete.is_empty() {
        bail!("no readings to report on");
    }

    fs::create_dir_all(&options.output_dir)
        .with_context(|| format!("creating {}", options.output_dir.display()))?;

    let summaries: Vec<CohortSummary> = [
        ("Komplett", &cohorts.complete),
        ("Morgens", &cohorts.morning),
        ("Abends", &cohorts.evening),
    ]
    .into_iter()
    .filter_map(|(label, readings)| CohortSummary::compute(label, readings))
    .collect();

    let svg_size = ChartSize::new(SVG_CHART_WIDTH, SVG_CHART_HEIGHT);
    let page_size = ChartSize::new(PAGE_WIDTH, PAGE_HEIGHT);
    let dir = options.output_dir.as_path();
    let mut svgs = Vec::new();

    let complete = time_series_chart(&cohorts.complete, COMPLETE_TITLE, svg_size)?;
    svgs.push(write_svg(dir, "bloodpressure_complete.svg", &complete)?);

    if cohorts.morning.is_empty() {
        info!("no morning readings, skipping morning chart");
    } else {
        let chart = time_series_chart(&cohorts.morning, MORNING_TITLE, svg_size)?;
        svgs.push(write_svg(dir, "bloodpressure_morning.svg", &chart)?);
    }

    if cohorts.evening.is_empty() {
        info!("no evening readings, skipping evening chart");
    } else {
        let chart = time_series_chart(&cohorts.evening, EVENING_TITLE, svg_size)?;
        svgs.push(write_svg(dir, "bloodpressure_evening.svg", &chart)?);
    }

    match comparison_chart(&cohorts.morning, &cohorts.evening, svg_size) {
        Ok(chart) => svgs.push(write_svg(dir, "bloodpressure_morning_evening.svg", &chart)?),
        Err(RenderError::EmptyData(_)) => {
            info!("no morning or evening readings, skipping comparison chart");
        }
    }

    let averages = averages_chart(&summaries, svg_size)?;
    svgs.push(write_svg(dir, "bloodpressure_average.svg", &averages)?);

    let period_start = options.start.unwrap_or(cohorts.complete[0].timestamp);
    let period_end = options
        .end
        .unwrap_or(cohorts.complete[cohorts.complete.len() - 1].timestamp);

    let mut pages = Vec::new();
    pages.push(title_page(&options.title, period_start, period_end));
    pages.push(time_series_chart(&cohorts.complete, COMPLETE_TITLE, page_size)?);
    match comparison_chart(&cohorts.morning, &cohorts.evening, page_size) {
        Ok(chart) => pages.push(chart),
        Err(RenderError::EmptyData(_)) => pages.push(note_page(NO_COHORTS_MESSAGE)),
    }
    pages.push(averages_chart(&summaries, page_size)?);
    pages.extend(table_pages(
        &cohorts.complete,
        &cohorts.morning,
        &cohorts.evening,
    ));

    let pdf = dir.join("bloodpressure.pdf");
    fs::write(&pdf, render_pdf(&pages)).with_context(|| format!("writing {}", pdf.display()))?;
    info!(file = %pdf.display(), pages = pages.len(), "wrote PDF report");

    info!(
        readings = cohorts.complete.len(),
        morning = cohorts.morning.len(),
        evening = cohorts.evening.len(),
        charts = svgs.len(),
        "report generated"
    );

    Ok(ReportFiles { pdf, svgs })
}

fn write_svg(dir: &Path, name: &str, canvas: &Canvas) -> Result<PathBuf> {
    let path = dir.join(name);
    fs::write(&path, render_svg(canvas)).with_context(|| format!("writing {}", path.display()))?;
    info!(file = %path.display(), "wrote chart");
    Ok(path)
}

fn title_page(title: &str, start: DateTime<FixedOffset>, end: DateTime<FixedOffset>) -> Canvas {
    let mut canvas = Canvas::new(PAGE_WIDTH, PAGE_HEIGHT);
    canvas.bold_text(
        PAGE_WIDTH / 2.0,
        PAGE_HEIGHT * 0.3,
        title,
        24.0,
        Color::BLACK,
        TextAnchor::Middle,
    );
    let period = format!(
        "Zeitraum: {} - {}",
        start.format(MINUTE_FORMAT),
        end.format(MINUTE_FORMAT)
    );
    canvas.text_anchored(
        PAGE_WIDTH / 2.0,
        PAGE_HEIGHT * 0.6,
        period,
        16.0,
        Color::BLACK,
        TextAnchor::Middle,
    );
    canvas
}

fn note_page(message: &str) -> Canvas {
    let mut canvas = Canvas::new(PAGE_WIDTH, PAGE_HEIGHT);
    canvas.text_anchored(
        PAGE_WIDTH / 2.0,
        PAGE_HEIGHT / 2.0,
        message,
        14.0,
        Color::BLACK,
        TextAnchor::Middle,
    );
    canvas
}
