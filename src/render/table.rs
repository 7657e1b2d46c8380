//! Tabular report pages.
//!
//! Lays the full reading list out as paginated PDF-sized canvases.
//! Rows belonging to the morning cohort are tinted yellow, evening
//! rows orange, with a color legend on the first page.

use std::collections::HashSet;

use chrono::{DateTime, FixedOffset};

use super::{Canvas, Color, Stroke, TextAnchor, PAGE_HEIGHT, PAGE_WIDTH};
use crate::data::{Reading, SECOND_FORMAT};

const MORNING_FILL: Color = Color::rgb(255, 255, 153);
const EVENING_FILL: Color = Color::rgb(255, 179, 102);
const HEADER_FILL: Color = Color::rgb(217, 217, 217);

const MARGIN: f64 = 60.0;
const TOP: f64 = 40.0;
const ROW_HEIGHT: f64 = 16.0;
const ROWS_PER_PAGE: usize = 30;
const TEXT_SIZE: f64 = 10.0;
const HEADER_SIZE: f64 = 11.0;

const HEADERS: [&str; 4] = ["Zeitstempel", "SYS", "DIA", "Puls"];
const LEGEND_TEXT: &str = "Legende: Gelb = Morgenwerte, Orange = Abendwerte";

/// Render the reading list as table pages, 30 rows each.
///
/// Membership in the morning or evening cohort decides the row tint;
/// a reading in both cohorts counts as a morning row. An empty reading
/// list yields no pages.
pub fn table_pages(complete: &[Reading], morning: &[Reading], evening: &[Reading]) -> Vec<Canvas> {
    let morning_times: HashSet<DateTime<FixedOffset>> =
        morning.iter().map(|r| r.timestamp).collect();
    let evening_times: HashSet<DateTime<FixedOffset>> =
        evening.iter().map(|r| r.timestamp).collect();

    let mut pages = Vec::new();
    for (page_index, chunk) in complete.chunks(ROWS_PER_PAGE).enumerate() {
        let mut canvas = Canvas::new(PAGE_WIDTH, PAGE_HEIGHT);
        draw_table(&mut canvas, chunk, &morning_times, &evening_times);

        if page_index == 0 {
            let table_bottom = TOP + ROW_HEIGHT * (chunk.len() + 1) as f64;
            canvas.text(
                MARGIN,
                table_bottom + 20.0,
                LEGEND_TEXT,
                TEXT_SIZE,
                Color::BLACK,
            );
        }
        pages.push(canvas);
    }
    pages
}

fn draw_table(
    canvas: &mut Canvas,
    rows: &[Reading],
    morning: &HashSet<DateTime<FixedOffset>>,
    evening: &HashSet<DateTime<FixedOffset>>,
) {
    let columns = column_edges();
    let table_width = columns[4] - columns[0];

    canvas.rect(columns[0], TOP, table_width, ROW_HEIGHT, HEADER_FILL);
    for (i, header) in HEADERS.iter().enumerate() {
        let cx = (columns[i] + columns[i + 1]) / 2.0;
        canvas.bold_text(
            cx,
            TOP + ROW_HEIGHT - 4.5,
            *header,
            HEADER_SIZE,
            Color::BLACK,
            TextAnchor::Middle,
        );
    }

    for (row_index, reading) in rows.iter().enumerate() {
        let y = TOP + ROW_HEIGHT * (row_index + 1) as f64;

        let fill = if morning.contains(&reading.timestamp) {
            Some(MORNING_FILL)
        } else if evening.contains(&reading.timestamp) {
            Some(EVENING_FILL)
        } else {
            None
        };
        if let Some(fill) = fill {
            canvas.rect(columns[0], y, table_width, ROW_HEIGHT, fill);
        }

        let cells = [
            reading.timestamp.format(SECOND_FORMAT).to_string(),
            reading.systolic.to_string(),
            reading.diastolic.to_string(),
            reading.pulse.to_string(),
        ];
        for (i, cell) in cells.iter().enumerate() {
            let cx = (columns[i] + columns[i + 1]) / 2.0;
            canvas.text_anchored(
                cx,
                y + ROW_HEIGHT - 4.5,
                cell.clone(),
                TEXT_SIZE,
                Color::BLACK,
                TextAnchor::Middle,
            );
        }
    }

    let stroke = Stroke::solid(Color::BLACK, 0.75);
    let bottom = TOP + ROW_HEIGHT * (rows.len() + 1) as f64;
    for i in 0..=rows.len() + 1 {
        let y = TOP + ROW_HEIGHT * i as f64;
        canvas.line(columns[0], y, columns[4], y, stroke);
    }
    for &x in &columns {
        canvas.line(x, TOP, x, bottom, stroke);
    }
}

fn column_edges() -> [f64; 5] {
    let left = MARGIN;
    let right = PAGE_WIDTH - MARGIN;
    let timestamp_width = 290.0;
    let numeric_width = (right - left - timestamp_width) / 3.0;
    [
        left,
        left + timestamp_width,
        left + timestamp_width + numeric_width,
        left + timestamp_width + 2.0 * numeric_width,
        right,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{parse_timestamp, parse_utc_offset};
    use crate::render::Primitive;

    fn reading(ts: &str, systolic: i32, diastolic: i32, pulse: i32) -> Reading {
        let offset = parse_utc_offset("+02:00").unwrap();
        Reading::new(parse_timestamp(ts, offset).unwrap(), systolic, diastolic, pulse)
    }

    fn sequence(count: usize) -> Vec<Reading> {
        (0..count)
            .map(|i| {
                let ts = format!("2024-03-{:02} 08:00:00", i % 28 + 1);
                reading(&ts, 120 + i as i32 % 10, 80, 60)
            })
            .collect()
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

    fn fills(canvas: &Canvas) -> Vec<Color> {
        canvas
            .primitives()
            .iter()
            .filter_map(|p| match p {
                Primitive::Rect { fill, .. } => Some(*fill),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_thirty_readings_fit_one_page() {
        let pages = table_pages(&sequence(30), &[], &[]);
        assert_eq!(pages.len(), 1);
    }

    #[test]
    fn test_thirty_one_readings_need_two_pages() {
        let pages = table_pages(&sequence(31), &[], &[]);
        assert_eq!(pages.len(), 2);
        // One data row on the overflow page.
        let numbers = texts(&pages[1])
            .iter()
            .filter(|t| **t == "80")
            .count();
        assert_eq!(numbers, 1);
    }

    #[test]
    fn test_no_pages_without_readings() {
        assert!(table_pages(&[], &[], &[]).is_empty());
    }

    #[test]
    fn test_header_repeats_on_every_page() {
        let pages = table_pages(&sequence(31), &[], &[]);
        for page in &pages {
            let labels = texts(page);
            assert!(labels.contains(&"Zeitstempel"));
            assert!(labels.contains(&"Puls"));
        }
    }

    #[test]
    fn test_row_tints_follow_cohorts() {
        let a = reading("2024-03-01 07:30:00", 120, 80, 60);
        let b = reading("2024-03-01 19:30:00", 130, 85, 65);
        let c = reading("2024-03-02 14:00:00", 125, 82, 62);
        let complete = vec![a.clone(), b.clone(), c];

        let pages = table_pages(&complete, &[a], &[b]);
        let fills = fills(&pages[0]);
        assert_eq!(fills.iter().filter(|f| **f == MORNING_FILL).count(), 1);
        assert_eq!(fills.iter().filter(|f| **f == EVENING_FILL).count(), 1);
    }

    #[test]
    fn test_morning_tint_wins_over_evening() {
        let a = reading("2024-03-01 07:30:00", 120, 80, 60);
        let complete = vec![a.clone()];

        // The same reading can be first and last of its day.
        let pages = table_pages(&complete, &[a.clone()], &[a]);
        let fills = fills(&pages[0]);
        assert!(fills.contains(&MORNING_FILL));
        assert!(!fills.contains(&EVENING_FILL));
    }

    #[test]
    fn test_legend_only_on_first_page() {
        let pages = table_pages(&sequence(31), &[], &[]);
        assert!(texts(&pages[0]).contains(&LEGEND_TEXT));
        assert!(!texts(&pages[1]).contains(&LEGEND_TEXT));
    }

    #[test]
    fn test_timestamps_render_with_seconds() {
        let pages = table_pages(&[reading("2024-03-01 07:30:15", 120, 80, 60)], &[], &[]);
        assert!(texts(&pages[0]).contains(&"01.03.2024 07:30:15"));
    }
}
