//! PDF output backend.
//!
//! Renders a sequence of [`Canvas`] pages into a single PDF 1.4
//! document. The writer emits a fixed object layout: document catalog,
//! page tree, two Type1 fonts (Helvetica and Helvetica-Bold in WinAnsi
//! encoding), then one page object plus one content stream per canvas.
//! All output is plain ASCII; non-ASCII text is carried as octal
//! escapes inside string literals, so byte offsets in the cross
//! reference table can be taken directly from the assembled string.

use std::fmt::Write;

use super::{approx_text_width, Canvas, Primitive, Stroke, TextAnchor};

/// Distance of Bézier control points for a quarter-circle arc, as a
/// fraction of the radius.
const BEZIER_CIRCLE_K: f64 = 0.552_284_749_831;

/// Render canvases as the pages of a PDF document.
pub fn render_pdf(pages: &[Canvas]) -> Vec<u8> {
    let object_count = 4 + 2 * pages.len();
    let mut doc = String::with_capacity(16384);
    let mut offsets: Vec<usize> = Vec::with_capacity(object_count);

    doc.push_str("%PDF-1.4\n");

    begin_object(&mut doc, &mut offsets, 1);
    doc.push_str("<< /Type /Catalog /Pages 2 0 R >>\nendobj\n");

    begin_object(&mut doc, &mut offsets, 2);
    let kids: Vec<String> = (0..pages.len())
        .map(|i| format!("{} 0 R", 5 + 2 * i))
        .collect();
    let _ = writeln!(
        doc,
        "<< /Type /Pages /Kids [{}] /Count {} >>",
        kids.join(" "),
        pages.len()
    );
    doc.push_str("endobj\n");

    begin_object(&mut doc, &mut offsets, 3);
    doc.push_str(
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>\nendobj\n",
    );

    begin_object(&mut doc, &mut offsets, 4);
    doc.push_str(
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica-Bold /Encoding /WinAnsiEncoding >>\nendobj\n",
    );

    for (i, page) in pages.iter().enumerate() {
        let page_id = 5 + 2 * i;
        let content_id = page_id + 1;

        begin_object(&mut doc, &mut offsets, page_id);
        let _ = writeln!(
            doc,
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {} {}] /Resources << /Font << /F1 3 0 R /F2 4 0 R >> >> /Contents {} 0 R >>",
            page.width, page.height, content_id
        );
        doc.push_str("endobj\n");

        let ops = page_ops(page);
        begin_object(&mut doc, &mut offsets, content_id);
        let _ = writeln!(doc, "<< /Length {} >>", ops.len());
        doc.push_str("stream\n");
        doc.push_str(&ops);
        doc.push_str("endstream\nendobj\n");
    }

    let xref_offset = doc.len();
    let _ = writeln!(doc, "xref");
    let _ = writeln!(doc, "0 {}", object_count + 1);
    doc.push_str("0000000000 65535 f \n");
    for offset in &offsets {
        let _ = write!(doc, "{:010} 00000 n \n", offset);
    }
    let _ = writeln!(doc, "trailer");
    let _ = writeln!(doc, "<< /Size {} /Root 1 0 R >>", object_count + 1);
    let _ = writeln!(doc, "startxref");
    let _ = writeln!(doc, "{}", xref_offset);
    doc.push_str("%%EOF\n");

    doc.into_bytes()
}

fn begin_object(doc: &mut String, offsets: &mut Vec<usize>, id: usize) {
    offsets.push(doc.len());
    let _ = writeln!(doc, "{} 0 obj", id);
}

/// Translate a canvas into PDF content stream operators.
///
/// The canvas origin is top-left with y growing downward; PDF puts the
/// origin at the bottom-left, so all y coordinates are flipped here.
fn page_ops(canvas: &Canvas) -> String {
    let page_height = canvas.height;
    let mut ops = String::with_capacity(2048);

    for primitive in canvas.primitives() {
        match primitive {
            Primitive::Rect {
                x,
                y,
                width,
                height,
                fill,
            } => {
                let (r, g, b) = fill.to_unit();
                let _ = writeln!(ops, "{:.3} {:.3} {:.3} rg", r, g, b);
                let _ = writeln!(
                    ops,
                    "{:.2} {:.2} {:.2} {:.2} re f",
                    x,
                    page_height - y - height,
                    width,
                    height
                );
            }
            Primitive::Line {
                x1,
                y1,
                x2,
                y2,
                stroke,
            } => {
                ops.push_str(&stroke_ops(stroke));
                let _ = writeln!(
                    ops,
                    "{:.2} {:.2} m {:.2} {:.2} l S",
                    x1,
                    page_height - y1,
                    x2,
                    page_height - y2
                );
            }
            Primitive::Polyline { points, stroke } => {
                if points.len() < 2 {
                    continue;
                }
                ops.push_str(&stroke_ops(stroke));
                for (i, (x, y)) in points.iter().enumerate() {
                    let op = if i == 0 { "m" } else { "l" };
                    let _ = writeln!(ops, "{:.2} {:.2} {}", x, page_height - y, op);
                }
                ops.push_str("S\n");
            }
            Primitive::Circle {
                cx,
                cy,
                radius,
                fill,
            } => {
                let (r, g, b) = fill.to_unit();
                let _ = writeln!(ops, "{:.3} {:.3} {:.3} rg", r, g, b);
                ops.push_str(&circle_path(*cx, page_height - cy, *radius));
                ops.push_str("f\n");
            }
            Primitive::Square { cx, cy, size, fill } => {
                let (r, g, b) = fill.to_unit();
                let half = size / 2.0;
                let _ = writeln!(ops, "{:.3} {:.3} {:.3} rg", r, g, b);
                let _ = writeln!(
                    ops,
                    "{:.2} {:.2} {:.2} {:.2} re f",
                    cx - half,
                    page_height - cy - half,
                    size,
                    size
                );
            }
            Primitive::Text {
                x,
                y,
                content,
                size,
                fill,
                anchor,
                bold,
                rotation,
            } => {
                let (r, g, b) = fill.to_unit();
                let font = if *bold { "/F2" } else { "/F1" };
                // Middle and End anchors shift the start point back
                // along the baseline by the estimated run width.
                let shift = match anchor {
                    TextAnchor::Start => 0.0,
                    TextAnchor::Middle => -approx_text_width(content, *size) / 2.0,
                    TextAnchor::End => -approx_text_width(content, *size),
                };
                let base_y = page_height - y;

                ops.push_str("BT\n");
                let _ = writeln!(ops, "{} {} Tf", font, size);
                let _ = writeln!(ops, "{:.3} {:.3} {:.3} rg", r, g, b);
                match rotation {
                    Some(degrees) => {
                        let theta = degrees.to_radians();
                        let (sin, cos) = theta.sin_cos();
                        let _ = writeln!(
                            ops,
                            "{:.4} {:.4} {:.4} {:.4} {:.2} {:.2} Tm",
                            cos,
                            sin,
                            -sin,
                            cos,
                            x + shift * cos,
                            base_y + shift * sin
                        );
                    }
                    None => {
                        let _ = writeln!(ops, "{:.2} {:.2} Td", x + shift, base_y);
                    }
                }
                let _ = writeln!(ops, "({}) Tj", encode_text(content));
                ops.push_str("ET\n");
            }
        }
    }

    ops
}

fn stroke_ops(stroke: &Stroke) -> String {
    let (r, g, b) = stroke.color.to_unit();
    let dash = if stroke.dashed { "[4 3] 0 d" } else { "[] 0 d" };
    format!(
        "{:.3} {:.3} {:.3} RG\n{:.2} w\n{}\n",
        r, g, b, stroke.width, dash
    )
}

/// Approximate a circle with four Bézier quarter arcs, counterclockwise
/// from the rightmost point. Coordinates are already in PDF space.
fn circle_path(cx: f64, cy: f64, radius: f64) -> String {
    let k = BEZIER_CIRCLE_K * radius;
    let r = radius;
    let mut path = String::new();
    let _ = writeln!(path, "{:.2} {:.2} m", cx + r, cy);
    let _ = writeln!(
        path,
        "{:.2} {:.2} {:.2} {:.2} {:.2} {:.2} c",
        cx + r,
        cy + k,
        cx + k,
        cy + r,
        cx,
        cy + r
    );
    let _ = writeln!(
        path,
        "{:.2} {:.2} {:.2} {:.2} {:.2} {:.2} c",
        cx - k,
        cy + r,
        cx - r,
        cy + k,
        cx - r,
        cy
    );
    let _ = writeln!(
        path,
        "{:.2} {:.2} {:.2} {:.2} {:.2} {:.2} c",
        cx - r,
        cy - k,
        cx - k,
        cy - r,
        cx,
        cy - r
    );
    let _ = writeln!(
        path,
        "{:.2} {:.2} {:.2} {:.2} {:.2} {:.2} c",
        cx + k,
        cy - r,
        cx + r,
        cy - k,
        cx + r,
        cy
    );
    path
}

/// Encode text for a PDF string literal in WinAnsi encoding.
///
/// Backslash and parentheses are escaped, Latin-1 characters above
/// ASCII become octal escapes, and anything outside Latin-1 falls back
/// to `?`.
fn encode_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '(' => out.push_str("\\("),
            ')' => out.push_str("\\)"),
            '\\' => out.push_str("\\\\"),
            ch if (ch as u32) < 128 => out.push(ch),
            ch if (ch as u32) < 256 => {
                let _ = write!(out, "\\{:03o}", ch as u32);
            }
            _ => out.push('?'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::Color;

    fn single_page() -> Canvas {
        let mut canvas = Canvas::new(842.0, 595.0);
        canvas.rect(10.0, 10.0, 100.0, 50.0, Color::rgb(255, 255, 153));
        canvas.text(20.0, 40.0, "Blutdruck", 12.0, Color::BLACK);
        canvas
    }

    fn rendered(pages: &[Canvas]) -> String {
        String::from_utf8(render_pdf(pages)).unwrap()
    }

    #[test]
    fn test_pdf_header_and_trailer() {
        let doc = rendered(&[single_page()]);
        assert!(doc.starts_with("%PDF-1.4\n"));
        assert!(doc.ends_with("%%EOF\n"));
        assert!(doc.contains("trailer"));
        assert!(doc.contains("/Root 1 0 R"));
    }

    #[test]
    fn test_pdf_page_count() {
        let pages = vec![single_page(), single_page(), single_page()];
        let doc = rendered(&pages);

        let page_objects = doc.matches("/Type /Page /Parent").count();
        assert_eq!(page_objects, 3);
        assert!(doc.contains("/Count 3"));
        assert!(doc.contains("/Kids [5 0 R 7 0 R 9 0 R]"));
    }

    #[test]
    fn test_pdf_is_ascii() {
        let mut canvas = single_page();
        canvas.text(0.0, 0.0, "Tägliche Werte", 10.0, Color::BLACK);
        let bytes = render_pdf(&[canvas]);
        assert!(bytes.iter().all(u8::is_ascii));
    }

    #[test]
    fn test_pdf_startxref_points_at_xref() {
        let doc = rendered(&[single_page()]);

        let start = doc.find("startxref\n").unwrap() + "startxref\n".len();
        let end = doc[start..].find('\n').unwrap() + start;
        let offset: usize = doc[start..end].parse().unwrap();
        assert!(doc[offset..].starts_with("xref\n"));
    }

    #[test]
    fn test_pdf_xref_first_object_offset() {
        let doc = rendered(&[single_page()]);

        let xref = doc.find("xref\n").unwrap();
        let first_entry_start = doc[xref..].find("f \n").unwrap() + xref + 3;
        let offset: usize = doc[first_entry_start..first_entry_start + 10]
            .parse()
            .unwrap();
        assert!(doc[offset..].starts_with("1 0 obj"));
    }

    #[test]
    fn test_pdf_content_length_matches_stream() {
        let doc = rendered(&[single_page()]);

        let length_start = doc.find("/Length ").unwrap() + "/Length ".len();
        let length_end = doc[length_start..].find(' ').unwrap() + length_start;
        let length: usize = doc[length_start..length_end].parse().unwrap();

        let stream_start = doc.find("stream\n").unwrap() + "stream\n".len();
        let stream_end = doc.find("endstream").unwrap();
        assert_eq!(stream_end - stream_start, length);
    }

    #[test]
    fn test_pdf_rect_is_y_flipped() {
        let mut canvas = Canvas::new(200.0, 100.0);
        canvas.rect(10.0, 10.0, 10.0, 20.0, Color::BLACK);
        let ops = page_ops(&canvas);
        // Top-left (10, 10) with height 20 on a 100-tall page puts the
        // bottom edge at PDF y = 70.
        assert!(ops.contains("10.00 70.00 10.00 20.00 re f"));
    }

    #[test]
    fn test_pdf_dashed_stroke() {
        let mut canvas = Canvas::new(100.0, 100.0);
        canvas.line(0.0, 0.0, 50.0, 0.0, Stroke::dashed(Color::BLACK, 2.0));
        let ops = page_ops(&canvas);
        assert!(ops.contains("[4 3] 0 d"));
    }

    #[test]
    fn test_pdf_solid_stroke_resets_dash() {
        let mut canvas = Canvas::new(100.0, 100.0);
        canvas.line(0.0, 0.0, 50.0, 0.0, Stroke::solid(Color::BLACK, 2.0));
        let ops = page_ops(&canvas);
        assert!(ops.contains("[] 0 d"));
    }

    #[test]
    fn test_pdf_circle_uses_four_curves() {
        let mut canvas = Canvas::new(100.0, 100.0);
        canvas.circle(50.0, 50.0, 10.0, Color::rgb(255, 0, 0));
        let ops = page_ops(&canvas);
        assert_eq!(ops.matches(" c\n").count(), 4);
        assert!(ops.contains("f\n"));
    }

    #[test]
    fn test_pdf_end_anchor_shifts_text() {
        let mut canvas = Canvas::new(200.0, 100.0);
        canvas.text_anchored(
            100.0,
            50.0,
            "abcd",
            10.0,
            Color::BLACK,
            TextAnchor::End,
        );
        let ops = page_ops(&canvas);
        // Estimated width is 4 * 10 * 0.5 = 20, so the run starts at
        // x = 80.
        assert!(ops.contains("80.00 50.00 Td"));
    }

    #[test]
    fn test_pdf_bold_uses_second_font() {
        let mut canvas = Canvas::new(100.0, 100.0);
        canvas.bold_text(0.0, 0.0, "Titel", 24.0, Color::BLACK, TextAnchor::Start);
        let ops = page_ops(&canvas);
        assert!(ops.contains("/F2 24 Tf"));
    }

    #[test]
    fn test_pdf_rotation_matrix() {
        let mut canvas = Canvas::new(100.0, 100.0);
        canvas.rotated_text(
            10.0,
            90.0,
            "x",
            10.0,
            Color::BLACK,
            TextAnchor::Start,
            45.0,
        );
        let ops = page_ops(&canvas);
        assert!(ops.contains("0.7071 0.7071 -0.7071 0.7071"));
        assert!(ops.contains("Tm"));
    }

    #[test]
    fn test_encode_text() {
        assert_eq!(encode_text("plain"), "plain");
        assert_eq!(encode_text("(x)"), "\\(x\\)");
        assert_eq!(encode_text("a\\b"), "a\\\\b");
        // ä is 0xE4 = octal 344.
        assert_eq!(encode_text("ä"), "\\344");
        assert_eq!(encode_text("Blutdruckdaten für"), "Blutdruckdaten f\\374r");
        // Outside Latin-1 falls back to ?.
        assert_eq!(encode_text("→"), "?");
    }
}
