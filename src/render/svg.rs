//! SVG output backend.
//!
//! Renders a [`Canvas`] primitive list into a standalone SVG document
//! with a white background.

use std::fmt::Write;

use super::{Canvas, Color, Primitive, Stroke, TextAnchor};

/// Render a canvas to an SVG document string.
pub fn render_svg(canvas: &Canvas) -> String {
    let mut svg = String::with_capacity(4096);

    let _ = writeln!(svg, r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}" viewBox="0 0 {} {}">"#,
        canvas.width, canvas.height, canvas.width, canvas.height
    );
    let _ = writeln!(
        svg,
        r#"  <rect width="100%" height="100%" fill="{}"/>"#,
        color_css(Color::WHITE)
    );

    for primitive in canvas.primitives() {
        let _ = writeln!(svg, "  {}", primitive_to_svg(primitive));
    }

    svg.push_str("</svg>\n");
    svg
}

/// Convert a primitive to its SVG element representation.
fn primitive_to_svg(primitive: &Primitive) -> String {
    match primitive {
        Primitive::Rect {
            x,
            y,
            width,
            height,
            fill,
        } => format!(
            r#"<rect x="{}" y="{}" width="{}" height="{}" fill="{}"/>"#,
            x,
            y,
            width,
            height,
            color_css(*fill)
        ),
        Primitive::Line {
            x1,
            y1,
            x2,
            y2,
            stroke,
        } => format!(
            r#"<line x1="{}" y1="{}" x2="{}" y2="{}"{}/>"#,
            x1,
            y1,
            x2,
            y2,
            stroke_attrs(stroke)
        ),
        Primitive::Polyline { points, stroke } => {
            let points_str: String = points
                .iter()
                .map(|(x, y)| format!("{},{}", x, y))
                .collect::<Vec<_>>()
                .join(" ");
            format!(
                r#"<polyline points="{}" fill="none"{}/>"#,
                points_str,
                stroke_attrs(stroke)
            )
        }
        Primitive::Circle {
            cx,
            cy,
            radius,
            fill,
        } => format!(
            r#"<circle cx="{}" cy="{}" r="{}" fill="{}"/>"#,
            cx,
            cy,
            radius,
            color_css(*fill)
        ),
        Primitive::Square { cx, cy, size, fill } => {
            let half = size / 2.0;
            format!(
                r#"<rect x="{}" y="{}" width="{}" height="{}" fill="{}"/>"#,
                cx - half,
                cy - half,
                size,
                size,
                color_css(*fill)
            )
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
            let anchor_str = match anchor {
                TextAnchor::Start => "start",
                TextAnchor::Middle => "middle",
                TextAnchor::End => "end",
            };
            let weight_attr = if *bold { r#" font-weight="bold""# } else { "" };
            // Screen y grows downward, so counterclockwise rotation is
            // a negative SVG angle.
            let transform_attr = match rotation {
                Some(degrees) => format!(r#" transform="rotate({} {} {})""#, -degrees, x, y),
                None => String::new(),
            };
            format!(
                r#"<text x="{}" y="{}" font-size="{}" fill="{}" text-anchor="{}" font-family="Helvetica, Arial, sans-serif"{}{}>{}</text>"#,
                x,
                y,
                size,
                color_css(*fill),
                anchor_str,
                weight_attr,
                transform_attr,
                escape_text(content)
            )
        }
    }
}

fn color_css(color: Color) -> String {
    format!("rgb({},{},{})", color.r, color.g, color.b)
}

fn stroke_attrs(stroke: &Stroke) -> String {
    let mut attrs = format!(
        r#" stroke="{}" stroke-width="{}""#,
        color_css(stroke.color),
        stroke.width
    );
    if stroke.dashed {
        attrs.push_str(r#" stroke-dasharray="4 3""#);
    }
    attrs
}

/// Escape XML special characters in text content.
fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
