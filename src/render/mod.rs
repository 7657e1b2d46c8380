//! Chart rendering model and output backends.
//!
//! Charts and report pages are described as a flat, ordered list of
//! drawing primitives on a fixed-size canvas; the backends translate
//! that list into SVG markup or PDF page streams. Coordinates follow
//! the SVG convention: origin at the top-left corner, y growing
//! downward. The PDF backend flips y internally.
//!
//! ## Submodules
//!
//! - [`chart`]: builds time-series, comparison and bar chart canvases
//! - [`table`]: builds paginated data table canvases
//! - [`svg`]: renders a canvas to an SVG document
//! - [`pdf`]: renders a sequence of canvases to a PDF document

pub mod chart;
pub mod pdf;
pub mod svg;
pub mod table;

pub use chart::{averages_chart, comparison_chart, time_series_chart, ChartSize};
pub use pdf::render_pdf;
pub use svg::render_svg;
pub use table::table_pages;

use thiserror::Error;

/// PDF page size in points (A4 landscape).
pub const PAGE_WIDTH: f64 = 842.0;
pub const PAGE_HEIGHT: f64 = 595.0;

/// Standalone SVG chart size in pixels.
pub const SVG_CHART_WIDTH: f64 = 1200.0;
pub const SVG_CHART_HEIGHT: f64 = 800.0;

/// Errors from chart construction.
#[derive(Debug, Error)]
pub enum RenderError {
    /// No data available for the requested chart.
    #[error("no data to render: {0}")]
    EmptyData(String),
}

/// An opaque RGB color.
///
/// Alpha is not modeled; translucent colors are pre-blended against
/// the white page background before they get here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Unit-interval RGB triple for PDF color operators.
    pub fn to_unit(self) -> (f64, f64, f64) {
        (
            f64::from(self.r) / 255.0,
            f64::from(self.g) / 255.0,
            f64::from(self.b) / 255.0,
        )
    }
}

/// Stroke style for lines and polylines.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stroke {
    pub color: Color,
    pub width: f64,
    pub dashed: bool,
}

impl Stroke {
    pub const fn solid(color: Color, width: f64) -> Self {
        Self {
            color,
            width,
            dashed: false,
        }
    }

    pub const fn dashed(color: Color, width: f64) -> Self {
        Self {
            color,
            width,
            dashed: true,
        }
    }
}

/// Horizontal alignment of a text run relative to its anchor point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAnchor {
    Start,
    Middle,
    End,
}

/// A drawing instruction on a canvas.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    /// Axis-aligned filled rectangle.
    Rect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        fill: Color,
    },
    /// Straight line segment.
    Line {
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        stroke: Stroke,
    },
    /// Connected open line segments.
    Polyline {
        points: Vec<(f64, f64)>,
        stroke: Stroke,
    },
    /// Filled circle marker.
    Circle {
        cx: f64,
        cy: f64,
        radius: f64,
        fill: Color,
    },
    /// Filled square marker centered on a point.
    Square {
        cx: f64,
        cy: f64,
        size: f64,
        fill: Color,
    },
    /// Text run; `y` is the baseline.
    Text {
        x: f64,
        y: f64,
        content: String,
        size: f64,
        fill: Color,
        anchor: TextAnchor,
        bold: bool,
        /// Rotation in degrees counterclockwise around the anchor
        /// point.
        rotation: Option<f64>,
    },
}

/// A fixed-size drawing surface holding an ordered primitive list.
///
/// Primitives are painted in insertion order; later entries cover
/// earlier ones.
#[derive(Debug, Clone)]
pub struct Canvas {
    pub width: f64,
    pub height: f64,
    primitives: Vec<Primitive>,
}

impl Canvas {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            primitives: Vec::new(),
        }
    }

    pub fn primitives(&self) -> &[Primitive] {
        &self.primitives
    }

    pub fn push(&mut self, primitive: Primitive) {
        self.primitives.push(primitive);
    }

    pub fn rect(&mut self, x: f64, y: f64, width: f64, height: f64, fill: Color) {
        self.push(Primitive::Rect {
            x,
            y,
            width,
            height,
            fill,
        });
    }

    pub fn line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, stroke: Stroke) {
        self.push(Primitive::Line {
            x1,
            y1,
            x2,
            y2,
            stroke,
        });
    }

    pub fn polyline(&mut self, points: Vec<(f64, f64)>, stroke: Stroke) {
        self.push(Primitive::Polyline { points, stroke });
    }

    pub fn circle(&mut self, cx: f64, cy: f64, radius: f64, fill: Color) {
        self.push(Primitive::Circle {
            cx,
            cy,
            radius,
            fill,
        });
    }

    pub fn square(&mut self, cx: f64, cy: f64, size: f64, fill: Color) {
        self.push(Primitive::Square { cx, cy, size, fill });
    }

    /// Left-aligned regular text.
    pub fn text(&mut self, x: f64, y: f64, content: impl Into<String>, size: f64, fill: Color) {
        self.text_anchored(x, y, content, size, fill, TextAnchor::Start);
    }

    pub fn text_anchored(
        &mut self,
        x: f64,
        y: f64,
        content: impl Into<String>,
        size: f64,
        fill: Color,
        anchor: TextAnchor,
    ) {
        self.push(Primitive::Text {
            x,
            y,
            content: content.into(),
            size,
            fill,
            anchor,
            bold: false,
            rotation: None,
        });
    }

    pub fn bold_text(
        &mut self,
        x: f64,
        y: f64,
        content: impl Into<String>,
        size: f64,
        fill: Color,
        anchor: TextAnchor,
    ) {
        self.push(Primitive::Text {
            x,
            y,
            content: content.into(),
            size,
            fill,
            anchor,
            bold: true,
            rotation: None,
        });
    }

    /// Text rotated counterclockwise by `degrees` around its anchor
    /// point.
    pub fn rotated_text(
        &mut self,
        x: f64,
        y: f64,
        content: impl Into<String>,
        size: f64,
        fill: Color,
        anchor: TextAnchor,
        degrees: f64,
    ) {
        self.push(Primitive::Text {
            x,
            y,
            content: content.into(),
            size,
            fill,
            anchor,
            bold: false,
            rotation: Some(degrees),
        });
    }
}

/// Approximate width of a text run in Helvetica at the given size.
///
/// An average glyph width of half the font size is close enough for
/// axis labels and table cells.
pub fn approx_text_width(text: &str, size: f64) -> f64 {
    text.chars().count() as f64 * size * 0.5
}
