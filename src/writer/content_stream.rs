//! PDF content stream builder.
//!
//! Builds the small content streams used by stamp appearances and the
//! protocol page, according to PDF specification ISO 32000-1:2008 Section 8-9.
//! Text is passed in already encoded for the target font.

use super::object_serializer::{escape_literal, format_real};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::Write;

/// Operations that can be added to a content stream.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentStreamOp {
    /// Save graphics state (q)
    SaveState,
    /// Restore graphics state (Q)
    RestoreState,
    /// Begin text object (BT)
    BeginText,
    /// End text object (ET)
    EndText,
    /// Set font resource and size (Tf)
    SetFont(String, f32),
    /// Set text matrix (Tm)
    SetTextMatrix(f32, f32, f32, f32, f32, f32),
    /// Show encoded text (Tj)
    ShowText(Vec<u8>),
    /// Set fill color gray (g)
    SetFillColorGray(f32),
    /// Set stroke color gray (G)
    SetStrokeColorGray(f32),
    /// Set line width (w)
    SetLineWidth(f32),
    /// Move to (m)
    MoveTo(f32, f32),
    /// Line to (l)
    LineTo(f32, f32),
    /// Rectangle (re)
    Rectangle(f32, f32, f32, f32),
    /// Stroke (S)
    Stroke,
    /// Fill (f)
    Fill,
    /// Fill and stroke (B)
    FillStroke,
}

/// Builder for PDF content streams.
#[derive(Debug, Default)]
pub struct ContentStreamBuilder {
    operations: Vec<ContentStreamOp>,
    current_font: Option<String>,
    current_font_size: f32,
    in_text_object: bool,
}

impl ContentStreamBuilder {
    /// Create a new content stream builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an operation to the stream.
    pub fn op(&mut self, op: ContentStreamOp) -> &mut Self {
        self.operations.push(op);
        self
    }

    /// Begin a text object.
    pub fn begin_text(&mut self) -> &mut Self {
        if !self.in_text_object {
            self.op(ContentStreamOp::BeginText);
            self.in_text_object = true;
        }
        self
    }

    /// End a text object.
    pub fn end_text(&mut self) -> &mut Self {
        if self.in_text_object {
            self.op(ContentStreamOp::EndText);
            self.in_text_object = false;
            self.current_font = None;
        }
        self
    }

    /// Set font for text operations.
    pub fn set_font(&mut self, resource: &str, size: f32) -> &mut Self {
        if self.current_font.as_deref() != Some(resource) || self.current_font_size != size {
            self.op(ContentStreamOp::SetFont(resource.to_string(), size));
            self.current_font = Some(resource.to_string());
            self.current_font_size = size;
        }
        self
    }

    /// Show encoded text with its baseline origin at (x, y).
    pub fn text(&mut self, encoded: &[u8], x: f32, y: f32) -> &mut Self {
        self.begin_text();
        self.op(ContentStreamOp::SetTextMatrix(1.0, 0.0, 0.0, 1.0, x, y));
        self.op(ContentStreamOp::ShowText(encoded.to_vec()));
        self
    }

    /// Set the fill gray level.
    pub fn fill_gray(&mut self, level: f32) -> &mut Self {
        self.op(ContentStreamOp::SetFillColorGray(level))
    }

    /// Set the stroke gray level.
    pub fn stroke_gray(&mut self, level: f32) -> &mut Self {
        self.op(ContentStreamOp::SetStrokeColorGray(level))
    }

    /// Set line width.
    pub fn set_line_width(&mut self, width: f32) -> &mut Self {
        self.op(ContentStreamOp::SetLineWidth(width))
    }

    /// Add a rectangle to the current path.
    pub fn rect(&mut self, x: f32, y: f32, width: f32, height: f32) -> &mut Self {
        self.op(ContentStreamOp::Rectangle(x, y, width, height))
    }

    /// Stroke a straight line.
    pub fn line(&mut self, x0: f32, y0: f32, x1: f32, y1: f32) -> &mut Self {
        self.op(ContentStreamOp::MoveTo(x0, y0))
            .op(ContentStreamOp::LineTo(x1, y1))
            .op(ContentStreamOp::Stroke)
    }

    /// Fill the current path.
    pub fn fill(&mut self) -> &mut Self {
        self.op(ContentStreamOp::Fill)
    }

    /// Fill and stroke the current path.
    pub fn fill_stroke(&mut self) -> &mut Self {
        self.op(ContentStreamOp::FillStroke)
    }

    /// Save graphics state.
    pub fn save_state(&mut self) -> &mut Self {
        self.op(ContentStreamOp::SaveState)
    }

    /// Restore graphics state.
    pub fn restore_state(&mut self) -> &mut Self {
        self.op(ContentStreamOp::RestoreState)
    }

    /// Build the content stream to bytes.
    pub fn build(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        for op in &self.operations {
            write_op(&mut buf, op);
            buf.push(b'\n');
        }
        buf
    }
}

fn nums(values: &[f32]) -> String {
    values
        .iter()
        .map(|v| format_real(*v))
        .collect::<Vec<_>>()
        .join(" ")
}

fn write_op(w: &mut Vec<u8>, op: &ContentStreamOp) {
    let text = match op {
        ContentStreamOp::SaveState => "q".to_string(),
        ContentStreamOp::RestoreState => "Q".to_string(),
        ContentStreamOp::BeginText => "BT".to_string(),
        ContentStreamOp::EndText => "ET".to_string(),
        ContentStreamOp::SetFont(name, size) => format!("/{} {} Tf", name, format_real(*size)),
        ContentStreamOp::SetTextMatrix(a, b, c, d, e, f) => {
            format!("{} Tm", nums(&[*a, *b, *c, *d, *e, *f]))
        },
        ContentStreamOp::ShowText(bytes) => {
            w.extend_from_slice(&escape_literal(bytes));
            w.extend_from_slice(b" Tj");
            return;
        },
        ContentStreamOp::SetFillColorGray(g) => format!("{} g", format_real(*g)),
        ContentStreamOp::SetStrokeColorGray(g) => format!("{} G", format_real(*g)),
        ContentStreamOp::SetLineWidth(width) => format!("{} w", format_real(*width)),
        ContentStreamOp::MoveTo(x, y) => format!("{} m", nums(&[*x, *y])),
        ContentStreamOp::LineTo(x, y) => format!("{} l", nums(&[*x, *y])),
        ContentStreamOp::Rectangle(x, y, width, height) => {
            format!("{} re", nums(&[*x, *y, *width, *height]))
        },
        ContentStreamOp::Stroke => "S".to_string(),
        ContentStreamOp::Fill => "f".to_string(),
        ContentStreamOp::FillStroke => "B".to_string(),
    };
    w.extend_from_slice(text.as_bytes());
}

/// Compress stream data with zlib for `/Filter /FlateDecode`.
pub fn flate_encode(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}
