//! Page drawing surface
//!
//! Collects PDF content-stream operators for one page. Callers work in
//! top-left page coordinates; the canvas flips y into PDF user space.

use crate::error::{OverlayError, RenderStage};
use lopdf::content::{Content, Operation};
use lopdf::{Object, StringFormat};
use overlay_types::{Rect, Rgb};

pub struct PageCanvas {
    page_height: f64,
    operations: Vec<Operation>,
}

fn real(v: f64) -> Object {
    Object::Real(v as f32)
}

fn name(n: &str) -> Object {
    Object::Name(n.as_bytes().to_vec())
}

impl PageCanvas {
    pub fn new(page_height: f64) -> Self {
        Self {
            page_height,
            operations: Vec::new(),
        }
    }

    fn pdf_y(&self, y: f64) -> f64 {
        self.page_height - y
    }

    fn push(&mut self, operator: &str, operands: Vec<Object>) {
        self.operations.push(Operation::new(operator, operands));
    }

    fn fill_color(&mut self, color: Rgb) {
        self.push("rg", vec![real(color.r), real(color.g), real(color.b)]);
    }

    fn stroke_color(&mut self, color: Rgb) {
        self.push("RG", vec![real(color.r), real(color.g), real(color.b)]);
    }

    fn rect_path(&mut self, rect: &Rect) {
        let bottom = self.pdf_y(rect.y1);
        self.push(
            "re",
            vec![real(rect.x0), real(bottom), real(rect.width()), real(rect.height())],
        );
    }

    pub fn save_state(&mut self) {
        self.push("q", vec![]);
    }

    pub fn restore_state(&mut self) {
        self.push("Q", vec![]);
    }

    /// Select a named ExtGState from the page resources
    pub fn set_graphics_state(&mut self, state: &str) {
        self.push("gs", vec![name(state)]);
    }

    pub fn fill_rect(&mut self, rect: &Rect, color: Rgb) {
        self.fill_color(color);
        self.rect_path(rect);
        self.push("f", vec![]);
    }

    pub fn stroke_rect(&mut self, rect: &Rect, color: Rgb, width: f64) {
        self.stroke_color(color);
        self.push("w", vec![real(width)]);
        self.rect_path(rect);
        self.push("S", vec![]);
    }

    pub fn polyline(&mut self, points: &[(f64, f64)], color: Rgb, width: f64) {
        let Some((first, rest)) = points.split_first() else {
            return;
        };
        self.stroke_color(color);
        self.push("w", vec![real(width)]);
        self.push("m", vec![real(first.0), real(self.pdf_y(first.1))]);
        for p in rest {
            self.push("l", vec![real(p.0), real(self.pdf_y(p.1))]);
        }
        self.push("S", vec![]);
    }

    /// Closed, filled polygon
    pub fn fill_polygon(&mut self, points: &[(f64, f64)], color: Rgb) {
        let Some((first, rest)) = points.split_first() else {
            return;
        };
        self.fill_color(color);
        self.push("m", vec![real(first.0), real(self.pdf_y(first.1))]);
        for p in rest {
            self.push("l", vec![real(p.0), real(self.pdf_y(p.1))]);
        }
        self.push("h", vec![]);
        self.push("f", vec![]);
    }

    /// One line of text with its baseline at `baseline_y`
    pub fn text(
        &mut self,
        x: f64,
        baseline_y: f64,
        font: &str,
        size: f64,
        color: Rgb,
        text: &str,
    ) {
        self.push("BT", vec![]);
        self.fill_color(color);
        self.push("Tf", vec![name(font), real(size)]);
        self.push("Td", vec![real(x), real(self.pdf_y(baseline_y))]);
        self.push(
            "Tj",
            vec![Object::String(encode_win_ansi(text), StringFormat::Literal)],
        );
        self.push("ET", vec![]);
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Serialize the collected operators into content-stream bytes
    pub fn encode(self) -> Result<Vec<u8>, OverlayError> {
        Content {
            operations: self.operations,
        }
        .encode()
        .map_err(|e| OverlayError::render(RenderStage::Draw, e.to_string()))
    }
}

/// Encode text for a standard font with WinAnsiEncoding.
///
/// Latin-1 characters map to themselves, the common typographic punctuation
/// maps to its WinAnsi code, everything else becomes `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\u{20AC}' => 0x80,
            '\u{2026}' => 0x85,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            c if (c as u32) < 0x80 || (0xA0..=0xFF).contains(&(c as u32)) => c as u8,
            _ => b'?',
        })
        .collect()
}
