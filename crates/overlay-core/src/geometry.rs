//! Page text geometry sources
//!
//! A [`GeometryProvider`] turns one page of a loaded document into a
//! [`RawPage`] tree of positioned text blocks. [`JsonGeometry`] serves
//! geometry exported ahead of time by an external extractor;
//! [`ContentStreamGeometry`] reads text positions straight from the page's
//! content stream.

use crate::error::OverlayError;
use crate::text::CHAR_WIDTH_FACTOR;
use lopdf::content::Content;
use lopdf::{Document, Object, ObjectId};
use overlay_types::{PageSize, RawBlock, RawLine, RawPage, RawSpan, Rect};
use std::fs;
use std::path::Path;
use tracing::debug;

/// One page of a loaded document, as seen by a geometry provider
#[derive(Clone, Copy)]
pub struct PageSource<'a> {
    pub doc: &'a Document,
    pub page_id: ObjectId,
    /// Zero-based page index
    pub index: usize,
    pub size: PageSize,
}

pub trait GeometryProvider {
    /// Extract the text geometry of one page.
    ///
    /// Failures are reported as [`OverlayError::GeometryExtraction`] so the
    /// caller can degrade the page instead of aborting.
    fn page_geometry(&self, page: &PageSource<'_>) -> Result<RawPage, OverlayError>;
}

/// Read a numeric PDF object
pub fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(*r as f64),
        _ => None,
    }
}

/// Page size from the page's MediaBox, following `Parent` links for inherited
/// boxes. Pages without a readable MediaBox are treated as US Letter.
pub fn page_size(doc: &Document, page_id: ObjectId) -> PageSize {
    let mut current = doc.get_dictionary(page_id).ok();
    let mut depth = 0;

    while let Some(dict) = current {
        if let Some(size) = dict
            .get(b"MediaBox")
            .ok()
            .and_then(|obj| media_box_size(doc, obj))
        {
            return size;
        }
        depth += 1;
        if depth > 32 {
            break;
        }
        current = dict
            .get(b"Parent")
            .and_then(Object::as_reference)
            .ok()
            .and_then(|id| doc.get_dictionary(id).ok());
    }

    PageSize::letter()
}

fn media_box_size(doc: &Document, obj: &Object) -> Option<PageSize> {
    let obj = match obj {
        Object::Reference(id) => doc.get_object(*id).ok()?,
        other => other,
    };
    let values: Vec<f64> = obj.as_array().ok()?.iter().filter_map(number).collect();
    if values.len() != 4 {
        return None;
    }
    let size = PageSize {
        width: (values[2] - values[0]).abs(),
        height: (values[3] - values[1]).abs(),
    };
    (size.width > 0.0 && size.height > 0.0).then_some(size)
}

/// Geometry exported ahead of time, one [`RawPage`] per document page
#[derive(Debug, Clone, Default)]
pub struct JsonGeometry {
    pages: Vec<RawPage>,
}

impl JsonGeometry {
    pub fn new(pages: Vec<RawPage>) -> Self {
        Self { pages }
    }

    /// Parse a JSON array of pages
    pub fn from_json_str(json: &str) -> Result<Self, OverlayError> {
        let pages: Vec<RawPage> =
            serde_json::from_str(json).map_err(|e| OverlayError::ParseError(e.to_string()))?;
        Ok(Self::new(pages))
    }

    pub fn from_file(path: &Path) -> Result<Self, OverlayError> {
        let json = fs::read_to_string(path).map_err(|e| OverlayError::SourceRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_json_str(&json)
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

impl GeometryProvider for JsonGeometry {
    fn page_geometry(&self, page: &PageSource<'_>) -> Result<RawPage, OverlayError> {
        self.pages
            .get(page.index)
            .cloned()
            .ok_or_else(|| OverlayError::geometry(page.index, "no exported geometry for page"))
    }
}

/// Reads text placement operators from page content streams.
///
/// Glyph widths are estimated from the font size, so block extents are
/// approximate. Text drawn under a `cm` transform is placed as if untransformed.
#[derive(Debug, Clone)]
pub struct ContentStreamGeometry {
    /// Spans whose baselines differ by less than this share of the font size
    /// belong to the same line
    pub line_tolerance: f64,
    /// Lines separated by more than this share of their font size start a new block
    pub block_gap: f64,
}

impl Default for ContentStreamGeometry {
    fn default() -> Self {
        Self {
            line_tolerance: 0.5,
            block_gap: 1.0,
        }
    }
}

impl GeometryProvider for ContentStreamGeometry {
    fn page_geometry(&self, page: &PageSource<'_>) -> Result<RawPage, OverlayError> {
        let bytes = page
            .doc
            .get_page_content(page.page_id)
            .map_err(|e| OverlayError::geometry(page.index, e.to_string()))?;
        let content =
            Content::decode(&bytes).map_err(|e| OverlayError::geometry(page.index, e.to_string()))?;

        let spans = read_spans(&content, page.size.height);
        let lines = self.group_lines(spans);
        let blocks = self.group_blocks(lines);

        debug!(
            page = page.index,
            blocks = blocks.len(),
            "Extracted text geometry from content stream"
        );

        Ok(RawPage {
            width: page.size.width,
            height: page.size.height,
            blocks: blocks.into_iter().map(Block::into_raw).collect(),
        })
    }
}

/// Text run with a top-left bounding box
#[derive(Debug, Clone)]
struct PlacedSpan {
    text: String,
    font: Option<String>,
    size: f64,
    rect: Rect,
    baseline: f64,
}

struct Line {
    spans: Vec<PlacedSpan>,
    rect: Rect,
    baseline: f64,
    size: f64,
}

struct Block {
    lines: Vec<Line>,
    rect: Rect,
}

impl Block {
    fn into_raw(self) -> RawBlock {
        let rect = self.rect;
        RawBlock {
            bbox: Some([rect.x0, rect.y0, rect.x1, rect.y1]),
            lines: self
                .lines
                .into_iter()
                .map(|line| RawLine {
                    bbox: Some([line.rect.x0, line.rect.y0, line.rect.x1, line.rect.y1]),
                    spans: line
                        .spans
                        .into_iter()
                        .map(|s| RawSpan {
                            text: s.text,
                            size: Some(s.size),
                            font: s.font,
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}

impl ContentStreamGeometry {
    fn group_lines(&self, mut spans: Vec<PlacedSpan>) -> Vec<Line> {
        spans.sort_by(|a, b| {
            a.baseline
                .total_cmp(&b.baseline)
                .then(a.rect.x0.total_cmp(&b.rect.x0))
        });

        let mut lines: Vec<Line> = Vec::new();
        for span in spans {
            let joins = lines.last().is_some_and(|line| {
                let tolerance = self.line_tolerance * line.size.max(span.size);
                (line.baseline - span.baseline).abs() <= tolerance
            });
            match lines.last_mut() {
                Some(line) if joins => {
                    line.rect = line.rect.union(&span.rect);
                    line.size = line.size.max(span.size);
                    line.spans.push(span);
                }
                _ => lines.push(Line {
                    rect: span.rect,
                    baseline: span.baseline,
                    size: span.size,
                    spans: vec![span],
                }),
            }
        }

        for line in &mut lines {
            line.spans.sort_by(|a, b| a.rect.x0.total_cmp(&b.rect.x0));
        }
        lines
    }

    fn group_blocks(&self, lines: Vec<Line>) -> Vec<Block> {
        let mut blocks: Vec<Block> = Vec::new();
        for line in lines {
            let gap_limit = self.block_gap * line.size;
            let target = blocks.iter_mut().rev().find(|block| {
                let gap = line.rect.y0 - block.rect.y1;
                let overlaps_x = line.rect.x0 < block.rect.x1 && block.rect.x0 < line.rect.x1;
                overlaps_x && gap <= gap_limit
            });
            match target {
                Some(block) => {
                    block.rect = block.rect.union(&line.rect);
                    block.lines.push(line);
                }
                None => blocks.push(Block {
                    rect: line.rect,
                    lines: vec![line],
                }),
            }
        }
        blocks
    }
}

/// Text state tracked while walking a content stream
struct TextState {
    /// Text matrix `[a b c d e f]`
    tm: [f64; 6],
    /// Text line matrix
    tlm: [f64; 6],
    font: Option<String>,
    font_size: f64,
    leading: f64,
}

const IDENTITY: [f64; 6] = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

impl TextState {
    fn new() -> Self {
        Self {
            tm: IDENTITY,
            tlm: IDENTITY,
            font: None,
            font_size: 12.0,
            leading: 0.0,
        }
    }

    fn translate(&mut self, tx: f64, ty: f64) {
        let [a, b, c, d, e, f] = self.tlm;
        self.tlm = [a, b, c, d, e + tx * a + ty * c, f + tx * b + ty * d];
        self.tm = self.tlm;
    }

    fn next_line(&mut self) {
        self.translate(0.0, -self.leading);
    }

    fn effective_size(&self) -> f64 {
        self.font_size * self.tm[2].hypot(self.tm[3])
    }

    /// Record a run at the current position and advance past it
    fn show(&mut self, text: String, page_height: f64, spans: &mut Vec<PlacedSpan>) {
        let char_count = text.chars().count() as f64;
        let advance = char_count * self.font_size * CHAR_WIDTH_FACTOR;
        let size = self.effective_size();
        let x = self.tm[4];
        let baseline = page_height - self.tm[5];
        let width = advance * self.tm[0].hypot(self.tm[1]);

        if !text.trim().is_empty() {
            spans.push(PlacedSpan {
                text,
                font: self.font.clone(),
                size,
                rect: Rect::new(x, baseline - size, x + width, baseline + size * 0.2),
                baseline,
            });
        }
        self.tm[4] += advance * self.tm[0];
        self.tm[5] += advance * self.tm[1];
    }
}

fn read_spans(content: &Content, page_height: f64) -> Vec<PlacedSpan> {
    let mut spans = Vec::new();
    let mut state = TextState::new();

    for op in &content.operations {
        let operands = &op.operands;
        let num = |i: usize| operands.get(i).and_then(number);

        match op.operator.as_str() {
            "BT" => {
                state.tm = IDENTITY;
                state.tlm = IDENTITY;
            }
            "Tf" => {
                if let Some(Object::Name(font)) = operands.first() {
                    state.font = Some(String::from_utf8_lossy(font).to_string());
                }
                if let Some(size) = num(1) {
                    state.font_size = size;
                }
            }
            "TL" => {
                if let Some(leading) = num(0) {
                    state.leading = leading;
                }
            }
            "Td" | "TD" => {
                let (tx, ty) = (num(0).unwrap_or(0.0), num(1).unwrap_or(0.0));
                if op.operator == "TD" {
                    state.leading = -ty;
                }
                state.translate(tx, ty);
            }
            "Tm" => {
                if operands.len() >= 6 {
                    let mut m = IDENTITY;
                    for (i, slot) in m.iter_mut().enumerate() {
                        *slot = num(i).unwrap_or(IDENTITY[i]);
                    }
                    state.tlm = m;
                    state.tm = m;
                }
            }
            "T*" => state.next_line(),
            "Tj" => {
                if let Some(Object::String(bytes, _)) = operands.first() {
                    state.show(decode_text(bytes), page_height, &mut spans);
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = operands.first() {
                    let mut text = String::new();
                    for item in items {
                        match item {
                            Object::String(bytes, _) => text.push_str(&decode_text(bytes)),
                            // large negative kerning separates words
                            other => {
                                let word_gap = number(other).is_some_and(|n| n < -200.0);
                                if word_gap && !text.is_empty() && !text.ends_with(' ') {
                                    text.push(' ');
                                }
                            }
                        }
                    }
                    state.show(text, page_height, &mut spans);
                }
            }
            "'" | "\"" => {
                state.next_line();
                let index = if op.operator == "\"" { 2 } else { 0 };
                if let Some(Object::String(bytes, _)) = operands.get(index) {
                    state.show(decode_text(bytes), page_height, &mut spans);
                }
            }
            _ => {}
        }
    }

    spans
}

/// Decode string bytes without font information: UTF-16BE with BOM, then
/// UTF-8, then Latin-1
fn decode_text(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}
