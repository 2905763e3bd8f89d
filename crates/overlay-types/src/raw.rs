//! Raw structured-text tree for one page
//!
//! The shape follows the widely used `get_text("dict")` export: a page with
//! blocks, each block with lines, each line with spans of literal text.
//! Unknown fields are ignored so exports from other extractors deserialize too.

use crate::geometry::{PageSize, Rect};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSpan {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub size: Option<f64>,
    #[serde(default)]
    pub font: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawLine {
    #[serde(default)]
    pub bbox: Option<[f64; 4]>,
    #[serde(default)]
    pub spans: Vec<RawSpan>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawBlock {
    /// Image blocks and malformed entries may have no bbox
    #[serde(default)]
    pub bbox: Option<[f64; 4]>,
    #[serde(default)]
    pub lines: Vec<RawLine>,
}

impl RawBlock {
    pub fn rect(&self) -> Option<Rect> {
        self.bbox.map(Rect::from_bbox)
    }

    /// All span text of the block, lowercased and space-joined
    pub fn lowercase_text(&self) -> String {
        let mut text = String::new();
        for line in &self.lines {
            for span in &line.spans {
                text.push_str(&span.text.to_lowercase());
                text.push(' ');
            }
        }
        text
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPage {
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub blocks: Vec<RawBlock>,
}

impl RawPage {
    /// A page with known size but no extracted text
    pub fn empty(size: PageSize) -> Self {
        Self {
            width: size.width,
            height: size.height,
            blocks: Vec::new(),
        }
    }

    pub fn size(&self) -> PageSize {
        PageSize {
            width: self.width,
            height: self.height,
        }
    }
}
