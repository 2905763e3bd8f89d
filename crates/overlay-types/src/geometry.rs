//! Page geometry model
//!
//! Coordinates follow the structured-text convention: origin at the top-left
//! corner of the page, y growing downward, units in PDF points.

use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle given by its two corners.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl Rect {
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Build a rectangle from its origin and size
    pub fn from_xywh(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x0: x,
            y0: y,
            x1: x + width,
            y1: y + height,
        }
    }

    /// Build from a `[x0, y0, x1, y1]` bbox array as emitted by text extraction
    pub fn from_bbox(bbox: [f64; 4]) -> Self {
        Self::new(bbox[0], bbox[1], bbox[2], bbox[3])
    }

    pub fn width(&self) -> f64 {
        (self.x1 - self.x0).max(0.0)
    }

    pub fn height(&self) -> f64 {
        (self.y1 - self.y0).max(0.0)
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    pub fn center(&self) -> (f64, f64) {
        ((self.x0 + self.x1) / 2.0, (self.y0 + self.y1) / 2.0)
    }

    /// True when `other` lies entirely inside `self` (tolerates rounding noise)
    pub fn contains_rect(&self, other: &Rect) -> bool {
        const EPS: f64 = 1e-6;
        other.x0 >= self.x0 - EPS
            && other.y0 >= self.y0 - EPS
            && other.x1 <= self.x1 + EPS
            && other.y1 <= self.y1 + EPS
    }

    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.x0 && x <= self.x1 && y >= self.y0 && y <= self.y1
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.x0 < other.x1 && other.x0 < self.x1 && self.y0 < other.y1 && other.y0 < self.y1
    }

    /// True when the vertical intervals of the two rectangles share interior points
    pub fn y_overlaps(&self, other: &Rect) -> bool {
        self.y0 < other.y1 && other.y0 < self.y1
    }

    /// Smallest rectangle covering both
    pub fn union(&self, other: &Rect) -> Rect {
        Rect::new(
            self.x0.min(other.x0),
            self.y0.min(other.y0),
            self.x1.max(other.x1),
            self.y1.max(other.y1),
        )
    }
}

/// Page dimensions in points
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

impl PageSize {
    pub fn letter() -> Self {
        Self {
            width: 612.0,
            height: 792.0,
        }
    }

    pub fn a4() -> Self {
        Self {
            width: 595.0,
            height: 842.0,
        }
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width, self.height)
    }
}

/// A block of text found on the page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentArea {
    pub bbox: Rect,
    pub area: f64,
    pub line_count: usize,
}

/// Free space between the text envelope and each page edge
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Margins {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
}

impl Margins {
    pub const DEFAULT: f64 = 50.0;

    pub fn uniform(value: f64) -> Self {
        Self {
            left: value,
            right: value,
            top: value,
            bottom: value,
        }
    }
}

impl Default for Margins {
    fn default() -> Self {
        Self::uniform(Self::DEFAULT)
    }
}

/// Where a white-space candidate came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionType {
    RightMargin,
    LeftMargin,
    TopArea,
    /// Synthesized over the right side of the page when no margin is usable
    RightOverlay,
    /// Synthesized over the left side of wide pages
    LeftOverlay,
}

impl RegionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegionType::RightMargin => "right_margin",
            RegionType::LeftMargin => "left_margin",
            RegionType::TopArea => "top_area",
            RegionType::RightOverlay => "right_overlay",
            RegionType::LeftOverlay => "left_overlay",
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, RegionType::RightOverlay | RegionType::LeftOverlay)
    }
}

/// A page region usable for annotation boxes. Lower `priority` is better.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhiteSpace {
    pub region_type: RegionType,
    pub bbox: Rect,
    pub priority: u8,
}

/// Lesson-plan section kinds recognized on a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Objectives,
    Materials,
    Activities,
    Assessment,
}

impl SectionKind {
    /// Classification order: the first matching kind wins
    pub const ALL: [SectionKind; 4] = [
        SectionKind::Objectives,
        SectionKind::Materials,
        SectionKind::Activities,
        SectionKind::Assessment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SectionKind::Objectives => "objectives",
            SectionKind::Materials => "materials",
            SectionKind::Activities => "activities",
            SectionKind::Assessment => "assessment",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub section_type: SectionKind,
    pub bbox: Rect,
    pub text_sample: String,
}

/// Immutable per-page layout record produced by the analyzer.
///
/// `white_spaces` is sorted by ascending priority and is never empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometryModel {
    pub page_index: usize,
    pub page_size: PageSize,
    pub content_areas: Vec<ContentArea>,
    pub margins: Margins,
    pub white_spaces: Vec<WhiteSpace>,
    pub sections: Vec<Section>,
    pub text_density: f64,
    /// Set when the page geometry could not be extracted and defaults were used
    #[serde(default)]
    pub degraded: bool,
}

impl GeometryModel {
    /// Largest text block on the page, if any
    pub fn largest_content_area(&self) -> Option<&ContentArea> {
        self.content_areas.first()
    }

    pub fn section(&self, kind: SectionKind) -> Option<&Section> {
        self.sections.iter().find(|s| s.section_type == kind)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn arb_rect() -> impl Strategy<Value = Rect> {
        (-500.0f64..500.0, -500.0f64..500.0, 0.0f64..400.0, 0.0f64..400.0)
            .prop_map(|(x, y, w, h)| Rect::from_xywh(x, y, w, h))
    }

    proptest! {
        #[test]
        fn union_contains_both(a in arb_rect(), b in arb_rect()) {
            let u = a.union(&b);
            prop_assert!(u.contains_rect(&a));
            prop_assert!(u.contains_rect(&b));
            prop_assert!(u.area() + 1e-6 >= a.area().max(b.area()));
        }

        #[test]
        fn intersects_is_symmetric(a in arb_rect(), b in arb_rect()) {
            prop_assert_eq!(a.intersects(&b), b.intersects(&a));
        }
    }
}
