//! Links annotation boxes to the page content they talk about
//!
//! A box gets up to two translucent highlights over blocks mentioning its
//! category's keywords, and a curved connector to the section it relates to.

use crate::config::KeywordTables;
use overlay_types::{
    AnnotationBox, Category, Connector, ContentHighlight, GeometryModel, RawPage, Rect, Rgb,
    SectionKind,
};
use tracing::debug;

pub const MAX_HIGHLIGHTS: usize = 2;
/// Line segments used to approximate the connector curve
pub const CONNECTOR_SEGMENTS: usize = 16;
pub const ARROW_LENGTH: f64 = 6.0;
const ARROW_HALF_WIDTH: f64 = 3.0;

/// Sections an insight of `category` most likely refers to, best first
pub fn preferred_sections(category: &Category) -> &'static [SectionKind] {
    use SectionKind::*;
    match category {
        Category::Engagement => &[Objectives, Activities],
        Category::Differentiation => &[Activities],
        Category::Assessment => &[Assessment, Activities],
        Category::Improvement => &[Activities],
        Category::Strength => &[Objectives],
        Category::Resource => &[Materials],
        Category::Extension => &[Activities],
        Category::Cultural => &[Activities, Objectives],
        Category::Custom(_) => &[],
    }
}

pub struct ContentLinker {
    keywords: KeywordTables,
}

impl ContentLinker {
    pub fn new(keywords: &KeywordTables) -> Self {
        Self {
            keywords: keywords.clone(),
        }
    }

    /// Attach highlights, a target area and a connector to `annotation`
    pub fn link(&self, page: &RawPage, model: &GeometryModel, annotation: &mut AnnotationBox) {
        annotation.related_highlights =
            self.find_highlights(page, &annotation.category, annotation.color);

        let (target, relevance) = match find_target(model, &annotation.category) {
            Some((rect, kind)) => (Some(rect), kind),
            None => (None, None),
        };
        annotation.target_content_area = target;
        annotation.relevance = relevance;
        annotation.connector = target.map(|t| {
            let start = (annotation.x, annotation.y + annotation.height / 2.0);
            curved_connector(start, &t)
        });

        debug!(
            page = annotation.page_index,
            category = %annotation.category,
            highlights = annotation.related_highlights.len(),
            linked = annotation.connector.is_some(),
            "Linked annotation"
        );
    }

    /// Blocks whose text mentions one of the category's keywords, at most two
    pub fn find_highlights(
        &self,
        page: &RawPage,
        category: &Category,
        color: Rgb,
    ) -> Vec<ContentHighlight> {
        let words = self.keywords.link_keywords(category);
        if words.is_empty() {
            return Vec::new();
        }

        page.blocks
            .iter()
            .filter_map(|block| {
                let bbox = block.rect()?;
                let text = block.lowercase_text();
                words
                    .iter()
                    .any(|w| text.contains(&w.to_lowercase()))
                    .then(|| ContentHighlight {
                        bbox,
                        color,
                        category: category.clone(),
                    })
            })
            .take(MAX_HIGHLIGHTS)
            .collect()
    }
}

/// First preferred section present on the page, else the largest content area
fn find_target(model: &GeometryModel, category: &Category) -> Option<(Rect, Option<SectionKind>)> {
    preferred_sections(category)
        .iter()
        .find_map(|kind| model.section(*kind).map(|s| (s.bbox, Some(*kind))))
        .or_else(|| model.largest_content_area().map(|a| (a.bbox, None)))
}

/// Point on the boundary of `rect` closest to `p`
pub fn nearest_boundary_point(p: (f64, f64), rect: &Rect) -> (f64, f64) {
    let x = p.0.clamp(rect.x0, rect.x1.max(rect.x0));
    let y = p.1.clamp(rect.y0, rect.y1.max(rect.y0));
    if !rect.contains_point(p.0, p.1) {
        return (x, y);
    }

    // Inside: move to the closest edge
    let candidates = [
        (p.0 - rect.x0, (rect.x0, p.1)),
        (rect.x1 - p.0, (rect.x1, p.1)),
        (p.1 - rect.y0, (p.0, rect.y0)),
        (rect.y1 - p.1, (p.0, rect.y1)),
    ];
    candidates
        .into_iter()
        .min_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, point)| point)
        .unwrap_or((x, y))
}

/// Cubic Bezier from `start` to the nearest point of `target`, flattened into
/// [`CONNECTOR_SEGMENTS`] segments, with an arrowhead at the target end
pub fn curved_connector(start: (f64, f64), target: &Rect) -> Connector {
    let end = nearest_boundary_point(start, target);
    let mid_x = (start.0 + end.0) / 2.0;
    let c1 = (mid_x, start.1);
    let c2 = (mid_x, end.1);

    let points: Vec<(f64, f64)> = (0..=CONNECTOR_SEGMENTS)
        .map(|i| {
            let t = i as f64 / CONNECTOR_SEGMENTS as f64;
            cubic_point(start, c1, c2, end, t)
        })
        .collect();

    let arrow = arrowhead(&points, end);
    Connector { points, arrow }
}

fn cubic_point(
    p0: (f64, f64),
    p1: (f64, f64),
    p2: (f64, f64),
    p3: (f64, f64),
    t: f64,
) -> (f64, f64) {
    let u = 1.0 - t;
    let a = u * u * u;
    let b = 3.0 * u * u * t;
    let c = 3.0 * u * t * t;
    let d = t * t * t;
    (
        a * p0.0 + b * p1.0 + c * p2.0 + d * p3.0,
        a * p0.1 + b * p1.1 + c * p2.1 + d * p3.1,
    )
}

/// Triangle pointing along the last non-degenerate segment into `tip`
fn arrowhead(points: &[(f64, f64)], tip: (f64, f64)) -> [(f64, f64); 3] {
    let direction = points
        .iter()
        .rev()
        .skip(1)
        .map(|p| (tip.0 - p.0, tip.1 - p.1))
        .find(|(dx, dy)| dx.hypot(*dy) > 1e-9)
        .unwrap_or((1.0, 0.0));

    let len = direction.0.hypot(direction.1);
    let (ux, uy) = (direction.0 / len, direction.1 / len);
    let base = (tip.0 - ux * ARROW_LENGTH, tip.1 - uy * ARROW_LENGTH);
    let (nx, ny) = (-uy * ARROW_HALF_WIDTH, ux * ARROW_HALF_WIDTH);
    [tip, (base.0 + nx, base.1 + ny), (base.0 - nx, base.1 - ny)]
}
