//! Draw planned annotation boxes into a PDF
//!
//! Each annotated page keeps its original content untouched inside a
//! `q ... Q` pair; the overlay is appended as a new content stream so it
//! always paints on top. Highlights go down first, then connectors, then the
//! boxes themselves, so a box's text is never covered by a connector.

use crate::canvas::PageCanvas;
use crate::error::{OverlayError, RenderStage};
use crate::geometry::page_size;
use crate::placement::PagePlacement;
use crate::text::{TextLayout, SAFE_INSET, TEXT_PADDING};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use overlay_types::{AnnotationBox, ContentHighlight, Connector, Rect, Rgb};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Resource names used by the overlay stream
pub const FONT_REGULAR: &str = "OvHelv";
pub const FONT_BOLD: &str = "OvHelvB";
pub const HIGHLIGHT_STATE: &str = "OvHighlight";

const HIGHLIGHT_ALPHA: f32 = 0.2;
const HIGHLIGHT_BORDER: f64 = 0.5;
const CONNECTOR_WIDTH: f64 = 1.0;
/// (inset, lighten) pairs for the glow behind a box
const GLOW: [(f64, f64); 3] = [(0.0, 0.3), (1.0, 0.2), (2.0, 0.1)];

fn inset(rect: &Rect, by: f64) -> Rect {
    Rect::new(rect.x0 + by, rect.y0 + by, rect.x1 - by, rect.y1 - by)
}

/// Visual style of an annotation overlay
pub trait Presentation {
    fn name(&self) -> &'static str;

    /// Whether content highlights and connectors are drawn
    fn shows_links(&self) -> bool;

    fn draw_box(&self, canvas: &mut PageCanvas, annotation: &AnnotationBox);
}

/// Glowing, priority-weighted boxes with highlights and connectors
#[derive(Debug, Clone, Copy, Default)]
pub struct SmartOverlay;

/// Flat framed boxes without links to page content
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainOverlay;

impl Presentation for SmartOverlay {
    fn name(&self) -> &'static str {
        "smart"
    }

    fn shows_links(&self) -> bool {
        true
    }

    fn draw_box(&self, canvas: &mut PageCanvas, annotation: &AnnotationBox) {
        let rect = annotation.rect();
        let color = annotation.color;

        canvas.fill_rect(&rect, color);
        for (by, amount) in GLOW {
            canvas.fill_rect(&inset(&rect, by), color.lighten(amount));
        }
        canvas.fill_rect(&inset(&rect, SAFE_INSET), Rgb::WHITE);

        // keep the stroke inside the box
        let border = f64::from(annotation.priority.number());
        canvas.stroke_rect(&inset(&rect, border / 2.0), color, border);

        draw_text(canvas, annotation, true);
    }
}

impl Presentation for PlainOverlay {
    fn name(&self) -> &'static str {
        "plain"
    }

    fn shows_links(&self) -> bool {
        false
    }

    fn draw_box(&self, canvas: &mut PageCanvas, annotation: &AnnotationBox) {
        let rect = annotation.rect();
        canvas.fill_rect(&rect, annotation.color);
        canvas.fill_rect(&inset(&rect, SAFE_INSET), Rgb::WHITE);
        canvas.stroke_rect(&inset(&rect, 0.5), annotation.color, 1.0);
        draw_text(canvas, annotation, false);
    }
}

/// Wrapped text inside the box's text-safe area, cut with an ellipsis when it
/// does not fit
fn draw_text(canvas: &mut PageCanvas, annotation: &AnnotationBox, bold_first_line: bool) {
    let layout = TextLayout::for_box(
        &annotation.text,
        annotation.width,
        annotation.height,
        annotation.font_size,
    );
    let x = annotation.x + SAFE_INSET + TEXT_PADDING;

    for (i, (line, offset)) in layout.lines.iter().zip(layout.baselines()).enumerate() {
        let font = if bold_first_line && i == 0 {
            FONT_BOLD
        } else {
            FONT_REGULAR
        };
        canvas.text(
            x,
            annotation.y + offset,
            font,
            layout.font_size,
            Rgb::TEXT,
            line,
        );
    }
}

fn draw_highlight(canvas: &mut PageCanvas, highlight: &ContentHighlight) {
    canvas.save_state();
    canvas.set_graphics_state(HIGHLIGHT_STATE);
    canvas.fill_rect(&highlight.bbox, highlight.color);
    canvas.restore_state();
    canvas.stroke_rect(&highlight.bbox, highlight.color, HIGHLIGHT_BORDER);
}

fn draw_connector(canvas: &mut PageCanvas, connector: &Connector, color: Rgb) {
    canvas.polyline(&connector.points, color, CONNECTOR_WIDTH);
    canvas.fill_polygon(&connector.arrow, color);
}

/// Shared resource objects added once per document
struct OverlayResources {
    regular: ObjectId,
    bold: ObjectId,
    highlight: ObjectId,
    open: ObjectId,
    close: ObjectId,
}

impl OverlayResources {
    fn add_to(doc: &mut Document) -> Self {
        let font = |base: &str| {
            dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => base,
                "Encoding" => "WinAnsiEncoding",
            }
        };
        let regular = doc.add_object(font("Helvetica"));
        let bold = doc.add_object(font("Helvetica-Bold"));
        let highlight = doc.add_object(dictionary! {
            "Type" => "ExtGState",
            "ca" => Object::Real(HIGHLIGHT_ALPHA),
        });
        let open = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
        let close = doc.add_object(Stream::new(Dictionary::new(), b"\nQ\n".to_vec()));
        Self {
            regular,
            bold,
            highlight,
            open,
            close,
        }
    }
}

pub struct OverlayRenderer {
    presentation: Box<dyn Presentation>,
}

impl OverlayRenderer {
    pub fn new(presentation: Box<dyn Presentation>) -> Self {
        Self { presentation }
    }

    pub fn smart() -> Self {
        Self::new(Box::new(SmartOverlay))
    }

    pub fn plain() -> Self {
        Self::new(Box::new(PlainOverlay))
    }

    pub fn presentation_name(&self) -> &'static str {
        self.presentation.name()
    }

    /// Operators for one page, in paint order
    pub fn draw_page(&self, page_height: f64, boxes: &[AnnotationBox]) -> PageCanvas {
        let mut canvas = PageCanvas::new(page_height);

        if self.presentation.shows_links() {
            for highlight in boxes.iter().flat_map(|b| b.related_highlights.iter()) {
                draw_highlight(&mut canvas, highlight);
            }
            for b in boxes {
                if let Some(connector) = &b.connector {
                    draw_connector(&mut canvas, connector, b.color);
                }
            }
        }
        for b in boxes {
            self.presentation.draw_box(&mut canvas, b);
        }
        canvas
    }

    /// Draw every placement into `doc`. Returns the number of pages modified.
    pub fn render(
        &self,
        doc: &mut Document,
        placements: &[PagePlacement],
    ) -> Result<usize, OverlayError> {
        let pages: BTreeMap<u32, ObjectId> = doc.get_pages();
        let mut resources: Option<OverlayResources> = None;
        let mut modified = 0;

        for placement in placements.iter().filter(|p| !p.boxes.is_empty()) {
            let page_number = placement.page_index as u32 + 1;
            let page_id = *pages.get(&page_number).ok_or_else(|| {
                OverlayError::render(
                    RenderStage::Draw,
                    format!("page {} does not exist", page_number),
                )
            })?;

            let height = page_size(doc, page_id).height;
            let bytes = self.draw_page(height, &placement.boxes).encode()?;
            let shared = resources.get_or_insert_with(|| OverlayResources::add_to(doc));
            let (open, close) = (shared.open, shared.close);
            install_resources(doc, page_id, shared)?;

            let overlay_id = doc.add_object(Stream::new(Dictionary::new(), bytes));
            append_content(doc, page_id, open, close, overlay_id)?;

            debug!(
                page = placement.page_index,
                boxes = placement.boxes.len(),
                style = self.presentation.name(),
                "Rendered overlay"
            );
            modified += 1;
        }

        info!(pages = modified, "Overlay rendering complete");
        Ok(modified)
    }
}

impl Default for OverlayRenderer {
    fn default() -> Self {
        Self::smart()
    }
}

fn draw_error(e: lopdf::Error) -> OverlayError {
    OverlayError::render(RenderStage::Draw, e.to_string())
}

/// Resolve an object that may be a reference into an owned dictionary
fn resolve_dict(doc: &Document, obj: &Object) -> Option<Dictionary> {
    match obj {
        Object::Dictionary(dict) => Some(dict.clone()),
        Object::Reference(id) => doc.get_dictionary(*id).ok().cloned(),
        _ => None,
    }
}

/// The page's effective Resources, following `Parent` for inherited entries
fn effective_resources(doc: &Document, page_id: ObjectId) -> Dictionary {
    let mut current = doc.get_dictionary(page_id).ok();
    let mut depth = 0;
    while let Some(dict) = current {
        if let Some(resources) = dict
            .get(b"Resources")
            .ok()
            .and_then(|obj| resolve_dict(doc, obj))
        {
            return resources;
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
    Dictionary::new()
}

/// Give the page its own Resources with the overlay fonts and graphics state.
///
/// Shared resource dictionaries are copied, never modified in place.
fn install_resources(
    doc: &mut Document,
    page_id: ObjectId,
    shared: &OverlayResources,
) -> Result<(), OverlayError> {
    let mut resources = effective_resources(doc, page_id);

    let mut fonts = resources
        .get(b"Font")
        .ok()
        .and_then(|obj| resolve_dict(doc, obj))
        .unwrap_or_default();
    fonts.set(FONT_REGULAR, Object::Reference(shared.regular));
    fonts.set(FONT_BOLD, Object::Reference(shared.bold));
    resources.set("Font", Object::Dictionary(fonts));

    let mut states = resources
        .get(b"ExtGState")
        .ok()
        .and_then(|obj| resolve_dict(doc, obj))
        .unwrap_or_default();
    states.set(HIGHLIGHT_STATE, Object::Reference(shared.highlight));
    resources.set("ExtGState", Object::Dictionary(states));

    let page = doc
        .get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(draw_error)?;
    page.set("Resources", Object::Dictionary(resources));
    Ok(())
}

/// Content stream references of a page, with an indirect Contents array
/// flattened into its entries
fn content_streams(doc: &Document, page_id: ObjectId) -> Result<Vec<Object>, OverlayError> {
    let page = doc.get_dictionary(page_id).map_err(draw_error)?;
    let streams = match page.get(b"Contents") {
        Ok(Object::Reference(id)) => match doc.get_object(*id) {
            Ok(Object::Array(items)) => items.clone(),
            _ => vec![Object::Reference(*id)],
        },
        Ok(Object::Array(items)) => items.clone(),
        _ => Vec::new(),
    };
    Ok(streams)
}

/// Replace the page's Contents with `[q, original..., Q, overlay]`
fn append_content(
    doc: &mut Document,
    page_id: ObjectId,
    open: ObjectId,
    close: ObjectId,
    overlay: ObjectId,
) -> Result<(), OverlayError> {
    let original = content_streams(doc, page_id)?;

    let mut contents = Vec::with_capacity(original.len() + 3);
    contents.push(Object::Reference(open));
    contents.extend(original);
    contents.push(Object::Reference(close));
    contents.push(Object::Reference(overlay));

    let page = doc
        .get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(draw_error)?;
    page.set("Contents", Object::Array(contents));
    Ok(())
}
