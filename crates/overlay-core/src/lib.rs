//! Lesson-plan overlay engine
//!
//! Places categorized teaching insights as colored annotation boxes in the
//! free space of an existing PDF, linked back to the page content they talk
//! about.
//!
//! The pieces can be used on their own:
//! - [`LayoutAnalyzer`] turns extracted page text into a [`GeometryModel`]
//! - [`InsightCategorizer`] turns annotation text into categorized insights
//! - [`PlacementPlanner`] stacks boxes into each page's best free region
//! - [`ContentLinker`] attaches highlights and connectors to each box
//! - [`OverlayRenderer`] draws the boxes into the document
//!
//! or driven end to end through [`OverlayPipeline`].
//!
//! [`GeometryModel`]: overlay_types::GeometryModel

pub mod canvas;
pub mod config;
pub mod error;
pub mod geometry;
pub mod insights;
pub mod layout;
pub mod linker;
pub mod pipeline;
pub mod placement;
pub mod render;
pub mod text;
pub mod theme;

pub use config::{KeywordTables, LayoutConfig, OverlayConfig, PlacementConfig, SectionKeywords};
pub use error::{OverlayError, RenderStage};
pub use geometry::{ContentStreamGeometry, GeometryProvider, JsonGeometry, PageSource};
pub use insights::{split_sections, CustomCategory, InsightCategorizer, Taxonomy, TextSection};
pub use layout::LayoutAnalyzer;
pub use linker::ContentLinker;
pub use pipeline::{BoxSummary, LegendEntry, OverlayPipeline, OverlayReport, SectionSummary};
pub use placement::{PagePlacement, PlacementPlanner};
pub use render::{OverlayRenderer, PlainOverlay, Presentation, SmartOverlay};
pub use theme::{Theme, ThemeFile};

/// Parse PDF bytes and return page count
pub fn get_page_count(bytes: &[u8]) -> Result<usize, OverlayError> {
    let doc =
        lopdf::Document::load_mem(bytes).map_err(|e| OverlayError::ParseError(e.to_string()))?;
    Ok(doc.get_pages().len())
}
