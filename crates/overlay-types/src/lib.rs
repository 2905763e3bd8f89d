//! Shared data model for the lesson-plan overlay engine
//!
//! Page geometry, insights, and positioned annotation boxes. Everything here
//! is plain data: analysis, placement and rendering live in `overlay-core`.

pub mod geometry;
pub mod raw;
pub mod types;

pub use geometry::{
    ContentArea, GeometryModel, Margins, PageSize, Rect, RegionType, Section, SectionKind,
    WhiteSpace,
};
pub use raw::{RawBlock, RawLine, RawPage, RawSpan};
pub use types::{
    AnnotationBox, CategorizedInsights, Category, CategoryInsights, Connector, ContentHighlight,
    Insight, Priority, Rgb,
};
