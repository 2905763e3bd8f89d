//! End-to-end annotation of a lesson-plan PDF
//!
//! Load → per-page geometry → layout → categorize → plan → link → render →
//! save. A page whose geometry cannot be extracted still gets boxes in the
//! default margins; every other failure aborts the run.

use crate::config::OverlayConfig;
use crate::error::{OverlayError, RenderStage};
use crate::geometry::{page_size, GeometryProvider, PageSource};
use crate::insights::{split_sections, InsightCategorizer, Taxonomy};
use crate::layout::LayoutAnalyzer;
use crate::linker::ContentLinker;
use crate::placement::PlacementPlanner;
use crate::render::OverlayRenderer;
use crate::theme::Theme;
use lopdf::Document;
use overlay_types::{Category, CategorizedInsights, GeometryModel, RawPage};
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info, warn};

/// Counters describing one annotation run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OverlayReport {
    pub page_count: usize,
    pub insights_total: usize,
    pub boxes_placed: usize,
    pub unplaced_insights: usize,
    /// Pages annotated without extracted geometry
    pub degraded_pages: Vec<usize>,
    /// Pages that were assigned insights but had no room for any of them
    pub pages_without_placements: Vec<usize>,
    /// Color key for every category that produced insights
    pub legend: Vec<LegendEntry>,
    /// Headings found in the annotation text
    pub sections: Vec<SectionSummary>,
    pub boxes: Vec<BoxSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LegendEntry {
    pub category: String,
    pub label: String,
    /// `#rrggbb`
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionSummary {
    pub title: String,
    pub category: String,
    pub lines: usize,
}

/// One placed box and what it was linked to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoxSummary {
    pub page_index: usize,
    pub category: String,
    pub priority: u8,
    pub relevance: String,
}

pub struct OverlayPipeline {
    config: OverlayConfig,
    theme: Theme,
    analyzer: LayoutAnalyzer,
    categorizer: InsightCategorizer,
    planner: PlacementPlanner,
    linker: ContentLinker,
    renderer: OverlayRenderer,
}

impl OverlayPipeline {
    pub fn new(config: OverlayConfig) -> Self {
        let theme = Theme::load(config.themes_path.as_deref(), &config.theme);
        Self {
            analyzer: LayoutAnalyzer::new(&config),
            categorizer: InsightCategorizer::new(),
            planner: PlacementPlanner::new(&config.placement, theme.clone()),
            linker: ContentLinker::new(&config.keywords),
            renderer: OverlayRenderer::default(),
            config,
            theme,
        }
    }

    /// Build a pipeline from a TOML configuration file
    pub fn from_config_file<P: AsRef<Path>>(path: P) -> Result<Self, OverlayError> {
        let config =
            OverlayConfig::from_file(path).map_err(|e| OverlayError::Config(format!("{:#}", e)))?;
        Ok(Self::new(config))
    }

    pub fn with_renderer(mut self, renderer: OverlayRenderer) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    /// Annotate an already loaded document in place
    pub fn annotate_document(
        &self,
        doc: &mut Document,
        text: &str,
        taxonomy: &Taxonomy,
        provider: &dyn GeometryProvider,
    ) -> Result<OverlayReport, OverlayError> {
        let mut report = OverlayReport::default();

        let (raw_pages, models) = self.analyze_pages(doc, provider, &mut report)?;
        report.page_count = models.len();
        info!(pages = report.page_count, "Analyzed page layout");

        let insights = self.categorizer.categorize(text, taxonomy);
        report.insights_total = insights.total();
        report.legend = self.legend(&insights);
        report.sections = split_sections(text, taxonomy.is_custom())
            .into_iter()
            .map(|section| SectionSummary {
                category: section.category.key().to_string(),
                lines: section.lines.len(),
                title: section.title,
            })
            .collect();
        info!(
            insights = report.insights_total,
            custom = taxonomy.is_custom(),
            "Categorized annotation text"
        );

        let mut placements = self.planner.plan(&models, &insights);
        for placement in &mut placements {
            let index = placement.page_index;
            for annotation in &mut placement.boxes {
                self.linker
                    .link(&raw_pages[index], &models[index], annotation);
                report.boxes.push(BoxSummary {
                    page_index: index,
                    category: annotation.category.key().to_string(),
                    priority: annotation.priority.number(),
                    relevance: annotation.relevance_label(),
                });
            }
            report.boxes_placed += placement.boxes.len();
            report.unplaced_insights += placement.unplaced;
            if placement.is_starved() {
                report.pages_without_placements.push(index);
            }
        }
        info!(
            boxes = report.boxes_placed,
            unplaced = report.unplaced_insights,
            "Planned annotation boxes"
        );

        self.renderer.render(doc, &placements)?;
        Ok(report)
    }

    /// Annotate PDF bytes, returning the new PDF bytes and the run report
    pub fn annotate_bytes(
        &self,
        pdf: &[u8],
        text: &str,
        taxonomy: &Taxonomy,
        provider: &dyn GeometryProvider,
    ) -> Result<(Vec<u8>, OverlayReport), OverlayError> {
        let mut doc =
            Document::load_mem(pdf).map_err(|e| OverlayError::ParseError(e.to_string()))?;
        let report = self.annotate_document(&mut doc, text, taxonomy, provider)?;

        let mut output = Vec::new();
        doc.save_to(&mut output)
            .map_err(|e| OverlayError::render(RenderStage::Serialize, e.to_string()))?;

        info!(
            bytes = output.len(),
            boxes = report.boxes_placed,
            degraded = report.degraded_pages.len(),
            "Annotation complete"
        );
        Ok((output, report))
    }

    /// Annotate `source` and write the result to `dest`.
    ///
    /// The output is staged in a temporary file next to `dest` and only
    /// moved into place once fully written, so `dest` is never left
    /// half-written.
    pub fn annotate_file(
        &self,
        source: &Path,
        dest: &Path,
        text: &str,
        taxonomy: &Taxonomy,
        provider: &dyn GeometryProvider,
    ) -> Result<OverlayReport, OverlayError> {
        let pdf = std::fs::read(source).map_err(|e| OverlayError::SourceRead {
            path: source.to_path_buf(),
            source: e,
        })?;
        let (bytes, report) = self.annotate_bytes(&pdf, text, taxonomy, provider)?;

        let dir = match dest.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut staged = tempfile::NamedTempFile::new_in(dir)
            .map_err(|e| OverlayError::render(RenderStage::Write, e.to_string()))?;
        staged
            .write_all(&bytes)
            .and_then(|_| staged.flush())
            .map_err(|e| OverlayError::render(RenderStage::Write, e.to_string()))?;
        staged
            .persist(dest)
            .map_err(|e| OverlayError::render(RenderStage::Persist, e.error.to_string()))?;

        info!(dest = %dest.display(), "Wrote annotated document");
        Ok(report)
    }

    /// Legend entries in priority order, one per category with insights
    fn legend(&self, insights: &CategorizedInsights) -> Vec<LegendEntry> {
        let mut categories: Vec<Category> = Vec::new();
        for insight in insights.flatten() {
            if !categories.contains(&insight.category) {
                categories.push(insight.category);
            }
        }
        categories
            .iter()
            .zip(self.theme.legend(&categories))
            .map(|(category, (label, color))| LegendEntry {
                category: category.key().to_string(),
                label,
                color: color.to_hex(),
            })
            .collect()
    }

    fn analyze_pages(
        &self,
        doc: &Document,
        provider: &dyn GeometryProvider,
        report: &mut OverlayReport,
    ) -> Result<(Vec<RawPage>, Vec<GeometryModel>), OverlayError> {
        let pages = doc.get_pages();
        let mut raw_pages = Vec::with_capacity(pages.len());
        let mut models = Vec::with_capacity(pages.len());

        for (index, (_, &page_id)) in pages.iter().enumerate() {
            let size = page_size(doc, page_id);
            let source = PageSource {
                doc,
                page_id,
                index,
                size,
            };

            match provider.page_geometry(&source) {
                Ok(raw) => {
                    let model = self.analyzer.analyze(index, &raw);
                    debug!(
                        page = index,
                        blocks = raw.blocks.len(),
                        regions = model.white_spaces.len(),
                        "Page geometry"
                    );
                    raw_pages.push(raw);
                    models.push(model);
                }
                Err(e) if e.is_recoverable() => {
                    warn!(page = index, error = %e, "Using default margins for page");
                    report.degraded_pages.push(index);
                    raw_pages.push(RawPage::empty(size));
                    models.push(self.analyzer.degraded(index, size));
                }
                Err(e) => return Err(e),
            }
        }
        Ok((raw_pages, models))
    }
}

impl Default for OverlayPipeline {
    fn default() -> Self {
        Self::new(OverlayConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::JsonGeometry;
    use lopdf::{dictionary, Dictionary, Object, Stream};
    use overlay_types::{PageSize, RawBlock, RawLine, RawSpan};
    use pretty_assertions::assert_eq;

    const ANNOTATION: &str = "\
### 1. **Engagement**
- Open with a quick movement game to wake everyone up
- Ask students to predict the ending before reading

### 2. **Assessment**
- Use exit tickets to check understanding of fractions
";

    fn create_test_pdf(num_pages: u32) -> Document {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let mut kids = Vec::new();
        for i in 0..num_pages {
            let text = format!("BT /F1 12 Tf 72 720 Td (Page {}) Tj ET", i + 1);
            let content_id = doc.add_object(Stream::new(Dictionary::new(), text.into_bytes()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(Object::Reference(page_id));
        }
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => num_pages as i64,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc
    }

    fn block(bbox: [f64; 4], text: &str) -> RawBlock {
        RawBlock {
            bbox: Some(bbox),
            lines: vec![RawLine {
                bbox: Some(bbox),
                spans: vec![RawSpan {
                    text: text.to_string(),
                    size: Some(11.0),
                    font: None,
                }],
            }],
        }
    }

    fn narrow_column_page() -> RawPage {
        RawPage {
            width: 612.0,
            height: 792.0,
            blocks: vec![
                block([72.0, 80.0, 350.0, 300.0], "Activity: warm-up game and group reading"),
                block([72.0, 320.0, 350.0, 700.0], "Assessment: exit ticket on fractions"),
            ],
        }
    }

    #[test]
    fn test_annotate_document_places_all_insights() {
        let mut doc = create_test_pdf(1);
        let provider = JsonGeometry::new(vec![narrow_column_page()]);
        let report = OverlayPipeline::default()
            .annotate_document(&mut doc, ANNOTATION, &Taxonomy::Default, &provider)
            .unwrap();

        assert_eq!(report.page_count, 1);
        assert_eq!(report.insights_total, 3);
        assert_eq!(report.boxes_placed, 3);
        assert_eq!(report.unplaced_insights, 0);
        assert!(report.degraded_pages.is_empty());
        assert!(report.pages_without_placements.is_empty());
    }

    #[test]
    fn test_report_describes_legend_sections_and_boxes() {
        let mut doc = create_test_pdf(1);
        let provider = JsonGeometry::new(vec![narrow_column_page()]);
        let pipeline = OverlayPipeline::default();
        let report = pipeline
            .annotate_document(&mut doc, ANNOTATION, &Taxonomy::Default, &provider)
            .unwrap();

        let legend: Vec<&str> = report.legend.iter().map(|e| e.category.as_str()).collect();
        assert_eq!(legend, vec!["engagement", "assessment"]);
        assert_eq!(
            report.legend[0].color,
            Theme::builtin().color_for(&Category::Engagement).to_hex()
        );

        let sections: Vec<(&str, &str, usize)> = report
            .sections
            .iter()
            .map(|s| (s.title.as_str(), s.category.as_str(), s.lines))
            .collect();
        assert_eq!(
            sections,
            vec![("Engagement", "engagement", 2), ("Assessment", "assessment", 1)]
        );

        assert_eq!(report.boxes.len(), report.boxes_placed);
        // the page has an activity section, which engagement boxes point at
        let engagement = report
            .boxes
            .iter()
            .find(|b| b.category == "engagement")
            .unwrap();
        assert_eq!(engagement.priority, 1);
        assert_eq!(engagement.relevance, "Related to activities section");
    }

    #[test]
    fn test_missing_geometry_degrades_page() {
        let provider = JsonGeometry::new(vec![narrow_column_page()]);
        let mut doc = create_test_pdf(2);
        let report = OverlayPipeline::default()
            .annotate_document(&mut doc, ANNOTATION, &Taxonomy::Default, &provider)
            .unwrap();

        assert_eq!(report.page_count, 2);
        assert_eq!(report.degraded_pages, vec![1]);
        assert_eq!(report.boxes_placed + report.unplaced_insights, 3);
    }

    #[test]
    fn test_empty_text_leaves_document_unchanged() {
        let mut doc = create_test_pdf(1);
        let before = doc.get_page_content(doc.get_pages()[&1]).unwrap();
        let provider = JsonGeometry::new(vec![RawPage::empty(PageSize::letter())]);
        let report = OverlayPipeline::default()
            .annotate_document(&mut doc, "", &Taxonomy::Default, &provider)
            .unwrap();

        assert_eq!(report.insights_total, 0);
        assert_eq!(report.boxes_placed, 0);
        let after = doc.get_page_content(doc.get_pages()[&1]).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_unparseable_source_is_parse_error() {
        let provider = JsonGeometry::new(Vec::new());
        let err = OverlayPipeline::default()
            .annotate_bytes(b"not a pdf", ANNOTATION, &Taxonomy::Default, &provider)
            .unwrap_err();
        assert!(matches!(err, OverlayError::ParseError(_)));
    }

    #[test]
    fn test_report_serializes() {
        let report = OverlayReport {
            page_count: 2,
            degraded_pages: vec![1],
            ..Default::default()
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["page_count"], 2);
        assert_eq!(json["degraded_pages"], serde_json::json!([1]));
    }
}
