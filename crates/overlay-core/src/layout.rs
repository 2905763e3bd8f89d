//! Page layout analysis
//!
//! Turns a page's raw text geometry into a [`GeometryModel`]: content areas,
//! margins, white-space candidates, lesson sections and text density.

use crate::config::{LayoutConfig, OverlayConfig, PlacementConfig, SectionKeywords};
use overlay_types::{
    ContentArea, GeometryModel, Margins, PageSize, RawPage, Rect, RegionType, Section,
    SectionKind, WhiteSpace,
};
use tracing::debug;

/// Builds one [`GeometryModel`] per page
#[derive(Debug, Clone)]
pub struct LayoutAnalyzer {
    layout: LayoutConfig,
    placement: PlacementConfig,
    sections: SectionKeywords,
}

impl LayoutAnalyzer {
    pub fn new(config: &OverlayConfig) -> Self {
        Self {
            layout: config.layout.clone(),
            placement: config.placement.clone(),
            sections: config.keywords.sections.clone(),
        }
    }

    /// Analyze a page. Never fails: a page without usable geometry gets
    /// default margins and synthesized white space.
    pub fn analyze(&self, page_index: usize, page: &RawPage) -> GeometryModel {
        let page_size = page.size();
        let content_areas = self.content_areas(page);
        let margins = self.margins(page);
        let white_spaces = self.white_spaces(page_size, &margins);
        let sections = self.sections(page);
        let text_density = self.text_density(page);

        debug!(
            page = page_index,
            blocks = page.blocks.len(),
            regions = white_spaces.len(),
            sections = sections.len(),
            density = text_density,
            "Analyzed page layout"
        );

        GeometryModel {
            page_index,
            page_size,
            content_areas,
            margins,
            white_spaces,
            sections,
            text_density,
            degraded: false,
        }
    }

    /// Model for a page whose geometry could not be extracted
    pub fn degraded(&self, page_index: usize, page_size: PageSize) -> GeometryModel {
        let margins = Margins::uniform(self.layout.default_margin);
        GeometryModel {
            page_index,
            page_size,
            content_areas: Vec::new(),
            white_spaces: self.white_spaces(page_size, &margins),
            margins,
            sections: Vec::new(),
            text_density: 0.0,
            degraded: true,
        }
    }

    /// Text blocks with at least one line, largest first
    fn content_areas(&self, page: &RawPage) -> Vec<ContentArea> {
        let mut areas: Vec<ContentArea> = page
            .blocks
            .iter()
            .filter(|b| !b.lines.is_empty())
            .filter_map(|b| {
                b.rect().map(|bbox| ContentArea {
                    bbox,
                    area: bbox.area(),
                    line_count: b.lines.len(),
                })
            })
            .collect();

        // sort_by is stable: equal areas keep page order
        areas.sort_by(|a, b| b.area.total_cmp(&a.area));
        areas
    }

    fn margins(&self, page: &RawPage) -> Margins {
        let envelope = page
            .blocks
            .iter()
            .filter_map(|b| b.rect())
            .reduce(|acc, r| acc.union(&r));

        let Some(env) = envelope else {
            return Margins::uniform(self.layout.default_margin);
        };

        let floor = self.layout.min_margin;
        let buffer = self.layout.margin_buffer;
        Margins {
            left: (env.x0 - buffer).max(floor),
            right: (page.width - env.x1 - buffer).max(floor),
            top: (env.y0 - buffer).max(floor),
            bottom: (page.height - env.y1 - buffer).max(floor),
        }
    }

    fn white_spaces(&self, size: PageSize, margins: &Margins) -> Vec<WhiteSpace> {
        let cfg = &self.layout;
        let side_height = size.height - cfg.region_vertical_inset;
        let mut spaces = Vec::new();

        if margins.right > cfg.side_margin_threshold {
            spaces.push(WhiteSpace {
                region_type: RegionType::RightMargin,
                bbox: Rect::from_xywh(
                    size.width - margins.right,
                    cfg.region_top,
                    margins.right - 20.0,
                    side_height,
                ),
                priority: 1,
            });
        }

        if margins.left > cfg.side_margin_threshold {
            spaces.push(WhiteSpace {
                region_type: RegionType::LeftMargin,
                bbox: Rect::from_xywh(10.0, cfg.region_top, margins.left - 20.0, side_height),
                priority: 2,
            });
        }

        if margins.top > cfg.top_margin_threshold {
            spaces.push(WhiteSpace {
                region_type: RegionType::TopArea,
                bbox: Rect::from_xywh(
                    margins.left,
                    10.0,
                    size.width - margins.left - margins.right,
                    margins.top - 20.0,
                ),
                priority: 3,
            });
        }

        if !spaces.iter().any(|s| self.can_host_box(&s.bbox)) {
            debug!(
                qualifying = spaces.len(),
                "No margin can host an annotation box, synthesizing overlay regions"
            );
            spaces.extend(self.fallback_regions(size));
        }

        spaces.sort_by_key(|s| s.priority);
        spaces
    }

    /// Overlay regions drawn over page content when margins are too small
    fn fallback_regions(&self, size: PageSize) -> Vec<WhiteSpace> {
        let cfg = &self.layout;
        let y0 = cfg.region_top.min(size.height);
        let height = (size.height - cfg.region_vertical_inset).max(0.0);

        let right_x = (size.width - cfg.fallback_offset).max(0.0);
        let right_width = cfg.fallback_width.min((size.width - right_x).max(0.0));
        let mut regions = vec![WhiteSpace {
            region_type: RegionType::RightOverlay,
            bbox: Rect::from_xywh(right_x, y0, right_width, height),
            priority: 4,
        }];

        if size.width > cfg.wide_page_threshold {
            regions.push(WhiteSpace {
                region_type: RegionType::LeftOverlay,
                bbox: Rect::from_xywh(20.0, y0, cfg.fallback_width, height),
                priority: 5,
            });
        }
        regions
    }

    /// Whether a region is large enough for at least one minimum-size box
    pub fn can_host_box(&self, region: &Rect) -> bool {
        region_can_host_box(&self.placement, region)
    }

    fn sections(&self, page: &RawPage) -> Vec<Section> {
        let mut sections = Vec::new();
        for block in &page.blocks {
            let Some(bbox) = block.rect() else { continue };
            if block.lines.is_empty() {
                continue;
            }
            let text = block.lowercase_text();
            let matched = SectionKind::ALL.into_iter().find(|kind| {
                self.sections
                    .for_kind(*kind)
                    .iter()
                    .any(|kw| text.contains(kw.as_str()))
            });
            if let Some(section_type) = matched {
                sections.push(Section {
                    section_type,
                    bbox,
                    text_sample: text.chars().take(self.layout.section_sample_len).collect(),
                });
            }
        }
        sections
    }

    fn text_density(&self, page: &RawPage) -> f64 {
        let page_area = page.size().area();
        if page_area <= 0.0 {
            return 0.0;
        }
        let text_area: f64 = page.blocks.iter().filter_map(|b| b.rect()).map(|r| r.area()).sum();
        (text_area / page_area).clamp(0.0, 1.0)
    }
}

/// A region hosts a box when a minimum box fits after the horizontal inset
/// on both sides and the start offset at the top.
pub(crate) fn region_can_host_box(placement: &PlacementConfig, region: &Rect) -> bool {
    let usable_width = region.width() - 2.0 * placement.region_inset_x;
    let usable_height = region.height() - placement.start_offset;
    usable_width >= placement.min_width && usable_height >= placement.min_height
}

#[cfg(test)]
mod tests {
    use super::*;
    use overlay_types::{RawBlock, RawLine, RawSpan};
    use pretty_assertions::assert_eq;

    fn block(bbox: [f64; 4], text: &str) -> RawBlock {
        RawBlock {
            bbox: Some(bbox),
            lines: vec![RawLine {
                bbox: None,
                spans: vec![RawSpan {
                    text: text.to_string(),
                    ..Default::default()
                }],
            }],
        }
    }

    fn analyzer() -> LayoutAnalyzer {
        LayoutAnalyzer::new(&OverlayConfig::default())
    }

    /// Letter page with a narrow text column leaving a wide right margin
    fn narrow_column_page() -> RawPage {
        RawPage {
            width: 612.0,
            height: 792.0,
            blocks: vec![
                block([72.0, 72.0, 350.0, 120.0], "Objetivos del estudiante"),
                block([72.0, 140.0, 350.0, 400.0], "Materiales: tarjetas, lápiz"),
                block([72.0, 420.0, 350.0, 700.0], "Actividad: Nosotros leemos"),
            ],
        }
    }

    #[test]
    fn test_content_areas_sorted_largest_first() {
        let model = analyzer().analyze(0, &narrow_column_page());
        let areas: Vec<f64> = model.content_areas.iter().map(|a| a.area).collect();
        assert_eq!(areas, vec![278.0 * 280.0, 278.0 * 260.0, 278.0 * 48.0]);
        assert_eq!(model.content_areas[0].line_count, 1);
    }

    #[test]
    fn test_blocks_without_lines_are_not_content() {
        let mut page = narrow_column_page();
        page.blocks.push(RawBlock {
            bbox: Some([400.0, 100.0, 500.0, 200.0]),
            lines: vec![],
        });
        let model = analyzer().analyze(0, &page);
        assert_eq!(model.content_areas.len(), 3);
    }

    #[test]
    fn test_margins_from_text_envelope() {
        let model = analyzer().analyze(0, &narrow_column_page());
        assert_eq!(
            model.margins,
            Margins {
                left: 62.0,
                right: 252.0,
                top: 62.0,
                bottom: 82.0,
            }
        );
    }

    #[test]
    fn test_margins_are_floored() {
        let page = RawPage {
            width: 612.0,
            height: 792.0,
            blocks: vec![block([5.0, 5.0, 607.0, 787.0], "full bleed")],
        };
        let model = analyzer().analyze(0, &page);
        assert_eq!(model.margins, Margins::uniform(20.0));
    }

    #[test]
    fn test_right_margin_is_best_region() {
        let model = analyzer().analyze(0, &narrow_column_page());
        let best = &model.white_spaces[0];
        assert_eq!(best.region_type, RegionType::RightMargin);
        assert_eq!(best.priority, 1);
        assert_eq!(best.bbox, Rect::from_xywh(360.0, 80.0, 232.0, 632.0));
        // left and top margins (62) qualify too, sorted after the right margin
        let kinds: Vec<RegionType> = model.white_spaces.iter().map(|w| w.region_type).collect();
        assert_eq!(
            kinds,
            vec![RegionType::RightMargin, RegionType::LeftMargin, RegionType::TopArea]
        );
    }

    #[test]
    fn test_full_width_page_falls_back_to_right_overlay() {
        let page = RawPage {
            width: 612.0,
            height: 792.0,
            blocks: vec![block([0.0, 0.0, 612.0, 792.0], "dense")],
        };
        let model = analyzer().analyze(0, &page);
        assert!((model.text_density - 1.0).abs() < 1e-9);
        let overlay = &model.white_spaces[0];
        assert_eq!(overlay.region_type, RegionType::RightOverlay);
        assert_eq!(overlay.bbox.x0, 612.0 - 200.0);
        assert_eq!(overlay.bbox.width(), 180.0);
        assert_eq!(model.white_spaces[1].region_type, RegionType::LeftOverlay);
    }

    #[test]
    fn test_narrow_page_gets_no_left_overlay() {
        let page = RawPage {
            width: 400.0,
            height: 600.0,
            blocks: vec![block([0.0, 0.0, 400.0, 600.0], "dense")],
        };
        let model = analyzer().analyze(0, &page);
        assert_eq!(model.white_spaces.len(), 1);
        assert_eq!(model.white_spaces[0].region_type, RegionType::RightOverlay);
    }

    #[test]
    fn test_margins_too_narrow_for_a_box_add_overlays() {
        // 80pt right margin qualifies (> 60) but leaves a 60pt region
        let page = RawPage {
            width: 612.0,
            height: 792.0,
            blocks: vec![block([30.0, 30.0, 522.0, 760.0], "column")],
        };
        let model = analyzer().analyze(0, &page);
        let kinds: Vec<RegionType> = model.white_spaces.iter().map(|w| w.region_type).collect();
        assert_eq!(
            kinds,
            vec![
                RegionType::RightMargin,
                RegionType::RightOverlay,
                RegionType::LeftOverlay
            ]
        );
    }

    #[test]
    fn test_empty_page_uses_default_margins() {
        let page = RawPage::empty(PageSize::letter());
        let model = analyzer().analyze(2, &page);
        assert_eq!(model.margins, Margins::uniform(50.0));
        assert!(model.content_areas.is_empty());
        assert!(model.sections.is_empty());
        assert!(!model.white_spaces.is_empty());
        assert_eq!(model.page_index, 2);
    }

    #[test]
    fn test_degraded_model_still_has_white_space() {
        let model = analyzer().degraded(1, PageSize::a4());
        assert!(model.degraded);
        assert!(!model.white_spaces.is_empty());
        assert_eq!(model.text_density, 0.0);
    }

    #[test]
    fn test_sections_first_match_wins() {
        let model = analyzer().analyze(0, &narrow_column_page());
        let kinds: Vec<SectionKind> = model.sections.iter().map(|s| s.section_type).collect();
        assert_eq!(
            kinds,
            vec![
                SectionKind::Objectives,
                SectionKind::Materials,
                SectionKind::Activities
            ]
        );
        assert!(model.sections[1].text_sample.starts_with("materiales"));
    }

    #[test]
    fn test_section_sample_is_bounded() {
        let long = format!("evaluación {}", "x".repeat(300));
        let page = RawPage {
            width: 612.0,
            height: 792.0,
            blocks: vec![block([72.0, 72.0, 300.0, 200.0], &long)],
        };
        let model = analyzer().analyze(0, &page);
        assert_eq!(model.sections[0].section_type, SectionKind::Assessment);
        assert_eq!(model.sections[0].text_sample.chars().count(), 100);
    }

    #[test]
    fn test_text_density_sums_block_areas() {
        let page = RawPage {
            width: 100.0,
            height: 100.0,
            blocks: vec![
                block([0.0, 0.0, 50.0, 50.0], "a"),
                block([50.0, 50.0, 100.0, 100.0], "b"),
            ],
        };
        let model = analyzer().analyze(0, &page);
        assert!((model.text_density - 0.5).abs() < 1e-9);
    }
}
