//! Greedy annotation box placement
//!
//! Insights are flattened in priority order, split evenly across pages, and
//! stacked top-down in each page's best white-space region. Each box is sized
//! to its wrapped text within the configured limits.

use crate::config::PlacementConfig;
use crate::layout::region_can_host_box;
use crate::text::{box_height_for, box_width_for, chars_per_line, wrap};
use crate::theme::Theme;
use overlay_types::{
    AnnotationBox, CategorizedInsights, GeometryModel, Insight, Rect, RegionType, WhiteSpace,
};
use std::ops::Range;
use tracing::{debug, warn};

/// Boxes placed on one page
#[derive(Debug, Clone, PartialEq)]
pub struct PagePlacement {
    pub page_index: usize,
    /// Placed boxes in placement order (top to bottom)
    pub boxes: Vec<AnnotationBox>,
    /// Insights distributed to this page
    pub assigned: usize,
    /// Assigned insights that did not fit
    pub unplaced: usize,
    /// Region the boxes were stacked in, if any could host a box
    pub region_type: Option<RegionType>,
}

impl PagePlacement {
    /// True when the page was given insights but none could be placed
    pub fn is_starved(&self) -> bool {
        self.assigned > 0 && self.boxes.is_empty()
    }
}

/// Split `total` items over `pages` pages.
///
/// Every page but the last takes `max(1, total / pages)` items (or what is
/// left); the last page takes the remainder.
pub fn distribute(total: usize, pages: usize) -> Vec<Range<usize>> {
    if pages == 0 {
        return Vec::new();
    }
    let per_page = (total / pages).max(1);
    (0..pages)
        .map(|i| {
            let start = (i * per_page).min(total);
            let end = if i + 1 == pages {
                total
            } else {
                ((i + 1) * per_page).min(total)
            };
            start..end
        })
        .collect()
}

pub struct PlacementPlanner {
    config: PlacementConfig,
    theme: Theme,
}

impl PlacementPlanner {
    pub fn new(config: &PlacementConfig, theme: Theme) -> Self {
        Self {
            config: config.clone(),
            theme,
        }
    }

    /// Plan boxes for every page.
    ///
    /// Distribution over all pages happens before any page is placed.
    pub fn plan(
        &self,
        pages: &[GeometryModel],
        insights: &CategorizedInsights,
    ) -> Vec<PagePlacement> {
        let flattened = insights.flatten();
        let ranges = distribute(flattened.len(), pages.len());

        pages
            .iter()
            .zip(ranges)
            .map(|(model, range)| self.place_page(model, &flattened[range]))
            .collect()
    }

    /// Best white space on the page that can hold a minimum-size box
    pub fn select_region<'m>(&self, model: &'m GeometryModel) -> Option<&'m WhiteSpace> {
        model
            .white_spaces
            .iter()
            .filter(|w| region_can_host_box(&self.config, &clip(&w.bbox, &model.page_size.bounds())))
            .min_by_key(|w| w.priority)
    }

    fn place_page(&self, model: &GeometryModel, insights: &[Insight]) -> PagePlacement {
        let mut placement = PagePlacement {
            page_index: model.page_index,
            boxes: Vec::new(),
            assigned: insights.len(),
            unplaced: 0,
            region_type: None,
        };
        if insights.is_empty() {
            return placement;
        }

        let Some(space) = self.select_region(model) else {
            warn!(
                page = model.page_index,
                insights = insights.len(),
                "No white space can host an annotation box"
            );
            placement.unplaced = insights.len();
            return placement;
        };
        placement.region_type = Some(space.region_type);

        let cfg = &self.config;
        let region = clip(&space.bbox, &model.page_size.bounds());
        let x = region.x0 + cfg.region_inset_x;
        let available_width = (region.width() - 2.0 * cfg.region_inset_x).min(cfg.max_width);
        let height_cap = cfg
            .min_height
            .max((region.height() * cfg.height_ratio).min(cfg.max_height));
        let mut y = region.y0 + cfg.start_offset;

        for (i, insight) in insights.iter().enumerate() {
            let remaining = region.y1 - y;
            if remaining < cfg.min_viable_space || remaining < cfg.min_height {
                placement.unplaced = insights.len() - i;
                debug!(
                    page = model.page_index,
                    placed = i,
                    unplaced = placement.unplaced,
                    "Region full"
                );
                break;
            }

            let font_size = cfg.font_size(insight.priority);
            let width = self.box_width(&insight.text, font_size, available_width);
            let line_count = wrap(&insight.text, chars_per_line(width, font_size)).len();
            let height = box_height_for(line_count, font_size)
                .clamp(cfg.min_height, height_cap)
                .min(remaining);

            placement.boxes.push(AnnotationBox {
                x,
                y,
                width,
                height,
                text: insight.text.clone(),
                category: insight.category.clone(),
                priority: insight.priority,
                color: self.theme.color_for(&insight.category),
                page_index: model.page_index,
                font_size,
                region,
                target_content_area: None,
                related_highlights: Vec::new(),
                connector: None,
                relevance: None,
            });

            y += height + cfg.gutter;
        }

        debug!(
            page = model.page_index,
            region = space.region_type.as_str(),
            placed = placement.boxes.len(),
            "Placed annotation boxes"
        );
        placement
    }

    /// Width of the widest wrapped line, clamped to the configured limits
    fn box_width(&self, text: &str, font_size: f64, available_width: f64) -> f64 {
        let lines = wrap(text, chars_per_line(available_width, font_size));
        let widest = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
        box_width_for(widest, font_size)
            .min(available_width)
            .max(self.config.min_width)
    }
}

fn clip(rect: &Rect, bounds: &Rect) -> Rect {
    Rect::new(
        rect.x0.max(bounds.x0),
        rect.y0.max(bounds.y0),
        rect.x1.min(bounds.x1),
        rect.y1.min(bounds.y1),
    )
}


#[cfg(test)]
mod proptests {
    use super::*;
    use overlay_types::{Category, CategoryInsights, Margins, PageSize};
    use proptest::prelude::*;

    fn arb_model(page_index: usize) -> impl Strategy<Value = GeometryModel> {
        (0.0f64..400.0, 0.0f64..300.0, 100.0f64..400.0, 50.0f64..700.0).prop_map(
            move |(x, y, w, h)| GeometryModel {
                page_index,
                page_size: PageSize::letter(),
                content_areas: Vec::new(),
                margins: Margins::default(),
                white_spaces: vec![WhiteSpace {
                    region_type: RegionType::RightMargin,
                    bbox: Rect::from_xywh(x, y, w, h),
                    priority: 1,
                }],
                sections: Vec::new(),
                text_density: 0.5,
                degraded: false,
            },
        )
    }

    fn arb_pages() -> impl Strategy<Value = Vec<GeometryModel>> {
        (1usize..5).prop_flat_map(|n| (0..n).map(arb_model).collect::<Vec<_>>())
    }

    fn arb_insights() -> impl Strategy<Value = CategorizedInsights> {
        let points = || prop::collection::vec("[a-z]{1,12}( [a-z]{1,12}){0,30}", 0..4);
        (points(), points(), points()).prop_map(|(h, m, l)| CategorizedInsights {
            high: vec![CategoryInsights { category: Category::Engagement, points: h }],
            medium: vec![CategoryInsights { category: Category::Assessment, points: m }],
            low: vec![CategoryInsights { category: Category::Resource, points: l }],
        })
    }

    proptest! {
        #[test]
        fn distribution_is_fair(total in 0usize..200, pages in 1usize..20) {
            let ranges = distribute(total, pages);
            prop_assert_eq!(ranges.len(), pages);
            prop_assert_eq!(ranges.iter().map(|r| r.len()).sum::<usize>(), total);
            let non_last: Vec<usize> = ranges[..pages - 1].iter().map(|r| r.len()).collect();
            for a in &non_last {
                for b in &non_last {
                    prop_assert!(a.abs_diff(*b) <= 1);
                }
            }
            for pair in ranges.windows(2) {
                prop_assert_eq!(pair[0].end, pair[1].start);
            }
        }

        /// Property: boxes respect minimum size, stay in their region and
        /// page, never overlap vertically, and keep priority order
        #[test]
        fn placed_boxes_hold_invariants(pages in arb_pages(), insights in arb_insights()) {
            let planner = PlacementPlanner::new(&PlacementConfig::default(), Theme::builtin());
            let placements = planner.plan(&pages, &insights);
            prop_assert_eq!(placements.len(), pages.len());

            let mut accounted = 0;
            for placement in &placements {
                accounted += placement.boxes.len() + placement.unplaced;
                let bounds = PageSize::letter().bounds();
                for b in &placement.boxes {
                    prop_assert!(b.width >= 150.0);
                    prop_assert!(b.height >= 50.0);
                    prop_assert!(b.region.contains_rect(&b.rect()));
                    prop_assert!(bounds.contains_rect(&b.rect()));
                }
                for (i, a) in placement.boxes.iter().enumerate() {
                    for b in &placement.boxes[i + 1..] {
                        prop_assert!(!a.rect().y_overlaps(&b.rect()));
                        prop_assert!(a.priority <= b.priority);
                    }
                }
            }
            prop_assert_eq!(accounted, insights.total());
        }
    }
}
