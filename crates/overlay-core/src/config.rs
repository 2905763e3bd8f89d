//! Engine configuration
//!
//! All tunables of the analyzer, planner and linker live in one immutable
//! [`OverlayConfig`], loaded once by the caller (usually from TOML) and passed
//! to each component at construction. Every field has a default, so an empty
//! file is a valid configuration.

use anyhow::{ensure, Context};
use overlay_types::{Category, Priority, SectionKind};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlayConfig {
    /// Name of the color theme (default: "educational")
    #[serde(default = "default_theme")]
    pub theme: String,
    /// Optional path to a themes JSON file; the built-in palette is used otherwise
    #[serde(default)]
    pub themes_path: Option<PathBuf>,
    #[serde(default)]
    pub layout: LayoutConfig,
    #[serde(default)]
    pub placement: PlacementConfig,
    #[serde(default)]
    pub keywords: KeywordTables,
}

fn default_theme() -> String {
    "educational".to_string()
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            theme: default_theme(),
            themes_path: None,
            layout: LayoutConfig::default(),
            placement: PlacementConfig::default(),
            keywords: KeywordTables::default(),
        }
    }
}

impl OverlayConfig {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, the TOML is malformed, or
    /// the resulting values are inconsistent (see [`OverlayConfig::validate`]).
    ///
    /// # Example
    ///
    /// ```no_run
    /// use overlay_core::config::OverlayConfig;
    ///
    /// # fn example() -> anyhow::Result<()> {
    /// let config = OverlayConfig::from_file("overlay.toml")?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string
    ///
    /// ```
    /// use overlay_core::config::OverlayConfig;
    ///
    /// # fn example() -> anyhow::Result<()> {
    /// let config = OverlayConfig::from_str(r#"
    ///     theme = "custom"
    ///
    ///     [placement]
    ///     max_width = 260.0
    /// "#)?;
    /// assert_eq!(config.placement.max_width, 260.0);
    /// # Ok(())
    /// # }
    /// ```
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> anyhow::Result<Self> {
        let config: OverlayConfig =
            toml::from_str(s).context("Failed to parse TOML configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject size limits that would make the placement clamps meaningless
    pub fn validate(&self) -> anyhow::Result<()> {
        let p = &self.placement;
        ensure!(
            p.min_width > 0.0 && p.min_width <= p.max_width,
            "placement.min_width ({}) must be positive and <= max_width ({})",
            p.min_width,
            p.max_width
        );
        ensure!(
            p.min_height > 0.0 && p.min_height <= p.max_height,
            "placement.min_height ({}) must be positive and <= max_height ({})",
            p.min_height,
            p.max_height
        );
        ensure!(
            p.height_ratio > 0.0 && p.height_ratio <= 1.0,
            "placement.height_ratio must be in (0, 1]"
        );
        ensure!(
            p.font_high > 0.0 && p.font_medium > 0.0 && p.font_low > 0.0,
            "placement font sizes must be positive"
        );
        ensure!(
            self.layout.fallback_width > 0.0,
            "layout.fallback_width must be positive"
        );
        Ok(())
    }
}

/// Page analysis thresholds, in points
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Gap kept between the text envelope and a margin measurement
    pub margin_buffer: f64,
    /// Smallest margin ever reported
    pub min_margin: f64,
    /// Margins used when a page has no text geometry
    pub default_margin: f64,
    /// Left/right margins must exceed this to become white space
    pub side_margin_threshold: f64,
    /// The top margin must exceed this to become white space
    pub top_margin_threshold: f64,
    /// Top edge of side regions
    pub region_top: f64,
    /// Side regions are `page_height - region_vertical_inset` tall
    pub region_vertical_inset: f64,
    /// Width of the synthesized overlay regions
    pub fallback_width: f64,
    /// Right overlay starts this far from the right page edge
    pub fallback_offset: f64,
    /// Pages wider than this also get a left overlay
    pub wide_page_threshold: f64,
    /// Characters kept in a section's text sample
    pub section_sample_len: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            margin_buffer: 10.0,
            min_margin: 20.0,
            default_margin: 50.0,
            side_margin_threshold: 60.0,
            top_margin_threshold: 40.0,
            region_top: 80.0,
            region_vertical_inset: 160.0,
            fallback_width: 180.0,
            fallback_offset: 200.0,
            wide_page_threshold: 500.0,
            section_sample_len: 100,
        }
    }
}

/// Box sizing and stacking parameters, in points
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementConfig {
    pub min_width: f64,
    pub min_height: f64,
    pub max_width: f64,
    pub max_height: f64,
    /// A box may use at most this share of its region's height
    pub height_ratio: f64,
    /// Horizontal inset of boxes inside their region (each side)
    pub region_inset_x: f64,
    /// First box starts this far below the region top
    pub start_offset: f64,
    /// Vertical gap between consecutive boxes
    pub gutter: f64,
    /// Placement stops when less vertical space than this remains
    pub min_viable_space: f64,
    pub font_high: f64,
    pub font_medium: f64,
    pub font_low: f64,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            min_width: 150.0,
            min_height: 50.0,
            max_width: 300.0,
            max_height: 400.0,
            height_ratio: 0.9,
            region_inset_x: 10.0,
            start_offset: 20.0,
            gutter: 15.0,
            min_viable_space: 45.0,
            font_high: 10.0,
            font_medium: 9.0,
            font_low: 8.0,
        }
    }
}

impl PlacementConfig {
    pub fn font_size(&self, priority: Priority) -> f64 {
        match priority {
            Priority::High => self.font_high,
            Priority::Medium => self.font_medium,
            Priority::Low => self.font_low,
        }
    }
}

/// Keyword sets for section classification, one list per section kind
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionKeywords {
    pub objectives: Vec<String>,
    pub materials: Vec<String>,
    pub activities: Vec<String>,
    pub assessment: Vec<String>,
}

impl SectionKeywords {
    pub fn for_kind(&self, kind: SectionKind) -> &[String] {
        match kind {
            SectionKind::Objectives => &self.objectives,
            SectionKind::Materials => &self.materials,
            SectionKind::Activities => &self.activities,
            SectionKind::Assessment => &self.assessment,
        }
    }
}

impl Default for SectionKeywords {
    fn default() -> Self {
        Self {
            objectives: strings(&["objetivos", "objectives", "objetivo"]),
            materials: strings(&["materiales", "materials", "material"]),
            activities: strings(&["actividad", "activity", "nosotros", "leemos"]),
            assessment: strings(&["evaluación", "assessment", "compartir", "reflexionar"]),
        }
    }
}

/// Keyword tables shared by the analyzer and the linker
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordTables {
    pub sections: SectionKeywords,
    /// Category key -> words that mark page text as evidence for that category
    pub links: HashMap<String, Vec<String>>,
}

impl KeywordTables {
    pub fn link_keywords(&self, category: &Category) -> &[String] {
        self.links
            .get(category.key())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

impl Default for KeywordTables {
    fn default() -> Self {
        let links = [
            (
                Category::Engagement,
                &[
                    "particip", "juego", "game", "interactiv", "canción", "song", "movimiento",
                    "movement",
                ][..],
            ),
            (
                Category::Differentiation,
                &[
                    "nivel", "level", "diferente", "different", "apoyo", "support", "adaptación",
                    "adaptation", "individual",
                ][..],
            ),
            (
                Category::Assessment,
                &[
                    "evalua", "assess", "observ", "pregunta", "question", "compartir",
                    "reflexion",
                ][..],
            ),
            (
                Category::Improvement,
                &[
                    "actividad", "activity", "tiempo", "time", "instrucción", "instruction",
                ][..],
            ),
            (
                Category::Strength,
                &[
                    "objetivo", "objective", "fonológica", "phonological", "estrategia",
                    "strategy",
                ][..],
            ),
            (
                Category::Resource,
                &[
                    "material", "recurso", "resource", "lápiz", "papel", "tarjeta", "card",
                ][..],
            ),
            (
                Category::Extension,
                &["extensión", "extension", "casa", "home", "proyecto", "project"][..],
            ),
            (
                Category::Cultural,
                &[
                    "cultura", "culture", "familia", "family", "comunidad", "community",
                    "idioma", "language",
                ][..],
            ),
        ]
        .into_iter()
        .map(|(category, words)| (category.key().to_string(), strings(words)))
        .collect();

        Self {
            sections: SectionKeywords::default(),
            links,
        }
    }
}

fn strings(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_yields_defaults() {
        let config = OverlayConfig::from_str("").unwrap();
        assert_eq!(config.theme, "educational");
        assert_eq!(config.placement.min_width, 150.0);
        assert_eq!(config.layout.fallback_width, 180.0);
        assert!(config.keywords.link_keywords(&Category::Resource).len() > 3);
    }

    #[test]
    fn test_partial_sections_keep_remaining_defaults() {
        let toml = r#"
            [layout]
            side_margin_threshold = 72.0

            [keywords.sections]
            objectives = ["goals"]
        "#;
        let config = OverlayConfig::from_str(toml).unwrap();
        assert_eq!(config.layout.side_margin_threshold, 72.0);
        assert_eq!(config.layout.top_margin_threshold, 40.0);
        assert_eq!(
            config.keywords.sections.for_kind(SectionKind::Objectives),
            &["goals".to_string()][..]
        );
        assert!(!config
            .keywords
            .sections
            .for_kind(SectionKind::Materials)
            .is_empty());
    }

    #[test]
    fn test_inconsistent_sizes_are_rejected() {
        let toml = r#"
            [placement]
            min_width = 400.0
            max_width = 300.0
        "#;
        let err = OverlayConfig::from_str(toml).unwrap_err();
        assert!(err.to_string().contains("min_width"));
    }

    #[test]
    fn test_malformed_toml_is_an_error() {
        assert!(OverlayConfig::from_str("theme = [").is_err());
    }

    #[test]
    fn test_font_size_by_priority() {
        let p = PlacementConfig::default();
        assert_eq!(p.font_size(Priority::High), 10.0);
        assert_eq!(p.font_size(Priority::Medium), 9.0);
        assert_eq!(p.font_size(Priority::Low), 8.0);
    }

    #[test]
    fn test_unknown_category_has_no_link_keywords() {
        let tables = KeywordTables::default();
        assert!(tables
            .link_keywords(&Category::Custom("category9".into()))
            .is_empty());
    }
}
