//! Category color themes
//!
//! Themes are read from a JSON file of the form
//!
//! ```json
//! {
//!   "default_theme": "educational",
//!   "themes": {
//!     "educational": {
//!       "colors": { "engagement": [0.1, 0.7, 0.2] },
//!       "category_definitions": { "engagement": "Student Engagement" }
//!     }
//!   }
//! }
//! ```
//!
//! Any failure to load falls back to the built-in eight-color palette.

use crate::error::OverlayError;
use overlay_types::{Category, Rgb};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::warn;

pub const DEFAULT_THEME: &str = "educational";

/// Resolved, immutable palette used by the planner and renderer
#[derive(Debug, Clone, PartialEq)]
pub struct Theme {
    pub name: String,
    colors: HashMap<String, Rgb>,
    definitions: HashMap<String, String>,
}

impl Theme {
    /// Built-in palette for the fixed taxonomy
    pub fn builtin() -> Self {
        let colors = [
            (Category::Engagement, Rgb::new(0.1, 0.7, 0.2)),
            (Category::Differentiation, Rgb::new(0.9, 0.5, 0.1)),
            (Category::Assessment, Rgb::new(0.5, 0.1, 0.8)),
            (Category::Improvement, Rgb::new(0.8, 0.1, 0.1)),
            (Category::Strength, Rgb::new(0.1, 0.4, 0.8)),
            (Category::Resource, Rgb::new(0.6, 0.6, 0.1)),
            (Category::Extension, Rgb::new(0.8, 0.1, 0.6)),
            (Category::Cultural, Rgb::new(0.1, 0.8, 0.6)),
        ]
        .into_iter()
        .map(|(c, rgb)| (c.key().to_string(), rgb))
        .collect();

        Self {
            name: DEFAULT_THEME.to_string(),
            colors,
            definitions: HashMap::new(),
        }
    }

    /// Load `name` from a themes file, falling back to the built-in palette
    /// when the file is missing, malformed, or lacks a usable theme.
    pub fn load(path: Option<&Path>, name: &str) -> Self {
        let Some(path) = path else {
            return Self::builtin();
        };
        match ThemeFile::from_file(path) {
            Ok(file) => file.select(Some(name)),
            Err(e) => {
                warn!(
                    "Error loading theme colors from {}: {}, using defaults",
                    path.display(),
                    e
                );
                Self::builtin()
            }
        }
    }

    /// Color for a category; neutral gray when the palette has no entry
    pub fn color_for(&self, category: &Category) -> Rgb {
        self.colors
            .get(category.key())
            .copied()
            .unwrap_or(Rgb::GRAY)
    }

    /// Display label for a category, preferring the theme's own definitions
    pub fn definition(&self, category: &Category) -> String {
        self.definitions
            .get(category.key())
            .cloned()
            .unwrap_or_else(|| category.display_name().to_string())
    }

    /// (label, color) pairs for a legend, in the given category order
    pub fn legend(&self, categories: &[Category]) -> Vec<(String, Rgb)> {
        categories
            .iter()
            .map(|c| (self.definition(c), self.color_for(c)))
            .collect()
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::builtin()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThemeEntry {
    pub colors: HashMap<String, Rgb>,
    #[serde(default)]
    pub category_definitions: HashMap<String, String>,
}

/// Parsed themes file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThemeFile {
    #[serde(default)]
    pub default_theme: Option<String>,
    pub themes: HashMap<String, ThemeEntry>,
}

impl ThemeFile {
    pub fn from_file(path: &Path) -> Result<Self, OverlayError> {
        let content = fs::read_to_string(path).map_err(|e| {
            OverlayError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(json: &str) -> Result<Self, OverlayError> {
        serde_json::from_str(json).map_err(|e| OverlayError::Config(e.to_string()))
    }

    /// Resolve a theme by name.
    ///
    /// `None` selects the file's `default_theme`; an unknown name selects
    /// "educational"; when that is missing too the built-in palette is used.
    pub fn select(&self, name: Option<&str>) -> Theme {
        let requested = name
            .map(str::to_string)
            .or_else(|| self.default_theme.clone())
            .unwrap_or_else(|| DEFAULT_THEME.to_string());

        let resolved = if self.themes.contains_key(&requested) {
            requested
        } else {
            warn!("Theme '{}' not found, using '{}'", requested, DEFAULT_THEME);
            DEFAULT_THEME.to_string()
        };

        match self.themes.get(&resolved) {
            Some(entry) => Theme {
                name: resolved,
                colors: entry.colors.clone(),
                definitions: entry.category_definitions.clone(),
            },
            None => {
                warn!("Themes file has no '{}' theme, using defaults", DEFAULT_THEME);
                Theme::builtin()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const THEMES: &str = r#"{
        "default_theme": "educational",
        "themes": {
            "educational": {
                "colors": {"engagement": [0.0, 1.0, 0.0]},
                "category_definitions": {"engagement": "Participación"}
            },
            "custom": {
                "colors": {"category1": [1.0, 0.0, 0.0], "category2": [0.0, 0.0, 1.0]},
                "category_definitions": {"category1": "Must-do activities"}
            }
        }
    }"#;

    #[test]
    fn test_builtin_palette_has_eight_colors() {
        let theme = Theme::builtin();
        for c in Category::FIXED {
            assert_ne!(theme.color_for(&c), Rgb::GRAY);
        }
        assert_eq!(theme.color_for(&Category::Improvement), Rgb::new(0.8, 0.1, 0.1));
    }

    #[test]
    fn test_unknown_category_falls_back_to_gray() {
        let theme = Theme::builtin();
        assert_eq!(
            theme.color_for(&Category::Custom("category7".into())),
            Rgb::GRAY
        );
    }

    #[test]
    fn test_select_named_theme() {
        let file = ThemeFile::from_json_str(THEMES).unwrap();
        let theme = file.select(Some("custom"));
        assert_eq!(theme.name, "custom");
        assert_eq!(
            theme.color_for(&Category::Custom("category1".into())),
            Rgb::new(1.0, 0.0, 0.0)
        );
        assert_eq!(
            theme.definition(&Category::Custom("category1".into())),
            "Must-do activities"
        );
    }

    #[test]
    fn test_unknown_theme_selects_educational() {
        let file = ThemeFile::from_json_str(THEMES).unwrap();
        let theme = file.select(Some("seasonal"));
        assert_eq!(theme.name, "educational");
        assert_eq!(theme.definition(&Category::Engagement), "Participación");
        assert_eq!(
            theme.definition(&Category::Assessment),
            "Assessment Methods"
        );
    }

    #[test]
    fn test_missing_file_uses_builtin() {
        let theme = Theme::load(Some(Path::new("/nonexistent/themes.json")), "custom");
        assert_eq!(theme, Theme::builtin());
    }

    #[test]
    fn test_malformed_json_is_config_error() {
        let err = ThemeFile::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, OverlayError::Config(_)));
    }

    #[test]
    fn test_legend_follows_requested_order() {
        let theme = Theme::builtin();
        let legend = theme.legend(&[Category::Cultural, Category::Engagement]);
        assert_eq!(legend[0].0, "Cultural Considerations");
        assert_eq!(legend[1].1, Rgb::new(0.1, 0.7, 0.2));
    }
}
