use crate::geometry::{Rect, SectionKind};
use serde::{Deserialize, Serialize};
use std::fmt;

/// RGB color with components in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 3]", into = "[f64; 3]")]
pub struct Rgb {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb::new(1.0, 1.0, 1.0);
    pub const GRAY: Rgb = Rgb::new(0.5, 0.5, 0.5);
    pub const TEXT: Rgb = Rgb::new(0.1, 0.1, 0.1);

    pub const fn new(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }

    /// Move each channel toward white by `amount`, saturating at 1.0
    pub fn lighten(&self, amount: f64) -> Rgb {
        Rgb::new(
            (self.r + amount).min(1.0),
            (self.g + amount).min(1.0),
            (self.b + amount).min(1.0),
        )
    }

    pub fn to_hex(&self) -> String {
        let channel = |c: f64| (c.clamp(0.0, 1.0) * 255.0) as u8;
        format!(
            "#{:02x}{:02x}{:02x}",
            channel(self.r),
            channel(self.g),
            channel(self.b)
        )
    }
}

impl From<[f64; 3]> for Rgb {
    fn from(c: [f64; 3]) -> Self {
        Rgb::new(c[0].clamp(0.0, 1.0), c[1].clamp(0.0, 1.0), c[2].clamp(0.0, 1.0))
    }
}

impl From<Rgb> for [f64; 3] {
    fn from(c: Rgb) -> Self {
        [c.r, c.g, c.b]
    }
}

/// Pedagogical insight category.
///
/// The eight fixed categories form the default taxonomy; `Custom` carries a
/// user-defined key such as `category3`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    Engagement,
    Differentiation,
    Assessment,
    Improvement,
    Strength,
    Resource,
    Extension,
    Cultural,
    Custom(String),
}

impl Category {
    /// The fixed taxonomy in its canonical order
    pub const FIXED: [Category; 8] = [
        Category::Engagement,
        Category::Differentiation,
        Category::Assessment,
        Category::Improvement,
        Category::Strength,
        Category::Resource,
        Category::Extension,
        Category::Cultural,
    ];

    pub fn key(&self) -> &str {
        match self {
            Category::Engagement => "engagement",
            Category::Differentiation => "differentiation",
            Category::Assessment => "assessment",
            Category::Improvement => "improvement",
            Category::Strength => "strength",
            Category::Resource => "resource",
            Category::Extension => "extension",
            Category::Cultural => "cultural",
            Category::Custom(key) => key,
        }
    }

    pub fn from_key(key: &str) -> Category {
        Category::FIXED
            .iter()
            .find(|c| c.key() == key)
            .cloned()
            .unwrap_or_else(|| Category::Custom(key.to_string()))
    }

    /// Fixed priority of a default-taxonomy category. Custom categories are
    /// prioritized by position instead and report `Low` here.
    pub fn default_priority(&self) -> Priority {
        match self {
            Category::Engagement | Category::Improvement => Priority::High,
            Category::Differentiation | Category::Assessment => Priority::Medium,
            _ => Priority::Low,
        }
    }

    /// Human-readable label used in legends
    pub fn display_name(&self) -> &str {
        match self {
            Category::Engagement => "Student Engagement",
            Category::Differentiation => "Differentiation Strategies",
            Category::Assessment => "Assessment Methods",
            Category::Improvement => "Areas for Improvement",
            Category::Strength => "Pedagogical Strengths",
            Category::Resource => "Resources & Materials",
            Category::Extension => "Extension Activities",
            Category::Cultural => "Cultural Considerations",
            Category::Custom(key) => key,
        }
    }

    /// Map a free-form section title (English or Spanish) to a category.
    ///
    /// With `custom_theme` set, titles map to the numbered `categoryN` keys.
    /// Unrecognized titles fall back to `strength` (or `category1`).
    pub fn from_section_title(title: &str, custom_theme: bool) -> Category {
        let lower = title.to_lowercase();
        let has = |terms: &[&str]| terms.iter().any(|t| lower.contains(t));

        if has(&["must-do", "must do"]) {
            return Category::Custom("category1".into());
        }
        if has(&["skip", "omit", "can be skipped"]) {
            return Category::Custom("category2".into());
        }

        if custom_theme {
            let key = if has(&["engagement", "participation", "student"]) {
                "category3"
            } else if has(&["strategy", "teaching", "method"]) {
                "category4"
            } else if has(&["assessment", "evaluation"]) {
                "category5"
            } else if has(&["resource", "material"]) {
                "category6"
            } else if has(&["extension", "enrich"]) {
                "category7"
            } else if has(&["cultural", "linguistic"]) {
                "category8"
            } else {
                "category1"
            };
            return Category::Custom(key.into());
        }

        if has(&["engagement", "participation", "student"]) {
            Category::Engagement
        } else if has(&["differentiation", "differentiated", "accommodate"]) {
            Category::Differentiation
        } else if has(&["assessment", "evaluation", "evaluate"]) {
            Category::Assessment
        } else if has(&["improvement", "enhance"]) {
            Category::Improvement
        } else if has(&["strength", "effective"]) {
            Category::Strength
        } else if has(&["resource", "materials", "optimization"]) {
            Category::Resource
        } else if has(&["extension", "activities", "deepen"]) {
            Category::Extension
        } else if has(&["cultural", "linguistic", "language"]) {
            Category::Cultural
        } else if has(&["participación", "estudiantes", "oportunidades"]) {
            Category::Engagement
        } else if has(&["diferenciación", "estrategias"]) {
            Category::Differentiation
        } else if has(&["evaluación", "sugerencias"]) {
            Category::Assessment
        } else if has(&["mejora", "áreas"]) {
            Category::Improvement
        } else if has(&["fortalezas", "pedagógicas"]) {
            Category::Strength
        } else if has(&["recursos", "optimización", "materiales"]) {
            Category::Resource
        } else if has(&["extensión", "actividades"]) {
            Category::Extension
        } else if has(&["culturales", "lingüísticas", "consideraciones"]) {
            Category::Cultural
        } else {
            Category::Strength
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl From<String> for Category {
    fn from(key: String) -> Self {
        Category::from_key(&key)
    }
}

impl From<Category> for String {
    fn from(c: Category) -> Self {
        c.key().to_string()
    }
}

/// Visual priority of an insight. The numeric value doubles as border width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High = 1,
    Medium = 2,
    Low = 3,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::High, Priority::Medium, Priority::Low];

    pub fn number(&self) -> u8 {
        *self as u8
    }

    /// Priority of the n-th (zero-based) category of a custom taxonomy
    pub fn for_custom_position(index: usize) -> Priority {
        match index {
            0 | 1 => Priority::High,
            2..=4 => Priority::Medium,
            _ => Priority::Low,
        }
    }
}

/// A short AI-derived recommendation tagged with category and priority
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub text: String,
    pub category: Category,
    pub priority: Priority,
}

/// Insights of one category, in extraction order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryInsights {
    pub category: Category,
    pub points: Vec<String>,
}

/// Categorizer output: three priority buckets of ordered category lists
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategorizedInsights {
    pub high: Vec<CategoryInsights>,
    pub medium: Vec<CategoryInsights>,
    pub low: Vec<CategoryInsights>,
}

impl CategorizedInsights {
    pub fn bucket(&self, priority: Priority) -> &[CategoryInsights] {
        match priority {
            Priority::High => &self.high,
            Priority::Medium => &self.medium,
            Priority::Low => &self.low,
        }
    }

    pub fn bucket_mut(&mut self, priority: Priority) -> &mut Vec<CategoryInsights> {
        match priority {
            Priority::High => &mut self.high,
            Priority::Medium => &mut self.medium,
            Priority::Low => &mut self.low,
        }
    }

    /// Points recorded for a category, if the category is part of the taxonomy
    pub fn points(&self, category: &Category) -> Option<&[String]> {
        Priority::ALL
            .iter()
            .flat_map(|p| self.bucket(*p).iter())
            .find(|entry| &entry.category == category)
            .map(|entry| entry.points.as_slice())
    }

    /// High first, then medium, then low; category order preserved inside each bucket
    pub fn flatten(&self) -> Vec<Insight> {
        let mut out = Vec::new();
        for priority in Priority::ALL {
            for entry in self.bucket(priority) {
                for point in &entry.points {
                    out.push(Insight {
                        text: point.clone(),
                        category: entry.category.clone(),
                        priority,
                    });
                }
            }
        }
        out
    }

    pub fn total(&self) -> usize {
        Priority::ALL
            .iter()
            .flat_map(|p| self.bucket(*p).iter())
            .map(|entry| entry.points.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Translucent marker over existing page text. Never alters the text itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentHighlight {
    pub bbox: Rect,
    pub color: Rgb,
    pub category: Category,
}

/// Polyline approximation of a curved connector plus its arrowhead
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connector {
    pub points: Vec<(f64, f64)>,
    pub arrow: [(f64, f64); 3],
}

impl Connector {
    pub fn segment_count(&self) -> usize {
        self.points.len().saturating_sub(1)
    }

    pub fn start(&self) -> Option<(f64, f64)> {
        self.points.first().copied()
    }

    pub fn end(&self) -> Option<(f64, f64)> {
        self.points.last().copied()
    }
}

/// A positioned annotation box on one page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub text: String,
    pub category: Category,
    pub priority: Priority,
    pub color: Rgb,
    pub page_index: usize,
    /// Font size the text was wrapped at during planning
    pub font_size: f64,
    /// White-space region the box was placed in
    pub region: Rect,
    #[serde(default)]
    pub target_content_area: Option<Rect>,
    #[serde(default)]
    pub related_highlights: Vec<ContentHighlight>,
    #[serde(default)]
    pub connector: Option<Connector>,
    /// Lesson section the insight points at, when one was found on the page
    #[serde(default)]
    pub relevance: Option<SectionKind>,
}

impl AnnotationBox {
    pub fn rect(&self) -> Rect {
        Rect::from_xywh(self.x, self.y, self.width, self.height)
    }

    pub fn relevance_label(&self) -> String {
        match self.relevance {
            Some(kind) => format!("Related to {} section", kind.as_str()),
            None => "General insight".to_string(),
        }
    }
}
