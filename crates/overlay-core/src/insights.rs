//! Insight extraction from free-form annotation text
//!
//! The annotation text is markdown-like: category headings (`### 1. **Student
//! Engagement**`, `## Evaluación`) followed by bullet lists. The categorizer
//! collects short, cleaned bullet points per category and tags each category
//! with a priority.

use lazy_static::lazy_static;
use overlay_types::{CategorizedInsights, Category, CategoryInsights, Priority};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

lazy_static! {
    /// `-`, `*`, `•` or `+` followed by whitespace
    static ref SYMBOL_BULLET: Regex = Regex::new(r"^[-*•+]\s+").unwrap();

    /// `1.` or `1)` followed by whitespace
    static ref ORDINAL_BULLET: Regex = Regex::new(r"^\d+[.)]\s+").unwrap();

    /// Leading `#` run and optional ordinal of a heading
    static ref HEADING_PREFIX: Regex = Regex::new(r"^#*\s*(?:\d+[.)]\s*)?").unwrap();
}

/// Points kept per category
pub const MAX_POINTS_PER_CATEGORY: usize = 3;
/// Longest insight kept, in characters
pub const MAX_INSIGHT_CHARS: usize = 240;
/// Text after a colon is used when it is at most this long
const COLON_DETAIL_MAX: usize = 60;
/// Cleaned points shorter than this are dropped
const MIN_POINT_CHARS: usize = 10;
/// Plain sentences longer than this count as insights
const STANDALONE_MIN_CHARS: usize = 20;

/// One category of a user-defined taxonomy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomCategory {
    /// Palette key, e.g. `category1`
    pub key: String,
    /// Heading text the AI uses for the category, e.g. "Must-do activities"
    pub definition: String,
}

impl CustomCategory {
    pub fn new(key: impl Into<String>, definition: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            definition: definition.into(),
        }
    }
}

/// Category set used to read the annotation text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Taxonomy {
    /// The eight fixed categories, matched by English and Spanish synonyms
    #[default]
    Default,
    /// Ordered user-defined categories; order determines priority
    Custom(Vec<CustomCategory>),
}

impl Taxonomy {
    pub fn is_custom(&self) -> bool {
        matches!(self, Taxonomy::Custom(_))
    }

    /// Categories in iteration order with their priorities
    pub fn categories(&self) -> Vec<(Category, Priority)> {
        match self {
            Taxonomy::Default => Category::FIXED
                .iter()
                .map(|c| (c.clone(), c.default_priority()))
                .collect(),
            Taxonomy::Custom(custom) => custom
                .iter()
                .enumerate()
                .map(|(i, c)| (Category::from_key(&c.key), Priority::for_custom_position(i)))
                .collect(),
        }
    }
}

/// Heading synonyms of a fixed category, lowercase
fn synonyms(category: &Category) -> &'static [&'static str] {
    match category {
        Category::Engagement => &[
            "student engagement",
            "engagement",
            "participación",
            "participacion",
        ],
        Category::Differentiation => &["differentiation", "diferenciación", "diferenciacion"],
        Category::Assessment => &["assessment", "evaluación", "evaluacion"],
        Category::Improvement => &["improvement", "mejora"],
        Category::Strength => &["strength", "fortaleza"],
        Category::Resource => &["resource", "recursos"],
        Category::Extension => &["extension", "extensión"],
        Category::Cultural => &["cultural"],
        Category::Custom(_) => &[],
    }
}

/// Splits annotation text into prioritized, per-category insights
#[derive(Debug, Clone, Default)]
pub struct InsightCategorizer;

impl InsightCategorizer {
    pub fn new() -> Self {
        Self
    }

    /// Categorize `text` under `taxonomy`.
    ///
    /// Every taxonomy category appears in its priority bucket, with an empty
    /// list when the text has no section for it.
    pub fn categorize(&self, text: &str, taxonomy: &Taxonomy) -> CategorizedInsights {
        let lines: Vec<&str> = text.lines().map(str::trim).collect();
        let mut result = CategorizedInsights::default();

        for (index, (category, priority)) in taxonomy.categories().into_iter().enumerate() {
            let points = match taxonomy {
                Taxonomy::Default => {
                    let words = synonyms(&category);
                    extract_points(&lines, |heading| {
                        let lower = heading.to_lowercase();
                        words.iter().any(|w| lower.contains(w))
                    })
                }
                Taxonomy::Custom(custom) => {
                    let definition = custom[index].definition.to_lowercase();
                    extract_points(&lines, |heading| custom_heading_matches(heading, &definition))
                }
            };

            debug!(category = %category, points = points.len(), "Categorized insights");
            result
                .bucket_mut(priority)
                .push(CategoryInsights { category, points });
        }

        result
    }
}

/// Collect cleaned points from every section whose heading satisfies `opens`
fn extract_points<F>(lines: &[&str], opens: F) -> Vec<String>
where
    F: Fn(&str) -> bool,
{
    let mut points = Vec::new();
    let mut in_section = false;

    for line in lines {
        if points.len() >= MAX_POINTS_PER_CATEGORY {
            break;
        }
        if is_heading(line) {
            in_section = opens(line);
            continue;
        }
        if !in_section || line.is_empty() {
            continue;
        }
        if let Some(point) = point_from_line(line) {
            points.push(point);
        }
    }

    points
}

fn is_symbol_bullet(line: &str) -> bool {
    SYMBOL_BULLET.is_match(line)
}

fn is_bullet(line: &str) -> bool {
    is_symbol_bullet(line) || ORDINAL_BULLET.is_match(line)
}

/// `#` headings, and non-bullet lines carrying `**` emphasis
/// (`**Assessment**`, `3. **Family connection**`)
pub fn is_heading(line: &str) -> bool {
    let line = line.trim();
    line.starts_with('#') || (line.contains("**") && !is_symbol_bullet(line))
}

/// Remove markdown emphasis, inline code and leading `#` from a line
pub fn strip_decoration(line: &str) -> String {
    line.replace("**", "")
        .replace("__", "")
        .replace('`', "")
        .trim_start_matches('#')
        .trim()
        .to_string()
}

/// Heading text without `#` prefix, ordinal and emphasis
pub fn heading_title(line: &str) -> String {
    let plain = line.trim().replace("**", "").replace("__", "");
    HEADING_PREFIX.replace(&plain, "").trim().to_string()
}

fn custom_heading_matches(heading: &str, definition_lower: &str) -> bool {
    if definition_lower.is_empty() {
        return false;
    }
    let lower = heading.to_lowercase();
    lower.contains(&format!("**{}**", definition_lower))
        || heading_title(heading).to_lowercase() == definition_lower
}

/// Turn one section line into an insight, if it carries one
fn point_from_line(line: &str) -> Option<String> {
    let candidate = if is_bullet(line) {
        let without_bullet = SYMBOL_BULLET.replace(line, "");
        let without_bullet = ORDINAL_BULLET.replace(&without_bullet, "");
        strip_decoration(&without_bullet)
    } else if is_standalone_sentence(line) {
        strip_decoration(line)
    } else {
        return None;
    };

    let detail = colon_detail(&candidate);
    if detail.chars().count() < MIN_POINT_CHARS {
        return None;
    }
    Some(truncate_on_word(detail, MAX_INSIGHT_CHARS))
}

fn is_standalone_sentence(line: &str) -> bool {
    line.chars().count() > STANDALONE_MIN_CHARS
        && !line.ends_with(':')
        && !line.contains('*')
        && !line.contains("__")
}

/// `"Label: short detail"` yields the detail; a long or empty detail yields the label
fn colon_detail(line: &str) -> &str {
    match line.split_once(':') {
        Some((before, after)) => {
            let after = after.trim();
            if !after.is_empty() && after.chars().count() <= COLON_DETAIL_MAX {
                after
            } else {
                before.trim()
            }
        }
        None => line.trim(),
    }
}

/// Cut to at most `max` characters, backing up to the last word boundary
fn truncate_on_word(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max).collect();
    let end = match cut.rfind(char::is_whitespace) {
        Some(pos) if pos > 0 => pos,
        _ => cut.len(),
    };
    cut[..end].trim_end().to_string()
}

/// A heading and the non-empty lines under it
#[derive(Debug, Clone, PartialEq)]
pub struct TextSection {
    pub title: String,
    pub category: Category,
    pub lines: Vec<String>,
}

/// Split annotation text at its headings.
///
/// Lines before the first heading are ignored. Each section's category comes
/// from its title; see [`Category::from_section_title`].
pub fn split_sections(text: &str, custom_theme: bool) -> Vec<TextSection> {
    let mut sections: Vec<TextSection> = Vec::new();

    for line in text.lines().map(str::trim) {
        if is_heading(line) {
            let title = heading_title(line);
            if title.is_empty() {
                continue;
            }
            sections.push(TextSection {
                category: Category::from_section_title(&title, custom_theme),
                title,
                lines: Vec::new(),
            });
        } else if !line.is_empty() {
            if let Some(current) = sections.last_mut() {
                current.lines.push(line.to_string());
            }
        }
    }

    sections
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const FEEDBACK: &str = "\
## Lesson Plan Feedback

### 1. **Student Engagement**
- Use a movement game during the phonics warm-up
- **Partner talk:** Pair students for oral rehearsal
- Short

### 2. **Areas for Improvement**
- Add explicit timing for each activity segment
Consider adding a closing reflection to consolidate learning.

### 3. **Differentiation Strategies**

### 4. **Assessment**
* Use exit tickets to check letter-sound knowledge
1. Observe students during partner reading
";

    fn points<'a>(insights: &'a CategorizedInsights, category: &Category) -> &'a [String] {
        insights.points(category).unwrap()
    }

    #[test]
    fn test_default_taxonomy_extracts_bullets() {
        let insights = InsightCategorizer::new().categorize(FEEDBACK, &Taxonomy::Default);
        assert_eq!(
            points(&insights, &Category::Engagement),
            &[
                "Use a movement game during the phonics warm-up".to_string(),
                "Pair students for oral rehearsal".to_string(),
            ]
        );
        assert_eq!(
            points(&insights, &Category::Assessment),
            &[
                "Use exit tickets to check letter-sound knowledge".to_string(),
                "Observe students during partner reading".to_string(),
            ]
        );
    }

    #[test]
    fn test_standalone_sentence_is_an_insight() {
        let insights = InsightCategorizer::new().categorize(FEEDBACK, &Taxonomy::Default);
        assert_eq!(
            points(&insights, &Category::Improvement),
            &[
                "Add explicit timing for each activity segment".to_string(),
                "Consider adding a closing reflection to consolidate learning.".to_string(),
            ]
        );
    }

    #[test]
    fn test_empty_section_yields_empty_list() {
        let insights = InsightCategorizer::new().categorize(FEEDBACK, &Taxonomy::Default);
        assert_eq!(points(&insights, &Category::Differentiation), &[] as &[String]);
        // categories with no heading at all are still present
        assert_eq!(points(&insights, &Category::Cultural), &[] as &[String]);
    }

    #[test]
    fn test_buckets_follow_fixed_priorities() {
        let insights = InsightCategorizer::new().categorize(FEEDBACK, &Taxonomy::Default);
        let keys = |bucket: &[CategoryInsights]| -> Vec<String> {
            bucket.iter().map(|c| c.category.key().to_string()).collect()
        };
        assert_eq!(keys(&insights.high), vec!["engagement", "improvement"]);
        assert_eq!(keys(&insights.medium), vec!["differentiation", "assessment"]);
        assert_eq!(
            keys(&insights.low),
            vec!["strength", "resource", "extension", "cultural"]
        );
    }

    #[test]
    fn test_spanish_headings() {
        let text = "## Evaluación\n- Usar boletos de salida al final de la clase\n## Recursos\n- Preparar tarjetas con imágenes grandes";
        let insights = InsightCategorizer::new().categorize(text, &Taxonomy::Default);
        assert_eq!(
            points(&insights, &Category::Assessment),
            &["Usar boletos de salida al final de la clase".to_string()]
        );
        assert_eq!(
            points(&insights, &Category::Resource),
            &["Preparar tarjetas con imágenes grandes".to_string()]
        );
    }

    #[test]
    fn test_points_are_capped_per_category() {
        let text = "## Student Engagement\n\
                    - First engagement idea here\n\
                    - Second engagement idea here\n\
                    - Third engagement idea here\n\
                    - Fourth engagement idea here\n";
        let insights = InsightCategorizer::new().categorize(text, &Taxonomy::Default);
        assert_eq!(points(&insights, &Category::Engagement).len(), 3);
    }

    #[test]
    fn test_long_colon_detail_keeps_label() {
        let text = format!(
            "## Differentiation\n- Flexible grouping by reading level: {}\n",
            "group students by their most recent running record and rotate weekly"
        );
        let insights = InsightCategorizer::new().categorize(&text, &Taxonomy::Default);
        assert_eq!(
            points(&insights, &Category::Differentiation),
            &["Flexible grouping by reading level".to_string()]
        );
    }

    #[test]
    fn test_long_point_is_cut_on_word_boundary() {
        let long = "practice ".repeat(40);
        let text = format!("## Extension\n- {}\n", long);
        let insights = InsightCategorizer::new().categorize(&text, &Taxonomy::Default);
        let point = &points(&insights, &Category::Extension)[0];
        assert!(point.chars().count() <= MAX_INSIGHT_CHARS);
        assert!(point.ends_with("practice"));
    }

    #[test]
    fn test_custom_taxonomy_priorities_by_position() {
        let taxonomy = Taxonomy::Custom(vec![
            CustomCategory::new("category1", "Must-do activities"),
            CustomCategory::new("category2", "Can be skipped"),
            CustomCategory::new("category3", "Family connection"),
        ]);
        let text = "\
1. **Must-do activities**
- Keep the phonics warm-up and partner reading
2. **can be skipped**
- The second worksheet repeats the first one
## 3. Family connection
- Send the letter cards home for practice
";
        let insights = InsightCategorizer::new().categorize(text, &taxonomy);
        let keys: Vec<&str> = insights.high.iter().map(|c| c.category.key()).collect();
        assert_eq!(keys, vec!["category1", "category2"]);
        assert_eq!(insights.medium[0].category.key(), "category3");
        assert_eq!(
            insights.high[0].points,
            vec!["Keep the phonics warm-up and partner reading".to_string()]
        );
        assert_eq!(
            insights.high[1].points,
            vec!["The second worksheet repeats the first one".to_string()]
        );
        assert_eq!(
            insights.medium[0].points,
            vec!["Send the letter cards home for practice".to_string()]
        );
    }

    #[test]
    fn test_bold_bullet_is_not_a_heading() {
        assert!(!is_heading("- **Partner talk:** Pair students"));
        assert!(is_heading("**Assessment**"));
        assert!(is_heading("3. **Family connection**"));
        assert!(is_heading("## Recursos"));
        assert!(!is_heading("1. Observe students"));
    }

    #[test]
    fn test_split_sections() {
        let sections = split_sections(FEEDBACK, false);
        let titles: Vec<&str> = sections.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(
            titles,
            vec![
                "Lesson Plan Feedback",
                "Student Engagement",
                "Areas for Improvement",
                "Differentiation Strategies",
                "Assessment"
            ]
        );
        assert_eq!(sections[1].category, Category::Engagement);
        assert_eq!(sections[1].lines.len(), 3);
        assert!(sections[3].lines.is_empty());
    }

    #[test]
    fn test_no_headings_yields_all_empty() {
        let insights =
            InsightCategorizer::new().categorize("Just a paragraph of prose.", &Taxonomy::Default);
        assert!(insights.is_empty());
        assert_eq!(insights.high.len() + insights.medium.len() + insights.low.len(), 8);
    }
}
