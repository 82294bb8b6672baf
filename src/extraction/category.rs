//! Keyword-based category inference for playlists and videos.

/// Category used when no keyword matches.
pub const DEFAULT_CATEGORY: &str = "general";

/// Ordered category keywords. The first category with any matching keyword
/// wins, so reordering this table changes the knowledge base.
pub const CATEGORY_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "winter_survival",
        &["winter", "cold", "snow", "ice", "freeze", "survival", "shelter"],
    ),
    (
        "building",
        &["build", "cabin", "construction", "sauna", "house", "shed"],
    ),
    (
        "fishing",
        &["fish", "fishing", "catch", "salmon", "trout", "halibut"],
    ),
    ("camping", &["camp", "camping", "tent", "outdoor"]),
    ("cooking", &["cook", "recipe", "food", "meal", "eat"]),
    ("gear", &["gear", "equipment", "review", "tool"]),
    ("alaska", &["alaska", "wild", "wilderness", "adventure"]),
    ("family", &["family", "kids", "boys"]),
];

/// Map a title (and optional description) to a category slug.
///
/// Matching is case-insensitive substring search over
/// `"{title} {description}"`.
pub fn infer_category(title: &str, description: &str) -> &'static str {
    let text = format!("{} {}", title, description).to_lowercase();

    CATEGORY_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|kw| text.contains(kw)))
        .map(|(category, _)| *category)
        .unwrap_or(DEFAULT_CATEGORY)
}

/// Human-readable name for a slug: `life_lessons` → `Life Lessons`.
pub fn display_name(slug: &str) -> String {
    slug.split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
