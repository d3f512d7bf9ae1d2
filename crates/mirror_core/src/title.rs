use std::sync::LazyLock;

use regex::Regex;

/// Slug used when a title has no alphanumeric characters at all.
pub const DEFAULT_SLUG: &str = "game";

static NOISE_WORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:Direct|Download|Free|Link|Game)\b").expect("static noise-word pattern")
});

static WHITESPACE_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("static whitespace pattern"));

static NON_ALNUM_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("static slug pattern"));

/// Strip listing noise words ("Direct", "Download", "Free", "Link", "Game",
/// any case, whole words only) and collapse whitespace.
///
/// Idempotent: `normalize_title(normalize_title(t)) == normalize_title(t)`.
pub fn normalize_title(title: &str) -> String {
    if title.is_empty() {
        return String::new();
    }
    let stripped = NOISE_WORDS.replace_all(title, "");
    WHITESPACE_RUNS
        .replace_all(&stripped, " ")
        .trim()
        .to_string()
}

/// Lowercase, collapse non-alphanumeric runs to `-`, trim dashes.
/// Never empty: falls back to [`DEFAULT_SLUG`].
pub fn slugify(text: &str) -> String {
    let lowered = text.to_lowercase();
    let dashed = NON_ALNUM_RUNS.replace_all(&lowered, "-");
    let trimmed = dashed.trim_matches('-');
    if trimmed.is_empty() {
        DEFAULT_SLUG.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Store key for a catalog title: the slug of its normalized form, so that
/// "Foo Direct Download" and "Foo" share one record file.
pub fn record_slug(title: &str) -> String {
    slugify(&normalize_title(title))
}
