//! Slug derivation for categories and heading anchors.
//!
//! ## Category slugs
//!
//! Category slugs come from the category title in front matter:
//! lowercase, spaces become dashes, surrounding whitespace is trimmed.
//! Nothing else is rewritten, so `"Gardening Tips"` and `"GarDENing TIPS"`
//! both map to `gardening-tips`. The processor treats that as a collision
//! rather than merging the two.
//!
//! A slug must survive as a single URL path segment: it cannot be empty,
//! contain `/`, or be `.` or `..`. Anything else is percent-encoded when
//! routes are built.
//!
//! ## Heading anchors
//!
//! Heading ids are stricter since they land in fragment URLs: anything that
//! is not alphanumeric becomes a dash, dash runs collapse, and leading or
//! trailing dashes are dropped.

/// Build a category slug from a title.
///
/// - `"Golang"` → `"golang"`
/// - `"Gardening Tips"` → `"gardening-tips"`
/// - `"  Rust  "` → `"rust"`
pub fn slugify(title: &str) -> String {
    title.trim().to_lowercase().replace(' ', "-")
}

/// Whether a slug can stand as one path segment of a route.
pub fn is_routable(slug: &str) -> bool {
    !slug.is_empty() && !slug.contains('/') && slug != "." && slug != ".."
}

/// Build a fragment id from heading text.
///
/// - `"Getting Started"` → `"getting-started"`
/// - `"What's new?"` → `"what-s-new"`
/// - `"!!!"` → `""`
pub fn anchor_id(text: &str) -> String {
    let mut id = String::with_capacity(text.len());
    let mut prev_dash = true;
    for c in text.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            id.push(c);
            prev_dash = false;
        } else if !prev_dash {
            id.push('-');
            prev_dash = true;
        }
    }
    id.trim_end_matches('-').to_string()
}
