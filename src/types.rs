//! Content entities shared by the processor, the store and the renderers.
//!
//! Entries are built once by [`crate::process`], moved into the
//! [`crate::store::Store`] arena and never mutated after indexing. Every
//! secondary view in the store refers to them by [`EntryId`].

use serde::Serialize;

/// Position of an entry in the store's arena.
pub type EntryId = usize;

/// Homepage section holding the latest posts.
pub const SECTION_LATEST: &str = "$latest";
/// Homepage section holding the featured posts.
pub const SECTION_FEATURED: &str = "$featured";
/// Homepage section holding every post.
pub const SECTION_ALL: &str = "$all";

/// Lead images are always served as fixed-size webp files.
pub const IMAGE_TYPE: &str = "webp";
pub const IMAGE_WIDTH: &str = "800";
pub const IMAGE_HEIGHT: &str = "450";

/// Whether an entry belongs to the chronological blog flow or stands alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Post,
    Page,
}

/// A date as both a display string (`January 2, 2006`) and a UNIX timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateStamp {
    pub display: String,
    pub timestamp: i64,
}

/// A post category. Two categories are the same iff slug and title match.
///
/// An empty slug marks a pseudo-category (homepage sections like "Latest Posts").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Category {
    pub slug: String,
    pub title: String,
}

impl Category {
    /// Build a pseudo-category: a titled grouping with no route of its own.
    pub fn pseudo(title: &str) -> Self {
        Self {
            slug: String::new(),
            title: title.to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.slug.is_empty()
    }

    /// URL path for the category listing, e.g. `/category/golang/`.
    /// The slug is percent-encoded, so `c#` routes to `/category/c%23/`.
    pub fn route(&self) -> String {
        format!("/category/{}/", urlencoding::encode(&self.slug))
    }
}

/// Lead image metadata for an entry or for the site itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeadImage {
    pub url: String,
    pub alt: String,
    pub kind: String,
    pub width: String,
    pub height: String,
}

impl LeadImage {
    /// A lead image with the site-wide fixed type and dimensions.
    pub fn new(url: impl Into<String>, alt: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            alt: alt.into(),
            kind: IMAGE_TYPE.to_string(),
            width: IMAGE_WIDTH.to_string(),
            height: IMAGE_HEIGHT.to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.url.is_empty()
    }
}

/// One processed content item: a blog post or a standalone page.
#[derive(Debug, Clone, Serialize)]
pub struct Entry {
    pub kind: EntryKind,
    pub featured: bool,
    /// Whether the lead image is shown on the entry page.
    pub show_lead: bool,
    pub slug: String,
    /// Meta title (`<title>`, og:title).
    pub title: String,
    /// Main on-page heading.
    pub heading: String,
    pub description: String,
    /// Always `Some` for posts, `None` for pages.
    pub category: Option<Category>,
    pub image: Option<LeadImage>,
    /// Rendered HTML body.
    pub body: String,
    pub pubdate: Option<DateStamp>,
    pub updated: Option<DateStamp>,
    /// Offset of this entry in its category's post list, set by the store.
    #[serde(skip)]
    pub category_index: Option<usize>,
}

impl Entry {
    pub fn is_page(&self) -> bool {
        self.kind == EntryKind::Page
    }

    pub fn is_post(&self) -> bool {
        self.kind == EntryKind::Post
    }

    /// The newer of the update and publish timestamps; 0 for undated entries.
    pub fn latest_timestamp(&self) -> i64 {
        let published = self.pubdate.as_ref().map_or(0, |d| d.timestamp);
        let updated = self.updated.as_ref().map_or(0, |d| d.timestamp);
        published.max(updated)
    }

    /// URL path for the entry, e.g. `/post-slug/`.
    pub fn route(&self) -> String {
        format!("/{}/", urlencoding::encode(&self.slug))
    }
}
