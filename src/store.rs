//! Content store: the indexed, read-only snapshot of a processed catalog.
//!
//! [`Store::build`] takes the processor's [`Catalog`] and derives every view
//! the renderers need in one pass. Entries live in a flat arena; all
//! secondary views (`posts`, `pages`, per-category lists, latest, featured,
//! sections) hold [`EntryId`] indices into it, never copies.
//!
//! ```text
//! arena:       [a, b, c, d, e]          (catalog order)
//! posts:       [3, 0, 4, 1]             (latest timestamp, newest first)
//! by_category: golang → [3, 4]          (global order, filtered)
//!              python → [0, 1]
//! latest:      posts[..9]
//! featured:    posts.filter(featured)[..3]
//! ```
//!
//! ## Ordering
//!
//! Posts are stable-sorted by [`Entry::latest_timestamp`], newest first.
//! Ties keep catalog order, and catalog order is processing order, so two
//! builds from the same input produce identical views.
//!
//! ## Related posts
//!
//! Related posts come from the entry's own category. A category must hold
//! strictly more than `limits.related` posts before anything is
//! recommended. The window starts at the next newer post and walks
//! forward in time, wrapping from the newest post back to the oldest:
//!
//! ```text
//! golang (newest first): [jan5, jan4, jan3, jan2, jan1], related = 3
//! related(jan3) = [jan4, jan5, jan1]
//! ```
//!
//! Every post's offset into its category list is stored on the entry as
//! `category_index` at build time, so lookups are O(limit).
//!
//! ## Sections
//!
//! Each category with posts is a homepage section keyed by its slug. Three
//! pseudo-sections ([`SECTION_LATEST`], [`SECTION_FEATURED`],
//! [`SECTION_ALL`]) point at the precomputed latest, featured and full
//! post lists. A category whose slug equals one of those names keeps its
//! route but gets no section; the pseudo-section wins.

use crate::process::Catalog;
use crate::types::{Category, Entry, EntryId, SECTION_ALL, SECTION_FEATURED, SECTION_LATEST};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("section not found [{0}]")]
    SectionNotFound(String),
}

/// Cut-off sizes for the derived post lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Limits {
    /// Posts on the latest list.
    pub latest: usize,
    /// Posts on the latest list shown beside a single entry.
    pub latest_small: usize,
    /// Featured posts.
    pub featured: usize,
    /// Related posts, and the category size that must be exceeded first.
    pub related: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            latest: 9,
            latest_small: 4,
            featured: 3,
            related: 6,
        }
    }
}

/// Where a section's entries come from.
#[derive(Debug, Clone)]
enum SectionSource {
    Latest,
    Featured,
    All,
    Category(String),
}

#[derive(Debug, Clone)]
struct Section {
    category: Category,
    source: SectionSource,
}

/// A resolved homepage section.
#[derive(Debug, Clone, Copy)]
pub struct SectionRef<'a> {
    pub slug: &'a str,
    /// Real category, or a pseudo-category for the reserved sections.
    pub category: &'a Category,
    pub entries: Entries<'a>,
}

/// An ordered view over entries in the store.
#[derive(Debug, Clone, Copy)]
pub struct Entries<'a> {
    arena: &'a [Entry],
    ids: &'a [EntryId],
}

impl<'a> Entries<'a> {
    pub fn iter(&self) -> EntriesIter<'a> {
        EntriesIter {
            arena: self.arena,
            ids: self.ids.iter(),
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&'a Entry> {
        self.ids.get(index).map(|&id| &self.arena[id])
    }
}

impl<'a> IntoIterator for Entries<'a> {
    type Item = &'a Entry;
    type IntoIter = EntriesIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub struct EntriesIter<'a> {
    arena: &'a [Entry],
    ids: std::slice::Iter<'a, EntryId>,
}

impl<'a> Iterator for EntriesIter<'a> {
    type Item = &'a Entry;

    fn next(&mut self) -> Option<Self::Item> {
        self.ids.next().map(|&id| &self.arena[id])
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.ids.size_hint()
    }
}

impl DoubleEndedIterator for EntriesIter<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.ids.next_back().map(|&id| &self.arena[id])
    }
}

impl ExactSizeIterator for EntriesIter<'_> {}

/// One immutable, fully indexed snapshot of the content.
#[derive(Debug)]
pub struct Store {
    arena: Vec<Entry>,
    by_slug: HashMap<String, EntryId>,
    posts: Vec<EntryId>,
    pages: Vec<EntryId>,
    by_category: IndexMap<String, Vec<EntryId>>,
    categories: IndexMap<String, Category>,
    latest: Vec<EntryId>,
    latest_small: Vec<EntryId>,
    featured: Vec<EntryId>,
    sections: IndexMap<String, Section>,
    limits: Limits,
}

impl Store {
    /// Index a catalog. Never fails: the catalog is already validated.
    pub fn build(catalog: Catalog, limits: Limits) -> Self {
        let Catalog {
            entries,
            categories,
        } = catalog;
        let mut arena: Vec<Entry> = entries.into_values().collect();

        let by_slug = arena
            .iter()
            .enumerate()
            .map(|(id, e)| (e.slug.clone(), id))
            .collect();

        let (mut posts, pages): (Vec<EntryId>, Vec<EntryId>) =
            (0..arena.len()).partition(|&id| arena[id].is_post());
        // sort_by_key is stable: equal timestamps keep catalog order.
        posts.sort_by_key(|&id| Reverse(arena[id].latest_timestamp()));

        let mut by_category: IndexMap<String, Vec<EntryId>> = IndexMap::new();
        for &id in &posts {
            let Some(cat) = &arena[id].category else {
                continue;
            };
            let list = by_category.entry(cat.slug.clone()).or_default();
            list.push(id);
            let offset = list.len() - 1;
            arena[id].category_index = Some(offset);
        }

        let latest: Vec<EntryId> = posts.iter().copied().take(limits.latest).collect();
        let latest_small: Vec<EntryId> = latest.iter().copied().take(limits.latest_small).collect();
        let featured: Vec<EntryId> = posts
            .iter()
            .copied()
            .filter(|&id| arena[id].featured)
            .take(limits.featured)
            .collect();

        let mut sections = IndexMap::with_capacity(by_category.len() + 3);
        sections.insert(
            SECTION_LATEST.to_string(),
            Section {
                category: Category::pseudo("Latest Posts"),
                source: SectionSource::Latest,
            },
        );
        sections.insert(
            SECTION_FEATURED.to_string(),
            Section {
                category: Category::pseudo("Featured Posts"),
                source: SectionSource::Featured,
            },
        );
        sections.insert(
            SECTION_ALL.to_string(),
            Section {
                category: Category::pseudo(""),
                source: SectionSource::All,
            },
        );
        for slug in by_category.keys() {
            if matches!(slug.as_str(), SECTION_LATEST | SECTION_FEATURED | SECTION_ALL) {
                tracing::warn!(category = %slug, "category slug is a reserved section name; section skipped");
                continue;
            }
            let category = categories.get(slug).cloned().unwrap_or_else(|| Category {
                slug: slug.clone(),
                title: slug.clone(),
            });
            sections.insert(
                slug.clone(),
                Section {
                    category,
                    source: SectionSource::Category(slug.clone()),
                },
            );
        }

        Self {
            arena,
            by_slug,
            posts,
            pages,
            by_category,
            categories,
            latest,
            latest_small,
            featured,
            sections,
            limits,
        }
    }

    fn view<'a>(&'a self, ids: &'a [EntryId]) -> Entries<'a> {
        Entries {
            arena: &self.arena,
            ids,
        }
    }

    pub fn limits(&self) -> Limits {
        self.limits
    }

    /// Every post, newest first.
    pub fn all_posts(&self) -> Entries<'_> {
        self.view(&self.posts)
    }

    /// Every standalone page, in catalog order.
    pub fn all_pages(&self) -> Entries<'_> {
        self.view(&self.pages)
    }

    /// Posts in a category, newest first. `None` for unknown slugs.
    pub fn by_category(&self, slug: &str) -> Option<Entries<'_>> {
        self.by_category.get(slug).map(|ids| self.view(ids))
    }

    pub fn by_slug(&self, slug: &str) -> Option<&Entry> {
        self.by_slug.get(slug).map(|&id| &self.arena[id])
    }

    pub fn latest(&self) -> Entries<'_> {
        self.view(&self.latest)
    }

    pub fn latest_small(&self) -> Entries<'_> {
        self.view(&self.latest_small)
    }

    pub fn featured(&self) -> Entries<'_> {
        self.view(&self.featured)
    }

    /// Posts to recommend alongside `entry`. Empty for pages and for
    /// categories that do not exceed the related limit.
    ///
    /// The window walks toward newer posts, which is backwards through the
    /// newest-first category list, and wraps from the newest post to the
    /// oldest. For the newest post the window therefore starts at the
    /// oldest one.
    pub fn related(&self, entry: &Entry) -> Vec<&Entry> {
        if entry.is_page() {
            return Vec::new();
        }
        let Some(list) = entry
            .category
            .as_ref()
            .and_then(|cat| self.by_category.get(&cat.slug))
        else {
            return Vec::new();
        };

        let limit = self.limits.related;
        let len = list.len();
        if len <= limit {
            return Vec::new();
        }

        let own = entry
            .category_index
            .filter(|&i| list.get(i).is_some_and(|&id| self.arena[id].slug == entry.slug))
            .or_else(|| list.iter().position(|&id| self.arena[id].slug == entry.slug));
        let Some(own) = own else {
            return Vec::new();
        };

        // Lists are newest first, so stepping back one index is one step forward in time.
        (1..=limit)
            .map(|step| &self.arena[list[(own + len - step % len) % len]])
            .collect()
    }

    /// Every section, pseudo-sections first, then categories in post order.
    pub fn sections(&self) -> IndexMap<&str, SectionRef<'_>> {
        self.sections
            .iter()
            .map(|(slug, section)| (slug.as_str(), self.section_ref(slug, section)))
            .collect()
    }

    pub fn section(&self, slug: &str) -> Option<SectionRef<'_>> {
        self.sections
            .get_key_value(slug)
            .map(|(slug, section)| self.section_ref(slug, section))
    }

    fn section_ref<'a>(&'a self, slug: &'a str, section: &'a Section) -> SectionRef<'a> {
        let ids: &[EntryId] = match &section.source {
            SectionSource::Latest => &self.latest,
            SectionSource::Featured => &self.featured,
            SectionSource::All => &self.posts,
            SectionSource::Category(cat) => self.by_category.get(cat).map(Vec::as_slice).unwrap_or_default(),
        };
        SectionRef {
            slug,
            category: &section.category,
            entries: self.view(ids),
        }
    }

    /// Resolve configured homepage slugs, failing on the first unknown one.
    pub fn resolve_homepage(&self, slugs: &[String]) -> Result<Vec<SectionRef<'_>>, StoreError> {
        slugs
            .iter()
            .map(|slug| {
                self.section(slug)
                    .ok_or_else(|| StoreError::SectionNotFound(slug.clone()))
            })
            .collect()
    }

    /// Every category, in the order it was first seen during processing.
    pub fn all_categories(&self) -> impl Iterator<Item = &Category> {
        self.categories.values()
    }

    pub fn category(&self, slug: &str) -> Option<&Category> {
        self.categories.get(slug)
    }
}
