//! Shared test utilities for the quillpost test suite.
//!
//! Provides markdown source builders, entry constructors for store tests,
//! and lookup helpers that panic with the available keys on a miss.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let catalog = process_str(&[
//!     post_md("first", "Golang", "2024-01-01"),
//!     page_md("about"),
//! ]).unwrap();
//!
//! let store = store_from(vec![post("a", "Go", "2024-01-01")], Limits::default());
//! assert_eq!(slugs(store.latest()), vec!["a"]);
//! ```

use std::path::Path;
use tempfile::TempDir;

use crate::markdown::PulldownEngine;
use crate::metadata::parse_date;
use crate::naming::slugify;
use crate::process::{Catalog, ProcessError, Source, process_sources};
use crate::store::{Limits, Store};
use crate::types::{Category, Entry, EntryKind, LeadImage};

// =========================================================================
// Fixture setup
// =========================================================================

/// Copy `fixtures/content/` to a temp directory and return it.
///
/// Tests get an isolated copy they can mutate without affecting other tests
/// or the source fixtures.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/content");
    copy_dir_recursive(&fixtures, tmp.path()).unwrap();
    tmp
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            std::fs::create_dir_all(&dst_path)?;
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

// =========================================================================
// Markdown sources
// =========================================================================

/// A complete, valid post source.
pub fn post_md(slug: &str, category: &str, pubdate: &str) -> String {
    format!(
        "---\n\
         title: Title of {slug}\n\
         heading: Heading of {slug}\n\
         slug: {slug}\n\
         description: Description of {slug}\n\
         category: {category}\n\
         pubdate: {pubdate}\n\
         image_url: /media/{slug}.webp\n\
         image_alt: Alt of {slug}\n\
         ---\n\
         \n\
         Body of {slug}.\n"
    )
}

/// A complete, valid page source.
pub fn page_md(slug: &str) -> String {
    format!(
        "---\n\
         page: true\n\
         title: Title of {slug}\n\
         heading: Heading of {slug}\n\
         slug: {slug}\n\
         description: Description of {slug}\n\
         ---\n\
         \n\
         Body of {slug}.\n"
    )
}

/// Drop the front-matter line for `key`.
pub fn without_key(source: &str, key: &str) -> String {
    let prefix = format!("{key}:");
    source
        .lines()
        .filter(|line| !line.starts_with(&prefix))
        .map(|line| format!("{line}\n"))
        .collect()
}

/// Insert a front-matter line right after the opening fence.
pub fn with_line(source: &str, line: &str) -> String {
    match source.strip_prefix("---\n") {
        Some(rest) => format!("---\n{line}\n{rest}"),
        None => panic!("source has no front matter: {source:?}"),
    }
}

/// Run sources through the default engine, labelled `source-0`, `source-1`, ...
pub fn process_str(sources: &[String]) -> Result<Catalog, ProcessError> {
    let sources: Vec<Source> = sources
        .iter()
        .enumerate()
        .map(|(i, s)| Source {
            label: format!("source-{i}"),
            bytes: s.clone().into_bytes(),
        })
        .collect();
    process_sources(&PulldownEngine::default(), &sources)
}

/// Write `(file name, contents)` pairs into `dir`.
pub fn write_sources(dir: &Path, files: &[(&str, String)]) {
    std::fs::create_dir_all(dir).unwrap();
    for (name, contents) in files {
        std::fs::write(dir.join(name), contents).unwrap();
    }
}

// =========================================================================
// Entries built directly, bypassing markdown
// =========================================================================

/// A post in `category_title`, published on `pubdate` (`YYYY-MM-DD`).
pub fn post(slug: &str, category_title: &str, pubdate: &str) -> Entry {
    Entry {
        kind: EntryKind::Post,
        featured: false,
        show_lead: true,
        slug: slug.to_string(),
        title: format!("Title of {slug}"),
        heading: format!("Heading of {slug}"),
        description: format!("Description of {slug}"),
        category: Some(Category {
            slug: slugify(category_title),
            title: category_title.to_string(),
        }),
        image: Some(LeadImage::new(format!("/media/{slug}.webp"), slug)),
        body: format!("<p>Body of {slug}.</p>\n"),
        pubdate: Some(
            parse_date(pubdate).unwrap_or_else(|| panic!("bad test date {pubdate:?}")),
        ),
        updated: None,
        category_index: None,
    }
}

/// Same as [`post`] with the featured flag set.
pub fn featured(slug: &str, category_title: &str, pubdate: &str) -> Entry {
    Entry {
        featured: true,
        ..post(slug, category_title, pubdate)
    }
}

/// A standalone page.
pub fn page(slug: &str) -> Entry {
    Entry {
        kind: EntryKind::Page,
        featured: false,
        show_lead: true,
        slug: slug.to_string(),
        title: format!("Title of {slug}"),
        heading: format!("Heading of {slug}"),
        description: format!("Description of {slug}"),
        category: None,
        image: None,
        body: format!("<p>Body of {slug}.</p>\n"),
        pubdate: None,
        updated: None,
        category_index: None,
    }
}

/// Assemble a catalog from entries, registering their categories in order.
pub fn catalog(entries: Vec<Entry>) -> Catalog {
    let mut catalog = Catalog::default();
    for entry in entries {
        if let Some(cat) = &entry.category {
            catalog
                .categories
                .entry(cat.slug.clone())
                .or_insert_with(|| cat.clone());
        }
        catalog.entries.insert(entry.slug.clone(), entry);
    }
    catalog
}

pub fn store_from(entries: Vec<Entry>, limits: Limits) -> Store {
    Store::build(catalog(entries), limits)
}

// =========================================================================
// Lookups and extractors
// =========================================================================

/// Slugs of a sequence of entries, in order.
pub fn slugs<'a>(entries: impl IntoIterator<Item = &'a Entry>) -> Vec<&'a str> {
    entries.into_iter().map(|e| e.slug.as_str()).collect()
}

/// Find an entry by slug. Panics if not found.
pub fn find_entry<'a>(store: &'a Store, slug: &str) -> &'a Entry {
    store.by_slug(slug).unwrap_or_else(|| {
        let all: Vec<&str> = store
            .all_posts()
            .iter()
            .chain(store.all_pages().iter())
            .map(|e| e.slug.as_str())
            .collect();
        panic!("entry '{slug}' not found. Available: {all:?}")
    })
}
