//! Markdown sources → validated entries and categories.
//!
//! The processor is the only place where raw content is checked. It turns
//! each source into at most one [`Entry`], keeps a running category table,
//! and produces a [`Catalog`] that the store indexes.
//!
//! ## Per-source rules
//!
//! 1. Render the markdown and parse its front matter.
//! 2. `draft: true` skips the source entirely (no entry, no error).
//! 3. `title`, `heading`, `slug` and `description` are required.
//! 4. `featured` and `page` are optional booleans (default `false`).
//! 5. A slug seen before is a [`ProcessError::SlugCollision`]. A slug that
//!    cannot be a single URL path segment is a [`ProcessError::InvalidSlug`].
//! 6. Posts (non-pages) require `pubdate` and may carry `updated`.
//! 7. Posts require a `category` title. Its slug must not already belong
//!    to a differently spelled title ([`ProcessError::CategoryCollision`])
//!    and must be routable like an entry slug.
//! 8. `hide_image: true` turns the lead image off on the entry page.
//! 9. Posts require `image_url` and `image_alt`.
//!
//! ## All or nothing
//!
//! Any failure aborts the run and nothing is returned; callers keep
//! whatever catalog they published before. Sources are checked in the
//! order given, so the order only decides which error is reported first,
//! never which of two duplicates is kept.
//!
//! ## Parallelism
//!
//! Reading and rendering run in parallel with [rayon](https://docs.rs/rayon).
//! Validation is sequential and follows input order, which keeps the
//! catalog (and therefore the store's tie-breaking) reproducible.

use crate::markdown::{Document, MarkdownEngine, MarkdownError};
use crate::metadata::{Extractor, MetadataError};
use crate::naming::{is_routable, slugify};
use crate::types::{Category, Entry, EntryKind, LeadImage};
use indexmap::IndexMap;
use indexmap::map::Entry as MapEntry;
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to list sources in {path}: {source}")]
    Walk {
        path: PathBuf,
        source: walkdir::Error,
    },
    #[error("failed to render {label}: {source}")]
    Markdown { label: String, source: MarkdownError },
    #[error(transparent)]
    Metadata(#[from] MetadataError),
    #[error("post collision [{0}]")]
    SlugCollision(String),
    #[error("category collision [{0}] and [{1}]")]
    CategoryCollision(String, String),
    #[error("slug cannot be used in a URL [{0}]")]
    InvalidSlug(String),
}

/// One markdown source file.
#[derive(Debug, Clone)]
pub struct Source {
    /// Shown in errors when the source has no slug (usually its path).
    pub label: String,
    pub bytes: Vec<u8>,
}

/// The validated output of one processing run, in processing order.
#[derive(Debug, Default, Clone)]
pub struct Catalog {
    pub entries: IndexMap<String, Entry>,
    pub categories: IndexMap<String, Category>,
}

/// Accumulates entries and categories across sources.
#[derive(Debug, Default)]
pub struct Processor {
    catalog: Catalog,
}

impl Processor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate one rendered document and add it to the catalog.
    ///
    /// Returns `Ok(None)` for drafts.
    pub fn ingest(&mut self, doc: Document, fallback_label: &str) -> Result<Option<&Entry>, ProcessError> {
        let label = doc
            .metadata
            .get("slug")
            .and_then(|v| v.as_str())
            .unwrap_or(fallback_label)
            .to_string();
        let m = Extractor::new(&doc.metadata, label);

        if m.get_bool("draft", false)? {
            return Ok(None);
        }

        let title = m.require_string("title")?;
        let heading = m.require_string("heading")?;
        let slug = m.require_string("slug")?;
        let description = m.require_string("description")?;

        let featured = m.get_bool("featured", false)?;
        let kind = if m.get_bool("page", false)? {
            EntryKind::Page
        } else {
            EntryKind::Post
        };

        if !is_routable(&slug) {
            return Err(ProcessError::InvalidSlug(slug));
        }
        if self.catalog.entries.contains_key(&slug) {
            return Err(ProcessError::SlugCollision(slug));
        }

        let (pubdate, updated) = match kind {
            EntryKind::Post => (Some(m.require_date("pubdate")?), m.get_date("updated")?),
            EntryKind::Page => (None, None),
        };

        let category = match kind {
            EntryKind::Post => Some(self.resolve_category(&m.require_string("category")?)?),
            EntryKind::Page => None,
        };

        let show_lead = !m.get_bool("hide_image", false)?;

        let image = match kind {
            EntryKind::Post => Some(LeadImage::new(
                m.require_string("image_url")?,
                m.require_string("image_alt")?,
            )),
            EntryKind::Page => None,
        };

        if let Some(cat) = &category {
            self.catalog
                .categories
                .entry(cat.slug.clone())
                .or_insert_with(|| cat.clone());
        }

        let entry = Entry {
            kind,
            featured,
            show_lead,
            slug: slug.clone(),
            title,
            heading,
            description,
            category,
            image,
            body: doc.html,
            pubdate,
            updated,
            category_index: None,
        };

        match self.catalog.entries.entry(slug) {
            MapEntry::Occupied(o) => Err(ProcessError::SlugCollision(o.key().clone())),
            MapEntry::Vacant(v) => Ok(Some(v.insert(entry))),
        }
    }

    /// Look up or create the category for a title, rejecting slug clashes.
    fn resolve_category(&self, title: &str) -> Result<Category, ProcessError> {
        let slug = slugify(title);
        if !is_routable(&slug) {
            return Err(ProcessError::InvalidSlug(title.to_string()));
        }
        match self.catalog.categories.get(&slug) {
            Some(existing) if existing.title != title => Err(ProcessError::CategoryCollision(
                title.to_string(),
                existing.title.clone(),
            )),
            Some(existing) => Ok(existing.clone()),
            None => Ok(Category {
                slug,
                title: title.to_string(),
            }),
        }
    }

    pub fn finish(self) -> Catalog {
        self.catalog
    }
}

/// Render and validate in-memory sources.
pub fn process_sources<E: MarkdownEngine + ?Sized>(
    engine: &E,
    sources: &[Source],
) -> Result<Catalog, ProcessError> {
    let rendered: Vec<Document> = sources
        .par_iter()
        .map(|source| {
            engine
                .render(&source.bytes)
                .map_err(|e| ProcessError::Markdown {
                    label: source.label.clone(),
                    source: e,
                })
        })
        .collect::<Result<_, _>>()?;

    let mut processor = Processor::new();
    for (source, doc) in sources.iter().zip(rendered) {
        processor.ingest(doc, &source.label)?;
    }
    Ok(processor.finish())
}

/// Read, render and validate markdown files, in the order given.
pub fn process_files<E: MarkdownEngine + ?Sized>(
    engine: &E,
    paths: &[PathBuf],
) -> Result<Catalog, ProcessError> {
    let sources: Vec<Source> = paths
        .par_iter()
        .map(|path| {
            let bytes = fs::read(path).map_err(|source| ProcessError::Io {
                path: path.clone(),
                source,
            })?;
            Ok(Source {
                label: path.display().to_string(),
                bytes,
            })
        })
        .collect::<Result<_, ProcessError>>()?;

    process_sources(engine, &sources)
}

/// Every `*.md` file below `dir`, sorted by path.
pub fn collect_sources(dir: &Path) -> Result<Vec<PathBuf>, ProcessError> {
    let mut paths = Vec::new();
    for item in WalkDir::new(dir).sort_by_file_name() {
        let item = item.map_err(|source| ProcessError::Walk {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = item.path();
        let hidden = item.file_name().to_string_lossy().starts_with('.');
        let is_markdown = path
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case("md"));
        if item.file_type().is_file() && is_markdown && !hidden {
            paths.push(path.to_path_buf());
        }
    }
    Ok(paths)
}
