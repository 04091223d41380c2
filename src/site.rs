//! A built site: configuration, indexed content and the router over both.
//!
//! [`Site::load`] runs the whole pipeline for a project directory:
//!
//! ```text
//! quillpost.toml ─→ SiteConfig ─→ SiteContext
//! assets/posts/**/*.md ─→ process ─→ Catalog ─→ Store
//!                                              └─→ homepage sections checked
//! ```
//!
//! The result is an immutable snapshot. The dev server holds it behind an
//! atomic pointer and swaps in a new one on rebuild; the exporter walks
//! [`Site::routes`] through the same [`Site::respond`] router, so the
//! static output is byte-for-byte what the server would send.
//!
//! ## Routing
//!
//! Routes end in a slash (`/my-post/`). A known route requested without
//! it answers `301` to the slashed form. `/404/` renders the not-found
//! page with status `200` so static hosts can serve it as their error
//! document; any other unknown path is a real `404`.

use crate::config::{self, ConfigError, SiteConfig, SiteContext};
use crate::markdown::PulldownEngine;
use crate::process::{self, ProcessError};
use crate::render::{self, Stylesheet};
use crate::store::{Store, StoreError};
use crate::types::{Category, Entry};
use maud::Markup;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SiteError {
    #[error("config: {0}")]
    Config(#[from] ConfigError),
    #[error("process posts: {0}")]
    Process(#[from] ProcessError),
    #[error("homepage: {0}")]
    Store(#[from] StoreError),
}

pub const CONTENT_HTML: &str = "text/html; charset=utf-8";
pub const CONTENT_CSS: &str = "text/css; charset=utf-8";
pub const CONTENT_TEXT: &str = "text/plain; charset=utf-8";
pub const CONTENT_XML: &str = "application/xml; charset=utf-8";

/// Routes that exist regardless of content.
pub const FIXED_ROUTES: &[&str] = &[
    "/",
    "/styles.css",
    "/sitemap/",
    "/sitemap.xml",
    "/robots.txt",
    "/CNAME",
    "/404/",
];

/// A rendered response, independent of any HTTP library.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
    /// Target of a redirect.
    pub location: Option<String>,
}

impl Response {
    fn html(status: u16, markup: Markup) -> Self {
        Self {
            status,
            content_type: CONTENT_HTML,
            body: markup.into_string().into_bytes(),
            location: None,
        }
    }

    fn text(content_type: &'static str, body: impl Into<String>) -> Self {
        Self {
            status: 200,
            content_type,
            body: body.into().into_bytes(),
            location: None,
        }
    }

    fn redirect(location: String) -> Self {
        Self {
            status: 301,
            content_type: CONTENT_TEXT,
            body: Vec::new(),
            location: Some(location),
        }
    }
}

enum Route<'a> {
    Index,
    Stylesheet,
    SitemapHtml,
    SitemapXml,
    Robots,
    Cname,
    NotFoundPage,
    Entry(&'a Entry),
    Category(&'a Category),
}

/// One immutable, fully built snapshot of a project.
#[derive(Debug)]
pub struct Site {
    pub config: SiteConfig,
    pub ctx: SiteContext,
    pub store: Store,
    pub stylesheet: Stylesheet,
    root: PathBuf,
}

impl Site {
    /// Load config and content from a project root and build a snapshot.
    ///
    /// `debug_port` switches the site context to `http://localhost:{port}`.
    pub fn load(root: &Path, debug_port: Option<u16>) -> Result<Self, SiteError> {
        let config = config::load_config(root)?;
        Self::build(root, config, debug_port)
    }

    /// Build a snapshot from an already loaded config.
    pub fn build(root: &Path, config: SiteConfig, debug_port: Option<u16>) -> Result<Self, SiteError> {
        let ctx = config.context(debug_port)?;

        let posts_dir = root.join(&config.paths.posts);
        let sources = process::collect_sources(&posts_dir)?;
        tracing::debug!(count = sources.len(), dir = %posts_dir.display(), "collected sources");

        let catalog = process::process_files(&PulldownEngine::default(), &sources)?;
        let store = Store::build(catalog, config.limits);
        store.resolve_homepage(&config.homepage)?;

        tracing::info!(
            posts = store.all_posts().len(),
            pages = store.all_pages().len(),
            categories = store.all_categories().count(),
            "site built"
        );

        Ok(Self {
            stylesheet: Stylesheet::new(&ctx.theme),
            ctx,
            store,
            config,
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn posts_dir(&self) -> PathBuf {
        self.root.join(&self.config.paths.posts)
    }

    pub fn media_dir(&self) -> PathBuf {
        self.root.join(&self.config.paths.media)
    }

    /// Every route the site can render, for the exporter.
    pub fn routes(&self) -> Vec<String> {
        let mut routes: Vec<String> = FIXED_ROUTES.iter().map(|r| r.to_string()).collect();
        routes.extend(self.store.all_posts().iter().map(Entry::route));
        routes.extend(self.store.all_pages().iter().map(Entry::route));
        routes.extend(self.store.all_categories().map(Category::route));
        routes
    }

    fn lookup(&self, path: &str) -> Option<Route<'_>> {
        let route = match path {
            "/" => Route::Index,
            "/styles.css" => Route::Stylesheet,
            "/sitemap/" => Route::SitemapHtml,
            "/sitemap.xml" => Route::SitemapXml,
            "/robots.txt" => Route::Robots,
            "/CNAME" => Route::Cname,
            "/404/" => Route::NotFoundPage,
            _ => {
                let inner = path.strip_prefix('/')?.strip_suffix('/')?;
                let segments = inner
                    .split('/')
                    .map(|seg| urlencoding::decode(seg).ok())
                    .collect::<Option<Vec<_>>>()?;
                return match segments.as_slice() {
                    [prefix, slug] if prefix == "category" => {
                        self.store.category(slug).map(Route::Category)
                    }
                    [slug] => self.store.by_slug(slug).map(Route::Entry),
                    _ => None,
                };
            }
        };
        Some(route)
    }

    /// Render the response for a request path as it appears on the wire:
    /// percent-encoded, no query string.
    pub fn respond(&self, path: &str) -> Response {
        if let Some(route) = self.lookup(path) {
            return self.render(route);
        }
        if !path.ends_with('/') {
            let slashed = format!("{path}/");
            if self.lookup(&slashed).is_some() {
                return Response::redirect(slashed);
            }
        }
        self.error_response(404, None)
    }

    fn render(&self, route: Route<'_>) -> Response {
        let css = self.stylesheet.href.as_str();
        let ctx = &self.ctx;
        match route {
            Route::Index => match self.store.resolve_homepage(&ctx.homepage) {
                Ok(sections) => Response::html(200, render::render_index(ctx, &sections, css)),
                Err(e) => self.error_response(500, Some(&e.to_string())),
            },
            Route::Stylesheet => Response::text(CONTENT_CSS, self.stylesheet.body.clone()),
            Route::SitemapHtml => {
                Response::html(200, render::render_sitemap(ctx, self.store.all_posts(), css))
            }
            Route::SitemapXml => Response::text(CONTENT_XML, render::sitemap_xml(ctx, &self.store)),
            Route::Robots => Response::text(CONTENT_TEXT, render::robots_txt(ctx)),
            Route::Cname => Response::text(CONTENT_TEXT, ctx.host.clone()),
            Route::NotFoundPage => {
                let mut response = self.error_response(404, None);
                response.status = 200;
                response
            }
            Route::Entry(entry) => {
                let related = self.store.related(entry);
                Response::html(
                    200,
                    render::render_entry(ctx, entry, self.store.latest_small(), &related, css),
                )
            }
            Route::Category(category) => match self.store.by_category(&category.slug) {
                Some(entries) => {
                    Response::html(200, render::render_category(ctx, category, entries, css))
                }
                None => {
                    tracing::warn!(category = %category.slug, "category has no posts");
                    self.error_response(404, None)
                }
            },
        }
    }

    /// Render the error page. The trace is only included in debug mode.
    pub fn error_response(&self, status: u16, trace: Option<&str>) -> Response {
        let trace = trace.filter(|_| self.ctx.debug);
        Response::html(
            status,
            render::render_error(
                &self.ctx,
                status,
                self.store.latest(),
                trace,
                &self.stylesheet.href,
            ),
        )
    }
}
