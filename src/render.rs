//! HTML and text document rendering.
//!
//! Every function here is a pure consumer of the store's query results: it
//! takes a [`SiteContext`] plus the entries to show and returns markup or
//! text. Routing, status codes and I/O live in [`crate::site`].
//!
//! ## Documents
//!
//! | Function | Route |
//! |----------|-------|
//! | [`render_index`] | `/` |
//! | [`render_entry`] | `/{slug}/` |
//! | [`render_category`] | `/category/{slug}/` |
//! | [`render_sitemap`] | `/sitemap/` |
//! | [`render_error`] | `/404/` and error responses |
//! | [`sitemap_xml`] | `/sitemap.xml` |
//! | [`robots_txt`] | `/robots.txt` |
//! | [`Stylesheet`] | `/styles.css` |
//!
//! ## HTML Generation
//!
//! Uses [maud](https://maud.lambda.xyz/) for compile-time HTML templating.
//! Entry bodies are already rendered HTML and are inserted unescaped;
//! everything else is escaped by maud.

use crate::config::{self, Display, SiteContext, SiteLink, Theme};
use crate::store::{Entries, SectionRef, Store};
use crate::types::{Category, Entry, LeadImage};
use chrono::{DateTime, Datelike, Utc};
use maud::{DOCTYPE, Markup, PreEscaped, html};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

const CSS_STATIC: &str = include_str!("../static/style.css");

/// The site stylesheet and its cache-busting link.
#[derive(Debug, Clone)]
pub struct Stylesheet {
    pub body: String,
    /// `/styles.css?v={fingerprint}`
    pub href: String,
}

impl Stylesheet {
    pub fn new(theme: &Theme) -> Self {
        let body = format!("{}\n\n{}", config::generate_theme_css(theme), CSS_STATIC);
        let digest = format!("{:x}", Sha256::digest(body.as_bytes()));
        let href = format!("/styles.css?v={}", &digest[..12]);
        Self { body, href }
    }
}

/// Per-page head metadata.
struct Head<'a> {
    title: &'a str,
    description: &'a str,
    /// Route of the page, used for canonical and og:url.
    path: &'a str,
    image: &'a LeadImage,
}

// ============================================================================
// HTML Components
// ============================================================================

/// Renders the base HTML document structure
fn base_document(ctx: &SiteContext, head: &Head, css_href: &str, content: Markup) -> Markup {
    let page_url = format!("{}{}", ctx.url, head.path);
    let image_url = format!("{}{}", ctx.url, head.image.url);
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (head.title) }
                meta name="description" content=(head.description);
                link rel="canonical" href=(page_url);
                meta property="og:type" content="website";
                meta property="og:site_name" content=(ctx.name);
                meta property="og:title" content=(head.title);
                meta property="og:description" content=(head.description);
                meta property="og:url" content=(page_url);
                meta property="og:image" content=(image_url);
                meta property="og:image:alt" content=(head.image.alt);
                meta property="og:image:type" content={ "image/" (head.image.kind) };
                meta property="og:image:width" content=(head.image.width);
                meta property="og:image:height" content=(head.image.height);
                link rel="stylesheet" href=(css_href);
                @if !ctx.analytics_tag.is_empty() && !ctx.debug {
                    (analytics(&ctx.analytics_tag))
                }
            }
            body {
                (site_header(ctx))
                (content)
                (site_footer(ctx))
            }
        }
    }
}

fn analytics(tag: &str) -> Markup {
    let init = format!(
        "window.dataLayer = window.dataLayer || [];\
         function gtag(){{dataLayer.push(arguments);}}\
         gtag('js', new Date());\
         gtag('config', '{tag}');"
    );
    html! {
        script async src={ "https://www.googletagmanager.com/gtag/js?id=" (tag) } {}
        script { (PreEscaped(init)) }
    }
}

fn site_header(ctx: &SiteContext) -> Markup {
    html! {
        header.site-header {
            div.inner {
                a.site-name href="/" { (ctx.name) }
                (link_list(&ctx.navbar_links))
            }
        }
    }
}

fn site_footer(ctx: &SiteContext) -> Markup {
    html! {
        footer.site-footer {
            div.inner {
                span { "© " (Utc::now().year()) " " (ctx.name) }
                (link_list(&ctx.footer_links))
            }
        }
    }
}

fn link_list(links: &[SiteLink]) -> Markup {
    html! {
        @if !links.is_empty() {
            ul.site-links {
                @for link in links {
                    li { a href=(link.href) { (link.text) } }
                }
            }
        }
    }
}

fn hero(heading: &str, subtitle: Option<&str>) -> Markup {
    html! {
        div.hero {
            h1 { (heading) }
            @if let Some(subtitle) = subtitle {
                p { (subtitle) }
            }
        }
    }
}

/// Publish date, update date and category line.
fn entry_meta(entry: &Entry) -> Markup {
    html! {
        p.meta {
            @if let Some(pubdate) = &entry.pubdate {
                time { (pubdate.display) }
            }
            @if let Some(updated) = &entry.updated {
                " · Updated " time { (updated.display) }
            }
            @if let Some(cat) = &entry.category {
                " · " a href=(cat.route()) { (cat.title) }
            }
        }
    }
}

fn post_card(entry: &Entry) -> Markup {
    html! {
        a.post-card href=(entry.route()) {
            @if let Some(image) = entry.image.as_ref().filter(|i| !i.is_empty()) {
                img src=(image.url) alt=(image.alt) width=(image.width) height=(image.height) loading="lazy";
            }
            h3 { (entry.heading) }
            (entry_meta(entry))
            p { (entry.description) }
        }
    }
}

fn post_list<'a>(display: Display, entries: impl IntoIterator<Item = &'a Entry>) -> Markup {
    html! {
        ul class={ "posts " (display.as_str()) } {
            @for entry in entries {
                li { (post_card(entry)) }
            }
        }
    }
}

fn section_block(ctx: &SiteContext, section: &SectionRef) -> Markup {
    html! {
        section.section {
            @if !section.category.title.is_empty() {
                h2 {
                    @if section.category.is_empty() {
                        (section.category.title)
                    } @else {
                        a href=(section.category.route()) { (section.category.title) }
                    }
                }
            }
            (post_list(ctx.display, section.entries))
        }
    }
}

// ============================================================================
// Page Renderers
// ============================================================================

/// Renders the homepage from resolved sections, in configured order.
pub fn render_index(ctx: &SiteContext, sections: &[SectionRef], css_href: &str) -> Markup {
    let head = Head {
        title: &ctx.title,
        description: &ctx.description,
        path: "/",
        image: &ctx.image,
    };
    let content = html! {
        (hero(&ctx.name, Some(ctx.tagline.as_str())))
        main.index-page {
            @for section in sections {
                (section_block(ctx, section))
            }
        }
    };
    base_document(ctx, &head, css_href, content)
}

/// Renders a post or page.
pub fn render_entry(
    ctx: &SiteContext,
    entry: &Entry,
    latest: Entries,
    related: &[&Entry],
    css_href: &str,
) -> Markup {
    let route = entry.route();
    let image = entry
        .image
        .as_ref()
        .filter(|i| !i.is_empty())
        .unwrap_or(&ctx.image);
    let head = Head {
        title: &entry.title,
        description: &entry.description,
        path: &route,
        image,
    };
    let content = html! {
        main {
            article.entry {
                h1 { (entry.heading) }
                @if entry.is_post() {
                    (entry_meta(entry))
                }
                @if entry.show_lead {
                    @if let Some(lead) = entry.image.as_ref().filter(|i| !i.is_empty()) {
                        img.lead src=(lead.url) alt=(lead.alt) width=(lead.width) height=(lead.height);
                    }
                }
                div.body { (PreEscaped(&entry.body)) }
            }
            @if !related.is_empty() {
                aside.aside {
                    h2 { "Related Posts" }
                    (post_list(ctx.display, related.iter().copied()))
                }
            }
            @if !latest.is_empty() {
                aside.aside {
                    h2 { "Latest Posts" }
                    (post_list(ctx.display, latest))
                }
            }
        }
    };
    base_document(ctx, &head, css_href, content)
}

/// Renders a category listing.
pub fn render_category(
    ctx: &SiteContext,
    category: &Category,
    entries: Entries,
    css_href: &str,
) -> Markup {
    let route = category.route();
    let title = format!(
        "{} related Posts - Explore our Content on {}",
        category.title, ctx.name
    );
    let description = format!(
        "Browse through the {} category on {} and take a look at our posts.",
        category.title, ctx.name
    );
    let head = Head {
        title: &title,
        description: &description,
        path: &route,
        image: &ctx.image,
    };
    let content = html! {
        (hero(&category.title, None))
        main {
            (post_list(ctx.display, entries))
        }
    };
    base_document(ctx, &head, css_href, content)
}

/// Renders the human-readable sitemap: every post, newest first.
pub fn render_sitemap(ctx: &SiteContext, posts: Entries, css_href: &str) -> Markup {
    let title = format!("Sitemap - Browse through all Posts on {}", ctx.name);
    let description = format!(
        "Browse through the sitemap on {} and take a look at our posts.",
        ctx.name
    );
    let head = Head {
        title: &title,
        description: &description,
        path: "/sitemap/",
        image: &ctx.image,
    };
    let content = html! {
        (hero("Posts", None))
        main {
            ul.sitemap {
                @for entry in posts {
                    li {
                        a href=(entry.route()) { (entry.heading) }
                        @if let Some(pubdate) = &entry.pubdate {
                            " " small { (pubdate.display) }
                        }
                    }
                }
            }
        }
    };
    base_document(ctx, &head, css_href, content)
}

/// Renders the error page for `status`. `trace` is only shown when given.
pub fn render_error(
    ctx: &SiteContext,
    status: u16,
    latest: Entries,
    trace: Option<&str>,
    css_href: &str,
) -> Markup {
    let (label, message) = match status {
        404 => ("Page Not Found", "The page you are looking for does not exist."),
        _ => ("Internal Server Error", "Something went wrong on our end."),
    };
    let title = format!("{label} - {}", ctx.name);
    let head = Head {
        title: &title,
        description: message,
        path: if status == 404 { "/404/" } else { "/" },
        image: &ctx.image,
    };
    let content = html! {
        main {
            div.error {
                h1 { (status) " " (label) }
                p { (message) }
                @if let Some(trace) = trace {
                    pre { (trace) }
                }
            }
            @if !latest.is_empty() {
                aside.aside {
                    h2 { "Latest Posts" }
                    (post_list(ctx.display, latest))
                }
            }
        }
    };
    base_document(ctx, &head, css_href, content)
}

// ============================================================================
// Text documents
// ============================================================================

/// `lastmod` value for a UNIX timestamp, pinned to midnight UTC.
fn lastmod(timestamp: i64) -> Option<String> {
    if timestamp <= 0 {
        return None;
    }
    DateTime::from_timestamp(timestamp, 0).map(|t| t.format("%Y-%m-%dT00:00:00+00:00").to_string())
}

fn xml_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

/// Renders `sitemap.xml`: home, posts (with lastmod), pages, categories.
/// URLs are sorted.
pub fn sitemap_xml(ctx: &SiteContext, store: &Store) -> String {
    let permalink = |path: &str| format!("{}{}", ctx.url, path);

    let mut urls: BTreeMap<String, Option<String>> = BTreeMap::new();
    urls.insert(permalink("/"), None);
    for post in store.all_posts() {
        urls.insert(permalink(&post.route()), lastmod(post.latest_timestamp()));
    }
    for page in store.all_pages() {
        urls.insert(permalink(&page.route()), None);
    }
    for cat in store.all_categories() {
        urls.insert(permalink(&cat.route()), None);
    }

    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
    );
    for (loc, modified) in &urls {
        xml.push_str("  <url>\n");
        xml.push_str(&format!("    <loc>{}</loc>\n", xml_escape(loc)));
        if let Some(modified) = modified {
            xml.push_str(&format!("    <lastmod>{modified}</lastmod>\n"));
        }
        xml.push_str("  </url>\n");
    }
    xml.push_str("</urlset>\n");
    xml
}

pub fn robots_txt(ctx: &SiteContext) -> String {
    format!("User-agent: *\nDisallow:\n\nSitemap: {}/sitemap.xml\n", ctx.url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use crate::store::Limits;
    use crate::test_helpers::*;

    fn ctx() -> SiteContext {
        let mut config = SiteConfig::default();
        config.site.name = "Gopher Notes".into();
        config.site.host = "gophers.dev".into();
        config.navbar_links.push(SiteLink {
            text: "About".into(),
            href: "/about/".into(),
        });
        config.context(None).unwrap()
    }

    fn store() -> Store {
        let mut hidden = featured("hidden-lead", "Go & Tools", "2024-01-03");
        hidden.show_lead = false;
        store_from(
            vec![
                post("first", "Go & Tools", "2024-01-01"),
                post("second", "Go & Tools", "2024-01-02"),
                hidden,
                page("about"),
            ],
            Limits {
                related: 1,
                ..Limits::default()
            },
        )
    }

    // =========================================================================
    // Pages
    // =========================================================================

    #[test]
    fn index_renders_sections_in_order() {
        let store = store();
        let sections = store
            .resolve_homepage(&["$featured".into(), "go-&-tools".into()])
            .unwrap();
        let html = render_index(&ctx(), &sections, "/styles.css").into_string();

        let featured_at = html.find("Featured Posts").unwrap();
        let category_at = html.find("/category/go-%26-tools/").unwrap();
        assert!(featured_at < category_at);
        assert!(html.contains("<title>Gopher Notes - A markdown blog</title>"));
        assert!(html.contains(r#"href="/first/""#));
    }

    #[test]
    fn all_section_has_no_heading() {
        let store = store();
        let sections = store.resolve_homepage(&["$all".into()]).unwrap();
        let html = render_index(&ctx(), &sections, "/styles.css").into_string();
        assert!(!html.contains("<h2>"));
        assert!(html.contains(r#"class="posts grid""#));
    }

    #[test]
    fn entry_page_includes_body_and_lead() {
        let store = store();
        let entry = find_entry(&store, "second");
        let html = render_entry(&ctx(), entry, store.latest_small(), &[], "/s.css").into_string();

        assert!(html.contains("<p>Body of second.</p>"));
        assert!(html.contains(r#"class="lead""#));
        assert!(html.contains("January 2, 2024"));
        assert!(html.contains(r#"<meta property="og:image" content="https://gophers.dev/media/second.webp">"#));
        assert!(!html.contains("Related Posts"));
    }

    #[test]
    fn entry_page_hides_lead_when_asked() {
        let store = store();
        let entry = find_entry(&store, "hidden-lead");
        let html = render_entry(&ctx(), entry, store.latest_small(), &[], "/s.css").into_string();
        assert!(!html.contains(r#"class="lead""#));
    }

    #[test]
    fn entry_page_lists_related() {
        let store = store();
        let entry = find_entry(&store, "second");
        let related = store.related(entry);
        assert_eq!(related.len(), 1);
        let html = render_entry(&ctx(), entry, store.latest_small(), &related, "/s.css").into_string();
        assert!(html.contains("Related Posts"));
    }

    #[test]
    fn page_falls_back_to_site_image() {
        let store = store();
        let html = render_entry(
            &ctx(),
            find_entry(&store, "about"),
            store.latest_small(),
            &[],
            "/s.css",
        )
        .into_string();
        assert!(html.contains("https://gophers.dev/media/meta-img.webp"));
        assert!(!html.contains(r#"class="lead""#));
    }

    #[test]
    fn category_page_title() {
        let store = store();
        let cat = store.category("go-&-tools").unwrap();
        let entries = store.by_category(&cat.slug).unwrap();
        let html = render_category(&ctx(), cat, entries, "/s.css").into_string();
        assert!(html.contains(
            "<title>Go &amp; Tools related Posts - Explore our Content on Gopher Notes</title>"
        ));
    }

    #[test]
    fn error_page_shows_trace_only_when_given() {
        let store = store();
        let html = render_error(&ctx(), 404, store.latest(), None, "/s.css").into_string();
        assert!(html.contains("Page Not Found - Gopher Notes"));
        assert!(!html.contains("<pre>"));

        let html = render_error(&ctx(), 500, store.latest(), Some("boom"), "/s.css").into_string();
        assert!(html.contains("Internal Server Error"));
        assert!(html.contains("<pre>boom</pre>"));
    }

    #[test]
    fn navbar_links_render() {
        let store = store();
        let html = render_sitemap(&ctx(), store.all_posts(), "/s.css").into_string();
        assert!(html.contains(r#"<a href="/about/">About</a>"#));
        assert!(html.contains("Sitemap - Browse through all Posts on Gopher Notes"));
    }

    #[test]
    fn analytics_omitted_by_default() {
        let store = store();
        let html = render_sitemap(&ctx(), store.all_posts(), "/s.css").into_string();
        assert!(!html.contains("googletagmanager"));
    }

    // =========================================================================
    // Text documents
    // =========================================================================

    #[test]
    fn sitemap_xml_has_sorted_urls_and_lastmod() {
        let xml = sitemap_xml(&ctx(), &store());
        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains("<loc>https://gophers.dev/</loc>"));
        assert!(xml.contains("<loc>https://gophers.dev/category/go-%26-tools/</loc>"));
        assert!(xml.contains("<lastmod>2024-01-02T00:00:00+00:00</lastmod>"));

        let about = xml.find("/about/").unwrap();
        let second = xml.find("/second/").unwrap();
        assert!(about < second);
    }

    #[test]
    fn robots_points_at_sitemap() {
        assert_eq!(
            robots_txt(&ctx()),
            "User-agent: *\nDisallow:\n\nSitemap: https://gophers.dev/sitemap.xml\n"
        );
    }

    #[test]
    fn stylesheet_fingerprint_tracks_theme() {
        let a = Stylesheet::new(&Theme::lookup("red").unwrap());
        let b = Stylesheet::new(&Theme::lookup("red").unwrap());
        let c = Stylesheet::new(&Theme::lookup("blue").unwrap());
        assert_eq!(a.href, b.href);
        assert_ne!(a.href, c.href);
        assert!(a.body.contains("--color-primary: #b91c1c;"));
        assert!(a.body.contains(".site-header"));
    }

    #[test]
    fn lastmod_skips_undated() {
        assert_eq!(lastmod(0), None);
        assert_eq!(lastmod(1_704_412_800).unwrap(), "2024-01-05T00:00:00+00:00");
    }
}
