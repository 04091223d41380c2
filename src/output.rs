//! CLI output formatting for `check` and `export`.
//!
//! # Information-First Display
//!
//! Output is **information-centric, not file-centric**. Every entity (post,
//! page, category) leads with its positional index and heading; the route it
//! is served at follows on an indented line. The result reads as a content
//! inventory while still letting users find every URL.
//!
//! # Output Format
//!
//! ## Check
//!
//! ```text
//! Posts
//! 001 Getting started with Go (Golang, January 2, 2024)
//!     Route: /getting-started/
//!
//! Pages
//! 001 About
//!     Route: /about/
//!
//! Categories
//! 001 Golang (3 posts)
//!     Route: /category/golang/
//!
//! Homepage
//!     $latest → Latest Posts (3 posts)
//!
//! Checked 3 posts, 1 page, 1 category
//! ```
//!
//! ## Export
//!
//! ```text
//! / → index.html
//! /getting-started/ → getting-started/index.html
//!
//! Exported 12 routes and 3 media files to dist
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::export::ExportReport;
use crate::site::Site;
use crate::types::{Category, Entry};
use serde::Serialize;

// ============================================================================
// Shared entity display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(n: usize, word: &str) -> String {
    match (n, word) {
        (1, _) => format!("{n} {word}"),
        (_, "category") => format!("{n} categories"),
        _ => format!("{n} {word}s"),
    }
}

/// Header line for a post: heading plus category and date when known.
///
/// ```text
/// 001 Hello (Golang, January 2, 2024)
/// 001 About
/// ```
fn entry_header(index: usize, entry: &Entry) -> String {
    let details: Vec<&str> = [
        entry.category.as_ref().map(|c| c.title.as_str()),
        entry.pubdate.as_ref().map(|d| d.display.as_str()),
    ]
    .into_iter()
    .flatten()
    .collect();

    if details.is_empty() {
        format!("{} {}", format_index(index), entry.heading)
    } else {
        format!(
            "{} {} ({})",
            format_index(index),
            entry.heading,
            details.join(", ")
        )
    }
}

fn push_entries<'a>(lines: &mut Vec<String>, title: &str, entries: impl Iterator<Item = &'a Entry>) {
    let mut any = false;
    for (i, entry) in entries.enumerate() {
        if !any {
            lines.push(title.to_string());
            any = true;
        }
        lines.push(entry_header(i + 1, entry));
        lines.push(format!("{}Route: {}", indent(1), entry.route()));
    }
    if any {
        lines.push(String::new());
    }
}

// ============================================================================
// Check
// ============================================================================

/// Format the content inventory of a built site.
pub fn format_check_output(site: &Site) -> Vec<String> {
    let store = &site.store;
    let mut lines = Vec::new();

    push_entries(&mut lines, "Posts", store.all_posts().iter());
    push_entries(&mut lines, "Pages", store.all_pages().iter());

    let categories: Vec<&Category> = store.all_categories().collect();
    if !categories.is_empty() {
        lines.push("Categories".to_string());
        for (i, category) in categories.iter().enumerate() {
            let count = store.by_category(&category.slug).map_or(0, |e| e.len());
            lines.push(format!(
                "{} {} ({})",
                format_index(i + 1),
                category.title,
                plural(count, "post")
            ));
            lines.push(format!("{}Route: {}", indent(1), category.route()));
        }
        lines.push(String::new());
    }

    lines.push("Homepage".to_string());
    match store.resolve_homepage(&site.ctx.homepage) {
        Ok(sections) => {
            for section in sections {
                lines.push(format!(
                    "{}{} \u{2192} {} ({})",
                    indent(1),
                    section.slug,
                    section.category.title,
                    plural(section.entries.len(), "post")
                ));
            }
        }
        Err(e) => lines.push(format!("{}{e}", indent(1))),
    }
    lines.push(String::new());

    lines.push(format!(
        "Checked {}, {}, {}",
        plural(store.all_posts().len(), "post"),
        plural(store.all_pages().len(), "page"),
        plural(categories.len(), "category")
    ));
    lines
}

pub fn print_check_output(site: &Site) {
    for line in format_check_output(site) {
        println!("{}", line);
    }
}

/// Machine-readable form of `check`, printed with `--json`.
#[derive(Debug, Serialize)]
pub struct CheckSummary<'a> {
    pub name: &'a str,
    pub url: &'a str,
    pub posts: Vec<EntrySummary<'a>>,
    pub pages: Vec<EntrySummary<'a>>,
    pub categories: Vec<&'a Category>,
    pub routes: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct EntrySummary<'a> {
    pub slug: &'a str,
    pub title: &'a str,
    pub heading: &'a str,
    pub category: Option<&'a str>,
    pub pubdate: Option<&'a str>,
    pub featured: bool,
}

impl<'a> From<&'a Entry> for EntrySummary<'a> {
    fn from(entry: &'a Entry) -> Self {
        Self {
            slug: &entry.slug,
            title: &entry.title,
            heading: &entry.heading,
            category: entry.category.as_ref().map(|c| c.slug.as_str()),
            pubdate: entry.pubdate.as_ref().map(|d| d.display.as_str()),
            featured: entry.featured,
        }
    }
}

pub fn check_summary(site: &Site) -> CheckSummary<'_> {
    let store = &site.store;
    CheckSummary {
        name: &site.ctx.name,
        url: &site.ctx.url,
        posts: store.all_posts().iter().map(EntrySummary::from).collect(),
        pages: store.all_pages().iter().map(EntrySummary::from).collect(),
        categories: store.all_categories().collect(),
        routes: site.routes(),
    }
}

// ============================================================================
// Export
// ============================================================================

/// Format the route → file listing of an export.
pub fn format_export_output(report: &ExportReport) -> Vec<String> {
    let mut lines: Vec<String> = report
        .pages
        .iter()
        .map(|(route, file)| format!("{} \u{2192} {}", route, file.display()))
        .collect();
    lines.push(String::new());
    lines.push(format!(
        "Exported {} and {} to {}",
        plural(report.pages.len(), "route"),
        plural(report.media_files, "media file"),
        report.output.display()
    ));
    lines
}

pub fn print_export_output(report: &ExportReport) {
    for line in format_export_output(report) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    // =========================================================================
    // Helpers
    // =========================================================================

    #[test]
    fn format_index_pads() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(42), "042");
        assert_eq!(format_index(1000), "1000");
    }

    #[test]
    fn plural_forms() {
        assert_eq!(plural(1, "post"), "1 post");
        assert_eq!(plural(0, "post"), "0 posts");
        assert_eq!(plural(3, "page"), "3 pages");
        assert_eq!(plural(2, "category"), "2 categories");
    }

    #[test]
    fn entry_header_for_post_and_page() {
        let p = post("hello", "Golang", "2024-01-02");
        assert_eq!(
            entry_header(1, &p),
            format!("001 {} (Golang, January 2, 2024)", p.heading)
        );
        let pg = page("about");
        assert_eq!(entry_header(2, &pg), format!("002 {}", pg.heading));
    }

    // =========================================================================
    // Check
    // =========================================================================

    fn site() -> (TempDir, Site) {
        let tmp = TempDir::new().unwrap();
        write_sources(
            &tmp.path().join("assets/posts"),
            &[
                ("a.md", post_md("first", "Golang", "2024-01-01")),
                ("b.md", post_md("second", "Golang", "2024-01-02")),
                ("c.md", page_md("about")),
            ],
        );
        let site = Site::load(tmp.path(), None).unwrap();
        (tmp, site)
    }

    #[test]
    fn check_lists_everything() {
        let (_tmp, site) = site();
        let lines = format_check_output(&site);

        assert_eq!(lines[0], "Posts");
        assert_eq!(lines[1], "001 Heading of second (Golang, January 2, 2024)");
        assert_eq!(lines[2], "    Route: /second/");
        assert!(lines.contains(&"Pages".to_string()));
        assert!(lines.contains(&"001 Golang (2 posts)".to_string()));
        assert!(lines.contains(&"    $latest \u{2192} Latest Posts (2 posts)".to_string()));
        assert_eq!(
            lines.last().unwrap(),
            "Checked 2 posts, 1 page, 1 category"
        );
    }

    #[test]
    fn check_summary_serializes() {
        let (_tmp, site) = site();
        let json = serde_json::to_value(check_summary(&site)).unwrap();
        assert_eq!(json["posts"][0]["slug"], "second");
        assert_eq!(json["posts"][0]["category"], "golang");
        assert_eq!(json["pages"][0]["pubdate"], serde_json::Value::Null);
        assert_eq!(json["categories"][0]["title"], "Golang");
    }

    // =========================================================================
    // Export
    // =========================================================================

    #[test]
    fn export_output_lists_routes() {
        let report = ExportReport {
            output: PathBuf::from("dist"),
            pages: vec![
                ("/".to_string(), PathBuf::from("index.html")),
                ("/about/".to_string(), PathBuf::from("about/index.html")),
            ],
            media_files: 1,
        };
        let lines = format_export_output(&report);
        assert_eq!(lines[0], "/ \u{2192} index.html");
        assert_eq!(lines[1], "/about/ \u{2192} about/index.html");
        assert_eq!(
            lines.last().unwrap(),
            "Exported 2 routes and 1 media file to dist"
        );
    }
}
