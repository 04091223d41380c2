//! # Quillpost
//!
//! A markdown blog engine. Posts and pages are markdown files with YAML
//! front matter; Quillpost validates them, indexes them into an immutable
//! in-memory store and serves or exports the rendered site.
//!
//! # Architecture: Build Once, Read Many
//!
//! ```text
//! 1. Process   assets/posts/*.md  →  Catalog   (validate metadata, render markdown)
//! 2. Index     Catalog            →  Store     (ordering, categories, sections)
//! 3. Serve     Store + config     →  Site      (routes answered from one snapshot)
//! ```
//!
//! A [`site::Site`] is an immutable snapshot. The server reads it without
//! locks; the watcher builds a complete replacement off to the side and swaps
//! it in atomically, so a broken edit never takes the running site down.
//! Export walks every known route through the same router the server uses.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`types`] | Shared entities: `Entry`, `Category`, `LeadImage`, `DateStamp` |
//! | [`naming`] | Slug derivation for category titles |
//! | [`metadata`] | Typed front-matter lookups with labelled errors |
//! | [`markdown`] | `MarkdownEngine` trait and the pulldown-cmark engine with syntect highlighting |
//! | [`process`] | Validates rendered documents into a `Catalog` of entries and categories |
//! | [`store`] | Read-only indexes: ordering, categories, latest, featured, related, sections |
//! | [`config`] | `quillpost.toml` loading, merging, validation, themes |
//! | [`render`] | Maud templates for every page plus sitemap and robots documents |
//! | [`site`] | Snapshot of config + store with a pure `respond(path)` router |
//! | [`serve`] | tiny_http server over an atomically swapped snapshot |
//! | [`watch`] | Debounced file watcher that rebuilds and swaps the snapshot |
//! | [`export`] | Writes every route and the media directory to disk |
//! | [`init`] | Scaffolds a new project |
//! | [`output`] | CLI output formatting for `check` and `export` |
//!
//! # Design Decisions
//!
//! ## All-or-Nothing Processing
//!
//! One bad post fails the whole build with an error naming the post. There
//! is no partial catalog: what the store indexes has passed every check,
//! so the renderers never deal with missing titles or dates.
//!
//! ## Maud Over Template Engines
//!
//! HTML is generated with [Maud](https://maud.lambda.xyz/), a compile-time
//! HTML macro system. Malformed markup is a build error, interpolation is
//! escaped by default and there is no template directory to ship.
//!
//! ## Arena Plus Indexes
//!
//! The store owns every entry once, in an arena. Ordered views (latest,
//! featured, per-category lists, homepage sections) are lists of arena
//! indexes, handed out as borrowed [`store::Entries`] views.

pub mod config;
pub mod export;
pub mod init;
pub mod markdown;
pub mod metadata;
pub mod naming;
pub mod output;
pub mod process;
pub mod render;
pub mod serve;
pub mod site;
pub mod store;
pub mod types;
pub mod watch;

#[cfg(test)]
pub(crate) mod test_helpers;
