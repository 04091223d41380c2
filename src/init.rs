//! Project scaffolding for `quillpost init`.
//!
//! Creates a stock `quillpost.toml`, a sample post, a sample page and an
//! empty media directory. Files that already exist are left alone, so
//! running `init` inside an existing project only fills in what is missing.

use crate::config::{self, CONFIG_FILE};
use std::fs;
use std::path::{Path, PathBuf};

const SAMPLE_POST: &str = "---
title: Hello, Quillpost
heading: Hello, Quillpost
slug: hello-quillpost
description: The first post on a brand new blog.
category: General
pubdate: 2024-01-01
image_url: /media/hello.webp
image_alt: A blank notebook
hide_image: true
---

Write posts as markdown files under `assets/posts/`.
The front matter above controls the title, route and category.
";

const SAMPLE_PAGE: &str = "---
page: true
title: About
heading: About this blog
slug: about
description: Who writes here and why.
---

Pages stand outside the post feed and have no category or date.
";

/// Files that `init` creates, relative to the project root.
#[derive(Debug, Default)]
pub struct InitReport {
    pub created: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
}

/// Scaffold a project at `root`. Existing files are never overwritten.
pub fn init(root: &Path) -> std::io::Result<InitReport> {
    let config = config::SiteConfig::default();
    let posts = root.join(&config.paths.posts);
    let media = root.join(&config.paths.media);

    fs::create_dir_all(&posts)?;
    fs::create_dir_all(&media)?;

    let mut report = InitReport::default();
    let files = [
        (root.join(CONFIG_FILE), config::stock_config_toml()),
        (posts.join("hello-quillpost.md"), SAMPLE_POST),
        (posts.join("about.md"), SAMPLE_PAGE),
    ];
    for (path, contents) in files {
        let rel = path.strip_prefix(root).unwrap_or(&path).to_path_buf();
        if path.exists() {
            report.skipped.push(rel);
        } else {
            fs::write(&path, contents)?;
            report.created.push(rel);
        }
    }
    Ok(report)
}
