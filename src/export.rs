//! Static export.
//!
//! Renders every route of a [`Site`] through the same router the server
//! uses and writes the results to disk:
//!
//! ```text
//! dist/
//! ├── .quillpost          # export timestamp
//! ├── CNAME
//! ├── 404.html
//! ├── index.html
//! ├── styles.css
//! ├── sitemap.xml
//! ├── robots.txt
//! ├── sitemap/index.html
//! ├── {slug}/index.html
//! ├── category/{slug}/index.html
//! └── media/...           # copied verbatim from the media directory
//! ```
//!
//! The output directory is wiped first. Any route answering with a status
//! other than 200 aborts the export.

use crate::config::CONFIG_FILE;
use crate::site::Site;
use chrono::Utc;
use rayon::prelude::*;
use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Marker file written at the root of every export.
pub const MARKER_FILE: &str = ".quillpost";

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        source: walkdir::Error,
    },
    #[error("route {route} answered with status {status}")]
    UnexpectedStatus { route: String, status: u16 },
    #[error("refusing to export into {0}: it contains the project or its content")]
    UnsafeOutput(PathBuf),
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> ExportError + '_ {
    move |source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// What an export wrote.
#[derive(Debug)]
pub struct ExportReport {
    pub output: PathBuf,
    /// `(route, file relative to output)` in route order.
    pub pages: Vec<(String, PathBuf)>,
    pub media_files: usize,
}

/// Map a route to the file it is written to, relative to the output root.
///
/// ```text
/// /             → index.html
/// /404/         → 404.html
/// /{slug}/      → {slug}/index.html
/// /c%23/        → c#/index.html
/// /styles.css   → styles.css
/// /CNAME        → CNAME
/// ```
pub fn make_path(route: &str) -> PathBuf {
    match route {
        "/" => PathBuf::from("index.html"),
        "/404/" => PathBuf::from("404.html"),
        _ => {
            let decoded = urlencoding::decode(route).unwrap_or(Cow::Borrowed(route));
            let trimmed = decoded.trim_start_matches('/');
            match trimmed.strip_suffix('/') {
                Some(dir) => Path::new(dir).join("index.html"),
                None => PathBuf::from(trimmed),
            }
        }
    }
}

/// Export the site to `output`, replacing whatever was there.
pub fn export(site: &Site, output: &Path) -> Result<ExportReport, ExportError> {
    guard_output(site, output)?;

    if output.exists() {
        fs::remove_dir_all(output).map_err(io_err(output))?;
    }
    fs::create_dir_all(output).map_err(io_err(output))?;

    let marker = output.join(MARKER_FILE);
    let stamp = Utc::now().format("%a %b %e %H:%M:%S UTC %Y").to_string();
    fs::write(&marker, stamp).map_err(io_err(&marker))?;

    let pages = site
        .routes()
        .into_par_iter()
        .map(|route| {
            let response = site.respond(&route);
            if response.status != 200 {
                return Err(ExportError::UnexpectedStatus {
                    route,
                    status: response.status,
                });
            }
            let rel = make_path(&route);
            let dest = output.join(&rel);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent).map_err(io_err(parent))?;
            }
            fs::write(&dest, &response.body).map_err(io_err(&dest))?;
            Ok((route, rel))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let media_files = copy_media(&site.media_dir(), &output.join("media"))?;

    tracing::info!(
        pages = pages.len(),
        media = media_files,
        output = %output.display(),
        "export complete"
    );

    Ok(ExportReport {
        output: output.to_path_buf(),
        pages,
        media_files,
    })
}

/// Never wipe a directory holding the project, its config or its content.
fn guard_output(site: &Site, output: &Path) -> Result<(), ExportError> {
    let resolve = |p: &Path| p.canonicalize().unwrap_or_else(|_| p.to_path_buf());
    let resolved = resolve(output);
    let protected = [
        site.root().to_path_buf(),
        site.root().join(CONFIG_FILE),
        site.posts_dir(),
        site.media_dir(),
    ];
    if protected.iter().any(|p| resolve(p).starts_with(&resolved)) {
        return Err(ExportError::UnsafeOutput(output.to_path_buf()));
    }
    Ok(())
}

fn copy_media(media_dir: &Path, dest: &Path) -> Result<usize, ExportError> {
    if !media_dir.is_dir() {
        return Ok(0);
    }
    let mut count = 0;
    for entry in WalkDir::new(media_dir).sort_by_file_name() {
        let entry = entry.map_err(|source| ExportError::Walk {
            path: media_dir.to_path_buf(),
            source,
        })?;
        let rel = entry
            .path()
            .strip_prefix(media_dir)
            .unwrap_or(entry.path());
        let target = dest.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(io_err(&target))?;
        } else {
            fs::copy(entry.path(), &target).map_err(io_err(&target))?;
            count += 1;
        }
    }
    Ok(count)
}
