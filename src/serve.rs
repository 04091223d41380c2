//! Development server.
//!
//! A small `tiny_http` server that answers every request from the current
//! [`Site`] snapshot:
//!
//! - `/media/*` is read from the media directory on disk
//! - everything else goes through [`Site::respond`]
//! - Ctrl+C unblocks the accept loop and returns cleanly
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                 ┌──────────────────┐
//! │   Main Thread   │                 │  Watcher Thread  │
//! │  (HTTP Server)  │                 │  (File Monitor)  │
//! └────────┬────────┘                 └────────┬─────────┘
//!          │ load_full()                       │ store()
//!          ▼                                   ▼
//!     ┌──────────────────────────────────────────────┐
//!     │            ArcSwap<Site> snapshot            │
//!     └──────────────────────────────────────────────┘
//! ```
//!
//! Each request takes its own `Arc<Site>`, so a rebuild that lands mid
//! request never changes what that request sees.
//!
//! Every response carries the usual security headers. Media responses get
//! `Cache-Control: no-cache` in debug mode and a two-day max-age otherwise.
//! A panic while rendering becomes a `500` page; the panic message is only
//! shown in debug mode.

use crate::config::{self, ConfigError};
use crate::site::{CONTENT_CSS, CONTENT_HTML, CONTENT_TEXT, CONTENT_XML, Response, Site, SiteError};
use crate::watch;
use arc_swap::ArcSwap;
use std::any::Any;
use std::borrow::Cow;
use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tiny_http::{Header, Request, Server, StatusCode};

/// Try binding to port, retry with incremented port if in use
const MAX_PORT_RETRIES: u16 = 10;

const SECURITY_HEADERS: &[(&str, &str)] = &[
    ("Referrer-Policy", "origin-when-cross-origin"),
    ("X-Content-Type-Options", "nosniff"),
    ("X-Frame-Options", "deny"),
    ("X-XSS-Protection", "0"),
];

#[derive(Error, Debug)]
pub enum ServeError {
    #[error("invalid listen address {0:?}")]
    Address(String),
    #[error("failed to bind after {attempts} attempts (ports {first}-{last}): {message}")]
    Bind {
        attempts: u16,
        first: u16,
        last: u16,
        message: String,
    },
    #[error("failed to set Ctrl+C handler: {0}")]
    Signal(#[from] ctrlc::Error),
    #[error(transparent)]
    Site(#[from] SiteError),
}

impl From<ConfigError> for ServeError {
    fn from(e: ConfigError) -> Self {
        ServeError::Site(SiteError::Config(e))
    }
}

/// Command-line overrides for `[serve]`.
#[derive(Debug, Clone, Default)]
pub struct ServeOptions {
    pub port: Option<u16>,
    pub no_watch: bool,
}

// ============================================================================
// Server Entry Point
// ============================================================================

/// Build the site and serve it until Ctrl+C.
pub fn serve(root: &Path, options: &ServeOptions) -> Result<(), ServeError> {
    let config = config::load_config(root)?;
    let interface: IpAddr = config
        .serve
        .address
        .parse()
        .map_err(|_| ServeError::Address(config.serve.address.clone()))?;
    let base_port = options.port.unwrap_or(config.serve.port);
    let watch_enabled = config.serve.watch && !options.no_watch;

    let (server, addr) = try_bind_port(interface, base_port, MAX_PORT_RETRIES)?;
    let server = Arc::new(server);

    let site = Site::build(root, config, Some(addr.port()))?;
    let snapshot = Arc::new(ArcSwap::from_pointee(site));

    let server_for_signal = Arc::clone(&server);
    ctrlc::set_handler(move || {
        tracing::info!("shutting down...");
        server_for_signal.unblock();
    })?;

    tracing::info!("serving on http://{addr}");

    if watch_enabled {
        let root = root.to_path_buf();
        let port = addr.port();
        let snapshot = Arc::clone(&snapshot);
        std::thread::spawn(move || {
            if let Err(err) = watch::watch_for_changes_blocking(&root, port, &snapshot) {
                tracing::error!("watcher stopped: {err}");
            }
        });
    }

    for request in server.incoming_requests() {
        let site = snapshot.load_full();
        if let Err(e) = handle_request(request, &site) {
            tracing::warn!("request error: {e}");
        }
    }

    Ok(())
}

/// Try to bind to a port, retrying with incremented port numbers if in use.
fn try_bind_port(
    interface: IpAddr,
    base_port: u16,
    max_retries: u16,
) -> Result<(Server, SocketAddr), ServeError> {
    let mut last_error = String::new();
    let mut last_port = base_port;
    for offset in 0..max_retries {
        let port = base_port.saturating_add(offset);
        last_port = port;
        let addr = SocketAddr::new(interface, port);

        match Server::http(addr) {
            Ok(server) => {
                if offset > 0 {
                    tracing::warn!("port {base_port} in use, using {port} instead");
                }
                let bound = server.server_addr().to_ip().unwrap_or(addr);
                return Ok((server, bound));
            }
            Err(e) => last_error = e.to_string(),
        }
    }
    Err(ServeError::Bind {
        attempts: max_retries,
        first: base_port,
        last: last_port,
        message: last_error,
    })
}

// ============================================================================
// Request Handling
// ============================================================================

/// Answer one request from a snapshot and log it.
fn handle_request(request: Request, site: &Site) -> std::io::Result<()> {
    let start = Instant::now();
    let method = request.method().to_string();
    let uri = request.url().to_string();

    let path = uri.split('?').next().unwrap_or("/");

    let (response, is_media) = match path.strip_prefix("/media/") {
        Some(rel) => {
            let rel = urlencoding::decode(rel)
                .map(Cow::into_owned)
                .unwrap_or_else(|_| rel.to_string());
            (serve_media(site, &rel), true)
        }
        None => (respond_catching(site, path), false),
    };

    let status = response.status;
    let result = request.respond(into_http(response, is_media, site.ctx.debug));
    tracing::info!("[request] {status} {method} {uri} {:?}", start.elapsed());
    result
}

/// Route through the site, turning a panic into a 500 page.
fn respond_catching(site: &Site, path: &str) -> Response {
    panic::catch_unwind(AssertUnwindSafe(|| site.respond(path))).unwrap_or_else(|payload| {
        let message = panic_message(payload.as_ref());
        tracing::error!("panic while rendering {path}: {message}");
        site.error_response(500, Some(&message))
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Resolve a media path below the media directory, rejecting traversal.
fn media_path(media_dir: &Path, rel: &str) -> Option<PathBuf> {
    let rel = Path::new(rel);
    let clean = rel.components().all(|c| matches!(c, Component::Normal(_)));
    (clean && rel.components().next().is_some()).then(|| media_dir.join(rel))
}

fn serve_media(site: &Site, rel: &str) -> Response {
    let Some(path) = media_path(&site.media_dir(), rel).filter(|p| p.is_file()) else {
        return site.error_response(404, None);
    };
    match fs::read(&path) {
        Ok(body) => Response {
            status: 200,
            content_type: guess_content_type(&path),
            body,
            location: None,
        },
        Err(e) => {
            tracing::error!("failed to read {}: {e}", path.display());
            site.error_response(500, Some(&e.to_string()))
        }
    }
}

fn header(name: &str, value: &str) -> Option<Header> {
    Header::from_bytes(name.as_bytes(), value.as_bytes()).ok()
}

fn into_http(response: Response, is_media: bool, debug: bool) -> tiny_http::Response<std::io::Cursor<Vec<u8>>> {
    let mut http = tiny_http::Response::from_data(response.body)
        .with_status_code(StatusCode(response.status));

    let cache = if debug { "no-cache" } else { "max-age=172800" };
    let headers = SECURITY_HEADERS
        .iter()
        .copied()
        .chain(std::iter::once(("Content-Type", response.content_type)))
        .chain(response.location.as_deref().map(|l| ("Location", l)))
        .chain(is_media.then_some(("Cache-Control", cache)));

    for (name, value) in headers {
        match header(name, value) {
            Some(h) => http.add_header(h),
            None => tracing::warn!("dropping invalid header {name}: {value:?}"),
        }
    }
    http
}

// ============================================================================
// Content Type Detection
// ============================================================================

/// Guess MIME content type from file extension.
///
/// Returns `application/octet-stream` for unknown extensions.
fn guess_content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("html" | "htm") => CONTENT_HTML,
        Some("css") => CONTENT_CSS,
        Some("txt") => CONTENT_TEXT,
        Some("xml") => CONTENT_XML,
        Some("js" | "mjs") => "application/javascript; charset=utf-8",
        Some("json") => "application/json; charset=utf-8",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("avif") => "image/avif",
        Some("ico") => "image/x-icon",
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("pdf") => "application/pdf",
        Some("mp4") => "video/mp4",
        _ => "application/octet-stream",
    }
}
