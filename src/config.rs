//! Site configuration module.
//!
//! Handles loading, validating, and merging `quillpost.toml`. Stock defaults
//! are serialized to a TOML table and the user's file is merged over them, so
//! a project only needs to spell out what it changes.
//!
//! ## Config File Location
//!
//! ```text
//! my-blog/
//! ├── quillpost.toml           # Project config (overrides stock defaults)
//! └── assets/
//!     ├── posts/               # Markdown sources
//!     └── media/               # Images and other static files
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! homepage = ["$featured", "$latest"]  # Sections shown on `/`
//! repository = ""                      # Where the exported site is published
//!
//! [site]
//! name = "My Blog"
//! host = "example.com"
//! tagline = "Notes and essays"
//! description = "A personal blog."
//! theme = "purple-simple"   # purple, green, pink, blue, red, black; append -simple
//! display = "grid"          # grid | list
//! analytics_tag = ""
//!
//! [[navbar_links]]
//! text = "About"
//! href = "/about/"
//!
//! [paths]
//! posts = "assets/posts"
//! media = "assets/media"
//! export = "dist"
//!
//! [limits]
//! latest = 9
//! latest_small = 4
//! featured = 3
//! related = 6
//!
//! [serve]
//! address = "127.0.0.1"
//! port = 4000
//! watch = true
//! ```
//!
//! Unknown keys are rejected to catch typos early.
//!
//! ## Derived Context
//!
//! Templates never read [`SiteConfig`] directly. [`SiteConfig::context`]
//! derives a [`SiteContext`] with the public URL, contact email, page title,
//! meta image and resolved [`Theme`]. In debug mode (the dev server) the
//! host becomes `localhost:{port}` and the URL scheme `http`.

use crate::store::Limits;
use crate::types::LeadImage;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// File name of the project config, relative to the project root.
pub const CONFIG_FILE: &str = "quillpost.toml";

/// Site-wide meta image, served from the media directory.
pub const META_IMAGE: &str = "/media/meta-img.webp";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Project configuration loaded from `quillpost.toml`.
///
/// All fields have defaults. Unknown keys are rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Section slugs shown on the homepage, in order.
    pub homepage: Vec<String>,
    /// Where the exported site is published. Informational only.
    pub repository: String,
    pub site: SiteInfo,
    pub navbar_links: Vec<SiteLink>,
    pub footer_links: Vec<SiteLink>,
    pub paths: PathsConfig,
    pub limits: Limits,
    pub serve: ServeConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            homepage: vec![crate::types::SECTION_LATEST.to_string()],
            repository: String::new(),
            site: SiteInfo::default(),
            navbar_links: Vec::new(),
            footer_links: Vec::new(),
            paths: PathsConfig::default(),
            limits: Limits::default(),
            serve: ServeConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteInfo {
    pub name: String,
    pub host: String,
    pub tagline: String,
    pub description: String,
    /// Theme name, optionally with a `-simple` suffix. Empty means default.
    pub theme: String,
    pub display: Display,
    /// Analytics measurement id. Empty disables the snippet.
    pub analytics_tag: String,
}

impl Default for SiteInfo {
    fn default() -> Self {
        Self {
            name: "Quillpost".to_string(),
            host: "localhost".to_string(),
            tagline: "A markdown blog".to_string(),
            description: "Posts and pages rendered from markdown.".to_string(),
            theme: String::new(),
            display: Display::Grid,
            analytics_tag: String::new(),
        }
    }
}

/// How post sections are laid out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Display {
    #[default]
    Grid,
    List,
}

impl Display {
    pub fn as_str(&self) -> &'static str {
        match self {
            Display::Grid => "grid",
            Display::List => "list",
        }
    }
}

/// An anchor link in the navbar or footer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SiteLink {
    pub text: String,
    pub href: String,
}

/// Directories, relative to the project root.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    pub posts: String,
    pub media: String,
    pub export: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            posts: "assets/posts".to_string(),
            media: "assets/media".to_string(),
            export: "dist".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServeConfig {
    pub address: String,
    pub port: u16,
    /// Rebuild on content changes.
    pub watch: bool,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: 4000,
            watch: true,
        }
    }
}

// =============================================================================
// Themes
// =============================================================================

/// A colour profile for the site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    pub primary: &'static str,
    pub secondary: &'static str,
    pub link: &'static str,
}

const SLATE_900: &str = "#0f172a";

const DEFAULT_THEME: Theme = Theme {
    primary: "#4338ca",
    secondary: SLATE_900,
    link: "#1d4ed8",
};

const THEMES: &[(&str, Theme)] = &[
    (
        "purple",
        Theme {
            primary: "#4f46e5",
            secondary: "#4338ca",
            link: "#2563eb",
        },
    ),
    (
        "green",
        Theme {
            primary: "#0f766e",
            secondary: "#0f766e",
            link: "#0369a1",
        },
    ),
    (
        "pink",
        Theme {
            primary: "#db2777",
            secondary: "#be185d",
            link: "#4f46e5",
        },
    ),
    (
        "blue",
        Theme {
            primary: "#0284c7",
            secondary: "#0284c7",
            link: "#2563eb",
        },
    ),
    (
        "red",
        Theme {
            primary: "#b91c1c",
            secondary: "#be123c",
            link: "#4f46e5",
        },
    ),
    (
        "black",
        Theme {
            primary: SLATE_900,
            secondary: SLATE_900,
            link: "#2563eb",
        },
    ),
];

impl Theme {
    /// Resolve a theme name. `""` is the default theme; a `-simple` suffix
    /// swaps the secondary colour for slate-900.
    pub fn lookup(name: &str) -> Option<Theme> {
        if name.is_empty() {
            return Some(DEFAULT_THEME);
        }
        let (base, simple) = match name.strip_suffix("-simple") {
            Some(base) => (base, true),
            None => (name, false),
        };
        let mut theme = THEMES.iter().find(|(n, _)| *n == base).map(|(_, t)| *t)?;
        if simple {
            theme.secondary = SLATE_900;
        }
        Some(theme)
    }
}

/// Generate CSS custom properties for a theme.
pub fn generate_theme_css(theme: &Theme) -> String {
    format!(
        r#":root {{
    --color-primary: {primary};
    --color-secondary: {secondary};
    --color-link: {link};
}}"#,
        primary = theme.primary,
        secondary = theme.secondary,
        link = theme.link,
    )
}

// =============================================================================
// Derived context
// =============================================================================

/// Everything templates need to know about the site, resolved once per build.
#[derive(Debug, Clone)]
pub struct SiteContext {
    pub name: String,
    pub host: String,
    pub url: String,
    pub email: String,
    /// `"{name} - {tagline}"`, used as the default page title.
    pub title: String,
    pub tagline: String,
    pub description: String,
    pub image: LeadImage,
    pub theme: Theme,
    pub display: Display,
    pub analytics_tag: String,
    pub navbar_links: Vec<SiteLink>,
    pub footer_links: Vec<SiteLink>,
    pub homepage: Vec<String>,
    pub debug: bool,
}

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if Theme::lookup(&self.site.theme).is_none() {
            return Err(ConfigError::Validation(format!(
                "site.theme: unknown theme [{}]",
                self.site.theme
            )));
        }
        if self.site.host.trim().is_empty() {
            return Err(ConfigError::Validation("site.host must not be empty".into()));
        }
        if self.homepage.iter().any(|s| s.trim().is_empty()) {
            return Err(ConfigError::Validation(
                "homepage entries must not be empty".into(),
            ));
        }
        for (key, value) in [
            ("paths.posts", &self.paths.posts),
            ("paths.media", &self.paths.media),
            ("paths.export", &self.paths.export),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Validation(format!("{key} must not be empty")));
            }
        }
        if self.limits.related == 0 {
            return Err(ConfigError::Validation(
                "limits.related must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Derive the template context. `debug_port` switches to a local host.
    pub fn context(&self, debug_port: Option<u16>) -> Result<SiteContext, ConfigError> {
        let theme = Theme::lookup(&self.site.theme).ok_or_else(|| {
            ConfigError::Validation(format!("site.theme: unknown theme [{}]", self.site.theme))
        })?;
        let title = format!("{} - {}", self.site.name, self.site.tagline);

        let (host, url) = match debug_port {
            Some(port) => {
                let host = format!("localhost:{port}");
                let url = format!("http://{host}");
                (host, url)
            }
            None => (self.site.host.clone(), format!("https://{}", self.site.host)),
        };

        Ok(SiteContext {
            name: self.site.name.clone(),
            email: format!("admin@{host}"),
            host,
            url,
            image: LeadImage::new(META_IMAGE, title.clone()),
            title,
            tagline: self.site.tagline.clone(),
            description: self.site.description.clone(),
            theme,
            display: self.site.display,
            analytics_tag: self.site.analytics_tag.clone(),
            navbar_links: self.navbar_links.clone(),
            footer_links: self.footer_links.clone(),
            homepage: self.homepage.clone(),
            debug: debug_port.is_some(),
        })
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer that user overrides are merged onto.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(SiteConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely, so arrays
///   such as `homepage` are replaced rather than appended to.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `quillpost.toml` from a project root as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(root: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = root.join(CONFIG_FILE);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<SiteConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: SiteConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the project config, falling back to stock defaults when absent.
pub fn load_config(root: &Path) -> Result<SiteConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(root)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `quillpost.toml`.
///
/// Used by the `gen-config` and `init` commands.
pub fn stock_config_toml() -> &'static str {
    r##"# Quillpost Configuration
# =======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults unless noted otherwise.
# Unknown keys will cause an error.

# Sections shown on the homepage, top to bottom.
# Reserved sections:
#   "$latest"   - the most recent posts
#   "$featured" - posts with `featured: true`
#   "$all"      - every post
# Any category slug (e.g. "golang") is also a section.
homepage = ["$latest"]

# Git repository the exported site is published to (informational).
repository = ""

# ---------------------------------------------------------------------------
# Site
# ---------------------------------------------------------------------------
[site]
name = "Quillpost"
# Public host name, without scheme. Used for absolute URLs, CNAME and email.
host = "localhost"
tagline = "A markdown blog"
description = "Posts and pages rendered from markdown."

# Colour theme: purple, green, pink, blue, red, black.
# Append "-simple" (e.g. "pink-simple") for a darker secondary colour.
# Leave empty for the default indigo theme.
theme = ""

# Post section layout: "grid" or "list".
display = "grid"

# Analytics measurement id. Leave empty to disable.
analytics_tag = ""

# ---------------------------------------------------------------------------
# Links (repeat the table for more links)
# ---------------------------------------------------------------------------
# [[navbar_links]]
# text = "About"
# href = "/about/"
#
# [[footer_links]]
# text = "Sitemap"
# href = "/sitemap/"

# ---------------------------------------------------------------------------
# Paths, relative to this file
# ---------------------------------------------------------------------------
[paths]
posts = "assets/posts"
media = "assets/media"
export = "dist"

# ---------------------------------------------------------------------------
# List sizes
# ---------------------------------------------------------------------------
[limits]
# Posts in the "$latest" section.
latest = 9
# Latest posts listed beside a single post.
latest_small = 4
# Posts in the "$featured" section.
featured = 3
# Related posts under a post. A category needs more posts than this
# before any related posts are shown.
related = 6

# ---------------------------------------------------------------------------
# Development server
# ---------------------------------------------------------------------------
[serve]
address = "127.0.0.1"
port = 4000
# Rebuild when posts, media or this file change.
watch = true
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_values() {
        let config = SiteConfig::default();
        assert_eq!(config.homepage, vec!["$latest"]);
        assert_eq!(config.paths.posts, "assets/posts");
        assert_eq!(config.paths.export, "dist");
        assert_eq!(config.serve.port, 4000);
        assert!(config.serve.watch);
        assert_eq!(config.limits, Limits::default());
        assert_eq!(config.site.display, Display::Grid);
    }

    #[test]
    fn parse_partial_config() {
        let toml = r#"
[site]
name = "Gopher Notes"
"#;
        let config: SiteConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.site.name, "Gopher Notes");
        assert_eq!(config.site.host, "localhost");
        assert_eq!(config.limits.related, 6);
    }

    #[test]
    fn unknown_keys_rejected() {
        let toml = r#"
[site]
nmae = "typo"
"#;
        assert!(toml::from_str::<SiteConfig>(toml).is_err());
    }

    #[test]
    fn unknown_display_rejected() {
        let toml = r#"
[site]
display = "masonry"
"#;
        assert!(toml::from_str::<SiteConfig>(toml).is_err());
    }

    // =========================================================================
    // Merging
    // =========================================================================

    #[test]
    fn merge_preserves_unrelated_keys() {
        let overlay: toml::Value = toml::from_str(
            r#"
[limits]
related = 3
"#,
        )
        .unwrap();
        let config = resolve_config(stock_defaults_value(), Some(overlay)).unwrap();
        assert_eq!(config.limits.related, 3);
        assert_eq!(config.limits.latest, 9);
        assert_eq!(config.serve.port, 4000);
    }

    #[test]
    fn merge_replaces_arrays() {
        let overlay: toml::Value =
            toml::from_str(r#"homepage = ["$featured", "golang"]"#).unwrap();
        let config = resolve_config(stock_defaults_value(), Some(overlay)).unwrap();
        assert_eq!(config.homepage, vec!["$featured", "golang"]);
    }

    #[test]
    fn links_parse_as_array_of_tables() {
        let overlay: toml::Value = toml::from_str(
            r#"
[[navbar_links]]
text = "About"
href = "/about/"

[[navbar_links]]
text = "Code"
href = "https://example.com/code"
"#,
        )
        .unwrap();
        let config = resolve_config(stock_defaults_value(), Some(overlay)).unwrap();
        assert_eq!(config.navbar_links.len(), 2);
        assert_eq!(config.navbar_links[1].text, "Code");
        assert!(config.footer_links.is_empty());
    }

    #[test]
    fn stock_config_parses_to_defaults() {
        let value: toml::Value = toml::from_str(stock_config_toml()).unwrap();
        let config = resolve_config(stock_defaults_value(), Some(value)).unwrap();
        let defaults = SiteConfig::default();
        assert_eq!(config.homepage, defaults.homepage);
        assert_eq!(config.limits, defaults.limits);
        assert_eq!(config.site.name, defaults.site.name);
        assert_eq!(config.paths.media, defaults.paths.media);
    }

    #[test]
    fn load_config_missing_file_uses_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.site.name, "Quillpost");
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILE),
            "[site]\nhost = \"gophers.dev\"\ntheme = \"green\"\n",
        )
        .unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.site.host, "gophers.dev");
        assert_eq!(config.site.theme, "green");
    }

    #[test]
    fn load_config_invalid_toml() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE), "[site\nname = ").unwrap();
        assert!(matches!(load_config(tmp.path()), Err(ConfigError::Toml(_))));
    }

    // =========================================================================
    // Validation
    // =========================================================================

    #[test]
    fn unknown_theme_fails_validation() {
        let mut config = SiteConfig::default();
        config.site.theme = "orange".into();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("orange"));
    }

    #[test]
    fn empty_host_fails_validation() {
        let mut config = SiteConfig::default();
        config.site.host = "  ".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_related_limit_fails_validation() {
        let mut config = SiteConfig::default();
        config.limits.related = 0;
        assert!(config.validate().is_err());
    }

    // =========================================================================
    // Themes and context
    // =========================================================================

    #[test]
    fn theme_lookup() {
        assert_eq!(Theme::lookup("").unwrap(), DEFAULT_THEME);
        assert_eq!(Theme::lookup("pink").unwrap().secondary, "#be185d");
        assert_eq!(Theme::lookup("pink-simple").unwrap().secondary, "#0f172a");
        assert_eq!(Theme::lookup("pink-simple").unwrap().primary, "#db2777");
        assert!(Theme::lookup("simple").is_none());
        assert!(Theme::lookup("-simple").is_none());
    }

    #[test]
    fn theme_css_has_variables() {
        let css = generate_theme_css(&Theme::lookup("red").unwrap());
        assert!(css.contains("--color-primary: #b91c1c;"));
        assert!(css.contains("--color-secondary: #be123c;"));
        assert!(css.contains("--color-link: #4f46e5;"));
    }

    #[test]
    fn context_derives_public_fields() {
        let mut config = SiteConfig::default();
        config.site.name = "Gopher Notes".into();
        config.site.tagline = "Go, mostly".into();
        config.site.host = "gophers.dev".into();

        let ctx = config.context(None).unwrap();
        assert_eq!(ctx.url, "https://gophers.dev");
        assert_eq!(ctx.email, "admin@gophers.dev");
        assert_eq!(ctx.title, "Gopher Notes - Go, mostly");
        assert_eq!(ctx.image.url, META_IMAGE);
        assert_eq!(ctx.image.alt, ctx.title);
        assert!(!ctx.debug);
    }

    #[test]
    fn debug_context_uses_localhost() {
        let mut config = SiteConfig::default();
        config.site.host = "gophers.dev".into();

        let ctx = config.context(Some(4001)).unwrap();
        assert_eq!(ctx.host, "localhost:4001");
        assert_eq!(ctx.url, "http://localhost:4001");
        assert_eq!(ctx.email, "admin@localhost:4001");
        assert!(ctx.debug);
    }
}
