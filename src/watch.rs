//! File watcher for live reload.
//!
//! Watches the posts directory, the media directory and `quillpost.toml`.
//! Bursts of events are debounced, then the whole site is rebuilt off to the
//! side. Only a successful rebuild replaces the served snapshot; a failed one
//! is logged and the previous site keeps serving.

use crate::config::CONFIG_FILE;
use crate::site::Site;
use arc_swap::ArcSwap;
use notify::{Event, EventKind, RecursiveMode, Watcher};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{RecvTimeoutError, channel};
use std::time::{Duration, Instant};

/// Debounce window: wait this long after the last event before rebuilding
const DEBOUNCE_MS: u64 = 300;

/// Collects changed paths until the filesystem has been quiet for a while.
struct Debouncer {
    pending: HashSet<PathBuf>,
    last_event: Option<Instant>,
}

impl Debouncer {
    fn new() -> Self {
        Self {
            pending: HashSet::new(),
            last_event: None,
        }
    }

    fn add(&mut self, paths: impl IntoIterator<Item = PathBuf>) {
        let before = self.pending.len();
        self.pending.extend(paths);
        if self.pending.len() > before || self.last_event.is_none() {
            self.last_event = Some(Instant::now());
        }
    }

    fn ready_at(&self, now: Instant) -> bool {
        !self.pending.is_empty()
            && self
                .last_event
                .is_some_and(|t| now.duration_since(t) >= Duration::from_millis(DEBOUNCE_MS))
    }

    fn ready(&self) -> bool {
        self.ready_at(Instant::now())
    }

    fn take(&mut self) -> Vec<PathBuf> {
        self.last_event = None;
        self.pending.drain().collect()
    }

    fn timeout(&self) -> Duration {
        if self.pending.is_empty() {
            Duration::from_secs(60)
        } else {
            Duration::from_millis(DEBOUNCE_MS)
        }
    }
}

/// Editor backups, swap files and dotfiles.
fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "tmp")
        || name.ends_with('~')
        || name.starts_with('.')
}

fn is_relevant(event: &Event) -> bool {
    matches!(
        event.kind,
        EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_)
    )
}

fn relevant_paths(event: Event) -> Vec<PathBuf> {
    if !is_relevant(&event) {
        return Vec::new();
    }
    event
        .paths
        .into_iter()
        .filter(|p| !is_temp_file(p))
        .collect()
}

/// Rebuild the site and swap it in. Returns whether the swap happened.
pub fn rebuild(root: &Path, port: u16, snapshot: &ArcSwap<Site>) -> bool {
    let start = Instant::now();
    match Site::load(root, Some(port)) {
        Ok(site) => {
            snapshot.store(Arc::new(site));
            tracing::info!("rebuilt in {:?}", start.elapsed());
            true
        }
        Err(e) => {
            tracing::error!("rebuild failed, keeping previous site: {e}");
            false
        }
    }
}

/// Block the current thread watching for changes.
///
/// Watched directories are taken from the snapshot at start-up; moving
/// `[paths]` in the config needs a restart.
pub fn watch_for_changes_blocking(
    root: &Path,
    port: u16,
    snapshot: &ArcSwap<Site>,
) -> notify::Result<()> {
    let (tx, rx) = channel::<notify::Result<Event>>();
    let mut watcher = notify::recommended_watcher(tx)?;

    let current = snapshot.load_full();
    let targets = [
        (current.posts_dir(), RecursiveMode::Recursive),
        (current.media_dir(), RecursiveMode::Recursive),
        (root.join(CONFIG_FILE), RecursiveMode::NonRecursive),
    ];
    drop(current);

    for (path, mode) in targets {
        if path.exists() {
            watcher.watch(&path, mode)?;
            tracing::debug!("watching {}", path.display());
        }
    }

    let mut debouncer = Debouncer::new();
    loop {
        match rx.recv_timeout(debouncer.timeout()) {
            Ok(Ok(event)) => debouncer.add(relevant_paths(event)),
            Ok(Err(e)) => tracing::warn!("watch error: {e}"),
            Err(RecvTimeoutError::Timeout) if debouncer.ready() => {
                let changed = debouncer.take();
                tracing::info!("{} file(s) changed, rebuilding", changed.len());
                rebuild(root, port, snapshot);
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use std::fs;
    use tempfile::TempDir;

    // =========================================================================
    // Debouncer
    // =========================================================================

    #[test]
    fn debouncer_waits_for_quiet() {
        let mut d = Debouncer::new();
        assert!(!d.ready());
        d.add([PathBuf::from("a.md")]);
        let now = Instant::now();
        assert!(!d.ready_at(now));
        assert!(d.ready_at(now + Duration::from_millis(DEBOUNCE_MS + 10)));
    }

    #[test]
    fn debouncer_take_drains() {
        let mut d = Debouncer::new();
        d.add([PathBuf::from("a.md"), PathBuf::from("a.md"), PathBuf::from("b.md")]);
        let mut taken = d.take();
        taken.sort();
        assert_eq!(taken, vec![PathBuf::from("a.md"), PathBuf::from("b.md")]);
        assert!(!d.ready_at(Instant::now() + Duration::from_secs(5)));
        assert_eq!(d.timeout(), Duration::from_secs(60));
    }

    #[test]
    fn temp_files_are_ignored() {
        assert!(is_temp_file(Path::new("post.md~")));
        assert!(is_temp_file(Path::new(".post.md.swp")));
        assert!(is_temp_file(Path::new("x.tmp")));
        assert!(!is_temp_file(Path::new("post.md")));
    }

    // =========================================================================
    // Rebuild
    // =========================================================================

    fn project() -> TempDir {
        let tmp = TempDir::new().unwrap();
        write_sources(
            &tmp.path().join("assets/posts"),
            &[("a.md", post_md("first", "Golang", "2024-01-01"))],
        );
        tmp
    }

    #[test]
    fn successful_rebuild_swaps_snapshot() {
        let tmp = project();
        let snapshot = ArcSwap::from_pointee(Site::load(tmp.path(), Some(4000)).unwrap());

        write_sources(
            &tmp.path().join("assets/posts"),
            &[("b.md", post_md("second", "Golang", "2024-02-01"))],
        );
        assert!(rebuild(tmp.path(), 4000, &snapshot));
        assert_eq!(snapshot.load().store.all_posts().len(), 2);
    }

    #[test]
    fn failed_rebuild_keeps_previous_snapshot() {
        let tmp = project();
        let snapshot = ArcSwap::from_pointee(Site::load(tmp.path(), Some(4000)).unwrap());
        let before = snapshot.load_full();

        fs::write(
            tmp.path().join("assets/posts/b.md"),
            post_md("first", "Golang", "2024-02-01"),
        )
        .unwrap();
        assert!(!rebuild(tmp.path(), 4000, &snapshot));
        assert!(Arc::ptr_eq(&before, &snapshot.load_full()));
    }
}
