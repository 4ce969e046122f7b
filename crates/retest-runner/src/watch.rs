//! Filesystem watching for watch mode.
//!
//! A [`ChangeStream`] watches the project root recursively and yields
//! deduplicated batches of changed paths, coalescing editor-save bursts into
//! one batch so a save triggers one pass instead of several.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::event::{CreateKind, ModifyKind, RemoveKind, RenameMode};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use retest_core::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Event coalescing window.
const COALESCE_WINDOW_MS: u64 = 50;

/// Directory names whose contents never trigger a pass.
const IGNORED_DIRS: &[&str] = &["node_modules", ".git", "target", "dist", "build", "coverage"];

pub struct ChangeStream {
    batches: mpsc::UnboundedReceiver<HashSet<PathBuf>>,
    /// Keeps the OS watcher registered.
    _watcher: RecommendedWatcher,
}

impl ChangeStream {
    /// Watch `root` recursively. Must be called from within a tokio runtime.
    pub fn new(root: &Path) -> Result<Self, Error> {
        let (raw_tx, raw_rx) = mpsc::unbounded_channel();
        let (batch_tx, batches) = mpsc::unbounded_channel();

        let mut watcher = RecommendedWatcher::new(
            move |res: Result<Event, notify::Error>| match res {
                Ok(event) => {
                    if !should_process(&event.kind) {
                        return;
                    }
                    for path in event.paths {
                        if is_ignored(&path) {
                            continue;
                        }
                        if raw_tx.send(path).is_err() {
                            return;
                        }
                    }
                }
                Err(e) => warn!("watch error: {e}"),
            },
            Config::default(),
        )
        .map_err(|e| Error::other(format!("failed to create file watcher: {e}")))?;

        watcher
            .watch(root, RecursiveMode::Recursive)
            .map_err(|e| Error::other(format!("failed to watch {}: {e}", root.display())))?;
        debug!(root = %root.display(), "watching for file changes");

        tokio::spawn(coalesce(raw_rx, batch_tx));

        Ok(Self {
            batches,
            _watcher: watcher,
        })
    }

    /// Await the next batch of changed paths. `None` when the watcher has
    /// shut down.
    pub async fn next_batch(&mut self) -> Option<HashSet<PathBuf>> {
        self.batches.recv().await
    }
}

/// Collect raw paths into batches separated by a quiet window.
async fn coalesce(
    mut rx: mpsc::UnboundedReceiver<PathBuf>,
    tx: mpsc::UnboundedSender<HashSet<PathBuf>>,
) {
    while let Some(first) = rx.recv().await {
        let mut batch = HashSet::new();
        batch.insert(first);

        loop {
            match tokio::time::timeout(Duration::from_millis(COALESCE_WINDOW_MS), rx.recv()).await
            {
                Ok(Some(path)) => {
                    batch.insert(path);
                }
                Ok(None) | Err(_) => break,
            }
        }

        debug!(count = batch.len(), "coalesced file events");
        if tx.send(batch).is_err() {
            return;
        }
    }
}

/// Only content-level changes are worth a pass.
fn should_process(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(CreateKind::File)
            | EventKind::Modify(ModifyKind::Data(_))
            | EventKind::Modify(ModifyKind::Name(
                RenameMode::To | RenameMode::From | RenameMode::Both
            ))
            | EventKind::Remove(RemoveKind::File)
    )
}

fn is_ignored(path: &Path) -> bool {
    let in_ignored_dir = path.components().any(|c| {
        c.as_os_str()
            .to_str()
            .is_some_and(|name| IGNORED_DIRS.contains(&name))
    });
    if in_ignored_dir {
        return true;
    }

    // Editor droppings and other dotfiles
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|name| name.starts_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{DataChange, MetadataKind};

    #[test]
    fn test_ignores_dependency_and_output_dirs() {
        assert!(is_ignored(Path::new("/p/node_modules/lodash/index.js")));
        assert!(is_ignored(Path::new("/p/.git/HEAD")));
        assert!(is_ignored(Path::new("/p/dist/bundle.js")));
        assert!(is_ignored(Path::new("/p/coverage/lcov.info")));
        assert!(!is_ignored(Path::new("/p/src/leftPad.test.js")));
    }

    #[test]
    fn test_ignores_dotfiles() {
        assert!(is_ignored(Path::new("/p/src/.main.js.swp")));
        assert!(!is_ignored(Path::new("/p/src/main.js")));
    }

    #[test]
    fn test_event_kind_filter() {
        assert!(should_process(&EventKind::Create(CreateKind::File)));
        assert!(should_process(&EventKind::Modify(ModifyKind::Data(
            DataChange::Any
        ))));
        assert!(should_process(&EventKind::Remove(RemoveKind::File)));
        assert!(!should_process(&EventKind::Modify(ModifyKind::Metadata(
            MetadataKind::Any
        ))));
        assert!(!should_process(&EventKind::Create(CreateKind::Folder)));
    }

    #[tokio::test]
    async fn test_coalesce_merges_a_burst() {
        let (raw_tx, raw_rx) = mpsc::unbounded_channel();
        let (batch_tx, mut batches) = mpsc::unbounded_channel();

        raw_tx.send(PathBuf::from("/p/a.js")).unwrap();
        raw_tx.send(PathBuf::from("/p/b.js")).unwrap();
        raw_tx.send(PathBuf::from("/p/a.js")).unwrap();
        drop(raw_tx);

        coalesce(raw_rx, batch_tx).await;

        let batch = batches.recv().await.unwrap();
        assert_eq!(batch.len(), 2);
        assert!(batch.contains(Path::new("/p/a.js")));
        assert!(batch.contains(Path::new("/p/b.js")));
        assert!(batches.recv().await.is_none());
    }
}
