//! Filesystem watch manager.
//!
//! Owns the OS event source and translates raw notify events into semantic
//! ones: directory add/remove mutates the watched set, file touches fan out
//! to the reactors.
//!
//! ```text
//! notify → bridge thread → event loop → classify/stat → dir policy
//!                                                     ↘ reactor fan-out
//! ```
//!
//! The watcher is armed at construction, so events occurring while the
//! supervisor finishes wiring are buffered instead of lost.

mod ignore;


pub use ignore::IgnoreMatcher;

use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher as _};
use rustc_hash::{FxHashMap, FxHashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tokio::sync::{mpsc, watch};

use crate::reactor::Reactor;
use crate::{debug, log};

/// Last observed kind of a cached path.
///
/// Remove events arrive after the inode is gone; the cache is then the only
/// way to tell a removed directory from a removed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileKind {
    Dir,
    File,
}

/// Semantic change derived from raw notify event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChangeKind {
    Created,
    Modified,
    Removed,
}

/// Recursive watch over the project root.
pub struct WatchManager {
    /// Channel receiving notify results (sync → async bridge)
    notify_rx: Option<std::sync::mpsc::Receiver<notify::Result<Event>>>,
    /// Watcher handle (must be kept alive)
    watcher: RecommendedWatcher,
    /// Root-level ignore rules
    matcher: IgnoreMatcher,
    /// Directories currently armed on the OS watcher
    watched: FxHashSet<PathBuf>,
    /// Last known kind per path
    stat_cache: FxHashMap<PathBuf, FileKind>,
}

impl WatchManager {
    /// Create a manager and arm the watch over `root`.
    ///
    /// The watcher starts immediately and buffers events while the caller
    /// finishes constructing reactors and the proxy.
    pub fn new(root: &Path, matcher: IgnoreMatcher) -> notify::Result<Self> {
        let (notify_tx, notify_rx) = std::sync::mpsc::channel();

        let watcher = notify::recommended_watcher(move |res| {
            let _ = notify_tx.send(res);
        })?;

        let mut manager = Self {
            notify_rx: Some(notify_rx),
            watcher,
            matcher,
            watched: FxHashSet::default(),
            stat_cache: FxHashMap::default(),
        };
        manager.handle_new_dir(root);

        Ok(manager)
    }

    /// Run the event loop until shutdown or channel closure.
    ///
    /// File events are dispatched to `reactors` in registration order.
    pub async fn run(mut self, reactors: Vec<Reactor>, mut shutdown_rx: watch::Receiver<bool>) {
        let Some(notify_rx) = self.notify_rx.take() else {
            return;
        };

        let (bridge_tx, mut bridge_rx) = mpsc::channel::<notify::Result<Event>>(64);

        // notify's callback is sync; a bridge thread feeds the async loop
        std::thread::spawn(move || {
            while let Ok(result) = notify_rx.recv() {
                if bridge_tx.blocking_send(result).is_err() {
                    break; // receiver dropped
                }
            }
        });

        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.changed() => break,
                maybe = bridge_rx.recv() => match maybe {
                    Some(Ok(event)) => self.handle_event(&reactors, event),
                    Some(Err(err)) => log!("error"; "watch error: {err}"),
                    None => break,
                },
            }
        }

        debug!("watch"; "event loop stopped");
    }

    /// Translate one notify event into semantic changes and apply them.
    fn handle_event(&mut self, reactors: &[Reactor], event: Event) {
        match event.kind {
            EventKind::Create(_) => {
                for path in &event.paths {
                    self.apply_change(reactors, path, ChangeKind::Created);
                }
            }
            EventKind::Remove(_) => {
                for path in &event.paths {
                    self.apply_change(reactors, path, ChangeKind::Removed);
                }
            }
            // Metadata-only changes (chmod/mtime noise) are discarded
            EventKind::Modify(ModifyKind::Metadata(_)) => {}
            EventKind::Modify(ModifyKind::Name(mode)) => self.apply_rename(reactors, mode, &event),
            EventKind::Modify(_) => {
                for path in &event.paths {
                    self.apply_change(reactors, path, ChangeKind::Modified);
                }
            }
            EventKind::Access(_) | EventKind::Any | EventKind::Other => {}
        }
    }

    /// Renames map to a remove of the old name and a create of the new one.
    fn apply_rename(&mut self, reactors: &[Reactor], mode: RenameMode, event: &Event) {
        match mode {
            RenameMode::Both if event.paths.len() == 2 => {
                self.apply_change(reactors, &event.paths[0], ChangeKind::Removed);
                self.apply_change(reactors, &event.paths[1], ChangeKind::Created);
            }
            RenameMode::From => {
                for path in &event.paths {
                    self.apply_change(reactors, path, ChangeKind::Removed);
                }
            }
            RenameMode::To => {
                for path in &event.paths {
                    self.apply_change(reactors, path, ChangeKind::Created);
                }
            }
            // Platform didn't say which side; let existence decide
            _ => {
                for path in &event.paths {
                    let kind = if path.exists() {
                        ChangeKind::Created
                    } else {
                        ChangeKind::Removed
                    };
                    self.apply_change(reactors, path, kind);
                }
            }
        }
    }

    fn apply_change(&mut self, reactors: &[Reactor], path: &Path, change: ChangeKind) {
        // Resolve the path's kind: cache first, then stat
        let kind = match self.stat_cache.get(path) {
            Some(&kind) => kind,
            None => match fs::metadata(path) {
                Ok(meta) => {
                    let kind = if meta.is_dir() {
                        FileKind::Dir
                    } else {
                        FileKind::File
                    };
                    self.stat_cache.insert(path.to_path_buf(), kind);
                    kind
                }
                // No cache entry and no inode: transient rename artifact
                Err(_) => {
                    debug!("watch"; "skipping transient path {}", path.display());
                    return;
                }
            },
        };

        if self.matcher.should_ignore(path, kind == FileKind::Dir) {
            return;
        }

        if kind == FileKind::Dir {
            match change {
                ChangeKind::Created | ChangeKind::Modified => self.handle_new_dir(path),
                ChangeKind::Removed => self.handle_removed_dir(path),
            }
            return;
        }

        if change == ChangeKind::Removed {
            // Keep the cache honest in case the path comes back as a dir
            self.stat_cache.remove(path);
        }

        for reactor in reactors {
            reactor.notify(path);
        }
    }

    /// Arm a watch on `path` and every non-ignored directory beneath it.
    ///
    /// The caller has already classified `path` itself as interesting; the
    /// ignore rules prune the walk below it. Walk errors on individual
    /// entries are swallowed.
    fn handle_new_dir(&mut self, path: &Path) {
        self.stat_cache.insert(path.to_path_buf(), FileKind::Dir);

        if let Err(err) = self.watcher.watch(path, RecursiveMode::NonRecursive) {
            log!("error"; "failed to watch {} with {err}", path.display());
        } else if self.watched.insert(path.to_path_buf()) {
            log!("watch"; "watching {}", path.display());
        }

        let Ok(entries) = fs::read_dir(path) else {
            return;
        };

        for entry in entries.flatten() {
            let entry_path = entry.path();
            let Ok(file_type) = entry.file_type() else {
                continue;
            };
            let is_dir = file_type.is_dir();

            self.stat_cache.insert(
                entry_path.clone(),
                if is_dir { FileKind::Dir } else { FileKind::File },
            );

            if self.matcher.should_ignore(&entry_path, is_dir) {
                continue;
            }

            if is_dir {
                self.handle_new_dir(&entry_path);
            }
        }
    }

    /// Disarm `path` and evict it and every descendant from the watch state.
    ///
    /// Descendant checks are component-wise, so `a/b` never captures `a/bc`.
    fn handle_removed_dir(&mut self, path: &Path) {
        if let Err(err) = self.watcher.unwatch(path)
            && !matches!(err.kind, notify::ErrorKind::WatchNotFound)
        {
            log!("error"; "failed to unwatch {} with {err}", path.display());
            return;
        }

        self.watched.retain(|watched| !watched.starts_with(path));
        self.stat_cache.retain(|cached, _| !cached.starts_with(path));

        log!("watch"; "unwatched {}", path.display());
    }

    #[cfg(test)]
    fn watched(&self) -> &FxHashSet<PathBuf> {
        &self.watched
    }

    #[cfg(test)]
    fn cached_paths(&self) -> Vec<PathBuf> {
        self.stat_cache.keys().cloned().collect()
    }
}
