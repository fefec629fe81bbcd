//! Directory synchronization engine.
//!
//! One [`SyncEngine`] per session tracks which directories under the
//! session's home the client mirrors. Subscribing registers a live watch
//! and pushes a full pre-order snapshot of the subtree as
//! [`SyncFrame`]s; afterwards the session loop drains pending watch
//! events into incremental frames.
//!
//! Watch events that do not map cleanly onto entry creation or removal are
//! handled conservatively: the whole subscribed directory is removed on
//! the mirror side and re-snapshotted. No fine-grained diff is computed.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use dirsync_fs::{FsError, FsResult};
use dirsync_proto::SyncFrame;

/// An active watch on one directory under home.
struct Subscription {
    /// Absolute path of the watched directory.
    dir: PathBuf,
    /// Keep the watcher alive for the lifetime of the subscription.
    _watcher: RecommendedWatcher,
    /// Events forwarded from the watcher callback.
    events: mpsc::UnboundedReceiver<Event>,
}

/// Per-session subscription table.
pub struct SyncEngine {
    home: PathBuf,
    subscriptions: HashMap<String, Subscription>,
}

impl SyncEngine {
    /// Create an engine for the given home boundary.
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self {
            home: home.into(),
            subscriptions: HashMap::new(),
        }
    }

    /// Whether `name` is currently subscribed.
    pub fn is_subscribed(&self, name: &str) -> bool {
        self.subscriptions.contains_key(name)
    }

    /// Subscribe to a directory directly under home.
    ///
    /// Registers the watch first, then takes the snapshot, so changes that
    /// race the snapshot still surface as events on the next drain.
    /// Re-subscribing an already watched name replaces its watch. Returns
    /// the snapshot frames to push to the client.
    pub fn subscribe(&mut self, name: &str) -> FsResult<Vec<SyncFrame>> {
        // A subscription names a single entry directly under home; anything
        // that could walk the boundary is refused before touching the disk.
        if name.is_empty() || name == "." || name == ".." || name.contains('/') {
            return Err(FsError::PermissionDenied);
        }
        let dir = self.home.join(name);
        if !dir.is_dir() {
            return Err(FsError::not_found(name));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let mut watcher = RecommendedWatcher::new(
            move |result: Result<Event, notify::Error>| {
                if let Ok(event) = result {
                    let _ = tx.send(event);
                }
            },
            notify::Config::default(),
        )
        .map_err(|e| FsError::Io(io::Error::other(e)))?;
        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(|e| FsError::Io(io::Error::other(e)))?;

        let mut frames = Vec::new();
        snapshot(&dir, &mut frames)?;

        self.subscriptions.insert(
            name.to_string(),
            Subscription { dir, _watcher: watcher, events: rx },
        );
        Ok(frames)
    }

    /// Drop the watch on `name`.
    ///
    /// Returns the `remove` frame that tells the mirror to discard its
    /// copy, or `None` when nothing was subscribed (idempotent).
    pub fn unsubscribe(&mut self, name: &str) -> Option<SyncFrame> {
        self.subscriptions
            .remove(name)
            .map(|_| SyncFrame::Remove(name.to_string()))
    }

    /// Non-blocking drain of pending watch events across all
    /// subscriptions, translated into frames.
    pub fn drain(&mut self) -> Vec<SyncFrame> {
        let mut frames = Vec::new();
        for (name, subscription) in self.subscriptions.iter_mut() {
            while let Ok(event) = subscription.events.try_recv() {
                match event.kind {
                    EventKind::Access(_) => {}
                    EventKind::Create(_) => {
                        if let Some(path) = home_relative(&self.home, &event) {
                            frames.push(SyncFrame::Create(path));
                        }
                    }
                    EventKind::Remove(_) => {
                        if let Some(path) = home_relative(&self.home, &event) {
                            frames.push(SyncFrame::Remove(path));
                        }
                    }
                    // Anything else (in-place modification, renames the
                    // platform reports oddly): drop the mirror copy and
                    // push a fresh snapshot.
                    _ => {
                        frames.push(SyncFrame::Remove(name.clone()));
                        if subscription.dir.is_dir() {
                            if let Err(error) = snapshot(&subscription.dir, &mut frames) {
                                tracing::warn!(%name, %error, "resync snapshot failed");
                            }
                        }
                    }
                }
            }
        }
        frames
    }
}

/// First event path, made home-relative with `/` separators.
fn home_relative(home: &Path, event: &Event) -> Option<String> {
    let path = event.paths.first()?;
    let relative = path.strip_prefix(home).ok()?;
    let mut segments = Vec::new();
    for component in relative.components() {
        segments.push(component.as_os_str().to_string_lossy().into_owned());
    }
    if segments.is_empty() {
        None
    } else {
        Some(segments.join("/"))
    }
}

/// Pre-order snapshot push: `create`, `enter`, children, `exit`.
///
/// Plain files contribute a `create` frame only; children are visited in
/// sorted order so the frame stream is deterministic.
fn snapshot(dir: &Path, frames: &mut Vec<SyncFrame>) -> FsResult<()> {
    let name = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    frames.push(SyncFrame::Create(name.clone()));
    frames.push(SyncFrame::Enter(name));

    let mut children: Vec<PathBuf> = Vec::new();
    for entry in fs::read_dir(dir)? {
        children.push(entry?.path());
    }
    children.sort();

    for child in children {
        if child.is_dir() {
            snapshot(&child, frames)?;
        } else if let Some(name) = child.file_name() {
            frames.push(SyncFrame::Create(name.to_string_lossy().into_owned()));
        }
    }
    frames.push(SyncFrame::Exit);
    Ok(())
}
