//! Frontend source watcher.

use std::path::{Path, PathBuf};

use notify::event::ModifyKind;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use walkdir::WalkDir;

#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("notify error: {0}")]
    Notify(#[from] notify::Error),

    #[error("failed to walk source tree: {0}")]
    Walk(#[from] walkdir::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchKind {
    Write,
    Create,
    Remove,
    Rename,
    Other,
}

impl From<&EventKind> for WatchKind {
    fn from(kind: &EventKind) -> Self {
        match kind {
            EventKind::Create(_) => WatchKind::Create,
            EventKind::Remove(_) => WatchKind::Remove,
            EventKind::Modify(ModifyKind::Name(_)) => WatchKind::Rename,
            EventKind::Modify(ModifyKind::Metadata(_)) => WatchKind::Other,
            EventKind::Modify(_) => WatchKind::Write,
            _ => WatchKind::Other,
        }
    }
}

/// One filesystem change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub path: PathBuf,
    pub kind: WatchKind,
}

impl WatchEvent {
    /// Split a notifier event into one event per affected path.
    pub fn from_notify(event: &Event) -> Vec<WatchEvent> {
        let kind = WatchKind::from(&event.kind);
        event
            .paths
            .iter()
            .map(|path| WatchEvent { path: path.clone(), kind })
            .collect()
    }
}

pub type WatchReceiver = mpsc::UnboundedReceiver<Result<Vec<WatchEvent>, WatchError>>;

/// Watches every directory of a source tree individually.
pub struct SourceWatcher {
    watcher: RecommendedWatcher,
    ignore_dirs: Vec<String>,
}

impl SourceWatcher {
    /// Start watching `root`. Events arrive on the returned receiver.
    pub fn start(root: &Path, ignore_dirs: Vec<String>) -> Result<(Self, WatchReceiver), WatchError> {
        let (tx, rx) = mpsc::unbounded_channel();

        let watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                let _ = tx.send(
                    res.map(|event| WatchEvent::from_notify(&event))
                        .map_err(WatchError::from),
                );
            },
            Config::default(),
        )?;

        let mut source = Self { watcher, ignore_dirs };
        let registered = source.register_tree(root)?;
        tracing::info!(root = %root.display(), directories = registered, "Source watcher started");
        Ok((source, rx))
    }

    /// Watch `dir` and every directory below it, skipping ignored names.
    /// Returns how many directories were registered.
    pub fn register_tree(&mut self, dir: &Path) -> Result<usize, WatchError> {
        let mut registered = 0;
        let ignore_dirs = self.ignore_dirs.clone();
        let walker = WalkDir::new(dir)
            .into_iter()
            .filter_entry(|entry| !is_ignored(&ignore_dirs, entry.path()));

        for entry in walker {
            let entry = entry?;
            if !entry.file_type().is_dir() {
                continue;
            }
            self.watcher.watch(entry.path(), RecursiveMode::NonRecursive)?;
            registered += 1;
        }
        Ok(registered)
    }
}

fn is_ignored(ignore_dirs: &[String], path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| ignore_dirs.iter().any(|ignored| ignored == name))
}
