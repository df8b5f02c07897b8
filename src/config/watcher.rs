//! Hot reload of the mediator configuration file.
//!
//! The parent directory is watched rather than the file itself: editors that
//! save by writing a temporary file and renaming it over the original replace
//! the inode, which silently ends a watch placed on the file.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use notify::{Config, Event, EventHandler, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::MediatorConfig;

/// Watches one configuration file and publishes every new valid version of it.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<MediatorConfig>,
}

impl ConfigWatcher {
    /// Create a watcher for `path` and the receiver its updates arrive on.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<MediatorConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        (
            Self {
                path: path.to_path_buf(),
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching. The returned handle must be kept alive.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let dir = watched_dir(&self.path);
        let reloader = Reloader::new(self.path.clone(), self.update_tx);

        let mut watcher = RecommendedWatcher::new(
            reloader,
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, dir = ?dir, "Config watcher started");
        Ok(watcher)
    }
}

/// Directory holding `path`; a bare file name lives in the working directory.
fn watched_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Event handler reloading the file when an event in its directory names it.
struct Reloader {
    path: PathBuf,
    file_name: Option<OsString>,
    last: Option<MediatorConfig>,
    tx: mpsc::UnboundedSender<MediatorConfig>,
}

impl Reloader {
    fn new(path: PathBuf, tx: mpsc::UnboundedSender<MediatorConfig>) -> Self {
        let file_name = path.file_name().map(OsString::from);
        let last = load_config(&path).ok();
        Self {
            path,
            file_name,
            last,
            tx,
        }
    }

    fn concerns_file(&self, event: &Event) -> bool {
        if event.kind.is_access() || event.kind.is_remove() {
            return false;
        }
        event
            .paths
            .iter()
            .any(|p| p.file_name().map(OsString::from) == self.file_name)
    }

    fn reload(&mut self) {
        let config = match load_config(&self.path) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!(
                    path = ?self.path,
                    error = %e,
                    "Failed to reload mediator config, keeping current rules"
                );
                return;
            }
        };

        if self.last.as_ref() == Some(&config) {
            tracing::debug!(path = ?self.path, "Mediator config unchanged, skipping reload");
            return;
        }

        tracing::info!(path = ?self.path, "Mediator config changed, applying");
        self.last = Some(config.clone());
        if self.tx.send(config).is_err() {
            tracing::warn!("Config update receiver dropped");
        }
    }
}

impl EventHandler for Reloader {
    fn handle_event(&mut self, event: notify::Result<Event>) {
        match event {
            Ok(event) if self.concerns_file(&event) => self.reload(),
            Ok(_) => {}
            Err(e) => tracing::error!(error = ?e, "Config watch error"),
        }
    }
}
