//! Configuration file watcher for hot reload.
//!
//! Watches the parent directory rather than the file itself: editors that
//! save by rename would otherwise detach a file-level watch after the first
//! write.

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::AppConfig;

/// A watcher that reloads the configuration file when it changes.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<AppConfig>,
}

impl ConfigWatcher {
    /// Create a new ConfigWatcher.
    ///
    /// Returns the watcher and a receiver for validated configuration updates.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<AppConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching. The returned watcher must be kept alive for updates to flow.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let ConfigWatcher { path, update_tx } = self;
        let dir = watch_dir(&path);
        let target = path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if affects(&event, &target) => {
                    tracing::info!(path = ?target, "Config file changed, reloading");
                    match load_config(&target) {
                        Ok(config) => {
                            let _ = update_tx.send(config);
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "Reload rejected, keeping current configuration");
                        }
                    }
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = ?e, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?path, "Config watcher started");
        Ok(watcher)
    }
}

fn watch_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn affects(event: &Event, target: &Path) -> bool {
    matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_))
        && event
            .paths
            .iter()
            .any(|p| p.file_name() == target.file_name())
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, ModifyKind};

    #[test]
    fn bare_file_name_watches_current_dir() {
        assert_eq!(watch_dir(Path::new("slowwatch.toml")), PathBuf::from("."));
        assert_eq!(
            watch_dir(Path::new("/etc/slowwatch/config.toml")),
            PathBuf::from("/etc/slowwatch")
        );
    }

    #[test]
    fn only_target_file_events_trigger_reload() {
        let target = Path::new("/tmp/conf/slowwatch.toml");
        let hit = Event::new(EventKind::Modify(ModifyKind::Any))
            .add_path(PathBuf::from("/tmp/conf/slowwatch.toml"));
        let other = Event::new(EventKind::Create(CreateKind::File))
            .add_path(PathBuf::from("/tmp/conf/other.toml"));
        let removed = Event::new(EventKind::Remove(notify::event::RemoveKind::File))
            .add_path(PathBuf::from("/tmp/conf/slowwatch.toml"));

        assert!(affects(&hit, target));
        assert!(!affects(&other, target));
        assert!(!affects(&removed, target));
    }
}
