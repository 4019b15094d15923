//! Configuration file watcher for hot reload.
//!
//! The parent directory is watched rather than the file itself so that
//! editors which replace the file on save (write to temp, rename) are seen.
//! Only events touching the configured file trigger a reload.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::ProxyConfig;

/// Reloads the configuration file when it changes on disk.
pub struct ConfigWatcher {
    path: PathBuf,
    updates: mpsc::UnboundedSender<ProxyConfig>,
}

impl ConfigWatcher {
    /// Validated configurations are sent to `updates`.
    pub fn new(path: &Path, updates: mpsc::UnboundedSender<ProxyConfig>) -> Self {
        Self {
            path: path.to_path_buf(),
            updates,
        }
    }

    /// Start watching on notify's background thread.
    ///
    /// The returned watcher must be kept alive for updates to keep flowing.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let directory = watch_root(&self.path);
        let path = self.path.clone();
        let updates = self.updates;

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if is_relevant(&event, &path) => reload(&path, &updates),
                Ok(_) => {}
                Err(e) => tracing::error!(error = ?e, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&directory, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Config watcher started");
        Ok(watcher)
    }
}

/// Load `path` and forward it; an invalid file keeps the running configuration.
pub fn reload(path: &Path, updates: &mpsc::UnboundedSender<ProxyConfig>) {
    tracing::info!(path = ?path, "Reloading configuration");
    match load_config(path) {
        Ok(config) => {
            if updates.send(config).is_err() {
                tracing::debug!("Server no longer accepting configuration updates");
            }
        }
        Err(e) => tracing::error!(
            error = %e,
            "Failed to reload config, keeping current configuration"
        ),
    }
}

fn watch_root(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn is_relevant(event: &Event, path: &Path) -> bool {
    (event.kind.is_modify() || event.kind.is_create())
        && event
            .paths
            .iter()
            .any(|p| p.file_name() == path.file_name())
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, EventKind, ModifyKind};
    use std::io::Write;

    #[test]
    fn test_watch_root_is_parent_directory() {
        assert_eq!(watch_root(Path::new("/etc/edge/proxy.toml")), PathBuf::from("/etc/edge"));
        assert_eq!(watch_root(Path::new("proxy.toml")), PathBuf::from("."));
    }

    #[test]
    fn test_only_events_for_config_file_are_relevant() {
        let path = Path::new("/etc/edge/proxy.toml");
        let ours = Event::new(EventKind::Modify(ModifyKind::Any))
            .add_path(PathBuf::from("/etc/edge/proxy.toml"));
        let other = Event::new(EventKind::Create(CreateKind::File))
            .add_path(PathBuf::from("/etc/edge/other.toml"));
        let removed = Event::new(EventKind::Remove(notify::event::RemoveKind::File))
            .add_path(PathBuf::from("/etc/edge/proxy.toml"));

        assert!(is_relevant(&ours, path));
        assert!(!is_relevant(&other, path));
        assert!(!is_relevant(&removed, path));
    }

    #[test]
    fn test_reload_sends_valid_config_only() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[upstreams]\napi_origin = \"https://api.example.com\"").unwrap();

        reload(file.path(), &tx);
        let config = rx.try_recv().unwrap();
        assert_eq!(config.upstreams.api_origin, "https://api.example.com");

        std::fs::write(file.path(), "[timeouts]\nupstream_secs = 0\n").unwrap();
        reload(file.path(), &tx);
        assert!(rx.try_recv().is_err());
    }
}
