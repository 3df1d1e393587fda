//! Plugin data file watcher: a local stand-in for the control-plane transport.

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::config::loader::load_plugin_data;
use crate::plugin::PluginData;

/// Watches a JSON file of plugin data records.
///
/// Every change re-sends every record in the file, so consumers see
/// at-least-once delivery and must treat repeats as no-ops.
pub struct PluginDataWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<PluginData>,
}

impl PluginDataWatcher {
    /// Create a new PluginDataWatcher.
    ///
    /// Returns the watcher and a receiver for plugin data events.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<PluginData>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                update_tx,
            },
            update_rx,
        )
    }

    /// Send the file's current records. Returns how many were sent.
    pub fn publish_current(&self) -> usize {
        publish(&self.path, &self.update_tx)
    }

    /// Start watching the file in a background thread.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.update_tx.clone();
        let path = self.path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        tracing::info!("Plugin data change detected, republishing...");
                        publish(&path, &tx);
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Plugin data watcher started");
        Ok(watcher)
    }
}

fn publish(path: &Path, tx: &mpsc::UnboundedSender<PluginData>) -> usize {
    match load_plugin_data(path) {
        Ok(records) => {
            let count = records.len();
            for record in records {
                if tx.send(record).is_err() {
                    tracing::warn!("Plugin data receiver dropped");
                    return 0;
                }
            }
            count
        }
        Err(e) => {
            tracing::error!(
                "Failed to load plugin data: {}. Keeping current configuration.",
                e
            );
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_publish_current_sends_every_record() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"name":"cache","enabled":true,"config":"{{}}"}},{{"name":"cache","enabled":false}}]"#
        )
        .unwrap();

        let (watcher, mut rx) = PluginDataWatcher::new(file.path());
        assert_eq!(watcher.publish_current(), 2);

        let first = rx.try_recv().unwrap();
        assert!(first.enabled);
        let second = rx.try_recv().unwrap();
        assert!(!second.enabled);
        assert!(second.config.is_none());
    }

    #[test]
    fn test_unparsable_file_sends_nothing() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ broken").unwrap();

        let (watcher, mut rx) = PluginDataWatcher::new(file.path());
        assert_eq!(watcher.publish_current(), 0);
        assert!(rx.try_recv().is_err());
    }
}
