//! Plugin data events and their routing.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};

/// One plugin configuration record pushed by the control plane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginData {
    /// Plugin identifier (e.g., "cache").
    pub name: String,

    /// Whether the plugin accepts new configuration.
    #[serde(default)]
    pub enabled: bool,

    /// Opaque plugin-specific payload, usually JSON.
    #[serde(default)]
    pub config: Option<String>,
}

impl PluginData {
    pub fn new(name: impl Into<String>, enabled: bool, config: Option<&str>) -> Self {
        Self {
            name: name.into(),
            enabled,
            config: config.map(str::to_string),
        }
    }
}

/// Reacts to configuration changes for one named plugin.
pub trait PluginDataHandler: Send + Sync {
    /// The plugin name this handler owns.
    fn plugin_named(&self) -> &str;

    /// Apply a configuration record. Must not panic or block on I/O.
    fn handle_plugin(&self, data: &PluginData);
}

/// Routes plugin data events to the handler registered for their name.
#[derive(Default)]
pub struct PluginDataSubscriber {
    handlers: HashMap<String, Arc<dyn PluginDataHandler>>,
}

impl PluginDataSubscriber {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler, replacing any previous one for the same plugin.
    pub fn register(&mut self, handler: Arc<dyn PluginDataHandler>) {
        self.handlers.insert(handler.plugin_named().to_string(), handler);
    }

    /// Deliver one event. Returns false when no handler owns the plugin.
    pub fn on_plugin_changed(&self, data: &PluginData) -> bool {
        match self.handlers.get(&data.name) {
            Some(handler) => {
                handler.handle_plugin(data);
                true
            }
            None => {
                tracing::debug!(plugin = %data.name, "No handler for plugin data");
                false
            }
        }
    }

    /// Apply events in arrival order until the channel closes or shutdown fires.
    pub async fn run(
        self,
        mut events: mpsc::UnboundedReceiver<PluginData>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        tracing::info!(handlers = self.handlers.len(), "Plugin data subscriber starting");

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(data) => {
                        self.on_plugin_changed(&data);
                    }
                    None => {
                        tracing::info!("Plugin data channel closed");
                        break;
                    }
                },
                _ = shutdown.recv() => {
                    tracing::info!("Plugin data subscriber received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<PluginData>>,
    }

    impl PluginDataHandler for Recorder {
        fn plugin_named(&self) -> &str {
            "cache"
        }

        fn handle_plugin(&self, data: &PluginData) {
            self.seen.lock().push(data.clone());
        }
    }

    #[test]
    fn test_routes_by_name() {
        let recorder = Arc::new(Recorder::default());
        let mut subscriber = PluginDataSubscriber::new();
        subscriber.register(recorder.clone());

        assert!(subscriber.on_plugin_changed(&PluginData::new("cache", true, None)));
        assert!(!subscriber.on_plugin_changed(&PluginData::new("rewrite", true, None)));
        assert_eq!(recorder.seen.lock().len(), 1);
    }

    #[test]
    fn test_deserialize_defaults() {
        let data: PluginData = serde_json::from_str(r#"{"name":"cache"}"#).unwrap();
        assert_eq!(data, PluginData::new("cache", false, None));
    }

    #[tokio::test]
    async fn test_run_applies_in_order_then_stops_on_close() {
        let recorder = Arc::new(Recorder::default());
        let mut subscriber = PluginDataSubscriber::new();
        subscriber.register(recorder.clone());

        let (tx, rx) = mpsc::unbounded_channel();
        let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);
        for i in 0..3 {
            tx.send(PluginData::new("cache", true, Some(&i.to_string()))).unwrap();
        }
        drop(tx);

        subscriber.run(rx, shutdown_rx).await;

        let seen: Vec<_> = recorder
            .seen
            .lock()
            .iter()
            .map(|d| d.config.clone().unwrap())
            .collect();
        assert_eq!(seen, vec!["0", "1", "2"]);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let subscriber = PluginDataSubscriber::new();
        let (_tx, rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let handle = tokio::spawn(subscriber.run(rx, shutdown_rx));
        shutdown_tx.send(()).unwrap();
        handle.await.unwrap();
    }
}
