//! Session telemetry — fire-and-forget named events.
//!
//! Emission never blocks the control task and never fails from the
//! caller's point of view. Sink errors are logged and dropped.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

/// Emits named session events with key/value properties.
pub trait EventLogger: Send + Sync {
    fn log_event(&self, name: &str, properties: &[(&str, String)]);
}

/// Writes events to the `keyhint::events` tracing target.
pub struct TracingEventLogger;

impl EventLogger for TracingEventLogger {
    fn log_event(&self, name: &str, properties: &[(&str, String)]) {
        let props = properties
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(" ");
        tracing::info!(target: "keyhint::events", event = name, %props);
    }
}

/// One line of the JSONL event log.
#[derive(Debug, Serialize)]
struct EventRecord {
    event: String,
    timestamp_ms: u128,
    properties: BTreeMap<String, String>,
}

/// Appends events as JSON lines to a file.
///
/// Events are handed to a background task over an unbounded channel;
/// the task exits once every logger handle has been dropped.
pub struct JsonlEventLogger {
    tx: UnboundedSender<EventRecord>,
}

impl JsonlEventLogger {
    /// Start the writer task. Must be called within a tokio runtime.
    ///
    /// Await the returned handle after dropping the logger to make sure
    /// every queued event reached the file.
    pub fn open(path: impl Into<PathBuf>) -> (Self, JoinHandle<()>) {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let handle = tokio::spawn(write_events(path.into(), rx));
        (Self { tx }, handle)
    }
}

impl EventLogger for JsonlEventLogger {
    fn log_event(&self, name: &str, properties: &[(&str, String)]) {
        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();

        let record = EventRecord {
            event: name.to_string(),
            timestamp_ms,
            properties: properties
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        };

        if self.tx.send(record).is_err() {
            tracing::debug!(event = name, "event log writer gone, event dropped");
        }
    }
}

async fn write_events(path: PathBuf, mut rx: UnboundedReceiver<EventRecord>) {
    let mut file = match tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .await
    {
        Ok(file) => file,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "cannot open event log");
            // Keep draining so senders never notice.
            while rx.recv().await.is_some() {}
            return;
        }
    };

    while let Some(record) = rx.recv().await {
        let mut line = match serde_json::to_vec(&record) {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(error = %e, "cannot encode event");
                continue;
            }
        };
        line.push(b'\n');

        if let Err(e) = file.write_all(&line).await {
            tracing::warn!(path = %path.display(), error = %e, "event log write failed");
        }
    }

    if let Err(e) = file.flush().await {
        tracing::warn!(path = %path.display(), error = %e, "event log flush failed");
    }
}
