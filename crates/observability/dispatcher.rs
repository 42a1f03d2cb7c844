use std::{collections::BTreeMap, sync::Arc};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{Level, warn};

use super::alert_config::AlertOrigin;

const QUEUE_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub(crate) struct AlertRecord {
    pub(crate) level: Level,
    pub(crate) at: DateTime<Utc>,
    pub(crate) origin: AlertOrigin,
    pub(crate) target: String,
    pub(crate) location: Option<String>,
    pub(crate) message: Option<String>,
    pub(crate) fields: BTreeMap<String, String>,
    /// Span names from root to leaf.
    pub(crate) span_path: Vec<String>,
}

#[async_trait]
pub(crate) trait AlertSink: Send + Sync {
    async fn deliver(&self, record: &AlertRecord) -> Result<()>;
    fn name(&self) -> &'static str;
}

/// Hands alert records to a background task so logging never waits on the network.
#[derive(Clone)]
pub(crate) struct AlertDispatcher {
    tx: mpsc::Sender<AlertRecord>,
}

impl AlertDispatcher {
    pub(crate) fn spawn(sinks: Vec<Arc<dyn AlertSink>>) -> Self {
        let (tx, mut rx) = mpsc::channel::<AlertRecord>(QUEUE_CAPACITY);

        tokio::spawn(async move {
            while let Some(record) = rx.recv().await {
                for sink in &sinks {
                    if let Err(err) = sink.deliver(&record).await {
                        warn!(sink = sink.name(), error = %err, "observability: alert delivery failed");
                    }
                }
            }
        });

        Self { tx }
    }

    /// Drops the record when the queue is full or closed.
    pub(crate) fn dispatch(&self, record: AlertRecord) -> bool {
        match self.tx.try_send(record) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("observability: alert queue full; dropping alert");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }
}
