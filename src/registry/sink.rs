use std::sync::Mutex;

use tokio::sync::broadcast;

use crate::models::EventRecord;

/// Receives every committed event, in commit order.
pub trait EventSink: Send + Sync {
    fn emit(&self, record: &EventRecord);
}

/// Live fan-out to WebSocket clients and the webhook forwarder. Having no
/// subscribers is normal; the journal keeps the history.
impl EventSink for broadcast::Sender<EventRecord> {
    fn emit(&self, record: &EventRecord) {
        if self.send(record.clone()).is_err() {
            tracing::trace!(sequence = record.sequence, "No live event subscribers");
        }
    }
}

/// Keeps emitted records in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<EventRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<EventRecord> {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventSink for MemorySink {
    fn emit(&self, record: &EventRecord) {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(record.clone());
    }
}
