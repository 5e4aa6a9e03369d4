use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use crate::models::{EventRecord, RegistryEvent};

/// Posts every registry event to an indexer webhook. Failures are logged but
/// never block or roll back the registry.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    http: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            url,
        }
    }

    /// POST one record as JSON. Failures are logged as warnings.
    pub async fn deliver(&self, record: &EventRecord) {
        match self.http.post(&self.url).json(record).send().await {
            Ok(resp) => {
                if !resp.status().is_success() {
                    tracing::warn!(
                        status = %resp.status(),
                        sequence = record.sequence,
                        market_id = ?record.event.market_id(),
                        "Event webhook returned non-2xx"
                    );
                }
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    sequence = record.sequence,
                    market_id = ?record.event.market_id(),
                    "Failed to deliver event webhook"
                );
            }
        }
    }
}

/// Drain the live event channel into the webhook until the channel closes.
/// A lagging forwarder skips ahead; indexers recover the gap from
/// `GET /api/events?after=`.
pub async fn run_event_forwarder(
    mut rx: broadcast::Receiver<EventRecord>,
    notifier: WebhookNotifier,
) {
    tracing::info!(url = %notifier.url, "Event webhook forwarder started");

    loop {
        match rx.recv().await {
            Ok(record) => {
                tracing::debug!(summary = %format_event_summary(&record), "Forwarding event");
                notifier.deliver(&record).await;
            }
            Err(RecvError::Lagged(n)) => {
                tracing::warn!(skipped = n, "Event forwarder lagged");
            }
            Err(RecvError::Closed) => break,
        }
    }

    tracing::warn!("Event channel closed, forwarder stopping");
}

/// One-line human summary of a record, for logs.
pub fn format_event_summary(record: &EventRecord) -> String {
    let body = match &record.event {
        RegistryEvent::MarketCreated(e) => format!(
            "market #{} created by {}: {:?} ({} outcomes, deadline {})",
            e.id,
            e.creator.short(),
            e.question,
            e.outcomes.len(),
            e.resolution_deadline.to_rfc3339(),
        ),
        RegistryEvent::MarketResolved(e) => format!(
            "market #{} resolved to {:?} (index {}, confidence {})",
            e.id, e.outcome_text, e.outcome_index, e.confidence,
        ),
        RegistryEvent::MarketCancelled(e) => {
            format!("market #{} cancelled by {}", e.id, e.cancelled_by.short())
        }
        RegistryEvent::FeeUpdated { old, new } => format!("fee {} -> {}", old, new),
        RegistryEvent::ResolverUpdated { old, new } => {
            format!("resolver {} -> {}", old.short(), new.short())
        }
        RegistryEvent::OwnershipTransferred { old, new } => {
            format!("owner {} -> {}", old.short(), new.short())
        }
        RegistryEvent::FeesWithdrawn { to, amount } => {
            format!("{} withdrawn to {}", amount, to.short())
        }
    };
    format!("[{}] {}", record.sequence, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Identity, MarketResolved};
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn record(event: RegistryEvent) -> EventRecord {
        EventRecord {
            sequence: 4,
            recorded_at: Utc::now(),
            event,
        }
    }

    #[test]
    fn test_summary_for_resolution() {
        let summary = format_event_summary(&record(RegistryEvent::MarketResolved(
            MarketResolved {
                id: 1,
                outcome_index: 0,
                outcome_text: "Yes".into(),
                resolver: Identity::from_low_u64(2),
                resolution_data: String::new(),
                sources: vec![],
                confidence: 88,
                proof_data: vec![],
                resolved_at: Utc::now(),
            },
        )));
        assert_eq!(
            summary,
            "[4] market #1 resolved to \"Yes\" (index 0, confidence 88)"
        );
    }

    #[test]
    fn test_summary_shortens_identities() {
        let summary = format_event_summary(&record(RegistryEvent::FeesWithdrawn {
            to: Identity::from_low_u64(0xabcd),
            amount: Decimal::new(5, 3),
        }));
        assert_eq!(summary, "[4] 0.005 withdrawn to 0x0000...abcd");
    }
}
