pub mod api;
pub mod config;
pub mod errors;
pub mod metrics;
pub mod models;
pub mod registry;
pub mod services;

use std::sync::Arc;
use tokio::sync::broadcast;

use crate::config::AppConfig;
use crate::models::EventRecord;
use crate::registry::{Clock, CreditLedger, Registry, RegistryState, SharedRegistry};

#[derive(Clone)]
pub struct AppState {
    pub registry: SharedRegistry,
    pub payouts: Arc<CreditLedger>,
    pub config: AppConfig,
    pub events_tx: broadcast::Sender<EventRecord>,
    pub metrics_handle: metrics_exporter_prometheus::PrometheusHandle,
}

impl AppState {
    /// Wire a registry over `state` whose events fan out on a broadcast
    /// channel and whose withdrawals land in an in-process credit ledger
    /// seeded from the journal.
    pub fn build(
        config: AppConfig,
        state: RegistryState,
        clock: Arc<dyn Clock>,
        metrics_handle: metrics_exporter_prometheus::PrometheusHandle,
    ) -> Self {
        let (events_tx, _) = broadcast::channel::<EventRecord>(config.event_channel_capacity);
        let payouts = Arc::new(CreditLedger::replaying(&state.journal));

        let registry = Registry::new(
            state,
            clock,
            Arc::new(events_tx.clone()),
            payouts.clone(),
        );

        Self {
            registry: SharedRegistry::new(registry),
            payouts,
            config,
            events_tx,
            metrics_handle,
        }
    }
}
