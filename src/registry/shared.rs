use std::sync::Arc;

use metrics::{counter, gauge};
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::RwLock;

use super::{MarketFilter, NewMarket, Registry, RegistryError, RegistryState, ResolutionInput};
use crate::models::{EventRecord, Identity, Market};

/// Thread-safe handle to a single [`Registry`].
///
/// Every mutation holds the write lock for its whole duration, so mutations
/// apply one at a time in a single total order and events leave the sink in
/// that same order. Reads share the read lock and always observe the state
/// as of the last completed mutation.
#[derive(Clone)]
pub struct SharedRegistry {
    inner: Arc<RwLock<Registry>>,
}

/// Registry-level configuration and counters.
#[derive(Debug, Clone, Serialize)]
pub struct RegistrySummary {
    pub owner: Identity,
    pub resolver: Identity,
    pub fee: Decimal,
    pub balance: Decimal,
    pub surplus_retained: Decimal,
    pub market_count: u64,
    pub open_markets: usize,
    pub last_sequence: u64,
}

impl SharedRegistry {
    pub fn new(registry: Registry) -> Self {
        let open = registry.open_market_count();
        gauge!("open_markets").set(open as f64);
        Self {
            inner: Arc::new(RwLock::new(registry)),
        }
    }

    pub async fn create(&self, new: NewMarket, caller: &Identity) -> Result<u64, RegistryError> {
        let mut registry = self.inner.write().await;
        let result = registry.create(new, caller);
        if result.is_ok() {
            counter!("markets_created_total").increment(1);
        }
        observe("create", &result, &registry);
        result
    }

    pub async fn resolve(
        &self,
        id: u64,
        input: ResolutionInput,
        caller: &Identity,
    ) -> Result<(), RegistryError> {
        let mut registry = self.inner.write().await;
        let result = registry.resolve(id, input, caller);
        if result.is_ok() {
            counter!("markets_resolved_total").increment(1);
        }
        observe("resolve", &result, &registry);
        result
    }

    pub async fn cancel(&self, id: u64, caller: &Identity) -> Result<(), RegistryError> {
        let mut registry = self.inner.write().await;
        let result = registry.cancel(id, caller);
        if result.is_ok() {
            counter!("markets_cancelled_total").increment(1);
        }
        observe("cancel", &result, &registry);
        result
    }

    pub async fn set_fee(&self, fee: Decimal, caller: &Identity) -> Result<(), RegistryError> {
        let mut registry = self.inner.write().await;
        let result = registry.set_fee(fee, caller);
        observe("set_fee", &result, &registry);
        result
    }

    pub async fn set_resolver(
        &self,
        resolver: Identity,
        caller: &Identity,
    ) -> Result<(), RegistryError> {
        let mut registry = self.inner.write().await;
        let result = registry.set_resolver(resolver, caller);
        observe("set_resolver", &result, &registry);
        result
    }

    pub async fn transfer_ownership(
        &self,
        owner: Identity,
        caller: &Identity,
    ) -> Result<(), RegistryError> {
        let mut registry = self.inner.write().await;
        let result = registry.transfer_ownership(owner, caller);
        observe("transfer_ownership", &result, &registry);
        result
    }

    pub async fn withdraw(
        &self,
        to: Identity,
        amount: Decimal,
        caller: &Identity,
    ) -> Result<(), RegistryError> {
        let mut registry = self.inner.write().await;
        let result = registry.withdraw(to, amount, caller);
        if result.is_ok() {
            counter!("fees_withdrawn_total").increment(1);
        }
        observe("withdraw", &result, &registry);
        result
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    pub async fn market(&self, id: u64) -> Option<Market> {
        self.inner.read().await.market(id).cloned()
    }

    pub async fn markets(&self, filter: &MarketFilter) -> Vec<Market> {
        self.inner
            .read()
            .await
            .markets(filter)
            .into_iter()
            .cloned()
            .collect()
    }

    pub async fn summary(&self) -> RegistrySummary {
        let registry = self.inner.read().await;
        RegistrySummary {
            owner: registry.owner().clone(),
            resolver: registry.resolver().clone(),
            fee: registry.fee(),
            balance: registry.balance(),
            surplus_retained: registry.surplus_retained(),
            market_count: registry.market_count(),
            open_markets: registry.open_market_count(),
            last_sequence: registry.last_sequence(),
        }
    }

    pub async fn events_after(&self, after: u64, limit: usize) -> Vec<EventRecord> {
        self.inner.read().await.events_after(after, limit).to_vec()
    }

    pub async fn last_sequence(&self) -> u64 {
        self.inner.read().await.last_sequence()
    }

    /// Copy of the full persisted state.
    pub async fn snapshot(&self) -> RegistryState {
        self.inner.read().await.state().clone()
    }
}

fn observe<T>(op: &'static str, result: &Result<T, RegistryError>, registry: &Registry) {
    match result {
        Ok(_) => {
            gauge!("open_markets").set(registry.open_market_count() as f64);
        }
        Err(e) => {
            counter!("registry_rejections_total", "kind" => e.kind().as_str(), "op" => op)
                .increment(1);
            tracing::warn!(op, code = e.code(), error = %e, "Registry operation rejected");
        }
    }
}
