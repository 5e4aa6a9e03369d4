pub mod admin;
pub mod clock;
pub mod error;
pub mod payout;
pub mod shared;
pub mod sink;
pub mod snapshot;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ErrorKind, RegistryError, Role, TransferError};
pub use payout::{CreditLedger, Payout};
pub use shared::{RegistrySummary, SharedRegistry};
pub use sink::{EventSink, MemorySink};
pub use snapshot::{load_snapshot, save_snapshot};

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::models::{
    Cancellation, EventRecord, Identity, Market, MarketCancelled, MarketCreated, MarketResolved,
    MarketStatus, RegistryEvent, Resolution,
};

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Everything a caller supplies to open a market.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMarket {
    pub question: String,
    #[serde(default)]
    pub description: String,
    pub outcomes: Vec<String>,
    pub resolution_deadline: DateTime<Utc>,
    /// Native value sent along with the call.
    pub paid_amount: Decimal,
}

/// The oracle's verdict for one market.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResolutionInput {
    pub outcome_index: usize,
    #[serde(default)]
    pub resolution_data: String,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub confidence: u8,
    #[serde(default, with = "crate::models::base64_bytes")]
    pub proof_data: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct MarketFilter {
    pub status: Option<MarketStatus>,
    pub creator: Option<Identity>,
    pub offset: usize,
    pub limit: Option<usize>,
}

// ---------------------------------------------------------------------------
// RegistryState (everything that is persisted)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryState {
    pub markets: BTreeMap<u64, Market>,
    /// Highest id issued so far; the next market gets `market_count + 1`.
    pub market_count: u64,
    pub owner: Identity,
    pub resolver: Identity,
    pub fee: Decimal,
    /// Withdrawable value held by the registry.
    pub balance: Decimal,
    /// Portion of `balance` that came from overpaid creation fees.
    pub surplus_retained: Decimal,
    pub journal: Vec<EventRecord>,
}

impl RegistryState {
    pub fn new(owner: Identity, resolver: Identity, fee: Decimal) -> Result<Self, RegistryError> {
        if owner.is_zero() || resolver.is_zero() {
            return Err(RegistryError::ZeroIdentity);
        }
        if fee < Decimal::ZERO {
            return Err(RegistryError::InvalidFee(fee));
        }

        Ok(Self {
            markets: BTreeMap::new(),
            market_count: 0,
            owner,
            resolver,
            fee,
            balance: Decimal::ZERO,
            surplus_retained: Decimal::ZERO,
            journal: Vec::new(),
        })
    }

    /// Check the structural invariants of a state loaded from outside.
    pub fn validate(&self) -> Result<(), String> {
        if self.markets.len() as u64 != self.market_count {
            return Err(format!(
                "market_count {} does not match {} stored markets",
                self.market_count,
                self.markets.len()
            ));
        }
        for (expected, (key, market)) in (1u64..).zip(self.markets.iter()) {
            if *key != expected || market.id != expected {
                return Err(format!("market ids are not contiguous at {}", expected));
            }
            if market.possible_outcomes.len() < 2 {
                return Err(format!("market {} has fewer than 2 outcomes", key));
            }
            let index_ok = match (market.status, market.outcome_index) {
                (MarketStatus::Resolved, Some(i)) => i < market.possible_outcomes.len(),
                (MarketStatus::Resolved, None) => false,
                (_, Some(_)) => false,
                (_, None) => true,
            };
            if !index_ok {
                return Err(format!("market {} has an inconsistent outcome index", key));
            }
            let has_record = market.resolution.is_some() || market.cancellation.is_some();
            if market.status.is_terminal() != has_record {
                return Err(format!("market {} status does not match its history", key));
            }
        }
        for (expected, record) in (1u64..).zip(self.journal.iter()) {
            if record.sequence != expected {
                return Err(format!("journal sequence gap at {}", expected));
            }
        }
        if self.owner.is_zero() || self.resolver.is_zero() {
            return Err("owner and resolver must be non-zero".into());
        }
        if self.balance < Decimal::ZERO {
            return Err("balance is negative".into());
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Owns every market record and the fee/role configuration. Each operation
/// checks all of its preconditions before touching state, so a rejected call
/// leaves the registry exactly as it was.
pub struct Registry {
    state: RegistryState,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn EventSink>,
    payout: Arc<dyn Payout>,
}

impl Registry {
    pub fn new(
        state: RegistryState,
        clock: Arc<dyn Clock>,
        sink: Arc<dyn EventSink>,
        payout: Arc<dyn Payout>,
    ) -> Self {
        Self {
            state,
            clock,
            sink,
            payout,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Open a new market and return its id.
    pub fn create(&mut self, new: NewMarket, caller: &Identity) -> Result<u64, RegistryError> {
        let now = self.clock.now();

        if new.paid_amount < self.state.fee {
            return Err(RegistryError::InsufficientFee {
                provided: new.paid_amount,
                required: self.state.fee,
            });
        }
        if new.question.trim().is_empty() {
            return Err(RegistryError::QuestionRequired);
        }
        if new.outcomes.len() < 2 {
            return Err(RegistryError::InsufficientOutcomes {
                provided: new.outcomes.len(),
            });
        }
        if new.resolution_deadline <= now {
            return Err(RegistryError::ResolutionNotFuture {
                deadline: new.resolution_deadline,
                now,
            });
        }

        let surplus = new.paid_amount - self.state.fee;
        let overflow = || RegistryError::BalanceOverflow {
            balance: self.state.balance,
            paid: new.paid_amount,
        };
        let balance = self
            .state
            .balance
            .checked_add(new.paid_amount)
            .ok_or_else(overflow)?;
        let surplus_retained = self
            .state
            .surplus_retained
            .checked_add(surplus)
            .ok_or_else(overflow)?;

        let id = self.state.market_count + 1;

        let market = Market {
            id,
            creator: caller.clone(),
            question: new.question,
            description: new.description,
            possible_outcomes: new.outcomes,
            created_at: now,
            resolution_deadline: new.resolution_deadline,
            status: MarketStatus::Open,
            outcome_index: None,
            resolution: None,
            cancellation: None,
        };
        let event = RegistryEvent::MarketCreated(MarketCreated::from(&market));

        self.state.market_count = id;
        self.state.balance = balance;
        self.state.surplus_retained = surplus_retained;
        self.state.markets.insert(id, market);
        self.commit(event, now);

        tracing::info!(
            market_id = id,
            creator = %caller,
            paid = %new.paid_amount,
            surplus = %surplus,
            "Market created"
        );

        Ok(id)
    }

    /// Record the oracle's verdict. Resolver only, at or after the deadline.
    pub fn resolve(
        &mut self,
        id: u64,
        input: ResolutionInput,
        caller: &Identity,
    ) -> Result<(), RegistryError> {
        let now = self.clock.now();
        let resolver = &self.state.resolver;

        let market = self
            .state
            .markets
            .get_mut(&id)
            .ok_or(RegistryError::MarketNotFound(id))?;

        if caller != resolver {
            return Err(RegistryError::Unauthorized {
                required: Role::Resolver,
            });
        }
        if !market.is_open() {
            return Err(RegistryError::MarketNotOpen {
                id,
                status: market.status,
            });
        }
        if !market.can_resolve(now) {
            return Err(RegistryError::TooEarly {
                now,
                deadline: market.resolution_deadline,
            });
        }
        let outcome_text = market
            .outcome_text(input.outcome_index)
            .map(str::to_owned)
            .ok_or(RegistryError::InvalidOutcomeIndex {
                index: input.outcome_index,
                bound: market.outcome_count(),
            })?;

        let digest = proof_digest(&input.proof_data);
        let event = RegistryEvent::MarketResolved(MarketResolved {
            id,
            outcome_index: input.outcome_index,
            outcome_text: outcome_text.clone(),
            resolver: caller.clone(),
            resolution_data: input.resolution_data.clone(),
            sources: input.sources.clone(),
            confidence: input.confidence,
            proof_data: input.proof_data.clone(),
            resolved_at: now,
        });

        market.status = MarketStatus::Resolved;
        market.outcome_index = Some(input.outcome_index);
        market.resolution = Some(Resolution {
            outcome_index: input.outcome_index,
            resolution_data: input.resolution_data,
            sources: input.sources,
            confidence: input.confidence,
            proof_data: input.proof_data,
            resolved_at: now,
            resolved_by: caller.clone(),
        });
        self.commit(event, now);

        tracing::info!(
            market_id = id,
            outcome_index = input.outcome_index,
            outcome = %outcome_text,
            confidence = input.confidence,
            proof_digest = %digest,
            "Market resolved"
        );

        Ok(())
    }

    /// Withdraw an open market. Its creator or the owner may do this.
    pub fn cancel(&mut self, id: u64, caller: &Identity) -> Result<(), RegistryError> {
        let now = self.clock.now();
        let owner = &self.state.owner;

        let market = self
            .state
            .markets
            .get_mut(&id)
            .ok_or(RegistryError::MarketNotFound(id))?;

        if caller != &market.creator && caller != owner {
            return Err(RegistryError::Unauthorized {
                required: Role::CreatorOrOwner,
            });
        }
        if !market.is_open() {
            return Err(RegistryError::MarketNotOpen {
                id,
                status: market.status,
            });
        }

        market.status = MarketStatus::Cancelled;
        market.cancellation = Some(Cancellation {
            cancelled_by: caller.clone(),
            cancelled_at: now,
        });
        let event = RegistryEvent::MarketCancelled(MarketCancelled {
            id,
            cancelled_by: caller.clone(),
            cancelled_at: now,
        });
        self.commit(event, now);

        tracing::info!(market_id = id, cancelled_by = %caller, "Market cancelled");
        Ok(())
    }

    /// Append to the journal, then notify. The sink always sees records in
    /// journal order.
    fn commit(&mut self, event: RegistryEvent, now: DateTime<Utc>) {
        let record = EventRecord {
            sequence: self.state.journal.len() as u64 + 1,
            recorded_at: now,
            event,
        };
        self.state.journal.push(record);
        if let Some(record) = self.state.journal.last() {
            self.sink.emit(record);
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn market(&self, id: u64) -> Option<&Market> {
        self.state.markets.get(&id)
    }

    /// Markets in ascending id order.
    pub fn markets(&self, filter: &MarketFilter) -> Vec<&Market> {
        let matching = self.state.markets.values().filter(|m| {
            filter.status.map_or(true, |s| m.status == s)
                && filter.creator.as_ref().map_or(true, |c| &m.creator == c)
        });

        match filter.limit {
            Some(limit) => matching.skip(filter.offset).take(limit).collect(),
            None => matching.skip(filter.offset).collect(),
        }
    }

    pub fn market_count(&self) -> u64 {
        self.state.market_count
    }

    pub fn open_market_count(&self) -> usize {
        self.state.markets.values().filter(|m| m.is_open()).count()
    }

    pub fn owner(&self) -> &Identity {
        &self.state.owner
    }

    pub fn resolver(&self) -> &Identity {
        &self.state.resolver
    }

    pub fn fee(&self) -> Decimal {
        self.state.fee
    }

    pub fn balance(&self) -> Decimal {
        self.state.balance
    }

    pub fn surplus_retained(&self) -> Decimal {
        self.state.surplus_retained
    }

    /// Journal records with `sequence > after`, oldest first.
    pub fn events_after(&self, after: u64, limit: usize) -> &[EventRecord] {
        let journal = &self.state.journal;
        let start = (after as usize).min(journal.len());
        let end = start.saturating_add(limit).min(journal.len());
        &journal[start..end]
    }

    pub fn last_sequence(&self) -> u64 {
        self.state.journal.len() as u64
    }

    pub fn state(&self) -> &RegistryState {
        &self.state
    }
}

/// Hex SHA-256 of an attestation blob, for log lines.
pub fn proof_digest(proof: &[u8]) -> String {
    format!("{:x}", Sha256::digest(proof))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
