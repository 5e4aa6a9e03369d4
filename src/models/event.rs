use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Identity, Market};

/// Lifecycle and administrative notifications, emitted once per committed
/// mutation for offchain indexers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum RegistryEvent {
    #[serde(rename = "market_created")]
    MarketCreated(MarketCreated),

    #[serde(rename = "market_resolved")]
    MarketResolved(MarketResolved),

    #[serde(rename = "market_cancelled")]
    MarketCancelled(MarketCancelled),

    #[serde(rename = "fee_updated")]
    FeeUpdated { old: Decimal, new: Decimal },

    #[serde(rename = "resolver_updated")]
    ResolverUpdated { old: Identity, new: Identity },

    #[serde(rename = "ownership_transferred")]
    OwnershipTransferred { old: Identity, new: Identity },

    #[serde(rename = "fees_withdrawn")]
    FeesWithdrawn { to: Identity, amount: Decimal },
}

impl RegistryEvent {
    pub fn name(&self) -> &'static str {
        match self {
            RegistryEvent::MarketCreated(_) => "market_created",
            RegistryEvent::MarketResolved(_) => "market_resolved",
            RegistryEvent::MarketCancelled(_) => "market_cancelled",
            RegistryEvent::FeeUpdated { .. } => "fee_updated",
            RegistryEvent::ResolverUpdated { .. } => "resolver_updated",
            RegistryEvent::OwnershipTransferred { .. } => "ownership_transferred",
            RegistryEvent::FeesWithdrawn { .. } => "fees_withdrawn",
        }
    }

    /// Market the event refers to, if any.
    pub fn market_id(&self) -> Option<u64> {
        match self {
            RegistryEvent::MarketCreated(e) => Some(e.id),
            RegistryEvent::MarketResolved(e) => Some(e.id),
            RegistryEvent::MarketCancelled(e) => Some(e.id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketCreated {
    pub id: u64,
    pub creator: Identity,
    pub question: String,
    pub description: String,
    pub outcomes: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub resolution_deadline: DateTime<Utc>,
}

impl From<&Market> for MarketCreated {
    fn from(m: &Market) -> Self {
        Self {
            id: m.id,
            creator: m.creator.clone(),
            question: m.question.clone(),
            description: m.description.clone(),
            outcomes: m.possible_outcomes.clone(),
            created_at: m.created_at,
            resolution_deadline: m.resolution_deadline,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketResolved {
    pub id: u64,
    pub outcome_index: usize,
    pub outcome_text: String,
    pub resolver: Identity,
    pub resolution_data: String,
    pub sources: Vec<String>,
    pub confidence: u8,
    #[serde(with = "super::base64_bytes")]
    pub proof_data: Vec<u8>,
    pub resolved_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketCancelled {
    pub id: u64,
    pub cancelled_by: Identity,
    pub cancelled_at: DateTime<Utc>,
}

/// Journal entry wrapping an event with its position in the commit order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Starts at 1, increases by exactly 1 per committed mutation.
    pub sequence: u64,
    pub recorded_at: DateTime<Utc>,
    pub event: RegistryEvent,
}
