use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::Identity;

// ---------------------------------------------------------------------------
// MarketStatus
// ---------------------------------------------------------------------------

/// Lifecycle state. `Open` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketStatus {
    Open,
    Resolved,
    Cancelled,
}

impl MarketStatus {
    pub fn from_api_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "open" => Some(MarketStatus::Open),
            "resolved" => Some(MarketStatus::Resolved),
            "cancelled" | "canceled" => Some(MarketStatus::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, MarketStatus::Open)
    }
}

impl fmt::Display for MarketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarketStatus::Open => write!(f, "open"),
            MarketStatus::Resolved => write!(f, "resolved"),
            MarketStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

// ---------------------------------------------------------------------------
// Resolution / Cancellation
// ---------------------------------------------------------------------------

/// Oracle verdict stored on a resolved market. Everything except the index is
/// kept verbatim; `proof_data` is an opaque attestation blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub outcome_index: usize,
    pub resolution_data: String,
    pub sources: Vec<String>,
    pub confidence: u8,
    #[serde(with = "super::base64_bytes")]
    pub proof_data: Vec<u8>,
    pub resolved_at: DateTime<Utc>,
    pub resolved_by: Identity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cancellation {
    pub cancelled_by: Identity,
    pub cancelled_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Market
// ---------------------------------------------------------------------------

/// A registered market. Created `Open`, then mutated at most once by either
/// a resolution or a cancellation. Never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Market {
    pub id: u64,
    pub creator: Identity,
    pub question: String,
    pub description: String,
    pub possible_outcomes: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub resolution_deadline: DateTime<Utc>,
    pub status: MarketStatus,
    /// `None` until resolved.
    pub outcome_index: Option<usize>,
    #[serde(default)]
    pub resolution: Option<Resolution>,
    #[serde(default)]
    pub cancellation: Option<Cancellation>,
}

impl Market {
    /// Id 0 is never assigned, so a zeroed record means "never created".
    pub fn exists(&self) -> bool {
        self.id != 0
    }

    pub fn is_open(&self) -> bool {
        self.status == MarketStatus::Open
    }

    pub fn is_resolved(&self) -> bool {
        self.status == MarketStatus::Resolved
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == MarketStatus::Cancelled
    }

    /// The deadline is a lower bound only: once reached, the market stays
    /// resolvable for as long as it is open.
    pub fn can_resolve(&self, now: DateTime<Utc>) -> bool {
        now >= self.resolution_deadline
    }

    pub fn outcome_count(&self) -> usize {
        self.possible_outcomes.len()
    }

    pub fn outcome_text(&self, index: usize) -> Option<&str> {
        self.possible_outcomes.get(index).map(String::as_str)
    }

    pub fn resolution_data(&self) -> &str {
        self.resolution
            .as_ref()
            .map(|r| r.resolution_data.as_str())
            .unwrap_or("")
    }

    pub fn sources(&self) -> &[String] {
        self.resolution
            .as_ref()
            .map(|r| r.sources.as_slice())
            .unwrap_or(&[])
    }

    pub fn confidence(&self) -> u8 {
        self.resolution.as_ref().map(|r| r.confidence).unwrap_or(0)
    }

    pub fn proof_data(&self) -> &[u8] {
        self.resolution
            .as_ref()
            .map(|r| r.proof_data.as_slice())
            .unwrap_or(&[])
    }

    pub fn resolved_at(&self) -> Option<DateTime<Utc>> {
        self.resolution.as_ref().map(|r| r.resolved_at)
    }

    pub fn resolved_by(&self) -> Option<&Identity> {
        self.resolution.as_ref().map(|r| &r.resolved_by)
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Market #{}: {:?} [{}] outcomes={} deadline={}",
            self.id,
            self.question,
            self.status,
            self.possible_outcomes.len(),
            self.resolution_deadline.to_rfc3339(),
        )
    }
}
