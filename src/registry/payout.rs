use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use rust_decimal::Decimal;

use super::error::TransferError;
use crate::models::{EventRecord, Identity, RegistryEvent};

/// Moves native value out of the registry. A failed transfer must leave
/// nothing credited to the recipient.
pub trait Payout: Send + Sync {
    fn transfer(&self, to: &Identity, amount: Decimal) -> Result<(), TransferError>;
}

/// In-process payout backend: credits recipients in memory. Recipients can
/// be flagged to refuse incoming transfers.
#[derive(Debug, Default)]
pub struct CreditLedger {
    inner: Mutex<CreditInner>,
}

#[derive(Debug, Default)]
struct CreditInner {
    credited: HashMap<Identity, Decimal>,
    refusing: HashSet<Identity>,
}

impl CreditLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ledger already holding every withdrawal recorded in `journal`, so
    /// credited totals survive a restart from a snapshot.
    pub fn replaying(journal: &[EventRecord]) -> Self {
        let mut credited: HashMap<Identity, Decimal> = HashMap::new();
        for record in journal {
            if let RegistryEvent::FeesWithdrawn { to, amount } = &record.event {
                let total = credited.entry(to.clone()).or_insert(Decimal::ZERO);
                *total = total.saturating_add(*amount);
            }
        }
        Self {
            inner: Mutex::new(CreditInner {
                credited,
                refusing: HashSet::new(),
            }),
        }
    }

    /// Total value ever transferred to `who`.
    pub fn credited(&self, who: &Identity) -> Decimal {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.credited.get(who).copied().unwrap_or(Decimal::ZERO)
    }

    pub fn refuse_transfers_to(&self, who: Identity) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.refusing.insert(who);
    }

    pub fn accept_transfers_to(&self, who: &Identity) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.refusing.remove(who);
    }
}

impl Payout for CreditLedger {
    fn transfer(&self, to: &Identity, amount: Decimal) -> Result<(), TransferError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());

        if inner.refusing.contains(to) {
            return Err(TransferError(format!("recipient {} rejected transfer", to)));
        }

        let total = inner.credited.get(to).copied().unwrap_or(Decimal::ZERO);
        let total = total
            .checked_add(amount)
            .ok_or_else(|| TransferError(format!("credit for {} would overflow", to)))?;
        inner.credited.insert(to.clone(), total);
        tracing::debug!(to = %to, amount = %amount, "Payout credited");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credit_accumulates() {
        let ledger = CreditLedger::new();
        let who = Identity::from_low_u64(5);

        ledger.transfer(&who, Decimal::new(1, 2)).unwrap();
        ledger.transfer(&who, Decimal::new(2, 2)).unwrap();
        assert_eq!(ledger.credited(&who), Decimal::new(3, 2));
    }

    #[test]
    fn test_refusing_recipient_gets_nothing() {
        let ledger = CreditLedger::new();
        let who = Identity::from_low_u64(6);
        ledger.refuse_transfers_to(who.clone());

        assert!(ledger.transfer(&who, Decimal::ONE).is_err());
        assert_eq!(ledger.credited(&who), Decimal::ZERO);

        ledger.accept_transfers_to(&who);
        ledger.transfer(&who, Decimal::ONE).unwrap();
        assert_eq!(ledger.credited(&who), Decimal::ONE);
    }

    #[test]
    fn test_overflowing_credit_is_refused() {
        let ledger = CreditLedger::new();
        let who = Identity::from_low_u64(7);

        ledger.transfer(&who, Decimal::MAX).unwrap();
        assert!(ledger.transfer(&who, Decimal::ONE).is_err());
        assert_eq!(ledger.credited(&who), Decimal::MAX);
    }

    #[test]
    fn test_replaying_journal_restores_credits() {
        let treasury = Identity::from_low_u64(0xfee);
        let at = chrono::Utc::now();
        let journal = vec![
            EventRecord {
                sequence: 1,
                recorded_at: at,
                event: RegistryEvent::FeesWithdrawn {
                    to: treasury.clone(),
                    amount: Decimal::new(2, 3),
                },
            },
            EventRecord {
                sequence: 2,
                recorded_at: at,
                event: RegistryEvent::FeeUpdated {
                    old: Decimal::new(1, 3),
                    new: Decimal::new(2, 3),
                },
            },
            EventRecord {
                sequence: 3,
                recorded_at: at,
                event: RegistryEvent::FeesWithdrawn {
                    to: treasury.clone(),
                    amount: Decimal::new(1, 3),
                },
            },
        ];

        let ledger = CreditLedger::replaying(&journal);
        assert_eq!(ledger.credited(&treasury), Decimal::new(3, 3));
        assert_eq!(ledger.credited(&Identity::from_low_u64(1)), Decimal::ZERO);
    }
}
