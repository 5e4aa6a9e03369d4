mod common;

use std::sync::Arc;

use chrono::Duration;
use rust_decimal::Decimal;

use common::{creation_fee, owner, resolver, t0};
use oracle_registry::models::{Identity, MarketStatus, RegistryEvent};
use oracle_registry::registry::{
    load_snapshot, save_snapshot, CreditLedger, ManualClock, MemorySink, NewMarket, Registry,
    RegistryError, RegistryState, ResolutionInput,
};

struct Fixture {
    registry: Registry,
    clock: ManualClock,
    sink: Arc<MemorySink>,
    payouts: Arc<CreditLedger>,
}

fn fixture() -> Fixture {
    let clock = ManualClock::new(t0());
    let sink = Arc::new(MemorySink::new());
    let payouts = Arc::new(CreditLedger::new());
    let state = RegistryState::new(owner(), resolver(), creation_fee()).unwrap();
    let registry = Registry::new(state, Arc::new(clock.clone()), sink.clone(), payouts.clone());
    Fixture {
        registry,
        clock,
        sink,
        payouts,
    }
}

fn new_market(outcomes: &[&str], deadline_in: Duration) -> NewMarket {
    NewMarket {
        question: "Will it rain?".into(),
        description: String::new(),
        outcomes: outcomes.iter().map(|s| s.to_string()).collect(),
        resolution_deadline: t0() + deadline_in,
        paid_amount: creation_fee(),
    }
}

fn verdict(index: usize) -> ResolutionInput {
    ResolutionInput {
        outcome_index: index,
        resolution_data: "rain gauge 4.2mm".into(),
        sources: vec!["https://weather.example/report".into()],
        confidence: 95,
        proof_data: vec![0xde, 0xad],
    }
}

#[test]
fn test_create_then_resolve_after_deadline() {
    let mut f = fixture();
    let creator = Identity::from_low_u64(1);

    let id = f
        .registry
        .create(new_market(&["Yes", "No"], Duration::days(1)), &creator)
        .unwrap();
    assert_eq!(id, 1);
    assert_eq!(f.registry.market(id).unwrap().status, MarketStatus::Open);

    let err = f.registry.resolve(id, verdict(0), &resolver()).unwrap_err();
    assert!(matches!(err, RegistryError::TooEarly { .. }));

    f.clock.advance(Duration::days(1));
    f.registry.resolve(id, verdict(0), &resolver()).unwrap();

    let market = f.registry.market(id).unwrap();
    assert_eq!(market.status, MarketStatus::Resolved);
    assert_eq!(market.outcome_index, Some(0));
    assert_eq!(market.resolved_by(), Some(&resolver()));
    assert_eq!(market.proof_data(), &[0xde, 0xad][..]);

    let names: Vec<&str> = f.sink.records().iter().map(|r| r.event.name()).collect();
    assert_eq!(names, vec!["market_created", "market_resolved"]);
}

#[test]
fn test_single_outcome_is_rejected() {
    let mut f = fixture();

    let err = f
        .registry
        .create(
            new_market(&["Only one"], Duration::days(1)),
            &Identity::from_low_u64(1),
        )
        .unwrap_err();

    assert_eq!(err, RegistryError::InsufficientOutcomes { provided: 1 });
    assert_eq!(f.registry.market_count(), 0);
    assert!(f.registry.market(1).is_none());
    assert!(f.sink.is_empty());
}

#[test]
fn test_stranger_cannot_cancel() {
    let mut f = fixture();
    let user_a = Identity::from_low_u64(1);
    let user_b = Identity::from_low_u64(2);

    let id = f
        .registry
        .create(new_market(&["Yes", "No"], Duration::days(1)), &user_a)
        .unwrap();

    let err = f.registry.cancel(id, &user_b).unwrap_err();
    assert!(matches!(err, RegistryError::Unauthorized { .. }));
    assert!(f.registry.market(id).unwrap().is_open());
    assert_eq!(f.sink.len(), 1);
}

#[test]
fn test_out_of_range_outcome_is_rejected() {
    let mut f = fixture();
    let id = f
        .registry
        .create(
            new_market(&["Yes", "No"], Duration::hours(1)),
            &Identity::from_low_u64(1),
        )
        .unwrap();
    f.clock.advance(Duration::hours(2));

    let err = f.registry.resolve(id, verdict(5), &resolver()).unwrap_err();
    assert_eq!(err, RegistryError::InvalidOutcomeIndex { index: 5, bound: 2 });
    assert!(f.registry.market(id).unwrap().is_open());
}

#[test]
fn test_withdraw_over_balance_moves_nothing() {
    let mut f = fixture();
    let recipient = Identity::from_low_u64(0xfee);

    f.registry
        .create(
            new_market(&["Yes", "No"], Duration::days(1)),
            &Identity::from_low_u64(1),
        )
        .unwrap();
    let before = f.registry.balance();

    let err = f
        .registry
        .withdraw(recipient.clone(), Decimal::ONE, &owner())
        .unwrap_err();

    assert!(matches!(err, RegistryError::InsufficientBalance { .. }));
    assert_eq!(f.registry.balance(), before);
    assert_eq!(f.payouts.credited(&recipient), Decimal::ZERO);
}

#[test]
fn test_snapshot_restores_full_history() {
    let mut f = fixture();
    let creator = Identity::from_low_u64(1);

    for _ in 0..2 {
        f.registry
            .create(new_market(&["Yes", "No"], Duration::hours(1)), &creator)
            .unwrap();
    }
    f.registry.cancel(2, &creator).unwrap();
    f.clock.advance(Duration::hours(1));
    f.registry.resolve(1, verdict(1), &resolver()).unwrap();
    f.registry
        .withdraw(Identity::from_low_u64(0xfee), creation_fee(), &owner())
        .unwrap();

    let path = std::env::temp_dir().join(format!(
        "oracle-registry-lifecycle-{}.json",
        std::process::id()
    ));
    save_snapshot(f.registry.state(), &path).unwrap();
    let restored = load_snapshot(&path).unwrap().unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(&restored, f.registry.state());

    // A registry rebuilt from the snapshot keeps issuing ids and sequences
    let mut rebuilt = Registry::new(
        restored,
        Arc::new(f.clock.clone()),
        Arc::new(MemorySink::new()),
        Arc::new(CreditLedger::new()),
    );
    let id = rebuilt
        .create(new_market(&["Yes", "No"], Duration::days(1)), &creator)
        .unwrap();
    assert_eq!(id, 3);
    assert_eq!(rebuilt.last_sequence(), 6);
    assert!(matches!(
        rebuilt.events_after(5, 10)[0].event,
        RegistryEvent::MarketCreated(_)
    ));
}
