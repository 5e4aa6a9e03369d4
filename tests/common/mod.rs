use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response};
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use tower::ServiceExt;

use oracle_registry::api::router::create_router;
use oracle_registry::config::AppConfig;
use oracle_registry::models::Identity;
use oracle_registry::registry::{ManualClock, RegistryState};
use oracle_registry::AppState;

pub struct TestApp {
    pub router: axum::Router,
    pub state: AppState,
    pub clock: ManualClock,
}

#[allow(dead_code)]
pub fn owner() -> Identity {
    Identity::from_low_u64(0x0a)
}

#[allow(dead_code)]
pub fn resolver() -> Identity {
    Identity::from_low_u64(0x0b)
}

#[allow(dead_code)]
pub fn creation_fee() -> Decimal {
    Decimal::new(1, 3)
}

#[allow(dead_code)]
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
}

/// Router over a fresh registry with a manual clock at [`t0`].
#[allow(dead_code)]
pub fn build_test_app() -> TestApp {
    build_test_app_with(AppConfig::with_roles(owner(), resolver(), creation_fee()))
}

#[allow(dead_code)]
pub fn build_test_app_with(config: AppConfig) -> TestApp {
    let registry_state =
        RegistryState::new(config.owner.clone(), config.resolver.clone(), config.creation_fee)
            .expect("valid roles");
    build_test_app_from(config, registry_state)
}

/// Router over an existing registry state, as after a restart from a snapshot.
#[allow(dead_code)]
pub fn build_test_app_from(config: AppConfig, registry_state: RegistryState) -> TestApp {
    let clock = ManualClock::new(t0());
    let state = AppState::build(
        config,
        registry_state,
        Arc::new(clock.clone()),
        oracle_registry::metrics::detached_handle(),
    );

    TestApp {
        router: create_router(state.clone()),
        state,
        clock,
    }
}

/// Send a request, optionally as `caller` and with a JSON body.
#[allow(dead_code)]
pub async fn send(
    app: &TestApp,
    method: &str,
    uri: &str,
    caller: Option<&Identity>,
    body: Option<serde_json::Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(caller) = caller {
        builder = builder.header("x-caller-address", caller.as_str());
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    app.router.clone().oneshot(request).await.unwrap()
}

#[allow(dead_code)]
pub async fn body_json(resp: Response<Body>) -> serde_json::Value {
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// Body for `POST /api/markets` with a two-outcome question.
#[allow(dead_code)]
pub fn market_body(deadline: DateTime<Utc>, paid: &str) -> serde_json::Value {
    serde_json::json!({
        "question": "Will it rain?",
        "description": "Resolves Yes if any rain is recorded",
        "outcomes": ["Yes", "No"],
        "resolution_deadline": deadline.to_rfc3339(),
        "paid_amount": paid,
    })
}
