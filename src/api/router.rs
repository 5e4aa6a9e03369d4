use axum::middleware;
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::AppState;
use super::auth::require_auth;
use super::handlers;

pub fn create_router(state: AppState) -> Router {
    // Public routes, no authentication required
    let public = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/metrics", get(handlers::metrics::render));

    // Protected routes, Bearer token required when API_TOKEN is set
    let protected = Router::new()
        // Markets
        .route("/api/markets", get(handlers::markets::list).post(handlers::markets::create))
        .route("/api/markets/:id", get(handlers::markets::detail))
        .route("/api/markets/:id/resolve", post(handlers::markets::resolve))
        .route("/api/markets/:id/cancel", post(handlers::markets::cancel))
        // Registry administration
        .route("/api/registry", get(handlers::admin::summary))
        .route("/api/registry/fee", put(handlers::admin::set_fee))
        .route("/api/registry/resolver", put(handlers::admin::set_resolver))
        .route("/api/registry/owner", put(handlers::admin::transfer_ownership))
        .route("/api/registry/withdraw", post(handlers::admin::withdraw))
        .route("/api/payouts/:address", get(handlers::admin::payouts))
        // Notifications
        .route("/api/events", get(handlers::events::list))
        .route("/ws", get(handlers::ws::handler))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    public
        .merge(protected)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
