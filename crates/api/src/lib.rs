//! HTTP API server for gala reservations.
//!
//! Provides REST endpoints for seat availability, reservations, payment
//! webhooks, standalone payment intents, admin reports and raffle draws,
//! with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod extract;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, patch, post};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use config::{Config, ConfigError, LogFormat};
pub use error::ApiError;
pub use state::{AppState, Backend, Processor};

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Backend, P: Processor>(
    state: Arc<AppState<S, P>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/events/next", get(routes::events::next::<S, P>))
        .route(
            "/events/{slug}/availability",
            get(routes::events::availability::<S, P>),
        )
        .route("/reservations", post(routes::reservations::create::<S, P>))
        .route(
            "/reservations/manage/{token}",
            get(routes::reservations::manage::<S, P>),
        )
        .route(
            "/reservations/{reservation_id}",
            patch(routes::reservations::update::<S, P>),
        )
        .route("/webhooks/stripe", post(routes::webhooks::stripe::<S, P>))
        .route(
            "/webhooks/stripe/payment-intents",
            post(routes::webhooks::stripe::<S, P>),
        )
        .route(
            "/guests/{guest_id}/toggle-payment",
            patch(routes::guests::toggle_payment::<S, P>),
        )
        .route("/payment-intents", post(routes::payments::create::<S, P>))
        .route(
            "/admin/reservations",
            get(routes::admin::reservations::<S, P>),
        )
        .route("/admin/payments", get(routes::admin::payments::<S, P>))
        .route(
            "/admin/payment-intents/{id}",
            get(routes::admin::payment_intent::<S, P>),
        )
        .route("/raffle/entries", get(routes::raffle::entries::<S, P>))
        .route("/raffle/winners", get(routes::raffle::winners::<S, P>))
        .route(
            "/raffle/lots/{lot_id}/draw",
            post(routes::raffle::draw::<S, P>).delete(routes::raffle::reset::<S, P>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
