//! Shared application state.

use booking::{BookingService, HoldPolicy, RaffleDraw, WebhookReconciler};
use payments::PaymentProcessor;
use store::{ReservationStore, WinnerStore};

use crate::config::Config;

/// Storage backend usable by every handler.
pub trait Backend: ReservationStore + WinnerStore + Clone + 'static {}

impl<T: ReservationStore + WinnerStore + Clone + 'static> Backend for T {}

/// Payment processor usable by every handler.
pub trait Processor: PaymentProcessor + Clone + 'static {}

impl<T: PaymentProcessor + Clone + 'static> Processor for T {}

/// Shared application state accessible from all handlers.
pub struct AppState<S, P> {
    pub booking: BookingService<S, P>,
    pub reconciler: WebhookReconciler<S>,
    pub raffle: RaffleDraw<S, P>,
}

impl<S: Backend, P: Processor> AppState<S, P> {
    /// Wires the services over one store and one processor.
    pub fn new(store: S, processor: P, config: &Config) -> Self {
        Self {
            booking: BookingService::new(store.clone(), processor.clone())
                .with_hold_policy(HoldPolicy::from_days(config.hold_window_days)),
            reconciler: WebhookReconciler::new(store.clone(), config.stripe_webhook_secret.clone())
                .with_tolerance(config.webhook_tolerance_secs),
            raffle: RaffleDraw::new(store, processor),
        }
    }
}
