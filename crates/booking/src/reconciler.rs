//! Applies verified payment webhooks to guest and reservation state.
//!
//! The reconciler is the only writer of final payment status. Every
//! transition is an unconditional set, so redelivered events converge to the
//! same state.

use chrono::Utc;
use payments::webhook::{
    self, DEFAULT_TOLERANCE_SECS, PAYMENT_INTENT_FAILED, PAYMENT_INTENT_SUCCEEDED,
};
use payments::{SignatureError, WebhookEvent};
use store::{ReservationStatus, ReservationStore, StoreError};

use crate::error::Result;
use crate::metadata::{self, ReservationPaymentMetadata};

/// What a delivery did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// The charge was recorded against one seat or the whole table.
    SeatsPaid { reservation_completed: bool },
    /// The guest was marked `FAILED`.
    GuestFailed,
    /// A failure arrived for a guest that is already paid.
    AlreadyPaid,
    /// The intent carries no (or malformed) reservation metadata.
    NotReservation,
    /// The metadata names a reservation or guest that does not exist.
    UnknownTarget,
    /// An event type this service does not handle.
    Ignored,
}

impl WebhookOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            WebhookOutcome::SeatsPaid { .. } => "paid",
            WebhookOutcome::GuestFailed => "failed",
            WebhookOutcome::AlreadyPaid => "already_paid",
            WebhookOutcome::NotReservation => "not_reservation",
            WebhookOutcome::UnknownTarget => "unknown_target",
            WebhookOutcome::Ignored => "ignored",
        }
    }
}

fn unknown_target(e: StoreError) -> Result<WebhookOutcome> {
    match e {
        StoreError::ReservationNotFound(_) | StoreError::GuestNotFound(_) => {
            tracing::warn!(error = %e, "Webhook references unknown reservation or guest");
            Ok(WebhookOutcome::UnknownTarget)
        }
        other => Err(other.into()),
    }
}

pub struct WebhookReconciler<S> {
    store: S,
    secret: String,
    tolerance_secs: i64,
}

impl<S: ReservationStore> WebhookReconciler<S> {
    pub fn new(store: S, secret: impl Into<String>) -> Self {
        Self {
            store,
            secret: secret.into(),
            tolerance_secs: DEFAULT_TOLERANCE_SECS,
        }
    }

    pub fn with_tolerance(mut self, tolerance_secs: i64) -> Self {
        self.tolerance_secs = tolerance_secs;
        self
    }

    /// Verifies a raw delivery and applies it.
    ///
    /// Authentication and parse failures return `Signature` without touching
    /// state. Storage failures return `Persistence` so the processor
    /// redelivers.
    #[tracing::instrument(skip_all)]
    pub async fn handle(&self, payload: &[u8], signature: Option<&str>) -> Result<WebhookOutcome> {
        let event = match self.verify(payload, signature) {
            Ok(event) => event,
            Err(e) => {
                metrics::counter!(
                    "webhook_events_total",
                    "event_type" => "unverified",
                    "outcome" => "rejected"
                )
                .increment(1);
                tracing::warn!(error = %e, "Rejected webhook delivery");
                return Err(e.into());
            }
        };

        let outcome = self.apply(&event).await;
        let label = match &outcome {
            Ok(outcome) => outcome.label(),
            Err(_) => "error",
        };
        metrics::counter!(
            "webhook_events_total",
            "event_type" => event.event_type.clone(),
            "outcome" => label
        )
        .increment(1);

        outcome
    }

    fn verify(
        &self,
        payload: &[u8],
        signature: Option<&str>,
    ) -> std::result::Result<WebhookEvent, SignatureError> {
        let header = signature.ok_or(SignatureError::MissingHeader)?;
        webhook::verify_signature(
            payload,
            header,
            &self.secret,
            self.tolerance_secs,
            Utc::now().timestamp(),
        )?;
        WebhookEvent::parse(payload)
    }

    /// Applies an already verified event.
    #[tracing::instrument(skip(self, event), fields(event_id = %event.id, event_type = %event.event_type))]
    pub async fn apply(&self, event: &WebhookEvent) -> Result<WebhookOutcome> {
        match event.event_type.as_str() {
            PAYMENT_INTENT_SUCCEEDED => self.payment_succeeded(event).await,
            PAYMENT_INTENT_FAILED => self.payment_failed(event).await,
            _ => Ok(WebhookOutcome::Ignored),
        }
    }

    async fn payment_succeeded(&self, event: &WebhookEvent) -> Result<WebhookOutcome> {
        let Some(metadata) = ReservationPaymentMetadata::parse(&event.metadata()) else {
            tracing::debug!("Succeeded intent is not a reservation charge");
            return Ok(WebhookOutcome::NotReservation);
        };
        let Some(intent_id) = event.object_id() else {
            tracing::warn!("Succeeded intent carries no id, skipping");
            return Ok(WebhookOutcome::NotReservation);
        };

        let result = if metadata.is_full_table() {
            self.store
                .settle_full_table(metadata.reservation_id, metadata.guest_id, intent_id)
                .await
                .map(|()| ReservationStatus::Complete)
        } else {
            self.store
                .settle_seat(metadata.reservation_id, metadata.guest_id, intent_id)
                .await
        };

        match result {
            Ok(status) => {
                tracing::info!(
                    reservation_id = %metadata.reservation_id,
                    guest_id = %metadata.guest_id,
                    full_table = metadata.is_full_table(),
                    %status,
                    "Payment recorded"
                );
                Ok(WebhookOutcome::SeatsPaid {
                    reservation_completed: status.is_terminal(),
                })
            }
            Err(e) => unknown_target(e),
        }
    }

    async fn payment_failed(&self, event: &WebhookEvent) -> Result<WebhookOutcome> {
        let Some(guest_id) = metadata::parse_guest_id(&event.metadata()) else {
            return Ok(WebhookOutcome::NotReservation);
        };

        match self.store.mark_guest_failed(guest_id).await {
            Ok(true) => {
                tracing::info!(%guest_id, "Guest payment failed");
                Ok(WebhookOutcome::GuestFailed)
            }
            Ok(false) => Ok(WebhookOutcome::AlreadyPaid),
            Err(e) => unknown_target(e),
        }
    }
}
