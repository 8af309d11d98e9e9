//! Booking service: availability, reservations and standalone charges.

use chrono::Utc;
use common::{GuestId, Money, ReservationId};
use payments::{IntentRequest, PaymentError, PaymentIntent, PaymentProcessor};
use rand::RngCore;
use rust_decimal::Decimal;
use serde::Serialize;
use store::{
    Event, GuestRename, NewReservation, ReservationDetails, ReservationStore, TableGuest,
};

use crate::error::{BookingError, Result};
use crate::metadata::ReservationPaymentMetadata;
use crate::policy::{HoldPolicy, SeatAvailability};
use crate::pricing;
use crate::report::{PaymentRecord, ReservationSummary};
use crate::request::{BookingRequest, PaymentRequest, ReservationUpdate};

const DEFAULT_CURRENCY: &str = "usd";
const DEFAULT_DESCRIPTION: &str = "Donation";

/// What the client needs to confirm the first charge of a reservation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationConfirmation {
    pub client_secret: String,
    pub reservation_id: ReservationId,
    pub host_guest_id: GuestId,
    pub management_token: String,
    /// Minor units.
    pub amount: Money,
    pub currency: String,
}

/// 32 random bytes, hex encoded.
fn new_management_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn client_secret(intent: PaymentIntent) -> Result<String> {
    intent
        .client_secret
        .ok_or(BookingError::PaymentProvider(PaymentError::MissingClientSecret(
            intent.id,
        )))
}

/// Service for booking seats and requesting charges.
///
/// The store owns every invariant about seats and guests; this service
/// validates requests, computes prices and talks to the processor.
pub struct BookingService<S, P> {
    store: S,
    processor: P,
    hold: HoldPolicy,
}

impl<S: ReservationStore, P: PaymentProcessor> BookingService<S, P> {
    /// Creates a service with the default one-week hold window.
    pub fn new(store: S, processor: P) -> Self {
        Self {
            store,
            processor,
            hold: HoldPolicy::default(),
        }
    }

    pub fn with_hold_policy(mut self, hold: HoldPolicy) -> Self {
        self.hold = hold;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn processor(&self) -> &P {
        &self.processor
    }

    pub fn hold_policy(&self) -> HoldPolicy {
        self.hold
    }

    /// Returns the upcoming event.
    #[tracing::instrument(skip(self))]
    pub async fn next_event(&self) -> Result<Event> {
        self.store
            .first_event()
            .await?
            .ok_or_else(|| BookingError::not_found("No event configured"))
    }

    async fn event(&self, slug: &str) -> Result<Event> {
        self.store
            .find_event_by_slug(slug)
            .await?
            .ok_or_else(|| BookingError::not_found("Event not found"))
    }

    async fn seats_for(&self, event: &Event) -> Result<SeatAvailability> {
        let reserved = self
            .store
            .count_reserved_seats(event.id, self.hold.held_since(Utc::now()))
            .await?;
        Ok(SeatAvailability::new(i64::from(event.total_seats), reserved))
    }

    /// Computes reserved and available seats for an event.
    #[tracing::instrument(skip(self))]
    pub async fn availability(&self, slug: &str) -> Result<SeatAvailability> {
        let event = self.event(slug).await?;
        self.seats_for(&event).await
    }

    /// Books seats and requests the first payment intent.
    ///
    /// The reservation and its guests are committed before the intent is
    /// requested. If the processor then fails, the reservation stays
    /// `PENDING` and releases its seats once the hold window passes.
    #[tracing::instrument(
        skip(self, request),
        fields(event_slug = %request.event_slug, booking_type = ?request.booking_type)
    )]
    pub async fn create_reservation(
        &self,
        request: BookingRequest,
    ) -> Result<ReservationConfirmation> {
        request.validate()?;

        let event = self.event(&request.event_slug).await?;
        let seats = request.seats();

        // Cheap pre-check; the store re-checks under its write lock.
        let availability = self.seats_for(&event).await?;
        if !availability.fits(i64::from(seats)) {
            metrics::counter!("capacity_conflicts_total").increment(1);
            return Err(BookingError::CapacityConflict {
                available: availability.available_seats,
            });
        }

        let placeholder_names = request.placeholder_names();
        let receipt_email = request.host_info.email.trim().to_string();
        let full_table = pricing::is_full_table(request.booking_type, request.payment_option);
        let amount = pricing::amount_to_pay(
            event.seat_price,
            request.booking_type,
            request.payment_option,
            seats,
        );

        let created = self
            .store
            .create_reservation(NewReservation {
                event_id: event.id,
                management_token: new_management_token(),
                host: request.host_info.into_details(),
                placeholder_names,
                held_since: self.hold.held_since(Utc::now()),
            })
            .await
            .inspect_err(|e| {
                if matches!(e, store::StoreError::InsufficientSeats { .. }) {
                    metrics::counter!("capacity_conflicts_total").increment(1);
                }
            })?;

        let reservation_id = created.reservation.id;
        metrics::counter!("reservations_created_total").increment(1);
        tracing::info!(%reservation_id, seats, "Reservation created");

        let metadata =
            ReservationPaymentMetadata::new(reservation_id, created.host_guest_id, full_table);
        let intent = self
            .processor
            .create_intent(
                IntentRequest::new(amount, event.currency.clone())
                    .receipt_email(receipt_email)
                    .description(format!("Gala Reservation for {}", event.name))
                    .metadata(metadata.to_map()),
            )
            .await
            .inspect_err(|e| {
                tracing::error!(%reservation_id, error = %e, "Payment intent request failed");
            })?;

        Ok(ReservationConfirmation {
            client_secret: client_secret(intent)?,
            reservation_id,
            host_guest_id: created.host_guest_id,
            management_token: created.reservation.management_token,
            amount,
            currency: event.currency,
        })
    }

    /// Loads a reservation from the token in the host's confirmation link.
    #[tracing::instrument(skip_all)]
    pub async fn reservation_by_token(&self, token: &str) -> Result<ReservationDetails> {
        self.store
            .find_reservation_by_token(token)
            .await?
            .ok_or_else(|| BookingError::not_found("Reservation not found"))
    }

    /// Applies a host's edit of display fields in one transaction.
    #[tracing::instrument(skip(self, update))]
    pub async fn update_reservation(
        &self,
        reservation_id: ReservationId,
        update: ReservationUpdate,
    ) -> Result<()> {
        update.validate()?;

        let host = self
            .store
            .find_host(reservation_id)
            .await?
            .ok_or_else(|| BookingError::not_found("Host not found for this reservation"))?;

        let renames = update
            .guests
            .into_iter()
            .map(|g| GuestRename {
                guest_id: g.id,
                name: g.name.trim().to_string(),
            })
            .collect();

        self.store
            .update_guest_details(
                reservation_id,
                host.id,
                update.host_info.into_details(),
                renames,
            )
            .await?;

        tracing::info!("Reservation details updated");
        Ok(())
    }

    /// Flips a guest between paid and pending from the admin page.
    #[tracing::instrument(skip(self))]
    pub async fn toggle_guest_payment(&self, guest_id: GuestId) -> Result<TableGuest> {
        let guest = self
            .store
            .toggle_guest_payment(guest_id)
            .await?
            .ok_or_else(|| BookingError::not_found("Guest not found"))?;

        tracing::info!(status = %guest.payment_status, "Guest payment toggled");
        Ok(guest)
    }

    /// Requests a standalone intent (donation, lottery ticket, auction lot)
    /// and returns its client secret.
    #[tracing::instrument(skip(self, request), fields(amount = %request.amount))]
    pub async fn request_payment(&self, request: PaymentRequest) -> Result<String> {
        if request.amount <= Decimal::ZERO {
            return Err(BookingError::validation("Amount must be positive"));
        }
        let amount = Money::from_major_decimal(request.amount)
            .filter(Money::is_positive)
            .ok_or_else(|| BookingError::validation("Amount is out of range"))?;

        let currency = request
            .currency
            .map(|c| c.trim().to_lowercase())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());
        let description = request
            .description
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string());

        let mut intent_request = IntentRequest::new(amount, currency)
            .description(description)
            .metadata(request.metadata);
        if let Some(email) = request.email.filter(|e| !e.trim().is_empty()) {
            intent_request = intent_request.receipt_email(email);
        }

        let intent = self.processor.create_intent(intent_request).await?;
        client_secret(intent)
    }

    /// Every reservation with its event, host and guests, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn reservation_summaries(&self) -> Result<Vec<ReservationSummary>> {
        let reservations = self.store.list_reservations().await?;
        Ok(reservations.iter().map(ReservationSummary::from).collect())
    }

    /// Every succeeded charge, classified by what it paid for.
    #[tracing::instrument(skip(self))]
    pub async fn payment_report(&self) -> Result<Vec<PaymentRecord>> {
        let intents = self.processor.list_succeeded_intents().await?;
        Ok(intents.iter().map(PaymentRecord::from).collect())
    }

    #[tracing::instrument(skip(self))]
    pub async fn payment_intent(&self, id: &str) -> Result<PaymentIntent> {
        if id.trim().is_empty() {
            return Err(BookingError::validation("Payment Intent ID is required"));
        }
        Ok(self.processor.retrieve_intent(id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn management_tokens_are_long_and_unique() {
        let a = new_management_token();
        let b = new_management_token();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }
}
