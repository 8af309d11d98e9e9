use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{EventId, GuestId, ReservationId};

use crate::{
    CreatedReservation, Event, GuestDetails, GuestRename, NewReservation, RaffleWinner,
    ReservationDetails, ReservationStatus, Result, TableGuest,
};

/// Core trait for reservation persistence.
///
/// Every method that touches more than one row does so atomically: either
/// all rows change or none do. All implementations must be thread-safe.
#[async_trait]
pub trait ReservationStore: Send + Sync {
    /// Inserts an event. Fails with `DuplicateSlug` if the slug is taken.
    async fn insert_event(&self, event: Event) -> Result<()>;

    /// Looks up an event by its slug.
    async fn find_event_by_slug(&self, slug: &str) -> Result<Option<Event>>;

    /// Returns the earliest event by date.
    async fn first_event(&self) -> Result<Option<Event>>;

    /// Counts guests holding a seat at the event: every `PAID` guest, plus any
    /// guest whose reservation was created at or after `held_since`.
    async fn count_reserved_seats(
        &self,
        event_id: EventId,
        held_since: DateTime<Utc>,
    ) -> Result<i64>;

    /// Creates a `PENDING` reservation, its host and its placeholder guests.
    ///
    /// Capacity is re-checked inside the same transaction with the same
    /// counting rule as [`count_reserved_seats`](Self::count_reserved_seats);
    /// fails with `InsufficientSeats` before writing anything.
    async fn create_reservation(&self, new: NewReservation) -> Result<CreatedReservation>;

    /// Loads a reservation with its event and guests.
    async fn get_reservation(&self, id: ReservationId) -> Result<Option<ReservationDetails>>;

    /// Loads a reservation by its management token.
    async fn find_reservation_by_token(&self, token: &str)
    -> Result<Option<ReservationDetails>>;

    /// Lists every reservation, newest first.
    async fn list_reservations(&self) -> Result<Vec<ReservationDetails>>;

    /// Returns the host guest of a reservation.
    async fn find_host(&self, reservation_id: ReservationId) -> Result<Option<TableGuest>>;

    /// Updates the host's display fields and renames other guests.
    ///
    /// Every guest must belong to `reservation_id`, otherwise nothing is
    /// written and `GuestNotFound` is returned. Payment fields are untouched.
    async fn update_guest_details(
        &self,
        reservation_id: ReservationId,
        host_id: GuestId,
        host: GuestDetails,
        renames: Vec<GuestRename>,
    ) -> Result<()>;

    /// Records a full-table charge: the payer becomes `PAID` with the intent
    /// id, every other guest becomes `PAID` without one, and the reservation
    /// becomes `COMPLETE`.
    async fn settle_full_table(
        &self,
        reservation_id: ReservationId,
        payer: GuestId,
        payment_intent_id: &str,
    ) -> Result<()>;

    /// Records a single-seat charge and completes the reservation once no
    /// unpaid guest remains. Returns the reservation status afterwards.
    async fn settle_seat(
        &self,
        reservation_id: ReservationId,
        guest_id: GuestId,
        payment_intent_id: &str,
    ) -> Result<ReservationStatus>;

    /// Marks a guest `FAILED` unless already `PAID`.
    ///
    /// Returns false when the guest was paid and nothing changed.
    async fn mark_guest_failed(&self, guest_id: GuestId) -> Result<bool>;

    /// Flips a guest between `PAID` and `PENDING` (anything not paid becomes
    /// paid) and clears the payment intent id. Returns None for unknown guests.
    async fn toggle_guest_payment(&self, guest_id: GuestId) -> Result<Option<TableGuest>>;
}

/// Key-value store of raffle winners, at most one per lot.
#[async_trait]
pub trait WinnerStore: Send + Sync {
    /// Returns the winner recorded for a lot.
    async fn get_winner(&self, lot_id: i32) -> Result<Option<RaffleWinner>>;

    /// Records a winner unless the lot already has one.
    ///
    /// Returns the previously recorded winner when the lot was already drawn,
    /// in which case nothing is written.
    async fn record_winner(&self, winner: RaffleWinner) -> Result<Option<RaffleWinner>>;

    /// Removes the lot's winner. Returns true if one was removed.
    async fn clear_winner(&self, lot_id: i32) -> Result<bool>;

    /// Lists every recorded winner ordered by lot.
    async fn list_winners(&self) -> Result<Vec<RaffleWinner>>;
}
