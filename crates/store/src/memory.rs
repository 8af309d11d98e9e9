use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{EventId, GuestId, ReservationId};
use tokio::sync::RwLock;

use crate::{
    CreatedReservation, Event, GuestDetails, GuestRename, NewReservation, PaymentStatus,
    RaffleWinner, ReservationDetails, ReservationStatus, Result, StoreError, TableGuest,
    TableReservation,
    store::{ReservationStore, WinnerStore},
};

#[derive(Debug, Default)]
struct MemoryState {
    events: HashMap<EventId, Event>,
    reservations: HashMap<ReservationId, TableReservation>,
    guests: HashMap<GuestId, TableGuest>,
    winners: BTreeMap<i32, RaffleWinner>,
}

impl MemoryState {
    fn count_reserved(&self, event_id: EventId, held_since: DateTime<Utc>) -> i64 {
        self.guests
            .values()
            .filter(|g| {
                self.reservations
                    .get(&g.reservation_id)
                    .is_some_and(|r| {
                        r.event_id == event_id
                            && (g.payment_status.is_paid() || r.created_at >= held_since)
                    })
            })
            .count() as i64
    }

    fn details(&self, reservation: &TableReservation) -> Result<ReservationDetails> {
        let event = self
            .events
            .get(&reservation.event_id)
            .cloned()
            .ok_or(StoreError::EventNotFound(reservation.event_id))?;

        let mut guests: Vec<TableGuest> = self
            .guests
            .values()
            .filter(|g| g.reservation_id == reservation.id)
            .cloned()
            .collect();
        guests.sort_by_key(|g| g.seat_number);

        Ok(ReservationDetails {
            reservation: reservation.clone(),
            event,
            guests,
        })
    }

    fn guest_of(&self, reservation_id: ReservationId, guest_id: GuestId) -> Result<()> {
        match self.guests.get(&guest_id) {
            Some(g) if g.reservation_id == reservation_id => Ok(()),
            _ => Err(StoreError::GuestNotFound(guest_id)),
        }
    }
}

/// In-memory store for tests and local runs.
///
/// A single write lock is held for the duration of each operation, which
/// makes every operation atomic and capacity checks race-free.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<MemoryState>>,
    fail_writes: Arc<AtomicBool>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent write fail with a database error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Overrides a reservation's creation time, e.g. to age it past the hold
    /// window.
    pub async fn set_created_at(&self, id: ReservationId, created_at: DateTime<Utc>) {
        if let Some(reservation) = self.state.write().await.reservations.get_mut(&id) {
            reservation.created_at = created_at;
        }
    }

    /// Returns a guest by id.
    pub async fn guest(&self, id: GuestId) -> Option<TableGuest> {
        self.state.read().await.guests.get(&id).cloned()
    }

    /// Returns the total number of guest rows stored.
    pub async fn guest_count(&self) -> usize {
        self.state.read().await.guests.len()
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

#[async_trait]
impl ReservationStore for InMemoryStore {
    async fn insert_event(&self, event: Event) -> Result<()> {
        self.check_writable()?;
        let mut state = self.state.write().await;

        if state.events.values().any(|e| e.slug == event.slug) {
            return Err(StoreError::DuplicateSlug(event.slug));
        }
        state.events.insert(event.id, event);
        Ok(())
    }

    async fn find_event_by_slug(&self, slug: &str) -> Result<Option<Event>> {
        let state = self.state.read().await;
        Ok(state.events.values().find(|e| e.slug == slug).cloned())
    }

    async fn first_event(&self) -> Result<Option<Event>> {
        let state = self.state.read().await;
        Ok(state.events.values().min_by_key(|e| e.date).cloned())
    }

    async fn count_reserved_seats(
        &self,
        event_id: EventId,
        held_since: DateTime<Utc>,
    ) -> Result<i64> {
        Ok(self.state.read().await.count_reserved(event_id, held_since))
    }

    async fn create_reservation(&self, new: NewReservation) -> Result<CreatedReservation> {
        self.check_writable()?;
        let mut state = self.state.write().await;

        let capacity = state
            .events
            .get(&new.event_id)
            .map(|e| e.total_seats)
            .ok_or(StoreError::EventNotFound(new.event_id))?;

        let reserved = state.count_reserved(new.event_id, new.held_since);
        let seats = new.total_seats();
        if reserved + i64::from(seats) > i64::from(capacity) {
            return Err(StoreError::InsufficientSeats {
                available: i64::from(capacity) - reserved,
            });
        }

        let reservation = TableReservation {
            id: ReservationId::new(),
            event_id: new.event_id,
            total_seats: seats,
            status: ReservationStatus::Pending,
            management_token: new.management_token,
            created_at: Utc::now(),
        };

        let host = TableGuest {
            id: GuestId::new(),
            reservation_id: reservation.id,
            seat_number: 0,
            name: new.host.name,
            company_name: new.host.company_name,
            email: new.host.email,
            phone: new.host.phone,
            address: new.host.address,
            is_host: true,
            payment_status: PaymentStatus::Pending,
            payment_intent_id: None,
        };
        let host_guest_id = host.id;
        let mut guest_ids = vec![host.id];
        state.guests.insert(host.id, host);

        for (index, name) in new.placeholder_names.into_iter().enumerate() {
            let guest = TableGuest {
                id: GuestId::new(),
                reservation_id: reservation.id,
                seat_number: index as i32 + 1,
                name,
                company_name: None,
                email: None,
                phone: None,
                address: None,
                is_host: false,
                payment_status: PaymentStatus::Pending,
                payment_intent_id: None,
            };
            guest_ids.push(guest.id);
            state.guests.insert(guest.id, guest);
        }

        state.reservations.insert(reservation.id, reservation.clone());

        Ok(CreatedReservation {
            reservation,
            host_guest_id,
            guest_ids,
        })
    }

    async fn get_reservation(&self, id: ReservationId) -> Result<Option<ReservationDetails>> {
        let state = self.state.read().await;
        state
            .reservations
            .get(&id)
            .map(|r| state.details(r))
            .transpose()
    }

    async fn find_reservation_by_token(
        &self,
        token: &str,
    ) -> Result<Option<ReservationDetails>> {
        let state = self.state.read().await;
        state
            .reservations
            .values()
            .find(|r| r.management_token == token)
            .map(|r| state.details(r))
            .transpose()
    }

    async fn list_reservations(&self) -> Result<Vec<ReservationDetails>> {
        let state = self.state.read().await;
        let mut reservations: Vec<&TableReservation> = state.reservations.values().collect();
        reservations.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        reservations.into_iter().map(|r| state.details(r)).collect()
    }

    async fn find_host(&self, reservation_id: ReservationId) -> Result<Option<TableGuest>> {
        let state = self.state.read().await;
        Ok(state
            .guests
            .values()
            .find(|g| g.reservation_id == reservation_id && g.is_host)
            .cloned())
    }

    async fn update_guest_details(
        &self,
        reservation_id: ReservationId,
        host_id: GuestId,
        host: GuestDetails,
        renames: Vec<GuestRename>,
    ) -> Result<()> {
        self.check_writable()?;
        let mut state = self.state.write().await;

        // Validate everything first so a bad id leaves no partial update.
        match state.guests.get(&host_id) {
            Some(g) if g.reservation_id == reservation_id && g.is_host => {}
            _ => return Err(StoreError::GuestNotFound(host_id)),
        }
        for rename in &renames {
            state.guest_of(reservation_id, rename.guest_id)?;
        }

        if let Some(guest) = state.guests.get_mut(&host_id) {
            guest.name = host.name;
            guest.company_name = host.company_name;
            guest.email = host.email;
            guest.phone = host.phone;
            guest.address = host.address;
        }
        for rename in renames {
            if let Some(guest) = state.guests.get_mut(&rename.guest_id) {
                guest.name = rename.name;
            }
        }
        Ok(())
    }

    async fn settle_full_table(
        &self,
        reservation_id: ReservationId,
        payer: GuestId,
        payment_intent_id: &str,
    ) -> Result<()> {
        self.check_writable()?;
        let mut state = self.state.write().await;

        if !state.reservations.contains_key(&reservation_id) {
            return Err(StoreError::ReservationNotFound(reservation_id));
        }
        state.guest_of(reservation_id, payer)?;

        for guest in state
            .guests
            .values_mut()
            .filter(|g| g.reservation_id == reservation_id)
        {
            guest.payment_status = PaymentStatus::Paid;
            if guest.id == payer {
                guest.payment_intent_id = Some(payment_intent_id.to_string());
            }
        }
        if let Some(reservation) = state.reservations.get_mut(&reservation_id) {
            reservation.status = ReservationStatus::Complete;
        }
        Ok(())
    }

    async fn settle_seat(
        &self,
        reservation_id: ReservationId,
        guest_id: GuestId,
        payment_intent_id: &str,
    ) -> Result<ReservationStatus> {
        self.check_writable()?;
        let mut state = self.state.write().await;

        if !state.reservations.contains_key(&reservation_id) {
            return Err(StoreError::ReservationNotFound(reservation_id));
        }
        state.guest_of(reservation_id, guest_id)?;

        if let Some(guest) = state.guests.get_mut(&guest_id) {
            guest.payment_status = PaymentStatus::Paid;
            guest.payment_intent_id = Some(payment_intent_id.to_string());
        }

        let unpaid = state
            .guests
            .values()
            .filter(|g| g.reservation_id == reservation_id && !g.payment_status.is_paid())
            .count();

        let reservation = state
            .reservations
            .get_mut(&reservation_id)
            .ok_or(StoreError::ReservationNotFound(reservation_id))?;
        if unpaid == 0 {
            reservation.status = ReservationStatus::Complete;
        }
        Ok(reservation.status)
    }

    async fn mark_guest_failed(&self, guest_id: GuestId) -> Result<bool> {
        self.check_writable()?;
        let mut state = self.state.write().await;

        let guest = state
            .guests
            .get_mut(&guest_id)
            .ok_or(StoreError::GuestNotFound(guest_id))?;
        if guest.payment_status.is_paid() {
            return Ok(false);
        }
        guest.payment_status = PaymentStatus::Failed;
        Ok(true)
    }

    async fn toggle_guest_payment(&self, guest_id: GuestId) -> Result<Option<TableGuest>> {
        self.check_writable()?;
        let mut state = self.state.write().await;

        Ok(state.guests.get_mut(&guest_id).map(|guest| {
            guest.payment_status = if guest.payment_status.is_paid() {
                PaymentStatus::Pending
            } else {
                PaymentStatus::Paid
            };
            guest.payment_intent_id = None;
            guest.clone()
        }))
    }
}

#[async_trait]
impl WinnerStore for InMemoryStore {
    async fn get_winner(&self, lot_id: i32) -> Result<Option<RaffleWinner>> {
        Ok(self.state.read().await.winners.get(&lot_id).cloned())
    }

    async fn record_winner(&self, winner: RaffleWinner) -> Result<Option<RaffleWinner>> {
        self.check_writable()?;
        let mut state = self.state.write().await;

        if let Some(existing) = state.winners.get(&winner.lot_id) {
            return Ok(Some(existing.clone()));
        }
        state.winners.insert(winner.lot_id, winner);
        Ok(None)
    }

    async fn clear_winner(&self, lot_id: i32) -> Result<bool> {
        self.check_writable()?;
        Ok(self.state.write().await.winners.remove(&lot_id).is_some())
    }

    async fn list_winners(&self) -> Result<Vec<RaffleWinner>> {
        Ok(self.state.read().await.winners.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use common::Money;

    use super::*;

    fn gala(total_seats: i32) -> Event {
        Event {
            id: EventId::new(),
            slug: "gala-2025".to_string(),
            name: "Gala 2025".to_string(),
            date: Utc::now() + Duration::days(30),
            total_seats,
            seat_price: Money::from_cents(15_000),
            currency: "usd".to_string(),
        }
    }

    fn booking(event_id: EventId, placeholders: usize) -> NewReservation {
        NewReservation {
            event_id,
            management_token: format!("token-{}", ReservationId::new()),
            host: GuestDetails::named("Ada Host"),
            placeholder_names: (1..=placeholders).map(|i| format!("Guest {i}")).collect(),
            held_since: Utc::now() - Duration::days(7),
        }
    }

    async fn seeded(total_seats: i32) -> (InMemoryStore, Event) {
        let store = InMemoryStore::new();
        let event = gala(total_seats);
        store.insert_event(event.clone()).await.unwrap();
        (store, event)
    }

    #[tokio::test]
    async fn test_create_reservation_writes_host_and_placeholders() {
        let (store, event) = seeded(10).await;

        let created = store.create_reservation(booking(event.id, 3)).await.unwrap();
        assert_eq!(created.reservation.total_seats, 4);
        assert_eq!(created.guest_ids.len(), 4);

        let details = store
            .get_reservation(created.reservation.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(details.guests.len(), 4);
        assert_eq!(details.guests.iter().filter(|g| g.is_host).count(), 1);
        assert_eq!(details.guests[0].id, created.host_guest_id);
        assert_eq!(details.guests[3].name, "Guest 3");
    }

    #[tokio::test]
    async fn test_capacity_conflict_writes_nothing() {
        let (store, event) = seeded(3).await;
        store.create_reservation(booking(event.id, 1)).await.unwrap();

        let err = store
            .create_reservation(booking(event.id, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InsufficientSeats { available: 1 }));
        assert_eq!(store.guest_count().await, 2);
    }

    #[tokio::test]
    async fn test_stale_unpaid_reservations_release_seats() {
        let (store, event) = seeded(2).await;
        let created = store.create_reservation(booking(event.id, 1)).await.unwrap();

        let held_since = Utc::now() - Duration::days(7);
        assert_eq!(store.count_reserved_seats(event.id, held_since).await.unwrap(), 2);

        store
            .set_created_at(created.reservation.id, Utc::now() - Duration::days(8))
            .await;
        assert_eq!(store.count_reserved_seats(event.id, held_since).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_paid_guests_always_hold_seats() {
        let (store, event) = seeded(2).await;
        let created = store.create_reservation(booking(event.id, 1)).await.unwrap();
        store
            .settle_seat(created.reservation.id, created.host_guest_id, "pi_1")
            .await
            .unwrap();
        store
            .set_created_at(created.reservation.id, Utc::now() - Duration::days(30))
            .await;

        let held_since = Utc::now() - Duration::days(7);
        assert_eq!(store.count_reserved_seats(event.id, held_since).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_settle_seat_completes_only_when_all_paid() {
        let (store, event) = seeded(10).await;
        let created = store.create_reservation(booking(event.id, 1)).await.unwrap();
        let (host, guest) = (created.guest_ids[0], created.guest_ids[1]);

        let status = store
            .settle_seat(created.reservation.id, host, "pi_host")
            .await
            .unwrap();
        assert_eq!(status, ReservationStatus::Pending);

        let status = store
            .settle_seat(created.reservation.id, guest, "pi_guest")
            .await
            .unwrap();
        assert_eq!(status, ReservationStatus::Complete);
    }

    #[tokio::test]
    async fn test_settle_rejects_guest_of_other_reservation() {
        let (store, event) = seeded(10).await;
        let first = store.create_reservation(booking(event.id, 0)).await.unwrap();
        let second = store.create_reservation(booking(event.id, 0)).await.unwrap();

        let err = store
            .settle_seat(first.reservation.id, second.host_guest_id, "pi_x")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::GuestNotFound(_)));
        assert!(
            !store
                .guest(second.host_guest_id)
                .await
                .unwrap()
                .payment_status
                .is_paid()
        );
    }

    #[tokio::test]
    async fn test_mark_failed_never_downgrades_paid() {
        let (store, event) = seeded(10).await;
        let created = store.create_reservation(booking(event.id, 0)).await.unwrap();
        store
            .settle_seat(created.reservation.id, created.host_guest_id, "pi_1")
            .await
            .unwrap();

        assert!(!store.mark_guest_failed(created.host_guest_id).await.unwrap());
        let guest = store.guest(created.host_guest_id).await.unwrap();
        assert_eq!(guest.payment_status, PaymentStatus::Paid);
    }

    #[tokio::test]
    async fn test_toggle_clears_payment_intent() {
        let (store, event) = seeded(10).await;
        let created = store.create_reservation(booking(event.id, 0)).await.unwrap();
        store
            .settle_seat(created.reservation.id, created.host_guest_id, "pi_1")
            .await
            .unwrap();

        let toggled = store
            .toggle_guest_payment(created.host_guest_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(toggled.payment_status, PaymentStatus::Pending);
        assert_eq!(toggled.payment_intent_id, None);

        let toggled = store
            .toggle_guest_payment(created.host_guest_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(toggled.payment_status, PaymentStatus::Paid);
        assert!(
            store
                .toggle_guest_payment(GuestId::new())
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_record_winner_is_at_most_once() {
        let store = InMemoryStore::new();
        let winner = RaffleWinner {
            lot_id: 7,
            ticket_id: "T-1".into(),
            full_name: "Ada".into(),
            email: "ada@example.com".into(),
            phone: None,
            drawn_at: Utc::now(),
        };

        assert!(store.record_winner(winner.clone()).await.unwrap().is_none());
        let second = RaffleWinner {
            ticket_id: "T-2".into(),
            ..winner.clone()
        };
        assert_eq!(store.record_winner(second).await.unwrap(), Some(winner));

        assert!(store.clear_winner(7).await.unwrap());
        assert!(!store.clear_winner(7).await.unwrap());
        assert!(store.get_winner(7).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_fail_writes_surfaces_database_error() {
        let (store, event) = seeded(10).await;
        store.set_fail_writes(true);

        let err = store
            .create_reservation(booking(event.id, 0))
            .await
            .unwrap_err();
        assert!(err.is_persistence());
    }
}
