//! Row types for events, reservations, guests and raffle draws.

use chrono::{DateTime, Utc};
use common::{EventId, GuestId, Money, ReservationId};
use serde::{Deserialize, Serialize};

use crate::StoreError;

/// Payment state of a single seat.
///
/// ```text
/// PENDING ──┬──► PAID
///           └──► FAILED ──► PAID
/// ```
///
/// Only the admin toggle moves a seat out of `PAID`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
}

impl PaymentStatus {
    /// Returns the stored representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Paid => "PAID",
            PaymentStatus::Failed => "FAILED",
        }
    }

    /// Returns true if the seat has been paid for.
    pub fn is_paid(&self) -> bool {
        matches!(self, PaymentStatus::Paid)
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(PaymentStatus::Pending),
            "PAID" => Ok(PaymentStatus::Paid),
            "FAILED" => Ok(PaymentStatus::Failed),
            other => Err(StoreError::Corrupt(format!("unknown payment status {other:?}"))),
        }
    }
}

/// Lifecycle of a reservation. `COMPLETE` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    #[default]
    Pending,
    Complete,
}

impl ReservationStatus {
    /// Returns the stored representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Pending => "PENDING",
            ReservationStatus::Complete => "COMPLETE",
        }
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ReservationStatus::Complete)
    }
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ReservationStatus {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(ReservationStatus::Pending),
            "COMPLETE" => Ok(ReservationStatus::Complete),
            other => Err(StoreError::Corrupt(format!(
                "unknown reservation status {other:?}"
            ))),
        }
    }
}

/// A fundraising occasion with a fixed seat capacity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: EventId,
    /// Routing key, unique across events.
    pub slug: String,
    pub name: String,
    pub date: DateTime<Utc>,
    pub total_seats: i32,
    pub seat_price: Money,
    /// ISO currency code as the processor expects it (e.g. `usd`).
    pub currency: String,
}

/// Postal address kept for tax receipts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub line1: String,
    pub city: String,
    #[serde(alias = "postal_code")]
    pub postal_code: String,
    pub country: String,
}

/// One booking unit: a single seat or a full table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableReservation {
    pub id: ReservationId,
    pub event_id: EventId,
    pub total_seats: i32,
    pub status: ReservationStatus,
    pub management_token: String,
    pub created_at: DateTime<Utc>,
}

/// One seat inside a reservation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableGuest {
    pub id: GuestId,
    pub reservation_id: ReservationId,
    /// Host is seat 0, placeholders follow in creation order.
    pub seat_number: i32,
    pub name: String,
    pub company_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<Address>,
    pub is_host: bool,
    pub payment_status: PaymentStatus,
    /// Set only on the guest whose charge actually succeeded.
    pub payment_intent_id: Option<String>,
}

/// Display fields of a guest. Never includes payment state.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestDetails {
    pub name: String,
    pub company_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<Address>,
}

impl GuestDetails {
    /// Details carrying only a display name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// A reservation together with its event and guests (host first).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationDetails {
    pub reservation: TableReservation,
    pub event: Event,
    pub guests: Vec<TableGuest>,
}

impl ReservationDetails {
    /// Returns the host guest, if present.
    pub fn host(&self) -> Option<&TableGuest> {
        self.guests.iter().find(|g| g.is_host)
    }

    /// Returns the number of guests whose seat is paid.
    pub fn paid_seats(&self) -> usize {
        self.guests
            .iter()
            .filter(|g| g.payment_status.is_paid())
            .count()
    }
}

/// Input for creating a reservation with its host and placeholder guests.
///
/// The reservation's seat count is always `1 + placeholders.len()`, so the
/// guest-rows-equal-seats invariant holds by construction.
#[derive(Debug, Clone)]
pub struct NewReservation {
    pub event_id: EventId,
    pub management_token: String,
    pub host: GuestDetails,
    pub placeholder_names: Vec<String>,
    /// Unpaid guests of reservations created at or after this instant still
    /// hold their seats.
    pub held_since: DateTime<Utc>,
}

impl NewReservation {
    /// Total seats this reservation will occupy.
    pub fn total_seats(&self) -> i32 {
        1 + self.placeholder_names.len() as i32
    }
}

/// Result of a successful reservation insert.
#[derive(Debug, Clone)]
pub struct CreatedReservation {
    pub reservation: TableReservation,
    pub host_guest_id: GuestId,
    pub guest_ids: Vec<GuestId>,
}

/// A rename of a non-host seat, issued from the management page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestRename {
    pub guest_id: GuestId,
    pub name: String,
}

/// The recorded winner of a raffle lot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaffleWinner {
    pub lot_id: i32,
    pub ticket_id: String,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub drawn_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_status_round_trips_through_storage_form() {
        for status in [
            PaymentStatus::Pending,
            PaymentStatus::Paid,
            PaymentStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<PaymentStatus>().unwrap(), status);
        }
    }

    #[test]
    fn unknown_status_is_corrupt() {
        assert!(matches!(
            "hasPaid".parse::<PaymentStatus>(),
            Err(StoreError::Corrupt(_))
        ));
        assert!(matches!(
            "DONE".parse::<ReservationStatus>(),
            Err(StoreError::Corrupt(_))
        ));
    }

    #[test]
    fn statuses_serialize_uppercase() {
        assert_eq!(
            serde_json::to_string(&PaymentStatus::Paid).unwrap(),
            "\"PAID\""
        );
        assert_eq!(
            serde_json::to_string(&ReservationStatus::Complete).unwrap(),
            "\"COMPLETE\""
        );
    }

    #[test]
    fn complete_is_terminal() {
        assert!(ReservationStatus::Complete.is_terminal());
        assert!(!ReservationStatus::Pending.is_terminal());
    }

    #[test]
    fn address_accepts_snake_case_postal_code() {
        let address: Address = serde_json::from_value(serde_json::json!({
            "line1": "1 Main St",
            "city": "Montreal",
            "postal_code": "H2X 1Y4",
            "country": "CA"
        }))
        .unwrap();
        assert_eq!(address.postal_code, "H2X 1Y4");
    }

    #[test]
    fn new_reservation_counts_host_seat() {
        let new = NewReservation {
            event_id: EventId::new(),
            management_token: "t".into(),
            host: GuestDetails::named("Host"),
            placeholder_names: vec!["Guest 1".into(), "Guest 2".into()],
            held_since: Utc::now(),
        };
        assert_eq!(new.total_seats(), 3);
    }
}
