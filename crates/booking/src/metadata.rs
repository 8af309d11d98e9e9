//! Typed reservation metadata carried on payment intents.
//!
//! The processor only round-trips a flat string map, so the reservation and
//! paying guest are encoded under fixed keys and parsed back at the top of the
//! webhook handler.

use std::collections::BTreeMap;

use common::{GuestId, ReservationId};

pub const RESERVATION_ID_KEY: &str = "reservationId";
pub const GUEST_ID_KEY: &str = "guestId";
pub const PAYING_FOR_KEY: &str = "payingFor";
pub const FULL_TABLE: &str = "full_table";

/// What a charge covers beyond the paying guest's own seat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayingFor {
    FullTable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReservationPaymentMetadata {
    pub reservation_id: ReservationId,
    pub guest_id: GuestId,
    pub paying_for: Option<PayingFor>,
}

impl ReservationPaymentMetadata {
    pub fn new(reservation_id: ReservationId, guest_id: GuestId, full_table: bool) -> Self {
        Self {
            reservation_id,
            guest_id,
            paying_for: full_table.then_some(PayingFor::FullTable),
        }
    }

    pub fn is_full_table(&self) -> bool {
        self.paying_for == Some(PayingFor::FullTable)
    }

    pub fn to_map(&self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        map.insert(
            RESERVATION_ID_KEY.to_string(),
            self.reservation_id.to_string(),
        );
        map.insert(GUEST_ID_KEY.to_string(), self.guest_id.to_string());
        if self.is_full_table() {
            map.insert(PAYING_FOR_KEY.to_string(), FULL_TABLE.to_string());
        }
        map
    }

    /// Parses intent metadata. Returns None when the intent is not a
    /// reservation charge or the ids are malformed. Unknown `payingFor`
    /// values are treated as a single-seat charge.
    pub fn parse(metadata: &BTreeMap<String, String>) -> Option<Self> {
        let reservation_id = metadata
            .get(RESERVATION_ID_KEY)
            .and_then(|v| ReservationId::parse(v.trim()).ok())?;
        let guest_id = parse_guest_id(metadata)?;
        let paying_for = match metadata.get(PAYING_FOR_KEY).map(String::as_str) {
            Some(FULL_TABLE) => Some(PayingFor::FullTable),
            _ => None,
        };

        Some(Self {
            reservation_id,
            guest_id,
            paying_for,
        })
    }
}

/// Reads just the paying guest, for events that only touch the guest row.
pub fn parse_guest_id(metadata: &BTreeMap<String, String>) -> Option<GuestId> {
    metadata
        .get(GUEST_ID_KEY)
        .and_then(|v| GuestId::parse(v.trim()).ok())
}
