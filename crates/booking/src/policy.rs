//! Seat hold window and availability.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// How long an unpaid reservation keeps its seats.
pub const DEFAULT_HOLD_WINDOW_DAYS: i64 = 7;

/// Decides which unpaid guests still count against capacity.
///
/// A guest holds a seat if paid, or if their reservation was created within
/// the window. Stale unpaid reservations are never deleted; they simply stop
/// counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HoldPolicy {
    window: Duration,
}

impl HoldPolicy {
    pub fn new(window: Duration) -> Self {
        Self { window }
    }

    pub fn from_days(days: i64) -> Self {
        Self::new(Duration::days(days))
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Reservations created at or after this instant still hold unpaid seats.
    pub fn held_since(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.window
    }
}

impl Default for HoldPolicy {
    fn default() -> Self {
        Self::from_days(DEFAULT_HOLD_WINDOW_DAYS)
    }
}

/// Seat counts for an event at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatAvailability {
    pub total_seats: i64,
    pub reserved_seats_count: i64,
    /// May be negative when capacity was lowered after bookings.
    pub available_seats: i64,
}

impl SeatAvailability {
    pub fn new(total_seats: i64, reserved_seats_count: i64) -> Self {
        Self {
            total_seats,
            reserved_seats_count,
            available_seats: total_seats - reserved_seats_count,
        }
    }

    pub fn is_sold_out(&self) -> bool {
        self.available_seats <= 0
    }

    pub fn fits(&self, seats: i64) -> bool {
        self.reserved_seats_count + seats <= self.total_seats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_window_is_one_week() {
        let now = Utc::now();
        assert_eq!(HoldPolicy::default().held_since(now), now - Duration::days(7));
    }

    #[test]
    fn availability_can_go_negative() {
        let availability = SeatAvailability::new(10, 12);
        assert_eq!(availability.available_seats, -2);
        assert!(availability.is_sold_out());
        assert!(!availability.fits(1));
    }

    #[test]
    fn fits_up_to_capacity() {
        let availability = SeatAvailability::new(10, 7);
        assert!(availability.fits(3));
        assert!(!availability.fits(4));
    }

    #[test]
    fn serializes_camel_case() {
        let json = serde_json::to_value(SeatAvailability::new(100, 40)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "totalSeats": 100, "reservedSeatsCount": 40, "availableSeats": 60 })
        );
    }
}
