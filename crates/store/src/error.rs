use common::{EventId, GuestId, ReservationId};
use thiserror::Error;

/// Errors that can occur when reading or writing reservation data.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The booking would exceed the event's seat capacity.
    /// `available` is what remained when the check ran and may be negative.
    #[error("Not enough seats available. Only {available} seats left.")]
    InsufficientSeats { available: i64 },

    /// The event was not found.
    #[error("Event not found: {0}")]
    EventNotFound(EventId),

    /// The reservation was not found.
    #[error("Reservation not found: {0}")]
    ReservationNotFound(ReservationId),

    /// The guest was not found, or does not belong to the given reservation.
    #[error("Guest not found: {0}")]
    GuestNotFound(GuestId),

    /// An event with the same slug already exists.
    #[error("Event slug already in use: {0}")]
    DuplicateSlug(String),

    /// A stored value could not be mapped back to a domain type.
    #[error("Corrupt row: {0}")]
    Corrupt(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Returns true for failures of the storage layer itself rather than
    /// lookups or business rules. Callers retry or surface these as 5xx.
    pub fn is_persistence(&self) -> bool {
        matches!(
            self,
            StoreError::Database(_)
                | StoreError::Migration(_)
                | StoreError::Serialization(_)
                | StoreError::Corrupt(_)
        )
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_seats_message_carries_count() {
        let err = StoreError::InsufficientSeats { available: 3 };
        assert_eq!(
            err.to_string(),
            "Not enough seats available. Only 3 seats left."
        );
    }

    #[test]
    fn persistence_classification() {
        assert!(StoreError::Database(sqlx::Error::PoolTimedOut).is_persistence());
        assert!(StoreError::Corrupt("status".into()).is_persistence());
        assert!(!StoreError::GuestNotFound(GuestId::new()).is_persistence());
        assert!(!StoreError::InsufficientSeats { available: 0 }.is_persistence());
    }
}
