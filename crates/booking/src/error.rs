//! Booking error types.

use payments::{PaymentError, SignatureError};
use store::StoreError;
use thiserror::Error;

/// Errors that can occur during booking operations.
#[derive(Debug, Error)]
pub enum BookingError {
    /// The request is missing required fields or is inconsistent.
    #[error("{0}")]
    Validation(String),

    /// The event, reservation, guest or payment intent does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The booking does not fit in the event's remaining seats.
    #[error("Not enough seats available. Only {available} seats left.")]
    CapacityConflict { available: i64 },

    /// A webhook delivery failed authentication or could not be parsed.
    #[error("Webhook rejected: {0}")]
    Signature(#[from] SignatureError),

    /// The payment processor rejected or failed the request.
    #[error("Payment provider error: {0}")]
    PaymentProvider(PaymentError),

    /// The storage layer failed.
    #[error("Persistence error: {0}")]
    Persistence(StoreError),
}

impl BookingError {
    pub fn validation(message: impl Into<String>) -> Self {
        BookingError::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        BookingError::NotFound(message.into())
    }
}

impl From<StoreError> for BookingError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::InsufficientSeats { available } => {
                BookingError::CapacityConflict { available }
            }
            StoreError::EventNotFound(_) => BookingError::not_found("Event not found"),
            StoreError::ReservationNotFound(_) => BookingError::not_found("Reservation not found"),
            StoreError::GuestNotFound(_) => BookingError::not_found("Guest not found"),
            StoreError::DuplicateSlug(slug) => {
                BookingError::validation(format!("Event slug already in use: {slug}"))
            }
            other => BookingError::Persistence(other),
        }
    }
}

impl From<PaymentError> for BookingError {
    fn from(e: PaymentError) -> Self {
        match e {
            PaymentError::NotFound(_) => BookingError::not_found("Payment intent not found"),
            other => BookingError::PaymentProvider(other),
        }
    }
}

/// Result type for booking operations.
pub type Result<T> = std::result::Result<T, BookingError>;
