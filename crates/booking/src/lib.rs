//! Gala reservation workflow.
//!
//! This crate provides:
//! - [`BookingService`]: seat availability, reservation creation, management
//!   updates, standalone payment intents and admin reports
//! - [`WebhookReconciler`]: applies verified payment webhooks to guest and
//!   reservation state
//! - [`RaffleDraw`]: at-most-once winner draws per lot
//!
//! Persistence goes through [`store::ReservationStore`] and
//! [`store::WinnerStore`]; the payment processor through
//! [`payments::PaymentProcessor`].

pub mod error;
pub mod metadata;
pub mod policy;
pub mod pricing;
pub mod raffle;
pub mod reconciler;
pub mod report;
pub mod request;
pub mod service;

pub use error::{BookingError, Result};
pub use metadata::{PayingFor, ReservationPaymentMetadata};
pub use policy::{HoldPolicy, SeatAvailability};
pub use raffle::{DrawOutcome, RaffleDraw, RaffleEntry};
pub use reconciler::{WebhookOutcome, WebhookReconciler};
pub use report::{PaymentKind, PaymentRecord, ReservationSummary};
pub use request::{
    BookingRequest, BookingType, GuestName, GuestNameUpdate, HostInfo, PaymentOption,
    PaymentRequest, ReservationUpdate,
};
pub use service::{BookingService, ReservationConfirmation};
