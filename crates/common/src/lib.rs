//! Shared types used across the reservation crates.

pub mod ids;
pub mod money;

pub use ids::{EventId, GuestId, ReservationId};
pub use money::Money;
