//! Persistence for events, table reservations, guests and raffle draws.
//!
//! Two backends implement the same traits: [`PostgresStore`] for production
//! and [`InMemoryStore`] for tests and local runs. Every multi-row write is a
//! single transaction in both.

pub mod error;
pub mod memory;
pub mod model;
pub mod postgres;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use model::{
    Address, CreatedReservation, Event, GuestDetails, GuestRename, NewReservation,
    PaymentStatus, RaffleWinner, ReservationDetails, ReservationStatus, TableGuest,
    TableReservation,
};
pub use postgres::PostgresStore;
pub use store::{ReservationStore, WinnerStore};
