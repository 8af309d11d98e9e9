pub mod admin;
pub mod events;
pub mod guests;
pub mod health;
pub mod metrics;
pub mod payments;
pub mod raffle;
pub mod reservations;
pub mod webhooks;
