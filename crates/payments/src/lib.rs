//! Payment processor integration.
//!
//! This crate provides:
//! - [`PaymentProcessor`]: the outbound contract (create, retrieve and list
//!   payment intents)
//! - [`StripeClient`]: production implementation over the Stripe REST API
//! - [`InMemoryPaymentProcessor`]: in-memory implementation for tests
//! - [`webhook`]: signature verification and event payload parsing

pub mod error;
pub mod memory;
pub mod processor;
pub mod stripe;
pub mod webhook;

pub use error::PaymentError;
pub use memory::InMemoryPaymentProcessor;
pub use processor::{IntentPage, IntentRequest, IntentStatus, PaymentIntent, PaymentProcessor};
pub use stripe::StripeClient;
pub use webhook::{SignatureError, WebhookEvent, verify_signature};
