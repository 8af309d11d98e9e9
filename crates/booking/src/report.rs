//! Read models for the admin pages.

use chrono::{DateTime, Utc};
use common::ReservationId;
use payments::PaymentIntent;
use serde::Serialize;
use store::{PaymentStatus, ReservationDetails, ReservationStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HostSummary {
    pub name: String,
    pub email: Option<String>,
    pub company_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestSummary {
    pub name: String,
    pub payment_status: PaymentStatus,
}

/// One row of the admin reservations table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationSummary {
    pub id: ReservationId,
    pub created_at: DateTime<Utc>,
    pub event_name: String,
    pub total_seats: i32,
    pub paid_seats: usize,
    pub status: ReservationStatus,
    pub host: Option<HostSummary>,
    /// Host first, then seat order.
    pub guests: Vec<GuestSummary>,
}

impl From<&ReservationDetails> for ReservationSummary {
    fn from(details: &ReservationDetails) -> Self {
        Self {
            id: details.reservation.id,
            created_at: details.reservation.created_at,
            event_name: details.event.name.clone(),
            total_seats: details.reservation.total_seats,
            paid_seats: details.paid_seats(),
            status: details.reservation.status,
            host: details.host().map(|host| HostSummary {
                name: host.name.clone(),
                email: host.email.clone(),
                company_name: host.company_name.clone(),
            }),
            guests: details
                .guests
                .iter()
                .map(|g| GuestSummary {
                    name: g.name.clone(),
                    payment_status: g.payment_status,
                })
                .collect(),
        }
    }
}

/// What a standalone charge paid for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentKind {
    Donation,
    Lottery,
    Auction,
}

impl PaymentKind {
    /// Classifies an intent by its `type` metadata, then `is_lottery`.
    pub fn of(intent: &PaymentIntent) -> Self {
        match intent.meta("type") {
            Some("auction") => PaymentKind::Auction,
            Some("lottery") => PaymentKind::Lottery,
            Some("donation") => PaymentKind::Donation,
            _ if intent.meta("is_lottery") == Some("true") => PaymentKind::Lottery,
            _ => PaymentKind::Donation,
        }
    }
}

/// One succeeded charge in the admin payments report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    pub id: String,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    /// Minor units.
    pub amount: i64,
    pub currency: String,
    pub lot_id: Option<i32>,
    #[serde(rename = "type")]
    pub kind: PaymentKind,
    /// Unix seconds.
    pub created_at: i64,
}

impl From<&PaymentIntent> for PaymentRecord {
    fn from(intent: &PaymentIntent) -> Self {
        Self {
            id: intent.id.clone(),
            full_name: intent
                .meta("full_name")
                .or_else(|| intent.meta("name"))
                .unwrap_or("Unknown")
                .to_string(),
            email: intent
                .meta("email")
                .or(intent.receipt_email.as_deref())
                .unwrap_or_default()
                .to_string(),
            phone: intent.meta("phone").unwrap_or_default().to_string(),
            amount: intent.amount,
            currency: intent.currency.clone(),
            lot_id: intent.meta("lot_id").and_then(|v| v.trim().parse().ok()),
            kind: PaymentKind::of(intent),
            created_at: intent.created,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use payments::IntentStatus;

    use super::*;

    fn intent(metadata: &[(&str, &str)]) -> PaymentIntent {
        PaymentIntent {
            id: "pi_1".into(),
            amount: 2_500,
            currency: "usd".into(),
            status: IntentStatus::Succeeded,
            client_secret: None,
            description: None,
            receipt_email: Some("receipt@example.com".into()),
            metadata: metadata
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<BTreeMap<_, _>>(),
            created: 1_735_689_600,
        }
    }

    #[test]
    fn explicit_type_wins() {
        let intent = intent(&[("type", "auction"), ("is_lottery", "true")]);
        assert_eq!(PaymentKind::of(&intent), PaymentKind::Auction);
    }

    #[test]
    fn lottery_flag_then_donation_default() {
        assert_eq!(
            PaymentKind::of(&intent(&[("is_lottery", "true")])),
            PaymentKind::Lottery
        );
        assert_eq!(PaymentKind::of(&intent(&[])), PaymentKind::Donation);
    }

    #[test]
    fn record_falls_back_to_receipt_email_and_unknown_name() {
        let record = PaymentRecord::from(&intent(&[("lot_id", "7")]));
        assert_eq!(record.full_name, "Unknown");
        assert_eq!(record.email, "receipt@example.com");
        assert_eq!(record.lot_id, Some(7));
        assert_eq!(record.phone, "");
    }

    #[test]
    fn record_serializes_kind_as_type() {
        let json = serde_json::to_value(PaymentRecord::from(&intent(&[("name", "Ada")]))).unwrap();
        assert_eq!(json["type"], "donation");
        assert_eq!(json["fullName"], "Ada");
    }
}
