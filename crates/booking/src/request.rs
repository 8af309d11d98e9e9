//! Inbound booking and payment requests.

use std::collections::BTreeMap;

use common::GuestId;
use rust_decimal::Decimal;
use serde::Deserialize;
use store::{Address, GuestDetails};

use crate::error::{BookingError, Result};

/// Whether the host books one seat or a whole table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingType {
    Individual,
    Table,
}

/// How much of a table booking is charged up front.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentOption {
    /// Every seat of the table.
    Full,
    /// Only the host's seat; other guests pay separately.
    #[default]
    Partial,
}

/// Contact details of the booking host.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostInfo {
    pub name: String,
    #[serde(default)]
    pub company_name: Option<String>,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<Address>,
}

impl HostInfo {
    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(BookingError::validation("Host name is required"));
        }
        if self.email.trim().is_empty() {
            return Err(BookingError::validation("Host email is required"));
        }
        Ok(())
    }

    /// Converts to stored guest details, dropping blank optional fields.
    pub fn into_details(self) -> GuestDetails {
        let non_blank = |value: Option<String>| value.filter(|v| !v.trim().is_empty());
        GuestDetails {
            name: self.name.trim().to_string(),
            company_name: non_blank(self.company_name),
            email: Some(self.email.trim().to_string()),
            phone: non_blank(self.phone),
            address: self.address,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GuestName {
    pub name: String,
}

/// Request to book seats for an event.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    pub event_slug: String,
    pub booking_type: BookingType,
    /// Requested seats. Individual bookings always occupy one.
    #[serde(default)]
    pub total_seats: Option<i32>,
    #[serde(default)]
    pub payment_option: PaymentOption,
    pub host_info: HostInfo,
    /// Names for the non-host seats, in seat order.
    #[serde(default)]
    pub guests: Vec<GuestName>,
}

impl BookingRequest {
    /// Checks required fields and seat/guest consistency.
    pub fn validate(&self) -> Result<()> {
        if self.event_slug.trim().is_empty() {
            return Err(BookingError::validation("Event slug is required"));
        }
        match self.total_seats {
            None => return Err(BookingError::validation("Total seats is required")),
            Some(seats) if seats < 1 => {
                return Err(BookingError::validation("Total seats must be at least 1"));
            }
            Some(_) => {}
        }
        self.host_info.validate()?;

        let open_seats = (self.seats() - 1) as usize;
        if self.guests.len() > open_seats {
            return Err(BookingError::validation(format!(
                "Too many guest names: {} given for {} guest seats",
                self.guests.len(),
                open_seats
            )));
        }
        Ok(())
    }

    /// Seats this booking occupies: the requested count for tables, one
    /// otherwise.
    pub fn seats(&self) -> i32 {
        crate::pricing::seats_for_booking(self.booking_type, self.total_seats.unwrap_or(1))
    }

    /// Names for seats 1..n, falling back to `"Guest i"` for missing or blank
    /// entries.
    pub fn placeholder_names(&self) -> Vec<String> {
        (1..self.seats())
            .map(|seat| {
                self.guests
                    .get(seat as usize - 1)
                    .map(|g| g.name.trim())
                    .filter(|name| !name.is_empty())
                    .map_or_else(|| format!("Guest {seat}"), str::to_string)
            })
            .collect()
    }
}

/// A rename of one guest seat from the management page.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GuestNameUpdate {
    pub id: GuestId,
    pub name: String,
}

/// Host-issued edit of a reservation's display fields.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationUpdate {
    pub host_info: HostInfo,
    #[serde(default)]
    pub guests: Vec<GuestNameUpdate>,
}

impl ReservationUpdate {
    pub fn validate(&self) -> Result<()> {
        self.host_info.validate()?;
        if self.guests.iter().any(|g| g.name.trim().is_empty()) {
            return Err(BookingError::validation("Guest names cannot be empty"));
        }
        Ok(())
    }
}

/// Standalone charge for a donation, lottery ticket or auction lot.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    /// Major units (`50` is fifty dollars, `12.5` twelve fifty).
    pub amount: Decimal,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_request(seats: i32, guests: &[&str]) -> BookingRequest {
        BookingRequest {
            event_slug: "gala-2025".into(),
            booking_type: BookingType::Table,
            total_seats: Some(seats),
            payment_option: PaymentOption::Full,
            host_info: HostInfo {
                name: "Ada".into(),
                company_name: None,
                email: "ada@example.com".into(),
                phone: None,
                address: None,
            },
            guests: guests
                .iter()
                .map(|n| GuestName {
                    name: n.to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn deserializes_client_payload() {
        let request: BookingRequest = serde_json::from_value(serde_json::json!({
            "eventSlug": "gala-2025",
            "bookingType": "table",
            "totalSeats": 4,
            "paymentOption": "full",
            "hostInfo": {
                "name": "Ada",
                "email": "ada@example.com",
                "address": { "line1": "1 Main", "city": "Montreal", "postal_code": "H2X", "country": "CA" }
            },
            "guests": [{ "name": "Grace" }]
        }))
        .unwrap();

        assert_eq!(request.booking_type, BookingType::Table);
        assert_eq!(request.payment_option, PaymentOption::Full);
        assert_eq!(request.host_info.address.unwrap().postal_code, "H2X");
    }

    #[test]
    fn placeholders_fill_missing_names() {
        let request = table_request(4, &["Grace", "  "]);
        assert_eq!(
            request.placeholder_names(),
            vec!["Grace", "Guest 2", "Guest 3"]
        );
    }

    #[test]
    fn individual_booking_has_no_placeholders() {
        let mut request = table_request(4, &[]);
        request.booking_type = BookingType::Individual;
        assert_eq!(request.seats(), 1);
        assert!(request.placeholder_names().is_empty());
    }

    #[test]
    fn rejects_missing_fields() {
        let mut request = table_request(2, &[]);
        request.host_info.email = " ".into();
        assert!(matches!(
            request.validate(),
            Err(BookingError::Validation(_))
        ));

        let mut request = table_request(2, &[]);
        request.event_slug.clear();
        assert!(request.validate().is_err());

        assert!(table_request(0, &[]).validate().is_err());

        let mut request = table_request(2, &[]);
        request.total_seats = None;
        assert!(matches!(
            request.validate(),
            Err(BookingError::Validation(_))
        ));
    }

    #[test]
    fn rejects_names_beyond_open_seats() {
        assert!(table_request(3, &["a", "b"]).validate().is_ok());
        assert!(table_request(3, &["a", "b", "c"]).validate().is_err());
    }

    #[test]
    fn host_details_drop_blank_optionals() {
        let mut host = table_request(1, &[]).host_info;
        host.phone = Some("".into());
        host.company_name = Some("Acme".into());
        let details = host.into_details();
        assert_eq!(details.phone, None);
        assert_eq!(details.company_name.as_deref(), Some("Acme"));
        assert_eq!(details.email.as_deref(), Some("ada@example.com"));
    }
}
