use common::Money;

use crate::request::{BookingType, PaymentOption};

/// Seats a booking occupies against event capacity.
pub fn seats_for_booking(booking_type: BookingType, requested: i32) -> i32 {
    match booking_type {
        BookingType::Table => requested,
        BookingType::Individual => 1,
    }
}

/// Amount charged at booking time: the whole table for a full-table prepay,
/// otherwise a single seat.
pub fn amount_to_pay(
    seat_price: Money,
    booking_type: BookingType,
    payment_option: PaymentOption,
    seats: i32,
) -> Money {
    match (booking_type, payment_option) {
        (BookingType::Table, PaymentOption::Full) => seat_price.multiply(seats.max(1) as u32),
        _ => seat_price,
    }
}

/// True when a single charge covers every seat of the reservation.
pub fn is_full_table(booking_type: BookingType, payment_option: PaymentOption) -> bool {
    booking_type == BookingType::Table && payment_option == PaymentOption::Full
}
