use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{EventId, GuestId, Money, ReservationId};
use sqlx::postgres::{PgConnection, PgRow};
use sqlx::types::Json;
use sqlx::{PgExecutor, PgPool, Row};
use uuid::Uuid;

use crate::{
    Address, CreatedReservation, Event, GuestDetails, GuestRename, NewReservation, RaffleWinner,
    ReservationDetails, ReservationStatus, Result, StoreError, TableGuest, TableReservation,
    store::{ReservationStore, WinnerStore},
};

macro_rules! event_columns {
    () => {
        "id, slug, name, date, total_seats, seat_price_cents, currency"
    };
}

macro_rules! reservation_columns {
    () => {
        "id, event_id, total_seats, status, management_token, created_at"
    };
}

macro_rules! guest_columns {
    () => {
        "id, reservation_id, seat_number, name, company_name, email, phone, address, is_host, payment_status, payment_intent_id"
    };
}

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_event(row: &PgRow) -> Result<Event> {
        Ok(Event {
            id: EventId::from_uuid(row.try_get::<Uuid, _>("id")?),
            slug: row.try_get("slug")?,
            name: row.try_get("name")?,
            date: row.try_get("date")?,
            total_seats: row.try_get("total_seats")?,
            seat_price: Money::from_cents(row.try_get("seat_price_cents")?),
            currency: row.try_get("currency")?,
        })
    }

    fn row_to_reservation(row: &PgRow) -> Result<TableReservation> {
        Ok(TableReservation {
            id: ReservationId::from_uuid(row.try_get::<Uuid, _>("id")?),
            event_id: EventId::from_uuid(row.try_get::<Uuid, _>("event_id")?),
            total_seats: row.try_get("total_seats")?,
            status: row.try_get::<String, _>("status")?.parse()?,
            management_token: row.try_get("management_token")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn row_to_guest(row: &PgRow) -> Result<TableGuest> {
        let address: Option<Json<Address>> = row.try_get("address")?;

        Ok(TableGuest {
            id: GuestId::from_uuid(row.try_get::<Uuid, _>("id")?),
            reservation_id: ReservationId::from_uuid(row.try_get::<Uuid, _>("reservation_id")?),
            seat_number: row.try_get("seat_number")?,
            name: row.try_get("name")?,
            company_name: row.try_get("company_name")?,
            email: row.try_get("email")?,
            phone: row.try_get("phone")?,
            address: address.map(|a| a.0),
            is_host: row.try_get("is_host")?,
            payment_status: row.try_get::<String, _>("payment_status")?.parse()?,
            payment_intent_id: row.try_get("payment_intent_id")?,
        })
    }

    fn row_to_winner(row: &PgRow) -> Result<RaffleWinner> {
        Ok(RaffleWinner {
            lot_id: row.try_get("lot_id")?,
            ticket_id: row.try_get("ticket_id")?,
            full_name: row.try_get("full_name")?,
            email: row.try_get("email")?,
            phone: row.try_get("phone")?,
            drawn_at: row.try_get("drawn_at")?,
        })
    }

    async fn count_reserved<'e, E: PgExecutor<'e>>(
        executor: E,
        event_id: EventId,
        held_since: DateTime<Utc>,
    ) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM table_guests g
            JOIN table_reservations r ON r.id = g.reservation_id
            WHERE r.event_id = $1
              AND (g.payment_status = 'PAID' OR r.created_at >= $2)
            "#,
        )
        .bind(event_id.as_uuid())
        .bind(held_since)
        .fetch_one(executor)
        .await?;

        Ok(count)
    }

    async fn insert_guest(conn: &mut PgConnection, guest: &TableGuest) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO table_guests (id, reservation_id, seat_number, name, company_name, email, phone, address, is_host, payment_status, payment_intent_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(guest.id.as_uuid())
        .bind(guest.reservation_id.as_uuid())
        .bind(guest.seat_number)
        .bind(&guest.name)
        .bind(&guest.company_name)
        .bind(&guest.email)
        .bind(&guest.phone)
        .bind(guest.address.as_ref().map(Json))
        .bind(guest.is_host)
        .bind(guest.payment_status.as_str())
        .bind(&guest.payment_intent_id)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Locks the reservation row so concurrent settlements of the same
    /// reservation observe each other's guest updates.
    async fn lock_reservation(conn: &mut PgConnection, id: ReservationId) -> Result<()> {
        let found: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM table_reservations WHERE id = $1 FOR UPDATE")
                .bind(id.as_uuid())
                .fetch_optional(conn)
                .await?;

        found.map(|_| ()).ok_or(StoreError::ReservationNotFound(id))
    }

    async fn load_guests(&self, reservation_ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<TableGuest>>> {
        let rows = sqlx::query(concat!(
            "SELECT ",
            guest_columns!(),
            " FROM table_guests WHERE reservation_id = ANY($1) ORDER BY reservation_id, seat_number ASC"
        ))
        .bind(reservation_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut grouped: HashMap<Uuid, Vec<TableGuest>> = HashMap::new();
        for row in &rows {
            let guest = Self::row_to_guest(row)?;
            grouped
                .entry(guest.reservation_id.as_uuid())
                .or_default()
                .push(guest);
        }
        Ok(grouped)
    }

    async fn load_events(&self, event_ids: &[Uuid]) -> Result<HashMap<Uuid, Event>> {
        let rows = sqlx::query(concat!(
            "SELECT ",
            event_columns!(),
            " FROM events WHERE id = ANY($1)"
        ))
        .bind(event_ids)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| Self::row_to_event(row).map(|e| (e.id.as_uuid(), e)))
            .collect()
    }

    async fn assemble(&self, reservations: Vec<TableReservation>) -> Result<Vec<ReservationDetails>> {
        let ids: Vec<Uuid> = reservations.iter().map(|r| r.id.as_uuid()).collect();
        let event_ids: Vec<Uuid> = reservations.iter().map(|r| r.event_id.as_uuid()).collect();

        let mut guests = self.load_guests(&ids).await?;
        let events = self.load_events(&event_ids).await?;

        reservations
            .into_iter()
            .map(|reservation| {
                let event = events
                    .get(&reservation.event_id.as_uuid())
                    .cloned()
                    .ok_or(StoreError::EventNotFound(reservation.event_id))?;
                let guests = guests.remove(&reservation.id.as_uuid()).unwrap_or_default();
                Ok(ReservationDetails {
                    reservation,
                    event,
                    guests,
                })
            })
            .collect()
    }
}

#[async_trait]
impl ReservationStore for PostgresStore {
    async fn insert_event(&self, event: Event) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO events (id, slug, name, date, total_seats, seat_price_cents, currency)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(event.id.as_uuid())
        .bind(&event.slug)
        .bind(&event.name)
        .bind(event.date)
        .bind(event.total_seats)
        .bind(event.seat_price.cents())
        .bind(&event.currency)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("unique_event_slug")
            {
                return StoreError::DuplicateSlug(event.slug.clone());
            }
            StoreError::Database(e)
        })?;

        Ok(())
    }

    async fn find_event_by_slug(&self, slug: &str) -> Result<Option<Event>> {
        let row = sqlx::query(concat!(
            "SELECT ",
            event_columns!(),
            " FROM events WHERE slug = $1"
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_event).transpose()
    }

    async fn first_event(&self) -> Result<Option<Event>> {
        let row = sqlx::query(concat!(
            "SELECT ",
            event_columns!(),
            " FROM events ORDER BY date ASC LIMIT 1"
        ))
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_event).transpose()
    }

    async fn count_reserved_seats(
        &self,
        event_id: EventId,
        held_since: DateTime<Utc>,
    ) -> Result<i64> {
        Self::count_reserved(&self.pool, event_id, held_since).await
    }

    async fn create_reservation(&self, new: NewReservation) -> Result<CreatedReservation> {
        let mut tx = self.pool.begin().await?;

        // The event row lock serializes bookings of the same event, so the
        // count below cannot race a sibling insert.
        let capacity: Option<i32> =
            sqlx::query_scalar("SELECT total_seats FROM events WHERE id = $1 FOR UPDATE")
                .bind(new.event_id.as_uuid())
                .fetch_optional(&mut *tx)
                .await?;
        let capacity = capacity.ok_or(StoreError::EventNotFound(new.event_id))?;

        let reserved = Self::count_reserved(&mut *tx, new.event_id, new.held_since).await?;
        let seats = new.total_seats();
        if reserved + i64::from(seats) > i64::from(capacity) {
            return Err(StoreError::InsufficientSeats {
                available: i64::from(capacity) - reserved,
            });
        }

        let reservation_id = ReservationId::new();
        let row = sqlx::query(concat!(
            "INSERT INTO table_reservations (id, event_id, total_seats, status, management_token) ",
            "VALUES ($1, $2, $3, $4, $5) RETURNING ",
            reservation_columns!()
        ))
        .bind(reservation_id.as_uuid())
        .bind(new.event_id.as_uuid())
        .bind(seats)
        .bind(ReservationStatus::Pending.as_str())
        .bind(&new.management_token)
        .fetch_one(&mut *tx)
        .await?;
        let reservation = Self::row_to_reservation(&row)?;

        let host = TableGuest {
            id: GuestId::new(),
            reservation_id,
            seat_number: 0,
            name: new.host.name,
            company_name: new.host.company_name,
            email: new.host.email,
            phone: new.host.phone,
            address: new.host.address,
            is_host: true,
            payment_status: Default::default(),
            payment_intent_id: None,
        };
        Self::insert_guest(&mut tx, &host).await?;

        let mut guest_ids = vec![host.id];
        for (index, name) in new.placeholder_names.into_iter().enumerate() {
            let placeholder = TableGuest {
                id: GuestId::new(),
                reservation_id,
                seat_number: index as i32 + 1,
                name,
                company_name: None,
                email: None,
                phone: None,
                address: None,
                is_host: false,
                payment_status: Default::default(),
                payment_intent_id: None,
            };
            Self::insert_guest(&mut tx, &placeholder).await?;
            guest_ids.push(placeholder.id);
        }

        tx.commit().await?;

        Ok(CreatedReservation {
            reservation,
            host_guest_id: host.id,
            guest_ids,
        })
    }

    async fn get_reservation(&self, id: ReservationId) -> Result<Option<ReservationDetails>> {
        let row = sqlx::query(concat!(
            "SELECT ",
            reservation_columns!(),
            " FROM table_reservations WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let reservation = Self::row_to_reservation(&row)?;
                Ok(self.assemble(vec![reservation]).await?.pop())
            }
            None => Ok(None),
        }
    }

    async fn find_reservation_by_token(
        &self,
        token: &str,
    ) -> Result<Option<ReservationDetails>> {
        let row = sqlx::query(concat!(
            "SELECT ",
            reservation_columns!(),
            " FROM table_reservations WHERE management_token = $1"
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let reservation = Self::row_to_reservation(&row)?;
                Ok(self.assemble(vec![reservation]).await?.pop())
            }
            None => Ok(None),
        }
    }

    async fn list_reservations(&self) -> Result<Vec<ReservationDetails>> {
        let rows = sqlx::query(concat!(
            "SELECT ",
            reservation_columns!(),
            " FROM table_reservations ORDER BY created_at DESC, id"
        ))
        .fetch_all(&self.pool)
        .await?;

        let reservations = rows
            .iter()
            .map(Self::row_to_reservation)
            .collect::<Result<Vec<_>>>()?;
        self.assemble(reservations).await
    }

    async fn find_host(&self, reservation_id: ReservationId) -> Result<Option<TableGuest>> {
        let row = sqlx::query(concat!(
            "SELECT ",
            guest_columns!(),
            " FROM table_guests WHERE reservation_id = $1 AND is_host"
        ))
        .bind(reservation_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_guest).transpose()
    }

    async fn update_guest_details(
        &self,
        reservation_id: ReservationId,
        host_id: GuestId,
        host: GuestDetails,
        renames: Vec<GuestRename>,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE table_guests
            SET name = $3, company_name = $4, email = $5, phone = $6, address = $7
            WHERE id = $1 AND reservation_id = $2 AND is_host
            "#,
        )
        .bind(host_id.as_uuid())
        .bind(reservation_id.as_uuid())
        .bind(&host.name)
        .bind(&host.company_name)
        .bind(&host.email)
        .bind(&host.phone)
        .bind(host.address.as_ref().map(Json))
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(StoreError::GuestNotFound(host_id));
        }

        for rename in &renames {
            let updated = sqlx::query(
                "UPDATE table_guests SET name = $3 WHERE id = $1 AND reservation_id = $2",
            )
            .bind(rename.guest_id.as_uuid())
            .bind(reservation_id.as_uuid())
            .bind(&rename.name)
            .execute(&mut *tx)
            .await?;

            if updated.rows_affected() == 0 {
                return Err(StoreError::GuestNotFound(rename.guest_id));
            }
        }

        tx.commit().await?;
        Ok(())
    }

    async fn settle_full_table(
        &self,
        reservation_id: ReservationId,
        payer: GuestId,
        payment_intent_id: &str,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        Self::lock_reservation(&mut tx, reservation_id).await?;

        let updated = sqlx::query(
            r#"
            UPDATE table_guests
            SET payment_status = 'PAID', payment_intent_id = $3
            WHERE id = $1 AND reservation_id = $2
            "#,
        )
        .bind(payer.as_uuid())
        .bind(reservation_id.as_uuid())
        .bind(payment_intent_id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(StoreError::GuestNotFound(payer));
        }

        sqlx::query(
            "UPDATE table_guests SET payment_status = 'PAID' WHERE reservation_id = $1 AND id <> $2",
        )
        .bind(reservation_id.as_uuid())
        .bind(payer.as_uuid())
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE table_reservations SET status = 'COMPLETE' WHERE id = $1")
            .bind(reservation_id.as_uuid())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn settle_seat(
        &self,
        reservation_id: ReservationId,
        guest_id: GuestId,
        payment_intent_id: &str,
    ) -> Result<ReservationStatus> {
        let mut tx = self.pool.begin().await?;
        Self::lock_reservation(&mut tx, reservation_id).await?;

        let updated = sqlx::query(
            r#"
            UPDATE table_guests
            SET payment_status = 'PAID', payment_intent_id = $3
            WHERE id = $1 AND reservation_id = $2
            "#,
        )
        .bind(guest_id.as_uuid())
        .bind(reservation_id.as_uuid())
        .bind(payment_intent_id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(StoreError::GuestNotFound(guest_id));
        }

        let unpaid: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM table_guests WHERE reservation_id = $1 AND payment_status <> 'PAID'",
        )
        .bind(reservation_id.as_uuid())
        .fetch_one(&mut *tx)
        .await?;

        let status: String = if unpaid == 0 {
            sqlx::query_scalar(
                "UPDATE table_reservations SET status = 'COMPLETE' WHERE id = $1 RETURNING status",
            )
            .bind(reservation_id.as_uuid())
            .fetch_one(&mut *tx)
            .await?
        } else {
            sqlx::query_scalar("SELECT status FROM table_reservations WHERE id = $1")
                .bind(reservation_id.as_uuid())
                .fetch_one(&mut *tx)
                .await?
        };

        tx.commit().await?;
        status.parse()
    }

    async fn mark_guest_failed(&self, guest_id: GuestId) -> Result<bool> {
        let updated = sqlx::query(
            "UPDATE table_guests SET payment_status = 'FAILED' WHERE id = $1 AND payment_status <> 'PAID'",
        )
        .bind(guest_id.as_uuid())
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() > 0 {
            return Ok(true);
        }

        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM table_guests WHERE id = $1)")
                .bind(guest_id.as_uuid())
                .fetch_one(&self.pool)
                .await?;

        if exists {
            Ok(false)
        } else {
            Err(StoreError::GuestNotFound(guest_id))
        }
    }

    async fn toggle_guest_payment(&self, guest_id: GuestId) -> Result<Option<TableGuest>> {
        let row = sqlx::query(concat!(
            "UPDATE table_guests SET ",
            "payment_status = CASE WHEN payment_status = 'PAID' THEN 'PENDING' ELSE 'PAID' END, ",
            "payment_intent_id = NULL ",
            "WHERE id = $1 RETURNING ",
            guest_columns!()
        ))
        .bind(guest_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_guest).transpose()
    }
}

#[async_trait]
impl WinnerStore for PostgresStore {
    async fn get_winner(&self, lot_id: i32) -> Result<Option<RaffleWinner>> {
        let row = sqlx::query(
            "SELECT lot_id, ticket_id, full_name, email, phone, drawn_at FROM raffle_draws WHERE lot_id = $1",
        )
        .bind(lot_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_winner).transpose()
    }

    async fn record_winner(&self, winner: RaffleWinner) -> Result<Option<RaffleWinner>> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO raffle_draws (lot_id, ticket_id, full_name, email, phone, drawn_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (lot_id) DO NOTHING
            "#,
        )
        .bind(winner.lot_id)
        .bind(&winner.ticket_id)
        .bind(&winner.full_name)
        .bind(&winner.email)
        .bind(&winner.phone)
        .bind(winner.drawn_at)
        .execute(&self.pool)
        .await?;

        if inserted.rows_affected() > 0 {
            Ok(None)
        } else {
            self.get_winner(winner.lot_id).await
        }
    }

    async fn clear_winner(&self, lot_id: i32) -> Result<bool> {
        let deleted = sqlx::query("DELETE FROM raffle_draws WHERE lot_id = $1")
            .bind(lot_id)
            .execute(&self.pool)
            .await?;

        Ok(deleted.rows_affected() > 0)
    }

    async fn list_winners(&self) -> Result<Vec<RaffleWinner>> {
        let rows = sqlx::query(
            "SELECT lot_id, ticket_id, full_name, email, phone, drawn_at FROM raffle_draws ORDER BY lot_id",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_winner).collect()
    }
}
