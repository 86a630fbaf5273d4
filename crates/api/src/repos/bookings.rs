//! Booking repository for PostgreSQL.
//!
//! The `bookings_no_overlap` exclusion constraint rejects any insert or update
//! that would leave two active bookings of one car overlapping. Those rejections
//! surface as [`WriteError::Overlap`].

use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{Pool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::booking::DateWindow;
use crate::models::{Booking, BookingChanges, BookingFilter, BookingStatistics, NewBooking};

/// SQLSTATE for exclusion_violation.
const EXCLUSION_VIOLATION: &str = "23P01";

#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("window overlaps an active booking of the same car")]
    Overlap,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<sqlx::Error> for WriteError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.code().as_deref() == Some(EXCLUSION_VIOLATION) => {
                WriteError::Overlap
            }
            _ => WriteError::Other(err.into()),
        }
    }
}

/// Repository for bookings.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BookingRepo: Send + Sync {
    /// Pending and confirmed bookings of one car.
    async fn list_active_by_car(&self, car_id: Uuid) -> Result<Vec<Booking>>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Booking>>;

    /// Newest non-deleted booking whose id starts with `id_prefix` (lowercase hex).
    async fn find_by_reference(&self, id_prefix: String) -> Result<Option<Booking>>;

    /// Insert a pending booking.
    async fn insert(&self, booking: NewBooking) -> Result<Booking, WriteError>;

    /// Move a booking to a new window and reprice it.
    async fn reschedule(
        &self,
        id: Uuid,
        window: DateWindow,
        total_price: Decimal,
    ) -> Result<Option<Booking>, WriteError>;

    /// Apply administrator changes. Reactivating a booking can overlap.
    async fn update(&self, id: Uuid, changes: BookingChanges)
    -> Result<Option<Booking>, WriteError>;

    /// Mark a booking as deleted. The row is kept for history.
    async fn soft_delete(&self, id: Uuid) -> Result<Option<Booking>>;

    /// Newest first.
    async fn list(&self, filter: BookingFilter, limit: i64, offset: i64) -> Result<Vec<Booking>>;

    /// Aggregate counts over every booking matching the filter.
    async fn statistics(&self, filter: BookingFilter) -> Result<BookingStatistics>;
}

/// PostgreSQL implementation of BookingRepo.
#[derive(Clone)]
pub struct PgBookingRepo {
    pool: Pool<Postgres>,
}

impl PgBookingRepo {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn push_filter(query: &mut QueryBuilder<'_, Postgres>, filter: &BookingFilter) {
    if let Some(status) = filter.status {
        query.push(" AND status = ").push_bind(status);
    }
    if let Some(car_id) = filter.car_id {
        query.push(" AND car_id = ").push_bind(car_id);
    }
    if let Some(start) = filter.start_date {
        query.push(" AND start_date >= ").push_bind(start);
    }
    if let Some(end) = filter.end_date {
        query.push(" AND end_date <= ").push_bind(end);
    }
}

#[async_trait]
impl BookingRepo for PgBookingRepo {
    async fn list_active_by_car(&self, car_id: Uuid) -> Result<Vec<Booking>> {
        let bookings = sqlx::query_as::<_, Booking>(
            r#"
            SELECT * FROM bookings
            WHERE car_id = $1 AND status IN ('pending', 'confirmed')
            ORDER BY start_date
            "#,
        )
        .bind(car_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(bookings)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Booking>> {
        let booking = sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(booking)
    }

    async fn find_by_reference(&self, id_prefix: String) -> Result<Option<Booking>> {
        let booking = sqlx::query_as::<_, Booking>(
            r#"
            SELECT * FROM bookings
            WHERE id::text LIKE $1 AND status <> 'deleted'
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(format!("{id_prefix}%"))
        .fetch_optional(&self.pool)
        .await?;
        Ok(booking)
    }

    async fn insert(&self, booking: NewBooking) -> Result<Booking, WriteError> {
        let customer = booking.customer;
        let booking = sqlx::query_as::<_, Booking>(
            r#"
            INSERT INTO bookings
                (car_id, start_date, end_date, client_first_name, client_last_name,
                 client_email, client_phone, total_price, deposit_amount, notes, ip_address)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(booking.car_id)
        .bind(booking.window.start)
        .bind(booking.window.end)
        .bind(customer.first_name)
        .bind(customer.last_name)
        .bind(customer.email)
        .bind(customer.phone)
        .bind(booking.total_price)
        .bind(booking.deposit_amount)
        .bind(customer.notes)
        .bind(customer.ip_address)
        .fetch_one(&self.pool)
        .await?;
        Ok(booking)
    }

    async fn reschedule(
        &self,
        id: Uuid,
        window: DateWindow,
        total_price: Decimal,
    ) -> Result<Option<Booking>, WriteError> {
        let booking = sqlx::query_as::<_, Booking>(
            r#"
            UPDATE bookings
            SET start_date = $2, end_date = $3, total_price = $4, updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(window.start)
        .bind(window.end)
        .bind(total_price)
        .fetch_optional(&self.pool)
        .await?;
        Ok(booking)
    }

    async fn update(
        &self,
        id: Uuid,
        changes: BookingChanges,
    ) -> Result<Option<Booking>, WriteError> {
        let booking = sqlx::query_as::<_, Booking>(
            r#"
            UPDATE bookings SET
                status = COALESCE($2, status),
                deposit_status = COALESCE($3, deposit_status),
                notes = COALESCE($4, notes),
                updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(changes.status)
        .bind(changes.deposit_status)
        .bind(changes.notes)
        .fetch_optional(&self.pool)
        .await?;
        Ok(booking)
    }

    async fn soft_delete(&self, id: Uuid) -> Result<Option<Booking>> {
        let booking = sqlx::query_as::<_, Booking>(
            "UPDATE bookings SET status = 'deleted', updated_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(booking)
    }

    async fn list(&self, filter: BookingFilter, limit: i64, offset: i64) -> Result<Vec<Booking>> {
        let mut query = QueryBuilder::<Postgres>::new("SELECT * FROM bookings WHERE TRUE");
        push_filter(&mut query, &filter);
        query
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let bookings = query
            .build_query_as::<Booking>()
            .fetch_all(&self.pool)
            .await?;
        Ok(bookings)
    }

    async fn statistics(&self, filter: BookingFilter) -> Result<BookingStatistics> {
        let mut query = QueryBuilder::<Postgres>::new(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE status = 'pending') AS pending,
                COUNT(*) FILTER (WHERE status = 'confirmed') AS confirmed,
                COUNT(*) FILTER (WHERE status = 'cancelled') AS cancelled,
                COALESCE(SUM(total_price) FILTER (WHERE status = 'confirmed'), 0) AS total_revenue
            FROM bookings WHERE TRUE
            "#,
        );
        push_filter(&mut query, &filter);

        let stats = query
            .build_query_as::<BookingStatistics>()
            .fetch_one(&self.pool)
            .await?;
        Ok(stats)
    }
}
