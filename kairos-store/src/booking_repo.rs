use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use kairos_core::booking::{Booking, BookingStatus};
use kairos_core::repository::{BookingRepository, BookingTx, BookingUnitOfWork, StoreError};

const OCCUPYING_SQL: &str = r#"
SELECT id, tenant_id, resource_id, menu_id, customer_id, reference,
       date, start_time, end_time, status, notes, created_at, updated_at
FROM bookings
WHERE tenant_id = $1 AND resource_id = $2 AND date = $3
  AND status IN ('PENDING', 'CONFIRMED')
ORDER BY start_time
"#;

const INSERT_SQL: &str = r#"
INSERT INTO bookings (id, tenant_id, resource_id, menu_id, customer_id, reference,
                      date, start_time, end_time, status, notes, created_at, updated_at)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
"#;

fn db_err(e: sqlx::Error) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

// Internal struct for type-safe querying
#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    tenant_id: Uuid,
    resource_id: Uuid,
    menu_id: Option<Uuid>,
    customer_id: Option<Uuid>,
    reference: String,
    date: NaiveDate,
    start_time: NaiveTime,
    end_time: NaiveTime,
    status: String,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl BookingRow {
    fn into_booking(self) -> Result<Booking, StoreError> {
        let status = BookingStatus::parse(&self.status)
            .ok_or_else(|| StoreError::Corrupt(format!("unknown booking status: {}", self.status)))?;
        Ok(Booking {
            id: self.id,
            tenant_id: self.tenant_id,
            resource_id: self.resource_id,
            menu_id: self.menu_id,
            customer_id: self.customer_id,
            reference: self.reference,
            date: self.date,
            start_time: self.start_time,
            end_time: self.end_time,
            status,
            notes: self.notes,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn into_bookings(rows: Vec<BookingRow>) -> Result<Vec<Booking>, StoreError> {
    rows.into_iter().map(BookingRow::into_booking).collect()
}

pub struct PgBookingStore {
    pool: PgPool,
}

impl PgBookingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookingRepository for PgBookingStore {
    async fn find_occupying(
        &self,
        tenant_id: Uuid,
        resource_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<Booking>, StoreError> {
        let rows = sqlx::query_as::<_, BookingRow>(OCCUPYING_SQL)
            .bind(tenant_id)
            .bind(resource_id)
            .bind(date)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        into_bookings(rows)
    }
}

#[async_trait]
impl BookingUnitOfWork for PgBookingStore {
    async fn begin(&self) -> Result<Box<dyn BookingTx>, StoreError> {
        let tx = self.pool.begin().await.map_err(db_err)?;
        Ok(Box::new(PgBookingTx { tx }))
    }
}

pub struct PgBookingTx {
    tx: sqlx::Transaction<'static, Postgres>,
}

#[async_trait]
impl BookingTx for PgBookingTx {
    async fn find_occupying(
        &mut self,
        tenant_id: Uuid,
        resource_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<Booking>, StoreError> {
        let rows = sqlx::query_as::<_, BookingRow>(OCCUPYING_SQL)
            .bind(tenant_id)
            .bind(resource_id)
            .bind(date)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(db_err)?;

        into_bookings(rows)
    }

    async fn insert(&mut self, booking: &Booking) -> Result<(), StoreError> {
        sqlx::query(INSERT_SQL)
            .bind(booking.id)
            .bind(booking.tenant_id)
            .bind(booking.resource_id)
            .bind(booking.menu_id)
            .bind(booking.customer_id)
            .bind(&booking.reference)
            .bind(booking.date)
            .bind(booking.start_time)
            .bind(booking.end_time)
            .bind(booking.status.as_str())
            .bind(&booking.notes)
            .bind(booking.created_at)
            .bind(booking.updated_at)
            .execute(&mut *self.tx)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await.map_err(db_err)
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.rollback().await.map_err(db_err)
    }
}
