use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::booking::Booking;
use crate::hold::{HoldRecord, SlotKey};
use crate::menu::Menu;
use crate::resource::Resource;
use crate::tenant::TenantSettings;

/// Failures of a backing store. `Unavailable` is the only retryable kind;
/// everything else surfaces immediately.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("backing store unavailable: {0}")]
    Unavailable(String),

    #[error("stored payload could not be decoded: {0}")]
    Corrupt(String),
}

impl StoreError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

/// Read access to the tenant's bookable resources.
#[async_trait]
pub trait ResourceRepository: Send + Sync {
    async fn get(&self, tenant_id: Uuid, resource_id: Uuid)
        -> Result<Option<Resource>, StoreError>;

    async fn list_active(&self, tenant_id: Uuid) -> Result<Vec<Resource>, StoreError>;
}

/// Read access to the tenant's service menus.
#[async_trait]
pub trait MenuRepository: Send + Sync {
    async fn get(&self, tenant_id: Uuid, menu_id: Uuid) -> Result<Option<Menu>, StoreError>;
}

/// Read access to per-tenant settings.
#[async_trait]
pub trait TenantRepository: Send + Sync {
    async fn settings(&self, tenant_id: Uuid) -> Result<TenantSettings, StoreError>;
}

/// Read access to durable bookings, scoped to one resource and day.
#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Bookings in a slot-occupying status (pending or confirmed) for the
    /// given resource and date.
    async fn find_occupying(
        &self,
        tenant_id: Uuid,
        resource_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<Booking>, StoreError>;
}

/// Keyed TTL lock registry. The single synchronization point of the whole
/// subsystem: `try_create` must be one indivisible operation, never a
/// read-then-write pair, and must hold under multi-process concurrency.
#[async_trait]
pub trait HoldStore: Send + Sync {
    /// Atomic create-if-absent-with-expiry. Returns `false` when a live
    /// entry already occupies the key; exactly one of N concurrent callers
    /// for the same key observes `true`.
    async fn try_create(&self, record: &HoldRecord, ttl: Duration) -> Result<bool, StoreError>;

    /// Lookup by slot key. An entry past its expiry is not-found whether or
    /// not it has been physically deleted yet.
    async fn get(&self, key: &SlotKey) -> Result<Option<HoldRecord>, StoreError>;

    /// Lookup through the token index written alongside the record.
    async fn get_by_token(&self, token: &str) -> Result<Option<HoldRecord>, StoreError>;

    /// Reset expiry to now + `ttl`. Returns `false` if the entry is gone or
    /// already expired.
    async fn extend(&self, key: &SlotKey, ttl: Duration) -> Result<bool, StoreError>;

    /// Idempotent: deleting an absent or expired key is a successful no-op.
    async fn delete(&self, key: &SlotKey) -> Result<(), StoreError>;

    /// Idempotent delete through the token index.
    async fn delete_by_token(&self, token: &str) -> Result<(), StoreError>;

    /// All live holds for one resource and day, for availability
    /// subtraction. Expired entries are filtered, never returned.
    async fn list_active(
        &self,
        tenant_id: Uuid,
        resource_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<HoldRecord>, StoreError>;

    /// Physically remove expired entries. A pure optimization: correctness
    /// never depends on sweeping, since every read evaluates expiry itself.
    async fn sweep_expired(&self) -> Result<usize, StoreError>;

    /// Connectivity check for health reporting.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Explicit atomic unit of work around booking persistence. The committer
/// opens a transaction, re-checks conflicts and inserts inside it, then
/// commits or rolls back deliberately.
#[async_trait]
pub trait BookingUnitOfWork: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn BookingTx>, StoreError>;
}

#[async_trait]
pub trait BookingTx: Send {
    /// Same occupying-booking query as `BookingRepository::find_occupying`,
    /// but evaluated inside this transaction.
    async fn find_occupying(
        &mut self,
        tenant_id: Uuid,
        resource_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<Booking>, StoreError>;

    async fn insert(&mut self, booking: &Booking) -> Result<(), StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}
