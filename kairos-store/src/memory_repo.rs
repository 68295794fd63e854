use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use kairos_core::booking::Booking;
use kairos_core::hold::{HoldRecord, SlotKey};
use kairos_core::menu::Menu;
use kairos_core::repository::{
    BookingRepository, BookingTx, BookingUnitOfWork, HoldStore, MenuRepository,
    ResourceRepository, StoreError, TenantRepository,
};
use kairos_core::resource::Resource;
use kairos_core::tenant::TenantSettings;

/// In-process `HoldStore` with the same observable semantics as the Redis
/// one: atomic create-if-absent under one lock, lazy expiry on every read.
/// Used by tests and by single-node dev setups without Redis.
#[derive(Default)]
pub struct MemoryHoldStore {
    inner: Mutex<Holds>,
}

#[derive(Default)]
struct Holds {
    by_key: HashMap<SlotKey, HoldRecord>,
    by_token: HashMap<String, SlotKey>,
}

impl Holds {
    fn purge(&mut self, key: &SlotKey) {
        if let Some(record) = self.by_key.remove(key) {
            self.by_token.remove(&record.token);
        }
    }
}

impl MemoryHoldStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HoldStore for MemoryHoldStore {
    async fn try_create(&self, record: &HoldRecord, ttl: Duration) -> Result<bool, StoreError> {
        let now = Utc::now();
        let mut holds = self.inner.lock().await;

        if let Some(existing) = holds.by_key.get(&record.slot_key()) {
            if !existing.is_expired(now) {
                return Ok(false);
            }
            holds.purge(&record.slot_key());
        }

        let mut stored = record.clone();
        stored.expires_at = now + chrono::Duration::milliseconds(ttl.as_millis() as i64);
        holds.by_token.insert(stored.token.clone(), stored.slot_key());
        holds.by_key.insert(stored.slot_key(), stored);
        Ok(true)
    }

    async fn get(&self, key: &SlotKey) -> Result<Option<HoldRecord>, StoreError> {
        let now = Utc::now();
        let mut holds = self.inner.lock().await;
        match holds.by_key.get(key) {
            Some(record) if record.is_expired(now) => {
                holds.purge(key);
                Ok(None)
            }
            Some(record) => Ok(Some(record.clone())),
            None => Ok(None),
        }
    }

    async fn get_by_token(&self, token: &str) -> Result<Option<HoldRecord>, StoreError> {
        let now = Utc::now();
        let mut holds = self.inner.lock().await;
        let key = match holds.by_token.get(token) {
            Some(key) => key.clone(),
            None => return Ok(None),
        };
        match holds.by_key.get(&key) {
            Some(record) if record.is_expired(now) => {
                holds.purge(&key);
                Ok(None)
            }
            // A reclaimed slot carries someone else's record.
            Some(record) if record.token == token => Ok(Some(record.clone())),
            _ => Ok(None),
        }
    }

    async fn extend(&self, key: &SlotKey, ttl: Duration) -> Result<bool, StoreError> {
        let now = Utc::now();
        let mut holds = self.inner.lock().await;
        match holds.by_key.get_mut(key) {
            Some(record) if !record.is_expired(now) => {
                record.expires_at = now + chrono::Duration::milliseconds(ttl.as_millis() as i64);
                Ok(true)
            }
            Some(_) => {
                holds.purge(key);
                Ok(false)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, key: &SlotKey) -> Result<(), StoreError> {
        let mut holds = self.inner.lock().await;
        holds.purge(key);
        Ok(())
    }

    async fn delete_by_token(&self, token: &str) -> Result<(), StoreError> {
        let mut holds = self.inner.lock().await;
        if let Some(key) = holds.by_token.remove(token) {
            holds.by_key.remove(&key);
        }
        Ok(())
    }

    async fn list_active(
        &self,
        tenant_id: Uuid,
        resource_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<HoldRecord>, StoreError> {
        let now = Utc::now();
        let mut holds = self.inner.lock().await;

        let expired: Vec<SlotKey> = holds
            .by_key
            .values()
            .filter(|r| r.is_expired(now))
            .map(|r| r.slot_key())
            .collect();
        for key in &expired {
            holds.purge(key);
        }

        let mut live: Vec<HoldRecord> = holds
            .by_key
            .values()
            .filter(|r| r.tenant_id == tenant_id && r.resource_id == resource_id && r.date == date)
            .cloned()
            .collect();
        live.sort_by_key(|r| r.start_time);
        Ok(live)
    }

    async fn sweep_expired(&self) -> Result<usize, StoreError> {
        let now = Utc::now();
        let mut holds = self.inner.lock().await;
        let expired: Vec<SlotKey> = holds
            .by_key
            .values()
            .filter(|r| r.is_expired(now))
            .map(|r| r.slot_key())
            .collect();
        for key in &expired {
            holds.purge(key);
        }
        Ok(expired.len())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// In-process catalog of resources, menus and tenant settings.
#[derive(Default, Clone)]
pub struct MemoryDirectory {
    inner: Arc<RwLock<DirectoryData>>,
}

#[derive(Default)]
struct DirectoryData {
    resources: HashMap<Uuid, Resource>,
    menus: HashMap<Uuid, Menu>,
    tenants: HashMap<Uuid, TenantSettings>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn upsert_resource(&self, resource: Resource) {
        let mut data = self.inner.write().await;
        data.resources.insert(resource.id, resource);
    }

    pub async fn upsert_menu(&self, menu: Menu) {
        let mut data = self.inner.write().await;
        data.menus.insert(menu.id, menu);
    }

    pub async fn set_tenant_settings(&self, tenant_id: Uuid, settings: TenantSettings) {
        let mut data = self.inner.write().await;
        data.tenants.insert(tenant_id, settings);
    }
}

#[async_trait]
impl ResourceRepository for MemoryDirectory {
    async fn get(
        &self,
        tenant_id: Uuid,
        resource_id: Uuid,
    ) -> Result<Option<Resource>, StoreError> {
        let data = self.inner.read().await;
        Ok(data
            .resources
            .get(&resource_id)
            .filter(|r| r.tenant_id == tenant_id)
            .cloned())
    }

    async fn list_active(&self, tenant_id: Uuid) -> Result<Vec<Resource>, StoreError> {
        let data = self.inner.read().await;
        let mut resources: Vec<Resource> = data
            .resources
            .values()
            .filter(|r| r.tenant_id == tenant_id && r.is_active)
            .cloned()
            .collect();
        resources.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(resources)
    }
}

#[async_trait]
impl MenuRepository for MemoryDirectory {
    async fn get(&self, tenant_id: Uuid, menu_id: Uuid) -> Result<Option<Menu>, StoreError> {
        let data = self.inner.read().await;
        Ok(data
            .menus
            .get(&menu_id)
            .filter(|m| m.tenant_id == tenant_id)
            .cloned())
    }
}

#[async_trait]
impl TenantRepository for MemoryDirectory {
    async fn settings(&self, tenant_id: Uuid) -> Result<TenantSettings, StoreError> {
        let data = self.inner.read().await;
        Ok(data.tenants.get(&tenant_id).cloned().unwrap_or_default())
    }
}

/// In-process booking persistence with explicit staged transactions.
/// `fail_next_begin` / `fail_next_commit` inject a one-shot outage for
/// exercising the committer's transient-failure path.
#[derive(Default, Clone)]
pub struct MemoryBookingStore {
    bookings: Arc<Mutex<Vec<Booking>>>,
    fail_next_begin: Arc<AtomicBool>,
    fail_next_commit: Arc<AtomicBool>,
}

impl MemoryBookingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seed(&self, booking: Booking) {
        self.bookings.lock().await.push(booking);
    }

    pub async fn all(&self) -> Vec<Booking> {
        self.bookings.lock().await.clone()
    }

    pub fn fail_next_begin(&self) {
        self.fail_next_begin.store(true, Ordering::SeqCst);
    }

    pub fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }
}

fn occupying(rows: &[Booking], tenant_id: Uuid, resource_id: Uuid, date: NaiveDate) -> Vec<Booking> {
    rows.iter()
        .filter(|b| {
            b.tenant_id == tenant_id
                && b.resource_id == resource_id
                && b.date == date
                && b.status.occupies_slot()
        })
        .cloned()
        .collect()
}

#[async_trait]
impl BookingRepository for MemoryBookingStore {
    async fn find_occupying(
        &self,
        tenant_id: Uuid,
        resource_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<Booking>, StoreError> {
        let rows = self.bookings.lock().await;
        Ok(occupying(&rows, tenant_id, resource_id, date))
    }
}

#[async_trait]
impl BookingUnitOfWork for MemoryBookingStore {
    async fn begin(&self) -> Result<Box<dyn BookingTx>, StoreError> {
        if self.fail_next_begin.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected begin failure".to_string()));
        }
        Ok(Box::new(MemoryBookingTx {
            store: self.clone(),
            staged: Vec::new(),
        }))
    }
}

pub struct MemoryBookingTx {
    store: MemoryBookingStore,
    staged: Vec<Booking>,
}

#[async_trait]
impl BookingTx for MemoryBookingTx {
    async fn find_occupying(
        &mut self,
        tenant_id: Uuid,
        resource_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<Booking>, StoreError> {
        let committed = self.store.bookings.lock().await;
        let mut rows = occupying(&committed, tenant_id, resource_id, date);
        rows.extend(occupying(&self.staged, tenant_id, resource_id, date));
        Ok(rows)
    }

    async fn insert(&mut self, booking: &Booking) -> Result<(), StoreError> {
        self.staged.push(booking.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let this = *self;
        if this.store.fail_next_commit.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected commit failure".to_string()));
        }
        this.store.bookings.lock().await.extend(this.staged);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}
