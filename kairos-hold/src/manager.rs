use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, NaiveTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use kairos_core::hold::HoldRecord;
use kairos_core::repository::{
    BookingRepository, HoldStore, MenuRepository, ResourceRepository, StoreError,
};
use kairos_core::{CoreError, CoreResult};
use kairos_shared::TimeWindow;

use crate::policy::HoldPolicy;
use crate::token;

const STORE_ATTEMPTS: u32 = 3;
const STORE_BACKOFF: Duration = Duration::from_millis(50);

/// Retries only `StoreError::Unavailable`; business outcomes and decode
/// failures pass through on the first attempt.
async fn with_store_retry<T, F, Fut>(mut op: F) -> Result<T, StoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    let mut attempt: u32 = 1;
    loop {
        match op().await {
            Err(e) if e.is_retryable() && attempt < STORE_ATTEMPTS => {
                warn!("Hold store unavailable (attempt {}): {}", attempt, e);
                tokio::time::sleep(STORE_BACKOFF * attempt).await;
                attempt += 1;
            }
            other => return other,
        }
    }
}

/// Parameters of a hold request. The slot's end time is derived from the
/// menu's total duration, never supplied by the caller.
#[derive(Debug, Clone)]
pub struct CreateHold {
    pub tenant_id: Uuid,
    pub resource_id: Uuid,
    pub menu_id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub customer_id: Option<Uuid>,
}

/// Issues, inspects, extends and releases hold tokens. Stateless besides
/// the shared store handles; every instance observes the same holds.
pub struct HoldTokenManager {
    resources: Arc<dyn ResourceRepository>,
    menus: Arc<dyn MenuRepository>,
    bookings: Arc<dyn BookingRepository>,
    store: Arc<dyn HoldStore>,
    policy: HoldPolicy,
}

impl HoldTokenManager {
    pub fn new(
        resources: Arc<dyn ResourceRepository>,
        menus: Arc<dyn MenuRepository>,
        bookings: Arc<dyn BookingRepository>,
        store: Arc<dyn HoldStore>,
        policy: HoldPolicy,
    ) -> Self {
        Self {
            resources,
            menus,
            bookings,
            store,
            policy,
        }
    }

    pub fn policy(&self) -> &HoldPolicy {
        &self.policy
    }

    /// Claims a slot. The overlap checks against bookings and live holds
    /// are a best-effort filter; the `try_create` at the end is the only
    /// authoritative arbiter, and losing it is an ordinary `HoldConflict`.
    pub async fn create_hold(&self, request: &CreateHold) -> CoreResult<HoldRecord> {
        let menu = self
            .menus
            .get(request.tenant_id, request.menu_id)
            .await?
            .filter(|m| m.is_active)
            .ok_or_else(|| CoreError::Validation("unknown or inactive menu".to_string()))?;

        let duration = menu.total_minutes();
        if duration == 0 {
            return Err(CoreError::Validation(
                "menu has zero total duration".to_string(),
            ));
        }
        let window = TimeWindow::from_start(request.start_time, duration)
            .map_err(|e| CoreError::Validation(e.to_string()))?;

        let resource = self
            .resources
            .get(request.tenant_id, request.resource_id)
            .await?
            .filter(|r| r.is_active)
            .ok_or_else(|| CoreError::Validation("unknown or inactive resource".to_string()))?;

        // Outside working hours the slot simply is not available; callers
        // handle it exactly like a taken slot.
        let open = resource
            .effective_window(request.date)
            .ok_or(CoreError::HoldConflict)?;
        if !open.contains(&window) {
            return Err(CoreError::HoldConflict);
        }

        let occupying = self
            .bookings
            .find_occupying(request.tenant_id, request.resource_id, request.date)
            .await?;
        if occupying.iter().any(|b| b.window().overlaps(&window)) {
            return Err(CoreError::HoldConflict);
        }

        let now = Utc::now();
        let live = with_store_retry(|| {
            self.store
                .list_active(request.tenant_id, request.resource_id, request.date)
        })
        .await?;
        if live
            .iter()
            .any(|h| !h.is_expired(now) && h.window().overlaps(&window))
        {
            return Err(CoreError::HoldConflict);
        }

        let record = HoldRecord {
            token: token::generate_token(),
            tenant_id: request.tenant_id,
            resource_id: request.resource_id,
            date: request.date,
            start_time: window.start,
            end_time: window.end,
            menu_id: request.menu_id,
            customer_id: request.customer_id,
            created_at: now,
            expires_at: now + chrono::Duration::milliseconds(self.policy.ttl.as_millis() as i64),
        };

        let created =
            with_store_retry(|| self.store.try_create(&record, self.policy.ttl)).await?;
        if !created {
            return Err(CoreError::HoldConflict);
        }

        info!(
            "Hold created: {} until {}",
            record.slot_key(),
            record.expires_at
        );
        Ok(record)
    }

    /// Unknown and expired tokens are indistinguishable on purpose: both
    /// are `HoldNotFound`.
    pub async fn inspect(&self, tenant_id: Uuid, token: &str) -> CoreResult<HoldRecord> {
        let record = with_store_retry(|| self.store.get_by_token(token))
            .await?
            .ok_or(CoreError::HoldNotFound)?;
        if record.tenant_id != tenant_id {
            return Err(CoreError::Unauthorized);
        }
        Ok(record)
    }

    /// Resets the clock: new expiry is now + `minutes`, independent of the
    /// time remaining, bounded per call and capped over the hold's whole
    /// lifetime.
    pub async fn extend(
        &self,
        tenant_id: Uuid,
        token: &str,
        minutes: u32,
    ) -> CoreResult<HoldRecord> {
        if minutes < self.policy.extend_min_minutes || minutes > self.policy.extend_max_minutes {
            return Err(CoreError::Validation(format!(
                "extension must be between {} and {} minutes",
                self.policy.extend_min_minutes, self.policy.extend_max_minutes
            )));
        }

        let record = self.inspect(tenant_id, token).await?;

        let now = Utc::now();
        let requested = now + chrono::Duration::minutes(minutes as i64);
        let cap = record.created_at + chrono::Duration::minutes(self.policy.max_lifetime_minutes as i64);
        if requested > cap {
            return Err(CoreError::Validation(format!(
                "hold lifetime is capped at {} minutes from creation",
                self.policy.max_lifetime_minutes
            )));
        }

        let ttl = Duration::from_secs(minutes as u64 * 60);
        let slot_key = record.slot_key();
        let extended =
            with_store_retry(|| self.store.extend(&slot_key, ttl)).await?;
        if !extended {
            // Expired between the read and the extend.
            return Err(CoreError::HoldNotFound);
        }

        let mut updated = record;
        updated.expires_at = requested;
        debug!("Hold extended: {} until {}", updated.slot_key(), requested);
        Ok(updated)
    }

    /// Idempotent: releasing a token that is absent or already expired
    /// succeeds quietly. Only a live hold of another tenant is refused.
    pub async fn release(&self, tenant_id: Uuid, token: &str) -> CoreResult<()> {
        match with_store_retry(|| self.store.get_by_token(token)).await? {
            None => Ok(()),
            Some(record) if record.tenant_id != tenant_id => Err(CoreError::Unauthorized),
            Some(record) => {
                with_store_retry(|| self.store.delete_by_token(token)).await?;
                debug!("Hold released: {}", record.slot_key());
                Ok(())
            }
        }
    }
}
